//! Generate a synthetic incidents CSV for demoing the dashboard:
//! `cargo run --bin generate_sample [output.csv] [rows]`

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

struct Area {
    region: &'static str,
    country: &'static str,
    city: &'static str,
    lat: f64,
    lon: f64,
}

const AREAS: &[Area] = &[
    Area { region: "Middle East & North Africa", country: "Iraq", city: "Baghdad", lat: 33.3, lon: 44.4 },
    Area { region: "Middle East & North Africa", country: "Yemen", city: "Aden", lat: 12.8, lon: 45.0 },
    Area { region: "South Asia", country: "Afghanistan", city: "Kabul", lat: 34.5, lon: 69.2 },
    Area { region: "South Asia", country: "Pakistan", city: "Karachi", lat: 24.9, lon: 67.0 },
    Area { region: "Sub-Saharan Africa", country: "Nigeria", city: "Maiduguri", lat: 11.8, lon: 13.2 },
    Area { region: "Sub-Saharan Africa", country: "Somalia", city: "Mogadishu", lat: 2.0, lon: 45.3 },
    Area { region: "Western Europe", country: "United Kingdom", city: "Belfast", lat: 54.6, lon: -5.9 },
    Area { region: "Western Europe", country: "Spain", city: "Madrid", lat: 40.4, lon: -3.7 },
    Area { region: "South America", country: "Colombia", city: "Bogota", lat: 4.7, lon: -74.1 },
    Area { region: "Southeast Asia", country: "Philippines", city: "Manila", lat: 14.6, lon: 121.0 },
];

const ATTACK_TYPES: &[&str] = &[
    "Bombing/Explosion",
    "Armed Assault",
    "Assassination",
    "Hostage Taking (Kidnapping)",
    "Facility/Infrastructure Attack",
];

const TARGET_TYPES: &[&str] = &[
    "Private Citizens & Property",
    "Military",
    "Police",
    "Government (General)",
    "Business",
];

const GROUPS: &[&str] = &[
    "Unknown",
    "Unknown",
    "Unknown",
    "Crimson Vanguard",
    "Northern Liberation Front",
    "People's Reprisal Army",
    "Black Meridian",
    "Sons of the Delta",
];

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "sample_incidents.csv".into());
    let rows: usize = args
        .next()
        .map(|n| n.parse().context("rows must be a number"))
        .transpose()?
        .unwrap_or(20_000);

    let mut rng = StdRng::seed_from_u64(7);
    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("creating {output}"))?;
    writer.write_record([
        "year", "month", "country", "city", "region", "latitude", "longitude",
        "attack_type", "target_type", "group_name", "nkill", "nwound", "success",
    ])?;

    for _ in 0..rows {
        let area = AREAS.choose(&mut rng).expect("areas non-empty");
        let year = rng.gen_range(1970..=2017);
        // ~3% of rows carry the unknown-month sentinel.
        let month = if rng.gen_bool(0.03) { 0 } else { rng.gen_range(1..=12) };
        let has_coords = rng.gen_bool(0.92);
        let nkill: Option<u32> = rng.gen_bool(0.9).then(|| rng.gen_range(0..=30));
        let nwound: Option<u32> = rng.gen_bool(0.85).then(|| rng.gen_range(0..=60));
        let success = rng.gen_bool(0.85);

        writer.write_record([
            year.to_string(),
            month.to_string(),
            area.country.to_string(),
            if rng.gen_bool(0.8) { area.city.to_string() } else { String::new() },
            area.region.to_string(),
            has_coords
                .then(|| format!("{:.4}", area.lat + rng.gen_range(-2.0..2.0)))
                .unwrap_or_default(),
            has_coords
                .then(|| format!("{:.4}", area.lon + rng.gen_range(-2.0..2.0)))
                .unwrap_or_default(),
            ATTACK_TYPES.choose(&mut rng).expect("types non-empty").to_string(),
            if rng.gen_bool(0.95) {
                TARGET_TYPES.choose(&mut rng).expect("targets non-empty").to_string()
            } else {
                String::new()
            },
            GROUPS.choose(&mut rng).expect("groups non-empty").to_string(),
            nkill.map(|n| n.to_string()).unwrap_or_default(),
            nwound.map(|n| n.to_string()).unwrap_or_default(),
            u8::from(success).to_string(),
        ])?;
    }

    writer.flush()?;
    log::info!("wrote {rows} synthetic incidents to {output}");
    println!("wrote {rows} synthetic incidents to {output}");
    Ok(())
}
