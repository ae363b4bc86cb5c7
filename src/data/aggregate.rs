use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::filter::{FilterCriteria, FilteredView};
use super::model::Record;

// ---------------------------------------------------------------------------
// Aggregation engine: pure functions of a FilteredView
// ---------------------------------------------------------------------------
//
// Every function here tolerates an empty view by returning empty/zero-valued
// results. Statistics that need at least one row (mode, max, means) come
// back as `None` so the UI can show "no data" instead of NaN.

/// Map points beyond this count are down-sampled.
pub const GEO_SAMPLE_MAX: usize = 5000;
/// Fixed sampling seed so identical views always yield identical samples.
pub const GEO_SAMPLE_SEED: u64 = 42;

pub const TOP_COUNTRIES: usize = 15;
pub const TOP_GROUPS: usize = 15;
pub const TOP_TARGETS: usize = 10;
pub const TIMELINE_GROUPS: usize = 5;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ---- Row types of the named aggregate tables ----

#[derive(Debug, Clone, PartialEq)]
pub struct YearRow {
    pub year: i32,
    pub killed: f64,
    pub wounded: f64,
    pub attacks: u64,
    /// mean(success) as a fraction; scaled to percent at display time.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRow {
    pub month: i32,
    pub name: &'static str,
    pub attacks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecadeRow {
    pub decade: i32,
    pub label: String,
    pub attacks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionYearRow {
    pub year: i32,
    pub region: String,
    pub attacks: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryRow {
    pub country: String,
    pub killed: f64,
    pub attacks: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub group: String,
    pub killed: f64,
    pub wounded: f64,
    pub attacks: u64,
    pub first_year: i32,
    pub last_year: i32,
    pub years_active: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupYearRow {
    pub year: i32,
    pub group: String,
    pub attacks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackTypeCount {
    pub attack_type: String,
    pub attacks: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackEfficiencyRow {
    pub attack_type: String,
    /// mean(success) * 100 over the group.
    pub success_rate_pct: f64,
    /// mean(nkill) over non-null values; `None` when all are null.
    pub avg_killed: Option<f64>,
    pub attacks: u64,
}

/// Per-attack-type fatality values, clipped at the group's 95th percentile.
#[derive(Debug, Clone, PartialEq)]
pub struct LethalitySeries {
    pub attack_type: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRow {
    pub target_type: String,
    pub attacks: u64,
}

/// Region × attack-type cross-tabulation of incident counts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossTab {
    pub regions: Vec<String>,
    pub attack_types: Vec<String>,
    /// `counts[region_idx][attack_type_idx]`
    pub counts: Vec<Vec<u64>>,
}

pub const CORRELATION_LABELS: [&str; 4] = ["nkill", "nwound", "success", "year"];

/// Pairwise Pearson correlations among {nkill, nwound, success, year}.
/// A cell is `None` when fewer than two pairwise-complete rows exist or a
/// variable is constant over them.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: [&'static str; 4],
    pub cells: [[Option<f64>; 4]; 4],
}

impl Default for CorrelationMatrix {
    fn default() -> Self {
        CorrelationMatrix {
            labels: CORRELATION_LABELS,
            cells: [[None; 4]; 4],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryStats {
    pub avg_killed: Option<f64>,
    pub avg_wounded: Option<f64>,
    pub success_rate_pct: Option<f64>,
    pub max_killed: Option<f64>,
    pub max_wounded: Option<f64>,
    /// Year with the most attacks in the yearly trend.
    pub peak_year: Option<i32>,
    pub top_country: Option<String>,
    pub top_attack_type: Option<String>,
    pub top_target_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub attack_type: String,
    pub country: String,
    pub year: i32,
    /// Marker size: nkill with null → 1, clamped to [1, 100].
    pub size: f64,
}

/// Headline figures for the KPI strip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Kpis {
    pub attacks: usize,
    pub killed: f64,
    pub wounded: f64,
    pub casualties: f64,
    pub success_rate_pct: Option<f64>,
}

// ---------------------------------------------------------------------------
// The recompute-once-per-filter-change bundle
// ---------------------------------------------------------------------------

/// All named aggregate tables for one filtered view.
///
/// Each table is also available as a standalone function; the bundle only
/// exists so the UI triggers exactly one recomputation pass per criteria
/// change.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub kpis: Kpis,
    pub yearly: Vec<YearRow>,
    pub monthly: Vec<MonthRow>,
    pub decades: Vec<DecadeRow>,
    /// Only present when no single region is selected.
    pub regional_timeline: Option<Vec<RegionYearRow>>,
    /// Full country → (killed, attacks) table, for the choropleth.
    pub countries: Vec<CountryRow>,
    pub top_countries_by_attacks: Vec<CountryRow>,
    pub top_countries_by_killed: Vec<CountryRow>,
    pub top_groups_by_attacks: Vec<GroupRow>,
    pub top_groups_by_killed: Vec<GroupRow>,
    pub group_timeline: Vec<GroupYearRow>,
    pub attack_types: Vec<AttackTypeCount>,
    pub attack_efficiency: Vec<AttackEfficiencyRow>,
    pub lethality: Vec<LethalitySeries>,
    pub targets: Vec<TargetRow>,
    pub crosstab: CrossTab,
    /// (region, mean(success)*100), ascending by rate.
    pub region_success: Vec<(String, f64)>,
    /// (region, mean(nkill)), ascending; regions with no known nkill omitted.
    pub region_lethality: Vec<(String, f64)>,
    pub correlation: CorrelationMatrix,
    pub summary: SummaryStats,
    pub geo: Vec<GeoPoint>,
}

impl Aggregates {
    pub fn compute(view: &FilteredView, criteria: &FilterCriteria) -> Self {
        let yearly = yearly_trend(view);
        let countries = country_ranking(view);
        let groups = group_ranking(view);

        let top_groups_by_attacks = top_n_by(&groups, TOP_GROUPS, |g| g.attacks as f64);
        let timeline_groups: Vec<String> = top_groups_by_attacks
            .iter()
            .take(TIMELINE_GROUPS)
            .map(|g| g.group.clone())
            .collect();

        let summary = summary_stats(view, &yearly);

        Aggregates {
            kpis: kpis(view),
            monthly: monthly_pattern(view),
            decades: decade_counts(view),
            regional_timeline: criteria
                .region
                .is_none()
                .then(|| regional_timeline(view)),
            top_countries_by_attacks: top_n_by(&countries, TOP_COUNTRIES, |c| c.attacks as f64),
            top_countries_by_killed: top_n_by(&countries, TOP_COUNTRIES, |c| c.killed),
            top_groups_by_killed: top_n_by(&groups, TOP_GROUPS, |g| g.killed),
            group_timeline: group_timeline(view, &timeline_groups),
            attack_types: attack_type_counts(view),
            attack_efficiency: attack_efficiency(view),
            lethality: lethality_by_attack_type(view),
            targets: target_ranking(view),
            crosstab: region_attack_crosstab(view),
            region_success: region_success_rates(view),
            region_lethality: region_lethality(view),
            correlation: correlation_matrix(view),
            geo: geo_sample(view),
            yearly,
            countries,
            top_groups_by_attacks,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Individual aggregations
// ---------------------------------------------------------------------------

pub fn kpis(view: &FilteredView) -> Kpis {
    let killed: f64 = view.rows().map(|r| r.nkill.unwrap_or(0.0)).sum();
    let wounded: f64 = view.rows().map(|r| r.nwound.unwrap_or(0.0)).sum();
    Kpis {
        attacks: view.len(),
        killed,
        wounded,
        casualties: killed + wounded,
        success_rate_pct: success_rate_pct(view.rows()),
    }
}

/// Group by year → sum(nkill), sum(nwound), count, mean(success).
pub fn yearly_trend(view: &FilteredView) -> Vec<YearRow> {
    let mut by_year: BTreeMap<i32, (f64, f64, u64, u64)> = BTreeMap::new();
    for rec in view.rows() {
        let entry = by_year.entry(rec.year).or_default();
        entry.0 += rec.nkill.unwrap_or(0.0);
        entry.1 += rec.nwound.unwrap_or(0.0);
        entry.2 += 1;
        entry.3 += rec.success as u64;
    }
    by_year
        .into_iter()
        .map(|(year, (killed, wounded, attacks, successes))| YearRow {
            year,
            killed,
            wounded,
            attacks,
            success_rate: successes as f64 / attacks as f64,
        })
        .collect()
}

/// Group by month → count, months outside 1–12 excluded.
pub fn monthly_pattern(view: &FilteredView) -> Vec<MonthRow> {
    let mut by_month: BTreeMap<i32, u64> = BTreeMap::new();
    for rec in view.rows() {
        if (1..=12).contains(&rec.month) {
            *by_month.entry(rec.month).or_default() += 1;
        }
    }
    by_month
        .into_iter()
        .map(|(month, attacks)| MonthRow {
            month,
            name: MONTH_NAMES[(month - 1) as usize],
            attacks,
        })
        .collect()
}

/// Group by decade (`floor(year/10)*10`) → count.
pub fn decade_counts(view: &FilteredView) -> Vec<DecadeRow> {
    let mut by_decade: BTreeMap<i32, u64> = BTreeMap::new();
    for rec in view.rows() {
        *by_decade.entry(rec.year.div_euclid(10) * 10).or_default() += 1;
    }
    by_decade
        .into_iter()
        .map(|(decade, attacks)| DecadeRow {
            decade,
            label: format!("{decade}s"),
            attacks,
        })
        .collect()
}

/// Group by (year, region) → count.
pub fn regional_timeline(view: &FilteredView) -> Vec<RegionYearRow> {
    let mut by_key: BTreeMap<(i32, String), u64> = BTreeMap::new();
    for rec in view.rows() {
        *by_key.entry((rec.year, rec.region.clone())).or_default() += 1;
    }
    by_key
        .into_iter()
        .map(|((year, region), attacks)| RegionYearRow {
            year,
            region,
            attacks,
        })
        .collect()
}

/// Group by country → sum(nkill), count; sorted by country name.
pub fn country_ranking(view: &FilteredView) -> Vec<CountryRow> {
    let mut by_country: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    for rec in view.rows() {
        let entry = by_country.entry(rec.country.clone()).or_default();
        entry.0 += rec.nkill.unwrap_or(0.0);
        entry.1 += 1;
    }
    by_country
        .into_iter()
        .map(|(country, (killed, attacks))| CountryRow {
            country,
            killed,
            attacks,
        })
        .collect()
}

/// Group by group_name → sums, count, activity span; unattributed incidents
/// (`group_name == "Unknown"`) excluded.
pub fn group_ranking(view: &FilteredView) -> Vec<GroupRow> {
    let mut by_group: BTreeMap<String, (f64, f64, u64, i32, i32)> = BTreeMap::new();
    for rec in view.rows() {
        if rec.group_name == "Unknown" {
            continue;
        }
        let entry = by_group
            .entry(rec.group_name.clone())
            .or_insert((0.0, 0.0, 0, i32::MAX, i32::MIN));
        entry.0 += rec.nkill.unwrap_or(0.0);
        entry.1 += rec.nwound.unwrap_or(0.0);
        entry.2 += 1;
        entry.3 = entry.3.min(rec.year);
        entry.4 = entry.4.max(rec.year);
    }
    by_group
        .into_iter()
        .map(
            |(group, (killed, wounded, attacks, first_year, last_year))| GroupRow {
                group,
                killed,
                wounded,
                attacks,
                first_year,
                last_year,
                years_active: last_year - first_year + 1,
            },
        )
        .collect()
}

/// Per-year attack counts restricted to the given group names.
pub fn group_timeline(view: &FilteredView, groups: &[String]) -> Vec<GroupYearRow> {
    let mut by_key: BTreeMap<(i32, String), u64> = BTreeMap::new();
    for rec in view.rows() {
        if groups.iter().any(|g| *g == rec.group_name) {
            *by_key
                .entry((rec.year, rec.group_name.clone()))
                .or_default() += 1;
        }
    }
    by_key
        .into_iter()
        .map(|((year, group), attacks)| GroupYearRow {
            year,
            group,
            attacks,
        })
        .collect()
}

/// Group by attack type → count.
pub fn attack_type_counts(view: &FilteredView) -> Vec<AttackTypeCount> {
    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    for rec in view.rows() {
        *by_type.entry(rec.attack_type.clone()).or_default() += 1;
    }
    by_type
        .into_iter()
        .map(|(attack_type, attacks)| AttackTypeCount {
            attack_type,
            attacks,
        })
        .collect()
}

/// Group by attack type → mean(success)*100, mean(nkill), count.
pub fn attack_efficiency(view: &FilteredView) -> Vec<AttackEfficiencyRow> {
    let mut by_type: BTreeMap<String, (u64, u64, f64, u64)> = BTreeMap::new();
    for rec in view.rows() {
        // (attacks, successes, nkill sum over non-null, non-null count)
        let entry = by_type.entry(rec.attack_type.clone()).or_default();
        entry.0 += 1;
        entry.1 += rec.success as u64;
        if let Some(nkill) = rec.nkill {
            entry.2 += nkill;
            entry.3 += 1;
        }
    }
    by_type
        .into_iter()
        .map(
            |(attack_type, (attacks, successes, kill_sum, kill_n))| AttackEfficiencyRow {
                attack_type,
                success_rate_pct: successes as f64 / attacks as f64 * 100.0,
                avg_killed: (kill_n > 0).then(|| kill_sum / kill_n as f64),
                attacks,
            },
        )
        .collect()
}

/// Non-null nkill values per attack type, with each group's top 5% clipped
/// (values above the group's 95th percentile are dropped).
pub fn lethality_by_attack_type(view: &FilteredView) -> Vec<LethalitySeries> {
    let mut by_type: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for rec in view.rows() {
        if let Some(nkill) = rec.nkill {
            by_type.entry(rec.attack_type.clone()).or_default().push(nkill);
        }
    }
    by_type
        .into_iter()
        .map(|(attack_type, mut values)| {
            values.sort_by(f64::total_cmp);
            if let Some(clip) = quantile(&values, 0.95) {
                values.retain(|v| *v <= clip);
            }
            LethalitySeries {
                attack_type,
                values,
            }
        })
        .collect()
}

/// Group by target type → count, top 10. Rows with a null target are
/// skipped, so the table is empty when the column carries no data.
pub fn target_ranking(view: &FilteredView) -> Vec<TargetRow> {
    let mut by_target: BTreeMap<String, u64> = BTreeMap::new();
    for rec in view.rows() {
        if let Some(target) = &rec.target_type {
            *by_target.entry(target.clone()).or_default() += 1;
        }
    }
    let rows: Vec<TargetRow> = by_target
        .into_iter()
        .map(|(target_type, attacks)| TargetRow {
            target_type,
            attacks,
        })
        .collect();
    top_n_by(&rows, TOP_TARGETS, |t| t.attacks as f64)
}

/// Cross-tabulation: rows = region, columns = attack type, cell = count.
pub fn region_attack_crosstab(view: &FilteredView) -> CrossTab {
    let mut by_region: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut attack_types: BTreeSet<String> = BTreeSet::new();
    for rec in view.rows() {
        attack_types.insert(rec.attack_type.clone());
        *by_region
            .entry(rec.region.clone())
            .or_default()
            .entry(rec.attack_type.clone())
            .or_default() += 1;
    }
    let attack_types: Vec<String> = attack_types.into_iter().collect();
    let counts = by_region
        .values()
        .map(|per_type| {
            attack_types
                .iter()
                .map(|t| per_type.get(t).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    CrossTab {
        regions: by_region.into_keys().collect(),
        attack_types,
        counts,
    }
}

/// mean(success)*100 per region, ascending.
pub fn region_success_rates(view: &FilteredView) -> Vec<(String, f64)> {
    let mut by_region: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for rec in view.rows() {
        let entry = by_region.entry(rec.region.clone()).or_default();
        entry.0 += 1;
        entry.1 += rec.success as u64;
    }
    let mut rows: Vec<(String, f64)> = by_region
        .into_iter()
        .map(|(region, (n, s))| (region, s as f64 / n as f64 * 100.0))
        .collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1));
    rows
}

/// mean(nkill) per region over non-null values, ascending. Regions where
/// every nkill is null are omitted.
pub fn region_lethality(view: &FilteredView) -> Vec<(String, f64)> {
    let mut by_region: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    for rec in view.rows() {
        if let Some(nkill) = rec.nkill {
            let entry = by_region.entry(rec.region.clone()).or_default();
            entry.0 += nkill;
            entry.1 += 1;
        }
    }
    let mut rows: Vec<(String, f64)> = by_region
        .into_iter()
        .map(|(region, (sum, n))| (region, sum / n as f64))
        .collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1));
    rows
}

/// Pairwise Pearson correlation over {nkill, nwound, success, year}, using
/// pairwise-complete rows (both values non-null).
pub fn correlation_matrix(view: &FilteredView) -> CorrelationMatrix {
    fn field(rec: &Record, i: usize) -> Option<f64> {
        match i {
            0 => rec.nkill,
            1 => rec.nwound,
            2 => Some(rec.success as u8 as f64),
            _ => Some(rec.year as f64),
        }
    }

    let mut cells = [[None; 4]; 4];
    for i in 0..4 {
        for j in i..4 {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for rec in view.rows() {
                if let (Some(x), Some(y)) = (field(rec, i), field(rec, j)) {
                    xs.push(x);
                    ys.push(y);
                }
            }
            let r = pearson(&xs, &ys);
            cells[i][j] = r;
            cells[j][i] = r;
        }
    }
    CorrelationMatrix {
        labels: CORRELATION_LABELS,
        cells,
    }
}

/// Means, maxima, peak year, and category modes over the view.
pub fn summary_stats(view: &FilteredView, yearly: &[YearRow]) -> SummaryStats {
    SummaryStats {
        avg_killed: mean(view.rows().map(|r| r.nkill)),
        avg_wounded: mean(view.rows().map(|r| r.nwound)),
        success_rate_pct: success_rate_pct(view.rows()),
        max_killed: max(view.rows().filter_map(|r| r.nkill)),
        max_wounded: max(view.rows().filter_map(|r| r.nwound)),
        // yearly is ascending by year and max_by_key keeps the last maximal
        // element, so scan in reverse to make ties keep the earliest year.
        peak_year: yearly
            .iter()
            .rev()
            .max_by_key(|row| row.attacks)
            .map(|row| row.year),
        top_country: mode(view.rows().map(|r| r.country.as_str())),
        top_attack_type: mode(view.rows().map(|r| r.attack_type.as_str())),
        top_target_type: mode(view.rows().filter_map(|r| r.target_type.as_deref())),
    }
}

/// Rows with both coordinates, down-sampled deterministically to at most
/// [`GEO_SAMPLE_MAX`] points. The marker size keeps the source's quirk of
/// treating a null nkill as 1 (sums elsewhere treat it as 0).
pub fn geo_sample(view: &FilteredView) -> Vec<GeoPoint> {
    let mut points: Vec<GeoPoint> = view
        .rows()
        .filter_map(|rec| match (rec.latitude, rec.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
                attack_type: rec.attack_type.clone(),
                country: rec.country.clone(),
                year: rec.year,
                size: rec.nkill.unwrap_or(1.0).clamp(1.0, 100.0),
            }),
            _ => None,
        })
        .collect();

    if points.len() > GEO_SAMPLE_MAX {
        let mut rng = StdRng::seed_from_u64(GEO_SAMPLE_SEED);
        let mut keep = rand::seq::index::sample(&mut rng, points.len(), GEO_SAMPLE_MAX).into_vec();
        keep.sort_unstable();
        points = keep.into_iter().map(|i| points[i].clone()).collect();
    }
    points
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Mean over the non-null values; `None` when there are none.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0u64;
    for v in values.flatten() {
        sum += v;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

fn max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.reduce(f64::max)
}

fn success_rate_pct<'a>(rows: impl Iterator<Item = &'a Record>) -> Option<f64> {
    mean(rows.map(|r| Some(r.success as u8 as f64))).map(|m| m * 100.0)
}

/// Linear-interpolation quantile over an ascending slice (the dataframe
/// default the source relied on). `None` on an empty slice.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Pearson correlation coefficient; `None` for fewer than two points or a
/// zero-variance side.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Most frequent value, ties broken by first occurrence in row order.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: HashMap<&str, (u64, usize)> = HashMap::new();
    for (idx, v) in values.enumerate() {
        let entry = counts.entry(v).or_insert((0, idx));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .min_by_key(|(_, (count, first))| (std::cmp::Reverse(*count), *first))
        .map(|(v, _)| v.to_string())
}

/// The `n` largest rows by `key`, descending; ties keep the input order
/// (the underlying sort is stable).
pub fn top_n_by<T: Clone>(rows: &[T], n: usize, key: impl Fn(&T) -> f64) -> Vec<T> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| key(b).total_cmp(&key(a)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::filter::{filter, FilterCriteria};
    use super::super::model::test_support::rec;
    use super::super::model::{Dataset, Record};
    use super::*;

    fn view_of(records: Vec<Record>) -> FilteredView {
        let ds = Arc::new(Dataset::from_records(records));
        let criteria = FilterCriteria::for_dataset(&ds);
        filter(&ds, &criteria)
    }

    fn empty_view() -> FilteredView {
        view_of(Vec::new())
    }

    #[test]
    fn yearly_trend_scenario() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(1999, "A", "X", "Bombing", Some(5.0), true),
            rec(2001, "B", "Y", "Assault", Some(0.0), false),
        ]));
        let criteria = FilterCriteria {
            year_lo: 2000,
            year_hi: 2020,
            ..FilterCriteria::default()
        };
        let view = filter(&ds, &criteria);
        assert_eq!(view.len(), 1);

        let yearly = yearly_trend(&view);
        assert_eq!(
            yearly,
            vec![YearRow {
                year: 2001,
                killed: 0.0,
                wounded: 0.0,
                attacks: 1,
                success_rate: 0.0,
            }]
        );
    }

    #[test]
    fn sums_treat_null_as_zero_means_exclude_it() {
        let view = view_of(vec![
            rec(2000, "A", "X", "Bombing", Some(4.0), true),
            rec(2000, "A", "X", "Bombing", None, true),
        ]);
        let yearly = yearly_trend(&view);
        assert_eq!(yearly[0].killed, 4.0);
        assert_eq!(yearly[0].attacks, 2);

        // mean(nkill) over the single non-null value, not over both rows.
        let stats = summary_stats(&view, &yearly);
        assert_eq!(stats.avg_killed, Some(4.0));
    }

    #[test]
    fn decade_buckets() {
        let view = view_of(vec![
            rec(1987, "A", "X", "Bombing", None, true),
            rec(2000, "A", "X", "Bombing", None, true),
        ]);
        let decades = decade_counts(&view);
        let labels: Vec<&str> = decades.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["1980s", "2000s"]);
    }

    #[test]
    fn monthly_pattern_excludes_invalid_months() {
        let mut r1 = rec(2000, "A", "X", "Bombing", None, true);
        r1.month = 0; // unknown-month sentinel
        let mut r2 = rec(2000, "A", "X", "Bombing", None, true);
        r2.month = 3;
        let view = view_of(vec![r1, r2]);
        let monthly = monthly_pattern(&view);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].month, 3);
        assert_eq!(monthly[0].name, "Mar");
        assert_eq!(monthly[0].attacks, 1);
    }

    #[test]
    fn group_ranking_excludes_unknown_and_tracks_activity_span() {
        let mut a = rec(1995, "A", "X", "Bombing", Some(2.0), true);
        a.group_name = "Alpha".into();
        let mut b = rec(2003, "A", "X", "Bombing", Some(3.0), false);
        b.group_name = "Alpha".into();
        let unknown = rec(2000, "A", "X", "Bombing", Some(9.0), true);

        let view = view_of(vec![a, b, unknown]);
        let groups = group_ranking(&view);
        assert_eq!(groups.len(), 1);
        let alpha = &groups[0];
        assert_eq!(alpha.group, "Alpha");
        assert_eq!(alpha.attacks, 2);
        assert_eq!(alpha.killed, 5.0);
        assert_eq!((alpha.first_year, alpha.last_year), (1995, 2003));
        assert_eq!(alpha.years_active, 9);
    }

    #[test]
    fn lethality_clip_drops_top_five_of_one_hundred() {
        let records: Vec<Record> = (1..=100)
            .map(|k| rec(2000, "A", "X", "Bombing", Some(k as f64), true))
            .collect();
        let view = view_of(records);
        let series = lethality_by_attack_type(&view);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].values.len(), 95);
        assert_eq!(*series[0].values.last().unwrap(), 95.0);
    }

    #[test]
    fn geo_sample_is_deterministic_and_exact() {
        let records: Vec<Record> = (0..6000)
            .map(|i| {
                let mut r = rec(2000, "A", "X", "Bombing", Some(1.0), true);
                r.latitude = Some(i as f64 / 100.0);
                r.longitude = Some(-(i as f64) / 100.0);
                r
            })
            .collect();
        let view = view_of(records);
        let first = geo_sample(&view);
        let second = geo_sample(&view);
        assert_eq!(first.len(), GEO_SAMPLE_MAX);
        assert_eq!(first, second);
    }

    #[test]
    fn geo_sample_skips_rows_without_coordinates_and_sizes_null_as_one() {
        let mut with_coords = rec(2000, "A", "X", "Bombing", None, true);
        with_coords.latitude = Some(1.0);
        with_coords.longitude = Some(2.0);
        let without = rec(2000, "A", "X", "Bombing", Some(5.0), true);

        let view = view_of(vec![with_coords, without]);
        let points = geo_sample(&view);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].size, 1.0);
    }

    #[test]
    fn mode_ties_break_by_first_occurrence() {
        let view = view_of(vec![
            rec(2000, "A", "Y", "Assault", None, true),
            rec(2000, "A", "X", "Bombing", None, true),
            rec(2000, "A", "Y", "Bombing", None, true),
            rec(2000, "A", "X", "Assault", None, true),
        ]);
        let stats = summary_stats(&view, &yearly_trend(&view));
        assert_eq!(stats.top_country.as_deref(), Some("Y"));
        assert_eq!(stats.top_attack_type.as_deref(), Some("Assault"));
        // target_type is null everywhere → explicit no-data sentinel.
        assert_eq!(stats.top_target_type, None);
    }

    #[test]
    fn peak_year_tie_keeps_the_earliest_year() {
        let view = view_of(vec![
            rec(2000, "A", "X", "Bombing", None, true),
            rec(2003, "A", "X", "Bombing", None, true),
            rec(2001, "A", "X", "Bombing", None, true),
            rec(2001, "A", "X", "Assault", None, true),
            rec(2003, "A", "X", "Assault", None, true),
        ]);
        // 2001 and 2003 are tied on two attacks each.
        let stats = summary_stats(&view, &yearly_trend(&view));
        assert_eq!(stats.peak_year, Some(2001));
    }

    #[test]
    fn correlation_matrix_basics() {
        let records: Vec<Record> = (0..10)
            .map(|i| {
                let mut r = rec(2000 + i, "A", "X", "Bombing", Some(i as f64), true);
                r.nwound = Some(2.0 * i as f64);
                r
            })
            .collect();
        let view = view_of(records);
        let corr = correlation_matrix(&view);

        // nkill and nwound are perfectly linearly related.
        assert!((corr.cells[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(corr.cells[0][1], corr.cells[1][0]);
        // success is constant → zero variance → no coefficient.
        assert_eq!(corr.cells[2][2], None);
        // year correlates with itself.
        assert!((corr.cells[3][3].unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn crosstab_counts_by_region_and_type() {
        let view = view_of(vec![
            rec(2000, "A", "X", "Bombing", None, true),
            rec(2000, "A", "X", "Assault", None, true),
            rec(2000, "B", "Y", "Bombing", None, true),
            rec(2001, "A", "X", "Bombing", None, true),
        ]);
        let ct = region_attack_crosstab(&view);
        assert_eq!(ct.regions, vec!["A", "B"]);
        assert_eq!(ct.attack_types, vec!["Assault", "Bombing"]);
        assert_eq!(ct.counts, vec![vec![1, 2], vec![0, 1]]);
    }

    #[test]
    fn regional_rates_sort_ascending() {
        let view = view_of(vec![
            rec(2000, "A", "X", "Bombing", Some(10.0), true),
            rec(2000, "A", "X", "Bombing", Some(10.0), true),
            rec(2000, "B", "Y", "Bombing", Some(1.0), true),
            rec(2000, "B", "Y", "Bombing", Some(1.0), false),
        ]);
        let success = region_success_rates(&view);
        assert_eq!(success[0].0, "B");
        assert_eq!(success[0].1, 50.0);
        assert_eq!(success[1], ("A".to_string(), 100.0));

        let lethality = region_lethality(&view);
        assert_eq!(lethality[0], ("B".to_string(), 1.0));
        assert_eq!(lethality[1], ("A".to_string(), 10.0));
    }

    #[test]
    fn top_n_is_stable_for_ties() {
        let view = view_of(vec![
            rec(2000, "A", "X", "Bombing", Some(1.0), true),
            rec(2000, "A", "Y", "Bombing", Some(1.0), true),
            rec(2000, "A", "Z", "Bombing", Some(1.0), true),
        ]);
        let countries = country_ranking(&view);
        let top = top_n_by(&countries, 2, |c| c.attacks as f64);
        // All tied on one attack each → keep name order.
        assert_eq!(top[0].country, "X");
        assert_eq!(top[1].country, "Y");
    }

    #[test]
    fn empty_view_degrades_gracefully() {
        let view = empty_view();
        let criteria = FilterCriteria::default();
        let agg = Aggregates::compute(&view, &criteria);

        assert_eq!(agg.kpis.attacks, 0);
        assert_eq!(agg.kpis.killed, 0.0);
        assert_eq!(agg.kpis.success_rate_pct, None);
        assert!(agg.yearly.is_empty());
        assert!(agg.monthly.is_empty());
        assert!(agg.decades.is_empty());
        assert!(agg.countries.is_empty());
        assert!(agg.top_groups_by_attacks.is_empty());
        assert!(agg.group_timeline.is_empty());
        assert!(agg.attack_types.is_empty());
        assert!(agg.lethality.is_empty());
        assert!(agg.targets.is_empty());
        assert!(agg.crosstab.regions.is_empty());
        assert!(agg.region_success.is_empty());
        assert!(agg.geo.is_empty());
        assert_eq!(agg.summary, SummaryStats::default());
        assert_eq!(agg.correlation.cells, [[None; 4]; 4]);
    }

    #[test]
    fn regional_timeline_only_without_region_filter() {
        let view = view_of(vec![rec(2000, "A", "X", "Bombing", None, true)]);

        let unrestricted = FilterCriteria::default();
        let agg = Aggregates::compute(&view, &unrestricted);
        assert!(agg.regional_timeline.is_some());

        let restricted = FilterCriteria {
            region: Some("A".into()),
            ..FilterCriteria::default()
        };
        let agg = Aggregates::compute(&view, &restricted);
        assert!(agg.regional_timeline.is_none());
    }

    #[test]
    fn group_timeline_restricted_to_top_groups() {
        let mut records = Vec::new();
        for (name, n) in [("Alpha", 6), ("Beta", 5), ("Gamma", 4), ("Delta", 3), ("Eps", 2), ("Zeta", 1)] {
            for i in 0..n {
                let mut r = rec(2000 + i, "A", "X", "Bombing", None, true);
                r.group_name = name.into();
                records.push(r);
            }
        }
        let view = view_of(records);
        let agg = Aggregates::compute(&view, &FilterCriteria::default());

        // Zeta is sixth by attack count, so it never reaches the timeline.
        assert!(agg.group_timeline.iter().all(|row| row.group != "Zeta"));
        assert!(agg.group_timeline.iter().any(|row| row.group == "Alpha"));
        assert_eq!(agg.top_groups_by_attacks[0].group, "Alpha");
    }
}
