use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{Dataset, Record};

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Columns every source file must carry. Values may be empty/null, but the
/// column itself has to be present.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "year",
    "month",
    "country",
    "city",
    "region",
    "latitude",
    "longitude",
    "attack_type",
    "target_type",
    "group_name",
    "nkill",
    "nwound",
    "success",
];

/// The source could not be read or is schema-incompatible. Fatal for the
/// load that raised it; no partial dataset is ever returned.
#[derive(Debug, Error)]
#[error("data unavailable: {reason}")]
pub struct DataUnavailable {
    reason: String,
}

impl From<anyhow::Error> for DataUnavailable {
    fn from(err: anyhow::Error) -> Self {
        DataUnavailable {
            reason: format!("{err:#}"),
        }
    }
}

/// Load a dataset through the process-wide cache.
///
/// The cache is keyed by canonical source path: repeated calls for the same
/// file return the identical `Arc<Dataset>` without re-reading it.
pub fn load_cached(path: &Path) -> Result<Arc<Dataset>, DataUnavailable> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let cache = dataset_cache().lock().expect("dataset cache lock");
    if let Some(dataset) = cache.get(&key) {
        log::debug!("dataset cache hit for {}", key.display());
        return Ok(Arc::clone(dataset));
    }
    drop(cache);

    let dataset = Arc::new(load_file(path)?);
    log::info!(
        "loaded {} incidents ({}–{}) from {}",
        dataset.len(),
        dataset.year_range.0,
        dataset.year_range.1,
        path.display()
    );
    dataset_cache()
        .lock()
        .expect("dataset cache lock")
        .insert(key, Arc::clone(&dataset));
    Ok(dataset)
}

fn dataset_cache() -> &'static Mutex<HashMap<PathBuf, Arc<Dataset>>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<Dataset>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Load a dataset from a file, dispatching by extension.
///
/// Supported formats:
/// * `.csv`     – delimited text with a header row (the native format)
/// * `.json`    – `[{ "year": 1999, "country": "...", ... }, ...]`
/// * `.parquet` – flat columnar rendition of the same schema
pub fn load_file(path: &Path) -> Result<Dataset, DataUnavailable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let result = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(anyhow!("unsupported file extension: .{other}")),
    };
    result.map_err(DataUnavailable::from)
}

fn check_required_columns<'a>(present: impl Iterator<Item = &'a str>) -> Result<()> {
    let present: BTreeSet<&str> = present.collect();
    for col in REQUIRED_COLUMNS {
        if !present.contains(col) {
            bail!("missing required column '{col}'");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row decoding shared by the CSV and JSON loaders
// ---------------------------------------------------------------------------

/// One row as it appears on disk. Numeric fields arrive as floats because
/// dataframe exports render integers with a trailing `.0`.
#[derive(Debug, Deserialize)]
struct RawRecord {
    year: f64,
    month: Option<f64>,
    country: String,
    city: Option<String>,
    region: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    attack_type: String,
    target_type: Option<String>,
    group_name: String,
    nkill: Option<f64>,
    nwound: Option<f64>,
    success: f64,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Record {
            year: raw.year as i32,
            // 0 is the source's unknown-month sentinel.
            month: raw.month.map(|m| m as i32).unwrap_or(0),
            country: raw.country,
            city: raw.city.filter(|c| !c.is_empty()),
            region: raw.region,
            latitude: raw.latitude,
            longitude: raw.longitude,
            attack_type: raw.attack_type,
            target_type: raw.target_type.filter(|t| !t.is_empty()),
            group_name: raw.group_name,
            nkill: raw.nkill,
            nwound: raw.nwound,
            success: raw.success != 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    check_required_columns(headers.iter())?;

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<RawRecord>().enumerate() {
        let raw = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(raw.into());
    }
    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (the default `df.to_json(orient='records')`).
/// An empty array carries no column schema to verify, so it is rejected
/// rather than silently loaded as an empty dataset.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("expected top-level JSON array")?;
    let first = rows
        .first()
        .context("empty JSON array: no rows to verify the column schema against")?;
    let obj = first.as_object().context("row 0 is not a JSON object")?;
    check_required_columns(obj.keys().map(|k| k.as_str()))?;

    let mut records = Vec::with_capacity(rows.len());
    for (row_no, row) in rows.iter().enumerate() {
        let raw: RawRecord = serde_json::from_value(row.clone())
            .with_context(|| format!("JSON row {row_no}"))?;
        records.push(raw.into());
    }
    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Flat Parquet rendition of the incident schema: scalar columns only, no
/// nesting. Works with files written by both Pandas and Polars.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    // Check the file schema up front: a file with zero row groups must
    // still fail when a column is missing.
    check_required_columns(builder.schema().fields().iter().map(|f| f.name().as_str()))?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let column = |name: &str| -> Result<&ArrayRef> {
            Ok(batch.column(
                schema
                    .index_of(name)
                    .map_err(|_| anyhow!("missing required column '{name}'"))?,
            ))
        };

        let year = column("year")?;
        let month = column("month")?;
        let country = column("country")?;
        let city = column("city")?;
        let region = column("region")?;
        let latitude = column("latitude")?;
        let longitude = column("longitude")?;
        let attack_type = column("attack_type")?;
        let target_type = column("target_type")?;
        let group_name = column("group_name")?;
        let nkill = column("nkill")?;
        let nwound = column("nwound")?;
        let success = column("success")?;

        for row in 0..batch.num_rows() {
            records.push(Record {
                year: number_at(year, row)
                    .with_context(|| format!("row {row}: missing or non-numeric 'year'"))?
                    as i32,
                month: number_at(month, row).map(|m| m as i32).unwrap_or(0),
                country: string_at(country, row)
                    .with_context(|| format!("row {row}: missing 'country'"))?,
                city: string_at(city, row),
                region: string_at(region, row)
                    .with_context(|| format!("row {row}: missing 'region'"))?,
                latitude: number_at(latitude, row),
                longitude: number_at(longitude, row),
                attack_type: string_at(attack_type, row)
                    .with_context(|| format!("row {row}: missing 'attack_type'"))?,
                target_type: string_at(target_type, row),
                group_name: string_at(group_name, row)
                    .with_context(|| format!("row {row}: missing 'group_name'"))?,
                nkill: number_at(nkill, row),
                nwound: number_at(nwound, row),
                success: number_at(success, row)
                    .with_context(|| format!("row {row}: missing 'success'"))?
                    != 0.0,
            });
        }
    }
    Ok(Dataset::from_records(records))
}

// -- Arrow helpers --

/// Read a numeric (or boolean) cell as `f64`; `None` for nulls and
/// non-numeric column types.
fn number_at(col: &ArrayRef, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => Some(col.as_any().downcast_ref::<Float64Array>()?.value(row)),
        DataType::Float32 => Some(col.as_any().downcast_ref::<Float32Array>()?.value(row) as f64),
        DataType::Int64 => Some(col.as_any().downcast_ref::<Int64Array>()?.value(row) as f64),
        DataType::Int32 => Some(col.as_any().downcast_ref::<Int32Array>()?.value(row) as f64),
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>()?;
            Some(arr.value(row) as u8 as f64)
        }
        _ => None,
    }
}

/// Read a string cell; `None` for nulls, empty strings, and non-string
/// column types.
fn string_at(col: &ArrayRef, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col.as_any().downcast_ref::<StringArray>()?;
            Some(arr.value(row).to_string()).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}
