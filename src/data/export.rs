use anyhow::{Context, Result};

use super::aggregate::SummaryStats;
use super::filter::FilteredView;
use super::loader::REQUIRED_COLUMNS;
use super::model::Record;

// ---------------------------------------------------------------------------
// CSV export of the filtered view and its summary statistics
// ---------------------------------------------------------------------------

/// Serialize the filtered view as CSV, preserving the schema's column order
/// and the dataset's native row order. Nulls become empty fields; `success`
/// is re-encoded as 0/1 like the source.
pub fn filtered_view_csv(view: &FilteredView) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(REQUIRED_COLUMNS)
        .context("writing CSV header")?;

    for rec in view.rows() {
        writer
            .write_record(record_fields(rec))
            .context("writing CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV writer: {e}"))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn record_fields(rec: &Record) -> [String; 13] {
    [
        rec.year.to_string(),
        rec.month.to_string(),
        rec.country.clone(),
        rec.city.clone().unwrap_or_default(),
        rec.region.clone(),
        opt_number(rec.latitude),
        opt_number(rec.longitude),
        rec.attack_type.clone(),
        rec.target_type.clone().unwrap_or_default(),
        rec.group_name.clone(),
        opt_number(rec.nkill),
        opt_number(rec.nwound),
        if rec.success { "1" } else { "0" }.to_string(),
    ]
}

fn opt_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize the summary statistics as a two-column metric/value CSV.
/// Missing statistics (empty view) serialize as empty values.
pub fn summary_stats_csv(stats: &SummaryStats) -> Result<String> {
    let rows: [(&str, String); 9] = [
        ("avg_killed", opt_number(stats.avg_killed)),
        ("avg_wounded", opt_number(stats.avg_wounded)),
        ("success_rate_pct", opt_number(stats.success_rate_pct)),
        ("max_killed", opt_number(stats.max_killed)),
        ("max_wounded", opt_number(stats.max_wounded)),
        (
            "peak_year",
            stats.peak_year.map(|y| y.to_string()).unwrap_or_default(),
        ),
        ("top_country", stats.top_country.clone().unwrap_or_default()),
        (
            "top_attack_type",
            stats.top_attack_type.clone().unwrap_or_default(),
        ),
        (
            "top_target_type",
            stats.top_target_type.clone().unwrap_or_default(),
        ),
    ];

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["metric", "value"])
        .context("writing CSV header")?;
    for (metric, value) in rows {
        writer
            .write_record([metric, &value])
            .context("writing CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV writer: {e}"))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::aggregate::{summary_stats, yearly_trend};
    use super::super::filter::{filter, FilterCriteria};
    use super::super::model::test_support::rec;
    use super::super::model::Dataset;
    use super::*;

    #[test]
    fn header_order_and_row_order_are_preserved() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(2001, "B", "Y", "Assault", None, false),
            rec(1999, "A", "X", "Bombing", Some(5.0), true),
        ]));
        let view = filter(&ds, &FilterCriteria::for_dataset(&ds));
        let csv = filtered_view_csv(&view).unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), REQUIRED_COLUMNS.join(","));
        // Native row order: 2001 row first, as in the source.
        assert_eq!(lines.next().unwrap(), "2001,1,Y,,B,,,Assault,,Unknown,,,0");
        assert_eq!(lines.next().unwrap(), "1999,1,X,,A,,,Bombing,,Unknown,5,,1");
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn summary_csv_reports_empty_values_for_no_data() {
        let ds = Arc::new(Dataset::from_records(Vec::new()));
        let view = filter(&ds, &FilterCriteria::for_dataset(&ds));
        let stats = summary_stats(&view, &yearly_trend(&view));

        let csv = summary_stats_csv(&stats).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "metric,value");
        assert_eq!(lines.next().unwrap(), "avg_killed,");
        assert!(csv.lines().count() == 10);
    }
}
