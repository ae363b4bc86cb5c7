use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Record – one incident (one row of the source table)
// ---------------------------------------------------------------------------

/// A single recorded incident. Missing values are explicit `None`s, never
/// absent columns: the loader rejects files without the full schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: i32,
    /// 1–12, or an out-of-range sentinel (the source uses 0 for "unknown").
    pub month: i32,
    pub country: String,
    pub city: Option<String>,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub attack_type: String,
    pub target_type: Option<String>,
    /// "Unknown" is a valid value meaning the incident is unattributed.
    pub group_name: String,
    pub nkill: Option<f64>,
    pub nwound: Option<f64>,
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed category indices.
///
/// Immutable after construction: created once per source file, shared via
/// `Arc` for the rest of the session.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All incidents, in source-file order.
    pub records: Vec<Record>,
    /// `min(year)`/`max(year)` over all records; `(0, 0)` when empty.
    pub year_range: (i32, i32),
    /// Sorted distinct regions.
    pub regions: Vec<String>,
    /// Sorted distinct countries (all regions).
    pub countries: Vec<String>,
    /// Region → sorted set of countries observed in that region.
    pub countries_by_region: BTreeMap<String, BTreeSet<String>>,
    /// Sorted distinct attack types.
    pub attack_types: Vec<String>,
    /// Number of distinct group names ("Unknown" included).
    pub group_count: usize,
}

impl Dataset {
    /// Build the category indices from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut regions: BTreeSet<String> = BTreeSet::new();
        let mut countries: BTreeSet<String> = BTreeSet::new();
        let mut countries_by_region: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut attack_types: BTreeSet<String> = BTreeSet::new();
        let mut groups: BTreeSet<&str> = BTreeSet::new();

        let mut year_min = i32::MAX;
        let mut year_max = i32::MIN;

        for rec in &records {
            year_min = year_min.min(rec.year);
            year_max = year_max.max(rec.year);
            regions.insert(rec.region.clone());
            countries.insert(rec.country.clone());
            countries_by_region
                .entry(rec.region.clone())
                .or_default()
                .insert(rec.country.clone());
            attack_types.insert(rec.attack_type.clone());
            groups.insert(&rec.group_name);
        }

        let year_range = if records.is_empty() {
            (0, 0)
        } else {
            (year_min, year_max)
        };

        Dataset {
            group_count: groups.len(),
            records,
            year_range,
            regions: regions.into_iter().collect(),
            countries: countries.into_iter().collect(),
            countries_by_region,
            attack_types: attack_types.into_iter().collect(),
        }
    }

    /// Number of incidents.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Candidate countries for the country filter: all countries when no
    /// region is selected, otherwise exactly the countries observed in that
    /// region over the FULL dataset (never the filtered view).
    pub fn countries_in_region(&self, region: Option<&str>) -> Vec<String> {
        match region {
            None => self.countries.clone(),
            Some(r) => self
                .countries_by_region
                .get(r)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Informational summary for the sidebar.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            record_count: self.len(),
            year_range: self.year_range,
            country_count: self.countries.len(),
            group_count: self.group_count,
        }
    }
}

/// Headline numbers shown in the sidebar info block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSummary {
    pub record_count: usize,
    pub year_range: (i32, i32),
    pub country_count: usize,
    pub group_count: usize,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Record;

    /// Shorthand record builder for the data-layer tests.
    pub fn rec(
        year: i32,
        region: &str,
        country: &str,
        attack_type: &str,
        nkill: Option<f64>,
        success: bool,
    ) -> Record {
        Record {
            year,
            month: 1,
            country: country.to_string(),
            city: None,
            region: region.to_string(),
            latitude: None,
            longitude: None,
            attack_type: attack_type.to_string(),
            target_type: None,
            group_name: "Unknown".to_string(),
            nkill,
            nwound: None,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::rec;
    use super::*;

    #[test]
    fn indices_built_from_records() {
        let ds = Dataset::from_records(vec![
            rec(1999, "A", "X", "Bombing", Some(5.0), true),
            rec(2001, "B", "Y", "Assault", Some(0.0), false),
            rec(2003, "A", "Z", "Bombing", None, true),
        ]);

        assert_eq!(ds.year_range, (1999, 2003));
        assert_eq!(ds.regions, vec!["A", "B"]);
        assert_eq!(ds.countries, vec!["X", "Y", "Z"]);
        assert_eq!(ds.attack_types, vec!["Assault", "Bombing"]);
        assert_eq!(ds.countries_in_region(Some("A")), vec!["X", "Z"]);
        assert_eq!(ds.countries_in_region(Some("B")), vec!["Y"]);
        assert_eq!(ds.countries_in_region(None), vec!["X", "Y", "Z"]);
        assert!(ds.countries_in_region(Some("missing")).is_empty());
    }

    #[test]
    fn empty_dataset_summary() {
        let ds = Dataset::from_records(Vec::new());
        assert!(ds.is_empty());
        assert_eq!(ds.year_range, (0, 0));
        assert_eq!(ds.summary().country_count, 0);
    }
}
