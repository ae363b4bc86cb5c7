use std::sync::Arc;

use super::model::{Dataset, Record};

// ---------------------------------------------------------------------------
// FilterCriteria – the user-selected predicates
// ---------------------------------------------------------------------------

/// Outcome selector: all incidents, only successful ones, or only failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    All,
    Successful,
    Failed,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::All, Outcome::Successful, Outcome::Failed];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::All => "All",
            Outcome::Successful => "Successful",
            Outcome::Failed => "Failed",
        }
    }

    fn matches(self, success: bool) -> bool {
        match self {
            Outcome::All => true,
            Outcome::Successful => success,
            Outcome::Failed => !success,
        }
    }
}

/// The full set of predicates narrowing the dataset to a view.
///
/// `None` plays the "All Regions" / "All Countries" / "All Types" role of
/// the sidebar sentinels; the year range is always set and inclusive on
/// both ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub year_lo: i32,
    pub year_hi: i32,
    pub region: Option<String>,
    pub country: Option<String>,
    pub attack_type: Option<String>,
    pub outcome: Outcome,
}

impl FilterCriteria {
    /// Unrestricted criteria: full year span of the dataset, no category
    /// predicates.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let (lo, hi) = dataset.year_range;
        FilterCriteria {
            year_lo: lo,
            year_hi: hi,
            ..FilterCriteria::default()
        }
    }

    /// Repair UI-driven invariant violations instead of propagating them:
    /// inverted year bounds reset to the dataset's full span, and a country
    /// outside the selected region's country set resets to "All Countries".
    pub fn validated(mut self, dataset: &Dataset) -> Self {
        if self.year_lo > self.year_hi {
            log::warn!(
                "inverted year range {}..{} reset to dataset span",
                self.year_lo,
                self.year_hi
            );
            (self.year_lo, self.year_hi) = dataset.year_range;
        }
        if let Some(country) = &self.country {
            let candidates = dataset.countries_in_region(self.region.as_deref());
            if !candidates.iter().any(|c| c == country) {
                log::warn!(
                    "country {country:?} is not in the selected region, resetting to all"
                );
                self.country = None;
            }
        }
        self
    }

    fn matches(&self, rec: &Record) -> bool {
        if rec.year < self.year_lo || rec.year > self.year_hi {
            return false;
        }
        if let Some(region) = &self.region {
            if rec.region != *region {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if rec.country != *country {
                return false;
            }
        }
        if let Some(attack_type) = &self.attack_type {
            if rec.attack_type != *attack_type {
                return false;
            }
        }
        self.outcome.matches(rec.success)
    }
}

// ---------------------------------------------------------------------------
// FilteredView – the rows passing the current criteria
// ---------------------------------------------------------------------------

/// The subset of dataset rows satisfying some `FilterCriteria`, preserving
/// dataset order. A fresh value per filter invocation; never mutated.
#[derive(Debug, Clone)]
pub struct FilteredView {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
}

impl FilteredView {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate the matching records in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.indices.iter().map(|&i| &self.dataset.records[i])
    }
}

/// Apply the criteria to the dataset and return the matching row indices.
///
/// All predicates are conjunctive; the criteria are validated (clamped)
/// first, so an inconsistent selection can never yield a mixed view.
pub fn filter(dataset: &Arc<Dataset>, criteria: &FilterCriteria) -> FilteredView {
    let criteria = criteria.clone().validated(dataset);
    let indices = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| criteria.matches(rec))
        .map(|(i, _)| i)
        .collect();
    FilteredView {
        dataset: Arc::clone(dataset),
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::super::model::test_support::rec;
    use super::*;

    fn two_row_dataset() -> Arc<Dataset> {
        Arc::new(Dataset::from_records(vec![
            rec(1999, "A", "X", "Bombing", Some(5.0), true),
            rec(2001, "B", "Y", "Assault", Some(0.0), false),
        ]))
    }

    #[test]
    fn year_range_is_inclusive_on_both_ends() {
        let ds = two_row_dataset();
        let criteria = FilterCriteria {
            year_lo: 1999,
            year_hi: 2001,
            ..FilterCriteria::default()
        };
        assert_eq!(filter(&ds, &criteria).len(), 2);

        let criteria = FilterCriteria {
            year_lo: 2000,
            year_hi: 2020,
            ..FilterCriteria::default()
        };
        let view = filter(&ds, &criteria);
        assert_eq!(view.len(), 1);
        assert_eq!(view.rows().next().unwrap().year, 2001);
    }

    #[test]
    fn every_view_row_satisfies_all_predicates() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(1999, "A", "X", "Bombing", Some(5.0), true),
            rec(2000, "A", "X", "Assault", None, false),
            rec(2001, "B", "Y", "Bombing", Some(1.0), true),
            rec(2002, "A", "Z", "Bombing", Some(2.0), true),
        ]));
        let criteria = FilterCriteria {
            year_lo: 1999,
            year_hi: 2002,
            region: Some("A".into()),
            attack_type: Some("Bombing".into()),
            outcome: Outcome::Successful,
            ..FilterCriteria::default()
        };
        let view = filter(&ds, &criteria);
        assert!(view.len() <= ds.len());
        assert_eq!(view.len(), 2);
        for row in view.rows() {
            assert_eq!(row.region, "A");
            assert_eq!(row.attack_type, "Bombing");
            assert!(row.success);
        }
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(1999, "A", "X", "Bombing", Some(5.0), true),
            rec(2001, "B", "Y", "Assault", Some(0.0), false),
            rec(2005, "A", "X", "Bombing", None, true),
        ]));
        let criteria = FilterCriteria {
            year_lo: 2000,
            year_hi: 2010,
            region: Some("A".into()),
            ..FilterCriteria::default()
        };
        let once = filter(&ds, &criteria);

        // Re-apply the same criteria to the already-filtered rows.
        let refiltered = Arc::new(Dataset::from_records(once.rows().cloned().collect()));
        let twice = filter(&refiltered, &criteria);
        assert_eq!(once.len(), twice.len());
        assert!(once.rows().zip(twice.rows()).all(|(a, b)| a == b));
    }

    #[test]
    fn outcome_selector_is_three_valued() {
        let ds = two_row_dataset();
        let base = FilterCriteria::for_dataset(&ds);

        let all = filter(&ds, &base);
        assert_eq!(all.len(), 2);

        let successful = filter(
            &ds,
            &FilterCriteria {
                outcome: Outcome::Successful,
                ..base.clone()
            },
        );
        assert!(successful.rows().all(|r| r.success));
        assert_eq!(successful.len(), 1);

        let failed = filter(
            &ds,
            &FilterCriteria {
                outcome: Outcome::Failed,
                ..base
            },
        );
        assert!(failed.rows().all(|r| !r.success));
        assert_eq!(failed.len(), 1);
    }

    #[test]
    fn country_outside_selected_region_is_reset_not_mixed() {
        let ds = two_row_dataset();
        // Region "A" selected, but country "Y" lives in region "B".
        let criteria = FilterCriteria {
            year_lo: 1999,
            year_hi: 2001,
            region: Some("A".into()),
            country: Some("Y".into()),
            ..FilterCriteria::default()
        };
        let validated = criteria.clone().validated(&ds);
        assert_eq!(validated.country, None);

        // The view must behave as if only the region predicate were active,
        // never silently mix the two.
        let view = filter(&ds, &criteria);
        assert_eq!(view.len(), 1);
        assert!(view.rows().all(|r| r.region == "A"));
    }

    #[test]
    fn inverted_year_bounds_reset_to_dataset_span() {
        let ds = two_row_dataset();
        let criteria = FilterCriteria {
            year_lo: 2010,
            year_hi: 1990,
            ..FilterCriteria::default()
        };
        let validated = criteria.clone().validated(&ds);
        assert_eq!((validated.year_lo, validated.year_hi), (1999, 2001));
        assert_eq!(filter(&ds, &criteria).len(), 2);
    }

    #[test]
    fn defaults_cover_the_whole_dataset() {
        let ds = two_row_dataset();
        let criteria = FilterCriteria::for_dataset(&ds);
        assert_eq!((criteria.year_lo, criteria.year_hi), (1999, 2001));
        assert_eq!(filter(&ds, &criteria).len(), ds.len());
    }
}
