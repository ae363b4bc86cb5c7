use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::data::aggregate::Aggregates;
use crate::data::filter::{filter, FilterCriteria, FilteredView};
use crate::data::loader;
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Trends,
    Map,
    Attacks,
    Groups,
    Insights,
    Data,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Trends,
        Tab::Map,
        Tab::Attacks,
        Tab::Groups,
        Tab::Insights,
        Tab::Data,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Trends => "Trends",
            Tab::Map => "Map",
            Tab::Attacks => "Attacks",
            Tab::Groups => "Groups",
            Tab::Insights => "Insights",
            Tab::Data => "Data",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// The presentation layer owns the current selection; every criteria change
/// runs one validate → filter → aggregate pass over the immutable dataset.
#[derive(Default)]
pub struct AppState {
    /// Loaded dataset (None until a file is opened).
    pub dataset: Option<Arc<Dataset>>,
    /// Where the dataset came from, for the title bar.
    pub source_path: Option<PathBuf>,

    /// Current filter selections.
    pub criteria: FilterCriteria,

    /// Rows passing the current criteria (recomputed per change).
    pub view: Option<FilteredView>,
    /// All aggregate tables for the current view (recomputed per change).
    pub aggregates: Option<Aggregates>,

    pub tab: Tab,

    /// Stable category colours for chart series.
    pub region_colors: ColorMap,
    pub attack_type_colors: ColorMap,
    pub group_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Load a dataset through the loader cache, surfacing failures in the
    /// status line.
    pub fn load_from_path(&mut self, path: &Path) {
        match loader::load_cached(path) {
            Ok(dataset) => {
                self.source_path = Some(path.to_path_buf());
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("failed to load {}: {e}", path.display());
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Ingest a newly loaded dataset: reset criteria to the full span,
    /// rebuild category colours, and run the first filter pass.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.criteria = FilterCriteria::for_dataset(&dataset);
        self.region_colors = ColorMap::new(dataset.regions.iter().map(String::as_str));
        self.attack_type_colors = ColorMap::new(dataset.attack_types.iter().map(String::as_str));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the view and all aggregates after a criteria change.
    pub fn refilter(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        // Clamp UI-driven invariant violations before filtering.
        self.criteria = self.criteria.clone().validated(dataset);

        let view = filter(dataset, &self.criteria);
        let aggregates = Aggregates::compute(&view, &self.criteria);

        self.group_colors = ColorMap::new(
            aggregates
                .top_groups_by_attacks
                .iter()
                .map(|g| g.group.as_str()),
        );
        self.view = Some(view);
        self.aggregates = Some(aggregates);
    }

    /// Replace the criteria and recompute if anything actually changed.
    pub fn apply_criteria(&mut self, criteria: FilterCriteria) {
        if criteria != self.criteria {
            self.criteria = criteria;
            self.refilter();
        }
    }
}
