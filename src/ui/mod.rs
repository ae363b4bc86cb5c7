//! Presentation layer: filter controls, toolbar, and chart pages. Renders
//! the aggregate tables the data layer produces; owns no analytics itself.
pub mod charts;
pub mod panels;
