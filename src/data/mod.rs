//! Data layer: core types, loading, filtering, aggregation, export.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Dataset (cached per source path)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset   │  Vec<Record>, category indices, year span
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  apply FilterCriteria → FilteredView
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  named aggregate tables (pure functions of the view)
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export   │  filtered rows / summary stats → CSV text
//!   └──────────┘
//! ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
