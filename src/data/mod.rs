/// Data layer: core types, loading, cleaning, filtering and statistics.
///
/// Architecture:
/// ```text
///  remote .csv / local .csv .json .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  source → RawTable (missing cells as None)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  drop incomplete rows, fix names, type columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<NeighborhoodRecord>, region index
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  filter   │   │  stats    │  per-region aggregates
///   └──────────┘   └──────────┘
/// ```

pub mod clean;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
