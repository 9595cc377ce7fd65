/// Data layer: core types, loading, joining, filtering and export.
///
/// Architecture:
/// ```text
///  .csv / .xlsx / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │  N tables
///        ▼
///   ┌──────────┐
///   │   join    │  full outer join on shared columns → Table | reason
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  include / exclude, exact or fuzzy (similarity)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Table → csv / json / parquet, preview
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod join;
pub mod loader;
pub mod model;
pub mod similarity;
