/// Data layer: section splitting, header/block extraction, model and export.
///
/// Architecture:
/// ```text
///      .mdm text
///        │
///        ▼
///   ┌──────────┐
///   │ sections │  marker scan → ordered (marker, body lines)
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  header   │   │  blocks  │  inputs / outputs / values, BEGIN_DB … END_DB
///   └──────────┘   └──────────┘
///        │              │
///        ▼              ▼
///   ┌──────────────────────┐
///   │  Document → Table    │  model: immutable, block-tagged table view
///   └──────────────────────┘
///        │
///        ▼
///   ┌──────────────────────┐
///   │ filter/summary/export│  block selection, aggregation, csv/json/parquet
///   └──────────────────────┘
/// ```

pub mod blocks;
pub mod export;
pub mod filter;
pub mod header;
pub mod model;
pub mod numeric;
pub mod parser;
pub mod sections;
pub mod summary;
