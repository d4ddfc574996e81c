//! # rusty-mdm
//!
//! Parser and tabulator for Keysight IC-CAP `.mdm` measurement files.
//!
//! ```no_run
//! use rusty_mdm::{parse_file, ParseOptions};
//!
//! let doc = parse_file("nmos_idvg.mdm", &ParseOptions::default())?;
//! println!("{} blocks, inputs {:?}", doc.block_count(), doc.inputs());
//! let table = doc.to_table();
//! # Ok::<(), rusty_mdm::MdmError>(())
//! ```
pub mod data;
pub mod error;

pub use data::model::{
    Block, Cell, Document, MeasurementKind, MetadataValue, Row, SweepKind, Table, TableRow,
    Variable, BLOCK_ID_COLUMN,
};
pub use data::parser::{parse_file, parse_str, ParseOptions};
pub use error::{MdmError, Result};
