use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{MdmError, Result};

/// Name of the provenance column appended by [`Document::to_table`].
pub const BLOCK_ID_COLUMN: &str = "block_id";

// ---------------------------------------------------------------------------
// MetadataValue – one entry of the ICCAP_VALUES section
// ---------------------------------------------------------------------------

/// A metadata value: numeric when it parses with the MDM numeric grammar,
/// otherwise kept verbatim as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Number(v) => write!(f, "{v}"),
            MetadataValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(v) => Some(*v),
            MetadataValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Number(_) => None,
        }
    }
}

impl PartialEq<f64> for MetadataValue {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64() == Some(*other)
    }
}

impl PartialEq<&str> for MetadataValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

// ---------------------------------------------------------------------------
// Variable – one ICCAP_INPUTS / ICCAP_OUTPUTS declaration
// ---------------------------------------------------------------------------

/// IC-CAP sweep types that may appear in an input declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SweepKind {
    Lin,
    Log,
    List,
    Con,
    Sync,
    Seg,
}

impl SweepKind {
    pub fn from_keyword(token: &str) -> Option<SweepKind> {
        match token {
            "LIN" => Some(SweepKind::Lin),
            "LOG" => Some(SweepKind::Log),
            "LIST" => Some(SweepKind::List),
            "CON" => Some(SweepKind::Con),
            "SYNC" => Some(SweepKind::Sync),
            "SEG" => Some(SweepKind::Seg),
            _ => None,
        }
    }
}

/// A declared input or output variable.
///
/// Typical input line: `Vd V D GROUND SMU2 0.1 LIN 1 0 0.05 21 0.05`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    /// Second token of the declaration (`V`, `I`, `F`, ...).
    pub unit: Option<String>,
    pub sweep: Option<SweepKind>,
    /// Sweep order following the sweep keyword (1 = VAR1).
    pub sweep_order: Option<u32>,
    /// Every token after the name, verbatim.
    pub fields: Vec<String>,
}

/// Kind of measurement stored in the file, decided by the VAR1 unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasurementKind {
    /// DC or CV sweep (VAR1 in volts or amps): plain X-Y data.
    DcCv,
    /// Frequency sweep (VAR1 unit `F`): S-parameter data.
    SParameter,
}

// ---------------------------------------------------------------------------
// Block – one BEGIN_DB … END_DB sweep
// ---------------------------------------------------------------------------

/// One data line, aligned with its block's columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<f64>,
}

impl Row {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Row { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One measurement sweep.
///
/// Columns are the data-header columns followed by the block-local
/// `ICCAP_VAR` conditions; every row carries one value per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    index: usize,
    columns: Vec<String>,
    conditions: Vec<(String, f64)>,
    rows: Vec<Row>,
}

impl Block {
    pub(crate) fn new(
        index: usize,
        columns: Vec<String>,
        conditions: Vec<(String, f64)>,
        rows: Vec<Row>,
    ) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Block {
            index,
            columns,
            conditions,
            rows,
        }
    }

    /// 0-based position of the block in its file.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns read from the data lines, without the `ICCAP_VAR` conditions.
    pub fn data_columns(&self) -> &[String] {
        &self.columns[..self.columns.len() - self.conditions.len()]
    }

    /// `ICCAP_VAR` values in declaration order.
    pub fn conditions(&self) -> &[(String, f64)] {
        &self.conditions
    }

    pub fn condition(&self, name: &str) -> Option<f64> {
        self.conditions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at `row` in `column`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r.values[col])
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[col]).collect())
    }

    /// Row `row` as a `column → value` mapping.
    pub fn record(&self, row: usize) -> Option<BTreeMap<&str, f64>> {
        let r = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(r.values.iter().copied())
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Document – a fully parsed MDM file
// ---------------------------------------------------------------------------

/// A successfully parsed MDM file. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    values: BTreeMap<String, MetadataValue>,
    blocks: Vec<Block>,
}

impl Document {
    pub(crate) fn new(
        inputs: Vec<Variable>,
        outputs: Vec<Variable>,
        values: BTreeMap<String, MetadataValue>,
        blocks: Vec<Block>,
    ) -> Self {
        let input_names = inputs.iter().map(|v| v.name.clone()).collect();
        let output_names = outputs.iter().map(|v| v.name.clone()).collect();
        Document {
            inputs,
            outputs,
            input_names,
            output_names,
            values,
            blocks,
        }
    }

    /// Declared input names, first-declaration order, without duplicates.
    pub fn inputs(&self) -> &[String] {
        &self.input_names
    }

    /// Declared output names, first-declaration order, without duplicates.
    pub fn outputs(&self) -> &[String] {
        &self.output_names
    }

    pub fn input_variables(&self) -> &[Variable] {
        &self.inputs
    }

    pub fn output_variables(&self) -> &[Variable] {
        &self.outputs
    }

    /// Global `ICCAP_VALUES` metadata.
    pub fn values(&self) -> &BTreeMap<String, MetadataValue> {
        &self.values
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get_block(&self, index: usize) -> Result<&Block> {
        self.blocks.get(index).ok_or(MdmError::IndexOutOfRange {
            index,
            count: self.blocks.len(),
        })
    }

    /// S-parameter when the VAR1 input sweeps frequency, DC/CV otherwise.
    pub fn measurement_kind(&self) -> MeasurementKind {
        let var1_unit = self
            .inputs
            .iter()
            .find(|v| v.sweep_order == Some(1))
            .and_then(|v| v.unit.as_deref());
        match var1_unit {
            Some("F") => MeasurementKind::SParameter,
            _ => MeasurementKind::DcCv,
        }
    }

    /// Flatten every block into one block-tagged table.
    pub fn to_table(&self) -> Table {
        Table::from_blocks(&self.blocks)
    }
}

// ---------------------------------------------------------------------------
// Table – block-tagged union of all blocks
// ---------------------------------------------------------------------------

/// One cell of the assembled table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Cell {
    Value(f64),
    /// The row's block has no such column.
    Missing,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(*v),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(v) => write!(f, "{v}"),
            Cell::Missing => write!(f, "<missing>"),
        }
    }
}

/// One table row: the source block index plus one cell per data column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub block_id: usize,
    pub cells: Vec<Cell>,
}

/// Read-only, derived view over a document's blocks.
///
/// Columns are the union of all block columns in first-appearance order,
/// followed by [`BLOCK_ID_COLUMN`]. Rows keep block order, then the original
/// row order inside each block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl Table {
    pub fn from_blocks<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Block>,
    {
        let blocks: Vec<&Block> = blocks.into_iter().collect();
        let mut data_columns: Vec<String> = Vec::new();
        for block in &blocks {
            for col in block.columns() {
                if !data_columns.contains(col) {
                    data_columns.push(col.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(blocks.iter().map(|b| b.row_count()).sum());
        for block in &blocks {
            // Position of each table column inside this block, if any.
            let mapping: Vec<Option<usize>> = data_columns
                .iter()
                .map(|c| block.column_index(c))
                .collect();

            for row in block.rows() {
                let cells = mapping
                    .iter()
                    .map(|idx| match idx {
                        Some(i) => Cell::Value(row.values()[*i]),
                        None => Cell::Missing,
                    })
                    .collect();
                rows.push(TableRow {
                    block_id: block.index(),
                    cells,
                });
            }
        }

        let mut columns = data_columns;
        columns.push(BLOCK_ID_COLUMN.to_string());
        Table { columns, rows }
    }

    /// Every column name, `block_id` last.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column names excluding `block_id`; aligned with [`TableRow::cells`].
    pub fn data_columns(&self) -> &[String] {
        &self.columns[..self.columns.len() - 1]
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` / `column`; `block_id` is reported as a numeric value.
    pub fn get(&self, row: usize, column: &str) -> Option<Cell> {
        let r = self.rows.get(row)?;
        if column == BLOCK_ID_COLUMN {
            return Some(Cell::Value(r.block_id as f64));
        }
        let col = self.data_columns().iter().position(|c| c == column)?;
        Some(r.cells[col])
    }

    /// All cells of one data column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<Cell>> {
        let col = self.data_columns().iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.cells[col]).collect())
    }
}
