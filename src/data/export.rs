use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use super::model::{Block, Cell, Document, MeasurementKind, MetadataValue, Table, BLOCK_ID_COLUMN};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Export a document to a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the assembled table, missing cells as empty fields
/// * `.json`    – header plus per-block `{index, vars, columns, data}`
/// * `.parquet` – the assembled table, missing cells as nulls
pub fn export_file(document: &Document, path: &Path) -> Result<()> {
    let all: Vec<usize> = (0..document.block_count()).collect();
    export_blocks(document, &all, path)
}

/// Like [`export_file`], restricted to the blocks whose indices are in
/// `selected` (e.g. the result of `filter::filtered_blocks`).
pub fn export_blocks(document: &Document, selected: &[usize], path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let blocks = || {
        document
            .blocks()
            .iter()
            .filter(|b| selected.contains(&b.index()))
    };

    match ext.as_str() {
        "csv" => {
            let file = File::create(path).context("creating CSV file")?;
            write_csv(&Table::from_blocks(blocks()), file)
        }
        "json" => {
            let file = File::create(path).context("creating JSON file")?;
            write_json(document, blocks(), BufWriter::new(file))
        }
        "parquet" | "pq" => write_parquet(&Table::from_blocks(blocks()), path),
        other => bail!("Unsupported export extension: .{other}"),
    }?;

    log::info!("exported {} blocks to {}", blocks().count(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Header row of every table column; one record per table row.
/// CSV has no null, so missing cells are written as empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.columns())
        .context("writing CSV header")?;

    for (row_no, row) in table.rows().iter().enumerate() {
        let mut record: Vec<String> = row
            .cells
            .iter()
            .map(|c| match c {
                Cell::Value(v) => v.to_string(),
                Cell::Missing => String::new(),
            })
            .collect();
        record.push(row.block_id.to_string());
        wtr.write_record(&record)
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }

    wtr.flush().context("flushing CSV output")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonDocument<'a> {
    inputs: &'a [String],
    outputs: &'a [String],
    values: &'a BTreeMap<String, MetadataValue>,
    measurement_kind: MeasurementKind,
    blocks: Vec<JsonBlock<'a>>,
}

#[derive(Serialize)]
struct JsonBlock<'a> {
    index: usize,
    vars: BTreeMap<&'a str, f64>,
    columns: &'a [String],
    data: Vec<&'a [f64]>,
}

/// Block-oriented JSON, the shape an HTML report consumes:
///
/// ```json
/// {
///   "inputs": ["Vd", "Vg"], "outputs": ["Id"], "values": {"TEMP": 25.0},
///   "measurement_kind": "DcCv",
///   "blocks": [{"index": 0, "vars": {"Vg": 0.5}, "columns": ["Vd", "Id"],
///               "data": [[0.0, 1e-12], ...]}]
/// }
/// ```
pub fn write_blocks_json<W: Write>(document: &Document, writer: W) -> Result<()> {
    write_json(document, document.blocks(), writer)
}

fn write_json<'a, W: Write>(
    document: &'a Document,
    blocks: impl IntoIterator<Item = &'a Block>,
    writer: W,
) -> Result<()> {
    let blocks = blocks
        .into_iter()
        .map(|b| {
            let width = b.data_columns().len();
            JsonBlock {
                index: b.index(),
                vars: b.conditions().iter().map(|(n, v)| (n.as_str(), *v)).collect(),
                columns: b.data_columns(),
                data: b.rows().iter().map(|r| &r.values()[..width]).collect(),
            }
        })
        .collect();

    let doc = JsonDocument {
        inputs: document.inputs(),
        outputs: document.outputs(),
        values: document.values(),
        measurement_kind: document.measurement_kind(),
        blocks,
    };

    serde_json::to_writer_pretty(writer, &doc).context("writing JSON")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Arrow / Parquet
// ---------------------------------------------------------------------------

/// Convert a table to one Arrow record batch.
///
/// Data columns are nullable `Float64` (missing → null); `block_id` is a
/// non-null `UInt64`.
pub fn table_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields: Vec<Field> = table
        .data_columns()
        .iter()
        .map(|c| Field::new(c.as_str(), DataType::Float64, true))
        .collect();
    fields.push(Field::new(BLOCK_ID_COLUMN, DataType::UInt64, false));
    let schema = Arc::new(Schema::new(fields));

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());
    for i in 0..table.data_columns().len() {
        let values: Vec<Option<f64>> = table.rows().iter().map(|r| r.cells[i].as_f64()).collect();
        arrays.push(Arc::new(Float64Array::from(values)));
    }
    let ids: Vec<u64> = table.rows().iter().map(|r| r.block_id as u64).collect();
    arrays.push(Arc::new(UInt64Array::from(ids)));

    RecordBatch::try_new(schema, arrays).context("building Arrow record batch")
}

/// Write a table as a single-row-group Parquet file.
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = table_record_batch(table)?;
    let file = File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
