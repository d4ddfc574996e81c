use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use arrow::util::pretty::pretty_format_batches;

use rusty_mdm::data::export::{export_blocks, table_record_batch};
use rusty_mdm::data::filter::{filtered_blocks, ConditionFilter, ConditionValue};
use rusty_mdm::data::summary::summarize;
use rusty_mdm::{parse_file, ParseOptions, Table};

const USAGE: &str = "Usage: rusty-mdm <file.mdm> [--block N] [--export PATH] [--summary] \
                     [--where NAME=VALUE]... [--max-bytes N] [--max-lines N]";

struct Args {
    path: PathBuf,
    block: Option<usize>,
    export: Option<PathBuf>,
    summary: bool,
    /// Restricts the table, summary and export to blocks with these
    /// ICCAP_VAR values.
    conditions: ConditionFilter,
    options: ParseOptions,
}

fn parse_args() -> Result<Args> {
    let mut argv = env::args().skip(1);
    let mut path = None;
    let mut block = None;
    let mut export = None;
    let mut summary = false;
    let mut conditions = ConditionFilter::new();
    let mut options = ParseOptions::default();

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--block" => block = Some(flag_value(&mut argv, "--block")?),
            "--export" => {
                export = Some(PathBuf::from(
                    argv.next().context("--export requires a path")?,
                ))
            }
            "--summary" => summary = true,
            "--where" => {
                let raw = argv.next().context("--where requires NAME=VALUE")?;
                let (name, value) = raw
                    .split_once('=')
                    .with_context(|| format!("--where: '{raw}' is not NAME=VALUE"))?;
                let value: f64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("--where: '{value}' is not a number"))?;
                conditions
                    .entry(name.trim().to_string())
                    .or_default()
                    .insert(ConditionValue::new(value));
            }
            "--max-bytes" => options.max_bytes = Some(flag_value(&mut argv, "--max-bytes")?),
            "--max-lines" => options.max_lines = Some(flag_value(&mut argv, "--max-lines")?),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown flag {other}\n{USAGE}"),
            other => {
                if path.replace(PathBuf::from(other)).is_some() {
                    bail!("only one input file may be given\n{USAGE}");
                }
            }
        }
    }

    Ok(Args {
        path: path.context(USAGE)?,
        block,
        export,
        summary,
        conditions,
        options,
    })
}

fn flag_value<T: std::str::FromStr>(argv: &mut impl Iterator<Item = String>, flag: &str) -> Result<T> {
    let raw = argv
        .next()
        .with_context(|| format!("{flag} requires a value"))?;
    raw.parse::<T>()
        .map_err(|_| anyhow::anyhow!("{flag}: '{raw}' is not a valid number"))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let doc = parse_file(&args.path, &args.options).map_err(|e| {
        log::error!("Failed to parse {}: {e}", args.path.display());
        e
    })?;

    println!("File: {}", args.path.display());
    println!("{}", "=".repeat(60));
    println!("Measurement kind: {:?}", doc.measurement_kind());
    println!("Inputs:  {}", doc.inputs().join(", "));
    println!("Outputs: {}", doc.outputs().join(", "));
    if !doc.values().is_empty() {
        println!("Values:");
        for (key, value) in doc.values() {
            println!("  {key} = {value}");
        }
    }
    println!("Blocks: {}", doc.block_count());

    let selected: Vec<usize> = if args.conditions.is_empty() {
        (0..doc.block_count()).collect()
    } else {
        filtered_blocks(&doc, &args.conditions)
    };
    let table = Table::from_blocks(
        doc.blocks()
            .iter()
            .filter(|b| selected.contains(&b.index())),
    );
    println!("Table: {} rows x {} columns", table.len(), table.columns().len());

    if let Some(index) = args.block {
        let block = doc.get_block(index)?;
        let conditions: Vec<String> = block
            .conditions()
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect();
        println!("\nBlock {index} [{}]:", conditions.join(", "));
        let batch = table_record_batch(&Table::from_blocks([block]))?;
        println!("{}", pretty_format_batches(&[batch]).context("formatting block")?);
    }

    if args.summary {
        println!("\nSummary:");
        println!(
            "  {:<16} {:>6} {:>14} {:>14} {:>14} {:>14}",
            "column", "count", "min", "max", "mean", "std"
        );
        for s in summarize(&table) {
            let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.6e}"));
            println!(
                "  {:<16} {:>6} {:>14} {:>14} {:>14} {:>14}",
                s.column,
                s.count,
                fmt(s.min),
                fmt(s.max),
                fmt(s.mean),
                fmt(s.std)
            );
        }
    }

    if let Some(path) = &args.export {
        export_blocks(&doc, &selected, path)
            .with_context(|| format!("exporting to {}", path.display()))?;
        println!("\nExported to {}", path.display());
    }

    Ok(())
}
