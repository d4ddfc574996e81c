use std::collections::BTreeMap;
use std::path::Path;

use super::blocks::extract_blocks;
use super::header::{parse_values, parse_variables};
use super::model::{Document, MetadataValue, Variable};
use super::sections::{split_sections, Marker, Section};
use crate::error::{MdmError, Result};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Resource guards applied before parsing. `None` disables a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_bytes: Option<u64>,
    pub max_lines: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_bytes: Some(256 * 1024 * 1024),
            max_lines: Some(10_000_000),
        }
    }
}

impl ParseOptions {
    pub fn unlimited() -> Self {
        Self {
            max_bytes: None,
            max_lines: None,
        }
    }

    fn check_bytes(&self, actual: u64) -> Result<()> {
        match self.max_bytes {
            Some(limit) if actual > limit => Err(MdmError::FileTooLarge {
                what: "byte count",
                actual,
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn check_lines(&self, text: &str) -> Result<()> {
        if let Some(limit) = self.max_lines {
            let actual = text.lines().count();
            if actual > limit {
                return Err(MdmError::FileTooLarge {
                    what: "line count",
                    actual: actual as u64,
                    limit: limit as u64,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read and parse an MDM file.
///
/// The file is read in one go and closed before parsing starts. Bytes that
/// are not valid UTF-8 are replaced rather than rejected.
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Document> {
    let path = path.as_ref();
    options.check_bytes(std::fs::metadata(path)?.len())?;

    let bytes = std::fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("{}: invalid UTF-8, decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    let doc = parse_str(&text, options)?;
    log::info!(
        "parsed {}: {} inputs, {} outputs, {} blocks",
        path.display(),
        doc.inputs().len(),
        doc.outputs().len(),
        doc.block_count()
    );
    Ok(doc)
}

/// Parse MDM text held in memory.
pub fn parse_str(text: &str, options: &ParseOptions) -> Result<Document> {
    options.check_bytes(text.len() as u64)?;
    options.check_lines(text)?;

    let sections = split_sections(text)?;
    let data_start = sections
        .iter()
        .position(|s| matches!(s.marker, Marker::BeginDb | Marker::EndDb))
        .unwrap_or(sections.len());
    let (header, data) = sections.split_at(data_start);

    let header = parse_header(header)?;

    let declared: Vec<String> = header
        .inputs
        .iter()
        .chain(&header.outputs)
        .map(|v| v.name.clone())
        .collect();
    let blocks = extract_blocks(data, &declared, &declared)?;

    Ok(Document::new(
        header.inputs,
        header.outputs,
        header.values,
        blocks,
    ))
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

struct Header {
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    values: BTreeMap<String, MetadataValue>,
}

/// Position of each header marker; sections must appear in strictly
/// increasing rank, which rejects both duplicates and reordering.
fn rank(marker: Marker) -> u8 {
    match marker {
        Marker::BeginHeader => 0,
        Marker::Inputs => 1,
        Marker::Outputs => 2,
        Marker::Values => 3,
        Marker::EndHeader => 4,
        Marker::BeginDb | Marker::EndDb => 5,
    }
}

fn parse_header(sections: &[Section<'_>]) -> Result<Header> {
    let mut inputs = None;
    let mut outputs = None;
    let mut values = None;
    let mut terminated = false;
    let mut last: Option<&Section<'_>> = None;

    for section in sections {
        if let Some(prev) = last {
            if rank(section.marker) <= rank(prev.marker) {
                return Err(MdmError::malformed(
                    section.line,
                    format!("{} not allowed after {}", section.marker, prev.marker),
                ));
            }
        }
        last = Some(section);

        match section.marker {
            Marker::Inputs => inputs = Some(parse_variables(section)?),
            Marker::Outputs => outputs = Some(parse_variables(section)?),
            Marker::Values => values = Some(parse_values(section)?),
            Marker::EndHeader => terminated = true,
            _ => {}
        }

        if matches!(section.marker, Marker::BeginHeader | Marker::EndHeader) {
            for stray in section.content_lines() {
                log::warn!("line {}: ignoring '{}'", stray.number, stray.text);
            }
        }
    }

    let end_line = sections.last().map_or(0, |s| s.line);
    let inputs = inputs.ok_or_else(|| MdmError::malformed(end_line, "missing ICCAP_INPUTS section"))?;
    let outputs =
        outputs.ok_or_else(|| MdmError::malformed(end_line, "missing ICCAP_OUTPUTS section"))?;

    if !terminated {
        let open = last.map_or(Marker::Outputs, |s| s.marker);
        return Err(MdmError::malformed(
            end_line,
            format!("{open} section is not terminated by END_HEADER"),
        ));
    }

    Ok(Header {
        inputs,
        outputs,
        values: values.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "BEGIN_HEADER\n ICCAP_INPUTS\n  Vg V\n ICCAP_OUTPUTS\n  Id I\n ICCAP_VALUES\n  TEMP \"25\"\nEND_HEADER\n";

    #[test]
    fn header_only_file_has_no_blocks() {
        let doc = parse_str(HEADER, &ParseOptions::default()).unwrap();
        assert_eq!(doc.inputs(), &["Vg"]);
        assert_eq!(doc.outputs(), &["Id"]);
        assert_eq!(doc.values()["TEMP"], 25.0);
        assert_eq!(doc.block_count(), 0);
    }

    #[test]
    fn values_section_must_be_terminated() {
        let text = "ICCAP_INPUTS\nVg V\nICCAP_OUTPUTS\nId I\nICCAP_VALUES\nTEMP \"25\"\nBEGIN_DB\n1 2\n";
        assert!(matches!(
            parse_str(text, &ParseOptions::default()),
            Err(MdmError::MalformedFile { .. })
        ));
    }

    #[test]
    fn missing_inputs_or_outputs_is_malformed() {
        let text = "ICCAP_OUTPUTS\nId I\nEND_HEADER\n";
        assert!(parse_str(text, &ParseOptions::default()).is_err());
        let text = "ICCAP_INPUTS\nVg V\nEND_HEADER\n";
        assert!(parse_str(text, &ParseOptions::default()).is_err());
    }

    #[test]
    fn duplicate_or_reordered_sections_are_malformed() {
        let dup = "ICCAP_INPUTS\nVg V\nICCAP_INPUTS\nVd V\nICCAP_OUTPUTS\nId I\nEND_HEADER\n";
        assert!(parse_str(dup, &ParseOptions::default()).is_err());
        let swapped = "ICCAP_OUTPUTS\nId I\nICCAP_INPUTS\nVg V\nEND_HEADER\n";
        assert!(parse_str(swapped, &ParseOptions::default()).is_err());
        let late = format!("{HEADER}BEGIN_DB\n1 2\nEND_DB\nICCAP_VALUES\nX 1\n");
        assert!(parse_str(&late, &ParseOptions::default()).is_err());
    }

    #[test]
    fn size_guards_fail_fast() {
        let options = ParseOptions {
            max_bytes: Some(10),
            max_lines: None,
        };
        assert!(matches!(
            parse_str(HEADER, &options),
            Err(MdmError::FileTooLarge { what: "byte count", .. })
        ));

        let options = ParseOptions {
            max_bytes: None,
            max_lines: Some(3),
        };
        assert!(matches!(
            parse_str(HEADER, &options),
            Err(MdmError::FileTooLarge { what: "line count", .. })
        ));

        assert!(parse_str(HEADER, &ParseOptions::unlimited()).is_ok());
    }
}
