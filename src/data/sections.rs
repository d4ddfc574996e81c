use std::fmt;

use crate::error::{MdmError, Result};

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Structural keywords recognised at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    BeginHeader,
    Inputs,
    Outputs,
    Values,
    EndHeader,
    BeginDb,
    EndDb,
}

impl Marker {
    const ALL: [Marker; 7] = [
        Marker::BeginHeader,
        Marker::Inputs,
        Marker::Outputs,
        Marker::Values,
        Marker::EndHeader,
        Marker::BeginDb,
        Marker::EndDb,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Marker::BeginHeader => "BEGIN_HEADER",
            Marker::Inputs => "ICCAP_INPUTS",
            Marker::Outputs => "ICCAP_OUTPUTS",
            Marker::Values => "ICCAP_VALUES",
            Marker::EndHeader => "END_HEADER",
            Marker::BeginDb => "BEGIN_DB",
            Marker::EndDb => "END_DB",
        }
    }

    /// Case-sensitive match of a line's first token.
    pub fn from_keyword(token: &str) -> Option<Marker> {
        Marker::ALL.into_iter().find(|m| m.keyword() == token)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One physical line of the source, trimmed, with its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// Blank lines and `!` comments carry no content.
    pub fn is_content(&self) -> bool {
        !self.text.is_empty() && !self.text.starts_with('!')
    }
}

/// A marker plus every line up to the next marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub marker: Marker,
    /// Line number of the marker itself.
    pub line: usize,
    pub body: Vec<Line<'a>>,
}

impl<'a> Section<'a> {
    /// Body lines that are neither blank nor comments.
    pub fn content_lines(&self) -> impl Iterator<Item = &Line<'a>> {
        self.body.iter().filter(|l| l.is_content())
    }
}

/// Split raw MDM text into its ordered sections.
///
/// Anything before the first marker (e.g. `! VERSION = 6.00`) is preamble and
/// dropped. Text with no recognised marker at all is rejected.
pub fn split_sections(text: &str) -> Result<Vec<Section<'_>>> {
    let mut sections: Vec<Section<'_>> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = Line {
            number: idx + 1,
            text: raw.trim(),
        };

        let first = line.text.split_whitespace().next().unwrap_or("");
        if let Some(marker) = Marker::from_keyword(first) {
            sections.push(Section {
                marker,
                line: line.number,
                body: Vec::new(),
            });
            continue;
        }

        // Preamble lines fall through here while `sections` is still empty.
        if let Some(current) = sections.last_mut() {
            current.body.push(line);
        }
    }

    if sections.is_empty() {
        return Err(MdmError::malformed(
            0,
            "no MDM section markers found (expected ICCAP_INPUTS, BEGIN_DB, ...)",
        ));
    }

    log::debug!("split {} sections", sections.len());
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_is_ignored_and_line_numbers_are_physical() {
        let text = "! VERSION = 6.00\nBEGIN_HEADER\n ICCAP_INPUTS\n  Vg V G GROUND SMU1 0.1 LIN 1 0 1 11 0.1\n";
        let sections = split_sections(text).unwrap();

        let markers: Vec<Marker> = sections.iter().map(|s| s.marker).collect();
        assert_eq!(markers, vec![Marker::BeginHeader, Marker::Inputs]);
        assert_eq!(sections[1].line, 3);
        assert_eq!(sections[1].body[0].number, 4);
        assert!(sections[1].body[0].text.starts_with("Vg V G"));
    }

    #[test]
    fn markers_are_case_sensitive_and_line_initial() {
        let text = "iccap_inputs\nfoo ICCAP_INPUTS\n";
        assert!(matches!(
            split_sections(text),
            Err(MdmError::MalformedFile { .. })
        ));
    }

    #[test]
    fn garbage_and_empty_input_are_malformed() {
        assert!(split_sections("").is_err());
        assert!(split_sections("hello\nworld\n").is_err());
    }

    #[test]
    fn crlf_is_accepted() {
        let text = "ICCAP_INPUTS\r\nVg V\r\nICCAP_OUTPUTS\r\nId I\r\n";
        let sections = split_sections(text).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].body[0].text, "Vg V");
    }

    #[test]
    fn content_lines_skip_comments_and_blanks() {
        let text = "ICCAP_VALUES\n\n! note\nTEMP \"25\"\n";
        let sections = split_sections(text).unwrap();
        let content: Vec<&str> = sections[0].content_lines().map(|l| l.text).collect();
        assert_eq!(content, vec!["TEMP \"25\""]);
    }
}
