use super::model::{Block, Row, BLOCK_ID_COLUMN};
use super::numeric::parse_number;
use super::sections::{Line, Marker, Section};
use crate::error::{MdmError, Result};

const VAR_KEYWORD: &str = "ICCAP_VAR";

/// Extract every measurement block from the data part of a file.
///
/// `sections` starts at the first `BEGIN_DB` (or stray `END_DB`).
/// `default_columns` (inputs followed by outputs) is used for blocks that
/// carry no `#` column header; `declared` is every declared variable name.
pub fn extract_blocks(
    sections: &[Section<'_>],
    default_columns: &[String],
    declared: &[String],
) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut open = false;

    for section in sections {
        match section.marker {
            Marker::BeginDb => {
                let block = parse_block(blocks.len(), section, default_columns, declared)?;
                log::debug!(
                    "block {}: {} rows x {} columns",
                    block.index(),
                    block.row_count(),
                    block.columns().len()
                );
                blocks.push(block);
                open = true;
            }
            Marker::EndDb => {
                if !open {
                    return Err(MdmError::malformed(
                        section.line,
                        "END_DB without a matching BEGIN_DB",
                    ));
                }
                if let Some(stray) = section.content_lines().next() {
                    return Err(MdmError::malformed(
                        stray.number,
                        "content outside of a BEGIN_DB ... END_DB block",
                    ));
                }
                open = false;
            }
            other => {
                return Err(MdmError::malformed(
                    section.line,
                    format!("{other} after the first data block"),
                ));
            }
        }
    }

    Ok(blocks)
}

fn parse_block(
    index: usize,
    section: &Section<'_>,
    default_columns: &[String],
    declared: &[String],
) -> Result<Block> {
    let mut conditions: Vec<(String, f64)> = Vec::new();
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for line in section.content_lines() {
        if line.text.split_whitespace().next() == Some(VAR_KEYWORD) {
            let (name, value) = parse_condition(index, line)?;
            match conditions.iter().position(|(n, _)| *n == name) {
                Some(i) => conditions[i].1 = value,
                None => conditions.push((name, value)),
            }
        } else if let Some(cols) = line.text.strip_prefix('#') {
            if header.is_some() {
                return Err(MdmError::malformed(
                    line.number,
                    format!("second column header in block {index}"),
                ));
            }
            if !rows.is_empty() {
                return Err(MdmError::malformed(
                    line.number,
                    format!("column header after data lines in block {index}"),
                ));
            }
            let cols: Vec<String> = cols.split_whitespace().map(str::to_string).collect();
            if cols.is_empty() {
                return Err(MdmError::malformed(
                    line.number,
                    format!("empty column header in block {index}"),
                ));
            }
            for col in cols.iter().filter(|c| !declared.contains(*c)) {
                log::warn!("block {index}: column '{col}' is not a declared input or output");
            }
            header = Some(cols);
        } else {
            let columns = header.as_deref().unwrap_or(default_columns);
            rows.push(parse_data_line(index, line, columns)?);
        }
    }

    let mut columns = header.unwrap_or_else(|| default_columns.to_vec());
    columns.extend(conditions.iter().map(|(n, _)| n.clone()));
    check_columns(index, section.line, &columns)?;

    let rows = rows
        .into_iter()
        .map(|mut values| {
            values.extend(conditions.iter().map(|(_, v)| *v));
            Row::new(values)
        })
        .collect();

    Ok(Block::new(index, columns, conditions, rows))
}

/// `ICCAP_VAR <name> <value>`
fn parse_condition(block: usize, line: &Line<'_>) -> Result<(String, f64)> {
    let tokens: Vec<&str> = line.text.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(MdmError::malformed(
            line.number,
            format!("expected 'ICCAP_VAR <name> <value>' in block {block}"),
        ));
    }
    let value = parse_number(tokens[2]).ok_or_else(|| MdmError::RowValue {
        block,
        line: line.number,
        column: tokens[1].to_string(),
        token: tokens[2].to_string(),
    })?;
    Ok((tokens[1].to_string(), value))
}

fn parse_data_line(block: usize, line: &Line<'_>, columns: &[String]) -> Result<Vec<f64>> {
    let tokens: Vec<&str> = line
        .text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() != columns.len() {
        return Err(MdmError::RowShape {
            block,
            line: line.number,
            expected: columns.len(),
            found: tokens.len(),
        });
    }

    tokens
        .iter()
        .zip(columns)
        .map(|(tok, col)| {
            parse_number(tok).ok_or_else(|| MdmError::RowValue {
                block,
                line: line.number,
                column: col.clone(),
                token: tok.to_string(),
            })
        })
        .collect()
}

fn check_columns(block: usize, line: usize, columns: &[String]) -> Result<()> {
    for (i, col) in columns.iter().enumerate() {
        if col == BLOCK_ID_COLUMN {
            return Err(MdmError::malformed(
                line,
                format!("block {block} uses the reserved column name '{BLOCK_ID_COLUMN}'"),
            ));
        }
        if columns[..i].contains(col) {
            return Err(MdmError::malformed(
                line,
                format!("column '{col}' appears twice in block {block}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sections::split_sections;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn extract(text: &str, default: &[&str]) -> Result<Vec<Block>> {
        let sections = split_sections(text)?;
        let default = cols(default);
        extract_blocks(&sections, &default, &default)
    }

    #[test]
    fn header_columns_and_conditions_are_combined() {
        let text = "BEGIN_DB\n ICCAP_VAR Vg 1.2\n #Vd Id\n 0 1e-12\n 0.05 2.5E-06\nEND_DB\n";
        let blocks = extract(text, &["Vd", "Vg", "Id"]).unwrap();

        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.columns(), &["Vd", "Id", "Vg"]);
        assert_eq!(b.data_columns(), &["Vd", "Id"]);
        assert_eq!(b.condition("Vg"), Some(1.2));
        assert_eq!(b.rows()[1].values(), &[0.05, 2.5e-6, 1.2]);
    }

    #[test]
    fn default_columns_apply_without_header() {
        let text = "BEGIN_DB\n1 2 3\n4, 5, 6\nEND_DB\n";
        let blocks = extract(text, &["Vg", "Vd", "Id"]).unwrap();
        assert_eq!(blocks[0].columns(), &["Vg", "Vd", "Id"]);
        assert_eq!(blocks[0].value(1, "Vd"), Some(5.0));
    }

    #[test]
    fn block_ends_at_next_begin_or_eof() {
        let text = "BEGIN_DB\n1 2\nBEGIN_DB\n3 4\n5 6\n";
        let blocks = extract(text, &["Vg", "Id"]).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].index(), 1);
        assert_eq!(blocks[1].row_count(), 2);
    }

    #[test]
    fn short_line_reports_block_and_line() {
        let text = "BEGIN_DB\n1 2\nEND_DB\nBEGIN_DB\n1 2\n3\nEND_DB\n";
        match extract(text, &["Vg", "Id"]) {
            Err(MdmError::RowShape {
                block,
                line,
                expected,
                found,
            }) => {
                assert_eq!((block, line, expected, found), (1, 6, 2, 1));
            }
            other => panic!("expected RowShape, got {other:?}"),
        }
    }

    #[test]
    fn bad_token_reports_column_and_token() {
        let text = "BEGIN_DB\n#Vg Id\n0.1 abc\nEND_DB\n";
        match extract(text, &[]) {
            Err(MdmError::RowValue {
                block,
                line,
                column,
                token,
            }) => {
                assert_eq!((block, line), (0, 3));
                assert_eq!(column, "Id");
                assert_eq!(token, "abc");
            }
            other => panic!("expected RowValue, got {other:?}"),
        }
    }

    #[test]
    fn stray_end_db_and_stray_content_are_malformed() {
        assert!(matches!(
            extract("END_DB\n", &[]),
            Err(MdmError::MalformedFile { line: 1, .. })
        ));
        assert!(matches!(
            extract("BEGIN_DB\n1\nEND_DB\n2\n", &["Vg"]),
            Err(MdmError::MalformedFile { line: 4, .. })
        ));
    }

    #[test]
    fn duplicate_or_reserved_columns_are_malformed() {
        assert!(extract("BEGIN_DB\n#Vg Vg\n1 2\n", &[]).is_err());
        assert!(extract("BEGIN_DB\nICCAP_VAR Vg 1\n#Vg Id\n1 2\n", &[]).is_err());
        assert!(extract("BEGIN_DB\n#block_id Id\n1 2\n", &[]).is_err());
    }

    #[test]
    fn header_after_data_is_malformed() {
        assert!(extract("BEGIN_DB\n1 2\n#Vg Id\n", &["Vg", "Id"]).is_err());
    }
}
