use std::collections::BTreeMap;

use super::model::{MetadataValue, SweepKind, Variable};
use super::numeric::parse_number;
use super::sections::{Line, Section};
use crate::error::{MdmError, Result};

// ---------------------------------------------------------------------------
// ICCAP_INPUTS / ICCAP_OUTPUTS
// ---------------------------------------------------------------------------

/// Parse the declarations of an inputs or outputs section.
///
/// The first token of each line is the variable name. A name declared twice
/// keeps its first declaration.
pub fn parse_variables(section: &Section<'_>) -> Result<Vec<Variable>> {
    let mut vars: Vec<Variable> = Vec::new();

    for line in section.content_lines() {
        let var = parse_declaration(line)?;
        if vars.iter().any(|v| v.name == var.name) {
            log::warn!(
                "line {}: {} '{}' declared twice, keeping the first declaration",
                line.number,
                section.marker,
                var.name
            );
            continue;
        }
        vars.push(var);
    }

    log::debug!("{}: {} variables", section.marker, vars.len());
    Ok(vars)
}

fn parse_declaration(line: &Line<'_>) -> Result<Variable> {
    let mut tokens = line.text.split_whitespace();
    let name = tokens.next().unwrap_or_default();
    if !is_identifier(name) {
        return Err(MdmError::malformed(
            line.number,
            format!("'{name}' is not a valid variable name"),
        ));
    }

    let fields: Vec<String> = tokens.map(str::to_string).collect();
    let unit = fields.first().cloned();

    let mut sweep = None;
    let mut sweep_order = None;
    for (i, tok) in fields.iter().enumerate() {
        if let Some(kind) = SweepKind::from_keyword(tok) {
            sweep = Some(kind);
            sweep_order = fields.get(i + 1).and_then(|o| o.parse::<u32>().ok());
            break;
        }
    }

    Ok(Variable {
        name: name.to_string(),
        unit,
        sweep,
        sweep_order,
        fields,
    })
}

/// `[A-Za-z_][A-Za-z0-9_.]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

// ---------------------------------------------------------------------------
// ICCAP_VALUES
// ---------------------------------------------------------------------------

/// Parse the global metadata of an `ICCAP_VALUES` section.
///
/// Accepts `KEY "text"`, `KEY=value`, `KEY = value` and `KEY value`. A key
/// given twice keeps the last value.
pub fn parse_values(section: &Section<'_>) -> Result<BTreeMap<String, MetadataValue>> {
    let mut values = BTreeMap::new();

    for line in section.content_lines() {
        let (key, value) = parse_entry(line)?;
        if let Some(old) = values.insert(key.to_string(), value) {
            log::debug!("line {}: '{key}' overrides earlier value {old}", line.number);
        }
    }

    log::debug!("{}: {} entries", section.marker, values.len());
    Ok(values)
}

fn parse_entry<'a>(line: &Line<'a>) -> Result<(&'a str, MetadataValue)> {
    let text = line.text;
    let key_end = text
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(text.len());
    let key = &text[..key_end];
    if !is_identifier(key) {
        return Err(MdmError::malformed(
            line.number,
            format!("'{key}' is not a valid metadata key"),
        ));
    }

    let mut rest = text[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix('=') {
        rest = stripped.trim_start();
    }

    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"').ok_or_else(|| {
            MdmError::malformed(line.number, format!("unterminated quoted value for '{key}'"))
        })?;
        return Ok((key, classify(&quoted[..end])));
    }

    Ok((key, classify(rest.trim_end())))
}

fn classify(raw: &str) -> MetadataValue {
    match parse_number(raw.trim()) {
        Some(v) => MetadataValue::Number(v),
        None => MetadataValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sections::split_sections;

    fn section(text: &str) -> Section<'_> {
        split_sections(text).unwrap().remove(0)
    }

    #[test]
    fn duplicate_names_keep_first_declaration_order() {
        let s = section("ICCAP_INPUTS\nVg V G GROUND SMU1 0.1 LIN 1 0 1 11 0.1\nVd V\nVg I\n");
        let vars = parse_variables(&s).unwrap();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Vg", "Vd"]);
        assert_eq!(vars[0].unit.as_deref(), Some("V"));
    }

    #[test]
    fn sweep_kind_and_order_are_read() {
        let s = section("ICCAP_INPUTS\nfreq F GROUND GROUND NWA 0 LOG 1 1e9 1e10 21\nVd V D GROUND SMU2 0.1 CON 0.05\n");
        let vars = parse_variables(&s).unwrap();
        assert_eq!(vars[0].sweep, Some(SweepKind::Log));
        assert_eq!(vars[0].sweep_order, Some(1));
        assert_eq!(vars[1].sweep, Some(SweepKind::Con));
        assert_eq!(vars[1].sweep_order, None);
    }

    #[test]
    fn non_identifier_name_is_malformed() {
        let s = section("ICCAP_OUTPUTS\nId I\n1.5 V\n");
        match parse_variables(&s) {
            Err(MdmError::MalformedFile { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected MalformedFile, got {other:?}"),
        }
    }

    #[test]
    fn values_last_write_wins() {
        let s = section("ICCAP_VALUES\nTEMP=25\nTEMP=27\n");
        let values = parse_values(&s).unwrap();
        assert_eq!(values["TEMP"], 27.0);
    }

    #[test]
    fn values_accept_all_entry_forms() {
        let s = section(
            "ICCAP_VALUES\nW \"1e-6\"\nL = 0.18e-6\nDEVICE \"nmos 3v3\"\nOPERATOR alice\nEMPTY \"\"\n",
        );
        let values = parse_values(&s).unwrap();
        assert_eq!(values["W"], 1e-6);
        assert_eq!(values["L"], 0.18e-6);
        assert_eq!(values["DEVICE"], "nmos 3v3");
        assert_eq!(values["OPERATOR"], "alice");
        assert_eq!(values["EMPTY"], "");
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let s = section("ICCAP_VALUES\nDEVICE \"nmos\n");
        assert!(matches!(
            parse_values(&s),
            Err(MdmError::MalformedFile { line: 2, .. })
        ));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("Vg"));
        assert!(is_identifier("_tmp.1"));
        assert!(!is_identifier("1Vg"));
        assert!(!is_identifier("R:s(1,1)"));
        assert!(!is_identifier(""));
    }
}
