use serde::Serialize;

use super::model::Table;

/// Basic statistics for one table column. Missing cells are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    /// Number of non-missing cells.
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation; `0.0` for fewer than two values.
    pub std: Option<f64>,
}

/// Summarize every data column of `table` (`block_id` excluded).
pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    table
        .data_columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<f64> = table
                .rows()
                .iter()
                .filter_map(|r| r.cells[i].as_f64())
                .collect();
            summarize_values(name, &values)
        })
        .collect()
}

fn summarize_values(column: &str, values: &[f64]) -> ColumnSummary {
    let count = values.len();
    if count == 0 {
        return ColumnSummary {
            column: column.to_string(),
            count,
            min: None,
            max: None,
            mean: None,
            std: None,
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    ColumnSummary {
        column: column.to_string(),
        count,
        min: Some(min),
        max: Some(max),
        mean: Some(mean),
        std: Some(std),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::{parse_str, ParseOptions};

    #[test]
    fn summary_skips_missing_cells() {
        let text = "ICCAP_INPUTS\nVg V\nICCAP_OUTPUTS\nId I\nIg I\nEND_HEADER\n\
                    BEGIN_DB\n#Vg Id\n1 2\n3 4\nEND_DB\n\
                    BEGIN_DB\n#Vg Ig\n5 6\nEND_DB\n";
        let doc = parse_str(text, &ParseOptions::default()).unwrap();
        let summary = summarize(&doc.to_table());

        let cols: Vec<&str> = summary.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(cols, vec!["Vg", "Id", "Ig"]);

        let vg = &summary[0];
        assert_eq!(vg.count, 3);
        assert_eq!(vg.min, Some(1.0));
        assert_eq!(vg.max, Some(5.0));
        assert_eq!(vg.mean, Some(3.0));
        assert_eq!(vg.std, Some(2.0));

        let ig = &summary[2];
        assert_eq!(ig.count, 1);
        assert_eq!(ig.std, Some(0.0));
    }

    #[test]
    fn empty_column_has_no_statistics() {
        let s = summarize_values("Id", &[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, None);
    }
}
