use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{Document, Table};

// ---------------------------------------------------------------------------
// ConditionValue – an orderable ICCAP_VAR value
// ---------------------------------------------------------------------------

/// `f64` wrapper with a total order so condition values can live in a
/// `BTreeSet`. `-0.0` is stored as `0.0`.
#[derive(Debug, Clone, Copy)]
pub struct ConditionValue(f64);

impl ConditionValue {
    pub fn new(value: f64) -> Self {
        // total_cmp orders -0.0 below 0.0
        Self(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl PartialEq for ConditionValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ConditionValue {}

impl PartialOrd for ConditionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConditionValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// ---------------------------------------------------------------------------
// Block selection by sweep condition
// ---------------------------------------------------------------------------

/// Per-condition selection state: maps condition name → selected values.
/// A condition absent from the map is not filtered.
pub type ConditionFilter = BTreeMap<String, BTreeSet<ConditionValue>>;

/// Every distinct value of every `ICCAP_VAR` condition in the document.
pub fn unique_conditions(document: &Document) -> ConditionFilter {
    let mut unique = ConditionFilter::new();
    for block in document.blocks() {
        for (name, value) in block.conditions() {
            unique
                .entry(name.clone())
                .or_default()
                .insert(ConditionValue::new(*value));
        }
    }
    unique
}

/// A filter with every value selected (i.e., show everything).
pub fn init_filter_state(document: &Document) -> ConditionFilter {
    unique_conditions(document)
}

/// Indices of the blocks passing all active filters.
///
/// A block passes a condition filter when:
/// * the selected set contains every known value of the condition → no
///   constraint
/// * the selected set is empty → fails
/// * the block's value for the condition is selected → passes
/// * the block has no such condition → fails
pub fn filtered_blocks(document: &Document, filters: &ConditionFilter) -> Vec<usize> {
    let unique = unique_conditions(document);

    document
        .blocks()
        .iter()
        .filter(|block| {
            filters.iter().all(|(name, selected)| {
                if selected.is_empty() {
                    return false;
                }
                if unique.get(name).is_some_and(|all| all.is_subset(selected)) {
                    return true;
                }
                block
                    .condition(name)
                    .is_some_and(|v| selected.contains(&ConditionValue::new(v)))
            })
        })
        .map(|block| block.index())
        .collect()
}

/// Table built from the blocks passing `filters` only.
pub fn filtered_table(document: &Document, filters: &ConditionFilter) -> Table {
    let selected = filtered_blocks(document, filters);
    Table::from_blocks(
        document
            .blocks()
            .iter()
            .filter(|b| selected.contains(&b.index())),
    )
}
