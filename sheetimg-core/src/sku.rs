//! Row → SKU index built from the reference column

use crate::reader::{CellValue, Sheet};
use std::collections::BTreeMap;

/// SKUs keyed by 1-based row number.
///
/// Rows whose reference cell is empty, blank, zero or `FALSE` have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkuIndex {
    skus: BTreeMap<u32, String>,
}

impl SkuIndex {
    /// Scan `column` (1-based) from `first_row` (1-based) through the sheet's
    /// last row, keeping the trimmed text of every non-empty cell
    pub fn build(sheet: &Sheet, column: u32, first_row: u32) -> Self {
        let mut skus = BTreeMap::new();
        let col = column.saturating_sub(1);

        for row in first_row.max(1)..=sheet.max_row() {
            let Some(value) = sheet.get_cell(row - 1, col) else {
                continue;
            };
            if matches!(value, CellValue::Boolean(false))
                || matches!(value, CellValue::Number(n) if *n == 0.0)
            {
                continue;
            }
            if let Some(text) = value.as_text() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    skus.insert(row, trimmed.to_string());
                }
            }
        }

        Self { skus }
    }

    /// SKU stored for a 1-based row
    pub fn get(&self, row: u32) -> Option<&str> {
        self.skus.get(&row).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.skus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }
}

impl FromIterator<(u32, String)> for SkuIndex {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            skus: iter.into_iter().collect(),
        }
    }
}
