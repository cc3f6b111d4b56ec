use serde::{Deserialize, Serialize};

/// Level-of-detail limits applied to oversized requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodPolicy {
    pub enabled: bool,
    pub max_rows: usize,
    pub max_columns: usize,
    /// The reduced cell count must fall below this share of the original.
    pub min_reduction: f64,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self { enabled: true, max_rows: 100, max_columns: 100, min_reduction: 0.7 }
    }
}

impl LodPolicy {
    pub fn with_enabled(enabled: bool) -> Self {
        Self { enabled, ..Self::default() }
    }

    /// Returns the reduced `(rows, columns)` if downsampling is worth it.
    pub fn reduce(&self, row_count: usize, column_count: usize) -> Option<(usize, usize)> {
        if !self.enabled || (row_count <= self.max_rows && column_count <= self.max_columns) {
            return None;
        }
        let target_rows = row_count.min(self.max_rows);
        let target_columns = column_count.min(self.max_columns);
        let reduced = target_rows as f64 * target_columns as f64;
        let original = row_count as f64 * column_count as f64;
        (reduced < original * self.min_reduction).then_some((target_rows, target_columns))
    }

    /// Like `reduce`, falling back to the requested size.
    pub fn apply(&self, row_count: usize, column_count: usize) -> (usize, usize) {
        self.reduce(row_count, column_count).unwrap_or((row_count, column_count))
    }
}
