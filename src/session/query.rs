//! Read-only queries over the record table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::table::SecretTable;

/// Answers questions about stored records without touching secrets.
pub struct SecretQuery {
    table: Arc<SecretTable>,
}

impl SecretQuery {
    pub(crate) fn new(table: Arc<SecretTable>) -> Self {
        Self { table }
    }

    /// All unique identifiers, ordered from the most frequently used
    /// to the least.  Ties are broken alphabetically so the order is
    /// stable.
    pub fn unique_identifiers(&self) -> Vec<String> {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for row in 0..self.table.row_count() {
            let identifier = String::from_utf8_lossy(&self.table.read_identifier(row))
                .trim()
                .to_string();
            *freq.entry(identifier).or_insert(0) += 1;
        }
        let mut entries: Vec<(String, usize)> = freq.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.into_iter().map(|(identifier, _)| identifier).collect()
    }
}
