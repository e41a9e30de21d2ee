//! Read requests: point gets and key-ordered scans.

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::types::{Bytes, Row};

/// Default number of rows fetched per scan batch.
pub const DEFAULT_SCAN_BATCH: usize = 100;

/// Column restriction shared by gets and scans.
///
/// Empty means unrestricted: all families, all qualifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnSet {
    families: Vec<String>,
    columns: Vec<(String, Bytes)>,
}

impl ColumnSet {
    fn push_family(&mut self, family: String) {
        self.families.push(family);
    }

    fn push_column(&mut self, family: String, qualifier: Bytes) {
        self.columns.push((family, qualifier));
    }

    /// Whether a cell at (family, qualifier) passes the restriction.
    pub(crate) fn admits(&self, family: &str, qualifier: &[u8]) -> bool {
        if self.families.is_empty() && self.columns.is_empty() {
            return true;
        }
        self.families.iter().any(|f| f == family)
            || self
                .columns
                .iter()
                .any(|(f, q)| f == family && q.as_slice() == qualifier)
    }
}

/// A point read of one row, optionally restricted to columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Get {
    pub(crate) row: Bytes,
    #[serde(default)]
    pub(crate) columns: ColumnSet,
}

impl Get {
    /// Read the whole row.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Get {
            row: row.into(),
            columns: ColumnSet::default(),
        }
    }

    /// Also return every cell of the given family.
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.columns.push_family(family.into());
        self
    }

    /// Also return the single cell at (family, qualifier).
    pub fn column(mut self, family: impl Into<String>, qualifier: impl Into<Bytes>) -> Self {
        self.columns.push_column(family.into(), qualifier.into());
        self
    }
}

/// A key-ordered scan over a table, optionally restricted and filtered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    #[serde(default)]
    pub(crate) columns: ColumnSet,
    #[serde(default)]
    pub(crate) filter: Option<Filter>,
    #[serde(default = "default_batch")]
    pub(crate) batch: usize,
}

fn default_batch() -> usize {
    DEFAULT_SCAN_BATCH
}

impl Default for Scan {
    fn default() -> Self {
        Scan::new()
    }
}

impl Scan {
    /// Scan every row, unrestricted.
    pub fn new() -> Self {
        Scan {
            columns: ColumnSet::default(),
            filter: None,
            batch: DEFAULT_SCAN_BATCH,
        }
    }

    /// Restrict to every cell of the given family. Repeatable.
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.columns.push_family(family.into());
        self
    }

    /// Restrict to the single cell at (family, qualifier). Repeatable.
    pub fn column(mut self, family: impl Into<String>, qualifier: impl Into<Bytes>) -> Self {
        self.columns.push_column(family.into(), qualifier.into());
        self
    }

    /// Attach a store-evaluated filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Rows fetched per scan batch. Clamped to at least 1.
    pub fn batch(mut self, n: usize) -> Self {
        self.batch = n.max(1);
        self
    }

    /// The configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch
    }
}

/// One page of rows from `BasaltDB::scan_page`.
#[derive(Debug, Clone)]
pub struct ScanPage {
    /// Rows in key order.
    pub rows: Vec<Row>,
    /// Key to resume after, while more rows may remain.
    pub resume: Option<Bytes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_column_set_admits_everything() {
        let cs = ColumnSet::default();
        assert!(cs.admits("personal_data", b"login"));
        assert!(cs.admits("anything", b"at_all"));
    }

    #[test]
    fn test_column_set_admits_family_or_exact_column() {
        let scan = Scan::new()
            .family("preferences")
            .column("personal_data", "login");
        let cs = scan.columns;

        assert!(cs.admits("preferences", b"system"));
        assert!(cs.admits("preferences", b"anything"));
        assert!(cs.admits("personal_data", b"login"));
        assert!(!cs.admits("personal_data", b"password"));
        assert!(!cs.admits("other", b"login"));
    }

    #[test]
    fn test_batch_is_clamped() {
        assert_eq!(Scan::new().batch(0).batch_size(), 1);
        assert_eq!(Scan::new().batch(7).batch_size(), 7);
        assert_eq!(Scan::new().batch_size(), DEFAULT_SCAN_BATCH);
    }

    #[test]
    fn test_scan_deserializes_with_defaults() {
        let scan: Scan = serde_json::from_str("{}").unwrap();
        assert_eq!(scan.batch_size(), DEFAULT_SCAN_BATCH);
        assert!(scan.filter.is_none());
        assert!(scan.columns.admits("any", b"thing"));
    }
}
