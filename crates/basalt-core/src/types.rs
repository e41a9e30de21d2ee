//! Core data model: byte strings, cells, rows, and table schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque byte string used for row keys, qualifiers, and values.
pub type Bytes = Vec<u8>;

/// Maximum size of a row key in bytes.
pub const MAX_ROW_KEY_SIZE: usize = 32767;

/// One stored value at a (row, family, qualifier) coordinate.
///
/// `timestamp` is milliseconds since the Unix epoch, assigned by the store
/// at write time. An upsert of the same coordinate replaces both value and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub family: String,
    pub qualifier: Bytes,
    pub value: Bytes,
    pub timestamp: u64,
}

/// A row key together with its cells, sorted by (family, qualifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: Bytes,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Value of the cell at (family, qualifier), if present.
    pub fn value(&self, family: &str, qualifier: &[u8]) -> Option<&[u8]> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
            .map(|c| c.value.as_slice())
    }
}

/// Compact `key: family:qualifier=value, ...` rendering with lossy UTF-8.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", String::from_utf8_lossy(&self.key))?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(
                f,
                " {}:{}={}",
                cell.family,
                String::from_utf8_lossy(&cell.qualifier),
                String::from_utf8_lossy(&cell.value)
            )?;
        }
        Ok(())
    }
}

/// A table name and its declared column families.
///
/// Family membership is fixed at creation; growing it later goes through the
/// disable / add-family / enable administrative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub families: Vec<String>,
}

impl TableSchema {
    /// Schema with the given name and column families.
    pub fn new<N, I, F>(name: N, families: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        TableSchema {
            name: name.into(),
            families: families.into_iter().map(Into::into).collect(),
        }
    }
}
