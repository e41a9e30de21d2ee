//! Mutation objects applied to a single row.

use serde::{Deserialize, Serialize};

use crate::types::Bytes;

/// A batched upsert of cells within one row.
///
/// Cells may span several column families and qualifiers; the store applies
/// the whole put in one row-atomic step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Put {
    pub(crate) row: Bytes,
    pub(crate) cells: Vec<PutCell>,
}

/// One cell write carried by a `Put`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PutCell {
    pub(crate) family: String,
    pub(crate) qualifier: Bytes,
    pub(crate) value: Bytes,
}

impl Put {
    /// Start a put for the given row key.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Put {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Add one cell value. May be called repeatedly, across families.
    pub fn column(
        mut self,
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        self.cells.push(PutCell {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        });
        self
    }
}

/// Scope of a delete within one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DeleteScope {
    Row,
    Family { family: String },
    Column { family: String, qualifier: Bytes },
}

/// A delete of a whole row, one family's cells, or a single cell.
///
/// `new` starts with whole-row scope; `family` and `column` narrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delete {
    pub(crate) row: Bytes,
    pub(crate) scope: DeleteScope,
}

impl Delete {
    /// Delete every cell of the row.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Delete {
            row: row.into(),
            scope: DeleteScope::Row,
        }
    }

    /// Narrow the delete to one column family.
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.scope = DeleteScope::Family {
            family: family.into(),
        };
        self
    }

    /// Narrow the delete to a single cell.
    pub fn column(mut self, family: impl Into<String>, qualifier: impl Into<Bytes>) -> Self {
        self.scope = DeleteScope::Column {
            family: family.into(),
            qualifier: qualifier.into(),
        };
        self
    }
}
