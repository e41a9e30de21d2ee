//! In-memory wide-column store engine.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::error::{MutationError, Result, SchemaError};
use crate::mutation::{Delete, DeleteScope, Put};
use crate::scan::{ColumnSet, Get, Scan, ScanPage};
use crate::types::{Bytes, Cell, MAX_ROW_KEY_SIZE, Row, TableSchema};

/// Handle to an in-memory BasaltDB store.
///
/// Cheap to clone; all clones share the same store. Reads take a shared
/// lock, writes an exclusive one.
#[derive(Clone, Default)]
pub struct BasaltDB {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    tables: BTreeMap<String, TableState>,
}

struct TableState {
    families: Vec<String>,
    enabled: bool,
    rows: BTreeMap<Bytes, RowData>,
}

/// Cells of one row, keyed by (family, qualifier).
type RowData = BTreeMap<(String, Bytes), Stored>;

struct Stored {
    value: Bytes,
    timestamp: u64,
}

impl BasaltDB {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Table administration --

    /// Whether a table with this name exists.
    pub fn table_exists(&self, table: &str) -> bool {
        self.inner.read().tables.contains_key(table)
    }

    /// Create a table from its schema. New tables start enabled.
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        validate_table_name(&schema.name)?;
        if schema.families.is_empty() {
            return Err(SchemaError::NoFamilies(schema.name).into());
        }
        for (i, family) in schema.families.iter().enumerate() {
            validate_family_name(family)?;
            if schema.families[..i].contains(family) {
                return Err(SchemaError::FamilyAlreadyExists {
                    table: schema.name.clone(),
                    family: family.clone(),
                }
                .into());
            }
        }

        let mut inner = self.inner.write();
        if inner.tables.contains_key(&schema.name) {
            return Err(SchemaError::TableAlreadyExists(schema.name).into());
        }
        inner.tables.insert(
            schema.name,
            TableState {
                families: schema.families,
                enabled: true,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Delete a table and all its rows. The table must be disabled first.
    pub fn drop_table(&self, table: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let state = inner
            .tables
            .get(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
        if state.enabled {
            return Err(SchemaError::TableNotDisabled(table.to_string()).into());
        }
        inner.tables.remove(table);
        Ok(())
    }

    /// Bring a disabled table back online.
    pub fn enable_table(&self, table: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let state = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
        if state.enabled {
            return Err(SchemaError::TableNotDisabled(table.to_string()).into());
        }
        state.enabled = true;
        Ok(())
    }

    /// Take a table offline. Disabled tables reject data operations.
    pub fn disable_table(&self, table: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let state = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
        if !state.enabled {
            return Err(SchemaError::TableNotEnabled(table.to_string()).into());
        }
        state.enabled = false;
        Ok(())
    }

    /// Whether a table is enabled.
    pub fn is_table_enabled(&self, table: &str) -> Result<bool> {
        let inner = self.inner.read();
        let state = inner
            .tables
            .get(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
        Ok(state.enabled)
    }

    /// Add a column family to a disabled table.
    pub fn add_family(&self, table: &str, family: &str) -> Result<()> {
        validate_family_name(family)?;
        let mut inner = self.inner.write();
        let state = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
        if state.enabled {
            return Err(SchemaError::TableNotDisabled(table.to_string()).into());
        }
        if state.families.iter().any(|f| f == family) {
            return Err(SchemaError::FamilyAlreadyExists {
                table: table.to_string(),
                family: family.to_string(),
            }
            .into());
        }
        state.families.push(family.to_string());
        Ok(())
    }

    /// All table names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        self.inner.read().tables.keys().cloned().collect()
    }

    /// Schema of a table.
    pub fn describe_table(&self, table: &str) -> Result<TableSchema> {
        let inner = self.inner.read();
        let state = inner
            .tables
            .get(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
        Ok(TableSchema {
            name: table.to_string(),
            families: state.families.clone(),
        })
    }

    // -- Data operations --

    /// Apply a put, row-atomically. Every cell's family must be declared.
    pub fn put(&self, table: &str, put: Put) -> Result<()> {
        let Put { row, cells } = put;
        if cells.is_empty() {
            return Err(MutationError::EmptyPut.into());
        }
        validate_row_key(&row)?;
        let timestamp = now_millis();

        let mut inner = self.inner.write();
        let state = enabled_table_mut(&mut inner, table)?;
        for cell in &cells {
            if !state.families.iter().any(|f| f == &cell.family) {
                return Err(SchemaError::FamilyNotFound {
                    table: table.to_string(),
                    family: cell.family.clone(),
                }
                .into());
            }
        }

        let row_data = state.rows.entry(row).or_default();
        for cell in cells {
            row_data.insert(
                (cell.family, cell.qualifier),
                Stored {
                    value: cell.value,
                    timestamp,
                },
            );
        }
        Ok(())
    }

    /// Point read. `None` when the row is absent or no cell passes the
    /// restriction; absence is never an error.
    pub fn get(&self, table: &str, get: &Get) -> Result<Option<Row>> {
        let inner = self.inner.read();
        let state = enabled_table(&inner, table)?;
        let Some(row_data) = state.rows.get(&get.row) else {
            return Ok(None);
        };
        let cells = materialize(row_data, &get.columns);
        if cells.is_empty() {
            return Ok(None);
        }
        Ok(Some(Row {
            key: get.row.clone(),
            cells,
        }))
    }

    /// Apply a delete at its configured scope. Deleting what is not there
    /// is a no-op; a row whose last cell is removed disappears entirely.
    pub fn delete(&self, table: &str, delete: Delete) -> Result<()> {
        let mut inner = self.inner.write();
        let state = enabled_table_mut(&mut inner, table)?;
        let Delete { row, scope } = delete;

        match scope {
            DeleteScope::Row => {
                state.rows.remove(&row);
            }
            DeleteScope::Family { family } => {
                if let Some(row_data) = state.rows.get_mut(&row) {
                    row_data.retain(|(f, _), _| f != &family);
                    if row_data.is_empty() {
                        state.rows.remove(&row);
                    }
                }
            }
            DeleteScope::Column { family, qualifier } => {
                if let Some(row_data) = state.rows.get_mut(&row) {
                    row_data.remove(&(family, qualifier));
                    if row_data.is_empty() {
                        state.rows.remove(&row);
                    }
                }
            }
        }
        Ok(())
    }

    /// One page of a scan, in key order, starting strictly after
    /// `start_after`. `resume` names the last returned key while more rows
    /// may remain.
    pub fn scan_page(
        &self,
        table: &str,
        scan: &Scan,
        start_after: Option<&[u8]>,
        limit: usize,
    ) -> Result<ScanPage> {
        let limit = limit.max(1);
        let inner = self.inner.read();
        let state = enabled_table(&inner, table)?;

        let range = match start_after {
            Some(key) => (Bound::Excluded(key), Bound::Unbounded),
            None => (Bound::Unbounded, Bound::Unbounded),
        };

        let mut rows = Vec::new();
        for (key, row_data) in state.rows.range::<[u8], _>(range) {
            let mut cells = materialize(row_data, &scan.columns);
            if let Some(filter) = &scan.filter {
                let mut kept = Vec::with_capacity(cells.len());
                for cell in cells {
                    if filter.eval(key, &cell)? {
                        kept.push(cell);
                    }
                }
                cells = kept;
            }
            if cells.is_empty() {
                continue;
            }
            rows.push(Row {
                key: key.clone(),
                cells,
            });
            if rows.len() == limit {
                break;
            }
        }

        let resume = if rows.len() == limit {
            rows.last().map(|r| r.key.clone())
        } else {
            None
        };
        Ok(ScanPage { rows, resume })
    }

    /// Full scan, paging internally with the scan's batch size.
    pub fn scan(&self, table: &str, scan: &Scan) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut start_after: Option<Bytes> = None;
        loop {
            let page = self.scan_page(table, scan, start_after.as_deref(), scan.batch_size())?;
            rows.extend(page.rows);
            match page.resume {
                Some(key) => start_after = Some(key),
                None => break,
            }
        }
        Ok(rows)
    }
}

fn enabled_table<'a>(inner: &'a StoreInner, table: &str) -> Result<&'a TableState> {
    let state = inner
        .tables
        .get(table)
        .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
    if !state.enabled {
        return Err(SchemaError::TableNotEnabled(table.to_string()).into());
    }
    Ok(state)
}

fn enabled_table_mut<'a>(inner: &'a mut StoreInner, table: &str) -> Result<&'a mut TableState> {
    let state = inner
        .tables
        .get_mut(table)
        .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
    if !state.enabled {
        return Err(SchemaError::TableNotEnabled(table.to_string()).into());
    }
    Ok(state)
}

/// Cells of a row that pass the column restriction, in (family, qualifier)
/// order.
fn materialize(row_data: &RowData, columns: &ColumnSet) -> Vec<Cell> {
    row_data
        .iter()
        .filter(|((family, qualifier), _)| columns.admits(family, qualifier))
        .map(|((family, qualifier), stored)| Cell {
            family: family.clone(),
            qualifier: qualifier.clone(),
            value: stored.value.clone(),
            timestamp: stored.timestamp,
        })
        .collect()
}

fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SchemaError::InvalidName("empty table name".to_string()).into());
    }
    if name.contains(':') || name.contains('/') {
        return Err(SchemaError::InvalidName(format!(
            "table name contains a reserved character: {name}"
        ))
        .into());
    }
    Ok(())
}

fn validate_family_name(family: &str) -> Result<()> {
    if family.is_empty() {
        return Err(SchemaError::InvalidName("empty family name".to_string()).into());
    }
    if family.contains(':') {
        return Err(SchemaError::InvalidName(format!("family name contains ':': {family}")).into());
    }
    Ok(())
}

fn validate_row_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(MutationError::EmptyRowKey.into());
    }
    if key.len() > MAX_ROW_KEY_SIZE {
        return Err(MutationError::RowKeyTooLarge {
            max: MAX_ROW_KEY_SIZE,
            actual: key.len(),
        }
        .into());
    }
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
