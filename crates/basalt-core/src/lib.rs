//! # BasaltDB
//!
//! A minimal in-memory wide-column store.
//!
//! Tables are made of column families declared at creation time. Each row is
//! a byte key mapping to cells addressed by `family:qualifier`; a cell holds
//! a single byte value and the millisecond timestamp of its last write. Rows
//! come back in key order, and scans can be restricted to columns and pruned
//! by a [`Filter`] tree.
//!
//! ## Quick Start
//!
//! ```
//! use basalt_core::{BasaltDB, Get, Put, TableSchema};
//!
//! // Create a store and a table
//! let db = BasaltDB::new();
//! db.create_table(TableSchema::new("site_users", ["personal_data"]))
//!     .unwrap();
//!
//! // Insert a row
//! db.put(
//!     "site_users",
//!     Put::new("u1").column("personal_data", "login", "user1"),
//! )
//! .unwrap();
//!
//! // Read it back
//! let row = db.get("site_users", &Get::new("u1")).unwrap().unwrap();
//! assert_eq!(row.value("personal_data", b"login"), Some(&b"user1"[..]));
//! ```

pub mod db;
pub mod error;
pub mod filter;
pub mod mutation;
pub mod scan;
pub mod types;

pub use db::BasaltDB;
pub use error::{Error, FilterError, MutationError, Result, SchemaError};
pub use filter::{CompareOp, Filter};
pub use mutation::{Delete, Put};
pub use scan::{ColumnSet, DEFAULT_SCAN_BATCH, Get, Scan, ScanPage};
pub use types::{Bytes, Cell, MAX_ROW_KEY_SIZE, Row, TableSchema};
