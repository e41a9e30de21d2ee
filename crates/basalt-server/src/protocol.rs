//! Wire protocol: JSON-over-newlines request/response types.
//!
//! Each request is a single JSON line; each response is a single JSON line.
//! Row keys, qualifiers, and values travel as JSON byte arrays, exactly as
//! serde derives them from the core types.

use basalt_core::{Delete, Get, Put, Row, Scan, TableSchema};
use serde::{Deserialize, Serialize};

/// A request from a client.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Ping,
    CreateTable {
        table: String,
        families: Vec<String>,
    },
    DropTable {
        table: String,
    },
    TableExists {
        table: String,
    },
    ListTables,
    DescribeTable {
        table: String,
    },
    EnableTable {
        table: String,
    },
    DisableTable {
        table: String,
    },
    IsTableEnabled {
        table: String,
    },
    AddFamily {
        table: String,
        family: String,
    },
    Put {
        table: String,
        put: Put,
    },
    Get {
        table: String,
        get: Get,
    },
    Delete {
        table: String,
        delete: Delete,
    },
    OpenScan {
        table: String,
        #[serde(default)]
        scan: Scan,
    },
    ScanNext {
        scanner: u64,
    },
    CloseScan {
        scanner: u64,
    },
}

/// A response sent back to the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

/// Successful response variants.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OkResponse {
    Empty {
        ok: bool,
    },
    Exists {
        ok: bool,
        exists: bool,
    },
    Enabled {
        ok: bool,
        enabled: bool,
    },
    Tables {
        ok: bool,
        tables: Vec<String>,
    },
    Schema {
        ok: bool,
        schema: TableSchema,
    },
    Row {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        row: Option<Row>,
    },
    Scanner {
        ok: bool,
        scanner: u64,
    },
    Rows {
        ok: bool,
        rows: Vec<Row>,
        done: bool,
    },
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl Response {
    pub fn ok_empty() -> Self {
        Response::Ok(OkResponse::Empty { ok: true })
    }

    pub fn ok_exists(exists: bool) -> Self {
        Response::Ok(OkResponse::Exists { ok: true, exists })
    }

    pub fn ok_enabled(enabled: bool) -> Self {
        Response::Ok(OkResponse::Enabled { ok: true, enabled })
    }

    pub fn ok_tables(tables: Vec<String>) -> Self {
        Response::Ok(OkResponse::Tables { ok: true, tables })
    }

    pub fn ok_schema(schema: TableSchema) -> Self {
        Response::Ok(OkResponse::Schema { ok: true, schema })
    }

    pub fn ok_row(row: Option<Row>) -> Self {
        Response::Ok(OkResponse::Row { ok: true, row })
    }

    pub fn ok_scanner(scanner: u64) -> Self {
        Response::Ok(OkResponse::Scanner { ok: true, scanner })
    }

    pub fn ok_rows(rows: Vec<Row>, done: bool) -> Self {
        Response::Ok(OkResponse::Rows { ok: true, rows, done })
    }

    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
            message: message.into(),
        })
    }
}
