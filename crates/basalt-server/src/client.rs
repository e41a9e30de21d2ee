//! Client library for connecting to a `basalt-server` via Unix socket.
//!
//! Each method serializes a JSON-line request, sends it, reads a JSON-line
//! response, and returns the parsed result.

use std::collections::VecDeque;
use std::path::Path;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use basalt_core::{Delete, Get, Put, Row, Scan, TableSchema};

use crate::error::{ClientError, ServerErrorKind};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for a BasaltDB server.
///
/// Dropping the client closes the connection, which also releases any
/// scanners still open on the server side.
#[derive(Debug)]
pub struct BasaltClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    line_buf: String,
}

impl BasaltClient {
    /// Connect to a BasaltDB server at the given Unix socket path.
    ///
    /// An unreachable socket is reported as [`ClientError::Unreachable`].
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| ClientError::Unreachable {
                path: path.to_path_buf(),
                source,
            })?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            line_buf: String::new(),
        })
    }

    /// Round-trip a ping to check the server is responsive.
    pub async fn ping(&mut self) -> Result<()> {
        let req = serde_json::json!({"op": "ping"});
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Create a table with the given column families.
    pub async fn create_table(&mut self, table: &str, families: &[&str]) -> Result<()> {
        let req = serde_json::json!({
            "op": "create_table",
            "table": table,
            "families": families,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Drop a table. The table must be disabled first.
    pub async fn drop_table(&mut self, table: &str) -> Result<()> {
        let req = serde_json::json!({
            "op": "drop_table",
            "table": table,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Whether a table exists.
    pub async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let req = serde_json::json!({
            "op": "table_exists",
            "table": table,
        });
        let resp = self.send_request(&req).await?;
        bool_from_response(&resp, "exists")
    }

    /// List all tables.
    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        let req = serde_json::json!({"op": "list_tables"});
        let resp = self.send_request(&req).await?;
        tables_from_response(&resp)
    }

    /// Describe a table's schema.
    pub async fn describe_table(&mut self, table: &str) -> Result<TableSchema> {
        let req = serde_json::json!({
            "op": "describe_table",
            "table": table,
        });
        let resp = self.send_request(&req).await?;
        schema_from_response(&resp)
    }

    /// Bring a disabled table back online.
    pub async fn enable_table(&mut self, table: &str) -> Result<()> {
        let req = serde_json::json!({
            "op": "enable_table",
            "table": table,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Take a table offline so its schema can be altered.
    pub async fn disable_table(&mut self, table: &str) -> Result<()> {
        let req = serde_json::json!({
            "op": "disable_table",
            "table": table,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Whether a table is enabled.
    pub async fn is_table_enabled(&mut self, table: &str) -> Result<bool> {
        let req = serde_json::json!({
            "op": "is_table_enabled",
            "table": table,
        });
        let resp = self.send_request(&req).await?;
        bool_from_response(&resp, "enabled")
    }

    /// Add a column family to a disabled table.
    pub async fn add_family(&mut self, table: &str, family: &str) -> Result<()> {
        let req = serde_json::json!({
            "op": "add_family",
            "table": table,
            "family": family,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Apply a put.
    pub async fn put(&mut self, table: &str, put: Put) -> Result<()> {
        let req = serde_json::json!({
            "op": "put",
            "table": table,
            "put": put,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Point read. An absent row comes back as `None`.
    pub async fn get(&mut self, table: &str, get: Get) -> Result<Option<Row>> {
        let req = serde_json::json!({
            "op": "get",
            "table": table,
            "get": get,
        });
        let resp = self.send_request(&req).await?;
        row_from_response(&resp)
    }

    /// Apply a delete at its configured scope.
    pub async fn delete(&mut self, table: &str, delete: Delete) -> Result<()> {
        let req = serde_json::json!({
            "op": "delete",
            "table": table,
            "delete": delete,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Open a server-side scanner and return a cursor over its rows.
    pub async fn scan(&mut self, table: &str, scan: Scan) -> Result<Scanner<'_>> {
        let req = serde_json::json!({
            "op": "open_scan",
            "table": table,
            "scan": scan,
        });
        let resp = self.send_request(&req).await?;
        let id = scanner_from_response(&resp)?;
        Ok(Scanner {
            client: self,
            id,
            buffer: VecDeque::new(),
            done: false,
        })
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    async fn send_request(&mut self, req: &Value) -> Result<Value> {
        let mut data = serde_json::to_vec(req).map_err(ClientError::Serialization)?;
        data.push(b'\n');
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;

        self.line_buf.clear();
        let n = self.reader.read_line(&mut self.line_buf).await?;
        if n == 0 {
            return Err(ClientError::Disconnected);
        }

        let resp: Value =
            serde_json::from_str(self.line_buf.trim()).map_err(ClientError::Serialization)?;
        Ok(resp)
    }
}

/// Client half of a scan cursor.
///
/// Pulls one batch at a time from the server and yields rows in key order.
/// A scanner that is dropped without [`Scanner::close`] is reclaimed by the
/// server when the scan completes or the connection ends.
pub struct Scanner<'a> {
    client: &'a mut BasaltClient,
    id: u64,
    buffer: VecDeque<Row>,
    done: bool,
}

impl Scanner<'_> {
    /// Next row in key order, or `None` once the scan is exhausted.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }
            if self.done {
                return Ok(None);
            }
            self.fetch_batch().await?;
        }
    }

    /// Collect every remaining row.
    pub async fn collect_rows(mut self) -> Result<Vec<Row>> {
        let mut rows: Vec<Row> = self.buffer.drain(..).collect();
        while !self.done {
            self.fetch_batch().await?;
            rows.extend(self.buffer.drain(..));
        }
        Ok(rows)
    }

    /// Release the server-side scanner without draining it.
    ///
    /// After exhaustion this is a no-op; the server has already discarded
    /// the scanner.
    pub async fn close(self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        let req = serde_json::json!({
            "op": "close_scan",
            "scanner": self.id,
        });
        let resp = self.client.send_request(&req).await?;
        check_ok(&resp)
    }

    async fn fetch_batch(&mut self) -> Result<()> {
        let req = serde_json::json!({
            "op": "scan_next",
            "scanner": self.id,
        });
        let resp = self.client.send_request(&req).await?;
        let (rows, done) = rows_from_response(&resp)?;
        self.buffer.extend(rows);
        self.done = done;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

fn check_error(resp: &Value) -> Result<()> {
    if let Some(err) = resp.get("error") {
        let kind = ServerErrorKind::parse(err.as_str().unwrap_or("Unknown"));
        let message = resp
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        return Err(ClientError::Server { kind, message });
    }
    Ok(())
}

fn check_ok(resp: &Value) -> Result<()> {
    check_error(resp)?;
    Ok(())
}

fn bool_from_response(resp: &Value, field: &str) -> Result<bool> {
    check_error(resp)?;
    resp.get(field)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| ClientError::Protocol(format!("missing '{field}' in response")))
}

fn tables_from_response(resp: &Value) -> Result<Vec<String>> {
    check_error(resp)?;
    let tables = resp
        .get("tables")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    Ok(tables)
}

fn schema_from_response(resp: &Value) -> Result<TableSchema> {
    check_error(resp)?;
    let schema = resp
        .get("schema")
        .ok_or_else(|| ClientError::Protocol("missing 'schema' in response".to_string()))?;
    serde_json::from_value(schema.clone()).map_err(ClientError::Serialization)
}

fn row_from_response(resp: &Value) -> Result<Option<Row>> {
    check_error(resp)?;
    match resp.get("row") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(ClientError::Serialization),
    }
}

fn scanner_from_response(resp: &Value) -> Result<u64> {
    check_error(resp)?;
    resp.get("scanner")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ClientError::Protocol("missing 'scanner' in response".to_string()))
}

fn rows_from_response(resp: &Value) -> Result<(Vec<Row>, bool)> {
    check_error(resp)?;
    let rows = resp
        .get("rows")
        .ok_or_else(|| ClientError::Protocol("missing 'rows' in response".to_string()))?;
    let rows: Vec<Row> =
        serde_json::from_value(rows.clone()).map_err(ClientError::Serialization)?;
    let done = resp.get("done").and_then(|v| v.as_bool()).unwrap_or(true);
    Ok((rows, done))
}
