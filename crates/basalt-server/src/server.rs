//! Unix domain socket server that wraps a `BasaltDB` handle.
//!
//! Each connected client sends JSON-line requests and receives JSON-line
//! responses. Reads are concurrent (via `RwLock::read`), writes are
//! serialized (via `RwLock::write`) — the lock is internal to `BasaltDB`.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use basalt_core::{
    BasaltDB, Bytes, Delete, Error as DbError, FilterError, Get, MutationError, Put, Scan,
    SchemaError, TableSchema,
};

use crate::protocol::{Request, Response};

/// A BasaltDB server listening on a Unix socket.
pub struct BasaltServer {
    db: BasaltDB,
    socket_path: PathBuf,
}

impl BasaltServer {
    pub fn new(db: BasaltDB, socket_path: PathBuf) -> Self {
        Self { db, socket_path }
    }

    /// Run the server, accepting connections until a shutdown signal is received.
    ///
    /// On startup, removes any stale socket file and binds a new one.
    /// On shutdown (SIGINT or SIGTERM), removes the socket file before exiting.
    pub async fn run(&self) -> std::io::Result<()> {
        // Remove stale socket file if it exists.
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "server listening");

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let db = self.db.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(db, stream).await {
                                warn!(error = %e, "connection handler error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        };

        // Wait for either the accept loop (runs forever) or a shutdown signal.
        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown_signal() => {
                info!("shutdown signal received");
            }
        }

        // Clean up the socket file.
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(error = %e, "failed to remove socket file on shutdown");
            } else {
                info!(path = %self.socket_path.display(), "socket file removed");
            }
        }

        Ok(())
    }
}

/// Scanners opened over one connection, keyed by id.
///
/// Owned by the connection task, so dropping the task (client vanished,
/// read error) releases every open scanner with it.
#[derive(Default)]
struct ScannerRegistry {
    next_id: u64,
    open: HashMap<u64, ScannerState>,
}

struct ScannerState {
    table: String,
    scan: Scan,
    resume: Option<Bytes>,
}

impl ScannerRegistry {
    fn insert(&mut self, state: ScannerState) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.open.insert(id, state);
        id
    }
}

async fn handle_connection(db: BasaltDB, stream: tokio::net::UnixStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut scanners = ScannerRegistry::default();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            // Client disconnected.
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => dispatch(&db, &mut scanners, req),
            Err(e) => Response::error("ParseError", e.to_string()),
        };

        let mut resp_bytes = serde_json::to_vec(&response).unwrap_or_else(|e| {
            let fallback = Response::error("InternalError", e.to_string());
            serde_json::to_vec(&fallback).unwrap()
        });
        resp_bytes.push(b'\n');

        writer.write_all(&resp_bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn dispatch(db: &BasaltDB, scanners: &mut ScannerRegistry, req: Request) -> Response {
    match req {
        Request::Ping => Response::ok_empty(),

        Request::CreateTable { table, families } => handle_create_table(db, table, families),

        Request::DropTable { table } => handle_drop_table(db, &table),

        Request::TableExists { table } => handle_table_exists(db, &table),

        Request::ListTables => handle_list_tables(db),

        Request::DescribeTable { table } => handle_describe_table(db, &table),

        Request::EnableTable { table } => handle_enable_table(db, &table),

        Request::DisableTable { table } => handle_disable_table(db, &table),

        Request::IsTableEnabled { table } => handle_is_table_enabled(db, &table),

        Request::AddFamily { table, family } => handle_add_family(db, &table, &family),

        Request::Put { table, put } => handle_put(db, &table, put),

        Request::Get { table, get } => handle_get(db, &table, &get),

        Request::Delete { table, delete } => handle_delete(db, &table, delete),

        Request::OpenScan { table, scan } => handle_open_scan(db, scanners, table, scan),

        Request::ScanNext { scanner } => handle_scan_next(db, scanners, scanner),

        Request::CloseScan { scanner } => handle_close_scan(scanners, scanner),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_create_table(db: &BasaltDB, table: String, families: Vec<String>) -> Response {
    match db.create_table(TableSchema {
        name: table,
        families,
    }) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_drop_table(db: &BasaltDB, table: &str) -> Response {
    match db.drop_table(table) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_table_exists(db: &BasaltDB, table: &str) -> Response {
    Response::ok_exists(db.table_exists(table))
}

fn handle_list_tables(db: &BasaltDB) -> Response {
    Response::ok_tables(db.list_tables())
}

fn handle_describe_table(db: &BasaltDB, table: &str) -> Response {
    match db.describe_table(table) {
        Ok(schema) => Response::ok_schema(schema),
        Err(e) => error_to_response(e),
    }
}

fn handle_enable_table(db: &BasaltDB, table: &str) -> Response {
    match db.enable_table(table) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_disable_table(db: &BasaltDB, table: &str) -> Response {
    match db.disable_table(table) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_is_table_enabled(db: &BasaltDB, table: &str) -> Response {
    match db.is_table_enabled(table) {
        Ok(enabled) => Response::ok_enabled(enabled),
        Err(e) => error_to_response(e),
    }
}

fn handle_add_family(db: &BasaltDB, table: &str, family: &str) -> Response {
    match db.add_family(table, family) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_put(db: &BasaltDB, table: &str, put: Put) -> Response {
    match db.put(table, put) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_get(db: &BasaltDB, table: &str, get: &Get) -> Response {
    match db.get(table, get) {
        Ok(row) => Response::ok_row(row),
        Err(e) => error_to_response(e),
    }
}

fn handle_delete(db: &BasaltDB, table: &str, delete: Delete) -> Response {
    match db.delete(table, delete) {
        Ok(()) => Response::ok_empty(),
        Err(e) => error_to_response(e),
    }
}

fn handle_open_scan(
    db: &BasaltDB,
    scanners: &mut ScannerRegistry,
    table: String,
    scan: Scan,
) -> Response {
    // Check the table up front so open_scan fails fast rather than on the
    // first scan_next.
    match db.is_table_enabled(&table) {
        Ok(true) => {}
        Ok(false) => return error_to_response(SchemaError::TableNotEnabled(table).into()),
        Err(e) => return error_to_response(e),
    }

    let id = scanners.insert(ScannerState {
        table,
        scan,
        resume: None,
    });
    Response::ok_scanner(id)
}

fn handle_scan_next(db: &BasaltDB, scanners: &mut ScannerRegistry, id: u64) -> Response {
    let Some(state) = scanners.open.get_mut(&id) else {
        return Response::error("ScannerNotFound", format!("no open scanner with id {id}"));
    };

    let limit = state.scan.batch_size();
    match db.scan_page(&state.table, &state.scan, state.resume.as_deref(), limit) {
        Ok(page) => {
            let done = page.resume.is_none();
            state.resume = page.resume;
            if done {
                scanners.open.remove(&id);
            }
            Response::ok_rows(page.rows, done)
        }
        Err(e) => {
            // A failed scan cannot be resumed.
            scanners.open.remove(&id);
            error_to_response(e)
        }
    }
}

fn handle_close_scan(scanners: &mut ScannerRegistry, id: u64) -> Response {
    match scanners.open.remove(&id) {
        Some(_) => Response::ok_empty(),
        None => Response::error("ScannerNotFound", format!("no open scanner with id {id}")),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

fn error_to_response(err: DbError) -> Response {
    let kind = match &err {
        DbError::Schema(e) => match e {
            SchemaError::TableNotFound(_) => "TableNotFound",
            SchemaError::TableAlreadyExists(_) => "TableAlreadyExists",
            SchemaError::TableNotDisabled(_) => "TableNotDisabled",
            SchemaError::TableNotEnabled(_) => "TableNotEnabled",
            SchemaError::FamilyNotFound { .. } => "FamilyNotFound",
            SchemaError::FamilyAlreadyExists { .. } => "FamilyAlreadyExists",
            SchemaError::InvalidName(_) => "InvalidName",
            SchemaError::NoFamilies(_) => "NoFamilies",
        },
        DbError::Mutation(e) => match e {
            MutationError::EmptyPut => "EmptyPut",
            MutationError::EmptyRowKey => "EmptyRowKey",
            MutationError::RowKeyTooLarge { .. } => "RowKeyTooLarge",
        },
        DbError::Filter(FilterError::TooDeep(_)) => "InvalidFilter",
    };
    Response::error(kind, err.to_string())
}
