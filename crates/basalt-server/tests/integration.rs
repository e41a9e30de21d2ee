//! Integration tests for basalt-server: start server, connect client, verify ops.

use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::{Duration, sleep};

use basalt_core::{BasaltDB, CompareOp, Delete, Filter, Get, Put, Scan};
use basalt_server::client::BasaltClient;
use basalt_server::error::{ClientError, ServerErrorKind};
use basalt_server::server::BasaltServer;

/// Start a server on a temp socket and return the socket path.
/// The server runs in a background tokio task.
async fn start_test_server() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("test.sock");

    let server = BasaltServer::new(BasaltDB::new(), socket_path.clone());
    tokio::spawn(async move {
        server.run().await.unwrap();
    });

    // Give the server a moment to bind.
    sleep(Duration::from_millis(50)).await;

    (dir, socket_path)
}

#[tokio::test]
async fn test_ping_and_table_admin() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client.ping().await.unwrap();

    assert!(!client.table_exists("site_users").await.unwrap());
    client
        .create_table("site_users", &["personal_data", "preferences"])
        .await
        .unwrap();
    assert!(client.table_exists("site_users").await.unwrap());
    assert!(client.is_table_enabled("site_users").await.unwrap());

    let tables = client.list_tables().await.unwrap();
    assert_eq!(tables, vec!["site_users"]);

    let schema = client.describe_table("site_users").await.unwrap();
    assert_eq!(schema.name, "site_users");
    assert_eq!(schema.families, vec!["personal_data", "preferences"]);

    // Creating the same table twice fails.
    let err = client
        .create_table("site_users", &["personal_data"])
        .await
        .unwrap_err();
    assert!(err.is_table_already_exists());

    // Dropping requires disabling first.
    assert!(client.drop_table("site_users").await.is_err());
    client.disable_table("site_users").await.unwrap();
    assert!(!client.is_table_enabled("site_users").await.unwrap());
    client.drop_table("site_users").await.unwrap();
    assert!(!client.table_exists("site_users").await.unwrap());

    let err = client.drop_table("site_users").await.unwrap_err();
    assert!(err.is_table_not_found());
}

#[tokio::test]
async fn test_put_get_delete() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client.create_table("t", &["fam"]).await.unwrap();

    client
        .put(
            "t",
            Put::new("r1").column("fam", "a", "1").column("fam", "b", "2"),
        )
        .await
        .unwrap();

    let row = client.get("t", Get::new("r1")).await.unwrap().unwrap();
    assert_eq!(row.key, b"r1");
    assert_eq!(row.value("fam", b"a"), Some(&b"1"[..]));
    assert!(row.cells.iter().all(|c| c.timestamp > 0));

    // Restricted get returns just the named column.
    let row = client
        .get("t", Get::new("r1").column("fam", "b"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.cells.len(), 1);
    assert_eq!(row.cells[0].qualifier, b"b");

    // Missing row is None, not an error.
    assert!(client.get("t", Get::new("nope")).await.unwrap().is_none());

    // Delete one column, then the whole row.
    client
        .delete("t", Delete::new("r1").column("fam", "a"))
        .await
        .unwrap();
    let row = client.get("t", Get::new("r1")).await.unwrap().unwrap();
    assert_eq!(row.value("fam", b"a"), None);

    client.delete("t", Delete::new("r1")).await.unwrap();
    assert!(client.get("t", Get::new("r1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_scan_pages_through_all_rows() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client.create_table("t", &["fam"]).await.unwrap();

    for key in ["b", "a", "d", "c", "e"] {
        client
            .put("t", Put::new(key).column("fam", "q", key))
            .await
            .unwrap();
    }

    // A batch smaller than the row count forces several scan_next round trips.
    let scanner = client.scan("t", Scan::new().batch(2)).await.unwrap();
    let rows = scanner.collect_rows().await.unwrap();
    let keys: Vec<&[u8]> = rows.iter().map(|r| r.key.as_slice()).collect();
    assert_eq!(
        keys,
        vec![&b"a"[..], &b"b"[..], &b"c"[..], &b"d"[..], &b"e"[..]]
    );

    // Row-at-a-time iteration sees the same order, and closing an
    // exhausted scanner is a no-op.
    let mut scanner = client.scan("t", Scan::new().batch(2)).await.unwrap();
    let mut keys = Vec::new();
    while let Some(row) = scanner.next_row().await.unwrap() {
        keys.push(row.key);
    }
    assert_eq!(keys.len(), 5);
    scanner.close().await.unwrap();
}

#[tokio::test]
async fn test_scanner_close_releases_connection() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client.create_table("t", &["fam"]).await.unwrap();
    for key in ["a", "b", "c"] {
        client
            .put("t", Put::new(key).column("fam", "q", key))
            .await
            .unwrap();
    }

    let mut scanner = client.scan("t", Scan::new().batch(1)).await.unwrap();
    let first = scanner.next_row().await.unwrap().unwrap();
    assert_eq!(first.key, b"a");
    scanner.close().await.unwrap();

    // The connection stays usable after an early close.
    client.ping().await.unwrap();
    let row = client.get("t", Get::new("b")).await.unwrap();
    assert!(row.is_some());
}

#[tokio::test]
async fn test_scanners_are_isolated_per_connection() {
    let (_dir, sock) = start_test_server().await;
    let mut admin = BasaltClient::connect(&sock).await.unwrap();
    admin.create_table("t", &["fam"]).await.unwrap();
    for key in ["a", "b", "c"] {
        admin
            .put("t", Put::new(key).column("fam", "q", key))
            .await
            .unwrap();
    }

    let mut one = BasaltClient::connect(&sock).await.unwrap();
    let mut two = BasaltClient::connect(&sock).await.unwrap();

    // Interleave two scanners over separate connections; each advances
    // independently.
    let mut scan_one = one.scan("t", Scan::new().batch(1)).await.unwrap();
    let mut scan_two = two.scan("t", Scan::new().batch(1)).await.unwrap();

    assert_eq!(scan_one.next_row().await.unwrap().unwrap().key, b"a");
    assert_eq!(scan_two.next_row().await.unwrap().unwrap().key, b"a");
    assert_eq!(scan_one.next_row().await.unwrap().unwrap().key, b"b");
    assert_eq!(scan_two.next_row().await.unwrap().unwrap().key, b"b");
    assert_eq!(scan_one.next_row().await.unwrap().unwrap().key, b"c");
    assert!(scan_one.next_row().await.unwrap().is_none());
    assert_eq!(scan_two.next_row().await.unwrap().unwrap().key, b"c");
}

#[tokio::test]
async fn test_disabled_table_rejects_data_ops() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client.create_table("t", &["fam"]).await.unwrap();
    client
        .put("t", Put::new("r1").column("fam", "q", "v"))
        .await
        .unwrap();
    client.disable_table("t").await.unwrap();

    let err = client
        .put("t", Put::new("r2").column("fam", "q", "v"))
        .await
        .unwrap_err();
    match err {
        ClientError::Server {
            kind: ServerErrorKind::TableNotEnabled,
            ..
        } => {}
        other => panic!("expected TableNotEnabled, got: {other:?}"),
    }

    let err = client.get("t", Get::new("r1")).await.unwrap_err();
    match err {
        ClientError::Server {
            kind: ServerErrorKind::TableNotEnabled,
            ..
        } => {}
        other => panic!("expected TableNotEnabled, got: {other:?}"),
    }

    // open_scan refuses up front too.
    match client.scan("t", Scan::new()).await {
        Err(ClientError::Server {
            kind: ServerErrorKind::TableNotEnabled,
            ..
        }) => {}
        Err(other) => panic!("expected TableNotEnabled, got: {other:?}"),
        Ok(_) => panic!("expected TableNotEnabled, scan succeeded"),
    }

    client.enable_table("t").await.unwrap();
    assert!(client.get("t", Get::new("r1")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_add_family_lifecycle() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client
        .create_table("site_users", &["personal_data"])
        .await
        .unwrap();

    // Adding to an enabled table fails.
    assert!(client.add_family("site_users", "activity").await.is_err());

    client.disable_table("site_users").await.unwrap();
    client.add_family("site_users", "activity").await.unwrap();
    client.enable_table("site_users").await.unwrap();

    let schema = client.describe_table("site_users").await.unwrap();
    assert_eq!(schema.families, vec!["personal_data", "activity"]);

    // The new family accepts writes.
    client
        .put(
            "site_users",
            Put::new("u1").column("activity", "last_login", "today"),
        )
        .await
        .unwrap();
    let row = client.get("site_users", Get::new("u1")).await.unwrap().unwrap();
    assert_eq!(row.value("activity", b"last_login"), Some(&b"today"[..]));
}

#[tokio::test]
async fn test_connect_to_missing_socket_is_unreachable() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("no-server.sock");

    let err = BasaltClient::connect(&missing).await.unwrap_err();
    match err {
        ClientError::Unreachable { path, .. } => assert_eq!(path, missing),
        other => panic!("expected Unreachable, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_protocol_errors_keep_connection_alive() {
    let (_dir, sock) = start_test_server().await;

    let stream = UnixStream::connect(&sock).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // Unknown scanner id.
    writer
        .write_all(b"{\"op\":\"scan_next\",\"scanner\":42}\n")
        .await
        .unwrap();
    reader.read_line(&mut line).await.unwrap();
    let resp: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(resp["error"], "ScannerNotFound");

    // Malformed line.
    line.clear();
    writer.write_all(b"this is not json\n").await.unwrap();
    reader.read_line(&mut line).await.unwrap();
    let resp: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(resp["error"], "ParseError");

    // The connection survives both.
    line.clear();
    writer.write_all(b"{\"op\":\"ping\"}\n").await.unwrap();
    reader.read_line(&mut line).await.unwrap();
    let resp: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(resp["ok"], true);
}

#[tokio::test]
async fn test_site_users_walkthrough() {
    let (_dir, sock) = start_test_server().await;
    let mut client = BasaltClient::connect(&sock).await.unwrap();
    client.ping().await.unwrap();

    client
        .create_table("site_users", &["personal_data", "preferences"])
        .await
        .unwrap();

    for (key, login, password, email, system) in [
        ("u1", "user1", "password1", "user1@email.com", "Metric"),
        ("u2", "user2", "password2", "user2@email.com", "Metric!!!"),
        ("u3", "user3", "password3", "user3@email.com", "Imperial"),
    ] {
        client
            .put(
                "site_users",
                Put::new(key)
                    .column("personal_data", "login", login)
                    .column("personal_data", "password", password)
                    .column("personal_data", "email", email)
                    .column("preferences", "system", system),
            )
            .await
            .unwrap();
    }

    // Point read of one cell.
    let row = client
        .get("site_users", Get::new("u1").column("personal_data", "login"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.value("personal_data", b"login"), Some(&b"user1"[..]));

    // Restricted scan sees all three users in key order.
    let rows = client
        .scan("site_users", Scan::new().column("personal_data", "login"))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    let logins: Vec<&[u8]> = rows.iter().map(|r| r.cells[0].value.as_slice()).collect();
    assert_eq!(logins, vec![&b"user1"[..], &b"user2"[..], &b"user3"[..]]);

    // Filtered scan matches only u1, pruning qualifiers that sort below
    // "login".
    let scan = Scan::new().filter(Filter::all([
        Filter::row_prefix("u1"),
        Filter::qualifier(CompareOp::GreaterOrEqual, "login"),
    ]));
    let rows = client
        .scan("site_users", scan)
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, b"u1");
    let quals: Vec<&[u8]> = rows[0]
        .cells
        .iter()
        .map(|c| c.qualifier.as_slice())
        .collect();
    assert_eq!(quals, vec![&b"login"[..], &b"password"[..], &b"system"[..]]);

    // Churn a throwaway row: write, read back, delete, verify gone.
    let key = "strange_mega_user";
    client
        .put(
            "site_users",
            Put::new(key).column("personal_data", "login", "strange_mega_user_login"),
        )
        .await
        .unwrap();
    let row = client.get("site_users", Get::new(key)).await.unwrap().unwrap();
    assert_eq!(
        row.value("personal_data", b"login"),
        Some(&b"strange_mega_user_login"[..])
    );
    client
        .delete("site_users", Delete::new(key).column("personal_data", "login"))
        .await
        .unwrap();
    assert!(client.get("site_users", Get::new(key)).await.unwrap().is_none());
}
