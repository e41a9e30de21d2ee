//! The walkthrough itself: a fixed sequence of operations against a
//! `site_users`-style table, printing what it does along the way.

use basalt_core::{CompareOp, Delete, Filter, Get, Put, Scan};
use basalt_server::client::{BasaltClient, Result};
use tracing::warn;

use crate::config::DemoConfig;

const FAMILY_PERSONAL: &str = "personal_data";
const FAMILY_PREFERENCES: &str = "preferences";
const EXTRA_FAMILY: &str = "activity";

/// Row key, login, password, email, preferred unit system.
const USERS: [(&str, &str, &str, &str, &str); 3] = [
    ("u1", "user1", "password1", "user1@email.com", "Metric"),
    ("u2", "user2", "password2", "user2@email.com", "Metric!!!"),
    ("u3", "user3", "password3", "user3@email.com", "Imperial"),
];

/// Run every step of the walkthrough in order.
pub async fn run(client: &mut BasaltClient, config: &DemoConfig) -> Result<()> {
    let table = config.table.as_str();

    if config.reset_on_start {
        reset_table(client, table).await?;
    }
    ensure_table(client, table).await?;
    load_users(client, table).await?;
    add_activity_family(client, table).await?;
    fetch_single_value(client, table).await?;
    scan_logins(client, table).await?;
    scan_filtered(client, table).await?;
    churn_throwaway_row(client, table).await?;
    Ok(())
}

/// Drop the table if a previous run left one behind.
async fn reset_table(client: &mut BasaltClient, table: &str) -> Result<()> {
    print!("Dropping '{table}' table... ");
    if client.table_exists(table).await? {
        if client.is_table_enabled(table).await? {
            client.disable_table(table).await?;
        }
        client.drop_table(table).await?;
    }
    println!("Done.");
    Ok(())
}

async fn ensure_table(client: &mut BasaltClient, table: &str) -> Result<()> {
    if client.table_exists(table).await? {
        return Ok(());
    }
    print!("Creating '{table}' table... ");
    client
        .create_table(table, &[FAMILY_PERSONAL, FAMILY_PREFERENCES])
        .await?;
    println!("Done.");
    Ok(())
}

async fn load_users(client: &mut BasaltClient, table: &str) -> Result<()> {
    print!("Inserting data into '{table}' table... ");
    for (key, login, password, email, system) in USERS {
        client
            .put(
                table,
                Put::new(key)
                    .column(FAMILY_PERSONAL, "login", login)
                    .column(FAMILY_PERSONAL, "password", password)
                    .column(FAMILY_PERSONAL, "email", email)
                    .column(FAMILY_PREFERENCES, "system", system),
            )
            .await?;
    }
    println!("Done.");
    Ok(())
}

/// Try to add an extra column family while the table is briefly disabled.
///
/// A failure to add the family is logged and swallowed; the table is
/// re-enabled on every path.
async fn add_activity_family(client: &mut BasaltClient, table: &str) -> Result<()> {
    print!("Adding '{EXTRA_FAMILY}' column family... ");
    client.disable_table(table).await?;
    let added = client.add_family(table, EXTRA_FAMILY).await;
    let enabled = client.enable_table(table).await;
    match added {
        Ok(()) => println!("Done."),
        Err(e) => {
            println!("Failed.");
            warn!(error = %e, family = EXTRA_FAMILY, "could not add column family");
        }
    }
    enabled
}

async fn fetch_single_value(client: &mut BasaltClient, table: &str) -> Result<()> {
    println!("Getting some data from '{table}' table... ");
    let value = fetch_login(client, table, "u1").await?;
    println!("Fetched value: {value}");
    println!("Done.");
    Ok(())
}

async fn scan_logins(client: &mut BasaltClient, table: &str) -> Result<()> {
    println!("Scanning '{table}' table... ");
    let scan = Scan::new().column(FAMILY_PERSONAL, "login");
    let mut scanner = client.scan(table, scan).await?;
    while let Some(row) = scanner.next_row().await? {
        println!("Found row: {row}");
    }
    println!("Done.");
    Ok(())
}

/// Rows whose key starts with `u1` and which carry a qualifier >= `login`.
async fn scan_filtered(client: &mut BasaltClient, table: &str) -> Result<()> {
    println!("Scanning '{table}' table with filter... ");
    let filter = Filter::all([
        Filter::row_prefix("u1"),
        Filter::qualifier(CompareOp::GreaterOrEqual, "login"),
    ]);
    let mut scanner = client.scan(table, Scan::new().filter(filter)).await?;
    while let Some(row) = scanner.next_row().await? {
        println!("Filter matched row: {row}");
    }
    println!("Done.");
    Ok(())
}

/// Insert a throwaway row, read it back, delete it, and show it is gone.
async fn churn_throwaway_row(client: &mut BasaltClient, table: &str) -> Result<()> {
    let key = "strange_mega_user";
    println!("Inserting and deleting some data in '{table}' table... ");

    println!("Inserting a row to be deleted later...");
    client
        .put(
            table,
            Put::new(key).column(FAMILY_PERSONAL, "login", "strange_mega_user_login"),
        )
        .await?;
    println!("Fetching the data: {}", fetch_login(client, table, key).await?);

    println!("Deleting the data...");
    client
        .delete(table, Delete::new(key).column(FAMILY_PERSONAL, "login"))
        .await?;
    println!("Fetching the data: {}", fetch_login(client, table, key).await?);

    println!("Done.");
    Ok(())
}

/// Fetch the `personal_data:login` cell of one row, rendered as text.
async fn fetch_login(client: &mut BasaltClient, table: &str, key: &str) -> Result<String> {
    let get = Get::new(key).column(FAMILY_PERSONAL, "login");
    let row = client.get(table, get).await?;
    Ok(row
        .as_ref()
        .and_then(|r| r.value(FAMILY_PERSONAL, b"login"))
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_else(|| "<absent>".to_string()))
}
