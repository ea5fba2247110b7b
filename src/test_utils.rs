//! Shared test utilities for funfun.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{account, item},
    entities,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

static FILE_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
///
/// The pool is capped at one connection: every `sqlite::memory:` connection is a
/// separate database, and a single connection also makes concurrent transactions
/// queue behind each other the way a file database's writer lock does.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A file-backed `SQLite` database in its own temporary directory.
/// The directory is removed when this is dropped.
pub struct TestFileDb {
    /// Pool with several connections, so transactions really run side by side
    pub db: DatabaseConnection,
    dir: PathBuf,
}

impl Drop for TestFileDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Creates a file-backed database with `connections` pooled connections and all
/// tables initialized.
///
/// Use this when a test needs real contention between writers; the in-memory
/// database from [`setup_test_db`] queues every transaction on its one connection.
pub async fn setup_file_db(connections: u32) -> Result<TestFileDb> {
    let dir = std::env::temp_dir().join(format!(
        "funfun-test-{}-{}",
        std::process::id(),
        FILE_DB_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let url = format!("sqlite://{}/funfun.sqlite?mode=rwc", dir.display());
    crate::config::database::prepare_sqlite_path(&url)?;

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(connections)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(TestFileDb { db, dir })
}

/// Shorthand for a calendar date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Creates a user with an account holding `balance`.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    balance: i64,
) -> Result<entities::user::Model> {
    account::create_user(db, username, balance).await
}

/// Creates a test item with sensible defaults.
///
/// # Defaults
/// * `category`: 1
/// * `target_price`: 1000
/// * `end_period`: 2030-12-31
pub async fn create_test_item(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
) -> Result<entities::item::Model> {
    create_custom_item(db, owner_id, name, 1, 1_000, date(2030, 12, 31)).await
}

/// Creates a test item with custom parameters.
pub async fn create_custom_item(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
    category: i32,
    target_price: i64,
    end_period: NaiveDate,
) -> Result<entities::item::Model> {
    item::create_item(
        db,
        owner_id,
        item::ItemDraft {
            name: name.to_string(),
            description: format!("{name} description"),
            category,
            target_price,
            end_period,
        },
    )
    .await
}

/// Reads a user's current balance.
pub async fn get_balance(db: &DatabaseConnection, user_id: i64) -> Result<i64> {
    account::get_account(db, user_id)
        .await?
        .map(|a| a.balance)
        .ok_or(Error::NotFound {
            entity: "account",
            id: user_id,
        })
}

/// Sets up a complete test environment with an owner and one of their items.
/// Returns (db, owner, item) for common test scenarios.
pub async fn setup_with_item() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::item::Model,
)> {
    let db = setup_test_db().await?;
    let owner = create_test_user(&db, "owner", 0).await?;
    let item = create_test_item(&db, owner.id, "Test Item").await?;
    Ok((db, owner, item))
}
