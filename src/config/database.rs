//! Database configuration module for funfun.
//!
//! This module handles database connection and table creation using `SeaORM`.
//! Tables are generated with `Schema::create_table_from_entity` so the schema always
//! matches the entity definitions. The one constraint the entities cannot express,
//! the unique (user, item) pair on investments, is added as a separate index.

use crate::entities::{Account, Comment, Investment, Item, User, investment};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::info;

/// Name of the unique index over `investments (user_id, item_id)`.
pub const INVESTMENT_PAIR_INDEX: &str = "idx_investments_user_item";

/// Establishes a connection pool for the given URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!("Connected to database");
    Ok(db)
}

/// Creates the parent directory of a file-backed `SQLite` database.
///
/// Other URLs, including `sqlite::memory:`, are left alone.
pub fn prepare_sqlite_path(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();

    if let Some(parent) = Path::new(file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables are created parents first so foreign keys resolve on backends that check
/// them at creation time.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Account),
        schema.create_table_from_entity(Item),
        schema.create_table_from_entity(Investment),
        schema.create_table_from_entity(Comment),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let investment_pair = Index::create()
        .name(INVESTMENT_PAIR_INDEX)
        .table(Investment)
        .col(investment::Column::UserId)
        .col(investment::Column::ItemId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&investment_pair)).await?;

    Ok(())
}
