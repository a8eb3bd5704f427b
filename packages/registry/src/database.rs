use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr};
use tracing::{info, warn};

use crate::entity::file;

pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    if db_url.starts_with("sqlite::memory:") {
        // Each connection to an in-memory SQLite database sees its own database,
        // so the pool must hold exactly one connection and never recycle it.
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(60));
    }
    opt.sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("registry::entity::*")
        .sync(&db)
        .await?;
    ensure_indexes(&db).await?;

    Ok(db)
}

/// Ensure composite indexes exist.
///
/// Schema sync only creates the single-column indexes declared on entities.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Listing a user's files newest first:
    // SELECT ... FROM file WHERE user_id = ? ORDER BY created_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_file_user_created")
        .table(file::Entity)
        .col(file::Column::UserId)
        .col(file::Column::CreatedAt)
        .to_owned();

    let sql = match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index idx_file_user_created exists"),
        Err(e) => warn!("Failed to create index idx_file_user_created: {}", e),
    }

    Ok(())
}
