//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Schema steps in ascending version order; each runs in one transaction.
const MIGRATIONS: &[(i32, &[&str])] = &[(
    1,
    &[
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // One JSON document per key (`notes`, `messages`)
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    ],
)];

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    for &(target, statements) in MIGRATIONS.iter().filter(|(target, _)| *target > version) {
        apply(conn, target, statements).await?;
        tracing::info!(version = target, "Migrated local store schema");
    }

    tracing::debug!(version = CURRENT_VERSION, "Local store schema is current");
    Ok(())
}

/// Highest applied version; 0 for a fresh database.
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut tables = conn
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    if tables.next().await?.is_none() {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let outcome = async {
        for stmt in statements {
            conn.execute(stmt, ()).await?;
        }
        conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
            .await?;
        conn.execute("COMMIT", ()).await
    }
    .await;

    if let Err(error) = outcome {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }
    Ok(())
}
