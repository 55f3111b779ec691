//! Migration runner guarded by a Postgres advisory lock.
//!
//! Several cadence processes may start against the same database; only one
//! applies pending migrations while the others wait on the lock.

use std::collections::HashSet;

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tracing::{debug, info, warn};

use cadence_core::error::{CadenceError, Result};

/// "CADENCE" in ascii hex.
const MIGRATION_LOCK_ID: i64 = 0x43_4144_454E_4345;

/// A single named migration.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique name, e.g. "0001_workflow_instances".
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Migrations shipped with the runtime, in application order.
pub fn builtin_migrations() -> Vec<Migration> {
    vec![Migration::new(
        "0001_workflow_instances",
        include_str!("../../migrations/0001_workflow_instances.sql"),
    )]
}

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply every builtin migration not yet recorded.
    pub async fn run(&self) -> Result<()> {
        self.run_with(builtin_migrations()).await
    }

    /// Apply the given migrations under the advisory lock.
    ///
    /// The lock is session scoped, so the whole run happens on one connection.
    pub async fn run_with(&self, migrations: Vec<Migration>) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| {
                CadenceError::Persistence(format!("Failed to acquire connection: {}", e))
            })?;

        acquire_lock(&mut conn).await?;
        let result = apply_pending(&mut conn, migrations).await;
        if let Err(e) = release_lock(&mut conn).await {
            warn!("Failed to release migration lock: {}", e);
        }

        result
    }
}

async fn apply_pending(
    conn: &mut PoolConnection<Postgres>,
    migrations: Vec<Migration>,
) -> Result<()> {
    ensure_migrations_table(conn).await?;

    let applied = applied_migrations(conn).await?;
    debug!("Already applied migrations: {:?}", applied);

    for migration in migrations {
        if !applied.contains(&migration.name) {
            apply_migration(conn, &migration).await?;
        }
    }

    Ok(())
}

async fn acquire_lock(conn: &mut PoolConnection<Postgres>) -> Result<()> {
    debug!("Acquiring migration lock");
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut **conn)
        .await
        .map_err(|e| {
            CadenceError::Persistence(format!("Failed to acquire migration lock: {}", e))
        })?;
    Ok(())
}

async fn release_lock(conn: &mut PoolConnection<Postgres>) -> Result<()> {
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut **conn)
        .await
        .map_err(|e| {
            CadenceError::Persistence(format!("Failed to release migration lock: {}", e))
        })?;
    debug!("Migration lock released");
    Ok(())
}

async fn ensure_migrations_table(conn: &mut PoolConnection<Postgres>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cadence_migrations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) UNIQUE NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut **conn)
    .await
    .map_err(|e| {
        CadenceError::Persistence(format!("Failed to create migrations table: {}", e))
    })?;
    Ok(())
}

async fn applied_migrations(conn: &mut PoolConnection<Postgres>) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM cadence_migrations")
        .fetch_all(&mut **conn)
        .await
        .map_err(|e| {
            CadenceError::Persistence(format!("Failed to read applied migrations: {}", e))
        })?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

async fn apply_migration(conn: &mut PoolConnection<Postgres>, migration: &Migration) -> Result<()> {
    info!("Applying migration: {}", migration.name);

    for statement in split_statements(&migration.sql) {
        sqlx::query(&statement)
            .execute(&mut **conn)
            .await
            .map_err(|e| {
                CadenceError::Persistence(format!(
                    "Failed to apply migration '{}': {}",
                    migration.name, e
                ))
            })?;
    }

    sqlx::query("INSERT INTO cadence_migrations (name) VALUES ($1)")
        .bind(&migration.name)
        .execute(&mut **conn)
        .await
        .map_err(|e| {
            CadenceError::Persistence(format!(
                "Failed to record migration '{}': {}",
                migration.name, e
            ))
        })?;

    info!("Migration applied: {}", migration.name);
    Ok(())
}

/// Split a script on `;`, dropping comment lines and empty statements.
///
/// The shipped migrations contain no function bodies, so dollar quoting is
/// not handled.
fn split_statements(sql: &str) -> Vec<String> {
    let stripped: String = sql
        .lines()
        .filter(|l| !l.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    stripped
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_statements("SELECT 1; SELECT 2;\nSELECT 3");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_drops_comments() {
        let sql = "-- header\nCREATE TABLE t (id INT);\n-- trailing\n";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec!["CREATE TABLE t (id INT)"]);
    }

    #[test]
    fn test_builtin_migrations() {
        let migrations = builtin_migrations();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].name, "0001_workflow_instances");

        let stmts = split_statements(&migrations[0].sql);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].contains("cadence_workflow_instances"));
    }
}
