use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use cadence_core::workflow::{InstanceStore, Step, WorkflowInstance};
use cadence_core::{CadenceError, Result};

const SELECT_COLUMNS: &str = "id, process_id, process_title, process_kind, current_step, \
     status, steps, version, created_at, updated_at";

/// Instance store backed by the `cadence_workflow_instances` table.
#[derive(Clone)]
pub struct PgInstanceStore {
    pool: PgPool,
}

impl PgInstanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

}

/// Raw column values of one instance row, before domain parsing.
#[derive(Debug)]
struct InstanceRow {
    id: Uuid,
    process_id: String,
    process_title: String,
    process_kind: String,
    current_step: String,
    status: String,
    steps: serde_json::Value,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InstanceRow {
    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            process_id: row.try_get("process_id")?,
            process_title: row.try_get("process_title")?,
            process_kind: row.try_get("process_kind")?,
            current_step: row.try_get("current_step")?,
            status: row.try_get("status")?,
            steps: row.try_get("steps")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_instance(self) -> Result<WorkflowInstance> {
        let steps: Vec<Step> = serde_json::from_value(self.steps)?;

        Ok(WorkflowInstance {
            id: self.id,
            process_id: self.process_id,
            process_title: self.process_title,
            process_kind: self.process_kind.parse()?,
            current_step: self.current_step,
            status: self.status.parse()?,
            steps,
            version: self.version as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Parse listed rows, skipping (and logging) any that no longer decode.
fn parse_listed(rows: Vec<InstanceRow>) -> Vec<WorkflowInstance> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match row.into_instance() {
                Ok(instance) => Some(instance),
                Err(e) => {
                    warn!(instance_id = %id, error = %e, "Skipping unreadable workflow instance");
                    None
                }
            }
        })
        .collect()
}

fn read_rows(rows: &[PgRow]) -> Vec<InstanceRow> {
    rows.iter()
        .filter_map(|row| match InstanceRow::from_row(row) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!(error = %e, "Skipping workflow instance row with unreadable columns");
                None
            }
        })
        .collect()
}

impl InstanceStore for PgInstanceStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<()> {
        let expected = instance.version.saturating_sub(1) as i64;

        let result = if instance.version == 1 {
            sqlx::query(
                r#"
                INSERT INTO cadence_workflow_instances (
                    id, process_id, process_title, process_kind, current_step,
                    status, steps, version, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(instance.id)
            .bind(&instance.process_id)
            .bind(&instance.process_title)
            .bind(instance.process_kind.as_str())
            .bind(&instance.current_step)
            .bind(instance.status.as_str())
            .bind(Json(&instance.steps))
            .bind(instance.version as i64)
            .bind(instance.created_at)
            .bind(instance.updated_at)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE cadence_workflow_instances SET
                    process_title = $2,
                    current_step = $3,
                    status = $4,
                    steps = $5,
                    version = $6,
                    updated_at = $7
                WHERE id = $1 AND version = $8
                "#,
            )
            .bind(instance.id)
            .bind(&instance.process_title)
            .bind(&instance.current_step)
            .bind(instance.status.as_str())
            .bind(Json(&instance.steps))
            .bind(instance.version as i64)
            .bind(instance.updated_at)
            .bind(expected)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(CadenceError::Conflict(format!(
                "workflow instance {} is not at version {}",
                instance.id, expected
            )));
        }

        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<WorkflowInstance> {
        let sql = format!(
            "SELECT {} FROM cadence_workflow_instances WHERE id = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("workflow instance {}", id)))?;

        InstanceRow::from_row(&row)?.into_instance()
    }

    async fn list_all(&self) -> Result<Vec<WorkflowInstance>> {
        let sql = format!(
            "SELECT {} FROM cadence_workflow_instances ORDER BY created_at",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(parse_listed(read_rows(&rows)))
    }

    async fn list_active(&self) -> Result<Vec<WorkflowInstance>> {
        let sql = format!(
            "SELECT {} FROM cadence_workflow_instances WHERE status = 'active' ORDER BY created_at",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(parse_listed(read_rows(&rows)))
    }
}
