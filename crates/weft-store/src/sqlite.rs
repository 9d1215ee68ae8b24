use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{ExecutionRecord, StepRecord, Store, StoreError};

/// SQLite-based store implementation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) the database at `url` and run migrations.
  pub async fn connect(url: &str) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn upsert_execution(&self, execution: &ExecutionRecord) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO executions
        (execution_id, workflow_id, user_id, status, trigger_data, started_at, completed_at, duration_ms, error)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
      ON CONFLICT (execution_id) DO UPDATE SET
        status = excluded.status,
        completed_at = excluded.completed_at,
        duration_ms = excluded.duration_ms,
        error = excluded.error
      "#,
    )
    .bind(&execution.execution_id)
    .bind(&execution.workflow_id)
    .bind(&execution.user_id)
    .bind(execution.status)
    .bind(&execution.trigger_data)
    .bind(execution.started_at)
    .bind(execution.completed_at)
    .bind(execution.duration_ms)
    .bind(&execution.error)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, StoreError> {
    sqlx::query_as(
      r#"
      SELECT execution_id, workflow_id, user_id, status, trigger_data, started_at, completed_at, duration_ms, error
      FROM executions
      WHERE execution_id = ?
      "#,
    )
    .bind(execution_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(execution_id.to_string()))
  }

  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRecord>, StoreError> {
    let rows = sqlx::query_as(
      r#"
      SELECT execution_id, workflow_id, user_id, status, trigger_data, started_at, completed_at, duration_ms, error
      FROM executions
      WHERE workflow_id = ?
      ORDER BY started_at DESC
      "#,
    )
    .bind(workflow_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn upsert_step(&self, step: &StepRecord) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO steps
        (execution_id, node_id, name, node_type, status, step_order, started_at, completed_at, duration_ms, output_summary, error)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
      ON CONFLICT (execution_id, node_id) DO UPDATE SET
        status = excluded.status,
        completed_at = excluded.completed_at,
        duration_ms = excluded.duration_ms,
        output_summary = excluded.output_summary,
        error = excluded.error
      "#,
    )
    .bind(&step.execution_id)
    .bind(&step.node_id)
    .bind(&step.name)
    .bind(&step.node_type)
    .bind(step.status)
    .bind(step.step_order)
    .bind(step.started_at)
    .bind(step.completed_at)
    .bind(step.duration_ms)
    .bind(&step.output_summary)
    .bind(&step.error)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn list_steps(&self, execution_id: &str) -> Result<Vec<StepRecord>, StoreError> {
    let rows = sqlx::query_as(
      r#"
      SELECT execution_id, node_id, name, node_type, status, step_order, started_at, completed_at, duration_ms, output_summary, error
      FROM steps
      WHERE execution_id = ?
      ORDER BY step_order ASC
      "#,
    )
    .bind(execution_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }
}
