//! Weft Store
//!
//! Persistence for execution and step records. Every write is an upsert so
//! the orchestrator can move a record through its states by re-writing it.
//!
//! - [`MemoryStore`]: in-process, for tests and one-shot runs
//! - [`SqliteStore`]: sqlx-backed, with embedded migrations

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{ExecutionRecord, ExecutionStatus, StepRecord, StepStatus};

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage for execution history.
///
/// Records are only ever written by the orchestrator driving the run they
/// belong to.
#[async_trait]
pub trait Store: Send + Sync {
  /// Insert or replace an execution record.
  async fn upsert_execution(&self, execution: &ExecutionRecord) -> Result<(), StoreError>;

  /// Get an execution by id.
  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, StoreError>;

  /// List executions for a workflow, newest first.
  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRecord>, StoreError>;

  /// Insert or replace a step record, keyed by execution and node.
  async fn upsert_step(&self, step: &StepRecord) -> Result<(), StoreError>;

  /// List the steps of an execution in step order.
  async fn list_steps(&self, execution_id: &str) -> Result<Vec<StepRecord>, StoreError>;
}
