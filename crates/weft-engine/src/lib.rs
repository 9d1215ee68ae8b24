//! Weft Engine
//!
//! Triggers runs of a single workflow from a channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                         │
//! │  - owns mpsc channel (sender + receiver)                    │
//! │  - run(trigger) queues an execution                         │
//! │  - start(cancel) spawns one task per received trigger       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WorkflowRuntime                         │
//! │  - plan, normalize, resolve, dispatch, persist              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let runtime = Arc::new(WorkflowRuntime::new(registry, store, RuntimeConfig::default()));
//! let runner = WorkflowRunner::new(runtime, workflow);
//!
//! // hand this to webhooks, schedulers, the CLI
//! let sender = runner.sender();
//!
//! let cancel = CancellationToken::new();
//! runner.start(cancel).await?;
//! ```

mod runner;

pub use runner::{EngineError, Trigger, WorkflowRunner};
