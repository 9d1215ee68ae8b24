//! Weft Workflow
//!
//! This crate turns a raw [`weft_config::WorkflowDef`] into something the
//! runtime can execute:
//!
//! - Every accepted raw node shape is adapted into one canonical [`Node`]
//!   ([`Node::from_raw`]) before anything else looks at it
//! - [`Graph`] indexes dependencies and outgoing edges in declaration order
//! - [`ExecutionPlanner`] validates the graph (collecting every problem) and
//!   produces an [`ExecutionPlan`] in topological order
//!
//! A plan is built fresh for every run and is never persisted.

mod error;
mod graph;
mod node;
mod plan;

pub use error::{ValidationError, ValidationErrors, WorkflowError};
pub use graph::Graph;
pub use node::{Node, NodeType, label_slug};
pub use plan::{ExecutionPlan, ExecutionPlanner, Step};
pub use weft_config::EdgeDef as Edge;
