use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node '{node_id}' has no type")]
  MissingNodeType { node_id: String },

  #[error("workflow graph contains a cycle or unreachable nodes: {}", node_ids.join(", "))]
  CycleDetected { node_ids: Vec<String> },

  #[error(transparent)]
  Validation(#[from] ValidationErrors),
}

/// A single structural problem found while validating a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("workflow has no nodes")]
  Empty,

  #[error("workflow has no trigger node")]
  NoTrigger,

  #[error("duplicate node id: {node_id}")]
  DuplicateNodeId { node_id: String },

  #[error("node '{node_id}' has no type")]
  MissingNodeType { node_id: String },

  #[error("edge '{edge_id}' references unknown node '{node_id}'")]
  InvalidEdge { edge_id: String, node_id: String },

  #[error("node '{node_id}' has no incoming edges but is not a trigger (orphan node)")]
  OrphanNode { node_id: String },
}

/// Every validation problem of a graph, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
  pub fn errors(&self) -> &[ValidationError] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "workflow validation failed: ")?;
    for (i, err) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, "; ")?;
      }
      write!(f, "{err}")?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}
