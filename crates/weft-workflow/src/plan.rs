use std::collections::{HashMap, HashSet};

use weft_config::WorkflowDef;

use crate::Edge;
use crate::error::{ValidationError, ValidationErrors, WorkflowError};
use crate::graph::Graph;
use crate::node::{Node, NodeType};

/// One entry of an execution plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
  /// Position of the step in the plan, starting at 0.
  pub step_order: usize,
  pub node_id: String,
  pub node: Node,
  /// Upstream node ids, in edge order.
  pub dependencies: Vec<String>,
  pub outgoing_edges: Vec<Edge>,
}

/// Topologically ordered steps for a single run.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
  pub workflow_id: String,
  steps: Vec<Step>,
  index: HashMap<String, usize>,
}

impl ExecutionPlan {
  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn iter(&self) -> impl Iterator<Item = &Step> {
    self.steps.iter()
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn step(&self, node_id: &str) -> Option<&Step> {
    self.index.get(node_id).map(|&i| &self.steps[i])
  }

  pub fn dependencies(&self, node_id: &str) -> &[String] {
    self
      .step(node_id)
      .map(|s| s.dependencies.as_slice())
      .unwrap_or(&[])
  }

  pub fn outgoing(&self, node_id: &str) -> &[Edge] {
    self
      .step(node_id)
      .map(|s| s.outgoing_edges.as_slice())
      .unwrap_or(&[])
  }
}

/// Validates raw graphs and turns them into execution plans.
pub struct ExecutionPlanner;

impl ExecutionPlanner {
  /// Validate then build: the entry point used before every run.
  pub fn plan(def: &WorkflowDef) -> Result<ExecutionPlan, WorkflowError> {
    Self::validate(def)?;
    Self::build(def)
  }

  /// Check the structure of a graph without ordering it.
  ///
  /// Every violation is collected so the caller can surface all of them at
  /// once.
  pub fn validate(def: &WorkflowDef) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if def.nodes.is_empty() {
      errors.push(ValidationError::Empty);
      return Err(ValidationErrors(errors));
    }

    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(def.nodes.len());
    for raw in &def.nodes {
      if !seen.insert(raw.id.as_str()) {
        errors.push(ValidationError::DuplicateNodeId {
          node_id: raw.id.clone(),
        });
        continue;
      }
      match Node::from_raw(raw) {
        Ok(node) => nodes.push(node),
        Err(_) => errors.push(ValidationError::MissingNodeType {
          node_id: raw.id.clone(),
        }),
      }
    }

    if !nodes.iter().any(|n| n.node_type == NodeType::Trigger) {
      errors.push(ValidationError::NoTrigger);
    }

    for edge in &def.edges {
      for endpoint in [&edge.source, &edge.target] {
        if !seen.contains(endpoint.as_str()) {
          errors.push(ValidationError::InvalidEdge {
            edge_id: edge.id.clone(),
            node_id: endpoint.clone(),
          });
        }
      }
    }

    let targets: HashSet<&str> = def.edges.iter().map(|e| e.target.as_str()).collect();
    for node in &nodes {
      if !node.is_trigger() && !targets.contains(node.id.as_str()) {
        errors.push(ValidationError::OrphanNode {
          node_id: node.id.clone(),
        });
      }
    }

    if errors.is_empty() {
      Ok(())
    } else {
      Err(ValidationErrors(errors))
    }
  }

  /// Normalize the nodes and order them with Kahn's algorithm.
  ///
  /// Fails when a node has no type or when fewer nodes can be ordered than
  /// exist (cycle or a node stranded behind one).
  pub fn build(def: &WorkflowDef) -> Result<ExecutionPlan, WorkflowError> {
    let nodes = def
      .nodes
      .iter()
      .map(Node::from_raw)
      .collect::<Result<Vec<_>, _>>()?;

    let graph = Graph::new(&nodes, &def.edges);
    let sorted = graph.topological_order()?;

    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut steps = Vec::with_capacity(sorted.len());
    let mut index = HashMap::with_capacity(sorted.len());
    for (step_order, node_id) in sorted.into_iter().enumerate() {
      let Some(node) = by_id.get(node_id.as_str()) else {
        continue;
      };
      index.insert(node_id.clone(), step_order);
      steps.push(Step {
        step_order,
        dependencies: graph.dependencies(&node_id).to_vec(),
        outgoing_edges: graph.outgoing(&node_id).to_vec(),
        node: (*node).clone(),
        node_id,
      });
    }

    Ok(ExecutionPlan {
      workflow_id: def.workflow_id.clone(),
      steps,
      index,
    })
  }
}
