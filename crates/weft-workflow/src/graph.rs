use std::collections::{HashMap, HashSet, VecDeque};

use crate::Edge;
use crate::error::WorkflowError;
use crate::node::Node;

/// Graph structure for traversal and ordering.
///
/// All lists keep declaration order (node order, then edge order) so that
/// every traversal is reproducible.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Node ids in declaration order.
  order: Vec<String>,
  /// node_id -> upstream node_ids (sources of incoming edges).
  dependencies: HashMap<String, Vec<String>>,
  /// node_id -> downstream node_ids (targets of outgoing edges).
  dependents: HashMap<String, Vec<String>>,
  /// node_id -> outgoing edges.
  outgoing: HashMap<String, Vec<Edge>>,
}

impl Graph {
  /// Build a graph from canonical nodes and edges.
  ///
  /// Edges referencing unknown nodes are ignored here; validation reports
  /// them before a graph is ever built for execution.
  pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
    let mut order = Vec::with_capacity(nodes.len());
    let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<Edge>> = HashMap::new();

    for node in nodes {
      if dependencies.contains_key(&node.id) {
        continue;
      }
      order.push(node.id.clone());
      dependencies.insert(node.id.clone(), Vec::new());
      dependents.insert(node.id.clone(), Vec::new());
      outgoing.insert(node.id.clone(), Vec::new());
    }

    for edge in edges {
      if !dependencies.contains_key(&edge.source) || !dependencies.contains_key(&edge.target) {
        continue;
      }

      if let Some(out) = outgoing.get_mut(&edge.source) {
        out.push(edge.clone());
      }
      if let Some(deps) = dependencies.get_mut(&edge.target) {
        if !deps.contains(&edge.source) {
          deps.push(edge.source.clone());
        }
      }
      if let Some(down) = dependents.get_mut(&edge.source) {
        if !down.contains(&edge.target) {
          down.push(edge.target.clone());
        }
      }
    }

    Self {
      order,
      dependencies,
      dependents,
      outgoing,
    }
  }

  /// Node ids in declaration order.
  pub fn node_ids(&self) -> &[String] {
    &self.order
  }

  /// Get upstream nodes for a given node.
  pub fn dependencies(&self, node_id: &str) -> &[String] {
    self
      .dependencies
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get downstream nodes for a given node.
  pub fn dependents(&self, node_id: &str) -> &[String] {
    self
      .dependents
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get the outgoing edges of a node.
  pub fn outgoing(&self, node_id: &str) -> &[Edge] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Nodes with no incoming edges.
  pub fn entry_points(&self) -> Vec<&str> {
    self
      .order
      .iter()
      .filter(|id| self.dependencies(id).is_empty())
      .map(|id| id.as_str())
      .collect()
  }

  /// Topologically order the nodes using Kahn's algorithm.
  ///
  /// Ties between ready nodes are broken by discovery order: the initial
  /// queue is seeded in declaration order and dependents are enqueued in
  /// edge order. Nodes that never reach in-degree zero sit on or behind a
  /// cycle and are reported in declaration order.
  pub fn topological_order(&self) -> Result<Vec<String>, WorkflowError> {
    let mut in_degree: HashMap<&str, usize> = self
      .order
      .iter()
      .map(|id| (id.as_str(), self.dependencies(id).len()))
      .collect();

    let mut queue: VecDeque<&str> = self
      .order
      .iter()
      .map(|id| id.as_str())
      .filter(|id| in_degree.get(id).copied() == Some(0))
      .collect();

    let mut sorted = Vec::with_capacity(self.order.len());

    while let Some(node_id) = queue.pop_front() {
      sorted.push(node_id.to_string());

      for dependent in self.dependents(node_id) {
        if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
          *degree -= 1;
          if *degree == 0 {
            queue.push_back(dependent.as_str());
          }
        }
      }
    }

    if sorted.len() < self.order.len() {
      let placed: HashSet<&str> = sorted.iter().map(|s| s.as_str()).collect();
      let node_ids = self
        .order
        .iter()
        .filter(|id| !placed.contains(id.as_str()))
        .cloned()
        .collect();
      return Err(WorkflowError::CycleDetected { node_ids });
    }

    Ok(sorted)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::NodeType;

  fn node(id: &str) -> Node {
    Node::new(id, NodeType::Action, id)
  }

  fn edge(source: &str, target: &str) -> Edge {
    Edge::new(format!("{source}-{target}"), source, target)
  }

  #[test]
  fn test_dependencies_and_dependents() {
    let nodes = vec![node("a"), node("b"), node("c")];
    let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "c")];
    let graph = Graph::new(&nodes, &edges);

    assert_eq!(graph.dependencies("c"), ["a", "b"]);
    assert_eq!(graph.dependents("a"), ["b", "c"]);
    assert_eq!(graph.outgoing("a").len(), 2);
    assert_eq!(graph.entry_points(), vec!["a"]);
  }

  #[test]
  fn test_duplicate_edges_collapse() {
    let nodes = vec![node("a"), node("b")];
    let edges = vec![edge("a", "b"), Edge::new("dup", "a", "b")];
    let graph = Graph::new(&nodes, &edges);

    assert_eq!(graph.dependencies("b"), ["a"]);
    assert_eq!(graph.outgoing("a").len(), 2);
    assert_eq!(graph.topological_order().unwrap(), vec!["a", "b"]);
  }

  #[test]
  fn test_ties_keep_declaration_order() {
    let nodes = vec![node("t"), node("z"), node("m"), node("a")];
    let edges = vec![edge("t", "z"), edge("t", "m"), edge("t", "a")];
    let graph = Graph::new(&nodes, &edges);

    assert_eq!(graph.topological_order().unwrap(), vec!["t", "z", "m", "a"]);
  }

  #[test]
  fn test_cycle_reports_unsorted_nodes() {
    let nodes = vec![node("t"), node("a"), node("b"), node("c")];
    let edges = vec![edge("t", "a"), edge("a", "b"), edge("b", "a"), edge("b", "c")];
    let graph = Graph::new(&nodes, &edges);

    let err = graph.topological_order().unwrap_err();
    match err {
      WorkflowError::CycleDetected { node_ids } => assert_eq!(node_ids, vec!["a", "b", "c"]),
      other => panic!("expected cycle, got {other:?}"),
    }
  }

  #[test]
  fn test_self_loop_is_cycle() {
    let nodes = vec![node("a")];
    let edges = vec![edge("a", "a")];
    let graph = Graph::new(&nodes, &edges);
    assert!(graph.topological_order().is_err());
  }

  #[test]
  fn test_unknown_edge_endpoints_ignored() {
    let nodes = vec![node("a")];
    let edges = vec![edge("a", "ghost")];
    let graph = Graph::new(&nodes, &edges);
    assert!(graph.outgoing("a").is_empty());
  }
}
