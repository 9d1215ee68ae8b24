//! Property tests for the execution planner.

use std::collections::HashMap;

use proptest::prelude::*;
use weft_config::{EdgeDef, RawNode, WorkflowDef};
use weft_workflow::{ExecutionPlanner, WorkflowError};

/// Build an acyclic graph with one trigger and no orphans.
///
/// Node `n0` is the trigger. Every other node `ni` gets one edge from a node
/// with a smaller index plus optional extra edges from smaller indices.
/// Declaration order is shuffled by `order_keys` so the planner cannot rely
/// on nodes arriving pre-sorted.
fn random_dag(shape: &[(u32, u32, bool)], order_keys: &[u32]) -> WorkflowDef {
  let count = shape.len() + 1;
  let mut def = WorkflowDef::new("prop", "Generated");

  let mut declared: Vec<usize> = (0..count).collect();
  declared.sort_by_key(|i| order_keys.get(*i).copied().unwrap_or(0));
  for i in declared {
    let kind = if i == 0 { "trigger" } else { "action" };
    def = def.node(RawNode::flat(format!("n{i}"), kind, format!("Node {i}")));
  }

  for (offset, (parent_seed, extra_seed, with_extra)) in shape.iter().enumerate() {
    let i = offset + 1;
    let parent = *parent_seed as usize % i;
    def = def.edge(EdgeDef::new(format!("e{i}"), format!("n{parent}"), format!("n{i}")));
    if *with_extra {
      let extra = *extra_seed as usize % i;
      def = def.edge(EdgeDef::new(format!("x{i}"), format!("n{extra}"), format!("n{i}")));
    }
  }

  def
}

proptest! {
  #[test]
  fn plan_is_topological(
    shape in prop::collection::vec((any::<u32>(), any::<u32>(), any::<bool>()), 0..30),
    order_keys in prop::collection::vec(any::<u32>(), 31),
  ) {
    let def = random_dag(&shape, &order_keys);
    let plan = ExecutionPlanner::plan(&def).unwrap();

    prop_assert_eq!(plan.len(), def.nodes.len());

    let position: HashMap<&str, usize> = plan
      .iter()
      .enumerate()
      .map(|(i, s)| (s.node_id.as_str(), i))
      .collect();

    for step in plan.iter() {
      for dep in &step.dependencies {
        prop_assert!(position[dep.as_str()] < position[step.node_id.as_str()]);
      }
    }
  }

  #[test]
  fn plan_rejects_any_back_edge(
    shape in prop::collection::vec((any::<u32>(), any::<u32>(), any::<bool>()), 1..30),
    order_keys in prop::collection::vec(any::<u32>(), 31),
    pick in any::<prop::sample::Index>(),
  ) {
    let mut def = random_dag(&shape, &order_keys);

    let forward = def.edges[pick.index(def.edges.len())].clone();
    def.edges.push(EdgeDef::new("back", forward.target.clone(), forward.source.clone()));

    match ExecutionPlanner::plan(&def) {
      Err(WorkflowError::CycleDetected { node_ids }) => {
        prop_assert!(node_ids.contains(&forward.source) || node_ids.contains(&forward.target));
      }
      other => prop_assert!(false, "expected cycle error, got {:?}", other),
    }
  }
}
