//! Conditional branch skipping.

use std::collections::HashSet;

use weft_workflow::ExecutionPlan;

/// Skip every node behind a branch of `condition_id` that was not taken.
///
/// Only edges tagged with a `sourceHandle` other than `taken` are followed.
/// A target that the condition also reaches through the taken branch or an
/// untagged edge is left alone. Returns the newly skipped node ids.
pub fn mark_untaken_branches(
  plan: &ExecutionPlan,
  condition_id: &str,
  taken: &str,
  skipped: &mut HashSet<String>,
) -> Vec<String> {
  let outgoing = plan.outgoing(condition_id);
  let live: HashSet<&str> = outgoing
    .iter()
    .filter(|e| e.source_handle.as_deref().is_none_or(|h| h == taken))
    .map(|e| e.target.as_str())
    .collect();

  let mut newly = Vec::new();
  for edge in outgoing {
    let Some(handle) = edge.source_handle.as_deref() else {
      continue;
    };
    if handle != taken && !live.contains(edge.target.as_str()) {
      newly.extend(mark_branch_for_skipping(plan, &edge.target, condition_id, skipped));
    }
  }
  newly
}

/// Skip `node_id` and everything reachable only through it.
///
/// A node stays live while any dependency other than `condition_id` is not
/// skipped. Each newly skipped node re-queues its targets, so a node with
/// several skipped parents is re-checked once the last one is skipped.
pub fn mark_branch_for_skipping(
  plan: &ExecutionPlan,
  node_id: &str,
  condition_id: &str,
  skipped: &mut HashSet<String>,
) -> Vec<String> {
  let mut newly = Vec::new();
  let mut stack = vec![node_id.to_string()];

  while let Some(id) = stack.pop() {
    if skipped.contains(&id) {
      continue;
    }
    let active = plan
      .dependencies(&id)
      .iter()
      .any(|dep| dep != condition_id && !skipped.contains(dep));
    if active {
      continue;
    }

    skipped.insert(id.clone());
    for edge in plan.outgoing(&id).iter().rev() {
      stack.push(edge.target.clone());
    }
    newly.push(id);
  }

  newly
}
