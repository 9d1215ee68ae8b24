use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use weft_config::{EdgeDef, RawNode, WorkflowDef};
use weft_handlers::register_defaults;
use weft_runtime::{ExecutionRequest, RuntimeConfig, RuntimeError, WorkflowRuntime};
use weft_store::{ExecutionStatus, MemoryStore, StepStatus, Store};
use weft_task::{
  ErrorKind, ExecutionContext, Handler, HandlerRegistry, HandlerType, NodeExecutionResult,
  RetryPolicy,
};
use weft_workflow::Node;

/// Echoes the resolved config it was called with.
struct Recorder;

#[async_trait]
impl Handler for Recorder {
  async fn execute(&self, node: &Node, _: &ExecutionContext, config: &Value) -> NodeExecutionResult {
    NodeExecutionResult::success(json!({ "node": node.id, "config": config }))
  }
}

/// Fails with a fixed message until `succeed_after` calls have been made.
struct Flaky {
  calls: Arc<AtomicU32>,
  message: &'static str,
  succeed_after: u32,
}

#[async_trait]
impl Handler for Flaky {
  async fn execute(&self, _: &Node, _: &ExecutionContext, _: &Value) -> NodeExecutionResult {
    let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call > self.succeed_after {
      NodeExecutionResult::success(json!({ "call": call }))
    } else {
      NodeExecutionResult::failure(self.message)
    }
  }
}

/// Never finishes on its own.
struct Hang;

#[async_trait]
impl Handler for Hang {
  async fn execute(&self, _: &Node, _: &ExecutionContext, _: &Value) -> NodeExecutionResult {
    tokio::time::sleep(Duration::from_secs(3600)).await;
    NodeExecutionResult::success(Value::Null)
  }
}

fn registry() -> HandlerRegistry {
  let mut registry = HandlerRegistry::new();
  register_defaults(&mut registry);
  registry.register(HandlerType::Other("action".into()), Recorder);
  registry
}

fn runtime_with(registry: HandlerRegistry, store: Arc<MemoryStore>) -> WorkflowRuntime {
  let config = RuntimeConfig {
    retry_policy: RetryPolicy::none(),
    ..RuntimeConfig::default()
  };
  WorkflowRuntime::new(registry, store, config)
}

fn edge(id: &str, source: &str, target: &str) -> EdgeDef {
  EdgeDef::new(id, source, target)
}

/// trigger -> check(amount > 500) -> { vip (yes), standard (no) }
fn order_workflow() -> WorkflowDef {
  WorkflowDef::new("orders", "Order routing")
    .node(RawNode::flat("trigger", "trigger", "New Order"))
    .node(RawNode::flat("check", "condition", "Check Amount").with_config(json!({
      "field": "{{$trigger.amount}}",
      "operator": ">",
      "value": 500,
    })))
    .node(RawNode::flat("vip", "action", "VIP Offer").with_config(json!({ "tier": "vip" })))
    .node(RawNode::flat("standard", "action", "Standard Offer"))
    .edge(edge("e1", "trigger", "check"))
    .edge(edge("e2", "check", "vip").with_handle("yes"))
    .edge(edge("e3", "check", "standard").with_handle("no"))
}

#[tokio::test]
async fn test_condition_takes_yes_branch() {
  let store = Arc::new(MemoryStore::new());
  let runtime = runtime_with(registry(), store.clone());

  let request = ExecutionRequest::new(order_workflow(), json!({ "amount": 600 }))
    .with_execution_id("exec-1");
  let result = runtime.execute(request, CancellationToken::new()).await.unwrap();

  assert_eq!(result.status, ExecutionStatus::Completed);
  assert_eq!(result.result("check").unwrap().output["branch"], "yes");
  assert_eq!(result.result("vip").unwrap().output["node"], "vip");
  assert_eq!(result.skipped, vec!["standard"]);

  let standard = result.result("standard").unwrap();
  assert!(standard.success);
  assert_eq!(standard.output["skipped"], true);
  assert_eq!(standard.output["reason"], "Conditional branch not taken");

  let execution = store.get_execution("exec-1").await.unwrap();
  assert_eq!(execution.status, ExecutionStatus::Completed);
  assert!(execution.duration_ms.is_some());

  let steps = store.list_steps("exec-1").await.unwrap();
  let statuses: Vec<_> = steps.iter().map(|s| (s.node_id.as_str(), s.status)).collect();
  assert_eq!(
    statuses,
    vec![
      ("trigger", StepStatus::Completed),
      ("check", StepStatus::Completed),
      ("vip", StepStatus::Completed),
      ("standard", StepStatus::Skipped),
    ]
  );
}

#[tokio::test]
async fn test_condition_takes_no_branch() {
  let store = Arc::new(MemoryStore::new());
  let runtime = runtime_with(registry(), store);

  let request = ExecutionRequest::new(order_workflow(), json!({ "amount": 20 }));
  let result = runtime.execute(request, CancellationToken::new()).await.unwrap();

  assert_eq!(result.skipped, vec!["vip"]);
  assert_eq!(result.result("standard").unwrap().output["node"], "standard");
}

#[tokio::test]
async fn test_diamond_join_executes() {
  let workflow = WorkflowDef::new("diamond", "Diamond")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("c", "condition", "Is Big").with_config(json!({
      "left": "{{$trigger.amount}}", "operator": "gt", "right": 500,
    })))
    .node(RawNode::flat("a", "action", "Big Path"))
    .node(RawNode::flat("b", "action", "Small Path"))
    .node(RawNode::flat("j", "action", "Join"))
    .edge(edge("e1", "t", "c"))
    .edge(edge("e2", "c", "a").with_handle("yes"))
    .edge(edge("e3", "c", "b").with_handle("no"))
    .edge(edge("e4", "a", "j"))
    .edge(edge("e5", "b", "j"));

  let runtime = runtime_with(registry(), Arc::new(MemoryStore::new()));
  let request = ExecutionRequest::new(workflow, json!({ "amount": 600 }));
  let result = runtime.execute(request, CancellationToken::new()).await.unwrap();

  assert_eq!(result.skipped, vec!["b"]);
  assert_eq!(result.result("j").unwrap().output["node"], "j");
}

#[tokio::test]
async fn test_authentication_failure_stops_run() {
  let calls = Arc::new(AtomicU32::new(0));
  let mut registry = registry();
  registry.register(
    HandlerType::Email,
    Flaky {
      calls: calls.clone(),
      message: "Invalid API key",
      succeed_after: u32::MAX,
    },
  );
  let store = Arc::new(MemoryStore::new());
  // retries enabled: the classification must still stop after one attempt
  let runtime = WorkflowRuntime::new(registry, store.clone(), RuntimeConfig::default());

  let workflow = WorkflowDef::new("mail", "Mail")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("send", "action", "Send Email"))
    .node(RawNode::flat("after", "action", "Log It"))
    .edge(edge("e1", "t", "send"))
    .edge(edge("e2", "send", "after"));

  let request = ExecutionRequest::new(workflow, json!({})).with_execution_id("exec-auth");
  let err = runtime
    .execute(request, CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    RuntimeError::StepFailed {
      node_id,
      label,
      error,
      classification,
    } => {
      assert_eq!(node_id, "send");
      assert_eq!(label, "Send Email");
      assert_eq!(error, "Invalid API key");
      assert_eq!(classification.kind, ErrorKind::AuthenticationError);
      assert!(!classification.retryable);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(calls.load(Ordering::SeqCst), 1);

  let execution = store.get_execution("exec-auth").await.unwrap();
  assert_eq!(execution.status, ExecutionStatus::Failed);
  assert_eq!(execution.error.as_deref(), Some("Invalid API key"));

  let steps = store.list_steps("exec-auth").await.unwrap();
  assert_eq!(steps.len(), 2);
  assert_eq!(steps[1].status, StepStatus::Failed);
  assert!(steps.iter().all(|s| s.node_id != "after"));
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failure_recovers() {
  let calls = Arc::new(AtomicU32::new(0));
  let mut registry = registry();
  registry.register(
    HandlerType::Slack,
    Flaky {
      calls: calls.clone(),
      message: "network unreachable",
      succeed_after: 2,
    },
  );
  let runtime = WorkflowRuntime::new(
    registry,
    Arc::new(MemoryStore::new()),
    RuntimeConfig::default(),
  );

  let workflow = WorkflowDef::new("notify", "Notify")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("s", "action", "Post to Slack"))
    .edge(edge("e1", "t", "s"));

  let result = runtime
    .execute(ExecutionRequest::new(workflow, json!({})), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(calls.load(Ordering::SeqCst), 3);
  assert_eq!(result.result("s").unwrap().output["call"], 3);
}

#[tokio::test]
async fn test_missing_handler_is_skipped() {
  let runtime = runtime_with(registry(), Arc::new(MemoryStore::new()));
  let workflow = WorkflowDef::new("pay", "Pay")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("p", "action", "Charge with Stripe"))
    .edge(edge("e1", "t", "p"));

  let result = runtime
    .execute(ExecutionRequest::new(workflow, json!({})), CancellationToken::new())
    .await
    .unwrap();

  let output = &result.result("p").unwrap().output;
  assert_eq!(output["skipped"], true);
  assert_eq!(
    output["reason"],
    "No handler registered for 'stripe:create-payment'"
  );
  assert_eq!(result.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_variables_thread_between_steps() {
  let workflow = WorkflowDef::new("thread", "Threading")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("build", "transform", "Build Payload").with_config(json!({
      "output": { "total": "{{$trigger.amount}}", "sku": "{{$trigger.items.0.sku}}" },
    })))
    .node(RawNode::flat("send", "action", "Deliver").with_config(json!({
      "amount": "{{$steps.build_payload.output.total}}",
      "line": "SKU {{$node.build.output.sku}} for {{$var.owner}}",
      "run": "{{$workflow.executionId}}",
    })))
    .edge(edge("e1", "t", "build"))
    .edge(edge("e2", "build", "send"));

  let runtime = runtime_with(registry(), Arc::new(MemoryStore::new()));
  let request = ExecutionRequest::new(
    workflow,
    json!({ "amount": 600, "items": [{ "sku": "A1" }] }),
  )
  .with_variable("owner", json!("ops"))
  .with_execution_id("exec-vars");

  let result = runtime.execute(request, CancellationToken::new()).await.unwrap();
  let config = &result.result("send").unwrap().output["config"];
  assert_eq!(config["amount"], 600);
  assert_eq!(config["line"], "SKU A1 for ops");
  assert_eq!(config["run"], "exec-vars");
}

#[tokio::test]
async fn test_validation_failure_records_failed_run() {
  let store = Arc::new(MemoryStore::new());
  let runtime = runtime_with(registry(), store.clone());
  let workflow = WorkflowDef::new("broken", "Broken")
    .node(RawNode::flat("a", "action", "Lonely"))
    .edge(edge("e1", "a", "ghost"));

  let request = ExecutionRequest::new(workflow, json!({})).with_execution_id("exec-bad");
  let err = runtime
    .execute(request, CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, RuntimeError::Plan(_)));

  let execution = store.get_execution("exec-bad").await.unwrap();
  assert_eq!(execution.status, ExecutionStatus::Failed);
  let message = execution.error.unwrap();
  assert!(message.contains("trigger"), "{message}");
  assert!(store.list_steps("exec-bad").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_handler_validation_is_configuration_error() {
  let runtime = runtime_with(registry(), Arc::new(MemoryStore::new()));
  let workflow = WorkflowDef::new("hook", "Hook")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("h", "action", "Call webhook").with_config(json!({ "url": 42 })))
    .edge(edge("e1", "t", "h"));

  let err = runtime
    .execute(ExecutionRequest::new(workflow, json!({})), CancellationToken::new())
    .await
    .unwrap_err();
  match err {
    RuntimeError::StepFailed { classification, .. } => {
      assert_eq!(classification.kind, ErrorKind::ConfigurationError);
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let store = Arc::new(MemoryStore::new());
  let runtime = runtime_with(registry(), store.clone());
  let cancel = CancellationToken::new();
  cancel.cancel();

  let request = ExecutionRequest::new(order_workflow(), json!({ "amount": 1 }))
    .with_execution_id("exec-cancel");
  let err = runtime.execute(request, cancel).await.unwrap_err();

  assert!(matches!(err, RuntimeError::Cancelled));
  let execution = store.get_execution("exec-cancel").await.unwrap();
  assert_eq!(execution.status, ExecutionStatus::Failed);
  assert!(store.list_steps("exec-cancel").await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_running_handler() {
  let mut registry = registry();
  registry.register(HandlerType::Other("action".into()), Hang);
  let store = Arc::new(MemoryStore::new());
  let runtime = runtime_with(registry, store.clone());

  let workflow = WorkflowDef::new("slow", "Slow")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("w", "action", "Wait Forever"))
    .edge(edge("e1", "t", "w"));

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(50)).await;
    trigger.cancel();
  });

  let request = ExecutionRequest::new(workflow, json!({})).with_execution_id("exec-hang");
  let err = runtime.execute(request, cancel).await.unwrap_err();
  assert!(matches!(err, RuntimeError::Cancelled));

  let steps = store.list_steps("exec-hang").await.unwrap();
  let waiting = steps.iter().find(|s| s.node_id == "w").unwrap();
  assert_eq!(waiting.status, StepStatus::Failed);
  assert_eq!(waiting.error.as_deref(), Some("execution cancelled"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_skips_next_attempt() {
  let calls = Arc::new(AtomicU32::new(0));
  let mut registry = registry();
  registry.register(
    HandlerType::Slack,
    Flaky {
      calls: calls.clone(),
      message: "network unreachable",
      succeed_after: 10,
    },
  );
  let store = Arc::new(MemoryStore::new());
  let config = RuntimeConfig {
    retry_policy: RetryPolicy {
      max_attempts: 2,
      initial_delay_ms: 30_000,
      ..RetryPolicy::default()
    },
    ..RuntimeConfig::default()
  };
  let runtime = WorkflowRuntime::new(registry, store.clone(), config);

  let workflow = WorkflowDef::new("notify", "Notify")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("s", "action", "Post to Slack"))
    .edge(edge("e1", "t", "s"));

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(10)).await;
    trigger.cancel();
  });

  let started = tokio::time::Instant::now();
  let request = ExecutionRequest::new(workflow, json!({})).with_execution_id("exec-backoff");
  let err = runtime.execute(request, cancel).await.unwrap_err();

  assert!(matches!(err, RuntimeError::Cancelled), "{err}");
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert!(started.elapsed() < Duration::from_secs(30));

  let steps = store.list_steps("exec-backoff").await.unwrap();
  let slack = steps.iter().find(|s| s.node_id == "s").unwrap();
  assert_eq!(slack.status, StepStatus::Failed);
  assert_eq!(slack.error.as_deref(), Some("execution cancelled"));
  let execution = store.get_execution("exec-backoff").await.unwrap();
  assert_eq!(execution.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_unresolved_reference_reaches_handler_verbatim() {
  let runtime = runtime_with(registry(), Arc::new(MemoryStore::new()));
  let workflow = WorkflowDef::new("greet", "Greet")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(
      RawNode::flat("a", "action", "Greet User")
        .with_config(json!({ "to": "{{$var.nope}}", "name": "{{$trigger.name}}" })),
    )
    .edge(edge("e1", "t", "a"));

  let request = ExecutionRequest::new(workflow, json!({ "name": "{{$var.secret}}" }))
    .with_variable("secret", json!("hidden"));
  let result = runtime.execute(request, CancellationToken::new()).await.unwrap();

  let config = &result.result("a").unwrap().output["config"];
  assert_eq!(config["to"], "{{$var.nope}}");
  // substituted trigger text is not evaluated again
  assert_eq!(config["name"], "{{$var.secret}}");
}

#[tokio::test]
async fn test_switch_branch_does_not_skip() {
  let runtime = runtime_with(registry(), Arc::new(MemoryStore::new()));
  let workflow = WorkflowDef::new("tiers", "Tiers")
    .node(RawNode::flat("t", "trigger", "Start"))
    .node(RawNode::flat("sw", "switch", "Pick Tier").with_config(json!({
      "value": "{{$trigger.tier}}",
      "cases": [{ "value": "gold", "branch": "vip" }],
    })))
    .node(RawNode::flat("vip", "action", "VIP Offer"))
    .node(RawNode::flat("std", "action", "Standard Offer"))
    .edge(edge("e1", "t", "sw"))
    .edge(edge("e2", "sw", "vip").with_handle("vip"))
    .edge(edge("e3", "sw", "std").with_handle("default"));

  let result = runtime
    .execute(
      ExecutionRequest::new(workflow, json!({ "tier": "gold" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(result.result("sw").unwrap().output["branch"], "vip");
  assert!(result.skipped.is_empty());
  assert_eq!(result.result("std").unwrap().output["node"], "std");
}

#[tokio::test]
async fn test_output_summary_is_truncated() {
  let store = Arc::new(MemoryStore::new());
  let config = RuntimeConfig {
    retry_policy: RetryPolicy::none(),
    output_summary_limit: 16,
  };
  let runtime = WorkflowRuntime::new(registry(), store.clone(), config);
  let workflow = WorkflowDef::new("big", "Big").node(RawNode::flat("t", "trigger", "Start"));

  let request = ExecutionRequest::new(workflow, json!({ "blob": "x".repeat(200) }))
    .with_execution_id("exec-big");
  runtime.execute(request, CancellationToken::new()).await.unwrap();

  let steps = store.list_steps("exec-big").await.unwrap();
  assert_eq!(steps[0].output_summary.as_ref().unwrap().chars().count(), 16);
}
