//! Built-in handlers.
//!
//! Covers the core node types plus a generic `http:request` handler. Service
//! integrations (email, chat, payments...) register their own handlers on the
//! same [`HandlerRegistry`].

mod compare;
mod condition;
mod delay;
mod filter;
pub mod http;
mod iterate;
mod switch;
mod transform;
mod trigger;

pub use compare::{evaluate, lookup_path};
pub use condition::ConditionHandler;
pub use delay::DelayHandler;
pub use filter::FilterHandler;
pub use http::HttpRequestHandler;
pub use iterate::LoopHandler;
pub use switch::SwitchHandler;
pub use transform::TransformHandler;
pub use trigger::TriggerHandler;

use chrono::{DateTime, Utc};
use serde_json::Value;
use weft_task::{HandlerRegistry, HandlerType, NodeExecutionResult, TaskError};

/// Register every built-in handler.
pub fn register_defaults(registry: &mut HandlerRegistry) {
  registry.register(HandlerType::Trigger, TriggerHandler);
  registry.register(HandlerType::Condition, ConditionHandler);
  registry.register(HandlerType::Delay, DelayHandler);
  registry.register(HandlerType::Filter, FilterHandler);
  registry.register(HandlerType::Transform, TransformHandler);
  registry.register(HandlerType::Switch, SwitchHandler);
  registry.register(HandlerType::Loop, LoopHandler);
  registry.register(HandlerType::HttpRequest, HttpRequestHandler::new());
}

/// A registry with the built-in handlers already registered.
pub fn default_registry() -> HandlerRegistry {
  let mut registry = HandlerRegistry::new();
  register_defaults(&mut registry);
  registry
}

/// Fold a handler body's `Result` into a timed [`NodeExecutionResult`].
pub(crate) fn finish(
  started_at: DateTime<Utc>,
  outcome: Result<Value, TaskError>,
) -> NodeExecutionResult {
  let result = match outcome {
    Ok(output) => NodeExecutionResult::success(output),
    Err(e) => NodeExecutionResult::failure(e.to_string()),
  };
  result.with_timing(started_at, Utc::now())
}
