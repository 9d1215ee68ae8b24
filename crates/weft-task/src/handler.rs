//! Handler trait and handler-type resolution.

use async_trait::async_trait;
use weft_workflow::{Node, NodeType};

use crate::context::ExecutionContext;
use crate::result::NodeExecutionResult;

/// A unit of node behavior.
///
/// Handlers never return errors: every failure is folded into a
/// [`NodeExecutionResult`] with `success == false` so the orchestrator can
/// classify and retry it uniformly.
#[async_trait]
pub trait Handler: Send + Sync {
  /// Run the node with an already resolved and normalized `config`.
  async fn execute(
    &self,
    node: &Node,
    context: &ExecutionContext,
    config: &serde_json::Value,
  ) -> NodeExecutionResult;

  /// Static pre-flight check. A `false` fails the step without executing it.
  fn validate(&self, _node: &Node) -> bool {
    true
  }
}

/// Key naming which handler runs a node.
///
/// Service handlers use `service:operation` keys; core handlers use bare
/// names. Anything else is carried as [`HandlerType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerType {
  Trigger,
  Condition,
  Delay,
  Loop,
  Filter,
  Switch,
  Transform,
  Email,
  Slack,
  Discord,
  Teams,
  Sms,
  OpenAi,
  Anthropic,
  GoogleSheets,
  Stripe,
  HttpRequest,
  Other(String),
}

impl HandlerType {
  pub fn key(&self) -> &str {
    match self {
      HandlerType::Trigger => "trigger",
      HandlerType::Condition => "condition",
      HandlerType::Delay => "delay",
      HandlerType::Loop => "loop",
      HandlerType::Filter => "filter",
      HandlerType::Switch => "switch",
      HandlerType::Transform => "transform",
      HandlerType::Email => "email:resend",
      HandlerType::Slack => "slack:send-message",
      HandlerType::Discord => "discord:send-message",
      HandlerType::Teams => "teams:send-message",
      HandlerType::Sms => "sms:twilio",
      HandlerType::OpenAi => "openai:chat",
      HandlerType::Anthropic => "anthropic:chat",
      HandlerType::GoogleSheets => "google-sheets:append-row",
      HandlerType::Stripe => "stripe:create-payment",
      HandlerType::HttpRequest => "http:request",
      HandlerType::Other(key) => key,
    }
  }

  pub fn from_key(key: &str) -> Self {
    match key {
      "trigger" => HandlerType::Trigger,
      "condition" => HandlerType::Condition,
      "delay" => HandlerType::Delay,
      "loop" => HandlerType::Loop,
      "filter" => HandlerType::Filter,
      "switch" => HandlerType::Switch,
      "transform" => HandlerType::Transform,
      "email:resend" => HandlerType::Email,
      "slack:send-message" => HandlerType::Slack,
      "discord:send-message" => HandlerType::Discord,
      "teams:send-message" => HandlerType::Teams,
      "sms:twilio" => HandlerType::Sms,
      "openai:chat" => HandlerType::OpenAi,
      "anthropic:chat" => HandlerType::Anthropic,
      "google-sheets:append-row" => HandlerType::GoogleSheets,
      "stripe:create-payment" => HandlerType::Stripe,
      "http:request" => HandlerType::HttpRequest,
      other => HandlerType::Other(other.to_string()),
    }
  }
}

impl std::fmt::Display for HandlerType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.key())
  }
}

/// Keyword table for generic action nodes, in priority order.
pub const SERVICE_KEYWORDS: &[(&[&str], &str)] = &[
  (&["email"], "email:resend"),
  (&["slack"], "slack:send-message"),
  (&["discord"], "discord:send-message"),
  (&["teams"], "teams:send-message"),
  (&["sms", "twilio"], "sms:twilio"),
  (&["openai", "gpt"], "openai:chat"),
  (&["claude", "anthropic"], "anthropic:chat"),
  (
    &["google-sheets", "google sheets", "sheets", "spreadsheet"],
    "google-sheets:append-row",
  ),
  (&["stripe"], "stripe:create-payment"),
  (&["http", "webhook"], "http:request"),
  (&["transform"], "transform"),
  (&["filter"], "filter"),
  (&["loop"], "loop"),
];

/// Pick the handler for a node.
///
/// Core node types map directly. Generic `action` nodes are matched against
/// [`SERVICE_KEYWORDS`] using their label and icon; the first hit wins and
/// no hit keeps the declared type.
pub fn determine_handler_type(node: &Node) -> HandlerType {
  match &node.node_type {
    NodeType::Trigger => HandlerType::Trigger,
    NodeType::Condition => HandlerType::Condition,
    NodeType::Delay => HandlerType::Delay,
    NodeType::Loop => HandlerType::Loop,
    NodeType::Filter => HandlerType::Filter,
    NodeType::Switch => HandlerType::Switch,
    NodeType::Transform => HandlerType::Transform,
    NodeType::Other(key) => HandlerType::from_key(key),
    NodeType::Action => {
      let haystack = format!(
        "{} {}",
        node.label,
        node.icon.as_deref().unwrap_or_default()
      )
      .to_lowercase();
      SERVICE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, key)| HandlerType::from_key(key))
        .unwrap_or_else(|| HandlerType::from_key(node.node_type.as_str()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn action(label: &str) -> Node {
    Node::new("n1", NodeType::Action, label)
  }

  #[test]
  fn test_core_types_map_directly() {
    let node = Node::new("c", NodeType::Condition, "Send email if VIP");
    assert_eq!(determine_handler_type(&node), HandlerType::Condition);
  }

  #[test]
  fn test_action_keywords() {
    assert_eq!(determine_handler_type(&action("Send Email")), HandlerType::Email);
    assert_eq!(determine_handler_type(&action("Notify Slack")), HandlerType::Slack);
    assert_eq!(determine_handler_type(&action("Ask GPT")), HandlerType::OpenAi);
    assert_eq!(determine_handler_type(&action("Ask Claude")), HandlerType::Anthropic);
    assert_eq!(
      determine_handler_type(&action("Append to Google Sheets")),
      HandlerType::GoogleSheets
    );
    assert_eq!(
      determine_handler_type(&action("Call webhook")),
      HandlerType::HttpRequest
    );
  }

  #[test]
  fn test_first_keyword_wins() {
    // "email" is checked before "slack"
    assert_eq!(
      determine_handler_type(&action("Slack the email digest")),
      HandlerType::Email
    );
  }

  #[test]
  fn test_icon_participates() {
    let node = action("Notify team").with_icon("stripe");
    assert_eq!(determine_handler_type(&node), HandlerType::Stripe);
  }

  #[test]
  fn test_unmatched_action_keeps_type() {
    assert_eq!(
      determine_handler_type(&action("Do the thing")),
      HandlerType::Other("action".into())
    );
  }

  #[test]
  fn test_explicit_service_key() {
    let node = Node::new("n", NodeType::Other("http:request".into()), "Fetch");
    assert_eq!(determine_handler_type(&node), HandlerType::HttpRequest);
  }

  #[test]
  fn test_key_roundtrip() {
    for (_, key) in SERVICE_KEYWORDS {
      assert_eq!(HandlerType::from_key(key).key(), *key);
    }
  }
}
