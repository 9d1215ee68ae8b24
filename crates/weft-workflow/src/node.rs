use std::fmt;

use serde::{Deserialize, Serialize};
use weft_config::RawNode;

use crate::error::WorkflowError;

/// Declared type of a node.
///
/// `Action` is the generic type: the concrete handler for an action node is
/// derived from its label and icon at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
  Trigger,
  Action,
  Condition,
  Delay,
  Loop,
  Filter,
  Switch,
  Transform,
  Other(String),
}

impl NodeType {
  pub fn parse(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "trigger" => Self::Trigger,
      "action" => Self::Action,
      "condition" => Self::Condition,
      "delay" => Self::Delay,
      "loop" => Self::Loop,
      "filter" => Self::Filter,
      "switch" => Self::Switch,
      "transform" => Self::Transform,
      _ => Self::Other(s.trim().to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Trigger => "trigger",
      Self::Action => "action",
      Self::Condition => "condition",
      Self::Delay => "delay",
      Self::Loop => "loop",
      Self::Filter => "filter",
      Self::Switch => "switch",
      Self::Transform => "transform",
      Self::Other(s) => s,
    }
  }
}

impl fmt::Display for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for NodeType {
  fn from(s: String) -> Self {
    Self::parse(&s)
  }
}

impl From<NodeType> for String {
  fn from(t: NodeType) -> Self {
    t.as_str().to_string()
  }
}

/// The canonical node shape every other component works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
  pub id: String,
  pub node_type: NodeType,
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  pub config: serde_json::Value,
}

impl Node {
  pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type,
      label: label.into(),
      icon: None,
      config: serde_json::Value::Object(Default::default()),
    }
  }

  /// Adapt any accepted raw node shape into a canonical node.
  ///
  /// Type precedence is `data.nodeType`, then `nodeType`, then `type`.
  /// Label, icon and config prefer the top-level field and fall back to
  /// `data`. A missing label defaults to the node id and a missing config to
  /// an empty object.
  pub fn from_raw(raw: &RawNode) -> Result<Self, WorkflowError> {
    let data = raw.data.as_ref();

    let declared = data
      .and_then(|d| d.node_type.as_deref())
      .or(raw.node_type.as_deref())
      .or(raw.kind.as_deref())
      .filter(|t| !t.trim().is_empty())
      .ok_or_else(|| WorkflowError::MissingNodeType {
        node_id: raw.id.clone(),
      })?;

    let label = raw
      .label
      .clone()
      .or_else(|| data.and_then(|d| d.label.clone()))
      .unwrap_or_else(|| raw.id.clone());

    let icon = raw.icon.clone().or_else(|| data.and_then(|d| d.icon.clone()));

    let config = raw
      .config
      .clone()
      .or_else(|| data.and_then(|d| d.config.clone()))
      .filter(|c| !c.is_null())
      .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    Ok(Self {
      id: raw.id.clone(),
      node_type: NodeType::parse(declared),
      label,
      icon,
      config,
    })
  }

  pub fn with_config(mut self, config: serde_json::Value) -> Self {
    self.config = config;
    self
  }

  pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
    self.icon = Some(icon.into());
    self
  }

  pub fn is_trigger(&self) -> bool {
    self.node_type == NodeType::Trigger
  }

  pub fn slug(&self) -> String {
    label_slug(&self.label)
  }
}

const MAX_SLUG_LEN: usize = 20;

/// Identifier-safe form of a display label, used by `$steps.<slug>`.
///
/// Lowercased, every run of non-alphanumeric characters collapsed to `_`,
/// leading/trailing separators trimmed, capped at 20 characters.
pub fn label_slug(label: &str) -> String {
  let mut slug = String::with_capacity(label.len());
  let mut pending_sep = false;

  for c in label.chars() {
    if c.is_ascii_alphanumeric() {
      if pending_sep && !slug.is_empty() {
        slug.push('_');
      }
      pending_sep = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      pending_sep = true;
    }
  }

  slug.truncate(MAX_SLUG_LEN);
  slug
}
