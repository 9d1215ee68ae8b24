use serde::{Deserialize, Serialize};

/// Canvas position. Display-only, never consulted during execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

/// Nested node payload used by the editor's node format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNodeData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub config: Option<serde_json::Value>,
}

/// A node as stored in the graph.
///
/// Three encodings of the node type are accepted:
///
/// ```json
/// { "id": "a", "type": "trigger", "label": "Start" }
/// { "id": "b", "nodeType": "action", "label": "Send Email" }
/// { "id": "c", "type": "custom", "data": { "nodeType": "condition", "label": "Big order?" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
  pub id: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub config: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<RawNodeData>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
}

impl RawNode {
  /// A flat node with a `type` field, the most common shape.
  pub fn flat(id: impl Into<String>, kind: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      kind: Some(kind.into()),
      label: Some(label.into()),
      ..Default::default()
    }
  }

  pub fn with_config(mut self, config: serde_json::Value) -> Self {
    self.config = Some(config);
    self
  }

  pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
    self.icon = Some(icon.into());
    self
  }
}
