//! Configuration normalization.
//!
//! Rewrites a node's raw config into the canonical shape handlers expect:
//! operator aliases become word-form names, per-handler defaults fill gaps,
//! string inputs are coerced to the declared field types, and `field`/`value`
//! are mirrored into `left`/`right` for conditions. The rewrite is idempotent.

use serde_json::{Map, Number, Value, json};
use weft_task::HandlerType;

/// Legacy and symbolic operator spellings.
const OPERATOR_ALIASES: &[(&str, &str)] = &[
  ("eq", "equals"),
  ("equal", "equals"),
  ("==", "equals"),
  ("===", "equals"),
  ("ne", "not_equals"),
  ("neq", "not_equals"),
  ("not_equal", "not_equals"),
  ("notEquals", "not_equals"),
  ("!=", "not_equals"),
  ("!==", "not_equals"),
  ("gt", "greater_than"),
  (">", "greater_than"),
  ("greaterThan", "greater_than"),
  ("gte", "greater_than_or_equal"),
  (">=", "greater_than_or_equal"),
  ("greaterThanOrEqual", "greater_than_or_equal"),
  ("lt", "less_than"),
  ("<", "less_than"),
  ("lessThan", "less_than"),
  ("lte", "less_than_or_equal"),
  ("<=", "less_than_or_equal"),
  ("lessThanOrEqual", "less_than_or_equal"),
  ("startsWith", "starts_with"),
  ("endsWith", "ends_with"),
  ("notContains", "not_contains"),
  ("isEmpty", "is_empty"),
  ("isNotEmpty", "is_not_empty"),
];

/// Target type for a coerced config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
  Number,
  Boolean,
  String,
  Json,
}

/// Coercions applied regardless of handler type.
const COMMON_FIELDS: &[(&str, FieldType)] = &[
  ("timeout", FieldType::Number),
  ("webhookHeaders", FieldType::Json),
];

fn field_types(handler_type: &HandlerType) -> &'static [(&'static str, FieldType)] {
  match handler_type {
    HandlerType::Delay => &[("duration", FieldType::Number), ("unit", FieldType::String)],
    HandlerType::Loop => &[
      ("items", FieldType::Json),
      ("maxIterations", FieldType::Number),
    ],
    HandlerType::Filter => &[("items", FieldType::Json), ("field", FieldType::String)],
    HandlerType::Switch => &[("cases", FieldType::Json)],
    HandlerType::Condition => &[("conditions", FieldType::Json)],
    HandlerType::HttpRequest => &[
      ("method", FieldType::String),
      ("headers", FieldType::Json),
      ("body", FieldType::Json),
    ],
    HandlerType::Email => &[("html", FieldType::Boolean)],
    HandlerType::OpenAi | HandlerType::Anthropic => &[
      ("temperature", FieldType::Number),
      ("maxTokens", FieldType::Number),
    ],
    HandlerType::Stripe => &[("amount", FieldType::Number)],
    _ => &[],
  }
}

fn defaults(handler_type: &HandlerType) -> Value {
  match handler_type {
    HandlerType::Delay => json!({ "unit": "seconds", "duration": 5 }),
    HandlerType::HttpRequest => json!({ "method": "POST", "timeout": 30000, "headers": {} }),
    HandlerType::Loop => json!({ "maxIterations": 100 }),
    HandlerType::Filter => json!({ "operator": "is_not_empty" }),
    _ => json!({}),
  }
}

/// Canonical word-form name for an operator, or the input if unknown.
pub fn canonical_operator(operator: &str) -> &str {
  OPERATOR_ALIASES
    .iter()
    .find(|(alias, _)| *alias == operator)
    .or_else(|| {
      let lower = operator.to_ascii_lowercase();
      OPERATOR_ALIASES.iter().find(|(alias, _)| *alias == lower)
    })
    .map(|(_, canonical)| *canonical)
    .unwrap_or(operator)
}

/// Normalize `raw` for the given handler type.
pub fn normalize_config(handler_type: &HandlerType, raw: &Value) -> Value {
  let mut config = match raw {
    Value::Object(map) => map.clone(),
    Value::Null => Map::new(),
    other => return other.clone(),
  };

  if let Value::Object(defaults) = defaults(handler_type) {
    for (key, value) in defaults {
      config.entry(key).or_insert(value);
    }
  }

  for (field, field_type) in COMMON_FIELDS.iter().chain(field_types(handler_type)) {
    if let Some(value) = config.get_mut(*field) {
      *value = coerce(value, *field_type);
    }
  }

  alias_operator(&mut config);
  if *handler_type == HandlerType::Condition {
    alias_operands(&mut config);
  }
  if let Some(Value::Array(conditions)) = config.get_mut("conditions") {
    for condition in conditions.iter_mut() {
      if let Value::Object(condition) = condition {
        alias_operator(condition);
        alias_operands(condition);
      }
    }
  }

  Value::Object(config)
}

/// Coerce a string value to `field_type`, keeping the original on failure.
pub fn coerce(value: &Value, field_type: FieldType) -> Value {
  match (field_type, value) {
    (FieldType::Number, Value::String(s)) => parse_number(s).unwrap_or_else(|| value.clone()),
    (FieldType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
      "true" | "1" => Value::Bool(true),
      "false" | "0" => Value::Bool(false),
      _ => value.clone(),
    },
    (FieldType::String, Value::Number(n)) => Value::String(n.to_string()),
    (FieldType::String, Value::Bool(b)) => Value::String(b.to_string()),
    (FieldType::Json, Value::String(s)) => match serde_json::from_str::<Value>(s) {
      Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
      _ => value.clone(),
    },
    _ => value.clone(),
  }
}

fn parse_number(s: &str) -> Option<Value> {
  let n: f64 = s.trim().parse().ok()?;
  if !n.is_finite() {
    return None;
  }
  if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
    return Some(Value::Number(Number::from(n as i64)));
  }
  Number::from_f64(n).map(Value::Number)
}

fn alias_operator(config: &mut Map<String, Value>) {
  if let Some(Value::String(op)) = config.get_mut("operator") {
    let canonical = canonical_operator(op);
    if canonical != op.as_str() {
      *op = canonical.to_string();
    }
  }
}

fn alias_operands(config: &mut Map<String, Value>) {
  for (from, to) in [("field", "left"), ("value", "right")] {
    if !config.contains_key(to) {
      if let Some(value) = config.get(from).cloned() {
        config.insert(to.to_string(), value);
      }
    }
  }
}
