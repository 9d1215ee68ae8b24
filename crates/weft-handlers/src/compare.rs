//! Operator evaluation shared by condition and filter.

use serde_json::Value;
use weft_task::TaskError;

/// Evaluate `left <operator> right` with canonical operator names.
///
/// Equality is loose: numeric strings compare equal to numbers, and other
/// values fall back to their text form.
pub fn evaluate(left: &Value, operator: &str, right: &Value) -> Result<bool, TaskError> {
  let outcome = match operator {
    "equals" => loose_eq(left, right),
    "not_equals" => !loose_eq(left, right),
    "greater_than" => ordering(left, right).is_some_and(|o| o.is_gt()),
    "greater_than_or_equal" => ordering(left, right).is_some_and(|o| o.is_ge()),
    "less_than" => ordering(left, right).is_some_and(|o| o.is_lt()),
    "less_than_or_equal" => ordering(left, right).is_some_and(|o| o.is_le()),
    "contains" => contains(left, right),
    "not_contains" => !contains(left, right),
    "starts_with" => text(left).starts_with(&text(right)),
    "ends_with" => text(left).ends_with(&text(right)),
    "is_empty" => is_empty(left),
    "is_not_empty" => !is_empty(left),
    other => {
      return Err(TaskError::InvalidInput {
        field: "operator".to_string(),
        message: format!("unknown operator '{other}'"),
      });
    }
  };
  Ok(outcome)
}

/// Walk a dot path into `value`. An empty path is the value itself.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  if path.is_empty() {
    return Some(value);
  }
  path.split('.').try_fold(value, |current, segment| match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
    _ => None,
  })
}

fn number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
  if left == right {
    return true;
  }
  match (number(left), number(right)) {
    (Some(a), Some(b)) => a == b,
    _ => text(left) == text(right),
  }
}

fn ordering(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
  match (number(left), number(right)) {
    (Some(a), Some(b)) => a.partial_cmp(&b),
    _ => Some(text(left).cmp(&text(right))),
  }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
  match haystack {
    Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
    Value::Object(map) => map.contains_key(&text(needle)),
    other => text(other).contains(&text(needle)),
  }
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.trim().is_empty(),
    Value::Array(items) => items.is_empty(),
    Value::Object(map) => map.is_empty(),
    _ => false,
  }
}
