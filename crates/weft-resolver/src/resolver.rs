use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Value, json};
use tracing::warn;
use weft_task::{ExecutionContext, NodeExecutionResult};

use crate::error::VariableError;

/// `{{{path}}}` or `{{path}}`. The triple form is tried first so its braces
/// are never read as a double-brace expression.
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\{\{\{\s*([^{}]+?)\s*\}\}\}|\{\{\s*([^{}]+?)\s*\}\}")
    .expect("expression pattern is valid")
});

/// Resolves path expressions against an [`ExecutionContext`].
///
/// `$env` lookups consult the override map first and then the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
  env_overrides: HashMap<String, String>,
}

impl VariableResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.env_overrides.insert(name.into(), value.into());
    self
  }

  /// Substitute every expression in `template`.
  ///
  /// Both brace forms are replaced in a single scan, so text that came out
  /// of a substitution is never resolved again. Strings are inserted
  /// verbatim, other values as compact JSON.
  pub fn resolve_string(&self, template: &str, context: &ExecutionContext) -> String {
    if !template.contains("{{") {
      return template.to_string();
    }
    EXPRESSION
      .replace_all(template, |caps: &Captures| {
        let Some(path) = expression_path(caps) else {
          return caps[0].to_string();
        };
        match self.resolve_path(path, context) {
          Ok(Some(value)) => stringify(&value),
          Ok(None) => {
            warn!(
              path,
              execution_id = %context.execution_id,
              "variable not found, leaving expression unresolved"
            );
            caps[0].to_string()
          }
          Err(e) => {
            warn!(
              path,
              execution_id = %context.execution_id,
              error = %e,
              "failed to resolve variable"
            );
            caps[0].to_string()
          }
        }
      })
      .into_owned()
  }

  /// Resolve every string leaf of `value`, returning a copy of the same shape.
  ///
  /// A leaf that is exactly one expression takes the referenced value as is,
  /// so numbers and objects keep their type.
  pub fn resolve_value(&self, value: &Value, context: &ExecutionContext) -> Value {
    match value {
      Value::String(s) => {
        if let Some(path) = sole_expression(s) {
          if let Ok(Some(resolved)) = self.resolve_path(path, context) {
            return resolved;
          }
        }
        Value::String(self.resolve_string(s, context))
      }
      Value::Array(items) => Value::Array(
        items
          .iter()
          .map(|item| self.resolve_value(item, context))
          .collect(),
      ),
      Value::Object(map) => Value::Object(
        map
          .iter()
          .map(|(k, v)| (k.clone(), self.resolve_value(v, context)))
          .collect(),
      ),
      other => other.clone(),
    }
  }

  /// Look up a single `scope.segment...` path.
  ///
  /// Returns `Ok(None)` when the path does not lead anywhere.
  pub fn resolve_path(
    &self,
    path: &str,
    context: &ExecutionContext,
  ) -> Result<Option<Value>, VariableError> {
    let mut segments = path.trim().split('.');
    let scope = match segments.next() {
      Some(scope) if !scope.is_empty() => scope,
      _ => return Err(VariableError::EmptyPath),
    };
    let rest: Vec<&str> = segments.collect();

    let value = match scope {
      "$trigger" => walk(&context.trigger_data, &rest),
      "$node" => keyed(&rest, |id| context.result(id).map(result_value)),
      "$steps" => keyed(&rest, |slug| context.result_by_slug(slug).map(result_value)),
      "$var" => keyed(&rest, |name| context.variables.get(name).cloned()),
      "$env" => keyed(&rest, |name| self.env(name).map(Value::String)),
      "$workflow" => {
        let meta = json!({
          "id": context.workflow_id,
          "executionId": context.execution_id,
          "userId": context.user_id,
          "currentStep": context.current_step,
        });
        walk(&meta, &rest)
      }
      other => {
        return Err(VariableError::UnknownScope {
          scope: other.to_string(),
        });
      }
    };
    Ok(value)
  }

  /// Distinct expression paths in `template`, in first-seen order.
  pub fn extract_variables(&self, template: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in EXPRESSION.captures_iter(template) {
      let Some(path) = expression_path(&caps) else {
        continue;
      };
      if !found.iter().any(|p| p == path) {
        found.push(path.to_string());
      }
    }
    found
  }

  /// Expressions anywhere in `value` that do not resolve against `context`.
  ///
  /// Used before dispatch to report references a handler will see verbatim.
  pub fn unresolved_variables(&self, value: &Value, context: &ExecutionContext) -> Vec<String> {
    let mut missing = Vec::new();
    self.collect_unresolved(value, context, &mut missing);
    missing
  }

  fn collect_unresolved(&self, value: &Value, context: &ExecutionContext, out: &mut Vec<String>) {
    match value {
      Value::String(s) => {
        for path in self.extract_variables(s) {
          let resolved = matches!(self.resolve_path(&path, context), Ok(Some(_)));
          if !resolved && !out.contains(&path) {
            out.push(path);
          }
        }
      }
      Value::Array(items) => {
        for item in items {
          self.collect_unresolved(item, context, out);
        }
      }
      Value::Object(map) => {
        for v in map.values() {
          self.collect_unresolved(v, context, out);
        }
      }
      _ => {}
    }
  }

  fn env(&self, name: &str) -> Option<String> {
    self
      .env_overrides
      .get(name)
      .cloned()
      .or_else(|| std::env::var(name).ok())
  }
}

/// The path of a template that is nothing but one expression.
fn sole_expression(template: &str) -> Option<&str> {
  let caps = EXPRESSION.captures(template)?;
  let whole = caps.get(0)?;
  if whole.start() != 0 || whole.end() != template.len() {
    return None;
  }
  caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

fn expression_path<'t>(caps: &Captures<'t>) -> Option<&'t str> {
  caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Resolve `rest[0]` as a key, then walk the remaining segments.
fn keyed(rest: &[&str], lookup: impl FnOnce(&str) -> Option<Value>) -> Option<Value> {
  let (key, tail) = rest.split_first()?;
  let root = lookup(key)?;
  walk(&root, tail)
}

fn walk(root: &Value, segments: &[&str]) -> Option<Value> {
  let mut current = root;
  for segment in segments {
    current = match current {
      Value::Object(map) => map.get(*segment)?,
      Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
      _ => return None,
    };
  }
  Some(current.clone())
}

fn result_value(result: &NodeExecutionResult) -> Value {
  serde_json::to_value(result).unwrap_or(Value::Null)
}

fn stringify(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}
