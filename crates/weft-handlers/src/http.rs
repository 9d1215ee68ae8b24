//! Generic HTTP request handler.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};
use weft_task::{ExecutionContext, Handler, NodeExecutionResult, TaskError};
use weft_workflow::Node;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Sends `method` to `url` with optional `headers` and `body`.
///
/// `timeout` (milliseconds) bounds each call. Non-2xx responses fail with the
/// status in the message and the response in the output.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestHandler {
  client: reqwest::Client,
}

impl HttpRequestHandler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Handler for HttpRequestHandler {
  async fn execute(
    &self,
    node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    let result = match self.send(node, config).await {
      Ok(output) => NodeExecutionResult::success(output),
      Err((err, output)) => NodeExecutionResult::failure_with_output(err.to_string(), output),
    };
    result.with_timing(started_at, Utc::now())
  }

  fn validate(&self, node: &Node) -> bool {
    // the url may still be a template here, so only check it is present
    match node.config.get("url") {
      Some(Value::String(url)) => !url.trim().is_empty(),
      None => true,
      Some(_) => false,
    }
  }
}

impl HttpRequestHandler {
  async fn send(&self, node: &Node, config: &Value) -> Result<Value, (TaskError, Value)> {
    let url = config
      .get("url")
      .and_then(Value::as_str)
      .filter(|u| !u.trim().is_empty())
      .ok_or_else(|| {
        let err = TaskError::MissingInput {
          field: "url".to_string(),
        };
        (err, Value::Null)
      })?;
    let method = config
      .get("method")
      .and_then(Value::as_str)
      .unwrap_or("POST")
      .to_uppercase()
      .parse::<Method>()
      .map_err(|e| {
        let err = TaskError::InvalidInput {
          field: "method".to_string(),
          message: e.to_string(),
        };
        (err, Value::Null)
      })?;
    let timeout_ms = config
      .get("timeout")
      .and_then(Value::as_u64)
      .unwrap_or(DEFAULT_TIMEOUT_MS);

    let mut request = self
      .client
      .request(method.clone(), url)
      .timeout(Duration::from_millis(timeout_ms));

    if let Some(Value::Object(headers)) = config.get("headers") {
      for (name, value) in headers {
        let value = match value {
          Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        request = request.header(name.as_str(), value);
      }
    }

    match config.get("body") {
      None | Some(Value::Null) => {}
      Some(_) if method == Method::GET || method == Method::HEAD => {}
      Some(Value::String(body)) => request = request.body(body.clone()),
      Some(body) => request = request.json(body),
    }

    debug!(node_id = %node.id, %method, url, timeout_ms, "sending http request");
    let response = request
      .send()
      .await
      .map_err(|e| (error_from_reqwest(&e, timeout_ms), Value::Null))?;

    let status = response.status();
    let headers: serde_json::Map<String, Value> = response
      .headers()
      .iter()
      .filter_map(|(k, v)| {
        v.to_str()
          .ok()
          .map(|v| (k.as_str().to_string(), Value::String(v.to_string())))
      })
      .collect();
    let text = response
      .text()
      .await
      .map_err(|e| (error_from_reqwest(&e, timeout_ms), Value::Null))?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    let output = json!({
      "status": status.as_u16(),
      "headers": headers,
      "body": body,
    });

    if !status.is_success() {
      warn!(node_id = %node.id, status = %status, url, "http request returned error status");
      return Err((error_from_status(status), output));
    }
    Ok(output)
  }
}

/// Map a transport error onto the failure taxonomy.
pub fn error_from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> TaskError {
  if err.is_timeout() {
    return TaskError::Timeout { timeout_ms };
  }
  if let Some(status) = err.status() {
    return error_from_status(status);
  }
  if err.is_connect() || err.is_request() {
    return TaskError::Network {
      message: err.to_string(),
    };
  }
  TaskError::Integration {
    message: err.to_string(),
  }
}

/// Map a non-success HTTP status onto the failure taxonomy.
pub fn error_from_status(status: StatusCode) -> TaskError {
  let message = format!(
    "HTTP {} {}",
    status.as_u16(),
    status.canonical_reason().unwrap_or("")
  )
  .trim_end()
  .to_string();
  match status.as_u16() {
    401 | 403 => TaskError::Authentication { message },
    429 => TaskError::RateLimit { message },
    500..=599 => TaskError::Network { message },
    _ => TaskError::Integration { message },
  }
}
