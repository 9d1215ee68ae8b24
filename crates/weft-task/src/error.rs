//! Failure taxonomy and classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed set of failure kinds every step error is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
  NetworkError,
  TimeoutError,
  AuthenticationError,
  ValidationError,
  RateLimitError,
  IntegrationError,
  ExecutionError,
  ConfigurationError,
  UnknownError,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::NetworkError => "NETWORK_ERROR",
      ErrorKind::TimeoutError => "TIMEOUT_ERROR",
      ErrorKind::AuthenticationError => "AUTHENTICATION_ERROR",
      ErrorKind::ValidationError => "VALIDATION_ERROR",
      ErrorKind::RateLimitError => "RATE_LIMIT_ERROR",
      ErrorKind::IntegrationError => "INTEGRATION_ERROR",
      ErrorKind::ExecutionError => "EXECUTION_ERROR",
      ErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
      ErrorKind::UnknownError => "UNKNOWN_ERROR",
    }
  }

  /// Transient kinds are worth another attempt.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      ErrorKind::NetworkError
        | ErrorKind::TimeoutError
        | ErrorKind::RateLimitError
        | ErrorKind::UnknownError
    )
  }
}

impl std::fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
  pub kind: ErrorKind,
  pub retryable: bool,
  pub message: String,
}

impl ErrorClassification {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      retryable: kind.is_retryable(),
      message: message.into(),
    }
  }
}

/// Keyword rules, checked in order. The first rule with a matching
/// keyword decides the kind.
const RULES: &[(ErrorKind, &[&str])] = &[
  (ErrorKind::TimeoutError, &["timeout", "timed out", "etimedout"]),
  (
    ErrorKind::RateLimitError,
    &["rate limit", "ratelimit", "too many requests", "429"],
  ),
  (
    ErrorKind::AuthenticationError,
    &[
      "unauthorized",
      "authentication",
      "invalid api key",
      "forbidden",
      "401",
      "403",
    ],
  ),
  (
    ErrorKind::NetworkError,
    &[
      "network",
      "econnrefused",
      "econnreset",
      "enotfound",
      "connection",
      "dns",
      "502",
      "503",
      "504",
    ],
  ),
  (
    ErrorKind::ValidationError,
    &["validation", "invalid", "required", "missing"],
  ),
  (
    ErrorKind::ConfigurationError,
    &["configuration", "config", "not configured"],
  ),
  (ErrorKind::IntegrationError, &["integration", "api error", "external"]),
  (ErrorKind::ExecutionError, &["execution", "failed to execute"]),
];

/// Map a free-form error message to a kind by case-insensitive keyword match.
pub fn classify_error(message: &str) -> ErrorClassification {
  let lower = message.to_lowercase();
  let kind = RULES
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    .map(|(kind, _)| *kind)
    .unwrap_or(ErrorKind::UnknownError);
  ErrorClassification::new(kind, message)
}

pub fn should_retry(message: &str) -> bool {
  classify_error(message).retryable
}

/// Errors raised inside handlers before they are folded into a
/// [`NodeExecutionResult`](crate::NodeExecutionResult).
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("network error: {message}")]
  Network { message: String },

  #[error("request timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  #[error("authentication failed: {message}")]
  Authentication { message: String },

  #[error("rate limit exceeded: {message}")]
  RateLimit { message: String },

  #[error("missing required field: {field}")]
  MissingInput { field: String },

  #[error("invalid value for {field}: {message}")]
  InvalidInput { field: String, message: String },

  #[error("integration error: {message}")]
  Integration { message: String },

  #[error("configuration error: {message}")]
  Configuration { message: String },

  #[error("execution failed: {message}")]
  Execution { message: String },
}

impl TaskError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      TaskError::Network { .. } => ErrorKind::NetworkError,
      TaskError::Timeout { .. } => ErrorKind::TimeoutError,
      TaskError::Authentication { .. } => ErrorKind::AuthenticationError,
      TaskError::RateLimit { .. } => ErrorKind::RateLimitError,
      TaskError::MissingInput { .. } | TaskError::InvalidInput { .. } => {
        ErrorKind::ValidationError
      }
      TaskError::Integration { .. } => ErrorKind::IntegrationError,
      TaskError::Configuration { .. } => ErrorKind::ConfigurationError,
      TaskError::Execution { .. } => ErrorKind::ExecutionError,
    }
  }

  pub fn classification(&self) -> ErrorClassification {
    ErrorClassification::new(self.kind(), self.to_string())
  }
}
