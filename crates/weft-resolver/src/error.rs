use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
  #[error("unknown variable scope '{scope}'")]
  UnknownScope { scope: String },

  #[error("empty variable path")]
  EmptyPath,
}
