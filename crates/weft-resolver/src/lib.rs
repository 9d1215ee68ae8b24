//! Variable resolution for node configuration.
//!
//! Templates reference run state with `{{scope.path}}` or `{{{scope.path}}}`:
//!
//! | scope | resolves against |
//! |---|---|
//! | `$trigger` | the trigger payload |
//! | `$node` | a result by node id |
//! | `$steps` | a result by label slug |
//! | `$var` | free variables |
//! | `$env` | process environment |
//! | `$workflow` | run metadata (`id`, `executionId`, `userId`, `currentStep`) |
//!
//! Resolution is lookup only. Missing values leave the expression text in
//! place and log a warning.

mod error;
mod resolver;

pub use error::VariableError;
pub use resolver::VariableResolver;
