//! Handler registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::handler::{Handler, HandlerType};

/// Maps handler keys to handlers.
///
/// Lookup tries the exact key first, then falls back to the first registered
/// key under the `"<type>:"` prefix, so `http` finds `http:request`.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
  handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, handler_type: HandlerType, handler: impl Handler + 'static) {
    self.register_arc(handler_type, Arc::new(handler));
  }

  pub fn register_arc(&mut self, handler_type: HandlerType, handler: Arc<dyn Handler>) {
    self.handlers.insert(handler_type.key().to_string(), handler);
  }

  pub fn get(&self, handler_type: &HandlerType) -> Option<Arc<dyn Handler>> {
    let key = handler_type.key();
    if let Some(handler) = self.handlers.get(key) {
      return Some(handler.clone());
    }
    let prefix = format!("{key}:");
    self
      .handlers
      .range(prefix.clone()..)
      .take_while(|(k, _)| k.starts_with(&prefix))
      .map(|(_, h)| h.clone())
      .next()
  }

  pub fn contains(&self, handler_type: &HandlerType) -> bool {
    self.get(handler_type).is_some()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.handlers.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }
}

impl std::fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HandlerRegistry")
      .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
      .finish()
  }
}
