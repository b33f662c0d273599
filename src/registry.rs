//! Command registry.
//!
//! Maps command names to handlers. Registration takes the write lock and
//! replaces any previous handler for the name; lookups take the read lock and
//! may run from any number of connection tasks at once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::commands::CommandHandler;

/// Thread-safe map from command name to handler
#[derive(Default)]
pub struct Registry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any existing entry.
    pub fn register<H>(&self, name: impl Into<String>, handler: H)
    where
        H: CommandHandler + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.insert(name.into(), Arc::new(handler));
    }

    /// Find the handler for `name`. Matching is exact.
    ///
    /// The lock is released before returning, so the handler can run for as
    /// long as it needs without blocking registrations.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.commands())
            .finish()
    }
}
