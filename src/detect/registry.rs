use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::ObjectDetector;

/// Shared handle to a detector. `ObjectDetector::detect` takes `&mut self`.
pub type SharedDetector = Arc<Mutex<dyn ObjectDetector>>;

/// Registry of detector backends, selected by name from configuration.
pub struct BackendRegistry {
    backends: HashMap<String, SharedDetector>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Registry with the built-in backends.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(super::StubDetector::default());
        registry
    }

    /// Register a backend under its `name()`. A later backend with the same
    /// name replaces the earlier one.
    pub fn register<B: ObjectDetector + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a backend by name and run its warm-up hook.
    ///
    /// Unknown names are a startup error listing what is available.
    pub fn select(&self, name: &str) -> Result<SharedDetector> {
        let backend = self.backends.get(name).cloned().ok_or_else(|| {
            anyhow!(
                "detector backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("detector backend lock poisoned"))?;
            guard.warm_up()?;
        }
        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
