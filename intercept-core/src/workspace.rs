//! In-memory workspace property store

use dashmap::DashMap;
use std::sync::Arc;

use intercept_common::{PropertyStore, Workspace};

/// A workspace whose integer properties live in a concurrent map
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    name: String,
    properties: DashMap<String, i64>,
}

impl MemoryWorkspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: DashMap::new(),
        }
    }

    pub fn shared(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertyStore for MemoryWorkspace {
    fn get_integer_property(&self, key: &str) -> Option<i64> {
        self.properties.get(key).map(|v| *v)
    }

    fn set_integer_property(&self, key: &str, value: i64) {
        self.properties.insert(key.to_string(), value);
    }
}

impl Workspace for MemoryWorkspace {
    fn name(&self) -> &str {
        &self.name
    }
}
