//! The set of configured services.
//!
//! Built once at startup and never mutated. Iteration order is insertion
//! order so user-facing output is deterministic across runs.

use crate::service::TritonService;

pub struct ServiceRegistry {
    services: Vec<TritonService>,
}

impl ServiceRegistry {
    pub fn new(services: Vec<TritonService>) -> Self {
        Self { services }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TritonService> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
