// handlers/mod.rs - one module per route group; all handlers share AppState
pub mod health;
pub mod load;
pub mod operations;
pub mod products;

use crate::database::Backend;

/// Shared handler state. Cloning clones pool handles only.
#[derive(Debug, Clone)]
pub struct AppState {
    pub backend: Backend,
}

impl AppState {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}
