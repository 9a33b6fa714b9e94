pub mod api;
pub mod arbiter;
pub mod model;
pub mod store;
pub mod window;

use std::sync::Arc;

use axum::Router;
use dropspot_core::Module;

use arbiter::DropArbiter;

/// Drops module — drop availability and claim coordination.
pub struct DropsModule {
    arbiter: Arc<DropArbiter>,
}

impl DropsModule {
    pub fn new(arbiter: Arc<DropArbiter>) -> Self {
        Self { arbiter }
    }

    /// Get a reference to the arbiter for programmatic use.
    pub fn arbiter(&self) -> &Arc<DropArbiter> {
        &self.arbiter
    }

    /// Administrative CRUD routes, mounted by the binary under `/admin/drops`.
    pub fn admin_routes(&self) -> Router {
        api::admin_router(Arc::clone(&self.arbiter))
    }
}

impl Module for DropsModule {
    fn name(&self) -> &str {
        "drops"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.arbiter))
    }
}
