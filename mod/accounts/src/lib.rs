pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use dropspot_core::Module;

use service::AccountsService;

/// Accounts module — registration, login, and token issuance.
pub struct AccountsModule {
    service: Arc<AccountsService>,
}

impl AccountsModule {
    pub fn new(service: Arc<AccountsService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<AccountsService> {
        &self.service
    }
}

impl Module for AccountsModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
