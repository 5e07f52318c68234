use std::sync::Arc;

use domains::IdentityVerifier;
use services::Services;

use crate::Metrics;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(services: Services, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            services,
            verifier,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
