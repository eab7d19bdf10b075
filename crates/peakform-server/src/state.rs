use std::sync::Arc;

use peakform::flows::Flows;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<Flows>,
}

impl AppState {
    pub fn new(flows: Flows) -> Self {
        Self {
            flows: Arc::new(flows),
        }
    }
}
