use std::sync::Arc;

use waypoint_core::{FallbackOrchestrator, ResponseAssembler};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FallbackOrchestrator>,
    pub assembler: ResponseAssembler,
}

impl AppState {
    pub fn new(orchestrator: FallbackOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            assembler: ResponseAssembler,
        }
    }
}
