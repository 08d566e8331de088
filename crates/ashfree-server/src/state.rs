use std::sync::Arc;

use ashfree_core::CoachEngine;
use ashfree_memory::ProfileStore;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CoachEngine>,
    pub profiles: Option<Arc<ProfileStore>>,
}

impl AppState {
    pub fn new(engine: CoachEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            profiles: None,
        }
    }

    pub fn with_profiles(mut self, profiles: ProfileStore) -> Self {
        self.profiles = Some(Arc::new(profiles));
        self
    }
}
