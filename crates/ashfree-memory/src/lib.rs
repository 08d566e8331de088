pub mod calm_log;
pub mod conversation;
pub mod cravings;
pub mod error;
pub mod knowledge;
pub mod plans;
pub mod profiles;
pub mod user_lock;

pub use calm_log::CalmJournal;
pub use conversation::{
    ConversationStore, InMemoryTurnStore, JsonlTurnStore, TurnPersistence, DEFAULT_TAIL_WINDOW,
};
pub use cravings::CravingLog;
pub use error::{validate_user_id, MemoryError};
pub use knowledge::KnowledgeStore;
pub use plans::PlanStore;
pub use profiles::ProfileStore;
pub use user_lock::{UserLockGuard, UserLockManager};
