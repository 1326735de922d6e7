pub mod aggregator;
pub mod events;
pub mod model;
pub mod state_machine;

pub use events::NotificationEvent;
pub use model::{
    DeletionSource, DeletionStatus, DeletionTargetService, IsAnime, MediaKind, RequestState,
    ServiceLabel, SyncStatus,
};
