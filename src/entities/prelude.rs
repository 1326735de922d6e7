pub use super::deletion_logs::Entity as DeletionLogs;
pub use super::deletion_sync_events::Entity as DeletionSyncEvents;
pub use super::episodes::Entity as Episodes;
pub use super::requests::Entity as Requests;
pub use super::timeline_events::Entity as TimelineEvents;
