pub mod deletion_logs;
pub mod deletion_sync_events;
pub mod episodes;
pub mod prelude;
pub mod requests;
pub mod timeline_events;
