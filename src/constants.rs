//! Process-wide constants that are not meaningfully configurable.

/// Canonical content-hash length (40-char hex, case-insensitive).
pub const CONTENT_HASH_LEN: usize = 40;

/// Default live-update bus channel buffer size (overridable via config).
pub const DEFAULT_EVENT_BUS_BUFFER_SIZE: usize = 256;

/// Default fast poll interval for the progress provider, in seconds.
pub const DEFAULT_POLL_FAST_SECS: u64 = 3;

/// Default slow poll interval for the progress provider, in seconds.
pub const DEFAULT_POLL_SLOW_SECS: u64 = 15;

/// Verifier loop tick interval, in seconds. Fixed by spec, not configurable.
pub const VERIFIER_TICK_SECS: u64 = 30;

/// Default staleness window before the verifier considers a request stuck, in minutes.
pub const DEFAULT_STALENESS_WINDOW_MINUTES: i64 = 5;

/// Default SSE heartbeat interval, in seconds.
pub const DEFAULT_SSE_HEARTBEAT_INTERVAL_SECONDS: u64 = 15;

/// Delay before the deletion orchestrator's verification pass, in seconds.
pub const DELETION_VERIFICATION_DELAY_SECS: u64 = 30;

/// Default outbound HTTP timeout, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Progress delta, in percentage points, worth a debug log line.
pub const SIGNIFICANT_PROGRESS_DELTA: f32 = 5.0;
