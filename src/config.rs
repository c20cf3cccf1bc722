//! Application configuration constants
//!
//! Central location for configuration constants and validation boundaries
//! used throughout the application.

// ===== Data Files =====

/// File name of the backing event store inside the data directory
pub const EVENTS_FILE_NAME: &str = "events.csv";

/// File name of the events settings file inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// ===== Sweep Timing =====

/// Interval between sweeps in seconds (the driving tick is nominally 1 Hz)
pub const SWEEP_INTERVAL_SECS: u64 = 1;

/// The "Now" notification window in seconds
pub const NOW_WINDOW_SECS: i64 = 60;

/// Seconds per day, for converting stage day-counts into thresholds
pub const SECS_PER_DAY: i64 = 86_400;

// ===== Stage Threshold Limits =====

/// Minimum advance-warning threshold in days
pub const MIN_STAGE_DAYS: u32 = 1;

/// Maximum advance-warning threshold in days (one year, the rollover period)
pub const MAX_STAGE_DAYS: u32 = 365;
