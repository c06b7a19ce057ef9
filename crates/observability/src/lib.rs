//! Tracing, logging (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Injectable logging capability.
pub mod logger;

pub use logger::{LogCapture, Logger};
pub use self::tracing::{LogFormat, UnknownLogFormat, init_with};
