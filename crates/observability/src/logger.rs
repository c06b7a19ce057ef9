//! Logging as an injected capability.
//!
//! Components hold a [`Logger`] and run their work under it instead of
//! relying on the process-wide subscriber. Production wiring passes
//! [`Logger::current`]; tests pass [`Logger::capture`] and inspect what was
//! written.

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::Dispatch;
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing_subscriber::fmt::MakeWriter;

/// Cheap-clone handle to a tracing dispatcher.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl core::fmt::Debug for Logger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    /// The dispatcher active at the call site (the process subscriber, usually).
    pub fn current() -> Self {
        Self {
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// A logger writing JSON lines (all levels) into memory, plus a handle to read them.
    pub fn capture() -> (Self, LogCapture) {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_max_level(tracing::Level::TRACE)
            .with_target(false)
            .with_ansi(false)
            .with_writer(capture.clone())
            .finish();

        (Self::from_dispatch(Dispatch::new(subscriber)), capture)
    }

    /// Run `future` with this logger as its dispatcher.
    ///
    /// Spawned tasks do not inherit the dispatcher; wrap them with `scope` too.
    pub fn scope<F: Future>(&self, future: F) -> WithDispatch<F> {
        future.with_subscriber(self.dispatch.clone())
    }

    /// Run a synchronous closure with this logger as its dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::current()
    }
}

/// In-memory sink behind [`Logger::capture`].
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw captured output.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Captured events parsed as JSON objects. Unparseable lines are skipped.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    /// Number of captured events whose `message` equals `message`.
    pub fn count_message(&self, message: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.get("message").and_then(|m| m.as_str()) == Some(message))
            .count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
