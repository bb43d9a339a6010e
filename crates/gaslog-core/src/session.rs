//! Logging session state machine.
//!
//! ```text
//!            toggle (open + header ok)
//!   Stopped ---------------------------> Logging
//!      ^  \                                 |
//!      |   `-- toggle (open fails) --.      | toggle (close)
//!      |                             |      | write failure
//!      `-----------------------------'<-----'
//! ```
//!
//! The open stream lives inside the `Logging` state, so a stream can
//! never exist while stopped and logging can never run without one.

use core::mem;

use log::{error, info, warn};

use crate::config::ChannelConfig;
use crate::history::Sample;
use crate::storage::{LogStorage, LogStream, StorageError, csv};

/// Internal session state
pub(crate) enum SessionState<S> {
    Stopped,
    Logging { stream: S, started_at_ms: u64 },
}

/// What the status indicator should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Stopped,
    Logging,
    /// Stopped because the last open or write failed
    Failed(StorageError),
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Logging => "Logging",
            Self::Failed(StorageError::MountFailed { .. }) => "No SD card",
            Self::Failed(StorageError::OpenFailed { .. }) => "Open failed",
            Self::Failed(_) => "Write failed",
        }
    }
}

/// Gate in front of the append-only log stream.
pub struct LoggingSession<S> {
    state: SessionState<S>,
    last_error: Option<StorageError>,
}

impl<S> Default for LoggingSession<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> LoggingSession<S> {
    pub const fn new() -> Self {
        Self {
            state: SessionState::Stopped,
            last_error: None,
        }
    }

    pub fn is_logging(&self) -> bool {
        matches!(self.state, SessionState::Logging { .. })
    }

    pub fn last_error(&self) -> Option<StorageError> {
        self.last_error
    }

    /// Time the current session started, if logging
    pub fn started_at_ms(&self) -> Option<u64> {
        match self.state {
            SessionState::Logging { started_at_ms, .. } => Some(started_at_ms),
            SessionState::Stopped => None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match (&self.state, self.last_error) {
            (SessionState::Logging { .. }, _) => SessionStatus::Logging,
            (SessionState::Stopped, Some(err)) => SessionStatus::Failed(err),
            (SessionState::Stopped, None) => SessionStatus::Stopped,
        }
    }
}

impl<S: LogStream> LoggingSession<S> {
    /// Flip between `Stopped` and `Logging`.
    ///
    /// Starting opens `path` for append and writes the CSV header. If either
    /// step fails the session stays `Stopped` and the error is kept for the
    /// status indicator.
    pub fn toggle<L>(
        &mut self,
        storage: &mut L,
        path: &str,
        channels: &[ChannelConfig],
        now_ms: u64,
    ) -> SessionStatus
    where
        L: LogStorage<Stream = S>,
    {
        match mem::replace(&mut self.state, SessionState::Stopped) {
            SessionState::Stopped => match Self::start(storage, path, channels) {
                Ok(stream) => {
                    info!("Logging started at {} ms", now_ms);
                    self.state = SessionState::Logging {
                        stream,
                        started_at_ms: now_ms,
                    };
                    self.last_error = None;
                }
                Err(e) => {
                    error!("Logging not started: {}", e);
                    self.last_error = Some(e);
                }
            },
            SessionState::Logging { stream, .. } => {
                if let Err(e) = stream.close() {
                    warn!("Log stream did not close cleanly: {}", e);
                }
                info!("Logging stopped at {} ms", now_ms);
                self.last_error = None;
            }
        }

        self.status()
    }

    /// Append `sample` to the log if a session is active.
    ///
    /// A write failure ends the session: the stream is closed best-effort and
    /// the session drops back to `Stopped` with the error recorded.
    pub fn record(&mut self, sample: &Sample) {
        let SessionState::Logging {
            stream,
            started_at_ms,
        } = &mut self.state
        else {
            return;
        };

        let elapsed_ms = sample.timestamp_ms.saturating_sub(*started_at_ms);
        let result = csv::record_line(elapsed_ms, sample).and_then(|line| stream.write_line(&line));

        if let Err(e) = result {
            error!("Logging aborted: {}", e);
            if let SessionState::Logging { stream, .. } =
                mem::replace(&mut self.state, SessionState::Stopped)
                && let Err(close_err) = stream.close()
            {
                warn!("Log stream did not close cleanly: {}", close_err);
            }
            self.last_error = Some(e);
        }
    }

    fn start<L>(storage: &mut L, path: &str, channels: &[ChannelConfig]) -> Result<S, StorageError>
    where
        L: LogStorage<Stream = S>,
    {
        let mut stream = storage.open_append(path)?;
        let header = csv::header_line(channels).and_then(|line| stream.write_line(&line));

        match header {
            Ok(()) => Ok(stream),
            Err(e) => {
                if let Err(close_err) = stream.close() {
                    warn!("Log stream did not close cleanly: {}", close_err);
                }
                Err(e)
            }
        }
    }
}
