//! Durable storage for the sample log.
//!
//! The control loop only sees the two traits here; [`sd_card`] implements
//! them on top of `embedded-sdmmc` and the simulator implements them with
//! `std::fs`.

pub mod csv;
pub mod sd_card;

pub use csv::{LogLine, MAX_LINE_LEN};
pub use sd_card::{FixedTimeSource, SdCardStorage, SdLogFile};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage not available: {details}")]
    MountFailed { details: &'static str },
    #[error("could not open log file: {details}")]
    OpenFailed { details: &'static str },
    #[error("could not write log file: {details}")]
    WriteFailed { details: &'static str },
    #[error("could not close log file: {details}")]
    CloseFailed { details: &'static str },
    #[error("log line exceeds {max} bytes")]
    LineTooLong { max: usize },
}

/// A medium that can hold the append-only log.
pub trait LogStorage {
    type Stream: LogStream;

    /// Check that the medium is present and readable.
    fn mount(&mut self) -> Result<(), StorageError>;

    /// Open `path` for appending, creating it if needed. Existing content is
    /// never truncated.
    fn open_append(&mut self, path: &str) -> Result<Self::Stream, StorageError>;
}

/// An open, append-only log file.
pub trait LogStream {
    /// Append `line` followed by a newline.
    fn write_line(&mut self, line: &str) -> Result<(), StorageError>;

    /// Flush and close the stream.
    fn close(self) -> Result<(), StorageError>;
}
