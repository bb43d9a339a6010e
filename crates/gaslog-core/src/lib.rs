//! Hardware-independent core library for gaslog
//!
//! This crate contains all platform-agnostic logic for the gaslog H2S data
//! logger: the sample history ring, pixel scaling, strip-chart rendering, the
//! logging session state machine, storage and sensor trait definitions, and
//! the control loop that ties them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod config;
pub mod control_loop;
pub mod framebuffer;
pub mod history;
pub mod input;
pub mod scale;
pub mod sensors;
pub mod session;
pub mod storage;
pub mod time;
pub mod ui;

#[cfg(test)]
mod testing;

pub use config::{CHANNEL_COUNT, ChannelConfig, ConfigError, LoggerConfig};
pub use control_loop::ControlLoop;
pub use history::{RingHistory, Sample};
pub use session::{LoggingSession, SessionStatus};
