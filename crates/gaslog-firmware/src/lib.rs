//! ESP32 (M5Stack Core) firmware-specific modules for gaslog
//!
//! Board wiring and the embassy-backed clock. Everything else lives in
//! `gaslog_core`.

#![no_std]

pub mod board;
pub mod clock;
