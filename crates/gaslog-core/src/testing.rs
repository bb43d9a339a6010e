//! Host-side fakes shared by the unit tests.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embedded_hal_async::delay::DelayNs;

use crate::config::CHANNEL_COUNT;
use crate::input::ToggleButton;
use crate::sensors::{Sensor, SensorError};
use crate::storage::{LogStorage, LogStream, StorageError};
use crate::time::Clock;

/// Virtual clock advanced only by delays. Clones share the same counter, so a
/// clone handed out as the delay provider moves the clock seen by everyone.
#[derive(Clone, Default)]
pub struct FakeClock {
    now_ns: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.set(self.now_ns.get() + ms * 1_000_000);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

impl DelayNs for FakeClock {
    async fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }
}

/// Sensor that plays back a script of readings, then repeats `steady`.
pub struct FakeSensor {
    connect_failures: u32,
    pub connect_attempts: u32,
    script: VecDeque<Result<[f32; CHANNEL_COUNT], SensorError>>,
    steady: [f32; CHANNEL_COUNT],
    pub reads: u32,
}

impl FakeSensor {
    pub fn steady(values: [f32; CHANNEL_COUNT]) -> Self {
        Self {
            connect_failures: 0,
            connect_attempts: 0,
            script: VecDeque::new(),
            steady: values,
            reads: 0,
        }
    }

    /// Fail the first `count` connection attempts.
    pub fn failing_connects(mut self, count: u32) -> Self {
        self.connect_failures = count;
        self
    }

    pub fn then(mut self, reading: Result<[f32; CHANNEL_COUNT], SensorError>) -> Self {
        self.script.push_back(reading);
        self
    }
}

impl Sensor<CHANNEL_COUNT> for FakeSensor {
    type Readings = [f32; CHANNEL_COUNT];

    async fn connect(&mut self) -> Result<(), SensorError> {
        self.connect_attempts += 1;
        if self.connect_attempts <= self.connect_failures {
            return Err(SensorError::NotConnected {
                sensor: "fake",
                details: "scripted failure",
            });
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<[f32; CHANNEL_COUNT], SensorError> {
        self.reads += 1;
        self.script.pop_front().unwrap_or(Ok(self.steady))
    }
}

#[derive(Default)]
struct MemoryState {
    lines: Vec<String>,
    opened_paths: Vec<String>,
    mount_failures: u32,
    mount_attempts: u32,
    open_failures: u32,
    write_limit: Option<usize>,
    write_attempts: usize,
    fail_close: bool,
    opened: usize,
    closed: usize,
}

/// In-memory log medium. Clones share the same backing state so tests can
/// inspect what a control loop wrote through its own handle.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_mounts(&mut self, count: u32) {
        self.state.borrow_mut().mount_failures = count;
    }

    pub fn fail_opens(&mut self, count: u32) {
        self.state.borrow_mut().open_failures = count;
    }

    /// Let `count` writes through, then fail every write after that.
    pub fn fail_writes_after(&mut self, count: usize) {
        self.state.borrow_mut().write_limit = Some(count);
    }

    pub fn fail_closes(&mut self) {
        self.state.borrow_mut().fail_close = true;
    }

    pub fn lines(&self) -> Vec<String> {
        self.state.borrow().lines.clone()
    }

    pub fn opened_paths(&self) -> Vec<String> {
        self.state.borrow().opened_paths.clone()
    }

    pub fn mount_attempts(&self) -> u32 {
        self.state.borrow().mount_attempts
    }

    pub fn write_attempts(&self) -> usize {
        self.state.borrow().write_attempts
    }

    pub fn closed_streams(&self) -> usize {
        self.state.borrow().closed
    }

    pub fn open_streams(&self) -> usize {
        let state = self.state.borrow();
        state.opened - state.closed
    }
}

impl LogStorage for MemoryStorage {
    type Stream = MemoryStream;

    fn mount(&mut self) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        state.mount_attempts += 1;
        if state.mount_attempts <= state.mount_failures {
            return Err(StorageError::MountFailed {
                details: "scripted failure",
            });
        }
        Ok(())
    }

    fn open_append(&mut self, path: &str) -> Result<MemoryStream, StorageError> {
        let mut state = self.state.borrow_mut();
        if state.open_failures > 0 {
            state.open_failures -= 1;
            return Err(StorageError::OpenFailed {
                details: "scripted failure",
            });
        }
        state.opened += 1;
        state.opened_paths.push(path.to_string());
        Ok(MemoryStream {
            state: Rc::clone(&self.state),
        })
    }
}

pub struct MemoryStream {
    state: Rc<RefCell<MemoryState>>,
}

impl LogStream for MemoryStream {
    fn write_line(&mut self, line: &str) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        let attempt = state.write_attempts;
        state.write_attempts += 1;
        if state.write_limit.is_some_and(|limit| attempt >= limit) {
            return Err(StorageError::WriteFailed {
                details: "scripted failure",
            });
        }
        state.lines.push(line.to_string());
        Ok(())
    }

    fn close(self) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        state.closed += 1;
        if state.fail_close {
            return Err(StorageError::CloseFailed {
                details: "scripted failure",
            });
        }
        Ok(())
    }
}

/// Button that reports one click for each scheduled time the clock has passed.
pub struct ScriptedButton {
    clock: FakeClock,
    clicks_at_ms: VecDeque<u64>,
}

impl ScriptedButton {
    pub fn new(clock: FakeClock, clicks_at_ms: &[u64]) -> Self {
        Self {
            clock,
            clicks_at_ms: clicks_at_ms.iter().copied().collect(),
        }
    }

    pub fn idle(clock: FakeClock) -> Self {
        Self::new(clock, &[])
    }
}

impl ToggleButton for ScriptedButton {
    fn was_clicked(&mut self) -> bool {
        match self.clicks_at_ms.front() {
            Some(&at) if at <= self.clock.now_ms() => {
                self.clicks_at_ms.pop_front();
                true
            }
            _ => false,
        }
    }
}
