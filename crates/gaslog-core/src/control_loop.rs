//! Startup sequence and the sample/render/log/poll cycle.
//!
//! [`ControlLoop`] owns every resource the logger touches. One cycle is:
//!
//! 1. read the sensor (a failed read becomes a NaN sample)
//! 2. append the sample to the history
//! 3. redraw the strip chart, readout and status
//! 4. append the sample to the log if a session is active
//! 5. idle for the cycle budget, polling the button every slice
//!
//! A click during the idle wait toggles the logging session and ends the
//! wait early, so the next sample follows immediately.

use core::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::config::{CHANNEL_COUNT, ConfigError, LoggerConfig};
use crate::history::{RingHistory, Sample};
use crate::input::ToggleButton;
use crate::sensors::{Sensor, SensorReadings};
use crate::session::{LoggingSession, SessionStatus};
use crate::storage::LogStorage;
use crate::time::Clock;
use crate::ui::colors::COLOR_BACKGROUND;
use crate::ui::{StripChart, draw_prompt, draw_readout, draw_status};

const NO_SENSOR_PROMPT: &str = "No Sensor";
const NO_STORAGE_PROMPT: &str = "No SD card";

/// Failed attempts seen while bringing the hardware up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub sensor_failures: u32,
    pub storage_failures: u32,
}

/// The logger application.
///
/// `N` is the history length and should match the chart width in pixels.
pub struct ControlLoop<S, L, D, B, C, Dl, const N: usize>
where
    S: Sensor<CHANNEL_COUNT>,
    L: LogStorage,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
    B: ToggleButton,
    C: Clock,
    Dl: DelayNs,
{
    config: LoggerConfig,
    sensor: S,
    storage: L,
    display: D,
    button: B,
    clock: C,
    delay: Dl,
    history: RingHistory<N>,
    chart: StripChart,
    session: LoggingSession<L::Stream>,
}

impl<S, L, D, B, C, Dl, const N: usize> ControlLoop<S, L, D, B, C, Dl, N>
where
    S: Sensor<CHANNEL_COUNT>,
    L: LogStorage,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
    B: ToggleButton,
    C: Clock,
    Dl: DelayNs,
{
    /// Validate `config` and assemble the loop. The chart covers the whole
    /// display.
    pub fn new(
        config: LoggerConfig,
        sensor: S,
        storage: L,
        display: D,
        button: B,
        clock: C,
        delay: Dl,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let chart = StripChart::from_config(&config, display.bounding_box());

        Ok(Self {
            config,
            sensor,
            storage,
            display,
            button,
            clock,
            delay,
            history: RingHistory::new(),
            chart,
            session: LoggingSession::new(),
        })
    }

    /// Bring up the sensor, then the storage, retrying each until it works.
    pub async fn start(&mut self) -> StartupReport {
        let sensor_failures = self.wait_for_sensor().await;
        let storage_failures = self.mount_storage().await;

        log_draw_error(self.display.clear(COLOR_BACKGROUND), "screen clear");
        log_draw_error(draw_status(&mut self.display, self.session.status()), "status");

        self.delay.delay_ms(self.config.settle_ms).await;
        info!("Startup complete, sampling every {} ms", self.config.cycle_budget_ms);

        StartupReport {
            sensor_failures,
            storage_failures,
        }
    }

    /// Startup followed by cycles forever.
    pub async fn run(&mut self) {
        self.start().await;
        loop {
            self.cycle().await;
        }
    }

    /// Retry `connect` every `sensor_retry_ms` until it succeeds. Returns the
    /// number of failed attempts.
    async fn wait_for_sensor(&mut self) -> u32 {
        let mut failures = 0;
        loop {
            match self.sensor.connect().await {
                Ok(()) => {
                    info!("Sensor connected after {} failed attempts", failures);
                    return failures;
                }
                Err(e) => {
                    failures += 1;
                    warn!("Sensor not ready (attempt {}): {}", failures, e);
                    log_draw_error(draw_prompt(&mut self.display, NO_SENSOR_PROMPT), "prompt");
                    self.delay.delay_ms(self.config.sensor_retry_ms).await;
                }
            }
        }
    }

    /// Retry `mount` every `storage_retry_ms` until it succeeds. Returns the
    /// number of failed attempts.
    async fn mount_storage(&mut self) -> u32 {
        let mut failures = 0;
        loop {
            match self.storage.mount() {
                Ok(()) => {
                    info!("Storage mounted after {} failed attempts", failures);
                    return failures;
                }
                Err(e) => {
                    failures += 1;
                    warn!("Storage not ready (attempt {}): {}", failures, e);
                    log_draw_error(draw_prompt(&mut self.display, NO_STORAGE_PROMPT), "prompt");
                    self.delay.delay_ms(self.config.storage_retry_ms).await;
                }
            }
        }
    }

    /// Run one cycle. Returns `true` if the button toggled the session.
    pub async fn cycle(&mut self) -> bool {
        let sample = self.acquire().await;
        self.history.append(sample);

        log_draw_error(self.chart.redraw(&self.history, &mut self.display), "chart");
        log_draw_error(
            draw_readout(&mut self.display, &self.config.channels, &sample),
            "readout",
        );

        let status = self.session.status();
        log_draw_error(draw_status(&mut self.display, status), "status");

        self.session.record(&sample);
        if self.session.status() != status {
            log_draw_error(draw_status(&mut self.display, self.session.status()), "status");
        }

        self.idle_wait().await
    }

    async fn acquire(&mut self) -> Sample {
        let result = self.sensor.read().await;
        let timestamp_ms = self.clock.now_ms();

        match result {
            Ok(readings) => {
                let sample = Sample::new(timestamp_ms, readings.to_array());
                debug!("Sample at {} ms: {:?}", timestamp_ms, sample.values);
                sample
            }
            Err(e) => {
                warn!("Sensor read failed: {}", e);
                Sample::unavailable(timestamp_ms)
            }
        }
    }

    /// Spend the cycle budget in poll slices. The first click toggles the
    /// session and ends the wait.
    pub async fn idle_wait(&mut self) -> bool {
        for _ in 0..self.config.polls_per_cycle() {
            if self.button.was_clicked() {
                self.toggle_session();
                return true;
            }
            self.delay.delay_ms(self.config.poll_slice_ms).await;
        }
        false
    }

    fn toggle_session(&mut self) {
        let status = self.session.toggle(
            &mut self.storage,
            self.config.log_path.as_str(),
            &self.config.channels,
            self.clock.now_ms(),
        );
        log_draw_error(draw_status(&mut self.display, status), "status");
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn history(&self) -> &RingHistory<N> {
        &self.history
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Mutable display access, for targets that need an explicit flush
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}

fn log_draw_error<E: Debug>(result: Result<(), E>, what: &str) {
    if let Err(e) = result {
        error!("Failed to draw {}: {:?}", what, e);
    }
}
