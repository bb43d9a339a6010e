//! Desktop simulator for the gaslog H2S strip-chart logger.
//!
//! Runs the real gaslog-core control loop against an SDL2 window, a synthetic
//! gas sensor and a CSV file in the working directory.
//!
//! # Key bindings
//!
//! | Key       | Action                  |
//! |-----------|-------------------------|
//! | Space / L | Start or stop logging   |
//! | Q / Esc   | Quit                    |
//!
//! Set `GASLOG_CONFIG` to the path of a JSON file to override the default
//! `LoggerConfig`.

use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use gaslog_core::framebuffer::FrameBuffer;
use gaslog_core::input::ToggleButton;
use gaslog_core::sensors::{Sensor, SensorError};
use gaslog_core::storage::{LogStorage, LogStream, StorageError};
use gaslog_core::time::Clock;
use gaslog_core::ui::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use gaslog_core::{CHANNEL_COUNT, ControlLoop, LoggerConfig};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// History length: one sample per chart column
const HISTORY_LEN: usize = DISPLAY_WIDTH_PX as usize;

const SIM_LOG_PATH: &str = "log.csv";

const CONFIG_ENV: &str = "GASLOG_CONFIG";

// ---------------------------------------------------------------------------
// Mock sensor
// ---------------------------------------------------------------------------

/// Synthetic H2S sensor: a slow concentration swell with a faster ripple on
/// top, and a gently drifting temperature.
struct MockGasSensor {
    started: Instant,
}

impl MockGasSensor {
    fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Sensor<CHANNEL_COUNT> for MockGasSensor {
    type Readings = [f32; CHANNEL_COUNT];

    async fn connect(&mut self) -> Result<(), SensorError> {
        info!("Mock gas sensor connected");
        Ok(())
    }

    async fn read(&mut self) -> Result<[f32; CHANNEL_COUNT], SensorError> {
        let t = self.started.elapsed().as_secs_f64();

        // H2S: 0-70 ppm, swelling over about two minutes
        let h2s = 35.0 + 30.0 * (t / 20.0).sin() + 5.0 * (t / 3.0).cos();

        // Temperature: 20-26 °C
        let temperature = 23.0 + 3.0 * (t / 90.0).sin();

        Ok([h2s.max(0.0) as f32, temperature as f32])
    }
}

// ---------------------------------------------------------------------------
// File storage
// ---------------------------------------------------------------------------

/// Log storage in a directory on the host file system.
struct FileStorage {
    root: PathBuf,
}

impl LogStorage for FileStorage {
    type Stream = FileLog;

    fn mount(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            error!("Cannot use {}: {}", self.root.display(), e);
            StorageError::MountFailed {
                details: "directory unavailable",
            }
        })
    }

    fn open_append(&mut self, path: &str) -> Result<FileLog, StorageError> {
        let full_path = self.root.join(path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full_path)
            .map_err(|e| {
                error!("Cannot open {}: {}", full_path.display(), e);
                StorageError::OpenFailed {
                    details: "file could not be opened for append",
                }
            })?;

        info!("Logging to {}", full_path.display());
        Ok(FileLog {
            writer: BufWriter::new(file),
        })
    }
}

struct FileLog {
    writer: BufWriter<File>,
}

impl LogStream for FileLog {
    fn write_line(&mut self, line: &str) -> Result<(), StorageError> {
        writeln!(self.writer, "{}", line).map_err(|e| {
            error!("Log write failed: {}", e);
            StorageError::WriteFailed {
                details: "io error",
            }
        })
    }

    fn close(mut self) -> Result<(), StorageError> {
        self.writer.flush().map_err(|e| {
            error!("Log flush failed: {}", e);
            StorageError::CloseFailed {
                details: "flush failed",
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct StdClock {
    started: Instant,
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Blocking delay. The simulator has a single task, so sleeping the thread
/// is equivalent to yielding.
struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

// ---------------------------------------------------------------------------
// Window: display and button
// ---------------------------------------------------------------------------

/// Everything that lives behind the SDL window. The control loop draws into
/// `frame`; changed pixels are copied to `display` whenever the window is
/// serviced.
struct Screen {
    frame: FrameBuffer,
    display: SimulatorDisplay<Rgb565>,
    window: Window,
}

impl Screen {
    /// Push pending pixels to the window and collect its events.
    fn present(&mut self) -> Vec<SimulatorEvent> {
        let _ = self.frame.flush(&mut self.display);
        self.window.update(&self.display);
        self.window.events().collect()
    }
}

/// Draw target handed to the control loop
struct ScreenTarget(Rc<RefCell<Screen>>);

impl OriginDimensions for ScreenTarget {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32)
    }
}

impl DrawTarget for ScreenTarget {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.0.borrow_mut().frame.draw_iter(pixels)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.0.borrow_mut().frame.fill_contiguous(area, colors)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.0.borrow_mut().frame.fill_solid(area, color)
    }
}

/// Keyboard stand-in for the front button. Polling it also services the
/// SDL window, which happens every poll slice of the idle wait.
struct KeyButton {
    screen: Rc<RefCell<Screen>>,
    pending: u32,
}

impl ToggleButton for KeyButton {
    fn was_clicked(&mut self) -> bool {
        let events = self.screen.borrow_mut().present();

        for event in events {
            match event {
                SimulatorEvent::Quit => quit(),
                SimulatorEvent::KeyDown { keycode, repeat, .. } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        quit();
                    }
                    if !repeat && (keycode == Keycode::Space || keycode == Keycode::L) {
                        self.pending += 1;
                    }
                }
                _ => {}
            }
        }

        if self.pending > 0 {
            self.pending -= 1;
            return true;
        }
        false
    }
}

fn quit() -> ! {
    info!("Simulator exiting");
    process::exit(0);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn load_config() -> LoggerConfig {
    let mut config = LoggerConfig::default();
    config.log_path.clear();
    let _ = config.log_path.push_str(SIM_LOG_PATH);

    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return config;
    };

    match fs::read_to_string(&path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(overridden) => {
                info!("Loaded config from {}", path);
                overridden
            }
            Err(e) => {
                warn!("Ignoring {}: {}", path, e);
                config
            }
        },
        Err(e) => {
            warn!("Cannot read {}: {}", path, e);
            config
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting gaslog simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );
    info!("Keys: Space/L=Start/stop logging  Q=Quit");

    let config = load_config();

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let screen = Rc::new(RefCell::new(Screen {
        frame: FrameBuffer::new(),
        display: SimulatorDisplay::new(Size::new(
            DISPLAY_WIDTH_PX as u32,
            DISPLAY_HEIGHT_PX as u32,
        )),
        window: Window::new("gaslog Simulator", &output_settings),
    }));

    // The SDL window is created by the first update; events() panics before that
    {
        let screen = &mut *screen.borrow_mut();
        screen.window.update(&screen.display);
    }

    let storage = FileStorage {
        root: PathBuf::from("."),
    };
    let button = KeyButton {
        screen: Rc::clone(&screen),
        pending: 0,
    };
    let clock = StdClock {
        started: Instant::now(),
    };

    let control = ControlLoop::<_, _, _, _, _, _, HISTORY_LEN>::new(
        config,
        MockGasSensor::new(),
        storage,
        ScreenTarget(Rc::clone(&screen)),
        button,
        clock,
        StdDelay,
    );

    let mut control = match control {
        Ok(control) => control,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    block_on(control.run());
}
