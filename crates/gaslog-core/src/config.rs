//! Startup configuration for the logger.
//!
//! The channel set is fixed at compile time ([`CHANNEL_COUNT`]); everything
//! else (scaling domains, trace colors, cadence, retry delays, log path) lives
//! in [`LoggerConfig`] and is validated once before the control loop starts.

use heapless::String;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Number of values carried by every sample: H2S concentration and temperature.
pub const CHANNEL_COUNT: usize = 2;

/// Index of the H2S concentration channel (ppm)
pub const H2S: usize = 0;

/// Index of the sensor temperature channel (°C)
pub const TEMPERATURE: usize = 1;

/// Maximum length of a channel name (also used as the CSV column name)
pub const MAX_CHANNEL_NAME_LEN: usize = 12;

/// Maximum length of a channel unit label
pub const MAX_UNIT_LEN: usize = 8;

/// Maximum length of the log file path
pub const MAX_LOG_PATH_LEN: usize = 32;

/// Purple trace used for the H2S channel (RGB888)
const TRACE_PURPLE: [u8; 3] = [128, 0, 128];

/// Per-channel presentation and scaling settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Column name in the CSV header and readout label
    pub name: String<MAX_CHANNEL_NAME_LEN>,
    /// Unit shown in the readout
    pub unit: String<MAX_UNIT_LEN>,
    /// Lower bound of the plotted domain
    pub domain_min: f32,
    /// Upper bound of the plotted domain
    pub domain_max: f32,
    /// Trace color (RGB888). `None` means the channel is logged but not plotted.
    pub trace: Option<[u8; 3]>,
    /// Decimal places shown in the readout
    pub readout_decimals: u8,
}

impl ChannelConfig {
    pub fn new(name: &str, unit: &str, domain_min: f32, domain_max: f32) -> Self {
        Self {
            name: bounded(name),
            unit: bounded(unit),
            domain_min,
            domain_max,
            trace: None,
            readout_decimals: 2,
        }
    }

    pub fn with_trace(mut self, rgb: [u8; 3]) -> Self {
        self.trace = Some(rgb);
        self
    }

    pub fn with_readout_decimals(mut self, decimals: u8) -> Self {
        self.readout_decimals = decimals;
        self
    }
}

/// Complete logger configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub channels: [ChannelConfig; CHANNEL_COUNT],
    /// Path of the append-only CSV log on the storage medium
    pub log_path: String<MAX_LOG_PATH_LEN>,
    /// Total idle-wait budget per cycle in milliseconds
    pub cycle_budget_ms: u32,
    /// Button polling interval during the idle wait in milliseconds
    pub poll_slice_ms: u32,
    /// Delay between sensor connection attempts at startup
    pub sensor_retry_ms: u32,
    /// Delay between storage mount attempts at startup
    pub storage_retry_ms: u32,
    /// Delay after the sensor is configured before the first reading
    pub settle_ms: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            channels: [
                ChannelConfig::new("H2S", "ppm", 0.0, 100.0).with_trace(TRACE_PURPLE),
                ChannelConfig::new("temp", "degC", 0.0, 50.0).with_readout_decimals(1),
            ],
            log_path: bounded("LOG.CSV"),
            cycle_budget_ms: 1000,
            poll_slice_ms: 10,
            sensor_retry_ms: 1000,
            storage_retry_ms: 500,
            settle_ms: 1000,
        }
    }
}

impl LoggerConfig {
    /// Check the configuration for values that would make the loop misbehave.
    ///
    /// A degenerate scaling domain would divide by zero in the scaler, so it
    /// is rejected here rather than at render time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (channel, cfg) in self.channels.iter().enumerate() {
            if !cfg.domain_min.is_finite() || !cfg.domain_max.is_finite() {
                return Err(ConfigError::NonFiniteDomain { channel });
            }
            if cfg.domain_max <= cfg.domain_min {
                return Err(ConfigError::EmptyDomain { channel });
            }
        }

        if self.poll_slice_ms == 0 {
            return Err(ConfigError::ZeroPollSlice);
        }

        if self.poll_slice_ms > self.cycle_budget_ms {
            return Err(ConfigError::SliceExceedsBudget {
                slice_ms: self.poll_slice_ms,
                budget_ms: self.cycle_budget_ms,
            });
        }

        if self.log_path.is_empty() {
            return Err(ConfigError::EmptyLogPath);
        }

        Ok(())
    }

    /// Number of button polls that fit in one idle wait
    pub fn polls_per_cycle(&self) -> u32 {
        self.cycle_budget_ms / self.poll_slice_ms.max(1)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("channel {channel}: domain max must be greater than domain min")]
    EmptyDomain { channel: usize },
    #[error("channel {channel}: domain bounds must be finite")]
    NonFiniteDomain { channel: usize },
    #[error("poll slice must be non-zero")]
    ZeroPollSlice,
    #[error("poll slice of {slice_ms}ms exceeds the cycle budget of {budget_ms}ms")]
    SliceExceedsBudget { slice_ms: u32, budget_ms: u32 },
    #[error("log path is empty")]
    EmptyLogPath,
}

/// Copy `text` into a fixed-capacity string, truncating at capacity.
fn bounded<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
