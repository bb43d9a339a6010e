//! CSV lines written to the sample log.
//!
//! Header: `time[ms],<name1>,<name2>,...`
//! Record: `<elapsed_ms>,<value1>,<value2>,...` with six decimals per value.

use core::fmt::Write;

use heapless::String;

use super::StorageError;
use crate::config::{CHANNEL_COUNT, ChannelConfig};
use crate::history::Sample;

/// Digits in `u64::MAX`
const MAX_ELAPSED_LEN: usize = 20;

/// `,` plus `f32::MIN` printed with six decimals
const MAX_VALUE_FIELD_LEN: usize = 48;

/// Longest line the logger will emit. Any record fits, whatever its values.
pub const MAX_LINE_LEN: usize = MAX_ELAPSED_LEN + CHANNEL_COUNT * MAX_VALUE_FIELD_LEN;

pub type LogLine = String<MAX_LINE_LEN>;

const TIME_COLUMN: &str = "time[ms]";

pub fn header_line(channels: &[ChannelConfig]) -> Result<LogLine, StorageError> {
    let mut line = LogLine::new();
    line.push_str(TIME_COLUMN).map_err(|_| too_long())?;
    for channel in channels {
        write!(line, ",{}", channel.name).map_err(|_| too_long())?;
    }
    Ok(line)
}

pub fn record_line(elapsed_ms: u64, sample: &Sample) -> Result<LogLine, StorageError> {
    let mut line = LogLine::new();
    write!(line, "{}", elapsed_ms).map_err(|_| too_long())?;
    for value in sample.values {
        write!(line, ",{:.6}", value).map_err(|_| too_long())?;
    }
    Ok(line)
}

fn too_long() -> StorageError {
    StorageError::LineTooLong { max: MAX_LINE_LEN }
}
