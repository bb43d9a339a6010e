//! RGB565 palette for the logger display.
//!
//! To convert from 8-bit RGB: R>>3, G>>2, B>>3

use embedded_graphics::pixelcolor::Rgb565;

use crate::session::SessionStatus;

pub const COLOR_BACKGROUND: Rgb565 = Rgb565::new(0, 0, 0);

/// Baseline and quarter gridlines
pub const COLOR_GRID: Rgb565 = Rgb565::new(211 >> 3, 211 >> 2, 211 >> 3);

/// Startup prompts and readouts without a trace color
pub const COLOR_TEXT: Rgb565 = Rgb565::new(255 >> 3, 255 >> 2, 255 >> 3);

pub const COLOR_LOGGING: Rgb565 = Rgb565::new(0, 255 >> 2, 0);

pub const COLOR_STOPPED: Rgb565 = Rgb565::new(255 >> 3, 0, 0);

pub const COLOR_ERROR: Rgb565 = Rgb565::new(255 >> 3, 165 >> 2, 0);

pub const fn rgb888_to_565(rgb: [u8; 3]) -> Rgb565 {
    Rgb565::new(rgb[0] >> 3, rgb[1] >> 2, rgb[2] >> 3)
}

pub const fn status_color(status: SessionStatus) -> Rgb565 {
    match status {
        SessionStatus::Logging => COLOR_LOGGING,
        SessionStatus::Stopped => COLOR_STOPPED,
        SessionStatus::Failed(_) => COLOR_ERROR,
    }
}
