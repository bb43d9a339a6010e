//! Display rendering: the strip chart plus the text overlays drawn on top
//! of it.

pub mod colors;
pub mod readout;
pub mod strip_chart;

pub use readout::{draw_prompt, draw_readout, draw_status};
pub use strip_chart::StripChart;

/// Display width in pixels (M5Stack Core ILI9342C, landscape)
pub const DISPLAY_WIDTH_PX: u16 = 320;

/// Display height in pixels
pub const DISPLAY_HEIGHT_PX: u16 = 240;
