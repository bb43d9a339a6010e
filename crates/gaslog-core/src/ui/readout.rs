//! Text overlays: the live readout, the logging status and startup prompts.

use core::fmt::Write;

use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};
use heapless::String;
use log::debug;

use super::colors::{COLOR_BACKGROUND, COLOR_TEXT, rgb888_to_565, status_color};
use crate::config::ChannelConfig;
use crate::history::Sample;
use crate::session::SessionStatus;

pub const READOUT_ORIGIN: Point = Point::new(0, 0);

pub const STATUS_ORIGIN: Point = Point::new(0, 20);

/// Area cleared before the status is redrawn
pub const STATUS_AREA: Rectangle = Rectangle::new(STATUS_ORIGIN, Size::new(120, 40));

pub const MAX_READOUT_LEN: usize = 64;

/// Format the readout line, e.g. `H2S(0-100):12.34/25.1[degC]`.
///
/// The first channel is shown with its plotted range, the rest with their
/// unit. Text that does not fit is cut off.
pub fn format_readout(channels: &[ChannelConfig], sample: &Sample) -> String<MAX_READOUT_LEN> {
    let mut text = String::new();

    for (i, (channel, value)) in channels.iter().zip(sample.values).enumerate() {
        let decimals = usize::from(channel.readout_decimals);
        let written = if i == 0 {
            write!(
                text,
                "{}({:.0}-{:.0}):{:.*}",
                channel.name, channel.domain_min, channel.domain_max, decimals, value
            )
        } else {
            write!(text, "/{:.*}[{}]", decimals, value, channel.unit)
        };

        if written.is_err() {
            debug!("Readout cut off at {} bytes", MAX_READOUT_LEN);
            break;
        }
    }

    text
}

/// Draw the readout of `sample` over the top of the chart.
pub fn draw_readout<D>(
    display: &mut D,
    channels: &[ChannelConfig],
    sample: &Sample,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let color = channels
        .first()
        .and_then(|c| c.trace)
        .map_or(COLOR_TEXT, rgb888_to_565);
    let style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(color)
        .background_color(COLOR_BACKGROUND)
        .build();

    let text = format_readout(channels, sample);
    Text::with_baseline(&text, READOUT_ORIGIN, style, Baseline::Top).draw(display)?;
    Ok(())
}

/// Replace the status indicator below the readout.
pub fn draw_status<D>(display: &mut D, status: SessionStatus) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    display.fill_solid(&STATUS_AREA, COLOR_BACKGROUND)?;

    let style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(status_color(status))
        .build();
    Text::with_baseline(status.label(), STATUS_ORIGIN, style, Baseline::Top).draw(display)?;
    Ok(())
}

/// Clear the screen and show a single-line startup prompt.
pub fn draw_prompt<D>(display: &mut D, message: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    display.clear(COLOR_BACKGROUND)?;

    let style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(COLOR_TEXT)
        .build();
    Text::with_baseline(message, READOUT_ORIGIN, style, Baseline::Top).draw(display)?;
    Ok(())
}
