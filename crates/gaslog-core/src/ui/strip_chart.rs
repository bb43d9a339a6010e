//! Scrolling strip chart redrawn column by column from the history.
//!
//! Column `i` shows the `i`-th oldest sample, so the newest sample always
//! sits in the rightmost column and the trace scrolls left one pixel per
//! cycle. Every column is fully cleared before it is drawn, which makes a
//! redraw of an unchanged history a no-op on a change-tracking target.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::colors::{COLOR_BACKGROUND, COLOR_GRID, rgb888_to_565};
use crate::config::{CHANNEL_COUNT, LoggerConfig};
use crate::history::RingHistory;
use crate::scale::scale;

/// Quarter gridlines are dotted: one pixel every this many columns
const GRID_DOT_SPACING: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Trace {
    color: Rgb565,
    domain_min: f32,
    domain_max: f32,
}

/// Strip chart layout and per-channel trace styling
#[derive(Debug, Clone)]
pub struct StripChart {
    area: Rectangle,
    traces: [Option<Trace>; CHANNEL_COUNT],
}

impl StripChart {
    /// Build a chart covering `area`. Channels without a trace color are not
    /// plotted.
    pub fn from_config(config: &LoggerConfig, area: Rectangle) -> Self {
        let traces = core::array::from_fn(|i| {
            let channel = &config.channels[i];
            channel.trace.map(|rgb| Trace {
                color: rgb888_to_565(rgb),
                domain_min: channel.domain_min,
                domain_max: channel.domain_max,
            })
        });

        Self { area, traces }
    }

    pub fn area(&self) -> Rectangle {
        self.area
    }

    fn height(&self) -> i32 {
        self.area.size.height as i32
    }

    /// Row of the centre baseline
    pub fn baseline_y(&self) -> i32 {
        self.area.top_left.y + self.height() / 2
    }

    /// Rows of the dotted quarter and three-quarter gridlines
    pub fn quarter_ys(&self) -> [i32; 2] {
        let top = self.area.top_left.y;
        [top + self.height() / 4, top + self.height() * 3 / 4]
    }

    /// Row a value plots at for the given domain
    pub fn value_y(&self, value: f32, domain_min: f32, domain_max: f32) -> i32 {
        let range_max = u16::try_from(self.height() - 1).unwrap_or(u16::MAX);
        let bottom = self.area.top_left.y + self.height() - 1;
        bottom - i32::from(scale(value, domain_min, domain_max, range_max))
    }

    /// Redraw every column from `history`, oldest sample on the left.
    ///
    /// If the history holds more samples than the chart has columns only the
    /// oldest `width` are drawn, so size `N` to the chart width.
    pub fn redraw<D, const N: usize>(
        &self,
        history: &RingHistory<N>,
        display: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if self.area.size.width == 0 || self.area.size.height == 0 {
            return Ok(());
        }

        let column_size = Size::new(1, self.area.size.height);
        let baseline_y = self.baseline_y();
        let quarter_ys = self.quarter_ys();

        for (i, sample) in history
            .window()
            .take(self.area.size.width as usize)
            .enumerate()
        {
            let x = self.area.top_left.x + i as i32;

            display.fill_solid(
                &Rectangle::new(Point::new(x, self.area.top_left.y), column_size),
                COLOR_BACKGROUND,
            )?;

            Pixel(Point::new(x, baseline_y), COLOR_GRID).draw(display)?;

            if i % GRID_DOT_SPACING == 0 {
                display.draw_iter(
                    quarter_ys
                        .iter()
                        .map(|&y| Pixel(Point::new(x, y), COLOR_GRID)),
                )?;
            }

            let points = self
                .traces
                .iter()
                .zip(sample.values)
                .filter_map(|(trace, value)| trace.map(|t| (t, value)))
                .filter(|(_, value)| !value.is_nan())
                .map(|(t, value)| {
                    Pixel(
                        Point::new(x, self.value_y(value, t.domain_min, t.domain_max)),
                        t.color,
                    )
                });
            display.draw_iter(points)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{H2S, TEMPERATURE};
    use crate::framebuffer::FrameBuffer;
    use crate::history::Sample;
    use crate::ui::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
    use alloc::vec::Vec;
    use embedded_graphics::primitives::PointsIter;

    const WIDTH: usize = DISPLAY_WIDTH_PX as usize;

    fn full_screen_chart(config: &LoggerConfig) -> StripChart {
        let area = Rectangle::new(
            Point::zero(),
            Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32),
        );
        StripChart::from_config(config, area)
    }

    fn snapshot(fb: &FrameBuffer) -> Vec<Option<Rgb565>> {
        Rectangle::new(
            Point::zero(),
            Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32),
        )
        .points()
        .map(|p| fb.pixel(p))
        .collect()
    }

    fn purple() -> Rgb565 {
        rgb888_to_565([128, 0, 128])
    }

    #[test]
    fn geometry_matches_panel() {
        let chart = full_screen_chart(&LoggerConfig::default());
        assert_eq!(chart.baseline_y(), 120);
        assert_eq!(chart.quarter_ys(), [60, 180]);
        assert_eq!(chart.value_y(0.0, 0.0, 100.0), 239);
        assert_eq!(chart.value_y(100.0, 0.0, 100.0), 0);
        assert_eq!(chart.value_y(250.0, 0.0, 100.0), 0);
    }

    #[test]
    fn newest_sample_is_in_rightmost_column() {
        let config = LoggerConfig::default();
        let chart = full_screen_chart(&config);
        let mut history = RingHistory::<WIDTH>::new();
        let mut fb = FrameBuffer::new();

        history.append(Sample::new(1, [50.0, 20.0]));
        chart.redraw(&history, &mut fb).unwrap();

        let y = chart.value_y(50.0, 0.0, 100.0);
        assert_eq!(fb.pixel(Point::new(WIDTH as i32 - 1, y)), Some(purple()));
        // Zero-filled slots plot on the bottom row
        assert_eq!(fb.pixel(Point::new(0, 239)), Some(purple()));
    }

    #[test]
    fn gridlines_on_every_fourth_column() {
        let config = LoggerConfig::default();
        let chart = full_screen_chart(&config);
        let history = RingHistory::<WIDTH>::new();
        let mut fb = FrameBuffer::new();
        chart.redraw(&history, &mut fb).unwrap();

        for x in 0..8 {
            let expected = if x % 4 == 0 { COLOR_GRID } else { COLOR_BACKGROUND };
            assert_eq!(fb.pixel(Point::new(x, 60)), Some(expected));
            assert_eq!(fb.pixel(Point::new(x, 180)), Some(expected));
            assert_eq!(fb.pixel(Point::new(x, 120)), Some(COLOR_GRID));
        }
    }

    #[test]
    fn redraw_of_unchanged_history_is_idempotent() {
        let config = LoggerConfig::default();
        let chart = full_screen_chart(&config);
        let mut history = RingHistory::<WIDTH>::new();
        for t in 0..400u64 {
            history.append(Sample::new(t, [(t % 100) as f32, 25.0]));
        }

        let mut fb = FrameBuffer::new();
        chart.redraw(&history, &mut fb).unwrap();
        let first = snapshot(&fb);

        chart.redraw(&history, &mut fb).unwrap();
        assert!(first == snapshot(&fb));
    }

    #[test]
    fn stray_pixels_are_cleared() {
        let config = LoggerConfig::default();
        let chart = full_screen_chart(&config);
        let history = RingHistory::<WIDTH>::new();
        let mut fb = FrameBuffer::new();

        Pixel(Point::new(10, 10), Rgb565::WHITE).draw(&mut fb).unwrap();
        chart.redraw(&history, &mut fb).unwrap();
        assert_eq!(fb.pixel(Point::new(10, 10)), Some(COLOR_BACKGROUND));
    }

    #[test]
    fn nan_samples_leave_the_column_empty() {
        let config = LoggerConfig::default();
        let chart = full_screen_chart(&config);
        let mut history = RingHistory::<WIDTH>::new();
        let mut fb = FrameBuffer::new();

        history.append(Sample::unavailable(5));
        chart.redraw(&history, &mut fb).unwrap();

        let x = WIDTH as i32 - 1;
        for y in 0..DISPLAY_HEIGHT_PX as i32 {
            let expected = if y == 120 { COLOR_GRID } else { COLOR_BACKGROUND };
            assert_eq!(fb.pixel(Point::new(x, y)), Some(expected));
        }
    }

    #[test]
    fn untraced_channels_are_not_plotted() {
        let mut config = LoggerConfig::default();
        config.channels[H2S].trace = None;
        config.channels[TEMPERATURE].trace = Some([255, 255, 255]);
        let chart = full_screen_chart(&config);
        let mut history = RingHistory::<WIDTH>::new();
        let mut fb = FrameBuffer::new();

        history.append(Sample::new(0, [100.0, 25.0]));
        chart.redraw(&history, &mut fb).unwrap();

        let x = WIDTH as i32 - 1;
        assert_eq!(fb.pixel(Point::new(x, 0)), Some(COLOR_BACKGROUND));
        let y = chart.value_y(25.0, 0.0, 50.0);
        assert_eq!(fb.pixel(Point::new(x, y)), Some(Rgb565::WHITE));
    }
}
