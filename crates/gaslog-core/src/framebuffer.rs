//! RAM framebuffer with per-pixel change detection.
//!
//! The simulator draws every cycle into this buffer and flushes only the
//! bounding box of changed pixels to the window. Tests use it to inspect
//! rendered pixels and to check that a redraw changed nothing.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use log::debug;

use crate::ui::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

const WIDTH: usize = DISPLAY_WIDTH_PX as usize;
const HEIGHT: usize = DISPLAY_HEIGHT_PX as usize;

/// Inclusive bounding box of pixels changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// 320x240 `DrawTarget<Color = Rgb565>` held in RAM (150 KiB).
pub struct FrameBuffer {
    pixels: Vec<Rgb565>,
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a black framebuffer with nothing pending.
    pub fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; WIDTH * HEIGHT],
            dirty: None,
        }
    }

    /// Color at `point`, or `None` outside the buffer.
    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        let (x, y) = in_bounds(point)?;
        Some(self.pixels[y * WIDTH + x])
    }

    /// Whether any pixel changed since the last flush
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * WIDTH + x;
        if self.pixels[idx] == color {
            return;
        }
        self.pixels[idx] = color;
        match &mut self.dirty {
            Some(rect) => rect.expand(x, y),
            None => self.dirty = Some(DirtyRect::from_point(x, y)),
        }
    }

    /// Send the changed region to `display` in one `fill_contiguous` call and
    /// reset the change tracking. Does nothing if no pixel changed.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(rect) = self.dirty.take() else {
            return Ok(());
        };

        let width = rect.width();
        debug!(
            "Flushing {}x{} region at ({}, {})",
            width,
            rect.height(),
            rect.min_x,
            rect.min_y
        );

        let area = Rectangle::new(
            Point::new(rect.min_x as i32, rect.min_y as i32),
            Size::new(width as u32, rect.height() as u32),
        );

        let pixels = &self.pixels;
        let rows = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let start = y * WIDTH + rect.min_x;
            pixels[start..start + width].iter().copied()
        });

        display.fill_contiguous(&area, rows)
    }
}

fn in_bounds(point: Point) -> Option<(usize, usize)> {
    let x = usize::try_from(point.x).ok()?;
    let y = usize::try_from(point.y).ok()?;
    (x < WIDTH && y < HEIGHT).then_some((x, y))
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some((x, y)) = in_bounds(point) {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // Colors are consumed row-major over the whole area, including the
        // part that falls outside the buffer
        let points = area.points();
        for (point, color) in points.zip(colors) {
            if let Some((x, y)) = in_bounds(point) {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.bounding_box());
        let Some(bottom_right) = clipped.bottom_right() else {
            return Ok(());
        };

        for y in clipped.top_left.y..=bottom_right.y {
            for x in clipped.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }
}
