//! Fixed-capacity sample history backing the strip chart.
//!
//! The history is a plain `[Sample; N]` array addressed by a wrapping write
//! cursor. It starts zero-filled and is always "full": before the first
//! wrap-around the unwritten slots read as [`Sample::default`].

use core::iter::FusedIterator;

use crate::config::CHANNEL_COUNT;

/// One reading of every channel, taken in a single poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// Clock reading when the sample was taken (milliseconds)
    pub timestamp_ms: u64,
    /// Channel values, indexed by the constants in [`crate::config`]
    pub values: [f32; CHANNEL_COUNT],
}

impl Sample {
    pub const fn new(timestamp_ms: u64, values: [f32; CHANNEL_COUNT]) -> Self {
        Self {
            timestamp_ms,
            values,
        }
    }

    /// Sample recorded when the sensor could not be read
    pub const fn unavailable(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            values: [f32::NAN; CHANNEL_COUNT],
        }
    }
}

/// Circular buffer of the last `N` samples.
///
/// `cursor` is the slot the next append will overwrite, which is also the
/// oldest sample held.
pub struct RingHistory<const N: usize> {
    slots: [Sample; N],
    cursor: usize,
}

impl<const N: usize> Default for RingHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingHistory<N> {
    /// Create a zero-filled history.
    pub const fn new() -> Self {
        assert!(N > 0, "RingHistory needs at least one slot");
        Self {
            slots: [Sample::new(0, [0.0; CHANNEL_COUNT]); N],
            cursor: 0,
        }
    }

    /// Overwrite the oldest slot with `sample` and advance the cursor.
    pub fn append(&mut self, sample: Sample) {
        self.slots[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % N;
    }

    /// Slot index the next append will write to
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Most recently appended sample (zero sample if nothing was appended yet)
    pub fn latest(&self) -> &Sample {
        &self.slots[(self.cursor + N - 1) % N]
    }

    /// All `N` samples ordered oldest to newest.
    pub fn window(&self) -> Window<'_, N> {
        Window {
            slots: &self.slots,
            start: self.cursor,
            offset: 0,
        }
    }
}

/// Chronological view over a [`RingHistory`], see [`RingHistory::window`].
#[derive(Clone)]
pub struct Window<'a, const N: usize> {
    slots: &'a [Sample; N],
    start: usize,
    offset: usize,
}

impl<'a, const N: usize> Iterator for Window<'a, N> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= N {
            return None;
        }
        let sample = &self.slots[(self.start + self.offset) % N];
        self.offset += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = N - self.offset;
        (remaining, Some(remaining))
    }
}

impl<const N: usize> ExactSizeIterator for Window<'_, N> {}

impl<const N: usize> FusedIterator for Window<'_, N> {}
