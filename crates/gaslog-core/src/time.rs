//! Monotonic time source used for sample timestamps and debouncing.

/// Millisecond clock.
///
/// Only differences between readings are meaningful; the epoch is whatever the
/// platform counts from (boot on the device, process start in the simulator).
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
