//! Start/stop button input.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::time::Clock;

/// Time a raw level must hold before it is accepted (milliseconds)
pub const DEBOUNCE_MS: u64 = 50;

/// A momentary button polled by the control loop.
pub trait ToggleButton {
    /// Returns `true` once per press. Calling it again without a new press
    /// returns `false`.
    fn was_clicked(&mut self) -> bool;
}

impl<B: ToggleButton + ?Sized> ToggleButton for &mut B {
    fn was_clicked(&mut self) -> bool {
        (**self).was_clicked()
    }
}

/// GPIO button with time-based debouncing. Reports a click on the debounced
/// press edge; releases are swallowed.
pub struct DebouncedButton<P, C> {
    pin: P,
    clock: C,
    active_low: bool,
    stable_pressed: bool,
    raw_pressed: bool,
    raw_since_ms: u64,
}

impl<P, C> DebouncedButton<P, C>
where
    P: InputPin,
    C: Clock,
{
    /// Button that reads high when pressed
    pub fn active_high(pin: P, clock: C) -> Self {
        Self::new(pin, clock, false)
    }

    /// Button that pulls the line low when pressed (M5Stack front buttons)
    pub fn active_low(pin: P, clock: C) -> Self {
        Self::new(pin, clock, true)
    }

    fn new(pin: P, clock: C, active_low: bool) -> Self {
        let now = clock.now_ms();
        Self {
            pin,
            clock,
            active_low,
            stable_pressed: false,
            raw_pressed: false,
            raw_since_ms: now,
        }
    }

    fn sample(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.active_low,
            Err(e) => {
                warn!("Button read failed: {:?}", e);
                false
            }
        }
    }
}

impl<P, C> ToggleButton for DebouncedButton<P, C>
where
    P: InputPin,
    C: Clock,
{
    fn was_clicked(&mut self) -> bool {
        let now = self.clock.now_ms();
        let pressed = self.sample();

        if pressed != self.raw_pressed {
            self.raw_pressed = pressed;
            self.raw_since_ms = now;
            return false;
        }

        if pressed == self.stable_pressed || now.saturating_sub(self.raw_since_ms) < DEBOUNCE_MS {
            return false;
        }

        self.stable_pressed = pressed;
        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClock;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    struct FakePin<'a> {
        high: &'a Cell<bool>,
    }

    impl ErrorType for FakePin<'_> {
        type Error = Infallible;
    }

    impl InputPin for FakePin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.high.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.high.get())
        }
    }

    /// Poll every 10ms for `ms` milliseconds and count clicks.
    fn poll_for<P: InputPin>(button: &mut DebouncedButton<P, FakeClock>, clock: &FakeClock, ms: u64) -> u32 {
        let mut clicks = 0;
        for _ in 0..ms / 10 {
            if button.was_clicked() {
                clicks += 1;
            }
            clock.advance_ms(10);
        }
        clicks
    }

    #[test]
    fn held_press_clicks_once() {
        let clock = FakeClock::new();
        let level = Cell::new(true);
        let mut button = DebouncedButton::active_low(FakePin { high: &level }, clock.clone());

        assert_eq!(poll_for(&mut button, &clock, 100), 0);
        level.set(false);
        assert_eq!(poll_for(&mut button, &clock, 500), 1);
        level.set(true);
        assert_eq!(poll_for(&mut button, &clock, 200), 0);
    }

    #[test]
    fn short_glitch_is_ignored() {
        let clock = FakeClock::new();
        let level = Cell::new(false);
        let mut button = DebouncedButton::active_high(FakePin { high: &level }, clock.clone());

        level.set(true);
        assert_eq!(poll_for(&mut button, &clock, 30), 0);
        level.set(false);
        assert_eq!(poll_for(&mut button, &clock, 200), 0);
    }

    #[test]
    fn two_presses_click_twice() {
        let clock = FakeClock::new();
        let level = Cell::new(false);
        let mut button = DebouncedButton::active_high(FakePin { high: &level }, clock.clone());

        let mut clicks = 0;
        for _ in 0..2 {
            level.set(true);
            clicks += poll_for(&mut button, &clock, 100);
            level.set(false);
            clicks += poll_for(&mut button, &clock, 100);
        }
        assert_eq!(clicks, 2);
    }
}
