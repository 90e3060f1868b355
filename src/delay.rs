//! Busy-wait microsecond delays pacing the bus.
//!
//! Bit timing on the bus is a few microseconds wide, so every delay here spins on the CPU. None of
//! these sources sleep, yield, or depend on interrupts.

use embedded_hal::delay::DelayNs;

/// Blocking microsecond delay
pub trait TimingSource {
    /// Spin for at least `us` microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: TimingSource + ?Sized> TimingSource for &mut T {
    #[inline(always)]
    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Free-running microsecond counter
///
/// Counters narrower than 64 bits set [`WRAP_MASK`](Self::WRAP_MASK) to their width, e.g.
/// `u32::MAX as u64` for a 32-bit timer, so elapsed time is computed modulo the counter period.
/// A single delay must be shorter than that period.
pub trait MonotonicClock {
    /// All-ones mask of the counter width. The counter wraps from this value back to 0.
    const WRAP_MASK: u64 = u64::MAX;

    /// Current counter value in microseconds, at most [`WRAP_MASK`](Self::WRAP_MASK)
    fn now_us(&self) -> u64;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    const WRAP_MASK: u64 = C::WRAP_MASK;

    #[inline(always)]
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Delay provider that reads a [`MonotonicClock`] on entry and polls it until the requested time
/// has elapsed
pub struct SpinDelay<C> {
    clock: C,
}

impl<C: MonotonicClock> SpinDelay<C> {
    /// Create a delay provider over `clock`
    pub fn new(clock: C) -> Self {
        SpinDelay { clock }
    }

    /// Return the wrapped clock
    #[inline]
    pub fn free(self) -> C {
        self.clock
    }
}

impl<C: MonotonicClock> TimingSource for SpinDelay<C> {
    fn delay_us(&mut self, us: u32) {
        let start = self.clock.now_us();
        while (self.clock.now_us().wrapping_sub(start) & C::WRAP_MASK) < u64::from(us) {
            core::hint::spin_loop();
        }
    }
}

/// Adapts an `embedded-hal` [`DelayNs`] provider.
///
/// The provider must busy-wait (cycle-counter or timer-polling delays do). One that suspends the
/// caller breaks bus timing.
pub struct HalDelay<D> {
    delay: D,
}

impl<D: DelayNs> HalDelay<D> {
    /// Wrap `delay`
    pub fn new(delay: D) -> Self {
        HalDelay { delay }
    }

    /// Return the wrapped delay provider
    #[inline]
    pub fn free(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> TimingSource for HalDelay<D> {
    #[inline]
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

#[cfg(feature = "embedded-hal-02")]
pub use ehal02::HalDelay02;

#[cfg(feature = "embedded-hal-02")]
mod ehal02 {
    use super::TimingSource;
    use embedded_hal_02::blocking::delay::DelayUs;

    /// Adapts an `embedded-hal` 0.2 [`DelayUs`] provider. Same caveats as
    /// [`HalDelay`](super::HalDelay).
    pub struct HalDelay02<D> {
        delay: D,
    }

    impl<D: DelayUs<u32>> HalDelay02<D> {
        /// Wrap `delay`
        pub fn new(delay: D) -> Self {
            HalDelay02 { delay }
        }

        /// Return the wrapped delay provider
        #[inline]
        pub fn free(self) -> D {
            self.delay
        }
    }

    impl<D: DelayUs<u32>> TimingSource for HalDelay02<D> {
        #[inline]
        fn delay_us(&mut self, us: u32) {
            self.delay.delay_us(us);
        }
    }
}

#[cfg(any(test, feature = "std"))]
pub use host::StdClock;

#[cfg(any(test, feature = "std"))]
mod host {
    use super::MonotonicClock;
    use std::time::Instant;

    /// [`MonotonicClock`] over [`std::time::Instant`], counting from construction
    #[derive(Clone, Copy, Debug)]
    pub struct StdClock {
        origin: Instant,
    }

    impl StdClock {
        /// Start counting from now
        pub fn new() -> Self {
            StdClock {
                origin: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MonotonicClock for StdClock {
        fn now_us(&self) -> u64 {
            self.origin.elapsed().as_micros() as u64
        }
    }
}
