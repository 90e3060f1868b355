//! GPIO lines used as the I2C clock and data wires.
//!
//! The engine only needs four things from a pin: switch to driven output, switch to
//! high-impedance input, drive a level, and sample a level. [`GpioLine`] captures exactly that.
//! Implement it directly for register-level pin access, or wrap an `embedded-hal` pin in
//! [`OpenDrainLine`].
//!
//! Line operations cannot fail. Pins with a fallible error type are not accepted by the adapters.

use crate::util::infallible;
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

/// Logic level of a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Pulled to ground
    Low,
    /// Released or driven to VCC
    High,
}

impl Level {
    /// Level for one bit of a byte
    #[inline(always)]
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Whether the level is [`Level::High`]
    #[inline(always)]
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// Whether the level is [`Level::Low`]
    #[inline(always)]
    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

impl From<bool> for Level {
    #[inline(always)]
    fn from(b: bool) -> Level {
        Level::from_bit(b)
    }
}

impl From<Level> for bool {
    #[inline(always)]
    fn from(l: Level) -> bool {
        l.is_high()
    }
}

impl From<PinState> for Level {
    fn from(s: PinState) -> Level {
        match s {
            PinState::Low => Level::Low,
            PinState::High => Level::High,
        }
    }
}

impl From<Level> for PinState {
    fn from(l: Level) -> PinState {
        match l {
            Level::Low => PinState::Low,
            Level::High => PinState::High,
        }
    }
}

/// Pin direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Pin drives the line
    Output,
    /// Pin is high-impedance and senses the line
    Input,
}

/// One physical bus wire.
///
/// Every call changes the electrical state of the wire immediately and has no built-in delay.
pub trait GpioLine {
    /// Configure the pin to drive the line. Subsequent writes assert a level.
    fn set_output(&mut self);

    /// Configure the pin for high-impedance sensing. Writes made in this mode are not driven.
    fn set_input(&mut self);

    /// Drive the line to `level` if in output mode.
    fn write(&mut self, level: Level);

    /// Sample the line. Only meaningful in input mode.
    fn read(&mut self) -> Level;
}

impl<L: GpioLine + ?Sized> GpioLine for &mut L {
    #[inline(always)]
    fn set_output(&mut self) {
        (**self).set_output()
    }

    #[inline(always)]
    fn set_input(&mut self) {
        (**self).set_input()
    }

    #[inline(always)]
    fn write(&mut self, level: Level) {
        (**self).write(level)
    }

    #[inline(always)]
    fn read(&mut self) -> Level {
        (**self).read()
    }
}

/// [`GpioLine`] over an `embedded-hal` pin configured as open-drain output with input buffer
/// enabled.
///
/// Input mode is emulated by releasing the line (writing high), which leaves an open-drain
/// driver high-impedance so the pull-up and the slave set the level. Switching back to output
/// re-applies the last written level.
pub struct OpenDrainLine<P> {
    pin: P,
    dir: Direction,
    level: Level,
}

impl<P> OpenDrainLine<P>
where
    P: InputPin + OutputPin + ErrorType<Error = Infallible>,
{
    /// Wrap `pin`. The line starts released, in input mode.
    pub fn new(mut pin: P) -> Self {
        infallible(pin.set_high());
        OpenDrainLine {
            pin,
            dir: Direction::Input,
            level: Level::High,
        }
    }

    /// Current direction
    #[inline]
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Return the wrapped pin
    #[inline]
    pub fn free(self) -> P {
        self.pin
    }

    #[inline(always)]
    fn drive(&mut self, level: Level) {
        infallible(self.pin.set_state(level.into()));
    }
}

impl<P> GpioLine for OpenDrainLine<P>
where
    P: InputPin + OutputPin + ErrorType<Error = Infallible>,
{
    #[inline]
    fn set_output(&mut self) {
        self.dir = Direction::Output;
        let level = self.level;
        self.drive(level);
    }

    #[inline]
    fn set_input(&mut self) {
        self.dir = Direction::Input;
        self.drive(Level::High);
    }

    #[inline]
    fn write(&mut self, level: Level) {
        self.level = level;
        if self.dir == Direction::Output {
            self.drive(level);
        }
    }

    #[inline]
    fn read(&mut self) -> Level {
        Level::from_bit(infallible(self.pin.is_high()))
    }
}

#[cfg(feature = "embedded-hal-02")]
pub use ehal02::OpenDrainLine02;

#[cfg(feature = "embedded-hal-02")]
mod ehal02 {
    use super::*;
    use embedded_hal_02::digital::v2::{InputPin, OutputPin};

    /// [`GpioLine`] over an `embedded-hal` 0.2 open-drain pin. Same semantics as
    /// [`OpenDrainLine`].
    pub struct OpenDrainLine02<P> {
        pin: P,
        dir: Direction,
        level: Level,
    }

    impl<P> OpenDrainLine02<P>
    where
        P: InputPin<Error = Infallible> + OutputPin<Error = Infallible>,
    {
        /// Wrap `pin`. The line starts released, in input mode.
        pub fn new(mut pin: P) -> Self {
            infallible(pin.set_high());
            OpenDrainLine02 {
                pin,
                dir: Direction::Input,
                level: Level::High,
            }
        }

        /// Return the wrapped pin
        #[inline]
        pub fn free(self) -> P {
            self.pin
        }

        #[inline(always)]
        fn drive(&mut self, level: Level) {
            match level {
                Level::Low => infallible(self.pin.set_low()),
                Level::High => infallible(self.pin.set_high()),
            }
        }
    }

    impl<P> GpioLine for OpenDrainLine02<P>
    where
        P: InputPin<Error = Infallible> + OutputPin<Error = Infallible>,
    {
        fn set_output(&mut self) {
            self.dir = Direction::Output;
            let level = self.level;
            self.drive(level);
        }

        fn set_input(&mut self) {
            self.dir = Direction::Input;
            self.drive(Level::High);
        }

        fn write(&mut self, level: Level) {
            self.level = level;
            if self.dir == Direction::Output {
                self.drive(level);
            }
        }

        fn read(&mut self) -> Level {
            Level::from_bit(infallible(self.pin.is_high()))
        }
    }
}
