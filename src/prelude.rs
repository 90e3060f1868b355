//! Prelude

pub use crate::delay::MonotonicClock as _i2c_bitbang_hal_MonotonicClock;
pub use crate::delay::TimingSource as _i2c_bitbang_hal_TimingSource;
pub use crate::delay::{HalDelay, SpinDelay};
pub use crate::gpio::GpioLine as _i2c_bitbang_hal_GpioLine;
pub use crate::gpio::{Level, OpenDrainLine};
pub use crate::i2c::{Ack, Config, I2cBitbang, Rw};
pub use crate::transaction::{Error, Nack};
