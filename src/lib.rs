//! Bit-banged single-master I2C transmitter for [`embedded_hal`] targets.
//!
//! The crate drives the I2C clock (SCL) and data (SDA) lines directly through two GPIO lines and
//! a busy-wait microsecond delay. It is meant for controllers with no hardware I2C block on the
//! chosen pins, or where full control over the bus timing is needed.
//!
//! [`embedded_hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! # Usage
//!
//! Hand two open-drain pins and a timing source to [`i2c::I2cBitbang::new`], call
//! [`init`](i2c::I2cBitbang::init) once, then issue transactions:
//!
//! ```ignore
//! use i2c_bitbang_hal::prelude::*;
//!
//! let scl = OpenDrainLine::new(scl_pin);
//! let sda = OpenDrainLine::new(sda_pin);
//! let mut bus = I2cBitbang::new(scl, sda, SpinDelay::new(cycle_clock));
//! bus.init();
//!
//! match bus.write_transaction(0x50, &[0x00, 0x10, 0xAA]) {
//!     Ok(()) => {}
//!     Err(Error::NoAcknowledge(Nack::Address)) => { /* nothing at 0x50 */ }
//!     Err(e) => { /* ... */ }
//! }
//! ```
//!
//! Every operation blocks the caller for its whole duration. Delays spin on a monotonic counter
//! and never yield, since the bus timing tolerances are a few microseconds.
//!
//! # Features
//!
//! * `std`: [`delay::StdClock`], a monotonic clock over `std::time::Instant`.
//! * `embedded-hal-02`: adapters and trait implementations for `embedded-hal` 0.2.
//! * `defmt` / `log`: diagnostics through the selected logging backend.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]

// Must come first so the macros are visible to the other modules
mod fmt;

pub mod delay;
pub mod gpio;
pub mod i2c;
pub mod prelude;
pub mod transaction;

mod util;

#[cfg(test)]
mod sim;
