//! I2C bus engine
//!
//! [`I2cBitbang`] generates the bus signalling bit by bit on two [`GpioLine`]s: start and stop
//! conditions, MSB-first byte shifting, acknowledgment sampling, and the receive path. Data
//! changes only while SCL is low; SDA edges while SCL is high are reserved for start (falling)
//! and stop (rising).
//!
//! Setup and hold intervals are fixed at 2 μs per clock half and 4 μs around start/stop, which
//! meets standard-mode (100 kHz) margins. They are not derived from a target bus frequency.
//!
//! The primitives are public so callers can compose their own sequences, e.g. a register read:
//!
//! ```ignore
//! bus.start();
//! bus.send_address(0x50, Rw::Read);
//! if bus.wait_ack() == Ack::Acked {
//!     let hi = bus.read_byte();
//!     let lo = bus.read_last_byte();
//!     bus.stop();
//! }
//! ```
//!
//! Higher level transactions live in [`crate::transaction`].

use crate::delay::TimingSource;
use crate::gpio::{GpioLine, Level};
use crate::util::BitsExt;

/// Settle time around start and stop conditions, in microseconds
pub const SETTLE_US: u32 = 4;
/// Duration of each clock half while shifting bits, in microseconds
pub const HALF_BIT_US: u32 = 2;
/// Default number of SDA samples before giving up on an acknowledgment
pub const DEFAULT_ACK_POLLS: u16 = 100;
/// Highest 7-bit slave address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Read/write bit appended to the 7-bit slave address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rw {
    /// Master writes to slave
    Write = 0,
    /// Master reads from slave
    Read = 1,
}

/// Outcome of waiting for the slave's acknowledgment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Slave pulled SDA low
    Acked,
    /// SDA stayed high for the whole poll budget. A stop condition has already been sent.
    Timeout,
}

/// Bus phase, as last left by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusPhase {
    /// No transaction in progress
    Idle,
    /// Start condition sent
    Start,
    /// Address frame shifted out
    Address,
    /// Data byte shifted out or in
    Data,
    /// Acknowledgment received, bus still held
    AckWait,
}

/// Engine configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    ack_polls: u16,
}

impl Config {
    /// Default configuration: acknowledgment given up after 100 samples
    pub const fn new() -> Self {
        Config {
            ack_polls: DEFAULT_ACK_POLLS,
        }
    }

    /// Number of consecutive high SDA samples after which [`I2cBitbang::wait_ack`] gives up.
    ///
    /// The bound counts loop iterations, not time: how long it lasts depends on how fast the
    /// line can be sampled. A value of 0 is treated as 1.
    pub const fn ack_poll_limit(self, polls: u16) -> Self {
        Config {
            ack_polls: if polls == 0 { 1 } else { polls },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// Bit-banged I2C master
pub struct I2cBitbang<SCL, SDA, T> {
    scl: SCL,
    sda: SDA,
    timing: T,
    config: Config,
    phase: BusPhase,
}

impl<SCL, SDA, T> I2cBitbang<SCL, SDA, T>
where
    SCL: GpioLine,
    SDA: GpioLine,
    T: TimingSource,
{
    /// Take ownership of the bus lines and timing source, with the default configuration.
    /// The lines are not touched until [`init`](Self::init).
    pub fn new(scl: SCL, sda: SDA, timing: T) -> Self {
        Self::with_config(scl, sda, timing, Config::new())
    }

    /// Same as [`new`](Self::new) with an explicit configuration
    pub fn with_config(scl: SCL, sda: SDA, timing: T, config: Config) -> Self {
        I2cBitbang {
            scl,
            sda,
            timing,
            config,
            phase: BusPhase::Idle,
        }
    }

    /// Release the lines and timing source
    pub fn free(self) -> (SCL, SDA, T) {
        (self.scl, self.sda, self.timing)
    }

    /// Current configuration
    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Phase the bus was left in by the last operation
    #[inline]
    pub fn phase(&self) -> BusPhase {
        self.phase
    }

    /// Put both lines in output mode and drive them low. Call once before the first transaction.
    pub fn init(&mut self) {
        self.scl.set_output();
        self.sda.set_output();
        self.scl.write(Level::Low);
        self.sda.write(Level::Low);
        self.phase = BusPhase::Idle;
    }

    /// Start condition: SDA falls while SCL is high, then SCL is pulled low for the first bit.
    pub fn start(&mut self) {
        self.sda.set_output();
        self.scl.write(Level::High);
        self.sda.write(Level::High);
        self.timing.delay_us(SETTLE_US);

        self.sda.write(Level::Low);
        self.timing.delay_us(SETTLE_US);

        self.scl.write(Level::Low);
        self.phase = BusPhase::Start;
    }

    /// Shift out the address frame `(addr << 1) | rw`. `addr` is a 7-bit address; the top bit is
    /// discarded here. The transaction methods reject such addresses before touching the bus.
    pub fn send_address(&mut self, addr: u8, rw: Rw) {
        let frame = (addr << 1) | rw as u8;
        trace!("address frame {:#x}", frame);
        self.shift_out(frame);
        self.phase = BusPhase::Address;
    }

    /// Shift out one data byte MSB first, then release SDA for the acknowledgment bit.
    pub fn send_byte(&mut self, data: u8) {
        trace!("data byte {:#x}", data);
        self.shift_out(data);
        self.phase = BusPhase::Data;
    }

    fn shift_out(&mut self, byte: u8) {
        self.sda.set_output();
        self.scl.write(Level::Low);

        for shift in (0..8).rev() {
            self.sda.write(Level::from_bit(byte.check(shift)));
            self.timing.delay_us(HALF_BIT_US);
            self.scl.write(Level::High);
            self.timing.delay_us(HALF_BIT_US);
            self.scl.write(Level::Low);
        }

        self.sda.write(Level::High);
    }

    /// Clock the acknowledgment bit and wait for the slave to pull SDA low.
    ///
    /// SDA is sampled at most [`Config::ack_poll_limit`] times with no delay between samples.
    /// If it never goes low the engine sends a stop condition itself, leaving the bus idle, and
    /// returns [`Ack::Timeout`].
    pub fn wait_ack(&mut self) -> Ack {
        self.scl.write(Level::High);
        self.timing.delay_us(HALF_BIT_US);
        self.sda.write(Level::High);
        self.timing.delay_us(HALF_BIT_US);
        self.sda.set_input();

        for _ in 0..self.config.ack_polls {
            if self.sda.read().is_low() {
                self.scl.write(Level::Low);
                self.phase = BusPhase::AckWait;
                return Ack::Acked;
            }
        }

        debug!(
            "no acknowledgment after {} samples, releasing bus",
            self.config.ack_polls
        );
        self.stop();
        Ack::Timeout
    }

    /// Master acknowledgment: hold SDA low for one clock pulse.
    pub fn ack(&mut self) {
        self.ack_bit(Level::Low);
    }

    /// Master non-acknowledgment: leave SDA high for one clock pulse, telling the slave that no
    /// more bytes are wanted.
    pub fn nack(&mut self) {
        self.ack_bit(Level::High);
    }

    fn ack_bit(&mut self, level: Level) {
        self.scl.write(Level::Low);
        self.sda.set_output();
        self.sda.write(level);
        self.timing.delay_us(HALF_BIT_US);
        self.scl.write(Level::High);
        self.timing.delay_us(HALF_BIT_US);
        self.scl.write(Level::Low);
    }

    /// Clock in one byte MSB first and acknowledge it.
    pub fn read_byte(&mut self) -> u8 {
        let byte = self.shift_in();
        self.ack();
        byte
    }

    /// Clock in the final byte of a read and answer with a non-acknowledgment, so the slave
    /// releases SDA for the stop condition.
    pub fn read_last_byte(&mut self) -> u8 {
        let byte = self.shift_in();
        self.nack();
        byte
    }

    fn shift_in(&mut self) -> u8 {
        let mut byte = 0u8;
        self.sda.set_input();

        for shift in (0..8).rev() {
            self.scl.write(Level::Low);
            self.timing.delay_us(HALF_BIT_US);
            self.scl.write(Level::High);
            self.timing.delay_us(HALF_BIT_US);

            if self.sda.read().is_high() {
                byte = byte.set(shift);
            }
        }

        trace!("received {:#x}", byte);
        self.phase = BusPhase::Data;
        byte
    }

    /// Stop condition: SDA rises while SCL is high. Leaves both lines high with SDA driven, which
    /// is the idle bus state. Valid from any phase.
    pub fn stop(&mut self) {
        self.sda.set_output();
        self.scl.write(Level::Low);
        self.sda.write(Level::Low);
        self.timing.delay_us(SETTLE_US);

        self.scl.write(Level::High);
        self.timing.delay_us(HALF_BIT_US);

        self.sda.write(Level::High);
        self.timing.delay_us(SETTLE_US);
        self.phase = BusPhase::Idle;
    }
}
