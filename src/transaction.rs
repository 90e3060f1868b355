//! Complete bus transactions built on the [`I2cBitbang`] primitives.
//!
//! Failure handling is fail-fast: the first byte the slave does not acknowledge aborts the whole
//! transaction. By the time an error is returned the engine has already sent a stop condition,
//! so the bus is idle and the caller may simply retry.

use crate::delay::TimingSource;
use crate::gpio::GpioLine;
use crate::i2c::{Ack, I2cBitbang, Rw, MAX_ADDRESS};
use core::fmt;

/// Where a transaction stopped being acknowledged
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Nack {
    /// The address frame
    Address,
    /// The data byte at this index of the payload
    Data(usize),
}

/// I2C transaction errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Slave did not pull SDA low within the poll budget. The bus has been stopped.
    NoAcknowledge(Nack),
    /// An `embedded-hal` transaction mixed reads and writes, which needs a repeated start. Nothing
    /// was sent.
    MixedTransaction,
    /// Address does not fit in 7 bits. Nothing was sent.
    InvalidAddress(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoAcknowledge(Nack::Address) => f.write_str("address not acknowledged"),
            Error::NoAcknowledge(Nack::Data(i)) => write!(f, "data byte {} not acknowledged", i),
            Error::MixedTransaction => f.write_str("mixed read/write transactions are unsupported"),
            Error::InvalidAddress(a) => write!(f, "address {:#x} is not a 7-bit address", a),
        }
    }
}

impl<SCL, SDA, T> I2cBitbang<SCL, SDA, T>
where
    SCL: GpioLine,
    SDA: GpioLine,
    T: TimingSource,
{
    /// Write `payload` to the slave at 7-bit `address`.
    ///
    /// Sends start, the address with the write bit, then each byte, checking the acknowledgment
    /// after every frame, and finally stop. An empty payload only addresses the device.
    pub fn write_transaction(&mut self, address: u8, payload: &[u8]) -> Result<(), Error> {
        self.write_stream(address, payload.iter().copied())
    }

    fn write_stream<I>(&mut self, address: u8, payload: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = u8>,
    {
        check_address(address)?;
        self.start();
        self.send_address(address, Rw::Write);
        if self.wait_ack() == Ack::Timeout {
            warn!("{:#x}: address not acknowledged, transaction aborted", address);
            return Err(Error::NoAcknowledge(Nack::Address));
        }

        for (i, byte) in payload.into_iter().enumerate() {
            self.send_byte(byte);
            if self.wait_ack() == Ack::Timeout {
                warn!("{:#x}: byte {} not acknowledged, transaction aborted", address, i);
                return Err(Error::NoAcknowledge(Nack::Data(i)));
            }
        }

        self.stop();
        Ok(())
    }

    /// Fill `buffer` from the slave at 7-bit `address`.
    ///
    /// Every byte but the last is acknowledged; the last gets a non-acknowledgment so the slave
    /// lets go of SDA before the stop condition. An empty buffer returns immediately.
    pub fn read_transaction(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
        let len = buffer.len();
        self.read_stream(address, len, core::iter::once(buffer))
    }

    fn read_stream<'b, I>(&mut self, address: u8, len: usize, buffers: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'b mut [u8]>,
    {
        check_address(address)?;
        if len == 0 {
            return Ok(());
        }

        self.start();
        self.send_address(address, Rw::Read);
        if self.wait_ack() == Ack::Timeout {
            warn!("{:#x}: address not acknowledged, transaction aborted", address);
            return Err(Error::NoAcknowledge(Nack::Address));
        }

        let mut remaining = len;
        for buffer in buffers {
            for slot in buffer.iter_mut() {
                remaining -= 1;
                *slot = if remaining == 0 {
                    self.read_last_byte()
                } else {
                    self.read_byte()
                };
            }
        }

        self.stop();
        Ok(())
    }

    /// Whether a device acknowledges 7-bit `address`
    pub fn probe(&mut self, address: u8) -> bool {
        self.write_transaction(address, &[]).is_ok()
    }
}

fn check_address(address: u8) -> Result<(), Error> {
    if address > MAX_ADDRESS {
        warn!("{:#x} is not a 7-bit address", address);
        return Err(Error::InvalidAddress(address));
    }
    Ok(())
}

mod ehal1 {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

    impl embedded_hal::i2c::Error for Error {
        fn kind(&self) -> ErrorKind {
            match self {
                Error::NoAcknowledge(Nack::Address) => {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
                }
                Error::NoAcknowledge(Nack::Data(_)) => {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
                }
                Error::MixedTransaction | Error::InvalidAddress(_) => ErrorKind::Other,
            }
        }
    }

    impl<SCL, SDA, T> ErrorType for I2cBitbang<SCL, SDA, T> {
        type Error = Error;
    }

    impl<SCL, SDA, T> I2c<SevenBitAddress> for I2cBitbang<SCL, SDA, T>
    where
        SCL: GpioLine,
        SDA: GpioLine,
        T: TimingSource,
    {
        /// Runs all operations under a single start/stop pair. Consecutive writes are sent as one
        /// stream and consecutive reads fill the buffers in order. Mixing reads and writes would
        /// need a repeated start and returns [`Error::MixedTransaction`] without touching the
        /// bus.
        fn transaction(
            &mut self,
            address: SevenBitAddress,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            let reads = operations
                .iter()
                .filter(|op| matches!(op, Operation::Read(_)))
                .count();

            if operations.is_empty() {
                Ok(())
            } else if reads == 0 {
                let bytes = operations.iter().flat_map(|op| match op {
                    Operation::Write(bytes) => bytes.iter().copied(),
                    Operation::Read(_) => [].iter().copied(),
                });
                self.write_stream(address, bytes)
            } else if reads == operations.len() {
                let len = operations
                    .iter()
                    .map(|op| match op {
                        Operation::Read(buf) => buf.len(),
                        Operation::Write(_) => 0,
                    })
                    .sum();
                let buffers = operations.iter_mut().filter_map(|op| match op {
                    Operation::Read(buf) => Some(&mut **buf),
                    Operation::Write(_) => None,
                });
                self.read_stream(address, len, buffers)
            } else {
                Err(Error::MixedTransaction)
            }
        }
    }
}

#[cfg(feature = "embedded-hal-02")]
mod ehal02 {
    use super::*;
    use embedded_hal_02::blocking::i2c::{Read, Write};

    impl<SCL, SDA, T> Write for I2cBitbang<SCL, SDA, T>
    where
        SCL: GpioLine,
        SDA: GpioLine,
        T: TimingSource,
    {
        type Error = Error;

        #[inline]
        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
            self.write_transaction(address, bytes)
        }
    }

    impl<SCL, SDA, T> Read for I2cBitbang<SCL, SDA, T>
    where
        SCL: GpioLine,
        SDA: GpioLine,
        T: TimingSource,
    {
        type Error = Error;

        #[inline]
        fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
            self.read_transaction(address, buffer)
        }
    }
}
