//! Error types for S2MPS20 power meter operations
//!
//! This module defines the errors the engine and the attribute surface report.

use core::fmt;

/// Error types for power meter operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error; the meter is unavailable
    I2c(E),
    /// Attribute input is not a base-16 `u8`
    InvalidArgument,
    /// Regulator index outside both the BUCK and the LDO range
    InvalidRegulator(u8),
    /// No attribute with that name
    UnknownAttribute,
    /// Store on a read-only attribute
    ReadOnly,
    /// The meter is already locked by the caller
    Busy,
    /// Formatted attribute text does not fit the output buffer
    BufferOverflow,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2c(error)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "power meter unavailable: {:?}", e),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::InvalidRegulator(reg) => write!(f, "invalid adc regulator number ({:#x})", reg),
            Error::UnknownAttribute => f.write_str("unknown attribute"),
            Error::ReadOnly => f.write_str("attribute is read-only"),
            Error::Busy => f.write_str("power meter is busy"),
            Error::BufferOverflow => f.write_str("attribute buffer overflow"),
        }
    }
}
