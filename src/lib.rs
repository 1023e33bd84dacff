#![cfg_attr(not(test), no_std)]
//! # S2MPS20 ADC Power Meter Driver
//!
//! This crate drives the ADC power meter built into the S2MPS20 Power
//! Management IC. Three meter channels can each be routed to any BUCK or LDO
//! regulator and report its current and power draw.
//!
//! - Synchronous and asynchronous (triggered) sampling
//! - Per-regulator current and power conversion
//! - Channel-to-regulator routing and sampling control
//! - A text attribute surface (`current_val_all`, `adc_reg_0`, ...) with
//!   scoped registration into a host attribute registry
//!
//! ## Example
//!
//! ```no_run
//! use s2mps20_powermeter::{AdcChannel, Error, MeterConfig, PowerMeter};
//! # use embedded_hal::{delay::DelayNs, i2c::I2c};
//! # fn example<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Result<(), Error<I::Error>> {
//! let mut meter = PowerMeter::new(i2c, delay, MeterConfig::default());
//! meter.init()?;
//!
//! // Meter LDO1 on channel 0
//! meter.set_channel_mapping(AdcChannel::Ch0, 0x41)?;
//!
//! for reading in meter.read_all()? {
//!     let _ = (reading.current_ua, reading.power_uw);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Shared access
//!
//! [`SharedPowerMeter`] serialises every operation behind one blocking mutex
//! and exposes the meter as named text attributes:
//!
//! ```no_run
//! # use s2mps20_powermeter::{MeterConfig, PowerMeter, SharedPowerMeter};
//! # use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! # use embedded_hal::{delay::DelayNs, i2c::I2c};
//! # fn example<I: I2c, D: DelayNs>(i2c: I, delay: D) {
//! let meter = SharedPowerMeter::<NoopRawMutex, _, _>::new(PowerMeter::new(
//!     i2c,
//!     delay,
//!     MeterConfig::default(),
//! ));
//! meter.store("adc_mode", "2").ok();
//! let _power = meter.show("power_val_all");
//! # }
//! ```

mod attributes;
mod config;
mod driver;
mod error;
mod registers;
mod shared;
mod types;

// Re-export main types
pub use attributes::{
    attribute_table, parse_hex_u8, register, AttrAccess, AttrBuf, Attribute, AttributeRegistry,
    Registration, ATTRIBUTE_COUNT, ATTR_BUF_LEN,
};
pub use config::MeterConfig;
pub use driver::PowerMeter;
pub use error::Error;
pub use registers::*;
pub use shared::SharedPowerMeter;
pub use types::*;
