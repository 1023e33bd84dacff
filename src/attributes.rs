//! Text attribute surface for the power meter
//!
//! Each attribute is a named get/set endpoint over the meter: `show` formats a
//! line of text, `store` parses a base-16 byte and applies it. The table is
//! plain data; [`register`] creates the attributes in an
//! [`AttributeRegistry`] and hands back a [`Registration`] guard that removes
//! them again, in reverse order, when dropped.

use core::fmt::{self, Write};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c};
use heapless::String;

use crate::driver::PowerMeter;
use crate::error::Error;
use crate::types::{AdcChannel, MeterMode, SyncMode};

/// Capacity of a formatted attribute value
pub const ATTR_BUF_LEN: usize = 256;

/// Number of attributes the power meter exposes
pub const ATTRIBUTE_COUNT: usize = 12;

/// Formatted attribute value
pub type AttrBuf = String<ATTR_BUF_LEN>;

type ShowFn<I, D> =
    fn(&mut PowerMeter<I, D>, &mut AttrBuf) -> Result<(), Error<<I as ErrorType>::Error>>;
type StoreFn<I, D> = fn(&mut PowerMeter<I, D>, u8) -> Result<(), Error<<I as ErrorType>::Error>>;

/// Attribute permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttrAccess {
    ReadOnly,
    ReadWrite,
}

impl AttrAccess {
    /// Unix permission bits
    pub fn mode(self) -> u16 {
        match self {
            AttrAccess::ReadOnly => 0o444,
            AttrAccess::ReadWrite => 0o644,
        }
    }
}

/// A named get/set endpoint over the meter
pub struct Attribute<I: ErrorType, D> {
    pub name: &'static str,
    pub access: AttrAccess,
    show: ShowFn<I, D>,
    store: Option<StoreFn<I, D>>,
}

impl<I: ErrorType, D> Clone for Attribute<I, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: ErrorType, D> Copy for Attribute<I, D> {}

impl<I, D> Attribute<I, D>
where
    I: I2c,
    D: DelayNs,
{
    fn read_only(name: &'static str, show: ShowFn<I, D>) -> Self {
        Self {
            name,
            access: AttrAccess::ReadOnly,
            show,
            store: None,
        }
    }

    fn read_write(name: &'static str, show: ShowFn<I, D>, store: StoreFn<I, D>) -> Self {
        Self {
            name,
            access: AttrAccess::ReadWrite,
            show,
            store: Some(store),
        }
    }

    /// Format the attribute's current value
    pub fn show(&self, meter: &mut PowerMeter<I, D>) -> Result<AttrBuf, Error<I::Error>> {
        let mut out = AttrBuf::new();
        (self.show)(meter, &mut out)?;
        Ok(out)
    }

    /// Parse `input` as a base-16 byte and apply it
    ///
    /// Malformed input and out-of-range regulator indices are both reported
    /// as `Error::InvalidArgument`; nothing is changed in either case.
    pub fn store(&self, meter: &mut PowerMeter<I, D>, input: &str) -> Result<(), Error<I::Error>> {
        let store = self.store.ok_or(Error::ReadOnly)?;
        let value = parse_hex_u8(input).ok_or(Error::InvalidArgument)?;
        store(meter, value).map_err(|e| match e {
            Error::InvalidRegulator(_) => Error::InvalidArgument,
            other => other,
        })
    }
}

/// The power meter's attributes, in registration order
pub fn attribute_table<I, D>() -> [Attribute<I, D>; ATTRIBUTE_COUNT]
where
    I: I2c,
    D: DelayNs,
{
    use AdcChannel::*;

    [
        Attribute::read_write("adc_en", show_adc_en, |m, v| m.set_enable(v).map(drop)),
        Attribute::read_write("adc_mode", show_mode, |m, v| {
            m.set_mode(v);
            Ok(())
        }),
        Attribute::read_write("adc_sync_mode", show_sync_mode, |m, v| {
            m.set_sync_mode(v);
            Ok(())
        }),
        Attribute::read_only("power_val_all", show_power_all),
        Attribute::read_only("current_val_all", show_current_all),
        Attribute::read_only("adc_val_0", |m, out| show_channel(m, Ch0, out)),
        Attribute::read_only("adc_val_1", |m, out| show_channel(m, Ch1, out)),
        Attribute::read_only("adc_val_2", |m, out| show_channel(m, Ch2, out)),
        Attribute::read_write(
            "adc_reg_0",
            |m, out| show_regulator(m, Ch0, out),
            |m, v| m.set_channel_mapping(Ch0, v),
        ),
        Attribute::read_write(
            "adc_reg_1",
            |m, out| show_regulator(m, Ch1, out),
            |m, v| m.set_channel_mapping(Ch1, v),
        ),
        Attribute::read_write(
            "adc_reg_2",
            |m, out| show_regulator(m, Ch2, out),
            |m, v| m.set_channel_mapping(Ch2, v),
        ),
        Attribute::read_write("adc_ctrl1", show_ctrl1, |m, v| m.set_sampling_control(v)),
    ]
}

/// Parse a base-16 `u8` the way attribute stores accept it
///
/// Accepts one trailing newline, a leading `+` and a `0x`/`0X` prefix.
pub fn parse_hex_u8(input: &str) -> Option<u8> {
    let s = input.strip_suffix('\n').unwrap_or(input);
    let s = s.strip_prefix('+').unwrap_or(s);
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(s, 16).ok()
}

fn emit<E>(out: &mut AttrBuf, args: fmt::Arguments<'_>) -> Result<(), Error<E>> {
    out.write_fmt(args).map_err(|_| Error::BufferOverflow)
}

fn show_adc_en<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    let (enabled, ctrl3) = meter.adc_control()?;
    let state = if enabled { "enable" } else { "disable" };
    emit(out, format_args!("ADC {} ({:x})\n", state, ctrl3))
}

fn show_mode<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    let mode = meter.mode();
    let name = match mode {
        MeterMode::Current => "CURRENT MODE",
        MeterMode::Power => "POWER MODE",
    };
    emit(out, format_args!("{} ({})\n", name, mode as u8))
}

fn show_sync_mode<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    let sync_mode = meter.sync_mode();
    let name = match sync_mode {
        SyncMode::Sync => "SYNC_MODE",
        SyncMode::Async => "ASYNC_MODE",
    };
    emit(out, format_args!("{} ({})\n", name, sync_mode as u8))
}

fn show_current_all<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    let readings = meter.read_all()?;
    for (i, r) in readings.iter().enumerate() {
        let sep = if i == 0 { "" } else { ", " };
        emit(
            out,
            format_args!("{}CH{}[{:x}]:{} uA ({})", sep, i, r.regulator, r.current_ua, r.raw_current),
        )?;
    }
    emit(out, format_args!("\n"))
}

fn show_power_all<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    let readings = meter.read_all()?;
    for (i, r) in readings.iter().enumerate() {
        let sep = if i == 0 { "" } else { ", " };
        emit(
            out,
            format_args!("{}CH{}[{:x}]:{} uW ({})", sep, i, r.regulator, r.power_uw, r.raw_power),
        )?;
    }
    emit(out, format_args!("\n"))
}

fn show_channel<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    ch: AdcChannel,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    let r = meter.read_channel(ch)?;
    emit(
        out,
        format_args!(
            "[CH{}] {}(0x{:x})uA, {}(0x{:x}) uW\n",
            ch.index(),
            r.current_ua,
            r.raw_current,
            r.power_uw,
            r.raw_power
        ),
    )
}

fn show_regulator<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    ch: AdcChannel,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    emit(out, format_args!("0x{:02x}\n", meter.regulator(ch)))
}

fn show_ctrl1<I: I2c, D: DelayNs>(
    meter: &mut PowerMeter<I, D>,
    out: &mut AttrBuf,
) -> Result<(), Error<I::Error>> {
    emit(out, format_args!("0x{:02x}\n", meter.sampling_control()))
}

// ========================================
// Registration
// ========================================

/// Host-side store of attribute endpoints
pub trait AttributeRegistry {
    type Error;

    /// Create the endpoint `name`
    fn create(&mut self, name: &'static str, access: AttrAccess) -> Result<(), Self::Error>;

    /// Remove the endpoint `name`
    fn remove(&mut self, name: &'static str);
}

/// Attributes created in a registry; removed in reverse order on drop
pub struct Registration<'r, R: AttributeRegistry> {
    registry: &'r mut R,
    names: [&'static str; ATTRIBUTE_COUNT],
    created: usize,
}

impl<'r, R: AttributeRegistry> Registration<'r, R> {
    fn add(&mut self, name: &'static str, access: AttrAccess) -> Result<(), R::Error> {
        self.registry.create(name, access)?;
        self.names[self.created] = name;
        self.created += 1;
        Ok(())
    }

    /// Names of the created attributes, in creation order
    pub fn names(&self) -> &[&'static str] {
        &self.names[..self.created]
    }
}

impl<R: AttributeRegistry> Drop for Registration<'_, R> {
    fn drop(&mut self) {
        for name in self.names[..self.created].iter().rev() {
            self.registry.remove(name);
        }
    }
}

/// Create every attribute of `table` in `registry`
///
/// If any creation fails the attributes created so far are removed again,
/// newest first, and the registry's error is returned.
pub fn register<'r, R, I, D>(
    table: &[Attribute<I, D>; ATTRIBUTE_COUNT],
    registry: &'r mut R,
) -> Result<Registration<'r, R>, R::Error>
where
    R: AttributeRegistry,
    I: ErrorType,
{
    let mut registration = Registration {
        registry,
        names: [""; ATTRIBUTE_COUNT],
        created: 0,
    };
    for attr in table {
        if let Err(e) = registration.add(attr.name, attr.access) {
            log::warn!("failed to create power meter attribute {}", attr.name);
            return Err(e);
        }
    }
    log::info!("power meter attributes created");
    Ok(registration)
}
