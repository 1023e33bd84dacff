//! Lock-serialised power meter handle
//!
//! All reads and reconfigurations run inside one blocking mutex, held for the
//! whole hardware interaction including the async settling delay.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c};

use crate::attributes::{
    attribute_table, register, AttrBuf, Attribute, AttributeRegistry, Registration,
    ATTRIBUTE_COUNT,
};
use crate::driver::PowerMeter;
use crate::error::Error;

/// A power meter shared between callers behind a single lock
///
/// `M` picks the raw mutex, e.g. `CriticalSectionRawMutex` when callers run in
/// interrupt context or `NoopRawMutex` for single-threaded use.
pub struct SharedPowerMeter<M: RawMutex, I: ErrorType, D> {
    meter: Mutex<M, RefCell<PowerMeter<I, D>>>,
    attributes: [Attribute<I, D>; ATTRIBUTE_COUNT],
}

impl<M, I, D> SharedPowerMeter<M, I, D>
where
    M: RawMutex,
    I: I2c,
    D: DelayNs,
{
    pub fn new(meter: PowerMeter<I, D>) -> Self {
        Self {
            meter: Mutex::new(RefCell::new(meter)),
            attributes: attribute_table(),
        }
    }

    /// Run `f` with exclusive access to the meter
    ///
    /// Returns `Error::Busy` if called again from inside `f`.
    pub fn lock<R>(&self, f: impl FnOnce(&mut PowerMeter<I, D>) -> R) -> Result<R, Error<I::Error>> {
        self.meter.lock(|cell| {
            let mut meter = cell.try_borrow_mut().map_err(|_| Error::Busy)?;
            Ok(f(&mut meter))
        })
    }

    /// The attribute table, in registration order
    pub fn attributes(&self) -> &[Attribute<I, D>] {
        &self.attributes
    }

    fn attribute(&self, name: &str) -> Result<&Attribute<I, D>, Error<I::Error>> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .ok_or(Error::UnknownAttribute)
    }

    /// Read attribute `name`
    pub fn show(&self, name: &str) -> Result<AttrBuf, Error<I::Error>> {
        let attr = self.attribute(name)?;
        self.lock(|meter| attr.show(meter))?
    }

    /// Write `input` to attribute `name`
    pub fn store(&self, name: &str, input: &str) -> Result<(), Error<I::Error>> {
        let attr = self.attribute(name)?;
        self.lock(|meter| attr.store(meter, input))?
    }

    /// Create every attribute in `registry`
    ///
    /// Dropping the returned guard removes them again.
    pub fn register<'r, R: AttributeRegistry>(
        &self,
        registry: &'r mut R,
    ) -> Result<Registration<'r, R>, R::Error> {
        register(&self.attributes, registry)
    }

    /// Take the meter back out, e.g. to shut it down
    pub fn into_inner(self) -> PowerMeter<I, D> {
        self.meter.into_inner().into_inner()
    }
}
