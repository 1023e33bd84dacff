//! Type definitions and conversions for the S2MPS20 ADC power meter
//!
//! This module provides the strongly-typed meter settings, channel
//! identifiers, coefficient lookup and the raw-sample unit conversions.

use crate::registers::*;

/// Which derived quantity is primary in aggregate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeterMode {
    Current = 1,
    Power = 2,
}

impl MeterMode {
    /// Decode a raw mode value; anything unrecognised falls back to `Current`
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            2 => MeterMode::Power,
            _ => MeterMode::Current,
        }
    }

    /// Pointer family used for this mode's samples
    pub fn ptr_base(self) -> u8 {
        match self {
            MeterMode::Current => CURRENT_PTR_BASE,
            MeterMode::Power => POWER_PTR_BASE,
        }
    }
}

/// ADC read synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SyncMode {
    Sync = 1,
    /// Each read triggers a conversion and waits out the settling window
    Async = 2,
}

impl SyncMode {
    /// Decode a raw sync mode value; anything unrecognised falls back to `Sync`
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            2 => SyncMode::Async,
            _ => SyncMode::Sync,
        }
    }
}

/// ADC meter channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcChannel {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
}

impl AdcChannel {
    /// All channels in hardware order
    pub const ALL: [AdcChannel; S2MPS20_MAX_ADC_CHANNEL] =
        [AdcChannel::Ch0, AdcChannel::Ch1, AdcChannel::Ch2];

    /// Channel number as an array index
    pub fn index(self) -> usize {
        self as usize
    }

    /// Current sample slot for this channel
    pub(crate) fn current_ptr(self) -> u8 {
        CURRENT_PTR_BASE + self as u8
    }

    /// Power sample low-byte slot; the high byte follows at `+ 1`
    pub(crate) fn power_ptr(self) -> u8 {
        POWER_PTR_BASE + 2 * self as u8
    }

    /// Mux slot holding this channel's regulator selection
    pub(crate) fn mux_ptr(self) -> u8 {
        MUX_PTR_BASE + self as u8
    }
}

impl TryFrom<u8> for AdcChannel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AdcChannel::Ch0),
            1 => Ok(AdcChannel::Ch1),
            2 => Ok(AdcChannel::Ch2),
            other => Err(other),
        }
    }
}

/// Target of an ADC read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelSelect {
    All,
    Single(AdcChannel),
}

/// Regulator family a regulator index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegulatorKind {
    Buck,
    Ldo,
}

impl RegulatorKind {
    /// Classify a regulator index, `None` if it is outside both ranges
    pub fn of(reg: u8) -> Option<Self> {
        match reg {
            S2MPS20_BUCK_START..=S2MPS20_BUCK_END => Some(RegulatorKind::Buck),
            S2MPS20_LDO_START..=S2MPS20_LDO_END => Some(RegulatorKind::Ldo),
            _ => None,
        }
    }
}

/// Check that a regulator index can be routed to a meter channel
pub fn is_valid_regulator(reg: u8) -> bool {
    RegulatorKind::of(reg).is_some()
}

/// Current coefficient (nA per LSB) for a regulator index
pub fn coeff_current(reg: u8) -> Option<u32> {
    match RegulatorKind::of(reg)? {
        RegulatorKind::Buck => CURRENT_BUCK_COEFFS
            .get(usize::from(reg - S2MPS20_BUCK_START))
            .copied(),
        RegulatorKind::Ldo => CURRENT_LDO_COEFFS
            .get(usize::from(reg - S2MPS20_LDO_START))
            .copied(),
    }
}

/// Power coefficient (uW per high-byte LSB) for a regulator index
pub fn coeff_power(reg: u8) -> Option<u32> {
    match RegulatorKind::of(reg)? {
        RegulatorKind::Buck => POWER_BUCK_COEFFS
            .get(usize::from(reg - S2MPS20_BUCK_START))
            .copied(),
        RegulatorKind::Ldo => POWER_LDO_COEFFS
            .get(usize::from(reg - S2MPS20_LDO_START))
            .copied(),
    }
}

/// Convert a raw current sample to microamps (truncating)
pub fn current_ua(raw: u8, coeff: u32) -> u32 {
    u32::from(raw).wrapping_mul(coeff) / 1000
}

/// Convert a raw power sample to microwatts
///
/// Only the high byte carries the reading; the low byte is fractional and is
/// not part of the product.
pub fn power_uw(raw: u16, coeff: u32) -> u32 {
    u32::from(raw >> 8).wrapping_mul(coeff)
}

/// One channel's samples and their converted values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelReading {
    pub channel: AdcChannel,
    /// Regulator index routed to the channel
    pub regulator: u8,
    pub raw_current: u8,
    /// Combined `(high << 8) | low` power sample
    pub raw_power: u16,
    pub current_ua: u32,
    pub power_uw: u32,
}

impl ChannelReading {
    /// The reading `mode` selects as primary
    pub fn primary(&self, mode: MeterMode) -> u32 {
        match mode {
            MeterMode::Current => self.current_ua,
            MeterMode::Power => self.power_uw,
        }
    }
}
