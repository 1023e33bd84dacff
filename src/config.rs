//! Bring-up configuration for the power meter

use crate::registers::{S2MPS20_MAX_ADC_CHANNEL, S2MPS20_PMIC_ADDRESS};
use crate::types::{MeterMode, SyncMode};

/// Power meter configuration applied by [`PowerMeter::init`](crate::PowerMeter::init)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeterConfig {
    /// 7-bit I2C address of the PMIC
    pub address: u8,
    /// Regulator index routed to each channel
    pub channel_map: [u8; S2MPS20_MAX_ADC_CHANNEL],
    pub mode: MeterMode,
    pub sync_mode: SyncMode,
    /// CTRL1 value written at init; `None` keeps the hardware value in sync
    /// mode and uses the async default in async mode
    pub sampling_control: Option<u8>,
    /// Enable DC offset calibration at init
    pub calibration: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            address: S2MPS20_PMIC_ADDRESS,
            // BUCK1, BUCK2, BUCK3
            channel_map: [0x01, 0x02, 0x03],
            mode: MeterMode::Current,
            sync_mode: SyncMode::Sync,
            sampling_control: None,
            calibration: true,
        }
    }
}

impl MeterConfig {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_channel_map(mut self, channel_map: [u8; S2MPS20_MAX_ADC_CHANNEL]) -> Self {
        self.channel_map = channel_map;
        self
    }

    /// Set the mode from a raw platform value (`1` current, `2` power)
    pub fn with_raw_mode(mut self, raw: u8) -> Self {
        self.mode = MeterMode::from_raw(raw);
        self
    }

    pub fn with_mode(mut self, mode: MeterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_sampling_control(mut self, ctrl1: u8) -> Self {
        self.sampling_control = Some(ctrl1);
        self
    }

    pub fn with_calibration(mut self, enabled: bool) -> Self {
        self.calibration = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_routes_first_three_bucks() {
        let config = MeterConfig::default();
        assert_eq!(config.address, 0x66);
        assert_eq!(config.channel_map, [0x01, 0x02, 0x03]);
        assert_eq!(config.sampling_control, None);
        assert!(config.calibration);
    }

    #[test]
    fn raw_mode_normalises_unknown_values() {
        assert_eq!(MeterConfig::default().with_raw_mode(2).mode, MeterMode::Power);
        assert_eq!(MeterConfig::default().with_raw_mode(0).mode, MeterMode::Current);
    }
}
