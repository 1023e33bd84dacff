//! Synchronous S2MPS20 ADC power meter driver implementation

use crate::{config::MeterConfig, error::Error, registers::*, types::*};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// S2MPS20 ADC power meter
///
/// Every operation takes `&mut self`, so a single owner is serialised by the
/// borrow checker. Wrap the meter in a [`SharedPowerMeter`](crate::SharedPowerMeter)
/// to share it between callers.
pub struct PowerMeter<I, D> {
    i2c: I,
    delay: D,
    config: MeterConfig,
    mode: MeterMode,
    sync_mode: SyncMode,
    channel_map: [u8; S2MPS20_MAX_ADC_CHANNEL],
    current: [u8; S2MPS20_MAX_ADC_CHANNEL],
    power: [u16; S2MPS20_MAX_ADC_CHANNEL],
    ctrl1: u8,
    ptr_base: u8,
    /// Set when a mux rewrite failed part way; the hardware may not match `channel_map`
    mux_stale: bool,
}

impl<I, D> PowerMeter<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Create a new power meter instance
    ///
    /// No bus traffic happens until [`init`](Self::init).
    ///
    /// # Example
    /// ```no_run
    /// # use s2mps20_powermeter::{MeterConfig, PowerMeter};
    /// # use embedded_hal::{delay::DelayNs, i2c::I2c};
    /// # fn example<I: I2c, D: DelayNs>(i2c: I, delay: D) {
    /// let meter = PowerMeter::new(i2c, delay, MeterConfig::default());
    /// # }
    /// ```
    pub fn new(i2c: I, delay: D, config: MeterConfig) -> Self {
        Self {
            i2c,
            delay,
            mode: config.mode,
            sync_mode: config.sync_mode,
            channel_map: config.channel_map,
            current: [0; S2MPS20_MAX_ADC_CHANNEL],
            power: [0; S2MPS20_MAX_ADC_CHANNEL],
            ctrl1: config.sampling_control.unwrap_or(0),
            ptr_base: config.mode.ptr_base(),
            mux_stale: false,
            config,
        }
    }

    /// Bring the ADC up: sampling control, calibration, channel mux, enable
    ///
    /// Returns `Error::InvalidRegulator` without touching the bus if the
    /// configured channel map routes a channel outside the BUCK and LDO ranges.
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        log::info!("s2mps20 power meter init start");

        if let Some(&reg) = self.channel_map.iter().find(|reg| !is_valid_regulator(**reg)) {
            log::error!("invalid adc regulator number ({:#x}) in channel map", reg);
            return Err(Error::InvalidRegulator(reg));
        }

        match (self.config.sampling_control, self.sync_mode) {
            (Some(ctrl1), _) => {
                self.write_register(S2MPS20_REG_ADC_CTRL1, ctrl1)?;
                self.ctrl1 = ctrl1;
            }
            // ~16s full sweep over 8 channels at 8us x 16384 x 16
            (None, SyncMode::Async) => {
                self.write_register(S2MPS20_REG_ADC_CTRL1, ADC_CTRL1_ASYNC_DEFAULT)?;
                self.ctrl1 = ADC_CTRL1_ASYNC_DEFAULT;
            }
            (None, SyncMode::Sync) => {
                self.ctrl1 = self.read_register(S2MPS20_REG_ADC_CTRL1)?;
            }
        }

        if self.config.calibration {
            self.update_register(S2MPS20_REG_ADC_CTRL2, ADC_CAL_EN_MASK, ADC_CAL_EN_MASK)?;
        }

        let map = self.channel_map;
        self.write_channel_mux(&map)?;
        self.ptr_base = self.mode.ptr_base();
        self.set_adc_enabled(true)?;

        log::info!("s2mps20 power meter init end");
        Ok(())
    }

    /// Turn the ADC off
    pub fn shutdown(&mut self) -> Result<(), Error<I::Error>> {
        self.set_adc_enabled(false)?;
        log::info!("s2mps20 power meter off");
        Ok(())
    }

    /// Release the bus and delay provider
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    // ========================================
    // Low-level I2C operations
    // ========================================

    /// Read a single register
    fn read_register(&mut self, reg: u8) -> Result<u8, Error<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.config.address, &[reg], &mut buf)
            .map_err(|e| unavailable(reg, e))?;
        Ok(buf[0])
    }

    /// Write a single register
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.i2c
            .write(self.config.address, &[reg, value])
            .map_err(|e| unavailable(reg, e))
    }

    /// Read-modify-write the bits of `reg` selected by `mask`
    fn update_register(&mut self, reg: u8, value: u8, mask: u8) -> Result<(), Error<I::Error>> {
        let old = self.read_register(reg)?;
        self.write_register(reg, (old & !mask) | (value & mask))
    }

    /// Point the data window at `ptr` with the ADC running
    fn select_pointer(&mut self, ptr: u8) -> Result<(), Error<I::Error>> {
        self.update_register(
            S2MPS20_REG_ADC_CTRL3,
            (ptr & ADC_PTR_MASK) | ADC_EN_MASK,
            ADC_PTR_MASK | ADC_EN_MASK,
        )
    }

    fn set_adc_enabled(&mut self, on: bool) -> Result<(), Error<I::Error>> {
        let value = if on { ADC_EN_MASK } else { 0 };
        self.update_register(S2MPS20_REG_ADC_CTRL3, value, ADC_EN_MASK)
    }

    /// Route each channel to its regulator through the mux slots
    fn write_channel_mux(
        &mut self,
        map: &[u8; S2MPS20_MAX_ADC_CHANNEL],
    ) -> Result<(), Error<I::Error>> {
        for ch in AdcChannel::ALL {
            self.update_register(S2MPS20_REG_ADC_CTRL3, ch.mux_ptr(), ADC_PTR_MASK)?;
            self.write_register(S2MPS20_REG_ADC_DATA, map[ch.index()])?;
        }
        Ok(())
    }

    /// Rewrite the whole mux from `channel_map` with the ADC stopped
    fn restore_channel_mux(&mut self) -> Result<(), Error<I::Error>> {
        log::info!("rewriting adc mux from channel map {:?}", self.channel_map);
        let map = self.channel_map;
        self.set_adc_enabled(false)?;
        self.write_channel_mux(&map)?;
        self.mux_stale = false;
        self.set_adc_enabled(true)
    }

    // ========================================
    // Sampling
    // ========================================

    /// Sample the selected channels into the reading cache
    ///
    /// In async mode the conversion is triggered first and the full settling
    /// window elapses before the first sample. All current samples are taken
    /// before any power sample, and each power sample is read low byte first.
    /// The cache is only updated once every sample has been read. A mux left
    /// half-written by a failed [`set_channel_mapping`](Self::set_channel_mapping)
    /// is rewritten first.
    pub fn read(&mut self, select: ChannelSelect) -> Result<(), Error<I::Error>> {
        if self.mux_stale {
            self.restore_channel_mux()?;
        }

        if self.sync_mode == SyncMode::Async {
            self.update_register(S2MPS20_REG_ADC_CTRL2, ADC_ASYNCRD_MASK, ADC_ASYNCRD_MASK)?;
            self.delay.delay_us(ADC_ASYNC_SETTLE_US);
        }

        let single;
        let channels: &[AdcChannel] = match select {
            ChannelSelect::All => &AdcChannel::ALL,
            ChannelSelect::Single(ch) => {
                single = [ch];
                &single
            }
        };

        let mut current = self.current;
        for &ch in channels {
            self.select_pointer(ch.current_ptr())?;
            current[ch.index()] = self.read_register(S2MPS20_REG_ADC_DATA)?;
        }

        let mut power = self.power;
        for &ch in channels {
            self.select_pointer(ch.power_ptr())?;
            let low = self.read_register(S2MPS20_REG_ADC_DATA)?;
            self.select_pointer(ch.power_ptr() + 1)?;
            let high = self.read_register(S2MPS20_REG_ADC_DATA)?;
            power[ch.index()] = (u16::from(high) << 8) | u16::from(low);
        }

        self.current = current;
        self.power = power;
        log::debug!(
            "adc samples current={:?} power={:?}",
            self.current,
            self.power
        );
        Ok(())
    }

    /// Sample all channels and return their readings
    pub fn read_all(
        &mut self,
    ) -> Result<[ChannelReading; S2MPS20_MAX_ADC_CHANNEL], Error<I::Error>> {
        self.read(ChannelSelect::All)?;
        Ok(self.readings())
    }

    /// Sample one channel and return its reading
    pub fn read_channel(&mut self, ch: AdcChannel) -> Result<ChannelReading, Error<I::Error>> {
        self.read(ChannelSelect::Single(ch))?;
        Ok(self.reading(ch))
    }

    /// Last sampled reading of `ch`, converted with its regulator's coefficients
    pub fn reading(&self, ch: AdcChannel) -> ChannelReading {
        let i = ch.index();
        let regulator = self.channel_map[i];
        ChannelReading {
            channel: ch,
            regulator,
            raw_current: self.current[i],
            raw_power: self.power[i],
            current_ua: current_ua(self.current[i], coefficient(regulator, coeff_current, "current")),
            power_uw: power_uw(self.power[i], coefficient(regulator, coeff_power, "power")),
        }
    }

    /// Last sampled readings of all channels
    pub fn readings(&self) -> [ChannelReading; S2MPS20_MAX_ADC_CHANNEL] {
        AdcChannel::ALL.map(|ch| self.reading(ch))
    }

    // ========================================
    // Configuration
    // ========================================

    /// Route `ch` to regulator `reg`
    ///
    /// The ADC is stopped while the whole mux table is rewritten, then
    /// restarted. An index outside the BUCK and LDO ranges is rejected with
    /// no bus traffic and the previous mapping kept. If the rewrite fails part
    /// way the previous mapping is kept and the mux is rewritten from it on the
    /// next read.
    pub fn set_channel_mapping(&mut self, ch: AdcChannel, reg: u8) -> Result<(), Error<I::Error>> {
        if !is_valid_regulator(reg) {
            log::warn!("rejecting adc regulator number ({:#x}) for channel {}", reg, ch.index());
            return Err(Error::InvalidRegulator(reg));
        }

        let mut map = self.channel_map;
        map[ch.index()] = reg;

        self.set_adc_enabled(false)?;
        if let Err(e) = self.write_channel_mux(&map) {
            log::warn!("adc mux out of step with channel map {:?}", self.channel_map);
            self.mux_stale = true;
            return Err(e);
        }
        self.channel_map = map;
        self.mux_stale = false;

        self.ptr_base = self.mode.ptr_base();
        match self.mode {
            MeterMode::Current => log::info!("current mode enable"),
            MeterMode::Power => log::info!("power mode enable"),
        }
        self.set_adc_enabled(true)
    }

    /// Regulator index routed to each channel
    pub fn channel_mapping(&self) -> [u8; S2MPS20_MAX_ADC_CHANNEL] {
        self.channel_map
    }

    /// Regulator index routed to `ch`
    pub fn regulator(&self, ch: AdcChannel) -> u8 {
        self.channel_map[ch.index()]
    }

    /// Set the meter mode from a raw value; unrecognised values select `Current`
    pub fn set_mode(&mut self, raw: u8) -> MeterMode {
        let mode = MeterMode::from_raw(raw);
        self.set_meter_mode(mode);
        mode
    }

    /// Set the meter mode and its pointer family
    pub fn set_meter_mode(&mut self, mode: MeterMode) {
        self.mode = mode;
        self.ptr_base = mode.ptr_base();
    }

    /// Current meter mode
    pub fn mode(&self) -> MeterMode {
        self.mode
    }

    /// Pointer family selected by the current mode
    pub fn ptr_base(&self) -> u8 {
        self.ptr_base
    }

    /// Set the sync mode from a raw value; unrecognised values select `Sync`
    pub fn set_sync_mode(&mut self, raw: u8) -> SyncMode {
        let sync_mode = SyncMode::from_raw(raw);
        self.set_sync(sync_mode);
        sync_mode
    }

    /// Set the sync mode used by subsequent reads
    pub fn set_sync(&mut self, sync_mode: SyncMode) {
        self.sync_mode = sync_mode;
    }

    /// Current sync mode
    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Apply a new sampling control nibble
    ///
    /// Only the low four bits of `value` are used; the stored upper nibble is
    /// written back unchanged. The ADC is stopped around the CTRL1 write.
    pub fn set_sampling_control(&mut self, value: u8) -> Result<(), Error<I::Error>> {
        let ctrl1 = (self.ctrl1 & !ADC_CTRL1_SMP_MASK) | (value & ADC_CTRL1_SMP_MASK);

        self.set_adc_enabled(false)?;
        self.write_register(S2MPS20_REG_ADC_CTRL1, ctrl1)?;
        self.ctrl1 = ctrl1;
        self.set_adc_enabled(true)
    }

    /// Cached ADC_CTRL1 value
    pub fn sampling_control(&self) -> u8 {
        self.ctrl1
    }

    /// Set the ADC enable bit from a raw value; only `1` enables
    pub fn set_enable(&mut self, raw: u8) -> Result<bool, Error<I::Error>> {
        let on = raw == 1;
        self.set_adc_enabled(on)?;
        Ok(on)
    }

    /// Turn the ADC on
    pub fn enable(&mut self) -> Result<(), Error<I::Error>> {
        self.set_adc_enabled(true)
    }

    /// Turn the ADC off
    pub fn disable(&mut self) -> Result<(), Error<I::Error>> {
        self.set_adc_enabled(false)
    }

    /// Read ADC_CTRL3, returning the enable state and the raw register
    pub fn adc_control(&mut self) -> Result<(bool, u8), Error<I::Error>> {
        let ctrl3 = self.read_register(S2MPS20_REG_ADC_CTRL3)?;
        Ok((ctrl3 & ADC_EN_MASK != 0, ctrl3))
    }
}

fn unavailable<E>(reg: u8, error: E) -> Error<E> {
    log::warn!("power meter unavailable: i2c access to {:#04x} failed", reg);
    Error::I2c(error)
}

/// Coefficient for `reg`, or 0 with an error logged if it has none
fn coefficient(reg: u8, lookup: fn(u8) -> Option<u32>, quantity: &str) -> u32 {
    lookup(reg).unwrap_or_else(|| {
        log::error!("invalid adc regulator number ({:#x}) for {} coefficient", reg, quantity);
        0
    })
}
