//! Bus-level tests for the power meter: the exact I2C transactions each
//! operation issues, checked against `embedded-hal-mock` expectations.
//!
//! Run with: cargo test --test i2c_sequences

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use s2mps20_powermeter::*;

const ADDR: u8 = S2MPS20_PMIC_ADDRESS;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expected transaction list, tracking the CTRL3 value the driver will see
struct Script {
    ctrl3: u8,
    txns: Vec<I2cTransaction>,
}

impl Script {
    fn new() -> Self {
        Self {
            ctrl3: 0,
            txns: Vec::new(),
        }
    }

    fn read(&mut self, reg: u8, value: u8) -> &mut Self {
        self.txns
            .push(I2cTransaction::write_read(ADDR, vec![reg], vec![value]));
        self
    }

    fn write(&mut self, reg: u8, value: u8) -> &mut Self {
        self.txns.push(I2cTransaction::write(ADDR, vec![reg, value]));
        self
    }

    fn update(&mut self, reg: u8, old: u8, value: u8, mask: u8) -> &mut Self {
        self.read(reg, old).write(reg, (old & !mask) | (value & mask))
    }

    fn ctrl3(&mut self, value: u8, mask: u8) -> &mut Self {
        let old = self.ctrl3;
        self.ctrl3 = (old & !mask) | (value & mask);
        let new = self.ctrl3;
        self.read(S2MPS20_REG_ADC_CTRL3, old)
            .write(S2MPS20_REG_ADC_CTRL3, new)
    }

    fn mux(&mut self, map: [u8; 3]) -> &mut Self {
        for (i, reg) in map.into_iter().enumerate() {
            self.ctrl3(MUX_PTR_BASE + i as u8, ADC_PTR_MASK)
                .write(S2MPS20_REG_ADC_DATA, reg);
        }
        self
    }

    /// Default sync-mode bring-up
    fn init(&mut self, map: [u8; 3]) -> &mut Self {
        self.read(S2MPS20_REG_ADC_CTRL1, 0x20)
            .update(S2MPS20_REG_ADC_CTRL2, 0x00, ADC_CAL_EN_MASK, ADC_CAL_EN_MASK)
            .mux(map)
            .ctrl3(ADC_EN_MASK, ADC_EN_MASK)
    }

    fn sample(&mut self, ptr: u8, value: u8) -> &mut Self {
        self.ctrl3(ptr | ADC_EN_MASK, ADC_PTR_MASK | ADC_EN_MASK)
            .read(S2MPS20_REG_ADC_DATA, value)
    }

    fn take(&mut self) -> Vec<I2cTransaction> {
        std::mem::take(&mut self.txns)
    }
}

fn meter(txns: &[I2cTransaction], config: MeterConfig) -> PowerMeter<I2cMock, NoopDelay> {
    PowerMeter::new(I2cMock::new(txns), NoopDelay, config)
}

fn finish(meter: PowerMeter<I2cMock, NoopDelay>) {
    let (mut i2c, _) = meter.release();
    i2c.done();
}

// ---------------------------------------------------------------------------
// Bring-up and teardown
// ---------------------------------------------------------------------------

#[test]
fn init_sequence() {
    let mut script = Script::new();
    let txns = script.init([0x01, 0x02, 0x03]).take();

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    assert_eq!(meter.sampling_control(), 0x20);
    finish(meter);
}

#[test]
fn async_init_writes_sampling_control_without_reading() {
    let mut script = Script::new();
    let txns = script
        .write(S2MPS20_REG_ADC_CTRL1, ADC_CTRL1_ASYNC_DEFAULT)
        .mux([0x41, 0x42, 0x01])
        .ctrl3(ADC_EN_MASK, ADC_EN_MASK)
        .take();

    let config = MeterConfig::default()
        .with_sync_mode(SyncMode::Async)
        .with_channel_map([0x41, 0x42, 0x01])
        .with_calibration(false);
    let mut meter = meter(&txns, config);
    meter.init().unwrap();
    finish(meter);
}

#[test]
fn shutdown_clears_enable_bit() {
    let mut script = Script::new();
    script.init([0x01, 0x02, 0x03]);
    let txns = script.ctrl3(0, ADC_EN_MASK).take();

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    meter.shutdown().unwrap();
    finish(meter);
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[test]
fn single_channel_read_sequence() {
    let mut script = Script::new();
    script.init([0x01, 0x02, 0x03]);
    let txns = script
        .sample(CURRENT_PTR_BASE + 1, 0x40)
        .sample(POWER_PTR_BASE + 2, 0x34)
        .sample(POWER_PTR_BASE + 3, 0x12)
        .take();

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    let reading = meter.read_channel(AdcChannel::Ch1).unwrap();

    assert_eq!(reading.regulator, 0x02);
    assert_eq!(reading.raw_current, 0x40);
    assert_eq!(reading.raw_power, 0x1234);
    assert_eq!(reading.current_ua, 752_941);
    assert_eq!(reading.power_uw, 0x12 * POWER_BS);
    finish(meter);
}

#[test]
fn async_all_channel_read_triggers_then_samples_in_order() {
    let mut script = Script::new();
    let txns = script
        .write(S2MPS20_REG_ADC_CTRL1, ADC_CTRL1_ASYNC_DEFAULT)
        .mux([0x01, 0x02, 0x03])
        .ctrl3(ADC_EN_MASK, ADC_EN_MASK)
        .update(S2MPS20_REG_ADC_CTRL2, 0x00, ADC_ASYNCRD_MASK, ADC_ASYNCRD_MASK)
        .sample(CURRENT_PTR_BASE, 10)
        .sample(CURRENT_PTR_BASE + 1, 20)
        .sample(CURRENT_PTR_BASE + 2, 30)
        .sample(POWER_PTR_BASE, 0x01)
        .sample(POWER_PTR_BASE + 1, 0x02)
        .sample(POWER_PTR_BASE + 2, 0x03)
        .sample(POWER_PTR_BASE + 3, 0x04)
        .sample(POWER_PTR_BASE + 4, 0x05)
        .sample(POWER_PTR_BASE + 5, 0x06)
        .take();

    let config = MeterConfig::default()
        .with_sync_mode(SyncMode::Async)
        .with_calibration(false);
    let mut meter = meter(&txns, config);
    meter.init().unwrap();
    let readings = meter.read_all().unwrap();

    let raw: Vec<_> = readings.iter().map(|r| (r.raw_current, r.raw_power)).collect();
    assert_eq!(raw, [(10, 0x0201), (20, 0x0403), (30, 0x0605)]);
    finish(meter);
}

#[test]
fn bus_error_aborts_read_without_touching_cache() {
    let mut script = Script::new();
    script.init([0x01, 0x02, 0x03]);
    let mut txns = script.sample(CURRENT_PTR_BASE, 0x50).take();
    txns.push(
        I2cTransaction::write_read(ADDR, vec![S2MPS20_REG_ADC_CTRL3], vec![0])
            .with_error(ErrorKind::Other),
    );

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    assert_eq!(meter.read_all(), Err(Error::I2c(ErrorKind::Other)));
    assert_eq!(meter.reading(AdcChannel::Ch0).raw_current, 0);
    finish(meter);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn channel_mapping_rewrites_whole_mux_with_adc_stopped() {
    let mut script = Script::new();
    script.init([0x01, 0x02, 0x03]);
    let txns = script
        .ctrl3(0, ADC_EN_MASK)
        .mux([0x01, 0x02, 0x4C])
        .ctrl3(ADC_EN_MASK, ADC_EN_MASK)
        .take();

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    meter.set_channel_mapping(AdcChannel::Ch2, 0x4C).unwrap();
    assert_eq!(
        meter.set_channel_mapping(AdcChannel::Ch0, 0x00),
        Err(Error::InvalidRegulator(0x00))
    );
    assert_eq!(meter.channel_mapping(), [0x01, 0x02, 0x4C]);
    finish(meter);
}

#[test]
fn sampling_control_stops_adc_around_ctrl1_write() {
    let mut script = Script::new();
    script.init([0x01, 0x02, 0x03]);
    let txns = script
        .ctrl3(0, ADC_EN_MASK)
        .write(S2MPS20_REG_ADC_CTRL1, 0x2F)
        .ctrl3(ADC_EN_MASK, ADC_EN_MASK)
        .take();

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    meter.set_sampling_control(0xFF).unwrap();
    assert_eq!(meter.sampling_control(), 0x2F);
    finish(meter);
}

#[test]
fn mode_changes_do_not_touch_the_bus() {
    let mut script = Script::new();
    let txns = script.init([0x01, 0x02, 0x03]).take();

    let mut meter = meter(&txns, MeterConfig::default());
    meter.init().unwrap();
    meter.set_mode(2);
    meter.set_sync_mode(2);
    assert_eq!(meter.ptr_base(), POWER_PTR_BASE);
    assert_eq!(meter.sync_mode(), SyncMode::Async);
    finish(meter);
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

#[test]
fn adc_en_attribute_reports_ctrl3() {
    let mut script = Script::new();
    script.init([0x01, 0x02, 0x03]);
    let ctrl3 = script.ctrl3;
    let txns = script.read(S2MPS20_REG_ADC_CTRL3, ctrl3).take();

    let mut m = meter(&txns, MeterConfig::default());
    m.init().unwrap();
    let shared = SharedPowerMeter::<NoopRawMutex, _, _>::new(m);
    assert_eq!(shared.show("adc_en").unwrap().as_str(), "ADC enable (9a)\n");
    finish(shared.into_inner());
}

#[test]
fn rejected_store_issues_no_transactions() {
    let mut script = Script::new();
    let txns = script.init([0x01, 0x02, 0x03]).take();

    let mut m = meter(&txns, MeterConfig::default());
    m.init().unwrap();
    let shared = SharedPowerMeter::<NoopRawMutex, _, _>::new(m);
    assert_eq!(shared.store("adc_reg_1", "4d"), Err(Error::InvalidArgument));
    assert_eq!(shared.store("adc_ctrl1", "x1"), Err(Error::InvalidArgument));
    assert_eq!(shared.store("adc_en", ""), Err(Error::InvalidArgument));
    finish(shared.into_inner());
}
