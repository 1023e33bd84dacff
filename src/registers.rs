//! Register addresses and constants for the S2MPS20 ADC power meter
//!
//! This module defines the ADC control registers, bit masks, pointer offsets,
//! regulator index ranges and the per-regulator conversion coefficients.

/// Default 7-bit I2C address of the S2MPS20 PMIC block
pub const S2MPS20_PMIC_ADDRESS: u8 = 0x66;

/// Number of ADC meter channels
pub const S2MPS20_MAX_ADC_CHANNEL: usize = 3;

// ========================================
// ADC control registers
// ========================================

/// ADC control register 1 - Sampling control (SMP_NUM in the low nibble, RATIO above it)
pub const S2MPS20_REG_ADC_CTRL1: u8 = 0x52;

/// ADC control register 2 - Async read trigger and DC offset calibration enable
pub const S2MPS20_REG_ADC_CTRL2: u8 = 0x53;

/// ADC control register 3 - ADC enable and data pointer
pub const S2MPS20_REG_ADC_CTRL3: u8 = 0x54;

/// ADC data window - Reads and writes go to the slot selected by the CTRL3 pointer
pub const S2MPS20_REG_ADC_DATA: u8 = 0x55;

// ========================================
// Bit masks
// ========================================

/// ADC enable bit (CTRL3)
pub const ADC_EN_MASK: u8 = 1 << 7;

/// Data pointer field (CTRL3)
pub const ADC_PTR_MASK: u8 = 0x1F;

/// Async read start bit (CTRL2)
pub const ADC_ASYNCRD_MASK: u8 = 1 << 7;

/// DC offset calibration enable bit (CTRL2)
pub const ADC_CAL_EN_MASK: u8 = 1 << 6;

/// Part of CTRL1 owned by the driver; the upper nibble is preserved
pub const ADC_CTRL1_SMP_MASK: u8 = 0x0F;

// ========================================
// Data pointer layout
// ========================================

/// First current sample slot; channel `n` lives at `CURRENT_PTR_BASE + n`
pub const CURRENT_PTR_BASE: u8 = 0x00;

/// First power sample slot; channel `n` low byte at `POWER_PTR_BASE + 2n`, high byte at `+ 1`
pub const POWER_PTR_BASE: u8 = 0x08;

/// First mux slot; channel `n` regulator selection lives at `MUX_PTR_BASE + n`
pub const MUX_PTR_BASE: u8 = 0x18;

// ========================================
// Timing and defaults
// ========================================

/// Conversion window after an async read trigger, in microseconds
pub const ADC_ASYNC_SETTLE_US: u32 = 2_000;

/// CTRL1 value used in async mode: SMP_NUM=1011 (16384 samples), RATIO=10 (125kHz)
pub const ADC_CTRL1_ASYNC_DEFAULT: u8 = 0x2B;

// ========================================
// Regulator index ranges
// ========================================

/// Number of BUCK regulators that can be metered
pub const S2MPS20_BUCK_CNT: usize = 3;

/// Number of LDO regulators that can be metered
pub const S2MPS20_LDO_CNT: usize = 12;

/// First BUCK regulator index
pub const S2MPS20_BUCK_START: u8 = 0x01;

/// Last BUCK regulator index
pub const S2MPS20_BUCK_END: u8 = 0x03;

/// First LDO regulator index
pub const S2MPS20_LDO_START: u8 = 0x41;

/// Last LDO regulator index
pub const S2MPS20_LDO_END: u8 = 0x4C;

// ========================================
// Conversion coefficients
// ========================================

// Current coefficients: nA per LSB, so `raw * coeff / 1000` is in uA.

/// Dual-phase BUCK current coefficient (4A full scale)
pub const CURRENT_BD: u32 = 15_686_274;
/// Single-phase BUCK current coefficient (3A full scale)
pub const CURRENT_BS: u32 = 11_764_705;
/// 150mA LDO current coefficient
pub const CURRENT_L150: u32 = 588_235;
/// 300mA LDO current coefficient
pub const CURRENT_L300: u32 = 1_176_470;
/// 450mA LDO current coefficient
pub const CURRENT_L450: u32 = 1_764_705;
/// 600mA LDO current coefficient
pub const CURRENT_L600: u32 = 2_352_941;

// Power coefficients: uW per LSB of the power sample high byte.

/// Dual-phase BUCK power coefficient
pub const POWER_BD: u32 = 18_823;
/// Single-phase BUCK power coefficient
pub const POWER_BS: u32 = 14_117;
/// 300mA digital LDO power coefficient
pub const POWER_D300: u32 = 3_882;
/// 150mA NMOS LDO power coefficient
pub const POWER_N150: u32 = 588;
/// 300mA NMOS LDO power coefficient
pub const POWER_N300: u32 = 1_176;
/// 450mA NMOS LDO power coefficient
pub const POWER_N450: u32 = 1_764;
/// 600mA NMOS LDO power coefficient
pub const POWER_N600: u32 = 2_352;
/// 150mA PMOS LDO power coefficient
pub const POWER_P150: u32 = 1_058;
/// 300mA PMOS LDO power coefficient
pub const POWER_P300: u32 = 2_117;
/// 450mA PMOS LDO power coefficient
pub const POWER_P450: u32 = 3_176;

/// Current coefficients for BUCK1..BUCK3
pub const CURRENT_BUCK_COEFFS: [u32; S2MPS20_BUCK_CNT] = [CURRENT_BD, CURRENT_BS, CURRENT_BS];

/// Current coefficients for LDO1..LDO12
pub const CURRENT_LDO_COEFFS: [u32; S2MPS20_LDO_CNT] = [
    CURRENT_L300,
    CURRENT_L450,
    CURRENT_L300,
    CURRENT_L150,
    CURRENT_L150,
    CURRENT_L150,
    CURRENT_L300,
    CURRENT_L450,
    CURRENT_L600,
    CURRENT_L300,
    CURRENT_L150,
    CURRENT_L150,
];

/// Power coefficients for BUCK1..BUCK3
pub const POWER_BUCK_COEFFS: [u32; S2MPS20_BUCK_CNT] = [POWER_BD, POWER_BS, POWER_BS];

/// Power coefficients for LDO1..LDO12
pub const POWER_LDO_COEFFS: [u32; S2MPS20_LDO_CNT] = [
    POWER_D300, POWER_P450, POWER_N300, POWER_N150, POWER_N150, POWER_P150, POWER_P300,
    POWER_N450, POWER_N600, POWER_P300, POWER_P150, POWER_P150,
];
