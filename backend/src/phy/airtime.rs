//! LoRa packet time-on-air
//!
//! Closed-form SX127x datasheet formula:
//!
//! ```text
//! T_sym      = 2^SF / BW
//! T_preamble = (n_preamble + 4.25) * T_sym
//! n_payload  = 8 + max(ceil((8*PL - 4*SF + 28 + 16*CRC - 20*IH) / (4*(SF - 2*DE))) * (CR + 4), 0)
//! T_packet   = T_preamble + n_payload * T_sym
//! ```
//!
//! All parameter validation happens when the types are built (constructors,
//! `TryFrom`, `FromStr`, serde). Computing an airtime never fails.
//!
//! # Example
//!
//! ```rust
//! use lbt_simulator_core_rs::phy::{airtime_ticks, LoraModulation, PacketShape};
//!
//! let modulation = LoraModulation::new(125_000, 9, "4/5").unwrap();
//! let shape = PacketShape::new(255).unwrap().with_implicit_header(true);
//!
//! let seconds = modulation.time_on_air(&shape);
//! assert!((seconds - 1.250304).abs() < 1e-9);
//! assert_eq!(airtime_ticks(seconds, 1000.0), 1250);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::time::Tick;

/// Largest LoRa payload in bytes
pub const MAX_PAYLOAD_BYTES: usize = 255;

/// Largest CRC length accepted, in bytes
pub const MAX_CRC_BYTES: u8 = 2;

/// Symbol duration from which the datasheet mandates low data rate optimization
const LDRO_SYMBOL_TIME_THRESHOLD: f64 = 0.016;

/// Invalid modulation or packet parameter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AirtimeError {
    #[error("Bandwidth is out of range: {0} Hz (expected 125000, 250000 or 500000)")]
    InvalidBandwidth(u32),

    #[error("Unrecognized bandwidth '{0}'")]
    UnrecognizedBandwidth(String),

    #[error("Spreading factor is out of range: {0} (expected 6..=12)")]
    InvalidSpreadingFactor(u8),

    #[error("Coding rate is out of range: '{0}' (expected 4/5, 4/6, 4/7 or 4/8)")]
    InvalidCodingRate(String),

    #[error("Payload of {0} bytes exceeds the {max} byte limit", max = MAX_PAYLOAD_BYTES)]
    PayloadTooLarge(usize),

    #[error("CRC length of {0} bytes is out of range (expected 0..=2)")]
    InvalidCrcLength(u8),
}

// ============================================================================
// Modulation parameters
// ============================================================================

/// Channel bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Bandwidth {
    Khz125,
    Khz250,
    Khz500,
}

impl Bandwidth {
    /// Bandwidth in Hz
    pub fn hz(self) -> u32 {
        match self {
            Bandwidth::Khz125 => 125_000,
            Bandwidth::Khz250 => 250_000,
            Bandwidth::Khz500 => 500_000,
        }
    }
}

impl TryFrom<u32> for Bandwidth {
    type Error = AirtimeError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        match hz {
            125_000 => Ok(Bandwidth::Khz125),
            250_000 => Ok(Bandwidth::Khz250),
            500_000 => Ok(Bandwidth::Khz500),
            other => Err(AirtimeError::InvalidBandwidth(other)),
        }
    }
}

impl From<Bandwidth> for u32 {
    fn from(bandwidth: Bandwidth) -> Self {
        bandwidth.hz()
    }
}

/// Accepts `"125KHz"`, `"125 kHz"` or a plain Hz value such as `"125000"`.
impl FromStr for Bandwidth {
    type Err = AirtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let normalized = normalized.to_ascii_lowercase();

        let hz = match normalized.strip_suffix("khz") {
            Some(khz) => khz.parse::<u32>().ok().and_then(|k| k.checked_mul(1000)),
            None => normalized.strip_suffix("hz").unwrap_or(&normalized).parse::<u32>().ok(),
        };

        match hz {
            Some(hz) => Bandwidth::try_from(hz),
            None => Err(AirtimeError::UnrecognizedBandwidth(s.to_string())),
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}KHz", self.hz() / 1000)
    }
}

/// Spreading factor, 6..=12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SpreadingFactor(u8);

impl SpreadingFactor {
    pub const MIN: u8 = 6;
    pub const MAX: u8 = 12;

    pub const SF6: Self = Self(6);
    pub const SF7: Self = Self(7);
    pub const SF8: Self = Self(8);
    pub const SF9: Self = Self(9);
    pub const SF10: Self = Self(10);
    pub const SF11: Self = Self(11);
    pub const SF12: Self = Self(12);

    pub fn new(value: u8) -> Result<Self, AirtimeError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AirtimeError::InvalidSpreadingFactor(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = AirtimeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SpreadingFactor> for u8 {
    fn from(sf: SpreadingFactor) -> Self {
        sf.0
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SF{}", self.0)
    }
}

/// Forward error correction rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CodingRate {
    Cr4_5,
    Cr4_6,
    Cr4_7,
    Cr4_8,
}

impl CodingRate {
    /// Datasheet `CR` code: 1 for 4/5 through 4 for 4/8
    pub fn overhead(self) -> u8 {
        match self {
            CodingRate::Cr4_5 => 1,
            CodingRate::Cr4_6 => 2,
            CodingRate::Cr4_7 => 3,
            CodingRate::Cr4_8 => 4,
        }
    }
}

impl FromStr for CodingRate {
    type Err = AirtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4/5" => Ok(CodingRate::Cr4_5),
            "4/6" => Ok(CodingRate::Cr4_6),
            "4/7" => Ok(CodingRate::Cr4_7),
            "4/8" => Ok(CodingRate::Cr4_8),
            other => Err(AirtimeError::InvalidCodingRate(other.to_string())),
        }
    }
}

impl TryFrom<String> for CodingRate {
    type Error = AirtimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CodingRate> for String {
    fn from(cr: CodingRate) -> Self {
        cr.to_string()
    }
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "4/{}", self.overhead() + 4)
    }
}

/// Validated LoRa modulation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraModulation {
    pub bandwidth: Bandwidth,
    pub spreading_factor: SpreadingFactor,
    pub coding_rate: CodingRate,
}

impl LoraModulation {
    /// Build from raw values, rejecting anything outside the legal sets
    ///
    /// # Errors
    /// Returns [`AirtimeError`] for an unknown bandwidth, a spreading factor
    /// outside 6..=12, or an unknown coding rate.
    pub fn new(
        bandwidth_hz: u32,
        spreading_factor: u8,
        coding_rate: &str,
    ) -> Result<Self, AirtimeError> {
        Ok(Self {
            bandwidth: Bandwidth::try_from(bandwidth_hz)?,
            spreading_factor: SpreadingFactor::new(spreading_factor)?,
            coding_rate: coding_rate.parse()?,
        })
    }

    pub fn from_parts(
        bandwidth: Bandwidth,
        spreading_factor: SpreadingFactor,
        coding_rate: CodingRate,
    ) -> Self {
        Self {
            bandwidth,
            spreading_factor,
            coding_rate,
        }
    }

    /// Symbol duration in seconds
    pub fn symbol_time(&self) -> f64 {
        2.0_f64.powi(self.spreading_factor.value() as i32) / self.bandwidth.hz() as f64
    }

    /// Whether the datasheet asks for low data rate optimization (T_sym ≥ 16 ms)
    pub fn recommends_ldro(&self) -> bool {
        self.symbol_time() >= LDRO_SYMBOL_TIME_THRESHOLD
    }

    /// Preamble duration in seconds
    pub fn preamble_time(&self, shape: &PacketShape) -> f64 {
        (shape.preamble_symbols as f64 + 4.25) * self.symbol_time()
    }

    /// Number of payload symbols, including the fixed 8-symbol base
    pub fn payload_symbols(&self, shape: &PacketShape) -> u32 {
        let sf = self.spreading_factor.value() as f64;
        let crc = shape.crc_bytes as f64;
        let ih = if shape.implicit_header { 1.0 } else { 0.0 };
        let de = if shape.low_data_rate_optimization { 1.0 } else { 0.0 };
        let cr = self.coding_rate.overhead() as f64;

        let numerator = 8.0 * shape.payload_bytes as f64 - 4.0 * sf + 28.0 + 16.0 * crc - 20.0 * ih;
        let denominator = 4.0 * (sf - 2.0 * de);
        let coded = (numerator / denominator).ceil() * (cr + 4.0);

        (8.0 + coded.max(0.0)) as u32
    }

    /// Total time on air in seconds
    pub fn time_on_air(&self, shape: &PacketShape) -> f64 {
        self.preamble_time(shape) + self.payload_symbols(shape) as f64 * self.symbol_time()
    }

    /// Time on air converted to whole ticks (see [`airtime_ticks`])
    pub fn time_on_air_ticks(&self, shape: &PacketShape, ticks_per_second: f64) -> Tick {
        airtime_ticks(self.time_on_air(shape), ticks_per_second)
    }
}

impl fmt::Display for LoraModulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BW{} CR{}", self.spreading_factor, self.bandwidth, self.coding_rate)
    }
}

/// Convert an airtime in seconds to an integer tick count.
///
/// Truncates; call once per configuration so rounding never compounds.
pub fn airtime_ticks(seconds: f64, ticks_per_second: f64) -> Tick {
    (seconds * ticks_per_second) as Tick
}

// ============================================================================
// Packet shape
// ============================================================================

/// Framing of one packet: preamble, header mode, payload, CRC and LDRO
///
/// Defaults: 8 preamble symbols, explicit header, empty payload, 2 CRC bytes,
/// no LDRO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PacketShapeFields", into = "PacketShapeFields")]
pub struct PacketShape {
    preamble_symbols: u16,
    implicit_header: bool,
    payload_bytes: usize,
    crc_bytes: u8,
    low_data_rate_optimization: bool,
}

impl Default for PacketShape {
    fn default() -> Self {
        Self {
            preamble_symbols: 8,
            implicit_header: false,
            payload_bytes: 0,
            crc_bytes: 2,
            low_data_rate_optimization: false,
        }
    }
}

impl PacketShape {
    /// Default framing around a payload of `payload_bytes`
    pub fn new(payload_bytes: usize) -> Result<Self, AirtimeError> {
        if payload_bytes > MAX_PAYLOAD_BYTES {
            return Err(AirtimeError::PayloadTooLarge(payload_bytes));
        }
        Ok(Self {
            payload_bytes,
            ..Self::default()
        })
    }

    /// Default framing around the largest legal payload
    pub fn max_payload() -> Self {
        Self {
            payload_bytes: MAX_PAYLOAD_BYTES,
            ..Self::default()
        }
    }

    pub fn with_preamble_symbols(mut self, symbols: u16) -> Self {
        self.preamble_symbols = symbols;
        self
    }

    /// Datasheet IH bit: `true` drops the explicit header
    pub fn with_implicit_header(mut self, implicit: bool) -> Self {
        self.implicit_header = implicit;
        self
    }

    pub fn with_crc_bytes(mut self, crc_bytes: u8) -> Result<Self, AirtimeError> {
        if crc_bytes > MAX_CRC_BYTES {
            return Err(AirtimeError::InvalidCrcLength(crc_bytes));
        }
        self.crc_bytes = crc_bytes;
        Ok(self)
    }

    pub fn with_low_data_rate_optimization(mut self, enabled: bool) -> Self {
        self.low_data_rate_optimization = enabled;
        self
    }

    pub fn preamble_symbols(&self) -> u16 {
        self.preamble_symbols
    }

    pub fn implicit_header(&self) -> bool {
        self.implicit_header
    }

    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }

    pub fn crc_bytes(&self) -> u8 {
        self.crc_bytes
    }

    pub fn low_data_rate_optimization(&self) -> bool {
        self.low_data_rate_optimization
    }
}

/// Unvalidated serde mirror of [`PacketShape`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct PacketShapeFields {
    preamble_symbols: u16,
    implicit_header: bool,
    payload_bytes: usize,
    crc_bytes: u8,
    low_data_rate_optimization: bool,
}

impl Default for PacketShapeFields {
    fn default() -> Self {
        PacketShape::default().into()
    }
}

impl TryFrom<PacketShapeFields> for PacketShape {
    type Error = AirtimeError;

    fn try_from(fields: PacketShapeFields) -> Result<Self, Self::Error> {
        Ok(PacketShape::new(fields.payload_bytes)?
            .with_preamble_symbols(fields.preamble_symbols)
            .with_implicit_header(fields.implicit_header)
            .with_crc_bytes(fields.crc_bytes)?
            .with_low_data_rate_optimization(fields.low_data_rate_optimization))
    }
}

impl From<PacketShape> for PacketShapeFields {
    fn from(shape: PacketShape) -> Self {
        Self {
            preamble_symbols: shape.preamble_symbols,
            implicit_header: shape.implicit_header,
            payload_bytes: shape.payload_bytes,
            crc_bytes: shape.crc_bytes,
            low_data_rate_optimization: shape.low_data_rate_optimization,
        }
    }
}
