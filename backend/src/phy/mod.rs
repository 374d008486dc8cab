//! Physical-layer timing model
//!
//! The only place radio semantics enter the simulation: LoRa modulation
//! parameters in, on-air duration out.

pub mod airtime;

pub use airtime::{
    airtime_ticks, AirtimeError, Bandwidth, CodingRate, LoraModulation, PacketShape,
    SpreadingFactor, MAX_CRC_BYTES, MAX_PAYLOAD_BYTES,
};
