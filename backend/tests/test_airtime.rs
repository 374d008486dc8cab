//! Tests for the LoRa time-on-air model

use lbt_simulator_core_rs::phy::{
    airtime_ticks, AirtimeError, Bandwidth, CodingRate, LoraModulation, PacketShape,
    SpreadingFactor,
};

const EPS: f64 = 1e-9;

fn shape(payload: usize) -> PacketShape {
    PacketShape::new(payload).unwrap()
}

#[test]
fn test_golden_sf9_implicit_header_full_payload() {
    // BW125k, SF9, CR4/5, 8 preamble, IH=1, 255 bytes, CRC=2, no LDRO
    let modulation = LoraModulation::new(125_000, 9, "4/5").unwrap();
    let packet = shape(255).with_implicit_header(true);

    assert!((modulation.symbol_time() - 0.004096).abs() < EPS);
    assert!((modulation.preamble_time(&packet) - 0.050176).abs() < EPS);
    assert_eq!(modulation.payload_symbols(&packet), 293);

    let seconds = modulation.time_on_air(&packet);
    assert!((seconds - 1.250304).abs() < EPS, "got {}", seconds);
    assert_eq!(airtime_ticks(seconds, 1000.0), 1250);
}

#[test]
fn test_sf9_explicit_header_experiment_packet() {
    // The 40-node experiment packet: SF9, 255 bytes, header present
    let modulation = LoraModulation::new(125_000, 9, "4/5").unwrap();
    let packet = shape(255);

    assert_eq!(modulation.payload_symbols(&packet), 298);
    let seconds = modulation.time_on_air(&packet);
    assert!((seconds - 1.270784).abs() < EPS, "got {}", seconds);
    assert_eq!(modulation.time_on_air_ticks(&packet, 1000.0), 1270);
}

#[test]
fn test_sf7_empty_payload() {
    let modulation = LoraModulation::new(125_000, 7, "4/5").unwrap();
    let packet = PacketShape::default();

    assert_eq!(modulation.payload_symbols(&packet), 18);
    assert!((modulation.time_on_air(&packet) - 0.030976).abs() < EPS);
}

#[test]
fn test_negative_payload_term_floors_at_base() {
    // Numerator -40 over denominator 40 => ceil(-1) * 5 = -5, floored to 0
    let modulation = LoraModulation::new(125_000, 12, "4/5").unwrap();
    let packet = shape(0)
        .with_crc_bytes(0)
        .unwrap()
        .with_implicit_header(true)
        .with_low_data_rate_optimization(true);

    assert_eq!(modulation.payload_symbols(&packet), 8);
}

#[test]
fn test_wider_bandwidth_shortens_airtime() {
    let packet = shape(50);
    let narrow = LoraModulation::new(125_000, 9, "4/5").unwrap().time_on_air(&packet);
    let wide = LoraModulation::new(500_000, 9, "4/5").unwrap().time_on_air(&packet);

    assert!((narrow / wide - 4.0).abs() < 1e-9);
}

#[test]
fn test_airtime_grows_with_spreading_factor() {
    let packet = shape(255);
    let mut previous = 0.0;
    for sf in SpreadingFactor::MIN..=SpreadingFactor::MAX {
        let airtime = LoraModulation::new(125_000, sf, "4/5").unwrap().time_on_air(&packet);
        assert!(airtime > previous, "SF{} airtime {} not above {}", sf, airtime, previous);
        previous = airtime;
    }
}

#[test]
fn test_higher_coding_rate_costs_more_symbols() {
    let packet = shape(100);
    let cr45 = LoraModulation::new(125_000, 8, "4/5").unwrap().payload_symbols(&packet);
    let cr48 = LoraModulation::new(125_000, 8, "4/8").unwrap().payload_symbols(&packet);
    assert!(cr48 > cr45);
}

#[test]
fn test_recommends_ldro_from_sf11_at_125khz() {
    assert!(!LoraModulation::new(125_000, 10, "4/5").unwrap().recommends_ldro());
    assert!(LoraModulation::new(125_000, 11, "4/5").unwrap().recommends_ldro());
    assert!(!LoraModulation::new(250_000, 11, "4/5").unwrap().recommends_ldro());
}

#[test]
fn test_invalid_bandwidth_rejected() {
    assert_eq!(
        LoraModulation::new(200_000, 9, "4/5"),
        Err(AirtimeError::InvalidBandwidth(200_000))
    );
}

#[test]
fn test_invalid_spreading_factor_rejected() {
    assert_eq!(
        LoraModulation::new(125_000, 5, "4/5"),
        Err(AirtimeError::InvalidSpreadingFactor(5))
    );
    assert_eq!(
        LoraModulation::new(125_000, 13, "4/5"),
        Err(AirtimeError::InvalidSpreadingFactor(13))
    );
}

#[test]
fn test_invalid_coding_rate_rejected() {
    assert_eq!(
        LoraModulation::new(125_000, 9, "4/9"),
        Err(AirtimeError::InvalidCodingRate("4/9".to_string()))
    );
}

#[test]
fn test_payload_and_crc_limits() {
    assert_eq!(PacketShape::new(256), Err(AirtimeError::PayloadTooLarge(256)));
    assert!(PacketShape::new(255).is_ok());
    assert_eq!(
        PacketShape::default().with_crc_bytes(3),
        Err(AirtimeError::InvalidCrcLength(3))
    );
}

#[test]
fn test_from_parts_matches_raw_constructor() {
    let raw = LoraModulation::new(250_000, 10, "4/7").unwrap();
    let parts = LoraModulation::from_parts(
        Bandwidth::Khz250,
        SpreadingFactor::new(10).unwrap(),
        CodingRate::Cr4_7,
    );
    assert_eq!(raw, parts);
    assert_eq!(parts.to_string(), "SF10 BW250KHz CR4/7");
}

#[test]
fn test_modulation_deserializes_and_validates() {
    let ok: LoraModulation = serde_json::from_str(
        r#"{"bandwidth": 125000, "spreading_factor": 9, "coding_rate": "4/5"}"#,
    )
    .unwrap();
    assert_eq!(ok, LoraModulation::new(125_000, 9, "4/5").unwrap());

    let bad = serde_json::from_str::<LoraModulation>(
        r#"{"bandwidth": 125000, "spreading_factor": 14, "coding_rate": "4/5"}"#,
    );
    assert!(bad.is_err());
}

#[test]
fn test_tick_conversion_truncates_once() {
    assert_eq!(airtime_ticks(1.2709999, 1000.0), 1270);
    assert_eq!(airtime_ticks(0.0, 1000.0), 0);
    assert_eq!(airtime_ticks(1.5, 10.0), 15);
}
