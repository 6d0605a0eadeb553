use enum_iterator::all;

use crate::enums::{BindingMode, TransportKind};

#[test]
fn test_binding_mode_round_trip() {
    for mode in all::<BindingMode>() {
        match mode.as_str() {
            Some(text) => assert_eq!(BindingMode::from(text), mode),
            None => assert_eq!(mode, BindingMode::None),
        }
    }
}

#[test]
fn test_binding_mode_table() {
    assert_eq!(BindingMode::U.as_str(), Some("U"));
    assert_eq!(BindingMode::UQS.as_str(), Some("UQS"));
    assert_eq!(BindingMode::None.as_str(), None);
    assert_eq!(BindingMode::from("UQ"), BindingMode::UQ);
    assert_eq!(BindingMode::from("goat"), BindingMode::None);
    assert_eq!(BindingMode::from("u"), BindingMode::None);
    assert_eq!(format!("{}", BindingMode::US), "US");
    assert_eq!(format!("{}", BindingMode::None), "");
}

#[test]
fn test_binding_mode_serde() {
    let mode: BindingMode = serde_json::from_str("\"SQ\"").expect("should deserialize");
    assert_eq!(mode, BindingMode::SQ);
    assert_eq!(
        serde_json::to_string(&BindingMode::UQ).expect("should serialize"),
        "\"UQ\""
    );
}

#[test]
fn test_transport_kind_schemes() {
    assert_eq!(TransportKind::from_scheme("coap"), Some(TransportKind::Udp));
    assert_eq!(TransportKind::from_scheme("coaps"), Some(TransportKind::Dtls));
    assert_eq!(TransportKind::from_scheme("http"), None);
    assert_eq!(TransportKind::Udp.default_port(), 5683);
    assert_eq!(TransportKind::Dtls.default_port(), 5684);
    assert_eq!(format!("{}", TransportKind::Udp), "UDP");
    assert_eq!(format!("{}", TransportKind::Dtls), "DTLS");
}
