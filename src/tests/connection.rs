use crate::connection::{ServerSocket, TransportConfig, connect_socket};
use crate::endpoint::Endpoint;
use crate::enums::TransportKind;

// connecting a UDP socket just sets the peer, no traffic goes out, so these
// run fine without a server listening

#[tokio::test]
async fn test_connect_udp_socket() {
    let endpoint = Endpoint::parse("coap://127.0.0.1").expect("should parse");
    let socket = connect_socket(
        TransportKind::Udp,
        None,
        &TransportConfig::default(),
        &endpoint,
    )
    .await
    .expect("UDP connect to a local address should work");
    assert_eq!(socket.kind(), TransportKind::Udp);
    // the scheme default port filled in for the missing one
    assert_eq!(socket.peer_addr().expect("peer").port(), 5683);
}

#[tokio::test]
async fn test_connect_dtls_socket_keeps_security() {
    let endpoint = Endpoint::parse("coaps://127.0.0.1:15684").expect("should parse");
    let security = TransportConfig {
        psk_identity: Some("goat".to_string()),
        psk_key: Some(b"hunter2".to_vec()),
    };
    let socket = connect_socket(TransportKind::Dtls, None, &security, &endpoint)
        .await
        .expect("DTLS carrier connect should work");
    assert_eq!(socket.kind(), TransportKind::Dtls);
    match socket {
        ServerSocket::Dtls {
            security: stored, ..
        } => assert_eq!(stored, security),
        other => panic!("expected a DTLS socket, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_socket_rejects_out_of_range_port() {
    let endpoint = Endpoint::parse("coap://127.0.0.1:99999").expect("digits parse fine");
    let result = connect_socket(
        TransportKind::Udp,
        None,
        &TransportConfig::default(),
        &endpoint,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connect_socket_binds_local_port() {
    let endpoint = Endpoint::parse("coap://127.0.0.1").expect("should parse");
    let socket = connect_socket(
        TransportKind::Udp,
        Some(45683),
        &TransportConfig::default(),
        &endpoint,
    )
    .await
    .expect("binding a fixed local port should work");
    assert_eq!(socket.local_addr().expect("local").port(), 45683);
}
