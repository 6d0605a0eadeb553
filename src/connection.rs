use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::enums::TransportKind;
use crate::error::GoatM2mError;
use crate::registration::ActiveServer;

/// Opaque security material handed through to the DTLS layer. Plain UDP
/// ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    pub psk_identity: Option<String>,
    pub psk_key: Option<Vec<u8>>,
}

/// A connected datagram socket, exclusively owned by its
/// [ActiveServer](crate::registration::ActiveServer)
#[derive(Debug)]
pub enum ServerSocket {
    Udp(UdpSocket),
    /// The DTLS handshake itself happens in the transport layer; this is the
    /// connected carrier plus its security material
    Dtls {
        socket: UdpSocket,
        security: TransportConfig,
    },
}

impl ServerSocket {
    pub fn kind(&self) -> TransportKind {
        match self {
            ServerSocket::Udp(_) => TransportKind::Udp,
            ServerSocket::Dtls { .. } => TransportKind::Dtls,
        }
    }

    fn socket(&self) -> &UdpSocket {
        match self {
            ServerSocket::Udp(socket) => socket,
            ServerSocket::Dtls { socket, .. } => socket,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GoatM2mError> {
        Ok(self.socket().local_addr()?)
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, GoatM2mError> {
        Ok(self.socket().peer_addr()?)
    }
}

/// Opens a datagram socket for `endpoint`, optionally binds it to
/// `local_port`, then connects it to `host:port`. Any step failing drops the
/// socket and returns the error.
pub async fn connect_socket(
    kind: TransportKind,
    local_port: Option<u16>,
    security: &TransportConfig,
    endpoint: &Endpoint,
) -> Result<ServerSocket, GoatM2mError> {
    let target = endpoint.socket_target(kind)?;
    let remote = lookup_host(target.as_str())
        .await?
        .next()
        .ok_or_else(|| GoatM2mError::Network(format!("no address found for {target}")))?;

    let bind_addr = match (remote.is_ipv6(), local_port) {
        (true, Some(port)) => format!("[::]:{port}"),
        (true, None) => "[::]:0".to_string(),
        (false, Some(port)) => format!("0.0.0.0:{port}"),
        (false, None) => "0.0.0.0:0".to_string(),
    };
    let socket = UdpSocket::bind(&bind_addr).await?;
    trace!("Bound {kind} socket to {bind_addr}");
    socket.connect(remote).await?;
    debug!("Connected {kind} socket to {remote}");

    match kind {
        TransportKind::Udp => Ok(ServerSocket::Udp(socket)),
        TransportKind::Dtls => Ok(ServerSocket::Dtls {
            socket,
            security: security.clone(),
        }),
    }
}

/// The connection subsystem the engine drives. It owns connection selection,
/// reconnects, and the single process-wide comm stream used for protocol
/// exchanges.
#[async_trait]
pub trait ConnectionSubsystem: Send {
    /// Ensure `server` has a live connection. May reconnect when the flag is
    /// set or the current connection is dead, and updates the server's
    /// `conn_type` to whatever it selected.
    async fn refresh(
        &mut self,
        server: &mut ActiveServer,
        reconnect_required: bool,
    ) -> Result<(), GoatM2mError>;

    /// Select and prepare the best connection variant for a Register
    async fn setup_registration_connection(
        &mut self,
        server: &mut ActiveServer,
    ) -> Result<(), GoatM2mError>;

    fn is_online(&self, server: &ActiveServer) -> bool;

    /// Disconnect the socket but keep it around so the next refresh can
    /// reconnect with the same connection type
    fn suspend(&mut self, server: &mut ActiveServer);

    /// Acquire the comm stream for a protocol exchange with `server`. Only
    /// one exchange may hold the stream at a time.
    async fn bind_stream(&mut self, server: &ActiveServer) -> Result<(), GoatM2mError>;

    /// Reset and release the comm stream
    fn release_stream(&mut self);

    /// Release without rescheduling the notification queue; Deregister uses
    /// this because nothing should run on the connection afterwards
    fn release_stream_without_requeue(&mut self);
}
