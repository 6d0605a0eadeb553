use async_trait::async_trait;

use crate::error::GoatM2mError;
use crate::registration::ActiveServer;

/// The three LwM2M registration interface exchanges. Wire format and CoAP
/// mechanics live elsewhere; the engine only cares about the outcome.
#[async_trait]
pub trait RegistrationProtocol: Send {
    /// Register against `server` using the prebuilt URI query arguments
    async fn register(
        &mut self,
        server: &ActiveServer,
        query: &[String],
    ) -> Result<(), GoatM2mError>;

    /// Registration Update. [GoatM2mError::UpdateRejected] means the server
    /// lost our registration and only a fresh Register will fix it.
    async fn update_registration(&mut self, server: &ActiveServer) -> Result<(), GoatM2mError>;

    async fn deregister(&mut self, server: &ActiveServer) -> Result<(), GoatM2mError>;
}

/// Hooks into the observation subsystem
#[async_trait]
pub trait ObserveHooks: Send {
    /// Flush stored notifications out on the server's current connection
    async fn sched_flush_current_connection(&mut self, server: &ActiveServer);
}

/// Hooks into the bootstrap subsystem
#[async_trait]
pub trait BootstrapHooks: Send {
    /// A regular server completed Register, so client-initiated bootstrap
    /// can stand down
    async fn notify_regular_connection_available(&mut self);

    /// The bootstrap connection came back after a requested reconnect
    async fn update_reconnected(&mut self) -> Result<(), GoatM2mError>;
}
