//! The per-server registration lifecycle: keeping every active server's
//! registration alive with scheduled Updates, deciding Update vs Re-Register,
//! surviving network failures through the scheduler's backoff, and folding
//! the bootstrap server into the same pipeline.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, ServerConfig};
use crate::connection::{ConnectionSubsystem, ServerSocket};
use crate::endpoint::Endpoint;
use crate::enums::{BindingMode, TransportKind};
use crate::error::GoatM2mError;
use crate::protocol::{BootstrapHooks, ObserveHooks, RegistrationProtocol};
use crate::scheduler::{Job, JobHandle, SERVER_RETRYABLE_BACKOFF, Scheduler};
use crate::utils::BoundedList;
use crate::{
    LWM2M_VERSION, MIN_UPDATE_INTERVAL, SSID_ANY, SSID_BOOTSTRAP, Ssid,
    UPDATE_INTERVAL_MARGIN_FACTOR, UpdateJobArgs,
};

/// The registration query carries at most these five arguments
const QUERY_ARGS_MAX: usize = 5;

/// Assembles the ordered registration URI query: `lwm2m`, `ep`, `lt`, `b`,
/// `sms`, each omitted when its input is absent. `lt` must be positive. Any
/// failure discards the whole list.
pub fn make_query_string_list(
    version: Option<&str>,
    endpoint_name: Option<&str>,
    lifetime_s: Option<i64>,
    binding: Option<BindingMode>,
    sms_msisdn: Option<&str>,
) -> Result<Vec<String>, GoatM2mError> {
    let mut list = BoundedList::new(QUERY_ARGS_MAX);
    if let Some(version) = version {
        list.push(format!("lwm2m={version}"))?;
    }
    if let Some(endpoint_name) = endpoint_name {
        list.push(format!("ep={endpoint_name}"))?;
    }
    if let Some(lifetime_s) = lifetime_s {
        if lifetime_s <= 0 {
            return Err(GoatM2mError::InvalidValue(format!(
                "lifetime must be positive, got {lifetime_s}"
            )));
        }
        list.push(format!("lt={lifetime_s}"))?;
    }
    if let Some(text) = binding.and_then(BindingMode::as_str) {
        list.push(format!("b={text}"))?;
    }
    if let Some(sms_msisdn) = sms_msisdn {
        list.push(format!("sms={sms_msisdn}"))?;
    }
    Ok(list.into_inner())
}

/// What a Register or Update sends for a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateParameters {
    /// Registration lifetime in seconds, always positive
    pub lifetime_s: i64,
    pub binding: BindingMode,
    pub sms_msisdn: Option<String>,
}

/// State of the registration with one server
#[derive(Debug)]
pub struct RegistrationInfo {
    /// Lifetime the registration currently runs on, in seconds
    pub lifetime_s: i64,
    /// The registration expires at this instant; an expired deadline forces
    /// Re-Register
    pub deadline: Instant,
    /// `None` until a connection variant has been selected; nothing may do
    /// I/O for this server while it is `None`
    pub conn_type: Option<TransportKind>,
    /// Copy of the parameters that were last successfully sent
    pub last_update_params: Option<UpdateParameters>,
}

impl RegistrationInfo {
    fn new(lifetime_s: i64) -> Self {
        RegistrationInfo {
            lifetime_s,
            // starts out already expired, so the first Update job forces a
            // Register
            deadline: Instant::now(),
            conn_type: None,
            last_update_params: None,
        }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now > self.deadline
    }
}

/// Delay until the next Update: halfway between the last successful exchange
/// and the lifetime expiry, floored at [MIN_UPDATE_INTERVAL]
pub(crate) fn next_update_delay(info: &RegistrationInfo, now: Instant) -> Duration {
    let margin = Duration::from_secs(info.lifetime_s.max(0) as u64) / UPDATE_INTERVAL_MARGIN_FACTOR;
    let remaining = info
        .deadline
        .saturating_duration_since(now)
        .saturating_sub(margin);
    remaining.max(MIN_UPDATE_INTERVAL)
}

/// A server in the active list
#[derive(Debug)]
pub struct ActiveServer {
    pub ssid: Ssid,
    pub endpoint: Endpoint,
    /// What the next Register or Update will send
    pub params: UpdateParameters,
    pub registration: RegistrationInfo,
    /// The one scheduled Update job for this server, if any
    pub update_handle: Option<JobHandle>,
    /// Socket owned by this server; managed by the connection subsystem,
    /// retained across suspends
    pub socket: Option<ServerSocket>,
}

impl ActiveServer {
    pub fn new(
        ssid: Ssid,
        endpoint: Endpoint,
        params: UpdateParameters,
    ) -> Result<Self, GoatM2mError> {
        if ssid == SSID_ANY {
            return Err(GoatM2mError::InvalidValue(
                "SSID 0 is reserved".to_string(),
            ));
        }
        if params.lifetime_s <= 0 {
            return Err(GoatM2mError::InvalidValue(format!(
                "lifetime must be positive, got {}",
                params.lifetime_s
            )));
        }
        Ok(ActiveServer {
            ssid,
            endpoint,
            registration: RegistrationInfo::new(params.lifetime_s),
            params,
            update_handle: None,
            socket: None,
        })
    }

    /// Builds an activatable server record from configuration
    pub fn from_config(server: &ServerConfig, config: &ConfigFile) -> Result<Self, GoatM2mError> {
        let endpoint = Endpoint::parse(&server.uri)?;
        if endpoint.transport().is_none() {
            return Err(GoatM2mError::InvalidValue(format!(
                "unsupported scheme {:?} for SSID {}",
                endpoint.scheme, server.ssid
            )));
        }
        let ssid = match server.bootstrap {
            true => SSID_BOOTSTRAP,
            false => server.ssid,
        };
        ActiveServer::new(
            ssid,
            endpoint,
            UpdateParameters {
                lifetime_s: config.lifetime,
                binding: config.binding,
                sms_msisdn: config.sms_msisdn.clone(),
            },
        )
    }

    pub fn is_bootstrap(&self) -> bool {
        self.ssid == SSID_BOOTSTRAP
    }
}

/// The ordered list of active servers, owned by the client
#[derive(Debug, Default)]
pub struct Servers {
    active: Vec<ActiveServer>,
}

impl Servers {
    pub fn get(&self, ssid: Ssid) -> Option<&ActiveServer> {
        self.active.iter().find(|server| server.ssid == ssid)
    }

    pub fn get_mut(&mut self, ssid: Ssid) -> Option<&mut ActiveServer> {
        self.active.iter_mut().find(|server| server.ssid == ssid)
    }

    pub fn contains(&self, ssid: Ssid) -> bool {
        self.get(ssid).is_some()
    }

    pub fn ssids(&self) -> Vec<Ssid> {
        self.active.iter().map(|server| server.ssid).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveServer> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn insert(&mut self, server: ActiveServer) -> Result<(), GoatM2mError> {
        if self.contains(server.ssid) {
            return Err(GoatM2mError::InvalidValue(format!(
                "SSID {} is already active",
                server.ssid
            )));
        }
        self.active.push(server);
        Ok(())
    }

    pub fn remove(&mut self, ssid: Ssid) -> Option<ActiveServer> {
        let index = self.active.iter().position(|server| server.ssid == ssid)?;
        Some(self.active.remove(index))
    }
}

/// The process-wide client state: the active server list, the collaborators
/// and the offline flag. Passed explicitly everywhere, never a singleton.
pub struct Lwm2mClient {
    pub servers: Servers,
    endpoint_name: String,
    sched: Box<dyn Scheduler>,
    connections: Box<dyn ConnectionSubsystem>,
    protocol: Box<dyn RegistrationProtocol>,
    observe: Box<dyn ObserveHooks>,
    bootstrap: Box<dyn BootstrapHooks>,
    offline: bool,
}

impl Lwm2mClient {
    pub fn new(
        endpoint_name: impl Into<String>,
        sched: Box<dyn Scheduler>,
        connections: Box<dyn ConnectionSubsystem>,
        protocol: Box<dyn RegistrationProtocol>,
        observe: Box<dyn ObserveHooks>,
        bootstrap: Box<dyn BootstrapHooks>,
    ) -> Self {
        Lwm2mClient {
            servers: Servers::default(),
            endpoint_name: endpoint_name.into(),
            sched,
            connections,
            protocol,
            observe,
            bootstrap,
            offline: false,
        }
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Stop scheduling Update and reconnect work. Jobs already queued drop
    /// themselves as they fire.
    pub fn enter_offline(&mut self) {
        info!("Client going offline");
        self.offline = true;
    }

    /// Puts a server into the active list and kicks off its first Register
    /// through the normal Update pipeline
    pub fn activate(&mut self, server: ActiveServer) -> Result<(), GoatM2mError> {
        if self.offline {
            return Err(GoatM2mError::Offline);
        }
        let ssid = server.ssid;
        self.servers.insert(server)?;
        if let Err(error) = self.schedule_update_for(ssid, false) {
            // a failed activation must not leave a zombie entry behind
            self.servers.remove(ssid);
            return Err(error);
        }
        info!("Activated server SSID {ssid}");
        Ok(())
    }

    /// Removes a server from the active list, best-effort deregistering
    /// first. Whether and when to re-activate is the caller's decision.
    pub async fn deactivate(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        if !self.servers.contains(ssid) {
            return Err(GoatM2mError::NotActive(ssid));
        }
        self.deregister(ssid).await;
        if let Some(mut server) = self.servers.remove(ssid) {
            self.sched.sched_del_opt(&mut server.update_handle);
        }
        info!("Deactivated server SSID {ssid}");
        Ok(())
    }

    /// Dispatch point for the external scheduler: runs a fired job to
    /// completion. An error returned from a retryable job invites the
    /// scheduler's backoff.
    pub async fn run_job(&mut self, job: Job) -> Result<(), GoatM2mError> {
        match job {
            Job::RegistrationUpdate(raw) => {
                self.registration_update_job(UpdateJobArgs::decode(raw))
                    .await
            }
            Job::Reregister(ssid) => self.reregister_job(ssid).await,
        }
    }

    /// Ask for an immediate registration Update, for one server or
    /// [SSID_ANY] for every active one
    pub fn schedule_registration_update(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        if self.offline {
            return Err(GoatM2mError::Offline);
        }
        match ssid {
            SSID_ANY => self.schedule_update_all(false),
            ssid => self.schedule_update_for(ssid, false),
        }
    }

    /// Schedule reconnect-and-update for every active server. The client
    /// only comes back online when all of them were scheduled.
    pub fn schedule_reconnect(&mut self) -> Result<(), GoatM2mError> {
        self.schedule_update_all(true)?;
        self.offline = false;
        info!("Client is back online");
        Ok(())
    }

    /// Reconnect a single server
    pub fn schedule_server_reconnect(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        self.schedule_update_for(ssid, true)
    }

    /// Every server is attempted even after a failure; the first error wins
    fn schedule_update_all(&mut self, reconnect_required: bool) -> Result<(), GoatM2mError> {
        let mut first_error = None;
        for ssid in self.servers.ssids() {
            if let Err(error) = self.schedule_update_for(ssid, reconnect_required) {
                warn!("Failed to schedule an Update for SSID {ssid}: {error:?}");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Cancel-then-schedule an immediate Update job for one server
    fn schedule_update_for(
        &mut self,
        ssid: Ssid,
        reconnect_required: bool,
    ) -> Result<(), GoatM2mError> {
        let server = self
            .servers
            .get_mut(ssid)
            .ok_or(GoatM2mError::NotActive(ssid))?;
        self.sched.sched_del_opt(&mut server.update_handle);
        let job = Job::RegistrationUpdate(UpdateJobArgs::new(ssid, reconnect_required).encode());
        let handle = self
            .sched
            .sched_retryable(Duration::ZERO, SERVER_RETRYABLE_BACKOFF, job)?;
        server.update_handle = Some(handle);
        Ok(())
    }

    /// Schedules the next periodic Update per the margin policy, keeping at
    /// most one Update job per server
    fn schedule_next_update(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        let server = self
            .servers
            .get_mut(ssid)
            .ok_or(GoatM2mError::NotActive(ssid))?;
        let delay = next_update_delay(&server.registration, Instant::now());
        self.sched.sched_del_opt(&mut server.update_handle);
        let job = Job::RegistrationUpdate(UpdateJobArgs::new(ssid, false).encode());
        let handle = self
            .sched
            .sched_retryable(delay, SERVER_RETRYABLE_BACKOFF, job)?;
        server.update_handle = Some(handle);
        debug!("Next Update for SSID {ssid} in {delay:?}");
        Ok(())
    }

    /// The Update job. Fired by the scheduler with the packed SSID and
    /// reconnect flag; everything is re-resolved against the current active
    /// list.
    async fn registration_update_job(&mut self, args: UpdateJobArgs) -> Result<(), GoatM2mError> {
        let UpdateJobArgs {
            ssid,
            reconnect_required,
        } = args;

        if self.offline {
            debug!("Client is offline, dropping the queued Update job for SSID {ssid}");
            if let Some(server) = self.servers.get_mut(ssid) {
                self.sched.sched_del_opt(&mut server.update_handle);
            }
            return Ok(());
        }

        let Some(server) = self.servers.get_mut(ssid) else {
            debug!("SSID {ssid} is not an active server, dropping the Update job");
            return Ok(());
        };

        if let Err(error) = self.connections.refresh(server, reconnect_required).await {
            error!("Connection refresh for SSID {ssid} failed: {error:?}");
            return Err(error);
        }

        if server.is_bootstrap() {
            if reconnect_required {
                debug!("Bootstrap server reconnected, handing over to the bootstrap subsystem");
                return self.bootstrap.update_reconnected().await;
            }
            // the bootstrap server never runs Update-vs-Re-Register
            return Ok(());
        }

        match self.update_or_reregister(ssid).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_network() => {
                warn!(
                    "Network error while updating SSID {ssid}, suspending the connection: {error:?}"
                );
                // no reconnect gets scheduled here: retrying inside a job
                // the scheduler will itself retry would loop without backoff
                if let Some(server) = self.servers.get_mut(ssid) {
                    self.connections.suspend(server);
                }
                Err(error)
            }
            Err(error) => {
                error!("Update for SSID {ssid} failed: {error:?}");
                Err(error)
            }
        }
    }

    /// Decides between a plain Update and a forced Re-Register
    async fn update_or_reregister(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        let now = Instant::now();
        let mut needs_reregister = false;

        let server = self
            .servers
            .get_mut(ssid)
            .ok_or(GoatM2mError::NotActive(ssid))?;
        if server.registration.conn_type.is_none() || !self.connections.is_online(server) {
            needs_reregister = true;
            self.connections
                .setup_registration_connection(server)
                .await?;
        } else if server.registration.expired(now) {
            debug!("Registration with SSID {ssid} already expired, forcing Re-Register");
            needs_reregister = true;
        }

        match needs_reregister {
            true => self.schedule_reregister(ssid),
            false => self.send_update(ssid).await,
        }
    }

    /// Indirects Re-Register through the scheduler so its failures stay
    /// under the one retry discipline
    fn schedule_reregister(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        debug!("Scheduling an immediate Re-Register for SSID {ssid}");
        self.sched.sched_now(Job::Reregister(ssid)).map(|_| ())
    }

    /// The Re-Register job. A failure after the server resolved deactivates
    /// it with zero cooldown.
    async fn reregister_job(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        if !self.servers.contains(ssid) {
            debug!("SSID {ssid} is not an active server, dropping the Re-Register job");
            return Ok(());
        }
        if let Err(error) = self.server_register(ssid).await {
            error!("Re-Register for SSID {ssid} failed, deactivating it: {error:?}");
            if let Err(deactivate_error) = self.deactivate(ssid).await {
                warn!("Deactivating SSID {ssid} failed too: {deactivate_error:?}");
            }
            return Err(error);
        }
        Ok(())
    }

    /// The full Register exchange for one server
    async fn server_register(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        let server = self
            .servers
            .get_mut(ssid)
            .ok_or(GoatM2mError::NotActive(ssid))?;
        self.connections
            .setup_registration_connection(server)
            .await?;

        let query = make_query_string_list(
            Some(LWM2M_VERSION),
            Some(self.endpoint_name.as_str()),
            Some(server.params.lifetime_s),
            Some(server.params.binding),
            server.params.sms_msisdn.as_deref(),
        )?;

        self.connections.bind_stream(server).await?;
        let result = self.protocol.register(server, &query).await;
        match result {
            Ok(()) => {
                let now = Instant::now();
                server.registration.lifetime_s = server.params.lifetime_s;
                server.registration.deadline =
                    now + Duration::from_secs(server.params.lifetime_s as u64);
                server.registration.last_update_params = Some(server.params.clone());
                info!(
                    "Registered with SSID {ssid}, lifetime {}s",
                    server.params.lifetime_s
                );
                self.sched.sched_del_opt(&mut server.update_handle);
                let scheduled = self.schedule_next_update(ssid);
                if let Some(server) = self.servers.get(ssid) {
                    self.observe.sched_flush_current_connection(server).await;
                }
                self.bootstrap.notify_regular_connection_available().await;
                self.connections.release_stream();
                scheduled
            }
            Err(error) => {
                self.connections.release_stream();
                Err(error)
            }
        }
    }

    /// The plain Update exchange
    async fn send_update(&mut self, ssid: Ssid) -> Result<(), GoatM2mError> {
        let server = self
            .servers
            .get(ssid)
            .ok_or(GoatM2mError::NotActive(ssid))?;
        self.connections.bind_stream(server).await?;

        let outcome = match self.protocol.update_registration(server).await {
            Ok(()) => {
                let now = Instant::now();
                // borrow again, mutably this time, to refresh the deadline
                match self.servers.get_mut(ssid) {
                    Some(server) => {
                        server.registration.lifetime_s = server.params.lifetime_s;
                        server.registration.deadline =
                            now + Duration::from_secs(server.params.lifetime_s as u64);
                        server.registration.last_update_params = Some(server.params.clone());
                        debug!("Update for SSID {ssid} accepted");
                        let scheduled = self.schedule_next_update(ssid);
                        if let Some(server) = self.servers.get(ssid) {
                            self.observe.sched_flush_current_connection(server).await;
                        }
                        scheduled
                    }
                    None => Err(GoatM2mError::NotActive(ssid)),
                }
            }
            Err(GoatM2mError::UpdateRejected) => {
                warn!("SSID {ssid} no longer knows our registration, forcing Re-Register");
                self.schedule_reregister(ssid)
            }
            Err(error) => {
                error!("Update exchange with SSID {ssid} failed: {error:?}");
                Err(error)
            }
        };
        self.connections.release_stream();
        outcome
    }

    /// Best-effort Deregister. Errors are logged and never retried, and
    /// nothing gets rescheduled on the stream afterwards.
    pub async fn deregister(&mut self, ssid: Ssid) {
        let Some(server) = self.servers.get(ssid) else {
            debug!("SSID {ssid} is not an active server, nothing to deregister");
            return;
        };
        if server.registration.conn_type.is_none() {
            debug!("SSID {ssid} has no connection selected, skipping Deregister");
            return;
        }
        if let Err(error) = self.connections.bind_stream(server).await {
            warn!("Failed to bind the stream for Deregister of SSID {ssid}: {error:?}");
            return;
        }
        if let Err(error) = self.protocol.deregister(server).await {
            warn!("Deregister for SSID {ssid} failed: {error:?}");
        }
        self.connections.release_stream_without_requeue();
    }
}
