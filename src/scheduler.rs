//! The deferred-job queue contract the client cooperates with. The queue
//! itself lives outside this crate; the engine only submits jobs, cancels
//! handles, and gets called back through
//! [Lwm2mClient::run_job](crate::registration::Lwm2mClient::run_job).

use std::time::Duration;

use crate::Ssid;
use crate::error::GoatM2mError;

/// Handle to a scheduled job. Handles stay valid for cancellation after the
/// job fired; cancelling then is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

impl JobHandle {
    pub fn new(raw: u64) -> Self {
        JobHandle(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Jobs are plain copyable values. They carry the SSID, never a reference to
/// the server, and re-resolve it against the active list when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// A registration Update, argument packed per
    /// [UpdateJobArgs](crate::UpdateJobArgs)
    RegistrationUpdate(u32),
    /// Forced Re-Register of a single server
    Reregister(Ssid),
}

/// Retry curve a scheduler applies when a retryable job returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: u32,
    pub max: Duration,
}

/// Backoff for the registration jobs. The engine never schedules its own
/// retries; this policy is the only re-entry timing after a failed Update.
pub const SERVER_RETRYABLE_BACKOFF: BackoffPolicy = BackoffPolicy {
    initial: Duration::from_secs(1),
    multiplier: 2,
    max: Duration::from_secs(120),
};

pub trait Scheduler: Send {
    /// Schedule `job` to run as soon as possible, without retries
    fn sched_now(&mut self, job: Job) -> Result<JobHandle, GoatM2mError>;

    /// Schedule `job` after `delay`; when the job returns an error the
    /// scheduler re-runs it along `backoff`
    fn sched_retryable(
        &mut self,
        delay: Duration,
        backoff: BackoffPolicy,
        job: Job,
    ) -> Result<JobHandle, GoatM2mError>;

    /// Cancel a job; safe for handles that already fired
    fn sched_del(&mut self, handle: JobHandle);

    /// Cancel and null a stored handle; safe on `None`
    fn sched_del_opt(&mut self, handle: &mut Option<JobHandle>) {
        if let Some(handle) = handle.take() {
            self.sched_del(handle);
        }
    }
}
