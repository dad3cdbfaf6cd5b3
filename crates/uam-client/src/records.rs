//! Value records exchanged with the resource manager over the two RPC
//! surfaces. The wire representation is owned by the transport; these are
//! the in-process shapes the client works with.

use std::fmt;

/// Globally unique application identifier, minted by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplicationId {
    pub cluster_timestamp: u64,
    pub id: u32,
}

impl ApplicationId {
    pub fn new(cluster_timestamp: u64, id: u32) -> Self {
        Self {
            cluster_timestamp,
            id,
        }
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application_{}_{:04}", self.cluster_timestamp, self.id)
    }
}

/// One attempt at running an application. The UAM contract only ever uses
/// the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplicationAttemptId {
    pub application_id: ApplicationId,
    pub attempt_number: u32,
}

impl ApplicationAttemptId {
    pub fn new(application_id: ApplicationId, attempt_number: u32) -> Self {
        Self {
            application_id,
            attempt_number,
        }
    }
}

impl fmt::Display for ApplicationAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appattempt_{}_{:04}_{:06}",
            self.application_id.cluster_timestamp, self.application_id.id, self.attempt_number
        )
    }
}

/// Bearer credential authorising master-protocol calls for one attempt.
/// The resource manager may rotate it mid-session via allocate responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmRmToken {
    pub identifier: Vec<u8>,
    pub password: Vec<u8>,
}

/// The handle needed to re-instantiate a master proxy for an unmanaged AM,
/// e.g. after resource manager fail-over. Public because clients running
/// with high availability need to persist it.
#[derive(Debug, Clone)]
pub struct UamIdentifier {
    pub attempt_id: ApplicationAttemptId,
    pub token: Option<AmRmToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationState {
    New,
    Submitted,
    Accepted,
    Running,
    Finished,
    Failed,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationAttemptState {
    New,
    Submitted,
    Scheduled,
    Launched,
    Running,
    Finished,
    Failed,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub memory_mb: u64,
    pub vcores: u32,
}

impl Resource {
    pub fn new(memory_mb: u64, vcores: u32) -> Self {
        Self { memory_mb, vcores }
    }
}

/// Launch context for the AM container. An unmanaged AM never launches a
/// container, so the context it submits stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerLaunchContext {
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSubmissionContext {
    pub application_id: ApplicationId,
    pub application_name: String,
    pub queue: String,
    pub resource: Resource,
    pub am_container_spec: ContainerLaunchContext,
    pub unmanaged_am: bool,
}

#[derive(Debug, Clone)]
pub struct ApplicationReport {
    pub application_id: ApplicationId,
    pub state: ApplicationState,
    pub current_attempt_id: Option<ApplicationAttemptId>,
    pub amrm_token: Option<AmRmToken>,
}

#[derive(Debug, Clone)]
pub struct ApplicationAttemptReport {
    pub attempt_id: ApplicationAttemptId,
    pub state: ApplicationAttemptState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: ContainerId,
    pub resource: Resource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub priority: u32,
    pub resource: Resource,
    pub num_containers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterApplicationMasterRequest {
    pub host: String,
    pub rpc_port: u32,
    pub tracking_url: String,
}

#[derive(Debug, Clone)]
pub struct RegisterApplicationMasterResponse {
    pub queue: String,
    pub maximum_resource_capability: Resource,
}

/// Heartbeat request on the master protocol. `response_id` is stamped by
/// the heartbeat worker immediately before the RPC; values set by the
/// caller are overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocateRequest {
    pub response_id: u64,
    pub ask: Vec<ResourceRequest>,
    pub progress: f32,
}

#[derive(Debug, Clone)]
pub struct AllocateResponse {
    pub response_id: u64,
    pub allocated_containers: Vec<Container>,
    pub amrm_token: Option<AmRmToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalApplicationStatus {
    #[default]
    Undefined,
    Succeeded,
    Failed,
    Killed,
}

#[derive(Debug, Clone, Default)]
pub struct FinishApplicationMasterRequest {
    pub final_status: FinalApplicationStatus,
    pub diagnostics: String,
    pub tracking_url: String,
}

#[derive(Debug, Clone)]
pub struct FinishApplicationMasterResponse {
    pub is_unregistered: bool,
}

impl FinishApplicationMasterResponse {
    pub fn new(is_unregistered: bool) -> Self {
        Self { is_unregistered }
    }
}

#[derive(Debug, Clone)]
pub struct KillApplicationResponse {
    pub is_kill_completed: bool,
}
