use std::time::Duration;

use thiserror::Error;

use crate::records::{ApplicationAttemptState, ApplicationId, ApplicationState};

pub type UamResult<T> = Result<T, UamError>;

/// Errors surfaced by the UAM client.
///
/// `SessionLost` is produced by the transport when the resource manager no
/// longer knows the attempt (restart or fencing). It is consumed by the
/// re-register policy and only escapes as `RpcFailure` when the retry after
/// re-registration fails as well.
#[derive(Debug, Error)]
pub enum UamError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not registered: {0}")]
    NotRegistered(String),

    #[error(
        "received non-accepted application state {state:?} for {application_id}, \
         application is not on its first attempt"
    )]
    NotFirstAttempt {
        application_id: ApplicationId,
        state: ApplicationState,
    },

    #[error(
        "timed out after {timeout:?} waiting for the current attempt of \
         {application_id} to reach {target:?}"
    )]
    AttemptLaunchTimeout {
        application_id: ApplicationId,
        target: ApplicationAttemptState,
        timeout: Duration,
    },

    #[error("rpc failure: {0}")]
    RpcFailure(String),

    #[error("application attempt is not registered with the resource manager: {0}")]
    SessionLost(String),

    #[error("credential failure: {0}")]
    CredentialFailure(String),
}
