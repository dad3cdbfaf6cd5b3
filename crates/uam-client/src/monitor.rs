//! Polls the client protocol until the current application attempt reaches
//! a target state.
//!
//! The resource manager publishes application state before any attempt
//! exists, so the monitor first waits for the application to be accepted,
//! then switches to polling the attempt report it can now name.

use std::time::Duration;

use tracing::info;

use crate::error::{UamError, UamResult};
use crate::protocol::ApplicationClientProtocol;
use crate::records::{
    ApplicationAttemptId,
    ApplicationAttemptReport,
    ApplicationAttemptState,
    ApplicationId,
    ApplicationState,
};

/// Application states that end the wait for acceptance. Anything here
/// other than `Accepted` means a later attempt is already in play and the
/// first-attempt contract is broken.
pub(crate) const TERMINAL_OR_ACCEPTED: &[ApplicationState] = &[
    ApplicationState::Accepted,
    ApplicationState::Running,
    ApplicationState::Finished,
    ApplicationState::Failed,
    ApplicationState::Killed,
];

/// Poll until the current attempt of `application_id` reaches
/// `target_state` and return its report.
///
/// The timeout is checked after each sleep, so one poll interval may
/// overshoot the deadline before the error is raised.
pub(crate) async fn monitor_current_app_attempt(
    client: &dyn ApplicationClientProtocol,
    application_id: ApplicationId,
    acceptable_states: &[ApplicationState],
    target_state: ApplicationAttemptState,
    poll_interval: Duration,
    timeout: Duration,
) -> UamResult<ApplicationAttemptReport> {
    let start = tokio::time::Instant::now();
    let mut attempt_id: Option<ApplicationAttemptId> = None;

    loop {
        if attempt_id.is_none() {
            let report = client.application_report(application_id).await?;
            if acceptable_states.contains(&report.state) {
                if report.state != ApplicationState::Accepted {
                    return Err(UamError::NotFirstAttempt {
                        application_id,
                        state: report.state,
                    });
                }
                attempt_id = client
                    .application_report(application_id)
                    .await?
                    .current_attempt_id;
            } else {
                info!(
                    %application_id,
                    state = ?report.state,
                    "application not yet accepted, will retry later"
                );
            }
        }

        if let Some(id) = attempt_id {
            let attempt_report = client.application_attempt_report(id).await?;
            if attempt_report.state == target_state {
                return Ok(attempt_report);
            }
            info!(
                attempt_id = %id,
                state = ?attempt_report.state,
                target = ?target_state,
                "waiting for current attempt to reach target state"
            );
        }

        tokio::time::sleep(poll_interval).await;

        if start.elapsed() > timeout {
            return Err(UamError::AttemptLaunchTimeout {
                application_id,
                target: target_state,
                timeout,
            });
        }
    }
}
