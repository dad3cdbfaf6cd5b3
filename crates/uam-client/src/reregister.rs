//! Re-registration policy for master-protocol calls.
//!
//! When the resource manager restarts or fences the attempt, master RPCs
//! fail with session loss. The policy re-issues
//! `register_application_master` with the stashed register request and
//! retries the original call exactly once. This is the only place that
//! catches and transforms errors; anything other than session loss passes
//! through untouched.

use std::future::Future;

use tracing::warn;

use crate::error::{UamError, UamResult};
use crate::protocol::ApplicationMasterProtocol;
use crate::records::{
    AllocateRequest,
    AllocateResponse,
    ApplicationAttemptId,
    FinishApplicationMasterRequest,
    FinishApplicationMasterResponse,
    RegisterApplicationMasterRequest,
};

pub(crate) async fn call_with_reregister<T, F, Fut>(
    master: &dyn ApplicationMasterProtocol,
    register_request: RegisterApplicationMasterRequest,
    attempt_id: ApplicationAttemptId,
    op: F,
) -> UamResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = UamResult<T>>,
{
    match op().await {
        Err(UamError::SessionLost(message)) => {
            warn!(
                %attempt_id,
                %message,
                "attempt not registered with the resource manager, re-registering"
            );
            master.register_application_master(register_request).await?;
            op().await.map_err(|e| match e {
                UamError::SessionLost(m) => UamError::RpcFailure(format!(
                    "master rpc for {attempt_id} failed after re-registration: {m}"
                )),
                other => other,
            })
        }
        other => other,
    }
}

pub(crate) async fn allocate_with_reregister(
    master: &dyn ApplicationMasterProtocol,
    register_request: RegisterApplicationMasterRequest,
    attempt_id: ApplicationAttemptId,
    request: AllocateRequest,
) -> UamResult<AllocateResponse> {
    call_with_reregister(master, register_request, attempt_id, || {
        master.allocate(request.clone())
    })
    .await
}

pub(crate) async fn finish_with_reregister(
    master: &dyn ApplicationMasterProtocol,
    register_request: RegisterApplicationMasterRequest,
    attempt_id: ApplicationAttemptId,
    request: FinishApplicationMasterRequest,
) -> UamResult<FinishApplicationMasterResponse> {
    call_with_reregister(master, register_request, attempt_id, || {
        master.finish_application_master(request.clone())
    })
    .await
}
