//! Background worker draining the request queue and driving the
//! allocate heartbeat against the master protocol.
//!
//! One worker per UAM instance. Only the worker reads and writes the
//! rolling response id, so it advances monotonically without shared
//! state. Per-item failures are logged and never terminate the loop.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::principal::ProxyPrincipal;
use crate::protocol::ApplicationMasterProtocol;
use crate::queue::RequestQueue;
use crate::records::{ApplicationAttemptId, RegisterApplicationMasterRequest};
use crate::reregister::allocate_with_reregister;

pub(crate) struct WorkerContext {
    pub queue: Arc<RequestQueue>,
    pub master: Arc<dyn ApplicationMasterProtocol>,
    pub register_request: RegisterApplicationMasterRequest,
    pub attempt_id: ApplicationAttemptId,
    pub principal: ProxyPrincipal,
}

pub(crate) struct HeartbeatWorker {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatWorker {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the run loop. Called once, after registration has succeeded.
    ///
    /// A supervisor task awaits the loop and reports at error severity if
    /// it died from a panic; this is observability only.
    pub fn start(&self, ctx: WorkerContext) {
        let attempt_id = ctx.attempt_id;
        let run = tokio::spawn(run_loop(ctx, self.cancel.clone()));
        let supervisor = tokio::spawn(async move {
            if let Err(e) = run.await {
                if e.is_panic() {
                    error!(
                        %attempt_id,
                        error = %e,
                        "heartbeat worker for application attempt crashed"
                    );
                }
            }
        });
        *self.handle.lock().expect("worker handle lock poisoned") = Some(supervisor);
    }

    /// Stop the worker and wait for the in-flight item to finish or abort.
    /// Items still on the queue are never delivered. Idempotent.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .expect("worker handle lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_loop(ctx: WorkerContext, cancel: CancellationToken) {
    let WorkerContext {
        queue,
        master,
        register_request,
        attempt_id,
        principal,
    } = ctx;

    // The resource manager uses the response id to detect resends and
    // return only the delta; the first request carries 0.
    let mut last_response_id: u64 = 0;

    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = queue.take() => item,
        };
        if cancel.is_cancelled() {
            break;
        }

        let mut request = item.request;
        debug!(
            ask = request.ask.len(),
            "sending heartbeat to the resource manager"
        );
        request.response_id = last_response_id;

        match allocate_with_reregister(
            master.as_ref(),
            register_request.clone(),
            attempt_id,
            request,
        )
        .await
        {
            Ok(response) => {
                last_response_id = response.response_id;
                if let Some(token) = &response.amrm_token {
                    debug!(%attempt_id, "received refreshed amrm token");
                    principal.update_token(token.clone());
                }
                debug!(
                    allocated = response.allocated_containers.len(),
                    "received heartbeat reply from the resource manager"
                );
                (item.callback)(response);
            }
            Err(e) => {
                // The re-register policy has already retried once; the
                // item is dropped and the caller learns of the failure by
                // its callback never firing.
                warn!(%attempt_id, error = %e, "error processing heartbeat");
            }
        }
    }

    info!(%attempt_id, "unmanaged application manager stopped, heartbeat worker exiting");
}
