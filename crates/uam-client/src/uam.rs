//! The unmanaged application master controller.
//!
//! Submits a placeholder application, waits for the resource manager to
//! launch the first attempt, registers as that attempt's master, and
//! drives the asynchronous allocate loop through the heartbeat worker.
//! Allocate calls are handled asynchronously: requests land on the
//! request queue and the caller's callback fires from the worker task.

use std::sync::{Arc, OnceLock, RwLock};

use tracing::{info, warn};

use crate::config::UamConfig;
use crate::error::{UamError, UamResult};
use crate::monitor::{monitor_current_app_attempt, TERMINAL_OR_ACCEPTED};
use crate::principal::{Principal, ProxyPrincipal};
use crate::protocol::{ApplicationClientProtocol, ApplicationMasterProtocol, ProxyFactory};
use crate::queue::{PendingAllocate, RequestQueue};
use crate::records::{
    AllocateRequest,
    AllocateResponse,
    ApplicationAttemptId,
    ApplicationAttemptState,
    ApplicationId,
    ApplicationSubmissionContext,
    ContainerLaunchContext,
    FinishApplicationMasterRequest,
    FinishApplicationMasterResponse,
    KillApplicationResponse,
    RegisterApplicationMasterRequest,
    RegisterApplicationMasterResponse,
    Resource,
    UamIdentifier,
};
use crate::reregister::finish_with_reregister;
use crate::worker::{HeartbeatWorker, WorkerContext};

const APP_NAME: &str = "UnmanagedAM";

/// Registers an unmanaged application master and negotiates resources
/// from the resource manager on its behalf.
///
/// Lifecycle: [`create_and_register`](Self::create_and_register) once,
/// any number of [`allocate_async`](Self::allocate_async) calls, then a
/// terminal [`finish`](Self::finish) or [`force_kill`](Self::force_kill).
/// There is no restart after a terminal call.
pub struct UnmanagedApplicationManager {
    config: UamConfig,
    application_id: ApplicationId,
    queue_name: Option<String>,
    submitter: Principal,
    app_name_suffix: String,
    factory: Arc<dyn ProxyFactory>,

    queue: Arc<RequestQueue>,
    worker: HeartbeatWorker,

    /// Stashed at the top of `create_and_register`. Non-empty signals to
    /// concurrent callers that registration is in flight (possibly still
    /// blocked on the resource manager); the re-register policy replays it.
    register_request: RwLock<Option<RegisterApplicationMasterRequest>>,
    /// Set exactly once, after the attempt has launched.
    attempt_id: OnceLock<ApplicationAttemptId>,
    /// Set exactly once, only after registration has succeeded.
    master_proxy: OnceLock<Arc<dyn ApplicationMasterProtocol>>,
    /// Lazily created client proxy used by `force_kill`.
    client_proxy: tokio::sync::Mutex<Option<Arc<dyn ApplicationClientProtocol>>>,
}

impl UnmanagedApplicationManager {
    pub fn new(
        config: UamConfig,
        application_id: ApplicationId,
        queue_name: Option<String>,
        submitter: Principal,
        app_name_suffix: impl Into<String>,
        factory: Arc<dyn ProxyFactory>,
    ) -> UamResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            application_id,
            queue_name,
            submitter,
            app_name_suffix: app_name_suffix.into(),
            factory,
            queue: Arc::new(RequestQueue::new()),
            worker: HeartbeatWorker::new(),
            register_request: RwLock::new(None),
            attempt_id: OnceLock::new(),
            master_proxy: OnceLock::new(),
            client_proxy: tokio::sync::Mutex::new(None),
        })
    }

    /// Submit the placeholder application, wait for its first attempt to
    /// launch, and register as that attempt's master. Blocking; may take
    /// seconds while the resource manager schedules the attempt.
    ///
    /// On success the heartbeat worker is running and queued allocate
    /// requests start draining. On failure the worker is never started
    /// and the instance is unusable except to release resources.
    pub async fn create_and_register(
        &self,
        request: RegisterApplicationMasterRequest,
    ) -> UamResult<RegisterApplicationMasterResponse> {
        {
            let mut stash = self
                .register_request
                .write()
                .expect("register request lock poisoned");
            if stash.is_some() {
                return Err(UamError::InvalidArgument(
                    "create_and_register may only be called once".to_string(),
                ));
            }
            *stash = Some(request.clone());
        }

        let identifier = self.initialize_unmanaged_am().await?;

        let proxy_user = ProxyPrincipal::derive(identifier.attempt_id.to_string(), &self.submitter)?;
        if let Some(token) = identifier.token.clone() {
            proxy_user.update_token(token);
        }

        let master = self.factory.master_proxy(&self.config, &proxy_user).await?;

        info!(
            attempt_id = %identifier.attempt_id,
            "registering the unmanaged application master"
        );
        let response = master.register_application_master(request.clone()).await?;

        // Only when register succeeds does the heartbeat worker start.
        let _ = self.master_proxy.set(master.clone());
        self.worker.start(WorkerContext {
            queue: self.queue.clone(),
            master,
            register_request: request,
            attempt_id: identifier.attempt_id,
            principal: proxy_user,
        });

        Ok(response)
    }

    /// Queue a heartbeat request; the callback fires from the worker task
    /// with the allocate response.
    ///
    /// Never drops a request: it is queued even while registration is
    /// still in flight and is served once registration completes. Fails
    /// only when `create_and_register` was never called at all.
    pub fn allocate_async(
        &self,
        request: AllocateRequest,
        callback: impl FnOnce(AllocateResponse) + Send + 'static,
    ) -> UamResult<()> {
        self.queue.push(PendingAllocate {
            request,
            callback: Box::new(callback),
        });

        if self.master_proxy.get().is_some() {
            return Ok(());
        }
        if self
            .register_request
            .read()
            .expect("register request lock poisoned")
            .is_some()
        {
            info!(
                application_id = %self.application_id,
                "unmanaged AM not successfully registered yet, saving the allocate request to send later"
            );
            return Ok(());
        }
        Err(UamError::NotRegistered(
            "allocate_async must not be called before create_and_register".to_string(),
        ))
    }

    /// Unregister from the resource manager and stop the heartbeat
    /// worker. Queued requests that have not been sent are dropped.
    pub async fn finish(
        &self,
        request: FinishApplicationMasterRequest,
    ) -> UamResult<FinishApplicationMasterResponse> {
        self.worker.stop().await;

        let Some(master) = self.master_proxy.get() else {
            if self
                .register_request
                .read()
                .expect("register request lock poisoned")
                .is_some()
            {
                // Registration is still blocked or has failed on another
                // task. Report not-unregistered so the caller can decide.
                warn!(
                    application_id = %self.application_id,
                    "unmanaged AM not successfully launched or registered yet, stopping the client anyway"
                );
                return Ok(FinishApplicationMasterResponse::new(false));
            }
            return Err(UamError::NotRegistered(
                "finish must not be called before create_and_register".to_string(),
            ));
        };

        let register_request = self
            .register_request
            .read()
            .expect("register request lock poisoned")
            .clone()
            .expect("register request is stashed before the master proxy exists");
        let attempt_id = *self
            .attempt_id
            .get()
            .expect("attempt id is recorded before the master proxy exists");
        finish_with_reregister(master.as_ref(), register_request, attempt_id, request).await
    }

    /// Ask the resource manager to kill the placeholder application.
    /// Issued on the client protocol under the submitter principal.
    pub async fn force_kill(&self) -> UamResult<KillApplicationResponse> {
        self.worker.stop().await;

        let client = {
            let mut slot = self.client_proxy.lock().await;
            match slot.as_ref() {
                Some(client) => client.clone(),
                None => {
                    let client = self
                        .factory
                        .client_proxy(&self.config, &self.submitter)
                        .await?;
                    *slot = Some(client.clone());
                    client
                }
            }
        };
        client.force_kill_application(self.application_id).await
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    /// The attempt this UAM registered for; `None` until the attempt has
    /// launched.
    pub fn attempt_id(&self) -> Option<ApplicationAttemptId> {
        self.attempt_id.get().copied()
    }

    /// Depth of the request queue.
    pub fn pending_request_count(&self) -> usize {
        self.queue.len()
    }

    /// Submit the placeholder application and wait for its first attempt
    /// to launch. The client proxy lives only for the duration of this
    /// call; `force_kill` creates its own.
    async fn initialize_unmanaged_am(&self) -> UamResult<UamIdentifier> {
        let client = self
            .factory
            .client_proxy(&self.config, &self.submitter)
            .await?;

        self.submit_unmanaged_app(client.as_ref()).await?;

        let attempt_report = monitor_current_app_attempt(
            client.as_ref(),
            self.application_id,
            TERMINAL_OR_ACCEPTED,
            ApplicationAttemptState::Launched,
            self.config.poll_interval(),
            self.config.attempt_launch_timeout(),
        )
        .await?;

        let attempt_id = attempt_report.attempt_id;
        let _ = self.attempt_id.set(attempt_id);

        let token = client
            .application_report(self.application_id)
            .await?
            .amrm_token;
        if token.is_none() {
            warn!(
                application_id = %self.application_id,
                "amrm token not found in the application report"
            );
        }
        Ok(UamIdentifier { attempt_id, token })
    }

    async fn submit_unmanaged_app(&self, client: &dyn ApplicationClientProtocol) -> UamResult<()> {
        let queue = match &self.queue_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.config.default_queue_name.clone(),
        };
        let context = ApplicationSubmissionContext {
            application_id: self.application_id,
            application_name: format!("{}-{}", APP_NAME, self.app_name_suffix),
            queue,
            // Minimal ask; the unmanaged AM itself consumes nothing from
            // the cluster.
            resource: Resource::new(1024, 1),
            am_container_spec: ContainerLaunchContext::default(),
            unmanaged_am: true,
        };
        info!(application_id = %self.application_id, "submitting unmanaged application");
        client.submit_application(context).await
    }
}
