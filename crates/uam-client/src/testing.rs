//! Scripted protocol implementations shared by module tests. The client
//! protocol steps through a scripted state timeline; the master protocol
//! records the order of calls it observes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::UamConfig;
use crate::error::{UamError, UamResult};
use crate::principal::{Principal, ProxyPrincipal};
use crate::protocol::{ApplicationClientProtocol, ApplicationMasterProtocol, ProxyFactory};
use crate::records::{
    AllocateRequest,
    AllocateResponse,
    AmRmToken,
    ApplicationAttemptId,
    ApplicationAttemptReport,
    ApplicationAttemptState,
    ApplicationId,
    ApplicationReport,
    ApplicationState,
    ApplicationSubmissionContext,
    Container,
    ContainerId,
    FinishApplicationMasterRequest,
    FinishApplicationMasterResponse,
    KillApplicationResponse,
    RegisterApplicationMasterRequest,
    RegisterApplicationMasterResponse,
    Resource,
};

pub(crate) fn test_app_id() -> ApplicationId {
    ApplicationId::new(1700000000, 1)
}

pub(crate) fn test_attempt_id() -> ApplicationAttemptId {
    ApplicationAttemptId::new(test_app_id(), 1)
}

pub(crate) fn test_token(tag: u8) -> AmRmToken {
    AmRmToken {
        identifier: vec![tag],
        password: vec![tag, tag],
    }
}

/// Client protocol driven by scripted state timelines. Each
/// `application_report` call consumes the next application state until one
/// remains, which then repeats; attempt states behave the same way.
pub(crate) struct ScriptedClient {
    app_states: Mutex<VecDeque<ApplicationState>>,
    attempt_states: Mutex<VecDeque<ApplicationAttemptState>>,
    current_attempt: Mutex<Option<ApplicationAttemptId>>,
    amrm_token: Mutex<Option<AmRmToken>>,
    pub submitted: Mutex<Vec<ApplicationSubmissionContext>>,
    pub kill_count: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(
        app_states: Vec<ApplicationState>,
        attempt_states: Vec<ApplicationAttemptState>,
    ) -> Arc<Self> {
        Arc::new(Self {
            app_states: Mutex::new(app_states.into()),
            attempt_states: Mutex::new(attempt_states.into()),
            current_attempt: Mutex::new(Some(test_attempt_id())),
            amrm_token: Mutex::new(Some(test_token(1))),
            submitted: Mutex::new(Vec::new()),
            kill_count: AtomicUsize::new(0),
        })
    }

    /// A client whose application goes Submitted -> Accepted and whose
    /// attempt launches on the second attempt poll.
    pub fn launching() -> Arc<Self> {
        Self::new(
            vec![ApplicationState::Submitted, ApplicationState::Accepted],
            vec![
                ApplicationAttemptState::Scheduled,
                ApplicationAttemptState::Launched,
            ],
        )
    }

    pub fn with_current_attempt(self: Arc<Self>, attempt: Option<ApplicationAttemptId>) -> Arc<Self> {
        *self.current_attempt.lock().unwrap() = attempt;
        self
    }

    pub fn with_amrm_token(self: Arc<Self>, token: Option<AmRmToken>) -> Arc<Self> {
        *self.amrm_token.lock().unwrap() = token;
        self
    }

    fn next_app_state(&self) -> ApplicationState {
        let mut states = self.app_states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            *states.front().expect("app state script exhausted")
        }
    }

    fn next_attempt_state(&self) -> ApplicationAttemptState {
        let mut states = self.attempt_states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            *states.front().expect("attempt state script exhausted")
        }
    }
}

#[async_trait]
impl ApplicationClientProtocol for ScriptedClient {
    async fn submit_application(&self, context: ApplicationSubmissionContext) -> UamResult<()> {
        self.submitted.lock().unwrap().push(context);
        Ok(())
    }

    async fn application_report(
        &self,
        application_id: ApplicationId,
    ) -> UamResult<ApplicationReport> {
        Ok(ApplicationReport {
            application_id,
            state: self.next_app_state(),
            current_attempt_id: *self.current_attempt.lock().unwrap(),
            amrm_token: self.amrm_token.lock().unwrap().clone(),
        })
    }

    async fn application_attempt_report(
        &self,
        attempt_id: ApplicationAttemptId,
    ) -> UamResult<ApplicationAttemptReport> {
        Ok(ApplicationAttemptReport {
            attempt_id,
            state: self.next_attempt_state(),
        })
    }

    async fn force_kill_application(
        &self,
        _application_id: ApplicationId,
    ) -> UamResult<KillApplicationResponse> {
        self.kill_count.fetch_add(1, Ordering::SeqCst);
        Ok(KillApplicationResponse {
            is_kill_completed: true,
        })
    }
}

/// Ordered record of the calls a [`ScriptedMaster`] has served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MasterEvent {
    Register,
    /// Carries the `response_id` the request arrived with.
    Allocate(u64),
    Finish,
}

/// Master protocol that echoes `response_id + 1` on allocate and records
/// the order of calls. A session-lost fuse makes the next N allocate (or
/// finish) calls fail as the resource manager would after fencing the
/// attempt.
pub(crate) struct ScriptedMaster {
    pub events: Mutex<Vec<MasterEvent>>,
    pub allocate_session_lost_fuse: AtomicUsize,
    pub finish_session_lost_fuse: AtomicUsize,
    /// Token handed out on the next allocate response, simulating rotation.
    pub next_token: Mutex<Option<AmRmToken>>,
}

impl ScriptedMaster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            allocate_session_lost_fuse: AtomicUsize::new(0),
            finish_session_lost_fuse: AtomicUsize::new(0),
            next_token: Mutex::new(None),
        })
    }

    pub fn events(&self) -> Vec<MasterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, matcher: impl Fn(&MasterEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matcher(e)).count()
    }

    pub fn register_count(&self) -> usize {
        self.count(|e| matches!(e, MasterEvent::Register))
    }

    pub fn allocate_count(&self) -> usize {
        self.count(|e| matches!(e, MasterEvent::Allocate(_)))
    }

    fn blow_fuse(fuse: &AtomicUsize) -> bool {
        fuse.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ApplicationMasterProtocol for ScriptedMaster {
    async fn register_application_master(
        &self,
        _request: RegisterApplicationMasterRequest,
    ) -> UamResult<RegisterApplicationMasterResponse> {
        self.events.lock().unwrap().push(MasterEvent::Register);
        Ok(RegisterApplicationMasterResponse {
            queue: "default".to_string(),
            maximum_resource_capability: Resource::new(8192, 4),
        })
    }

    async fn allocate(&self, request: AllocateRequest) -> UamResult<AllocateResponse> {
        if Self::blow_fuse(&self.allocate_session_lost_fuse) {
            return Err(UamError::SessionLost(
                "application attempt unknown".to_string(),
            ));
        }
        self.events
            .lock()
            .unwrap()
            .push(MasterEvent::Allocate(request.response_id));
        Ok(AllocateResponse {
            response_id: request.response_id + 1,
            allocated_containers: vec![Container {
                id: ContainerId(request.response_id),
                resource: Resource::new(1024, 1),
            }],
            amrm_token: self.next_token.lock().unwrap().take(),
        })
    }

    async fn finish_application_master(
        &self,
        _request: FinishApplicationMasterRequest,
    ) -> UamResult<FinishApplicationMasterResponse> {
        if Self::blow_fuse(&self.finish_session_lost_fuse) {
            return Err(UamError::SessionLost(
                "application attempt unknown".to_string(),
            ));
        }
        self.events.lock().unwrap().push(MasterEvent::Finish);
        Ok(FinishApplicationMasterResponse::new(true))
    }
}

/// Factory handing out the scripted protocols above.
pub(crate) struct ScriptedFactory {
    pub client: Arc<ScriptedClient>,
    pub master: Arc<ScriptedMaster>,
    pub client_proxies_created: AtomicUsize,
    pub master_proxies_created: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(client: Arc<ScriptedClient>, master: Arc<ScriptedMaster>) -> Arc<Self> {
        Arc::new(Self {
            client,
            master,
            client_proxies_created: AtomicUsize::new(0),
            master_proxies_created: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProxyFactory for ScriptedFactory {
    async fn client_proxy(
        &self,
        _config: &UamConfig,
        _principal: &Principal,
    ) -> UamResult<Arc<dyn ApplicationClientProtocol>> {
        self.client_proxies_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }

    async fn master_proxy(
        &self,
        _config: &UamConfig,
        _principal: &ProxyPrincipal,
    ) -> UamResult<Arc<dyn ApplicationMasterProtocol>> {
        self.master_proxies_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.master.clone())
    }
}
