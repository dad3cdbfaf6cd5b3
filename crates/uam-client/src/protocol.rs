//! The two RPC surfaces consumed by the UAM client, and the factory seam
//! through which proxies are created.
//!
//! The transport itself lives outside this crate: the calling process
//! supplies a [`ProxyFactory`] and the controller never sees anything but
//! these traits. Tests inject scripted implementations through the same
//! seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::UamConfig;
use crate::error::UamResult;
use crate::principal::{Principal, ProxyPrincipal};
use crate::records::{
    AllocateRequest,
    AllocateResponse,
    ApplicationAttemptId,
    ApplicationAttemptReport,
    ApplicationId,
    ApplicationReport,
    ApplicationSubmissionContext,
    FinishApplicationMasterRequest,
    FinishApplicationMasterResponse,
    KillApplicationResponse,
    RegisterApplicationMasterRequest,
    RegisterApplicationMasterResponse,
};

/// Client protocol, authenticated as the submitter principal.
#[async_trait]
pub trait ApplicationClientProtocol: Send + Sync {
    async fn submit_application(&self, context: ApplicationSubmissionContext) -> UamResult<()>;

    async fn application_report(
        &self,
        application_id: ApplicationId,
    ) -> UamResult<ApplicationReport>;

    async fn application_attempt_report(
        &self,
        attempt_id: ApplicationAttemptId,
    ) -> UamResult<ApplicationAttemptReport>;

    async fn force_kill_application(
        &self,
        application_id: ApplicationId,
    ) -> UamResult<KillApplicationResponse>;
}

/// Master protocol, authenticated as the attempt's proxy principal with
/// the AMRM token.
#[async_trait]
pub trait ApplicationMasterProtocol: Send + Sync {
    async fn register_application_master(
        &self,
        request: RegisterApplicationMasterRequest,
    ) -> UamResult<RegisterApplicationMasterResponse>;

    async fn allocate(&self, request: AllocateRequest) -> UamResult<AllocateResponse>;

    async fn finish_application_master(
        &self,
        request: FinishApplicationMasterRequest,
    ) -> UamResult<FinishApplicationMasterResponse>;
}

/// Builds protocol proxies. The master proxy is bound to the proxy
/// principal, whose token cell carries the AMRM token (and any later
/// rotations).
#[async_trait]
pub trait ProxyFactory: Send + Sync {
    async fn client_proxy(
        &self,
        config: &UamConfig,
        principal: &Principal,
    ) -> UamResult<Arc<dyn ApplicationClientProtocol>>;

    async fn master_proxy(
        &self,
        config: &UamConfig,
        principal: &ProxyPrincipal,
    ) -> UamResult<Arc<dyn ApplicationMasterProtocol>>;
}
