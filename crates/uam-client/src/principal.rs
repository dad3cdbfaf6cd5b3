//! Principals for the two RPC surfaces. The calling process supplies its
//! identity explicitly; there is no ambient current-user lookup.

use std::sync::{Arc, RwLock};

use crate::error::{UamError, UamResult};
use crate::records::AmRmToken;

/// A named remote principal. The submitter principal authenticates
/// client-protocol calls.
#[derive(Debug, Clone)]
pub struct Principal {
    name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> UamResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(UamError::InvalidArgument(
                "principal name must not be blank".to_string(),
            ));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A proxy principal labelled with the attempt id, acting on behalf of the
/// real principal. Carries the AMRM token authorising master-protocol
/// calls.
///
/// Clones share the token cell: the heartbeat worker applies refreshed
/// tokens through [`ProxyPrincipal::update_token`] and the proxy sees the
/// new credential on its next call.
#[derive(Debug, Clone)]
pub struct ProxyPrincipal {
    user: String,
    real_user: Principal,
    token: Arc<RwLock<Option<AmRmToken>>>,
}

impl ProxyPrincipal {
    /// Derive a proxy principal for `label` acting on behalf of `real_user`.
    pub fn derive(label: impl Into<String>, real_user: &Principal) -> UamResult<Self> {
        let user = label.into();
        if user.trim().is_empty() {
            return Err(UamError::CredentialFailure(
                "proxy principal label must not be blank".to_string(),
            ));
        }
        Ok(Self {
            user,
            real_user: real_user.clone(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn real_user(&self) -> &Principal {
        &self.real_user
    }

    /// Replace the AMRM token. Called once after the attempt launches and
    /// again whenever the resource manager rotates the token on an
    /// allocate response.
    pub fn update_token(&self, token: AmRmToken) {
        *self.token.write().expect("token lock poisoned") = Some(token);
    }

    pub fn token(&self) -> Option<AmRmToken> {
        self.token.read().expect("token lock poisoned").clone()
    }
}
