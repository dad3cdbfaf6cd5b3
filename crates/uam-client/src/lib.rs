//! Unmanaged application master (UAM) client.
//!
//! Lets a process that was not launched by the cluster resource manager
//! act as an application master: it submits a placeholder application,
//! waits for the first attempt to launch, registers against the master
//! protocol, and heartbeats asynchronously through a background worker.
//! The RPC transport is supplied by the caller through [`ProxyFactory`].

pub mod config;
pub mod error;
pub mod principal;
pub mod protocol;
pub mod records;
pub mod uam;

mod monitor;
mod queue;
mod reregister;
mod worker;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use config::UamConfig;
pub use error::{UamError, UamResult};
pub use principal::{Principal, ProxyPrincipal};
pub use protocol::{ApplicationClientProtocol, ApplicationMasterProtocol, ProxyFactory};
pub use records::UamIdentifier;
pub use uam::UnmanagedApplicationManager;
