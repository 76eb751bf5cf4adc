//! Idempotent, leak-free container orchestration primitives for a single
//! node: deploy/wake/hibernate/delete/stats/logs on the resource bundle
//! belonging to one game server.
//!
//! The [`ContainerEngine`] trait is the seam between the orchestration logic
//! in [`bundle`] and whatever actually talks to a container runtime. The
//! shipped implementation ([`bollard_engine::BollardEngine`]) drives the
//! local Docker daemon; tests drive [`fake_engine::FakeEngine`] instead.

mod bollard_engine;
mod bundle;
mod engine;
mod error;
#[cfg(any(test, feature = "test-util"))]
mod fake_engine;
mod naming;
mod ports;

pub use bollard_engine::BollardEngine;
pub use bundle::{BundleDescriptor, ContainerStats, DeploySpec, Orchestrator};
pub use engine::{ContainerEngine, ContainerSpec, RawStats};
pub use error::OrchestratorError;
#[cfg(any(test, feature = "test-util"))]
pub use fake_engine::FakeEngine;
pub use naming::ResourceNames;
pub use ports::PortAllocator;
