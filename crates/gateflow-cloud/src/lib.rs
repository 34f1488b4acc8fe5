//! gateflow cloud provisioning core
//!
//! Declares the resources of a function + API gateway stack, applies them in
//! dependency order through a provider abstraction, and mints access keys
//! for the resulting gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  gateflow CLI                    │
//! │          (deploy / create-keys / plan)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                gateflow-cloud                    │
//! │  ┌──────────────┐ ┌──────────────┐ ┌─────────┐  │
//! │  │ Graph builder│→│ Orchestrator │→│ KeyIssuer│  │
//! │  └──────────────┘ └──────┬───────┘ └────┬────┘  │
//! │          trait CloudProvider { ... }    │        │
//! └──────────────────────────┬──────────────┴───────┘
//!                            │
//!            ┌───────────────┴──────────────┐
//!    ┌───────▼───────┐              ┌───────▼───────┐
//!    │  gcp (gcloud) │              │    memory     │
//!    └───────────────┘              └───────────────┘
//! ```

pub mod credentials;
pub mod error;
pub mod graph;
pub mod memory;
pub mod orchestrator;
pub mod provider;
pub mod readiness;
pub mod resource;
pub mod result;

// Re-exports
pub use credentials::{IssuedKey, KeyIssuer, KeyRequest, KeyScope};
pub use error::{CloudError, Result};
pub use graph::{ResourceGraph, ResourceGroup, build, layer};
pub use memory::MemoryProvider;
pub use orchestrator::{DEFAULT_CONCURRENCY, Orchestrator};
pub use provider::{AuthStatus, CloudProvider, ResourceDescriptor};
pub use readiness::PollConfig;
pub use resource::{
    CreateOutcome, ParamValue, Parameters, ResourceError, ResourceKind, ResourceSpec,
    ResourceState, ResourceStatus,
};
pub use result::{DeploymentResult, DeploymentStatus, DeploymentSummary};
pub use tokio_util::sync::CancellationToken;
