//! Google Cloud provider for gateflow
//!
//! Implements [`gateflow_cloud::CloudProvider`] on top of the `gcloud` CLI:
//! Cloud Functions, API Gateway APIs, API configs, gateways and API keys.
//!
//! # Requirements
//!
//! - The Google Cloud SDK (`gcloud`, or `gcloud.cmd` on Windows) on `PATH`
//! - An active account (`gcloud auth login`)
//!
//! # Example
//!
//! ```ignore
//! use gateflow_cloud::{CloudProvider, Orchestrator};
//! use gateflow_cloud_gcp::GcpProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(GcpProvider::new("my-project"));
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! let result = Orchestrator::new(provider).apply(&groups).await;
//! ```

pub mod error;
pub mod gcloud;
pub mod provider;

pub use error::{GcpError, Result};
pub use gcloud::{Description, Gcloud, default_program};
pub use provider::GcpProvider;
