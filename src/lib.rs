//! Cloud Disk E2E Library
//!
//! End-to-end verifier for a cloud-disk file-service backend and a
//! capability probe for the object storage bucket behind it.
//!
//! # Features
//!
//! - **Workflow**: login, auth-gate probe, upload, list, rename, move,
//!   share and cleanup against a live deployment
//! - **Degraded mode**: uploads refused by object storage fall back to an
//!   existing file instead of aborting the run
//! - **Storage probe**: bucket info, write, read and delete of a canary object
//!
//! # Example
//!
//! ```no_run
//! use cloud_disk_e2e::{config::Config, workflow::Workflow};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let report = Workflow::new(config.api)?.run().await?;
//!     println!("finished at {}", report.stage);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod envelope;
pub mod metrics;
pub mod model;
pub mod resolver;
pub mod storage;
pub mod telemetry;
pub mod upload;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use workflow::{Workflow, WorkflowError, WorkflowReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
