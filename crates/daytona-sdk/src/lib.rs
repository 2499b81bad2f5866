//! Async client for Daytona sandboxes.
//!
//! Lifecycle calls (`start`, `stop`, `wait_for_sandbox_*`) issue the request
//! and then poll the sandbox state until it converges, fails, or the
//! caller's timeout expires.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), daytona_sdk::DaytonaError> {
//! let daytona = daytona_sdk::Daytona::from_env()?;
//! let sandbox = daytona.get("my-sandbox").await?;
//! sandbox.start(Some(40.0)).await?;
//! println!("{} is {:?}", sandbox.id(), sandbox.info().await?.state);
//! # Ok(())
//! # }
//! ```

pub mod api;
mod client;
pub mod config;
mod error;
pub mod http;
mod sandbox;
pub mod timeout;
pub mod types;
pub mod wait;

pub use api::{ApiClient, SandboxApi};
pub use client::Daytona;
pub use config::DaytonaConfig;
pub use error::{DaytonaError, Result, ResultExt, VALIDATION_MARKER};
pub use sandbox::Sandbox;
pub use timeout::{Deadline, with_timeout};
pub use types::{PortPreviewUrl, SandboxInfo, SandboxResources, SandboxTargetRegion, Workspace};
pub use wait::{StatePoller, StateSnapshot, WaitTarget, wait_until};
