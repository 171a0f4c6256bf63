//! Container management subsystem.
//!
//! This module mediates every interaction with a Docker-compatible daemon:
//! checking for and pulling images, resolving registry credentials, and
//! translating a [`ContainerConfig`] into a created container.
//!
//! Re-exports:
//! - [`ContainerManager`]: main entry point.
//! - [`ContainerHandle`]: returned by [`ContainerManager::container_create`].
//! - [`DockerDaemon`]: the daemon seam, implemented for [`bollard::Docker`].
//! - [`ImageReference`], [`Credentials`]: reference parsing and auth types.
//!
//! Example (non-running):
//! ```ignore
//! use contman::configuration::ContainerConfig;
//! use contman::container_management::ContainerManager;
//!
//! let manager = ContainerManager::new().await?;
//! if !manager.has_image("alpine").await {
//!     manager.pull_image("alpine").await?;
//! }
//! let config = ContainerConfig {
//!     image: "alpine".into(),
//!     cmd: "echo hi".into(),
//!     ..Default::default()
//! };
//! let handle = manager.container_create(config).await?;
//! println!("created {}", handle.id());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`ContainerConfig`]: crate::configuration::ContainerConfig

pub mod auth;
pub mod connection;
pub mod container_manager;
pub mod daemon;
#[cfg(test)]
pub mod integration_tests;
pub mod reference;
pub mod types;

pub use auth::{credentials_for, Credentials};
pub use container_manager::{system_mounts, ContainerManager};
pub use daemon::DockerDaemon;
pub use reference::ImageReference;
pub use types::ContainerHandle;
