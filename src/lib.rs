pub mod configuration;
pub mod container_management;
pub mod error_handling;

pub use configuration::{ContainerConfig, Mount};
pub use container_management::{ContainerHandle, ContainerManager};
pub use error_handling::types::ContainerError;
