pub mod config;
pub mod types;

pub use config::{Cli, Command, CreateArgs};
pub use types::{ContainerConfig, Mount};
