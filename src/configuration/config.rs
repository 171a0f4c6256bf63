use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::debug;

use super::types::{ContainerConfig, Mount};
use crate::container_management::container_manager::system_mounts;
use crate::error_handling::types::ConfigError;

/// Command-line interface of the `contman` binary.
///
/// The binary is a thin layer over [`ContainerManager`]: each subcommand maps
/// onto one manager operation.
///
/// # Examples
///
/// ```text
/// contman pull alpine:3.19
/// contman create --image alpine --cmd 'ls / | wc -l' --env DEBUG=1 --mount /tmp/a:/a:ro
/// contman create --config job.toml --pull
/// ```
///
/// [`ContainerManager`]: crate::container_management::ContainerManager
#[derive(Parser, Debug)]
#[command(name = "contman")]
#[command(version)]
#[command(about = "Provision ephemeral command containers against a Docker daemon")]
pub struct Cli {
    /// Docker client configuration file to read registry credentials from
    ///
    /// Defaults to `$DOCKER_CONFIG/config.json`, then `~/.docker/config.json`,
    /// then `~/.dockercfg`.
    #[arg(long, env = "CONTMAN_DOCKER_CONFIG", global = true)]
    pub docker_config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print whether an image is present locally
    HasImage { image: String },
    /// Pull an image, relaying the daemon's progress to stdout
    Pull { image: String },
    /// Create a command container and print its id
    Create(CreateArgs),
    /// Print the mounts needed by containers that drive the daemon themselves
    SystemMounts,
}

/// Arguments of `contman create`.
///
/// Values given on the command line override those read from `--config`;
/// `--env` and `--mount` entries are added to the file's.
#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// TOML file holding a container configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Image reference to run
    #[arg(long)]
    pub image: Option<String>,

    /// Command string, executed with `sh -c`
    #[arg(long)]
    pub cmd: Option<String>,

    /// Environment variable, repeatable
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Bind mount, repeatable. Mounts are read-write unless suffixed with `:ro`
    #[arg(long = "mount", value_name = "SRC:DST[:ro|:rw]")]
    pub mounts: Vec<String>,

    /// Also mount the daemon socket and the credential directory
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub system_mounts: bool,

    /// Pull the image first unless it is already present
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pull: bool,
}

impl CreateArgs {
    /// Assembles the container configuration described by these arguments.
    pub fn to_container_config(&self) -> Result<ContainerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ContainerConfig::from_file(path)?,
            None => ContainerConfig::default(),
        };

        if let Some(image) = &self.image {
            config.image = image.clone();
        }
        if let Some(cmd) = &self.cmd {
            config.cmd = cmd.clone();
        }
        for entry in &self.env {
            let (key, value) = parse_env(entry)?;
            config.env.insert(key, value);
        }
        for entry in &self.mounts {
            config.mounts.push(parse_mount(entry)?);
        }
        if self.system_mounts {
            config.mounts.extend(system_mounts());
        }

        if config.image.is_empty() {
            return Err(ConfigError::MissingField("image"));
        }
        if config.cmd.is_empty() {
            return Err(ConfigError::MissingField("cmd"));
        }
        Ok(config)
    }
}

impl ContainerConfig {
    /// Reads a container configuration from a TOML file.
    ///
    /// ```toml
    /// image = "alpine"
    /// cmd = "echo hi"
    ///
    /// [env]
    /// X = "1"
    ///
    /// [[mounts]]
    /// source = "/tmp/a"
    /// target = "/a"
    /// read_only = true
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading container configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

/// Parses `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_env(entry: &str) -> Result<(String, String), ConfigError> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(ConfigError::BadEnvFormatting(entry.to_string())),
    }
}

/// Parses `SRC:DST`, `SRC:DST:ro` or `SRC:DST:rw`.
pub fn parse_mount(entry: &str) -> Result<Mount, ConfigError> {
    let bad = || ConfigError::BadMountFormatting(entry.to_string());
    let parts: Vec<&str> = entry.split(':').collect();
    let (source, target, read_only) = match parts.as_slice() {
        [source, target] => (*source, *target, false),
        [source, target, "ro"] => (*source, *target, true),
        [source, target, "rw"] => (*source, *target, false),
        _ => return Err(bad()),
    };
    if source.is_empty() || target.is_empty() {
        return Err(bad());
    }
    Ok(Mount::new(source, target, read_only))
}
