use std::fmt;

use bollard::errors::Error as BollardError;

/// Failure of a single call against the container daemon.
#[derive(Debug)]
pub enum DaemonError {
    /// The daemon (or the client talking to it) reported an error.
    Api(BollardError),
    /// The manager's operation context was cancelled before the call completed.
    Cancelled,
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonError::Api(e) => write!(f, "Daemon API error: {}", e),
            DaemonError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DaemonError::Api(e) => Some(e),
            DaemonError::Cancelled => None,
        }
    }
}

impl From<BollardError> for DaemonError {
    fn from(err: BollardError) -> Self {
        DaemonError::Api(err)
    }
}

/// Reasons an image reference can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    Empty,
    InvalidFormat(String),
    NameTooLong(String),
    NameNotLowercase(String),
    HexIdentifier(String),
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceError::Empty => write!(f, "repository name must have at least one component"),
            ReferenceError::InvalidFormat(r) => write!(f, "invalid reference format: {}", r),
            ReferenceError::NameTooLong(r) => {
                write!(f, "repository name must not be more than 255 characters: {}", r)
            }
            ReferenceError::NameNotLowercase(r) => {
                write!(f, "invalid reference format: repository name must be lowercase: {}", r)
            }
            ReferenceError::HexIdentifier(r) => write!(
                f,
                "invalid repository name ({}), cannot specify 64-byte hexadecimal strings",
                r
            ),
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Failure while building or issuing a container create call.
#[derive(Debug)]
pub enum CreateError {
    /// The caller's working directory could not be resolved.
    WorkingDirectory(std::io::Error),
    Daemon(DaemonError),
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::WorkingDirectory(e) => {
                write!(f, "Unable to resolve working directory: {}", e)
            }
            CreateError::Daemon(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CreateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CreateError::WorkingDirectory(e) => Some(e),
            CreateError::Daemon(e) => Some(e),
        }
    }
}

#[derive(Debug)]
pub enum ContainerError {
    /// The daemon client could not be constructed. Fatal to the manager.
    ConnectionFailed(BollardError),
    InvalidReference(ReferenceError),
    PullFailed(DaemonError),
    CreationFailed(CreateError),
    /// Listing local images failed. `has_image` swallows this one.
    ListFailed(DaemonError),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::ConnectionFailed(e) => write!(f, "Daemon connection failed: {}", e),
            ContainerError::InvalidReference(e) => write!(f, "Cannot parse image name: {}", e),
            ContainerError::PullFailed(e) => write!(f, "Image pull failed: {}", e),
            ContainerError::CreationFailed(e) => write!(f, "Container creation failed: {}", e),
            ContainerError::ListFailed(e) => write!(f, "Image listing failed: {}", e),
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::ConnectionFailed(e) => Some(e),
            ContainerError::InvalidReference(e) => Some(e),
            ContainerError::PullFailed(e) => Some(e),
            ContainerError::CreationFailed(e) => Some(e),
            ContainerError::ListFailed(e) => Some(e),
        }
    }
}

impl From<ReferenceError> for ContainerError {
    fn from(err: ReferenceError) -> Self {
        ContainerError::InvalidReference(err)
    }
}

impl From<CreateError> for ContainerError {
    fn from(err: CreateError) -> Self {
        ContainerError::CreationFailed(err)
    }
}

/// Errors raised while assembling a run from the command line or a config file.
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    JsonError(String),
    MissingField(&'static str),
    BadEnvFormatting(String),
    BadMountFormatting(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::JsonError(e) => write!(f, "JSON parsing error: {}", e),
            ConfigError::MissingField(name) => write!(f, "Missing required field: {}", name),
            ConfigError::BadEnvFormatting(e) => {
                write!(f, "Environment formatting error (expected KEY=VALUE): {}", e)
            }
            ConfigError::BadMountFormatting(e) => {
                write!(f, "Mount formatting error (expected SRC:DST[:ro|:rw]): {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn container_error_exposes_its_cause() {
        let err = ContainerError::from(CreateError::WorkingDirectory(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        )));
        assert!(err.to_string().starts_with("Container creation failed"));
        let source = err.source().expect("creation failure should carry a source");
        assert!(source.to_string().contains("gone"));
    }

    #[test]
    fn cancelled_daemon_error_has_no_source() {
        let err = DaemonError::Cancelled;
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "Operation cancelled");
    }

    #[test]
    fn reference_error_converts_into_invalid_reference() {
        let err: ContainerError = ReferenceError::Empty.into();
        assert!(matches!(
            err,
            ContainerError::InvalidReference(ReferenceError::Empty)
        ));
    }
}
