use std::path::PathBuf;
use std::sync::Arc;

use bollard::models::{
    ContainerCreateBody, CreateImageInfo, HostConfig, ImageSummary, Mount as DaemonMount,
    MountTypeEnum,
};
use bollard::errors::Error as BollardError;
use bollard::Docker;
use log::{debug, error, info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::configuration::types::{ContainerConfig, Mount};
use crate::container_management::auth;
use crate::container_management::connection::Connection;
use crate::container_management::daemon::DockerDaemon;
use crate::container_management::reference::{with_default_tag, ImageReference};
use crate::container_management::types::ContainerHandle;
use crate::error_handling::types::{ContainerError, CreateError, DaemonError};

/// Shell used as the entrypoint of every container.
pub const SHELL: &str = "sh";
pub const HOST_NETWORK_MODE: &str = "host";

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const DOCKER_CONFIG_DIR: &str = "/root/.docker";

/// Mediates every interaction with the container daemon.
///
/// The manager owns one [`Connection`] for its whole lifetime. Image checks,
/// pulls and container creation all go through it, and [`shutdown`] cancels
/// whatever is still in flight.
///
/// Design notes:
/// - Every public operation is a single blocking round-trip (or, for pulls, a
///   single streamed response). Nothing is retried.
/// - The manager holds no mutable state, so it can be shared behind an `Arc`
///   and used from several tasks at once.
///
/// [`shutdown`]: ContainerManager::shutdown
pub struct ContainerManager<D: DockerDaemon = Docker> {
    connection: Arc<Connection<D>>,
    docker_config: Option<PathBuf>,
}

impl ContainerManager<Docker> {
    /// Connects to the daemon described by the environment and negotiates the
    /// API version. `DOCKER_HOST` may be a `unix://`, `tcp://` or `http://`
    /// URL; with `DOCKER_TLS_VERIFY` set, `tcp://` hosts use the certificates
    /// in `DOCKER_CERT_PATH`. Without `DOCKER_HOST` the platform's default
    /// socket is used.
    ///
    /// Returns [`ContainerError::ConnectionFailed`] if no client can be built,
    /// including when `DOCKER_HOST` has an unsupported scheme.
    pub async fn new() -> Result<Self, ContainerError> {
        info!("Initializing ContainerManager");

        let docker = Docker::connect_with_defaults().map_err(|e| {
            error!("Unable to create daemon client: {}", e);
            ContainerError::ConnectionFailed(e)
        })?;

        // Negotiation is best-effort: keep the client default if it fails.
        let docker = match docker.clone().negotiate_version().await {
            Ok(negotiated) => {
                debug!("Negotiated daemon API version");
                negotiated
            }
            Err(e) => {
                warn!("Daemon API version negotiation failed, using client default: {}", e);
                docker
            }
        };

        info!("ContainerManager initialized successfully");
        Ok(Self::with_daemon(docker))
    }
}

impl<D: DockerDaemon> ContainerManager<D> {
    /// Builds a manager around an already constructed daemon client.
    pub fn with_daemon(daemon: D) -> Self {
        ContainerManager {
            connection: Arc::new(Connection::new(daemon)),
            docker_config: None,
        }
    }

    /// Reads registry credentials from `path` instead of the default
    /// Docker client configuration locations.
    pub fn with_docker_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.docker_config = Some(path.into());
        self
    }

    /// A child of the manager's operation context. It is cancelled on
    /// [`shutdown`](Self::shutdown) and can be cancelled independently.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.connection.token().child_token()
    }

    /// Cancels the operation context. In-flight and later daemon calls fail
    /// with a cancellation error.
    pub fn shutdown(&self) {
        info!("Shutting down ContainerManager");
        self.connection.cancel();
    }

    /// Whether `handle` was created by this manager.
    pub fn owns(&self, handle: &ContainerHandle<D>) -> bool {
        Arc::ptr_eq(&self.connection, handle.connection())
    }

    /// Checks whether `image` is present locally.
    ///
    /// An untagged reference is compared as `<image>:latest`. Listing failures
    /// are logged and reported as "absent", so callers fall through to a pull.
    pub async fn has_image(&self, image: &str) -> bool {
        if image.is_empty() {
            return false;
        }
        let wanted = with_default_tag(image);

        let images = match self.list_images().await {
            Ok(images) => images,
            Err(e) => {
                error!("Unable to list images: {}", e);
                return false;
            }
        };

        let found = images
            .iter()
            .any(|summary| summary.repo_tags.iter().any(|tag| *tag == *wanted));
        debug!("Image lookup for {}: {}", wanted, if found { "found" } else { "not found" });
        found
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, ContainerError> {
        self.connection
            .call(self.connection.daemon().list_images())
            .await
            .map_err(ContainerError::ListFailed)
    }

    /// Pulls `image`, relaying the daemon's progress messages to standard output.
    pub async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        let mut stdout = tokio::io::stdout();
        self.pull_image_to(image, &mut stdout).await
    }

    /// Pulls `image`, writing each progress message as one JSON line to `sink`.
    ///
    /// The reference is validated before anything is sent to the daemon.
    /// Registry credentials come from the local Docker configuration and fall
    /// back to anonymous access. Write errors on `sink` are logged and do not
    /// fail the pull.
    ///
    /// Lines are re-encoded from the client's progress model, so key order
    /// may differ from the daemon's output and fields the model does not know
    /// (`from`, `time`, `aux`) are dropped. An error line from the daemon is
    /// relayed as `{"error": ...}` and fails the pull with
    /// [`ContainerError::PullFailed`].
    pub async fn pull_image_to<W>(&self, image: &str, sink: &mut W) -> Result<(), ContainerError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let reference = ImageReference::parse_normalized(image).map_err(|e| {
            error!("Cannot parse image name {}: {}", image, e);
            ContainerError::InvalidReference(e)
        })?;

        let credentials = auth::credentials_for(reference.domain(), self.docker_config.as_deref());
        debug!(
            "Pulling {} from {} ({} credentials)",
            reference,
            reference.domain(),
            if credentials.is_anonymous() { "anonymous" } else { "stored" }
        );

        if self.connection.is_cancelled() {
            return Err(ContainerError::PullFailed(DaemonError::Cancelled));
        }
        let mut progress = self.connection.daemon().pull_image(
            &reference.familiar_name(),
            reference.api_tag(),
            credentials.to_docker_credentials(),
        );

        let mut started = false;
        let mut relaying = true;
        let mut outcome = Ok(());
        loop {
            let message = match self.connection.next_item(&mut progress).await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                // Error lines in the daemon's progress stream surface as stream
                // errors; relay them like any other line, then fail the pull.
                Err(DaemonError::Api(BollardError::DockerStreamError { error })) => {
                    let line = CreateImageInfo {
                        error: Some(error.clone()),
                        ..CreateImageInfo::default()
                    };
                    if relaying {
                        if let Err(e) = relay_progress(sink, &line).await {
                            warn!("Stopped relaying pull progress for {}: {}", image, e);
                            relaying = false;
                        }
                    }
                    error!("Daemon reported an error pulling {}: {}", image, error);
                    outcome = Err(ContainerError::PullFailed(DaemonError::Api(
                        BollardError::DockerStreamError { error },
                    )));
                    break;
                }
                Err(e) if started && !matches!(e, DaemonError::Cancelled) => {
                    warn!("Pull of {} interrupted after starting: {}", image, e);
                    break;
                }
                Err(e) => {
                    error!("Error pulling image {}: {}", image, e);
                    return Err(ContainerError::PullFailed(e));
                }
            };

            started = true;
            if relaying {
                if let Err(e) = relay_progress(sink, &message).await {
                    warn!("Stopped relaying pull progress for {}: {}", image, e);
                    relaying = false;
                }
            }
        }

        if relaying {
            if let Err(e) = sink.flush().await {
                warn!("Unable to flush pull progress for {}: {}", image, e);
            }
        }
        outcome?;
        info!("Pulled image {}", reference);
        Ok(())
    }

    /// Pulls `image` unless [`has_image`](Self::has_image) already finds it.
    /// Returns whether a pull was performed.
    pub async fn ensure_image(&self, image: &str) -> Result<bool, ContainerError> {
        if self.has_image(image).await {
            debug!("Image {} already present", image);
            return Ok(false);
        }
        self.pull_image(image).await?;
        Ok(true)
    }

    /// Creates (but does not start) a container running `config.cmd` through
    /// `sh -c` in the caller's current directory, on the host network.
    pub async fn container_create(
        &self,
        config: ContainerConfig,
    ) -> Result<ContainerHandle<D>, ContainerError> {
        let working_dir = std::env::current_dir().map_err(|e| {
            error!("Unable to resolve working directory: {}", e);
            CreateError::WorkingDirectory(e)
        })?;

        let image = config.image.clone();
        let body = create_body(config, working_dir.to_string_lossy().into_owned());

        info!("Creating container from image {}", image);
        let response = self
            .connection
            .call(self.connection.daemon().create_container(body))
            .await
            .map_err(|e| {
                error!("Error creating container from {}: {}", image, e);
                CreateError::Daemon(e)
            })?;

        for warning in &response.warnings {
            warn!("Daemon warning for container {}: {}", response.id, warning);
        }
        info!("Created container {}", response.id);
        Ok(ContainerHandle::new(response.id, Arc::clone(&self.connection)))
    }

    /// See [`system_mounts`].
    pub fn system_mounts(&self) -> Vec<Mount> {
        system_mounts()
    }
}

/// Mounts a container needs to drive the daemon itself: the control socket
/// (read-write) and the credential directory (read-only).
pub fn system_mounts() -> Vec<Mount> {
    vec![
        Mount::new(DOCKER_SOCKET, DOCKER_SOCKET, false),
        Mount::new(DOCKER_CONFIG_DIR, DOCKER_CONFIG_DIR, true),
    ]
}

/// Translates a [`ContainerConfig`] into daemon create-parameters.
pub fn create_body(config: ContainerConfig, working_dir: String) -> ContainerCreateBody {
    let mounts = config
        .mounts
        .into_iter()
        .map(|m| DaemonMount {
            source: Some(m.source),
            target: Some(m.target),
            read_only: Some(m.read_only),
            typ: Some(MountTypeEnum::BIND),
            ..DaemonMount::default()
        })
        .collect::<Vec<_>>();

    let env = config
        .env
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>();

    ContainerCreateBody {
        image: Some(config.image),
        entrypoint: Some(vec![SHELL.to_string()]),
        cmd: Some(vec!["-c".to_string(), config.cmd]),
        working_dir: Some(working_dir),
        env: Some(env),
        host_config: Some(HostConfig {
            mounts: Some(mounts),
            network_mode: Some(HOST_NETWORK_MODE.to_string()),
            ..HostConfig::default()
        }),
        ..ContainerCreateBody::default()
    }
}

async fn relay_progress<W>(sink: &mut W, message: &CreateImageInfo) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    sink.write_all(&line).await
}
