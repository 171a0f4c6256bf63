//! Core types used by the container management subsystem.

use std::fmt;
use std::sync::Arc;

use bollard::Docker;
use chrono::{DateTime, Utc};

use crate::container_management::connection::Connection;
use crate::container_management::daemon::DockerDaemon;

/// Handle to a container created by a [`ContainerManager`].
///
/// The handle keeps the owning manager's connection alive, so lifecycle calls
/// issued through it share the manager's cancellation context.
///
/// [`ContainerManager`]: crate::container_management::ContainerManager
pub struct ContainerHandle<D: DockerDaemon = Docker> {
    id: String,
    created_at: DateTime<Utc>,
    connection: Arc<Connection<D>>,
}

impl<D: DockerDaemon> ContainerHandle<D> {
    pub(crate) fn new(id: String, connection: Arc<Connection<D>>) -> Self {
        ContainerHandle {
            id,
            created_at: Utc::now(),
            connection,
        }
    }

    /// Daemon-assigned container identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn connection(&self) -> &Arc<Connection<D>> {
        &self.connection
    }
}

// Implement Debug manually since the daemon client isn't required to be Debug
impl<D: DockerDaemon> fmt::Debug for ContainerHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}
