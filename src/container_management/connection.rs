use std::future::Future;

use bollard::errors::Error as BollardError;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::container_management::daemon::DockerDaemon;
use crate::error_handling::types::DaemonError;

/// The manager's single link to the daemon.
///
/// Every daemon call goes through [`Connection::call`] (or
/// [`Connection::next_item`] for streamed responses) so that cancelling the
/// token aborts all in-flight and future operations at once.
pub struct Connection<D> {
    daemon: D,
    token: CancellationToken,
}

impl<D: DockerDaemon> Connection<D> {
    pub fn new(daemon: D) -> Self {
        Connection {
            daemon,
            token: CancellationToken::new(),
        }
    }

    pub fn daemon(&self) -> &D {
        &self.daemon
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        debug!("Cancelling daemon operation context");
        self.token.cancel();
    }

    /// Runs one daemon call, racing it against cancellation.
    pub async fn call<T, F>(&self, call: F) -> Result<T, DaemonError>
    where
        F: Future<Output = Result<T, BollardError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DaemonError::Cancelled),
            result = call => result.map_err(DaemonError::Api),
        }
    }

    /// Pulls the next item of a streamed response, racing it against cancellation.
    pub async fn next_item<T, S>(&self, stream: &mut S) -> Result<Option<T>, DaemonError>
    where
        S: Stream<Item = Result<T, BollardError>> + Unpin,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DaemonError::Cancelled),
            item = stream.next() => item.transpose().map_err(DaemonError::Api),
        }
    }
}
