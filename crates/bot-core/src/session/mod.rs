//! Boundary to the external session: a polled state source and an intent-only command channel.
//!
//! Every component reads through an injected [`Session`] so tests can substitute a scripted
//! world and simulated time.

pub mod command;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub use command::{Command, CommandAck, PathResult, Waypoint};

use crate::world::WorldSnapshot;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// True state loss. Expected action failures never use this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session closed")]
    Closed,
    #[error("session transport failed: {0}")]
    Transport(String),
}

pub trait StateSource: Send + Sync {
    /// Latest snapshot, or `None` while the session has not synced.
    fn snapshot(&self) -> Option<Arc<WorldSnapshot>>;

    /// Resolves when a newer snapshot may be available or `timeout` elapses, whichever is first.
    fn wait_for_state_change<'a>(
        &'a self,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), SessionError>>;
}

pub trait CommandChannel: Send + Sync {
    fn send<'a>(&'a self, command: Command) -> BoxFuture<'a, Result<CommandAck, SessionError>>;

    fn find_path<'a>(
        &'a self,
        x: i32,
        z: i32,
        max_waypoints: u32,
    ) -> BoxFuture<'a, Result<PathResult, SessionError>>;
}

/// Read-only state plus command stream for one bot session.
#[derive(Clone)]
pub struct Session {
    state: Arc<dyn StateSource>,
    commands: Arc<dyn CommandChannel>,
}

impl Session {
    pub fn new(state: Arc<dyn StateSource>, commands: Arc<dyn CommandChannel>) -> Self {
        Self { state, commands }
    }

    /// Convenience for transports that implement both halves.
    pub fn from_shared<T>(inner: Arc<T>) -> Self
    where
        T: StateSource + CommandChannel + 'static,
    {
        Self {
            state: inner.clone(),
            commands: inner,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<WorldSnapshot>> {
        self.state.snapshot()
    }

    pub async fn wait_for_state_change(&self, timeout: Duration) -> Result<(), SessionError> {
        self.state.wait_for_state_change(timeout).await
    }

    pub async fn send(&self, command: Command) -> Result<CommandAck, SessionError> {
        let name = command.name();
        let ack = self.commands.send(command).await.inspect_err(|err| {
            tracing::warn!(command = name, error = %err, "session.send_failed");
        })?;
        if ack.accepted {
            tracing::trace!(command = name, "session.sent");
        } else {
            tracing::debug!(command = name, reason = %ack.message, "session.refused_locally");
        }
        Ok(ack)
    }

    pub async fn find_path(
        &self,
        x: i32,
        z: i32,
        max_waypoints: u32,
    ) -> Result<PathResult, SessionError> {
        self.commands.find_path(x, z, max_waypoints).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
