//! Verified actions: one primitive command wrapped in pre and post checks.
//!
//! Every action resolves its target, records the tick, sends exactly one command and then
//! waits until either a chat message classifies the attempt as failed or the action's own
//! success signal shows up. Expected failures are returned as [`ActionResult`]s; only
//! [`SessionError`] escapes as `Err`.

pub mod classify;
pub mod combat;
pub mod interact;
pub mod items;
pub mod result;
pub mod skills;

use std::sync::Arc;
use std::time::Duration;

pub use classify::{ActionKind, ClassifierRule, MessageClassifier};
pub use result::{ActionResult, FailureReason, RejectKind};

use classify::Classified;

use crate::bot::Bot;
use crate::resolve::{Entity, resolve_same};
use crate::session::{Command, SessionError};
use crate::wait::{Step, WaitError, wait_until};
use crate::world::{EntityOption, WorldSnapshot};

/// How a verified command ended.
#[derive(Debug)]
pub(crate) enum Verified<T> {
    Done(T),
    /// A chat message after the start tick matched a failure rule.
    Failed(Classified),
    /// The session refused the command during local validation.
    Refused(String),
    TimedOut,
    /// No snapshot to take a start tick from; nothing was sent.
    Unsynced,
}

impl<T> Verified<T> {
    /// Maps everything but success onto a failed result.
    pub(crate) fn into_result<U>(
        self,
        what: &str,
        timeout: Duration,
        on_done: impl FnOnce(T) -> ActionResult<U>,
    ) -> ActionResult<U> {
        match self {
            Verified::Done(value) => on_done(value),
            Verified::Failed(hit) => ActionResult::fail(hit.reason, hit.message),
            Verified::Refused(message) => ActionResult::fail(
                FailureReason::Rejected(RejectKind::Other),
                format!("{what}: command refused: {message}"),
            ),
            Verified::TimedOut => ActionResult::fail(
                FailureReason::Timeout,
                format!("{what}: no effect within {timeout:?}"),
            ),
            Verified::Unsynced => not_synced(),
        }
    }
}

/// Result of walking up to a proximity-gated target.
pub(crate) enum Approach<T> {
    Reached(T),
    Failed(ActionResult<()>),
}

impl Bot {
    /// Sends `command` and waits for `success` or a classified failure message.
    ///
    /// Only snapshots newer than the tick recorded just before sending count as evidence.
    pub(crate) async fn verify<T, F>(
        &self,
        kind: ActionKind,
        command: Command,
        timeout: Duration,
        mut success: F,
    ) -> Result<Verified<T>, SessionError>
    where
        F: FnMut(&WorldSnapshot) -> Option<T>,
    {
        let Some(start_tick) = self.snapshot().map(|s| s.tick) else {
            return Ok(Verified::Unsynced);
        };
        let name = command.name();
        tracing::debug!(?kind, command = name, start_tick, "action.send");

        let ack = self.session.send(command).await?;
        if !ack.accepted {
            return Ok(Verified::Refused(ack.message));
        }

        let classifier = &self.classifier;
        let res = wait_until(&self.session, timeout, 0, |snap| {
            if let Some(hit) = classifier.classify(kind, &snap.messages, start_tick) {
                return Step::Ready(Verified::Failed(hit));
            }
            if snap.tick <= start_tick {
                return Step::Pending;
            }
            match success(snap) {
                Some(value) => Step::Ready(Verified::Done(value)),
                None => Step::Pending,
            }
        })
        .await;

        match res {
            Ok(verified) => Ok(verified),
            Err(WaitError::ConditionTimeout(_)) => {
                tracing::debug!(?kind, command = name, "action.timeout");
                Ok(Verified::TimedOut)
            }
            Err(WaitError::Session(err)) => Err(err),
        }
    }

    /// Snapshot for an action's pre-checks; `None` means the session never synced.
    pub(crate) async fn baseline(&self) -> Result<Option<Arc<WorldSnapshot>>, SessionError> {
        let timeout = Duration::from_millis(self.config.movement.min_segment_timeout_ms);
        self.synced_snapshot(timeout).await
    }

    /// Walks next to `handle` when it is beyond interaction range, then finds it again by
    /// identity since it may have moved, despawned or changed state meanwhile.
    pub(crate) async fn approach<T: Entity>(&self, handle: T) -> Result<Approach<T>, SessionError> {
        let cfg = &self.config.interaction;
        let (Some(distance), Some(tile)) = (handle.distance(), handle.tile()) else {
            return Ok(Approach::Reached(handle));
        };
        if distance <= cfg.approach_distance {
            return Ok(Approach::Reached(handle));
        }

        tracing::debug!(name = handle.name(), x = tile.x, z = tile.z, distance, "action.approach");
        let walk = self.walk_to(tile.x, tile.z, cfg.approach_tolerance).await?;
        if !walk.success {
            return Ok(Approach::Failed(walk.discard_payload()));
        }

        let again = self.snapshot().and_then(|s| resolve_same(&s, &handle));
        Ok(match again {
            Some(found) => Approach::Reached(found),
            None => Approach::Failed(ActionResult::fail(
                FailureReason::NoLongerVisible,
                format!("{} is no longer visible", handle.name()),
            )),
        })
    }
}

pub(crate) fn not_synced<T>() -> ActionResult<T> {
    ActionResult::fail(FailureReason::Timeout, "session has not synced")
}

/// First option whose text equals one of `names`, ignoring case.
pub(crate) fn option_named<'a>(options: &'a [EntityOption], names: &[&str]) -> Option<&'a EntityOption> {
    options
        .iter()
        .find(|o| names.iter().any(|n| o.text.eq_ignore_ascii_case(n)))
}
