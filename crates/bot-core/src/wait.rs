//! The one suspension primitive: poll the snapshot stream until a condition holds or a
//! deadline passes. Every other wait in the crate is built on this.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::action::result::{ActionResult, FailureReason};
use crate::bot::Bot;
use crate::player::inventory::InventoryItem;
use crate::player::skills::Skill;
use crate::resolve::Pattern;
use crate::session::{Command, Session, SessionError};
use crate::world::WorldSnapshot;

/// Result of evaluating a wait condition against one snapshot.
#[derive(Debug)]
pub enum Step<T> {
    Ready(T),
    Pending,
    /// Not ready, and this command may help (e.g. advancing a dialog). The waiter sends it at
    /// most once per cooldown window.
    Nudge(Command),
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("condition not met within {0:?}")]
    ConditionTimeout(Duration),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Polls until `step` returns `Ready`.
///
/// A missing snapshot (session not synced) is "not satisfied". Nothing observed after the
/// deadline is accepted; anything observed before it is.
pub async fn wait_until<T, F>(
    session: &Session,
    timeout: Duration,
    nudge_cooldown_ticks: u64,
    mut step: F,
) -> Result<T, WaitError>
where
    F: FnMut(&Arc<WorldSnapshot>) -> Step<T>,
{
    let deadline = Instant::now() + timeout;
    let mut last_nudge_tick: Option<u64> = None;

    loop {
        if let Some(snap) = session.snapshot() {
            match step(&snap) {
                Step::Ready(value) => return Ok(value),
                Step::Pending => {}
                Step::Nudge(command) => {
                    let due = last_nudge_tick
                        .is_none_or(|t| snap.tick >= t.saturating_add(nudge_cooldown_ticks));
                    if due {
                        tracing::debug!(command = command.name(), tick = snap.tick, "wait.nudge");
                        last_nudge_tick = Some(snap.tick);
                        session.send(command).await?;
                    }
                }
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::ConditionTimeout(timeout));
        }
        session.wait_for_state_change(deadline - now).await?;
        if Instant::now() > deadline {
            return Err(WaitError::ConditionTimeout(timeout));
        }
    }
}

/// Returns the first snapshot satisfying `predicate`.
pub async fn wait_for_condition<F>(
    session: &Session,
    timeout: Duration,
    mut predicate: F,
) -> Result<Arc<WorldSnapshot>, WaitError>
where
    F: FnMut(&WorldSnapshot) -> bool,
{
    wait_until(session, timeout, 0, |snap| {
        if predicate(snap) {
            Step::Ready(Arc::clone(snap))
        } else {
            Step::Pending
        }
    })
    .await
}

impl Bot {
    pub async fn wait_for_condition<F>(
        &self,
        timeout: Duration,
        predicate: F,
    ) -> Result<Arc<WorldSnapshot>, WaitError>
    where
        F: FnMut(&WorldSnapshot) -> bool,
    {
        wait_for_condition(&self.session, timeout, predicate).await
    }

    /// Current snapshot, waiting up to `timeout` for the session to sync.
    pub(crate) async fn synced_snapshot(
        &self,
        timeout: Duration,
    ) -> Result<Option<Arc<WorldSnapshot>>, SessionError> {
        match self.wait_for_condition(timeout, |s| s.player.is_some()).await {
            Ok(snap) => Ok(Some(snap)),
            Err(WaitError::ConditionTimeout(_)) => Ok(None),
            Err(WaitError::Session(err)) => Err(err),
        }
    }

    pub async fn wait_for_skill_level(
        &self,
        skill: &str,
        level: u32,
        timeout: Duration,
    ) -> Result<ActionResult<Skill>, SessionError> {
        let res = wait_until(&self.session, timeout, 0, |s| match s.skill(skill) {
            Some(found) if found.base_level >= level => Step::Ready(found.clone()),
            _ => Step::Pending,
        })
        .await;
        match res {
            Ok(found) => Ok(ActionResult::ok_with(
                format!("{skill} reached level {}", found.base_level),
                found,
            )),
            Err(WaitError::ConditionTimeout(_)) => Ok(ActionResult::fail(
                FailureReason::Timeout,
                format!("{skill} did not reach level {level} within {timeout:?}"),
            )),
            Err(WaitError::Session(err)) => Err(err),
        }
    }

    pub async fn wait_for_inventory_item(
        &self,
        pattern: &Pattern,
        timeout: Duration,
    ) -> Result<ActionResult<InventoryItem>, SessionError> {
        let res = wait_until(&self.session, timeout, 0, |s| {
            match s.inventory.iter().find(|i| pattern.matches(&i.name)) {
                Some(item) => Step::Ready(item.clone()),
                None => Step::Pending,
            }
        })
        .await;
        match res {
            Ok(item) => Ok(ActionResult::ok_with(format!("found {}", item.name), item)),
            Err(WaitError::ConditionTimeout(_)) => Ok(ActionResult::fail(
                FailureReason::Timeout,
                format!("no inventory item matching {pattern} within {timeout:?}"),
            )),
            Err(WaitError::Session(err)) => Err(err),
        }
    }

    pub async fn wait_for_dialog_close(
        &self,
        timeout: Duration,
    ) -> Result<ActionResult<()>, SessionError> {
        match self.wait_for_condition(timeout, |s| !s.dialog.is_open).await {
            Ok(_) => Ok(ActionResult::ok("dialog closed")),
            Err(WaitError::ConditionTimeout(_)) => Ok(ActionResult::fail(
                FailureReason::Timeout,
                format!("dialog still open after {timeout:?}"),
            )),
            Err(WaitError::Session(err)) => Err(err),
        }
    }
}
