//! Bank and shop flows composed from verified primitives.
//!
//! Transfers never trust an acknowledgement: the item count before and after the command is
//! the only measure of what moved. Every modal has an idempotent close so an abandoned flow
//! can always clean up after itself.

pub mod bank;
pub mod shop;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::action::classify::ActionKind;
use crate::action::result::{ActionResult, FailureReason, TransferOutcome};
use crate::action::{Approach, Verified, not_synced};
use crate::bot::Bot;
use crate::config::ms;
use crate::resolve::{Pattern, find_option, resolve_same};
use crate::session::{Command, SessionError};
use crate::wait::{Step, WaitError, wait_until};
use crate::world::{EntityOption, NearbyLoc, NearbyNpc, WorldSnapshot};

/// How many units to move.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Amount {
    All,
    Count(u32),
}

impl Amount {
    /// Units to ask for when `available` are on hand.
    pub fn resolve(self, available: u32) -> u32 {
        match self {
            Amount::All => available,
            Amount::Count(n) => n.min(available),
        }
    }
}

/// Which way a transfer moves items relative to the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Out,
    In,
}

impl Flow {
    fn delta(self, before: u32, after: u32) -> u32 {
        match self {
            Flow::Out => before.saturating_sub(after),
            Flow::In => after.saturating_sub(before),
        }
    }
}

/// Something clicked to bring up a bank or shop.
#[derive(Debug, Clone)]
pub(crate) enum Counter {
    Npc(NearbyNpc),
    Loc(NearbyLoc),
}

impl Counter {
    fn name(&self) -> &str {
        match self {
            Counter::Npc(n) => &n.name,
            Counter::Loc(l) => &l.name,
        }
    }

    fn options(&self) -> &[EntityOption] {
        match self {
            Counter::Npc(n) => &n.options,
            Counter::Loc(l) => &l.options,
        }
    }

    fn command(&self, option: u8) -> Command {
        match self {
            Counter::Npc(n) => Command::InteractNpc {
                npc_index: n.index,
                option,
            },
            Counter::Loc(l) => Command::InteractLoc {
                x: l.x,
                z: l.z,
                loc_id: l.id,
                option,
            },
        }
    }
}

impl Bot {
    async fn approach_counter(&self, counter: Counter) -> Result<Approach<Counter>, SessionError> {
        Ok(match counter {
            Counter::Npc(n) => match self.approach(n).await? {
                Approach::Reached(n) => Approach::Reached(Counter::Npc(n)),
                Approach::Failed(res) => Approach::Failed(res),
            },
            Counter::Loc(l) => match self.approach(l).await? {
                Approach::Reached(l) => Approach::Reached(Counter::Loc(l)),
                Approach::Failed(res) => Approach::Failed(res),
            },
        })
    }

    /// Interacts with `counter` until `is_open` holds, re-clicking each attempt and advancing
    /// any intervening dialog through its first option.
    pub(crate) async fn open_modal(
        &self,
        kind: ActionKind,
        counter: Counter,
        options: &[&str],
        is_open: fn(&WorldSnapshot) -> bool,
    ) -> Result<ActionResult<()>, SessionError> {
        let cfg = &self.config.transaction;
        let overall = ms(self.config.timeouts.open_interface_ms);
        let deadline = Instant::now() + overall;
        let cooldown = self.config.interaction.dialog_cooldown_ticks;

        let mut counter = match self.approach_counter(counter).await? {
            Approach::Reached(c) => c,
            Approach::Failed(res) => return Ok(res),
        };

        for attempt in 1..=cfg.open_attempts.max(1) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let Some(option) = options
                .iter()
                .find_map(|o| find_option(counter.options(), &Pattern::contains(*o)))
            else {
                return Ok(ActionResult::fail(
                    FailureReason::NoOption,
                    format!("{} offers none of {options:?}", counter.name()),
                ));
            };

            let Some(start_tick) = self.snapshot().map(|s| s.tick) else {
                return Ok(not_synced());
            };
            tracing::debug!(?kind, counter = counter.name(), attempt, "modal.open");
            self.session.send(counter.command(option.index)).await?;

            let window = ms(cfg.open_attempt_ms).min(deadline - now);
            let classifier = &self.classifier;
            let res = wait_until(&self.session, window, cooldown, |s| {
                if is_open(s) {
                    return Step::Ready(None);
                }
                if let Some(hit) = classifier.classify(kind, &s.messages, start_tick) {
                    return Step::Ready(Some(hit));
                }
                if s.dialog.is_open {
                    let option = s.dialog.options.first().map(|o| o.index).unwrap_or(0);
                    return Step::Nudge(Command::ClickDialog { option });
                }
                Step::Pending
            })
            .await;

            match res {
                Ok(None) => {
                    return Ok(ActionResult::ok(format!("{} open", counter.name())));
                }
                Ok(Some(hit)) => return Ok(ActionResult::fail(hit.reason, hit.message)),
                Err(WaitError::ConditionTimeout(_)) => {
                    tracing::debug!(?kind, attempt, "modal.retry");
                }
                Err(WaitError::Session(err)) => return Err(err),
            }

            // The counter may have moved or changed options while we waited.
            let refreshed = self.snapshot().and_then(|s| match &counter {
                Counter::Npc(n) => resolve_same(&s, n).map(Counter::Npc),
                Counter::Loc(l) => resolve_same(&s, l).map(Counter::Loc),
            });
            match refreshed {
                Some(c) => counter = c,
                None => {
                    return Ok(ActionResult::fail(
                        FailureReason::NoLongerVisible,
                        format!("{} is no longer visible", counter.name()),
                    ));
                }
            }
        }

        Ok(ActionResult::fail(
            FailureReason::Timeout,
            format!("{} did not open within {overall:?}", counter.name()),
        ))
    }

    /// Closes a modal; sends nothing when it is already closed.
    pub(crate) async fn close_modal(
        &self,
        what: &str,
        is_open: fn(&WorldSnapshot) -> bool,
    ) -> Result<ActionResult<()>, SessionError> {
        if !self.snapshot().is_some_and(|s| is_open(&s)) {
            return Ok(ActionResult::ok(format!("{what} already closed")));
        }
        self.session.send(Command::CloseInterface).await?;

        let timeout = ms(self.config.timeouts.close_interface_ms);
        match self.wait_for_condition(timeout, |s| !is_open(s)).await {
            Ok(_) => Ok(ActionResult::ok(format!("{what} closed"))),
            Err(WaitError::ConditionTimeout(_)) => Ok(ActionResult::fail(
                FailureReason::Timeout,
                format!("{what} still open after {timeout:?}"),
            )),
            Err(WaitError::Session(err)) => Err(err),
        }
    }

    /// Sends one transfer command and measures what actually moved.
    ///
    /// Any movement counts as success, so a partial transfer reports the smaller amount.
    pub(crate) async fn transfer(
        &self,
        kind: ActionKind,
        command: Command,
        item_id: u32,
        requested: u32,
        flow: Flow,
    ) -> Result<ActionResult<TransferOutcome>, SessionError> {
        let before = self
            .snapshot()
            .map(|s| s.inventory_count(item_id))
            .unwrap_or(0);
        let timeout = ms(self.config.timeouts.transfer_ms);
        let verified = self
            .verify(kind, command, timeout, |s| {
                let now = s.inventory_count(item_id);
                (now != before).then_some(now)
            })
            .await?;

        let after = match &verified {
            Verified::Done(now) => *now,
            _ => self
                .snapshot()
                .map(|s| s.inventory_count(item_id))
                .unwrap_or(before),
        };
        let outcome = TransferOutcome {
            item_id,
            requested,
            transferred: flow.delta(before, after),
        };
        tracing::debug!(?kind, item_id, requested, transferred = outcome.transferred, "transfer.measured");

        if outcome.transferred > 0 {
            return Ok(ActionResult::ok_with(
                format!("moved {} of {requested}", outcome.transferred),
                outcome,
            ));
        }
        Ok(verified
            .into_result("transfer", timeout, |_| {
                ActionResult::fail(FailureReason::Timeout, "count changed the wrong way")
            })
            .with_payload(outcome))
    }
}

pub(crate) fn interface_closed<T>(what: &str) -> ActionResult<T> {
    ActionResult::fail(FailureReason::InterfaceClosed, format!("{what} is not open"))
}
