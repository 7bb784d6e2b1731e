//! Gathering and processing: woodcutting and firemaking.

use super::classify::ActionKind;
use super::result::{ActionResult, FailureReason};
use super::not_synced;
use crate::bot::Bot;
use crate::config::ms;
use crate::player::inventory::InventoryItem;
use crate::player::skills::{FIREMAKING, WOODCUTTING};
use crate::resolve::{Pattern, Target, find_option, has_option, resolve, resolve_where};
use crate::session::{Command, SessionError};
use crate::world::{NearbyLoc, WorldSnapshot};

fn log_count(s: &WorldSnapshot) -> u32 {
    s.inventory
        .iter()
        .filter(|i| i.name.to_lowercase().contains("logs"))
        .map(|i| i.count)
        .sum()
}

impl Bot {
    /// Chops a tree until one log lands or woodcutting XP goes up.
    ///
    /// Without a target the nearest plain "Tree" is used. A missing axe is left to the
    /// server message.
    pub async fn chop_tree(
        &self,
        target: Option<&Target<NearbyLoc>>,
    ) -> Result<ActionResult<NearbyLoc>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let chop = Pattern::contains("chop");
        let Some(tree) = resolve_where(&snap, target, Some(&Pattern::exact("tree")), |l: &NearbyLoc| {
            has_option(&l.options, &chop)
        }) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                match target {
                    Some(t) => format!("no choppable tree matching {t}"),
                    None => "no tree nearby".to_string(),
                },
            ));
        };
        let Some(option) = find_option(&tree.options, &chop) else {
            return Ok(ActionResult::fail(
                FailureReason::NoOption,
                format!("{} cannot be chopped", tree.name),
            ));
        };

        let logs_before = log_count(&snap);
        let xp_before = snap.skill_xp(WOODCUTTING);
        let timeout = ms(self.config.timeouts.chop_ms);
        let verified = self
            .verify(
                ActionKind::Chop,
                Command::InteractLoc {
                    x: tree.x,
                    z: tree.z,
                    loc_id: tree.id,
                    option: option.index,
                },
                timeout,
                |s| (log_count(s) > logs_before || s.skill_xp(WOODCUTTING) > xp_before).then_some(()),
            )
            .await?;
        Ok(verified.into_result("chop", timeout, |_| {
            ActionResult::ok_with(format!("chopped {}", tree.name), tree.clone())
        }))
    }

    /// Lights logs with a tinderbox; success is a firemaking XP gain.
    pub async fn burn_logs(
        &self,
        target: Option<&Target<InventoryItem>>,
    ) -> Result<ActionResult<InventoryItem>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(tinderbox) = resolve::<InventoryItem>(&snap, None, Some(&Pattern::exact("tinderbox")))
        else {
            return Ok(ActionResult::fail(
                FailureReason::MissingRequirement,
                "no tinderbox in the inventory",
            ));
        };
        let Some(logs) = resolve(&snap, target, Some(&Pattern::contains("logs"))) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                "no logs in the inventory",
            ));
        };

        let xp_before = snap.skill_xp(FIREMAKING);
        let timeout = ms(self.config.timeouts.burn_ms);
        let verified = self
            .verify(
                ActionKind::Burn,
                Command::UseItemOnItem {
                    slot: tinderbox.slot,
                    target_slot: logs.slot,
                },
                timeout,
                |s| (s.skill_xp(FIREMAKING) > xp_before).then_some(()),
            )
            .await?;
        Ok(verified.into_result("burn", timeout, |_| {
            ActionResult::ok_with(format!("lit {}", logs.name), logs.clone())
        }))
    }
}
