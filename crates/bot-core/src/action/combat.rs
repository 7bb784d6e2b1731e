use super::classify::ActionKind;
use super::result::{ActionResult, CastOutcome, FailureReason};
use super::{Approach, not_synced};
use crate::bot::Bot;
use crate::config::ms;
use crate::player::skills::MAGIC;
use crate::resolve::{Pattern, Target, find_option, has_option, resolve, resolve_same, resolve_where};
use crate::session::{Command, SessionError};
use crate::world::NearbyNpc;

const ADJACENT: f64 = 1.5;

impl Bot {
    /// Attacks an NPC, walking up to it first when it is out of range.
    ///
    /// Succeeds once, compared with just before the click, the player or the target has
    /// entered combat, the target is gone, or the player has closed in next to it.
    pub async fn attack_npc(
        &self,
        target: &Target<NearbyNpc>,
    ) -> Result<ActionResult<NearbyNpc>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let attack = Pattern::exact("attack");

        let Some(npc) = resolve_where(&snap, Some(target), None, |n: &NearbyNpc| {
            has_option(&n.options, &attack)
        }) else {
            let reason = if resolve(&snap, Some(target), None).is_some() {
                FailureReason::NoOption
            } else {
                FailureReason::TargetNotFound
            };
            return Ok(ActionResult::fail(reason, format!("no attackable npc matching {target}")));
        };

        let npc = match self.approach(npc).await? {
            Approach::Reached(npc) => npc,
            Approach::Failed(res) => return Ok(res.discard_payload()),
        };
        let Some(option) = find_option(&npc.options, &attack) else {
            return Ok(ActionResult::fail(
                FailureReason::NoOption,
                format!("{} can no longer be attacked", npc.name),
            ));
        };

        // Combat already running or a target already adjacent is not evidence.
        let was_engaged = self
            .snapshot()
            .and_then(|s| s.player.as_ref().map(|p| p.in_combat))
            .unwrap_or(false);
        let timeout = ms(self.config.timeouts.attack_ms);
        let verified = self
            .verify(
                ActionKind::Attack,
                Command::InteractNpc {
                    npc_index: npc.index,
                    option: option.index,
                },
                timeout,
                |s| {
                    let engaged = s.player.as_ref().is_some_and(|p| p.in_combat);
                    match resolve_same(s, &npc) {
                        None => Some(()),
                        Some(now)
                            if (engaged && !was_engaged)
                                || (now.in_combat && !npc.in_combat)
                                || (now.distance <= ADJACENT && npc.distance > ADJACENT) =>
                        {
                            Some(())
                        }
                        Some(_) => None,
                    }
                },
            )
            .await?;

        Ok(verified.into_result("attack", timeout, |_| {
            ActionResult::ok_with(format!("attacking {}", npc.name), npc.clone())
        }))
    }

    /// Casts `spell` on an NPC. Success is a magic XP gain; a splash gains nothing and ends in
    /// a timeout.
    pub async fn cast_spell_on_npc(
        &self,
        target: &Target<NearbyNpc>,
        spell: u32,
    ) -> Result<ActionResult<CastOutcome>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(npc) = resolve(&snap, Some(target), None) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                format!("no npc matching {target}"),
            ));
        };
        let xp_before = snap.skill_xp(MAGIC);

        let timeout = ms(self.config.timeouts.cast_ms);
        let verified = self
            .verify(
                ActionKind::Cast,
                Command::SpellOnNpc {
                    npc_index: npc.index,
                    spell,
                },
                timeout,
                |s| {
                    let xp = s.skill_xp(MAGIC);
                    (xp > xp_before).then(|| xp - xp_before)
                },
            )
            .await?;

        Ok(verified.into_result("cast", timeout, |xp_gained| {
            ActionResult::ok_with(
                format!("cast {spell} on {} for {xp_gained} xp", npc.name),
                CastOutcome {
                    npc_index: npc.index,
                    xp_gained,
                },
            )
        }))
    }

    /// Switches the combat style; a no-op when it is already selected.
    pub async fn set_combat_style(&self, style: u8) -> Result<ActionResult<u8>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if snap.player.as_ref().is_some_and(|p| p.combat_style == style) {
            return Ok(ActionResult::ok_with(format!("combat style already {style}"), style));
        }

        let timeout = ms(self.config.timeouts.combat_style_ms);
        let verified = self
            .verify(
                ActionKind::CombatStyle,
                Command::SetCombatStyle { style },
                timeout,
                |s| {
                    s.player
                        .as_ref()
                        .filter(|p| p.combat_style == style)
                        .map(|p| p.combat_style)
                },
            )
            .await?;
        Ok(verified.into_result("combat style", timeout, |style| {
            ActionResult::ok_with(format!("combat style set to {style}"), style)
        }))
    }
}
