use super::classify::ActionKind;
use super::result::{ActionResult, FailureReason};
use super::{Approach, not_synced};
use crate::bot::Bot;
use crate::config::ms;
use crate::resolve::{Pattern, Target, find_option, has_option, resolve, resolve_same, resolve_where};
use crate::session::{Command, SessionError};
use crate::wait::WaitError;
use crate::world::{NearbyLoc, NearbyNpc, WorldSnapshot};

const DOOR_NAMES: &str = r"(?i)\b(door|gate)\b";

impl Bot {
    /// Talks to an NPC; success is a dialog opening.
    pub async fn talk_to(
        &self,
        target: &Target<NearbyNpc>,
    ) -> Result<ActionResult<NearbyNpc>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let talk = Pattern::contains("talk");
        let Some(npc) = resolve_where(&snap, Some(target), None, |n: &NearbyNpc| {
            has_option(&n.options, &talk)
        }) else {
            let reason = if resolve(&snap, Some(target), None).is_some() {
                FailureReason::NoOption
            } else {
                FailureReason::TargetNotFound
            };
            return Ok(ActionResult::fail(reason, format!("nobody to talk to matching {target}")));
        };

        let npc = match self.approach(npc).await? {
            Approach::Reached(npc) => npc,
            Approach::Failed(res) => return Ok(res.discard_payload()),
        };
        let Some(option) = find_option(&npc.options, &talk) else {
            return Ok(ActionResult::fail(
                FailureReason::NoOption,
                format!("{} has nothing to say", npc.name),
            ));
        };

        // A dialog left open from before is not an answer.
        let before = self.snapshot().map(|s| s.dialog.clone()).unwrap_or_default();
        let timeout = ms(self.config.timeouts.talk_ms);
        let verified = self
            .verify(
                ActionKind::Talk,
                Command::InteractNpc {
                    npc_index: npc.index,
                    option: option.index,
                },
                timeout,
                |s| (s.dialog.is_open && s.dialog != before).then_some(()),
            )
            .await?;
        Ok(verified.into_result("talk", timeout, |_| {
            ActionResult::ok_with(format!("talking to {}", npc.name), npc.clone())
        }))
    }

    /// Opens a door or gate, the nearest one when no target is given.
    ///
    /// A door that is already open counts as success without sending anything. Success after
    /// the click is the door at that tile no longer offering "Open", or disappearing.
    pub async fn open_door(
        &self,
        target: Option<&Target<NearbyLoc>>,
    ) -> Result<ActionResult<NearbyLoc>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let open = Pattern::exact("open");
        let default = Pattern::regex(DOOR_NAMES).ok();

        // Prefer a closed one; fall back to any match so an open door can be reported as such.
        let found = resolve_where(&snap, target, default.as_ref(), |l: &NearbyLoc| {
            has_option(&l.options, &open)
        })
        .or_else(|| resolve(&snap, target, default.as_ref()));
        let Some(door) = found else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                match target {
                    Some(t) => format!("no door matching {t}"),
                    None => "no door nearby".to_string(),
                },
            ));
        };

        let door = match self.approach(door).await? {
            Approach::Reached(door) => door,
            Approach::Failed(res) => return Ok(res.discard_payload()),
        };
        let option = find_option(&door.options, &open).map(|o| o.index);
        let Some(option) = option else {
            return Ok(if has_option(&door.options, &Pattern::exact("close")) {
                ActionResult::ok_with(format!("{} is already open", door.name), door)
            } else {
                ActionResult::fail(
                    FailureReason::NoOption,
                    format!("{} cannot be opened", door.name),
                )
            });
        };

        let timeout = ms(self.config.timeouts.door_ms);
        let verified = self
            .verify(
                ActionKind::Door,
                Command::InteractLoc {
                    x: door.x,
                    z: door.z,
                    loc_id: door.id,
                    option,
                },
                timeout,
                |s| match resolve_same(s, &door) {
                    None => Some(door.clone()),
                    Some(now) if !has_option(&now.options, &open) => Some(now),
                    Some(_) => None,
                },
            )
            .await?;
        Ok(verified.into_result("open door", timeout, |now| {
            ActionResult::ok_with(format!("opened {}", now.name), now)
        }))
    }

    /// Clicks through dialogs and closes interfaces until nothing covers the screen.
    ///
    /// The payload is the number of clicks it took.
    pub async fn dismiss_blocking_ui(&self) -> Result<ActionResult<u32>, SessionError> {
        let cfg = &self.config.interaction;
        let step_timeout = ms(self.config.timeouts.dismiss_step_ms);
        let mut clicks = 0;

        while clicks < cfg.max_dismiss_clicks {
            let Some(snap) = self.snapshot() else {
                return Ok(not_synced());
            };
            let Some(command) = dismiss_command(&snap) else {
                return Ok(ActionResult::ok_with(format!("cleared after {clicks} clicks"), clicks));
            };

            let (dialog, interface) = (snap.dialog.clone(), snap.interface.clone());
            tracing::debug!(command = command.name(), clicks, "ui.dismiss");
            self.session.send(command).await?;
            clicks += 1;

            let changed = self
                .wait_for_condition(step_timeout, |s| s.dialog != dialog || s.interface != interface)
                .await;
            match changed {
                Ok(_) | Err(WaitError::ConditionTimeout(_)) => {}
                Err(WaitError::Session(err)) => return Err(err),
            }
        }

        match self.snapshot() {
            Some(s) if s.is_blocked_by_ui() => Ok(ActionResult::fail(
                FailureReason::Timeout,
                format!("ui still open after {clicks} clicks"),
            )
            .with_payload(clicks)),
            _ => Ok(ActionResult::ok_with(format!("cleared after {clicks} clicks"), clicks)),
        }
    }
}

/// Next click that gets a dialog or interface out of the way.
fn dismiss_command(s: &WorldSnapshot) -> Option<Command> {
    if s.dialog.is_open {
        let option = s.dialog.options.first().map(|o| o.index).unwrap_or(0);
        return Some(Command::ClickDialog { option });
    }
    s.interface.is_open.then_some(Command::CloseInterface)
}

#[cfg(test)]
mod tests {
    use crate::action::result::FailureReason;
    use crate::config::BotConfig;
    use crate::resolve::Target;
    use crate::session::Command;
    use crate::testkit::{SimSession, loc, npc, snapshot_at};
    use crate::world::{DialogState, InterfaceState, WorldSnapshot};

    #[tokio::test(start_paused = true)]
    async fn talk_waits_for_dialog() {
        let sim = SimSession::new(WorldSnapshot {
            npcs: vec![npc(9, "Hans", 12, 11, &["Talk-to"])],
            ..snapshot_at(10, 10)
        })
        .on_command(|_, w| {
            w.later(2, |w| {
                w.snapshot.dialog = DialogState {
                    is_open: true,
                    text: Some("Hello.".into()),
                    options: Vec::new(),
                }
            })
        });
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.talk_to(&Target::from("hans")).await.unwrap();
        assert!(res.success, "{}", res.message);
    }

    fn level_up_notice() -> DialogState {
        DialogState {
            is_open: true,
            text: Some("Congratulations, you just advanced a Woodcutting level.".into()),
            options: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dialog_already_open_is_not_an_answer() {
        let mut config = BotConfig::default();
        config.timeouts.talk_ms = 3_000;
        let (sim, bot) = SimSession::new(WorldSnapshot {
            npcs: vec![npc(9, "Hans", 12, 11, &["Talk-to"])],
            dialog: level_up_notice(),
            ..snapshot_at(10, 10)
        })
        .into_bot(config);

        let res = bot.talk_to(&Target::from("hans")).await.unwrap();
        assert_eq!(res.reason, Some(FailureReason::Timeout));
        assert_eq!(sim.commands().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_replacing_an_old_dialog_counts() {
        let sim = SimSession::new(WorldSnapshot {
            npcs: vec![npc(9, "Hans", 12, 11, &["Talk-to"])],
            dialog: level_up_notice(),
            ..snapshot_at(10, 10)
        })
        .on_command(|_, w| {
            w.later(2, |w| {
                w.snapshot.dialog = DialogState {
                    is_open: true,
                    text: Some("Hello.".into()),
                    options: Vec::new(),
                }
            })
        });
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.talk_to(&Target::from("hans")).await.unwrap();
        assert!(res.success, "{}", res.message);
    }

    #[tokio::test(start_paused = true)]
    async fn open_door_is_idempotent() {
        let sim = SimSession::new(WorldSnapshot {
            locs: vec![loc(1530, "Door", 12, 10, &["Open"])],
            ..snapshot_at(10, 10)
        })
        .on_command(|cmd, w| {
            if let Command::InteractLoc { x, z, .. } = *cmd {
                w.later(1, move |w| {
                    w.snapshot.locs = vec![loc(1531, "Door", x, z, &["Close"])];
                });
            }
        });
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.open_door(None).await.unwrap();
        assert!(res.success, "{}", res.message);
        assert_eq!(res.payload.map(|d| d.id), Some(1531));
        assert_eq!(sim.commands().len(), 1);

        let res = bot.open_door(None).await.unwrap();
        assert!(res.success);
        assert_eq!(sim.commands().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn door_that_despawns_during_the_walk_is_no_longer_visible() {
        let sim = SimSession::new(WorldSnapshot {
            locs: vec![loc(1551, "Gate", 30, 10, &["Open"])],
            ..snapshot_at(10, 10)
        });
        sim.world(|w| w.later(3, |w| w.snapshot.locs.clear()));
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.open_door(None).await.unwrap();
        assert_eq!(res.reason, Some(FailureReason::NoLongerVisible));
        assert!(
            sim.commands()
                .iter()
                .all(|c| matches!(c, Command::Walk { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn locked_door_is_blocked() {
        let sim = SimSession::new(WorldSnapshot {
            locs: vec![loc(1530, "Door", 11, 10, &["Open"])],
            ..snapshot_at(10, 10)
        })
        .on_command(|_, w| w.say("The door is locked."));
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.open_door(Some(&Target::from("door"))).await.unwrap();
        assert_eq!(res.reason, Some(FailureReason::Blocked));
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_clicks_through_dialog_then_interface() {
        let sim = SimSession::new(WorldSnapshot {
            dialog: DialogState {
                is_open: true,
                text: Some("Congratulations, you just advanced a level.".into()),
                options: Vec::new(),
            },
            ..snapshot_at(10, 10)
        })
        .on_command(|cmd, w| match cmd {
            Command::ClickDialog { .. } => w.later(1, |w| {
                w.snapshot.dialog = DialogState::default();
                w.snapshot.interface = InterfaceState {
                    is_open: true,
                    interface_id: Some(5),
                };
            }),
            Command::CloseInterface => {
                w.later(1, |w| w.snapshot.interface = InterfaceState::default())
            }
            _ => {}
        });
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.dismiss_blocking_ui().await.unwrap();
        assert!(res.success, "{}", res.message);
        assert_eq!(res.payload, Some(2));
        assert_eq!(
            sim.commands(),
            vec![Command::ClickDialog { option: 0 }, Command::CloseInterface]
        );
    }
}
