use super::{Amount, Counter, Flow, interface_closed};
use crate::action::classify::ActionKind;
use crate::action::not_synced;
use crate::action::result::{ActionResult, FailureReason, TransferOutcome};
use crate::bot::Bot;
use crate::player::inventory::InventoryItem;
use crate::resolve::{Pattern, Target, has_option, nearest, resolve};
use crate::session::{Command, SessionError};
use crate::world::{BankItem, NearbyLoc, NearbyNpc, WorldSnapshot};

const BANK_OPTIONS: &[&str] = &["bank", "use", "talk"];

fn bank_open(s: &WorldSnapshot) -> bool {
    s.bank.is_open
}

/// Nearest banker NPC or bank booth/chest.
fn find_bank(s: &WorldSnapshot) -> Option<Counter> {
    let bank = Pattern::contains("bank");
    let npc = nearest(
        s.npcs
            .iter()
            .filter(|n: &&NearbyNpc| has_option(&n.options, &bank) || bank.matches(&n.name)),
    );
    let loc = nearest(
        s.locs
            .iter()
            .filter(|l: &&NearbyLoc| bank.matches(&l.name) && !l.options.is_empty()),
    );
    match (npc, loc) {
        (Some(n), Some(l)) if l.distance < n.distance => Some(Counter::Loc(l)),
        (Some(n), _) => Some(Counter::Npc(n)),
        (None, Some(l)) => Some(Counter::Loc(l)),
        (None, None) => None,
    }
}

impl Bot {
    /// Opens the nearest bank. Any dialog a banker starts with is advanced automatically.
    pub async fn open_bank(&self) -> Result<ActionResult<()>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if snap.bank.is_open {
            return Ok(ActionResult::ok("bank already open"));
        }
        let Some(counter) = find_bank(&snap) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                "no banker or bank booth nearby",
            ));
        };
        self.open_modal(ActionKind::Bank, counter, BANK_OPTIONS, bank_open)
            .await
    }

    /// Idempotent; safe to call whether or not the bank is open.
    pub async fn close_bank(&self) -> Result<ActionResult<()>, SessionError> {
        self.close_modal("bank", bank_open).await
    }

    /// Deposits from the inventory. The payload reports what actually left the inventory.
    pub async fn deposit_item(
        &self,
        target: &Target<InventoryItem>,
        amount: Amount,
    ) -> Result<ActionResult<TransferOutcome>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if !snap.bank.is_open {
            return Ok(interface_closed("bank"));
        }
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                format!("nothing matching {target} to deposit"),
            ));
        };
        let requested = amount.resolve(snap.inventory_count(item.id));

        self.transfer(
            ActionKind::Bank,
            Command::BankDeposit {
                slot: item.slot,
                amount: requested,
            },
            item.id,
            requested,
            Flow::Out,
        )
        .await
    }

    /// Withdraws into the inventory. The payload reports what actually arrived.
    pub async fn withdraw_item(
        &self,
        target: &Target<BankItem>,
        amount: Amount,
    ) -> Result<ActionResult<TransferOutcome>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if !snap.bank.is_open {
            return Ok(interface_closed("bank"));
        }
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                format!("nothing matching {target} in the bank"),
            ));
        };
        let requested = amount.resolve(item.count);

        self.transfer(
            ActionKind::Bank,
            Command::BankWithdraw {
                slot: item.slot,
                amount: requested,
            },
            item.id,
            requested,
            Flow::In,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::testkit::{SimSession, TICK, item, npc, options, snapshot_at};
    use crate::world::{BankState, DialogOption, DialogState};

    fn open_bank_world(items: Vec<InventoryItem>) -> WorldSnapshot {
        WorldSnapshot {
            inventory: items,
            bank: BankState {
                is_open: true,
                items: vec![BankItem {
                    slot: 0,
                    id: 995,
                    name: "Coins".into(),
                    count: 300,
                }],
            },
            ..snapshot_at(10, 10)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn banker_dialog_is_advanced_until_bank_opens() {
        let sim = SimSession::new(WorldSnapshot {
            npcs: vec![npc(21, "Banker", 12, 10, &["Talk-to"])],
            ..snapshot_at(10, 10)
        })
        .on_command(|cmd, w| match cmd {
            Command::InteractNpc { npc_index: 21, .. } => w.later(1, |w| {
                w.snapshot.dialog = DialogState {
                    is_open: true,
                    text: Some("Good day, how may I help you?".into()),
                    options: vec![DialogOption {
                        index: 1,
                        text: "I'd like to access my bank account, please.".into(),
                    }],
                };
            }),
            Command::ClickDialog { option: 1 } => {
                w.snapshot.dialog = DialogState::default();
                w.later(1, |w| w.snapshot.bank.is_open = true);
            }
            _ => {}
        });
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.open_bank().await.unwrap();
        assert!(res.success, "{}", res.message);
        assert_eq!(
            sim.commands(),
            vec![
                Command::InteractNpc {
                    npc_index: 21,
                    option: 1
                },
                Command::ClickDialog { option: 1 },
            ]
        );
    }

    fn silent_banker() -> SimSession {
        SimSession::new(WorldSnapshot {
            npcs: vec![npc(21, "Banker", 12, 10, &["Talk-to"])],
            ..snapshot_at(10, 10)
        })
    }

    fn interacts(commands: &[Command]) -> Vec<u8> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::InteractNpc { option, .. } => Some(*option),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_attempt_retries_with_refreshed_options() {
        // The first click is ignored; meanwhile the banker gains a "Bank" option, which the
        // second attempt must pick up.
        let sim = silent_banker().on_command(|cmd, w| match *cmd {
            Command::InteractNpc { option: 1, .. } => w.later(1, |w| {
                w.snapshot.npcs[0].options = options(&["Talk-to", "Bank"]);
            }),
            Command::InteractNpc { option: 2, .. } => {
                w.later(1, |w| w.snapshot.bank.is_open = true)
            }
            _ => {}
        });
        let (sim, bot) = sim.into_bot(BotConfig::default());
        let started = Instant::now();

        let res = bot.open_bank().await.unwrap();
        assert!(res.success, "{}", res.message);
        assert_eq!(interacts(&sim.commands()), vec![1, 2]);
        assert!(started.elapsed() >= Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn banker_leaving_between_attempts_is_no_longer_visible() {
        let sim = silent_banker().on_command(|cmd, w| {
            if matches!(cmd, Command::InteractNpc { .. }) {
                w.later(2, |w| w.snapshot.npcs.clear());
            }
        });
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.open_bank().await.unwrap();
        assert_eq!(res.reason, Some(FailureReason::NoLongerVisible));
        assert_eq!(interacts(&sim.commands()), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_cuts_attempts_short() {
        let mut config = BotConfig::default();
        config.timeouts.open_interface_ms = 7_000;
        config.transaction.open_attempt_ms = 5_000;
        config.transaction.open_attempts = 5;
        let (sim, bot) = silent_banker().into_bot(config);
        let started = Instant::now();

        let res = bot.open_bank().await.unwrap();
        assert_eq!(res.reason, Some(FailureReason::Timeout));
        // 5s for the first attempt leaves 2s for the second and none for a third.
        assert_eq!(interacts(&sim.commands()), vec![1, 1]);
        assert!(started.elapsed() >= Duration::from_millis(7_000));
        assert!(started.elapsed() < Duration::from_millis(7_000) + TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn deposit_reports_measured_delta() {
        // The server only takes 7 of the 12 asked for.
        let sim = SimSession::new(open_bank_world(vec![item(0, 1511, "Logs", 12, &[])]))
            .on_command(|cmd, w| {
                if matches!(cmd, Command::BankDeposit { .. }) {
                    w.later(1, |w| {
                        w.remove_units(1511, 7);
                    });
                }
            });
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.deposit_item(&Target::from("logs"), Amount::All).await.unwrap();
        assert!(res.success, "{}", res.message);
        let outcome = res.payload.unwrap();
        assert_eq!((outcome.requested, outcome.transferred), (12, 7));
        assert_eq!(
            sim.commands(),
            vec![Command::BankDeposit {
                slot: 0,
                amount: 12
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn withdraw_measures_inventory_growth() {
        let sim = SimSession::new(open_bank_world(Vec::new())).on_command(|cmd, w| {
            if let Command::BankWithdraw { amount, .. } = *cmd {
                w.later(1, move |w| {
                    w.snapshot.inventory.push(item(0, 995, "Coins", amount, &[]));
                    w.snapshot.bank.items[0].count -= amount;
                });
            }
        });
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot
            .withdraw_item(&Target::from("coins"), Amount::Count(100))
            .await
            .unwrap();
        assert_eq!(res.payload.map(|o| o.transferred), Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn transfers_need_an_open_bank_and_close_is_idempotent() {
        let mut world = open_bank_world(vec![item(0, 1511, "Logs", 3, &[])]);
        world.bank.is_open = false;
        let (sim, bot) = SimSession::new(world).into_bot(BotConfig::default());

        let res = bot.deposit_item(&Target::from("logs"), Amount::All).await.unwrap();
        assert_eq!(res.reason, Some(FailureReason::InterfaceClosed));
        assert!(bot.close_bank().await.unwrap().success);
        assert!(bot.close_bank().await.unwrap().success);
        assert!(sim.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_bank_is_rejected() {
        let sim = SimSession::new(open_bank_world(vec![item(0, 1511, "Logs", 3, &[])]))
            .on_command(|_, w| w.say("Your bank is full."));
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.deposit_item(&Target::from("logs"), Amount::All).await.unwrap();
        assert_eq!(
            res.reason,
            Some(FailureReason::Rejected(
                crate::action::result::RejectKind::BankFull
            ))
        );
        assert_eq!(res.payload.map(|o| o.transferred), Some(0));
    }
}
