use super::{Amount, Counter, Flow, interface_closed};
use crate::action::classify::ActionKind;
use crate::action::result::{ActionResult, FailureReason, RejectKind, SellOutcome, TransferOutcome};
use crate::action::{Verified, not_synced};
use crate::bot::Bot;
use crate::config::ms;
use crate::player::inventory::InventoryItem;
use crate::resolve::{Pattern, Target, has_option, nearest, resolve, resolve_where};
use crate::session::{Command, SessionError};
use crate::world::{NearbyNpc, ShopItem, WorldSnapshot};

const SHOP_OPTIONS: &[&str] = &["trade"];

fn shop_open(s: &WorldSnapshot) -> bool {
    s.shop.is_open
}

impl Bot {
    /// Opens a shop, by default with the nearest NPC offering "Trade".
    pub async fn open_shop(
        &self,
        target: Option<&Target<NearbyNpc>>,
    ) -> Result<ActionResult<()>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if snap.shop.is_open {
            return Ok(ActionResult::ok(format!("{} already open", snap.shop.title)));
        }
        let trade = Pattern::contains("trade");
        let keeper = match target {
            Some(t) => resolve_where(&snap, Some(t), None, |n: &NearbyNpc| {
                has_option(&n.options, &trade)
            }),
            None => nearest(snap.npcs.iter().filter(|n| has_option(&n.options, &trade))),
        };
        let Some(keeper) = keeper else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                match target {
                    Some(t) => format!("no shopkeeper matching {t}"),
                    None => "no shopkeeper nearby".to_string(),
                },
            ));
        };
        self.open_modal(ActionKind::Shop, Counter::Npc(keeper), SHOP_OPTIONS, shop_open)
            .await
    }

    /// Idempotent; safe to call whether or not a shop is open.
    pub async fn close_shop(&self) -> Result<ActionResult<()>, SessionError> {
        self.close_modal("shop", shop_open).await
    }

    /// Buys up to `amount`; the payload is what actually arrived in the inventory.
    pub async fn buy_from_shop(
        &self,
        target: &Target<ShopItem>,
        amount: u32,
    ) -> Result<ActionResult<TransferOutcome>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if !snap.shop.is_open {
            return Ok(interface_closed("shop"));
        }
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                format!("{} does not sell {target}", snap.shop.title),
            ));
        };
        if item.count == 0 {
            return Ok(ActionResult::fail(
                FailureReason::Rejected(RejectKind::OutOfStock),
                format!("{} is out of stock", item.name),
            ));
        }

        self.transfer(
            ActionKind::Shop,
            Command::ShopBuy {
                slot: item.slot,
                amount,
            },
            item.id,
            amount,
            Flow::In,
        )
        .await
    }

    /// Sells in batches of at most the configured size, accumulating measured deltas.
    ///
    /// Stops when nothing is left to sell, on a refusal message (reported with its sub-type
    /// and whatever was sold before it), or on a batch that moved nothing.
    pub async fn sell_to_shop(
        &self,
        target: &Target<InventoryItem>,
        amount: Amount,
    ) -> Result<ActionResult<SellOutcome>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        if !snap.shop.is_open {
            return Ok(interface_closed("shop"));
        }
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(ActionResult::fail(
                FailureReason::TargetNotFound,
                format!("nothing matching {target} to sell"),
            ));
        };

        let goal = amount.resolve(snap.inventory_count(item.id));
        let batch_cap = self.config.transaction.shop_sell_batch.max(1);
        let timeout = ms(self.config.timeouts.transfer_ms);
        let mut outcome = SellOutcome {
            item_id: item.id,
            amount_sold: 0,
            batches: 0,
        };

        while outcome.amount_sold < goal {
            let Some(snap) = self.snapshot() else {
                return Ok(not_synced::<SellOutcome>().with_payload(outcome));
            };
            let Some(slot) = snap.inventory.iter().find(|i| i.id == item.id).map(|i| i.slot) else {
                break;
            };
            let before = snap.inventory_count(item.id);
            let batch = (goal - outcome.amount_sold).min(batch_cap);

            let verified = self
                .verify(
                    ActionKind::Shop,
                    Command::ShopSell {
                        slot,
                        amount: batch,
                    },
                    timeout,
                    |s| {
                        let now = s.inventory_count(item.id);
                        (now < before).then_some(now)
                    },
                )
                .await?;
            let after = match &verified {
                Verified::Done(now) => *now,
                _ => self
                    .snapshot()
                    .map(|s| s.inventory_count(item.id))
                    .unwrap_or(before),
            };
            let sold = before.saturating_sub(after);
            outcome.amount_sold += sold;
            outcome.batches += 1;
            tracing::debug!(item_id = item.id, batch, sold, total = outcome.amount_sold, "shop.sell_batch");

            match verified {
                Verified::Done(_) => {}
                Verified::Failed(hit) => {
                    return Ok(ActionResult::fail(
                        hit.reason,
                        format!("sold {} before: {}", outcome.amount_sold, hit.message),
                    )
                    .with_payload(outcome));
                }
                other if sold == 0 => {
                    return Ok(other
                        .into_result("sell", timeout, |_: u32| {
                            ActionResult::fail(FailureReason::Timeout, "sale made no progress")
                        })
                        .with_payload(outcome));
                }
                _ => {}
            }
        }

        Ok(ActionResult::ok_with(
            format!("sold {} {}", outcome.amount_sold, item.name),
            outcome,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::testkit::{SimSession, item, npc, snapshot_at};
    use crate::world::ShopState;

    fn shop_world(inventory: Vec<InventoryItem>) -> WorldSnapshot {
        WorldSnapshot {
            inventory,
            shop: ShopState {
                is_open: true,
                title: "General Store".into(),
                stock: vec![ShopItem {
                    slot: 0,
                    id: 1931,
                    name: "Pot".into(),
                    count: 5,
                    base_cost: 1,
                }],
            },
            ..snapshot_at(10, 10)
        }
    }

    fn sells(commands: &[Command]) -> Vec<u32> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::ShopSell { amount, .. } => Some(*amount),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn sell_all_batches_across_stacks() {
        let sim = SimSession::new(shop_world(vec![
            item(0, 1511, "Logs", 7, &[]),
            item(1, 1511, "Logs", 5, &[]),
        ]))
        .on_command(|cmd, w| {
            if let Command::ShopSell { amount, .. } = *cmd {
                w.later(1, move |w| {
                    w.remove_units(1511, amount);
                });
            }
        });
        let (sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.sell_to_shop(&Target::from("logs"), Amount::All).await.unwrap();
        assert!(res.success, "{}", res.message);
        let outcome = res.payload.unwrap();
        assert_eq!((outcome.amount_sold, outcome.batches), (12, 2));
        assert_eq!(sells(&sim.commands()), vec![10, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_mid_loop_keeps_partial_total() {
        let sim = SimSession::new(shop_world(vec![item(0, 1511, "Logs", 12, &[])])).on_command({
            let mut calls = 0;
            move |cmd, w| {
                if let Command::ShopSell { amount, .. } = *cmd {
                    calls += 1;
                    if calls == 1 {
                        w.later(1, move |w| {
                            w.remove_units(1511, amount);
                        });
                    } else {
                        w.say("You can't sell this item to this shop.");
                    }
                }
            }
        });
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        let res = bot.sell_to_shop(&Target::from("logs"), Amount::All).await.unwrap();
        assert!(!res.success);
        assert_eq!(
            res.reason,
            Some(FailureReason::Rejected(RejectKind::NotBuyableHere))
        );
        assert_eq!(res.payload.map(|o| o.amount_sold), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_without_progress_stops_the_loop() {
        let (sim, bot) = SimSession::new(shop_world(vec![item(0, 1511, "Logs", 4, &[])]))
            .into_bot(BotConfig::default());

        let res = bot
            .sell_to_shop(&Target::from("logs"), Amount::Count(3))
            .await
            .unwrap();
        assert_eq!(res.reason, Some(FailureReason::Timeout));
        assert_eq!(res.payload.map(|o| o.amount_sold), Some(0));
        assert_eq!(sells(&sim.commands()), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn buy_and_open_shop_by_trade_option() {
        let sim = SimSession::new(WorldSnapshot {
            npcs: vec![
                npc(30, "Man", 11, 10, &["Talk-to"]),
                npc(31, "Shop keeper", 13, 10, &["Talk-to", "Trade"]),
            ],
            ..snapshot_at(10, 10)
        })
        .on_command(|cmd, w| match *cmd {
            Command::InteractNpc {
                npc_index: 31,
                option: 2,
            } => w.later(1, |w| {
                w.snapshot.shop = shop_world(Vec::new()).shop;
            }),
            Command::ShopBuy { amount, .. } => w.later(1, move |w| {
                w.snapshot.inventory.push(item(0, 1931, "Pot", amount, &[]));
            }),
            Command::CloseInterface => w.snapshot.shop.is_open = false,
            _ => {}
        });
        let (_sim, bot) = sim.into_bot(BotConfig::default());

        assert!(bot.open_shop(None).await.unwrap().success);
        let res = bot.buy_from_shop(&Target::from("pot"), 2).await.unwrap();
        assert_eq!(res.payload.map(|o| o.transferred), Some(2));
        assert!(bot.close_shop().await.unwrap().success);
        assert!(bot.close_shop().await.unwrap().success);
    }
}
