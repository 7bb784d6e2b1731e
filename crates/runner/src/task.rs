//! One porcelain command per run, parsed from a short text form such as `walk 3253 3270` or
//! `bank-deposit raw shrimps all`.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use tickbot_core::{ActionResult, Amount, Bot, Target};

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Walk { x: i32, z: i32, tolerance: f64 },
    Attack(String),
    Cast { spell: u32, npc: String },
    CombatStyle(u8),
    Pickup(String),
    Drop(String),
    Equip(String),
    Unequip(String),
    Eat(String),
    Chop(Option<String>),
    Burn(Option<String>),
    Talk(String),
    Door(Option<String>),
    Dismiss,
    BankOpen,
    BankClose,
    BankDeposit { item: String, amount: Amount },
    BankWithdraw { item: String, amount: Amount },
    ShopOpen(Option<String>),
    ShopClose,
    ShopBuy { item: String, amount: u32 },
    ShopSell { item: String, amount: Amount },
    WaitLevel { skill: String, level: u32, secs: u64 },
    WaitItem { item: String, secs: u64 },
    WaitDialogClose { secs: u64 },
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let word = word.ok_or_else(|| anyhow::anyhow!("missing {what}"))?;
    word.parse()
        .with_context(|| format!("invalid {what}: {word:?}"))
}

fn amount(word: Option<&str>) -> anyhow::Result<Amount> {
    match word {
        Some(w) if w.eq_ignore_ascii_case("all") => Ok(Amount::All),
        other => number(other, "amount").map(Amount::Count),
    }
}

/// Splits `name... last` so item names may contain spaces.
fn name_and_last<'a>(rest: &[&'a str]) -> anyhow::Result<(String, &'a str)> {
    match rest.split_last() {
        Some((last, name)) if !name.is_empty() => Ok((name.join(" "), *last)),
        _ => anyhow::bail!("expected <name> <amount>"),
    }
}

fn required(rest: &[&str]) -> anyhow::Result<String> {
    if rest.is_empty() {
        anyhow::bail!("missing name");
    }
    Ok(rest.join(" "))
}

fn optional(rest: &[&str]) -> Option<String> {
    (!rest.is_empty()).then(|| rest.join(" "))
}

impl Task {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let Some((verb, rest)) = words.split_first() else {
            anyhow::bail!("empty command");
        };
        let arg = |i: usize| rest.get(i).copied();

        let task = match verb.to_ascii_lowercase().as_str() {
            "walk" => Task::Walk {
                x: number(arg(0), "x")?,
                z: number(arg(1), "z")?,
                tolerance: match arg(2) {
                    Some(_) => number(arg(2), "tolerance")?,
                    None => 2.0,
                },
            },
            "attack" => Task::Attack(required(rest)?),
            "cast" => Task::Cast {
                spell: number(arg(0), "spell")?,
                npc: required(rest.get(1..).unwrap_or_default())?,
            },
            "style" => Task::CombatStyle(number(arg(0), "style")?),
            "pickup" => Task::Pickup(required(rest)?),
            "drop" => Task::Drop(required(rest)?),
            "equip" => Task::Equip(required(rest)?),
            "unequip" => Task::Unequip(required(rest)?),
            "eat" => Task::Eat(required(rest)?),
            "chop" => Task::Chop(optional(rest)),
            "burn" => Task::Burn(optional(rest)),
            "talk" => Task::Talk(required(rest)?),
            "door" => Task::Door(optional(rest)),
            "dismiss" => Task::Dismiss,
            "bank-open" => Task::BankOpen,
            "bank-close" => Task::BankClose,
            "bank-deposit" => {
                let (item, last) = name_and_last(rest)?;
                Task::BankDeposit {
                    item,
                    amount: amount(Some(last))?,
                }
            }
            "bank-withdraw" => {
                let (item, last) = name_and_last(rest)?;
                Task::BankWithdraw {
                    item,
                    amount: amount(Some(last))?,
                }
            }
            "shop-open" => Task::ShopOpen(optional(rest)),
            "shop-close" => Task::ShopClose,
            "shop-buy" => {
                let (item, last) = name_and_last(rest)?;
                Task::ShopBuy {
                    item,
                    amount: number(Some(last), "amount")?,
                }
            }
            "shop-sell" => {
                let (item, last) = name_and_last(rest)?;
                Task::ShopSell {
                    item,
                    amount: amount(Some(last))?,
                }
            }
            "wait-level" => Task::WaitLevel {
                skill: required(rest.get(..1).unwrap_or_default())?,
                level: number(arg(1), "level")?,
                secs: number(arg(2), "seconds")?,
            },
            "wait-item" => {
                let (item, last) = name_and_last(rest)?;
                Task::WaitItem {
                    item,
                    secs: number(Some(last), "seconds")?,
                }
            }
            "wait-dialog-close" => Task::WaitDialogClose {
                secs: number(arg(0), "seconds")?,
            },
            other => anyhow::bail!("unknown command {other:?}"),
        };
        Ok(task)
    }
}

fn to_json<T: Serialize>(res: ActionResult<T>) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(res).context("encode result")
}

fn pattern<T>(name: &str) -> Target<T> {
    Target::from(name)
}

/// Runs `task` and returns its `ActionResult` as JSON.
pub async fn run(bot: &Bot, task: &Task) -> anyhow::Result<serde_json::Value> {
    tracing::info!(?task, "task.start");
    let out = match task {
        Task::Walk { x, z, tolerance } => to_json(bot.walk_to(*x, *z, *tolerance).await?),
        Task::Attack(npc) => to_json(bot.attack_npc(&pattern(npc)).await?),
        Task::Cast { spell, npc } => to_json(bot.cast_spell_on_npc(&pattern(npc), *spell).await?),
        Task::CombatStyle(style) => to_json(bot.set_combat_style(*style).await?),
        Task::Pickup(item) => to_json(bot.pickup_item(&pattern(item)).await?),
        Task::Drop(item) => to_json(bot.drop_item(&pattern(item)).await?),
        Task::Equip(item) => to_json(bot.equip_item(&pattern(item)).await?),
        Task::Unequip(item) => to_json(bot.unequip_item(&pattern(item)).await?),
        Task::Eat(item) => to_json(bot.eat_food(&pattern(item)).await?),
        Task::Chop(tree) => {
            let target = tree.as_deref().map(pattern);
            to_json(bot.chop_tree(target.as_ref()).await?)
        }
        Task::Burn(logs) => {
            let target = logs.as_deref().map(pattern);
            to_json(bot.burn_logs(target.as_ref()).await?)
        }
        Task::Talk(npc) => to_json(bot.talk_to(&pattern(npc)).await?),
        Task::Door(door) => {
            let target = door.as_deref().map(pattern);
            to_json(bot.open_door(target.as_ref()).await?)
        }
        Task::Dismiss => to_json(bot.dismiss_blocking_ui().await?),
        Task::BankOpen => to_json(bot.open_bank().await?),
        Task::BankClose => to_json(bot.close_bank().await?),
        Task::BankDeposit { item, amount } => {
            to_json(bot.deposit_item(&pattern(item), *amount).await?)
        }
        Task::BankWithdraw { item, amount } => {
            to_json(bot.withdraw_item(&pattern(item), *amount).await?)
        }
        Task::ShopOpen(keeper) => {
            let target = keeper.as_deref().map(pattern);
            to_json(bot.open_shop(target.as_ref()).await?)
        }
        Task::ShopClose => to_json(bot.close_shop().await?),
        Task::ShopBuy { item, amount } => to_json(bot.buy_from_shop(&pattern(item), *amount).await?),
        Task::ShopSell { item, amount } => to_json(bot.sell_to_shop(&pattern(item), *amount).await?),
        Task::WaitLevel {
            skill,
            level,
            secs,
        } => to_json(
            bot.wait_for_skill_level(skill, *level, Duration::from_secs(*secs))
                .await?,
        ),
        Task::WaitItem { item, secs } => to_json(
            bot.wait_for_inventory_item(&item.as_str().into(), Duration::from_secs(*secs))
                .await?,
        ),
        Task::WaitDialogClose { secs } => {
            to_json(bot.wait_for_dialog_close(Duration::from_secs(*secs)).await?)
        }
    }?;
    Ok(out)
}
