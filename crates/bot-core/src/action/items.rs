use super::classify::ActionKind;
use super::result::{ActionResult, EatOutcome, FailureReason};
use super::{not_synced, option_named};
use crate::bot::Bot;
use crate::config::ms;
use crate::player::equipment::EquippedItem;
use crate::player::inventory::InventoryItem;
use crate::player::skills::HITPOINTS;
use crate::resolve::{Target, resolve};
use crate::session::{Command, SessionError};
use crate::world::{GroundItem, WorldSnapshot};

const EQUIP_OPTIONS: &[&str] = &["wield", "wear", "equip"];
const EAT_OPTIONS: &[&str] = &["eat", "drink"];

fn hitpoints(s: &WorldSnapshot) -> u32 {
    s.skill(HITPOINTS).map(|k| k.level).unwrap_or(0)
}

fn not_found<T, E>(target: &Target<E>, place: &str) -> ActionResult<T> {
    ActionResult::fail(
        FailureReason::TargetNotFound,
        format!("nothing matching {target} {place}"),
    )
}

impl Bot {
    /// Picks up a ground item; success is the inventory count of its id going up.
    pub async fn pickup_item(
        &self,
        target: &Target<GroundItem>,
    ) -> Result<ActionResult<GroundItem>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(not_found(target, "on the ground"));
        };
        let before = snap.inventory_count(item.id);

        let timeout = ms(self.config.timeouts.pickup_ms);
        let verified = self
            .verify(
                ActionKind::Pickup,
                Command::Pickup {
                    x: item.x,
                    z: item.z,
                    item_id: item.id,
                },
                timeout,
                |s| (s.inventory_count(item.id) > before).then_some(()),
            )
            .await?;
        Ok(verified.into_result("pickup", timeout, |_| {
            ActionResult::ok_with(format!("picked up {}", item.name), item.clone())
        }))
    }

    pub async fn equip_item(
        &self,
        target: &Target<InventoryItem>,
    ) -> Result<ActionResult<InventoryItem>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(not_found(target, "in the inventory"));
        };
        if snap.equipment_contains(item.id) {
            return Ok(ActionResult::ok_with(format!("{} already equipped", item.name), item));
        }
        let Some(option) = option_named(&item.options, EQUIP_OPTIONS) else {
            return Ok(ActionResult::fail(
                FailureReason::NoOption,
                format!("{} cannot be equipped", item.name),
            ));
        };

        let timeout = ms(self.config.timeouts.equip_ms);
        let verified = self
            .verify(
                ActionKind::Equip,
                Command::UseItem {
                    slot: item.slot,
                    option: option.index,
                },
                timeout,
                |s| s.equipment_contains(item.id).then_some(()),
            )
            .await?;
        Ok(verified.into_result("equip", timeout, |_| {
            ActionResult::ok_with(format!("equipped {}", item.name), item.clone())
        }))
    }

    /// Removes a worn item; it must leave its slot and show up in the inventory.
    pub async fn unequip_item(
        &self,
        target: &Target<EquippedItem>,
    ) -> Result<ActionResult<EquippedItem>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(not_found(target, "equipped"));
        };
        let before = snap.inventory_count(item.id);

        let timeout = ms(self.config.timeouts.equip_ms);
        let verified = self
            .verify(
                ActionKind::Unequip,
                Command::RemoveEquipment { slot: item.slot },
                timeout,
                |s| {
                    let worn = s
                        .equipment
                        .iter()
                        .any(|e| e.slot == item.slot && e.id == item.id);
                    (!worn && s.inventory_count(item.id) > before).then_some(())
                },
            )
            .await?;
        Ok(verified.into_result("unequip", timeout, |_| {
            ActionResult::ok_with(format!("removed {}", item.name), item.clone())
        }))
    }

    pub async fn eat_food(
        &self,
        target: &Target<InventoryItem>,
    ) -> Result<ActionResult<EatOutcome>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(food) = resolve(&snap, Some(target), None) else {
            return Ok(not_found(target, "in the inventory"));
        };
        let Some(option) = option_named(&food.options, EAT_OPTIONS) else {
            return Ok(ActionResult::fail(
                FailureReason::NoOption,
                format!("{} is not edible", food.name),
            ));
        };
        let before = snap.inventory_count(food.id);
        let hp_before = hitpoints(&snap);

        let timeout = ms(self.config.timeouts.eat_ms);
        let verified = self
            .verify(
                ActionKind::Eat,
                Command::UseItem {
                    slot: food.slot,
                    option: option.index,
                },
                timeout,
                |s| (s.inventory_count(food.id) < before).then(|| hitpoints(s)),
            )
            .await?;
        Ok(verified.into_result("eat", timeout, |hp_after| {
            ActionResult::ok_with(
                format!("ate {} ({hp_before} -> {hp_after} hp)", food.name),
                EatOutcome {
                    item_id: food.id,
                    hp_before,
                    hp_after,
                },
            )
        }))
    }

    pub async fn drop_item(
        &self,
        target: &Target<InventoryItem>,
    ) -> Result<ActionResult<InventoryItem>, SessionError> {
        let Some(snap) = self.baseline().await? else {
            return Ok(not_synced());
        };
        let Some(item) = resolve(&snap, Some(target), None) else {
            return Ok(not_found(target, "in the inventory"));
        };
        let before = snap.inventory_count(item.id);

        let timeout = ms(self.config.timeouts.drop_ms);
        let verified = self
            .verify(
                ActionKind::Drop,
                Command::DropItem { slot: item.slot },
                timeout,
                |s| (s.inventory_count(item.id) < before).then_some(()),
            )
            .await?;
        Ok(verified.into_result("drop", timeout, |_| {
            ActionResult::ok_with(format!("dropped {}", item.name), item.clone())
        }))
    }
}
