use serde::{Deserialize, Serialize};

/// Intent-only primitives accepted by the remote session.
///
/// Sending one of these says nothing about whether it took effect; the verified layer finds
/// that out from later snapshots.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Walk { x: i32, z: i32, running: bool },
    InteractNpc { npc_index: u32, option: u8 },
    InteractLoc { x: i32, z: i32, loc_id: u32, option: u8 },
    UseItem { slot: u32, option: u8 },
    UseItemOnItem { slot: u32, target_slot: u32 },
    UseItemOnLoc { slot: u32, x: i32, z: i32, loc_id: u32 },
    Pickup { x: i32, z: i32, item_id: u32 },
    DropItem { slot: u32 },
    RemoveEquipment { slot: u32 },
    /// `option` 0 is "click to continue".
    ClickDialog { option: u8 },
    CloseInterface,
    BankDeposit { slot: u32, amount: u32 },
    BankWithdraw { slot: u32, amount: u32 },
    ShopBuy { slot: u32, amount: u32 },
    ShopSell { slot: u32, amount: u32 },
    SetCombatStyle { style: u8 },
    SpellOnNpc { npc_index: u32, spell: u32 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Walk { .. } => "walk",
            Command::InteractNpc { .. } => "interact_npc",
            Command::InteractLoc { .. } => "interact_loc",
            Command::UseItem { .. } => "use_item",
            Command::UseItemOnItem { .. } => "use_item_on_item",
            Command::UseItemOnLoc { .. } => "use_item_on_loc",
            Command::Pickup { .. } => "pickup",
            Command::DropItem { .. } => "drop_item",
            Command::RemoveEquipment { .. } => "remove_equipment",
            Command::ClickDialog { .. } => "click_dialog",
            Command::CloseInterface => "close_interface",
            Command::BankDeposit { .. } => "bank_deposit",
            Command::BankWithdraw { .. } => "bank_withdraw",
            Command::ShopBuy { .. } => "shop_buy",
            Command::ShopSell { .. } => "shop_sell",
            Command::SetCombatStyle { .. } => "set_combat_style",
            Command::SpellOnNpc { .. } => "spell_on_npc",
        }
    }
}

/// Local validation result for a sent command. `accepted` never means the effect happened.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandAck {
    pub accepted: bool,
    #[serde(default)]
    pub message: String,
}

impl CommandAck {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct Waypoint {
    pub x: i32,
    pub z: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathResult {
    pub success: bool,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl PathResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn usable(&self) -> bool {
        self.success && !self.waypoints.is_empty()
    }
}
