use serde::{Deserialize, Serialize};

use crate::player::equipment::Equipment;
use crate::player::inventory::{Inventory, count_of};
use crate::player::player_state::{PlayerState, Tile};
use crate::player::skills::{Skill, Skills};

use super::{BankState, ChatMessage, DialogState, GroundItem, InterfaceState, NearbyLoc, NearbyNpc, ShopState};

/// One immutable read of the session at the most recent poll.
///
/// `player` is `None` until the session has synced; callers treat that as "not ready yet",
/// never as an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct WorldSnapshot {
    pub tick: u64,
    #[serde(default)]
    pub player: Option<PlayerState>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub npcs: Vec<NearbyNpc>,
    #[serde(default)]
    pub locs: Vec<NearbyLoc>,
    #[serde(default)]
    pub ground_items: Vec<GroundItem>,
    #[serde(default)]
    pub dialog: DialogState,
    #[serde(default)]
    pub interface: InterfaceState,
    #[serde(default)]
    pub shop: ShopState,
    #[serde(default)]
    pub bank: BankState,
    /// Recent chat/game messages, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl WorldSnapshot {
    pub fn position(&self) -> Option<Tile> {
        self.player.as_ref().map(PlayerState::tile)
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn skill_xp(&self, name: &str) -> u64 {
        self.skill(name).map(|s| s.experience).unwrap_or(0)
    }

    pub fn inventory_count(&self, id: u32) -> u32 {
        count_of(&self.inventory, id)
    }

    pub fn equipment_contains(&self, id: u32) -> bool {
        self.equipment.iter().any(|e| e.id == id)
    }

    /// Messages that arrived strictly after `tick`; only these can be evidence for an action
    /// whose command was sent at `tick`.
    pub fn messages_after(&self, tick: u64) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(move |m| m.tick > tick)
    }

    /// True while a dialog or interface is covering the game screen.
    pub fn is_blocked_by_ui(&self) -> bool {
        self.dialog.is_open || self.interface.is_open
    }
}
