use serde::{Deserialize, Serialize};

use crate::player::player_state::Tile;

use super::EntityOption;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NearbyNpc {
    /// Server-side NPC slot; stable for the NPC's lifetime and the identity used to re-resolve it.
    pub index: u32,
    #[serde(default)]
    pub id: u32,
    pub name: String,
    pub x: i32,
    pub z: i32,
    pub distance: f64,
    #[serde(default)]
    pub combat_level: u32,
    #[serde(default)]
    pub in_combat: bool,
    /// (current, max) when the NPC's health bar has been seen.
    #[serde(default)]
    pub health: Option<(u32, u32)>,
    #[serde(default)]
    pub options: Vec<EntityOption>,
}

impl NearbyNpc {
    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }
}
