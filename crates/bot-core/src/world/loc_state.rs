use serde::{Deserialize, Serialize};

use crate::player::player_state::Tile;

use super::EntityOption;

/// A static world object: tree, door, bank booth, range.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NearbyLoc {
    pub id: u32,
    pub name: String,
    pub x: i32,
    pub z: i32,
    pub distance: f64,
    #[serde(default)]
    pub options: Vec<EntityOption>,
}

impl NearbyLoc {
    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GroundItem {
    pub id: u32,
    pub name: String,
    pub x: i32,
    pub z: i32,
    #[serde(default = "crate::player::inventory::one")]
    pub count: u32,
    pub distance: f64,
}

impl GroundItem {
    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }
}
