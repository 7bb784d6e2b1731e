use serde::{Deserialize, Serialize};

/// A map tile. `z` is the north/south axis; the plane is tracked on the player.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x: i32,
    pub z: i32,
}

impl Tile {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Straight-line distance in tiles.
    pub fn distance_to(&self, other: Tile) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dz = f64::from(self.z - other.z);
        (dx * dx + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PlayerState {
    #[serde(default)]
    pub name: String,
    pub x: i32,
    pub z: i32,
    #[serde(default)]
    pub plane: u8,
    /// Current animation id, -1 when idle.
    #[serde(default = "idle_animation")]
    pub animation: i32,
    #[serde(default)]
    pub in_combat: bool,
    #[serde(default)]
    pub combat_style: u8,
}

fn idle_animation() -> i32 {
    -1
}

impl PlayerState {
    pub fn new(name: impl Into<String>, x: i32, z: i32) -> Self {
        Self {
            name: name.into(),
            x,
            z,
            plane: 0,
            animation: idle_animation(),
            in_combat: false,
            combat_style: 0,
        }
    }

    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }

    pub fn is_animating(&self) -> bool {
        self.animation != -1
    }
}
