//! Intermediate goals for when the pathfinder returns nothing for a distant target.
//!
//! The pathfinder has a blind spot at long range. The straight-line heuristic below is tuned
//! by hand and not proven for all terrain, so it sits behind [`DetourSearch`].

use crate::config::MovementConfig;
use crate::player::player_state::Tile;

pub trait DetourSearch: Send + Sync {
    /// Candidate intermediate goals, best first. Each is path-queried in order.
    fn candidates(&self, from: Tile, goal: Tile) -> Vec<Tile>;
}

/// Points at shrinking fractions of the straight line to the goal, each tried at several
/// perpendicular offsets.
#[derive(Debug, Clone)]
pub struct StraightLineDetour {
    fractions: Vec<f64>,
    offsets: Vec<i32>,
}

impl StraightLineDetour {
    pub fn new(fractions: Vec<f64>, offsets: Vec<i32>) -> Self {
        Self { fractions, offsets }
    }

    pub fn from_config(cfg: &MovementConfig) -> Self {
        Self::new(cfg.detour_fractions.clone(), cfg.detour_offsets.clone())
    }
}

impl DetourSearch for StraightLineDetour {
    fn candidates(&self, from: Tile, goal: Tile) -> Vec<Tile> {
        let dx = f64::from(goal.x - from.x);
        let dz = f64::from(goal.z - from.z);
        let len = (dx * dx + dz * dz).sqrt();
        if len < 1.0 {
            return Vec::new();
        }
        // Unit vector perpendicular to the travel direction.
        let (px, pz) = (-dz / len, dx / len);

        let mut out = Vec::with_capacity(self.fractions.len() * self.offsets.len());
        for &fraction in &self.fractions {
            let mx = f64::from(from.x) + dx * fraction;
            let mz = f64::from(from.z) + dz * fraction;
            for &offset in &self.offsets {
                let o = f64::from(offset);
                let tile = Tile::new((mx + px * o).round() as i32, (mz + pz * o).round() as i32);
                if !out.contains(&tile) {
                    out.push(tile);
                }
            }
        }
        out
    }
}
