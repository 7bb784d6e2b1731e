use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Skill {
    pub name: String,
    /// Current (boosted or drained) level.
    pub level: u32,
    pub base_level: u32,
    pub experience: u64,
}

pub type Skills = Vec<Skill>;

pub const WOODCUTTING: &str = "woodcutting";
pub const FIREMAKING: &str = "firemaking";
pub const MAGIC: &str = "magic";
pub const HITPOINTS: &str = "hitpoints";
