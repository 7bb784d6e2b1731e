//! Immutable world snapshots as produced by the polled state source.

pub mod interface;
pub mod loc_state;
pub mod npc_state;
pub mod world_state;

use serde::{Deserialize, Serialize};

pub use interface::{BankItem, BankState, DialogOption, DialogState, InterfaceState, ShopItem, ShopState};
pub use loc_state::{GroundItem, NearbyLoc};
pub use npc_state::NearbyNpc;
pub use world_state::WorldSnapshot;

/// One right-click option on an entity or item. `index` is what the command channel expects.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EntityOption {
    pub index: u8,
    pub text: String,
}

impl EntityOption {
    pub fn new(index: u8, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub tick: u64,
    pub text: String,
    #[serde(default)]
    pub sender: Option<String>,
}
