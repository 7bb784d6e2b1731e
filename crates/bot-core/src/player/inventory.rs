use serde::{Deserialize, Serialize};

use crate::world::EntityOption;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InventoryItem {
    pub slot: u32,
    pub id: u32,
    pub name: String,
    #[serde(default = "one")]
    pub count: u32,
    #[serde(default)]
    pub options: Vec<EntityOption>,
}

pub(crate) fn one() -> u32 {
    1
}

pub type Inventory = Vec<InventoryItem>;

/// Total units of `id` across every slot; unstackable items count one per slot.
pub fn count_of(inventory: &[InventoryItem], id: u32) -> u32 {
    inventory
        .iter()
        .filter(|item| item.id == id)
        .map(|item| item.count)
        .sum()
}
