use serde::{Deserialize, Serialize};

use crate::world::EntityOption;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EquippedItem {
    pub slot: u32,
    pub id: u32,
    pub name: String,
    #[serde(default = "super::inventory::one")]
    pub count: u32,
    #[serde(default)]
    pub options: Vec<EntityOption>,
}

pub type Equipment = Vec<EquippedItem>;
