use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DialogOption {
    pub index: u8,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DialogState {
    pub is_open: bool,
    #[serde(default)]
    pub text: Option<String>,
    /// Empty while the dialog only offers "click to continue".
    #[serde(default)]
    pub options: Vec<DialogOption>,
}

/// Generic modal interfaces such as level-up notices.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InterfaceState {
    pub is_open: bool,
    #[serde(default)]
    pub interface_id: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ShopItem {
    pub slot: u32,
    pub id: u32,
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub base_cost: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ShopState {
    pub is_open: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub stock: Vec<ShopItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BankItem {
    pub slot: u32,
    pub id: u32,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BankState {
    pub is_open: bool,
    #[serde(default)]
    pub items: Vec<BankItem>,
}
