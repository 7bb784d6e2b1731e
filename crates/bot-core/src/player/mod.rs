pub mod equipment;
pub mod inventory;
pub mod player_state;
pub mod skills;
