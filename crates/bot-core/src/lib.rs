//! Verified action layer over a polled, tick-based game session.
//!
//! The remote session accepts intent-only commands and exposes world snapshots. This crate
//! turns that into awaitable actions (walk, attack, bank, shop, ...) that report whether the
//! effect actually happened, and why not when it did not.

pub mod action;
pub mod bot;
pub mod config;
pub mod movement;
pub mod player;
pub mod resolve;
pub mod session;
pub mod transaction;
pub mod wait;
pub mod world;

#[cfg(test)]
mod testkit;

pub use action::{ActionKind, ActionResult, FailureReason, RejectKind};
pub use bot::Bot;
pub use config::{BotConfig, ConfigLoader};
pub use movement::MovementProgress;
pub use player::player_state::Tile;
pub use resolve::{Pattern, Target};
pub use session::{Command, Session, SessionError};
pub use transaction::Amount;
pub use world::WorldSnapshot;
