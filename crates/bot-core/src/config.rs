use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::action::classify::{ClassifierRule, default_rules};

/// Tuning for every verified action. All fields have defaults, so a config file only lists
/// what it overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub timeouts: Timeouts,
    pub movement: MovementConfig,
    pub interaction: InteractionConfig,
    pub transaction: TransactionConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Timeouts {
    pub attack_ms: u64,
    pub cast_ms: u64,
    pub combat_style_ms: u64,
    pub pickup_ms: u64,
    pub drop_ms: u64,
    pub equip_ms: u64,
    pub eat_ms: u64,
    pub chop_ms: u64,
    pub burn_ms: u64,
    pub talk_ms: u64,
    pub door_ms: u64,
    /// Per click while dismissing dialogs.
    pub dismiss_step_ms: u64,
    pub open_interface_ms: u64,
    pub close_interface_ms: u64,
    pub transfer_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            attack_ms: 10_000,
            cast_ms: 8_000,
            combat_style_ms: 3_000,
            pickup_ms: 8_000,
            drop_ms: 4_000,
            equip_ms: 4_000,
            eat_ms: 4_000,
            chop_ms: 30_000,
            burn_ms: 20_000,
            talk_ms: 10_000,
            door_ms: 8_000,
            dismiss_step_ms: 2_000,
            open_interface_ms: 15_000,
            close_interface_ms: 3_000,
            transfer_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MovementConfig {
    /// Upper bound on plan/walk attempts in one `walk_to`.
    pub max_iterations: u32,
    /// Waypoints covered by one walk command.
    pub stride: usize,
    pub max_waypoints: u32,
    pub run: bool,
    /// Goals farther than this get the detour search when the pathfinder returns nothing.
    pub long_range_threshold: f64,
    pub detour_fractions: Vec<f64>,
    pub detour_offsets: Vec<i32>,
    /// Assumed traversal speed for adaptive segment timeouts.
    pub tiles_per_second: f64,
    pub timeout_margin: f64,
    pub min_segment_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub stuck_threshold_ms: u64,
    /// Tiles an attempt must gain toward the goal to count as progress.
    pub min_progress: f64,
    pub stalled_attempts: u32,
    /// Tolerance for reaching an intermediate waypoint.
    pub waypoint_tolerance: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_iterations: 12,
            stride: 10,
            max_waypoints: 500,
            run: true,
            long_range_threshold: 40.0,
            detour_fractions: vec![0.75, 0.5, 0.25],
            detour_offsets: vec![0, 8, -8, 16, -16],
            tiles_per_second: 2.0,
            timeout_margin: 1.5,
            min_segment_timeout_ms: 5_000,
            poll_interval_ms: 300,
            stuck_threshold_ms: 3_000,
            min_progress: 2.0,
            stalled_attempts: 3,
            waypoint_tolerance: 1.5,
        }
    }
}

impl MovementConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stuck_threshold(&self) -> Duration {
        Duration::from_millis(self.stuck_threshold_ms)
    }

    /// Straight-line distance over the assumed speed, with margin, floored.
    pub fn segment_timeout(&self, distance: f64) -> Duration {
        let floor = Duration::from_millis(self.min_segment_timeout_ms);
        if self.tiles_per_second <= 0.0 {
            return floor;
        }
        let secs = distance.max(0.0) / self.tiles_per_second * self.timeout_margin;
        Duration::from_secs_f64(secs).max(floor)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InteractionConfig {
    /// Proximity-gated actions walk first when the target is farther than this.
    pub approach_distance: f64,
    /// How close the approach walk gets before interacting.
    pub approach_tolerance: f64,
    /// Minimum ticks between two automatic dialog clicks while waiting.
    pub dialog_cooldown_ticks: u64,
    pub max_dismiss_clicks: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            approach_distance: 8.0,
            approach_tolerance: 2.0,
            dialog_cooldown_ticks: 2,
            max_dismiss_clicks: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TransactionConfig {
    pub open_attempts: u32,
    pub open_attempt_ms: u64,
    /// Most units one sell click may move.
    pub shop_sell_batch: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            open_attempts: 3,
            open_attempt_ms: 5_000,
            shop_sell_batch: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rules: Vec<ClassifierRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Loads TOML config files.
///
/// Search order:
/// 1) `TICKBOT_CONFIG_DIR/<relative_path>`
/// 2) `./<relative_path>`
/// 3) `<repo_root>/config/<relative_path>`
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn parse_from_file<T: DeserializeOwned>(relative_path: &str) -> anyhow::Result<T> {
        let path = Self::resolve_path(relative_path)?;
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse_from_string(&text)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn parse_from_string<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
        toml::from_str(text).context("Failed to parse TOML")
    }

    fn resolve_path(relative_path: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(relative_path);

        if let Some(root) = env::var_os("TICKBOT_CONFIG_DIR") {
            let candidate = PathBuf::from(root).join(rel);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        if let Ok(cwd) = env::current_dir() {
            let candidate = cwd.join(rel);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        // This crate lives at <repo_root>/crates/bot-core.
        let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .nth(2)
            .ok_or_else(|| anyhow::anyhow!("CARGO_MANIFEST_DIR has insufficient ancestors"))?
            .join("config")
            .join(rel);
        if candidate.is_file() {
            return Ok(candidate);
        }

        anyhow::bail!("Config file not found for {:?}", rel);
    }
}
