//! Multi-waypoint walking with replanning and stuck detection.
//!
//! `walk_to` plans a path, walks it a stride of waypoints at a time, and replans whenever a
//! stride stops short. Progress toward the goal is tracked across replans so a wall the
//! pathfinder keeps routing into ends the call instead of looping.

pub mod detour;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::action::result::{ActionResult, FailureReason};
use crate::bot::Bot;
use crate::config::ms;
use crate::player::player_state::Tile;
use crate::session::{Command, SessionError, Waypoint};

pub use detour::{DetourSearch, StraightLineDetour};

/// Where one bounded movement wait ended up.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct MovementProgress {
    pub arrived: bool,
    /// Position stayed unchanged past the stuck threshold without arriving.
    pub stopped_moving: bool,
    pub x: i32,
    pub z: i32,
}

impl MovementProgress {
    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }
}

impl Bot {
    /// Walks to within `tolerance` tiles of `(x, z)`. The payload is the final position.
    pub async fn walk_to(
        &self,
        x: i32,
        z: i32,
        tolerance: f64,
    ) -> Result<ActionResult<Tile>, SessionError> {
        let cfg = &self.config.movement;
        let goal = Tile::new(x, z);

        let Some(start) = self
            .synced_snapshot(ms(cfg.min_segment_timeout_ms))
            .await?
            .and_then(|s| s.position())
        else {
            return Ok(ActionResult::fail(
                FailureReason::Timeout,
                "session has no player position",
            ));
        };

        if start.distance_to(goal) <= tolerance {
            return Ok(ActionResult::ok_with(
                format!("already within {tolerance} of ({x}, {z})"),
                start,
            ));
        }

        let mut here = start;
        let mut best = start.distance_to(goal);
        let mut stalled = 0;

        for attempt in 1..=cfg.max_iterations {
            let Some(waypoints) = self.plan_path(here, goal).await? else {
                tracing::debug!(x, z, attempt, "walk.direct");
                self.session
                    .send(Command::Walk {
                        x,
                        z,
                        running: cfg.run,
                    })
                    .await?;
                let progress = self.wait_for_movement_complete(x, z, tolerance, here).await;
                return Ok(if progress.arrived {
                    ActionResult::ok_with(format!("arrived at ({x}, {z})"), progress.tile())
                } else {
                    ActionResult::fail(
                        FailureReason::WalkFailed,
                        format!(
                            "no path to ({x}, {z}); direct walk stopped at ({}, {})",
                            progress.x, progress.z
                        ),
                    )
                    .with_payload(progress.tile())
                });
            };

            let last = waypoints.len().saturating_sub(1);
            for (i, chunk) in waypoints.chunks(cfg.stride.max(1)).enumerate() {
                let Some(wp) = chunk.last() else { continue };
                let is_last = (i + 1) * cfg.stride.max(1) > last;
                let wp_tolerance = if is_last {
                    tolerance.max(cfg.waypoint_tolerance)
                } else {
                    cfg.waypoint_tolerance
                };

                self.session
                    .send(Command::Walk {
                        x: wp.x,
                        z: wp.z,
                        running: cfg.run,
                    })
                    .await?;
                let progress = self.wait_for_movement_complete(wp.x, wp.z, wp_tolerance, here).await;
                here = progress.tile();

                if here.distance_to(goal) <= tolerance {
                    tracing::debug!(x, z, attempt, "walk.arrived");
                    return Ok(ActionResult::ok_with(format!("arrived at ({x}, {z})"), here));
                }
                if !progress.arrived {
                    tracing::debug!(
                        x = here.x,
                        z = here.z,
                        waypoint_x = wp.x,
                        waypoint_z = wp.z,
                        stopped = progress.stopped_moving,
                        "walk.segment_short"
                    );
                    break;
                }
            }

            let distance = here.distance_to(goal);
            if best - distance < cfg.min_progress {
                stalled += 1;
                if stalled >= cfg.stalled_attempts {
                    return Ok(ActionResult::fail(
                        FailureReason::Stuck,
                        format!(
                            "no progress toward ({x}, {z}) in {stalled} attempts; stuck at ({}, {})",
                            here.x, here.z
                        ),
                    )
                    .with_payload(here));
                }
            } else {
                stalled = 0;
            }
            best = best.min(distance);
            tracing::debug!(attempt, distance, stalled, "walk.replan");
        }

        Ok(ActionResult::fail(
            FailureReason::WalkFailed,
            format!(
                "gave up on ({x}, {z}) after {} attempts at ({}, {})",
                cfg.max_iterations, here.x, here.z
            ),
        )
        .with_payload(here))
    }

    /// Polls until the player is within `tolerance` of `(x, z)`, stops moving, or the
    /// distance-scaled timeout passes. Never fails; the caller decides what a short stop means.
    ///
    /// `from` is the caller's last known position. It is what gets reported if the session
    /// shows no player for the whole wait.
    pub async fn wait_for_movement_complete(
        &self,
        x: i32,
        z: i32,
        tolerance: f64,
        from: Tile,
    ) -> MovementProgress {
        let cfg = &self.config.movement;
        let target = Tile::new(x, z);
        let mut last = self
            .snapshot()
            .and_then(|s| s.position())
            .unwrap_or(from);
        let timeout = cfg.segment_timeout(last.distance_to(target));
        let deadline = Instant::now() + timeout;
        let mut last_change = Instant::now();

        loop {
            let now = Instant::now();
            if let Some(pos) = self.snapshot().and_then(|s| s.position()) {
                if pos.distance_to(target) <= tolerance {
                    return progress(pos, true, false);
                }
                if last != pos {
                    last = pos;
                    last_change = now;
                } else if now.duration_since(last_change) >= cfg.stuck_threshold() {
                    return progress(pos, false, true);
                }
            }
            if now >= deadline {
                tracing::debug!(x, z, timeout_ms = timeout.as_millis() as u64, "walk.segment_timeout");
                return progress(last, false, false);
            }
            tokio::time::sleep(cfg.poll_interval().min(deadline - now)).await;
        }
    }

    async fn plan_path(&self, from: Tile, goal: Tile) -> Result<Option<Vec<Waypoint>>, SessionError> {
        let cfg = &self.config.movement;
        let path = self
            .session
            .find_path(goal.x, goal.z, cfg.max_waypoints)
            .await?;
        if path.usable() {
            return Ok(Some(path.waypoints));
        }
        if from.distance_to(goal) <= cfg.long_range_threshold {
            return Ok(None);
        }

        for candidate in self.detour.candidates(from, goal) {
            let path = self
                .session
                .find_path(candidate.x, candidate.z, cfg.max_waypoints)
                .await?;
            if path.usable() {
                tracing::debug!(x = candidate.x, z = candidate.z, "walk.detour");
                return Ok(Some(path.waypoints));
            }
        }
        Ok(None)
    }
}

fn progress(pos: Tile, arrived: bool, stopped_moving: bool) -> MovementProgress {
    MovementProgress {
        arrived,
        stopped_moving,
        x: pos.x,
        z: pos.z,
    }
}
