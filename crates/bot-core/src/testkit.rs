//! Simulated session for unit tests.
//!
//! The world advances one tick every [`TICK`] of tokio time, so tests run under
//! `#[tokio::test(start_paused = true)]` and never sleep for real. Walk commands are handled
//! here; everything else is scripted per test through `on_command`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::bot::Bot;
use crate::config::BotConfig;
use crate::player::inventory::InventoryItem;
use crate::player::player_state::{PlayerState, Tile};
use crate::player::skills::Skill;
use crate::session::{
    BoxFuture, Command, CommandAck, CommandChannel, PathResult, Session, SessionError,
    StateSource, Waypoint,
};
use crate::world::{ChatMessage, EntityOption, GroundItem, NearbyLoc, NearbyNpc, WorldSnapshot};

pub(crate) const TICK: Duration = Duration::from_millis(600);

type Scheduled = Box<dyn FnOnce(&mut SimWorld) + Send>;
type CommandHook = Box<dyn FnMut(&Command, &mut SimWorld) + Send>;
type PathHook = Box<dyn FnMut(i32, i32, &SimWorld) -> PathResult + Send>;

pub(crate) struct SimWorld {
    pub snapshot: WorldSnapshot,
    /// While false the session reports no snapshot at all.
    pub synced: bool,
    /// Ignore walk commands (simulates an obstacle).
    pub frozen: bool,
    /// Tiles per tick on each axis.
    pub speed: i32,
    pub walk_target: Option<(i32, i32)>,
    scheduled: Vec<(u64, Scheduled)>,
}

impl SimWorld {
    /// Runs `f` at the start of tick `now + ticks` (at least one tick ahead).
    pub fn later(&mut self, ticks: u64, f: impl FnOnce(&mut SimWorld) + Send + 'static) {
        let at = self.snapshot.tick + ticks.max(1);
        self.scheduled.push((at, Box::new(f)));
    }

    /// Emits a game message on the next tick.
    pub fn say(&mut self, text: &str) {
        let text = text.to_string();
        self.later(1, move |w| {
            let tick = w.snapshot.tick;
            w.snapshot.messages.push(ChatMessage {
                tick,
                text,
                sender: None,
            });
        });
    }

    pub fn remove_units(&mut self, id: u32, amount: u32) -> u32 {
        let mut left = amount;
        for item in self.snapshot.inventory.iter_mut().filter(|i| i.id == id) {
            let take = item.count.min(left);
            item.count -= take;
            left -= take;
        }
        self.snapshot.inventory.retain(|i| i.count > 0);
        amount - left
    }

    fn step(&mut self) {
        self.snapshot.tick += 1;

        if !self.frozen
            && let Some((tx, tz)) = self.walk_target
            && let Some(p) = self.snapshot.player.as_mut()
        {
            p.x += (tx - p.x).clamp(-self.speed, self.speed);
            p.z += (tz - p.z).clamp(-self.speed, self.speed);
            if p.x == tx && p.z == tz {
                self.walk_target = None;
            }
        }

        let tick = self.snapshot.tick;
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|(at, _)| *at <= tick);
        self.scheduled = pending;
        for (_, f) in due {
            f(self);
        }

        self.refresh_distances();
    }

    pub fn refresh_distances(&mut self) {
        let Some(here) = self.snapshot.position() else {
            return;
        };
        for n in &mut self.snapshot.npcs {
            n.distance = here.distance_to(n.tile());
        }
        for l in &mut self.snapshot.locs {
            l.distance = here.distance_to(l.tile());
        }
        for g in &mut self.snapshot.ground_items {
            g.distance = here.distance_to(g.tile());
        }
    }
}

struct SimInner {
    world: SimWorld,
    commands: Vec<Command>,
    on_command: CommandHook,
    on_path: PathHook,
    next_tick_at: Instant,
}

impl SimInner {
    fn advance(&mut self) {
        let now = Instant::now();
        while now >= self.next_tick_at {
            self.world.step();
            self.next_tick_at += TICK;
        }
    }
}

pub(crate) struct SimSession {
    inner: Mutex<SimInner>,
}

impl SimSession {
    pub fn new(snapshot: WorldSnapshot) -> Self {
        let mut world = SimWorld {
            snapshot,
            synced: true,
            frozen: false,
            speed: 2,
            walk_target: None,
            scheduled: Vec::new(),
        };
        world.refresh_distances();
        Self {
            inner: Mutex::new(SimInner {
                world,
                commands: Vec::new(),
                on_command: Box::new(|_, _| {}),
                on_path: Box::new(|_, _, _| PathResult::none()),
                next_tick_at: Instant::now() + TICK,
            }),
        }
    }

    pub fn on_command(self, f: impl FnMut(&Command, &mut SimWorld) + Send + 'static) -> Self {
        self.inner.lock().unwrap().on_command = Box::new(f);
        self
    }

    pub fn on_path(self, f: impl FnMut(i32, i32, &SimWorld) -> PathResult + Send + 'static) -> Self {
        self.inner.lock().unwrap().on_path = Box::new(f);
        self
    }

    pub fn world<R>(&self, f: impl FnOnce(&mut SimWorld) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        inner.advance();
        f(&mut inner.world)
    }

    pub fn commands(&self) -> Vec<Command> {
        self.inner.lock().unwrap().commands.clone()
    }

    pub fn into_bot(self, config: BotConfig) -> (Arc<SimSession>, Bot) {
        let sim = Arc::new(self);
        let bot = Bot::new(Session::from_shared(sim.clone()), config);
        (sim, bot)
    }
}

impl StateSource for SimSession {
    fn snapshot(&self) -> Option<Arc<WorldSnapshot>> {
        let mut inner = self.inner.lock().unwrap();
        inner.advance();
        inner
            .world
            .synced
            .then(|| Arc::new(inner.world.snapshot.clone()))
    }

    fn wait_for_state_change<'a>(
        &'a self,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        let next_tick_at = {
            let mut inner = self.inner.lock().unwrap();
            inner.advance();
            inner.next_tick_at
        };
        let deadline = Instant::now() + timeout;
        Box::pin(async move {
            tokio::time::sleep_until(next_tick_at.min(deadline)).await;
            Ok(())
        })
    }
}

impl CommandChannel for SimSession {
    fn send<'a>(&'a self, command: Command) -> BoxFuture<'a, Result<CommandAck, SessionError>> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.advance();
            inner.commands.push(command.clone());
            let SimInner {
                world, on_command, ..
            } = &mut *inner;
            if let Command::Walk { x, z, .. } = command {
                world.walk_target = Some((x, z));
            }
            on_command(&command, world);
        }
        Box::pin(async { Ok(CommandAck::accepted()) })
    }

    fn find_path<'a>(
        &'a self,
        x: i32,
        z: i32,
        _max_waypoints: u32,
    ) -> BoxFuture<'a, Result<PathResult, SessionError>> {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            inner.advance();
            let SimInner { world, on_path, .. } = &mut *inner;
            on_path(x, z, world)
        };
        Box::pin(async move { Ok(result) })
    }
}

pub(crate) fn snapshot_at(x: i32, z: i32) -> WorldSnapshot {
    WorldSnapshot {
        tick: 1,
        player: Some(PlayerState::new("tester", x, z)),
        skills: vec![
            skill("hitpoints", 10, 1_154),
            skill("woodcutting", 1, 0),
            skill("firemaking", 1, 0),
            skill("magic", 1, 0),
        ],
        ..WorldSnapshot::default()
    }
}

pub(crate) fn skill(name: &str, level: u32, experience: u64) -> Skill {
    Skill {
        name: name.to_string(),
        level,
        base_level: level,
        experience,
    }
}

/// Options numbered from 1, matching the in-game right-click order.
pub(crate) fn options(texts: &[&str]) -> Vec<EntityOption> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| EntityOption::new(i as u8 + 1, *t))
        .collect()
}

pub(crate) fn npc(index: u32, name: &str, x: i32, z: i32, opts: &[&str]) -> NearbyNpc {
    NearbyNpc {
        index,
        id: index,
        name: name.to_string(),
        x,
        z,
        distance: 0.0,
        combat_level: 2,
        in_combat: false,
        health: None,
        options: options(opts),
    }
}

pub(crate) fn loc(id: u32, name: &str, x: i32, z: i32, opts: &[&str]) -> NearbyLoc {
    NearbyLoc {
        id,
        name: name.to_string(),
        x,
        z,
        distance: 0.0,
        options: options(opts),
    }
}

pub(crate) fn ground(id: u32, name: &str, x: i32, z: i32) -> GroundItem {
    GroundItem {
        id,
        name: name.to_string(),
        x,
        z,
        count: 1,
        distance: 0.0,
    }
}

pub(crate) fn item(slot: u32, id: u32, name: &str, count: u32, opts: &[&str]) -> InventoryItem {
    InventoryItem {
        slot,
        id,
        name: name.to_string(),
        count,
        options: options(opts),
    }
}

/// Straight line of `n` waypoints from `from` to `to`, the last one exactly on `to`.
pub(crate) fn straight_path(from: Tile, to: Tile, n: usize) -> PathResult {
    let waypoints = (1..=n)
        .map(|i| {
            let f = i as f64 / n as f64;
            Waypoint {
                x: from.x + (f64::from(to.x - from.x) * f).round() as i32,
                z: from.z + (f64::from(to.z - from.z) * f).round() as i32,
            }
        })
        .collect();
    PathResult {
        success: true,
        waypoints,
    }
}
