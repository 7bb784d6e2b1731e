//! Target resolution against the current snapshot.
//!
//! A caller either hands over an entity it already resolved this tick, or a name pattern that
//! is matched fresh against the live collection. Not finding anything is a normal outcome.

use std::fmt;

use regex::Regex;

use crate::player::equipment::EquippedItem;
use crate::player::inventory::InventoryItem;
use crate::player::player_state::Tile;
use crate::world::{BankItem, EntityOption, GroundItem, NearbyLoc, NearbyNpc, ShopItem, WorldSnapshot};

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Case-insensitive substring.
    Contains(String),
    /// Case-insensitive equality.
    Exact(String),
    Regex(Regex),
}

impl Pattern {
    pub fn contains(text: impl Into<String>) -> Self {
        Pattern::Contains(text.into())
    }

    pub fn exact(text: impl Into<String>) -> Self {
        Pattern::Exact(text.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Pattern::Regex)
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Contains(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
            Pattern::Exact(text) => name.eq_ignore_ascii_case(text),
            Pattern::Regex(re) => re.is_match(name),
        }
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::contains(text)
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Pattern::contains(text)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern::Regex(re)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Contains(text) => write!(f, "*{text}*"),
            Pattern::Exact(text) => write!(f, "{text:?}"),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// What the caller wants to act on.
#[derive(Debug, Clone)]
pub enum Target<T> {
    /// Already resolved by the caller this tick; used as is.
    Resolved(T),
    Pattern(Pattern),
}

impl<T> From<&str> for Target<T> {
    fn from(text: &str) -> Self {
        Target::Pattern(Pattern::from(text))
    }
}

impl<T> From<Pattern> for Target<T> {
    fn from(pattern: Pattern) -> Self {
        Target::Pattern(pattern)
    }
}

impl<T> fmt::Display for Target<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Resolved(_) => f.write_str("<resolved>"),
            Target::Pattern(p) => p.fmt(f),
        }
    }
}

/// An entity kind with a live collection in the snapshot.
pub trait Entity: Clone {
    fn collection(snapshot: &WorldSnapshot) -> &[Self];

    fn name(&self) -> &str;

    /// Distance from the player, where the collection has one.
    fn distance(&self) -> Option<f64> {
        None
    }

    /// Map position, for kinds that live on the map.
    fn tile(&self) -> Option<Tile> {
        None
    }

    /// Spatial/slot identity, used to find the same entity again in a newer snapshot.
    fn same_entity(&self, other: &Self) -> bool;
}

impl Entity for NearbyNpc {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.npcs
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn distance(&self) -> Option<f64> {
        Some(self.distance)
    }
    fn tile(&self) -> Option<Tile> {
        Some(Tile::new(self.x, self.z))
    }
    fn same_entity(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Entity for NearbyLoc {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.locs
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn distance(&self) -> Option<f64> {
        Some(self.distance)
    }
    fn tile(&self) -> Option<Tile> {
        Some(Tile::new(self.x, self.z))
    }
    // Locs swap ids when their state changes (door open/closed), so tile and name identify
    // them.
    fn same_entity(&self, other: &Self) -> bool {
        self.x == other.x && self.z == other.z && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Entity for GroundItem {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.ground_items
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn distance(&self) -> Option<f64> {
        Some(self.distance)
    }
    fn tile(&self) -> Option<Tile> {
        Some(Tile::new(self.x, self.z))
    }
    fn same_entity(&self, other: &Self) -> bool {
        self.x == other.x && self.z == other.z && self.id == other.id
    }
}

impl Entity for InventoryItem {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.inventory
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn same_entity(&self, other: &Self) -> bool {
        self.slot == other.slot && self.id == other.id
    }
}

impl Entity for EquippedItem {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.equipment
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn same_entity(&self, other: &Self) -> bool {
        self.slot == other.slot && self.id == other.id
    }
}

impl Entity for ShopItem {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.shop.stock
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn same_entity(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Entity for BankItem {
    fn collection(snapshot: &WorldSnapshot) -> &[Self] {
        &snapshot.bank.items
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn same_entity(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Resolves `target`, falling back to `default` when no target is given.
pub fn resolve<T: Entity>(
    snapshot: &WorldSnapshot,
    target: Option<&Target<T>>,
    default: Option<&Pattern>,
) -> Option<T> {
    resolve_where(snapshot, target, default, |_| true)
}

/// Like [`resolve`], restricted to pattern matches that pass `accept`. A resolved handle is
/// returned as is.
pub fn resolve_where<T: Entity>(
    snapshot: &WorldSnapshot,
    target: Option<&Target<T>>,
    default: Option<&Pattern>,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    let pattern = match target {
        Some(Target::Resolved(handle)) => return Some(handle.clone()),
        Some(Target::Pattern(pattern)) => pattern,
        None => default?,
    };
    nearest(
        T::collection(snapshot)
            .iter()
            .filter(|e| pattern.matches(e.name()) && accept(*e)),
    )
}

/// Finds `handle` again in a newer snapshot by identity, not by name.
pub fn resolve_same<T: Entity>(snapshot: &WorldSnapshot, handle: &T) -> Option<T> {
    T::collection(snapshot)
        .iter()
        .find(|e| e.same_entity(handle))
        .cloned()
}

/// Nearest entity; collection order breaks ties and covers kinds without distances.
pub fn nearest<'a, T: Entity + 'a>(candidates: impl Iterator<Item = &'a T>) -> Option<T> {
    let mut best: Option<&T> = None;
    for candidate in candidates {
        best = match best {
            Some(current)
                if candidate.distance().unwrap_or(f64::MAX)
                    >= current.distance().unwrap_or(f64::MAX) =>
            {
                Some(current)
            }
            _ => Some(candidate),
        };
    }
    best.cloned()
}

pub fn find_option<'a>(options: &'a [EntityOption], pattern: &Pattern) -> Option<&'a EntityOption> {
    options.iter().find(|o| pattern.matches(&o.text))
}

pub fn has_option(options: &[EntityOption], pattern: &Pattern) -> bool {
    find_option(options, pattern).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{SimSession, item, loc, npc, snapshot_at};

    fn world() -> WorldSnapshot {
        let sim = SimSession::new(WorldSnapshot {
            npcs: vec![
                npc(1, "Goblin", 20, 10, &["Attack"]),
                npc(2, "Goblin", 12, 10, &["Attack"]),
                npc(3, "Man", 11, 10, &["Talk-to", "Attack"]),
            ],
            locs: vec![
                loc(1276, "Tree", 13, 13, &["Chop down"]),
                loc(1281, "Oak tree", 11, 11, &["Chop down"]),
            ],
            inventory: vec![
                item(0, 1351, "Bronze axe", 1, &["Wield"]),
                item(1, 1511, "Logs", 1, &["Drop"]),
            ],
            ..snapshot_at(10, 10)
        });
        sim.world(|w| w.snapshot.clone())
    }

    #[test]
    fn pattern_picks_nearest_match() {
        let snap = world();
        let goblin = resolve::<NearbyNpc>(&snap, Some(&Target::from("goblin")), None).unwrap();
        assert_eq!(goblin.index, 2);
    }

    #[test]
    fn resolved_handle_is_returned_unchanged() {
        let snap = world();
        let stale = npc(99, "Ghost", 0, 0, &[]);
        let got = resolve(&snap, Some(&Target::Resolved(stale.clone())), None).unwrap();
        assert_eq!(got, stale);
    }

    #[test]
    fn default_pattern_is_not_broadened() {
        let snap = world();
        let exact = Pattern::exact("tree");
        let tree = resolve::<NearbyLoc>(&snap, None, Some(&exact)).unwrap();
        assert_eq!(tree.id, 1276);

        let willow = Pattern::exact("willow");
        assert!(resolve::<NearbyLoc>(&snap, None, Some(&willow)).is_none());
        assert!(resolve::<NearbyLoc>(&snap, None, None).is_none());
    }

    #[test]
    fn regex_and_filters_combine() {
        let snap = world();
        let any = Pattern::regex("(?i)^(man|goblin)$").unwrap();
        let talker = resolve_where::<NearbyNpc>(&snap, Some(&Target::Pattern(any)), None, |n| {
            has_option(&n.options, &Pattern::from("talk"))
        })
        .unwrap();
        assert_eq!(talker.index, 3);
    }

    #[test]
    fn inventory_resolution_uses_slot_order() {
        let snap = world();
        let axe = resolve::<InventoryItem>(&snap, Some(&Target::from("axe")), None).unwrap();
        assert_eq!(axe.slot, 0);
    }

    #[test]
    fn same_entity_uses_identity_not_name() {
        let mut snap = world();
        let door = loc(1530, "Door", 15, 10, &["Open"]);
        snap.locs.push(loc(1531, "Door", 15, 10, &["Close"]));
        let again = resolve_same(&snap, &door).unwrap();
        assert_eq!(again.id, 1531);

        let gone = npc(7, "Goblin", 20, 10, &["Attack"]);
        assert!(resolve_same(&snap, &gone).is_none());
    }
}
