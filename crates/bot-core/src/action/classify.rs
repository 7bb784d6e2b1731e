//! Maps game chat text to failure reasons.
//!
//! Chat wording is the only failure signal many actions get, and it is fragile. The mapping
//! is therefore data: ordered rules loaded from config, with the built-in set as default.

use serde::{Deserialize, Serialize};

use super::result::{FailureReason, RejectKind};
use crate::world::ChatMessage;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Walk,
    Attack,
    Cast,
    CombatStyle,
    Pickup,
    Drop,
    Equip,
    Unequip,
    Eat,
    Chop,
    Burn,
    Talk,
    Door,
    Bank,
    Shop,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClassifierRule {
    /// Action kinds the rule applies to; empty means every kind.
    #[serde(default)]
    pub actions: Vec<ActionKind>,
    /// Case-insensitive substring.
    pub phrase: String,
    pub reason: FailureReason,
}

impl ClassifierRule {
    pub fn new(actions: &[ActionKind], phrase: &str, reason: FailureReason) -> Self {
        Self {
            actions: actions.to_vec(),
            phrase: phrase.to_string(),
            reason,
        }
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        self.actions.is_empty() || self.actions.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub reason: FailureReason,
    pub message: String,
    pub tick: u64,
}

#[derive(Debug, Clone)]
pub struct MessageClassifier {
    rules: Vec<(ClassifierRule, String)>,
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl MessageClassifier {
    /// Rules are tried in order; the first matching phrase wins.
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let needle = rule.phrase.to_lowercase();
                (rule, needle)
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> impl Iterator<Item = &ClassifierRule> {
        self.rules.iter().map(|(rule, _)| rule)
    }

    /// First message newer than `start_tick` that matches a rule for `kind`.
    pub fn classify(
        &self,
        kind: ActionKind,
        messages: &[ChatMessage],
        start_tick: u64,
    ) -> Option<Classified> {
        messages
            .iter()
            .filter(|m| m.tick > start_tick)
            .find_map(|m| self.match_text(kind, &m.text).map(|reason| Classified {
                reason,
                message: m.text.clone(),
                tick: m.tick,
            }))
    }

    pub fn match_text(&self, kind: ActionKind, text: &str) -> Option<FailureReason> {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|(rule, needle)| rule.applies_to(kind) && lower.contains(needle.as_str()))
            .map(|(rule, _)| rule.reason)
    }
}

pub fn default_rules() -> Vec<ClassifierRule> {
    use ActionKind::*;
    use FailureReason as F;

    vec![
        ClassifierRule::new(&[], "can't reach that", F::OutOfReach),
        ClassifierRule::new(&[], "cannot reach that", F::OutOfReach),
        ClassifierRule::new(&[], "i can't reach", F::OutOfReach),
        ClassifierRule::new(&[Attack, Cast], "already under attack", F::AlreadyInCombat),
        ClassifierRule::new(&[Attack, Cast], "someone else is fighting", F::AlreadyInCombat),
        ClassifierRule::new(&[Attack, Cast], "already in combat", F::AlreadyInCombat),
        ClassifierRule::new(
            &[Bank],
            "not enough space in your bank",
            F::Rejected(RejectKind::BankFull),
        ),
        ClassifierRule::new(&[Bank], "bank is full", F::Rejected(RejectKind::BankFull)),
        ClassifierRule::new(&[], "inventory space", F::InventoryFull),
        ClassifierRule::new(&[], "inventory is too full", F::InventoryFull),
        ClassifierRule::new(&[], "not enough free space", F::InventoryFull),
        ClassifierRule::new(&[Chop], "do not have an axe", F::MissingRequirement),
        ClassifierRule::new(&[Chop], "need an axe", F::MissingRequirement),
        ClassifierRule::new(&[Burn], "need a tinderbox", F::MissingRequirement),
        ClassifierRule::new(&[Burn], "can't light a fire here", F::Blocked),
        ClassifierRule::new(&[Cast], "do not have enough", F::MissingRequirement),
        ClassifierRule::new(&[Door], "is locked", F::Blocked),
        ClassifierRule::new(&[], "level of", F::LevelTooLow),
        ClassifierRule::new(&[], "level to", F::LevelTooLow),
        ClassifierRule::new(
            &[Shop],
            "can't sell this item to this shop",
            F::Rejected(RejectKind::NotBuyableHere),
        ),
        ClassifierRule::new(
            &[Shop],
            "can't sell this item to a shop",
            F::Rejected(RejectKind::NotBuyableAnywhere),
        ),
        ClassifierRule::new(
            &[Shop],
            "can't sell this item",
            F::Rejected(RejectKind::NotTradeable),
        ),
        ClassifierRule::new(&[Shop], "cannot be traded", F::Rejected(RejectKind::NotTradeable)),
        ClassifierRule::new(
            &[Shop],
            "don't have enough coins",
            F::Rejected(RejectKind::InsufficientFunds),
        ),
        ClassifierRule::new(&[Shop], "out of stock", F::Rejected(RejectKind::OutOfStock)),
        ClassifierRule::new(&[Shop], "shop has run out", F::Rejected(RejectKind::OutOfStock)),
    ]
}
