use serde::{Deserialize, Serialize};

/// Why a verified action did not achieve its effect.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    TargetNotFound,
    /// The target was found, but it was gone when re-resolved after walking to it.
    NoLongerVisible,
    NoOption,
    OutOfReach,
    AlreadyInCombat,
    InventoryFull,
    LevelTooLow,
    MissingRequirement,
    /// The world refused the action at this spot (locked door, no fire allowed here).
    Blocked,
    /// A bank/shop operation was attempted while that interface was closed.
    InterfaceClosed,
    Timeout,
    Rejected(RejectKind),
    WalkFailed,
    Stuck,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::TargetNotFound => "target_not_found",
            FailureReason::NoLongerVisible => "no_longer_visible",
            FailureReason::NoOption => "no_option",
            FailureReason::OutOfReach => "out_of_reach",
            FailureReason::AlreadyInCombat => "already_in_combat",
            FailureReason::InventoryFull => "inventory_full",
            FailureReason::LevelTooLow => "level_too_low",
            FailureReason::MissingRequirement => "missing_requirement",
            FailureReason::Blocked => "blocked",
            FailureReason::InterfaceClosed => "interface_closed",
            FailureReason::Timeout => "timeout",
            FailureReason::Rejected(_) => "rejected",
            FailureReason::WalkFailed => "walk_failed",
            FailureReason::Stuck => "stuck",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Rejected(kind) => write!(f, "rejected:{}", kind.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Sub-type of a shop or bank refusal, taken from the refusal message.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    NotBuyableHere,
    NotBuyableAnywhere,
    NotTradeable,
    OutOfStock,
    InsufficientFunds,
    BankFull,
    Other,
}

impl RejectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectKind::NotBuyableHere => "not_buyable_here",
            RejectKind::NotBuyableAnywhere => "not_buyable_anywhere",
            RejectKind::NotTradeable => "not_tradeable",
            RejectKind::OutOfStock => "out_of_stock",
            RejectKind::InsufficientFunds => "insufficient_funds",
            RejectKind::BankFull => "bank_full",
            RejectKind::Other => "other",
        }
    }
}

/// Outcome of one verified action.
///
/// `payload` carries the resolved entity or a typed outcome. It may be set on failure too, to
/// report partial progress (items sold before a rejection, last position before giving up).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActionResult<T> {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub reason: Option<FailureReason>,
    #[serde(default)]
    pub payload: Option<T>,
}

impl<T> ActionResult<T> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            reason: None,
            payload: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, payload: T) -> Self {
        Self::ok(message).with_payload(payload)
    }

    pub fn fail(reason: FailureReason, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::debug!(reason = %reason, message = %message, "action.failed");
        Self {
            success: false,
            message,
            reason: Some(reason),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: T) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Re-types a result, dropping its payload. Used to forward a walk failure from a
    /// composed action.
    pub fn discard_payload<U>(self) -> ActionResult<U> {
        ActionResult {
            success: self.success,
            message: self.message,
            reason: self.reason,
            payload: None,
        }
    }
}

/// Quantity moved by a bank or shop transfer, measured from inventory counts.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransferOutcome {
    pub item_id: u32,
    pub requested: u32,
    pub transferred: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct SellOutcome {
    pub item_id: u32,
    pub amount_sold: u32,
    pub batches: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct CastOutcome {
    pub npc_index: u32,
    pub xp_gained: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct EatOutcome {
    pub item_id: u32,
    pub hp_before: u32,
    pub hp_after: u32,
}
