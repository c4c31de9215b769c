//! Caller-facing result shape shared by every public economy operation.
//!
//! The presentation layer reads these fields to render replies; nothing in
//! here knows about message formatting or localisation.

use serde::{Deserialize, Serialize};

use super::errors::InventoryError;
use super::minigame::Scene;
use super::types::{DropLine, Pet};

/// Why an operation did not go through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    NoDb,
    Cooldown,
    Requirement,
    Insufficient,
    NotOwned,
    NotEnough,
    InvalidZone,
    PetAway,
    InvalidAction,
    NoPet,
    Incubating,
    NotIncubating,
    NotReady,
    Exploring,
    NotExploring,
    RetryLater,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::NoDb => "no-db",
            Reason::Cooldown => "cooldown",
            Reason::Requirement => "requirement",
            Reason::Insufficient => "insufficient",
            Reason::NotOwned => "not-owned",
            Reason::NotEnough => "not-enough",
            Reason::InvalidZone => "invalid-zone",
            Reason::PetAway => "pet-away",
            Reason::InvalidAction => "invalid-action",
            Reason::NoPet => "no-pet",
            Reason::Incubating => "incubating",
            Reason::NotIncubating => "not-incubating",
            Reason::NotReady => "not-ready",
            Reason::Exploring => "exploring",
            Reason::NotExploring => "not-exploring",
            Reason::RetryLater => "retry-later",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&InventoryError> for Reason {
    fn from(err: &InventoryError) -> Self {
        match err {
            InventoryError::NotOwned { .. } => Reason::NotOwned,
            InventoryError::NotEnough { .. } => Reason::NotEnough,
        }
    }
}

/// Discriminated result consumed by the presentation layer.
///
/// `ok` says whether the operation ran; `failed` marks a minigame attempt
/// that ran but was lost.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_in_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drops: Vec<DropLine>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    /// Held/wanted counts for `not-enough` rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub have: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wanted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet: Option<Pet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<Scene>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn rejected(reason: Reason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            ..Default::default()
        }
    }

    /// Rejection carrying the remaining wait, clamped at zero.
    pub fn wait(reason: Reason, next_in_ms: i64) -> Self {
        Self {
            next_in_ms: Some(next_in_ms.max(0)),
            ..Self::rejected(reason)
        }
    }

    pub fn from_inventory_error(err: &InventoryError) -> Self {
        let mut result = Self::rejected(Reason::from(err));
        if let InventoryError::NotEnough { have, wanted, .. } = err {
            result.have = Some(*have);
            result.wanted = Some(*wanted);
        }
        result
    }

    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_balance(mut self, balance: i64) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_pet(mut self, pet: Pet) -> Self {
        self.pet = Some(pet);
        self
    }

    pub fn is_rejected_with(&self, reason: Reason) -> bool {
        !self.ok && self.reason == Some(reason)
    }
}
