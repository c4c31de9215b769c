//! Reward economy and virtual-pet engine.
//!
//! Records live in a sled tree, one document per user. Correctness under
//! concurrent callers rests on single-document compare-and-swap updates
//! ([`EconomyStore::update`]); nothing here holds an in-process lock on a
//! record.

pub mod catalog;
pub mod cooldown;
pub mod errors;
pub mod exploration;
pub mod incubation;
pub mod ledger;
pub mod minigame;
pub mod outcome;
pub mod pet;
pub mod rate_limit;
pub mod service;
pub mod storage;
pub mod types;

pub use catalog::{ItemCatalog, ItemInfo, ItemKind, StaticCatalog, Zone, ZoneCatalog};
pub use cooldown::CooldownGate;
pub use errors::{EconomyError, InventoryError};
pub use minigame::{Choice, MinigameResolver, MinigameSettings, Scene, SceneModeKind};
pub use outcome::{ActionResult, Reason};
pub use pet::{CareAction, PetLifecycle, PetSettings};
pub use rate_limit::{InMemoryRateLimiter, RateDecision, RateLimitSettings, RateLimiter};
pub use service::EconomyService;
pub use storage::{EconomyStore, Mutation};
pub use types::{
    ActivityField, ActivityKind, EconomyRecord, InventoryLine, Pet, Rarity, RewardRange, StatKind,
};
