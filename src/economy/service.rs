//! Async boundary for the economy engine.
//!
//! The service holds the optional store, the catalogs, the rate limiter and
//! the configuration. Every public operation returns an [`ActionResult`]:
//! a missing store is reported as `no-db` and store faults are logged and
//! surfaced as `retry-later`. The engine itself never retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::catalog::{ItemCatalog, ItemInfo, StaticCatalog, ZoneCatalog};
use super::cooldown::CooldownGate;
use super::errors::EconomyError;
use super::exploration::Expeditions;
use super::incubation::Incubator;
use super::ledger;
use super::minigame::{open_scene, Choice, MinigameResolver, Scene};
use super::outcome::{ActionResult, Reason};
use super::pet::{CareAction, PetLifecycle};
use super::rate_limit::{InMemoryRateLimiter, RateLimiter};
use super::storage::EconomyStore;
use super::types::{ActivityField, ActivityKind, EconomyRecord, StatKind};
use crate::config::{ClaimConfig, Config};

#[derive(Clone)]
pub struct EconomyService {
    store: Option<EconomyStore>,
    items: Arc<dyn ItemCatalog>,
    zones: Arc<dyn ZoneCatalog>,
    limiter: Arc<dyn RateLimiter>,
    config: Config,
}

impl EconomyService {
    /// Service without a store; every stateful call answers `no-db`.
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(StaticCatalog::default());
        Self {
            store: None,
            items: catalog.clone(),
            zones: catalog,
            limiter: Arc::new(InMemoryRateLimiter::new()),
            config,
        }
    }

    /// Open the sled store named by the config and attach it.
    pub fn open(config: Config) -> Result<Self, EconomyError> {
        let store = EconomyStore::open(config.storage.db_path())?;
        Ok(Self::new(config).with_store(store))
    }

    pub fn with_store(mut self, store: EconomyStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_catalogs(mut self, items: Arc<dyn ItemCatalog>, zones: Arc<dyn ZoneCatalog>) -> Self {
        self.items = items;
        self.zones = zones;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn store(&self) -> Option<&EconomyStore> {
        self.store.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn describe_item(&self, item_id: &str, locale: &str) -> ItemInfo {
        self.items.get_item_by_id(item_id, locale)
    }

    /// Run `op` against the store, mapping absence and faults to rejections.
    fn with_store_op<F>(&self, op: &str, f: F) -> ActionResult
    where
        F: FnOnce(&EconomyStore) -> Result<ActionResult, EconomyError>,
    {
        let Some(store) = self.store.as_ref() else {
            warn!("economy: {} requested without a store", op);
            return ActionResult::rejected(Reason::NoDb);
        };
        match f(store) {
            Ok(result) => result,
            Err(err) => {
                error!("economy: {} failed: {}", op, err);
                ActionResult::rejected(Reason::RetryLater)
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    /// Idempotent first touch; returns the current balance.
    pub async fn ensure_user(&self, user_id: &str) -> ActionResult {
        self.with_store_op("ensure_user", |store| {
            let record = store.get_or_create(user_id, Self::now())?;
            Ok(ActionResult::success().with_balance(record.balance))
        })
    }

    pub async fn balance(&self, user_id: &str) -> ActionResult {
        self.with_store_op("balance", |store| {
            let balance = store.find(user_id)?.map(|r| r.balance).unwrap_or(0);
            Ok(ActionResult::success().with_balance(balance))
        })
    }

    /// Full record snapshot, `None` when the user has never interacted.
    pub async fn record(&self, user_id: &str) -> Result<Option<EconomyRecord>, Reason> {
        let store = self.store.as_ref().ok_or(Reason::NoDb)?;
        store.find(user_id).map_err(|err| {
            error!("economy: record lookup for {} failed: {}", user_id, err);
            Reason::RetryLater
        })
    }

    pub async fn record_count(&self) -> Result<usize, Reason> {
        let store = self.store.as_ref().ok_or(Reason::NoDb)?;
        store.record_count().map_err(|err| {
            error!("economy: record count failed: {}", err);
            Reason::RetryLater
        })
    }

    pub async fn transfer(&self, from: &str, to: &str, amount: i64) -> ActionResult {
        self.with_store_op("transfer", |store| {
            ledger::transfer_balance(store, from, to, amount, Self::now())
        })
    }

    pub async fn transfer_item(&self, from: &str, to: &str, item_id: &str, amount: u32) -> ActionResult {
        self.with_store_op("transfer_item", |store| {
            ledger::transfer_inventory_item(store, from, to, item_id, amount, Self::now())
        })
    }

    /// Operator grant of items, bypassing any gate.
    pub async fn grant_item(&self, user_id: &str, item_id: &str, amount: u32) -> ActionResult {
        if amount == 0 {
            return ActionResult::rejected(Reason::InvalidAction);
        }
        self.with_store_op("grant_item", |store| {
            let record = ledger::grant_item(store, user_id, item_id, amount, Self::now())?;
            Ok(ActionResult::success()
                .with_amount(amount as i64)
                .with_balance(record.balance))
        })
    }

    pub async fn consume_item(&self, user_id: &str, item_id: &str, amount: u32) -> ActionResult {
        self.with_store_op("consume_item", |store| {
            ledger::consume_item(store, user_id, item_id, amount, Self::now())
        })
    }

    // ========================================================================
    // Claims
    // ========================================================================

    fn claim(&self, op: &str, user_id: &str, field: ActivityField, claim: ClaimConfig) -> ActionResult {
        self.with_store_op(op, |store| {
            let now = Self::now();
            store.get_or_create(user_id, now)?;
            let mut rng = StdRng::from_entropy();
            CooldownGate::new(store).claim(user_id, field, claim.cooldown(), claim.reward(), now, &mut rng)
        })
    }

    pub async fn claim_daily(&self, user_id: &str) -> ActionResult {
        self.claim("claim_daily", user_id, ActivityField::Daily, self.config.economy.daily)
    }

    pub async fn claim_work(&self, user_id: &str) -> ActionResult {
        self.claim("claim_work", user_id, ActivityField::Work, self.config.economy.work)
    }

    // ========================================================================
    // Minigames
    // ========================================================================

    /// Draw a scene for `kind`. Needs no store.
    pub async fn open_scene(&self, kind: ActivityKind) -> ActionResult {
        let mut rng = StdRng::from_entropy();
        let scene = open_scene(kind, self.config.minigame.weights, &mut rng);
        let mut result = ActionResult::success();
        result.scene = Some(scene);
        result
    }

    /// Resolve a choice for a scene in the zone named by `zone_query`.
    pub async fn play(&self, user_id: &str, zone_query: &str, scene: &Scene, choice: &Choice) -> ActionResult {
        let Some(zone) = self.zones.resolve_zone(scene.kind, zone_query) else {
            return ActionResult::rejected(Reason::InvalidZone);
        };
        self.with_store_op("play", |store| {
            let mut rng = StdRng::from_entropy();
            MinigameResolver::new(
                store,
                self.limiter.as_ref(),
                &self.config.minigame,
                self.config.rate_limit,
            )
            .resolve(user_id, &zone, scene, choice, Self::now(), &mut rng)
        })
    }

    // ========================================================================
    // Pets
    // ========================================================================

    pub async fn pet_status(&self, user_id: &str) -> ActionResult {
        self.with_store_op("pet_status", |store| {
            PetLifecycle::new(store, &self.config.pets).status(user_id, Self::now())
        })
    }

    pub async fn care(&self, user_id: &str, action: CareAction) -> ActionResult {
        self.with_store_op("care", |store| {
            PetLifecycle::new(store, &self.config.pets).care(user_id, action, Self::now())
        })
    }

    pub async fn recall_pet(&self, user_id: &str) -> ActionResult {
        self.with_store_op("recall_pet", |store| {
            PetLifecycle::new(store, &self.config.pets).recall(user_id, Self::now())
        })
    }

    pub async fn rename_pet(&self, user_id: &str, name: &str) -> ActionResult {
        self.with_store_op("rename_pet", |store| {
            PetLifecycle::new(store, &self.config.pets).rename(user_id, name, Self::now())
        })
    }

    pub async fn allocate_stat(&self, user_id: &str, stat: StatKind) -> ActionResult {
        self.with_store_op("allocate_stat", |store| {
            PetLifecycle::new(store, &self.config.pets).allocate_stat(user_id, stat, Self::now())
        })
    }

    pub async fn set_active_pet(&self, user_id: &str, pet_id: &str) -> ActionResult {
        self.with_store_op("set_active_pet", |store| {
            PetLifecycle::new(store, &self.config.pets).set_active(user_id, pet_id, Self::now())
        })
    }

    pub async fn start_incubation(&self, user_id: &str, egg_item_id: &str) -> ActionResult {
        self.with_store_op("start_incubation", |store| {
            Incubator::new(store, self.items.as_ref()).start(user_id, egg_item_id, Self::now())
        })
    }

    pub async fn incubation_status(&self, user_id: &str) -> ActionResult {
        self.with_store_op("incubation_status", |store| {
            Incubator::new(store, self.items.as_ref()).status(user_id, Self::now())
        })
    }

    pub async fn hatch(&self, user_id: &str) -> ActionResult {
        self.with_store_op("hatch", |store| {
            let mut rng = StdRng::from_entropy();
            Incubator::new(store, self.items.as_ref()).hatch(user_id, Self::now(), &mut rng)
        })
    }

    pub async fn start_exploration(&self, user_id: &str, zone_query: &str) -> ActionResult {
        self.with_store_op("start_exploration", |store| {
            Expeditions::new(store, self.zones.as_ref(), &self.config.pets).start(
                user_id,
                zone_query,
                Self::now(),
            )
        })
    }

    pub async fn finish_exploration(&self, user_id: &str) -> ActionResult {
        self.with_store_op("finish_exploration", |store| {
            let mut rng = StdRng::from_entropy();
            Expeditions::new(store, self.zones.as_ref(), &self.config.pets).finish(
                user_id,
                Self::now(),
                &mut rng,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_reports_no_db() {
        let service = EconomyService::new(Config::default());
        let result = tokio_test::block_on(service.claim_daily("u1"));
        assert!(result.is_rejected_with(Reason::NoDb));
        assert_eq!(
            tokio_test::block_on(service.record_count()),
            Err(Reason::NoDb)
        );
    }

    #[test]
    fn scenes_open_without_a_store() {
        let service = EconomyService::new(Config::default());
        let result = tokio_test::block_on(service.open_scene(ActivityKind::Mining));
        assert!(result.ok);
        assert_eq!(result.scene.unwrap().kind, ActivityKind::Mining);
    }

    #[test]
    fn unknown_zone_is_rejected_before_the_store() {
        let service = EconomyService::new(Config::default());
        let scene = Scene::rebuild(ActivityKind::Fishing, 1, crate::economy::SceneModeKind::Doors);
        let result = tokio_test::block_on(service.play("u1", "volcano", &scene, &Choice::Door(0)));
        assert!(result.is_rejected_with(Reason::InvalidZone));
    }
}
