//! Pet exploration trips.
//!
//! A trip is stored on the active pet. Finishing pays the zone reward to the
//! owner and XP to the pet in one write, and advances the exploration rank
//! every `exploration_quota` completed trips.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::Rng;

use super::catalog::ZoneCatalog;
use super::errors::EconomyError;
use super::outcome::{ActionResult, Reason};
use super::pet::{grant_xp, update_active_pet, PetSettings};
use super::storage::EconomyStore;
use super::types::{ExplorationProgress, ExplorationTrip, RewardRange};

/// XP granted to the pet for each completed trip.
pub const TRIP_XP: u64 = 20;

/// Count one completed trip, rolling over into the next rank at `quota`.
pub fn record_completion(progress: &mut ExplorationProgress, quota: u32) {
    progress.completed_in_rank += 1;
    if progress.completed_in_rank >= quota.max(1) {
        progress.rank += 1;
        progress.completed_in_rank = 0;
    }
}

pub struct Expeditions<'a> {
    store: &'a EconomyStore,
    zones: &'a dyn ZoneCatalog,
    settings: &'a PetSettings,
}

impl<'a> Expeditions<'a> {
    pub fn new(store: &'a EconomyStore, zones: &'a dyn ZoneCatalog, settings: &'a PetSettings) -> Self {
        Self {
            store,
            zones,
            settings,
        }
    }

    pub fn start(
        &self,
        user_id: &str,
        zone_query: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, EconomyError> {
        let Some(zone) = self.zones.resolve_exploration_zone(zone_query) else {
            return Ok(ActionResult::rejected(Reason::InvalidZone));
        };
        let duration = Duration::minutes(zone.duration_minutes.max(1));

        let outcome = update_active_pet(self.store, self.settings, user_id, now, |record, index| {
            if let Some(required) = zone.required_item_id.as_deref() {
                if !record.has_item(required) {
                    return Err(Reason::Requirement);
                }
            }
            let pet = &mut record.pets[index];
            if pet.is_away() {
                return Err(Reason::PetAway);
            }
            if pet.attributes.exploration.is_some() {
                return Err(Reason::Exploring);
            }
            let rank = pet.attributes.exploration_progress.rank;
            if rank < zone.min_rank {
                return Err(Reason::Requirement);
            }
            pet.attributes.exploration = Some(ExplorationTrip {
                zone_id: zone.id.clone(),
                started_at: now,
                end_at: now + duration,
                rank_at_start: rank,
            });
            Ok(())
        })?;

        Ok(match outcome {
            Ok(done) => {
                info!(
                    "explore: {} sent {} to {} for {}m",
                    user_id,
                    done.pet.name,
                    zone.id,
                    duration.num_minutes()
                );
                let mut result = ActionResult::success()
                    .with_balance(done.record.balance)
                    .with_pet(done.pet);
                result.next_in_ms = Some(duration.num_milliseconds());
                result
            }
            Err(reason) => {
                debug!("explore: {} cannot start {}: {}", user_id, zone.id, reason);
                ActionResult::rejected(reason)
            }
        })
    }

    pub fn finish<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ActionResult, EconomyError> {
        let quota = self.settings.exploration_quota;
        let mut wait_ms = 0;
        let outcome = update_active_pet(self.store, self.settings, user_id, now, |record, index| {
            let Some(trip) = record.pets[index].attributes.exploration.clone() else {
                return Err(Reason::NotExploring);
            };
            if now < trip.end_at {
                wait_ms = (trip.end_at - now).num_milliseconds();
                return Err(Reason::NotReady);
            }
            let reward = self
                .zones
                .resolve_exploration_zone(&trip.zone_id)
                .map(|zone| zone.reward)
                .unwrap_or(RewardRange::NONE);
            let amount = reward.sample(rng);
            record.balance = record.balance.saturating_add(amount);

            let pet = &mut record.pets[index];
            pet.attributes.exploration = None;
            grant_xp(pet, TRIP_XP);
            record_completion(&mut pet.attributes.exploration_progress, quota);
            Ok(amount)
        })?;

        Ok(match outcome {
            Ok(done) => {
                info!(
                    "explore: {}'s {} returned with {} (rank {})",
                    user_id, done.pet.name, done.value, done.pet.attributes.exploration_progress.rank
                );
                ActionResult::success()
                    .with_amount(done.value)
                    .with_balance(done.record.balance)
                    .with_pet(done.pet)
            }
            Err(Reason::NotReady) => ActionResult::wait(Reason::NotReady, wait_ms),
            Err(reason) => ActionResult::rejected(reason),
        })
    }
}
