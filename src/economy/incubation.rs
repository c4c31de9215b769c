//! Egg incubation and hatching.
//!
//! One incubation slot per record, independent of the pets already owned.
//! Starting consumes the egg; hatching appends exactly one pet, makes it the
//! active pet and clears the slot in the same write.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use super::catalog::{ItemCatalog, ItemKind};
use super::errors::EconomyError;
use super::ledger::consume_from_inventory;
use super::outcome::{ActionResult, Reason};
use super::storage::{EconomyStore, Mutation};
use super::types::{Pet, PetIncubation, Rarity};

/// Names a freshly hatched pet may receive.
pub fn name_pool(rarity: Rarity) -> &'static [&'static str] {
    match rarity {
        Rarity::Common => &["Pip", "Biscuit", "Mochi", "Pebble", "Sprout", "Nugget"],
        Rarity::Uncommon => &["Clover", "Juniper", "Maple", "Bramble", "Tansy"],
        Rarity::Rare => &["Cobalt", "Saffron", "Willow", "Onyx", "Marble"],
        Rarity::Epic => &["Tempest", "Ember", "Glacier", "Vesper"],
        Rarity::Legendary => &["Aurora", "Zephyr", "Solstice", "Nimbus"],
        Rarity::Mythic => &["Eclipse", "Nebula", "Chimera"],
        Rarity::Divine => &["Seraph", "Halcyon", "Empyrean"],
    }
}

pub fn pick_name<R: Rng + ?Sized>(rarity: Rarity, rng: &mut R) -> &'static str {
    name_pool(rarity).choose(rng).copied().unwrap_or("Egg")
}

enum Hatch {
    Hatched(Pet),
    Missing,
    Waiting(i64),
}

pub struct Incubator<'a> {
    store: &'a EconomyStore,
    items: &'a dyn ItemCatalog,
}

impl<'a> Incubator<'a> {
    pub fn new(store: &'a EconomyStore, items: &'a dyn ItemCatalog) -> Self {
        Self { store, items }
    }

    /// Consume one egg and start the hatch timer for its rarity.
    pub fn start(
        &self,
        user_id: &str,
        egg_item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, EconomyError> {
        let info = self.items.get_item_by_id(egg_item_id, "en");
        if info.kind != ItemKind::Egg {
            return Ok(ActionResult::rejected(Reason::InvalidAction));
        }
        let incubation = PetIncubation {
            egg_item_id: egg_item_id.to_string(),
            rarity: info.rarity,
            started_at: now,
            hatch_at: now + info.rarity.hatch_duration(),
        };

        self.store.get_or_create(user_id, now)?;
        let outcome = self.store.update(user_id, |record| {
            if record.pet_incubation.is_some() {
                return Mutation::Abort(ActionResult::rejected(Reason::Incubating));
            }
            if let Err(err) = consume_from_inventory(record, egg_item_id, 1) {
                return Mutation::Abort(ActionResult::from_inventory_error(&err));
            }
            record.pet_incubation = Some(incubation.clone());
            record.touch(now);
            Mutation::Commit(ActionResult::success())
        })?;

        let Some((result, record)) = outcome else {
            return Err(EconomyError::NotFound(format!("economy record: {}", user_id)));
        };
        if result.ok {
            info!(
                "incubation: {} started {} ({}), hatches at {}",
                user_id,
                egg_item_id,
                info.rarity.label(),
                incubation.hatch_at
            );
            let wait = (incubation.hatch_at - now).num_milliseconds();
            let mut result = result.with_balance(record.balance);
            result.next_in_ms = Some(wait);
            return Ok(result);
        }
        debug!("incubation: {} cannot start {}: {:?}", user_id, egg_item_id, result.reason);
        Ok(result)
    }

    /// Remaining time on the current egg; `not-incubating` when the slot is empty.
    pub fn status(&self, user_id: &str, now: DateTime<Utc>) -> Result<ActionResult, EconomyError> {
        let incubation = self
            .store
            .find(user_id)?
            .and_then(|record| record.pet_incubation);
        Ok(match incubation {
            Some(incubation) => {
                let mut result = ActionResult::success();
                result.next_in_ms = Some((incubation.hatch_at - now).num_milliseconds().max(0));
                result
            }
            None => ActionResult::rejected(Reason::NotIncubating),
        })
    }

    /// Hatch a ready egg into a level-1 pet.
    pub fn hatch<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ActionResult, EconomyError> {
        let outcome = self.store.update(user_id, |record| {
            let Some(incubation) = record.pet_incubation.clone() else {
                return Mutation::Abort(Hatch::Missing);
            };
            if !incubation.is_ready(now) {
                let wait = (incubation.hatch_at - now).num_milliseconds();
                return Mutation::Abort(Hatch::Waiting(wait));
            }
            let pet = Pet::new(pick_name(incubation.rarity, rng), incubation.rarity, now);
            record.active_pet_id = Some(pet.pet_id.clone());
            record.pets.push(pet.clone());
            record.pet_incubation = None;
            record.touch(now);
            Mutation::Commit(Hatch::Hatched(pet))
        })?;

        Ok(match outcome {
            None | Some((Hatch::Missing, _)) => ActionResult::rejected(Reason::NotIncubating),
            Some((Hatch::Waiting(wait), _)) => ActionResult::wait(Reason::NotReady, wait),
            Some((Hatch::Hatched(pet), record)) => {
                info!(
                    "incubation: {} hatched {} the {} pet",
                    user_id,
                    pet.name,
                    pet.rarity.label()
                );
                ActionResult::success()
                    .with_balance(record.balance)
                    .with_pet(pet)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rarity_has_names_within_limit() {
        for rarity in Rarity::ALL {
            let pool = name_pool(rarity);
            assert!(!pool.is_empty());
            assert!(pool
                .iter()
                .all(|name| name.chars().count() <= crate::economy::types::PET_NAME_MAX_CHARS));
        }
    }

    #[test]
    fn picked_names_come_from_the_pool() {
        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let name = pick_name(Rarity::Mythic, &mut rng);
            assert!(name_pool(Rarity::Mythic).contains(&name));
        }
    }
}
