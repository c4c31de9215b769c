//! Egg incubation, hatching and pet exploration trips.
mod common;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use petconomy::economy::exploration::{Expeditions, TRIP_XP};
use petconomy::economy::incubation::{name_pool, Incubator};
use petconomy::economy::ledger::grant_item;
use petconomy::economy::{CareAction, PetLifecycle, PetSettings, Rarity, Reason, StaticCatalog};

#[test]
fn rare_egg_hatches_after_forty_five_minutes() {
    let (_dir, store) = common::open_store();
    let catalog = StaticCatalog::default();
    let incubator = Incubator::new(&store, &catalog);
    let started = Utc::now();
    let mut rng = StdRng::seed_from_u64(45);
    grant_item(&store, "breeder", "egg_rare", 1, started).unwrap();

    let start = incubator.start("breeder", "egg_rare", started).unwrap();
    assert!(start.ok);
    assert_eq!(start.next_in_ms, Some(45 * 60 * 1000));
    let record = store.find("breeder").unwrap().unwrap();
    let incubation = record.pet_incubation.clone().unwrap();
    assert_eq!(incubation.hatch_at, started + Duration::minutes(45));
    assert!(!record.has_item("egg_rare"), "the egg is consumed");

    let early = started + Duration::minutes(44);
    assert!(!incubation.is_ready(early));
    let not_yet = incubator.hatch("breeder", early, &mut rng).unwrap();
    assert!(not_yet.is_rejected_with(Reason::NotReady));
    assert_eq!(not_yet.next_in_ms, Some(60_000));

    let ready = started + Duration::minutes(45);
    assert!(incubation.is_ready(ready));
    let hatched = incubator.hatch("breeder", ready, &mut rng).unwrap();
    assert!(hatched.ok);
    let pet = hatched.pet.unwrap();
    assert_eq!(pet.level, 1);
    assert_eq!(pet.rarity, Rarity::Rare);
    assert!(pet.attributes.newborn);
    assert!(name_pool(Rarity::Rare).contains(&pet.name.as_str()));

    let record = store.find("breeder").unwrap().unwrap();
    assert!(record.pet_incubation.is_none());
    assert_eq!(record.pets.len(), 1);
    assert_eq!(record.active_pet_id.as_deref(), Some(pet.pet_id.as_str()));

    let again = incubator.hatch("breeder", ready, &mut rng).unwrap();
    assert!(again.is_rejected_with(Reason::NotIncubating));
    assert_eq!(store.find("breeder").unwrap().unwrap().pets.len(), 1);
}

#[test]
fn incubation_start_rejections() {
    let (_dir, store) = common::open_store();
    let catalog = StaticCatalog::default();
    let incubator = Incubator::new(&store, &catalog);
    let now = Utc::now();

    assert!(incubator
        .start("keeper", "egg_common", now)
        .unwrap()
        .is_rejected_with(Reason::NotOwned));

    grant_item(&store, "keeper", "oak_log", 1, now).unwrap();
    assert!(incubator
        .start("keeper", "oak_log", now)
        .unwrap()
        .is_rejected_with(Reason::InvalidAction));

    grant_item(&store, "keeper", "egg_common", 2, now).unwrap();
    assert!(incubator.start("keeper", "egg_common", now).unwrap().ok);
    assert!(incubator
        .start("keeper", "egg_common", now)
        .unwrap()
        .is_rejected_with(Reason::Incubating));
    assert_eq!(
        store.find("keeper").unwrap().unwrap().item_amount("egg_common"),
        1,
        "a rejected start keeps the egg"
    );

    let status = incubator.status("keeper", now + Duration::minutes(5)).unwrap();
    assert_eq!(status.next_in_ms, Some(10 * 60 * 1000));
    assert!(incubator
        .status("stranger", now)
        .unwrap()
        .is_rejected_with(Reason::NotIncubating));
}

#[test]
fn exploration_trip_pays_out_and_advances_rank() {
    let (_dir, store) = common::open_store();
    let catalog = StaticCatalog::default();
    let settings = PetSettings::default();
    let expeditions = Expeditions::new(&store, &catalog, &settings);
    let mut rng = StdRng::seed_from_u64(3);
    let mut now = Utc::now();
    common::give_pet(&store, "explorer", now);

    assert!(expeditions
        .finish("explorer", now, &mut rng)
        .unwrap()
        .is_rejected_with(Reason::NotExploring));
    assert!(expeditions
        .start("explorer", "atlantis", now)
        .unwrap()
        .is_rejected_with(Reason::InvalidZone));
    assert!(expeditions
        .start("explorer", "crystal_cave", now)
        .unwrap()
        .is_rejected_with(Reason::Requirement));

    let mut balance = 0;
    for trip in 0..3 {
        let started = expeditions.start("explorer", "backyard", now).unwrap();
        assert!(started.ok, "trip {} should start", trip);
        assert!(expeditions
            .start("explorer", "backyard", now)
            .unwrap()
            .is_rejected_with(Reason::Exploring));

        let early = expeditions
            .finish("explorer", now + Duration::minutes(19), &mut rng)
            .unwrap();
        assert!(early.is_rejected_with(Reason::NotReady));
        assert_eq!(early.next_in_ms, Some(60_000));

        now += Duration::minutes(20);
        let done = expeditions.finish("explorer", now, &mut rng).unwrap();
        assert!(done.ok);
        let amount = done.amount.unwrap();
        assert!((10..=25).contains(&amount));
        balance += amount;
        assert_eq!(done.balance, Some(balance));
        let pet = done.pet.unwrap();
        assert_eq!(pet.attributes.xp, TRIP_XP * (trip + 1));
        assert!(pet.attributes.exploration.is_none());
    }

    let record = store.find("explorer").unwrap().unwrap();
    let progress = record.active_pet().unwrap().attributes.exploration_progress;
    assert_eq!(progress.rank, 2);
    assert_eq!(progress.completed_in_rank, 0);
}

#[test]
fn exploring_pet_cannot_be_cared_for() {
    let (_dir, store) = common::open_store();
    let catalog = StaticCatalog::default();
    let settings = PetSettings::default();
    let now = Utc::now();
    common::give_pet(&store, "busy", now);

    assert!(Expeditions::new(&store, &catalog, &settings)
        .start("busy", "backyard", now)
        .unwrap()
        .ok);
    let fed = PetLifecycle::new(&store, &settings)
        .care("busy", CareAction::Feed, now)
        .unwrap();
    assert!(fed.is_rejected_with(Reason::Exploring));
}
