//! Test utilities & fixtures shared by the integration tests.

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use petconomy::economy::{EconomyStore, Pet, Rarity};

/// Open a throwaway store. Keep the `TempDir` alive for the test's duration.
pub fn open_store() -> (TempDir, EconomyStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = EconomyStore::open(dir.path().join("economy")).expect("open store");
    (dir, store)
}

/// Give `user_id` a fresh active pet created at `born`.
#[allow(dead_code)]
pub fn give_pet(store: &EconomyStore, user_id: &str, born: DateTime<Utc>) -> Pet {
    let mut record = store.get_or_create(user_id, born).expect("record");
    let pet = Pet::new("Pip", Rarity::Common, born);
    record.active_pet_id = Some(pet.pet_id.clone());
    record.pets.push(pet.clone());
    store.save(record).expect("save");
    pet
}
