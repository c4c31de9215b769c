//! Pet lifecycle: care decay, neglect, leveling and stat allocation.
//!
//! The rules are plain functions over a [`Pet`] and take `now` explicitly.
//! [`PetLifecycle`] applies them to the active pet inside one atomic record
//! update, so decay and neglect are persisted on every access.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::errors::EconomyError;
use super::outcome::{ActionResult, Reason};
use super::storage::{EconomyStore, Mutation};
use super::types::{
    AwayReason, AwayStatus, EconomyRecord, Pet, StatKind, CARE_MAX, PET_NAME_MAX_CHARS, STAT_MAX,
};

/// Safety cap on level-ups granted by a single XP award.
const MAX_LEVEL_UPS: u32 = 25;
const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PetSettings {
    pub neglect_threshold_hours: i64,
    /// Minimum each care stat is raised to when a pet comes back.
    pub return_care_floor: u8,
    /// Completed trips needed to advance one exploration rank.
    pub exploration_quota: u32,
}

impl Default for PetSettings {
    fn default() -> Self {
        Self {
            neglect_threshold_hours: 48,
            return_care_floor: 30,
            exploration_quota: 3,
        }
    }
}

impl PetSettings {
    pub fn neglect_threshold(&self) -> Duration {
        Duration::hours(self.neglect_threshold_hours)
    }
}

// ============================================================================
// Care actions
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CareAction {
    Play,
    Feed,
    Clean,
    Train,
}

/// Signed change to `(affection, hunger, hygiene)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareDelta {
    pub affection: i32,
    pub hunger: i32,
    pub hygiene: i32,
}

impl CareAction {
    pub const ALL: [CareAction; 4] = [
        CareAction::Play,
        CareAction::Feed,
        CareAction::Clean,
        CareAction::Train,
    ];

    pub fn delta(self) -> CareDelta {
        let (affection, hunger, hygiene) = match self {
            CareAction::Play => (12, -4, -3),
            CareAction::Feed => (3, 25, 0),
            CareAction::Clean => (2, 0, 30),
            CareAction::Train => (4, -8, -6),
        };
        CareDelta {
            affection,
            hunger,
            hygiene,
        }
    }

    pub fn xp(self) -> u64 {
        match self {
            CareAction::Play => 10,
            CareAction::Feed => 6,
            CareAction::Clean => 6,
            CareAction::Train => 18,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CareAction::Play => "play",
            CareAction::Feed => "feed",
            CareAction::Clean => "clean",
            CareAction::Train => "train",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        CareAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(input.trim()))
    }
}

// ============================================================================
// Pure rules
// ============================================================================

/// XP needed to go from `level` to `level + 1`.
pub fn xp_to_next(level: u32) -> u64 {
    let n = level.max(1) as u64 - 1;
    120 + 30 * n + 2 * n * n
}

pub fn stars_for_level(level: u32) -> u8 {
    (level / 10).min(MAX_STARS as u32) as u8
}

/// Apply whole hours of decay since `care_decay_at`. Returns the hours applied;
/// `care_decay_at` only moves when at least one hour elapsed.
pub fn apply_decay(pet: &mut Pet, now: DateTime<Utc>) -> i64 {
    let hours = (now - pet.attributes.care_decay_at).num_hours();
    if hours < 1 {
        return 0;
    }
    let h = hours.min(i32::MAX as i64 / 3) as i32;
    pet.attributes.care.apply(-h, -3 * h, -2 * h);
    pet.attributes.care_decay_at = now;
    hours
}

/// Mark the pet away when it has not been cared for within `threshold`.
/// Returns true on the transition.
pub fn detect_neglect(pet: &mut Pet, now: DateTime<Utc>, threshold: Duration) -> bool {
    if pet.is_away() || now - pet.attributes.last_care_at < threshold {
        return false;
    }
    pet.attributes.away = Some(AwayStatus {
        at: now,
        reason: AwayReason::Neglect,
    });
    true
}

/// Decay then neglect, as applied on every access.
pub fn refresh(pet: &mut Pet, now: DateTime<Utc>, settings: &PetSettings) {
    apply_decay(pet, now);
    if detect_neglect(pet, now, settings.neglect_threshold()) {
        info!("pet: {} ({}) wandered off from neglect", pet.name, pet.pet_id);
    }
}

/// Add XP and level up while the threshold is met. Returns levels gained.
pub fn grant_xp(pet: &mut Pet, xp: u64) -> u32 {
    pet.attributes.xp = pet.attributes.xp.saturating_add(xp);
    let mut gained = 0;
    while gained < MAX_LEVEL_UPS && pet.attributes.xp >= xp_to_next(pet.level) {
        pet.attributes.xp -= xp_to_next(pet.level);
        pet.level += 1;
        gained += 1;
    }
    pet.attributes.xp_to_next = xp_to_next(pet.level);
    pet.attributes.stars = stars_for_level(pet.level);
    gained
}

pub fn apply_care(pet: &mut Pet, action: CareAction, now: DateTime<Utc>) -> Result<u32, Reason> {
    if pet.is_away() {
        return Err(Reason::PetAway);
    }
    if pet.attributes.exploration.is_some() {
        return Err(Reason::Exploring);
    }
    let delta = action.delta();
    pet.attributes
        .care
        .apply(delta.affection, delta.hunger, delta.hygiene);
    pet.attributes.last_care_at = now;
    pet.attributes.newborn = false;
    Ok(grant_xp(pet, action.xp()))
}

/// Bring an away pet back, raising each care stat to at least `floor`.
pub fn recall(pet: &mut Pet, now: DateTime<Utc>, floor: u8) -> Result<(), Reason> {
    if !pet.is_away() {
        return Err(Reason::InvalidAction);
    }
    let floor = floor.min(CARE_MAX);
    let care = &mut pet.attributes.care;
    care.affection = care.affection.max(floor);
    care.hunger = care.hunger.max(floor);
    care.hygiene = care.hygiene.max(floor);
    pet.attributes.away = None;
    pet.attributes.last_care_at = now;
    Ok(())
}

pub fn allocate_stat(pet: &mut Pet, stat: StatKind) -> Result<(), Reason> {
    if pet.unspent_stat_points() == 0 || pet.attributes.stats.get(stat) >= STAT_MAX {
        return Err(Reason::InvalidAction);
    }
    *pet.attributes.stats.get_mut(stat) += 1;
    Ok(())
}

/// Trimmed name of 1 to 20 characters without control characters.
pub fn validate_name(input: &str) -> Option<String> {
    let name = input.trim();
    let chars = name.chars().count();
    if chars == 0 || chars > PET_NAME_MAX_CHARS || name.chars().any(char::is_control) {
        return None;
    }
    Some(name.to_string())
}

// ============================================================================
// Store-backed operations
// ============================================================================

/// Committed state of a pet operation.
pub struct PetOutcome<T> {
    pub value: T,
    pub pet: Pet,
    pub record: EconomyRecord,
}

/// Run `op` on the active pet inside one atomic update.
///
/// Decay and neglect are applied first and persisted even when `op` rejects.
/// `op` receives the record and the active pet's index so it can touch the
/// balance or inventory in the same write.
pub fn update_active_pet<T, F>(
    store: &EconomyStore,
    settings: &PetSettings,
    user_id: &str,
    now: DateTime<Utc>,
    mut op: F,
) -> Result<Result<PetOutcome<T>, Reason>, EconomyError>
where
    F: FnMut(&mut EconomyRecord, usize) -> Result<T, Reason>,
{
    let outcome = store.update(user_id, |record| {
        let Some(index) = active_index(record) else {
            return Mutation::Abort(Err(Reason::NoPet));
        };
        let before = record.clone();
        refresh(&mut record.pets[index], now, settings);
        let result = op(record, index);
        if result.is_err() && *record == before {
            return Mutation::Abort(result);
        }
        record.touch(now);
        Mutation::Commit(result)
    })?;

    Ok(match outcome {
        None => Err(Reason::NoPet),
        Some((Err(reason), _)) => Err(reason),
        Some((Ok(value), record)) => match active_index(&record) {
            Some(index) => Ok(PetOutcome {
                value,
                pet: record.pets[index].clone(),
                record,
            }),
            None => Err(Reason::NoPet),
        },
    })
}

fn active_index(record: &EconomyRecord) -> Option<usize> {
    let id = record.active_pet_id.as_deref()?;
    record.pets.iter().position(|pet| pet.pet_id == id)
}

/// Pet operations over one store.
pub struct PetLifecycle<'a> {
    store: &'a EconomyStore,
    settings: &'a PetSettings,
}

impl<'a> PetLifecycle<'a> {
    pub fn new(store: &'a EconomyStore, settings: &'a PetSettings) -> Self {
        Self { store, settings }
    }

    fn run<F>(&self, user_id: &str, now: DateTime<Utc>, label: &str, op: F) -> Result<ActionResult, EconomyError>
    where
        F: FnMut(&mut EconomyRecord, usize) -> Result<(), Reason>,
    {
        match update_active_pet(self.store, self.settings, user_id, now, op)? {
            Ok(outcome) => Ok(ActionResult::success()
                .with_balance(outcome.record.balance)
                .with_pet(outcome.pet)),
            Err(reason) => {
                debug!("pet: {} {} rejected: {}", user_id, label, reason);
                self.rejection(user_id, reason)
            }
        }
    }

    /// Rejections still show the pet (after decay) when there is one.
    fn rejection(&self, user_id: &str, reason: Reason) -> Result<ActionResult, EconomyError> {
        let mut result = ActionResult::rejected(reason);
        if let Some(record) = self.store.find(user_id)? {
            result.pet = record.active_pet().cloned();
        }
        Ok(result)
    }

    /// Current pet after decay and neglect have been applied and persisted.
    pub fn status(&self, user_id: &str, now: DateTime<Utc>) -> Result<ActionResult, EconomyError> {
        self.run(user_id, now, "status", |_, _| Ok(()))
    }

    pub fn care(
        &self,
        user_id: &str,
        action: CareAction,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, EconomyError> {
        let result = self.run(user_id, now, action.as_str(), |record, index| {
            apply_care(&mut record.pets[index], action, now).map(|_| ())
        })?;
        if let (true, Some(pet)) = (result.ok, result.pet.as_ref()) {
            info!(
                "pet: {} {} {} -> level {} xp {}/{}",
                user_id,
                action.as_str(),
                pet.name,
                pet.level,
                pet.attributes.xp,
                pet.attributes.xp_to_next
            );
        }
        Ok(result)
    }

    pub fn recall(&self, user_id: &str, now: DateTime<Utc>) -> Result<ActionResult, EconomyError> {
        let floor = self.settings.return_care_floor;
        self.run(user_id, now, "recall", |record, index| {
            recall(&mut record.pets[index], now, floor)
        })
    }

    pub fn rename(
        &self,
        user_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, EconomyError> {
        let Some(name) = validate_name(name) else {
            return Ok(ActionResult::rejected(Reason::InvalidAction));
        };
        self.run(user_id, now, "rename", |record, index| {
            record.pets[index].name = name.clone();
            Ok(())
        })
    }

    pub fn allocate_stat(
        &self,
        user_id: &str,
        stat: StatKind,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, EconomyError> {
        self.run(user_id, now, "allocate", |record, index| {
            allocate_stat(&mut record.pets[index], stat)
        })
    }

    /// Point the active pet at another owned pet.
    pub fn set_active(
        &self,
        user_id: &str,
        pet_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionResult, EconomyError> {
        let outcome = self.store.update(user_id, |record| {
            if !record.pets.iter().any(|pet| pet.pet_id == pet_id) {
                return Mutation::Abort(false);
            }
            record.active_pet_id = Some(pet_id.to_string());
            record.touch(now);
            Mutation::Commit(true)
        })?;
        match outcome {
            Some((true, record)) => {
                let mut result = ActionResult::success().with_balance(record.balance);
                result.pet = record.active_pet().cloned();
                Ok(result)
            }
            _ => Ok(ActionResult::rejected(Reason::NoPet)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::types::Rarity;

    fn pet_at(now: DateTime<Utc>) -> Pet {
        Pet::new("Pip", Rarity::Common, now)
    }

    #[test]
    fn xp_curve_is_strictly_increasing() {
        assert_eq!(xp_to_next(1), 120);
        assert_eq!(xp_to_next(2), 152);
        assert_eq!(xp_to_next(3), 188);
        for level in 1..500 {
            assert!(xp_to_next(level + 1) > xp_to_next(level));
        }
    }

    #[test]
    fn decay_applies_whole_hours_only() {
        let start = Utc::now();
        let mut pet = pet_at(start);
        assert_eq!(apply_decay(&mut pet, start + Duration::minutes(59)), 0);
        assert_eq!(pet.attributes.care_decay_at, start);

        let later = start + Duration::minutes(150);
        assert_eq!(apply_decay(&mut pet, later), 2);
        assert_eq!(pet.attributes.care.affection, 78);
        assert_eq!(pet.attributes.care.hunger, 74);
        assert_eq!(pet.attributes.care.hygiene, 76);
        assert_eq!(pet.attributes.care_decay_at, later);
    }

    #[test]
    fn long_absence_bottoms_out_at_zero() {
        let start = Utc::now();
        let mut pet = pet_at(start);
        apply_decay(&mut pet, start + Duration::days(30));
        assert_eq!(pet.attributes.care.hunger, 0);
        assert_eq!(pet.attributes.care.hygiene, 0);
        assert_eq!(pet.attributes.care.affection, 0);
    }

    #[test]
    fn neglect_marks_away_and_blocks_care() {
        let start = Utc::now();
        let mut pet = pet_at(start);
        let threshold = Duration::hours(48);
        assert!(!detect_neglect(&mut pet, start + Duration::hours(47), threshold));
        let late = start + Duration::hours(49);
        assert!(detect_neglect(&mut pet, late, threshold));
        assert!(!detect_neglect(&mut pet, late, threshold), "already away");
        assert_eq!(apply_care(&mut pet, CareAction::Feed, late), Err(Reason::PetAway));

        recall(&mut pet, late, 30).unwrap();
        assert!(!pet.is_away());
        assert_eq!(pet.attributes.last_care_at, late);
        assert!(apply_care(&mut pet, CareAction::Feed, late).is_ok());
    }

    #[test]
    fn recall_raises_to_floor_without_lowering() {
        let now = Utc::now();
        let mut pet = pet_at(now);
        pet.attributes.care.hunger = 5;
        pet.attributes.care.affection = 90;
        pet.attributes.away = Some(AwayStatus {
            at: now,
            reason: AwayReason::Neglect,
        });
        recall(&mut pet, now, 30).unwrap();
        assert_eq!(pet.attributes.care.hunger, 30);
        assert_eq!(pet.attributes.care.affection, 90);
        assert_eq!(recall(&mut pet, now, 30), Err(Reason::InvalidAction));
    }

    #[test]
    fn feeding_a_full_pet_stays_at_max() {
        let now = Utc::now();
        let mut pet = pet_at(now);
        pet.attributes.care.hunger = 100;
        apply_care(&mut pet, CareAction::Feed, now).unwrap();
        assert_eq!(pet.attributes.care.hunger, 100);
        assert!(!pet.attributes.newborn);
    }

    #[test]
    fn xp_rolls_over_into_levels() {
        let mut pet = pet_at(Utc::now());
        assert_eq!(grant_xp(&mut pet, 119), 0);
        assert_eq!(grant_xp(&mut pet, 1 + 152 + 10), 2);
        assert_eq!(pet.level, 3);
        assert_eq!(pet.attributes.xp, 10);
        assert_eq!(pet.attributes.xp_to_next, 188);
    }

    #[test]
    fn level_ups_per_award_are_capped() {
        let mut pet = pet_at(Utc::now());
        let gained = grant_xp(&mut pet, u64::MAX / 2);
        assert_eq!(gained, MAX_LEVEL_UPS);
        assert_eq!(pet.level, 1 + MAX_LEVEL_UPS);
        assert_eq!(pet.attributes.stars, 2);
    }

    #[test]
    fn stat_points_respect_budget_and_cap() {
        let mut pet = pet_at(Utc::now());
        assert_eq!(allocate_stat(&mut pet, StatKind::Attack), Err(Reason::InvalidAction));
        pet.level = 13;
        for _ in 0..10 {
            allocate_stat(&mut pet, StatKind::Attack).unwrap();
        }
        assert_eq!(allocate_stat(&mut pet, StatKind::Attack), Err(Reason::InvalidAction));
        allocate_stat(&mut pet, StatKind::Hunt).unwrap();
        allocate_stat(&mut pet, StatKind::Hunt).unwrap();
        assert_eq!(allocate_stat(&mut pet, StatKind::Defense), Err(Reason::InvalidAction));
        assert_eq!(pet.attributes.stats.total(), 12);
    }

    #[test]
    fn names_are_validated() {
        assert_eq!(validate_name("  Biscuit "), Some("Biscuit".to_string()));
        assert_eq!(validate_name("   "), None);
        assert_eq!(validate_name("bad\nname"), None);
        assert_eq!(validate_name(&"x".repeat(21)), None);
        assert!(validate_name(&"é".repeat(20)).is_some());
    }

    #[test]
    fn care_actions_parse_case_insensitively() {
        assert_eq!(CareAction::parse("FEED"), Some(CareAction::Feed));
        assert_eq!(CareAction::parse("dance"), None);
    }
}
