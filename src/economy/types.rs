use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pet::xp_to_next;

pub const ECONOMY_SCHEMA_VERSION: u8 = 1;

/// Upper bound for every care stat.
pub const CARE_MAX: u8 = 100;
/// Upper bound for a single trainable stat.
pub const STAT_MAX: u8 = 10;
/// Longest accepted pet name, in characters.
pub const PET_NAME_MAX_CHARS: usize = 20;

// ============================================================================
// Activities and rarity
// ============================================================================

/// Timestamp slot on the economy record, one per cooldown-gated activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityField {
    Fish,
    Mine,
    Chop,
    Explore,
    Daily,
    Work,
}

impl ActivityField {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityField::Fish => "last_fish",
            ActivityField::Mine => "last_mine",
            ActivityField::Chop => "last_chop",
            ActivityField::Explore => "last_explore",
            ActivityField::Daily => "last_daily",
            ActivityField::Work => "last_work",
        }
    }
}

/// Minigame activity kinds. Each kind owns its zones and method table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Fishing,
    Mining,
    Chopping,
    Exploring,
    Foraging,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Fishing,
        ActivityKind::Mining,
        ActivityKind::Chopping,
        ActivityKind::Exploring,
        ActivityKind::Foraging,
    ];

    /// Timestamp field for cooldown-gated kinds; `None` for rate-limited ones.
    pub fn cooldown_field(self) -> Option<ActivityField> {
        match self {
            ActivityKind::Fishing => Some(ActivityField::Fish),
            ActivityKind::Mining => Some(ActivityField::Mine),
            ActivityKind::Chopping => Some(ActivityField::Chop),
            ActivityKind::Exploring => Some(ActivityField::Explore),
            ActivityKind::Foraging => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Fishing => "fishing",
            ActivityKind::Mining => "mining",
            ActivityKind::Chopping => "chopping",
            ActivityKind::Exploring => "exploring",
            ActivityKind::Foraging => "foraging",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "fish" | "fishing" => Some(ActivityKind::Fishing),
            "mine" | "mining" => Some(ActivityKind::Mining),
            "chop" | "chopping" => Some(ActivityKind::Chopping),
            "explore" | "exploring" => Some(ActivityKind::Exploring),
            "forage" | "foraging" => Some(ActivityKind::Foraging),
            _ => None,
        }
    }
}

/// Discrete rarity tier driving incubation time, name pools and drop odds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
    Divine,
}

impl Rarity {
    pub const ALL: [Rarity; 7] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
        Rarity::Divine,
    ];

    /// Fixed incubation time for an egg of this tier.
    pub fn hatch_duration(self) -> Duration {
        match self {
            Rarity::Common => Duration::minutes(15),
            Rarity::Uncommon => Duration::minutes(30),
            Rarity::Rare => Duration::minutes(45),
            Rarity::Epic => Duration::minutes(90),
            Rarity::Legendary => Duration::hours(3),
            Rarity::Mythic => Duration::hours(5),
            Rarity::Divine => Duration::hours(8),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
            Rarity::Divine => "divine",
        }
    }
}

/// Inclusive integer reward range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardRange {
    pub min: i64,
    pub max: i64,
}

impl RewardRange {
    /// A range that always yields zero; used when a gate should not pay out.
    pub const NONE: RewardRange = RewardRange { min: 0, max: 0 };

    /// Build a range, swapping bounds if given backwards and flooring at zero.
    pub fn new(min: i64, max: i64) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: lo.max(0),
            max: hi.max(0),
        }
    }

    /// Scale both bounds by `multiplier`, preserving their ratio. Multipliers
    /// below 1.0 are treated as 1.0 so a scaled range never dips under `min`.
    pub fn scaled(self, multiplier: f64) -> Self {
        let factor = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        let min = (self.min as f64 * factor).round() as i64;
        let max = (self.max as f64 * factor).round() as i64;
        Self::new(min.max(self.min), max.max(min))
    }

    pub fn sample<R: rand::Rng + ?Sized>(self, rng: &mut R) -> i64 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// One inventory line. Amounts are strictly positive; empty lines are pruned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLine {
    pub item_id: String,
    pub amount: u32,
}

impl InventoryLine {
    pub fn new(item_id: impl Into<String>, amount: u32) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
        }
    }
}

/// Material rolled from a drop table and credited alongside a reward.
pub type DropLine = InventoryLine;

// ============================================================================
// Pets
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CareStats {
    pub affection: u8,
    pub hunger: u8,
    pub hygiene: u8,
}

impl CareStats {
    pub fn full() -> Self {
        Self {
            affection: CARE_MAX,
            hunger: CARE_MAX,
            hygiene: CARE_MAX,
        }
    }

    /// Apply signed deltas and clamp each stat into `0..=100`.
    pub fn apply(&mut self, affection: i32, hunger: i32, hygiene: i32) {
        self.affection = clamp_care(self.affection as i32 + affection);
        self.hunger = clamp_care(self.hunger as i32 + hunger);
        self.hygiene = clamp_care(self.hygiene as i32 + hygiene);
    }
}

fn clamp_care(value: i32) -> u8 {
    value.clamp(0, CARE_MAX as i32) as u8
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Attack,
    Defense,
    Resistance,
    Hunt,
}

impl StatKind {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "attack" | "atk" => Some(StatKind::Attack),
            "defense" | "def" => Some(StatKind::Defense),
            "resistance" | "res" => Some(StatKind::Resistance),
            "hunt" => Some(StatKind::Hunt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PetStats {
    pub attack: u8,
    pub defense: u8,
    pub resistance: u8,
    pub hunt: u8,
}

impl PetStats {
    pub fn total(&self) -> u32 {
        self.attack as u32 + self.defense as u32 + self.resistance as u32 + self.hunt as u32
    }

    pub fn get(&self, stat: StatKind) -> u8 {
        match stat {
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::Resistance => self.resistance,
            StatKind::Hunt => self.hunt,
        }
    }

    pub fn get_mut(&mut self, stat: StatKind) -> &mut u8 {
        match stat {
            StatKind::Attack => &mut self.attack,
            StatKind::Defense => &mut self.defense,
            StatKind::Resistance => &mut self.resistance,
            StatKind::Hunt => &mut self.hunt,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AwayReason {
    Neglect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwayStatus {
    pub at: DateTime<Utc>,
    pub reason: AwayReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationTrip {
    pub zone_id: String,
    pub started_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub rank_at_start: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationProgress {
    pub rank: u32,
    pub completed_in_rank: u32,
}

impl Default for ExplorationProgress {
    fn default() -> Self {
        Self {
            rank: 1,
            completed_in_rank: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PetAttributes {
    pub xp: u64,
    /// Derived from the level; refreshed after every change, never read back as truth.
    pub xp_to_next: u64,
    pub stars: u8,
    pub care: CareStats,
    pub stats: PetStats,
    pub away: Option<AwayStatus>,
    pub exploration: Option<ExplorationTrip>,
    pub exploration_progress: ExplorationProgress,
    pub last_care_at: DateTime<Utc>,
    pub care_decay_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub newborn: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub pet_id: String,
    pub name: String,
    pub rarity: Rarity,
    pub level: u32,
    pub attributes: PetAttributes,
}

impl Pet {
    pub fn new(name: &str, rarity: Rarity, now: DateTime<Utc>) -> Self {
        Self {
            pet_id: uuid::Uuid::new_v4().to_string(),
            name: name.chars().take(PET_NAME_MAX_CHARS).collect(),
            rarity,
            level: 1,
            attributes: PetAttributes {
                xp: 0,
                xp_to_next: xp_to_next(1),
                stars: 0,
                care: CareStats {
                    affection: 80,
                    hunger: 80,
                    hygiene: 80,
                },
                stats: PetStats::default(),
                away: None,
                exploration: None,
                exploration_progress: ExplorationProgress::default(),
                last_care_at: now,
                care_decay_at: now,
                created_at: now,
                newborn: true,
            },
        }
    }

    pub fn is_away(&self) -> bool {
        self.attributes.away.is_some()
    }

    /// Stat points the current level allows: `level - 1`.
    pub fn stat_budget(&self) -> u32 {
        self.level.saturating_sub(1)
    }

    pub fn unspent_stat_points(&self) -> u32 {
        self.stat_budget()
            .saturating_sub(self.attributes.stats.total())
    }
}

/// Pending egg hatch. Independent of the pets already owned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PetIncubation {
    pub egg_item_id: String,
    pub rarity: Rarity,
    pub started_at: DateTime<Utc>,
    pub hatch_at: DateTime<Utc>,
}

impl PetIncubation {
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        now >= self.hatch_at
    }
}

// ============================================================================
// Economy record
// ============================================================================

/// Per-user economy document. Created lazily, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomyRecord {
    pub user_id: String,
    pub balance: i64,
    pub inventory: Vec<InventoryLine>,
    /// Last claim per activity; a missing entry means never claimed.
    pub cooldowns: BTreeMap<ActivityField, DateTime<Utc>>,
    pub pet_incubation: Option<PetIncubation>,
    pub pets: Vec<Pet>,
    pub active_pet_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl EconomyRecord {
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            balance: 0,
            inventory: Vec::new(),
            cooldowns: BTreeMap::new(),
            pet_incubation: None,
            pets: Vec::new(),
            active_pet_id: None,
            created_at: now,
            updated_at: now,
            schema_version: ECONOMY_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn last_claim(&self, field: ActivityField) -> Option<DateTime<Utc>> {
        self.cooldowns.get(&field).copied()
    }

    pub fn item_amount(&self, item_id: &str) -> u32 {
        self.inventory
            .iter()
            .find(|line| line.item_id == item_id)
            .map(|line| line.amount)
            .unwrap_or(0)
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.item_amount(item_id) > 0
    }

    pub fn active_pet(&self) -> Option<&Pet> {
        let id = self.active_pet_id.as_deref()?;
        self.pets.iter().find(|pet| pet.pet_id == id)
    }

    pub fn active_pet_mut(&mut self) -> Option<&mut Pet> {
        let id = self.active_pet_id.clone()?;
        self.pets.iter_mut().find(|pet| pet.pet_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn care_deltas_clamp_into_range() {
        let mut care = CareStats {
            affection: 5,
            hunger: 98,
            hygiene: 50,
        };
        care.apply(-20, 25, 0);
        assert_eq!(care.affection, 0);
        assert_eq!(care.hunger, 100);
        assert_eq!(care.hygiene, 50);
    }

    #[test]
    fn hatch_durations_increase_with_rarity() {
        assert_eq!(Rarity::Common.hatch_duration(), Duration::minutes(15));
        assert_eq!(Rarity::Rare.hatch_duration(), Duration::minutes(45));
        assert_eq!(Rarity::Divine.hatch_duration(), Duration::hours(8));
        for pair in Rarity::ALL.windows(2) {
            assert!(pair[0].hatch_duration() < pair[1].hatch_duration());
        }
    }

    #[test]
    fn active_pet_follows_pointer_not_position() {
        let now = Utc::now();
        let mut record = EconomyRecord::new("u1", now);
        let first = Pet::new("Pip", Rarity::Common, now);
        let second = Pet::new("Mochi", Rarity::Rare, now);
        record.active_pet_id = Some(first.pet_id.clone());
        record.pets.push(first);
        record.pets.push(second);
        assert_eq!(record.active_pet().unwrap().name, "Pip");
    }

    #[test]
    fn new_pet_truncates_long_names() {
        let pet = Pet::new("An extremely long pet name indeed", Rarity::Common, Utc::now());
        assert_eq!(pet.name.chars().count(), PET_NAME_MAX_CHARS);
        assert_eq!(pet.level, 1);
        assert_eq!(pet.stat_budget(), 0);
    }
}
