//! Minigame resolver for gathering activities.
//!
//! Overview
//! - A scene is opened per attempt and held by the caller; nothing is persisted
//!   until the attempt is resolved.
//! - Three interaction modes: named methods with a reward multiplier, doors
//!   (1 of 3) and wires (1 of 4). Doors and wires hide one correct answer
//!   derived from the scene seed.
//! - Method success probability: `clamp(base − (multiplier − 1) × k, lower, upper)`.
//! - Gating: cooldown-gated kinds consume their activity field; the others go
//!   through the rate limiter.
//! - A won attempt credits the scaled reward and every rolled drop in one
//!   record update. A lost attempt changes nothing beyond the gate.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::catalog::{DropEntry, Zone};
use super::cooldown::CooldownGate;
use super::errors::EconomyError;
use super::ledger::add_to_inventory;
use super::outcome::{ActionResult, Reason};
use super::rate_limit::{RateDecision, RateLimitSettings, RateLimiter};
use super::storage::EconomyStore;
use super::types::{ActivityKind, DropLine, RewardRange};

/// Highest multiplier any method may declare.
pub const MAX_MULTIPLIER: f64 = 2.5;
/// Reward multiplier for guessing the right door.
pub const DOOR_MULTIPLIER: f64 = 1.5;
/// Reward multiplier for cutting the right wire.
pub const WIRE_MULTIPLIER: f64 = 1.8;

pub const DOOR_COUNT: u8 = 3;
pub const WIRE_COUNT: u8 = 4;

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModeWeights {
    pub methods: u32,
    pub doors: u32,
    pub wires: u32,
}

impl Default for ModeWeights {
    fn default() -> Self {
        Self {
            methods: 52,
            doors: 24,
            wires: 24,
        }
    }
}

/// Per-activity gate and difficulty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActivityTuning {
    /// Cooldown window in seconds; `None` means the kind is rate-limited.
    #[serde(default)]
    pub cooldown_secs: Option<i64>,
    /// How fast success odds fall as the method multiplier rises.
    pub k: f64,
}

impl ActivityTuning {
    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown_secs.map(Duration::seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MinigameSettings {
    pub base_success: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub weights: ModeWeights,
    pub fishing: ActivityTuning,
    pub mining: ActivityTuning,
    pub chopping: ActivityTuning,
    pub exploring: ActivityTuning,
    pub foraging: ActivityTuning,
}

impl Default for MinigameSettings {
    fn default() -> Self {
        let tuning = |secs: Option<i64>, k: f64| ActivityTuning {
            cooldown_secs: secs,
            k,
        };
        Self {
            base_success: 0.80,
            lower_bound: 0.15,
            upper_bound: 0.95,
            weights: ModeWeights::default(),
            fishing: tuning(Some(120), 0.35),
            mining: tuning(Some(180), 0.45),
            chopping: tuning(Some(150), 0.40),
            exploring: tuning(Some(300), 0.40),
            foraging: tuning(None, 0.30),
        }
    }
}

impl MinigameSettings {
    pub fn tuning(&self, kind: ActivityKind) -> &ActivityTuning {
        match kind {
            ActivityKind::Fishing => &self.fishing,
            ActivityKind::Mining => &self.mining,
            ActivityKind::Chopping => &self.chopping,
            ActivityKind::Exploring => &self.exploring,
            ActivityKind::Foraging => &self.foraging,
        }
    }
}

// ============================================================================
// Scenes and choices
// ============================================================================

/// A named action offered in a methods scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Method {
    pub id: String,
    pub label: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SceneModeKind {
    Methods,
    Doors,
    Wires,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    Methods { methods: Vec<Method> },
    Doors { count: u8 },
    Wires { count: u8 },
}

/// One minigame attempt as presented to the player.
///
/// The scene is fully determined by `(kind, seed, mode kind)`, so a caller may
/// keep only the seed and rebuild it with [`Scene::rebuild`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub kind: ActivityKind,
    pub seed: u64,
    pub mode: SceneMode,
}

impl Scene {
    pub fn rebuild(kind: ActivityKind, seed: u64, mode: SceneModeKind) -> Self {
        let mode = match mode {
            SceneModeKind::Methods => SceneMode::Methods {
                methods: method_table(kind),
            },
            SceneModeKind::Doors => SceneMode::Doors { count: DOOR_COUNT },
            SceneModeKind::Wires => SceneMode::Wires { count: WIRE_COUNT },
        };
        Self { kind, seed, mode }
    }

    pub fn mode_kind(&self) -> SceneModeKind {
        match self.mode {
            SceneMode::Methods { .. } => SceneModeKind::Methods,
            SceneMode::Doors { .. } => SceneModeKind::Doors,
            SceneMode::Wires { .. } => SceneModeKind::Wires,
        }
    }

    /// Hidden correct index for doors and wires.
    pub fn answer(&self) -> Option<u8> {
        match self.mode {
            SceneMode::Methods { .. } => None,
            SceneMode::Doors { count } | SceneMode::Wires { count } => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                Some(rng.gen_range(0..count.max(1)))
            }
        }
    }

    fn method(&self, id: &str) -> Option<&Method> {
        match &self.mode {
            SceneMode::Methods { methods } => methods.iter().find(|m| m.id == id),
            _ => None,
        }
    }
}

/// The player's answer to a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Method(String),
    Door(u8),
    Wire(u8),
}

impl Choice {
    /// Parse `door:N`, `wire:N` or a bare method id.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some((prefix, index)) = input.split_once(':') {
            let index: u8 = index.trim().parse().ok()?;
            return match prefix.trim().to_ascii_lowercase().as_str() {
                "door" => Some(Choice::Door(index)),
                "wire" => Some(Choice::Wire(index)),
                _ => None,
            };
        }
        Some(Choice::Method(input.to_ascii_lowercase()))
    }

    /// Reward multiplier for this choice, or `None` when it does not fit the scene.
    pub fn multiplier_in(&self, scene: &Scene) -> Option<f64> {
        match (self, &scene.mode) {
            (Choice::Method(id), SceneMode::Methods { .. }) => {
                scene.method(id).map(|m| m.multiplier)
            }
            (Choice::Door(index), SceneMode::Doors { count }) if index < count => {
                Some(DOOR_MULTIPLIER)
            }
            (Choice::Wire(index), SceneMode::Wires { count }) if index < count => {
                Some(WIRE_MULTIPLIER)
            }
            _ => None,
        }
    }
}

/// Named actions for each activity kind, cheapest first.
pub fn method_table(kind: ActivityKind) -> Vec<Method> {
    let entries: &[(&str, &str, f64)] = match kind {
        ActivityKind::Fishing => &[
            ("cast", "Cast from the shore", 1.0),
            ("lure", "Try a shiny lure", 1.4),
            ("net", "Sweep with a net", 1.8),
            ("deep_cast", "Cast into deep water", 2.5),
        ],
        ActivityKind::Mining => &[
            ("tap", "Tap along the seam", 1.0),
            ("strike", "Strike hard", 1.5),
            ("blast", "Blast the wall", 2.2),
        ],
        ActivityKind::Chopping => &[
            ("chop", "Chop steadily", 1.0),
            ("saw", "Saw through", 1.3),
            ("fell", "Fell the big one", 2.0),
        ],
        ActivityKind::Exploring => &[
            ("scout", "Scout the edges", 1.0),
            ("climb", "Climb higher", 1.6),
            ("dive", "Dive into the unknown", 2.4),
        ],
        ActivityKind::Foraging => &[
            ("pick", "Pick what is in reach", 1.0),
            ("dig", "Dig around roots", 1.4),
            ("canopy", "Search the canopy", 1.9),
        ],
    };
    entries
        .iter()
        .map(|(id, label, multiplier)| Method {
            id: id.to_string(),
            label: label.to_string(),
            multiplier: multiplier.min(MAX_MULTIPLIER),
        })
        .collect()
}

/// Draw a scene mode by weight and a fresh seed.
pub fn open_scene<R: Rng + ?Sized>(kind: ActivityKind, weights: ModeWeights, rng: &mut R) -> Scene {
    let modes = [
        (SceneModeKind::Methods, weights.methods),
        (SceneModeKind::Doors, weights.doors),
        (SceneModeKind::Wires, weights.wires),
    ];
    let mode = match WeightedIndex::new(modes.iter().map(|(_, w)| *w)) {
        Ok(dist) => modes[dist.sample(rng)].0,
        Err(_) => SceneModeKind::Methods,
    };
    Scene::rebuild(kind, rng.gen(), mode)
}

/// `clamp(base − (multiplier − 1) × k, lower, upper)`.
pub fn success_probability(base: f64, multiplier: f64, k: f64, lower: f64, upper: f64) -> f64 {
    let (lower, upper) = if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    };
    (base - (multiplier - 1.0) * k)
        .clamp(lower, upper)
        .clamp(0.0, 1.0)
}

/// Roll each drop entry independently.
pub fn roll_drops<R: Rng + ?Sized>(table: &[DropEntry], rng: &mut R) -> Vec<DropLine> {
    let mut drops = Vec::new();
    for entry in table {
        let chance = entry.chance.clamp(0.0, 1.0);
        if !rng.gen_bool(chance) {
            continue;
        }
        let (lo, hi) = if entry.min <= entry.max {
            (entry.min, entry.max)
        } else {
            (entry.max, entry.min)
        };
        let amount = rng.gen_range(lo..=hi);
        if amount > 0 {
            drops.push(DropLine::new(entry.item_id.clone(), amount));
        }
    }
    drops
}

// ============================================================================
// Resolver
// ============================================================================

pub struct MinigameResolver<'a> {
    store: &'a EconomyStore,
    limiter: &'a dyn RateLimiter,
    settings: &'a MinigameSettings,
    rate_limit: RateLimitSettings,
}

impl<'a> MinigameResolver<'a> {
    pub fn new(
        store: &'a EconomyStore,
        limiter: &'a dyn RateLimiter,
        settings: &'a MinigameSettings,
        rate_limit: RateLimitSettings,
    ) -> Self {
        Self {
            store,
            limiter,
            settings,
            rate_limit,
        }
    }

    /// Resolve one attempt in `zone` with the player's `choice` against `scene`.
    ///
    /// Only the scene's kind, seed and mode are taken from the caller; methods
    /// and door/wire counts come from the canonical scene for that triple.
    ///
    /// Rejections: `invalid-zone` (zone of another kind), `invalid-action`
    /// (choice does not fit the scene), `requirement` (zone tool missing),
    /// `cooldown` (gate closed). A lost attempt is `ok` with `failed` set.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        zone: &Zone,
        scene: &Scene,
        choice: &Choice,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ActionResult, EconomyError> {
        let scene = &Scene::rebuild(scene.kind, scene.seed, scene.mode_kind());
        let kind = scene.kind;
        if zone.kind != kind {
            return Ok(ActionResult::rejected(Reason::InvalidZone));
        }
        let Some(multiplier) = choice.multiplier_in(scene) else {
            debug!("minigame: {} sent {:?} for a {:?} scene", user_id, choice, scene.mode_kind());
            return Ok(ActionResult::rejected(Reason::InvalidAction));
        };

        let record = self.store.get_or_create(user_id, now)?;
        if !record.has_item(&zone.required_item_id) {
            debug!(
                "minigame: {} lacks {} for {}",
                user_id, zone.required_item_id, zone.id
            );
            return Ok(ActionResult::rejected(Reason::Requirement));
        }

        if let Some(rejection) = self.pass_gate(user_id, kind, now, rng)? {
            return Ok(rejection);
        }

        let won = match scene.answer() {
            Some(answer) => matches!(choice, Choice::Door(i) | Choice::Wire(i) if *i == answer),
            None => {
                let tuning = self.settings.tuning(kind);
                let p = success_probability(
                    self.settings.base_success,
                    multiplier,
                    tuning.k,
                    self.settings.lower_bound,
                    self.settings.upper_bound,
                );
                rng.gen_bool(p)
            }
        };

        if !won {
            debug!("minigame: {} lost {} in {}", user_id, kind.as_str(), zone.id);
            let mut result = ActionResult::success().with_balance(record.balance);
            result.failed = true;
            return Ok(result);
        }

        let amount = zone.reward.scaled(multiplier).sample(rng);
        let drops = roll_drops(&zone.drops, rng);
        let committed = self
            .store
            .update_if(
                user_id,
                |_| true,
                |record| {
                    record.balance = record.balance.saturating_add(amount);
                    for line in &drops {
                        add_to_inventory(record, &line.item_id, line.amount);
                    }
                    record.touch(now);
                },
            )?
            .ok_or_else(|| EconomyError::NotFound(format!("economy record: {}", user_id)))?;

        info!(
            "minigame: {} won {} in {} x{:.1} amount={} drops={}",
            user_id,
            kind.as_str(),
            zone.id,
            multiplier,
            amount,
            drops.len()
        );
        let mut result = ActionResult::success()
            .with_amount(amount)
            .with_balance(committed.balance);
        result.drops = drops;
        Ok(result)
    }

    /// Consume the cooldown or a rate-limit slot. `Some` carries the rejection.
    fn pass_gate<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        kind: ActivityKind,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<ActionResult>, EconomyError> {
        let tuning = self.settings.tuning(kind);
        match (kind.cooldown_field(), tuning.cooldown()) {
            (Some(field), Some(window)) => {
                let claim = CooldownGate::new(self.store).claim(
                    user_id,
                    field,
                    window,
                    RewardRange::NONE,
                    now,
                    rng,
                )?;
                Ok(if claim.ok { None } else { Some(claim) })
            }
            _ => match self.limiter.claim(
                user_id,
                kind.as_str(),
                self.rate_limit.window(),
                self.rate_limit.max_hits,
                now,
            ) {
                RateDecision::Allowed => Ok(None),
                RateDecision::Limited { next_in_ms } => {
                    Ok(Some(ActionResult::wait(Reason::Cooldown, next_in_ms)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_is_clamped() {
        assert!((success_probability(0.8, 1.0, 0.35, 0.15, 0.95) - 0.8).abs() < 1e-9);
        assert!((success_probability(0.8, 2.0, 0.45, 0.15, 0.95) - 0.35).abs() < 1e-9);
        assert_eq!(success_probability(0.8, 10.0, 0.45, 0.15, 0.95), 0.15);
        assert_eq!(success_probability(0.99, 1.0, 0.35, 0.15, 0.95), 0.95);
    }

    #[test]
    fn higher_multipliers_are_riskier() {
        for kind in ActivityKind::ALL {
            let methods = method_table(kind);
            for pair in methods.windows(2) {
                assert!(pair[0].multiplier < pair[1].multiplier);
            }
            assert!(methods.iter().all(|m| (1.0..=MAX_MULTIPLIER).contains(&m.multiplier)));
        }
    }

    #[test]
    fn answers_are_stable_and_in_range() {
        for seed in 0..50u64 {
            let doors = Scene::rebuild(ActivityKind::Mining, seed, SceneModeKind::Doors);
            let answer = doors.answer().unwrap();
            assert!(answer < DOOR_COUNT);
            assert_eq!(doors.answer(), Some(answer));
            let wires = Scene::rebuild(ActivityKind::Mining, seed, SceneModeKind::Wires);
            assert!(wires.answer().unwrap() < WIRE_COUNT);
        }
        let methods = Scene::rebuild(ActivityKind::Fishing, 1, SceneModeKind::Methods);
        assert_eq!(methods.answer(), None);
    }

    #[test]
    fn choices_must_fit_the_scene() {
        let doors = Scene::rebuild(ActivityKind::Chopping, 3, SceneModeKind::Doors);
        assert_eq!(Choice::Door(2).multiplier_in(&doors), Some(DOOR_MULTIPLIER));
        assert_eq!(Choice::Door(3).multiplier_in(&doors), None);
        assert_eq!(Choice::Wire(0).multiplier_in(&doors), None);

        let methods = Scene::rebuild(ActivityKind::Chopping, 3, SceneModeKind::Methods);
        assert_eq!(Choice::Method("fell".into()).multiplier_in(&methods), Some(2.0));
        assert_eq!(Choice::Method("cast".into()).multiplier_in(&methods), None);
    }

    #[test]
    fn choice_parsing() {
        assert_eq!(Choice::parse("door:1"), Some(Choice::Door(1)));
        assert_eq!(Choice::parse("WIRE: 3"), Some(Choice::Wire(3)));
        assert_eq!(Choice::parse("Lure"), Some(Choice::Method("lure".into())));
        assert_eq!(Choice::parse("door:x"), None);
        assert_eq!(Choice::parse("  "), None);
    }

    #[test]
    fn mode_weights_are_followed() {
        let mut rng = StdRng::seed_from_u64(11);
        let only_wires = ModeWeights {
            methods: 0,
            doors: 0,
            wires: 1,
        };
        for _ in 0..20 {
            let scene = open_scene(ActivityKind::Fishing, only_wires, &mut rng);
            assert_eq!(scene.mode_kind(), SceneModeKind::Wires);
        }
        let none = ModeWeights {
            methods: 0,
            doors: 0,
            wires: 0,
        };
        assert_eq!(
            open_scene(ActivityKind::Fishing, none, &mut rng).mode_kind(),
            SceneModeKind::Methods
        );
    }

    #[test]
    fn default_weights_split_modes_into_their_bands() {
        let mut rng = StdRng::seed_from_u64(2_024);
        let draws = 50_000;
        let (mut methods, mut doors, mut wires) = (0u32, 0u32, 0u32);
        for _ in 0..draws {
            match open_scene(ActivityKind::Mining, ModeWeights::default(), &mut rng).mode_kind() {
                SceneModeKind::Methods => methods += 1,
                SceneModeKind::Doors => doors += 1,
                SceneModeKind::Wires => wires += 1,
            }
        }
        let share = |n: u32| n as f64 / draws as f64;
        assert!((0.50..=0.55).contains(&share(methods)), "methods {}", share(methods));
        assert!((0.23..=0.25).contains(&share(doors)), "doors {}", share(doors));
        assert!((0.20..=0.27).contains(&share(wires)), "wires {}", share(wires));
    }

    #[test]
    fn drops_respect_bounds() {
        let table = vec![
            DropEntry {
                item_id: "berries".into(),
                chance: 1.0,
                min: 2,
                max: 4,
            },
            DropEntry {
                item_id: "never".into(),
                chance: 0.0,
                min: 1,
                max: 1,
            },
        ];
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let drops = roll_drops(&table, &mut rng);
            assert_eq!(drops.len(), 1);
            assert!((2..=4).contains(&drops[0].amount));
        }
    }
}
