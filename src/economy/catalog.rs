//! Read-only item and zone catalogs.
//!
//! The engine only consumes these through the [`ItemCatalog`] and
//! [`ZoneCatalog`] traits. [`StaticCatalog`] carries the built-in content.

use serde::{Deserialize, Serialize};

use super::types::{ActivityKind, Rarity, RewardRange};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Tool,
    Material,
    Egg,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub price: i64,
    pub kind: ItemKind,
}

/// One independent roll in a drop table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropEntry {
    pub item_id: String,
    /// Probability in `0.0..=1.0` that this entry drops at all.
    pub chance: f64,
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub kind: ActivityKind,
    pub required_item_id: String,
    pub reward: RewardRange,
    pub aliases: Vec<String>,
    pub emoji: String,
    pub drops: Vec<DropEntry>,
}

impl Zone {
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.id.eq_ignore_ascii_case(query)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(query))
    }
}

/// Destination for a pet exploration trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplorationZone {
    pub id: String,
    pub name: String,
    pub required_item_id: Option<String>,
    pub min_rank: u32,
    pub duration_minutes: i64,
    pub reward: RewardRange,
}

pub trait ItemCatalog: Send + Sync {
    /// Item metadata. Never fails: unknown ids get a synthesized entry.
    fn get_item_by_id(&self, item_id: &str, locale: &str) -> ItemInfo;
}

pub trait ZoneCatalog: Send + Sync {
    fn zones_for_kind(&self, kind: ActivityKind) -> Vec<Zone>;

    fn exploration_zones(&self) -> Vec<ExplorationZone>;

    /// Resolve a zone of `kind` by id or alias (case-insensitive).
    fn resolve_zone(&self, kind: ActivityKind, query: &str) -> Option<Zone> {
        self.zones_for_kind(kind)
            .into_iter()
            .find(|zone| zone.matches(query))
    }

    fn resolve_exploration_zone(&self, query: &str) -> Option<ExplorationZone> {
        let query = query.trim();
        self.exploration_zones()
            .into_iter()
            .find(|zone| zone.id.eq_ignore_ascii_case(query))
    }
}

/// Title-case an item id: `iron_ore` → `Iron Ore`.
pub fn fallback_item_name(item_id: &str) -> String {
    item_id
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Built-in English catalog of items, activity zones and exploration zones.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    items: Vec<ItemInfo>,
    zones: Vec<Zone>,
    exploration: Vec<ExplorationZone>,
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self {
            items: seed_items(),
            zones: seed_zones(),
            exploration: seed_exploration_zones(),
        }
    }
}

impl StaticCatalog {
    pub fn new(items: Vec<ItemInfo>, zones: Vec<Zone>, exploration: Vec<ExplorationZone>) -> Self {
        Self {
            items,
            zones,
            exploration,
        }
    }

    pub fn items(&self) -> &[ItemInfo] {
        &self.items
    }

    /// Item id of the egg for a rarity tier.
    pub fn egg_item_id(rarity: Rarity) -> String {
        format!("egg_{}", rarity.label())
    }
}

impl ItemCatalog for StaticCatalog {
    fn get_item_by_id(&self, item_id: &str, _locale: &str) -> ItemInfo {
        if let Some(item) = self.items.iter().find(|item| item.id == item_id) {
            return item.clone();
        }
        ItemInfo {
            id: item_id.to_string(),
            name: fallback_item_name(item_id),
            description: String::new(),
            rarity: Rarity::Common,
            price: 0,
            kind: ItemKind::Material,
        }
    }
}

impl ZoneCatalog for StaticCatalog {
    fn zones_for_kind(&self, kind: ActivityKind) -> Vec<Zone> {
        self.zones
            .iter()
            .filter(|zone| zone.kind == kind)
            .cloned()
            .collect()
    }

    fn exploration_zones(&self) -> Vec<ExplorationZone> {
        self.exploration.clone()
    }
}

// ============================================================================
// Seed content
// ============================================================================

fn item(id: &str, name: &str, description: &str, rarity: Rarity, price: i64, kind: ItemKind) -> ItemInfo {
    ItemInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        rarity,
        price,
        kind,
    }
}

fn seed_items() -> Vec<ItemInfo> {
    use ItemKind::{Material, Tool};
    use Rarity::*;

    let mut items = vec![
        item("fishing_rod", "Fishing Rod", "A bamboo rod with a simple reel.", Common, 150, Tool),
        item("sturdy_rod", "Sturdy Rod", "Holds against river currents.", Uncommon, 600, Tool),
        item("pickaxe", "Pickaxe", "Chips stone, slowly.", Common, 200, Tool),
        item("steel_pickaxe", "Steel Pickaxe", "Bites through deep rock.", Rare, 900, Tool),
        item("hatchet", "Hatchet", "Small axe for small trees.", Common, 150, Tool),
        item("lumber_saw", "Lumber Saw", "Two-handed saw for old timber.", Uncommon, 700, Tool),
        item("lantern", "Lantern", "Keeps the dark at arm's length.", Common, 120, Tool),
        item("climbing_gear", "Climbing Gear", "Rope, hooks and nerve.", Rare, 1000, Tool),
        item("forage_basket", "Forage Basket", "Woven for berries and caps.", Common, 80, Tool),
        item("minnow", "Minnow", "Barely a snack.", Common, 5, Material),
        item("trout", "Trout", "A respectable catch.", Uncommon, 15, Material),
        item("golden_koi", "Golden Koi", "Said to bring luck.", Epic, 120, Material),
        item("iron_ore", "Iron Ore", "Rust-red and heavy.", Common, 8, Material),
        item("gold_ore", "Gold Ore", "Glints in lamplight.", Rare, 40, Material),
        item("crystal_shard", "Crystal Shard", "Hums faintly.", Epic, 150, Material),
        item("oak_log", "Oak Log", "Solid building timber.", Common, 6, Material),
        item("maple_log", "Maple Log", "Sweet-smelling wood.", Uncommon, 14, Material),
        item("ancient_bark", "Ancient Bark", "Older than the town.", Rare, 50, Material),
        item("relic_fragment", "Relic Fragment", "Part of something bigger.", Rare, 60, Material),
        item("map_scrap", "Map Scrap", "Marks a place you have not been.", Uncommon, 20, Material),
        item("berries", "Berries", "Tart and plentiful.", Common, 3, Material),
        item("mushroom", "Mushroom", "Probably edible.", Uncommon, 9, Material),
    ];

    let egg_prices = [100, 250, 600, 1500, 4000, 9000, 20000];
    for (rarity, price) in Rarity::ALL.iter().zip(egg_prices) {
        items.push(item(
            &StaticCatalog::egg_item_id(*rarity),
            &format!("{} Egg", fallback_item_name(rarity.label())),
            "Warm to the touch. Something moves inside.",
            *rarity,
            price,
            ItemKind::Egg,
        ));
    }
    items
}

fn drop(item_id: &str, chance: f64, min: u32, max: u32) -> DropEntry {
    DropEntry {
        item_id: item_id.to_string(),
        chance,
        min,
        max,
    }
}

#[allow(clippy::too_many_arguments)]
fn zone(
    id: &str,
    name: &str,
    kind: ActivityKind,
    required: &str,
    reward: (i64, i64),
    aliases: &[&str],
    emoji: &str,
    drops: Vec<DropEntry>,
) -> Zone {
    Zone {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        required_item_id: required.to_string(),
        reward: RewardRange::new(reward.0, reward.1),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        emoji: emoji.to_string(),
        drops,
    }
}

fn seed_zones() -> Vec<Zone> {
    use ActivityKind::*;
    vec![
        zone("pond", "Lily Pond", Fishing, "fishing_rod", (20, 45), &["lake", "p"], "🎣", vec![
            drop("minnow", 0.7, 1, 3),
            drop("trout", 0.25, 1, 1),
            drop("egg_common", 0.03, 1, 1),
        ]),
        zone("river", "Rushing River", Fishing, "sturdy_rod", (40, 80), &["stream"], "🌊", vec![
            drop("trout", 0.6, 1, 2),
            drop("golden_koi", 0.04, 1, 1),
            drop("egg_uncommon", 0.03, 1, 1),
        ]),
        zone("quarry", "Old Quarry", Mining, "pickaxe", (25, 55), &["pit"], "⛏️", vec![
            drop("iron_ore", 0.75, 1, 4),
            drop("gold_ore", 0.12, 1, 1),
            drop("egg_common", 0.02, 1, 1),
        ]),
        zone("deep_mine", "Deep Mine", Mining, "steel_pickaxe", (50, 110), &["deep", "mine"], "💎", vec![
            drop("gold_ore", 0.4, 1, 2),
            drop("crystal_shard", 0.06, 1, 1),
            drop("egg_rare", 0.02, 1, 1),
        ]),
        zone("grove", "Birch Grove", Chopping, "hatchet", (20, 40), &["forest"], "🌳", vec![
            drop("oak_log", 0.8, 1, 3),
            drop("maple_log", 0.2, 1, 1),
        ]),
        zone("old_woods", "Old Woods", Chopping, "lumber_saw", (45, 90), &["woods"], "🪵", vec![
            drop("maple_log", 0.6, 1, 2),
            drop("ancient_bark", 0.08, 1, 1),
            drop("egg_uncommon", 0.02, 1, 1),
        ]),
        zone("ruins", "Sunken Ruins", Exploring, "lantern", (30, 70), &["ruin"], "🏛️", vec![
            drop("map_scrap", 0.35, 1, 1),
            drop("relic_fragment", 0.1, 1, 1),
            drop("egg_rare", 0.02, 1, 1),
        ]),
        zone("cliffs", "Windy Cliffs", Exploring, "climbing_gear", (60, 130), &["cliff"], "🧗", vec![
            drop("relic_fragment", 0.25, 1, 1),
            drop("egg_epic", 0.015, 1, 1),
            drop("egg_legendary", 0.004, 1, 1),
        ]),
        zone("meadow", "Meadow", Foraging, "forage_basket", (5, 15), &["field"], "🌼", vec![
            drop("berries", 0.8, 1, 5),
            drop("mushroom", 0.3, 1, 2),
        ]),
    ]
}

fn seed_exploration_zones() -> Vec<ExplorationZone> {
    let trip = |id: &str, name: &str, required: Option<&str>, min_rank: u32, minutes: i64, reward: (i64, i64)| {
        ExplorationZone {
            id: id.to_string(),
            name: name.to_string(),
            required_item_id: required.map(str::to_string),
            min_rank,
            duration_minutes: minutes,
            reward: RewardRange::new(reward.0, reward.1),
        }
    };
    vec![
        trip("backyard", "Backyard", None, 1, 20, (10, 25)),
        trip("forest_trail", "Forest Trail", None, 2, 45, (25, 50)),
        trip("crystal_cave", "Crystal Cave", Some("lantern"), 3, 90, (60, 120)),
        trip("sky_peaks", "Sky Peaks", Some("climbing_gear"), 5, 180, (120, 240)),
    ]
}
