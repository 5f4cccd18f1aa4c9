//! # In-Memory Catalog
//!
//! A [`Catalog`] backed by plain maps, preloaded with well-known vanilla
//! identifiers. Used by the CLI and tests, and by an editing surface for
//! suggestion lists.

use super::{Catalog, EnchantmentHandle, Identifier, ItemHandle};
use crate::{MobDropsError, MobDropsResult};
use std::collections::BTreeMap;

/// Monsters offered first by an editing surface.
pub const COMMON_MONSTERS: &[&str] = &[
    "minecraft:zombie",
    "minecraft:skeleton",
    "minecraft:creeper",
    "minecraft:spider",
    "minecraft:cave_spider",
    "minecraft:enderman",
    "minecraft:evoker",
    "minecraft:vindicator",
    "minecraft:pillager",
    "minecraft:witch",
    "minecraft:ravager",
    "minecraft:vex",
    "minecraft:blaze",
    "minecraft:ghast",
    "minecraft:magma_cube",
    "minecraft:slime",
    "minecraft:wither_skeleton",
    "minecraft:piglin",
    "minecraft:piglin_brute",
    "minecraft:hoglin",
    "minecraft:zoglin",
    "minecraft:zombified_piglin",
    "minecraft:guardian",
    "minecraft:elder_guardian",
    "minecraft:shulker",
    "minecraft:phantom",
    "minecraft:drowned",
    "minecraft:husk",
    "minecraft:stray",
    "minecraft:silverfish",
    "minecraft:endermite",
    "minecraft:wither",
    "minecraft:ender_dragon",
    "minecraft:iron_golem",
    "minecraft:snow_golem",
];

/// Items offered first by an editing surface.
pub const COMMON_ITEMS: &[&str] = &[
    "minecraft:diamond",
    "minecraft:emerald",
    "minecraft:netherite_ingot",
    "minecraft:netherite_scrap",
    "minecraft:ancient_debris",
    "minecraft:iron_ingot",
    "minecraft:gold_ingot",
    "minecraft:ender_pearl",
    "minecraft:blaze_rod",
    "minecraft:nether_star",
    "minecraft:elytra",
    "minecraft:totem_of_undying",
    "minecraft:enchanted_golden_apple",
    "minecraft:golden_apple",
    "minecraft:heart_of_the_sea",
    "minecraft:trident",
    "minecraft:shulker_shell",
    "minecraft:dragon_breath",
    "minecraft:phantom_membrane",
    "minecraft:prismarine_shard",
    "minecraft:prismarine_crystals",
    "minecraft:echo_shard",
    "minecraft:netherite_upgrade_smithing_template",
    "minecraft:experience_bottle",
];

/// Enchantments known to the vanilla catalog.
pub const COMMON_ENCHANTMENTS: &[&str] = &[
    "minecraft:looting",
    "minecraft:fortune",
    "minecraft:sharpness",
    "minecraft:unbreaking",
];

/// The placeholder item hosts return for unknown lookups. Never resolvable.
const AIR: &str = "minecraft:air";

/// Map-backed catalog.
///
/// # Examples
///
/// ```
/// use mobdrops::{Catalog, Identifier, StaticCatalog};
///
/// let catalog = StaticCatalog::new().with_item("m:gem");
/// let gem = Identifier::parse("m:gem").unwrap();
/// assert!(catalog.resolve_item(&gem).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: BTreeMap<Identifier, u32>,
    enchantments: BTreeMap<Identifier, u32>,
    monsters: BTreeMap<Identifier, u32>,
}

impl StaticCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog preloaded with the common vanilla identifiers.
    pub fn vanilla() -> Self {
        let mut catalog = Self::new();
        for id in COMMON_ITEMS {
            catalog = catalog.with_item(id);
        }
        for id in COMMON_ENCHANTMENTS {
            catalog = catalog.with_enchantment(id);
        }
        for id in COMMON_MONSTERS {
            catalog = catalog.with_monster(id);
        }
        catalog
    }

    /// Registers an item. Invalid identifiers are ignored.
    pub fn with_item(mut self, raw: &str) -> Self {
        register(&mut self.items, raw);
        self
    }

    /// Registers an enchantment. Invalid identifiers are ignored.
    pub fn with_enchantment(mut self, raw: &str) -> Self {
        register(&mut self.enchantments, raw);
        self
    }

    /// Registers a monster type. Invalid identifiers are ignored.
    pub fn with_monster(mut self, raw: &str) -> Self {
        register(&mut self.monsters, raw);
        self
    }

    /// Whether the identifier names a known monster type.
    pub fn is_valid_monster(&self, raw: &str) -> bool {
        Identifier::parse(raw).map_or(false, |id| self.monsters.contains_key(&id))
    }

    /// Whether the identifier names a resolvable item.
    pub fn is_valid_item(&self, raw: &str) -> bool {
        Identifier::parse(raw).map_or(false, |id| self.resolve_item(&id).is_ok())
    }

    /// Sorted monster identifiers containing `term`, case-insensitively.
    pub fn suggest_monsters(&self, term: &str) -> Vec<String> {
        search(self.monsters.keys(), term)
    }

    /// Sorted item identifiers containing `term`, case-insensitively.
    pub fn suggest_items(&self, term: &str) -> Vec<String> {
        search(self.items.keys(), term)
    }
}

fn register(map: &mut BTreeMap<Identifier, u32>, raw: &str) {
    if let Ok(id) = Identifier::parse(raw) {
        let next = map.len() as u32;
        map.entry(id).or_insert(next);
    }
}

fn search<'a>(ids: impl Iterator<Item = &'a Identifier>, term: &str) -> Vec<String> {
    let term = term.trim().to_lowercase();
    ids.map(Identifier::to_string)
        .filter(|id| term.is_empty() || id.to_lowercase().contains(&term))
        .collect()
}

impl Catalog for StaticCatalog {
    fn resolve_item(&self, id: &Identifier) -> MobDropsResult<ItemHandle> {
        if id.to_string() == AIR {
            return Err(MobDropsError::UnknownItem(id.to_string()));
        }
        self.items
            .get(id)
            .map(|&raw_id| ItemHandle {
                id: id.clone(),
                raw_id,
            })
            .ok_or_else(|| MobDropsError::UnknownItem(id.to_string()))
    }

    fn resolve_enchantment(&self, id: &Identifier) -> MobDropsResult<EnchantmentHandle> {
        self.enchantments
            .get(id)
            .map(|&raw_id| EnchantmentHandle {
                id: id.clone(),
                raw_id,
            })
            .ok_or_else(|| MobDropsError::UnknownEnchantment(id.to_string()))
    }
}
