//! # Engine Module
//!
//! The rule engine: turns the configuration into drop pools for one monster
//! loot-table build.
//!
//! The host calls in once per loot-table construction with the table key and
//! something to append pools to. Everything else (which monster, which drops,
//! which conditions) is decided here from the configuration snapshot.

pub mod roll;
pub mod table;

pub use roll::*;
pub use table::*;

use crate::catalog::{Catalog, EnchantmentHandle, Identifier, ItemHandle, LOOTING_ENCHANTMENT};
use crate::config::{Configuration, DropRule, MonsterRule};
use log::{debug, error, warn};
use serde::Serialize;

/// How many items a pool yields before bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CountSelector {
    /// Always exactly this many
    Fixed(u32),
    /// Uniformly chosen in `[min, max]`
    Uniform { min: u32, max: u32 },
}

impl CountSelector {
    /// Fixed when both bounds agree, uniform otherwise.
    pub fn from_range(min: u32, max: u32) -> Self {
        if min == max {
            CountSelector::Fixed(min)
        } else {
            CountSelector::Uniform { min, max }
        }
    }
}

/// A condition that must hold for a pool to drop anything.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LootCondition {
    /// The kill must be attributable to a player
    KilledByPlayer,
    /// Passes with this probability
    RandomChance(f32),
}

/// Extra items granted by an enchantment on the killing weapon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BonusCount {
    /// Adds a uniform `[0, level * multiplier]` items
    UniformBonus {
        #[serde(serialize_with = "serialize_enchantment")]
        enchantment: EnchantmentHandle,
        multiplier: u32,
    },
}

/// One pool appended to a monster's loot table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropPoolSpec {
    #[serde(serialize_with = "serialize_item")]
    pub item: ItemHandle,
    pub rolls: u32,
    pub count: CountSelector,
    pub conditions: Vec<LootCondition>,
    pub bonus: Option<BonusCount>,
}

fn serialize_item<S: serde::Serializer>(item: &ItemHandle, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&item.id)
}

fn serialize_enchantment<S: serde::Serializer>(
    enchantment: &EnchantmentHandle,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(&enchantment.id)
}

impl DropPoolSpec {
    /// The random-chance probability, if the pool has one.
    pub fn chance(&self) -> Option<f32> {
        self.conditions.iter().find_map(|condition| match condition {
            LootCondition::RandomChance(p) => Some(*p),
            LootCondition::KilledByPlayer => None,
        })
    }
}

/// Stateless rule engine.
///
/// # Examples
///
/// ```
/// use mobdrops::{Configuration, CountSelector, DropRule, MonsterRule, RuleEngine, StaticCatalog};
///
/// let config = Configuration {
///     mob_configs: vec![MonsterRule::new("m:zombie")
///         .with_drop(DropRule::new("m:gem").with_count(2, 2).with_looting(false))],
/// };
/// let catalog = StaticCatalog::new().with_item("m:gem");
///
/// let pools = RuleEngine::new().drop_pools("m:zombie", &config, &catalog);
/// assert_eq!(pools.len(), 1);
/// assert_eq!(pools[0].count, CountSelector::Fixed(2));
/// ```
#[derive(Debug, Clone)]
pub struct RuleEngine {
    bonus_enchantment: String,
    bonus_multiplier: u32,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// Creates an engine granting the looting bonus with multiplier 1.
    pub fn new() -> Self {
        Self {
            bonus_enchantment: LOOTING_ENCHANTMENT.to_string(),
            bonus_multiplier: 1,
        }
    }

    /// Drop pools to append for `monster`, in configuration order.
    ///
    /// Only the first enabled rule matching the normalized identifier is used.
    /// Unknown items are logged and skipped; they never stop sibling drops.
    pub fn drop_pools(
        &self,
        monster: &str,
        config: &Configuration,
        catalog: &dyn Catalog,
    ) -> Vec<DropPoolSpec> {
        let monster = match Identifier::parse(monster) {
            Ok(id) => id,
            Err(e) => {
                error!("Invalid monster ID in loot event: {}", e);
                return Vec::new();
            }
        };

        match self.matching_rule(&monster, config) {
            Some(rule) => self.pools_for_rule(rule, catalog),
            None => Vec::new(),
        }
    }

    /// Host entry point: appends the pools for the entity whose loot table is
    /// `table_key` (`domain:entities/name`). Returns how many were appended.
    pub fn modify_loot_table(
        &self,
        table_key: &Identifier,
        sink: &mut dyn PoolSink,
        config: &Configuration,
        catalog: &dyn Catalog,
    ) -> usize {
        let Some(monster) = table_key.entity_from_loot_table() else {
            return 0;
        };

        let Some(rule) = self.matching_rule(&monster, config) else {
            return 0;
        };

        debug!("Modifying loot table for: {}", rule.mob_id);
        let pools = self.pools_for_rule(rule, catalog);
        let appended = pools.len();
        for pool in pools {
            sink.append_pool(pool);
        }
        appended
    }

    fn matching_rule<'a>(
        &self,
        monster: &Identifier,
        config: &'a Configuration,
    ) -> Option<&'a MonsterRule> {
        config
            .mob_configs
            .iter()
            .filter(|rule| rule.enabled)
            .find(|rule| match Identifier::parse(&rule.mob_id) {
                Ok(id) => &id == monster,
                Err(_) => {
                    error!("Invalid mob ID: {}", rule.mob_id);
                    false
                }
            })
    }

    fn pools_for_rule(&self, rule: &MonsterRule, catalog: &dyn Catalog) -> Vec<DropPoolSpec> {
        let bonus = self.resolve_bonus(rule, catalog);

        rule.item_drops
            .iter()
            .filter(|drop| drop.enabled)
            .filter_map(|drop| self.pool_for_drop(drop, bonus.as_ref(), catalog))
            .collect()
    }

    /// Resolves the bonus enchantment once per pass. Failure only disables the bonus.
    fn resolve_bonus(&self, rule: &MonsterRule, catalog: &dyn Catalog) -> Option<EnchantmentHandle> {
        let resolved = Identifier::parse(&self.bonus_enchantment)
            .and_then(|id| catalog.resolve_enchantment(&id));

        match resolved {
            Ok(handle) => {
                debug!("Resolved {} for mob: {}", handle.id, rule.mob_id);
                Some(handle)
            }
            Err(e) => {
                warn!(
                    "Could not get {} ({}); it will not be applied to drops for mob: {}",
                    self.bonus_enchantment, e, rule.mob_id
                );
                None
            }
        }
    }

    fn pool_for_drop(
        &self,
        drop: &DropRule,
        bonus: Option<&EnchantmentHandle>,
        catalog: &dyn Catalog,
    ) -> Option<DropPoolSpec> {
        let item = match Identifier::parse(&drop.item_id).and_then(|id| catalog.resolve_item(&id)) {
            Ok(item) => item,
            Err(e) => {
                error!("Skipping drop {}: {}", drop.item_id, e);
                return None;
            }
        };

        let min = drop.min_count.max(1) as u32;
        let max = (drop.max_count.max(drop.min_count).max(1)) as u32;

        let mut conditions = vec![LootCondition::KilledByPlayer];
        if drop.drop_chance < 1.0 {
            conditions.push(LootCondition::RandomChance(drop.drop_chance));
        }

        let bonus = match bonus {
            Some(enchantment) if drop.apply_looting => Some(BonusCount::UniformBonus {
                enchantment: enchantment.clone(),
                multiplier: self.bonus_multiplier,
            }),
            _ => None,
        };

        debug!(
            "  Added drop: {} x{}-{} ({}% chance) with looting: {}",
            drop.item_id,
            min,
            max,
            drop.chance_percent(),
            bonus.is_some()
        );

        Some(DropPoolSpec {
            item,
            rolls: 1,
            count: CountSelector::from_range(min, max),
            conditions,
            bonus,
        })
    }
}
