//! # Config Module
//!
//! The drop configuration document, its validation/repair pass, persistence
//! and the editing operations an editing surface or command uses.
//!
//! The document shape is fixed:
//!
//! ```json
//! { "mobConfigs": [ { "mobId": "minecraft:evoker", "enabled": true,
//!     "itemDrops": [ { "itemId": "minecraft:diamond", "enabled": true,
//!         "minCount": 1, "maxCount": 3, "dropChance": 0.5, "applyLooting": true } ] } ] }
//! ```
//!
//! Unknown fields are ignored and missing fields take their defaults.

pub mod editing;
pub mod store;

pub use store::*;

use crate::catalog::normalize_id;
use crate::limits::{MAX_DROP_RULES, MAX_MONSTER_RULES};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The whole drop configuration: an ordered list of monster rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    pub mob_configs: Vec<MonsterRule>,
}

/// Custom drops for one monster type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonsterRule {
    /// Namespaced monster type, e.g. `minecraft:evoker`
    pub mob_id: String,
    pub enabled: bool,
    pub item_drops: Vec<DropRule>,
}

/// One item a monster may drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DropRule {
    /// Namespaced item, e.g. `minecraft:diamond`
    pub item_id: String,
    pub enabled: bool,
    /// Minimum dropped count, at least 1 after validation
    pub min_count: i32,
    /// Maximum dropped count, at least `min_count` after validation
    pub max_count: i32,
    /// Probability in `[0, 1]`
    pub drop_chance: f32,
    /// Whether the looting enchantment can add extra items
    pub apply_looting: bool,
}

impl Default for MonsterRule {
    fn default() -> Self {
        Self {
            mob_id: String::new(),
            enabled: true,
            item_drops: Vec::new(),
        }
    }
}

impl MonsterRule {
    /// Creates an enabled rule with no drops.
    pub fn new(mob_id: impl Into<String>) -> Self {
        Self {
            mob_id: mob_id.into(),
            ..Self::default()
        }
    }

    /// Appends a drop rule, builder style.
    pub fn with_drop(mut self, drop: DropRule) -> Self {
        self.item_drops.push(drop);
        self
    }
}

impl Default for DropRule {
    fn default() -> Self {
        Self {
            item_id: String::new(),
            enabled: true,
            min_count: 1,
            max_count: 1,
            drop_chance: 1.0,
            apply_looting: true,
        }
    }
}

impl DropRule {
    /// Creates an enabled drop of exactly one item, always dropped, looting on.
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Self::default()
        }
    }

    /// Sets the count range.
    pub fn with_count(mut self, min_count: i32, max_count: i32) -> Self {
        self.min_count = min_count;
        self.max_count = max_count;
        self
    }

    /// Sets the drop chance.
    pub fn with_chance(mut self, drop_chance: f32) -> Self {
        self.drop_chance = drop_chance;
        self
    }

    /// Sets whether looting applies.
    pub fn with_looting(mut self, apply_looting: bool) -> Self {
        self.apply_looting = apply_looting;
        self
    }

    /// Drop chance as a whole percentage, for log lines and listings.
    pub fn chance_percent(&self) -> i32 {
        (self.drop_chance * 100.0).round() as i32
    }
}

/// A single repair made by [`Configuration::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Repair {
    /// A later rule for an already configured monster was dropped
    DuplicateMonster { mob_id: String },
    /// Monster rules beyond the cap were dropped
    TooManyMonsters { found: usize },
    /// Drop rules beyond the cap were dropped
    TooManyDrops { mob_id: String, found: usize },
    /// Drop chance was outside `[0, 1]`
    DropChanceClamped { item_id: String, from: f32, to: f32 },
    /// Minimum count was below 1
    MinCountRaised { item_id: String, from: i32 },
    /// Maximum count was below the minimum
    MaxCountRaised { item_id: String, from: i32, to: i32 },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::DuplicateMonster { mob_id } => {
                write!(f, "Duplicate rule for mob {}, keeping the first", mob_id)
            }
            Repair::TooManyMonsters { found } => {
                write!(f, "Too many mobs ({}), limiting to {}", found, MAX_MONSTER_RULES)
            }
            Repair::TooManyDrops { mob_id, found } => write!(
                f,
                "Mob {} has too many items ({}), limiting to {}",
                mob_id, found, MAX_DROP_RULES
            ),
            Repair::DropChanceClamped { item_id, from, to } => write!(
                f,
                "Invalid drop chance {} for item {}, setting to {}",
                from, item_id, to
            ),
            Repair::MinCountRaised { item_id, from } => {
                write!(f, "Invalid minCount {} for item {}, setting to 1", from, item_id)
            }
            Repair::MaxCountRaised { item_id, from, to } => write!(
                f,
                "maxCount {} less than minCount {} for item {}, fixing",
                from, to, item_id
            ),
        }
    }
}

/// Everything [`Configuration::validate`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub repairs: Vec<Repair>,
}

impl ValidationReport {
    /// True when the configuration was already valid.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }

    fn record(&mut self, repair: Repair) {
        warn!("{}", repair);
        self.repairs.push(repair);
    }
}

impl Configuration {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of monster rules.
    pub fn len(&self) -> usize {
        self.mob_configs.len()
    }

    /// True when there are no monster rules.
    pub fn is_empty(&self) -> bool {
        self.mob_configs.is_empty()
    }

    /// Repairs the configuration in place so every invariant holds.
    ///
    /// Duplicate monsters are removed before the cap is applied, so the cap
    /// keeps the first distinct monsters in document order.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let mut seen = HashSet::new();
        let rules = std::mem::take(&mut self.mob_configs);
        for rule in rules {
            let key = normalize_id(&rule.mob_id).unwrap_or_else(|| rule.mob_id.clone());
            if seen.insert(key) {
                self.mob_configs.push(rule);
            } else {
                report.record(Repair::DuplicateMonster {
                    mob_id: rule.mob_id,
                });
            }
        }

        if self.mob_configs.len() > MAX_MONSTER_RULES {
            report.record(Repair::TooManyMonsters {
                found: self.mob_configs.len(),
            });
            self.mob_configs.truncate(MAX_MONSTER_RULES);
        }

        for rule in &mut self.mob_configs {
            if rule.item_drops.len() > MAX_DROP_RULES {
                report.record(Repair::TooManyDrops {
                    mob_id: rule.mob_id.clone(),
                    found: rule.item_drops.len(),
                });
                rule.item_drops.truncate(MAX_DROP_RULES);
            }

            for drop in &mut rule.item_drops {
                drop.repair(&mut report);
            }
        }

        report
    }
}

impl DropRule {
    fn repair(&mut self, report: &mut ValidationReport) {
        let clamped = if self.drop_chance.is_nan() {
            1.0
        } else {
            self.drop_chance.clamp(0.0, 1.0)
        };
        // NaN never compares equal, so it is always reported.
        if clamped != self.drop_chance {
            report.record(Repair::DropChanceClamped {
                item_id: self.item_id.clone(),
                from: self.drop_chance,
                to: clamped,
            });
            self.drop_chance = clamped;
        }

        if self.min_count < 1 {
            report.record(Repair::MinCountRaised {
                item_id: self.item_id.clone(),
                from: self.min_count,
            });
            self.min_count = 1;
        }

        if self.max_count < self.min_count {
            report.record(Repair::MaxCountRaised {
                item_id: self.item_id.clone(),
                from: self.max_count,
                to: self.min_count,
            });
            self.max_count = self.min_count;
        }
    }
}
