//! # Editing Operations
//!
//! Mutations an editing surface or a command applies to a working copy before
//! saving it. These enforce the same caps the validator does, and reject a
//! second rule for an already configured monster.

use super::{Configuration, DropRule, MonsterRule};
use crate::catalog::normalize_id;
use crate::limits::{MAX_DROP_RULES, MAX_MONSTER_RULES};
use crate::{MobDropsError, MobDropsResult};
use log::{info, warn};

impl Configuration {
    /// Adds an enabled rule for `mob_id` with no drops.
    pub fn add_monster(&mut self, mob_id: &str) -> MobDropsResult<&mut MonsterRule> {
        if self.mob_configs.len() >= MAX_MONSTER_RULES {
            warn!("Cannot add more mobs, maximum is {}", MAX_MONSTER_RULES);
            return Err(MobDropsError::LimitReached {
                what: "mobs",
                max: MAX_MONSTER_RULES,
            });
        }

        let mob_id = normalize_id(mob_id)
            .ok_or_else(|| MobDropsError::InvalidIdentifier(mob_id.to_string()))?;

        if self.find_monster(&mob_id).is_some() {
            warn!("Mob {} already exists in configuration", mob_id);
            return Err(MobDropsError::DuplicateMonster(mob_id));
        }

        info!("Added new mob to configuration: {}", mob_id);
        self.mob_configs.push(MonsterRule::new(mob_id));
        let last = self.mob_configs.len() - 1;
        Ok(&mut self.mob_configs[last])
    }

    /// Removes and returns the monster rule at `index`.
    pub fn remove_monster(&mut self, index: usize) -> MobDropsResult<MonsterRule> {
        if index >= self.mob_configs.len() {
            warn!("Invalid mob index: {}", index);
            return Err(MobDropsError::IndexOutOfRange { what: "mob", index });
        }

        let removed = self.mob_configs.remove(index);
        info!("Removed mob from configuration: {}", removed.mob_id);
        Ok(removed)
    }

    /// Adds an enabled drop of `item_id` (count 1, always dropped, looting on).
    pub fn add_drop(&mut self, mob_index: usize, item_id: &str) -> MobDropsResult<&mut DropRule> {
        let rule = self.monster_mut(mob_index)?;

        if rule.item_drops.len() >= MAX_DROP_RULES {
            warn!(
                "Cannot add more items to {}, maximum is {}",
                rule.mob_id, MAX_DROP_RULES
            );
            return Err(MobDropsError::LimitReached {
                what: "items",
                max: MAX_DROP_RULES,
            });
        }

        let item_id = normalize_id(item_id)
            .ok_or_else(|| MobDropsError::InvalidIdentifier(item_id.to_string()))?;

        info!("Added item {} to mob {}", item_id, rule.mob_id);
        rule.item_drops.push(DropRule::new(item_id));
        let last = rule.item_drops.len() - 1;
        Ok(&mut rule.item_drops[last])
    }

    /// Removes and returns a drop rule.
    pub fn remove_drop(&mut self, mob_index: usize, drop_index: usize) -> MobDropsResult<DropRule> {
        let rule = self.monster_mut(mob_index)?;

        if drop_index >= rule.item_drops.len() {
            warn!("Invalid item index: {}", drop_index);
            return Err(MobDropsError::IndexOutOfRange {
                what: "item",
                index: drop_index,
            });
        }

        let removed = rule.item_drops.remove(drop_index);
        info!("Removed item {} from mob {}", removed.item_id, rule.mob_id);
        Ok(removed)
    }

    /// Removes every monster rule.
    pub fn reset(&mut self) {
        self.mob_configs.clear();
        info!("Configuration reset to empty");
    }

    /// Finds the first rule whose normalized identifier matches.
    pub fn find_monster(&self, mob_id: &str) -> Option<(usize, &MonsterRule)> {
        let wanted = normalize_id(mob_id)?;
        self.mob_configs
            .iter()
            .enumerate()
            .find(|(_, rule)| normalize_id(&rule.mob_id).as_deref() == Some(wanted.as_str()))
    }

    fn monster_mut(&mut self, index: usize) -> MobDropsResult<&mut MonsterRule> {
        match self.mob_configs.get_mut(index) {
            Some(rule) => Ok(rule),
            None => {
                warn!("Invalid mob index: {}", index);
                Err(MobDropsError::IndexOutOfRange { what: "mob", index })
            }
        }
    }
}
