//! # Drop Evaluation
//!
//! Evaluates drop pools against a kill, the way the host does when a monster
//! dies. Used by the CLI `roll` preview and to check pool semantics in tests.

use super::{BonusCount, CountSelector, DropPoolSpec, LootCondition, LootTable};
use crate::catalog::Identifier;
use rand::Rng;
use serde::Serialize;

/// What the host knows about a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillContext {
    /// Whether the death is attributable to a player
    pub killed_by_player: bool,
    /// Looting level on the killing weapon, 0 when none
    pub looting_level: u32,
}

impl KillContext {
    /// A player kill with the given looting level.
    pub fn player(looting_level: u32) -> Self {
        Self {
            killed_by_player: true,
            looting_level,
        }
    }

    /// A kill with no player involved.
    pub fn environment() -> Self {
        Self {
            killed_by_player: false,
            looting_level: 0,
        }
    }
}

/// Items produced by one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDrop {
    #[serde(serialize_with = "serialize_id")]
    pub item: Identifier,
    pub count: u32,
}

fn serialize_id<S: serde::Serializer>(id: &Identifier, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(id)
}

impl LootCondition {
    /// Checks the condition against a kill.
    pub fn test<R: Rng>(&self, context: &KillContext, rng: &mut R) -> bool {
        match self {
            LootCondition::KilledByPlayer => context.killed_by_player,
            LootCondition::RandomChance(p) => rng.gen::<f32>() < *p,
        }
    }
}

impl CountSelector {
    /// Picks a count.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> u32 {
        match *self {
            CountSelector::Fixed(n) => n,
            CountSelector::Uniform { min, max } => rng.gen_range(min..=max.max(min)),
        }
    }
}

impl BonusCount {
    /// Extra items for the kill.
    pub fn sample<R: Rng>(&self, context: &KillContext, rng: &mut R) -> u32 {
        match self {
            BonusCount::UniformBonus { multiplier, .. } => {
                let ceiling = context.looting_level.saturating_mul(*multiplier);
                if ceiling == 0 {
                    0
                } else {
                    rng.gen_range(0..=ceiling)
                }
            }
        }
    }
}

impl DropPoolSpec {
    /// Rolls the pool once per roll; `None` when nothing dropped.
    ///
    /// Conditions are evaluated in order and short-circuit, so the chance is
    /// only drawn for player kills.
    pub fn roll<R: Rng>(&self, context: &KillContext, rng: &mut R) -> Option<ItemDrop> {
        let mut total = 0u32;
        for _ in 0..self.rolls {
            if !self.conditions.iter().all(|c| c.test(context, rng)) {
                continue;
            }
            let mut count = self.count.sample(rng);
            if let Some(bonus) = &self.bonus {
                count = count.saturating_add(bonus.sample(context, rng));
            }
            total = total.saturating_add(count);
        }

        (total > 0).then(|| ItemDrop {
            item: self.item.id.clone(),
            count: total,
        })
    }
}

impl LootTable {
    /// Rolls every appended pool.
    pub fn roll<R: Rng>(&self, context: &KillContext, rng: &mut R) -> Vec<ItemDrop> {
        self.pools
            .iter()
            .filter_map(|pool| pool.roll(context, rng))
            .collect()
    }
}
