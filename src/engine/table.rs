//! # Loot Tables
//!
//! The appendable side of a host loot-table builder.

use super::DropPoolSpec;

/// Anything drop pools can be appended to.
///
/// Hosts implement this over their own loot-table builder. Appending never
/// replaces pools the table already had.
pub trait PoolSink {
    /// Appends one pool after the existing ones.
    fn append_pool(&mut self, pool: DropPoolSpec);
}

impl PoolSink for Vec<DropPoolSpec> {
    fn append_pool(&mut self, pool: DropPoolSpec) {
        self.push(pool);
    }
}

/// Minimal in-memory loot table.
///
/// The host's own pools are opaque here and only counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LootTable {
    /// Number of pools the table had before modification
    pub base_pools: usize,
    /// Pools appended by the rule engine, in order
    pub pools: Vec<DropPoolSpec>,
}

impl LootTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table that already holds `base_pools` host pools.
    pub fn with_base_pools(base_pools: usize) -> Self {
        Self {
            base_pools,
            pools: Vec::new(),
        }
    }

    /// Total pools, host and appended.
    pub fn pool_count(&self) -> usize {
        self.base_pools + self.pools.len()
    }
}

impl PoolSink for LootTable {
    fn append_pool(&mut self, pool: DropPoolSpec) {
        self.pools.push(pool);
    }
}
