//! # Catalog Module
//!
//! Namespaced identifiers and the item/enchantment resolver the rule engine
//! looks things up in.
//!
//! The host owns the real registries. The engine only ever sees them through
//! the [`Catalog`] trait, so a host adapter or the in-memory [`StaticCatalog`]
//! can stand in.

pub mod vanilla;

pub use vanilla::*;

use crate::{MobDropsError, MobDropsResult};
use std::fmt;
use std::str::FromStr;

/// Namespace used when an identifier is written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Enchantment that grants extra drops when `apply_looting` is set.
pub const LOOTING_ENCHANTMENT: &str = "minecraft:looting";

/// A namespaced `domain:name` identifier.
///
/// # Examples
///
/// ```
/// use mobdrops::Identifier;
///
/// let id = Identifier::parse("zombie").unwrap();
/// assert_eq!(id.namespace(), "minecraft");
/// assert_eq!(id.to_string(), "minecraft:zombie");
///
/// assert!(Identifier::parse("not valid").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: String,
    path: String,
}

impl Identifier {
    /// Creates an identifier from already validated parts.
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> MobDropsResult<Self> {
        let namespace = namespace.into();
        let path = path.into();

        if namespace.is_empty()
            || !namespace.chars().all(is_namespace_char)
            || path.is_empty()
            || !path.chars().all(is_path_char)
        {
            return Err(MobDropsError::InvalidIdentifier(format!(
                "{}:{}",
                namespace, path
            )));
        }

        Ok(Self { namespace, path })
    }

    /// Parses `domain:name`, defaulting the domain when it is absent or empty.
    pub fn parse(raw: &str) -> MobDropsResult<Self> {
        let raw = raw.trim();
        let (namespace, path) = match raw.split_once(':') {
            Some((namespace, path)) if namespace.is_empty() => (DEFAULT_NAMESPACE, path),
            Some((namespace, path)) => (namespace, path),
            None => (DEFAULT_NAMESPACE, raw),
        };

        Self::new(namespace, path).map_err(|_| MobDropsError::InvalidIdentifier(raw.to_string()))
    }

    /// Returns the namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the path part.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Key of the loot table the host builds for this entity type.
    pub fn entity_loot_table(&self) -> Identifier {
        Self {
            namespace: self.namespace.clone(),
            path: format!("entities/{}", self.path),
        }
    }

    /// Inverse of [`Identifier::entity_loot_table`]; `None` for non-entity tables.
    pub fn entity_from_loot_table(&self) -> Option<Identifier> {
        let path = self.path.strip_prefix("entities/")?;
        if path.is_empty() || path.contains('/') {
            return None;
        }
        Some(Self {
            namespace: self.namespace.clone(),
            path: path.to_string(),
        })
    }
}

fn is_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
}

fn is_path_char(c: char) -> bool {
    is_namespace_char(c) || c == '/'
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for Identifier {
    type Err = MobDropsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalizes an identifier string to `domain:name`, or `None` if it is invalid.
pub fn normalize_id(raw: &str) -> Option<String> {
    Identifier::parse(raw).ok().map(|id| id.to_string())
}

/// A resolved item, as handed to the host's loot-table builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    pub id: Identifier,
    /// Registry index in the catalog that resolved it
    pub raw_id: u32,
}

/// A resolved enchantment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnchantmentHandle {
    pub id: Identifier,
    pub raw_id: u32,
}

/// Resolver for item and enchantment identifiers.
///
/// Resolution failures are per-lookup: the engine logs them and carries on.
pub trait Catalog {
    /// Resolves an item identifier.
    fn resolve_item(&self, id: &Identifier) -> MobDropsResult<ItemHandle>;

    /// Resolves an enchantment identifier.
    fn resolve_enchantment(&self, id: &Identifier) -> MobDropsResult<EnchantmentHandle>;
}
