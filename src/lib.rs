//! # Mobdrops
//!
//! Config-driven custom monster drops.
//!
//! ## Architecture Overview
//!
//! A user-editable JSON document lists monsters and the extra items they should
//! drop. The crate turns that document into drop pools appended to a monster's
//! loot table whenever the host rebuilds it:
//!
//! - **Catalog**: namespaced identifiers and the item/enchantment resolver seam
//! - **Config**: the data model, validation/repair, persistence and change listeners
//! - **Engine**: the rule engine producing drop-pool specs, and their evaluation
//! - **Session**: the live configuration snapshot and reload
//! - **Command**: the administrative `reload` command
//!
//! ## Host Integration
//!
//! Everything host-owned (registries, the loot-table builder, resource reloads,
//! chat feedback) sits behind a trait so the core runs and tests without a host.

pub mod catalog;
pub mod command;
pub mod config;
pub mod engine;
pub mod session;

pub use catalog::*;
pub use command::*;
pub use config::*;
pub use engine::*;
pub use session::*;

/// Core error type for the mobdrops crate.
#[derive(thiserror::Error, Debug)]
pub enum MobDropsError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Identifier is not a valid `domain:name` string
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Item is not present in the catalog
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Enchantment is not present in the catalog
    #[error("Unknown enchantment: {0}")]
    UnknownEnchantment(String),

    /// A list already holds its maximum number of entries
    #[error("Cannot add more {what}, maximum is {max}")]
    LimitReached { what: &'static str, max: usize },

    /// Monster already has a rule
    #[error("Monster {0} already exists in configuration")]
    DuplicateMonster(String),

    /// Index does not point at an existing entry
    #[error("Invalid {what} index: {index}")]
    IndexOutOfRange { what: &'static str, index: usize },

    /// Host resource reload failed
    #[error("Resource reload failed: {0}")]
    Reload(String),

    /// Command source lacks the required permission level
    #[error("Permission denied: level {required} required, source has {actual}")]
    PermissionDenied { required: u8, actual: u8 },

    /// Command line did not match any registered command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Result type used throughout the mobdrops codebase.
pub type MobDropsResult<T> = Result<T, MobDropsError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name used for the config file, the command root and log prefixes.
pub const MOD_ID: &str = "mobdrops";

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Configuration size limits.
pub mod limits {
    /// Maximum number of monster rules in a configuration
    pub const MAX_MONSTER_RULES: usize = 5;

    /// Maximum number of drop rules per monster rule
    pub const MAX_DROP_RULES: usize = 7;

    /// Permission level required by administrative commands
    pub const ADMIN_PERMISSION_LEVEL: u8 = 2;
}
