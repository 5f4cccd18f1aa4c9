//! # Config Store
//!
//! Loads and saves the configuration document and notifies change listeners
//! after every successful save.

use super::{Configuration, ValidationReport};
use crate::{panic_message, MobDropsError, MobDropsResult, MOD_ID};
use directories::ProjectDirs;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback run after every successful save.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// Owner of the configuration file location and its change listeners.
pub struct ConfigStore {
    path: PathBuf,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl ConfigStore {
    /// Creates a store for an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Creates a store at `<platform config dir>/mobdrops.json`.
    pub fn at_default_location() -> MobDropsResult<Self> {
        let project_dirs = ProjectDirs::from("", "", MOD_ID).ok_or_else(|| {
            MobDropsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;

        Ok(Self::new(
            project_dirs.config_dir().join(format!("{}.json", MOD_ID)),
        ))
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, never failing.
    ///
    /// A missing file yields an empty configuration that is persisted right
    /// away. An unreadable or unparsable file is logged and yields an empty
    /// configuration without touching the file.
    pub fn load(&self) -> Configuration {
        let (config, created) = self.load_unnotified();
        if created {
            self.notify_changes();
        }
        config
    }

    /// [`ConfigStore::load`] without running listeners. The flag is true when
    /// the empty configuration was written out and listeners are still owed.
    pub(crate) fn load_unnotified(&self) -> (Configuration, bool) {
        info!("Loading config from {}", self.path.display());

        if !self.path.exists() {
            info!("No config file found, creating new empty configuration");
            let config = Configuration::new();
            // Failure is already logged; the empty config still applies.
            let created = self.persist(&config).is_ok();
            return (config, created);
        }

        match self.try_load() {
            Ok(config) => (config, false),
            Err(e) => {
                error!("Failed to load config, using defaults: {}", e);
                (Configuration::new(), false)
            }
        }
    }

    /// Loads the configuration, returning read and parse errors as values.
    ///
    /// A missing file is an [`MobDropsError::Io`] here; only [`ConfigStore::load`]
    /// bootstraps it.
    pub fn try_load(&self) -> MobDropsResult<Configuration> {
        let mut config = self.read_unvalidated()?;

        let report = config.validate();
        if !report.is_clean() {
            info!("Repaired {} invalid value(s) while loading", report.repairs.len());
        }

        for rule in &config.mob_configs {
            info!(
                "  - Loaded mob: {} (enabled: {}) with {} items",
                rule.mob_id,
                rule.enabled,
                rule.item_drops.len()
            );
        }
        info!("Config loaded with {} mob(s)", config.len());

        Ok(config)
    }

    /// Parses the file as written, before any repair.
    fn read_unvalidated(&self) -> MobDropsResult<Configuration> {
        let content = fs::read_to_string(&self.path)?;
        debug!("Config file content length: {} bytes", content.len());

        let parsed: Option<Configuration> = serde_json::from_str(&content)?;
        Ok(parsed.unwrap_or_else(|| {
            warn!("Config parsed as null, creating new empty config");
            Configuration::new()
        }))
    }

    /// Repairs the file in place and reports what was changed.
    ///
    /// Read and parse errors are returned and the file is left untouched.
    pub fn repair(&self) -> MobDropsResult<ValidationReport> {
        let mut config = self.read_unvalidated()?;
        let report = config.validate();
        self.save(&config)?;
        Ok(report)
    }

    /// Writes the configuration and notifies listeners.
    ///
    /// The overwrite is not atomic. On failure nothing is notified and the error
    /// is logged and returned.
    pub fn save(&self, config: &Configuration) -> MobDropsResult<()> {
        self.persist(config)?;
        self.notify_changes();
        Ok(())
    }

    /// Writes and verifies the file without running listeners.
    pub(crate) fn persist(&self, config: &Configuration) -> MobDropsResult<()> {
        info!(
            "Saving {} mob(s) to {}",
            config.len(),
            self.path.display()
        );
        for rule in &config.mob_configs {
            debug!(
                "  - Saving mob: {} (enabled: {}) with {} items",
                rule.mob_id,
                rule.enabled,
                rule.item_drops.len()
            );
            for drop in &rule.item_drops {
                debug!(
                    "    * Item: {} (enabled: {}, count: {}-{}, chance: {}%)",
                    drop.item_id,
                    drop.enabled,
                    drop.min_count,
                    drop.max_count,
                    drop.chance_percent()
                );
            }
        }

        if let Err(e) = self.write(config) {
            error!("Failed to save config: {}", e);
            return Err(e);
        }

        self.verify();
        Ok(())
    }

    fn write(&self, config: &Configuration) -> MobDropsResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
                info!("Created config directory: {}", dir.display());
            }
        }

        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Reads the file back after a write. Only logs.
    fn verify(&self) {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Configuration>(&content) {
                Ok(saved) => info!(
                    "Config file verified: {} bytes, {} mob(s) saved correctly",
                    content.len(),
                    saved.len()
                ),
                Err(e) => error!("Config file verification failed: {}", e),
            },
            Err(e) => error!("Config file unreadable after write: {}", e),
        }
    }

    /// Registers a callback run after every successful save.
    pub fn add_change_listener<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Runs every listener. The list is copied first so listeners may save,
    /// reload or register further listeners.
    pub(crate) fn notify_changes(&self) {
        let listeners: Vec<ChangeListener> = self.listeners.lock().clone();
        for (index, listener) in listeners.iter().enumerate() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener())) {
                error!(
                    "Error notifying change listener {}: {}",
                    index,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DropRule, MonsterRule};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("nested").join("mobdrops.json"))
    }

    #[test]
    fn test_missing_file_bootstraps_empty_config() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let config = store.load();
        assert!(config.is_empty());
        assert!(store.path().exists(), "empty config should be persisted");

        let reloaded = store.try_load().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_unparsable_file_falls_back_and_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mobdrops.json");
        fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::new(&path);

        assert!(store.load().is_empty());
        assert!(store.try_load().is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_null_document_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mobdrops.json");
        fs::write(&path, "null").unwrap();

        assert!(ConfigStore::new(&path).try_load().unwrap().is_empty());
    }

    #[test]
    fn test_load_repairs_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mobdrops.json");
        fs::write(
            &path,
            r#"{"mobConfigs":[{"mobId":"m:zombie","itemDrops":[{"itemId":"m:gem","dropChance":1.5,"minCount":0,"maxCount":0}]}]}"#,
        )
        .unwrap();

        let config = ConfigStore::new(&path).load();
        let drop = &config.mob_configs[0].item_drops[0];
        assert_eq!(drop.drop_chance, 1.0);
        assert_eq!(drop.min_count, 1);
        assert_eq!(drop.max_count, 1);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let config = Configuration {
            mob_configs: vec![MonsterRule::new("minecraft:evoker")
                .with_drop(DropRule::new("minecraft:diamond").with_count(1, 3).with_chance(0.5))],
        };

        store.save(&config).unwrap();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn test_listeners_run_after_save_and_survive_panics() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let calls = Arc::new(AtomicUsize::new(0));

        store.add_change_listener(|| panic!("listener failure"));
        let counter = Arc::clone(&calls);
        store.add_change_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.save(&Configuration::new()).unwrap();
        store.save(&Configuration::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_save_skips_listeners_and_keeps_file() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the write fail.
        let path = dir.path().join("mobdrops.json");
        fs::create_dir(&path).unwrap();
        let store = ConfigStore::new(&path);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.add_change_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(matches!(
            store.save(&Configuration::new()),
            Err(MobDropsError::Io(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(path.is_dir());
    }

    #[test]
    fn test_listener_can_register_another_listener() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        let registered = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&store);
        let counter = Arc::clone(&registered);
        store.add_change_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.add_change_listener(|| {});
        });

        store.save(&Configuration::new()).unwrap();
        assert_eq!(registered.load(Ordering::SeqCst), 1);
        assert_eq!(store.listeners.lock().len(), 2);
    }

    #[test]
    fn test_repair_reports_each_fix_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mobdrops.json");
        fs::write(
            &path,
            r#"{"mobConfigs":[{"mobId":"m:zombie","itemDrops":[{"itemId":"m:gem","dropChance":1.5}]}]}"#,
        )
        .unwrap();
        let store = ConfigStore::new(&path);

        let report = store.repair().unwrap();
        assert_eq!(report.repairs.len(), 1);
        assert_eq!(store.try_load().unwrap().mob_configs[0].item_drops[0].drop_chance, 1.0);
        assert!(store.repair().unwrap().is_clean());
    }

    #[test]
    fn test_repair_leaves_unparsable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mobdrops.json");
        fs::write(&path, "{\"mobConfigs\": [").unwrap();
        let store = ConfigStore::new(&path);

        assert!(matches!(store.repair(), Err(MobDropsError::Serde(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"mobConfigs\": [");
    }
}
