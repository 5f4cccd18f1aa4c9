//! # Session Module
//!
//! Owns the live configuration for the process and reloads it.
//!
//! Rule-engine passes read an immutable snapshot; edits and reloads swap in a
//! whole new configuration. Writers are serialized, readers never block.

use crate::catalog::{Catalog, Identifier};
use crate::config::{ConfigStore, Configuration};
use crate::engine::{DropPoolSpec, PoolSink, RuleEngine};
use crate::{MobDropsError, MobDropsResult};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// The host's resource-reload pipeline, available while a host session runs.
#[async_trait]
pub trait ResourceReloader: Send + Sync {
    /// Rebuilds host resources (loot tables included) from scratch.
    async fn reload_resources(&self) -> MobDropsResult<()>;
}

/// Result of [`Session::reload_configuration`].
#[derive(Debug)]
pub struct ReloadOutcome {
    /// Monster rules before the reload
    pub previous_rules: usize,
    /// Monster rules after the reload
    pub current_rules: usize,
    /// The scheduled host reload, if one was started
    pub resource_reload: Option<JoinHandle<MobDropsResult<()>>>,
}

impl ReloadOutcome {
    /// Whether the number of monster rules changed.
    pub fn count_changed(&self) -> bool {
        self.previous_rules != self.current_rules
    }

    /// Waits for the host reload, if any. Dropping the outcome instead leaves
    /// it running in the background.
    pub async fn wait(self) -> MobDropsResult<()> {
        match self.resource_reload {
            Some(handle) => handle
                .await
                .map_err(|e| MobDropsError::Reload(e.to_string()))?,
            None => Ok(()),
        }
    }
}

/// Process-wide drop configuration and its reload machinery.
pub struct Session {
    store: ConfigStore,
    engine: RuleEngine,
    current: ArcSwap<Configuration>,
    reloader: RwLock<Option<Arc<dyn ResourceReloader>>>,
    writer: Mutex<()>,
    last_reload: RwLock<DateTime<Utc>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("rules", &self.current.load().len())
            .field("reloader_attached", &self.reloader.read().is_some())
            .field("last_reload", &*self.last_reload.read())
            .finish()
    }
}

impl Session {
    /// Loads the configuration from `store` and starts a session around it.
    pub fn new(store: ConfigStore) -> Self {
        let config = store.load();
        info!("Configuration loaded with {} mob(s) configured", config.len());

        Self {
            store,
            engine: RuleEngine::new(),
            current: ArcSwap::from_pointee(config),
            reloader: RwLock::new(None),
            writer: Mutex::new(()),
            last_reload: RwLock::new(Utc::now()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// When the configuration was last loaded from disk.
    pub fn last_reload(&self) -> DateTime<Utc> {
        *self.last_reload.read()
    }

    /// Host session started: reloads will now rebuild host resources.
    pub fn attach_reloader(&self, reloader: Arc<dyn ResourceReloader>) {
        *self.reloader.write() = Some(reloader);
        info!("Host session attached, tracking for config reloads");
    }

    /// Host session stopped.
    pub fn detach_reloader(&self) {
        *self.reloader.write() = None;
        info!("Host session detached");
    }

    /// Drop pools for `monster` against the current snapshot.
    pub fn drop_pools(&self, monster: &str, catalog: &dyn Catalog) -> Vec<DropPoolSpec> {
        self.engine.drop_pools(monster, &self.config(), catalog)
    }

    /// Host loot-table hook against the current snapshot.
    pub fn modify_loot_table(
        &self,
        table_key: &Identifier,
        sink: &mut dyn PoolSink,
        catalog: &dyn Catalog,
    ) -> usize {
        self.engine
            .modify_loot_table(table_key, sink, &self.config(), catalog)
    }

    /// Applies an edit to a copy of the configuration, saves it, then swaps it in.
    ///
    /// Nothing is swapped when the edit or the save fails. Change listeners
    /// run after the swap, so they observe the new snapshot.
    pub fn update<F>(&self, edit: F) -> MobDropsResult<Arc<Configuration>>
    where
        F: FnOnce(&mut Configuration) -> MobDropsResult<()>,
    {
        let working = {
            let _writer = self.writer.lock();

            let mut working = Configuration::clone(&self.current.load());
            edit(&mut working)?;
            self.store.persist(&working)?;

            let working = Arc::new(working);
            self.current.store(Arc::clone(&working));
            working
        };

        self.store.notify_changes();
        Ok(working)
    }

    /// Replaces the configuration with a fresh load from disk.
    ///
    /// The swap always happens. When a host session is attached the resource
    /// reload is spawned on the current tokio runtime and handed back in the
    /// outcome; the caller may await it or let it run.
    pub fn reload_configuration(&self) -> ReloadOutcome {
        let (previous, current_rules, created) = {
            let _writer = self.writer.lock();
            info!("Reloading configuration...");

            let (fresh, created) = self.store.load_unnotified();
            let current_rules = fresh.len();
            let previous = self.current.swap(Arc::new(fresh));
            *self.last_reload.write() = Utc::now();
            (previous, current_rules, created)
        };

        if created {
            self.store.notify_changes();
        }

        info!(
            "Config updated: {} mob(s) -> {} mob(s)",
            previous.len(),
            current_rules
        );
        for rule in &self.config().mob_configs {
            debug!("Mob: {} with {} item drops", rule.mob_id, rule.item_drops.len());
        }

        ReloadOutcome {
            previous_rules: previous.len(),
            current_rules,
            resource_reload: self.schedule_resource_reload(),
        }
    }

    fn schedule_resource_reload(&self) -> Option<JoinHandle<MobDropsResult<()>>> {
        let Some(reloader) = self.reloader.read().clone() else {
            info!("No host session, changes apply when one starts");
            return None;
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Could not auto-reload host resources: {}", e);
                return None;
            }
        };

        Some(runtime.spawn(async move {
            info!("Starting host resource reload...");
            match reloader.reload_resources().await {
                Ok(()) => {
                    info!("Host resources reloaded, new drops are now active");
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to reload resources after config change: {}", e);
                    Err(e)
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DropRule, MonsterRule};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingReloader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ResourceReloader for CountingReloader {
        async fn reload_resources(&self) -> MobDropsResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MobDropsError::Reload("datapack error".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn session_in(dir: &TempDir) -> Session {
        Session::new(ConfigStore::new(dir.path().join("mobdrops.json")))
    }

    fn write_rules(store: &ConfigStore, ids: &[&str]) {
        let config = Configuration {
            mob_configs: ids.iter().map(|id| MonsterRule::new(*id)).collect(),
        };
        store.save(&config).unwrap();
    }

    #[test]
    fn test_reload_without_host_swaps_config() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        let before = session.last_reload();
        assert!(session.config().is_empty());

        write_rules(session.store(), &["m:zombie", "m:skeleton"]);
        let outcome = session.reload_configuration();

        assert_eq!(outcome.previous_rules, 0);
        assert_eq!(outcome.current_rules, 2);
        assert!(outcome.count_changed());
        assert!(outcome.resource_reload.is_none());
        assert_eq!(session.config().len(), 2);
        assert!(session.last_reload() >= before);
    }

    #[test]
    fn test_reload_without_runtime_still_swaps() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        session.attach_reloader(Arc::new(CountingReloader {
            calls: AtomicUsize::new(0),
            fail: false,
        }));

        write_rules(session.store(), &["m:zombie"]);
        let outcome = session.reload_configuration();

        assert!(outcome.resource_reload.is_none());
        assert_eq!(session.config().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_triggers_host_reload() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        let reloader = Arc::new(CountingReloader {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        session.attach_reloader(reloader.clone());

        let outcome = session.reload_configuration();
        assert!(outcome.resource_reload.is_some());
        outcome.wait().await.unwrap();
        assert_eq!(reloader.calls.load(Ordering::SeqCst), 1);

        session.detach_reloader();
        assert!(session.reload_configuration().resource_reload.is_none());
    }

    #[tokio::test]
    async fn test_failed_host_reload_keeps_new_config() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        session.attach_reloader(Arc::new(CountingReloader {
            calls: AtomicUsize::new(0),
            fail: true,
        }));

        write_rules(session.store(), &["m:zombie"]);
        let outcome = session.reload_configuration();

        assert!(matches!(outcome.wait().await, Err(MobDropsError::Reload(_))));
        assert_eq!(session.config().len(), 1);
    }

    #[test]
    fn test_update_saves_and_swaps() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        let snapshot = session.config();

        session
            .update(|config| {
                config.add_monster("m:zombie")?;
                config.add_drop(0, "m:gem")?;
                Ok(())
            })
            .unwrap();

        assert!(snapshot.is_empty(), "old snapshots are immutable");
        assert_eq!(session.config().mob_configs[0].item_drops[0].item_id, "m:gem");
        assert_eq!(session.store().try_load().unwrap(), *session.config());
    }

    #[test]
    fn test_failed_update_leaves_config() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);

        let result = session.update(|config| {
            config.add_monster("m:zombie")?;
            config.add_monster("m:zombie")?;
            Ok(())
        });

        assert!(matches!(result, Err(MobDropsError::DuplicateMonster(_))));
        assert!(session.config().is_empty());
    }

    #[test]
    fn test_session_drop_pools_uses_snapshot() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        session
            .update(|config| {
                config.mob_configs.push(
                    MonsterRule::new("m:zombie").with_drop(DropRule::new("m:gem").with_count(2, 2)),
                );
                Ok(())
            })
            .unwrap();

        let catalog = crate::StaticCatalog::new().with_item("m:gem");
        assert_eq!(session.drop_pools("m:zombie", &catalog).len(), 1);
    }

    #[test]
    fn test_listeners_see_updated_config_and_may_reload() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(session_in(&dir));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let observer = Arc::clone(&session);
        let lengths = Arc::clone(&seen);
        session.store().add_change_listener(move || {
            lengths.lock().push(observer.config().len());
        });
        let reloader = Arc::clone(&session);
        session.store().add_change_listener(move || {
            reloader.reload_configuration();
        });

        session
            .update(|config| config.add_monster("m:zombie").map(|_| ()))
            .unwrap();

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(session.config().len(), 1);
    }

    #[test]
    fn test_reload_of_missing_file_notifies_listeners() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(session_in(&dir));
        std::fs::remove_file(session.store().path()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let inner = Arc::clone(&session);
        session.store().add_change_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(inner.config().is_empty());
        });

        session.reload_configuration();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.store().path().exists());
    }
}
