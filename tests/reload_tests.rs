//! Integration tests for live reload against a host session.

use async_trait::async_trait;
use mobdrops::{
    CommandDispatcher, CommandSource, CommandStatus, ConfigStore, Configuration, DropRule,
    MobDropsError, MobDropsResult, MonsterRule, ResourceReloader, Session, StaticCatalog,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
struct HostReloader {
    reloads: AtomicUsize,
}

#[async_trait]
impl ResourceReloader for HostReloader {
    async fn reload_resources(&self) -> MobDropsResult<()> {
        tokio::task::yield_now().await;
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenReloader;

#[async_trait]
impl ResourceReloader for BrokenReloader {
    async fn reload_resources(&self) -> MobDropsResult<()> {
        Err(MobDropsError::Reload("pack failed to load".to_string()))
    }
}

#[derive(Default)]
struct Operator {
    lines: Vec<String>,
}

impl CommandSource for Operator {
    fn permission_level(&self) -> u8 {
        2
    }

    fn send_feedback(&mut self, message: &str, _broadcast: bool) {
        self.lines.push(message.to_string());
    }

    fn send_error(&mut self, message: &str) {
        self.lines.push(format!("error: {}", message));
    }
}

fn zombie_gem() -> Configuration {
    Configuration {
        mob_configs: vec![MonsterRule::new("m:zombie").with_drop(DropRule::new("m:gem"))],
    }
}

#[tokio::test]
async fn test_edited_file_takes_effect_after_reload() -> MobDropsResult<()> {
    let dir = TempDir::new()?;
    let session = Arc::new(Session::new(ConfigStore::new(dir.path().join("mobdrops.json"))));
    let host = Arc::new(HostReloader::default());
    session.attach_reloader(host.clone());

    let catalog = StaticCatalog::new().with_item("m:gem");
    assert!(session.drop_pools("m:zombie", &catalog).is_empty());

    // Simulates an external edit of the file.
    ConfigStore::new(session.store().path()).save(&zombie_gem())?;
    assert!(session.drop_pools("m:zombie", &catalog).is_empty());

    let outcome = session.reload_configuration();
    assert_eq!((outcome.previous_rules, outcome.current_rules), (0, 1));
    outcome.wait().await?;

    assert_eq!(host.reloads.load(Ordering::SeqCst), 1);
    assert_eq!(session.drop_pools("m:zombie", &catalog).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_host_failure_is_returned_as_value() -> MobDropsResult<()> {
    let dir = TempDir::new()?;
    let session = Session::new(ConfigStore::new(dir.path().join("mobdrops.json")));
    session.attach_reloader(Arc::new(BrokenReloader));
    ConfigStore::new(session.store().path()).save(&zombie_gem())?;

    let outcome = session.reload_configuration();
    let result = outcome.wait().await;

    assert!(matches!(result, Err(MobDropsError::Reload(_))));
    assert_eq!(session.config().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_command_reload_with_host_attached() -> MobDropsResult<()> {
    let dir = TempDir::new()?;
    let session = Arc::new(Session::new(ConfigStore::new(dir.path().join("mobdrops.json"))));
    session.attach_reloader(Arc::new(HostReloader::default()));
    ConfigStore::new(session.store().path()).save(&zombie_gem())?;

    let dispatcher = CommandDispatcher::new(Arc::clone(&session));
    let mut operator = Operator::default();
    let status = dispatcher.dispatch("mobdrops reload", &mut operator)?;

    assert_eq!(status, CommandStatus::Success);
    assert_eq!(
        operator.lines,
        vec![
            "[Mob Drops] Configuration reloaded successfully!".to_string(),
            "Loaded 1 mob configuration(s)".to_string(),
            "Note: Mob count changed from 0 to 1".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_change_listener_fires_on_session_update() -> MobDropsResult<()> {
    let dir = TempDir::new()?;
    let session = Session::new(ConfigStore::new(dir.path().join("mobdrops.json")));
    let saves = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&saves);
    session.store().add_change_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    session.update(|config| config.add_monster("m:zombie").map(|_| ()))?;
    assert_eq!(saves.load(Ordering::SeqCst), 1);

    assert!(session.update(|config| config.remove_monster(9).map(|_| ())).is_err());
    assert_eq!(saves.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_change_listener_reads_new_config_and_reloads() -> MobDropsResult<()> {
    let dir = TempDir::new()?;
    let session = Arc::new(Session::new(ConfigStore::new(dir.path().join("mobdrops.json"))));
    let (sender, receiver) = std::sync::mpsc::channel();

    let listener_session = Arc::clone(&session);
    session.store().add_change_listener(move || {
        let seen = listener_session.config().len();
        let outcome = listener_session.reload_configuration();
        let _ = sender.send((seen, outcome.current_rules));
    });

    let editor = Arc::clone(&session);
    let update = std::thread::spawn(move || {
        editor.update(|config| config.add_monster("m:zombie").map(|_| ()))
    });

    let observed = receiver
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("listener should run without blocking");
    assert_eq!(observed, (1, 1));
    assert!(update.join().expect("update thread panicked").is_ok());
    assert_eq!(session.config().mob_configs[0].mob_id, "m:zombie");
    Ok(())
}
