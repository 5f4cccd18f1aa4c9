//! # Mobdrops Command Line
//!
//! Inspects, edits and reloads a drop configuration outside of a host.

use clap::{Parser, Subcommand, ValueEnum};
use mobdrops::{
    CommandDispatcher, CommandSource, CommandStatus, ConfigStore, DropPoolSpec, Identifier,
    KillContext, LootTable, MobDropsError, MobDropsResult, RuleEngine, Session, StaticCatalog,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
#[cfg(feature = "dev-tools")]
use tracing::Level;

/// Command line arguments for mobdrops.
#[derive(Parser, Debug)]
#[command(name = "mobdrops")]
#[command(about = "Config-driven custom monster drops")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configuration as loaded (after repairs)
    Show,
    /// Load, repair and write the configuration back
    Validate,
    /// List the drop pools a monster's loot table would get
    Preview {
        monster: String,
        /// Print the pools as JSON
        #[arg(long)]
        json: bool,
    },
    /// Simulate kills of a monster and print what dropped
    Roll {
        monster: String,
        /// Looting level of the killing weapon
        #[arg(long, default_value_t = 0)]
        looting: u32,
        /// Number of kills to simulate
        #[arg(long, default_value_t = 1)]
        kills: u32,
        /// Random seed for reproducible rolls
        #[arg(long)]
        seed: Option<u64>,
        /// Simulate a kill not attributable to a player
        #[arg(long)]
        not_player: bool,
    },
    /// Add a monster rule
    AddMonster { monster: String },
    /// Remove the monster rule at an index
    RemoveMonster { index: usize },
    /// Add a drop to the monster rule at an index
    AddDrop {
        monster_index: usize,
        item: String,
        #[arg(long, default_value_t = 1)]
        min: i32,
        #[arg(long, default_value_t = 1)]
        max: i32,
        #[arg(long, default_value_t = 1.0)]
        chance: f32,
        /// Do not apply the looting bonus
        #[arg(long)]
        no_looting: bool,
    },
    /// Remove a drop from a monster rule
    RemoveDrop {
        monster_index: usize,
        drop_index: usize,
    },
    /// Remove every monster rule
    Reset,
    /// Reload the configuration through the admin command
    Reload,
    /// List known monster or item identifiers
    Suggest {
        kind: SuggestKind,
        #[arg(default_value = "")]
        term: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SuggestKind {
    Monsters,
    Items,
}

/// The terminal, acting as a fully privileged console.
struct ConsoleSource;

impl CommandSource for ConsoleSource {
    fn permission_level(&self) -> u8 {
        4
    }

    fn send_feedback(&mut self, message: &str, _broadcast: bool) {
        println!("{}", message);
    }

    fn send_error(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

#[tokio::main]
async fn main() -> MobDropsResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level)?;
    log::info!("Starting mobdrops v{}", mobdrops::VERSION);

    let store = match &args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::at_default_location()?,
    };

    run(args.command, Arc::new(Session::new(store)))
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> MobDropsResult<()> {
    #[cfg(feature = "dev-tools")]
    {
        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        let level = log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info);

        env_logger::Builder::new()
            .filter_level(level)
            .format_target(false)
            .try_init()
            .map_err(|e| {
                MobDropsError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
            })?;
    }

    Ok(())
}

fn run(command: Command, session: Arc<Session>) -> MobDropsResult<()> {
    let catalog = StaticCatalog::vanilla();

    match command {
        Command::Show => {
            println!("{}", serde_json::to_string_pretty(&*session.config())?);
        }

        Command::Validate => {
            let report = session.store().repair()?;
            for repair in &report.repairs {
                println!("repaired: {}", repair);
            }
            println!("{} mob rule(s) valid", session.store().try_load()?.len());
        }

        Command::Preview { monster, json } => {
            let pools = session.drop_pools(&monster, &catalog);
            if json {
                println!("{}", serde_json::to_string_pretty(&pools)?);
                return Ok(());
            }
            if pools.is_empty() {
                println!("No custom drops for {}", monster);
            }
            for pool in &pools {
                println!("{}", describe_pool(pool));
            }
        }

        Command::Roll {
            monster,
            looting,
            kills,
            seed,
            not_player,
        } => {
            let monster = Identifier::parse(&monster)?;
            let mut table = LootTable::new();
            RuleEngine::new().modify_loot_table(
                &monster.entity_loot_table(),
                &mut table,
                &session.config(),
                &catalog,
            );

            let context = if not_player {
                KillContext::environment()
            } else {
                KillContext::player(looting)
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            for kill in 1..=kills {
                let drops = table.roll(&context, &mut rng);
                println!("kill {}: {}", kill, serde_json::to_string(&drops)?);
            }
        }

        Command::AddMonster { monster } => {
            session.update(|config| config.add_monster(&monster).map(|_| ()))?;
            println!("Added {}", monster);
        }

        Command::RemoveMonster { index } => {
            session.update(|config| config.remove_monster(index).map(|_| ()))?;
            println!("Removed mob rule {}", index);
        }

        Command::AddDrop {
            monster_index,
            item,
            min,
            max,
            chance,
            no_looting,
        } => {
            session.update(|config| {
                let drop = config.add_drop(monster_index, &item)?;
                drop.min_count = min;
                drop.max_count = max;
                drop.drop_chance = chance;
                drop.apply_looting = !no_looting;
                config.validate();
                Ok(())
            })?;
            println!("Added {} to mob rule {}", item, monster_index);
        }

        Command::RemoveDrop {
            monster_index,
            drop_index,
        } => {
            session.update(|config| config.remove_drop(monster_index, drop_index).map(|_| ()))?;
            println!("Removed drop {} from mob rule {}", drop_index, monster_index);
        }

        Command::Reset => {
            session.update(|config| {
                config.reset();
                Ok(())
            })?;
            println!("Configuration reset");
        }

        Command::Reload => {
            let dispatcher = CommandDispatcher::new(Arc::clone(&session));
            let status = dispatcher.dispatch("mobdrops reload", &mut ConsoleSource)?;
            if status == CommandStatus::Failed {
                return Err(MobDropsError::Reload("reload command failed".to_string()));
            }
        }

        Command::Suggest { kind, term } => {
            let ids = match kind {
                SuggestKind::Monsters => catalog.suggest_monsters(&term),
                SuggestKind::Items => catalog.suggest_items(&term),
            };
            for id in ids {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

fn describe_pool(pool: &DropPoolSpec) -> String {
    let count = match pool.count {
        mobdrops::CountSelector::Fixed(n) => format!("x{}", n),
        mobdrops::CountSelector::Uniform { min, max } => format!("x{}-{}", min, max),
    };
    let chance = pool
        .chance()
        .map(|p| format!("{}%", (p * 100.0).round()))
        .unwrap_or_else(|| "always".to_string());
    let looting = if pool.bonus.is_some() { ", looting" } else { "" };

    format!("{} {} ({}, player kill{})", pool.item.id, count, chance, looting)
}
