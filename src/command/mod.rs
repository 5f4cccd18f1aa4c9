//! # Command Module
//!
//! The administrative `mobdrops reload` command and a small literal dispatcher
//! a host can route chat/console input through.

use crate::limits::ADMIN_PERMISSION_LEVEL;
use crate::session::Session;
use crate::{panic_message, MobDropsError, MobDropsResult, MOD_ID};
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Prefix on every message the commands send.
pub const MESSAGE_PREFIX: &str = "[Mob Drops]";

/// Whoever issued a command: a player, the console, a script.
pub trait CommandSource {
    /// Permission level of the source; administrative commands need 2.
    fn permission_level(&self) -> u8;

    /// Sends a normal feedback line. `broadcast` also informs other operators.
    fn send_feedback(&mut self, message: &str, broadcast: bool);

    /// Sends an error line.
    fn send_error(&mut self, message: &str);
}

/// Outcome reported back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failed,
}

/// `mobdrops reload`: reloads the configuration from disk.
#[derive(Debug, Clone)]
pub struct ReloadCommand {
    session: Arc<Session>,
}

impl ReloadCommand {
    /// Literal that selects this command after the root.
    pub const LITERAL: &'static str = "reload";

    /// Creates the command over a session.
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Permission level required to run the command.
    pub fn required_level(&self) -> u8 {
        ADMIN_PERMISSION_LEVEL
    }

    /// Runs the reload and reports rule counts to `source`.
    ///
    /// Reloading itself cannot fail, so a panic while reloading is the only
    /// failure path. It is logged and reported as a generic error line and
    /// never propagates to the caller.
    pub fn execute(&self, source: &mut dyn CommandSource) -> CommandStatus {
        let session = &self.session;
        let result = panic::catch_unwind(AssertUnwindSafe(|| session.reload_configuration()));

        match result {
            Ok(outcome) => {
                source.send_feedback(
                    &format!("{} Configuration reloaded successfully!", MESSAGE_PREFIX),
                    true,
                );
                source.send_feedback(
                    &format!("Loaded {} mob configuration(s)", outcome.current_rules),
                    false,
                );
                if outcome.count_changed() {
                    source.send_feedback(
                        &format!(
                            "Note: Mob count changed from {} to {}",
                            outcome.previous_rules, outcome.current_rules
                        ),
                        false,
                    );
                }
                // The host reload keeps running in the background and logs its own result.
                drop(outcome.resource_reload);
                CommandStatus::Success
            }
            Err(payload) => {
                error!(
                    "Failed to reload config via command: {}",
                    panic_message(payload.as_ref())
                );
                source.send_error(&format!("{} Failed to reload configuration", MESSAGE_PREFIX));
                CommandStatus::Failed
            }
        }
    }
}

/// Routes `mobdrops <literal>` lines to their commands.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    reload: ReloadCommand,
}

impl CommandDispatcher {
    /// Creates a dispatcher with every command registered.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            reload: ReloadCommand::new(session),
        }
    }

    /// Usage lines for every registered command.
    pub fn usage(&self) -> Vec<String> {
        vec![format!("/{} {}", MOD_ID, ReloadCommand::LITERAL)]
    }

    /// Parses and runs one command line, with or without a leading `/`.
    ///
    /// Unknown commands and missing permission are returned as errors; the
    /// command's own failures are reported through `source`.
    pub fn dispatch(
        &self,
        line: &str,
        source: &mut dyn CommandSource,
    ) -> MobDropsResult<CommandStatus> {
        let line = line.trim().trim_start_matches('/');
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            [root, literal] if *root == MOD_ID && *literal == ReloadCommand::LITERAL => {
                let required = self.reload.required_level();
                let actual = source.permission_level();
                if actual < required {
                    info!("Rejected {} from source with permission level {}", line, actual);
                    return Err(MobDropsError::PermissionDenied { required, actual });
                }
                Ok(self.reload.execute(source))
            }
            _ => Err(MobDropsError::UnknownCommand(line.to_string())),
        }
    }
}
