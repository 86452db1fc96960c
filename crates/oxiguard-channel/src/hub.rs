//! Channel hub — routes inbound calls to channels by name.
//!
//! Channels are opened on first use with the configured defaults:
//! history limit, timeout policy, the `DEFAULT_PERMISSION` / `LOOK_BEHIND`
//! settings, and the operator grants. Configured settings only fill gaps;
//! a value already in the settings store wins. The settings backend and the link
//! rewriter are shared by every channel.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use oxiguard_core::config::Config;
use oxiguard_core::{ChatMessage, ChatUser, ErrorKind, Permission};
use tracing::{debug, info};

use crate::commands::{CommandReply, CommandType};
use crate::error::{ChannelError, IntoChannelError};
use crate::history::MessageHistory;
use crate::links::{LinkCleaner, LinkRewriter};
use crate::manager::ChannelManager;
use crate::settings::{
    ChannelSetting, ChannelSettings, SettingError, SettingType, DEFAULT_PERMISSION, LOOK_BEHIND,
};
use crate::timeouts::TimeoutPolicy;

/// Result of a permission-checked command invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Executed(CommandReply),
    Denied {
        command: CommandType,
        required: Permission,
        actual: Permission,
    },
}

/// Registry of open channels.
pub struct ChannelHub {
    config: Config,
    settings: ChannelSettings,
    links: Arc<dyn LinkRewriter>,
    channels: RwLock<HashMap<String, Arc<ChannelManager>>>,
}

impl ChannelHub {
    /// Hub with in-memory settings and the built-in link cleaner.
    pub fn new(config: Config) -> Self {
        let links = Arc::new(LinkCleaner::new(&config.links));
        Self {
            config,
            settings: ChannelSettings::in_memory(),
            links,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Use `settings` for every channel opened from now on.
    pub fn with_settings(mut self, settings: ChannelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_links(mut self, links: Arc<dyn LinkRewriter>) -> Self {
        self.links = links;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Canonical channel name: no leading `#`, lowercase.
    fn normalize(name: &str) -> String {
        name.trim().trim_start_matches('#').to_lowercase()
    }

    /// The named channel, opening it if needed.
    pub fn channel(&self, name: &str) -> Result<Arc<ChannelManager>, ChannelError> {
        let name = Self::normalize(name);
        if name.is_empty() {
            return Err(ChannelError::new(name, ErrorKind::InvalidInput, "empty channel name"));
        }

        if let Some(existing) = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
        {
            return Ok(Arc::clone(existing));
        }

        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have opened it between the two locks
        if let Some(existing) = channels.get(&name) {
            return Ok(Arc::clone(existing));
        }
        let channel = Arc::new(self.open(&name)?);
        channels.insert(name, Arc::clone(&channel));
        Ok(channel)
    }

    /// Build a channel and apply the configured defaults to it.
    fn open(&self, name: &str) -> Result<ChannelManager, ChannelError> {
        let cfg = &self.config.channels;
        let channel = ChannelManager::new(name)
            .with_history(Arc::new(MessageHistory::new(cfg.history_limit)))
            .with_settings(self.settings.clone())
            .with_links(Arc::clone(&self.links))
            .with_timeout_policy(TimeoutPolicy::from(&self.config.timeouts));

        if let Some(level) = &cfg.default_permission {
            self.seed(&channel, &DEFAULT_PERMISSION, level.clone())?;
        }
        if let Some(n) = cfg.look_behind {
            self.seed(&channel, &LOOK_BEHIND, n)?;
        }

        let mut operators: Vec<_> = cfg.operators.iter().collect();
        operators.sort();
        for (user, level) in operators {
            let level = level
                .parse::<Permission>()
                .map_err(|e| e.in_channel(name))?;
            channel.set_permission(&ChatUser::new(user), level);
        }

        info!(channel = name, operators = cfg.operators.len(), "opened channel");
        Ok(channel)
    }

    /// Store `value` for `setting` unless the channel already has one.
    fn seed<T: SettingType>(
        &self,
        channel: &ChannelManager,
        setting: &ChannelSetting<T>,
        value: T,
    ) -> Result<(), ChannelError> {
        match self.settings.get(channel.name(), setting) {
            Err(SettingError::NotFound(_)) => channel.set_setting(setting, value),
            Err(e @ SettingError::Backend(_)) => Err(e.in_channel(channel.name())),
            Ok(_) | Err(SettingError::TypeMismatch { .. }) => {
                debug!(channel = channel.name(), setting = setting.name(), "keeping stored setting");
                Ok(())
            }
        }
    }

    /// Open every channel listed in `autojoin`.
    pub fn open_autojoin(&self) -> Result<Vec<Arc<ChannelManager>>, ChannelError> {
        self.config
            .channels
            .autojoin
            .iter()
            .map(|name| self.channel(name))
            .collect()
    }

    /// Names of all open channels, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Ingest `text` from `user`; `true` if the message is clean.
    pub fn ingest(&self, channel: &str, user: &ChatUser, text: &str) -> Result<bool, ChannelError> {
        self.channel(channel)?
            .ingest_message(ChatMessage::new(user.clone(), text))
    }

    pub fn set_permission(
        &self,
        channel: &str,
        user: &ChatUser,
        level: Permission,
    ) -> Result<Option<Permission>, ChannelError> {
        Ok(self.channel(channel)?.set_permission(user, level))
    }

    /// Resolve `alias`, check `user` against its required level, then run it.
    pub async fn run_command(
        &self,
        channel: &str,
        user: &ChatUser,
        alias: &str,
        args: &[&str],
    ) -> Result<CommandOutcome, ChannelError> {
        let channel = self.channel(channel)?;
        let command = CommandType::resolve(alias);
        let required = command.required_permission();
        let actual = channel.resolve_permission(user)?;

        if !actual.authorizes(required) {
            debug!(
                channel = channel.name(),
                user = %user,
                command = %command,
                required = %required,
                actual = %actual,
                "command denied"
            );
            return Ok(CommandOutcome::Denied {
                command,
                required,
                actual,
            });
        }

        let reply = command.execute(&channel, user, args).await?;
        Ok(CommandOutcome::Executed(reply))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
