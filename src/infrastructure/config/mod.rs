//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub rooms: RoomsConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    /// The bot's own address, e.g. `relaybot@localhost/bot`
    pub identity: String,
    /// Name used when joining rooms; some services are picky about it
    pub display_name: String,
    pub prefix: String,
    /// Maximum outbound body size in characters; 0 disables chunking
    #[serde(default = "default_size_limit")]
    pub message_size_limit: usize,
    /// Include failure descriptions in synthetic error replies
    #[serde(default = "default_true")]
    pub verbose_command_errors: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RoomsConfig {
    /// Rooms joined at startup, in order
    #[serde(default)]
    pub presence: Vec<String>,
    /// One-to-one senders whose messages are forwarded into rooms
    #[serde(default)]
    pub relay: HashMap<String, Vec<String>>,
    /// Rooms whose broadcasts are forwarded back to individuals
    #[serde(default)]
    pub reverse_relay: HashMap<String, Vec<String>>,
    /// Keep-alive heartbeat interval; 0 disables the heartbeat
    #[serde(default = "default_keepalive")]
    pub keepalive_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdaptersConfig {
    pub console: Option<ConsoleConfig>,
    pub harness: Option<HarnessConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    pub enabled: bool,
}

fn default_size_limit() -> usize {
    10000
}

fn default_keepalive() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                identity: "relaybot@localhost/bot".to_string(),
                display_name: "relaybot".to_string(),
                prefix: "!".to_string(),
                message_size_limit: default_size_limit(),
                verbose_command_errors: true,
            },
            admins: vec!["admin@localhost".to_string()],
            rooms: RoomsConfig {
                presence: vec!["test@conference.localhost".to_string()],
                relay: HashMap::new(),
                reverse_relay: HashMap::new(),
                keepalive_seconds: default_keepalive(),
            },
            adapters: AdaptersConfig {
                console: Some(ConsoleConfig { enabled: true }),
                harness: Some(HarnessConfig { enabled: false }),
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Check whether an address is on the admin list
    pub fn is_admin(&self, bare: &str) -> bool {
        self.admins.iter().any(|a| a == bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.bot.identity, config.bot.identity);
        assert_eq!(parsed.bot.message_size_limit, config.bot.message_size_limit);
        assert_eq!(parsed.rooms.keepalive_seconds, config.rooms.keepalive_seconds);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let yaml = r#"
bot:
  identity: bot@example.net/bot
  display-name: bot
  prefix: "!"
adapters:
  console:
    enabled: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot.message_size_limit, 10000);
        assert!(config.bot.verbose_command_errors);
        assert!(config.admins.is_empty());
        assert_eq!(config.rooms.keepalive_seconds, 10);
    }

    #[test]
    fn relay_tables_parse() {
        let yaml = r#"
bot:
  identity: bot@example.net/bot
  display-name: bot
  prefix: "!"
rooms:
  presence:
    - test@conference.example.net
  relay:
    alice@example.net:
      - test@conference.example.net
  reverse-relay:
    test@conference.example.net:
      - bob@example.net
adapters:
  console:
    enabled: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.rooms.relay["alice@example.net"],
            vec!["test@conference.example.net"]
        );
        assert_eq!(
            config.rooms.reverse_relay["test@conference.example.net"],
            vec!["bob@example.net"]
        );
    }
}
