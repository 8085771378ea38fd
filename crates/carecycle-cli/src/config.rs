use carecycle_core::models::QueueConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    /// Care group new items are filed under when `--group` is not given
    pub default_group: Option<Uuid>,
    /// Print JSON by default
    pub json: bool,
    pub queue: QueueSettings,
}

/// `[queue]` table: completion event processing
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct QueueSettings {
    pub max_attempts: u32,
    pub poll_interval_secs: u64,
    pub batch_size: u32,
    /// Default number of dates shown by `recur preview`
    pub preview_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "carecycle.db".to_string(),
            default_group: None,
            json: false,
            queue: QueueSettings::default(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        let core = QueueConfig::default();
        Self {
            max_attempts: core.max_attempts,
            poll_interval_secs: core.poll_interval_secs,
            batch_size: core.batch_size,
            preview_count: 5,
        }
    }
}

impl Config {
    /// Defaults, then `carecycle.toml`, then `CARECYCLE_*` variables
    /// (`CARECYCLE_QUEUE__MAX_ATTEMPTS` for nested keys).
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment(Toml::file("carecycle.toml")).extract()
    }

    fn figment(file: impl figment::Provider) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed("CARECYCLE_").split("__"))
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_attempts: self.queue.max_attempts.max(1),
            batch_size: self.queue.batch_size.max(1),
            poll_interval_secs: self.queue.poll_interval_secs.max(1),
        }
    }

    pub fn group_id(&self) -> Uuid {
        self.default_group.unwrap_or_else(Uuid::nil)
    }
}
