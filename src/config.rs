//! Configuration loaded from rsvp_desk.toml and environment variables

use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from rsvp_desk.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub event: EventConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// System-level configuration for the database connection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub database_url: String,
    pub database_ns: String,
    pub database_db: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            database_url: "ws://127.0.0.1:8000".to_string(),
            database_ns: "events".to_string(),
            database_db: "checkin".to_string(),
        }
    }
}

/// Event-specific settings: the roster collection, the ticket prefix the
/// normalizer strips, and scan pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventConfig {
    /// Fixed roster collection for this event
    pub roster_table: String,
    /// Event prefix printed ahead of ticket ids on wristband QRs
    pub ticket_prefix: String,
    /// Cool-down window after each accepted decode, seconds
    pub scan_cooldown_secs: u64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            roster_table: "rsvp_innovate_2026".to_string(),
            ticket_prefix: "IFI2026".to_string(),
            scan_cooldown_secs: 3,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub database_user: String,
    pub database_pass: String,
    pub log_level: String,
    pub db_reconnect: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            database_user: "root".to_string(),
            database_pass: "root".to_string(),
            log_level: "rsvp_desk=info".to_string(),
            db_reconnect: false,
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user) = std::env::var("DESK_DB_USER") {
            config.database_user = user;
        }
        if let Ok(pass) = std::env::var("DESK_DB_PASS") {
            config.database_pass = pass;
        }
        if let Ok(level) = std::env::var("DESK_LOG") {
            config.log_level = level;
        }
        if let Ok(reconnect) = std::env::var("DESK_DB_RECONNECT") {
            config.db_reconnect = reconnect == "1" || reconnect.eq_ignore_ascii_case("true");
        }

        config
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses RSVP_DESK_CONFIG or defaults to "rsvp_desk.toml"; an explicit
    /// path (the --config flag) wins over both.
    pub fn load_from(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("RSVP_DESK_CONFIG")
                .unwrap_or_else(|_| "rsvp_desk.toml".to_string())
                .into(),
        };

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            Self::default()
        };

        // Apply env overrides for database configuration (env-first)
        if let Ok(db_url) = std::env::var("DESK_DB_URL") {
            config.system.database_url = db_url;
        }
        if let Ok(db_ns) = std::env::var("DESK_DB_NS") {
            config.system.database_ns = db_ns;
        }
        if let Ok(db_name) = std::env::var("DESK_DB_DB") {
            config.system.database_db = db_name;
        }
        if let Ok(table) = std::env::var("DESK_ROSTER_TABLE") {
            config.event.roster_table = table;
        }
        if let Ok(prefix) = std::env::var("DESK_TICKET_PREFIX") {
            config.event.ticket_prefix = prefix;
        }
        if let Some(cooldown) = std::env::var("DESK_SCAN_COOLDOWN")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.event.scan_cooldown_secs = cooldown;
        }

        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Validate and normalize; warns and clamps rather than failing where
    /// reasonable
    fn validate(&mut self) -> anyhow::Result<()> {
        if !self.system.database_url.starts_with("ws://")
            && !self.system.database_url.starts_with("wss://")
            && !self.system.database_url.starts_with("http://")
            && !self.system.database_url.starts_with("https://")
        {
            tracing::warn!(
                "Database URL '{}' doesn't start with ws://, wss://, http://, or https://",
                self.system.database_url
            );
        }

        if self.event.roster_table.trim().is_empty() {
            return Err(anyhow::anyhow!("event.roster_table must not be empty"));
        }

        // The normalizer matches case-insensitively, but a canonical
        // uppercase prefix keeps logs and config greppable
        self.event.ticket_prefix = self.event.ticket_prefix.trim().to_uppercase();

        if self.event.scan_cooldown_secs == 0 {
            self.event.scan_cooldown_secs = 1;
        } else if self.event.scan_cooldown_secs > 60 {
            tracing::warn!(
                "scan_cooldown_secs {} exceeds max 60, clamping to 60",
                self.event.scan_cooldown_secs
            );
            self.event.scan_cooldown_secs = 60;
        }

        Ok(())
    }
}
