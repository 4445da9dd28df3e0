use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;

/// Storage and unit-of-work settings. Every field can come from a flag or
/// from the environment.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database URL or SQLite file path
    #[arg(short, long, env = "DATABASE_URL", default_value = "tally.db")]
    pub database: String,

    /// Connections kept open in the pool
    #[arg(long, env = "DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    /// Upper bound on pooled connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,

    /// Maximum lifetime of a pooled connection, in seconds
    #[arg(long, env = "DB_MAX_CONN_LIFETIME", default_value_t = 1800)]
    pub max_lifetime_secs: u64,

    /// Idle time before a pooled connection is closed, in seconds
    #[arg(long, env = "DB_MAX_CONN_IDLE_TIME", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    /// How long SQLite waits on a held lock before reporting it busy, in milliseconds
    #[arg(long, env = "DB_BUSY_TIMEOUT_MS", default_value_t = 3000)]
    pub busy_timeout_ms: u64,

    /// Deadline for a whole unit of work, in milliseconds
    #[arg(long, env = "LEDGER_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,
}

impl StoreConfig {
    /// Default settings for a database file at `path`.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            database: path.into(),
            min_connections: 1,
            max_connections: 8,
            max_lifetime_secs: 1800,
            idle_timeout_secs: 600,
            busy_timeout_ms: 3000,
            timeout_ms: 5000,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            bail!("max connections must be at least 1");
        }
        if self.min_connections > self.max_connections {
            bail!(
                "min connections ({}) exceeds max connections ({})",
                self.min_connections,
                self.max_connections
            );
        }
        if self.timeout_ms == 0 {
            bail!("unit-of-work timeout must be greater than zero");
        }
        Ok(())
    }

    /// Connection URL understood by sqlx. Bare paths are turned into
    /// `sqlite:` URLs.
    pub fn database_url(&self) -> String {
        if self.database.starts_with("sqlite:") {
            self.database.clone()
        } else {
            format!("sqlite:{}", self.database)
        }
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
