//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use bot_poker::game::GameConfig;
use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address.
    pub bind: SocketAddr,
    /// Defaults for the tables created at startup.
    pub table_defaults: GameConfig,
    /// Number of tables to create on startup.
    pub num_tables: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables, with optional CLI
    /// overrides.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        num_tables_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:7777"
                    .parse()
                    .expect("default bind address is valid")
            });

        let table_defaults = GameConfig {
            max_players: parse_env_or("TABLE_MAX_PLAYERS", 9),
            small_blind_amount: parse_env_or("TABLE_SMALL_BLIND", 5),
            big_blind_amount: parse_env_or("TABLE_BIG_BLIND", 10),
            turn_time_limit: parse_env_or("TABLE_TURN_TIME_LIMIT", 30.0),
            hand_start_delay: parse_env_or("TABLE_HAND_START_DELAY_MS", 2_000),
            is_tournament: parse_env_or("TABLE_IS_TOURNAMENT", false),
        };

        let num_tables = num_tables_override.unwrap_or_else(|| parse_env_or("MAX_TABLES", 1));

        Ok(ServerConfig {
            bind,
            table_defaults,
            num_tables,
        })
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tables == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_TABLES".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.table_defaults
            .validate()
            .map_err(|err| ConfigError::Invalid {
                var: "TABLE_*".to_string(),
                reason: err.to_string(),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable with a default fallback.
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tables_is_invalid() {
        let config = ServerConfig {
            bind: "127.0.0.1:7777".parse().unwrap(),
            table_defaults: GameConfig::default(),
            num_tables: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_table_config_passes_validation() {
        let config = ServerConfig {
            bind: "127.0.0.1:7777".parse().unwrap(),
            table_defaults: GameConfig::default(),
            num_tables: 1,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_table_defaults_are_reported() {
        let config = ServerConfig {
            bind: "127.0.0.1:7777".parse().unwrap(),
            table_defaults: GameConfig {
                max_players: 1,
                ..GameConfig::default()
            },
            num_tables: 1,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max players"));
    }
}
