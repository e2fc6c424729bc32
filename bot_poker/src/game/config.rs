//! Per-table game configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Blinds, Chips};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 10;
pub const DEFAULT_HAND_START_DELAY_MS: u64 = 2_000;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}")]
    InvalidMaxPlayers,
    #[error("small blind cannot exceed big blind")]
    InvalidBlinds,
    #[error("turn time limit must be finite")]
    InvalidTurnTimeLimit,
}

/// Settings fixed at table creation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub max_players: usize,
    pub small_blind_amount: Chips,
    pub big_blind_amount: Chips,
    /// Seconds a seat has to act; fractional values are allowed. Zero or
    /// negative means the timeout fires immediately.
    pub turn_time_limit: f64,
    /// Milliseconds between a hand completing and the next auto-start.
    /// Zero starts the next hand instantly.
    #[serde(default = "default_hand_start_delay")]
    pub hand_start_delay: u64,
    /// Informational only; blind escalation lives outside the core.
    #[serde(default)]
    pub is_tournament: bool,
}

fn default_hand_start_delay() -> u64 {
    DEFAULT_HAND_START_DELAY_MS
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 9,
            small_blind_amount: 5,
            big_blind_amount: 10,
            turn_time_limit: 30.0,
            hand_start_delay: DEFAULT_HAND_START_DELAY_MS,
            is_tournament: false,
        }
    }
}

impl GameConfig {
    #[must_use]
    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind_amount,
            big: self.big_blind_amount,
        }
    }

    /// Check the invariants the engine relies on. Zero blinds are legal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(ConfigError::InvalidMaxPlayers);
        }
        if self.small_blind_amount > self.big_blind_amount {
            return Err(ConfigError::InvalidBlinds);
        }
        if !self.turn_time_limit.is_finite() {
            return Err(ConfigError::InvalidTurnTimeLimit);
        }
        Ok(())
    }
}
