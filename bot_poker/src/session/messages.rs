//! The wire protocol between bots and the dispatcher.
//!
//! Messages are JSON tagged records; tags and payload fields use the
//! camelCase names bots see on the wire.

use serde::{Deserialize, Serialize};

use crate::game::{
    Action, ActionError, Chips, GameEvent, GameId, GameStateView, PossibleAction,
};
use crate::table::TableSummary;

/// Messages a bot sends to the server.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join (or rejoin) a table. A known `(gameId, botName)` pair rebinds
    /// the existing seat instead of seating a new player.
    Identify {
        bot_name: String,
        game_id: GameId,
        chip_stack: Chips,
        #[serde(default)]
        api_key: Option<String>,
    },
    Action {
        action: WireAction,
    },
    RequestPossibleActions,
    RequestGameState,
    LeaveGame,
    /// Leave at the next hand boundary instead of immediately.
    Unseat,
    Ping,
    ListGames,
    Reconnect {
        bot_name: String,
        game_id: GameId,
    },
}

/// A player action as it appears on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireAction {
    Fold,
    Check,
    Call {
        #[serde(default)]
        amount: Option<Chips>,
    },
    Bet {
        #[serde(default)]
        amount: Option<Chips>,
    },
    Raise {
        #[serde(default)]
        amount: Option<Chips>,
    },
    AllIn,
}

impl TryFrom<WireAction> for Action {
    type Error = ActionError;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        match wire {
            WireAction::Fold => Ok(Action::Fold),
            WireAction::Check => Ok(Action::Check),
            WireAction::Call { amount } => Ok(Action::Call(amount)),
            WireAction::Bet {
                amount: Some(amount),
            } => Ok(Action::Bet(amount)),
            WireAction::Raise {
                amount: Some(amount),
            } => Ok(Action::Raise(amount)),
            // Bets and raises need an amount.
            WireAction::Bet { amount: None } | WireAction::Raise { amount: None } => {
                Err(ActionError::InvalidActionType)
            }
            WireAction::AllIn => Ok(Action::AllIn),
        }
    }
}

/// Messages the server sends to a bot.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    IdentificationSuccess {
        game_id: GameId,
        player_id: crate::game::PlayerId,
        bot_name: String,
    },
    IdentificationError {
        error: String,
    },
    /// It is this seat's turn; the clock is running.
    TurnStart {
        time_limit: f64,
    },
    TurnWarning {
        time_remaining: f64,
    },
    TurnTimeout,
    ActionSuccess,
    ActionError {
        error: String,
    },
    /// The forced timeout action itself failed.
    ForceActionError {
        error: String,
    },
    PossibleActions {
        actions: Vec<PossibleAction>,
    },
    GameState {
        state: GameStateView,
    },
    GameEvent {
        event: GameEvent,
    },
    LeftGame {
        chip_stack: Chips,
    },
    UnseatConfirmed,
    UnseatError {
        error: String,
    },
    Pong,
    GamesList {
        games: Vec<TableSummary>,
    },
}
