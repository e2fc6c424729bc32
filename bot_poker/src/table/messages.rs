//! Table actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::game::{
    Action, Chips, EngineError, GameEvent, GameId, GameStateView, Perspective, PlayerAction,
    PlayerId, PossibleAction, SubscriberId,
};

/// Commands a table actor consumes. One inbox per table serializes every
/// mutation: client messages, timer expiries, and admin commands alike.
#[derive(Debug)]
pub enum TableCommand {
    /// Seat a player with a starting stack.
    Seat {
        player_id: PlayerId,
        name: String,
        chip_stack: Chips,
        respond: oneshot::Sender<Result<(), EngineError>>,
    },

    /// Remove a player immediately, folding them if a hand is running.
    /// Replies with the stack they cash out.
    Leave {
        player_id: PlayerId,
        respond: oneshot::Sender<Result<Chips, EngineError>>,
    },

    /// Queue a seat to leave at the next hand boundary.
    DeferUnseat {
        player_id: PlayerId,
        respond: oneshot::Sender<Result<(), EngineError>>,
    },

    /// A player action to validate and apply.
    TakeAction {
        action: PlayerAction,
        respond: oneshot::Sender<Result<(), EngineError>>,
    },

    /// Apply the timeout default for a seat.
    ForceAction {
        player_id: PlayerId,
        respond: oneshot::Sender<Result<Action, EngineError>>,
    },

    PossibleActions {
        player_id: PlayerId,
        respond: oneshot::Sender<Result<Vec<PossibleAction>, EngineError>>,
    },

    /// Redacted state for one perspective.
    GetView {
        perspective: Perspective,
        respond: oneshot::Sender<GameStateView>,
    },

    /// Register an event channel with the engine.
    Subscribe {
        sender: mpsc::UnboundedSender<GameEvent>,
        respond: oneshot::Sender<SubscriberId>,
    },

    Unsubscribe {
        id: SubscriberId,
    },

    /// Flag a seat's transport liveness.
    SetConnected {
        player_id: PlayerId,
        connected: bool,
    },

    /// Metadata for table listings.
    Summary {
        respond: oneshot::Sender<TableSummary>,
    },

    /// Start the next hand immediately, skipping the start delay.
    StartHand {
        respond: oneshot::Sender<Result<(), EngineError>>,
    },

    /// Shut the table down.
    Close,
}

/// Table metadata for discovery.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub game_id: GameId,
    pub player_count: usize,
    pub max_players: usize,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub turn_time_limit: f64,
    pub is_running: bool,
    pub hand_number: u64,
    pub is_tournament: bool,
}
