//! The replayable event stream every table produces.
//!
//! Events are numbered monotonically per game, so a viewer's observed
//! stream is always a strict subsequence of the table's total order.
//! Embedded state snapshots are redacted with the replay projection before
//! they ever leave the engine.

use serde::{Deserialize, Serialize};

use super::entities::{Action, Chips, GamePhase, PlayerId, Position};
use super::validator::PossibleAction;
use super::view::GameStateView;

/// Monotonic per-game event number.
pub type SequenceId = u64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEventKind {
    PlayerJoined,
    PlayerLeft,
    HandStarted,
    HoleCardsDealt,
    BlindsPosted,
    ActionTaken,
    FlopDealt,
    TurnDealt,
    RiverDealt,
    ShowdownComplete,
    HandComplete,
    PlayerTimeout,
}

/// Everything a bot knew when it had to decide, captured for replay
/// analysis.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionContext {
    pub possible_actions: Vec<PossibleAction>,
    /// Seconds the seat had to answer.
    pub time_to_decide: f64,
    pub position: Option<Position>,
    pub chip_stack: Chips,
    pub pot_odds: Option<f64>,
    pub effective_stack_size: Chips,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub sequence_id: SequenceId,
    #[serde(rename = "type")]
    pub kind: GameEventKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub hand_number: u64,
    pub phase: GamePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state_before: Option<GameStateView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state_after: Option<GameStateView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_decision_context: Option<DecisionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_duration: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_wire_field_names() {
        let event = GameEvent {
            sequence_id: 7,
            kind: GameEventKind::FlopDealt,
            timestamp: 1_700_000_000_000,
            hand_number: 3,
            phase: GamePhase::Flop,
            player_id: None,
            action: None,
            game_state_before: None,
            game_state_after: None,
            player_decision_context: None,
            event_duration: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sequenceId"], 7);
        assert_eq!(json["type"], "flop_dealt");
        assert_eq!(json["handNumber"], 3);
        assert!(json.get("playerId").is_none());
    }
}
