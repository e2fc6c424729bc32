//! Per-viewer state redaction.
//!
//! The engine offers three projections: `public` (no hole cards anywhere),
//! `complete` (every hole card), and a viewer projection that reveals a
//! seat's cards to the seat itself, or to everyone once the hand reaches
//! showdown. Folded seats stay hidden even then. Spectators and replay
//! consumers get the showdown-viewer rules.

use serde::{Deserialize, Serialize};

use super::entities::{
    Blinds, Card, Chips, GamePhase, Player, PlayerId, Position, Pot, SeatIndex,
};
use super::state::GameState;

/// Who is looking at the table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Perspective {
    /// No hole cards at all.
    Public,
    /// Every hole card. Never leaves the server.
    Complete,
    /// A specific participant or spectator.
    Viewer(PlayerId),
    /// Replay persistence; same rules as a showdown spectator.
    Replay,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub chip_stack: Chips,
    pub position: Option<Position>,
    pub hole_cards: Option<[Card; 2]>,
    pub current_bet: Chips,
    pub total_bet_this_hand: Chips,
    pub is_active: bool,
    pub has_acted: bool,
    pub is_folded: bool,
    pub is_all_in: bool,
    pub is_connected: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub hand_number: u64,
    pub phase: GamePhase,
    pub seats: Vec<PlayerView>,
    pub community_cards: Vec<Card>,
    pub pots: Vec<Pot>,
    pub dealer_index: SeatIndex,
    pub small_blind_index: SeatIndex,
    pub big_blind_index: SeatIndex,
    pub blinds: Blinds,
    pub current_bet: Chips,
    pub minimum_raise: Chips,
    pub current_player_to_act: Option<PlayerId>,
    pub last_aggressor: Option<PlayerId>,
    pub shown_cards: Vec<PlayerId>,
}

/// Whether this viewer may see the seat's hole cards.
fn reveals(player: &Player, phase: GamePhase, perspective: Perspective) -> bool {
    match perspective {
        Perspective::Complete => true,
        Perspective::Public => false,
        Perspective::Viewer(viewer_id) if viewer_id == player.id => true,
        Perspective::Viewer(_) | Perspective::Replay => {
            matches!(phase, GamePhase::Showdown | GamePhase::HandComplete) && !player.is_folded
        }
    }
}

/// Build the redacted view of the table for one perspective.
#[must_use]
pub fn project(state: &GameState, pots: &[Pot], perspective: Perspective) -> GameStateView {
    let seats = state
        .seats
        .iter()
        .map(|player| PlayerView {
            id: player.id,
            name: player.name.clone(),
            chip_stack: player.chip_stack,
            position: player.position,
            hole_cards: if reveals(player, state.phase, perspective) {
                player.hole_cards
            } else {
                None
            },
            current_bet: player.current_bet,
            total_bet_this_hand: player.total_bet_this_hand,
            is_active: player.is_active,
            has_acted: player.has_acted,
            is_folded: player.is_folded,
            is_all_in: player.is_all_in,
            is_connected: player.is_connected,
        })
        .collect();

    GameStateView {
        hand_number: state.hand_number,
        phase: state.phase,
        seats,
        community_cards: state.community_cards.clone(),
        pots: pots.to_vec(),
        dealer_index: state.dealer_index,
        small_blind_index: state.small_blind_index,
        big_blind_index: state.big_blind_index,
        blinds: state.blinds,
        current_bet: state.current_bet,
        minimum_raise: state.minimum_raise,
        current_player_to_act: state.current_player_to_act,
        last_aggressor: state.last_aggressor,
        shown_cards: state.shown_cards.clone(),
    }
}
