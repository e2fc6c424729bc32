//! Per-table hand orchestration.
//!
//! The engine is the single writer of its table's state. It runs the
//! blind-posting, street-progression, showdown, and distribution machinery
//! and emits an ordered event stream; everything outside the engine reads
//! through redacted views.

use std::collections::HashMap;

use chrono::Utc;
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc;

use super::config::GameConfig;
use super::entities::{
    Action, CardDealer, Chips, GameId, GamePhase, Player, PlayerAction, PlayerId, Position,
    SeatIndex,
};
use super::evaluator::{self, HandRank};
use super::events::{DecisionContext, GameEvent, GameEventKind, SequenceId};
use super::pot::PotManager;
use super::state::GameState;
use super::validator::{self, ActionError, PossibleAction};
use super::view::{GameStateView, Perspective, project};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EngineError {
    #[error("game is not running")]
    GameNotRunning,
    #[error("game already in progress")]
    GameInProgress,
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("game is full")]
    GameFull,
    #[error("player already seated")]
    AlreadySeated,
    #[error("player not found")]
    PlayerNotFound,
    #[error("cannot advance from current phase")]
    CannotAdvance,
    #[error(transparent)]
    InvalidAction(#[from] ActionError),
}

/// Handle for unsubscribing an event channel.
pub type SubscriberId = u64;

pub struct GameEngine {
    game_id: GameId,
    config: GameConfig,
    state: GameState,
    deck: Box<dyn CardDealer>,
    pot: PotManager,
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<GameEvent>>,
    next_subscriber: SubscriberId,
    sequence: SequenceId,
    is_running: bool,
    /// Chip total frozen at hand start; conservation is checked against it
    /// when the hand completes.
    hand_chip_total: Chips,
}

impl GameEngine {
    #[must_use]
    pub fn new(game_id: GameId, config: GameConfig, deck: Box<dyn CardDealer>) -> Self {
        let state = GameState::new(config.blinds());
        Self {
            game_id,
            config,
            state,
            deck,
            pot: PotManager::new(),
            subscribers: HashMap::new(),
            next_subscriber: 0,
            sequence: 0,
            is_running: false,
            hand_chip_total: 0,
        }
    }

    #[must_use]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn is_game_running(&self) -> bool {
        self.is_running
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.state.seats.len()
    }

    #[must_use]
    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.state.player(player_id).is_some()
    }

    #[must_use]
    pub fn player_name(&self, player_id: PlayerId) -> Option<&str> {
        self.state.player(player_id).map(|p| p.name.as_str())
    }

    /// Seat id for a display name, used to rebind reconnecting bots.
    #[must_use]
    pub fn player_id_by_name(&self, name: &str) -> Option<PlayerId> {
        self.state
            .seats
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
    }

    #[must_use]
    pub fn current_player_to_act(&self) -> Option<PlayerId> {
        self.state.current_player_to_act
    }

    /// Whether another hand could start right now.
    #[must_use]
    pub fn can_start_hand(&self) -> bool {
        !self.is_running
            && self
                .state
                .seats
                .iter()
                .filter(|p| p.is_active && p.chip_stack > 0)
                .count()
                >= 2
    }

    // === Subscriptions ===

    /// Register an event channel. Dead receivers are pruned on emit, so a
    /// slow or dropped subscriber never stalls the table.
    pub fn on_event(&mut self, sender: mpsc::UnboundedSender<GameEvent>) -> SubscriberId {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.subscribers.insert(id, sender);
        id
    }

    pub fn off_event(&mut self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    fn emit(
        &mut self,
        kind: GameEventKind,
        player_id: Option<PlayerId>,
        action: Option<Action>,
        game_state_before: Option<GameStateView>,
        decision: Option<DecisionContext>,
    ) {
        self.sequence += 1;
        let event = GameEvent {
            sequence_id: self.sequence,
            kind,
            timestamp: Utc::now().timestamp_millis(),
            hand_number: self.state.hand_number,
            phase: self.state.phase,
            player_id,
            action,
            game_state_before,
            game_state_after: Some(self.snapshot(Perspective::Replay)),
            player_decision_context: decision,
            event_duration: None,
        };
        self.subscribers.retain(|id, sender| {
            if sender.send(event.clone()).is_ok() {
                true
            } else {
                debug!("game {}: dropping dead subscriber {id}", self.game_id);
                false
            }
        });
    }

    fn snapshot(&self, perspective: Perspective) -> GameStateView {
        project(&self.state, self.pot.pots(), perspective)
    }

    // === Views ===

    /// Public projection; no hole cards anywhere.
    #[must_use]
    pub fn get_game_state(&self) -> GameStateView {
        self.snapshot(Perspective::Public)
    }

    /// Complete projection. Server-side only.
    #[must_use]
    pub fn get_full_game_state(&self) -> GameStateView {
        self.snapshot(Perspective::Complete)
    }

    /// What one bot (or spectator) is allowed to see.
    #[must_use]
    pub fn get_bot_game_state(&self, viewer_id: PlayerId) -> GameStateView {
        self.snapshot(Perspective::Viewer(viewer_id))
    }

    #[must_use]
    pub fn get_replay_state(&self) -> GameStateView {
        self.snapshot(Perspective::Replay)
    }

    // === Seating ===

    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        name: impl Into<String>,
        chip_stack: Chips,
    ) -> Result<(), EngineError> {
        if self.state.seats.len() >= self.config.max_players {
            return Err(EngineError::GameFull);
        }
        if self.has_player(player_id) {
            return Err(EngineError::AlreadySeated);
        }
        let mut player = Player::new(player_id, name, chip_stack);
        if self.is_running {
            // Joined mid-hand; sits out until the next deal.
            player.is_folded = true;
        }
        self.state.seats.push(player);
        self.emit(GameEventKind::PlayerJoined, Some(player_id), None, None, None);
        Ok(())
    }

    /// Remove a seat, folding it first when a hand is in flight. Returns
    /// the stack the player leaves with; chips already committed to the
    /// pot stay there.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<Chips, EngineError> {
        let seat = self
            .state
            .seat_of(player_id)
            .ok_or(EngineError::PlayerNotFound)?;
        let stack = self.state.seats[seat].chip_stack;
        if self.is_running && self.state.seats[seat].in_hand() {
            let player = &mut self.state.seats[seat];
            player.is_folded = true;
            player.is_active = false;
            player.is_connected = false;
            self.emit(GameEventKind::PlayerLeft, Some(player_id), None, None, None);
            if self.state.current_player_to_act == Some(player_id) {
                self.state.current_player_to_act = None;
            }
            self.continue_after_fold(seat);
        } else {
            self.state.seats.remove(seat);
            self.clamp_indices();
            self.emit(GameEventKind::PlayerLeft, Some(player_id), None, None, None);
        }
        Ok(stack)
    }

    /// Flag a seat's transport liveness. Purely informational: the game
    /// never pauses for a disconnected seat.
    pub fn set_player_connected(
        &mut self,
        player_id: PlayerId,
        connected: bool,
    ) -> Result<(), EngineError> {
        let player = self
            .state
            .player_mut(player_id)
            .ok_or(EngineError::PlayerNotFound)?;
        player.is_connected = connected;
        Ok(())
    }

    fn clamp_indices(&mut self) {
        let n = self.state.seats.len().max(1);
        self.state.dealer_index %= n;
        self.state.small_blind_index %= n;
        self.state.big_blind_index %= n;
    }

    // === Hand lifecycle ===

    pub fn start_hand(&mut self) -> Result<(), EngineError> {
        if self.is_running {
            return Err(EngineError::GameInProgress);
        }
        let eligible = self
            .state
            .seats
            .iter()
            .filter(|p| p.is_active && p.chip_stack > 0)
            .count();
        if eligible < 2 {
            return Err(EngineError::NotEnoughPlayers);
        }

        self.is_running = true;
        self.state.hand_number += 1;
        self.state.phase = GamePhase::PreFlop;
        self.state.community_cards.clear();
        self.state.shown_cards.clear();
        self.state.last_aggressor = None;
        self.state.blinds_posted = false;
        self.state.current_player_to_act = None;
        for player in &mut self.state.seats {
            player.reset_for_hand();
            if !player.is_active || player.chip_stack == 0 {
                // Sitting this one out.
                player.is_folded = true;
            }
        }
        self.state.reset_for_round();

        // The button moves to the next seat every hand, sat-out seats
        // included.
        self.state.dealer_index = self.state.next_seat(self.state.dealer_index);
        self.assign_positions();

        self.deck.shuffle();
        let order = self.participant_ring();
        for &seat in &order {
            self.state.seats[seat].hole_cards = Some([self.deck.deal(), self.deck.deal()]);
        }

        self.pot.reset();
        self.hand_chip_total = self.state.total_chips();
        debug!(
            "game {}: hand {} started with {} players",
            self.game_id,
            self.state.hand_number,
            order.len()
        );
        self.emit(GameEventKind::HandStarted, None, None, None, None);
        self.emit(GameEventKind::HoleCardsDealt, None, None, None, None);

        self.post_blinds();
        self.emit(GameEventKind::BlindsPosted, None, None, None, None);

        if self.state.betting_round_complete() {
            // Blinds alone can end the action (both blinds all-in short).
            self.advance_phase_chain();
        } else if let Some(first) = self.state.first_to_act() {
            self.state.current_player_to_act = Some(self.state.seats[first].id);
        }
        Ok(())
    }

    /// Seats dealt into this hand, in ring order from the small blind.
    fn participant_ring(&self) -> Vec<SeatIndex> {
        let n = self.state.seats.len();
        (0..n)
            .map(|i| (self.state.small_blind_index + i) % n)
            .filter(|&idx| {
                let p = &self.state.seats[idx];
                p.is_active && !p.is_folded && p.chip_stack > 0
            })
            .collect()
    }

    fn assign_positions(&mut self) {
        let n = self.state.seats.len();
        let participates = |p: &Player| p.is_active && !p.is_folded && p.chip_stack > 0;
        let ring: Vec<SeatIndex> = (0..n)
            .map(|i| (self.state.dealer_index + i) % n)
            .filter(|&idx| participates(&self.state.seats[idx]))
            .collect();

        if ring.len() == 2 {
            // Heads-up: the button posts the small blind.
            self.state.small_blind_index = ring[0];
            self.state.big_blind_index = ring[1];
            self.state.seats[ring[0]].position = Some(Position::Dealer);
            self.state.seats[ring[1]].position = Some(Position::BigBlind);
            return;
        }

        self.state.small_blind_index = ring[1];
        self.state.big_blind_index = ring[2];
        for (i, &seat) in ring.iter().enumerate() {
            let position = match i {
                0 => Position::Dealer,
                1 => Position::SmallBlind,
                2 => Position::BigBlind,
                3 => Position::UnderTheGun,
                i if i == ring.len() - 1 => Position::Cutoff,
                _ => Position::Middle,
            };
            self.state.seats[seat].position = Some(position);
        }
    }

    fn post_blinds(&mut self) {
        let blinds = self.state.blinds;
        let sb = self.state.small_blind_index;
        let bb = self.state.big_blind_index;
        let sb_posted = validator::post_blind(&mut self.state, sb, blinds.small);
        let bb_posted = validator::post_blind(&mut self.state, bb, blinds.big);
        let sb_id = self.state.seats[sb].id;
        let bb_id = self.state.seats[bb].id;
        if sb_posted > 0 {
            self.pot.add_bet(sb_id, sb_posted);
        }
        if bb_posted > 0 {
            self.pot.add_bet(bb_id, bb_posted);
        }
        self.state.minimum_raise = blinds.big;
        self.state.last_raise_amount = blinds.big;
        self.state.blinds_posted = true;
    }

    // === Actions ===

    pub fn process_action(&mut self, player_action: PlayerAction) -> Result<(), EngineError> {
        if !self.is_running {
            return Err(EngineError::GameNotRunning);
        }
        let PlayerAction {
            player_id, action, ..
        } = player_action;
        if !self.has_player(player_id) {
            return Err(EngineError::PlayerNotFound);
        }
        validator::validate(&self.state, player_id, &action)?;

        let before = self.snapshot(Perspective::Replay);
        let decision = self.decision_context(player_id);
        let actor_seat = self
            .state
            .seat_of(player_id)
            .ok_or(EngineError::PlayerNotFound)?;
        let applied = validator::apply_action(&mut self.state, player_id, action)?;
        if applied.committed > 0 {
            self.pot.add_bet(player_id, applied.committed);
        }
        debug!(
            "game {}: {} {}",
            self.game_id,
            self.state.seats[actor_seat].name,
            action
        );
        self.emit(
            GameEventKind::ActionTaken,
            Some(player_id),
            Some(action),
            Some(before),
            decision,
        );
        self.advance_after_action(actor_seat);
        Ok(())
    }

    /// Apply the timeout default for a seat: check when checking is free,
    /// fold otherwise.
    pub fn force_player_action(&mut self, player_id: PlayerId) -> Result<Action, EngineError> {
        if !self.is_running {
            return Err(EngineError::GameNotRunning);
        }
        if !self.has_player(player_id) {
            return Err(EngineError::PlayerNotFound);
        }
        let action = validator::force_action(&self.state, player_id);
        validator::validate(&self.state, player_id, &action)?;
        self.emit(
            GameEventKind::PlayerTimeout,
            Some(player_id),
            Some(action),
            None,
            None,
        );
        self.process_action(PlayerAction::new(player_id, action))?;
        Ok(action)
    }

    pub fn get_possible_actions(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<PossibleAction>, EngineError> {
        if !self.has_player(player_id) {
            return Err(EngineError::PlayerNotFound);
        }
        if !self.is_running {
            return Ok(Vec::new());
        }
        Ok(validator::possible_actions(&self.state, player_id))
    }

    fn decision_context(&self, player_id: PlayerId) -> Option<DecisionContext> {
        let player = self.state.player(player_id)?;
        let call = self.state.call_amount(player);
        let pot_total = self.pot.total();
        let pot_odds = if call > 0 {
            Some(f64::from(call) / f64::from(pot_total + call))
        } else {
            None
        };
        let effective_stack_size = self
            .state
            .seats
            .iter()
            .filter(|p| p.id != player_id && p.in_hand())
            .map(|p| p.chip_stack)
            .max()
            .unwrap_or(0)
            .min(player.chip_stack);
        Some(DecisionContext {
            possible_actions: validator::possible_actions(&self.state, player_id),
            time_to_decide: self.config.turn_time_limit,
            position: player.position,
            chip_stack: player.chip_stack,
            pot_odds,
            effective_stack_size,
        })
    }

    // === Round / hand progression ===

    fn advance_after_action(&mut self, actor_seat: SeatIndex) {
        if self.state.in_hand_count() <= 1 {
            return self.finish_uncontested();
        }
        if self.state.betting_round_complete() {
            return self.advance_phase_chain();
        }
        match self.state.next_actor_after(actor_seat) {
            Some(next) => {
                self.state.current_player_to_act = Some(self.state.seats[next].id);
            }
            None => self.advance_phase_chain(),
        }
    }

    /// Re-check progression after a seat folded outside the normal action
    /// path (mid-hand leave).
    fn continue_after_fold(&mut self, folded_seat: SeatIndex) {
        if !self.is_running {
            return;
        }
        if self.state.in_hand_count() <= 1 {
            return self.finish_uncontested();
        }
        if self.state.betting_round_complete() {
            return self.advance_phase_chain();
        }
        if self.state.current_player_to_act.is_none()
            && let Some(next) = self.state.next_actor_after(folded_seat)
        {
            self.state.current_player_to_act = Some(self.state.seats[next].id);
        }
    }

    /// Move one or more streets forward. Streets with fewer than two seats
    /// able to act are run out automatically all the way to showdown.
    fn advance_phase_chain(&mut self) {
        self.state.current_player_to_act = None;
        loop {
            if self.state.in_hand_count() <= 1 {
                return self.finish_uncontested();
            }
            match self.state.phase {
                GamePhase::PreFlop => {
                    self.state.reset_for_round();
                    self.state.phase = GamePhase::Flop;
                    for _ in 0..3 {
                        let card = self.deck.deal();
                        self.state.community_cards.push(card);
                    }
                    self.emit(GameEventKind::FlopDealt, None, None, None, None);
                }
                GamePhase::Flop => {
                    self.state.reset_for_round();
                    self.state.phase = GamePhase::Turn;
                    let card = self.deck.deal();
                    self.state.community_cards.push(card);
                    self.emit(GameEventKind::TurnDealt, None, None, None, None);
                }
                GamePhase::Turn => {
                    self.state.reset_for_round();
                    self.state.phase = GamePhase::River;
                    let card = self.deck.deal();
                    self.state.community_cards.push(card);
                    self.emit(GameEventKind::RiverDealt, None, None, None, None);
                }
                GamePhase::River => return self.showdown(),
                GamePhase::Showdown | GamePhase::HandComplete => return,
            }
            if self.state.can_act_count() >= 2 {
                if let Some(first) = self.state.first_to_act() {
                    self.state.current_player_to_act = Some(self.state.seats[first].id);
                    return;
                }
            }
            // All but at most one seat is all-in: run the board out.
        }
    }

    fn showdown(&mut self) {
        self.state.phase = GamePhase::Showdown;
        self.state.current_player_to_act = None;

        // River aggressor shows first, otherwise the first live seat
        // clockwise from the button.
        let n = self.state.seats.len();
        let start = self
            .state
            .round_aggressor
            .and_then(|id| self.state.seat_of(id))
            .or_else(|| {
                (0..n)
                    .map(|i| (self.state.next_seat(self.state.dealer_index) + i) % n)
                    .find(|&idx| self.state.seats[idx].in_hand())
            })
            .unwrap_or(self.state.dealer_index);
        let show_order: Vec<PlayerId> = (0..n)
            .map(|i| (start + i) % n)
            .filter(|&idx| self.state.seats[idx].in_hand())
            .map(|idx| self.state.seats[idx].id)
            .collect();
        self.state.shown_cards = show_order;

        let mut rankings: HashMap<PlayerId, HandRank> = HashMap::new();
        for player in self.state.seats.iter().filter(|p| p.in_hand()) {
            let Some(hole) = player.hole_cards else {
                continue;
            };
            match evaluator::evaluate(&hole, &self.state.community_cards) {
                Ok(rank) => {
                    debug!("game {}: {} shows {rank}", self.game_id, player.name);
                    rankings.insert(player.id, rank);
                }
                Err(err) => warn!(
                    "game {}: skipping evaluation for {}: {err}",
                    self.game_id, player.name
                ),
            }
        }

        self.distribute(&rankings);
        self.emit(GameEventKind::ShowdownComplete, None, None, None, None);
        self.complete_hand();
    }

    /// Everyone but one seat folded; no cards are shown.
    fn finish_uncontested(&mut self) {
        self.state.phase = GamePhase::Showdown;
        self.state.current_player_to_act = None;
        self.distribute(&HashMap::new());
        self.emit(GameEventKind::ShowdownComplete, None, None, None, None);
        self.complete_hand();
    }

    fn distribute(&mut self, rankings: &HashMap<PlayerId, HandRank>) {
        self.pot.create_side_pots(&self.state.seats);
        let distances: HashMap<PlayerId, usize> = self
            .state
            .seats
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, self.state.clockwise_distance(idx)))
            .collect();
        for award in self.pot.distribute_pots(rankings, &distances) {
            if let Some(player) = self.state.player_mut(award.player_id) {
                debug!(
                    "game {}: {} wins {} from pot {}",
                    self.game_id, player.name, award.amount, award.pot_index
                );
                player.chip_stack += award.amount;
            }
        }
        // Contributions are settled into stacks now; clear them so
        // post-hand snapshots carry each chip exactly once.
        for player in &mut self.state.seats {
            player.current_bet = 0;
            player.total_bet_this_hand = 0;
        }
        self.state.current_bet = 0;
        self.pot.reset();
    }

    fn complete_hand(&mut self) {
        self.state.phase = GamePhase::HandComplete;
        self.is_running = false;
        self.state.current_player_to_act = None;

        let stacks: Chips = self.state.seats.iter().map(|p| p.chip_stack).sum();
        debug_assert_eq!(
            stacks, self.hand_chip_total,
            "chip conservation violated in game {}",
            self.game_id
        );

        // Seats that left mid-hand are dropped now that their chips are
        // settled.
        let gone: Vec<PlayerId> = self
            .state
            .seats
            .iter()
            .filter(|p| !p.is_active)
            .map(|p| p.id)
            .collect();
        for id in gone {
            if let Some(seat) = self.state.seat_of(id) {
                self.state.seats.remove(seat);
            }
        }
        self.clamp_indices();

        self.emit(GameEventKind::HandComplete, None, None, None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, ShuffledDeck, StackedDeck, Suit};
    use uuid::Uuid;

    fn engine_with(config: GameConfig) -> GameEngine {
        GameEngine::new(Uuid::new_v4(), config, Box::new(ShuffledDeck::default()))
    }

    fn default_engine() -> GameEngine {
        engine_with(GameConfig::default())
    }

    fn seat(engine: &mut GameEngine, name: &str, stack: Chips) -> PlayerId {
        let id = Uuid::new_v4();
        engine.add_player(id, name, stack).unwrap();
        id
    }

    #[test]
    fn start_hand_needs_two_players() {
        let mut engine = default_engine();
        seat(&mut engine, "alice", 1_000);
        assert_eq!(engine.start_hand(), Err(EngineError::NotEnoughPlayers));
        seat(&mut engine, "bob", 1_000);
        assert!(engine.start_hand().is_ok());
        assert!(engine.is_game_running());
    }

    #[test]
    fn start_hand_rejects_running_game() {
        let mut engine = default_engine();
        seat(&mut engine, "alice", 1_000);
        seat(&mut engine, "bob", 1_000);
        engine.start_hand().unwrap();
        assert_eq!(engine.start_hand(), Err(EngineError::GameInProgress));
    }

    #[test]
    fn table_rejects_players_beyond_capacity() {
        let mut engine = engine_with(GameConfig {
            max_players: 2,
            ..GameConfig::default()
        });
        seat(&mut engine, "alice", 1_000);
        seat(&mut engine, "bob", 1_000);
        let err = engine.add_player(Uuid::new_v4(), "carol", 1_000).unwrap_err();
        assert_eq!(err, EngineError::GameFull);
    }

    #[test]
    fn duplicate_seat_is_rejected() {
        let mut engine = default_engine();
        let id = seat(&mut engine, "alice", 1_000);
        let err = engine.add_player(id, "alice", 500).unwrap_err();
        assert_eq!(err, EngineError::AlreadySeated);
    }

    #[test]
    fn process_action_requires_running_game() {
        let mut engine = default_engine();
        let id = seat(&mut engine, "alice", 1_000);
        let err = engine
            .process_action(PlayerAction::new(id, Action::Fold))
            .unwrap_err();
        assert_eq!(err, EngineError::GameNotRunning);
    }

    #[test]
    fn dealer_button_moves_every_hand() {
        let mut engine = default_engine();
        seat(&mut engine, "alice", 1_000);
        seat(&mut engine, "bob", 1_000);
        seat(&mut engine, "carol", 1_000);
        engine.start_hand().unwrap();
        let first_dealer = engine.state.dealer_index;
        // Everyone folds to the big blind to end the hand.
        for _ in 0..2 {
            let actor = engine.current_player_to_act().unwrap();
            engine
                .process_action(PlayerAction::new(actor, Action::Fold))
                .unwrap();
        }
        assert!(!engine.is_game_running());
        engine.start_hand().unwrap();
        assert_eq!(engine.state.dealer_index, (first_dealer + 1) % 3);
    }

    #[test]
    fn heads_up_blinds_sit_on_the_button() {
        let mut engine = default_engine();
        seat(&mut engine, "alice", 1_000);
        seat(&mut engine, "bob", 1_000);
        engine.start_hand().unwrap();
        assert_eq!(engine.state.small_blind_index, engine.state.dealer_index);
        assert_ne!(engine.state.big_blind_index, engine.state.dealer_index);
        // Dealer/small blind opens pre-flop.
        let sb_id = engine.state.seats[engine.state.small_blind_index].id;
        assert_eq!(engine.current_player_to_act(), Some(sb_id));
    }

    #[test]
    fn short_blinds_run_out_to_showdown() {
        // Both blinds go all-in on the post; the board runs out with no
        // further action. The button moves to seat 1 on the first hand, so
        // the 3-chip seat added second posts the small blind.
        let cards = vec![
            // Hole cards, small blind first.
            Card(14, Suit::Spade),
            Card(14, Suit::Heart),
            Card(2, Suit::Club),
            Card(7, Suit::Diamond),
            // Board.
            Card(3, Suit::Club),
            Card(8, Suit::Diamond),
            Card(10, Suit::Heart),
            Card(4, Suit::Spade),
            Card(12, Suit::Club),
        ];
        let mut engine = GameEngine::new(
            Uuid::new_v4(),
            GameConfig::default(),
            Box::new(StackedDeck::new(cards)),
        );
        let bb = seat(&mut engine, "bob", 7);
        let sb = seat(&mut engine, "alice", 3);
        engine.start_hand().unwrap();

        assert!(!engine.is_game_running());
        assert_eq!(engine.state.phase, GamePhase::HandComplete);
        assert_eq!(engine.state.player(sb).unwrap().position, Some(Position::Dealer));
        // Main pot 6 goes to the aces; the big blind keeps its uncalled 4.
        assert_eq!(engine.state.player(sb).unwrap().chip_stack, 6);
        assert_eq!(engine.state.player(bb).unwrap().chip_stack, 4);
    }

    #[test]
    fn remove_player_mid_hand_folds_and_settles_at_hand_end() {
        let mut engine = default_engine();
        let a = seat(&mut engine, "alice", 1_000);
        let b = seat(&mut engine, "bob", 1_000);
        seat(&mut engine, "carol", 1_000);
        engine.start_hand().unwrap();
        let leaver = [a, b]
            .into_iter()
            .find(|id| Some(*id) != engine.current_player_to_act())
            .unwrap();
        let stack = engine.remove_player(leaver).unwrap();
        assert!(stack <= 1_000);
        // Seat lingers as folded until the hand completes.
        assert!(engine.has_player(leaver));
        assert!(engine.state.player(leaver).unwrap().is_folded);
    }

    #[test]
    fn possible_actions_empty_between_hands() {
        let mut engine = default_engine();
        let id = seat(&mut engine, "alice", 1_000);
        seat(&mut engine, "bob", 1_000);
        assert!(engine.get_possible_actions(id).unwrap().is_empty());
        assert_eq!(
            engine.get_possible_actions(Uuid::new_v4()),
            Err(EngineError::PlayerNotFound)
        );
    }

    #[test]
    fn events_carry_monotonic_sequence_ids() {
        let mut engine = default_engine();
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.on_event(tx);
        seat(&mut engine, "alice", 1_000);
        seat(&mut engine, "bob", 1_000);
        engine.start_hand().unwrap();
        let mut last = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(event.sequence_id > last);
            last = event.sequence_id;
        }
        assert!(last >= 4);
    }

    #[test]
    fn unsubscribed_channel_stops_receiving() {
        let mut engine = default_engine();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = engine.on_event(tx);
        seat(&mut engine, "alice", 1_000);
        assert!(rx.try_recv().is_ok());
        engine.off_event(sub);
        seat(&mut engine, "bob", 1_000);
        assert!(rx.try_recv().is_err());
    }
}
