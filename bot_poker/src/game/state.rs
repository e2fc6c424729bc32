//! Mutable per-table game state.
//!
//! The engine is the sole writer; everything else reads through views or
//! the typed queries below. Seats live in an arena-style vector and other
//! components refer to them by stable player id.

use super::entities::{
    Blinds, Card, Chips, GamePhase, Player, PlayerAction, PlayerId, SeatIndex,
};

#[derive(Debug)]
pub struct GameState {
    pub seats: Vec<Player>,
    pub dealer_index: SeatIndex,
    pub small_blind_index: SeatIndex,
    pub big_blind_index: SeatIndex,
    pub blinds: Blinds,
    /// The bet every live seat must match this round.
    pub current_bet: Chips,
    /// Size a raise must add on top of `current_bet` to be complete.
    pub minimum_raise: Chips,
    pub last_raise_amount: Chips,
    pub phase: GamePhase,
    pub community_cards: Vec<Card>,
    pub hand_number: u64,
    pub current_player_to_act: Option<PlayerId>,
    /// Last seat to bet or raise anywhere in the hand.
    pub last_aggressor: Option<PlayerId>,
    /// Last seat to bet or raise on the current street.
    pub round_aggressor: Option<PlayerId>,
    /// Seats that revealed their hole cards at showdown, in show order.
    pub shown_cards: Vec<PlayerId>,
    pub blinds_posted: bool,
    /// Trail of actions taken this betting round.
    pub actions_this_round: Vec<PlayerAction>,
}

impl GameState {
    #[must_use]
    pub fn new(blinds: Blinds) -> Self {
        Self {
            seats: Vec::new(),
            dealer_index: 0,
            small_blind_index: 0,
            big_blind_index: 0,
            blinds,
            current_bet: 0,
            minimum_raise: blinds.big,
            last_raise_amount: blinds.big,
            phase: GamePhase::HandComplete,
            community_cards: Vec::with_capacity(5),
            hand_number: 0,
            current_player_to_act: None,
            last_aggressor: None,
            round_aggressor: None,
            shown_cards: Vec::new(),
            blinds_posted: false,
            actions_this_round: Vec::new(),
        }
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.seats.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.seats.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn seat_of(&self, id: PlayerId) -> Option<SeatIndex> {
        self.seats.iter().position(|p| p.id == id)
    }

    /// The next seat clockwise, wrapping around the ring.
    #[must_use]
    pub fn next_seat(&self, from: SeatIndex) -> SeatIndex {
        (from + 1) % self.seats.len()
    }

    /// Seats dealt into the current hand, folded or not.
    #[must_use]
    pub fn hand_participant_count(&self) -> usize {
        self.seats.iter().filter(|p| p.hole_cards.is_some()).count()
    }

    /// Seats still contesting the pot.
    #[must_use]
    pub fn in_hand_count(&self) -> usize {
        self.seats.iter().filter(|p| p.in_hand()).count()
    }

    /// Seats that can still take a voluntary action.
    #[must_use]
    pub fn can_act_count(&self) -> usize {
        self.seats.iter().filter(|p| p.can_act()).count()
    }

    /// Chips the player must add to stay in the round.
    #[must_use]
    pub fn call_amount(&self, player: &Player) -> Chips {
        self.current_bet.saturating_sub(player.current_bet)
    }

    /// Clockwise distance of a seat from the dealer button; the button
    /// itself is 0. Used for the odd-chip rule.
    #[must_use]
    pub fn clockwise_distance(&self, seat: SeatIndex) -> usize {
        let n = self.seats.len();
        (seat + n - self.dealer_index) % n
    }

    /// First seat at or after `start`, clockwise, that can act.
    #[must_use]
    pub fn scan_can_act_from(&self, start: SeatIndex) -> Option<SeatIndex> {
        let n = self.seats.len();
        (0..n)
            .map(|i| (start + i) % n)
            .find(|&idx| self.seats[idx].can_act())
    }

    /// The seat to open the current betting round, or `None` when nobody
    /// can act and the street plays out on its own.
    ///
    /// Pre-flop with blinds posted: heads-up the dealer/small blind opens,
    /// otherwise the seat after the big blind. Post-flop (and on the
    /// pre-flop branch where blinds were not posted): heads-up the dealer,
    /// otherwise the first live seat after the button.
    #[must_use]
    pub fn first_to_act(&self) -> Option<SeatIndex> {
        if self.seats.is_empty() {
            return None;
        }
        let heads_up = self.hand_participant_count() == 2;
        let start = match self.phase {
            GamePhase::PreFlop if self.blinds_posted => {
                if heads_up {
                    self.dealer_index
                } else {
                    self.next_seat(self.big_blind_index)
                }
            }
            _ => {
                if heads_up {
                    self.dealer_index
                } else {
                    self.next_seat(self.dealer_index)
                }
            }
        };
        self.scan_can_act_from(start)
    }

    /// The next seat clockwise after `from` that can act.
    #[must_use]
    pub fn next_actor_after(&self, from: SeatIndex) -> Option<SeatIndex> {
        let n = self.seats.len();
        (1..=n)
            .map(|i| (from + i) % n)
            .find(|&idx| self.seats[idx].can_act())
    }

    /// A betting round ends when nobody can act, or when every live seat
    /// that still can act has responded to the current bet and matched it.
    #[must_use]
    pub fn betting_round_complete(&self) -> bool {
        self.seats
            .iter()
            .filter(|p| p.can_act())
            .all(|p| p.has_acted && p.current_bet == self.current_bet)
    }

    /// Reset everything scoped to one betting round.
    pub fn reset_for_round(&mut self) {
        for player in &mut self.seats {
            player.reset_for_round();
        }
        self.current_bet = 0;
        self.minimum_raise = self.blinds.big;
        self.last_raise_amount = self.blinds.big;
        self.round_aggressor = None;
        self.actions_this_round.clear();
    }

    /// Total chips on the table: stacks plus everything committed this
    /// hand. Constant across a hand; the conservation invariant.
    #[must_use]
    pub fn total_chips(&self) -> Chips {
        self.seats
            .iter()
            .map(|p| p.chip_stack + p.total_bet_this_hand)
            .sum()
    }
}
