use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values. Cards run 2..=14 with 14 for the ace;
/// the ace counts low only inside the wheel straight.
pub type Value = u8;

pub const VALUE_MIN: Value = 2;
pub const VALUE_ACE: Value = 14;

/// A card is a tuple of a value (2u8 ... ace=14u8) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// Source of cards for a hand. The engine never constructs cards itself so
/// tests and simulations can stack the order.
pub trait CardDealer: Send {
    /// Restore the full 52 cards and reorder them for the next hand.
    fn shuffle(&mut self);
    /// Yield the next card. Must never repeat a card within one hand.
    fn deal(&mut self) -> Card;
}

#[derive(Debug)]
pub struct ShuffledDeck {
    cards: [Card; 52],
    deck_idx: usize,
}

impl Default for ShuffledDeck {
    fn default() -> Self {
        let mut cards = [Card(VALUE_MIN, Suit::Club); 52];
        for (i, value) in (VALUE_MIN..=VALUE_ACE).enumerate() {
            for (j, suit) in Suit::ALL.into_iter().enumerate() {
                cards[4 * i + j] = Card(value, suit);
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

impl ShuffledDeck {
    #[must_use]
    pub fn new_shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle();
        deck
    }
}

impl CardDealer for ShuffledDeck {
    fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.deck_idx = 0;
    }

    fn deal(&mut self) -> Card {
        let card = self.cards[self.deck_idx];
        self.deck_idx += 1;
        card
    }
}

/// A dealer that hands out a predetermined card order. Shuffling rewinds to
/// the front of the stack, so every hand replays the same deal.
#[derive(Debug, Clone)]
pub struct StackedDeck {
    cards: Vec<Card>,
    deck_idx: usize,
}

impl StackedDeck {
    #[must_use]
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards, deck_idx: 0 }
    }
}

impl CardDealer for StackedDeck {
    fn shuffle(&mut self) {
        self.deck_idx = 0;
    }

    fn deal(&mut self) -> Card {
        let card = self.cards[self.deck_idx];
        self.deck_idx += 1;
        card
    }
}

/// Type alias for whole chips. All bets and player stacks are represented
/// as whole chips.
///
/// If the total money on a table ever surpasses ~4.2 billion, then we may
/// have a problem.
pub type Chips = u32;

/// Stable identity of a seat. Survives disconnect and reconnect.
pub type PlayerId = Uuid;

/// Identity of a table.
pub type GameId = Uuid;

/// Type alias for seat positions during the game.
pub type SeatIndex = usize;

/// Position tags reassigned from the dealer button at every hand start.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Dealer,
    SmallBlind,
    BigBlind,
    UnderTheGun,
    Middle,
    Cutoff,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Dealer => "button",
            Self::SmallBlind => "small blind",
            Self::BigBlind => "big blind",
            Self::UnderTheGun => "under the gun",
            Self::Middle => "middle",
            Self::Cutoff => "cutoff",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.small, self.big)
    }
}

/// The phases of one hand. `PreFlop` through `River` are betting streets;
/// `HandComplete` doubles as the idle phase between hands.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    HandComplete,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
            Self::HandComplete => "hand complete",
        };
        write!(f, "{repr}")
    }
}

/// A voluntary player action. `Call` may carry the amount the client thinks
/// it is calling; when present it must match the exact call amount.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Fold,
    Check,
    Call(Option<Chips>),
    Bet(Chips),
    Raise(Chips),
    AllIn,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Fold => "folds".to_string(),
            Self::Check => "checks".to_string(),
            Self::Call(_) => "calls".to_string(),
            Self::Bet(amount) => format!("bets {amount}"),
            Self::Raise(amount) => format!("raises to {amount}"),
            Self::AllIn => "all-ins".to_string(),
        };
        write!(f, "{repr}")
    }
}

/// An action stamped with its author and arrival time.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerAction {
    pub player_id: PlayerId,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
}

impl PlayerAction {
    #[must_use]
    pub fn new(player_id: PlayerId, action: Action) -> Self {
        Self {
            player_id,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// A seat at the table.
///
/// Invariants the engine maintains:
/// - `current_bet <= total_bet_this_hand`
/// - `is_all_in` implies `chip_stack == 0`
/// - a folded seat keeps its past contributions in the pot but can never
///   win any of it back
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub chip_stack: Chips,
    pub position: Option<Position>,
    pub hole_cards: Option<[Card; 2]>,
    /// Bet matched so far in the current betting round.
    pub current_bet: Chips,
    /// Everything committed since the hand started, blinds included.
    pub total_bet_this_hand: Chips,
    pub is_active: bool,
    /// Acted since the round started or since the last complete raise.
    pub has_acted: bool,
    pub is_folded: bool,
    pub is_all_in: bool,
    pub is_connected: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, chip_stack: Chips) -> Self {
        Self {
            id,
            name: name.into(),
            chip_stack,
            position: None,
            hole_cards: None,
            current_bet: 0,
            total_bet_this_hand: 0,
            is_active: true,
            has_acted: false,
            is_folded: false,
            is_all_in: false,
            is_connected: true,
        }
    }

    /// Reset everything scoped to a single hand.
    pub fn reset_for_hand(&mut self) {
        self.position = None;
        self.hole_cards = None;
        self.current_bet = 0;
        self.total_bet_this_hand = 0;
        self.has_acted = false;
        self.is_folded = false;
        self.is_all_in = false;
    }

    /// Reset everything scoped to one betting round.
    pub fn reset_for_round(&mut self) {
        self.current_bet = 0;
        self.has_acted = false;
    }

    /// Whether the seat can still take a voluntary action.
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.is_active && !self.is_folded && !self.is_all_in && self.chip_stack > 0
    }

    /// Whether the seat is still contesting the pot.
    #[must_use]
    pub fn in_hand(&self) -> bool {
        self.hole_cards.is_some() && !self.is_folded
    }

    /// Move up to `amount` from the stack into the current bet, flipping
    /// the all-in flag when the stack empties. Returns the amount actually
    /// committed.
    pub fn commit(&mut self, amount: Chips) -> Chips {
        let committed = amount.min(self.chip_stack);
        self.chip_stack -= committed;
        self.current_bet += committed;
        self.total_bet_this_hand += committed;
        if self.chip_stack == 0 {
            self.is_all_in = true;
        }
        committed
    }
}

/// One layer of the pot. Index 0 of the pot list is the main pot.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Pot {
    pub amount: Chips,
    /// Non-folded seats that contributed to this layer, in seat order.
    pub eligible: Vec<PlayerId>,
    pub is_side: bool,
}

impl fmt::Display for Pot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_side { "side pot" } else { "main pot" };
        write!(f, "{kind} of {}", self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_deck_is_distinct() {
        let mut deck = ShuffledDeck::new_shuffled();
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..52 {
            seen.insert(deck.deal());
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn shuffle_rewinds_the_deck() {
        let mut deck = ShuffledDeck::default();
        for _ in 0..10 {
            deck.deal();
        }
        deck.shuffle();
        assert_eq!(deck.deck_idx, 0);
    }

    #[test]
    fn stacked_deck_replays_in_order() {
        let cards = vec![
            Card(14, Suit::Spade),
            Card(13, Suit::Spade),
            Card(2, Suit::Heart),
        ];
        let mut deck = StackedDeck::new(cards.clone());
        assert_eq!(deck.deal(), cards[0]);
        assert_eq!(deck.deal(), cards[1]);
        deck.shuffle();
        assert_eq!(deck.deal(), cards[0]);
    }

    #[test]
    fn commit_clamps_to_stack_and_flags_all_in() {
        let mut player = Player::new(Uuid::new_v4(), "alice", 30);
        let committed = player.commit(50);
        assert_eq!(committed, 30);
        assert_eq!(player.chip_stack, 0);
        assert!(player.is_all_in);
        assert_eq!(player.current_bet, 30);
        assert_eq!(player.total_bet_this_hand, 30);
    }

    #[test]
    fn commit_partial_leaves_player_live() {
        let mut player = Player::new(Uuid::new_v4(), "bob", 100);
        player.commit(40);
        assert!(!player.is_all_in);
        assert!(player.can_act());
        assert_eq!(player.chip_stack, 60);
    }

    #[test]
    fn folded_player_cannot_act() {
        let mut player = Player::new(Uuid::new_v4(), "carol", 100);
        player.is_folded = true;
        assert!(!player.can_act());
    }

    #[test]
    fn reset_for_hand_clears_hand_state_only() {
        let mut player = Player::new(Uuid::new_v4(), "dave", 100);
        player.commit(40);
        player.is_folded = true;
        player.reset_for_hand();
        assert_eq!(player.current_bet, 0);
        assert_eq!(player.total_bet_this_hand, 0);
        assert!(!player.is_folded);
        assert_eq!(player.chip_stack, 60);
    }
}
