//! Core game logic: entities, rules, and the per-table engine.

pub mod config;
pub mod engine;
pub mod entities;
pub mod evaluator;
pub mod events;
pub mod pot;
pub mod state;
pub mod validator;
pub mod view;

pub use config::{ConfigError, GameConfig, MAX_PLAYERS, MIN_PLAYERS};
pub use engine::{EngineError, GameEngine, SubscriberId};
pub use entities::{
    Action, Blinds, Card, CardDealer, Chips, GameId, GamePhase, Player, PlayerAction, PlayerId,
    Position, Pot, SeatIndex, ShuffledDeck, StackedDeck, Suit, Value,
};
pub use evaluator::{EvaluatorError, HandCategory, HandRank};
pub use events::{DecisionContext, GameEvent, GameEventKind, SequenceId};
pub use pot::{PotAward, PotManager};
pub use state::GameState;
pub use validator::{ActionError, PossibleAction};
pub use view::{GameStateView, Perspective, PlayerView};
