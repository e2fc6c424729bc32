//! # Bot Poker
//!
//! A multi-table No-Limit Texas Hold'em core for remote bot clients.
//!
//! Each table is a single unit of concurrency: one actor task owns the
//! [`game::GameEngine`] and serializes every mutation (client messages,
//! timer expiries, and admin commands) through its inbox. The
//! [`table::GameController`] is the table directory; the
//! [`session::SessionDispatcher`] binds transports to seats, drives turn
//! clocks, and fans redacted state out per viewer.
//!
//! ## Core Modules
//!
//! - [`game`]: entities, hand evaluation, betting rules, pots, and the
//!   per-table engine
//! - [`table`]: table actors and the registry
//! - [`session`]: connection lifecycle, wire protocol, turn timers
//! - [`replay`]: fire-and-forget event persistence
//!
//! ## Example
//!
//! ```
//! use bot_poker::game::{GameConfig, GameEngine, ShuffledDeck};
//! use uuid::Uuid;
//!
//! let deck = Box::new(ShuffledDeck::new_shuffled());
//! let mut engine = GameEngine::new(Uuid::new_v4(), GameConfig::default(), deck);
//! engine.add_player(Uuid::new_v4(), "marvin", 1_000).unwrap();
//! ```

pub mod game;
pub mod replay;
pub mod session;
pub mod table;

pub use game::{
    Action, ActionError, Card, Chips, EngineError, GameConfig, GameEngine, GameEvent, GameId,
    GamePhase, GameStateView, HandCategory, HandRank, Perspective, PlayerId, PossibleAction,
};
pub use replay::{MemorySink, ReplayRecorder, ReplaySink};
pub use session::{AllowAllAuth, BotAuth, ClientMessage, ServerMessage, SessionDispatcher};
pub use table::{ControllerError, GameController, TableSummary};
