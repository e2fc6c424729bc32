//! Session handling: connections, wire protocol, turn timers.

pub mod auth;
pub mod dispatcher;
pub mod messages;

pub use auth::{AllowAllAuth, BotAuth, StaticKeyAuth};
pub use dispatcher::{ConnectionId, INACTIVE_CONNECTION_TIMEOUT, SessionDispatcher};
pub use messages::{ClientMessage, ServerMessage, WireAction};
