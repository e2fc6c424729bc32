//! Multi-table support: per-table actors and the table registry.

pub mod actor;
pub mod controller;
pub mod messages;

pub use actor::{TableActor, TableClosed, TableHandle};
pub use controller::{ControllerError, EMPTY_TABLE_GC, GameController};
pub use messages::{TableCommand, TableSummary};
