//! Table registry and lifecycle management.
//!
//! The controller owns the table directory and the seat index, spawns one
//! actor per table, and garbage-collects tables that sit empty. Registry
//! locks are never held across engine work: every table operation goes
//! through the actor's inbox.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::actor::{TableActor, TableClosed, TableHandle};
use super::messages::{TableCommand, TableSummary};
use crate::game::{
    Action, Chips, ConfigError, EngineError, GameConfig, GameEvent, GameId, GameStateView,
    Perspective, PlayerAction, PlayerId, PossibleAction, SubscriberId,
};
use crate::replay::ReplaySink;

/// How long a table may sit with no seats before it is removed. A join
/// inside the window cancels the collection.
pub const EMPTY_TABLE_GC: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("game with ID {0} not found")]
    GameNotFound(GameId),
    #[error("bot is not in a game")]
    NotInGame,
    #[error(transparent)]
    TableClosed(#[from] TableClosed),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct GameController {
    tables: RwLock<HashMap<GameId, TableHandle>>,
    seat_index: RwLock<HashMap<PlayerId, GameId>>,
    gc_tasks: Mutex<HashMap<GameId, JoinHandle<()>>>,
    replay_sink: Option<Arc<dyn ReplaySink>>,
}

impl GameController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            seat_index: RwLock::new(HashMap::new()),
            gc_tasks: Mutex::new(HashMap::new()),
            replay_sink: None,
        }
    }

    /// Route every table's event stream into a replay sink.
    #[must_use]
    pub fn with_replay_sink(sink: Arc<dyn ReplaySink>) -> Self {
        Self {
            replay_sink: Some(sink),
            ..Self::new()
        }
    }

    // === Registry ===

    /// Create and spawn a new table.
    pub async fn create_game(&self, config: GameConfig) -> Result<GameId, ControllerError> {
        config.validate()?;
        let (actor, handle) = TableActor::new(config, self.replay_sink.clone());
        let game_id = handle.game_id();

        let mut tables = self.tables.write().await;
        tables.insert(game_id, handle);
        drop(tables);

        tokio::spawn(actor.run());
        info!("created table {game_id}");
        Ok(game_id)
    }

    /// Close a table and drop every index entry pointing at it. Cancels
    /// any pending empty-table collection.
    pub async fn remove_game(&self, game_id: GameId) -> Result<(), ControllerError> {
        let handle = {
            let mut tables = self.tables.write().await;
            tables
                .remove(&game_id)
                .ok_or(ControllerError::GameNotFound(game_id))?
        };
        if let Some(task) = self.gc_tasks.lock().await.remove(&game_id) {
            task.abort();
        }
        let mut seats = self.seat_index.write().await;
        seats.retain(|_, g| *g != game_id);
        drop(seats);

        // Best effort; the table may already be gone.
        let _ = handle.send(TableCommand::Close).await;
        info!("removed table {game_id}");
        Ok(())
    }

    pub async fn handle(&self, game_id: GameId) -> Result<TableHandle, ControllerError> {
        let tables = self.tables.read().await;
        tables
            .get(&game_id)
            .cloned()
            .ok_or(ControllerError::GameNotFound(game_id))
    }

    #[must_use]
    pub async fn game_of(&self, player_id: PlayerId) -> Option<GameId> {
        self.seat_index.read().await.get(&player_id).copied()
    }

    #[must_use]
    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn summary(&self, game_id: GameId) -> Result<TableSummary, ControllerError> {
        let handle = self.handle(game_id).await?;
        let summary = handle
            .request(|respond| TableCommand::Summary { respond })
            .await?;
        Ok(summary)
    }

    pub async fn list_games(&self) -> Vec<TableSummary> {
        let handles: Vec<TableHandle> = {
            let tables = self.tables.read().await;
            tables.values().cloned().collect()
        };
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(summary) = handle
                .request(|respond| TableCommand::Summary { respond })
                .await
            {
                summaries.push(summary);
            }
        }
        summaries
    }

    // === Seating ===

    /// Seat a player at a table and index the seat. A join cancels any
    /// pending empty-table collection.
    pub async fn seat_player(
        self: &Arc<Self>,
        game_id: GameId,
        player_id: PlayerId,
        name: impl Into<String>,
        chip_stack: Chips,
    ) -> Result<(), ControllerError> {
        let handle = self.handle(game_id).await?;
        let name = name.into();
        handle
            .request(|respond| TableCommand::Seat {
                player_id,
                name,
                chip_stack,
                respond,
            })
            .await??;

        if let Some(task) = self.gc_tasks.lock().await.remove(&game_id) {
            debug!("table {game_id}: join cancelled pending removal");
            task.abort();
        }
        self.seat_index.write().await.insert(player_id, game_id);
        Ok(())
    }

    /// Remove a player immediately; returns the stack they cash out.
    pub async fn leave_game(self: &Arc<Self>, player_id: PlayerId) -> Result<Chips, ControllerError> {
        let game_id = self
            .game_of(player_id)
            .await
            .ok_or(ControllerError::NotInGame)?;
        let handle = self.handle(game_id).await?;
        let stack = handle
            .request(|respond| TableCommand::Leave { player_id, respond })
            .await??;
        self.unindex_seat(player_id).await;
        Ok(stack)
    }

    /// Queue a seat to leave at the next hand boundary.
    pub async fn defer_unseat(&self, player_id: PlayerId) -> Result<(), ControllerError> {
        let game_id = self
            .game_of(player_id)
            .await
            .ok_or(ControllerError::NotInGame)?;
        let handle = self.handle(game_id).await?;
        handle
            .request(|respond| TableCommand::DeferUnseat { player_id, respond })
            .await??;
        Ok(())
    }

    /// Drop a seat's index entry once it actually left the table, and
    /// start the empty-table clock when that was the last seat.
    pub async fn unindex_seat(self: &Arc<Self>, player_id: PlayerId) {
        let game_id = {
            let mut seats = self.seat_index.write().await;
            seats.remove(&player_id)
        };
        if let Some(game_id) = game_id {
            self.maybe_schedule_gc(game_id).await;
        }
    }

    /// Schedule removal of a table that has no seats. Re-checked at expiry
    /// so a join inside the window survives.
    async fn maybe_schedule_gc(self: &Arc<Self>, game_id: GameId) {
        let Ok(handle) = self.handle(game_id).await else {
            return;
        };
        let Ok(summary) = handle
            .request(|respond| TableCommand::Summary { respond })
            .await
        else {
            return;
        };
        if summary.player_count > 0 {
            return;
        }

        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(EMPTY_TABLE_GC).await;
            // Deregister first: remove_game aborts whatever task is still
            // registered for this table, and that must not be us.
            controller.gc_tasks.lock().await.remove(&game_id);
            let still_empty = match controller.handle(game_id).await {
                Ok(handle) => handle
                    .request(|respond| TableCommand::Summary { respond })
                    .await
                    .map(|s| s.player_count == 0)
                    .unwrap_or(false),
                Err(_) => false,
            };
            if still_empty {
                debug!("table {game_id}: empty past grace period, removing");
                let _ = controller.remove_game(game_id).await;
            }
        });
        let mut tasks = self.gc_tasks.lock().await;
        if let Some(previous) = tasks.insert(game_id, task) {
            previous.abort();
        }
    }

    // === Game operations ===

    pub async fn take_action(
        &self,
        player_id: PlayerId,
        action: Action,
    ) -> Result<(), ControllerError> {
        let game_id = self
            .game_of(player_id)
            .await
            .ok_or(ControllerError::NotInGame)?;
        let handle = self.handle(game_id).await?;
        handle
            .request(|respond| TableCommand::TakeAction {
                action: PlayerAction::new(player_id, action),
                respond,
            })
            .await??;
        Ok(())
    }

    /// Apply a seat's timeout default action.
    pub async fn force_player_action(&self, player_id: PlayerId) -> Result<Action, ControllerError> {
        let game_id = self
            .game_of(player_id)
            .await
            .ok_or(ControllerError::NotInGame)?;
        let handle = self.handle(game_id).await?;
        let action = handle
            .request(|respond| TableCommand::ForceAction { player_id, respond })
            .await??;
        Ok(action)
    }

    pub async fn possible_actions(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<PossibleAction>, ControllerError> {
        let game_id = self
            .game_of(player_id)
            .await
            .ok_or(ControllerError::NotInGame)?;
        let handle = self.handle(game_id).await?;
        let actions = handle
            .request(|respond| TableCommand::PossibleActions { player_id, respond })
            .await??;
        Ok(actions)
    }

    /// The viewer projection for a seated bot.
    pub async fn game_state_for(
        &self,
        player_id: PlayerId,
    ) -> Result<GameStateView, ControllerError> {
        let game_id = self
            .game_of(player_id)
            .await
            .ok_or(ControllerError::NotInGame)?;
        self.view(game_id, Perspective::Viewer(player_id)).await
    }

    pub async fn view(
        &self,
        game_id: GameId,
        perspective: Perspective,
    ) -> Result<GameStateView, ControllerError> {
        let handle = self.handle(game_id).await?;
        let view = handle
            .request(|respond| TableCommand::GetView {
                perspective,
                respond,
            })
            .await?;
        Ok(view)
    }

    // === Events ===

    pub async fn subscribe(
        &self,
        game_id: GameId,
        sender: mpsc::UnboundedSender<GameEvent>,
    ) -> Result<SubscriberId, ControllerError> {
        let handle = self.handle(game_id).await?;
        let id = handle
            .request(|respond| TableCommand::Subscribe { sender, respond })
            .await?;
        Ok(id)
    }

    /// Record whether a seat's transport is live. Best effort.
    pub async fn set_connected(&self, player_id: PlayerId, connected: bool) {
        if let Some(game_id) = self.game_of(player_id).await
            && let Ok(handle) = self.handle(game_id).await
        {
            let _ = handle
                .send(TableCommand::SetConnected {
                    player_id,
                    connected,
                })
                .await;
        }
    }

    pub async fn unsubscribe(&self, game_id: GameId, id: SubscriberId) {
        if let Ok(handle) = self.handle(game_id).await {
            let _ = handle.send(TableCommand::Unsubscribe { id }).await;
        }
    }

    /// Start a hand immediately, for tools and tests that skip the
    /// auto-start delay.
    pub async fn start_hand(&self, game_id: GameId) -> Result<(), ControllerError> {
        let handle = self.handle(game_id).await?;
        handle
            .request(|respond| TableCommand::StartHand { respond })
            .await??;
        Ok(())
    }
}

impl Default for GameController {
    fn default() -> Self {
        Self::new()
    }
}
