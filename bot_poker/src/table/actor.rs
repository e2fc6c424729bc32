//! Table actor with async message handling.
//!
//! Each table is one unit of concurrency: a single task owns the engine
//! and consumes an inbox of commands, so every mutation of the table is
//! serialized. Timers (hand auto-start) live inside the same loop.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until};
use uuid::Uuid;

use super::messages::{TableCommand, TableSummary};
use crate::game::{GameConfig, GameEngine, GameEvent, GameId, PlayerId, ShuffledDeck};
use crate::replay::{ReplayRecorder, ReplaySink, recorder::DEFAULT_QUEUE_CAPACITY};

const INBOX_CAPACITY: usize = 100;

/// Handle for sending commands to a table actor.
#[derive(Clone)]
pub struct TableHandle {
    sender: mpsc::Sender<TableCommand>,
    game_id: GameId,
}

impl TableHandle {
    #[must_use]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Send a command; fails only when the table has shut down.
    pub async fn send(&self, command: TableCommand) -> Result<(), TableClosed> {
        self.sender.send(command).await.map_err(|_| TableClosed)
    }

    /// Send a command and wait for its reply.
    pub async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> TableCommand,
    ) -> Result<T, TableClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| TableClosed)
    }
}

/// The table's inbox is gone; it was removed or crashed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("table is closed")]
pub struct TableClosed;

pub struct TableActor {
    engine: GameEngine,
    inbox: mpsc::Receiver<TableCommand>,
    /// Engine events tee'd to the replay recorder.
    engine_events: mpsc::UnboundedReceiver<GameEvent>,
    recorder: Option<ReplayRecorder>,
    /// Seats queued to leave at the next hand boundary.
    pending_unseat: HashSet<PlayerId>,
    /// When the next hand should auto-start, if scheduled.
    next_start: Option<Instant>,
    closing: bool,
}

impl TableActor {
    /// Build the actor and its handle. `replay_sink`, when present, gets
    /// the table's full event stream through a bounded queue.
    #[must_use]
    pub fn new(config: GameConfig, replay_sink: Option<Arc<dyn ReplaySink>>) -> (Self, TableHandle) {
        let game_id = Uuid::new_v4();
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let mut engine = GameEngine::new(game_id, config, Box::new(ShuffledDeck::new_shuffled()));

        let (event_tx, engine_events) = mpsc::unbounded_channel();
        engine.on_event(event_tx);
        let recorder =
            replay_sink.map(|sink| ReplayRecorder::spawn(sink, DEFAULT_QUEUE_CAPACITY));

        let actor = Self {
            engine,
            inbox,
            engine_events,
            recorder,
            pending_unseat: HashSet::new(),
            next_start: None,
            closing: false,
        };
        let handle = TableHandle { sender, game_id };
        (actor, handle)
    }

    /// Run the table event loop until closed.
    pub async fn run(mut self) {
        let game_id = self.engine.game_id();
        info!("table {game_id} starting");
        loop {
            let next_start = self.next_start;
            tokio::select! {
                maybe = self.inbox.recv() => {
                    match maybe {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                    if self.closing {
                        break;
                    }
                }
                Some(event) = self.engine_events.recv() => {
                    if let Some(recorder) = &self.recorder {
                        recorder.record(event);
                    }
                }
                () = async { sleep_until(next_start.unwrap_or_else(Instant::now)).await },
                        if next_start.is_some() => {
                    self.auto_start_hand();
                }
            }
            self.settle_hand_boundary();
        }
        info!("table {game_id} closed");
    }

    fn handle_command(&mut self, command: TableCommand) {
        match command {
            TableCommand::Seat {
                player_id,
                name,
                chip_stack,
                respond,
            } => {
                let result = self.engine.add_player(player_id, name, chip_stack);
                let _ = respond.send(result);
            }

            TableCommand::Leave { player_id, respond } => {
                self.pending_unseat.remove(&player_id);
                let result = self.engine.remove_player(player_id);
                let _ = respond.send(result);
            }

            TableCommand::DeferUnseat { player_id, respond } => {
                let result = if self.engine.has_player(player_id) {
                    self.pending_unseat.insert(player_id);
                    Ok(())
                } else {
                    Err(crate::game::EngineError::PlayerNotFound)
                };
                let _ = respond.send(result);
            }

            TableCommand::TakeAction { action, respond } => {
                let result = self.engine.process_action(action);
                let _ = respond.send(result);
            }

            TableCommand::ForceAction { player_id, respond } => {
                let result = self.engine.force_player_action(player_id);
                let _ = respond.send(result);
            }

            TableCommand::PossibleActions { player_id, respond } => {
                let _ = respond.send(self.engine.get_possible_actions(player_id));
            }

            TableCommand::GetView {
                perspective,
                respond,
            } => {
                let view = match perspective {
                    crate::game::Perspective::Public => self.engine.get_game_state(),
                    crate::game::Perspective::Complete => self.engine.get_full_game_state(),
                    crate::game::Perspective::Viewer(id) => self.engine.get_bot_game_state(id),
                    crate::game::Perspective::Replay => self.engine.get_replay_state(),
                };
                let _ = respond.send(view);
            }

            TableCommand::Subscribe { sender, respond } => {
                let id = self.engine.on_event(sender);
                let _ = respond.send(id);
            }

            TableCommand::Unsubscribe { id } => {
                self.engine.off_event(id);
            }

            TableCommand::SetConnected {
                player_id,
                connected,
            } => {
                let _ = self.engine.set_player_connected(player_id, connected);
            }

            TableCommand::Summary { respond } => {
                let _ = respond.send(self.summary());
            }

            TableCommand::StartHand { respond } => {
                let result = self.engine.start_hand();
                let _ = respond.send(result);
            }

            TableCommand::Close => {
                self.closing = true;
            }
        }
    }

    fn summary(&self) -> TableSummary {
        let config = self.engine.config();
        let view = self.engine.get_game_state();
        TableSummary {
            game_id: self.engine.game_id(),
            player_count: self.engine.player_count(),
            max_players: config.max_players,
            small_blind: config.small_blind_amount,
            big_blind: config.big_blind_amount,
            turn_time_limit: config.turn_time_limit,
            is_running: self.engine.is_game_running(),
            hand_number: view.hand_number,
            is_tournament: config.is_tournament,
        }
    }

    /// Hand-boundary bookkeeping after every loop turn: apply deferred
    /// unseats and (re)schedule the auto-start timer.
    fn settle_hand_boundary(&mut self) {
        if self.engine.is_game_running() {
            self.next_start = None;
            return;
        }

        if !self.pending_unseat.is_empty() {
            let pending: Vec<PlayerId> = self.pending_unseat.drain().collect();
            for player_id in pending {
                match self.engine.remove_player(player_id) {
                    Ok(stack) => debug!(
                        "table {}: deferred unseat of {player_id} with {stack} chips",
                        self.engine.game_id()
                    ),
                    Err(err) => debug!(
                        "table {}: deferred unseat of {player_id} skipped: {err}",
                        self.engine.game_id()
                    ),
                }
            }
        }

        if self.engine.can_start_hand() {
            if self.next_start.is_none() {
                let delay = Duration::from_millis(self.engine.config().hand_start_delay);
                self.next_start = Some(Instant::now() + delay);
            }
        } else {
            self.next_start = None;
        }
    }

    fn auto_start_hand(&mut self) {
        self.next_start = None;
        if let Err(err) = self.engine.start_hand() {
            warn!(
                "table {}: scheduled hand did not start: {err}",
                self.engine.game_id()
            );
        }
    }
}
