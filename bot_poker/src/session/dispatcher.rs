//! Per-connection session handling.
//!
//! The dispatcher binds remote bots to seats, translates wire messages
//! into controller calls, fans table events out per viewer, and drives the
//! turn clock. Timers are per connection; a disconnect pauses neither the
//! game nor the clock, so a vanished bot times out and the table moves on.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep};
use uuid::Uuid;

use super::auth::BotAuth;
use super::messages::{ClientMessage, ServerMessage};
use crate::game::{
    Action, GameEvent, GameEventKind, GameId, Perspective, PlayerId, SubscriberId,
};
use crate::table::GameController;

pub type ConnectionId = Uuid;

/// Connections with no inbound traffic for this long are cleaned up.
pub const INACTIVE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Fraction of the turn limit after which the warning fires.
const WARNING_FRACTION: f64 = 0.7;

/// Event kinds that trigger a fresh per-viewer state push.
const REFRESH_KINDS: [GameEventKind; 7] = [
    GameEventKind::HandStarted,
    GameEventKind::ActionTaken,
    GameEventKind::FlopDealt,
    GameEventKind::TurnDealt,
    GameEventKind::RiverDealt,
    GameEventKind::ShowdownComplete,
    GameEventKind::HandComplete,
];

#[derive(Clone, Debug)]
struct Seat {
    player_id: PlayerId,
    game_id: GameId,
    bot_name: String,
    turn_time_limit: f64,
}

struct Subscription {
    game_id: GameId,
    subscriber_id: SubscriberId,
    forward_task: JoinHandle<()>,
}

struct Connection {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    seat: Option<Seat>,
    connected: bool,
    last_activity: Instant,
    turn_timer: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

pub struct SessionDispatcher {
    controller: Arc<GameController>,
    auth: Arc<dyn BotAuth>,
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    /// `(table, bot name)` to seat, the identity that survives reconnects.
    bindings: RwLock<HashMap<(GameId, String), PlayerId>>,
    /// Seat to the connection currently speaking for it.
    seat_connections: RwLock<HashMap<PlayerId, ConnectionId>>,
}

impl SessionDispatcher {
    #[must_use]
    pub fn new(controller: Arc<GameController>, auth: Arc<dyn BotAuth>) -> Self {
        Self {
            controller,
            auth,
            connections: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
            seat_connections: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<GameController> {
        &self.controller
    }

    // === Connection lifecycle ===

    /// Register a fresh transport. `outbound` carries every message the
    /// server pushes to this client.
    pub async fn register(&self, outbound: mpsc::UnboundedSender<ServerMessage>) -> ConnectionId {
        let conn_id = Uuid::new_v4();
        let connection = Connection {
            outbound,
            seat: None,
            connected: true,
            last_activity: Instant::now(),
            turn_timer: None,
            subscription: None,
        };
        self.connections.write().await.insert(conn_id, connection);
        debug!("connection {conn_id} registered");
        conn_id
    }

    /// The transport dropped. The seat, its subscription, and any running
    /// turn timer all stay: the timeout keeps the table moving, and the
    /// seat waits for a reconnect.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let seat = {
            let mut connections = self.connections.write().await;
            match connections.get_mut(&conn_id) {
                Some(connection) => {
                    connection.connected = false;
                    connection.seat.clone()
                }
                None => return,
            }
        };
        info!("connection {conn_id} disconnected");
        if let Some(seat) = seat {
            self.controller.set_connected(seat.player_id, false).await;
        }
    }

    /// Explicit cleanup: tear the connection down completely. Seat
    /// bindings survive so the bot can still reconnect later.
    pub async fn remove_connection(&self, conn_id: ConnectionId) {
        let removed = self.connections.write().await.remove(&conn_id);
        let Some(mut connection) = removed else {
            return;
        };
        if let Some(timer) = connection.turn_timer.take() {
            timer.abort();
        }
        if let Some(subscription) = connection.subscription.take() {
            subscription.forward_task.abort();
            self.controller
                .unsubscribe(subscription.game_id, subscription.subscriber_id)
                .await;
        }
        if let Some(seat) = connection.seat {
            let mut seat_connections = self.seat_connections.write().await;
            if seat_connections.get(&seat.player_id) == Some(&conn_id) {
                seat_connections.remove(&seat.player_id);
            }
        }
        debug!("connection {conn_id} removed");
    }

    /// Drop connections with no inbound traffic for `max_idle`. Returns
    /// how many were removed.
    pub async fn cleanup_inactive(&self, max_idle: Duration) -> usize {
        let stale: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(_, c)| c.last_activity.elapsed() >= max_idle)
                .map(|(id, _)| *id)
                .collect()
        };
        for conn_id in &stale {
            self.remove_connection(*conn_id).await;
        }
        if !stale.is_empty() {
            info!("cleaned up {} inactive connections", stale.len());
        }
        stale.len()
    }

    /// Periodic inactive-connection sweep.
    pub fn spawn_cleanup_task(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                sleep(every).await;
                dispatcher.cleanup_inactive(INACTIVE_CONNECTION_TIMEOUT).await;
            }
        })
    }

    #[must_use]
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    // === Inbound messages ===

    pub async fn handle_message(self: &Arc<Self>, conn_id: ConnectionId, message: ClientMessage) {
        {
            let mut connections = self.connections.write().await;
            let Some(connection) = connections.get_mut(&conn_id) else {
                return;
            };
            connection.last_activity = Instant::now();
        }

        match message {
            ClientMessage::Identify {
                bot_name,
                game_id,
                chip_stack,
                api_key,
            } => {
                self.handle_identify(conn_id, bot_name, game_id, chip_stack, api_key)
                    .await;
            }
            ClientMessage::Reconnect { bot_name, game_id } => {
                let existing = self
                    .bindings
                    .read()
                    .await
                    .get(&(game_id, bot_name.clone()))
                    .copied();
                match existing {
                    Some(player_id) => {
                        self.rebind(conn_id, game_id, bot_name, player_id).await;
                    }
                    None => {
                        self.send_to(
                            conn_id,
                            ServerMessage::IdentificationError {
                                error: "bot is not in a game".to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            ClientMessage::Action { action } => self.handle_action(conn_id, action).await,
            ClientMessage::RequestPossibleActions => {
                let Some(seat) = self.seat_of(conn_id).await else {
                    return self.send_not_in_game(conn_id).await;
                };
                match self.controller.possible_actions(seat.player_id).await {
                    Ok(actions) => {
                        self.send_to(conn_id, ServerMessage::PossibleActions { actions })
                            .await;
                    }
                    Err(err) => {
                        self.send_to(
                            conn_id,
                            ServerMessage::ActionError {
                                error: err.to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            ClientMessage::RequestGameState => {
                let Some(seat) = self.seat_of(conn_id).await else {
                    return self.send_not_in_game(conn_id).await;
                };
                if let Ok(state) = self
                    .controller
                    .view(seat.game_id, Perspective::Viewer(seat.player_id))
                    .await
                {
                    self.send_to(conn_id, ServerMessage::GameState { state }).await;
                }
            }
            ClientMessage::LeaveGame => self.handle_leave(conn_id).await,
            ClientMessage::Unseat => {
                let Some(seat) = self.seat_of(conn_id).await else {
                    return self
                        .send_to(
                            conn_id,
                            ServerMessage::UnseatError {
                                error: "bot is not in a game".to_string(),
                            },
                        )
                        .await;
                };
                match self.controller.defer_unseat(seat.player_id).await {
                    Ok(()) => self.send_to(conn_id, ServerMessage::UnseatConfirmed).await,
                    Err(err) => {
                        self.send_to(
                            conn_id,
                            ServerMessage::UnseatError {
                                error: err.to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            ClientMessage::Ping => self.send_to(conn_id, ServerMessage::Pong).await,
            ClientMessage::ListGames => {
                let games = self.controller.list_games().await;
                self.send_to(conn_id, ServerMessage::GamesList { games }).await;
            }
        }
    }

    async fn handle_identify(
        self: &Arc<Self>,
        conn_id: ConnectionId,
        bot_name: String,
        game_id: GameId,
        chip_stack: u32,
        api_key: Option<String>,
    ) {
        if !self
            .auth
            .validate(&bot_name, api_key.as_deref().unwrap_or_default())
            .await
        {
            return self
                .send_to(
                    conn_id,
                    ServerMessage::IdentificationError {
                        error: "invalid credentials".to_string(),
                    },
                )
                .await;
        }

        // A known (table, name) pair is a reconnect, never a rejection.
        let existing = self
            .bindings
            .read()
            .await
            .get(&(game_id, bot_name.clone()))
            .copied();
        if let Some(player_id) = existing {
            return self.rebind(conn_id, game_id, bot_name, player_id).await;
        }

        if self.seat_of(conn_id).await.is_some() {
            return self
                .send_to(
                    conn_id,
                    ServerMessage::IdentificationError {
                        error: "already identified".to_string(),
                    },
                )
                .await;
        }
        if chip_stack == 0 {
            return self
                .send_to(
                    conn_id,
                    ServerMessage::IdentificationError {
                        error: "invalid stack".to_string(),
                    },
                )
                .await;
        }

        let player_id = Uuid::new_v4();
        let seated = self
            .controller
            .seat_player(game_id, player_id, bot_name.clone(), chip_stack)
            .await;
        if let Err(err) = seated {
            return self
                .send_to(
                    conn_id,
                    ServerMessage::IdentificationError {
                        error: err.to_string(),
                    },
                )
                .await;
        }

        let turn_time_limit = self
            .controller
            .summary(game_id)
            .await
            .map(|s| s.turn_time_limit)
            .unwrap_or_default();
        let seat = Seat {
            player_id,
            game_id,
            bot_name: bot_name.clone(),
            turn_time_limit,
        };
        self.bindings
            .write()
            .await
            .insert((game_id, bot_name.clone()), player_id);
        self.seat_connections
            .write()
            .await
            .insert(player_id, conn_id);
        {
            let mut connections = self.connections.write().await;
            if let Some(connection) = connections.get_mut(&conn_id) {
                connection.seat = Some(seat);
            }
        }
        self.subscribe_connection(conn_id, game_id, player_id).await;

        info!("{bot_name} seated at table {game_id} as {player_id}");
        self.send_to(
            conn_id,
            ServerMessage::IdentificationSuccess {
                game_id,
                player_id,
                bot_name,
            },
        )
        .await;
        if let Ok(state) = self
            .controller
            .view(game_id, Perspective::Viewer(player_id))
            .await
        {
            self.send_to(conn_id, ServerMessage::GameState { state }).await;
        }
    }

    /// Rebind an existing seat to a new transport and resume play.
    async fn rebind(
        self: &Arc<Self>,
        conn_id: ConnectionId,
        game_id: GameId,
        bot_name: String,
        player_id: PlayerId,
    ) {
        let view = match self
            .controller
            .view(game_id, Perspective::Viewer(player_id))
            .await
        {
            Ok(view) => view,
            Err(err) => {
                return self
                    .send_to(
                        conn_id,
                        ServerMessage::IdentificationError {
                            error: err.to_string(),
                        },
                    )
                    .await;
            }
        };
        if !view.seats.iter().any(|s| s.id == player_id) {
            // The seat left while the binding lingered; start fresh.
            self.bindings
                .write()
                .await
                .remove(&(game_id, bot_name.clone()));
            return self
                .send_to(
                    conn_id,
                    ServerMessage::IdentificationError {
                        error: "bot is not in a game".to_string(),
                    },
                )
                .await;
        }

        let turn_time_limit = self
            .controller
            .summary(game_id)
            .await
            .map(|s| s.turn_time_limit)
            .unwrap_or_default();
        let seat = Seat {
            player_id,
            game_id,
            bot_name: bot_name.clone(),
            turn_time_limit,
        };
        self.seat_connections
            .write()
            .await
            .insert(player_id, conn_id);
        {
            let mut connections = self.connections.write().await;
            if let Some(connection) = connections.get_mut(&conn_id) {
                connection.seat = Some(seat.clone());
                connection.connected = true;
            }
        }
        self.subscribe_connection(conn_id, game_id, player_id).await;
        self.controller.set_connected(player_id, true).await;

        info!("{bot_name} reconnected to table {game_id}");
        self.send_to(
            conn_id,
            ServerMessage::IdentificationSuccess {
                game_id,
                player_id,
                bot_name,
            },
        )
        .await;
        self.send_to(
            conn_id,
            ServerMessage::GameState {
                state: view.clone(),
            },
        )
        .await;
        if view.current_player_to_act == Some(player_id) {
            self.start_turn_timer(conn_id, &seat).await;
        }
    }

    async fn handle_action(self: &Arc<Self>, conn_id: ConnectionId, wire: super::messages::WireAction) {
        let Some(seat) = self.seat_of(conn_id).await else {
            return self
                .send_to(
                    conn_id,
                    ServerMessage::ActionError {
                        error: "bot is not in a game".to_string(),
                    },
                )
                .await;
        };
        let action = match Action::try_from(wire) {
            Ok(action) => action,
            Err(err) => {
                return self
                    .send_to(
                        conn_id,
                        ServerMessage::ActionError {
                            error: err.to_string(),
                        },
                    )
                    .await;
            }
        };
        match self.controller.take_action(seat.player_id, action).await {
            Ok(()) => {
                // A processed action ends the turn and its clock.
                self.cancel_turn_timer(conn_id).await;
                self.send_to(conn_id, ServerMessage::ActionSuccess).await;
            }
            Err(err) => {
                self.send_to(
                    conn_id,
                    ServerMessage::ActionError {
                        error: err.to_string(),
                    },
                )
                .await;
            }
        }
    }

    async fn handle_leave(self: &Arc<Self>, conn_id: ConnectionId) {
        let Some(seat) = self.seat_of(conn_id).await else {
            return self.send_not_in_game(conn_id).await;
        };
        self.cancel_turn_timer(conn_id).await;
        match self.controller.leave_game(seat.player_id).await {
            Ok(chip_stack) => {
                self.unbind_seat(conn_id, &seat).await;
                self.send_to(conn_id, ServerMessage::LeftGame { chip_stack })
                    .await;
            }
            Err(err) => {
                self.send_to(
                    conn_id,
                    ServerMessage::ActionError {
                        error: err.to_string(),
                    },
                )
                .await;
            }
        }
    }

    // === Event fan-out ===

    async fn subscribe_connection(
        self: &Arc<Self>,
        conn_id: ConnectionId,
        game_id: GameId,
        _player_id: PlayerId,
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel::<GameEvent>();
        let Ok(subscriber_id) = self.controller.subscribe(game_id, tx).await else {
            return;
        };
        let dispatcher = Arc::clone(self);
        let forward_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatcher.on_game_event(conn_id, event).await;
            }
        });

        let old = {
            let mut connections = self.connections.write().await;
            match connections.get_mut(&conn_id) {
                Some(connection) => connection.subscription.replace(Subscription {
                    game_id,
                    subscriber_id,
                    forward_task,
                }),
                None => {
                    forward_task.abort();
                    self.controller.unsubscribe(game_id, subscriber_id).await;
                    return;
                }
            }
        };
        if let Some(old) = old {
            old.forward_task.abort();
            self.controller
                .unsubscribe(old.game_id, old.subscriber_id)
                .await;
        }
    }

    /// One table event for one connection: wrap it, refresh the viewer
    /// projection where the protocol asks for it, and drive the turn
    /// clock. Disconnected connections are skipped, not unsubscribed.
    async fn on_game_event(self: &Arc<Self>, conn_id: ConnectionId, event: GameEvent) {
        let (connected, seat) = {
            let connections = self.connections.read().await;
            match connections.get(&conn_id) {
                Some(connection) => (connection.connected, connection.seat.clone()),
                None => return,
            }
        };
        let Some(seat) = seat else {
            return;
        };

        if event.kind == GameEventKind::PlayerLeft && event.player_id == Some(seat.player_id) {
            // Our seat left the table (deferred unseat applied).
            self.unbind_seat(conn_id, &seat).await;
            return;
        }
        if !connected {
            return;
        }

        let kind = event.kind;
        self.send_to(conn_id, ServerMessage::GameEvent { event }).await;

        if REFRESH_KINDS.contains(&kind)
            && let Ok(state) = self
                .controller
                .view(seat.game_id, Perspective::Viewer(seat.player_id))
                .await
        {
            let next = state.current_player_to_act;
            self.send_to(conn_id, ServerMessage::GameState { state }).await;
            if next == Some(seat.player_id) {
                self.start_turn_timer(conn_id, &seat).await;
            } else {
                self.cancel_turn_timer(conn_id).await;
            }
        }
    }

    /// Forget a seat everywhere: binding, seat index, subscription.
    async fn unbind_seat(&self, conn_id: ConnectionId, seat: &Seat) {
        self.bindings
            .write()
            .await
            .remove(&(seat.game_id, seat.bot_name.clone()));
        {
            let mut seat_connections = self.seat_connections.write().await;
            if seat_connections.get(&seat.player_id) == Some(&conn_id) {
                seat_connections.remove(&seat.player_id);
            }
        }
        let subscription = {
            let mut connections = self.connections.write().await;
            match connections.get_mut(&conn_id) {
                Some(connection) => {
                    connection.seat = None;
                    if let Some(timer) = connection.turn_timer.take() {
                        timer.abort();
                    }
                    connection.subscription.take()
                }
                None => None,
            }
        };
        if let Some(subscription) = subscription {
            subscription.forward_task.abort();
            self.controller
                .unsubscribe(subscription.game_id, subscription.subscriber_id)
                .await;
        }
        self.controller.unindex_seat(seat.player_id).await;
    }

    // === Turn timers ===

    /// Arm the clock for this seat's turn. A non-positive limit times out
    /// immediately; the 70% warning only fires for limits above one
    /// second.
    async fn start_turn_timer(self: &Arc<Self>, conn_id: ConnectionId, seat: &Seat) {
        let limit = seat.turn_time_limit;
        let player_id = seat.player_id;
        self.send_to(conn_id, ServerMessage::TurnStart { time_limit: limit })
            .await;

        let dispatcher = Arc::clone(self);
        let timer = tokio::spawn(async move {
            if limit > 1.0 {
                sleep(Duration::from_secs_f64(limit * WARNING_FRACTION)).await;
                dispatcher
                    .send_to(
                        conn_id,
                        ServerMessage::TurnWarning {
                            time_remaining: limit * (1.0 - WARNING_FRACTION),
                        },
                    )
                    .await;
                sleep(Duration::from_secs_f64(limit * (1.0 - WARNING_FRACTION))).await;
            } else if limit > 0.0 {
                sleep(Duration::from_secs_f64(limit)).await;
            }
            dispatcher.send_to(conn_id, ServerMessage::TurnTimeout).await;
            if let Err(err) = dispatcher.controller.force_player_action(player_id).await {
                // The force action must never unwind the session.
                warn!("force action for {player_id} failed: {err}");
                dispatcher
                    .send_to(
                        conn_id,
                        ServerMessage::ForceActionError {
                            error: err.to_string(),
                        },
                    )
                    .await;
            }
        });

        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&conn_id) {
            if let Some(previous) = connection.turn_timer.replace(timer) {
                previous.abort();
            }
        } else {
            timer.abort();
        }
    }

    async fn cancel_turn_timer(&self, conn_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&conn_id)
            && let Some(timer) = connection.turn_timer.take()
        {
            timer.abort();
        }
    }

    // === Helpers ===

    async fn seat_of(&self, conn_id: ConnectionId) -> Option<Seat> {
        let connections = self.connections.read().await;
        connections.get(&conn_id).and_then(|c| c.seat.clone())
    }

    /// Push a message to a connection, skipping it while disconnected.
    async fn send_to(&self, conn_id: ConnectionId, message: ServerMessage) {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&conn_id) {
            if !connection.connected {
                return;
            }
            let _ = connection.outbound.send(message);
        }
    }

    async fn send_not_in_game(&self, conn_id: ConnectionId) {
        self.send_to(
            conn_id,
            ServerMessage::ActionError {
                error: "bot is not in a game".to_string(),
            },
        )
        .await;
    }
}
