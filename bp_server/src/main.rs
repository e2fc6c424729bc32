//! Multi-table poker server for remote bot clients.
//!
//! Spawns one actor task per table under a shared controller, binds bot
//! WebSocket connections through the session dispatcher, and serves a
//! small read-only HTTP surface for discovery.

mod api;
mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use pico_args::Arguments;
use tracing::{error, info};

use bot_poker::session::{AllowAllAuth, SessionDispatcher};
use bot_poker::table::GameController;
use config::ServerConfig;

const HELP: &str = "\
Run a multi-table poker server for bot clients

USAGE:
  bp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:7777]
  --tables     N           Number of tables to create  [default: env MAX_TABLES or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                Server bind address (e.g., 0.0.0.0:8080)
  MAX_TABLES                 Number of tables created at startup
  TABLE_MAX_PLAYERS          Seats per table (2-10)
  TABLE_SMALL_BLIND          Small blind amount
  TABLE_BIG_BLIND            Big blind amount
  TABLE_TURN_TIME_LIMIT      Seconds per decision (fractional allowed)
  TABLE_HAND_START_DELAY_MS  Delay between hands in milliseconds
  RUST_LOG                   Log filter (e.g., debug, bot_poker=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env if present.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    logging::init();

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let tables_override: Option<usize> = pargs.opt_value_from_str("--tables")?;
    let server_config = ServerConfig::from_env(bind_override, tables_override)?;
    server_config.validate()?;

    let controller = Arc::new(GameController::new());
    let dispatcher = Arc::new(SessionDispatcher::new(
        controller.clone(),
        Arc::new(AllowAllAuth),
    ));
    let _cleanup_task = dispatcher.spawn_cleanup_task(std::time::Duration::from_secs(60));

    info!("creating {} initial table(s)", server_config.num_tables);
    for i in 0..server_config.num_tables {
        match controller
            .create_game(server_config.table_defaults.clone())
            .await
        {
            Ok(game_id) => info!("table {} ready: {game_id}", i + 1),
            Err(err) => error!("failed to create table {}: {err}", i + 1),
        }
    }

    let state = api::AppState {
        dispatcher,
        controller,
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(server_config.bind)
        .await
        .map_err(|err| anyhow::anyhow!("failed to bind {}: {err}", server_config.bind))?;
    info!(
        "server running at http://{} (WebSocket at /ws); press Ctrl+C to stop",
        server_config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| anyhow::anyhow!("server error: {err}"))?;

    info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
}
