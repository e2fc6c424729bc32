//! Read-only table discovery endpoints.

use axum::{Json, extract::State};
use bot_poker::table::TableSummary;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub tables: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        tables: state.controller.table_count().await,
    })
}

pub async fn list_games(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.controller.list_games().await)
}
