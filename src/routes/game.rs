use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::models::action::NightActionKind;
use crate::{
    services::{game_service, room_service},
    state::AppState,
};

// ホスト専用操作の共通リクエスト
#[derive(Debug, Serialize, Deserialize)]
pub struct HostActionRequest {
    pub player_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NightActionRequest {
    pub player_id: String,
    pub kind: NightActionKind,
    pub target_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: String,
    pub target_id: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:code",
            Router::new()
                // ゲームの基本操作
                .route("/start", post(start_game))
                .route("/begin-night", post(begin_night))
                .route("/state", get(get_game_state))
                // プレイヤーの提出
                .nest(
                    "/actions",
                    Router::new()
                        .route("/night-action", post(night_action_handler))
                        .route("/vote", post(vote_handler)),
                )
                // ゲーム進行の管理（ホスト専用）
                .route("/phase/resolve", post(resolve_phase_handler))
                .route("/phase/force", post(force_resolve_handler))
                .route("/phase/next", post(advance_phase_handler)),
        )
        .with_state(state)
}

fn reply(result: Result<(), crate::services::error::GameError>, ok_message: &str) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(ok_message.to_string())).into_response(),
        Err(e) => {
            // 整合性エラーはルームが壊れている兆候なので必ずログに残す
            if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
                log::error!("internal error: {}", e);
            }
            (e.status(), Json(e.to_string())).into_response()
        }
    }
}

async fn start_game(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<HostActionRequest>,
) -> Response {
    reply(
        game_service::start_game(state, &code, &req.player_id).await,
        "Game started successfully",
    )
}

async fn begin_night(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<HostActionRequest>,
) -> Response {
    reply(
        game_service::begin_night(state, &code, &req.player_id).await,
        "Night has fallen",
    )
}

async fn get_game_state(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    match room_service::get_room(&state, &code).await {
        Ok(room) => (StatusCode::OK, Json(room)).into_response(),
        Err(e) => (e.status(), Json(e.to_string())).into_response(),
    }
}

async fn night_action_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<NightActionRequest>,
) -> Response {
    reply(
        game_service::submit_night_action(state, &code, &req.player_id, req.kind, &req.target_id)
            .await,
        "Action submitted",
    )
}

async fn vote_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Response {
    reply(
        game_service::submit_vote(state, &code, &req.voter_id, &req.target_id).await,
        "Vote submitted",
    )
}

async fn resolve_phase_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<HostActionRequest>,
) -> Response {
    reply(
        game_service::resolve_phase(state, &code, &req.player_id).await,
        "Phase resolved",
    )
}

async fn force_resolve_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<HostActionRequest>,
) -> Response {
    reply(
        game_service::force_resolve(state, &code, &req.player_id).await,
        "Phase resolved (forced)",
    )
}

async fn advance_phase_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<HostActionRequest>,
) -> Response {
    reply(
        game_service::advance_from_results(state, &code, &req.player_id).await,
        "Advanced to the next phase",
    )
}
