use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{services::room_service, state::AppState, utils::websocket};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub host_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_code: String,
    pub player_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub player_id: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // ルーム作成
        // curl -X POST http://localhost:8080/api/room/create -H 'Content-Type: application/json' -d '{"host_name":"Alice"}'
        .route("/create", post(create_room))
        // ルーム情報取得
        // curl http://localhost:8080/api/room/{code}
        .route("/:code", get(get_room))
        // ルーム参加
        // curl -X POST http://localhost:8080/api/room/{code}/join -H 'Content-Type: application/json' -d '{"name":"Bob"}'
        .route("/:code/join", post(join_room))
        // 変更通知の購読
        // websocat ws://localhost:8080/api/room/{code}/ws
        .route("/:code/ws", get(websocket::handler))
        .with_state(state)
}

async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Response {
    match room_service::create_room(state, &req.host_name).await {
        Ok((room_code, player_id)) => (
            StatusCode::OK,
            Json(CreateRoomResponse {
                room_code,
                player_id,
            }),
        )
            .into_response(),
        Err(e) => (e.status(), Json(e.to_string())).into_response(),
    }
}

async fn join_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Response {
    match room_service::join_room(state, &code, &req.name).await {
        Ok(player_id) => (StatusCode::OK, Json(JoinRoomResponse { player_id })).into_response(),
        Err(e) => (e.status(), Json(e.to_string())).into_response(),
    }
}

async fn get_room(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    match room_service::get_room(&state, &code).await {
        Ok(room) => (StatusCode::OK, Json(room)).into_response(),
        Err(e) => (e.status(), Json(e.to_string())).into_response(),
    }
}
