use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use crate::models::room::Room;
use crate::services::room_service::normalize_code;
use crate::state::AppState;

// 購読者に届ける変更通知。毎回ドキュメント全体を載せる。
fn room_update_message(room: &Room) -> Message {
    let payload = serde_json::json!({
        "message_type": "room_update",
        "room_code": room.room_code,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "room": room,
    });
    Message::Text(payload.to_string())
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_code): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let room_code = normalize_code(&room_code);
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_code))
}

pub async fn handle_socket(ws: WebSocket, state: AppState, room_code: String) {
    info!("new subscription for room {}", room_code);

    // 先に購読してから現在値を送る。逆順だと初期送信と購読開始の間の更新を落とす。
    let mut rx = state.store.subscribe(&room_code).await;
    let current = match state.store.get(&room_code).await {
        Some(room) => room,
        None => {
            // 存在しないルーム。エラーを1通送って閉じる。
            let payload = serde_json::json!({
                "message_type": "error",
                "room_code": room_code,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "content": "room not found",
            });
            let mut ws = ws;
            let _ = ws.send(Message::Text(payload.to_string())).await;
            return;
        }
    };

    let (mut sender, mut receiver) = ws.split();
    if sender.send(room_update_message(&current)).await.is_err() {
        return;
    }

    let room_code_for_send = room_code.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(room) => {
                    if let Err(e) = sender.send(room_update_message(&room)).await {
                        info!(
                            "subscriber for room {} went away: {}",
                            room_code_for_send, e
                        );
                        break;
                    }
                }
                // 遅れて取りこぼしても次の通知でドキュメント全体が届くので追いつける
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "subscriber for room {} lagged, skipped {} updates",
                        room_code_for_send,
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // クライアントからの入力は受け付けない（書き込みはHTTP経由）。
    // 切断検知のために読み捨てる。
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // どちらかが終わったらもう片方も畳む
    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!("subscription for room {} closed", room_code);
}
