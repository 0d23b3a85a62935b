use rand::Rng;
use uuid::Uuid;

use crate::models::player::Player;
use crate::models::room::{Room, RoomPhase};
use crate::services::error::GameError;
use crate::state::AppState;

// ルームコードは大文字英数字5文字。入力時の小文字は正規化で吸収する。
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 5;
const CODE_ATTEMPTS: usize = 16;

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn generate_player_id() -> String {
    Uuid::new_v4().to_string()
}

// ルーム作成。ホストは最初のプレイヤーとして登録され、host_id は以後変わらない。
// 戻り値は (ルームコード, ホストのプレイヤーID)。
pub async fn create_room(
    state: AppState,
    host_name: &str,
) -> Result<(String, String), GameError> {
    let name = host_name.trim();
    if name.is_empty() {
        return Err(GameError::EmptyName);
    }

    let player_id = generate_player_id();
    // コード衝突はまれなので数回引き直して諦める
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_room_code();
        let host = Player::new(player_id.clone(), name.to_string());
        match state.store.create(Room::new(code.clone(), host)).await {
            Ok(()) => {
                log::info!("room {} created by {}", code, player_id);
                return Ok((code, player_id));
            }
            Err(crate::store::StoreError::RoomCodeTaken(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(GameError::CodeAllocation)
}

// ルーム参加。ロビー中のみ可。戻り値は参加者のプレイヤーID。
pub async fn join_room(state: AppState, code: &str, name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::EmptyName);
    }
    let code = normalize_code(code);
    let player_id = generate_player_id();

    let joining = player_id.clone();
    state
        .store
        .update(&code, move |room| {
            if room.phase != RoomPhase::Lobby {
                return Err(GameError::GameAlreadyStarted);
            }
            room.players
                .insert(joining.clone(), Player::new(joining, name.to_string()));
            Ok(())
        })
        .await?;

    log::info!("player {} joined room {}", player_id, code);
    Ok(player_id)
}

pub async fn get_room(state: &AppState, code: &str) -> Result<Room, GameError> {
    let code = normalize_code(code);
    state
        .store
        .get(&code)
        .await
        .ok_or(GameError::RoomNotFound(code))
}
