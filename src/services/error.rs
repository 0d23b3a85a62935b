use axum::http::StatusCode;

use crate::models::room::{RoomPhase, RulesError};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("a display name is required")]
    EmptyName,
    #[error("room '{0}' was not found")]
    RoomNotFound(String),
    #[error("failed to allocate an unused room code")]
    CodeAllocation,
    #[error("the game has already started")]
    GameAlreadyStarted,
    #[error("only the host can do that")]
    NotHost,
    #[error("need at least 3 players to start, have {have}")]
    NotEnoughPlayers { have: usize },
    #[error("that is not allowed while the room is in the {actual:?} phase")]
    WrongPhase { actual: RoomPhase },
    #[error("the phase was already resolved by another request")]
    PhaseConflict,
    #[error("not every required submission is in yet")]
    PhaseNotComplete,
    #[error("player '{0}' is not in this room")]
    PlayerNotFound(String),
    #[error("dead players cannot act")]
    DeadActor,
    #[error("the target is already dead")]
    DeadTarget,
    #[error("you cannot target yourself")]
    SelfTarget,
    #[error("your role cannot perform that action")]
    WrongAbility,
    // ルール適用中の内部整合性エラー。ユーザーには詳細を返さない。
    #[error("internal consistency error: {0}")]
    Inconsistency(#[from] RulesError),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(code) => GameError::RoomNotFound(code),
            StoreError::RoomCodeTaken(_) => GameError::CodeAllocation,
            StoreError::PhaseConflict { .. } => GameError::PhaseConflict,
        }
    }
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            GameError::NotHost => StatusCode::FORBIDDEN,
            // CASに負けた側。勝った側が既に解決済みなので実害はない。
            GameError::PhaseConflict => StatusCode::CONFLICT,
            GameError::CodeAllocation | GameError::Inconsistency(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
