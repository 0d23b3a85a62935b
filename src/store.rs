use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::models::room::{Room, RoomPhase};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room code '{0}' is already taken")]
    RoomCodeTaken(String),
    #[error("room '{0}' was not found")]
    RoomNotFound(String),
    #[error("room '{code}' is in phase {actual:?}, expected {expected:?}")]
    PhaseConflict {
        code: String,
        expected: RoomPhase,
        actual: RoomPhase,
    },
}

// ルームごとの共有ドキュメントストア。
// 書き込みはすべてこのモジュール経由で行い、変更のたびに購読者へ
// ドキュメント全体のスナップショットを配信する。
#[derive(Clone)]
pub struct RoomStore {
    rooms: Arc<Mutex<HashMap<String, Room>>>,
    watchers: Arc<Mutex<HashMap<String, broadcast::Sender<Room>>>>,
}

impl RoomStore {
    pub fn new() -> Self {
        RoomStore {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            watchers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // コードが既に使われていたら失敗する
    pub async fn create(&self, room: Room) -> Result<(), StoreError> {
        let snapshot = {
            let mut rooms = self.rooms.lock().await;
            if rooms.contains_key(&room.room_code) {
                return Err(StoreError::RoomCodeTaken(room.room_code));
            }
            let snapshot = room.clone();
            rooms.insert(room.room_code.clone(), room);
            snapshot
        };
        self.notify(&snapshot).await;
        Ok(())
    }

    pub async fn get(&self, code: &str) -> Option<Room> {
        self.rooms.lock().await.get(code).cloned()
    }

    // 部分更新。クロージャがErrを返したらドキュメントは一切変更されない
    // （ドラフトに適用して成功時だけコミットする）。
    pub async fn update<T, E>(
        &self,
        code: &str,
        f: impl FnOnce(&mut Room) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let (out, snapshot) = {
            let mut rooms = self.rooms.lock().await;
            let room = rooms
                .get_mut(code)
                .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))?;
            let mut draft = room.clone();
            let out = f(&mut draft)?;
            *room = draft;
            (out, room.clone())
        };
        self.notify(&snapshot).await;
        Ok(out)
    }

    // 条件付き更新（フェーズ解決用のCAS）。現在のフェーズが expected と
    // 一致するときだけクロージャを適用する。負けた側は PhaseConflict を受け取り、
    // ドキュメントには何も書かれない。
    pub async fn conditional_update<T, E>(
        &self,
        code: &str,
        expected: RoomPhase,
        f: impl FnOnce(&mut Room) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let (out, snapshot) = {
            let mut rooms = self.rooms.lock().await;
            let room = rooms
                .get_mut(code)
                .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))?;
            if room.phase != expected {
                return Err(StoreError::PhaseConflict {
                    code: code.to_string(),
                    expected,
                    actual: room.phase,
                }
                .into());
            }
            let mut draft = room.clone();
            let out = f(&mut draft)?;
            *room = draft;
            (out, room.clone())
        };
        self.notify(&snapshot).await;
        Ok(out)
    }

    // 変更通知の購読。ドキュメント全体が毎回届く。
    pub async fn subscribe(&self, code: &str) -> broadcast::Receiver<Room> {
        self.watcher(code).await.subscribe()
    }

    async fn watcher(&self, code: &str) -> broadcast::Sender<Room> {
        let mut watchers = self.watchers.lock().await;
        if let Some(tx) = watchers.get(code) {
            tx.clone()
        } else {
            let (tx, _) = broadcast::channel(64);
            watchers.insert(code.to_string(), tx.clone());
            tx
        }
    }

    async fn notify(&self, room: &Room) {
        let tx = self.watcher(&room.room_code).await;
        // 購読者がいない間の送信エラーは無視してよい
        let _ = tx.send(room.clone());
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}
