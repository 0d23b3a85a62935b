use crate::store::RoomStore;

#[derive(Clone)]
pub struct AppState {
    pub store: RoomStore,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            store: RoomStore::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
