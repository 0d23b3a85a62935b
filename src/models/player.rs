use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub alive: bool, // 死亡したら false、復活はしない
    pub role_id: Option<String>,
}

impl Player {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            alive: true,
            role_id: None,
        }
    }
}
