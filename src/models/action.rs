use serde::{Deserialize, Serialize};

// 夜アクションの種類（役職の night_ability と一対一で対応する）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NightActionKind {
    Kill,        // 人狼の襲撃
    Investigate, // 占い師の占い
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NightAction {
    pub kind: NightActionKind,
    pub target_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vote {
    pub target_id: String,
}
