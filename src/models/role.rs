use std::collections::HashMap;
use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::action::NightActionKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Town, // 村人陣営
    Wolf, // 人狼陣営
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Town => write!(f, "town"),
            Team::Wolf => write!(f, "wolf"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NightAbility {
    None,
    Kill,
    Investigate,
}

impl NightAbility {
    // この能力が要求する夜アクションの種類
    pub fn action_kind(self) -> Option<NightActionKind> {
        match self {
            NightAbility::None => None,
            NightAbility::Kill => Some(NightActionKind::Kill),
            NightAbility::Investigate => Some(NightActionKind::Investigate),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Role {
    pub id: &'static str,
    pub name: &'static str,
    pub team: Team,
    pub description: &'static str,
    pub night_ability: NightAbility,
}

pub const VILLAGER: &str = "villager";
pub const WEREWOLF: &str = "werewolf";
pub const SEER: &str = "seer";

// 役職カタログ（固定、順序あり）
pub static ROLES: &[Role] = &[
    Role {
        id: VILLAGER,
        name: "Villager",
        team: Team::Town,
        description: "You have no special powers. Find and eliminate the werewolves.",
        night_ability: NightAbility::None,
    },
    Role {
        id: WEREWOLF,
        name: "Werewolf",
        team: Team::Wolf,
        description: "You are a werewolf. Work with other wolves to eliminate the town.",
        night_ability: NightAbility::Kill,
    },
    Role {
        id: SEER,
        name: "Seer",
        team: Team::Town,
        description: "Each night, you may learn whether a player is good or evil.",
        night_ability: NightAbility::Investigate,
    },
];

pub fn role_by_id(id: &str) -> Option<&'static Role> {
    ROLES.iter().find(|r| r.id == id)
}

// プレイヤー一覧に役職を割り当てる。
// 3人以上なら人狼1・占い師1・残り村人、3人未満は全員村人（成立はするがほぼ勝敗がつかない）。
// プールを無作為にシャッフルしてロースター順に割り当てるので、出力は全単射になる。
pub fn assign_roles(player_ids: &[String]) -> HashMap<String, String> {
    let mut pool: Vec<&'static str> = Vec::with_capacity(player_ids.len());
    if player_ids.len() >= 3 {
        pool.push(WEREWOLF);
        pool.push(SEER);
    }
    while pool.len() < player_ids.len() {
        pool.push(VILLAGER);
    }

    pool.shuffle(&mut rand::thread_rng());

    player_ids
        .iter()
        .zip(pool)
        .map(|(pid, role_id)| (pid.clone(), role_id.to_string()))
        .collect()
}
