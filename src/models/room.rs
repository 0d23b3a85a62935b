use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::action::{NightAction, NightActionKind, Vote};
use super::player::Player;
use super::role::{role_by_id, NightAbility, Role, Team};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Lobby,   // 参加受付中
    Roles,   // 役職確認
    Night,   // 夜フェーズ
    Day,     // 昼フェーズ（投票）
    Results, // 結果発表
    Ended,   // ゲーム終了
}

// ルール適用中に見つかった内部整合性の破れ。ユーザー入力では起きない。
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("role '{0}' is not in the catalog")]
    UnknownRole(String),
    #[error("player '{0}' has no role assigned")]
    MissingRole(String),
}

// 1ゲーム分の共有ドキュメント。全クライアントはこのドキュメントだけを観測する。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub room_code: String,
    pub phase: RoomPhase,
    pub host_id: String,
    pub players: HashMap<String, Player>,
    #[serde(default)]
    pub actions: HashMap<String, NightAction>,
    #[serde(default)]
    pub votes: HashMap<String, Vote>,
    #[serde(default)]
    pub results_text: String,
    // 結果画面の後に入るフェーズ。夜の解決後は昼、昼の解決後は次の夜。
    #[serde(default)]
    pub next_phase: Option<RoomPhase>,
}

impl Room {
    pub fn new(room_code: String, host: Player) -> Self {
        let host_id = host.id.clone();
        let mut players = HashMap::new();
        players.insert(host_id.clone(), host);
        Room {
            room_code,
            phase: RoomPhase::Lobby,
            host_id,
            players,
            actions: HashMap::new(),
            votes: HashMap::new(),
            results_text: String::new(),
            next_phase: None,
        }
    }

    pub fn living_players(&self) -> Vec<&Player> {
        self.players.values().filter(|p| p.alive).collect()
    }

    pub fn role_of(&self, player: &Player) -> Result<&'static Role, RulesError> {
        let role_id = player
            .role_id
            .as_deref()
            .ok_or_else(|| RulesError::MissingRole(player.id.clone()))?;
        role_by_id(role_id).ok_or_else(|| RulesError::UnknownRole(role_id.to_string()))
    }

    // 夜に行動義務のある生存プレイヤー（night_ability != None）
    pub fn required_actors(&self) -> Result<Vec<&Player>, RulesError> {
        let mut actors = Vec::new();
        for player in self.players.values().filter(|p| p.alive) {
            if self.role_of(player)?.night_ability != NightAbility::None {
                actors.push(player);
            }
        }
        Ok(actors)
    }

    // 夜フェーズの完了判定。提出は player_id をキーに上書きされるので
    // 同一プレイヤーの再提出で数が水増しされることはない。
    pub fn night_complete(&self) -> Result<bool, RulesError> {
        Ok(self.actions.len() == self.required_actors()?.len())
    }

    pub fn day_complete(&self) -> bool {
        self.votes.len() == self.living_players().len()
    }

    // 夜の解決。襲撃は対象ごとに集計し、単独最多の対象だけが死亡する
    // （同数の場合は誰も死なない）。占い結果は結果テキストに追記する。
    pub fn resolve_night(&mut self) -> Result<(), RulesError> {
        let mut kill_tally: HashMap<String, usize> = HashMap::new();
        for action in self.actions.values() {
            if action.kind == NightActionKind::Kill {
                *kill_tally.entry(action.target_id.clone()).or_insert(0) += 1;
            }
        }
        let kill_target = unique_plurality(&kill_tally);

        let mut lines = Vec::new();
        match kill_target {
            Some(target_id) => {
                if let Some(target) = self.players.get_mut(&target_id) {
                    target.alive = false;
                    lines.push(format!("{} was killed during the night.", target.name));
                } else {
                    lines.push("No one died last night.".to_string());
                }
            }
            None => lines.push("No one died last night.".to_string()),
        }

        // 占い結果。表示の出し分けはクライアント側の責務で、
        // ドキュメント上は結果テキストにそのまま載る。
        let mut reveals = Vec::new();
        for action in self.actions.values() {
            if action.kind != NightActionKind::Investigate {
                continue;
            }
            if let Some(target) = self.players.get(&action.target_id) {
                let team = self.role_of(target)?.team;
                reveals.push(format!(
                    "The seer learned that {} is on the {} team.",
                    target.name, team
                ));
            }
        }
        reveals.sort();
        lines.extend(reveals);

        self.results_text = lines.join("\n");
        self.actions.clear();
        self.phase = RoomPhase::Results;
        self.next_phase = Some(RoomPhase::Day);
        Ok(())
    }

    // 昼の解決。二段階で集計する：まず真の最多得票数を求め、
    // それを持つ対象がちょうど1人のときだけ追放する。
    pub fn resolve_day(&mut self) {
        let mut tally: HashMap<String, usize> = HashMap::new();
        for vote in self.votes.values() {
            *tally.entry(vote.target_id.clone()).or_insert(0) += 1;
        }

        self.results_text = match unique_plurality(&tally) {
            Some(target_id) => match self.players.get_mut(&target_id) {
                Some(target) => {
                    target.alive = false;
                    format!("{} was eliminated by vote.", target.name)
                }
                None => "No one was eliminated.".to_string(),
            },
            None => "No one was eliminated.".to_string(),
        };

        self.votes.clear();
        self.phase = RoomPhase::Results;
        self.next_phase = Some(RoomPhase::Night);
    }

    // 勝敗判定。人狼全滅で村人陣営の勝ち、
    // 生存人狼数 >= 生存村人陣営数（または村人陣営全滅）で人狼陣営の勝ち。
    pub fn winner(&self) -> Result<Option<Team>, RulesError> {
        let mut living_wolves = 0usize;
        let mut living_town = 0usize;
        for player in self.players.values().filter(|p| p.alive) {
            match self.role_of(player)?.team {
                Team::Wolf => living_wolves += 1,
                Team::Town => living_town += 1,
            }
        }

        if living_wolves == 0 {
            Ok(Some(Team::Town))
        } else if living_wolves >= living_town {
            Ok(Some(Team::Wolf))
        } else {
            Ok(None)
        }
    }
}

// 集計から単独最多の対象を返す。最多が同数で並んだら None。
fn unique_plurality(tally: &HashMap<String, usize>) -> Option<String> {
    let max = tally.values().copied().max()?;
    let mut holders = tally.iter().filter(|(_, count)| **count == max);
    let (target, _) = holders.next()?;
    if holders.next().is_some() {
        None
    } else {
        Some(target.clone())
    }
}
