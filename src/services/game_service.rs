use crate::models::action::{NightAction, NightActionKind, Vote};
use crate::models::role::{assign_roles, Team};
use crate::models::room::{Room, RoomPhase};
use crate::services::error::GameError;
use crate::services::room_service::normalize_code;
use crate::state::AppState;

fn require_host(room: &Room, player_id: &str) -> Result<(), GameError> {
    if room.host_id == player_id {
        Ok(())
    } else {
        Err(GameError::NotHost)
    }
}

// 夜フェーズに入った直後、行動義務のある生存者がいなければ即座に解決する。
// そうしないと完了条件 |actions| == 0 == |required| が成立したまま誰も進めず固まる。
fn enter_night(room: &mut Room) -> Result<(), GameError> {
    room.phase = RoomPhase::Night;
    if room.required_actors()?.is_empty() {
        room.resolve_night()?;
    }
    Ok(())
}

// ゲーム開始（ホスト専用、ロビーから）。役職の割り当てとフェーズ遷移は
// 1回のストア更新として書くので、役職が中途半端に付いた状態は観測されない。
pub async fn start_game(state: AppState, code: &str, player_id: &str) -> Result<(), GameError> {
    let code = normalize_code(code);
    let player_id = player_id.to_string();
    state
        .store
        .conditional_update(&code, RoomPhase::Lobby, move |room| {
            require_host(room, &player_id)?;

            let roster: Vec<String> = room.players.keys().cloned().collect();
            if roster.len() < 3 {
                return Err(GameError::NotEnoughPlayers { have: roster.len() });
            }

            let assignments = assign_roles(&roster);
            for (pid, role_id) in assignments {
                if let Some(player) = room.players.get_mut(&pid) {
                    player.role_id = Some(role_id);
                }
            }
            room.results_text.clear();
            room.phase = RoomPhase::Roles;
            Ok(())
        })
        .await?;

    log::info!("room {}: game started", code);
    Ok(())
}

// 役職確認から夜へ（ホスト専用）。ホストの1操作で全クライアントが同時に夜へ移る。
pub async fn begin_night(state: AppState, code: &str, player_id: &str) -> Result<(), GameError> {
    let code = normalize_code(code);
    let player_id = player_id.to_string();
    state
        .store
        .conditional_update(&code, RoomPhase::Roles, move |room| {
            require_host(room, &player_id)?;
            enter_night(room)
        })
        .await
}

// 夜アクションの提出。player_id をキーに上書きするので再提出は置き換えになる。
pub async fn submit_night_action(
    state: AppState,
    code: &str,
    player_id: &str,
    kind: NightActionKind,
    target_id: &str,
) -> Result<(), GameError> {
    let code = normalize_code(code);
    let player_id = player_id.to_string();
    let target_id = target_id.to_string();
    state
        .store
        .update(&code, move |room| {
            if room.phase != RoomPhase::Night {
                return Err(GameError::WrongPhase { actual: room.phase });
            }

            let actor = room
                .players
                .get(&player_id)
                .ok_or_else(|| GameError::PlayerNotFound(player_id.clone()))?;
            if !actor.alive {
                return Err(GameError::DeadActor);
            }
            if room.role_of(actor)?.night_ability.action_kind() != Some(kind) {
                return Err(GameError::WrongAbility);
            }

            if target_id == player_id {
                return Err(GameError::SelfTarget);
            }
            let target = room
                .players
                .get(&target_id)
                .ok_or_else(|| GameError::PlayerNotFound(target_id.clone()))?;
            if !target.alive {
                return Err(GameError::DeadTarget);
            }

            room.actions
                .insert(player_id, NightAction { kind, target_id });
            Ok(())
        })
        .await
}

// 投票の提出。生存者なら誰でも1票、再提出は置き換え。
pub async fn submit_vote(
    state: AppState,
    code: &str,
    voter_id: &str,
    target_id: &str,
) -> Result<(), GameError> {
    let code = normalize_code(code);
    let voter_id = voter_id.to_string();
    let target_id = target_id.to_string();
    state
        .store
        .update(&code, move |room| {
            if room.phase != RoomPhase::Day {
                return Err(GameError::WrongPhase { actual: room.phase });
            }

            let voter = room
                .players
                .get(&voter_id)
                .ok_or_else(|| GameError::PlayerNotFound(voter_id.clone()))?;
            if !voter.alive {
                return Err(GameError::DeadActor);
            }
            if target_id == voter_id {
                return Err(GameError::SelfTarget);
            }
            let target = room
                .players
                .get(&target_id)
                .ok_or_else(|| GameError::PlayerNotFound(target_id.clone()))?;
            if !target.alive {
                return Err(GameError::DeadTarget);
            }

            room.votes.insert(voter_id, Vote { target_id });
            Ok(())
        })
        .await
}

// 現在のフェーズ（夜または昼）を解決する（ホスト専用）。
// 期待フェーズをキーにした条件付き更新なので、同じフェーズに対して
// 二重に呼ばれても2回目は PhaseConflict で何も起きない。
pub async fn resolve_phase(state: AppState, code: &str, player_id: &str) -> Result<(), GameError> {
    resolve(state, code, player_id, false).await
}

// 未提出者を待たずに解決する（ホスト専用の強制進行）。
// 切断したプレイヤーのせいでフェーズが閉じない場合の脱出口。
pub async fn force_resolve(state: AppState, code: &str, player_id: &str) -> Result<(), GameError> {
    resolve(state, code, player_id, true).await
}

async fn resolve(
    state: AppState,
    code: &str,
    player_id: &str,
    force: bool,
) -> Result<(), GameError> {
    let code = normalize_code(code);
    let player_id = player_id.to_string();

    // 現在のフェーズを読み、それをCASの期待値にする
    let current = state
        .store
        .get(&code)
        .await
        .ok_or_else(|| GameError::RoomNotFound(code.clone()))?
        .phase;
    if current != RoomPhase::Night && current != RoomPhase::Day {
        return Err(GameError::WrongPhase { actual: current });
    }

    state
        .store
        .conditional_update(&code, current, move |room| {
            require_host(room, &player_id)?;
            match room.phase {
                RoomPhase::Night => {
                    if !force && !room.night_complete()? {
                        return Err(GameError::PhaseNotComplete);
                    }
                    room.resolve_night()?;
                }
                RoomPhase::Day => {
                    if !force && !room.day_complete() {
                        return Err(GameError::PhaseNotComplete);
                    }
                    room.resolve_day();
                }
                // conditional_update が Night/Day を保証しているので通常は来ない
                phase => return Err(GameError::WrongPhase { actual: phase }),
            }
            Ok(())
        })
        .await?;

    log::info!("room {}: {:?} phase resolved (force={})", code, current, force);
    Ok(())
}

// 結果画面から次へ（ホスト専用）。勝敗が付いていれば終了、
// 付いていなければ解決元のフェーズに応じて昼または次の夜へ回る。
pub async fn advance_from_results(
    state: AppState,
    code: &str,
    player_id: &str,
) -> Result<(), GameError> {
    let code = normalize_code(code);
    let player_id = player_id.to_string();
    state
        .store
        .conditional_update(&code, RoomPhase::Results, move |room| {
            require_host(room, &player_id)?;
            match room.winner()? {
                Some(Team::Town) => {
                    room.phase = RoomPhase::Ended;
                    room.next_phase = None;
                    room.results_text =
                        "The town wins! All the werewolves are dead.".to_string();
                    Ok(())
                }
                Some(Team::Wolf) => {
                    room.phase = RoomPhase::Ended;
                    room.next_phase = None;
                    room.results_text =
                        "The werewolves win! They have overrun the town.".to_string();
                    Ok(())
                }
                None => match room.next_phase.take() {
                    Some(RoomPhase::Day) => {
                        room.phase = RoomPhase::Day;
                        Ok(())
                    }
                    // 昼の解決後、または行き先が記録されていない場合は夜へ
                    _ => enter_night(room),
                },
            }
        })
        .await
}
