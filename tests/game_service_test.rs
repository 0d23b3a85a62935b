use werewolf_room_server::models::action::NightActionKind;
use werewolf_room_server::models::role::{SEER, VILLAGER, WEREWOLF};
use werewolf_room_server::models::room::RoomPhase;
use werewolf_room_server::services::error::GameError;
use werewolf_room_server::services::{game_service, room_service};
use werewolf_room_server::state::AppState;
use werewolf_room_server::store::StoreError;

// ルームを作って合計 n 人にする。(コード, ホストID, 参加者ID一覧) を返す。
async fn setup_room(state: &AppState, n: usize) -> (String, String, Vec<String>) {
    let (code, host_id) = room_service::create_room(state.clone(), "Host")
        .await
        .unwrap();
    let mut joiners = Vec::new();
    for i in 1..n {
        let pid = room_service::join_room(state.clone(), &code, &format!("Player{}", i))
            .await
            .unwrap();
        joiners.push(pid);
    }
    (code, host_id, joiners)
}

// 役職をテスト用に固定する（シャッフル結果に依存しないため）
async fn rig_roles(state: &AppState, code: &str, wolf_id: &str, seer_id: &str) {
    let wolf_id = wolf_id.to_string();
    let seer_id = seer_id.to_string();
    state
        .store
        .update(code, move |room| -> Result<(), StoreError> {
            for p in room.players.values_mut() {
                let role = if p.id == wolf_id {
                    WEREWOLF
                } else if p.id == seer_id {
                    SEER
                } else {
                    VILLAGER
                };
                p.role_id = Some(role.to_string());
            }
            Ok(())
        })
        .await
        .unwrap();
}

async fn phase_of(state: &AppState, code: &str) -> RoomPhase {
    state.store.get(code).await.unwrap().phase
}

#[tokio::test]
async fn start_assigns_roles_atomically() {
    let state = AppState::new();
    let (code, host_id, _) = setup_room(&state, 4).await;

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();

    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Roles);

    // 全員に役職が付いていて、構成は人狼1・占い師1・村人2
    let roles: Vec<String> = room
        .players
        .values()
        .map(|p| p.role_id.clone().expect("role must be assigned"))
        .collect();
    assert_eq!(roles.iter().filter(|r| r.as_str() == WEREWOLF).count(), 1);
    assert_eq!(roles.iter().filter(|r| r.as_str() == SEER).count(), 1);
    assert_eq!(roles.iter().filter(|r| r.as_str() == VILLAGER).count(), 2);
}

#[tokio::test]
async fn start_requires_at_least_three_players() {
    let state = AppState::new();
    let (code, host_id, _) = setup_room(&state, 2).await;

    let err = game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotEnoughPlayers { have: 2 }));
    assert_eq!(phase_of(&state, &code).await, RoomPhase::Lobby);
}

#[tokio::test]
async fn night_kill_and_investigation_resolve_together() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 5).await;
    let (wolf, seer, victim) = (&joiners[0], &joiners[1], &joiners[2]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();
    assert_eq!(phase_of(&state, &code).await, RoomPhase::Night);

    game_service::submit_night_action(state.clone(), &code, wolf, NightActionKind::Kill, victim)
        .await
        .unwrap();
    game_service::submit_night_action(
        state.clone(),
        &code,
        seer,
        NightActionKind::Investigate,
        wolf,
    )
    .await
    .unwrap();

    game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap();

    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Results);
    assert!(!room.players[victim].alive);
    assert!(room.results_text.contains("was killed during the night."));
    assert!(room.results_text.contains("is on the wolf team."));
    assert!(room.actions.is_empty());

    // 夜の結果の後は昼へ
    game_service::advance_from_results(state.clone(), &code, &host_id)
        .await
        .unwrap();
    assert_eq!(phase_of(&state, &code).await, RoomPhase::Day);
}

#[tokio::test]
async fn resubmission_replaces_previous_action() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 5).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();

    game_service::submit_night_action(
        state.clone(),
        &code,
        wolf,
        NightActionKind::Kill,
        &joiners[2],
    )
    .await
    .unwrap();
    game_service::submit_night_action(
        state.clone(),
        &code,
        wolf,
        NightActionKind::Kill,
        &joiners[3],
    )
    .await
    .unwrap();

    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.actions.len(), 1);
    assert_eq!(room.actions[wolf.as_str()].target_id, joiners[3]);

    // 占い師の分がまだなので解決はできない
    let err = game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::PhaseNotComplete));
}

#[tokio::test]
async fn resolution_is_idempotent_under_duplicate_triggers() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer, victim) = (&joiners[0], &joiners[1], &host_id);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();

    game_service::submit_night_action(state.clone(), &code, wolf, NightActionKind::Kill, victim)
        .await
        .unwrap();
    game_service::submit_night_action(
        state.clone(),
        &code,
        seer,
        NightActionKind::Investigate,
        wolf,
    )
    .await
    .unwrap();

    game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap();
    let after_first = state.store.get(&code).await.unwrap();

    // 同じフェーズへの二重トリガー。2回目は失敗し、何も変わらない。
    let err = game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::WrongPhase { .. }));

    let after_second = state.store.get(&code).await.unwrap();
    assert_eq!(after_second.phase, after_first.phase);
    assert_eq!(after_second.results_text, after_first.results_text);
    assert_eq!(
        after_second.players.values().filter(|p| p.alive).count(),
        after_first.players.values().filter(|p| p.alive).count()
    );
}

#[tokio::test]
async fn night_without_required_actors_auto_resolves() {
    let state = AppState::new();
    let (code, host_id, _) = setup_room(&state, 3).await;

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();

    // 全員を村人にして夜の行動義務者をゼロにする
    state
        .store
        .update(&code, |room| -> Result<(), StoreError> {
            for p in room.players.values_mut() {
                p.role_id = Some(VILLAGER.to_string());
            }
            Ok(())
        })
        .await
        .unwrap();

    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();

    // 夜で止まらず、即座に結果へ
    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Results);
    assert_eq!(room.results_text, "No one died last night.");
    assert!(room.players.values().all(|p| p.alive));
}

#[tokio::test]
async fn force_resolve_skips_missing_submissions() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 5).await;
    let (wolf, seer, victim) = (&joiners[0], &joiners[1], &joiners[2]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();

    // 占い師が切断した想定。人狼の分だけ提出して強制解決する。
    game_service::submit_night_action(state.clone(), &code, wolf, NightActionKind::Kill, victim)
        .await
        .unwrap();
    game_service::force_resolve(state.clone(), &code, &host_id)
        .await
        .unwrap();

    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Results);
    assert!(!room.players[victim.as_str()].alive);
}

#[tokio::test]
async fn day_vote_eliminates_by_plurality() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;

    // 昼に直接入れる（夜を経由せずに投票だけ検証する）
    state
        .store
        .update(&code, |room| -> Result<(), StoreError> {
            room.phase = RoomPhase::Day;
            Ok(())
        })
        .await
        .unwrap();

    game_service::submit_vote(state.clone(), &code, &host_id, wolf)
        .await
        .unwrap();
    game_service::submit_vote(state.clone(), &code, seer, wolf)
        .await
        .unwrap();
    game_service::submit_vote(state.clone(), &code, &joiners[2], seer)
        .await
        .unwrap();
    game_service::submit_vote(state.clone(), &code, wolf, &host_id)
        .await
        .unwrap();

    // 人狼2票、占い師1票、ホスト1票 → 人狼が追放される
    game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap();

    let room = state.store.get(&code).await.unwrap();
    assert!(!room.players[wolf.as_str()].alive);
    assert!(room.results_text.contains("was eliminated by vote."));

    // 人狼が死んだので次の進行で村人陣営の勝利
    game_service::advance_from_results(state.clone(), &code, &host_id)
        .await
        .unwrap();
    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Ended);
    assert!(room.results_text.contains("The town wins!"));
}

#[tokio::test]
async fn tied_day_vote_eliminates_no_one() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    state
        .store
        .update(&code, |room| -> Result<(), StoreError> {
            room.phase = RoomPhase::Day;
            Ok(())
        })
        .await
        .unwrap();

    // 2票ずつの同数
    game_service::submit_vote(state.clone(), &code, &host_id, wolf)
        .await
        .unwrap();
    game_service::submit_vote(state.clone(), &code, seer, wolf)
        .await
        .unwrap();
    game_service::submit_vote(state.clone(), &code, wolf, seer)
        .await
        .unwrap();
    game_service::submit_vote(state.clone(), &code, &joiners[2], seer)
        .await
        .unwrap();

    game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap();

    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.results_text, "No one was eliminated.");
    assert!(room.players.values().all(|p| p.alive));

    // 勝敗は付かないので次の夜へ
    game_service::advance_from_results(state.clone(), &code, &host_id)
        .await
        .unwrap();
    assert_eq!(phase_of(&state, &code).await, RoomPhase::Night);
}

#[tokio::test]
async fn wolves_win_when_reaching_parity() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;

    // 村人陣営を2人まで削っておく（人狼1 vs 村人2）
    let seer_owned = seer.clone();
    let joiner2 = joiners[2].clone();
    state
        .store
        .update(&code, move |room| -> Result<(), StoreError> {
            room.players.get_mut(&joiner2).unwrap().alive = false;
            room.phase = RoomPhase::Night;
            Ok(())
        })
        .await
        .unwrap();

    // 人狼が占い師を殺すと 1 vs 1 の同数になる
    game_service::submit_night_action(state.clone(), &code, wolf, NightActionKind::Kill, seer)
        .await
        .unwrap();
    game_service::submit_night_action(
        state.clone(),
        &code,
        &seer_owned,
        NightActionKind::Investigate,
        wolf,
    )
    .await
    .unwrap();
    game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap();

    game_service::advance_from_results(state.clone(), &code, &host_id)
        .await
        .unwrap();
    let room = state.store.get(&code).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Ended);
    assert!(room.results_text.contains("The werewolves win!"));
}

#[tokio::test]
async fn dead_players_cannot_act_or_vote() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;

    let wolf_owned = wolf.clone();
    state
        .store
        .update(&code, move |room| -> Result<(), StoreError> {
            room.players.get_mut(&wolf_owned).unwrap().alive = false;
            room.phase = RoomPhase::Day;
            Ok(())
        })
        .await
        .unwrap();

    let err = game_service::submit_vote(state.clone(), &code, wolf, seer)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::DeadActor));

    // 死者を対象にもできない
    let err = game_service::submit_vote(state.clone(), &code, &host_id, wolf)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::DeadTarget));
}

#[tokio::test]
async fn self_targeting_is_rejected() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();

    // 人狼は自分自身を襲撃できない
    let err = game_service::submit_night_action(state.clone(), &code, wolf, NightActionKind::Kill, wolf)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::SelfTarget));
    assert!(state.store.get(&code).await.unwrap().actions.is_empty());

    // 昼も同様に自分には投票できない
    state
        .store
        .update(&code, |room| -> Result<(), StoreError> {
            room.phase = RoomPhase::Day;
            Ok(())
        })
        .await
        .unwrap();

    let err = game_service::submit_vote(state.clone(), &code, &host_id, &host_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::SelfTarget));
    assert!(state.store.get(&code).await.unwrap().votes.is_empty());
}

#[tokio::test]
async fn role_without_the_ability_cannot_submit_it() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    game_service::begin_night(state.clone(), &code, &host_id)
        .await
        .unwrap();

    // 占い師は襲撃できない
    let err = game_service::submit_night_action(state.clone(), &code, seer, NightActionKind::Kill, wolf)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::WrongAbility));

    // 村人（ホスト）は夜アクション自体を持たない
    let err = game_service::submit_night_action(
        state.clone(),
        &code,
        &host_id,
        NightActionKind::Investigate,
        wolf,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GameError::WrongAbility));

    // どちらの提出も記録されていない
    assert!(state.store.get(&code).await.unwrap().actions.is_empty());
}

#[tokio::test]
async fn only_the_host_drives_phase_transitions() {
    let state = AppState::new();
    let (code, _host_id, joiners) = setup_room(&state, 4).await;

    let err = game_service::start_game(state.clone(), &code, &joiners[0])
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotHost));
    assert_eq!(phase_of(&state, &code).await, RoomPhase::Lobby);
}

#[tokio::test]
async fn ended_room_accepts_no_further_actions() {
    let state = AppState::new();
    let (code, host_id, joiners) = setup_room(&state, 4).await;
    let (wolf, seer) = (&joiners[0], &joiners[1]);

    game_service::start_game(state.clone(), &code, &host_id)
        .await
        .unwrap();
    rig_roles(&state, &code, wolf, seer).await;
    state
        .store
        .update(&code, |room| -> Result<(), StoreError> {
            room.phase = RoomPhase::Ended;
            Ok(())
        })
        .await
        .unwrap();

    let err = game_service::submit_vote(state.clone(), &code, &host_id, wolf)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::WrongPhase { .. }));

    let err = game_service::resolve_phase(state.clone(), &code, &host_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::WrongPhase { .. }));
}
