//! Integration tests for the tournament lifecycle
//!
//! These tests drive the manager against the in-memory repository from the
//! first draw through stage advancement to a crowned champion.

use robo_tournament::db::MemoryTournamentRepository;
use robo_tournament::tournament::{
    AdvanceOutcome, Bracket, BracketConfig, GroupFilter, GroupSizePolicy, MatchFilter,
    MatchStatus, NewTeam, Seeder, StageStatus, Team, TeamFilter, TeamId, TournamentError,
    TournamentManager,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const BRACKET: Bracket = Bracket {
    category_id: 3,
    division_id: 1,
};

fn setup_manager(group_size: usize) -> TournamentManager {
    let config = BracketConfig::default().with_group_sizes(GroupSizePolicy::uniform(group_size));
    TournamentManager::new(Arc::new(MemoryTournamentRepository::new()), config)
        .with_seeder(Seeder::with_seed(42))
}

async fn register_teams(manager: &TournamentManager, bracket: Bracket, n: usize) -> Vec<Team> {
    let mut teams = Vec::with_capacity(n);
    for i in 0..n {
        let team = NewTeam::new(format!("Team {i}"), bracket).with_robot(format!("Bot {i}"));
        teams.push(manager.register_team(team).await.unwrap());
    }
    teams
}

/// Resolve every pending match of the current stage (first seat wins), then
/// close each open group with its best member.
async fn play_out_stage(manager: &TournamentManager, bracket: Bracket) {
    let stage = manager.current_stage(bracket).await.unwrap();
    let standings = manager.standings(bracket, Some(stage)).await.unwrap();

    for entry in standings {
        let pending = manager
            .list_matches(&MatchFilter {
                group_id: Some(entry.group.id),
                status: Some(MatchStatus::Pending),
                ..MatchFilter::default()
            })
            .await
            .unwrap();
        for m in pending {
            manager.record_match_result(m.id, m.team1_id).await.unwrap();
        }

        if !entry.group.is_completed {
            let group = manager.get_group(entry.group.id).await.unwrap();
            let best = group.members[0].team_id;
            manager.set_group_winner(group.group.id, best).await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_five_teams_single_group_crowns_champion() {
    let manager = setup_manager(5);
    register_teams(&manager, BRACKET, 5).await;

    let groups = manager.generate_first_stage(BRACKET).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_name, "Group A");

    let matches = manager
        .list_matches(&MatchFilter::bracket(BRACKET))
        .await
        .unwrap();
    assert_eq!(matches.len(), 2);

    let group = manager.get_group(groups[0].id).await.unwrap();
    assert_eq!(group.members.len(), 5);
    let paired: HashSet<TeamId> = matches
        .iter()
        .flat_map(|m| [m.team1_id, m.team2_id])
        .collect();
    let unpaired: Vec<_> = group
        .members
        .iter()
        .filter(|m| !paired.contains(&m.team_id))
        .collect();
    assert_eq!(unpaired.len(), 1);

    for m in &matches {
        manager.record_match_result(m.id, m.team1_id).await.unwrap();
    }

    // A team that lost its match can still be declared the winner
    let chosen = matches[0].team2_id;
    manager.set_group_winner(groups[0].id, chosen).await.unwrap();

    let outcome = manager.advance_stage(BRACKET).await.unwrap();
    assert_eq!(
        outcome,
        AdvanceOutcome::ChampionCrowned {
            champion_id: chosen
        }
    );
    assert_eq!(
        outcome.message(),
        "Tournament complete! Champion has been crowned!"
    );

    let champion = manager.get_team(chosen).await.unwrap();
    assert!(!champion.is_eliminated);

    // Terminal: asking again changes nothing
    let again = manager.advance_stage(BRACKET).await.unwrap();
    assert_eq!(again.champion_id(), Some(chosen));
    assert_eq!(manager.current_stage(BRACKET).await.unwrap(), 1);
}

#[tokio::test]
async fn test_nine_teams_pairs_need_manual_singleton_winner() {
    let manager = setup_manager(2);
    register_teams(&manager, BRACKET, 9).await;

    let groups = manager.generate_first_stage(BRACKET).await.unwrap();
    assert_eq!(groups.len(), 5);

    let standings = manager.standings(BRACKET, None).await.unwrap();
    let sizes: Vec<usize> = standings.iter().map(|g| g.members.len()).collect();
    assert_eq!(sizes, vec![2, 2, 2, 2, 1]);

    let singleton = &standings[4];
    assert_eq!(singleton.group.group_name, "Group E");
    let singleton_matches = manager
        .list_matches(&MatchFilter::group(singleton.group.id))
        .await
        .unwrap();
    assert!(singleton_matches.is_empty());

    play_out_stage(&manager, BRACKET).await;

    let winner = manager.get_group(singleton.group.id).await.unwrap();
    assert_eq!(winner.group.winner_team_id, Some(singleton.members[0].team_id));

    let outcome = manager.advance_stage(BRACKET).await.unwrap();
    assert_eq!(
        outcome,
        AdvanceOutcome::Advanced {
            next_stage: 2,
            advanced: 5
        }
    );
    assert_eq!(outcome.message(), "Advanced 5 winners to Stage 2");

    let stage_two = manager
        .list_groups(&GroupFilter::bracket(BRACKET).stage(2))
        .await
        .unwrap();
    assert_eq!(stage_two.len(), 3);
    assert_eq!(stage_two[0].group_name, "Stage 2 - Group A");
}

#[tokio::test]
async fn test_auto_complete_byes_closes_singleton_groups() {
    let config = BracketConfig::default()
        .with_group_sizes(GroupSizePolicy::uniform(2))
        .with_auto_complete_byes(true);
    let manager = TournamentManager::new(Arc::new(MemoryTournamentRepository::new()), config);
    register_teams(&manager, BRACKET, 3).await;

    let groups = manager.generate_first_stage(BRACKET).await.unwrap();
    let bye = groups.iter().find(|g| g.is_completed).unwrap();
    assert!(bye.winner_team_id.is_some());

    assert_eq!(
        manager.stage_status(BRACKET).await.unwrap(),
        StageStatus::Open {
            stage_number: 1,
            incomplete: 1
        }
    );
}

#[tokio::test]
async fn test_full_tournament_reaches_single_champion() {
    let manager = setup_manager(3);
    let teams = register_teams(&manager, BRACKET, 20).await;

    manager.generate_first_stage(BRACKET).await.unwrap();

    let champion = loop {
        play_out_stage(&manager, BRACKET).await;

        let stage = manager.current_stage(BRACKET).await.unwrap();
        let winners: HashSet<TeamId> = manager
            .list_groups(&GroupFilter::bracket(BRACKET).stage(stage))
            .await
            .unwrap()
            .iter()
            .filter_map(|g| g.winner_team_id)
            .collect();

        match manager.advance_stage(BRACKET).await.unwrap() {
            AdvanceOutcome::Advanced { next_stage, advanced } => {
                assert_eq!(next_stage, stage + 1);
                assert_eq!(advanced, winners.len());

                // The next stage holds exactly the previous winners
                let drawn: HashSet<TeamId> = manager
                    .standings(BRACKET, Some(next_stage))
                    .await
                    .unwrap()
                    .iter()
                    .flat_map(|g| g.members.iter().map(|m| m.team_id))
                    .collect();
                assert_eq!(drawn, winners);
            }
            AdvanceOutcome::ChampionCrowned { champion_id } => break champion_id,
            other => panic!("unexpected outcome: {other:?}"),
        }
    };

    // 20 -> 7 -> 3 -> 1
    assert_eq!(manager.current_stage(BRACKET).await.unwrap(), 3);
    assert!(teams.iter().any(|t| t.id == champion));

    let remaining = manager
        .list_teams(&TeamFilter::bracket(BRACKET).eligible())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, champion);
}

#[tokio::test]
async fn test_group_winner_eliminates_every_other_member() {
    let manager = setup_manager(4);
    register_teams(&manager, BRACKET, 4).await;
    let groups = manager.generate_first_stage(BRACKET).await.unwrap();

    let group = manager.get_group(groups[0].id).await.unwrap();
    let winner = group.members[2].team_id;
    manager.set_group_winner(group.group.id, winner).await.unwrap();

    for member in &group.members {
        let team = manager.get_team(member.team_id).await.unwrap();
        assert_eq!(team.is_eliminated, member.team_id != winner);
    }

    let group = manager.get_group(groups[0].id).await.unwrap();
    assert!(group.group.is_completed);
    assert!(group.group.is_consistent());
    assert_eq!(group.members.iter().filter(|m| m.is_winner).count(), 1);

    let second = manager.set_group_winner(group.group.id, winner).await;
    assert!(matches!(
        second,
        Err(TournamentError::GroupAlreadyCompleted(_))
    ));
}

#[tokio::test]
async fn test_late_loss_keeps_declared_winner_in_the_running() {
    let manager = setup_manager(4);
    let teams = register_teams(&manager, BRACKET, 4).await;
    let groups = manager.generate_first_stage(BRACKET).await.unwrap();
    assert_eq!(groups.len(), 1);

    let matches = manager
        .list_matches(&MatchFilter::bracket(BRACKET))
        .await
        .unwrap();
    assert_eq!(matches.len(), 2);

    // Winner declared while its own match is still pending
    let winner = matches[0].team1_id;
    manager.set_group_winner(groups[0].id, winner).await.unwrap();

    manager
        .record_match_result(matches[0].id, matches[0].team2_id)
        .await
        .unwrap();
    manager
        .record_match_result(matches[1].id, matches[1].team1_id)
        .await
        .unwrap();

    let champion = manager.get_team(winner).await.unwrap();
    assert_eq!(champion.losses, 1);
    assert!(!champion.is_eliminated);

    for team in teams.iter().filter(|t| t.id != winner) {
        assert!(manager.get_team(team.id).await.unwrap().is_eliminated);
    }

    let outcome = manager.advance_stage(BRACKET).await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::ChampionCrowned { champion_id: winner });
}

#[tokio::test]
async fn test_set_group_winner_rejects_outsider() {
    let manager = setup_manager(2);
    register_teams(&manager, BRACKET, 4).await;
    let groups = manager.generate_first_stage(BRACKET).await.unwrap();

    let other = manager.get_group(groups[1].id).await.unwrap();
    let result = manager
        .set_group_winner(groups[0].id, other.members[0].team_id)
        .await;
    assert!(matches!(result, Err(TournamentError::NotAMember { .. })));

    let untouched = manager.get_group(groups[0].id).await.unwrap();
    assert!(!untouched.group.is_completed);
    assert!(untouched.group.winner_team_id.is_none());
}

#[tokio::test]
async fn test_match_result_is_never_double_counted() {
    let manager = setup_manager(2);
    register_teams(&manager, BRACKET, 2).await;
    manager.generate_first_stage(BRACKET).await.unwrap();

    let m = manager
        .list_matches(&MatchFilter::bracket(BRACKET))
        .await
        .unwrap()
        .remove(0);

    let outsider = register_teams(&manager, Bracket::new(9, 9), 1).await.remove(0);
    let invalid = manager.record_match_result(m.id, outsider.id).await;
    assert!(matches!(invalid, Err(TournamentError::InvalidWinner { .. })));

    manager.record_match_result(m.id, m.team2_id).await.unwrap();
    let repeat = manager.record_match_result(m.id, m.team2_id).await;
    assert!(matches!(
        repeat,
        Err(TournamentError::MatchAlreadyResolved(_))
    ));

    let winner = manager.get_team(m.team2_id).await.unwrap();
    let loser = manager.get_team(m.team1_id).await.unwrap();
    assert_eq!((winner.wins, winner.losses), (1, 0));
    assert_eq!((loser.wins, loser.losses), (0, 1));
    assert!(loser.is_eliminated);
    assert!(!winner.is_eliminated);

    let group = manager.get_group(m.group_id.unwrap()).await.unwrap();
    let counters: HashMap<TeamId, (i32, i32, i32)> = group
        .members
        .iter()
        .map(|g| (g.team_id, (g.wins, g.losses, g.matches_played)))
        .collect();
    assert_eq!(counters[&m.team2_id], (1, 0, 1));
    assert_eq!(counters[&m.team1_id], (0, 1, 1));
}

#[tokio::test]
async fn test_fresh_draw_resets_stats_of_eligible_teams() {
    let manager = setup_manager(2);
    register_teams(&manager, BRACKET, 4).await;
    manager.generate_first_stage(BRACKET).await.unwrap();

    let m = manager
        .list_matches(&MatchFilter::bracket(BRACKET))
        .await
        .unwrap()
        .remove(0);
    manager.record_match_result(m.id, m.team1_id).await.unwrap();

    // The loser is now eliminated and sits out the redraw
    let groups = manager.generate_first_stage(BRACKET).await.unwrap();
    let drawn: usize = manager
        .standings(BRACKET, None)
        .await
        .unwrap()
        .iter()
        .map(|g| g.members.len())
        .sum();
    assert_eq!(drawn, 3);
    assert_eq!(groups.len(), 2);

    let winner = manager.get_team(m.team1_id).await.unwrap();
    assert_eq!((winner.wins, winner.losses), (0, 0));
}

#[tokio::test]
async fn test_reset_groups_is_scoped_to_bracket() {
    let manager = setup_manager(2);
    let other = Bracket::new(BRACKET.category_id, BRACKET.division_id + 1);
    register_teams(&manager, BRACKET, 4).await;
    register_teams(&manager, other, 4).await;
    manager.generate_first_stage(BRACKET).await.unwrap();
    manager.generate_first_stage(other).await.unwrap();

    let summary = manager.reset_groups(BRACKET).await.unwrap();
    assert_eq!(summary.groups_removed, 2);
    assert_eq!(summary.matches_removed, 2);

    assert_eq!(manager.current_stage(BRACKET).await.unwrap(), 0);
    assert_eq!(manager.current_stage(other).await.unwrap(), 1);
    assert!(matches!(
        manager.stage_status(BRACKET).await,
        Err(TournamentError::NoGroupsFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_group_winners_only_one_succeeds() {
    let manager = Arc::new(setup_manager(5));
    register_teams(&manager, BRACKET, 5).await;
    let groups = manager.generate_first_stage(BRACKET).await.unwrap();
    let group = manager.get_group(groups[0].id).await.unwrap();

    let handles: Vec<_> = group
        .members
        .iter()
        .map(|member| {
            let manager = Arc::clone(&manager);
            let group_id = group.group.id;
            let team_id = member.team_id;
            tokio::spawn(async move { manager.set_group_winner(group_id, team_id).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(matches!(e, TournamentError::GroupAlreadyCompleted(_))),
        }
    }
    assert_eq!(succeeded, 1);

    let eliminated = manager
        .list_teams(&TeamFilter::bracket(BRACKET))
        .await
        .unwrap()
        .iter()
        .filter(|t| t.is_eliminated)
        .count();
    assert_eq!(eliminated, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_advance_creates_one_stage() {
    let manager = Arc::new(setup_manager(2));
    register_teams(&manager, BRACKET, 8).await;
    manager.generate_first_stage(BRACKET).await.unwrap();
    play_out_stage(&manager, BRACKET).await;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.advance_stage(BRACKET).await })
        })
        .collect();

    let mut advanced = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().advanced() {
            advanced += 1;
        }
    }
    assert_eq!(advanced, 1);
    assert_eq!(manager.current_stage(BRACKET).await.unwrap(), 2);
    assert_eq!(
        manager
            .list_groups(&GroupFilter::bracket(BRACKET).stage(2))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_delete_team_in_use_is_refused() {
    let manager = setup_manager(2);
    let teams = register_teams(&manager, BRACKET, 3).await;
    manager.generate_first_stage(BRACKET).await.unwrap();

    let result = manager.delete_team(teams[0].id).await;
    assert!(matches!(result, Err(TournamentError::TeamInUse(_))));

    manager.reset_groups(BRACKET).await.unwrap();
    manager.delete_team(teams[0].id).await.unwrap();
    assert!(matches!(
        manager.get_team(teams[0].id).await,
        Err(TournamentError::TeamNotFound(_))
    ));
}
