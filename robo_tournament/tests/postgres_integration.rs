//! Integration tests for the PostgreSQL repository.
//!
//! These need a reachable database (`DATABASE_URL`) and are ignored by
//! default. Each test works in its own random bracket so reruns never
//! collide with earlier data.

use robo_tournament::db::{Database, DatabaseConfig, PgTournamentRepository, TournamentRepository};
use robo_tournament::tournament::{
    AdvanceOutcome, Bracket, BracketConfig, GroupSizePolicy, MatchFilter, NewMatch, NewTeam,
    Seeder, TeamId, TeamUpdate, TournamentError, TournamentManager,
};
use serial_test::serial;
use std::sync::Arc;

/// Helper to create a repository against the test database
async fn setup_test_repo() -> PgTournamentRepository {
    let config = DatabaseConfig::from_env();
    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    db.ensure_schema().await.expect("Failed to create schema");
    db.repository()
}

fn random_bracket() -> Bracket {
    Bracket::new(rand::random_range(1_000..1_000_000), 1)
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
#[serial]
async fn test_team_crud_roundtrip() {
    let repo = setup_test_repo().await;
    let bracket = random_bracket();

    let team = repo
        .create_team(&NewTeam::new("Sparky", bracket).with_robot("Sparky Mk II"))
        .await
        .unwrap();
    assert_eq!(team.bracket(), bracket);
    assert_eq!(team.robot_name.as_deref(), Some("Sparky Mk II"));

    let update = TeamUpdate {
        is_qualified: Some(true),
        ..TeamUpdate::default()
    };
    let updated = repo.update_team(team.id, &update).await.unwrap();
    assert!(updated.is_qualified);
    assert_eq!(updated.name, "Sparky");

    repo.reset_team_stats(&[team.id]).await.unwrap();
    let reset = repo.find_team(team.id).await.unwrap().unwrap();
    assert_eq!((reset.wins, reset.losses, reset.is_eliminated), (0, 0, false));

    repo.delete_team(team.id).await.unwrap();
    assert!(repo.find_team(team.id).await.unwrap().is_none());
}

fn exhibition(bracket: Bracket, team1_id: TeamId, team2_id: TeamId) -> NewMatch {
    NewMatch {
        category_id: bracket.category_id,
        division_id: bracket.division_id,
        round_name: Some("Exhibition".to_string()),
        round_number: 1,
        match_number: 1,
        team1_id,
        team2_id,
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
#[serial]
async fn test_free_standing_match_resolution() {
    let repo = setup_test_repo().await;
    let bracket = random_bracket();

    let a = repo.create_team(&NewTeam::new("A", bracket)).await.unwrap();
    let b = repo.create_team(&NewTeam::new("B", bracket)).await.unwrap();

    let m = repo
        .create_match(&exhibition(bracket, a.id, b.id))
        .await
        .unwrap();
    assert!(m.group_id.is_none());

    let elsewhere = repo
        .create_match(&NewMatch {
            division_id: bracket.division_id + 1,
            match_number: 2,
            ..exhibition(bracket, a.id, b.id)
        })
        .await;
    assert!(matches!(elsewhere, Err(TournamentError::InvalidMatch(_))));

    let resolved = repo.complete_match(m.id, b.id).await.unwrap();
    assert_eq!(resolved.winner_id, Some(b.id));

    let again = repo.complete_match(m.id, b.id).await;
    assert!(matches!(again, Err(TournamentError::MatchAlreadyResolved(_))));

    let in_use = repo.delete_team(a.id).await;
    assert!(matches!(in_use, Err(TournamentError::TeamInUse(_))));

    let summary = repo.delete_bracket_groups(bracket).await.unwrap();
    assert_eq!(summary.matches_removed, 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
#[serial]
async fn test_lifecycle_against_postgres() {
    let repo = setup_test_repo().await;
    let bracket = random_bracket();
    let config = BracketConfig::default().with_group_sizes(GroupSizePolicy::uniform(2));
    let manager = TournamentManager::new(Arc::new(repo), config).with_seeder(Seeder::with_seed(1));

    for name in ["A", "B", "C", "D"] {
        manager.register_team(NewTeam::new(name, bracket)).await.unwrap();
    }

    let groups = manager.generate_first_stage(bracket).await.unwrap();
    assert_eq!(groups.len(), 2);

    for m in manager.list_matches(&MatchFilter::bracket(bracket)).await.unwrap() {
        manager.record_match_result(m.id, m.team1_id).await.unwrap();
        manager
            .set_group_winner(m.group_id.unwrap(), m.team1_id)
            .await
            .unwrap();
    }

    let outcome = manager.advance_stage(bracket).await.unwrap();
    assert_eq!(
        outcome,
        AdvanceOutcome::Advanced {
            next_stage: 2,
            advanced: 2
        }
    );

    let summary = manager.reset_groups(bracket).await.unwrap();
    assert_eq!(summary.groups_removed, 3);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
#[serial]
async fn test_group_of_four_against_postgres() {
    let repo = Arc::new(setup_test_repo().await);
    let bracket = random_bracket();
    let config = BracketConfig::default().with_group_sizes(GroupSizePolicy::uniform(4));
    let manager = TournamentManager::new(repo.clone(), config).with_seeder(Seeder::with_seed(3));

    for name in ["A", "B", "C", "D"] {
        manager.register_team(NewTeam::new(name, bracket)).await.unwrap();
    }
    let groups = manager.generate_first_stage(bracket).await.unwrap();
    let group_id = groups[0].id;

    // Same stage insert, same wins: order falls back to the membership id
    let members = repo.list_memberships(group_id).await.unwrap();
    assert_eq!(members.len(), 4);
    assert!(members.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(members, repo.list_memberships(group_id).await.unwrap());

    let matches = manager.list_matches(&MatchFilter::bracket(bracket)).await.unwrap();
    let winner = matches[0].team1_id;
    manager.set_group_winner(group_id, winner).await.unwrap();
    manager
        .record_match_result(matches[0].id, matches[0].team2_id)
        .await
        .unwrap();

    let champion = manager.get_team(winner).await.unwrap();
    assert_eq!(champion.losses, 1);
    assert!(!champion.is_eliminated);
    assert_eq!(
        manager.advance_stage(bracket).await.unwrap(),
        AdvanceOutcome::ChampionCrowned { champion_id: winner }
    );

    manager.reset_groups(bracket).await.unwrap();
}
