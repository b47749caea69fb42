//! PostgreSQL implementation of [`TournamentRepository`].

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::repository::TournamentRepository;
use super::timeouts::{with_default_timeout, with_transaction_timeout};
use crate::tournament::{
    TournamentError, TournamentResult,
    models::{
        Bracket, Group, GroupFilter, GroupId, GroupMembership, Match, MatchFilter, MatchId,
        MatchStatus, NewMatch, NewTeam, Team, TeamDelta, TeamFilter, TeamId, TeamUpdate,
        TeardownSummary,
    },
    seeding::StagePlan,
};

macro_rules! team_columns {
    () => {
        "id, name, category_id, division_id, robot_name, robot_description, wins, losses, \
         is_qualified, is_eliminated, created_at, updated_at"
    };
}

macro_rules! group_columns {
    () => {
        "id, category_id, division_id, stage_number, group_number, group_name, winner_team_id, \
         is_completed, created_at, updated_at"
    };
}

macro_rules! membership_columns {
    () => {
        "id, group_id, team_id, wins, losses, matches_played, is_winner, created_at"
    };
}

macro_rules! match_columns {
    () => {
        "id, category_id, division_id, group_id, group_number, stage_number, round_name, \
         round_number, match_number, team1_id, team2_id, winner_id, status, created_at, updated_at"
    };
}

fn team_from_row(row: &PgRow) -> Result<Team, sqlx::Error> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category_id: row.try_get("category_id")?,
        division_id: row.try_get("division_id")?,
        robot_name: row.try_get("robot_name")?,
        robot_description: row.try_get("robot_description")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
        is_qualified: row.try_get("is_qualified")?,
        is_eliminated: row.try_get("is_eliminated")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn group_from_row(row: &PgRow) -> Result<Group, sqlx::Error> {
    Ok(Group {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        division_id: row.try_get("division_id")?,
        stage_number: row.try_get("stage_number")?,
        group_number: row.try_get("group_number")?,
        group_name: row.try_get("group_name")?,
        winner_team_id: row.try_get("winner_team_id")?,
        is_completed: row.try_get("is_completed")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<GroupMembership, sqlx::Error> {
    Ok(GroupMembership {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        team_id: row.try_get("team_id")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
        matches_played: row.try_get("matches_played")?,
        is_winner: row.try_get("is_winner")?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = MatchStatus::parse(&status)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown match status '{status}'").into()))?;

    Ok(Match {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        division_id: row.try_get("division_id")?,
        group_id: row.try_get("group_id")?,
        group_number: row.try_get("group_number")?,
        stage_number: row.try_get("stage_number")?,
        round_name: row.try_get("round_name")?,
        round_number: row.try_get("round_number")?,
        match_number: row.try_get("match_number")?,
        team1_id: row.try_get("team1_id")?,
        team2_id: row.try_get("team2_id")?,
        winner_id: row.try_get("winner_id")?,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Single-statement counter/flag update shared by both resolvers
async fn apply_delta_on(
    conn: &mut PgConnection,
    team_id: TeamId,
    delta: TeamDelta,
) -> TournamentResult<Team> {
    let row = sqlx::query(concat!(
        "UPDATE teams
         SET wins = wins + $2,
             losses = losses + $3,
             is_eliminated = COALESCE($4, is_eliminated),
             updated_at = NOW()
         WHERE id = $1
         RETURNING ",
        team_columns!()
    ))
    .bind(team_id)
    .bind(delta.wins)
    .bind(delta.losses)
    .bind(delta.eliminated)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(TournamentError::TeamNotFound(team_id))?;

    Ok(team_from_row(&row)?)
}

async fn bump_membership_on(
    conn: &mut PgConnection,
    group_id: GroupId,
    team_id: TeamId,
    won: bool,
) -> TournamentResult<()> {
    let (wins, losses) = if won { (1, 0) } else { (0, 1) };
    sqlx::query(
        "UPDATE group_teams
         SET wins = wins + $3, losses = losses + $4, matches_played = matches_played + 1
         WHERE group_id = $1 AND team_id = $2",
    )
    .bind(group_id)
    .bind(team_id)
    .bind(wins)
    .bind(losses)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// PostgreSQL-backed tournament repository
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team> {
        let row = with_default_timeout(
            sqlx::query(concat!(
                "INSERT INTO teams (id, name, category_id, division_id, robot_name, robot_description)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING ",
                team_columns!()
            ))
            .bind(Uuid::new_v4())
            .bind(&team.name)
            .bind(team.category_id)
            .bind(team.division_id)
            .bind(&team.robot_name)
            .bind(&team.robot_description)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(team_from_row(&row)?)
    }

    async fn find_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>> {
        let row = with_default_timeout(
            sqlx::query(concat!("SELECT ", team_columns!(), " FROM teams WHERE id = $1"))
                .bind(team_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(team_from_row).transpose()?)
    }

    async fn list_teams(&self, filter: &TeamFilter) -> TournamentResult<Vec<Team>> {
        let rows = with_default_timeout(
            sqlx::query(concat!(
                "SELECT ",
                team_columns!(),
                " FROM teams
                  WHERE ($1::INTEGER IS NULL OR category_id = $1)
                    AND ($2::INTEGER IS NULL OR division_id = $2)
                    AND ($3::BOOLEAN IS NULL OR is_eliminated = $3)
                  ORDER BY wins DESC, name"
            ))
            .bind(filter.category_id)
            .bind(filter.division_id)
            .bind(filter.eliminated)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(team_from_row).collect::<Result<_, _>>()?)
    }

    async fn update_team(&self, team_id: TeamId, update: &TeamUpdate) -> TournamentResult<Team> {
        let row = with_default_timeout(
            sqlx::query(concat!(
                "UPDATE teams
                 SET name = COALESCE($2, name),
                     robot_name = COALESCE($3, robot_name),
                     robot_description = COALESCE($4, robot_description),
                     is_qualified = COALESCE($5, is_qualified),
                     updated_at = NOW()
                 WHERE id = $1
                 RETURNING ",
                team_columns!()
            ))
            .bind(team_id)
            .bind(&update.name)
            .bind(&update.robot_name)
            .bind(&update.robot_description)
            .bind(update.is_qualified)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(TournamentError::TeamNotFound(team_id))?;

        Ok(team_from_row(&row)?)
    }

    async fn delete_team(&self, team_id: TeamId) -> TournamentResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                "SELECT
                    EXISTS(SELECT 1 FROM teams WHERE id = $1) AS present,
                    EXISTS(SELECT 1 FROM group_teams WHERE team_id = $1)
                        OR EXISTS(SELECT 1 FROM matches WHERE team1_id = $1 OR team2_id = $1)
                        AS referenced",
            )
            .bind(team_id)
            .fetch_one(&mut *tx)
            .await?;

            if !row.try_get::<bool, _>("present")? {
                return Err(TournamentError::TeamNotFound(team_id));
            }
            if row.try_get::<bool, _>("referenced")? {
                return Err(TournamentError::TeamInUse(team_id));
            }

            sqlx::query("DELETE FROM teams WHERE id = $1")
                .bind(team_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn reset_team_stats(&self, team_ids: &[TeamId]) -> TournamentResult<()> {
        with_default_timeout(
            sqlx::query(
                "UPDATE teams
                 SET wins = 0, losses = 0, is_eliminated = FALSE, updated_at = NOW()
                 WHERE id = ANY($1)",
            )
            .bind(team_ids)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn find_group(&self, group_id: GroupId) -> TournamentResult<Option<Group>> {
        let row = with_default_timeout(
            sqlx::query(concat!(
                "SELECT ",
                group_columns!(),
                " FROM tournament_groups WHERE id = $1"
            ))
            .bind(group_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(group_from_row).transpose()?)
    }

    async fn list_groups(&self, filter: &GroupFilter) -> TournamentResult<Vec<Group>> {
        let rows = with_default_timeout(
            sqlx::query(concat!(
                "SELECT ",
                group_columns!(),
                " FROM tournament_groups
                  WHERE ($1::INTEGER IS NULL OR category_id = $1)
                    AND ($2::INTEGER IS NULL OR division_id = $2)
                    AND ($3::INTEGER IS NULL OR stage_number = $3)
                  ORDER BY category_id, division_id, stage_number, group_number"
            ))
            .bind(filter.category_id)
            .bind(filter.division_id)
            .bind(filter.stage_number)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(group_from_row).collect::<Result<_, _>>()?)
    }

    async fn list_memberships(
        &self,
        group_id: GroupId,
    ) -> TournamentResult<Vec<GroupMembership>> {
        let rows = with_default_timeout(
            sqlx::query(concat!(
                "SELECT ",
                membership_columns!(),
                " FROM group_teams WHERE group_id = $1 ORDER BY wins DESC, created_at, id"
            ))
            .bind(group_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(membership_from_row).collect::<Result<_, _>>()?)
    }

    async fn current_stage(&self, bracket: Bracket) -> TournamentResult<i32> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT COALESCE(MAX(stage_number), 0) AS stage
                 FROM tournament_groups
                 WHERE category_id = $1 AND division_id = $2",
            )
            .bind(bracket.category_id)
            .bind(bracket.division_id)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.try_get("stage")?)
    }

    async fn create_match(&self, new_match: &NewMatch) -> TournamentResult<Match> {
        if new_match.team1_id == new_match.team2_id {
            return Err(TournamentError::InvalidMatch(
                "a team cannot play itself".to_string(),
            ));
        }

        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let bracket = Bracket::new(new_match.category_id, new_match.division_id);
            for team_id in [new_match.team1_id, new_match.team2_id] {
                let row = sqlx::query("SELECT category_id, division_id FROM teams WHERE id = $1")
                    .bind(team_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(TournamentError::TeamNotFound(team_id))?;
                let registered = Bracket::new(row.try_get("category_id")?, row.try_get("division_id")?);
                if registered != bracket {
                    return Err(TournamentError::InvalidMatch(format!(
                        "team {team_id} is registered in {registered}, not {bracket}"
                    )));
                }
            }

            let row = sqlx::query(concat!(
                "INSERT INTO matches
                    (id, category_id, division_id, round_name, round_number, match_number,
                     team1_id, team2_id, status)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
                 RETURNING ",
                match_columns!()
            ))
            .bind(Uuid::new_v4())
            .bind(new_match.category_id)
            .bind(new_match.division_id)
            .bind(&new_match.round_name)
            .bind(new_match.round_number)
            .bind(new_match.match_number)
            .bind(new_match.team1_id)
            .bind(new_match.team2_id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(match_from_row(&row)?)
        })
        .await
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let row = with_default_timeout(
            sqlx::query(concat!("SELECT ", match_columns!(), " FROM matches WHERE id = $1"))
                .bind(match_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(match_from_row).transpose()?)
    }

    async fn list_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        let rows = with_default_timeout(
            sqlx::query(concat!(
                "SELECT ",
                match_columns!(),
                " FROM matches
                  WHERE ($1::INTEGER IS NULL OR category_id = $1)
                    AND ($2::INTEGER IS NULL OR division_id = $2)
                    AND ($3::TEXT IS NULL OR status = $3)
                    AND ($4::UUID IS NULL OR group_id = $4)
                    AND ($5::INTEGER IS NULL OR stage_number = $5)
                    AND ($6::UUID IS NULL OR team1_id = $6 OR team2_id = $6)
                  ORDER BY round_number, group_number NULLS FIRST, match_number, created_at"
            ))
            .bind(filter.category_id)
            .bind(filter.division_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.group_id)
            .bind(filter.stage_number)
            .bind(filter.team_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(match_from_row).collect::<Result<_, _>>()?)
    }

    async fn insert_stage(&self, plan: &StagePlan) -> TournamentResult<Vec<Group>> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;
            let mut created = Vec::with_capacity(plan.groups.len());

            for planned in &plan.groups {
                let row = sqlx::query(concat!(
                    "INSERT INTO tournament_groups
                        (id, category_id, division_id, stage_number, group_number, group_name,
                         winner_team_id, is_completed)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING ",
                    group_columns!()
                ))
                .bind(planned.id)
                .bind(plan.bracket.category_id)
                .bind(plan.bracket.division_id)
                .bind(plan.stage_number)
                .bind(planned.group_number)
                .bind(&planned.group_name)
                .bind(planned.bye_winner)
                .bind(planned.bye_winner.is_some())
                .fetch_one(&mut *tx)
                .await?;
                created.push(group_from_row(&row)?);

                for &team_id in &planned.members {
                    sqlx::query(
                        "INSERT INTO group_teams (id, group_id, team_id, is_winner)
                         VALUES ($1, $2, $3, $4)",
                    )
                    .bind(Uuid::new_v4())
                    .bind(planned.id)
                    .bind(team_id)
                    .bind(planned.bye_winner == Some(team_id))
                    .execute(&mut *tx)
                    .await?;
                }

                for (index, (team1_id, team2_id)) in planned.pairings().enumerate() {
                    sqlx::query(
                        "INSERT INTO matches
                            (id, category_id, division_id, group_id, group_number, stage_number,
                             round_name, round_number, match_number, team1_id, team2_id, status)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending')",
                    )
                    .bind(Uuid::new_v4())
                    .bind(plan.bracket.category_id)
                    .bind(plan.bracket.division_id)
                    .bind(planned.id)
                    .bind(planned.group_number)
                    .bind(plan.stage_number)
                    .bind(&planned.group_name)
                    .bind(plan.stage_number)
                    .bind(index as i32 + 1)
                    .bind(team1_id)
                    .bind(team2_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            tx.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn complete_match(
        &self,
        match_id: MatchId,
        winner_id: TeamId,
    ) -> TournamentResult<Match> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(concat!(
                "SELECT ",
                match_columns!(),
                " FROM matches WHERE id = $1 FOR UPDATE"
            ))
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;
            let current = match_from_row(&row)?;

            let loser_id = current
                .opponent_of(winner_id)
                .ok_or(TournamentError::InvalidWinner {
                    match_id,
                    team_id: winner_id,
                })?;

            // Conditional transition: a concurrent resolver that got here
            // first leaves nothing to update
            let row = sqlx::query(concat!(
                "UPDATE matches
                 SET winner_id = $2, status = 'completed', updated_at = NOW()
                 WHERE id = $1 AND status = 'pending'
                 RETURNING ",
                match_columns!()
            ))
            .bind(match_id)
            .bind(winner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::MatchAlreadyResolved(match_id))?;
            let resolved = match_from_row(&row)?;

            let declared_winner: Option<TeamId> = match current.group_id {
                Some(group_id) => sqlx::query(
                    "SELECT winner_team_id FROM tournament_groups
                     WHERE id = $1 AND is_completed = TRUE
                     FOR SHARE",
                )
                .bind(group_id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get::<Option<TeamId>, _>("winner_team_id"))
                .transpose()?
                .flatten(),
                None => None,
            };

            apply_delta_on(&mut tx, winner_id, TeamDelta::win()).await?;
            apply_delta_on(
                &mut tx,
                loser_id,
                TeamDelta::loss_against(declared_winner, loser_id),
            )
            .await?;

            if let Some(group_id) = current.group_id {
                bump_membership_on(&mut tx, group_id, winner_id, true).await?;
                bump_membership_on(&mut tx, group_id, loser_id, false).await?;
            }

            tx.commit().await?;
            Ok(resolved)
        })
        .await
    }

    async fn complete_group(
        &self,
        group_id: GroupId,
        winner_id: TeamId,
    ) -> TournamentResult<Group> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(concat!(
                "SELECT ",
                group_columns!(),
                " FROM tournament_groups WHERE id = $1 FOR UPDATE"
            ))
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::GroupNotFound(group_id))?;

            if group_from_row(&row)?.is_completed {
                return Err(TournamentError::GroupAlreadyCompleted(group_id));
            }

            let member_ids: Vec<TeamId> =
                sqlx::query_scalar("SELECT team_id FROM group_teams WHERE group_id = $1")
                    .bind(group_id)
                    .fetch_all(&mut *tx)
                    .await?;

            if !member_ids.contains(&winner_id) {
                return Err(TournamentError::NotAMember {
                    group_id,
                    team_id: winner_id,
                });
            }

            let row = sqlx::query(concat!(
                "UPDATE tournament_groups
                 SET winner_team_id = $2, is_completed = TRUE, updated_at = NOW()
                 WHERE id = $1 AND is_completed = FALSE
                 RETURNING ",
                group_columns!()
            ))
            .bind(group_id)
            .bind(winner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::GroupAlreadyCompleted(group_id))?;
            let completed = group_from_row(&row)?;

            sqlx::query("UPDATE group_teams SET is_winner = (team_id = $2) WHERE group_id = $1")
                .bind(group_id)
                .bind(winner_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "UPDATE teams
                 SET is_eliminated = (id <> $2), updated_at = NOW()
                 WHERE id = ANY($1)",
            )
            .bind(&member_ids)
            .bind(winner_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(completed)
        })
        .await
    }

    async fn delete_bracket_groups(&self, bracket: Bracket) -> TournamentResult<TeardownSummary> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let matches = sqlx::query("DELETE FROM matches WHERE category_id = $1 AND division_id = $2")
                .bind(bracket.category_id)
                .bind(bracket.division_id)
                .execute(&mut *tx)
                .await?;

            // Memberships go with their group (ON DELETE CASCADE)
            let groups = sqlx::query(
                "DELETE FROM tournament_groups WHERE category_id = $1 AND division_id = $2",
            )
            .bind(bracket.category_id)
            .bind(bracket.division_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(TeardownSummary {
                groups_removed: groups.rows_affected(),
                matches_removed: matches.rows_affected(),
            })
        })
        .await
    }

    async fn health_check(&self) -> TournamentResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}
