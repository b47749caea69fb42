//! In-memory implementation of [`TournamentRepository`].
//!
//! Every operation takes the state lock for its whole duration, so composite
//! operations are all-or-nothing exactly like their PostgreSQL counterparts.
//! Used by tests and by the server's `--memory` mode.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::TournamentRepository;
use crate::tournament::{
    TournamentError, TournamentResult,
    models::{
        Bracket, Group, GroupFilter, GroupId, GroupMembership, Match, MatchFilter, MatchId,
        MatchStatus, NewMatch, NewTeam, Team, TeamDelta, TeamFilter, TeamId, TeamUpdate,
        TeardownSummary,
    },
    seeding::StagePlan,
};

#[derive(Default)]
struct State {
    teams: HashMap<TeamId, Team>,
    groups: HashMap<GroupId, Group>,
    memberships: HashMap<GroupId, Vec<GroupMembership>>,
    matches: HashMap<MatchId, Match>,
}

impl State {
    fn team_mut(&mut self, team_id: TeamId) -> TournamentResult<&mut Team> {
        self.teams
            .get_mut(&team_id)
            .ok_or(TournamentError::TeamNotFound(team_id))
    }

    fn apply_delta(&mut self, team_id: TeamId, delta: TeamDelta) -> TournamentResult<Team> {
        let team = self.team_mut(team_id)?;
        delta.apply(team);
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    fn is_team_referenced(&self, team_id: TeamId) -> bool {
        self.memberships
            .values()
            .flatten()
            .any(|m| m.team_id == team_id)
            || self.matches.values().any(|m| m.involves(team_id))
    }

    fn bump_membership(&mut self, group_id: GroupId, team_id: TeamId, won: bool) {
        if let Some(membership) = self
            .memberships
            .get_mut(&group_id)
            .and_then(|members| members.iter_mut().find(|m| m.team_id == team_id))
        {
            if won {
                membership.wins += 1;
            } else {
                membership.losses += 1;
            }
            membership.matches_played += 1;
        }
    }
}

/// In-memory tournament repository
#[derive(Clone, Default)]
pub struct MemoryTournamentRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for MemoryTournamentRepository {
    async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team> {
        let now = Utc::now();
        let created = Team {
            id: Uuid::new_v4(),
            name: team.name.clone(),
            category_id: team.category_id,
            division_id: team.division_id,
            robot_name: team.robot_name.clone(),
            robot_description: team.robot_description.clone(),
            wins: 0,
            losses: 0,
            is_qualified: false,
            is_eliminated: false,
            created_at: now,
            updated_at: now,
        };

        self.state
            .write()
            .await
            .teams
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>> {
        Ok(self.state.read().await.teams.get(&team_id).cloned())
    }

    async fn list_teams(&self, filter: &TeamFilter) -> TournamentResult<Vec<Team>> {
        let state = self.state.read().await;
        let mut teams: Vec<Team> = state
            .teams
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.name.cmp(&b.name)));
        Ok(teams)
    }

    async fn update_team(&self, team_id: TeamId, update: &TeamUpdate) -> TournamentResult<Team> {
        let mut state = self.state.write().await;
        let team = state.team_mut(team_id)?;

        if let Some(name) = &update.name {
            team.name = name.clone();
        }
        if let Some(robot_name) = &update.robot_name {
            team.robot_name = Some(robot_name.clone());
        }
        if let Some(description) = &update.robot_description {
            team.robot_description = Some(description.clone());
        }
        if let Some(qualified) = update.is_qualified {
            team.is_qualified = qualified;
        }
        team.updated_at = Utc::now();

        Ok(team.clone())
    }

    async fn delete_team(&self, team_id: TeamId) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        if !state.teams.contains_key(&team_id) {
            return Err(TournamentError::TeamNotFound(team_id));
        }
        if state.is_team_referenced(team_id) {
            return Err(TournamentError::TeamInUse(team_id));
        }
        state.teams.remove(&team_id);
        Ok(())
    }

    async fn reset_team_stats(&self, team_ids: &[TeamId]) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        for team_id in team_ids {
            if let Some(team) = state.teams.get_mut(team_id) {
                team.wins = 0;
                team.losses = 0;
                team.is_eliminated = false;
                team.updated_at = now;
            }
        }
        Ok(())
    }

    async fn find_group(&self, group_id: GroupId) -> TournamentResult<Option<Group>> {
        Ok(self.state.read().await.groups.get(&group_id).cloned())
    }

    async fn list_groups(&self, filter: &GroupFilter) -> TournamentResult<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state
            .groups
            .values()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        groups.sort_by_key(|g| (g.category_id, g.division_id, g.stage_number, g.group_number));
        Ok(groups)
    }

    async fn list_memberships(
        &self,
        group_id: GroupId,
    ) -> TournamentResult<Vec<GroupMembership>> {
        let state = self.state.read().await;
        let mut members = state
            .memberships
            .get(&group_id)
            .cloned()
            .unwrap_or_default();
        // Stable sort keeps seeding order among equals
        members.sort_by(|a, b| b.wins.cmp(&a.wins));
        Ok(members)
    }

    async fn current_stage(&self, bracket: Bracket) -> TournamentResult<i32> {
        let state = self.state.read().await;
        Ok(state
            .groups
            .values()
            .filter(|g| g.bracket() == bracket)
            .map(|g| g.stage_number)
            .max()
            .unwrap_or(0))
    }

    async fn create_match(&self, new_match: &NewMatch) -> TournamentResult<Match> {
        if new_match.team1_id == new_match.team2_id {
            return Err(TournamentError::InvalidMatch(
                "a team cannot play itself".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let bracket = Bracket::new(new_match.category_id, new_match.division_id);
        for team_id in [new_match.team1_id, new_match.team2_id] {
            let team = state
                .teams
                .get(&team_id)
                .ok_or(TournamentError::TeamNotFound(team_id))?;
            if team.bracket() != bracket {
                return Err(TournamentError::InvalidMatch(format!(
                    "team {team_id} is registered in {}, not {bracket}",
                    team.bracket()
                )));
            }
        }

        let now = Utc::now();
        let created = Match {
            id: Uuid::new_v4(),
            category_id: new_match.category_id,
            division_id: new_match.division_id,
            group_id: None,
            group_number: None,
            stage_number: None,
            round_name: new_match.round_name.clone(),
            round_number: new_match.round_number,
            match_number: new_match.match_number,
            team1_id: new_match.team1_id,
            team2_id: new_match.team2_id,
            winner_id: None,
            status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.matches.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.state.read().await.matches.get(&match_id).cloned())
    }

    async fn list_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.group_number, m.match_number, m.created_at));
        Ok(matches)
    }

    async fn insert_stage(&self, plan: &StagePlan) -> TournamentResult<Vec<Group>> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut created = Vec::with_capacity(plan.groups.len());

        for planned in &plan.groups {
            let group = Group {
                id: planned.id,
                category_id: plan.bracket.category_id,
                division_id: plan.bracket.division_id,
                stage_number: plan.stage_number,
                group_number: planned.group_number,
                group_name: planned.group_name.clone(),
                winner_team_id: planned.bye_winner,
                is_completed: planned.bye_winner.is_some(),
                created_at: now,
                updated_at: now,
            };

            let members = planned
                .members
                .iter()
                .map(|&team_id| GroupMembership {
                    id: Uuid::new_v4(),
                    group_id: planned.id,
                    team_id,
                    wins: 0,
                    losses: 0,
                    matches_played: 0,
                    is_winner: planned.bye_winner == Some(team_id),
                    created_at: now,
                })
                .collect();

            for (index, (team1_id, team2_id)) in planned.pairings().enumerate() {
                let m = Match {
                    id: Uuid::new_v4(),
                    category_id: plan.bracket.category_id,
                    division_id: plan.bracket.division_id,
                    group_id: Some(planned.id),
                    group_number: Some(planned.group_number),
                    stage_number: Some(plan.stage_number),
                    round_name: Some(planned.group_name.clone()),
                    round_number: plan.stage_number,
                    match_number: index as i32 + 1,
                    team1_id,
                    team2_id,
                    winner_id: None,
                    status: MatchStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                state.matches.insert(m.id, m);
            }

            state.memberships.insert(planned.id, members);
            state.groups.insert(group.id, group.clone());
            created.push(group);
        }

        Ok(created)
    }

    async fn complete_match(
        &self,
        match_id: MatchId,
        winner_id: TeamId,
    ) -> TournamentResult<Match> {
        let mut state = self.state.write().await;
        let current = state
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(TournamentError::MatchNotFound(match_id))?;

        let loser_id = current
            .opponent_of(winner_id)
            .ok_or(TournamentError::InvalidWinner {
                match_id,
                team_id: winner_id,
            })?;

        if current.is_completed() {
            return Err(TournamentError::MatchAlreadyResolved(match_id));
        }

        for team_id in [winner_id, loser_id] {
            if !state.teams.contains_key(&team_id) {
                return Err(TournamentError::TeamNotFound(team_id));
            }
        }

        let declared_winner = current
            .group_id
            .and_then(|group_id| state.groups.get(&group_id))
            .filter(|group| group.is_completed)
            .and_then(|group| group.winner_team_id);

        state.apply_delta(winner_id, TeamDelta::win())?;
        state.apply_delta(loser_id, TeamDelta::loss_against(declared_winner, loser_id))?;

        if let Some(group_id) = current.group_id {
            state.bump_membership(group_id, winner_id, true);
            state.bump_membership(group_id, loser_id, false);
        }

        let resolved = state
            .matches
            .get_mut(&match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        resolved.winner_id = Some(winner_id);
        resolved.status = MatchStatus::Completed;
        resolved.updated_at = Utc::now();
        Ok(resolved.clone())
    }

    async fn complete_group(
        &self,
        group_id: GroupId,
        winner_id: TeamId,
    ) -> TournamentResult<Group> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get(&group_id)
            .cloned()
            .ok_or(TournamentError::GroupNotFound(group_id))?;

        if group.is_completed {
            return Err(TournamentError::GroupAlreadyCompleted(group_id));
        }

        let member_ids: Vec<TeamId> = state
            .memberships
            .get(&group_id)
            .map(|members| members.iter().map(|m| m.team_id).collect())
            .unwrap_or_default();

        if !member_ids.contains(&winner_id) {
            return Err(TournamentError::NotAMember {
                group_id,
                team_id: winner_id,
            });
        }

        let now = Utc::now();
        if let Some(members) = state.memberships.get_mut(&group_id) {
            for membership in members.iter_mut() {
                membership.is_winner = membership.team_id == winner_id;
            }
        }

        for team_id in member_ids {
            let delta = if team_id == winner_id {
                TeamDelta::reinstate()
            } else {
                TeamDelta::eliminate()
            };
            // Members whose team was deleted out from under the group are skipped
            if state.teams.contains_key(&team_id) {
                state.apply_delta(team_id, delta)?;
            }
        }

        let completed = state
            .groups
            .get_mut(&group_id)
            .ok_or(TournamentError::GroupNotFound(group_id))?;
        completed.winner_team_id = Some(winner_id);
        completed.is_completed = true;
        completed.updated_at = now;
        Ok(completed.clone())
    }

    async fn delete_bracket_groups(&self, bracket: Bracket) -> TournamentResult<TeardownSummary> {
        let mut state = self.state.write().await;

        let matches_before = state.matches.len();
        state.matches.retain(|_, m| m.bracket() != bracket);
        let matches_removed = (matches_before - state.matches.len()) as u64;

        let doomed: Vec<GroupId> = state
            .groups
            .values()
            .filter(|g| g.bracket() == bracket)
            .map(|g| g.id)
            .collect();
        for group_id in &doomed {
            state.groups.remove(group_id);
            state.memberships.remove(group_id);
        }

        Ok(TeardownSummary {
            groups_removed: doomed.len() as u64,
            matches_removed,
        })
    }

    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }
}
