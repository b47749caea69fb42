//! Tournament manager driving group play for every bracket.

use super::{
    config::BracketConfig,
    errors::{TournamentError, TournamentResult},
    events::{ChangeEvent, ChangeNotifier},
    locks::BracketLocks,
    models::{
        AdvanceOutcome, Bracket, Group, GroupFilter, GroupId, GroupWithMembers, Match,
        MatchFilter, MatchId, NewMatch, NewTeam, StageStatus, Team, TeamFilter, TeamId,
        TeamUpdate, TeardownSummary,
    },
    seeding::{MIN_CONTESTANTS, Seeder, StagePlan},
};
use crate::db::TournamentRepository;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Tournament manager
///
/// Every mutating operation holds the lock of the bracket it touches for its
/// whole duration, so two requests can never seed, resolve or advance the
/// same bracket at once.
pub struct TournamentManager {
    /// Persistence backend
    repo: Arc<dyn TournamentRepository>,

    /// Group sizes and bye handling
    config: BracketConfig,

    /// Source of randomness for seeding
    seeder: Mutex<Seeder>,

    /// One mutex per bracket
    locks: BracketLocks,

    /// Change fan-out for subscribers
    notifier: ChangeNotifier,
}

impl TournamentManager {
    /// Create a new tournament manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Tournament repository
    /// * `config` - Bracket configuration
    pub fn new(repo: Arc<dyn TournamentRepository>, config: BracketConfig) -> Self {
        Self {
            repo,
            config,
            seeder: Mutex::new(Seeder::new()),
            locks: BracketLocks::new(),
            notifier: ChangeNotifier::default(),
        }
    }

    /// Replace the seeder, e.g. with a seeded one for reproducible draws
    pub fn with_seeder(mut self, seeder: Seeder) -> Self {
        self.seeder = Mutex::new(seeder);
        self
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    /// Receive a [`ChangeEvent`] for every entity a later mutation touches
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    pub async fn health_check(&self) -> TournamentResult<()> {
        self.repo.health_check().await
    }

    // === Teams ===

    pub async fn list_teams(&self, filter: &TeamFilter) -> TournamentResult<Vec<Team>> {
        self.repo.list_teams(filter).await
    }

    pub async fn get_team(&self, team_id: TeamId) -> TournamentResult<Team> {
        self.repo
            .find_team(team_id)
            .await?
            .ok_or(TournamentError::TeamNotFound(team_id))
    }

    /// Register a team in its bracket
    pub async fn register_team(&self, team: NewTeam) -> TournamentResult<Team> {
        let created = self.repo.create_team(&team).await?;
        log::info!("Registered team '{}' in {}", created.name, created.bracket());
        self.notifier.publish(ChangeEvent::Team(created.id));
        Ok(created)
    }

    pub async fn update_team(
        &self,
        team_id: TeamId,
        update: &TeamUpdate,
    ) -> TournamentResult<Team> {
        if update.is_empty() {
            return self.get_team(team_id).await;
        }

        let updated = self.repo.update_team(team_id, update).await?;
        self.notifier.publish(ChangeEvent::Team(team_id));
        Ok(updated)
    }

    /// Delete a team no group or match refers to
    pub async fn delete_team(&self, team_id: TeamId) -> TournamentResult<()> {
        self.repo
            .delete_team(team_id)
            .await
            .inspect_err(|e| log::warn!("Refused to delete team {}: {}", team_id, e))?;
        log::info!("Deleted team {}", team_id);
        self.notifier.publish(ChangeEvent::Team(team_id));
        Ok(())
    }

    /// Every match a team played or will play
    pub async fn team_matches(&self, team_id: TeamId) -> TournamentResult<Vec<Match>> {
        self.get_team(team_id).await?;
        self.repo.list_matches(&MatchFilter::team(team_id)).await
    }

    // === Groups ===

    pub async fn list_groups(&self, filter: &GroupFilter) -> TournamentResult<Vec<Group>> {
        self.repo.list_groups(filter).await
    }

    /// A group together with its memberships
    pub async fn get_group(&self, group_id: GroupId) -> TournamentResult<GroupWithMembers> {
        let group = self
            .repo
            .find_group(group_id)
            .await?
            .ok_or(TournamentError::GroupNotFound(group_id))?;
        let members = self.repo.list_memberships(group_id).await?;
        Ok(GroupWithMembers { group, members })
    }

    /// Groups of a stage with their memberships
    ///
    /// Defaults to the current stage; a bracket without groups has no
    /// standings.
    pub async fn standings(
        &self,
        bracket: Bracket,
        stage_number: Option<i32>,
    ) -> TournamentResult<Vec<GroupWithMembers>> {
        let stage_number = match stage_number {
            Some(stage) => stage,
            None => self.repo.current_stage(bracket).await?,
        };
        if stage_number == 0 {
            return Ok(Vec::new());
        }

        let groups = self
            .repo
            .list_groups(&GroupFilter::bracket(bracket).stage(stage_number))
            .await?;

        let mut standings = Vec::with_capacity(groups.len());
        for group in groups {
            let members = self.repo.list_memberships(group.id).await?;
            standings.push(GroupWithMembers { group, members });
        }
        Ok(standings)
    }

    /// Highest stage number of the bracket, 0 before the first draw
    pub async fn current_stage(&self, bracket: Bracket) -> TournamentResult<i32> {
        self.repo.current_stage(bracket).await
    }

    // === Matches ===

    pub async fn list_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        self.repo.list_matches(filter).await
    }

    pub async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    /// Schedule a match outside of group play
    pub async fn create_match(&self, new_match: NewMatch) -> TournamentResult<Match> {
        let bracket = Bracket::new(new_match.category_id, new_match.division_id);
        let _guard = self.locks.acquire(bracket).await;

        let created = self.repo.create_match(&new_match).await?;
        log::info!(
            "Scheduled match {} in {} (round {}, match {})",
            created.id,
            bracket,
            created.round_number,
            created.match_number
        );
        self.notifier.publish(ChangeEvent::Match(created.id));
        Ok(created)
    }

    /// Record the winner of a pending match
    ///
    /// The winner gains a win; the loser gains a loss and is eliminated.
    ///
    /// # Errors
    ///
    /// * `TournamentError::MatchNotFound`
    /// * `TournamentError::InvalidWinner` - winner does not play in the match
    /// * `TournamentError::MatchAlreadyResolved` - a result was already recorded
    pub async fn record_match_result(
        &self,
        match_id: MatchId,
        winner_id: TeamId,
    ) -> TournamentResult<Match> {
        let bracket = self.get_match(match_id).await?.bracket();
        let _guard = self.locks.acquire(bracket).await;

        let resolved = self
            .repo
            .complete_match(match_id, winner_id)
            .await
            .inspect_err(|e| log::warn!("Rejected result for match {}: {}", match_id, e))?;

        log::info!("Match {} won by team {}", match_id, winner_id);

        let mut events = vec![ChangeEvent::Match(match_id), ChangeEvent::Team(winner_id)];
        if let Some(loser_id) = resolved.loser_id() {
            events.push(ChangeEvent::Team(loser_id));
        }
        if let Some(group_id) = resolved.group_id {
            events.push(ChangeEvent::Group(group_id));
        }
        self.notifier.publish_all(events);

        Ok(resolved)
    }

    /// Declare the winner of a group
    ///
    /// Every other member of the group is eliminated. No match has to be
    /// played first, so this doubles as a manual override.
    ///
    /// # Errors
    ///
    /// * `TournamentError::GroupNotFound`
    /// * `TournamentError::GroupAlreadyCompleted`
    /// * `TournamentError::NotAMember`
    pub async fn set_group_winner(
        &self,
        group_id: GroupId,
        winner_id: TeamId,
    ) -> TournamentResult<Group> {
        let group = self
            .repo
            .find_group(group_id)
            .await?
            .ok_or(TournamentError::GroupNotFound(group_id))?;
        let _guard = self.locks.acquire(group.bracket()).await;

        let completed = self
            .repo
            .complete_group(group_id, winner_id)
            .await
            .inspect_err(|e| log::warn!("Rejected winner for group {}: {}", group_id, e))?;

        log::info!(
            "{} ({}) won by team {}",
            completed.group_name,
            completed.bracket(),
            winner_id
        );

        let members = self.repo.list_memberships(group_id).await?;
        self.notifier.publish(ChangeEvent::Group(group_id));
        self.notifier
            .publish_all(members.iter().map(|m| ChangeEvent::Team(m.team_id)));

        Ok(completed)
    }

    // === Stages ===

    /// Draw stage 1 of a bracket from its eligible teams
    ///
    /// Existing groups and matches of the bracket are torn down first and the
    /// stats of every drawn team are reset.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InsufficientContestants` - fewer than two eligible teams
    /// * `TournamentError::InvalidGroupSize` - configured size below two
    pub async fn generate_first_stage(&self, bracket: Bracket) -> TournamentResult<Vec<Group>> {
        let _guard = self.locks.acquire(bracket).await;

        let eligible = self
            .repo
            .list_teams(&TeamFilter::bracket(bracket).eligible())
            .await?;

        if eligible.len() < MIN_CONTESTANTS {
            log::warn!(
                "Cannot draw {}: only {} eligible team(s)",
                bracket,
                eligible.len()
            );
            return Err(TournamentError::InsufficientContestants {
                needed: MIN_CONTESTANTS,
                available: eligible.len(),
            });
        }

        let team_ids: Vec<TeamId> = eligible.iter().map(|t| t.id).collect();
        let plan = self.plan(bracket, 1, team_ids.clone())?;

        let teardown = self.repo.delete_bracket_groups(bracket).await?;
        if teardown.groups_removed > 0 {
            log::debug!(
                "Cleared {} group(s) and {} match(es) of {} before drawing",
                teardown.groups_removed,
                teardown.matches_removed,
                bracket
            );
        }
        self.repo.reset_team_stats(&team_ids).await?;

        let groups = self.repo.insert_stage(&plan).await?;

        log::info!(
            "Drew stage 1 of {}: {} team(s) in {} group(s), {} match(es)",
            bracket,
            plan.team_count(),
            groups.len(),
            plan.match_count()
        );

        self.publish_stage(bracket, &groups, &team_ids);
        Ok(groups)
    }

    /// Move the winners of the current stage into a freshly drawn next stage
    ///
    /// Incomplete stages and a decided tournament are reported through the
    /// returned [`AdvanceOutcome`] and leave everything untouched.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NoGroupsFound` - the bracket has not been drawn
    pub async fn advance_stage(&self, bracket: Bracket) -> TournamentResult<AdvanceOutcome> {
        let _guard = self.locks.acquire(bracket).await;

        let (stage_number, groups) = self.current_groups(bracket).await?;

        let incomplete = groups.iter().filter(|g| !g.is_completed).count();
        if incomplete > 0 {
            log::debug!(
                "Stage {} of {} still has {} open group(s)",
                stage_number,
                bracket,
                incomplete
            );
            return Ok(AdvanceOutcome::IncompleteGroups { incomplete });
        }

        let winners: Vec<TeamId> = groups.iter().filter_map(|g| g.winner_team_id).collect();

        let outcome = match winners.as_slice() {
            [] => AdvanceOutcome::NoWinners,
            [champion_id] => {
                log::info!("Team {} is the champion of {}", champion_id, bracket);
                AdvanceOutcome::ChampionCrowned {
                    champion_id: *champion_id,
                }
            }
            _ => {
                let next_stage = stage_number + 1;
                let plan = self.plan(bracket, next_stage, winners.clone())?;
                let created = self.repo.insert_stage(&plan).await?;

                log::info!(
                    "Advanced {} winner(s) of {} to stage {} ({} group(s))",
                    winners.len(),
                    bracket,
                    next_stage,
                    created.len()
                );

                self.publish_stage(bracket, &created, &winners);
                AdvanceOutcome::Advanced {
                    next_stage,
                    advanced: winners.len(),
                }
            }
        };

        Ok(outcome)
    }

    /// Where the current stage of a bracket stands
    ///
    /// # Errors
    ///
    /// * `TournamentError::NoGroupsFound` - the bracket has not been drawn
    pub async fn stage_status(&self, bracket: Bracket) -> TournamentResult<StageStatus> {
        let (stage_number, groups) = self.current_groups(bracket).await?;

        let incomplete = groups.iter().filter(|g| !g.is_completed).count();
        if incomplete > 0 {
            return Ok(StageStatus::Open {
                stage_number,
                incomplete,
            });
        }

        let winners: Vec<TeamId> = groups.iter().filter_map(|g| g.winner_team_id).collect();
        Ok(match winners.as_slice() {
            [champion_id] => StageStatus::Final {
                stage_number,
                champion_id: *champion_id,
            },
            _ => StageStatus::Resolved {
                stage_number,
                winners,
            },
        })
    }

    /// Delete every group and match of a bracket
    pub async fn reset_groups(&self, bracket: Bracket) -> TournamentResult<TeardownSummary> {
        let _guard = self.locks.acquire(bracket).await;

        let summary = self.repo.delete_bracket_groups(bracket).await?;
        log::info!(
            "Reset {}: removed {} group(s) and {} match(es)",
            bracket,
            summary.groups_removed,
            summary.matches_removed
        );
        self.notifier.publish(ChangeEvent::Bracket(bracket));
        Ok(summary)
    }

    /// Groups of the highest stage, in group-number order
    async fn current_groups(&self, bracket: Bracket) -> TournamentResult<(i32, Vec<Group>)> {
        let stage_number = self.repo.current_stage(bracket).await?;
        if stage_number == 0 {
            return Err(TournamentError::NoGroupsFound(bracket));
        }

        let groups = self
            .repo
            .list_groups(&GroupFilter::bracket(bracket).stage(stage_number))
            .await?;
        if groups.is_empty() {
            return Err(TournamentError::NoGroupsFound(bracket));
        }

        Ok((stage_number, groups))
    }

    fn plan(
        &self,
        bracket: Bracket,
        stage_number: i32,
        teams: Vec<TeamId>,
    ) -> TournamentResult<StagePlan> {
        let group_size = self.config.group_sizes.size_for(bracket.category_id);
        let mut seeder = self.seeder.lock().unwrap_or_else(|e| e.into_inner());
        seeder.plan_stage(
            bracket,
            stage_number,
            teams,
            group_size,
            self.config.auto_complete_byes,
        )
    }

    fn publish_stage(&self, bracket: Bracket, groups: &[Group], teams: &[TeamId]) {
        self.notifier.publish(ChangeEvent::Bracket(bracket));
        self.notifier
            .publish_all(groups.iter().map(|g| ChangeEvent::Group(g.id)));
        self.notifier
            .publish_all(teams.iter().copied().map(ChangeEvent::Team));
    }
}
