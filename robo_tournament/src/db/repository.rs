//! Repository trait for tournament persistence.
//!
//! The engine talks to storage only through [`TournamentRepository`], so the
//! same code runs against PostgreSQL in production and against the in-memory
//! repository in tests.
//!
//! Plain CRUD methods are single writes. The composite methods
//! (`insert_stage`, `complete_match`, `complete_group`,
//! `delete_bracket_groups`) are transaction boundaries: an implementation
//! must apply all of their writes or none, and must re-check their
//! preconditions inside the same transaction.

use async_trait::async_trait;

use crate::tournament::{
    TournamentResult,
    models::{
        Bracket, Group, GroupFilter, GroupId, GroupMembership, Match, MatchFilter, MatchId,
        NewMatch, NewTeam, Team, TeamFilter, TeamId, TeamUpdate, TeardownSummary,
    },
    seeding::StagePlan,
};

/// Trait for tournament repository operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Register a new team
    async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team>;

    /// Find team by ID
    async fn find_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>>;

    /// List teams, most wins first
    async fn list_teams(&self, filter: &TeamFilter) -> TournamentResult<Vec<Team>>;

    /// Edit descriptive fields of a team
    async fn update_team(&self, team_id: TeamId, update: &TeamUpdate) -> TournamentResult<Team>;

    /// Delete a team that no group or match references
    async fn delete_team(&self, team_id: TeamId) -> TournamentResult<()>;

    /// Zero wins/losses and clear the eliminated flag
    async fn reset_team_stats(&self, team_ids: &[TeamId]) -> TournamentResult<()>;

    /// Find group by ID
    async fn find_group(&self, group_id: GroupId) -> TournamentResult<Option<Group>>;

    /// List groups ordered by stage, then group number
    async fn list_groups(&self, filter: &GroupFilter) -> TournamentResult<Vec<Group>>;

    /// Memberships of a group, most per-group wins first
    async fn list_memberships(&self, group_id: GroupId)
    -> TournamentResult<Vec<GroupMembership>>;

    /// Highest stage number among the bracket's groups, 0 when there are none
    async fn current_stage(&self, bracket: Bracket) -> TournamentResult<i32>;

    /// Create a match outside of group seeding
    async fn create_match(&self, new_match: &NewMatch) -> TournamentResult<Match>;

    /// Find match by ID
    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>>;

    /// List matches ordered by round, then match number
    async fn list_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>>;

    /// Persist every group, membership and pairing of a planned stage
    async fn insert_stage(&self, plan: &StagePlan) -> TournamentResult<Vec<Group>>;

    /// Resolve a pending match and update team and membership counters
    ///
    /// # Errors
    ///
    /// * `TournamentError::MatchNotFound`
    /// * `TournamentError::InvalidWinner` - winner is neither side
    /// * `TournamentError::MatchAlreadyResolved` - status is not pending
    async fn complete_match(&self, match_id: MatchId, winner_id: TeamId)
    -> TournamentResult<Match>;

    /// Declare a group winner and knock out the rest of the group
    ///
    /// # Errors
    ///
    /// * `TournamentError::GroupNotFound`
    /// * `TournamentError::GroupAlreadyCompleted`
    /// * `TournamentError::NotAMember`
    async fn complete_group(&self, group_id: GroupId, winner_id: TeamId)
    -> TournamentResult<Group>;

    /// Delete all matches of the bracket, then all of its groups
    async fn delete_bracket_groups(&self, bracket: Bracket) -> TournamentResult<TeardownSummary>;

    /// Check that storage is reachable
    async fn health_check(&self) -> TournamentResult<()>;
}
