//! Tournament data models: teams, groups, memberships and matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Team ID type
pub type TeamId = Uuid;

/// Group ID type
pub type GroupId = Uuid;

/// Match ID type
pub type MatchId = Uuid;

/// Category ID type (externally managed)
pub type CategoryId = i32;

/// Division ID type (externally managed)
pub type DivisionId = i32;

/// The (category, division) pair a competition runs in.
///
/// Every group and every match is scoped to exactly one bracket, and stage
/// numbers are counted per bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bracket {
    pub category_id: CategoryId,
    pub division_id: DivisionId,
}

impl Bracket {
    pub fn new(category_id: CategoryId, division_id: DivisionId) -> Self {
        Self {
            category_id,
            division_id,
        }
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "category {} / division {}",
            self.category_id, self.division_id
        )
    }
}

/// A registered contestant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub category_id: CategoryId,
    pub division_id: DivisionId,
    pub robot_name: Option<String>,
    pub robot_description: Option<String>,
    /// Cumulative match wins across all stages
    pub wins: i32,
    /// Cumulative match losses across all stages
    pub losses: i32,
    pub is_qualified: bool,
    pub is_eliminated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn bracket(&self) -> Bracket {
        Bracket::new(self.category_id, self.division_id)
    }
}

/// Registration payload for a new team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub category_id: CategoryId,
    pub division_id: DivisionId,
    #[serde(default)]
    pub robot_name: Option<String>,
    #[serde(default)]
    pub robot_description: Option<String>,
}

impl NewTeam {
    pub fn new(name: impl Into<String>, bracket: Bracket) -> Self {
        Self {
            name: name.into(),
            category_id: bracket.category_id,
            division_id: bracket.division_id,
            robot_name: None,
            robot_description: None,
        }
    }

    pub fn with_robot(mut self, robot_name: impl Into<String>) -> Self {
        self.robot_name = Some(robot_name.into());
        self
    }
}

/// Administrative edits to a team's descriptive fields.
///
/// Counters and the eliminated flag are deliberately absent: they only move
/// through [`TeamDelta`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub robot_name: Option<String>,
    #[serde(default)]
    pub robot_description: Option<String>,
    #[serde(default)]
    pub is_qualified: Option<bool>,
}

impl TeamUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.robot_name.is_none()
            && self.robot_description.is_none()
            && self.is_qualified.is_none()
    }
}

/// Change applied to a team's counters and elimination flag in one write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamDelta {
    pub wins: i32,
    pub losses: i32,
    /// `Some(flag)` overwrites the eliminated flag, `None` leaves it alone
    pub eliminated: Option<bool>,
}

impl TeamDelta {
    /// One match won
    pub fn win() -> Self {
        Self {
            wins: 1,
            ..Self::default()
        }
    }

    /// One match lost; a match loss knocks the team out
    pub fn loss() -> Self {
        Self {
            losses: 1,
            eliminated: Some(true),
            ..Self::default()
        }
    }

    /// Loss inside a group whose winner may already be declared.
    ///
    /// The declared winner keeps its place; everyone else is knocked out.
    pub fn loss_against(declared_winner: Option<TeamId>, loser_id: TeamId) -> Self {
        if declared_winner == Some(loser_id) {
            Self {
                losses: 1,
                ..Self::default()
            }
        } else {
            Self::loss()
        }
    }

    /// Knocked out without touching counters (lost the group)
    pub fn eliminate() -> Self {
        Self {
            eliminated: Some(true),
            ..Self::default()
        }
    }

    /// Declared group winner: back in the running regardless of match history
    pub fn reinstate() -> Self {
        Self {
            eliminated: Some(false),
            ..Self::default()
        }
    }

    /// Apply to a team in place
    pub fn apply(&self, team: &mut Team) {
        team.wins += self.wins;
        team.losses += self.losses;
        if let Some(flag) = self.eliminated {
            team.is_eliminated = flag;
        }
    }
}

/// Team listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFilter {
    pub category_id: Option<CategoryId>,
    pub division_id: Option<DivisionId>,
    pub eliminated: Option<bool>,
}

impl TeamFilter {
    pub fn bracket(bracket: Bracket) -> Self {
        Self {
            category_id: Some(bracket.category_id),
            division_id: Some(bracket.division_id),
            eliminated: None,
        }
    }

    /// Restrict to teams still in the running
    pub fn eligible(mut self) -> Self {
        self.eliminated = Some(false);
        self
    }

    pub fn matches(&self, team: &Team) -> bool {
        self.category_id.is_none_or(|c| team.category_id == c)
            && self.division_id.is_none_or(|d| team.division_id == d)
            && self.eliminated.is_none_or(|e| team.is_eliminated == e)
    }
}

/// A cluster of teams inside one stage that produces a single winner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub category_id: CategoryId,
    pub division_id: DivisionId,
    pub stage_number: i32,
    /// 1-based ordering inside the stage
    pub group_number: i32,
    pub group_name: String,
    pub winner_team_id: Option<TeamId>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn bracket(&self) -> Bracket {
        Bracket::new(self.category_id, self.division_id)
    }

    /// `is_completed` and `winner_team_id` must agree
    pub fn is_consistent(&self) -> bool {
        self.is_completed == self.winner_team_id.is_some()
    }
}

/// Group listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilter {
    pub category_id: Option<CategoryId>,
    pub division_id: Option<DivisionId>,
    pub stage_number: Option<i32>,
}

impl GroupFilter {
    pub fn bracket(bracket: Bracket) -> Self {
        Self {
            category_id: Some(bracket.category_id),
            division_id: Some(bracket.division_id),
            stage_number: None,
        }
    }

    pub fn stage(mut self, stage_number: i32) -> Self {
        self.stage_number = Some(stage_number);
        self
    }

    pub fn matches(&self, group: &Group) -> bool {
        self.category_id.is_none_or(|c| group.category_id == c)
            && self.division_id.is_none_or(|d| group.division_id == d)
            && self.stage_number.is_none_or(|s| group.stage_number == s)
    }
}

/// A team's seat in a group, with per-group counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: Uuid,
    pub group_id: GroupId,
    pub team_id: TeamId,
    pub wins: i32,
    pub losses: i32,
    pub matches_played: i32,
    pub is_winner: bool,
    pub created_at: DateTime<Utc>,
}

/// A group together with its memberships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMembership>,
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MatchStatus::Pending),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single pairwise contest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub category_id: CategoryId,
    pub division_id: DivisionId,
    pub group_id: Option<GroupId>,
    pub group_number: Option<i32>,
    pub stage_number: Option<i32>,
    pub round_name: Option<String>,
    pub round_number: i32,
    pub match_number: i32,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    pub winner_id: Option<TeamId>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn bracket(&self) -> Bracket {
        Bracket::new(self.category_id, self.division_id)
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team1_id == team_id || self.team2_id == team_id
    }

    /// The other side of the match, if `team_id` plays in it
    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        if self.team1_id == team_id {
            Some(self.team2_id)
        } else if self.team2_id == team_id {
            Some(self.team1_id)
        } else {
            None
        }
    }

    pub fn loser_id(&self) -> Option<TeamId> {
        self.winner_id.and_then(|w| self.opponent_of(w))
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }
}

/// A free-standing match created outside of group seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub category_id: CategoryId,
    pub division_id: DivisionId,
    #[serde(default)]
    pub round_name: Option<String>,
    pub round_number: i32,
    pub match_number: i32,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
}

/// Match listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilter {
    pub category_id: Option<CategoryId>,
    pub division_id: Option<DivisionId>,
    pub status: Option<MatchStatus>,
    pub group_id: Option<GroupId>,
    pub stage_number: Option<i32>,
    pub team_id: Option<TeamId>,
}

impl MatchFilter {
    pub fn bracket(bracket: Bracket) -> Self {
        Self {
            category_id: Some(bracket.category_id),
            division_id: Some(bracket.division_id),
            ..Self::default()
        }
    }

    pub fn group(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    pub fn team(team_id: TeamId) -> Self {
        Self {
            team_id: Some(team_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, m: &Match) -> bool {
        self.category_id.is_none_or(|c| m.category_id == c)
            && self.division_id.is_none_or(|d| m.division_id == d)
            && self.status.is_none_or(|s| m.status == s)
            && self.group_id.is_none_or(|g| m.group_id == Some(g))
            && self.stage_number.is_none_or(|s| m.stage_number == Some(s))
            && self.team_id.is_none_or(|t| m.involves(t))
    }
}

/// What a bracket teardown removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownSummary {
    pub groups_removed: u64,
    pub matches_removed: u64,
}

/// Result of an advancement request.
///
/// Only `Advanced` mutates anything; the other variants are informational
/// outcomes, not failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// A new stage was seeded with the previous stage's winners
    Advanced { next_stage: i32, advanced: usize },
    /// Some groups of the current stage still need a winner
    IncompleteGroups { incomplete: usize },
    /// Every group is complete but none carries a winner
    NoWinners,
    /// Exactly one winner remains: the tournament is decided
    ChampionCrowned { champion_id: TeamId },
}

impl AdvanceOutcome {
    pub fn advanced(&self) -> bool {
        matches!(self, AdvanceOutcome::Advanced { .. })
    }

    pub fn champion_id(&self) -> Option<TeamId> {
        match self {
            AdvanceOutcome::ChampionCrowned { champion_id } => Some(*champion_id),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AdvanceOutcome::Advanced {
                next_stage,
                advanced,
            } => format!("Advanced {advanced} winners to Stage {next_stage}"),
            AdvanceOutcome::IncompleteGroups { incomplete } => {
                format!("{incomplete} group(s) still need a winner selected")
            }
            AdvanceOutcome::NoWinners => "No winners to advance".to_string(),
            AdvanceOutcome::ChampionCrowned { .. } => {
                "Tournament complete! Champion has been crowned!".to_string()
            }
        }
    }
}

/// Read-only view of where the current stage of a bracket stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageStatus {
    /// At least one group has no winner yet
    Open { stage_number: i32, incomplete: usize },
    /// All groups done, more than one winner: ready to advance
    Resolved {
        stage_number: i32,
        winners: Vec<TeamId>,
    },
    /// All groups done with a single winner: terminal
    Final {
        stage_number: i32,
        champion_id: TeamId,
    },
}

impl StageStatus {
    pub fn stage_number(&self) -> i32 {
        match self {
            StageStatus::Open { stage_number, .. }
            | StageStatus::Resolved { stage_number, .. }
            | StageStatus::Final { stage_number, .. } => *stage_number,
        }
    }
}
