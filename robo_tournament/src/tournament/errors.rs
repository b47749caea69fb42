//! Tournament error types.

use super::models::{Bracket, GroupId, MatchId, TeamId};
use std::time::Duration;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Fewer eligible teams than a stage needs
    #[error("Insufficient contestants: need {needed}, have {available}")]
    InsufficientContestants { needed: usize, available: usize },

    /// The bracket has no groups (or none at its current stage)
    #[error("No groups found for {0}")]
    NoGroupsFound(Bracket),

    #[error("Group {0} already has a winner")]
    GroupAlreadyCompleted(GroupId),

    #[error("Match {0} has already been resolved")]
    MatchAlreadyResolved(MatchId),

    /// Declared winner does not play in the match
    #[error("Team {team_id} does not play in match {match_id}")]
    InvalidWinner { match_id: MatchId, team_id: TeamId },

    /// Declared winner is not a member of the group
    #[error("Team {team_id} is not a member of group {group_id}")]
    NotAMember { group_id: GroupId, team_id: TeamId },

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Team still referenced by groups or matches
    #[error("Team {0} is referenced by groups or matches")]
    TeamInUse(TeamId),

    #[error("Invalid match: {0}")]
    InvalidMatch(String),

    #[error("Invalid group size {0}: groups need at least 2 seats")]
    InvalidGroupSize(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl TournamentError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) => "Internal server error".to_string(),
            TournamentError::Timeout(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Precondition violations are the caller's to fix; everything else is
    /// a storage failure the caller may retry.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            TournamentError::Database(_) | TournamentError::Timeout(_)
        )
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_client_message_hides_database_details() {
        let err = TournamentError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_precondition_messages_pass_through() {
        let err = TournamentError::InsufficientContestants {
            needed: 2,
            available: 1,
        };
        assert_eq!(err.client_message(), "Insufficient contestants: need 2, have 1");
        assert!(err.is_precondition());

        let group_id = Uuid::new_v4();
        let err = TournamentError::GroupAlreadyCompleted(group_id);
        assert!(err.client_message().contains(&group_id.to_string()));
    }

    #[test]
    fn test_timeout_display() {
        let err = TournamentError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }
}
