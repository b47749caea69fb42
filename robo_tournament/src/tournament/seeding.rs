//! Stage seeding: shuffle contestants, cut them into groups, pair them up.
//!
//! Seeding is a pure planning step. [`Seeder::plan_stage`] returns a
//! [`StagePlan`] describing every group, membership and pairing of a stage;
//! the repository then persists the whole plan in one write.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Bracket, GroupId, TeamId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use uuid::Uuid;

/// Minimum contestants for any stage
pub const MIN_CONTESTANTS: usize = 2;

/// One group of a planned stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    pub id: GroupId,
    pub group_number: i32,
    pub group_name: String,
    /// Members in shuffled order; consecutive pairs play each other
    pub members: Vec<TeamId>,
    /// Set when the group is a single-member bye completed on creation
    pub bye_winner: Option<TeamId>,
}

impl PlannedGroup {
    /// Pairings in play order
    pub fn pairings(&self) -> impl Iterator<Item = (TeamId, TeamId)> + '_ {
        self.members.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// The member left over when the group has an odd size
    pub fn unpaired(&self) -> Option<TeamId> {
        self.members.chunks_exact(2).remainder().first().copied()
    }

    pub fn match_count(&self) -> usize {
        self.members.len() / 2
    }
}

/// Every group of one stage of one bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub bracket: Bracket,
    pub stage_number: i32,
    pub groups: Vec<PlannedGroup>,
}

impl StagePlan {
    pub fn team_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    pub fn match_count(&self) -> usize {
        self.groups.iter().map(PlannedGroup::match_count).sum()
    }
}

/// Letters for the zero-based group index: A..Z, then AA, AB, ...
pub fn group_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Display name of a group; later stages carry their stage number
pub fn group_name(stage_number: i32, index: usize) -> String {
    if stage_number <= 1 {
        format!("Group {}", group_letters(index))
    } else {
        format!("Stage {} - Group {}", stage_number, group_letters(index))
    }
}

/// Randomized stage planner
pub struct Seeder {
    rng: StdRng,
}

impl Seeder {
    /// Create a seeder drawing from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible seeder
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniformly shuffle contestants in place
    pub fn shuffle(&mut self, teams: &mut [TeamId]) {
        teams.shuffle(&mut self.rng);
    }

    /// Plan a stage for `teams`
    ///
    /// # Arguments
    ///
    /// * `bracket` - Bracket the stage belongs to
    /// * `stage_number` - 1 for a fresh tournament, previous + 1 on advancement
    /// * `teams` - Contestants; their incoming order is discarded
    /// * `group_size` - Maximum seats per group
    /// * `auto_complete_byes` - Complete single-member groups immediately
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidGroupSize` - `group_size < 2`
    /// * `TournamentError::InsufficientContestants` - fewer than two teams
    pub fn plan_stage(
        &mut self,
        bracket: Bracket,
        stage_number: i32,
        mut teams: Vec<TeamId>,
        group_size: usize,
        auto_complete_byes: bool,
    ) -> TournamentResult<StagePlan> {
        if group_size < 2 {
            return Err(TournamentError::InvalidGroupSize(group_size));
        }

        if teams.len() < MIN_CONTESTANTS {
            return Err(TournamentError::InsufficientContestants {
                needed: MIN_CONTESTANTS,
                available: teams.len(),
            });
        }

        self.shuffle(&mut teams);

        let groups = teams
            .chunks(group_size)
            .enumerate()
            .map(|(index, members)| {
                let bye_winner = match members {
                    [only] if auto_complete_byes => Some(*only),
                    _ => None,
                };
                PlannedGroup {
                    id: Uuid::new_v4(),
                    group_number: index as i32 + 1,
                    group_name: group_name(stage_number, index),
                    members: members.to_vec(),
                    bye_winner,
                }
            })
            .collect();

        Ok(StagePlan {
            bracket,
            stage_number,
            groups,
        })
    }
}

impl Default for Seeder {
    fn default() -> Self {
        Self::new()
    }
}
