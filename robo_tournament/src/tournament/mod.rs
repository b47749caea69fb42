//! Group-stage tournament engine.
//!
//! Teams of a bracket (a category/division pair) are drawn into groups,
//! play pairwise matches inside their group, and each group produces one
//! winner. Winners are drawn again into the next stage until a single
//! champion remains.
//!
//! ## Example
//!
//! ```no_run
//! use robo_tournament::db::{Database, DatabaseConfig};
//! use robo_tournament::tournament::{Bracket, BracketConfig, NewTeam, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     db.ensure_schema().await?;
//!
//!     let manager = TournamentManager::new(Arc::new(db.repository()), BracketConfig::from_env());
//!     let bracket = Bracket::new(2, 1);
//!
//!     for name in ["Sparky", "Bolt", "Rustbucket"] {
//!         manager.register_team(NewTeam::new(name, bracket)).await?;
//!     }
//!
//!     let groups = manager.generate_first_stage(bracket).await?;
//!     println!("Drew {} group(s)", groups.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod locks;
pub mod manager;
pub mod models;
pub mod seeding;

pub use config::{BracketConfig, GroupSizePolicy};
pub use errors::{TournamentError, TournamentResult};
pub use events::{ChangeEvent, ChangeNotifier};
pub use manager::TournamentManager;
pub use models::{
    AdvanceOutcome, Bracket, CategoryId, DivisionId, Group, GroupFilter, GroupId,
    GroupMembership, GroupWithMembers, Match, MatchFilter, MatchId, MatchStatus, NewMatch,
    NewTeam, StageStatus, Team, TeamDelta, TeamFilter, TeamId, TeamUpdate, TeardownSummary,
};
pub use seeding::{Seeder, StagePlan};
