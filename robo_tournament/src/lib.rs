//! # Robo Tournament
//!
//! Group-stage progression engine for robot competitions.
//!
//! Teams register into a bracket, identified by a category and a division.
//! A draw splits the bracket's eligible teams into randomly seeded groups,
//! each group plays pairwise matches, and each group is closed with a single
//! winner. Winners are drawn again into the next stage until one champion
//! remains.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Entity model, seeding, result recording and stage advancement
//! - [`db`]: PostgreSQL pool, schema and the repository implementations
//!
//! ## Example
//!
//! ```
//! use robo_tournament::db::MemoryTournamentRepository;
//! use robo_tournament::tournament::{BracketConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! let manager = TournamentManager::new(
//!     Arc::new(MemoryTournamentRepository::new()),
//!     BracketConfig::default(),
//! );
//! assert_eq!(manager.config().group_sizes.size_for(1), 2);
//! ```

/// Database pool, schema and repositories.
pub mod db;

/// Tournament engine.
pub mod tournament;
pub use tournament::{
    AdvanceOutcome, Bracket, TournamentError, TournamentManager, TournamentResult,
};
