//! Rules layer for flag submission, standings and practice hints.
//!
//! Everything here takes `now` explicitly so the time-dependent rules can be exercised
//! with fixed instants. Handlers pass `Utc::now()`.

pub mod evaluator;
pub mod hints;
pub mod leaderboard;
pub mod membership;
pub mod window;
