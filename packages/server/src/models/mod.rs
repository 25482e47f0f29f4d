pub mod attachment;
pub mod auth;
pub mod challenge;
pub mod event;
pub mod leaderboard;
pub mod shared;
pub mod submission;
pub mod team;
pub mod user;
