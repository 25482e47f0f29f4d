pub mod challenge;
pub mod challenge_file;
pub mod event;
pub mod practice_solve;
pub mod role;
pub mod role_permission;
pub mod solve;
pub mod team;
pub mod team_member;
pub mod user;
