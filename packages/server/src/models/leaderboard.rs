use serde::{Deserialize, Serialize};

use super::event::EventResponse;
use crate::scoring::leaderboard::{IndividualStanding, TeamStanding};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardScope {
    /// Every solve ever recorded.
    #[default]
    Global,
    /// Solves of the active event only.
    Event,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// `global` (default) or `event`.
    #[serde(default)]
    pub scope: LeaderboardScope,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct IndividualLeaderboardResponse {
    /// `false` only for the event scope when no event is running.
    pub active: bool,
    pub event: Option<EventResponse>,
    pub rows: Vec<IndividualStanding>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamLeaderboardResponse {
    pub active: bool,
    pub event: Option<EventResponse>,
    pub rows: Vec<TeamStanding>,
}
