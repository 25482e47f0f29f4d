use std::collections::HashMap;

use sea_orm::*;
use serde::Serialize;

use crate::entity::{solve, team, team_member, user};

const UNKNOWN_USER: &str = "Unknown";
const UNKNOWN_TEAM: &str = "Unknown";
const NO_TEAM: &str = "-";

/// One row of the per-user standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct IndividualStanding {
    #[schema(example = 1)]
    pub rank: usize,
    #[schema(example = 42)]
    pub user_id: i32,
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Team of the user's most recent solve.
    #[schema(example = "0xDEADBEEF")]
    pub team: String,
    #[schema(example = 350)]
    pub points: i64,
    #[schema(example = 3)]
    pub solves: u64,
}

/// One row of the per-team standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct TeamStanding {
    #[schema(example = 1)]
    pub rank: usize,
    #[schema(example = 7)]
    pub team_id: i32,
    #[schema(example = "0xDEADBEEF")]
    pub name: String,
    #[schema(example = 4)]
    pub members: u64,
    #[schema(example = 350)]
    pub points: i64,
    #[schema(example = 3)]
    pub solves: u64,
}

struct Tally {
    points: i64,
    solves: u64,
    latest: Option<(chrono::DateTime<chrono::Utc>, i32)>,
}

/// Group solves by `key`, keeping first-seen order for the stable sort below.
fn tally<F>(solves: &[solve::Model], key: F) -> Vec<(i32, Tally)>
where
    F: Fn(&solve::Model) -> i32,
{
    let mut order: Vec<i32> = Vec::new();
    let mut groups: HashMap<i32, Tally> = HashMap::new();

    for s in solves {
        let k = key(s);
        let entry = groups.entry(k).or_insert_with(|| {
            order.push(k);
            Tally {
                points: 0,
                solves: 0,
                latest: None,
            }
        });
        entry.points += i64::from(s.points);
        entry.solves += 1;
        if entry.latest.is_none_or(|(at, _)| s.created_at >= at) {
            entry.latest = Some((s.created_at, s.team_id));
        }
    }

    let mut rows: Vec<(i32, Tally)> = order
        .into_iter()
        .filter_map(|k| groups.remove(&k).map(|t| (k, t)))
        .collect();
    // Points desc, then solves desc. Equal rows keep their relative order.
    rows.sort_by(|a, b| {
        b.1.points
            .cmp(&a.1.points)
            .then_with(|| b.1.solves.cmp(&a.1.solves))
    });
    rows
}

pub fn rank_individuals(
    solves: &[solve::Model],
    usernames: &HashMap<i32, String>,
    team_names: &HashMap<i32, String>,
    limit: usize,
) -> Vec<IndividualStanding> {
    tally(solves, |s| s.user_id)
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (user_id, t))| IndividualStanding {
            rank: idx + 1,
            user_id,
            username: usernames
                .get(&user_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            team: t
                .latest
                .and_then(|(_, team_id)| team_names.get(&team_id).cloned())
                .unwrap_or_else(|| NO_TEAM.to_string()),
            points: t.points,
            solves: t.solves,
        })
        .collect()
}

pub fn rank_teams(
    solves: &[solve::Model],
    team_names: &HashMap<i32, String>,
    member_counts: &HashMap<i32, u64>,
    limit: usize,
) -> Vec<TeamStanding> {
    tally(solves, |s| s.team_id)
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (team_id, t))| TeamStanding {
            rank: idx + 1,
            team_id,
            name: team_names
                .get(&team_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
            members: member_counts.get(&team_id).copied().unwrap_or(0),
            points: t.points,
            solves: t.solves,
        })
        .collect()
}

async fn load_solves<C: ConnectionTrait>(
    db: &C,
    event_id: Option<i32>,
) -> Result<Vec<solve::Model>, DbErr> {
    let mut select = solve::Entity::find().order_by_asc(solve::Column::Id);
    if let Some(event_id) = event_id {
        select = select.filter(solve::Column::EventId.eq(event_id));
    }
    select.all(db).await
}

async fn load_team_names<C: ConnectionTrait>(
    db: &C,
    solves: &[solve::Model],
) -> Result<HashMap<i32, String>, DbErr> {
    let ids: Vec<i32> = solves.iter().map(|s| s.team_id).collect();
    let teams = team::Entity::find()
        .filter(team::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(teams.into_iter().map(|t| (t.id, t.name)).collect())
}

/// Per-user standings over all solves, or only those of `event_id`.
pub async fn individual_standings<C: ConnectionTrait>(
    db: &C,
    event_id: Option<i32>,
    limit: usize,
) -> Result<Vec<IndividualStanding>, DbErr> {
    let solves = load_solves(db, event_id).await?;
    if solves.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: Vec<i32> = solves.iter().map(|s| s.user_id).collect();
    let usernames: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();
    let team_names = load_team_names(db, &solves).await?;

    Ok(rank_individuals(&solves, &usernames, &team_names, limit))
}

/// Per-team standings over all solves, or only those of `event_id`.
pub async fn team_standings<C: ConnectionTrait>(
    db: &C,
    event_id: Option<i32>,
    limit: usize,
) -> Result<Vec<TeamStanding>, DbErr> {
    let solves = load_solves(db, event_id).await?;
    if solves.is_empty() {
        return Ok(Vec::new());
    }

    let team_names = load_team_names(db, &solves).await?;
    let team_ids: Vec<i32> = team_names.keys().copied().collect();
    let mut member_counts: HashMap<i32, u64> = HashMap::new();
    for m in team_member::Entity::find()
        .filter(team_member::Column::TeamId.is_in(team_ids))
        .all(db)
        .await?
    {
        *member_counts.entry(m.team_id).or_default() += 1;
    }

    Ok(rank_teams(&solves, &team_names, &member_counts, limit))
}
