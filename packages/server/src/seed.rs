use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{practice_solve, role, role_permission, solve, team, team_member};

pub mod permissions {
    pub const EVENT_MANAGE: &str = "event:manage";
    pub const CHALLENGE_MANAGE: &str = "challenge:manage";
    pub const TEAM_MANAGE: &str = "team:manage";
    pub const USER_MANAGE: &str = "user:manage";
    pub const FLAG_SUBMIT: &str = "flag:submit";
}

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "player"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("admin", permissions::EVENT_MANAGE),
    ("admin", permissions::CHALLENGE_MANAGE),
    ("admin", permissions::TEAM_MANAGE),
    ("admin", permissions::USER_MANAGE),
    ("admin", permissions::FLAG_SUBMIT),
    ("player", permissions::FLAG_SUBMIT),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Load the permission names granted to a role.
pub async fn permissions_for_role<C: ConnectionTrait>(
    db: &C,
    role: &str,
) -> Result<Vec<String>, DbErr> {
    let rows = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(role))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.permission).collect())
}

/// Ensure the composite unique indexes exist.
///
/// Schema-sync only handles single-column uniqueness. These indexes are what make
/// duplicate credit and double membership impossible under concurrent requests, so
/// failing to create one aborts startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let unique = [
        (
            "uq_solve_team_challenge_event",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_solve_team_challenge_event")
                .table(solve::Entity)
                .col(solve::Column::TeamId)
                .col(solve::Column::ChallengeId)
                .col(solve::Column::EventId)
                .to_owned(),
        ),
        (
            "uq_practice_solve_user_challenge",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_practice_solve_user_challenge")
                .table(practice_solve::Entity)
                .col(practice_solve::Column::UserId)
                .col(practice_solve::Column::ChallengeId)
                .to_owned(),
        ),
        (
            "uq_team_member_event_user",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_team_member_event_user")
                .table(team_member::Entity)
                .col(team_member::Column::EventId)
                .col(team_member::Column::UserId)
                .to_owned(),
        ),
        (
            "uq_team_event_name",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_team_event_name")
                .table(team::Entity)
                .col(team::Column::EventId)
                .col(team::Column::Name)
                .to_owned(),
        ),
    ];

    for (name, index) in &unique {
        execute_index(db, index).await?;
        info!("Ensured index {} exists", name);
    }

    // Leaderboard scans: all solves of one event.
    let by_event = Index::create()
        .if_not_exists()
        .name("idx_solve_event")
        .table(solve::Entity)
        .col(solve::Column::EventId)
        .to_owned();
    match execute_index(db, &by_event).await {
        Ok(()) => info!("Ensured index idx_solve_event exists"),
        Err(e) => tracing::warn!("Failed to create index idx_solve_event: {}", e),
    }

    Ok(())
}

async fn execute_index(db: &DatabaseConnection, index: &IndexCreateStatement) -> Result<(), DbErr> {
    let sql = match db.get_database_backend() {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    };
    db.execute_unprepared(&sql).await?;
    Ok(())
}
