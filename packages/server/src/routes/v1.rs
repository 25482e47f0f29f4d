use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/events", event_routes())
        .nest("/challenges", challenge_routes())
        .nest("/admin/challenges", admin_challenge_routes(config))
        .nest("/files", file_routes())
        .nest("/practice/challenges", practice_routes())
        .nest("/teams", team_routes())
        .nest("/admin/users", admin_user_routes())
        .nest("/leaderboard", leaderboard_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn event_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::event::current_event))
        .routes(routes!(
            handlers::event::list_events,
            handlers::event::create_event
        ))
        .routes(routes!(
            handlers::event::get_event,
            handlers::event::update_event,
            handlers::event::delete_event
        ))
        .routes(routes!(handlers::event::list_event_teams))
        .routes(routes!(handlers::event::cleanup_event_teams))
}

fn challenge_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::challenge::list_challenges))
        .routes(routes!(handlers::challenge::get_challenge))
        .routes(routes!(handlers::submission::submit_flag))
}

fn admin_challenge_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            handlers::challenge::admin_list_challenges,
            handlers::challenge::admin_create_challenge
        ))
        .routes(routes!(
            handlers::challenge::admin_get_challenge,
            handlers::challenge::admin_update_challenge,
            handlers::challenge::admin_delete_challenge
        ))
        .routes(routes!(handlers::attachment::delete_file));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::attachment::upload_files))
        .layer(handlers::attachment::upload_body_limit(
            config.storage.max_blob_size,
        ));

    crud.merge(upload)
}

fn file_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::attachment::download_file))
}

fn practice_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::challenge::list_practice_challenges))
        .routes(routes!(handlers::submission::submit_practice))
        .routes(routes!(handlers::submission::practice_hint))
}

fn team_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::team::list_teams,
            handlers::team::create_team
        ))
        .routes(routes!(handlers::team::join_team))
        .routes(routes!(handlers::team::my_team))
        .routes(routes!(
            handlers::team::rename_team,
            handlers::team::delete_team
        ))
        .routes(routes!(handlers::team::ban_team))
        .routes(routes!(handlers::team::rotate_invite))
}

fn admin_user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::user::get_user,
        handlers::user::update_user,
        handlers::user::delete_user
    ))
}

fn leaderboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::leaderboard::individual))
        .routes(routes!(handlers::leaderboard::teams))
}
