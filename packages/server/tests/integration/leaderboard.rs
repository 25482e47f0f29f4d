use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn standings_sum_points_per_user_and_team() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let event_id = app.create_running_event(&admin).await;
    let a = app
        .create_open_challenge(&admin, event_id, "Alpha", 100, "flag{a}")
        .await;
    let b = app
        .create_open_challenge(&admin, event_id, "Bravo", 250, "flag{b}")
        .await;
    let c = app
        .create_open_challenge(&admin, event_id, "Charlie", 50, "flag{c}")
        .await;

    let alice = app.create_authenticated_user("alice").await;
    let bob = app.create_authenticated_user("bob").await;
    let carol = app.create_authenticated_user("carol").await;
    let (_, red) = app.create_team(&alice, "Red Team").await;
    app.join_team(&bob, &red).await;
    app.create_team(&carol, "Blue Team").await;

    for (token, id, flag) in [
        (&alice, a, "flag{a}"),
        (&alice, b, "flag{b}"),
        (&bob, c, "flag{c}"),
        (&carol, a, "flag{a}"),
    ] {
        let res = app.submit_flag(token, id, flag).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    let res = app.get_without_token(routes::LEADERBOARD_INDIVIDUAL).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["active"], true);
    let rows = res.body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["username"], "alice");
    assert_eq!(rows[0]["points"], 350);
    assert_eq!(rows[0]["solves"], 2);
    assert_eq!(rows[0]["team"], "Red Team");
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[1]["username"], "carol");
    assert_eq!(rows[2]["username"], "bob");

    let res = app.get_without_token(routes::LEADERBOARD_TEAMS).await;
    let rows = res.body["rows"].as_array().unwrap();
    assert_eq!(rows[0]["name"], "Red Team");
    assert_eq!(rows[0]["points"], 400);
    assert_eq!(rows[0]["solves"], 3);
    assert_eq!(rows[0]["members"], 2);
    assert_eq!(rows[1]["name"], "Blue Team");
    assert_eq!(rows[1]["points"], 100);
}

#[tokio::test]
async fn banned_team_keeps_its_standing() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let event_id = app.create_running_event(&admin).await;
    let chal = app
        .create_open_challenge(&admin, event_id, "Warmup", 100, "flag{warm}")
        .await;

    let alice = app.create_authenticated_user("alice").await;
    let (team_id, _) = app.create_team(&alice, "Red Team").await;
    let res = app.submit_flag(&alice, chal, "flag{warm}").await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .post_with_token(
            &routes::team_ban(team_id),
            &json!({"banned": true, "reason": "flag sharing"}),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app.get_without_token(routes::LEADERBOARD_TEAMS).await;
    let rows = res.body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Red Team");
    assert_eq!(rows[0]["points"], 100);

    let res = app.get_without_token(routes::LEADERBOARD_INDIVIDUAL).await;
    assert_eq!(res.body["rows"][0]["username"], "alice");
    assert_eq!(res.body["rows"][0]["points"], 100);
}

#[tokio::test]
async fn event_scope_without_a_running_event_is_inactive() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let start = Utc::now() + Duration::days(1);
    app.create_event(&admin, "Tomorrow", start, start + Duration::hours(1))
        .await;

    for path in [routes::LEADERBOARD_INDIVIDUAL, routes::LEADERBOARD_TEAMS] {
        let res = app.get_without_token(&format!("{path}?scope=event")).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["active"], false);
        assert!(res.body["event"].is_null());
        assert_eq!(res.body["rows"].as_array().unwrap().len(), 0);
    }
}

#[tokio::test]
async fn event_scope_reports_the_running_event() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let event_id = app.create_running_event(&admin).await;

    let res = app
        .get_without_token(&format!("{}?scope=event", routes::LEADERBOARD_TEAMS))
        .await;

    assert_eq!(res.body["active"], true);
    assert_eq!(res.body["event"]["id"], event_id);
}

#[tokio::test]
async fn unknown_scope_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .get_without_token(&format!("{}?scope=weekly", routes::LEADERBOARD_TEAMS))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}
