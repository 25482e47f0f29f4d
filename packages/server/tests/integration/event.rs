use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, routes};

mod administration {
    use super::*;

    #[tokio::test]
    async fn admin_can_create_and_fetch_an_event() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() + Duration::days(1);

        let id = app
            .create_event(&admin, "Spring CTF", start, start + Duration::hours(6))
            .await;
        let res = app.get_with_token(&routes::event(id), &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Spring CTF");
    }

    #[tokio::test]
    async fn window_that_ends_before_it_starts_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() + Duration::days(1);

        for ends_at in [start, start - Duration::minutes(1)] {
            let res = app
                .post_with_token(
                    routes::EVENTS,
                    &json!({"name": "Broken", "starts_at": start, "ends_at": ends_at}),
                    &admin,
                )
                .await;
            assert_eq!(res.status, 400, "{}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn players_cannot_manage_events() {
        let app = TestApp::spawn().await;
        let player = app.create_authenticated_user("alice").await;
        let start = Utc::now();

        let res = app
            .post_with_token(
                routes::EVENTS,
                &json!({"name": "Mine", "starts_at": start, "ends_at": start + Duration::hours(1)}),
                &player,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn update_cannot_shrink_the_window_past_a_challenge() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() + Duration::days(1);
        let end = start + Duration::hours(6);
        let event_id = app.create_event(&admin, "Spring CTF", start, end).await;
        app.create_challenge(&admin, event_id, "Late", 100, "flag{late}", start, end)
            .await;

        let res = app
            .patch_with_token(
                &routes::event(event_id),
                &json!({"ends_at": end - Duration::hours(1)}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
    }

    #[tokio::test]
    async fn update_rejects_an_empty_window() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() + Duration::days(1);
        let end = start + Duration::hours(6);
        let event_id = app.create_event(&admin, "Spring CTF", start, end).await;
        let before = app.event_window(&admin, event_id).await;

        for body in [
            json!({"ends_at": start}),
            json!({"ends_at": start - Duration::minutes(1)}),
            json!({"starts_at": end + Duration::hours(1)}),
        ] {
            let res = app
                .patch_with_token(&routes::event(event_id), &body, &admin)
                .await;
            assert_eq!(res.status, 400, "{}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }

        assert_eq!(app.event_window(&admin, event_id).await, before);
    }

    #[tokio::test]
    async fn running_event_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_running_event(&admin).await;

        let res = app.delete_with_token(&routes::event(event_id), &admin).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn deleting_a_finished_event_removes_its_challenges() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() - Duration::days(2);
        let end = start + Duration::hours(6);
        let event_id = app.create_event(&admin, "Old CTF", start, end).await;
        let challenge_id = app
            .create_challenge(&admin, event_id, "Old", 100, "flag{old}", start, end)
            .await;

        let res = app.delete_with_token(&routes::event(event_id), &admin).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app
            .get_with_token(&routes::admin_challenge(challenge_id), &admin)
            .await;
        assert_eq!(res.status, 404);
    }
}

mod cleanup {
    use sea_orm::{ActiveModelTrait, Set};

    use ctf_server::entity::solve;

    use super::*;

    #[tokio::test]
    async fn cleanup_removes_teams_without_solves_after_the_event() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() + Duration::days(1);
        let event_id = app
            .create_event(&admin, "Spring CTF", start, start + Duration::hours(6))
            .await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let (scoring_team, _) = app.create_team(&alice, "Red Team").await;
        let (idle_team, _) = app.create_team(&bob, "Blue Team").await;

        let past_start = Utc::now() - Duration::days(2);
        let past_end = past_start + Duration::hours(6);
        let res = app
            .patch_with_token(
                &routes::event(event_id),
                &json!({"starts_at": past_start, "ends_at": past_end}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let challenge_id = app
            .create_challenge(&admin, event_id, "Relic", 100, "flag{relic}", past_start, past_end)
            .await;
        solve::ActiveModel {
            user_id: Set(app.user_id(&alice).await),
            team_id: Set(scoring_team),
            challenge_id: Set(challenge_id),
            event_id: Set(event_id),
            points: Set(100),
            created_at: Set(past_start + Duration::hours(1)),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let res = app
            .post_with_token(&routes::event_cleanup(event_id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["deleted_teams"], 1);

        let res = app.get_with_token(&routes::event_teams(event_id), &admin).await;
        let teams = res.body.as_array().unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0]["id"], scoring_team);
        assert_ne!(teams[0]["id"], idle_team);

        let res = app.get_without_token(routes::LEADERBOARD_TEAMS).await;
        assert_eq!(res.body["rows"][0]["name"], "Red Team");
    }

    #[tokio::test]
    async fn cleanup_waits_for_the_event_to_end() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        app.create_team(&alice, "Red Team").await;

        let res = app
            .post_with_token(&routes::event_cleanup(event_id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 409, "{}", res.text);

        let res = app.get_with_token(&routes::event_teams(event_id), &admin).await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn players_cannot_clean_up() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = Utc::now() - Duration::days(2);
        let event_id = app
            .create_event(&admin, "Old CTF", start, start + Duration::hours(6))
            .await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .post_with_token(&routes::event_cleanup(event_id), &json!({}), &alice)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod context {
    use super::*;

    #[tokio::test]
    async fn reports_none_without_events() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::CURRENT_EVENT).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["mode"], "none");
        assert!(res.body["event"].is_null());
    }

    #[tokio::test]
    async fn prefers_the_running_event_over_an_upcoming_one() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let soon = Utc::now() + Duration::days(1);
        app.create_event(&admin, "Next", soon, soon + Duration::hours(2))
            .await;

        let res = app.get_without_token(routes::CURRENT_EVENT).await;
        assert_eq!(res.body["mode"], "upcoming");
        assert_eq!(res.body["event"]["name"], "Next");

        let running = app.create_running_event(&admin).await;
        let res = app.get_without_token(routes::CURRENT_EVENT).await;
        assert_eq!(res.body["mode"], "active");
        assert_eq!(res.body["event"]["id"], running);
    }
}
