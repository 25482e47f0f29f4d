use serde_json::json;

use crate::common::{TestApp, routes};

mod listing {
    use super::*;

    #[tokio::test]
    async fn lists_teams_of_the_running_event_with_member_counts() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let carol = app.create_authenticated_user("carol").await;
        let (red, token) = app.create_team(&alice, "Red Team").await;
        app.join_team(&bob, &token).await;
        let (blue, _) = app.create_team(&carol, "Blue Team").await;

        let res = app.get_without_token(routes::TEAMS).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["event"]["id"], event_id);
        let teams = res.body["teams"].as_array().unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0]["id"], blue);
        assert_eq!(teams[0]["members"], 1);
        assert_eq!(teams[1]["id"], red);
        assert_eq!(teams[1]["name"], "Red Team");
        assert_eq!(teams[1]["members"], 2);
        assert!(teams[1].get("invite_token").is_none());
    }

    #[tokio::test]
    async fn teams_of_an_upcoming_event_are_not_listed() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let start = chrono::Utc::now() + chrono::Duration::days(1);
        app.create_event(&admin, "Tomorrow", start, start + chrono::Duration::hours(2))
            .await;
        let alice = app.create_authenticated_user("alice").await;
        app.create_team(&alice, "Red Team").await;

        let res = app.get_without_token(routes::TEAMS).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["event"].is_null());
        assert_eq!(res.body["teams"], json!([]));
    }
}

mod membership {
    use super::*;

    #[tokio::test]
    async fn creating_a_team_makes_the_caller_its_only_member() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .post_with_token(
                routes::TEAMS,
                &json!({"name": "Red Team", "password": "teampass"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["event_id"], event_id);
        assert_eq!(res.body["team"]["members"], 1);
        assert_eq!(res.body["team"]["invite_token"].as_str().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn creating_a_team_without_any_event_conflicts() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .post_with_token(
                routes::TEAMS,
                &json!({"name": "Red Team", "password": "teampass"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn team_names_are_unique_within_an_event() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        app.create_team(&alice, "Red Team").await;

        let res = app
            .post_with_token(
                routes::TEAMS,
                &json!({"name": "Red Team", "password": "teampass"}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn joining_with_a_lowercase_token_works() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let (team_id, token) = app.create_team(&alice, "Red Team").await;

        let res = app
            .join_team(&bob, &format!("  {}  ", token.to_lowercase()))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["team"]["id"], team_id);
        assert_eq!(res.body["team"]["members"], 2);
    }

    #[tokio::test]
    async fn joining_the_same_team_twice_changes_nothing() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let (team_id, token) = app.create_team(&alice, "Red Team").await;

        let first = app.join_team(&bob, &token).await;
        let second = app.join_team(&bob, &token).await;

        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 200, "{}", second.text);
        assert_eq!(second.body["team"]["id"], team_id);
        assert_eq!(second.body["team"]["members"], 2);
    }

    #[tokio::test]
    async fn a_user_cannot_switch_teams_within_an_event() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        app.create_team(&alice, "Red Team").await;
        let (_, blue_token) = app.create_team(&bob, "Blue Team").await;

        let res = app.join_team(&alice, &blue_token).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn unknown_invite_token_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app.join_team(&alice, "000000000000").await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn banned_teams_take_no_new_members() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let (team_id, token) = app.create_team(&alice, "Red Team").await;

        let res = app
            .post_with_token(
                &routes::team_ban(team_id),
                &json!({"banned": true, "reason": "flag sharing"}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["banned"], true);
        assert_eq!(res.body["ban_reason"], "flag sharing");

        let res = app.join_team(&bob, &token).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn my_team_reports_membership() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(routes::MY_TEAM, &alice).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["has_team"], false);

        app.create_team(&alice, "Red Team").await;
        let res = app.get_with_token(routes::MY_TEAM, &alice).await;
        assert_eq!(res.body["has_team"], true);
        assert_eq!(res.body["team"]["name"], "Red Team");
    }
}

mod administration {
    use super::*;

    #[tokio::test]
    async fn rotating_the_invite_retires_the_old_token() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let (team_id, old_token) = app.create_team(&alice, "Red Team").await;

        let res = app
            .post_with_token(&routes::team_rotate_invite(team_id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let new_token = res.body["invite_token"].as_str().unwrap().to_string();
        assert_ne!(new_token, old_token);

        assert_eq!(app.join_team(&bob, &old_token).await.status, 404);
        assert_eq!(app.join_team(&bob, &new_token).await.status, 200);
    }

    #[tokio::test]
    async fn admins_can_list_and_rename_teams() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let (team_id, _) = app.create_team(&alice, "Red Team").await;

        let res = app
            .patch_with_token(&routes::team(team_id), &json!({"name": "Crimson"}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_token(&routes::event_teams(event_id), &admin).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body[0]["name"], "Crimson");
        assert_eq!(res.body[0]["members"], 1);
    }

    #[tokio::test]
    async fn players_cannot_moderate_teams() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let (team_id, _) = app.create_team(&alice, "Red Team").await;

        let res = app
            .post_with_token(&routes::team_ban(team_id), &json!({"banned": true}), &alice)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn empty_team_can_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let (team_id, _) = app.create_team(&alice, "Red Team").await;

        let res = app.delete_with_token(&routes::team(team_id), &admin).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.get_with_token(routes::MY_TEAM, &alice).await;
        assert_eq!(res.body["has_team"], false);
    }
}
