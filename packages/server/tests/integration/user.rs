use serde_json::json;

use crate::common::{TestApp, routes};

mod administration {
    use super::*;

    #[tokio::test]
    async fn admin_can_fetch_a_user_without_secrets() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let alice = app.create_authenticated_user("alice").await;
        let alice_id = app.user_id(&alice).await;

        let res = app.get_with_token(&routes::admin_user(alice_id), &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["email"], "alice@example.com");
        assert_eq!(res.body["role"], "player");
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;

        for res in [
            app.get_with_token(&routes::admin_user(9999), &admin).await,
            app.delete_with_token(&routes::admin_user(9999), &admin).await,
        ] {
            assert_eq!(res.status, 404, "{}", res.text);
        }
    }

    #[tokio::test]
    async fn players_cannot_manage_users() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let bob_id = app.user_id(&bob).await;

        let res = app.get_with_token(&routes::admin_user(bob_id), &alice).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn admin_can_rename_and_promote() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let alice = app.create_authenticated_user("alice").await;
        let alice_id = app.user_id(&alice).await;

        let res = app
            .patch_with_token(
                &routes::admin_user(alice_id),
                &json!({"username": "alice_b", "email": "Alice.B@Example.com", "role": "admin"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["username"], "alice_b");
        assert_eq!(res.body["email"], "alice.b@example.com");
        assert_eq!(res.body["role"], "admin");

        let token = app.login("alice_b").await;
        let res = app.get_with_token(routes::EVENTS, &token).await;
        assert_eq!(res.status, 200, "promotion applies from the next login");
    }

    #[tokio::test]
    async fn taken_username_or_email_conflicts() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let alice = app.create_authenticated_user("alice").await;
        app.create_authenticated_user("bob").await;
        let alice_id = app.user_id(&alice).await;

        for body in [json!({"username": "bob"}), json!({"email": "bob@example.com"})] {
            let res = app
                .patch_with_token(&routes::admin_user(alice_id), &body, &admin)
                .await;
            assert_eq!(res.status, 409, "{}", res.text);
            assert_eq!(res.body["code"], "USERNAME_TAKEN");
        }

        let res = app
            .patch_with_token(
                &routes::admin_user(alice_id),
                &json!({"username": "alice"}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "keeping one's own name is not a clash");
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let alice = app.create_authenticated_user("alice").await;
        let alice_id = app.user_id(&alice).await;

        for body in [
            json!({"username": "a!"}),
            json!({"email": "not-an-email"}),
            json!({"role": "superuser"}),
        ] {
            let res = app
                .patch_with_token(&routes::admin_user(alice_id), &body, &admin)
                .await;
            assert_eq!(res.status, 400, "{}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn configured_email_domain_applies_to_updates() {
        let app =
            TestApp::spawn_with(|c| c.auth.email_domain = Some("example.com".to_string())).await;
        let admin = app.create_admin().await;
        let alice = app.create_authenticated_user("alice").await;
        let alice_id = app.user_id(&alice).await;

        let res = app
            .patch_with_token(
                &routes::admin_user(alice_id),
                &json!({"email": "alice@gmail.com"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn member_without_solves_can_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        app.create_running_event(&admin).await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let bob_id = app.user_id(&bob).await;
        let (team_id, token) = app.create_team(&alice, "Red Team").await;
        app.join_team(&bob, &token).await;

        let res = app.delete_with_token(&routes::admin_user(bob_id), &admin).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.get_with_token(&routes::admin_user(bob_id), &admin).await;
        assert_eq!(res.status, 404);

        let res = app.get_without_token(routes::TEAMS).await;
        assert_eq!(res.body["teams"][0]["id"], team_id);
        assert_eq!(res.body["teams"][0]["members"], 1);
    }

    #[tokio::test]
    async fn leaders_scorers_and_self_are_protected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let admin_id = app.user_id(&admin).await;
        let event_id = app.create_running_event(&admin).await;
        let challenge_id = app
            .create_open_challenge(&admin, event_id, "Warmup", 50, "flag{warm}")
            .await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let (_, token) = app.create_team(&alice, "Red Team").await;
        app.join_team(&bob, &token).await;
        let res = app.submit_flag(&bob, challenge_id, "flag{warm}").await;
        assert_eq!(res.status, 200, "{}", res.text);

        for user_id in [app.user_id(&alice).await, app.user_id(&bob).await, admin_id] {
            let res = app.delete_with_token(&routes::admin_user(user_id), &admin).await;
            assert_eq!(res.status, 409, "{}", res.text);
            assert_eq!(res.body["code"], "CONFLICT");
        }
    }
}
