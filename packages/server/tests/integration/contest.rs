use crate::common::{TestApp, routes};
use serde_json::json;

/// Create a minimal valid contest payload.
fn valid_contest_body(title: &str, capacity: i32) -> serde_json::Value {
    json!({
        "title": title,
        "description": "A contest description in **Markdown**.",
        "capacity": capacity,
        "start_time": "2099-01-01T00:00:00Z",
        "end_time": "2099-01-02T00:00:00Z",
    })
}

mod contest_creation {
    use super::*;

    #[tokio::test]
    async fn organizer_can_create_a_draft_contest() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();

        let body = valid_contest_body("Spring Cup", 16);
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Spring Cup");
        assert_eq!(res.body["capacity"], 16);
        assert_eq!(res.body["occupancy"], 0);
        assert_eq!(res.body["status"], "draft");
    }

    #[tokio::test]
    async fn open_registration_flag_starts_contest_open() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();

        let mut body = valid_contest_body("Open Cup", 4);
        body["open_registration"] = json!(true);
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["status"], "registration_open");
    }

    #[tokio::test]
    async fn player_cannot_create_contest() {
        let app = TestApp::spawn().await;
        let token = app.player_token(1);

        let body = valid_contest_body("Nope", 4);
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let body = valid_contest_body("Nope", 4);
        let res = app.post_without_token(routes::CONTESTS, &body).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let app = TestApp::spawn().await;
        let forged = arena_server::utils::jwt::sign(1, "admin", arena_common::Role::Admin, "x")
            .unwrap();

        let res = app.get_with_token(routes::CONTESTS, &forged).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn returns_validation_error_for_zero_capacity() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();

        let body = valid_contest_body("Empty", 0);
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn returns_validation_error_when_end_before_start() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();

        let mut body = valid_contest_body("Backwards", 4);
        body["end_time"] = json!("2098-01-01T00:00:00Z");
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();

        let res = app
            .post_with_token(routes::CONTESTS, &json!({"title": 5}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod contest_listing {
    use super::*;

    #[tokio::test]
    async fn lists_with_pagination_and_search() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        app.create_contest(&token, "Alpha Open", 4).await;
        app.create_contest(&token, "Beta Open", 4).await;
        app.create_contest(&token, "Gamma 100%", 4).await;

        let res = app
            .get_with_token(&format!("{}?per_page=2", routes::CONTESTS), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let res = app
            .get_with_token(&format!("{}?search=beta", routes::CONTESTS), &token)
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["data"][0]["title"], "Beta Open");

        let res = app
            .get_with_token(&format!("{}?search=100%25", routes::CONTESTS), &token)
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn filters_by_status_and_sorts_by_title() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let b = app.create_contest(&token, "B", 4).await;
        app.create_contest(&token, "A", 4).await;
        app.create_contest(&token, "C", 4).await;
        app.set_status(b, "closed", &token).await;

        let res = app
            .get_with_token(
                &format!(
                    "{}?status=registration_open&sort_by=title&sort_order=asc",
                    routes::CONTESTS
                ),
                &token,
            )
            .await;
        assert_eq!(res.status, 200);
        let titles: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn rejects_unknown_sort_field() {
        let app = TestApp::spawn().await;
        let token = app.player_token(1);

        let res = app
            .get_with_token(&format!("{}?sort_by=capacity", routes::CONTESTS), &token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn get_unknown_contest_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.player_token(1);

        let res = app.get_with_token(&routes::contest(999_999), &token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod contest_update {
    use super::*;

    #[tokio::test]
    async fn updates_title_and_capacity() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Old", 4).await;

        let res = app
            .patch_with_token(
                &routes::contest(id),
                &json!({"title": "New", "capacity": 8}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "New");
        assert_eq!(res.body["capacity"], 8);
        assert_eq!(res.body["occupancy"], 0);
    }

    #[tokio::test]
    async fn capacity_cannot_drop_below_occupancy() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Busy", 4).await;
        app.register(id, &app.player_token(1)).await;
        app.register(id, &app.player_token(2)).await;

        let res = app
            .patch_with_token(&routes::contest(id), &json!({"capacity": 1}), &token)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let res = app
            .patch_with_token(&routes::contest(id), &json!({"capacity": 2}), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["capacity"], 2);
        assert_eq!(res.body["occupancy"], 2);
    }

    #[tokio::test]
    async fn cross_field_schedule_check_uses_existing_values() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Sched", 4).await;

        let res = app
            .patch_with_token(
                &routes::contest(id),
                &json!({"end_time": "2098-06-01T00:00:00Z"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn player_cannot_update() {
        let app = TestApp::spawn().await;
        let id = app.create_contest(&app.organizer_token(), "Locked", 4).await;

        let res = app
            .patch_with_token(
                &routes::contest(id),
                &json!({"title": "Mine"}),
                &app.player_token(1),
            )
            .await;

        assert_eq!(res.status, 403);
    }
}

mod contest_status {
    use super::*;

    #[tokio::test]
    async fn follows_lifecycle() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Life", 4).await;

        app.set_status(id, "closed", &token).await;
        app.set_status(id, "registration_open", &token).await;
        app.set_status(id, "closed", &token).await;
        app.set_status(id, "completed", &token).await;

        let res = app.get_with_token(&routes::contest(id), &token).await;
        assert_eq!(res.body["status"], "completed");
    }

    #[tokio::test]
    async fn rejects_transition_out_of_terminal_state() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Gone", 4).await;
        app.set_status(id, "cancelled", &token).await;

        let res = app
            .put_with_token(
                &routes::contest_status(id),
                &json!({"status": "registration_open"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rejects_skipping_close() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Skip", 4).await;

        let res = app
            .put_with_token(
                &routes::contest_status(id),
                &json!({"status": "completed"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn rejects_unknown_status_value() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Weird", 4).await;

        let res = app
            .put_with_token(
                &routes::contest_status(id),
                &json!({"status": "paused"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }
}

mod contest_deletion {
    use super::*;

    #[tokio::test]
    async fn admin_deletes_unused_contest() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_contest(&token, "Temp", 4).await;

        let res = app.delete_with_token(&routes::contest(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::contest(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn organizer_lacks_delete_permission() {
        let app = TestApp::spawn().await;
        let token = app.organizer_token();
        let id = app.create_contest(&token, "Temp", 4).await;

        let res = app.delete_with_token(&routes::contest(id), &token).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn contest_with_registration_history_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();
        let id = app.create_contest(&token, "Used", 4).await;
        let player = app.player_token(1);
        app.register(id, &player).await;
        let res = app
            .delete_with_token(&routes::contest_register(id), &player)
            .await;
        assert_eq!(res.status, 200);

        let res = app.delete_with_token(&routes::contest(id), &token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }
}

mod openapi {
    use super::*;

    #[tokio::test]
    async fn document_lists_registration_routes() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::OPENAPI).await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/v1/contests/{id}/register"].is_object());
        assert!(res.body["paths"]["/api/v1/registrations/withdraw"].is_object());
    }
}
