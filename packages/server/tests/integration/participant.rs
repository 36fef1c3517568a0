use arena_common::Role;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn me_creates_directory_record_on_first_contact() {
    let app = TestApp::spawn().await;
    let token = app.token(55, "trinity", Role::Player);

    let res = app.get_with_token(routes::ME, &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["id"], 55);
    assert_eq!(res.body["display_name"], "trinity");
    assert_eq!(res.body["role"], "player");
}

#[tokio::test]
async fn me_follows_latest_token_claims() {
    let app = TestApp::spawn().await;
    app.get_with_token(routes::ME, &app.token(55, "trinity", Role::Player))
        .await;

    let res = app
        .get_with_token(routes::ME, &app.token(55, "Trinity", Role::Organizer))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["display_name"], "Trinity");
    assert_eq!(res.body["role"], "organizer");
}

#[tokio::test]
async fn lists_own_active_registrations() {
    let app = TestApp::spawn().await;
    let organizer = app.organizer_token();
    let a = app.create_contest(&organizer, "A", 4).await;
    let b = app.create_contest(&organizer, "B", 4).await;
    let player = app.player_token(1);
    app.register(a, &player).await;
    app.register(b, &player).await;
    app.delete_with_token(&routes::contest_register(a), &player)
        .await;

    let res = app
        .get_with_token(&routes::participant_registrations(101), &player)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    let items = res.body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["contest_id"], b);
    assert_eq!(items[0]["contest_title"], "B");
    assert_eq!(items[0]["contest_status"], "registration_open");
}

#[tokio::test]
async fn other_participants_registrations_need_manage_permission() {
    let app = TestApp::spawn().await;
    app.ensure_participant(&app.player_token(1)).await;

    let res = app
        .get_with_token(&routes::participant_registrations(101), &app.player_token(2))
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .get_with_token(&routes::participant_registrations(101), &app.organizer_token())
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn unknown_participant_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .get_with_token(&routes::participant_registrations(9999), &app.admin_token())
        .await;

    assert_eq!(res.status, 404);
}
