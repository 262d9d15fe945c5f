mod common;

use common::{body, spawn_app, PASSWORD};
use game_catalog::domain::model::UserFilter;
use reqwest::{header, Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn register_returns_user_with_generated_fields() {
    let app = spawn_app().await;

    let response = app.register("ada@example.com", "ada", 36).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body(response).await;
    assert_eq!(body["success"], true);
    let user = &body["data"]["user"];
    assert!(user["id"].as_i64().unwrap() > 0);
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["age"], 36);
    assert_eq!(user["metadata"], json!([]));
    assert!(!user["createdAt"].as_str().unwrap().starts_with("1970"));
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("token").is_none());
}

#[tokio::test]
async fn duplicate_email_and_username_conflict() {
    let app = spawn_app().await;
    assert_eq!(
        app.register("ada@example.com", "ada", 36).await.status(),
        StatusCode::CREATED
    );

    let same_email = app.register("ada@example.com", "lovelace", 36).await;
    assert_eq!(same_email.status(), StatusCode::CONFLICT);
    let errors = body(same_email).await["data"]["errors"].clone();
    assert_eq!(errors, json!({ "email": ["this email is already in use"] }));

    let same_username = app.register("other@example.com", "ada", 36).await;
    assert_eq!(same_username.status(), StatusCode::CONFLICT);
    let errors = body(same_username).await["data"]["errors"].clone();
    assert_eq!(errors, json!({ "username": ["this username is already in use"] }));
}

#[tokio::test]
async fn invalid_registration_reports_fields() {
    let app = spawn_app().await;

    let response = app
        .request(Method::POST, "/users")
        .json(&json!({ "user": { "email": "nope", "username": "a", "password": "short" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let errors = body(response).await["data"]["errors"].clone();
    assert_eq!(errors["email"], json!(["\"nope\" is not a valid email"]));
    assert_eq!(errors["username"], json!(["username must be greater than 2"]));
    assert_eq!(errors["age"], json!(["this field is required"]));
    assert_eq!(errors["password"], json!(["password must be greater than 8"]));

    let users = app.state.users.find(UserFilter::default()).await.unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    app.register("ada@example.com", "ada", 36).await;

    let wrong_password = app.login("ada@example.com", "not the password").await;
    let unknown_email = app.login("nobody@example.com", PASSWORD).await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(wrong_password).await, body(unknown_email).await);
}

#[tokio::test]
async fn login_issues_token_accepted_by_protected_routes() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let response = app.authed(Method::GET, "/users", &token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let vary = response.headers()[header::VARY].to_str().unwrap().to_string();
    assert!(vary.contains("Authorization"));

    let users = body(response).await["data"]["users"].clone();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "ada");
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let app = spawn_app().await;

    let missing = app.request(Method::GET, "/users").send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.headers()[header::WWW_AUTHENTICATE], "Token");
    assert_eq!(
        body(missing).await["error"],
        "invalid or missing authentication token"
    );

    let garbage = app
        .authed(Method::GET, "/users", "not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let no_scheme = app
        .request(Method::GET, "/users")
        .header(header::AUTHORIZATION, "justatoken")
        .send()
        .await
        .unwrap();
    assert_eq!(no_scheme.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_of_deleted_user_is_a_server_error() {
    let app = spawn_app().await;
    let ada = app.signed_up("ada@example.com", "ada", 36).await;
    let bob = app.signed_up("bob@example.com", "bob", 40).await;

    let deleted = app
        .authed(Method::DELETE, "/users?username=bob", &ada)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let response = app.authed(Method::GET, "/users", &bob).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(response).await["error"], "internal error");
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let response = app
        .authed(Method::PATCH, "/users", &token)
        .json(&json!({ "user": { "age": 37, "password": "a brand new password" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = body(response).await["data"]["user"].clone();
    assert_eq!(user["age"], 37);
    assert_eq!(user["username"], "ada");
    assert_eq!(user["token"], token.as_str());

    assert_eq!(
        app.login("ada@example.com", PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("ada@example.com", "a brand new password").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn email_change_returns_a_token_for_the_new_email() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let response = app
        .authed(Method::PUT, "/users", &token)
        .json(&json!({ "user": { "email": "ada@new.example.com" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = body(response).await["data"]["user"].clone();
    assert_eq!(user["email"], "ada@new.example.com");
    let fresh = user["token"].as_str().unwrap().to_owned();
    assert_ne!(fresh, token);

    let listed = app.authed(Method::GET, "/users", &fresh).send().await.unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
}

#[tokio::test]
async fn update_to_taken_email_conflicts() {
    let app = spawn_app().await;
    app.register("bob@example.com", "bob", 40).await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let response = app
        .authed(Method::PUT, "/users", &token)
        .json(&json!({ "user": { "email": "bob@example.com" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_requires_a_predicate_and_a_match() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let unfiltered = app.authed(Method::DELETE, "/users", &token).send().await.unwrap();
    assert_eq!(unfiltered.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let nothing = app
        .authed(Method::DELETE, "/users?username=ghost", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(nothing.status(), StatusCode::NOT_FOUND);

    let users = app.state.users.find(UserFilter::default()).await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let response = app.request(Method::GET, "/health").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["data"]["status"], "ok");
}
