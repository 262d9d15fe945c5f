mod common;

use common::{body, spawn_app};
use game_catalog::domain::model::{GameFilter, MetadataFilter};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn list_is_newest_first_with_count() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;
    app.create_game(&token, "Tetris", 3).await;
    app.create_game(&token, "Doom", 18).await;
    app.create_game(&token, "Myst", 12).await;

    let response = app.authed(Method::GET, "/games", &token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let data = body(response).await["data"].clone();
    assert_eq!(data["gamesCount"], 3);
    let titles: Vec<&str> = data["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Myst", "Doom", "Tetris"]);

    let filtered = app
        .authed(Method::GET, "/games?age=18", &token)
        .send()
        .await
        .unwrap();
    let data = body(filtered).await["data"].clone();
    assert_eq!(data["gamesCount"], 1);
    assert_eq!(data["games"][0]["title"], "Doom");

    let paged = app
        .authed(Method::GET, "/games?limit=1&offset=1", &token)
        .send()
        .await
        .unwrap();
    let data = body(paged).await["data"].clone();
    assert_eq!(data["games"][0]["title"], "Doom");
}

#[tokio::test]
async fn create_requires_title_and_token() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let untitled = app
        .authed(Method::POST, "/games", &token)
        .json(&json!({ "game": { "publisher": "Acme" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(untitled.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(untitled).await["data"]["errors"]["title"],
        json!(["this field is required"])
    );

    let anonymous = app
        .request(Method::POST, "/games")
        .json(&json!({ "game": { "title": "Doom" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let games = app.state.games.find(GameFilter::default()).await.unwrap();
    assert!(games.is_empty());
}

#[tokio::test]
async fn update_patches_first_match_only() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;
    let doom = app.create_game(&token, "Doom", 18).await;

    let response = app
        .authed(Method::PUT, "/games?title=Doom", &token)
        .json(&json!({ "game": { "publisher": "id Software" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let game = body(response).await["data"]["game"].clone();
    assert_eq!(game["id"], doom["id"]);
    assert_eq!(game["publisher"], "id Software");
    assert_eq!(game["ageRating"], 18);
    assert_eq!(game["createdAt"], doom["createdAt"]);
    assert_ne!(game["updatedAt"], doom["updatedAt"]);

    let missing = app
        .authed(Method::PATCH, "/games?title=Quake", &token)
        .json(&json!({ "game": { "publisher": "id Software" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_every_match() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;
    app.create_game(&token, "Doom", 18).await;
    app.create_game(&token, "Doom", 18).await;
    app.create_game(&token, "Myst", 12).await;

    let unfiltered = app.authed(Method::DELETE, "/games", &token).send().await.unwrap();
    assert_eq!(unfiltered.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let deleted = app
        .authed(Method::DELETE, "/games?title=Doom", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let again = app
        .authed(Method::DELETE, "/games?title=Doom", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let remaining = app.state.games.find(GameFilter::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Myst");
}

#[tokio::test]
async fn link_enforces_age_rating() {
    let app = spawn_app().await;
    let token = app.signed_up("teen@example.com", "teen", 17).await;
    app.register("adult@example.com", "adult", 18).await;
    app.create_game(&token, "Doom", 18).await;

    let too_young = app.link(&token, "teen", "Doom").await;
    assert_eq!(too_young.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(too_young).await["error"], "invalid user age");
    let rows = app.state.metadata.find(MetadataFilter::default()).await.unwrap();
    assert!(rows.is_empty());

    let linked = app.link(&token, "adult", "Doom").await;
    assert_eq!(linked.status(), StatusCode::CREATED);
    let md = body(linked).await["data"]["metadata"].clone();
    assert_eq!(md["playTime"], 0);
    assert_eq!(md["playTimeHuman"], "No data");

    let users = app
        .authed(Method::GET, "/users?username=adult", &token)
        .send()
        .await
        .unwrap();
    let user = body(users).await["data"]["users"][0].clone();
    assert_eq!(user["metadata"].as_array().unwrap().len(), 1);
    assert_eq!(user["metadata"][0]["playedGameId"], md["playedGameId"]);
}

#[tokio::test]
async fn link_without_match_is_unprocessable() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;
    app.create_game(&token, "Doom", 18).await;

    let no_game = app.link(&token, "ada", "Quake").await;
    assert_eq!(no_game.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(no_game).await["error"], "unable to process request");

    let no_user = app.link(&token, "ghost", "Doom").await;
    assert_eq!(no_user.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing_fields = app
        .authed(Method::POST, "/games/link", &token)
        .json(&json!({ "user": {}, "game": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_fields.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body(missing_fields).await["data"]["errors"].clone();
    assert!(errors.get("username").is_some());
    assert!(errors.get("title").is_some());
}

#[tokio::test]
async fn malformed_body_is_unprocessable() {
    let app = spawn_app().await;
    let token = app.signed_up("ada@example.com", "ada", 36).await;

    let response = app
        .authed(Method::POST, "/games", &token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON body"));
}
