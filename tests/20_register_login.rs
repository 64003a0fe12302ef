use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

mod common;

use agri_api_rust::auth::TokenService;
use agri_api_rust::config::AppConfig;

#[tokio::test]
async fn register_then_login_returns_same_customer() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("farmer").await?;

    let (status, body) = app
        .post("/login", None, json!({ "username": account.username, "password": account.password }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["customerId"], account.id);
    assert_eq!(body["data"]["username"], account.username.as_str());
    assert_eq!(body["data"]["role"], 0);

    // The token's subject is the account id.
    let token = body["data"]["token"].as_str().unwrap_or_default();
    let tokens = TokenService::from_config(&AppConfig::for_tests("postgres://unused/agri").security)?;
    assert_eq!(tokens.verify(token)?, account.id);
    Ok(())
}

#[tokio::test]
async fn duplicate_username_conflicts_and_original_still_works() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("dup").await?;

    let (status, body) = app
        .post("/register", None, json!({ "username": account.username, "password": "another-pass" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CONFLICT");

    let (status, _) = app
        .post("/login", None, json!({ "username": account.username, "password": account.password }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_bad_requests() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("pw").await?;

    let (status, body) = app
        .post("/login", None, json!({ "username": account.username, "password": "wrong" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CREDENTIAL");

    let (status, body) = app
        .post("/login", None, json!({ "username": common::unique_name("ghost"), "password": "x" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CREDENTIAL");
    Ok(())
}

#[tokio::test]
async fn user_info_and_password_change() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("info").await?;

    let (status, body) = app.get("/user/info", &account.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customerId"], account.id);
    assert!(body["data"].get("passwordHash").is_none());

    let (status, _) = app
        .post(
            "/user/password",
            Some(&account.token),
            json!({ "oldPassword": "not-it", "newPassword": "fresh-pass" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/user/password",
            Some(&account.token),
            json!({ "oldPassword": account.password, "newPassword": "fresh-pass" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/login", None, json!({ "username": account.username, "password": "fresh-pass" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn wechat_login_creates_then_reuses_account() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let code = common::unique_name("wx");

    let (status, first) = app.post("/wxLogin", None, json!({ "code": code, "nickname": "Grower" })).await?;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["data"]["isNewUser"], true);
    assert_eq!(first["data"]["nickname"], "Grower");

    let (status, second) = app.post("/wxLogin", None, json!({ "code": code })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["isNewUser"], false);
    assert_eq!(second["data"]["customerId"], first["data"]["customerId"]);

    let (status, body) = app.post("/wxLogin", None, json!({ "code": "rejected" })).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "BAD_GATEWAY");
    Ok(())
}
