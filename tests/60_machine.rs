use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;

mod common;

async fn mint_code(app: &common::TestApp, admin: &common::Account) -> Result<String> {
    let (status, body) = app
        .post("/machine/create", Some(&admin.token), json!({ "name": "test rig" }))
        .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create failed: {status} {body}");
    Ok(body["data"]["code"].as_str().context("code missing")?.to_string())
}

#[tokio::test]
async fn only_admins_create_codes() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let user = app.register("plain").await?;

    let (status, body) = app.post("/machine/create", Some(&user.token), json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let admin = app.register("admin").await?;
    app.make_admin(&admin).await?;
    let code = mint_code(&app, &admin).await?;
    assert_eq!(code.len(), 16);
    assert!(code.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
    Ok(())
}

#[tokio::test]
async fn check_bind_lookup_unbind_lifecycle() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let admin = app.register("mc_admin").await?;
    app.make_admin(&admin).await?;
    let user = app.register("mc_user").await?;
    let code = mint_code(&app, &admin).await?;

    let (status, body) = app.post("/machine/check", Some(&user.token), json!({ "machineCode": code })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "valid");
    assert_eq!(body["data"]["valid"], true);

    let (status, body) = app.post("/machine/bind", Some(&user.token), json!({ "machineCode": code })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["userId"], user.id);

    let (status, body) = app.get(&format!("/machine/user/{}", user.id), &user.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["code"], code.as_str());

    let (_, body) = app.get("/user/info", &user.token).await?;
    assert_eq!(body["data"]["machineCode"], code.as_str());

    let (status, body) = app.post("/machine/check", Some(&user.token), json!({ "machineCode": code })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "already_bound");

    let (status, _) = app.delete(&format!("/machine/user/{}", user.id), &user.token).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/machine/user/{}", user.id), &user.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn binding_a_bound_code_is_forbidden_without_mutation() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let admin = app.register("bb_admin").await?;
    app.make_admin(&admin).await?;
    let first = app.register("bb_first").await?;
    let second = app.register("bb_second").await?;
    let code = mint_code(&app, &admin).await?;

    let (status, _) = app.post("/machine/bind", Some(&first.token), json!({ "machineCode": code })).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/machine/bind", Some(&second.token), json!({ "machineCode": code })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (_, body) = app.get(&format!("/machine/user/{}", first.id), &first.token).await?;
    assert_eq!(body["data"]["userId"], first.id);
    let (status, _) = app.get(&format!("/machine/user/{}", second.id), &second.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unknown_code_and_missing_binding_are_not_found() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let user = app.register("nf").await?;

    let (status, body) = app
        .post("/machine/bind", Some(&user.token), json!({ "machineCode": "ZZZZZZZZZZZZZZZZ" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = app.delete(&format!("/machine/user/{}", user.id), &user.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn users_cannot_manage_other_accounts() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let admin = app.register("oa_admin").await?;
    app.make_admin(&admin).await?;
    let alice = app.register("oa_alice").await?;
    let bob = app.register("oa_bob").await?;
    let code = mint_code(&app, &admin).await?;

    let (status, _) = app
        .post("/machine/bind", Some(&bob.token), json!({ "machineCode": code, "userId": alice.id }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/machine/user/{}", alice.id), &bob.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins may act for anyone.
    let (status, _) = app
        .post("/machine/bind", Some(&admin.token), json!({ "machineCode": code, "userId": alice.id }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/machine/user/{}", alice.id), &admin.token).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
