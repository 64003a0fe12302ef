use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

fn area(plot: f64, points: &[f64]) -> Value {
    json!({
        "plotSize": plot,
        "waterFlowRate": 2.5,
        "tankSize": 500.0,
        "tankSizeName": "500L",
        "waterAmount": 40.0,
        "irrigationTime": "30min",
        "fertilizerStartTime": "08:00",
        "fertilizerTotalTime": "20min",
        "fertilizerFlowRate": 1.5,
        "moisturePoints": points.iter().map(|v| json!({ "value": v })).collect::<Vec<_>>(),
        "negative": false
    })
}

fn irrigation(mode: &str, areas: Vec<Value>) -> Value {
    json!({
        "irrigationMode": mode,
        "efficiency": 0.85,
        "cropType": "tomato",
        "depth": 30.0,
        "optimalMoisture": 70.0,
        "soilType": "loam",
        "fieldCapacity": 32.0,
        "soilDensity": 1.3,
        "areas": areas
    })
}

#[tokio::test]
async fn areas_and_moisture_points_round_trip() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("irrigator").await?;

    let body = irrigation("drip", vec![area(1.5, &[20.0, 25.5]), area(3.0, &[])]);
    let (status, created) = app.post("/irrigation/save", Some(&account.token), body).await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["data"]["id"].as_i64().context("id")?;

    let (status, fetched) = app.get(&format!("/irrigation/record?id={id}"), &account.token).await?;
    assert_eq!(status, StatusCode::OK);
    let areas = fetched["data"]["areas"].as_array().context("areas")?;
    assert_eq!(areas.len(), 2);
    assert_eq!(areas[0], area(1.5, &[20.0, 25.5]));
    assert_eq!(areas[1]["moisturePoints"], json!([]));
    assert_eq!(fetched["data"]["irrigationMode"], "drip");
    Ok(())
}

#[tokio::test]
async fn update_replaces_areas_and_query_filters_mode() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("irr_upd").await?;

    let (_, created) = app
        .post("/irrigation/save", Some(&account.token), irrigation("drip", vec![area(1.0, &[1.0]); 3]))
        .await?;
    let id = created["data"]["id"].as_i64().context("id")?;
    app.post("/irrigation/save", Some(&account.token), irrigation("sprinkler", vec![])).await?;

    let (status, _) = app
        .put(
            &format!("/irrigation/record?id={id}"),
            &account.token,
            irrigation("drip", vec![area(9.0, &[5.0])]),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/irrigation/records?query=DRIP", &account.token).await?;
    let items = body["data"].as_array().context("items")?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id);
    assert_eq!(items[0]["areas"].as_array().map(Vec::len), Some(1));
    assert_eq!(items[0]["areas"][0]["plotSize"], 9.0);
    Ok(())
}

#[tokio::test]
async fn area_lists_beyond_one_insert_batch_are_stored() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("irr_bulk").await?;

    let areas = (0..5_500).map(|i| area(i as f64, &[])).collect();
    let (status, created) = app.post("/irrigation/save", Some(&account.token), irrigation("drip", areas)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_i64().context("id")?;

    let (_, fetched) = app.get(&format!("/irrigation/record?id={id}"), &account.token).await?;
    let areas = fetched["data"]["areas"].as_array().context("areas")?;
    assert_eq!(areas.len(), 5_500);
    assert_eq!(areas[5_499], area(5_499.0, &[]));
    Ok(())
}

#[tokio::test]
async fn failed_area_insert_leaves_no_parent_row() -> Result<()> {
    let Some(app) = common::spawn_app().await? else { return Ok(()) };
    let account = app.register("irr_rollback").await?;

    let mut bad = area(1.0, &[10.0]);
    bad["tankSizeName"] = json!("bad\u{0}tank");
    let body = irrigation("sprinkler", vec![area(2.0, &[]), bad]);
    let (status, _) = app.post("/irrigation/save", Some(&account.token), body).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM irrigation_records WHERE user_id = $1")
        .bind(account.id)
        .fetch_one(app.db.pool())
        .await?;
    assert_eq!(rows, 0);
    Ok(())
}
