mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

async fn choose_module(server: &common::TestServer, token: &str, business_id: i64, module: &str) -> Result<()> {
    let client = common::api_client()?;

    let res = client
        .post(server.url(&format!("/business-selection/{}", business_id)))
        .bearer_auth(token)
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "select business: {}", res.status());

    let res = client
        .post(server.url("/access-selection"))
        .bearer_auth(token)
        .json(&json!({ "access_type": "module", "module_code": module }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "select module: {}", res.status());
    Ok(())
}

#[tokio::test]
async fn entitled_module_is_served_from_its_tenant() -> Result<()> {
    let server = common::ensure_server().await?;
    let (token, _) = common::login(server, "multi@example.com").await?;
    choose_module(server, &token, 1, "hr").await?;

    let body: Value = common::api_client()?
        .get(server.url("/modules/hr/dashboard"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["tenant"], "tenant-one");
    assert_eq!(body["data"]["module"]["code"], "hr");
    Ok(())
}

#[tokio::test]
async fn browser_is_redirected_away_from_inactive_module() -> Result<()> {
    let server = common::ensure_server().await?;
    let (token, _) = common::login(server, "multi@example.com").await?;
    choose_module(server, &token, 1, "hr").await?;

    let res = common::browser_client()?
        .get(server.url("/crm/contacts"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/access-selection");
    Ok(())
}

#[tokio::test]
async fn expired_subscription_offers_no_modules() -> Result<()> {
    let server = common::ensure_server().await?;
    let (token, body) = common::login(server, "expired@example.com").await?;
    assert_eq!(body["data"]["redirect"]["route"], "access.selection");

    let body: Value = common::api_client()?
        .get(server.url("/access-selection"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["options"]["modules"], json!([]));
    Ok(())
}

#[tokio::test]
async fn orphaned_business_reports_configuration_error() -> Result<()> {
    let server = common::ensure_server().await?;
    let (token, _) = common::login(server, "orphan@example.com").await?;
    choose_module(server, &token, 5, "core").await?;

    let res = common::api_client()?
        .get(server.url("/core/settings"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Business configuration error");
    Ok(())
}
