mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = common::api_client()?.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], "fixture");
    Ok(())
}

#[tokio::test]
async fn root_lists_endpoints() -> Result<()> {
    let server = common::ensure_server().await?;

    let body = common::api_client()?
        .get(server.url("/"))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    assert_eq!(body["data"]["name"], "Tenant Gate");
    assert!(body["data"]["endpoints"]["login"].is_string());
    Ok(())
}
