//! Server integration tests.
//!
//! These tests verify the server starts correctly and handles requests.

mod common;

use anyhow::Result;

#[tokio::test]
async fn test_server_health_returns_version() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/health").send().await?;
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());

    Ok(())
}

#[tokio::test]
async fn test_openapi_document_served() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/api/openapi.json").send().await?;
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await?;
    assert!(body["paths"].get("/submit").is_some());

    Ok(())
}

#[tokio::test]
async fn test_error_body_shape() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/result/unknown").send().await?;
    assert_eq!(resp.status().as_u16(), 404);

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["message"], "Job not found");

    Ok(())
}

#[tokio::test]
async fn test_malformed_json_rejected() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .post("/submit")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert!(resp.status().is_client_error());

    Ok(())
}

#[tokio::test]
async fn test_search_empty_query_is_400() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/search?query=").send().await?;
    assert_eq!(resp.status().as_u16(), 400);

    Ok(())
}

#[tokio::test]
async fn test_search_tool_failure_is_500() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/search?query=queen").send().await?;
    assert_eq!(resp.status().as_u16(), 500);

    Ok(())
}
