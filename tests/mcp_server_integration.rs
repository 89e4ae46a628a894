// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for MCP server functionality
//!
//! These tests verify that the MCP server correctly handles client connections,
//! processes requests, and returns appropriate responses. No credentials are
//! configured, so nothing here reaches a real provider.

use anyhow::Result;
use chathletique_mcp::config::Config;
use chathletique_mcp::health::HealthChecker;
use chathletique_mcp::mcp::McpServer;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

/// Helper to create a server without any provider credential
fn create_test_server() -> McpServer {
    McpServer::from_config(&Config::default()).expect("server builds without credentials")
}

async fn call(server: &McpServer, request: Value) -> Value {
    let response = server
        .handle_message(&request.to_string())
        .await
        .expect("request with an id gets a response");
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn test_initialize() {
    let server = create_test_server();
    let response = call(
        &server,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
    )
    .await;

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "chathletique-mcp");
    assert!(response.get("error").is_none());
}

#[tokio::test]
async fn test_tools_list() {
    let server = create_test_server();
    let response = call(&server, json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" })).await;

    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 6);
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    assert_eq!(response["id"], "a");
}

#[tokio::test]
async fn test_ping() {
    let server = create_test_server();
    let response = call(&server, json!({ "jsonrpc": "2.0", "id": 7, "method": "ping" })).await;
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn test_unknown_method() {
    let server = create_test_server();
    let response = call(&server, json!({ "jsonrpc": "2.0", "id": 2, "method": "resources/list" })).await;

    assert_eq!(response["error"]["code"], -32601);
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_parse_error_has_null_id() {
    let server = create_test_server();
    let response = server.handle_message("{not json").await.unwrap();
    let response = serde_json::to_value(response).unwrap();

    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn test_invalid_request_keeps_id() {
    let server = create_test_server();
    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","id":5,"method":42}"#)
        .await
        .unwrap();
    let response = serde_json::to_value(response).unwrap();

    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["id"], 5);
}

#[tokio::test]
async fn test_notification_gets_no_response() {
    let server = create_test_server();
    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_null_id_is_answered() {
    let server = create_test_server();
    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
        .await
        .expect("a null id is still a request");
    let response = serde_json::to_value(response).unwrap();

    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn test_unknown_tool() {
    let server = create_test_server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": { "name": "get_heart_rate_zones", "arguments": {} }
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["data"]["kind"], "unknown_tool");
}

#[tokio::test]
async fn test_missing_credential_is_provider_error() {
    let server = create_test_server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": { "name": "get_user_stats" }
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(response["error"]["data"]["kind"], "provider_error");
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("STRAVA_ACCESS_TOKEN"));
}

#[tokio::test]
async fn test_invalid_arguments() {
    let server = create_test_server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": { "name": "get_activity_series", "arguments": { "number_of_activity": 0 } }
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "invalid_params");
}

/// Helper to send one line and read one line back
async fn round_trip_line(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    request: &str,
) -> Result<Value> {
    writer.write_all(request.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    let mut line = String::new();
    timeout(Duration::from_secs(5), reader.read_line(&mut line)).await??;
    Ok(serde_json::from_str(&line)?)
}

#[tokio::test]
async fn test_tcp_transport() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server_task = tokio::spawn(create_test_server().serve(listener));

    let stream = TcpStream::connect(addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let init = round_trip_line(
        &mut reader,
        &mut write_half,
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
    )
    .await?;
    assert_eq!(init["id"], 1);

    // the notification is silent, so the next line answers the ping
    write_half
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await?;
    let ping = round_trip_line(
        &mut reader,
        &mut write_half,
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
    )
    .await?;
    assert_eq!(ping["id"], 2);
    assert_eq!(ping["result"], json!({}));

    server_task.abort();
    Ok(())
}

#[tokio::test]
async fn test_http_transport() {
    let server = create_test_server();
    let routes = server.http_routes(Arc::new(HealthChecker::new(&Config::default())));

    let response = warp::test::request()
        .method("POST")
        .path("/mcp")
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
        .reply(&routes)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 6);

    let response = warp::test::request()
        .method("POST")
        .path("/mcp")
        .body(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .reply(&routes)
        .await;
    assert_eq!(response.status(), 202);

    let response = warp::test::request()
        .method("GET")
        .path("/live")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "healthy");
}
