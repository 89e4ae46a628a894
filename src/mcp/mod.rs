// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! JSON-RPC 2.0 MCP server
//!
//! Two transports share one request handler: line-delimited JSON over TCP,
//! and one request per `POST /mcp` over HTTP.

pub mod schema;
pub mod tools;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Reply};

use crate::config::Config;
use crate::constants::{errors, json_fields, protocol, routes};
use crate::health::{self, HealthChecker};
use crate::logging::AppLogger;
use crate::mcp::schema::{InitializeResponse, ToolsListResponse};

pub use tools::{call_tool, ToolContext, ToolError};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Absent for notifications, which get no response. An explicit
    /// `null` is kept as `Some(Value::Null)` and answered.
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data,
            }),
            id,
        }
    }
}

/// Success carrying `result`, or an internal error if it does not serialize
fn result_response<T: Serialize>(id: Value, result: &T) -> McpResponse {
    match serde_json::to_value(result) {
        Ok(result) => McpResponse::success(id, result),
        Err(e) => {
            warn!("Failed to serialize result: {}", e);
            McpResponse::error(
                id,
                errors::ERROR_INTERNAL_ERROR,
                e.to_string(),
                Some(json!({ "kind": "internal_error" })),
            )
        }
    }
}

#[derive(Clone)]
pub struct McpServer {
    context: Arc<ToolContext>,
}

impl McpServer {
    pub fn new(context: ToolContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let context =
            ToolContext::from_config(config).context("Failed to build provider clients")?;
        Ok(Self::new(context))
    }

    /// Bind the TCP transport and serve until the listener fails
    pub async fn run(self, host: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind TCP transport on {}:{}", host, port))?;
        info!("MCP server listening on {}:{}", host, port);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener, one task each
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            let (socket, addr) = listener.accept().await?;
            info!("New connection from {}", addr);

            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(socket).await {
                    warn!("Connection {} closed with error: {}", addr, e);
                }
            });
        }
    }

    async fn handle_connection(&self, socket: TcpStream) -> std::io::Result<()> {
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        while reader.read_line(&mut line).await? > 0 {
            let message = line.trim();
            if !message.is_empty() {
                if let Some(response) = self.handle_message(message).await {
                    let mut payload = serde_json::to_vec(&response)?;
                    payload.push(b'\n');
                    writer.write_all(&payload).await?;
                }
            }
            line.clear();
        }
        Ok(())
    }

    /// Answer one raw JSON-RPC message; `None` for notifications
    pub async fn handle_message(&self, raw: &str) -> Option<McpResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparseable message: {}", e);
                return Some(McpResponse::error(
                    Value::Null,
                    errors::ERROR_PARSE,
                    errors::MSG_PARSE_ERROR,
                    Some(json!({ "details": e.to_string() })),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(McpResponse::error(
                id,
                errors::ERROR_INVALID_REQUEST,
                errors::MSG_INVALID_REQUEST,
                Some(json!({ "details": e.to_string() })),
            )),
        }
    }

    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id else {
            debug!("Notification {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => {
                let init_response = InitializeResponse::new(
                    protocol::MCP_PROTOCOL_VERSION.to_string(),
                    protocol::server_name(),
                    protocol::SERVER_VERSION.to_string(),
                );
                result_response(id, &init_response)
            }
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => result_response(id, &ToolsListResponse::new()),
            "tools/call" => {
                self.handle_tool_call(id, request.params.unwrap_or_default())
                    .await
            }
            _ => McpResponse::error(
                id,
                errors::ERROR_METHOD_NOT_FOUND,
                errors::MSG_METHOD_NOT_FOUND,
                None,
            ),
        };
        Some(response)
    }

    async fn handle_tool_call(&self, id: Value, params: Value) -> McpResponse {
        let Some(tool_name) = params.get(json_fields::NAME).and_then(Value::as_str) else {
            return McpResponse::error(
                id,
                errors::ERROR_INVALID_PARAMS,
                "Missing tool name",
                None,
            );
        };
        let args = params.get(json_fields::ARGUMENTS).cloned().unwrap_or_else(|| json!({}));

        match call_tool(&self.context, tool_name, &args).await {
            Ok(result) => McpResponse::success(
                id,
                json!({
                    "content": [{ "type": "text", "text": result.to_string() }],
                    "isError": false
                }),
            ),
            Err(e) => McpResponse::error(id, e.code(), e.to_string(), Some(e.data())),
        }
    }

    async fn handle_http(&self, body: Bytes) -> warp::reply::Response {
        let start = Instant::now();
        let raw = String::from_utf8_lossy(&body);

        let reply = match self.handle_message(&raw).await {
            Some(response) => warp::reply::json(&response).into_response(),
            None => warp::reply::with_status(warp::reply(), StatusCode::ACCEPTED).into_response(),
        };

        AppLogger::log_api_request(
            "POST",
            "/mcp",
            reply.status().as_u16(),
            start.elapsed().as_millis() as u64,
        );
        reply
    }

    /// `POST /mcp` plus the health routes
    pub fn http_routes(
        &self,
        health_checker: Arc<HealthChecker>,
    ) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
        let server = self.clone();
        let mcp = warp::path(routes::MCP)
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::bytes())
            .and_then(move |body: Bytes| {
                let server = server.clone();
                async move { Ok::<_, Infallible>(server.handle_http(body).await) }
            });

        mcp.or(health::middleware::routes(health_checker))
    }

    /// Serve the HTTP transport until the process stops
    pub async fn run_http(self, host: &str, port: u16, health_checker: Arc<HealthChecker>) -> Result<()> {
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!("Invalid HTTP host '{}'", host))?;
        let addr = SocketAddr::new(ip, port);

        info!("HTTP transport listening on {}", addr);
        warp::serve(self.http_routes(health_checker)).run(addr).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_omits_absent_members() {
        let ok = serde_json::to_value(McpResponse::success(json!(1), json!({}))).unwrap();
        assert!(ok.get("error").is_none());
        assert_eq!(ok["jsonrpc"], "2.0");

        let err = serde_json::to_value(McpResponse::error(json!(2), -32601, "Method not found", None))
            .unwrap();
        assert!(err.get("result").is_none());
        assert!(err["error"].get("data").is_none());
    }

    #[test]
    fn test_request_without_id_is_notification() {
        let request: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(request.id.is_none());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_null_id_is_not_a_notification() {
        let request: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert_eq!(request.id, Some(Value::Null));
    }

    #[test]
    fn test_unserializable_result_is_internal_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let result: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let response = serde_json::to_value(result_response(json!(9), &result)).unwrap();

        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["data"]["kind"], "internal_error");
        assert!(response.get("result").is_none());
    }
}
