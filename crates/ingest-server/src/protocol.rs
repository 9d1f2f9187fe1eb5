//! Session protocol messages and dispatch.
//!
//! The session endpoint speaks JSON-RPC 2.0-shaped messages. A
//! [`ProtocolHandler`] owns the dispatch table for one session: lifecycle
//! (`initialize`, `shutdown`), tools (`tools/list`, `tools/call`) and
//! resources (`resources/list`, `resources/read`). Tool and resource failures
//! are reported in-band inside the result payload; only malformed requests
//! (unknown method) produce a JSON-RPC error object.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::events::EventQueue;
use crate::ingestion::{IngestionRequest, IngestionService};

/// Protocol revision reported to clients at initialize time.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server identity reported in initialize responses and metadata.
pub const SERVER_NAME: &str = "content-automation-mcp-ingestion";
pub const SERVER_DESCRIPTION: &str =
    "MCP server for content ingestion with validation and processing";

/// One inbound protocol request.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Build a request for an internally driven operation (e.g. session
    /// termination routed through the transport).
    #[must_use]
    pub fn internal(method: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::Null,
            method: method.to_string(),
            params: Value::Null,
        }
    }
}

/// One outbound protocol response.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Outcome of handling one request: the response, and whether the session
/// should close afterwards.
pub struct Handled {
    pub response: RpcResponse,
    pub close: bool,
}

/// Per-session dispatch over the shared ingestion service.
#[derive(Clone)]
pub struct ProtocolHandler {
    ingestion: Arc<IngestionService>,
    events: Arc<EventQueue>,
}

impl ProtocolHandler {
    #[must_use]
    pub fn new(ingestion: Arc<IngestionService>, events: Arc<EventQueue>) -> Self {
        Self { ingestion, events }
    }

    /// Dispatch one request.
    pub async fn handle(&self, request: RpcRequest) -> Handled {
        let id = request.id.clone();
        tracing::debug!(method = %request.method, "handling protocol request");

        match request.method.as_str() {
            "initialize" => Handled {
                response: RpcResponse::result(
                    id,
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {"tools": {}, "resources": {}},
                        "serverInfo": {
                            "name": SERVER_NAME,
                            "version": crate::ingestion::SERVICE_VERSION,
                        },
                    }),
                ),
                close: false,
            },
            "shutdown" => Handled {
                response: RpcResponse::result(id, json!({})),
                close: true,
            },
            "tools/list" => Handled {
                response: RpcResponse::result(id, tool_descriptors()),
                close: false,
            },
            "tools/call" => Handled {
                response: RpcResponse::result(id, self.call_tool(&request.params).await),
                close: false,
            },
            "resources/list" => Handled {
                response: RpcResponse::result(id, resource_descriptors()),
                close: false,
            },
            "resources/read" => Handled {
                response: RpcResponse::result(id, self.read_resource(&request.params).await),
                close: false,
            },
            other => Handled {
                response: RpcResponse::error(id, -32601, format!("Method not found: {other}")),
                close: false,
            },
        }
    }

    /// `tools/call`: dispatch by tool name; failures are in-band tool
    /// results with `isError: true`.
    async fn call_tool(&self, params: &Value) -> Value {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match name {
            "ingest_content" => self.tool_ingest_content(arguments).await,
            "get_ingestion_stats" => self.tool_get_stats().await,
            other => tool_error(format!("Unknown tool: {other}")),
        }
    }

    async fn tool_ingest_content(&self, arguments: Value) -> Value {
        let Some(content) = arguments.get("content").cloned() else {
            return tool_error("Missing required argument: content");
        };

        let request = IngestionRequest {
            content,
            content_type: None,
            metadata: arguments
                .get("metadata")
                .and_then(Value::as_object)
                .cloned(),
        };
        let response = self.ingestion.ingest(request).await;
        let failed = response.status == ingest_core::IngestionStatus::Failed;

        self.events
            .push_event(
                "ingest:result",
                json!({
                    "id": response.id,
                    "status": response.status,
                    "contentType": response.content_type.map_or("unknown", |t| t.as_str()),
                    "timestamp": response.timestamp,
                }),
            )
            .await;

        let text = serde_json::to_string_pretty(&response)
            .unwrap_or_else(|_| "{}".to_string());
        json!({
            "content": [{"type": "text", "text": text}],
            "isError": failed,
        })
    }

    async fn tool_get_stats(&self) -> Value {
        let stats = self.ingestion.stats().await;
        let health = self.ingestion.health(0);
        let text = serde_json::to_string_pretty(&json!({"health": health, "stats": stats}))
            .unwrap_or_else(|_| "{}".to_string());
        json!({"content": [{"type": "text", "text": text}]})
    }

    /// `resources/read`: dispatch by URI; failures are in-band contents.
    async fn read_resource(&self, params: &Value) -> Value {
        let uri = params.get("uri").and_then(Value::as_str).unwrap_or("");

        let body = match uri {
            "ingestion://status" => json!({
                "health": self.ingestion.health(0),
                "stats": self.ingestion.stats().await,
            }),
            "ingestion://records" => {
                let records = self.ingestion.records().await;
                json!({"records": records, "count": records.len()})
            }
            "ingestion://records/completed" => {
                let records = self.ingestion.records_by_status("completed").await;
                json!({"records": records, "count": records.len()})
            }
            "ingestion://records/failed" => {
                let records = self.ingestion.records_by_status("failed").await;
                json!({"records": records, "count": records.len()})
            }
            other => {
                // A trailing path segment addresses one record by id.
                if let Some(record_id) = other.strip_prefix("ingestion://records/") {
                    match self.ingestion.record(record_id).await {
                        Some(record) => json!({"record": record}),
                        None => json!({"error": format!("Record not found: {record_id}")}),
                    }
                } else {
                    json!({"error": format!("Unknown resource URI: {other}")})
                }
            }
        };

        let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string());
        json!({"contents": [{"uri": uri, "mimeType": "application/json", "text": text}]})
    }
}

fn tool_error(message: impl Into<String>) -> Value {
    json!({
        "content": [{"type": "text", "text": message.into()}],
        "isError": true,
    })
}

fn tool_descriptors() -> Value {
    json!({
        "tools": [
            {
                "name": "ingest_content",
                "description": "Ingest and validate content (articles, ads, landing pages)",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "content": {
                            "type": "object",
                            "description": "The content to ingest (article, ad, or landing page)"
                        },
                        "metadata": {
                            "type": "object",
                            "description": "Optional metadata for the content"
                        }
                    },
                    "required": ["content"]
                }
            },
            {
                "name": "get_ingestion_stats",
                "description": "Get ingestion service statistics",
                "inputSchema": {"type": "object", "properties": {}}
            }
        ]
    })
}

fn resource_descriptors() -> Value {
    json!({
        "resources": [
            {
                "uri": "ingestion://status",
                "name": "Ingestion Status",
                "description": "Current status and statistics of the ingestion service",
                "mimeType": "application/json"
            },
            {
                "uri": "ingestion://records",
                "name": "Ingestion Records",
                "description": "All ingestion records",
                "mimeType": "application/json"
            },
            {
                "uri": "ingestion://records/completed",
                "name": "Completed Records",
                "description": "Successfully completed ingestion records",
                "mimeType": "application/json"
            },
            {
                "uri": "ingestion://records/failed",
                "name": "Failed Records",
                "description": "Failed ingestion records",
                "mimeType": "application/json"
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> ProtocolHandler {
        ProtocolHandler::new(
            Arc::new(IngestionService::new()),
            Arc::new(EventQueue::new()),
        )
    }

    fn request(method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let handled = handler().handle(request("initialize", Value::Null)).await;
        assert!(!handled.close);
        let result = handled.response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_shutdown_closes_session() {
        let handled = handler().handle(request("shutdown", Value::Null)).await;
        assert!(handled.close);
        assert!(handled.response.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_is_rpc_error() {
        let handled = handler().handle(request("nope/nothing", Value::Null)).await;
        assert!(!handled.close);
        let error = handled.response.error.unwrap();
        assert_eq!(error.code, -32601);
    }

    #[tokio::test]
    async fn test_tools_list_names_both_tools() {
        let handled = handler().handle(request("tools/list", Value::Null)).await;
        let tools = handled.response.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ingest_content", "get_ingestion_stats"]);
    }

    #[tokio::test]
    async fn test_ingest_content_tool_round_trip() {
        let ingestion = Arc::new(IngestionService::new());
        let events = Arc::new(EventQueue::new());
        let handler = ProtocolHandler::new(ingestion.clone(), events.clone());

        let params = json!({
            "name": "ingest_content",
            "arguments": {
                "content": {
                    "adText": "Buy",
                    "targetAudience": "all"
                }
            }
        });
        let handled = handler.handle(request("tools/call", params)).await;
        let result = handled.response.result.unwrap();
        assert_eq!(result["isError"], json!(false));

        // Record stored and an event queued.
        assert_eq!(ingestion.records().await.len(), 1);
        assert_eq!(events.stats().await.event_count, 1);
    }

    #[tokio::test]
    async fn test_ingest_content_without_content_is_tool_error() {
        let params = json!({"name": "ingest_content", "arguments": {}});
        let handled = handler().handle(request("tools/call", params)).await;
        let result = handled.response.result.unwrap();
        assert_eq!(result["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_in_band_error() {
        let params = json!({"name": "frobnicate", "arguments": {}});
        let handled = handler().handle(request("tools/call", params)).await;
        assert_eq!(handled.response.result.unwrap()["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_resources_read_status() {
        let params = json!({"uri": "ingestion://status"});
        let handled = handler().handle(request("resources/read", params)).await;
        let contents = handled.response.result.unwrap()["contents"].clone();
        assert_eq!(contents[0]["uri"], "ingestion://status");
        assert_eq!(contents[0]["mimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_resources_read_specific_record() {
        let ingestion = Arc::new(IngestionService::new());
        let handler = ProtocolHandler::new(ingestion.clone(), Arc::new(EventQueue::new()));
        let response = ingestion
            .ingest(IngestionRequest {
                content: json!({"adText": "x", "targetAudience": "y"}),
                content_type: None,
                metadata: None,
            })
            .await;

        let params = json!({"uri": format!("ingestion://records/{}", response.id)});
        let handled = handler.handle(request("resources/read", params)).await;
        let text = handled.response.result.unwrap()["contents"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains(&response.id));
    }

    #[tokio::test]
    async fn test_resources_read_unknown_uri_reports_error_body() {
        let params = json!({"uri": "bogus://nope"});
        let handled = handler().handle(request("resources/read", params)).await;
        let text = handled.response.result.unwrap()["contents"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("Unknown resource URI"));
    }
}
