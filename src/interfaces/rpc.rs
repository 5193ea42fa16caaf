//! Line-delimited JSON-RPC 2.0 over stdin/stdout.
//!
//! Three methods are served: `initialize`, `tools/list` and `tools/call`.
//! Notifications (no id) are logged and left unanswered. Tool failures are
//! carried in-band inside the tool result; protocol errors are reserved
//! for malformed requests, unknown methods and bad params.

use crate::interfaces::handler::ToolHandler;
use crate::interfaces::tools::tools_as_json;
use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "coinscope";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

pub struct RpcServer {
    handler: ToolHandler,
}

impl RpcServer {
    pub fn new(handler: ToolHandler) -> Self {
        Self { handler }
    }

    /// Serve until stdin closes.
    pub async fn run(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut payload = serde_json::to_string(&response)?;
                payload.push('\n');
                stdout.write_all(payload.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// One request line in, at most one response out. Notifications
    /// produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                return Some(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    &format!("Parse error: {}", e),
                ));
            }
        };

        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let id = request.get("id").cloned();

        let id = match id {
            Some(id) if !id.is_null() => id,
            _ => {
                debug!(method, "notification received");
                return None;
            }
        };

        let response = match method {
            "initialize" => result_response(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                    "capabilities": { "tools": {} },
                }),
            ),
            "tools/list" => result_response(id, tools_as_json()),
            "tools/call" => {
                let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
                let name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let empty = json!({});
                let arguments = params.get("arguments").unwrap_or(&empty);

                match self.handler.call(name, arguments).await {
                    Some(result) => {
                        let text = serde_json::to_string_pretty(&result)
                            .unwrap_or_else(|_| "{}".to_string());
                        result_response(
                            id,
                            json!({
                                "content": [{ "type": "text", "text": text }],
                            }),
                        )
                    }
                    None => error_response(
                        id,
                        INVALID_PARAMS,
                        &format!("Unknown tool: {}", name),
                    ),
                }
            }
            other => error_response(
                id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", other),
            ),
        };

        Some(response)
    }
}

fn result_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analysis::AnalysisService;
    use crate::infrastructure::coinpaprika::CoinPaprikaClient;
    use crate::infrastructure::geckoterminal::GeckoTerminalClient;
    use crate::infrastructure::provider::MarketDataProvider;
    use std::sync::Arc;

    // No request leaves the process in these tests; the clients point at
    // an unroutable address.
    fn server() -> RpcServer {
        let primary = Arc::new(CoinPaprikaClient::new("http://127.0.0.1:0", None));
        let dex = Arc::new(GeckoTerminalClient::new("http://127.0.0.1:0"));
        let provider = Arc::new(MarketDataProvider::new(primary, dex.clone()));
        let analysis = AnalysisService::new(provider);
        RpcServer::new(ToolHandler::new(analysis, dex))
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let server = server();
        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = server();
        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response["error"]["code"], PARSE_ERROR);
        assert!(response["id"].is_null());
    }

    #[tokio::test]
    async fn test_tool_failure_stays_in_band() {
        let server = server();
        // Missing the required symbol argument: the envelope still carries
        // a result, with the error inside the content text
        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_crypto_price","arguments":{}}}"#,
            )
            .await
            .unwrap();
        assert!(response.get("error").is_none());
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let inner: Value = serde_json::from_str(text).unwrap();
        assert!(inner["error"].as_str().unwrap().contains("symbol"));
    }
}
