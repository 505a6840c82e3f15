//! Line-oriented JSON request/response dispatch.
//!
//! Each request is one JSON object `{ id, method, params }` on a single line;
//! each response is one JSON object `{ id, result }` or `{ id, error }`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::DEFAULT_CONTEXT_LINES;
use crate::loader::GuidanceLoader;
use crate::types::RequestContext;

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32000;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpandParams {
    id: String,
    #[serde(default)]
    context_lines: Option<usize>,
}

/// Handle one request line and return the response line (without newline).
pub fn handle_line(loader: &GuidanceLoader, line: &str) -> String {
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(loader, request),
        Err(e) => {
            warn!(error = %e, "unparseable request line");
            Response::err(Value::Null, PARSE_ERROR, "Parse error")
        }
    };
    // A Response holds only strings, numbers and JSON values.
    serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"id":null,"error":{"code":-32000,"message":"Internal error"}}"#.to_string()
    })
}

fn dispatch(loader: &GuidanceLoader, request: Request) -> Response {
    let Request { id, method, params } = request;
    debug!(method = %method, "request");

    match method.as_str() {
        "ping" => Response::ok(id, json!("pong")),
        "capabilities" => Response::ok(id, capabilities(loader)),
        "load_guidance" => match serde_json::from_value::<RequestContext>(params) {
            Ok(ctx) => to_result(id, &loader.load_guidance(&ctx)),
            Err(e) => Response::err(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        },
        "expand_excerpt" => match serde_json::from_value::<ExpandParams>(params) {
            Ok(p) => match loader.expand_excerpt(&p.id, p.context_lines) {
                Ok(expansion) => to_result(id, &expansion),
                Err(e) => Response::err(id, INTERNAL_ERROR, e.to_string()),
            },
            Err(e) => Response::err(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        },
        other => Response::err(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    }
}

fn to_result<T: Serialize>(id: Value, value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(result) => Response::ok(id, result),
        Err(e) => Response::err(id, INTERNAL_ERROR, e.to_string()),
    }
}

fn capabilities(loader: &GuidanceLoader) -> Value {
    let keys: Vec<&str> = loader.manifest().keys.keys().collect();
    json!({
        "tools": [
            { "name": "load_guidance", "params": ["task", "diff_summary?", "labels?", "max_tokens?"] },
            {
                "name": "expand_excerpt",
                "params": ["id", "context_lines?"],
                "default_context_lines": DEFAULT_CONTEXT_LINES
            }
        ],
        "manifest_keys": keys
    })
}
