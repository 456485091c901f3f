//! MCP Tools
//!
//! One file per tool operation exposed by the engine (spec §6). Each module
//! exposes `schema()` for `tools/list` and `execute()` for `tools/call`.

pub mod active;
pub mod backup;
pub mod connect;
pub mod deduplicate;
pub mod feedback;
pub mod graph;
pub mod learn;
pub mod list;
pub mod restore;
pub mod validate;

use floop_core::error::EngineError;
use serde_json::Value;

use crate::protocol::types::JsonRpcError;

/// Map an engine error to exit-code-bearing JSON-RPC error (spec §6, §7).
pub fn engine_error_to_jsonrpc(err: EngineError) -> JsonRpcError {
    match &err {
        EngineError::InvalidArgument(msg) => JsonRpcError::invalid_params(msg),
        EngineError::Store(_) => JsonRpcError::internal_error(&err.to_string()),
        EngineError::Runtime(_) => JsonRpcError::invalid_params(&err.to_string()),
        EngineError::EmbedUnavailable(msg) => JsonRpcError::internal_error(msg),
    }
}

/// Pull a required string field out of the tool arguments object.
pub fn required_str(args: &Value, field: &str) -> Result<String, JsonRpcError> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| JsonRpcError::invalid_params(&format!("missing required field: {field}")))
}

pub fn args_or_empty(args: Option<Value>) -> Value {
    args.unwrap_or_else(|| serde_json::json!({}))
}
