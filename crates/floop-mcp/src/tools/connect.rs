//! `connect` — create a typed relation edge between two behaviors (spec §6).

use floop_core::engine::{ConnectInput, FloopEngine};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["source", "target", "kind"],
        "properties": {
            "source": {"type": "string"},
            "target": {"type": "string"},
            "kind": {"type": "string", "enum": ["requires", "overrides", "conflicts", "similar-to", "learned-from"]},
            "weight": {"type": "number", "minimum": 0.0, "maximum": 1.0, "description": "Defaults to 0.8"},
            "bidirectional": {"type": "boolean", "default": false},
            "scope": {"type": "string", "enum": ["local", "global"]},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args = super::args_or_empty(args);
    let input: ConnectInput = serde_json::from_value(args).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?;
    let edge = engine.connect(input).map_err(engine_error_to_jsonrpc)?;
    serde_json::to_value(edge).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
}
