//! `deduplicate` — find and (unless `dry_run`) merge near-duplicate
//! behaviors within a scope (spec §6, §4.7).

use floop_core::engine::{DeduplicateInput, FloopEngine};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "scope": {"type": "string", "enum": ["local", "global"]},
            "threshold": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "dry_run": {"type": "boolean", "default": false},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let input: DeduplicateInput = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => DeduplicateInput::default(),
    };
    let output = engine.deduplicate(input).map_err(engine_error_to_jsonrpc)?;
    serde_json::to_value(output).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
}
