//! `learn` — record a correction, dedup/merge it against existing behaviors,
//! and persist the resulting behavior (spec §6, §4.7).

use floop_core::model::CorrectionInput;
use floop_core::store::Scope;
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["wrong", "right"],
        "properties": {
            "wrong": {"type": "string", "description": "What the agent did"},
            "right": {"type": "string", "description": "What it should have done instead"},
            "file": {"type": "string"},
            "task": {"type": "string"},
            "auto_merge": {"type": "boolean", "description": "Override the configured auto-merge setting for this call"},
            "scope": {"type": "string", "enum": ["local", "global"], "description": "Defaults to local"},
        },
    })
}

pub async fn execute(engine: &floop_core::engine::FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args = super::args_or_empty(args);
    let scope: Scope = args
        .get("scope")
        .and_then(Value::as_str)
        .map(|s| serde_json::from_value(Value::String(s.to_string())))
        .transpose()
        .map_err(|e: serde_json::Error| JsonRpcError::invalid_params(&e.to_string()))?
        .unwrap_or(Scope::Local);
    let input: CorrectionInput = serde_json::from_value(args).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?;

    let output = engine.learn(input, scope).map_err(engine_error_to_jsonrpc)?;
    serde_json::to_value(output).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
}
