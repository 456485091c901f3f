//! `active` — main retrieval path: spreads activation from the current
//! context and returns the tiered, rendered behavior set (spec §6).

use floop_core::engine::{ActiveInput, FloopEngine};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "file": {"type": "string", "description": "Path of the file currently being edited"},
            "task": {"type": "string", "description": "Free-text description of the current task"},
            "token_budget": {"type": "integer", "minimum": 1, "description": "Override the default token budget"},
            "format": {"type": "string", "enum": ["markdown", "xml", "plain"], "description": "Render format, default markdown"},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let input: ActiveInput = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => ActiveInput::default(),
    };
    let output = engine.active(input).map_err(super::engine_error_to_jsonrpc)?;
    serde_json::to_value(output).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
}
