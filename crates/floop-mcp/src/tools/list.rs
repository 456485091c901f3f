//! `list` — enumerate stored behaviors, or the correction log (spec §6).

use floop_core::engine::{FloopEngine, ListInput};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "kind": {"type": "string", "enum": ["constraint", "directive", "preference", "procedure"]},
            "tag": {"type": "string"},
            "corrections": {"type": "boolean", "description": "List the correction log instead of behaviors"},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let input: ListInput = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => ListInput::default(),
    };
    let output = engine.list(input).map_err(engine_error_to_jsonrpc)?;
    serde_json::to_value(output).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
}
