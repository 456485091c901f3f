//! `restore` — load a backup container into a scope, merging with or
//! replacing its current contents (spec §6, §4.12).

use floop_core::engine::{FloopEngine, RestoreInput};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["input_path"],
        "properties": {
            "input_path": {"type": "string"},
            "mode": {"type": "string", "enum": ["merge", "replace"], "description": "Defaults to merge"},
            "scope": {"type": "string", "enum": ["local", "global"]},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args = super::args_or_empty(args);
    let input: RestoreInput = serde_json::from_value(args).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?;
    let summary = engine.restore(input).map_err(engine_error_to_jsonrpc)?;
    let mut value = serde_json::to_value(&summary).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
    value["message"] = Value::String(format!(
        "restored {} node(s), skipped {}; restored {} edge(s), skipped {}",
        summary.nodes_restored, summary.nodes_skipped, summary.edges_restored, summary.edges_skipped
    ));
    Ok(value)
}
