//! `backup` — snapshot a scope's graph to a versioned gzip container
//! (spec §6, §4.12).

use floop_core::engine::{BackupInput, FloopEngine};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "output_path": {"type": "string"},
            "scope": {"type": "string", "enum": ["local", "global"]},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let input: BackupInput = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => BackupInput::default(),
    };
    let summary = engine.backup(input).map_err(engine_error_to_jsonrpc)?;
    let mut value = serde_json::to_value(&summary).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
    value["message"] = Value::String(format!(
        "backed up {} node(s) and {} edge(s) to {}",
        summary.node_count,
        summary.edge_count,
        summary.path.display()
    ));
    Ok(value)
}
