//! `validate` — check the union graph for dangling references, self-edges,
//! and relation cycles (spec §6, §4.11).

use floop_core::engine::FloopEngine;
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

pub async fn execute(engine: &FloopEngine, _args: Option<Value>) -> Result<Value, JsonRpcError> {
    let report = engine.validate().map_err(engine_error_to_jsonrpc)?;
    let message = if report.valid {
        "graph is valid".to_string()
    } else {
        format!("found {} issue(s)", report.error_count())
    };
    Ok(serde_json::json!({
        "valid": report.valid,
        "error_count": report.error_count(),
        "errors": report.issues,
        "message": message,
    }))
}
