//! `feedback` — record a confirm/override signal on a behavior, feeding
//! session reinforcement (spec §6, §4.9).

use floop_core::engine::{FeedbackInput, FloopEngine};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["behavior_id", "signal"],
        "properties": {
            "behavior_id": {"type": "string"},
            "signal": {"type": "string", "enum": ["confirmed", "overridden"]},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args = super::args_or_empty(args);
    let behavior_id = super::required_str(&args, "behavior_id")?;
    let input: FeedbackInput = serde_json::from_value(args).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?;
    let signal = input.signal;
    engine.feedback(input).map_err(engine_error_to_jsonrpc)?;
    Ok(serde_json::json!({
        "behavior_id": behavior_id,
        "signal": signal,
        "message": "feedback recorded",
    }))
}
