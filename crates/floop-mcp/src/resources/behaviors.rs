//! `behaviors://active` and `behaviors://expand/{id}` (spec §6).

use floop_core::engine::{ActiveInput, FloopEngine};

use crate::protocol::types::JsonRpcError;

pub const ACTIVE_URI: &str = "behaviors://active";
pub const EXPAND_PREFIX: &str = "behaviors://expand/";

pub fn matches(uri: &str) -> bool {
    uri == ACTIVE_URI || uri.starts_with(EXPAND_PREFIX)
}

pub async fn read(engine: &FloopEngine, uri: &str) -> Result<(String, String), JsonRpcError> {
    if uri == ACTIVE_URI {
        let output = engine
            .active(ActiveInput::default())
            .map_err(crate::tools::engine_error_to_jsonrpc)?;
        return Ok(("text/markdown".to_string(), output.rendered));
    }

    if let Some(id) = uri.strip_prefix(EXPAND_PREFIX) {
        let (behavior, scope) = engine
            .store()
            .get_node(id)
            .map_err(|e| JsonRpcError::resource_not_found(&format!("{uri}: {e}")))?;
        let detail = serde_json::json!({
            "id": behavior.id,
            "name": behavior.name,
            "kind": behavior.kind.as_str(),
            "scope": scope,
            "canonical": behavior.content.canonical,
            "expanded": behavior.content.expanded,
            "summary": behavior.content.summary,
            "tags": behavior.content.tags,
            "when": behavior.when,
            "confidence": behavior.confidence,
            "priority": behavior.priority,
            "stats": behavior.stats,
            "provenance": behavior.provenance,
        });
        return Ok((
            "application/json".to_string(),
            serde_json::to_string_pretty(&detail).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?,
        ));
    }

    Err(JsonRpcError::resource_not_found(uri))
}
