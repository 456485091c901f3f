//! `graph` — export the union graph for visualization in one of three
//! textual formats (spec §6). Rendering lives here, not in the engine,
//! since the engine only ever hands back the raw node/edge export.

use floop_core::engine::FloopEngine;
use floop_core::model::{Behavior, Edge};
use serde_json::Value;

use crate::protocol::types::JsonRpcError;
use crate::tools::engine_error_to_jsonrpc;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "format": {"type": "string", "enum": ["dot", "json", "html"], "description": "Defaults to json"},
        },
    })
}

pub async fn execute(engine: &FloopEngine, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args = super::args_or_empty(args);
    let format = args.get("format").and_then(Value::as_str).unwrap_or("json").to_string();
    let (nodes, edges) = engine.graph_export().map_err(engine_error_to_jsonrpc)?;

    let graph = match format.as_str() {
        "dot" => Value::String(render_dot(&nodes, &edges)),
        "html" => Value::String(render_html(&nodes, &edges)),
        "json" => render_json(&nodes, &edges),
        other => return Err(JsonRpcError::invalid_params(&format!("unknown graph format: {other}"))),
    };

    Ok(serde_json::json!({
        "format": format,
        "graph": graph,
        "node_count": nodes.len(),
        "edge_count": edges.len(),
    }))
}

fn render_json(nodes: &[Behavior], edges: &[Edge]) -> Value {
    serde_json::json!({"nodes": nodes, "edges": edges})
}

fn render_dot(nodes: &[Behavior], edges: &[Edge]) -> String {
    let mut out = String::from("digraph floop {\n");
    for node in nodes {
        out.push_str(&format!(
            "  \"{}\" [label=\"{}\", kind=\"{}\"];\n",
            node.id,
            node.name.replace('"', "'"),
            node.kind.as_str()
        ));
    }
    for edge in edges {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [label=\"{}\", weight={:.2}];\n",
            edge.source,
            edge.target,
            edge.kind.as_str(),
            edge.weight
        ));
    }
    out.push_str("}\n");
    out
}

fn render_html(nodes: &[Behavior], edges: &[Edge]) -> String {
    let json = render_json(nodes, edges);
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>floop graph</title></head>\
         <body><pre id=\"graph-data\">{}</pre></body></html>",
        serde_json::to_string(&json).unwrap_or_default()
    )
}
