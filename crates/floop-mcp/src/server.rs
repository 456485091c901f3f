//! MCP Server Core
//!
//! Routes JSON-RPC requests to the behavior-memory engine's tool and
//! resource handlers (spec §6).

use std::collections::HashMap;
use std::sync::Arc;

use floop_core::engine::FloopEngine;
use tracing::{debug, info, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListResourcesResult,
    ListToolsResult, ReadResourceRequest, ReadResourceResult, ResourceContent, ResourceDescription,
    ServerCapabilities, ServerInfo, ToolDescription,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::resources;
use crate::tools;

/// MCP server implementation: owns the engine and dispatches JSON-RPC.
pub struct McpServer {
    engine: Arc<FloopEngine>,
    initialized: bool,
}

impl McpServer {
    pub fn new(engine: Arc<FloopEngine>) -> Self {
        Self {
            engine,
            initialized: false,
        }
    }

    /// Handle an incoming JSON-RPC request.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "handling request");

        if !self.initialized && request.method != "initialize" && request.method != "notifications/initialized" {
            warn!("rejecting '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(request.id, JsonRpcError::server_not_initialized()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params).await,
            "resources/list" => self.handle_resources_list().await,
            "resources/read" => self.handle_resources_read(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    async fn handle_initialize(&mut self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            info!("client requested older protocol version {}, using it", request.protocol_version);
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;
        info!(version = %negotiated_version, "floop-mcp session initialized");

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo {
                name: "floop".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(HashMap::from([("listChanged".to_string(), serde_json::json!(false))])),
                resources: Some(HashMap::from([("listChanged".to_string(), serde_json::json!(false))])),
                prompts: None,
            },
            instructions: Some(
                "Floop tracks per-developer behavioral memory: constraints, directives, \
                 preferences, and procedures learned from corrections. Call 'active' at the \
                 start of a task to retrieve the behaviors relevant to the current file and \
                 task. Call 'learn' whenever the user corrects you. Call 'feedback' with \
                 signal='confirmed' or 'overridden' when a behavior's guidance is validated or \
                 contradicted by what actually happened."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "active".to_string(),
                description: Some("Main retrieval path. Spreads activation from the current file/task and returns the tiered, token-budgeted set of behaviors relevant right now.".to_string()),
                input_schema: tools::active::schema(),
            },
            ToolDescription {
                name: "learn".to_string(),
                description: Some("Record a correction (what the agent did wrong, what it should do instead). Deduplicates against existing behaviors and persists the result.".to_string()),
                input_schema: tools::learn::schema(),
            },
            ToolDescription {
                name: "list".to_string(),
                description: Some("Enumerate stored behaviors, optionally filtered by kind/tag, or list the correction log.".to_string()),
                input_schema: tools::list::schema(),
            },
            ToolDescription {
                name: "deduplicate".to_string(),
                description: Some("Find near-duplicate behaviors within a scope and merge them unless dry_run is set.".to_string()),
                input_schema: tools::deduplicate::schema(),
            },
            ToolDescription {
                name: "connect".to_string(),
                description: Some("Create a typed relation edge (requires/overrides/conflicts/similar-to/learned-from) between two behaviors.".to_string()),
                input_schema: tools::connect::schema(),
            },
            ToolDescription {
                name: "validate".to_string(),
                description: Some("Check the union graph for dangling references, self-edges, and relation cycles.".to_string()),
                input_schema: tools::validate::schema(),
            },
            ToolDescription {
                name: "backup".to_string(),
                description: Some("Snapshot a scope's graph to a versioned gzip container.".to_string()),
                input_schema: tools::backup::schema(),
            },
            ToolDescription {
                name: "restore".to_string(),
                description: Some("Load a backup container into a scope, merging with or replacing its current contents.".to_string()),
                input_schema: tools::restore::schema(),
            },
            ToolDescription {
                name: "feedback".to_string(),
                description: Some("Record a confirmed/overridden signal on a behavior, feeding session reinforcement.".to_string()),
                input_schema: tools::feedback::schema(),
            },
            ToolDescription {
                name: "graph".to_string(),
                description: Some("Export the union graph as dot, json, or html for visualization.".to_string()),
                input_schema: tools::graph::schema(),
            },
        ];

        let result = ListToolsResult { tools };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing tool call parameters")),
        };

        debug!(tool = %request.name, "dispatching tool call");

        let result = match request.name.as_str() {
            "active" => tools::active::execute(&self.engine, request.arguments).await,
            "learn" => tools::learn::execute(&self.engine, request.arguments).await,
            "list" => tools::list::execute(&self.engine, request.arguments).await,
            "deduplicate" => tools::deduplicate::execute(&self.engine, request.arguments).await,
            "connect" => tools::connect::execute(&self.engine, request.arguments).await,
            "validate" => tools::validate::execute(&self.engine, request.arguments).await,
            "backup" => tools::backup::execute(&self.engine, request.arguments).await,
            "restore" => tools::restore::execute(&self.engine, request.arguments).await,
            "feedback" => tools::feedback::execute(&self.engine, request.arguments).await,
            "graph" => tools::graph::execute(&self.engine, request.arguments).await,
            other => {
                warn!("unknown tool: {}", other);
                Err(JsonRpcError::method_not_found_with_message(&format!("unknown tool: {other}")))
            }
        };

        match result {
            Ok(value) => {
                serde_json::to_value(CallToolResult::ok(&value)).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_resources_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let resources = vec![
            ResourceDescription {
                uri: resources::behaviors::ACTIVE_URI.to_string(),
                name: "Active behaviors".to_string(),
                description: Some("The current tiered prompt rendered for the default context.".to_string()),
                mime_type: "text/markdown".to_string(),
            },
            ResourceDescription {
                uri: format!("{}{{id}}", resources::behaviors::EXPAND_PREFIX),
                name: "Behavior detail".to_string(),
                description: Some("Full detail for a single behavior: canonical + expanded content, stats, when-clause.".to_string()),
                mime_type: "application/json".to_string(),
            },
        ];

        let result = ListResourcesResult { resources };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_resources_read(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: ReadResourceRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing resource uri")),
        };

        if !resources::behaviors::matches(&request.uri) {
            return Err(JsonRpcError::resource_not_found(&request.uri));
        }

        let (mime_type, text) = resources::behaviors::read(&self.engine, &request.uri).await?;
        let result = ReadResourceResult {
            contents: vec![ResourceContent {
                uri: request.uri,
                mime_type,
                text,
            }],
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}
