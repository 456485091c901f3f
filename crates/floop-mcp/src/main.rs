//! Floop MCP Server
//!
//! Exposes the Floop behavior-memory engine over stdio JSON-RPC (spec §6,
//! §13). Resolves the local store under `<project>/.floop` and the global
//! store under `~/.floop`, builds the typed config from defaults plus an
//! environment overlay, and runs the engine until stdin closes.

mod protocol;
mod resources;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use floop_core::engine::{resolve_local_root, EngineContext, FloopEngine};
use floop_core::error::{EngineError, RuntimeError, StoreError};
use floop_core::learning::CorrectionLog;
use floop_core::runtime::AuditLog;
use floop_core::store::{MultiStore, SqliteGraphStore};
use floop_core::FloopConfig;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

/// Parse command-line arguments and return the optional data-dir override.
/// Exits the process directly for `--help`/`--version`/malformed args,
/// mirroring the terse CLI-boundary style used elsewhere for this binary.
fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("floop-mcp {}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("MCP stdio server exposing the Floop behavior-memory engine.");
                println!();
                println!("USAGE:");
                println!("    floop-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Use PATH for both local and global stores");
                println!();
                println!("ENVIRONMENT:");
                println!("    FLOOP_LOG_LEVEL, RUST_LOG   Log level filter (default info)");
                println!("    FLOOP_AUTO_MERGE            Overlay learning.auto_merge_enabled");
                println!("    FLOOP_SIMILARITY_THRESHOLD  Overlay learning.auto_merge_threshold");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("floop-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(2);
                }
                data_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with("--data-dir=") => {
                let path = arg.strip_prefix("--data-dir=").unwrap_or("");
                if path.is_empty() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(2);
                }
                data_dir = Some(PathBuf::from(path));
            }
            arg => {
                eprintln!("error: unknown argument '{arg}'");
                eprintln!("Try 'floop-mcp --help' for more information.");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    data_dir
}

fn init_logging() {
    let level = std::env::var("FLOOP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level).add_directive(Level::INFO.into())))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

/// Map a top-level failure to the exit codes spec §6 defines for the
/// process boundary: `0` success, `1` validation, `2` config/path, `3`
/// rate limited, `4` backend.
fn exit_code_for(err: &EngineError) -> i32 {
    match err {
        EngineError::InvalidArgument(_) => 1,
        EngineError::Runtime(RuntimeError::PathRejected(_)) => 2,
        EngineError::Runtime(RuntimeError::RateLimited) => 3,
        EngineError::Store(_) | EngineError::EmbedUnavailable(_) => 4,
    }
}

fn build_engine(data_dir: Option<PathBuf>) -> Result<FloopEngine, EngineError> {
    let (local_root, global_root) = match data_dir {
        Some(dir) => (dir.clone(), dir),
        None => {
            let cwd = std::env::current_dir().map_err(|e| EngineError::Store(StoreError::BackendError(e.to_string())))?;
            let local_root = resolve_local_root(&cwd);
            let global_root = directories::BaseDirs::new()
                .map(|b| b.home_dir().to_path_buf())
                .unwrap_or_else(|| local_root.clone());
            (local_root, global_root)
        }
    };

    let local_db = local_root.join(".floop").join("graph.db");
    let global_db = global_root.join(".floop").join("graph.db");

    let local = Arc::new(SqliteGraphStore::open(&local_db).map_err(|e| EngineError::Store(StoreError::BackendError(e.to_string())))?);
    let global = Arc::new(SqliteGraphStore::open(&global_db).map_err(|e| EngineError::Store(StoreError::BackendError(e.to_string())))?);
    let store = MultiStore::new(local, global);

    let local_audit = AuditLog::open(&floop_core::runtime::audit::default_path_for(&local_root))
        .map_err(|e| EngineError::Store(StoreError::BackendError(e.to_string())))?;
    let global_audit = AuditLog::open(&floop_core::runtime::audit::default_path_for(&global_root))
        .map_err(|e| EngineError::Store(StoreError::BackendError(e.to_string())))?;
    let correction_log = CorrectionLog::open(&floop_core::learning::default_correction_log_path(&local_root))
        .map_err(|e| EngineError::Store(StoreError::BackendError(e.to_string())))?;

    let config = FloopConfig::from_env();

    let embedder = build_embedder(&config);

    let ctx = EngineContext {
        store,
        config,
        local_root,
        global_root,
        local_audit,
        global_audit,
        correction_log,
        embedder,
    };

    Ok(FloopEngine::new(ctx))
}

#[cfg(feature = "embeddings")]
fn build_embedder(config: &FloopConfig) -> Option<Arc<dyn floop_core::vector::EmbeddingProvider>> {
    match floop_core::vector::FastEmbedProvider::try_new(config.vector.clone()) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            tracing::warn!("embedding provider unavailable, active() will skip vector search: {e}");
            None
        }
    }
}

#[cfg(not(feature = "embeddings"))]
fn build_embedder(_config: &FloopConfig) -> Option<Arc<dyn floop_core::vector::EmbeddingProvider>> {
    None
}

#[tokio::main]
async fn main() {
    let data_dir = parse_args();
    init_logging();

    info!("floop-mcp {} starting", env!("CARGO_PKG_VERSION"));

    let engine = match build_engine(data_dir) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            error!("failed to initialize engine: {e}");
            std::process::exit(exit_code_for(&e));
        }
    };

    let server = McpServer::new(Arc::clone(&engine));
    let transport = StdioTransport::new();

    info!("listening on stdio");
    if let Err(e) = transport.run(server).await {
        error!("transport error: {e}");
        engine.shutdown();
        std::process::exit(4);
    }

    engine.shutdown();
    info!("floop-mcp shutting down");
}
