//! # Floop Core
//!
//! The retrieval-and-learning engine behind Floop, a per-developer memory
//! service for AI coding agents. A behavior graph (constraints, directives,
//! preferences, procedures, typed relations between them) is built from
//! corrections an agent receives, then surfaced back to the agent through a
//! context-driven activation/spreading/ranking pipeline, tiered into a
//! token-budgeted prompt.
//!
//! - [`model`] — the data model: behaviors, edges, context snapshots, corrections.
//! - [`store`] — the sqlite-backed graph store and its local/global composition.
//! - [`activation`] — seed generation from `when`-clause matching and conflict resolution.
//! - [`spreading`] — bounded BFS propagation across typed/weighted edges.
//! - [`ranking`] — PageRank and ACT-R base-level activation blending.
//! - [`hebbian`] — co-activation learning that creates/strengthens edges over time.
//! - [`vector`] — advisory embedding-based candidate search.
//! - [`learning`] — correction ingestion, deduplication, and merge.
//! - [`tiering`] — token-budget planning and multi-format rendering.
//! - [`session`] — reinforcement/backoff decisions for repeated injections.
//! - [`runtime`] — rate limiting, worker pool, debounce, path validation, audit, backup.
//! - [`config`] — the typed, environment-overlaid configuration object.
//! - [`engine`] — `FloopEngine`, the orchestrator wiring everything into the tool surface.

pub mod activation;
pub mod config;
pub mod engine;
pub mod error;
pub mod hebbian;
pub mod learning;
pub mod model;
pub mod ranking;
pub mod runtime;
pub mod session;
pub mod spreading;
pub mod store;
pub mod tiering;
pub mod vector;

pub use config::FloopConfig;
pub use engine::{EngineContext, FloopEngine};
pub use error::{EngineError, EngineResult, RuntimeError, StoreError};
pub use model::{Behavior, BehaviorKind, Correction, CorrectionInput, Edge, EdgeKind};
pub use store::{GraphStore, MultiStore, Scope};
