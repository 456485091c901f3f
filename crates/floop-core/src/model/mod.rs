//! Data model: behaviors, edges, context snapshots, corrections (spec §3).

pub mod behavior;
pub mod context;
pub mod correction;
pub mod edge;

pub use behavior::{Behavior, BehaviorContent, BehaviorKind, BehaviorStats, NodeFilter, Provenance, SourceType};
pub use context::{ContextBuildInput, ContextSnapshot};
pub use correction::{Correction, CorrectionInput};
pub use edge::{Direction, Edge, EdgeKind};
