//! Correction — append-only audit entity recording a single learn event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::ContextSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub context: ContextSnapshot,
    pub agent_action: String,
    pub corrected_action: String,
    pub corrector: Option<String>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Correction {
    pub fn new(context: ContextSnapshot, agent_action: String, corrected_action: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            context,
            agent_action,
            corrected_action,
            corrector: None,
            processed: false,
            processed_at: None,
        }
    }

    pub fn mark_processed(&mut self) {
        self.processed = true;
        self.processed_at = Some(Utc::now());
    }
}

/// Input to the `learn` tool before context/id assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionInput {
    pub wrong: String,
    pub right: String,
    pub file: Option<String>,
    pub task: Option<String>,
    #[serde(default)]
    pub auto_merge: Option<bool>,
}
