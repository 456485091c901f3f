//! Session state & reinforcement: per-session injection records and the
//! reinforce/suppress decision for a new prompt (spec §4.9).

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::model::{BehaviorKind, BehaviorStats};
use crate::tiering::Tier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionRecord {
    pub tier: Tier,
    pub count: u32,
    pub last_prompt: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReinforceDecision {
    Reinforce,
    Suppress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinforcementResult {
    pub decision: ReinforceDecision,
    pub reason: &'static str,
}

fn tier_rank(tier: Tier) -> u8 {
    match tier {
        Tier::Full => 3,
        Tier::Summary => 2,
        Tier::NameOnly => 1,
        Tier::Omitted => 0,
    }
}

/// Decide reinforce/suppress for a behavior about to be injected at
/// `requested_tier`, given its prior record (if any) and feedback stats
/// (spec §4.9).
pub fn decide(
    record: Option<&InjectionRecord>,
    requested_tier: Tier,
    stats: &BehaviorStats,
    kind: BehaviorKind,
    config: &SessionConfig,
    now: DateTime<Utc>,
) -> ReinforcementResult {
    let Some(record) = record else {
        return ReinforcementResult {
            decision: ReinforceDecision::Reinforce,
            reason: "never_injected",
        };
    };

    if record.count > config.max_reinjections {
        return ReinforcementResult {
            decision: ReinforceDecision::Suppress,
            reason: "max_reinjections",
        };
    }

    if tier_rank(requested_tier) > tier_rank(record.tier) {
        return ReinforcementResult {
            decision: ReinforceDecision::Reinforce,
            reason: "upgrade",
        };
    }

    let total = stats.total_feedback();
    if total >= config.violation_min_total as u64 {
        if let Some(rate) = stats.positive_rate() {
            if rate < config.violation_max_positive_rate {
                return ReinforcementResult {
                    decision: ReinforceDecision::Reinforce,
                    reason: "violation_detected",
                };
            }
        }
    }

    let base = if kind == BehaviorKind::Constraint {
        (config.backoff_base_secs / 2).max(1)
    } else {
        config.backoff_base_secs
    };
    let backoff_secs = base * record.count as i64;
    let elapsed = (now - record.last_prompt).num_seconds();

    if elapsed < backoff_secs {
        ReinforcementResult {
            decision: ReinforceDecision::Suppress,
            reason: "suppressed",
        }
    } else {
        ReinforcementResult {
            decision: ReinforceDecision::Reinforce,
            reason: "backoff_expired",
        }
    }
}

/// In-memory session state: lives only for the duration of one client
/// session (spec §3 lifecycles).
#[derive(Default)]
pub struct SessionState {
    records: Mutex<HashMap<String, InjectionRecord>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_for(&self, behavior_id: &str) -> Option<InjectionRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).get(behavior_id).cloned()
    }

    pub fn note_injection(&self, behavior_id: &str, tier: Tier, now: DateTime<Utc>) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .entry(behavior_id.to_string())
            .and_modify(|r| {
                r.tier = tier;
                r.count += 1;
                r.last_prompt = now;
            })
            .or_insert(InjectionRecord {
                tier,
                count: 1,
                last_prompt: now,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_injected_reinforces() {
        let stats = BehaviorStats::default();
        let result = decide(None, Tier::Full, &stats, BehaviorKind::Directive, &SessionConfig::default(), Utc::now());
        assert_eq!(result.reason, "never_injected");
    }

    #[test]
    fn max_reinjections_suppresses() {
        let config = SessionConfig::default();
        let record = InjectionRecord {
            tier: Tier::Full,
            count: config.max_reinjections + 1,
            last_prompt: Utc::now(),
        };
        let stats = BehaviorStats::default();
        let result = decide(Some(&record), Tier::Full, &stats, BehaviorKind::Directive, &config, Utc::now());
        assert_eq!(result.reason, "max_reinjections");
    }

    #[test]
    fn upgrade_reinforces() {
        let config = SessionConfig::default();
        let record = InjectionRecord {
            tier: Tier::NameOnly,
            count: 1,
            last_prompt: Utc::now(),
        };
        let stats = BehaviorStats::default();
        let result = decide(Some(&record), Tier::Full, &stats, BehaviorKind::Directive, &config, Utc::now());
        assert_eq!(result.reason, "upgrade");
    }
}
