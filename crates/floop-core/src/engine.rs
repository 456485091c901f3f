//! `FloopEngine` — the orchestrator that wires every module into the ten
//! tool operations of the external interface (spec §2, §6).
//!
//! A tool handler in the protocol layer builds one `FloopEngine` per process
//! and calls its methods directly; everything below is synchronous except
//! the fire-and-forget bookkeeping dispatched onto the worker pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::activation::{self, Seed};
use crate::config::FloopConfig;
use crate::error::{EngineError, EngineResult, RuntimeError};
use crate::hebbian;
use crate::learning::{self, CorrectionLog, DedupDecision};
use crate::model::{
    Behavior, BehaviorKind, ContextBuildInput, ContextSnapshot, CorrectionInput, Edge, EdgeKind, NodeFilter,
};
use crate::ranking::{self, PageRankCache};
use crate::runtime::backup::{self, BackupVersion, RestoreMode};
use crate::runtime::{AuditLog, RateLimiters, WorkerPool};
use crate::session::{self, SessionState};
use crate::spreading::{self};
use crate::store::{GraphStore, MultiStore, Scope, ValidationReport};
use crate::tiering::{self, RenderFormat};
use crate::vector::EmbeddingProvider;

/// Everything a `FloopEngine` needs beyond the two graph stores; built once
/// at process start (spec §6 "Process & CLI shape").
pub struct EngineContext {
    pub store: MultiStore,
    pub config: FloopConfig,
    pub local_root: PathBuf,
    pub global_root: PathBuf,
    pub local_audit: AuditLog,
    pub global_audit: AuditLog,
    pub correction_log: CorrectionLog,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
}

pub struct FloopEngine {
    ctx: EngineContext,
    session: SessionState,
    pagerank: PageRankCache,
    rate_limiters: RateLimiters,
    workers: WorkerPool,
}

impl FloopEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let rate_limiters = RateLimiters::new(&ctx.config.runtime);
        let workers = WorkerPool::new(ctx.config.runtime.max_background_workers);
        let pagerank = PageRankCache::new(Duration::from_millis(ctx.config.ranking.debounce_window_ms));
        Self {
            ctx,
            session: SessionState::new(),
            pagerank,
            rate_limiters,
            workers,
        }
    }

    pub fn store(&self) -> &MultiStore {
        &self.ctx.store
    }

    pub fn config(&self) -> &FloopConfig {
        &self.ctx.config
    }

    fn audit_for(&self, scope: Scope) -> &AuditLog {
        match scope {
            Scope::Local => &self.ctx.local_audit,
            Scope::Global => &self.ctx.global_audit,
        }
    }

    fn rate_limit(&self, tool: &str) -> EngineResult<()> {
        self.rate_limiters.acquire(tool).map_err(EngineError::from)
    }

    fn build_context(&self, file: Option<String>, task: Option<String>) -> ContextSnapshot {
        let repo_root = self.ctx.local_root.clone();
        let project_type = crate::model::infer_project_type(&repo_root);
        ContextSnapshot::build(ContextBuildInput {
            file_path: file,
            task,
            repo_root: Some(repo_root.display().to_string()),
            project_type,
            ..Default::default()
        })
    }

    /// Refresh the PageRank cache, coalescing a burst of mutations into a
    /// single recompute by gating on the debounce window (spec §4.4, §4.10).
    fn schedule_pagerank_refresh(&self) {
        if !self.pagerank.should_refresh_now() {
            return;
        }
        if let Err(e) = self.refresh_pagerank_sync() {
            tracing::warn!("pagerank refresh failed: {e}");
        }
    }

    fn refresh_pagerank_sync(&self) -> EngineResult<()> {
        let mut edges = self.ctx.store.local.all_edges()?;
        edges.extend(self.ctx.store.global.all_edges()?);
        let mut ids = self.ctx.store.local.all_node_ids()?;
        ids.extend(self.ctx.store.global.all_node_ids()?);
        let scores = ranking::pagerank(&ids, &edges, &self.ctx.config.ranking);
        self.pagerank.replace(scores);
        Ok(())
    }

    // ---- active ---------------------------------------------------------

    pub fn active(&self, input: ActiveInput) -> EngineResult<ActiveOutput> {
        self.rate_limit("active")?;
        let start = std::time::Instant::now();

        let context = self.build_context(input.file, input.task);
        let local_behaviors = self.ctx.store.local.query_nodes(&NodeFilter::default())?;
        let mut scope_of: HashMap<String, Scope> =
            local_behaviors.iter().map(|b| (b.id.clone(), Scope::Local)).collect();
        let mut behaviors: Vec<Behavior> = local_behaviors
            .into_iter()
            .filter(|b| b.kind != BehaviorKind::ForgottenBehavior)
            .collect();
        for b in self.ctx.store.global.query_nodes(&NodeFilter::default())? {
            if scope_of.contains_key(&b.id) {
                continue;
            }
            scope_of.insert(b.id.clone(), Scope::Global);
            if b.kind != BehaviorKind::ForgottenBehavior {
                behaviors.push(b);
            }
        }

        let matches = activation::evaluate_all(&behaviors, &context);
        let seeds = activation::seed_from_matches(&matches, &self.ctx.config.seed_activation);
        let mut seeds = activation::resolve_conflicts(seeds, &behaviors);
        self.augment_seeds_with_vector_search(&mut seeds, &behaviors, &context);

        let edges = self.ctx.store.all_edges_union()?;
        let spread = spreading::spread(&seeds, &edges, &behaviors, &self.ctx.config.spreading);

        let seed_ids: std::collections::HashSet<String> = seeds.iter().map(|s| s.behavior_id.clone()).collect();
        let by_id: HashMap<String, Behavior> = behaviors.into_iter().map(|b| (b.id.clone(), b)).collect();

        let lambda = self.ctx.config.ranking.pagerank_blend;
        let mut scored: Vec<(Behavior, f64)> = Vec::new();
        let mut distances: HashMap<String, usize> = HashMap::new();
        for result in &spread {
            let Some(b) = by_id.get(&result.behavior_id) else { continue };
            let pr = self.pagerank.get(&result.behavior_id);
            let blended = ranking::blend_pagerank(result.activation, pr, lambda);
            scored.push((b.clone(), blended));
            distances.insert(result.behavior_id.clone(), result.distance);
        }

        let format = parse_render_format(input.format.as_deref());
        let plan = tiering::plan(&scored, self.active_token_budget(&input), &self.ctx.config.tiering);
        let rendered = tiering::render(&plan, &by_id, format);

        let now = Utc::now();
        let mut active_views = Vec::new();
        for planned in plan.full.iter().chain(plan.summarized.iter()).chain(plan.name_only.iter()) {
            let Some(b) = by_id.get(&planned.behavior_id) else { continue };
            let tier = planned.tier;
            let record = self.session.record_for(&b.id);
            let decision = session::decide(record.as_ref(), tier, &b.stats, b.kind, &self.ctx.config.session, now);
            if decision.decision == session::ReinforceDecision::Suppress {
                continue;
            }
            self.session.note_injection(&b.id, tier, now);
            let scope = scope_of.get(&b.id).copied().unwrap_or(Scope::Local);
            let _ = self.ctx.store.record_activation_hit(&b.id, scope);
            active_views.push(ActiveBehaviorView {
                id: b.id.clone(),
                name: b.name.clone(),
                kind: b.kind.as_str().to_string(),
                tier,
                activation: planned.score,
                distance: distances.get(&b.id).copied().unwrap_or(0),
            });
        }

        let hit_ids: Vec<String> = active_views.iter().map(|v| v.id.clone()).collect();
        if !hit_ids.is_empty() {
            let _ = self.ctx.store.touch_edges(&hit_ids);
        }

        self.schedule_hebbian_update(&scored, &seed_ids, &self.ctx.config.hebbian);
        self.schedule_pagerank_refresh();

        self.audit_for(Scope::Local).log_invocation(
            "active",
            "local",
            start.elapsed().as_millis() as u64,
            "ok",
            None,
            &serde_json::json!({"file": context.file_path, "task": context.task}),
        );

        Ok(ActiveOutput {
            context,
            count: active_views.len(),
            active: active_views,
            rendered,
            token_stats: TokenStats {
                token_budget: plan.token_budget,
                total_tokens: plan.total_tokens,
                full: plan.full.len(),
                summarized: plan.summarized.len(),
                name_only: plan.name_only.len(),
                omitted: plan.omitted.len(),
            },
        })
    }

    /// Advisory additional candidate source (spec §4.6): behaviors the
    /// embedder ranks close to the query text become low-specificity seeds
    /// even when no `when` clause matched the context. Never fatal — a
    /// missing or failing embedder just leaves `seeds` untouched.
    fn augment_seeds_with_vector_search(&self, seeds: &mut Vec<Seed>, behaviors: &[Behavior], context: &ContextSnapshot) {
        let Some(embedder) = &self.ctx.embedder else { return };
        let query_text = match (&context.task, &context.file_path) {
            (Some(task), _) => task.clone(),
            (None, Some(file)) => file.clone(),
            (None, None) => return,
        };
        let prefixed = crate::vector::query_prefixed(&self.ctx.config.vector, &query_text);
        let query_vector = match embedder.embed_query(&prefixed) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("vector search unavailable: {e}");
                return;
            }
        };

        let by_id: HashMap<&str, &Behavior> = behaviors.iter().map(|b| (b.id.as_str(), b)).collect();
        let seeded: std::collections::HashSet<String> = seeds.iter().map(|s| s.behavior_id.clone()).collect();
        let model = embedder.model_name();
        for store in [self.ctx.store.local.as_ref(), self.ctx.store.global.as_ref()] {
            let Ok(hits) = crate::vector::search(store, &query_vector, &self.ctx.config.vector, model) else { continue };
            for hit in hits {
                if hit.unembedded || hit.similarity <= 0.0 || seeded.contains(&hit.behavior_id) {
                    continue;
                }
                let Some(b) = by_id.get(hit.behavior_id.as_str()) else { continue };
                seeds.push(Seed {
                    behavior_id: hit.behavior_id,
                    activation: hit.similarity as f64,
                    specificity: 0,
                    priority: b.priority,
                    confidence: b.confidence,
                });
            }
        }
    }

    fn active_token_budget(&self, input: &ActiveInput) -> usize {
        input.token_budget.unwrap_or(2000)
    }

    fn schedule_hebbian_update(&self, scored: &[(Behavior, f64)], seed_ids: &std::collections::HashSet<String>, config: &crate::config::HebbianConfig) {
        let activations: HashMap<String, f64> = scored.iter().map(|(b, a)| (b.id.clone(), *a)).collect();
        let pairs = hebbian::extract_pairs(&activations, seed_ids, config.activation_threshold);
        if pairs.is_empty() {
            return;
        }
        let local = Arc::clone(&self.ctx.store.local);
        let config = config.clone();
        self.workers.spawn(async move {
            if let Err(e) = hebbian::process_pairs(local.as_ref(), &pairs, &config) {
                tracing::warn!("hebbian update failed: {e}");
            }
        });
    }

    // ---- learn ------------------------------------------------------------

    pub fn learn(&self, input: CorrectionInput, scope: Scope) -> EngineResult<LearnOutput> {
        self.rate_limit("learn")?;
        let start = std::time::Instant::now();

        let context = self.build_context(input.file.clone(), input.task.clone());
        let candidate = learning::build_candidate(&input, &self.ctx.config.learning);

        // `auto_merge` overrides the configured setting for this call only
        // (spec §6 `learn { ..., auto_merge? }`); it never mutates `self.ctx.config`.
        let mut learning_config = self.ctx.config.learning.clone();
        if let Some(auto_merge) = input.auto_merge {
            learning_config.auto_merge_enabled = auto_merge;
        }

        let store = self.ctx.store.scope(scope);
        let existing = store.query_nodes(&NodeFilter::default())?;
        let existing_refs: Vec<(&str, &str)> =
            existing.iter().map(|b| (b.id.as_str(), b.content.canonical.as_str())).collect();
        let dedup_candidates =
            learning::find_dedup_candidates(&candidate.content.canonical, &existing_refs, &learning_config);
        let best = dedup_candidates.iter().max_by(|a, b| a.similarity.partial_cmp(&b.similarity).unwrap());
        let decision = learning::decide(best, &learning_config);

        let correction = learning::build_correction(&input, context.clone());
        if let Err(e) = self.ctx.correction_log.append(&correction) {
            tracing::warn!("correction log append failed: {e}");
        }

        let output = match &decision {
            DedupDecision::Merge { into_id, similarity } => {
                let mut existing_behavior = store.get_node(into_id)?;
                let edge = learning::merge_into(&mut existing_behavior, &candidate);
                store.update_node(&existing_behavior)?;
                // The candidate itself is never surfaced by `active` — store it as
                // already-forgotten so the `learned-from` edge's source resolves to a
                // real node and the id stays around for future dedup memory (spec §3
                // lifecycle: "forget... keeps the id for dedup memory").
                let mut forgotten_candidate = candidate.clone();
                forgotten_candidate.kind = BehaviorKind::ForgottenBehavior;
                store.add_node(forgotten_candidate)?;
                let _ = store.add_edge(edge);
                LearnOutput {
                    correction_id: correction.id,
                    behavior_id: existing_behavior.id,
                    scope,
                    auto_accepted: true,
                    confidence: existing_behavior.confidence,
                    requires_review: false,
                    review_reasons: Vec::new(),
                    merged_into_id: Some(into_id.clone()),
                    merge_similarity: Some(*similarity),
                    message: format!("merged into existing behavior (similarity {similarity:.2})"),
                }
            }
            DedupDecision::AutoAccept { similarity } => {
                let stored = store.add_node(candidate)?;
                LearnOutput {
                    correction_id: correction.id,
                    behavior_id: stored.id,
                    scope,
                    auto_accepted: true,
                    confidence: stored.confidence,
                    requires_review: false,
                    review_reasons: Vec::new(),
                    merged_into_id: None,
                    merge_similarity: Some(*similarity),
                    message: "accepted as a new behavior".to_string(),
                }
            }
            DedupDecision::RequiresReview { similarity, reasons } => {
                let stored = store.add_node(candidate)?;
                LearnOutput {
                    correction_id: correction.id,
                    behavior_id: stored.id,
                    scope,
                    auto_accepted: false,
                    confidence: stored.confidence,
                    requires_review: true,
                    review_reasons: reasons.clone(),
                    merged_into_id: None,
                    merge_similarity: (*similarity > 0.0).then_some(*similarity),
                    message: "stored, pending review".to_string(),
                }
            }
        };

        store.sync()?;
        self.schedule_pagerank_refresh();
        self.schedule_auto_backup(scope);

        self.audit_for(scope).log_invocation(
            "learn",
            scope.as_str(),
            start.elapsed().as_millis() as u64,
            "ok",
            None,
            &serde_json::json!({"wrong": input.wrong, "right": input.right, "file": input.file, "task": input.task}),
        );

        Ok(output)
    }

    fn schedule_auto_backup(&self, scope: Scope) {
        let root = match scope {
            Scope::Local => self.ctx.local_root.clone(),
            Scope::Global => self.ctx.global_root.clone(),
        };
        let store = Arc::clone(self.ctx.store.scope(scope));
        let retention = self.ctx.config.runtime.backup_retention;
        self.workers.spawn(async move {
            let dir = root.join(".floop").join("backups");
            let path = backup::default_backup_path(&dir, BackupVersion::V2);
            if let Err(e) = backup::backup(store.as_ref(), &path, BackupVersion::V2) {
                tracing::warn!("auto-backup failed: {e}");
                return;
            }
            if let Err(e) = backup::apply_retention(&dir, retention) {
                tracing::warn!("backup retention pruning failed: {e}");
            }
        });
    }

    // ---- list ---------------------------------------------------------

    pub fn list(&self, input: ListInput) -> EngineResult<ListOutput> {
        self.rate_limit("list")?;
        if input.corrections {
            let all = self.ctx.correction_log.read_all().map_err(|e| {
                EngineError::Store(crate::error::StoreError::BackendError(e.to_string()))
            })?;
            let count = all.len();
            return Ok(ListOutput {
                behaviors: Vec::new(),
                corrections: all,
                count,
            });
        }

        let filter = NodeFilter {
            kind: input.kind.as_deref().and_then(|k| k.parse().ok()),
            tag: input.tag,
            ids: None,
        };
        let behaviors: Vec<Behavior> = self
            .ctx
            .store
            .query_nodes_union(&filter)?
            .into_iter()
            .filter(|b| b.kind != BehaviorKind::ForgottenBehavior)
            .collect();
        let count = behaviors.len();
        Ok(ListOutput {
            behaviors,
            corrections: Vec::new(),
            count,
        })
    }

    // ---- deduplicate ----------------------------------------------------

    pub fn deduplicate(&self, input: DeduplicateInput) -> EngineResult<DeduplicateOutput> {
        self.rate_limit("deduplicate")?;
        let scope = input.scope.unwrap_or(Scope::Local);
        let store = self.ctx.store.scope(scope);
        let mut behaviors = store.query_nodes(&NodeFilter::default())?;
        // Oldest first, so a merge always keeps the earlier-created id.
        behaviors.sort_by_key(|b| b.provenance.created_at);

        let mut config = self.ctx.config.learning.clone();
        if let Some(threshold) = input.threshold {
            config.auto_merge_threshold = threshold;
        }

        let mut results = Vec::new();
        let mut merged = 0usize;
        let mut already_merged: std::collections::HashSet<String> = std::collections::HashSet::new();

        for i in 0..behaviors.len() {
            if already_merged.contains(&behaviors[i].id) {
                continue;
            }
            for j in (i + 1)..behaviors.len() {
                if already_merged.contains(&behaviors[j].id) {
                    continue;
                }
                let sim = learning::similarity(&behaviors[i].content.canonical, &behaviors[j].content.canonical, None);
                if sim < config.dedup_candidate_threshold {
                    continue;
                }
                let candidate = learning::DedupCandidate {
                    behavior_id: behaviors[j].id.clone(),
                    similarity: sim,
                };
                let decision = learning::decide(Some(&candidate), &config);
                let will_merge = matches!(decision, DedupDecision::Merge { .. });

                if will_merge && !input.dry_run {
                    let mut keep = store.get_node(&behaviors[i].id)?;
                    let edge = learning::merge_into(&mut keep, &behaviors[j]);
                    store.update_node(&keep)?;
                    let _ = store.add_edge(edge);
                    store.forget_node(&behaviors[j].id)?;
                    already_merged.insert(behaviors[j].id.clone());
                    merged += 1;
                }

                results.push(DuplicatePair {
                    behavior_a: behaviors[i].id.clone(),
                    behavior_b: behaviors[j].id.clone(),
                    similarity: sim,
                    merged: will_merge && !input.dry_run,
                });
            }
        }

        if merged > 0 {
            store.sync()?;
            self.schedule_pagerank_refresh();
        }

        Ok(DeduplicateOutput {
            duplicates_found: results.len(),
            merged,
            dry_run: input.dry_run,
            results,
        })
    }

    // ---- connect --------------------------------------------------------

    pub fn connect(&self, input: ConnectInput) -> EngineResult<Edge> {
        self.rate_limit("connect")?;
        let kind: EdgeKind = input
            .kind
            .parse()
            .map_err(|_| EngineError::InvalidArgument(format!("unknown edge kind: {}", input.kind)))?;
        if !EdgeKind::public_kinds().contains(&kind) {
            return Err(EngineError::InvalidArgument(format!("{} is not a publicly creatable edge kind", input.kind)));
        }
        if input.source == input.target {
            return Err(EngineError::InvalidArgument("source and target must differ".to_string()));
        }

        let scope = input.scope.unwrap_or(Scope::Local);
        let store = self.ctx.store.scope(scope);
        let weight = input.weight.unwrap_or(0.8);
        let edge = Edge::new(input.source.clone(), input.target.clone(), kind, weight);
        let created = store.add_edge(edge)?;

        if input.bidirectional {
            let reverse = Edge::new(input.target, input.source, kind, weight);
            let _ = store.add_edge(reverse);
        }

        store.sync()?;
        self.schedule_pagerank_refresh();
        Ok(created)
    }

    // ---- validate ---------------------------------------------------------

    pub fn validate(&self) -> EngineResult<ValidationReport> {
        self.rate_limit("validate")?;
        Ok(self.ctx.store.validate_union()?)
    }

    // ---- backup / restore -------------------------------------------------

    pub fn backup(&self, input: BackupInput) -> EngineResult<backup::BackupSummary> {
        self.rate_limit("backup")?;
        let scope = input.scope.unwrap_or(Scope::Local);
        let root = match scope {
            Scope::Local => &self.ctx.local_root,
            Scope::Global => &self.ctx.global_root,
        };
        let allow_list = crate::runtime::path_validate::default_allow_list(Some(root));
        let dir = root.join(".floop").join("backups");

        let path = match input.output_path {
            Some(raw) => crate::runtime::validate_path(&raw, &allow_list)?,
            None => backup::default_backup_path(&dir, BackupVersion::V2),
        };

        let store = self.ctx.store.scope(scope);
        let summary = backup::backup(store.as_ref(), &path, BackupVersion::V2)?;
        let _ = backup::apply_retention(&dir, self.ctx.config.runtime.backup_retention);
        Ok(summary)
    }

    pub fn restore(&self, input: RestoreInput) -> EngineResult<backup::RestoreSummary> {
        self.rate_limit("restore")?;
        let scope = input.scope.unwrap_or(Scope::Local);
        let root = match scope {
            Scope::Local => &self.ctx.local_root,
            Scope::Global => &self.ctx.global_root,
        };
        let allow_list = crate::runtime::path_validate::default_allow_list(Some(root));
        let path = crate::runtime::validate_path(&input.input_path, &allow_list)?;

        let mode: RestoreMode = input
            .mode
            .as_deref()
            .unwrap_or("merge")
            .parse()
            .map_err(EngineError::InvalidArgument)?;

        let store = self.ctx.store.scope(scope);
        let summary = backup::restore(store.as_ref(), &path, mode)?;
        store.sync()?;
        self.schedule_pagerank_refresh();
        Ok(summary)
    }

    // ---- feedback -----------------------------------------------------

    pub fn feedback(&self, input: FeedbackInput) -> EngineResult<()> {
        self.rate_limit("feedback")?;
        let (_, scope) = self.ctx.store.get_node(&input.behavior_id)?;
        let store = self.ctx.store.scope(scope);
        match input.signal {
            FeedbackSignal::Confirmed => store.record_confirmed(&input.behavior_id)?,
            FeedbackSignal::Overridden => store.record_overridden(&input.behavior_id)?,
        }
        Ok(())
    }

    // ---- graph (raw export; rendering is a protocol-layer concern) -----

    pub fn graph_export(&self) -> EngineResult<(Vec<Behavior>, Vec<Edge>)> {
        self.rate_limit("graph")?;
        let mut nodes = self.ctx.store.local.export_all()?;
        let global = self.ctx.store.global.export_all()?;
        let seen: std::collections::HashSet<String> = nodes.0.iter().map(|n| n.id.clone()).collect();
        nodes.0.extend(global.0.into_iter().filter(|n| !seen.contains(&n.id)));
        nodes.1.extend(global.1);
        Ok(nodes)
    }

    pub fn ensure_pagerank_warm(&self) -> EngineResult<()> {
        self.refresh_pagerank_sync()
    }

    pub fn shutdown(&self) {
        self.workers.shutdown();
        let _ = self.ctx.store.sync_all();
        let _ = self.ctx.store.close();
    }
}

// ---- tool input/output types ------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveInput {
    pub file: Option<String>,
    pub task: Option<String>,
    pub token_budget: Option<usize>,
    /// `"markdown"` (default) | `"xml"` | `"plain"` (spec §6).
    pub format: Option<String>,
}

fn parse_render_format(raw: Option<&str>) -> RenderFormat {
    match raw {
        Some("xml") => RenderFormat::Xml,
        Some("plain") => RenderFormat::Plain,
        _ => RenderFormat::Markdown,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveBehaviorView {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub tier: tiering::Tier,
    pub activation: f64,
    pub distance: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenStats {
    pub token_budget: usize,
    pub total_tokens: usize,
    pub full: usize,
    pub summarized: usize,
    pub name_only: usize,
    pub omitted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveOutput {
    pub context: ContextSnapshot,
    pub active: Vec<ActiveBehaviorView>,
    pub count: usize,
    pub rendered: String,
    pub token_stats: TokenStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearnOutput {
    pub correction_id: String,
    pub behavior_id: String,
    pub scope: Scope,
    pub auto_accepted: bool,
    pub confidence: f64,
    pub requires_review: bool,
    pub review_reasons: Vec<String>,
    pub merged_into_id: Option<String>,
    pub merge_similarity: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListInput {
    pub kind: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub corrections: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListOutput {
    pub behaviors: Vec<Behavior>,
    pub corrections: Vec<crate::model::Correction>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeduplicateInput {
    pub scope: Option<Scope>,
    pub threshold: Option<f64>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePair {
    pub behavior_a: String,
    pub behavior_b: String,
    pub similarity: f64,
    pub merged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeduplicateOutput {
    pub duplicates_found: usize,
    pub merged: usize,
    pub dry_run: bool,
    pub results: Vec<DuplicatePair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectInput {
    pub source: String,
    pub target: String,
    pub kind: String,
    pub weight: Option<f64>,
    #[serde(default)]
    pub bidirectional: bool,
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupInput {
    pub output_path: Option<String>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestoreInput {
    pub input_path: String,
    pub mode: Option<String>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignal {
    Confirmed,
    Overridden,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    pub behavior_id: String,
    pub signal: FeedbackSignal,
}

pub fn resolve_local_root(start: &Path) -> PathBuf {
    let mut dir = start;
    loop {
        if dir.join(".git").exists() {
            return dir.to_path_buf();
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return start.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteGraphStore;
    use tempfile::TempDir;

    fn test_engine(dir: &TempDir) -> FloopEngine {
        let local = Arc::new(SqliteGraphStore::open_in_memory().unwrap());
        let global = Arc::new(SqliteGraphStore::open_in_memory().unwrap());
        let store = MultiStore::new(local, global);
        let local_audit = AuditLog::open(&dir.path().join("local-audit.jsonl")).unwrap();
        let global_audit = AuditLog::open(&dir.path().join("global-audit.jsonl")).unwrap();
        let correction_log = CorrectionLog::open(&dir.path().join("corrections.jsonl")).unwrap();
        let ctx = EngineContext {
            store,
            config: FloopConfig::default(),
            local_root: dir.path().to_path_buf(),
            global_root: dir.path().to_path_buf(),
            local_audit,
            global_audit,
            correction_log,
            embedder: None,
        };
        FloopEngine::new(ctx)
    }

    #[test]
    fn learn_then_active_surfaces_the_new_behavior() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);

        let learn_result = engine
            .learn(
                CorrectionInput {
                    wrong: "used println for logging".to_string(),
                    right: "Never use println for logging, always use structured logging".to_string(),
                    file: None,
                    task: None,
                    auto_merge: None,
                },
                Scope::Local,
            )
            .unwrap();
        assert!(!learn_result.behavior_id.is_empty());

        let active = engine.active(ActiveInput::default()).unwrap();
        assert!(active.active.iter().any(|b| b.id == learn_result.behavior_id));
    }

    #[test]
    fn connect_rejects_self_edges() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);
        let err = engine.connect(ConnectInput {
            source: "a".to_string(),
            target: "a".to_string(),
            kind: "requires".to_string(),
            weight: None,
            bidirectional: false,
            scope: None,
        });
        assert!(err.is_err());
    }

    #[test]
    fn deduplicate_dry_run_does_not_mutate() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);
        engine
            .learn(
                CorrectionInput {
                    wrong: "x".to_string(),
                    right: "always use structured logging for output".to_string(),
                    file: None,
                    task: None,
                    auto_merge: None,
                },
                Scope::Local,
            )
            .unwrap();
        engine
            .learn(
                CorrectionInput {
                    wrong: "y".to_string(),
                    right: "always use structured logging for output".to_string(),
                    file: None,
                    task: None,
                    auto_merge: None,
                },
                Scope::Local,
            )
            .unwrap();

        let result = engine
            .deduplicate(DeduplicateInput {
                scope: Some(Scope::Local),
                threshold: None,
                dry_run: true,
            })
            .unwrap();
        assert_eq!(result.merged, 0);
    }
}
