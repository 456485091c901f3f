//! Context snapshot — request-scoped, immutable after build (spec §3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const CI_ENV_VARS: &[(&str, &str)] = &[
    ("GITHUB_ACTIONS", "github-actions"),
    ("GITLAB_CI", "gitlab-ci"),
    ("CIRCLECI", "circleci"),
    ("JENKINS_URL", "jenkins"),
    ("TRAVIS", "travis"),
    ("BUILDKITE", "buildkite"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub timestamp: DateTime<Utc>,
    pub file_path: Option<String>,
    pub file_language: Option<String>,
    pub file_ext: Option<String>,
    pub task: Option<String>,
    pub environment: String,
    pub repo_root: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub project_type: Option<String>,
    pub user: Option<String>,
    pub custom: HashMap<String, String>,
}

/// Builder inputs for a context snapshot; fields beyond `file`/`task` are
/// best-effort derived from the environment (spec §3: "environment
/// (overridden, then FLOOP_ENV, then auto-detected ..., else development)").
#[derive(Debug, Clone, Default)]
pub struct ContextBuildInput {
    pub file_path: Option<String>,
    pub task: Option<String>,
    pub environment_override: Option<String>,
    pub repo_root: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub project_type: Option<String>,
    pub user: Option<String>,
    pub custom: HashMap<String, String>,
}

impl ContextSnapshot {
    pub fn build(input: ContextBuildInput) -> Self {
        let (file_language, file_ext) = input
            .file_path
            .as_deref()
            .map(infer_language)
            .unwrap_or((None, None));

        let environment = input
            .environment_override
            .or_else(|| std::env::var("FLOOP_ENV").ok())
            .or_else(detect_ci_environment)
            .unwrap_or_else(|| "development".to_string());

        Self {
            timestamp: Utc::now(),
            file_path: input.file_path,
            file_language,
            file_ext,
            task: input.task,
            environment,
            repo_root: input.repo_root,
            repo: input.repo,
            branch: input.branch,
            project_type: input.project_type,
            user: input.user,
            custom: input.custom,
        }
    }

    /// Flatten the context's known fields into field→value pairs, the shape
    /// the evaluator's `when` matching operates over.
    pub fn as_fields(&self) -> HashMap<String, String> {
        let mut fields = self.custom.clone();
        fields.insert("environment".to_string(), self.environment.clone());
        if let Some(v) = &self.file_path {
            fields.insert("file_path".to_string(), v.clone());
        }
        if let Some(v) = &self.file_language {
            fields.insert("language".to_string(), v.clone());
            fields.insert("file_language".to_string(), v.clone());
        }
        if let Some(v) = &self.file_ext {
            fields.insert("file_ext".to_string(), v.clone());
        }
        if let Some(v) = &self.task {
            fields.insert("task".to_string(), v.clone());
        }
        if let Some(v) = &self.repo {
            fields.insert("repo".to_string(), v.clone());
        }
        if let Some(v) = &self.branch {
            fields.insert("branch".to_string(), v.clone());
        }
        if let Some(v) = &self.project_type {
            fields.insert("project_type".to_string(), v.clone());
        }
        if let Some(v) = &self.user {
            fields.insert("user".to_string(), v.clone());
        }
        fields
    }
}

fn detect_ci_environment() -> Option<String> {
    CI_ENV_VARS
        .iter()
        .find(|(var, _)| std::env::var(var).is_ok())
        .map(|(_, name)| name.to_string())
}

fn infer_language(path: &str) -> (Option<String>, Option<String>) {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let lang = ext.as_deref().map(|e| match e {
        "rs" => "rust",
        "go" => "go",
        "py" => "python",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" => "javascript",
        "java" => "java",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        other => other,
    }.to_string());
    (lang, ext)
}

/// Marker files used to infer `project_type`, cheapest-first.
pub const PROJECT_TYPE_MARKERS: &[(&str, &str)] = &[
    ("Cargo.toml", "rust"),
    ("go.mod", "go"),
    ("package.json", "node"),
    ("pyproject.toml", "python"),
    ("requirements.txt", "python"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("Gemfile", "ruby"),
];

pub fn infer_project_type(repo_root: &std::path::Path) -> Option<String> {
    PROJECT_TYPE_MARKERS
        .iter()
        .find(|(marker, _)| repo_root.join(marker).exists())
        .map(|(_, kind)| kind.to_string())
}
