//! Corpus entity types
//!
//! The corpus is the generated, in-memory dataset: developers, commits, pull
//! requests, reviews, issues and the per-feature event streams. Entities are
//! created only by the generators; handlers project them into wire shapes.
//! Cross-entity links are ID-only back-references (a commit stores its PR
//! number, a review stores its PR id) so the store stays the single index.

use crate::types::seed::{ActivityLevel, Seniority};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of the seed fields the API needs per developer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperRecord {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub org: String,
    pub division: String,
    pub team: String,
    pub region: String,
    pub seniority: Seniority,
    pub activity_level: ActivityLevel,
    pub acceptance_rate: f64,
    pub chat_vs_code_ratio: f64,
}

/// A single commit with its AI line-kind decomposition.
///
/// Invariant: `total_lines_added == tab_lines_added + composer_lines_added +
/// non_ai_lines_added`, and symmetrically for deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// 40-hex commit hash
    pub commit_hash: String,
    pub user_id: String,
    pub user_email: String,
    pub repo_name: String,
    pub branch: String,
    pub is_primary_branch: bool,
    pub total_lines_added: u64,
    pub total_lines_deleted: u64,
    pub tab_lines_added: u64,
    pub tab_lines_deleted: u64,
    pub composer_lines_added: u64,
    pub composer_lines_deleted: u64,
    pub non_ai_lines_added: u64,
    pub non_ai_lines_deleted: u64,
    pub message: String,
    pub commit_ts: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Back-reference to the PR this commit landed in, if any
    pub pr_number: Option<u64>,
}

impl Commit {
    pub fn ai_lines_added(&self) -> u64 {
        self.tab_lines_added + self.composer_lines_added
    }

    pub fn ai_lines_deleted(&self) -> u64 {
        self.tab_lines_deleted + self.composer_lines_deleted
    }

    /// `(tab + composer) / total`, 0 when the commit added nothing
    pub fn ai_ratio(&self) -> f64 {
        if self.total_lines_added == 0 {
            0.0
        } else {
            self.ai_lines_added() as f64 / self.total_lines_added as f64
        }
    }
}

/// Pull request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

/// A pull request with its derived review-cycle metrics.
///
/// Keyed by `(repo_name, number)`; `id` is a separate store-wide monotonic
/// identifier that reviews point back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub repo_name: String,
    /// Per-repo monotonic number
    pub number: u64,
    pub author_user_id: String,
    pub author_email: String,
    pub title: String,
    pub state: PrState,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u32,
    /// Additions of the first commit in the session
    pub initial_additions: u64,
    pub ai_lines_added: u64,
    pub ai_lines_deleted: u64,
    pub non_ai_lines_added: u64,
    pub first_commit_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub first_review_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub coding_lead_time_hours: f64,
    pub pickup_time_hours: f64,
    pub review_lead_time_hours: f64,
    pub review_comments: u32,
    pub iterations: u32,
    /// Review comments per hundred changed lines
    pub review_density: f64,
    /// Lines changed after first review over `initial_additions`
    pub rework_ratio: f64,
    /// `(additions - initial_additions) / additions`
    pub scope_creep: f64,
    /// Fraction of added lines touching files younger than 30 days
    pub greenfield_index: f64,
    /// Fraction of this PR's lines still alive 30 days after merge
    pub survival_rate_30d: f64,
    pub commit_hashes: Vec<String>,
    pub ai_summary: String,
    pub is_reverted: bool,
    pub has_hotfix_followup: bool,
}

impl PullRequest {
    /// `(tab + composer) / total` across the whole PR
    pub fn ai_ratio(&self) -> f64 {
        if self.additions == 0 {
            0.0
        } else {
            self.ai_lines_added as f64 / self.additions as f64
        }
    }

    pub fn volume(&self) -> u64 {
        self.additions + self.deletions
    }

    /// Changed files per commit, a spread measure used by the research surface
    pub fn scatter(&self) -> f64 {
        if self.commit_hashes.is_empty() {
            0.0
        } else {
            self.changed_files as f64 / self.commit_hashes.len() as f64
        }
    }
}

/// Review verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
}

/// A single inline review comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A review submitted against a pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    /// Back-reference to `PullRequest::id`
    pub pr_id: u64,
    pub repo_name: String,
    pub pr_number: u64,
    pub reviewer_email: String,
    pub state: ReviewState,
    pub body: String,
    pub submitted_at: DateTime<Utc>,
    pub comments: Vec<ReviewComment>,
}

/// Issue lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// A repository issue, optionally linked to a PR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub repo_name: String,
    /// Per-repo monotonic number
    pub number: u64,
    pub title: String,
    pub author_email: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub linked_pr_number: Option<u64>,
}

/// How an AI interaction was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    TabShown,
    TabAccepted,
    Chat,
    CmdK,
    Composer,
    Agent,
    Bugbot,
}

/// Fields shared by every feature-event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub user_id: String,
    pub email: String,
    pub event_date: NaiveDate,
    pub event_timestamp: DateTime<Utc>,
}

/// Per-model usage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsageEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub model_name: String,
    pub usage_kind: UsageKind,
}

/// Client version report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientVersionEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub client_version: String,
}

/// Per-file-extension edit event with suggestion volumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileExtensionEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub file_extension: String,
    pub suggested_lines: u64,
    pub accepted_lines: u64,
}

/// MCP tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub server_name: String,
    pub tool_name: String,
}

/// Command palette usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub command_name: String,
}

/// Plan-mode session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub plan_steps: u32,
}

/// Ask-mode question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskModeEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub model_name: String,
}

/// Counts and aggregates over the corpus, reported by `/admin/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    pub developers: usize,
    pub repositories: usize,
    pub commits: usize,
    pub pull_requests: usize,
    pub open_prs: usize,
    pub merged_prs: usize,
    pub closed_prs: usize,
    pub reviews: usize,
    pub issues: usize,
    pub model_usage_events: usize,
    pub client_version_events: usize,
    pub file_extension_events: usize,
    pub mcp_events: usize,
    pub command_events: usize,
    pub plan_events: usize,
    pub ask_mode_events: usize,
}

impl CorpusStats {
    pub fn total_feature_events(&self) -> usize {
        self.model_usage_events
            + self.client_version_events
            + self.file_extension_events
            + self.mcp_events
            + self.command_events
            + self.plan_events
            + self.ask_mode_events
    }

    pub fn total_events(&self) -> usize {
        self.commits + self.pull_requests + self.reviews + self.issues + self.total_feature_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn commit_ai_ratio_handles_empty_commit() {
        let commit = Commit {
            commit_hash: "a".repeat(40),
            user_id: "user_001".to_string(),
            user_email: "a@example.com".to_string(),
            repo_name: "acme/api".to_string(),
            branch: "feature/x".to_string(),
            is_primary_branch: false,
            total_lines_added: 0,
            total_lines_deleted: 0,
            tab_lines_added: 0,
            tab_lines_deleted: 0,
            composer_lines_added: 0,
            composer_lines_deleted: 0,
            non_ai_lines_added: 0,
            non_ai_lines_deleted: 0,
            message: "Fix".to_string(),
            commit_ts: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
            pr_number: None,
        };
        assert_eq!(commit.ai_ratio(), 0.0);
    }

    #[test]
    fn pr_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PrState::Merged).unwrap(), "\"merged\"");
        assert_eq!(
            serde_json::to_string(&ReviewState::ChangesRequested).unwrap(),
            "\"changes_requested\""
        );
    }
}
