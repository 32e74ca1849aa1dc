//! Wire types for the HTTP surface
//!
//! Two field-naming families live side by side: the analytics family uses
//! camelCase keys, the source-host family uses snake_case keys. Timestamps
//! are ISO-8601 UTC with a `Z` suffix, dates are `YYYY-MM-DD`. The research
//! surface reuses the snake_case column names fixed by the dataset schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::types::corpus::{IssueState, PrState, ReviewState};
use crate::types::seed::SeedSummary;

/// Shared error body: `{"error": "<human message>"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Analytics family (camelCase)
// ============================================================================

/// Standard paginated envelope for the analytics family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

/// `{id, email}` pair letting clients resolve either identifier direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByUserParams {
    pub metric: String,
}

/// By-user envelope: `data` is keyed by email, lexicographically ordered,
/// and paged by user rather than by row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByUserResponse<T> {
    pub data: BTreeMap<String, Vec<T>>,
    pub total_users: usize,
    pub user_mappings: Vec<UserMapping>,
    pub pagination: PaginationMeta,
    pub params: ByUserParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMembersResponse {
    pub team_members: Vec<TeamMember>,
}

/// One row of `/analytics/ai-code/commits`; also the CSV record shape, so the
/// serde rename doubles as the camelCase CSV header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCodeCommitRow {
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
    pub commit_ts: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One row of `/analytics/ai-code/changes`: per user-day line aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCodeChangeRow {
    pub date: NaiveDate,
    pub user_id: String,
    pub user_email: String,
    pub commits: u64,
    pub total_lines_added: u64,
    pub total_lines_deleted: u64,
    pub tab_lines_added: u64,
    pub composer_lines_added: u64,
    pub non_ai_lines_added: u64,
    pub ai_ratio: f64,
}

/// Per-day suggested/accepted line volumes (agent edits, tabs)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyEditsRow {
    pub date: NaiveDate,
    pub suggested_lines: u64,
    pub accepted_lines: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DauRow {
    pub date: NaiveDate,
    pub active_users: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsageRow {
    pub date: NaiveDate,
    pub model: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVersionRow {
    pub date: NaiveDate,
    pub version: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileExtensionRow {
    pub date: NaiveDate,
    pub extension: String,
    pub suggested_lines: u64,
    pub accepted_lines: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpUsageRow {
    pub date: NaiveDate,
    pub server: String,
    pub tool: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandUsageRow {
    pub date: NaiveDate,
    pub command: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUsageRow {
    pub date: NaiveDate,
    pub plans_created: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskModeRow {
    pub date: NaiveDate,
    pub asks: u64,
}

/// One row of `/teams/daily-usage-data`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsageRow {
    pub date: NaiveDate,
    pub user_id: String,
    pub email: String,
    pub total_events: u64,
    pub tab_events: u64,
    pub composer_events: u64,
    pub chat_events: u64,
    pub agent_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub lines_added: u64,
}

/// Two parallel rankings: tab-based and composer-based
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub tab_leaderboard: Vec<LeaderboardEntry>,
    pub composer_leaderboard: Vec<LeaderboardEntry>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub developers: usize,
    pub events_generated: usize,
    pub uptime: String,
}

// ============================================================================
// Source-host family (snake_case)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub login: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDetail {
    pub full_name: String,
    pub owner: String,
    pub name: String,
    pub primary_language: String,
    pub service_type: String,
    pub default_branch: String,
    pub owning_teams: Vec<String>,
    pub age_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullDetail {
    pub id: u64,
    pub number: u64,
    pub state: PrState,
    pub title: String,
    pub user: UserRef,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u32,
    pub created_at: DateTime<Utc>,
    pub first_review_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub coding_lead_time_hours: f64,
    pub pickup_time_hours: f64,
    pub review_lead_time_hours: f64,
    pub review_comments: u32,
    pub iterations: u32,
    pub ai_summary: String,
    pub is_reverted: bool,
    pub has_hotfix_followup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    pub author: UserRef,
    pub message: String,
    pub branch: String,
    pub committed_at: DateTime<Utc>,
    pub stats: CommitStats,
    pub pr_number: Option<u64>,
}

/// Synthetic file row for `/pulls/{n}/files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullFileRow {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCommentRow {
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDetail {
    pub id: u64,
    pub user: UserRef,
    pub state: ReviewState,
    pub body: String,
    pub submitted_at: DateTime<Utc>,
    pub comments: Vec<ReviewCommentRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetail {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub user: UserRef,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub linked_pr_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorRow {
    pub email: String,
    pub user_id: String,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalAnalysis {
    pub repo_name: String,
    pub window_days: u32,
    pub merged_prs: usize,
    pub mean_survival_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertAnalysis {
    pub repo_name: String,
    pub merged_prs: usize,
    pub reverted_prs: usize,
    pub revert_rate: f64,
    pub reverted_pr_numbers: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotfixAnalysis {
    pub repo_name: String,
    pub merged_prs: usize,
    pub hotfix_followups: usize,
    pub hotfix_rate: f64,
    pub hotfix_pr_numbers: Vec<u64>,
}

// ============================================================================
// Research surface
// ============================================================================

/// Pre-joined wide-table projection of a merged PR. Column names are fixed by
/// the dataset schema and stay snake_case in both JSON and CSV renderings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchDatasetRow {
    pub pr_number: u64,
    pub author_email: String,
    pub repo_name: String,
    pub ai_lines_added: u64,
    pub ai_lines_deleted: u64,
    pub non_ai_lines_added: u64,
    pub ai_ratio: f64,
    pub pr_volume: u64,
    pub pr_scatter: f64,
    pub greenfield_index: f64,
    pub coding_lead_time_hours: f64,
    pub pickup_time_hours: f64,
    pub review_lead_time_hours: f64,
    pub review_density: f64,
    pub iteration_count: u32,
    pub rework_ratio: f64,
    pub scope_creep: f64,
    pub is_reverted: bool,
    pub survival_rate_30d: f64,
    pub has_hotfix_followup: bool,
    pub repo_age_days: Option<u32>,
    pub primary_language: String,
    pub author_seniority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityMetrics {
    pub window_days: u32,
    pub merged_prs: usize,
    pub prs_per_week: f64,
    pub mean_coding_lead_time_hours: f64,
    pub mean_pickup_time_hours: f64,
    pub mean_review_lead_time_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCostMetrics {
    pub window_days: u32,
    pub merged_prs: usize,
    pub mean_review_comments: f64,
    pub mean_iterations: f64,
    pub mean_review_density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub window_days: u32,
    pub merged_prs: usize,
    pub revert_rate: f64,
    pub hotfix_rate: f64,
    pub mean_survival_rate_30d: f64,
}

// ============================================================================
// Admin plane
// ============================================================================

/// Accepted seed encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedFormat {
    Json,
    Yaml,
    Csv,
}

/// Qualitative event-rate setting mapped to a Poisson base rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Velocity {
    Low,
    Medium,
    High,
}

impl Velocity {
    /// Documented base event rates, events per hour
    pub fn events_per_hour(&self) -> f64 {
        match self {
            Velocity::Low => 10.0,
            Velocity::Medium => 50.0,
            Velocity::High => 100.0,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Velocity::Low),
            "medium" => Some(Velocity::Medium),
            "high" => Some(Velocity::High),
            _ => None,
        }
    }
}

/// Whether regeneration extends the corpus or replaces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegenMode {
    Append,
    Override,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegenerateRequest {
    pub mode: RegenMode,
    /// Simulation window in days; 0 is a documented no-op in append mode
    #[validate(range(min = 0, max = 3650))]
    pub days: u32,
    pub velocity: Velocity,
    /// 0 = use every seed developer
    #[validate(range(min = 0, max = 10000))]
    #[serde(default)]
    pub developers: u32,
    /// 0 = unlimited
    #[validate(range(min = 0, max = 100000))]
    #[serde(default)]
    pub max_commits: u64,
    /// Explicit RNG seed; defaults to the seed document's stable hash
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateResponse {
    pub status: String,
    pub mode: RegenMode,
    pub data_cleaned: bool,
    pub duration_ms: u64,
    pub developers: usize,
    pub commits_added: usize,
    pub prs_added: usize,
    pub reviews_added: usize,
    pub issues_added: usize,
    pub feature_events_added: usize,
    pub total_commits: usize,
    pub total_prs: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUploadRequest {
    /// Inline JSON object for `json`, document string for `yaml`,
    /// base64-encoded zip bundle for `csv`
    pub data: serde_json::Value,
    pub format: SeedFormat,
    #[serde(default)]
    pub regenerate: bool,
    #[serde(default)]
    pub regenerate_config: Option<RegenerateRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUploadResponse {
    pub status: String,
    pub seed: SeedSummary,
    pub regeneration: Option<RegenerateResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub developers: usize,
    pub repositories: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetsResponse {
    pub presets: Vec<PresetInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfigResponse {
    pub seed: SeedSummary,
    pub generation: GenerationSummary,
    pub server: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub default_days: u32,
    pub default_velocity: String,
    pub max_commits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesBucket {
    pub date: NaiveDate,
    pub commits: usize,
    pub prs_opened: usize,
    pub prs_merged: usize,
    pub mean_cycle_time_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    #[serde(flatten)]
    pub counts: crate::types::corpus::CorpusStats,
    pub total_feature_events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeseries: Option<Vec<TimeseriesBucket>>,
}
