//! In-memory corpus store
//!
//! Thread-safe container for everything the generators produce. One
//! reader-writer lock guards the whole corpus: mutating paths (generators,
//! admin) go through the write side, handler paths through the read side, so
//! a request always aggregates against a single consistent snapshot. ID
//! allocation is the store's sole responsibility; generators never mint ids.

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;

use codetel_shared::{
    AskModeEvent, ClientVersionEvent, CommandEvent, Commit, CorpusStats, DeveloperRecord,
    FileExtensionEvent, Issue, McpEvent, ModelUsageEvent, PlanEvent, PrState, PullRequest,
    RepositoryProfile, Review,
};

use crate::error::{Result, SimulatorError};

/// Monotonic ID counters. Persist across append-mode regenerations; reset
/// only when the corpus itself is dropped.
#[derive(Debug, Clone, Default)]
pub struct IdCounters {
    next_pr_id: u64,
    next_review_id: u64,
    pr_numbers: HashMap<String, u64>,
    issue_numbers: HashMap<String, u64>,
}

impl IdCounters {
    fn next_pr_id(&mut self) -> u64 {
        self.next_pr_id += 1;
        self.next_pr_id
    }

    fn next_review_id(&mut self) -> u64 {
        self.next_review_id += 1;
        self.next_review_id
    }

    fn next_pr_number(&mut self, repo: &str) -> u64 {
        let counter = self.pr_numbers.entry(repo.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn next_issue_number(&mut self, repo: &str) -> u64 {
        let counter = self.issue_numbers.entry(repo.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// The corpus itself. All mutation happens through `&mut` methods while the
/// store's write lock is held, so readers never observe a partial write.
#[derive(Debug, Clone, Default)]
pub struct CorpusData {
    developers: Vec<DeveloperRecord>,
    repositories: Vec<RepositoryProfile>,
    commits: Vec<Commit>,
    commit_index: HashMap<String, usize>,
    prs: Vec<PullRequest>,
    pr_index: HashMap<(String, u64), usize>,
    pr_id_index: HashMap<u64, usize>,
    reviews: Vec<Review>,
    reviews_by_pr: HashMap<u64, Vec<usize>>,
    issues: Vec<Issue>,
    issue_index: HashMap<(String, u64), usize>,
    model_usage_events: Vec<ModelUsageEvent>,
    client_version_events: Vec<ClientVersionEvent>,
    file_extension_events: Vec<FileExtensionEvent>,
    mcp_events: Vec<McpEvent>,
    command_events: Vec<CommandEvent>,
    plan_events: Vec<PlanEvent>,
    ask_mode_events: Vec<AskModeEvent>,
    counters: IdCounters,
}

impl CorpusData {
    // ------------------------------------------------------------------
    // Write API (generators and admin only)
    // ------------------------------------------------------------------

    pub fn load_developers(&mut self, developers: Vec<DeveloperRecord>) {
        self.developers = developers;
    }

    pub fn load_repositories(&mut self, repositories: Vec<RepositoryProfile>) {
        self.repositories = repositories;
    }

    pub fn add_commit(&mut self, commit: Commit) -> Result<()> {
        if self.commit_index.contains_key(&commit.commit_hash) {
            return Err(SimulatorError::conflict(format!(
                "commit {} already exists",
                commit.commit_hash
            )));
        }
        let decomposed_added =
            commit.tab_lines_added + commit.composer_lines_added + commit.non_ai_lines_added;
        let decomposed_deleted = commit.tab_lines_deleted
            + commit.composer_lines_deleted
            + commit.non_ai_lines_deleted;
        if decomposed_added != commit.total_lines_added
            || decomposed_deleted != commit.total_lines_deleted
        {
            return Err(SimulatorError::invalid_request(format!(
                "commit {}: line-kind decomposition does not sum to totals",
                commit.commit_hash
            )));
        }
        self.commit_index
            .insert(commit.commit_hash.clone(), self.commits.len());
        self.commits.push(commit);
        Ok(())
    }

    /// Insert a PR. The per-repo `number` is always allocated here; a zero
    /// `id` is replaced by the next store-wide id.
    pub fn add_pr(&mut self, mut pr: PullRequest) -> Result<u64> {
        if pr.id == 0 {
            pr.id = self.counters.next_pr_id();
        } else if self.pr_id_index.contains_key(&pr.id) {
            return Err(SimulatorError::conflict(format!("PR id {} already exists", pr.id)));
        }
        pr.number = self.counters.next_pr_number(&pr.repo_name);
        if pr.additions < pr.initial_additions {
            return Err(SimulatorError::invalid_request(format!(
                "PR {}#{}: additions below initial additions",
                pr.repo_name, pr.number
            )));
        }
        if pr.is_reverted && pr.state != PrState::Merged {
            return Err(SimulatorError::invalid_request(format!(
                "PR {}#{}: revert flag on unmerged PR",
                pr.repo_name, pr.number
            )));
        }
        let key = (pr.repo_name.clone(), pr.number);
        let id = pr.id;
        self.pr_index.insert(key, self.prs.len());
        self.pr_id_index.insert(id, self.prs.len());
        self.prs.push(pr);
        Ok(id)
    }

    /// Point the listed commits at their PR. Called once per PR right after
    /// `add_pr`, inside the same write-lock scope.
    pub fn link_commits_to_pr(&mut self, hashes: &[String], pr_number: u64) {
        for hash in hashes {
            if let Some(&idx) = self.commit_index.get(hash) {
                self.commits[idx].pr_number = Some(pr_number);
            }
        }
    }

    pub fn store_review(&mut self, mut review: Review) -> Result<u64> {
        if !self.pr_id_index.contains_key(&review.pr_id) {
            return Err(SimulatorError::invalid_request(format!(
                "review references unknown PR id {}",
                review.pr_id
            )));
        }
        review.id = self.counters.next_review_id();
        let id = review.id;
        self.reviews_by_pr
            .entry(review.pr_id)
            .or_default()
            .push(self.reviews.len());
        self.reviews.push(review);
        Ok(id)
    }

    pub fn store_issue(&mut self, mut issue: Issue) -> Result<u64> {
        issue.number = self.counters.next_issue_number(&issue.repo_name);
        let number = issue.number;
        self.issue_index
            .insert((issue.repo_name.clone(), number), self.issues.len());
        self.issues.push(issue);
        Ok(number)
    }

    pub fn add_model_usage_event(&mut self, event: ModelUsageEvent) {
        self.model_usage_events.push(event);
    }

    pub fn add_client_version_event(&mut self, event: ClientVersionEvent) {
        self.client_version_events.push(event);
    }

    pub fn add_file_extension_event(&mut self, event: FileExtensionEvent) {
        self.file_extension_events.push(event);
    }

    pub fn add_mcp_event(&mut self, event: McpEvent) {
        self.mcp_events.push(event);
    }

    pub fn add_command_event(&mut self, event: CommandEvent) {
        self.command_events.push(event);
    }

    pub fn add_plan_event(&mut self, event: PlanEvent) {
        self.plan_events.push(event);
    }

    pub fn add_ask_mode_event(&mut self, event: AskModeEvent) {
        self.ask_mode_events.push(event);
    }

    pub fn clear_all_data(&mut self) {
        *self = CorpusData::default();
    }

    // ------------------------------------------------------------------
    // Read API (handlers)
    // ------------------------------------------------------------------

    pub fn list_developers(&self) -> &[DeveloperRecord] {
        &self.developers
    }

    pub fn developer_by_user_or_email(&self, key: &str) -> Option<&DeveloperRecord> {
        self.developers
            .iter()
            .find(|d| d.user_id == key || d.email == key)
    }

    pub fn list_repositories(&self) -> &[RepositoryProfile] {
        &self.repositories
    }

    pub fn repository(&self, repo_name: &str) -> Option<&RepositoryProfile> {
        self.repositories.iter().find(|r| r.repo_name == repo_name)
    }

    /// Commits in `[from, to]`, newest first
    pub fn commits_by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<&Commit> {
        let mut out: Vec<&Commit> = self
            .commits
            .iter()
            .filter(|c| c.commit_ts >= from && c.commit_ts <= to)
            .collect();
        out.sort_by(|a, b| b.commit_ts.cmp(&a.commit_ts).then(a.commit_hash.cmp(&b.commit_hash)));
        out
    }

    /// Commits for one user (id or email) in `[from, to]`, newest first
    pub fn commits_by_user(
        &self,
        user_or_email: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<&Commit> {
        let mut out: Vec<&Commit> = self
            .commits
            .iter()
            .filter(|c| {
                (c.user_id == user_or_email || c.user_email == user_or_email)
                    && c.commit_ts >= from
                    && c.commit_ts <= to
            })
            .collect();
        out.sort_by(|a, b| b.commit_ts.cmp(&a.commit_ts).then(a.commit_hash.cmp(&b.commit_hash)));
        out
    }

    pub fn commits_by_repo(&self, repo_name: &str) -> Vec<&Commit> {
        let mut out: Vec<&Commit> = self
            .commits
            .iter()
            .filter(|c| c.repo_name == repo_name)
            .collect();
        out.sort_by(|a, b| b.commit_ts.cmp(&a.commit_ts).then(a.commit_hash.cmp(&b.commit_hash)));
        out
    }

    pub fn commit_by_hash(&self, hash: &str) -> Option<&Commit> {
        self.commit_index.get(hash).map(|&idx| &self.commits[idx])
    }

    pub fn all_commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn prs_by_repo(&self, repo_name: &str) -> Vec<&PullRequest> {
        let mut out: Vec<&PullRequest> = self
            .prs
            .iter()
            .filter(|p| p.repo_name == repo_name)
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.number.cmp(&a.number)));
        out
    }

    pub fn pr_by_repo_number(&self, repo_name: &str, number: u64) -> Option<&PullRequest> {
        self.pr_index
            .get(&(repo_name.to_string(), number))
            .map(|&idx| &self.prs[idx])
    }

    pub fn pr_by_id(&self, id: u64) -> Option<&PullRequest> {
        self.pr_id_index.get(&id).map(|&idx| &self.prs[idx])
    }

    pub fn all_prs(&self) -> &[PullRequest] {
        &self.prs
    }

    pub fn reviews_by_pr_id(&self, pr_id: u64) -> Vec<&Review> {
        let mut out: Vec<&Review> = self
            .reviews_by_pr
            .get(&pr_id)
            .map(|indexes| indexes.iter().map(|&i| &self.reviews[i]).collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        out
    }

    pub fn reviews_by_repo_pr(&self, repo_name: &str, number: u64) -> Option<Vec<&Review>> {
        self.pr_by_repo_number(repo_name, number)
            .map(|pr| self.reviews_by_pr_id(pr.id))
    }

    pub fn all_reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn issues_by_repo(&self, repo_name: &str) -> Vec<&Issue> {
        let mut out: Vec<&Issue> = self
            .issues
            .iter()
            .filter(|i| i.repo_name == repo_name)
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.number.cmp(&a.number)));
        out
    }

    pub fn issue_by_repo_number(&self, repo_name: &str, number: u64) -> Option<&Issue> {
        self.issue_index
            .get(&(repo_name.to_string(), number))
            .map(|&idx| &self.issues[idx])
    }

    pub fn model_usage_events(&self) -> &[ModelUsageEvent] {
        &self.model_usage_events
    }

    pub fn client_version_events(&self) -> &[ClientVersionEvent] {
        &self.client_version_events
    }

    pub fn file_extension_events(&self) -> &[FileExtensionEvent] {
        &self.file_extension_events
    }

    pub fn mcp_events(&self) -> &[McpEvent] {
        &self.mcp_events
    }

    pub fn command_events(&self) -> &[CommandEvent] {
        &self.command_events
    }

    pub fn plan_events(&self) -> &[PlanEvent] {
        &self.plan_events
    }

    pub fn ask_mode_events(&self) -> &[AskModeEvent] {
        &self.ask_mode_events
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            developers: self.developers.len(),
            repositories: self.repositories.len(),
            commits: self.commits.len(),
            pull_requests: self.prs.len(),
            open_prs: self.prs.iter().filter(|p| p.state == PrState::Open).count(),
            merged_prs: self.prs.iter().filter(|p| p.state == PrState::Merged).count(),
            closed_prs: self.prs.iter().filter(|p| p.state == PrState::Closed).count(),
            reviews: self.reviews.len(),
            issues: self.issues.len(),
            model_usage_events: self.model_usage_events.len(),
            client_version_events: self.client_version_events.len(),
            file_extension_events: self.file_extension_events.len(),
            mcp_events: self.mcp_events.len(),
            command_events: self.command_events.len(),
            plan_events: self.plan_events.len(),
            ask_mode_events: self.ask_mode_events.len(),
        }
    }
}

/// Handle shared across handlers, generators and the admin plane
#[derive(Debug, Default)]
pub struct CorpusStore {
    inner: RwLock<CorpusData>,
}

impl CorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-side snapshot. Hold the guard for the whole aggregation so every
    /// read in a request sees the same corpus state.
    pub fn read(&self) -> RwLockReadGuard<'_, CorpusData> {
        self.inner.read()
    }

    /// Write-side access for generators and admin operations
    pub fn write(&self) -> RwLockWriteGuard<'_, CorpusData> {
        self.inner.write()
    }

    /// Atomically replace the corpus with a staged one (override-mode
    /// regeneration). The staged corpus was built in a side buffer, so the
    /// swap itself is instantaneous and readers only ever see pre- or
    /// post-state.
    pub fn replace(&self, staged: CorpusData) {
        *self.inner.write() = staged;
    }

    /// Clone the current corpus into a side buffer for append-mode staging
    pub fn stage(&self) -> CorpusData {
        self.inner.read().clone()
    }

    pub fn stats(&self) -> CorpusStats {
        self.inner.read().stats()
    }
}
