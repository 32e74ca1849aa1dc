//! Seed document schema
//!
//! A seed is the declarative, read-only input that describes the
//! organizational dimensions (developers, repositories), the correlation
//! parameters the generated corpus must obey, and the text pools used for
//! commit messages, PR titles and review comments. Seeds load from JSON,
//! YAML or a zipped CSV bundle and are validated atomically before use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::Hasher;

/// Developer seniority band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
}

impl Seniority {
    /// Ordinal rank used by the correlation engine (junior < mid < senior)
    pub fn rank(&self) -> u8 {
        match self {
            Seniority::Junior => 0,
            Seniority::Mid => 1,
            Seniority::Senior => 2,
        }
    }

    /// Wire rendering, matching the serde form
    pub fn as_str(&self) -> &'static str {
        match self {
            Seniority::Junior => "junior",
            Seniority::Mid => "mid",
            Seniority::Senior => "senior",
        }
    }
}

/// Qualitative per-developer activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    /// Multiplier applied to the velocity base rate
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Low => 0.5,
            ActivityLevel::Medium => 1.0,
            ActivityLevel::High => 1.8,
        }
    }
}

/// PR-shaping behavior of a developer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrBehavior {
    pub prs_per_week: f64,
    pub avg_pr_size_loc: f64,
    pub avg_files_per_pr: f64,
}

impl Default for PrBehavior {
    fn default() -> Self {
        Self {
            prs_per_week: 4.0,
            avg_pr_size_loc: 180.0,
            avg_files_per_pr: 5.0,
        }
    }
}

/// Lognormal parameters for per-commit line volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingSpeed {
    pub mean: f64,
    pub std: f64,
}

impl Default for CodingSpeed {
    fn default() -> Self {
        Self {
            mean: 40.0,
            std: 25.0,
        }
    }
}

/// Daily working band of a developer, in local hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    /// First working hour, 0-23
    pub start_hour: u8,
    /// End of the band, exclusive, 1-24
    pub end_hour: u8,
    /// Hours inside the band with extra weight
    #[serde(default)]
    pub peak_hours: Vec<u8>,
    /// Offset from UTC; regional bands are expressed through this
    #[serde(default)]
    pub timezone_offset_hours: i8,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 18,
            peak_hours: vec![10, 11, 14, 15],
            timezone_offset_hours: 0,
        }
    }
}

/// A developer as declared by the seed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperProfile {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub org: String,
    #[serde(default)]
    pub division: String,
    pub team: String,
    #[serde(default)]
    pub region: String,
    pub seniority: Seniority,
    pub activity_level: ActivityLevel,
    /// Probability that a shown suggestion is accepted, 0..=1
    pub acceptance_rate: f64,
    #[serde(default)]
    pub pr_behavior: PrBehavior,
    #[serde(default)]
    pub coding_speed: CodingSpeed,
    /// Fraction of AI-assisted output that arrives through chat/composer
    /// rather than inline tab completions
    #[serde(default = "default_chat_vs_code_ratio")]
    pub chat_vs_code_ratio: f64,
    #[serde(default)]
    pub working_hours: WorkingHours,
}

fn default_chat_vs_code_ratio() -> f64 {
    0.35
}

/// A repository as declared by the seed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryProfile {
    /// `org/name` form
    pub repo_name: String,
    pub primary_language: String,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    pub owning_teams: Vec<String>,
    /// Repository age in days at generation time
    #[serde(default)]
    pub age_days: Option<u32>,
}

fn default_service_type() -> String {
    "service".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

impl RepositoryProfile {
    /// Owner half of `org/name`
    pub fn owner(&self) -> &str {
        self.repo_name.split('/').next().unwrap_or("")
    }

    /// Name half of `org/name`
    pub fn short_name(&self) -> &str {
        self.repo_name.split('/').nth(1).unwrap_or("")
    }
}

/// Correlation parameters for the eight population-scale contracts.
///
/// The sigmoid quality model is
/// `p = sigmoid(base + a * ai_ratio + b * volatility + c * seniority_penalty)`
/// where `a`, `b`, `c` map to the fields below. The functional form is fixed;
/// the constants are seed-tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationParams {
    /// Additive lognormal-mean gain per seniority rank for PR sizes
    pub seniority_pr_size_gain: f64,
    /// Iteration-count mean gain per unit of AI ratio
    pub ai_iteration_gain: f64,
    /// Review-density (comments per LoC) gain per unit of AI ratio
    pub ai_review_density_gain: f64,
    /// Sigmoid coefficient `a`: AI ratio -> revert probability
    pub ai_revert_coefficient: f64,
    /// Sigmoid coefficient `b`: size volatility -> revert probability
    pub volatility_revert_coefficient: f64,
    /// Sigmoid coefficient `c`: inverted seniority rank -> revert probability
    pub seniority_revert_penalty: f64,
    /// Exponent tying PR size to cycle-time duration samples
    pub size_cycle_time_exponent: f64,
    /// Sigmoid intercept for the revert model
    pub revert_base_offset: f64,
    /// Sigmoid intercept for the hotfix-followup model
    pub hotfix_base_offset: f64,
    /// Expected issues opened per repository per simulated week
    pub issues_per_repo_week: f64,
}

impl Default for CorrelationParams {
    fn default() -> Self {
        Self {
            seniority_pr_size_gain: 0.45,
            ai_iteration_gain: 7.0,
            ai_review_density_gain: 2.0,
            ai_revert_coefficient: 3.5,
            volatility_revert_coefficient: 1.0,
            seniority_revert_penalty: 1.0,
            size_cycle_time_exponent: 0.35,
            revert_base_offset: -4.2,
            hotfix_base_offset: -4.6,
            issues_per_repo_week: 3.0,
        }
    }
}

/// Optional external data source block; disabled unless explicitly enabled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Text pools for generated artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextTemplates {
    pub commit_messages: Vec<String>,
    pub pr_titles: Vec<String>,
    pub review_comments: Vec<String>,
    pub external_sources: Vec<ExternalSource>,
}

impl Default for TextTemplates {
    fn default() -> Self {
        Self {
            commit_messages: vec![
                "Fix edge case in request validation".to_string(),
                "Refactor retry handling".to_string(),
                "Add pagination to listing endpoint".to_string(),
                "Update dependency pins".to_string(),
                "Handle empty result sets".to_string(),
                "Improve error messages".to_string(),
                "Tighten input bounds".to_string(),
                "Extract shared helper".to_string(),
            ],
            pr_titles: vec![
                "Harden input validation".to_string(),
                "Add bulk export support".to_string(),
                "Refactor session handling".to_string(),
                "Fix flaky timeout behavior".to_string(),
                "Introduce caching layer".to_string(),
                "Clean up configuration loading".to_string(),
            ],
            review_comments: vec![
                "Can we add a test for the empty case?".to_string(),
                "This branch is unreachable, remove it.".to_string(),
                "Prefer the existing helper here.".to_string(),
                "Naming nit: this is a duration, not a timestamp.".to_string(),
                "LGTM after the rename.".to_string(),
                "Please split this into two functions.".to_string(),
            ],
            external_sources: Vec::new(),
        }
    }
}

/// The complete seed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub developers: Vec<DeveloperProfile>,
    pub repositories: Vec<RepositoryProfile>,
    #[serde(default)]
    pub correlations: CorrelationParams,
    #[serde(default)]
    pub templates: TextTemplates,
}

/// Compact summary of a seed, used by the admin plane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub developers: usize,
    pub repositories: usize,
    pub teams: usize,
    pub regions: usize,
    pub commit_message_templates: usize,
    pub pr_title_templates: usize,
    pub review_comment_templates: usize,
}

impl Seed {
    /// Validate the seed invariants. All violations are collected so a caller
    /// can surface every offending field path at once; a seed that fails here
    /// is rejected atomically.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut reasons = Vec::new();

        if self.developers.is_empty() {
            reasons.push("developers: at least one developer is required".to_string());
        }
        if self.repositories.is_empty() {
            reasons.push("repositories: at least one repository is required".to_string());
        }

        let mut emails = BTreeSet::new();
        let mut user_ids = BTreeSet::new();
        let mut teams = BTreeSet::new();
        for (i, dev) in self.developers.iter().enumerate() {
            if !emails.insert(dev.email.as_str()) {
                reasons.push(format!("developers[{}].email: duplicate '{}'", i, dev.email));
            }
            if !user_ids.insert(dev.user_id.as_str()) {
                reasons.push(format!(
                    "developers[{}].user_id: duplicate '{}'",
                    i, dev.user_id
                ));
            }
            if !(0.0..=1.0).contains(&dev.acceptance_rate) {
                reasons.push(format!(
                    "developers[{}].acceptance_rate: {} outside [0, 1]",
                    i, dev.acceptance_rate
                ));
            }
            if dev.coding_speed.std < 0.0 {
                reasons.push(format!(
                    "developers[{}].coding_speed.std: must be non-negative",
                    i
                ));
            }
            if dev.pr_behavior.avg_pr_size_loc < 0.0 {
                reasons.push(format!(
                    "developers[{}].pr_behavior.avg_pr_size_loc: must be non-negative",
                    i
                ));
            }
            if !(0.0..=1.0).contains(&dev.chat_vs_code_ratio) {
                reasons.push(format!(
                    "developers[{}].chat_vs_code_ratio: {} outside [0, 1]",
                    i, dev.chat_vs_code_ratio
                ));
            }
            let wh = &dev.working_hours;
            if wh.start_hour >= wh.end_hour || wh.end_hour > 24 {
                reasons.push(format!(
                    "developers[{}].working_hours: invalid band {}..{}",
                    i, wh.start_hour, wh.end_hour
                ));
            }
            teams.insert(dev.team.as_str());
        }

        let mut repo_names = BTreeSet::new();
        for (i, repo) in self.repositories.iter().enumerate() {
            if !repo_names.insert(repo.repo_name.as_str()) {
                reasons.push(format!(
                    "repositories[{}].repo_name: duplicate '{}'",
                    i, repo.repo_name
                ));
            }
            let parts: Vec<&str> = repo.repo_name.split('/').collect();
            if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
                reasons.push(format!(
                    "repositories[{}].repo_name: '{}' is not in org/name form",
                    i, repo.repo_name
                ));
            }
            if repo.owning_teams.is_empty() {
                reasons.push(format!(
                    "repositories[{}].owning_teams: must not be empty",
                    i
                ));
            } else if !repo
                .owning_teams
                .iter()
                .any(|t| teams.contains(t.as_str()))
            {
                reasons.push(format!(
                    "repositories[{}].owning_teams: no declared developer belongs to any of {:?}",
                    i, repo.owning_teams
                ));
            }
        }

        if self.templates.commit_messages.is_empty() {
            reasons.push("templates.commit_messages: must not be empty".to_string());
        }
        if self.templates.pr_titles.is_empty() {
            reasons.push("templates.pr_titles: must not be empty".to_string());
        }
        if self.templates.review_comments.is_empty() {
            reasons.push("templates.review_comments: must not be empty".to_string());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons)
        }
    }

    /// Stable 64-bit hash of the seed, used to derive the default RNG seed so
    /// regeneration is reproducible for an unchanged seed document.
    pub fn stable_hash(&self) -> u64 {
        // Struct field order makes the JSON rendering canonical.
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Fnv1a::new();
        hasher.write(&encoded);
        hasher.finish()
    }

    pub fn summary(&self) -> SeedSummary {
        let teams: BTreeSet<&str> = self.developers.iter().map(|d| d.team.as_str()).collect();
        let regions: BTreeSet<&str> = self
            .developers
            .iter()
            .map(|d| d.region.as_str())
            .filter(|r| !r.is_empty())
            .collect();
        SeedSummary {
            developers: self.developers.len(),
            repositories: self.repositories.len(),
            teams: teams.len(),
            regions: regions.len(),
            commit_message_templates: self.templates.commit_messages.len(),
            pr_title_templates: self.templates.pr_titles.len(),
            review_comment_templates: self.templates.review_comments.len(),
        }
    }

    /// All teams that own `repo` and have at least one developer
    pub fn developers_for_repo(&self, repo: &RepositoryProfile) -> Vec<&DeveloperProfile> {
        self.developers
            .iter()
            .filter(|d| repo.owning_teams.iter().any(|t| *t == d.team))
            .collect()
    }

    /// Repositories owned by the developer's team
    pub fn repos_for_developer(&self, dev: &DeveloperProfile) -> Vec<&RepositoryProfile> {
        self.repositories
            .iter()
            .filter(|r| r.owning_teams.iter().any(|t| *t == dev.team))
            .collect()
    }
}

/// FNV-1a, kept local so the seed hash never shifts under std hasher changes
struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Fnv1a(0xcbf29ce484222325)
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}
