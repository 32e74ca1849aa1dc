//! HTTP handlers
//!
//! Every handler follows the same skeleton: parse params, range-query the
//! store under a single read guard, aggregate or project, paginate,
//! serialize. Handlers own no mutable state; the analytics family speaks
//! camelCase, the source-host family snake_case.

pub mod ai_code;
pub mod by_user;
pub mod research;
pub mod source_host;
pub mod team_analytics;
pub mod teams;

use codetel_shared::{Commit, DeveloperRecord, UserMapping};

use crate::query::QueryParams;

/// `{id, email}` sidecar entries for the given developers
pub(crate) fn user_mappings(developers: &[&DeveloperRecord]) -> Vec<UserMapping> {
    developers
        .iter()
        .map(|d| UserMapping {
            id: d.user_id.clone(),
            email: d.email.clone(),
        })
        .collect()
}

/// Commit-level filter shared by the ai-code endpoints
pub(crate) fn commit_matches(commit: &Commit, params: &QueryParams) -> bool {
    params.matches_user(&commit.user_id, &commit.user_email)
        && params
            .repo_name
            .as_ref()
            .map(|repo| &commit.repo_name == repo)
            .unwrap_or(true)
}
