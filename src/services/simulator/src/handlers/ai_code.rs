//! AI-code tracking endpoints
//!
//! `/analytics/ai-code/commits[.csv]` lists raw commits with their line-kind
//! decomposition; `/analytics/ai-code/changes[.csv]` aggregates the same
//! stream per user-day. Both support the 90-day range cap, the shared user
//! filter, and unpaginated CSV export.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use std::collections::HashMap;

use codetel_shared::{AiCodeChangeRow, AiCodeCommitRow, Commit, PaginatedResponse};

use crate::error::Result;
use crate::query::{self, ParseOptions, QueryParams};
use crate::state::AppState;

use super::commit_matches;

fn options() -> ParseOptions {
    ParseOptions::wide().with_range_cap(90)
}

fn commit_row(commit: &Commit) -> AiCodeCommitRow {
    AiCodeCommitRow {
        commit_hash: commit.commit_hash.clone(),
        user_id: commit.user_id.clone(),
        user_email: commit.user_email.clone(),
        repo_name: commit.repo_name.clone(),
        branch: commit.branch.clone(),
        is_primary_branch: commit.is_primary_branch,
        total_lines_added: commit.total_lines_added,
        total_lines_deleted: commit.total_lines_deleted,
        tab_lines_added: commit.tab_lines_added,
        tab_lines_deleted: commit.tab_lines_deleted,
        composer_lines_added: commit.composer_lines_added,
        composer_lines_deleted: commit.composer_lines_deleted,
        non_ai_lines_added: commit.non_ai_lines_added,
        non_ai_lines_deleted: commit.non_ai_lines_deleted,
        commit_ts: commit.commit_ts,
        created_at: commit.created_at,
    }
}

fn commit_rows(state: &AppState, params: &QueryParams) -> Vec<AiCodeCommitRow> {
    let corpus = state.store.read();
    corpus
        .commits_by_time_range(params.from, params.to)
        .into_iter()
        .filter(|c| commit_matches(c, params))
        .map(commit_row)
        .collect()
}

fn change_rows(state: &AppState, params: &QueryParams) -> Vec<AiCodeChangeRow> {
    #[derive(Default)]
    struct Agg {
        user_email: String,
        commits: u64,
        total_added: u64,
        total_deleted: u64,
        tab_added: u64,
        composer_added: u64,
        non_ai_added: u64,
    }

    let corpus = state.store.read();
    let mut buckets: BTreeMap<(chrono::NaiveDate, String), Agg> = BTreeMap::new();
    for commit in corpus
        .commits_by_time_range(params.from, params.to)
        .into_iter()
        .filter(|c| commit_matches(c, params))
    {
        let key = (commit.commit_ts.date_naive(), commit.user_id.clone());
        let agg = buckets.entry(key).or_default();
        agg.user_email = commit.user_email.clone();
        agg.commits += 1;
        agg.total_added += commit.total_lines_added;
        agg.total_deleted += commit.total_lines_deleted;
        agg.tab_added += commit.tab_lines_added;
        agg.composer_added += commit.composer_lines_added;
        agg.non_ai_added += commit.non_ai_lines_added;
    }

    let mut rows: Vec<AiCodeChangeRow> = buckets
        .into_iter()
        .map(|((date, user_id), agg)| AiCodeChangeRow {
            date,
            user_id,
            user_email: agg.user_email,
            commits: agg.commits,
            total_lines_added: agg.total_added,
            total_lines_deleted: agg.total_deleted,
            tab_lines_added: agg.tab_added,
            composer_lines_added: agg.composer_added,
            non_ai_lines_added: agg.non_ai_added,
            ai_ratio: if agg.total_added == 0 {
                0.0
            } else {
                (agg.tab_added + agg.composer_added) as f64 / agg.total_added as f64
            },
        })
        .collect();
    // Newest day first, then by user for test stability.
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.user_id.cmp(&b.user_id)));
    rows
}

pub async fn commits(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<AiCodeCommitRow>>> {
    let params = QueryParams::parse(&raw, &options(), Utc::now())?;
    let rows = commit_rows(&state, &params);
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn commits_csv(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Response> {
    let params = QueryParams::parse(&raw, &options(), Utc::now())?;
    let rows = commit_rows(&state, &params);
    query::csv_response(&rows, "ai-code-commits.csv")
}

pub async fn changes(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<AiCodeChangeRow>>> {
    let params = QueryParams::parse(&raw, &options(), Utc::now())?;
    let rows = change_rows(&state, &params);
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn changes_csv(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Response> {
    let params = QueryParams::parse(&raw, &options(), Utc::now())?;
    let rows = change_rows(&state, &params);
    query::csv_response(&rows, "ai-code-changes.csv")
}
