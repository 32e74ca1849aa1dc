//! Research surface
//!
//! `/research/dataset[.csv]` emits the pre-joined wide-table projection of
//! merged PRs; the metrics endpoints summarize velocity, review costs and
//! quality over the selected window. Column names are fixed by the dataset
//! schema and stay snake_case.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use std::collections::HashMap;

use codetel_shared::{
    PrState, PullRequest, QualityMetrics, ResearchDatasetRow, ReviewCostMetrics, VelocityMetrics,
};

use crate::error::Result;
use crate::query::{self, ParseOptions, QueryParams};
use crate::state::AppState;
use crate::store::CorpusData;

fn dataset_row(corpus: &CorpusData, pr: &PullRequest) -> ResearchDatasetRow {
    let repo = corpus.repository(&pr.repo_name);
    let author = corpus.developer_by_user_or_email(&pr.author_user_id);
    ResearchDatasetRow {
        pr_number: pr.number,
        author_email: pr.author_email.clone(),
        repo_name: pr.repo_name.clone(),
        ai_lines_added: pr.ai_lines_added,
        ai_lines_deleted: pr.ai_lines_deleted,
        non_ai_lines_added: pr.non_ai_lines_added,
        ai_ratio: pr.ai_ratio(),
        pr_volume: pr.volume(),
        pr_scatter: pr.scatter(),
        greenfield_index: pr.greenfield_index,
        coding_lead_time_hours: pr.coding_lead_time_hours,
        pickup_time_hours: pr.pickup_time_hours,
        review_lead_time_hours: pr.review_lead_time_hours,
        review_density: pr.review_density,
        iteration_count: pr.iterations,
        rework_ratio: pr.rework_ratio,
        scope_creep: pr.scope_creep,
        is_reverted: pr.is_reverted,
        survival_rate_30d: pr.survival_rate_30d,
        has_hotfix_followup: pr.has_hotfix_followup,
        repo_age_days: repo.and_then(|r| r.age_days),
        primary_language: repo
            .map(|r| r.primary_language.clone())
            .unwrap_or_default(),
        author_seniority: author
            .map(|d| d.seniority.as_str().to_string())
            .unwrap_or_default(),
    }
}

/// Merged PRs created inside the selected window, newest first
fn merged_in_range<'a>(corpus: &'a CorpusData, params: &QueryParams) -> Vec<&'a PullRequest> {
    let mut prs: Vec<&PullRequest> = corpus
        .all_prs()
        .iter()
        .filter(|pr| {
            pr.state == PrState::Merged
                && pr.created_at >= params.from
                && pr.created_at <= params.to
                && params.matches_user(&pr.author_user_id, &pr.author_email)
        })
        .collect();
    prs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    prs
}

fn dataset_rows(state: &AppState, params: &QueryParams) -> Vec<ResearchDatasetRow> {
    let corpus = state.store.read();
    merged_in_range(&corpus, params)
        .into_iter()
        .map(|pr| dataset_row(&corpus, pr))
        .collect()
}

pub async fn dataset(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<codetel_shared::PaginatedResponse<ResearchDatasetRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::wide(), Utc::now())?;
    let rows = dataset_rows(&state, &params);
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn dataset_csv(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Response> {
    let params = QueryParams::parse(&raw, &ParseOptions::wide(), Utc::now())?;
    let rows = dataset_rows(&state, &params);
    query::csv_response(&rows, "research-dataset.csv")
}

fn window_days(params: &QueryParams) -> u32 {
    ((params.end_date - params.start_date).num_days().max(0) as u32) + 1
}

fn mean<F>(prs: &[&PullRequest], value: F) -> f64
where
    F: Fn(&PullRequest) -> f64,
{
    if prs.is_empty() {
        0.0
    } else {
        prs.iter().map(|pr| value(pr)).sum::<f64>() / prs.len() as f64
    }
}

pub async fn velocity(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<VelocityMetrics>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let merged = merged_in_range(&corpus, &params);
    let days = window_days(&params);
    Ok(Json(VelocityMetrics {
        window_days: days,
        merged_prs: merged.len(),
        prs_per_week: merged.len() as f64 * 7.0 / f64::from(days.max(1)),
        mean_coding_lead_time_hours: mean(&merged, |pr| pr.coding_lead_time_hours),
        mean_pickup_time_hours: mean(&merged, |pr| pr.pickup_time_hours),
        mean_review_lead_time_hours: mean(&merged, |pr| pr.review_lead_time_hours),
    }))
}

pub async fn review_costs(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ReviewCostMetrics>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let merged = merged_in_range(&corpus, &params);
    Ok(Json(ReviewCostMetrics {
        window_days: window_days(&params),
        merged_prs: merged.len(),
        mean_review_comments: mean(&merged, |pr| f64::from(pr.review_comments)),
        mean_iterations: mean(&merged, |pr| f64::from(pr.iterations)),
        mean_review_density: mean(&merged, |pr| pr.review_density),
    }))
}

pub async fn quality(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<QualityMetrics>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let merged = merged_in_range(&corpus, &params);
    let reverted = merged.iter().filter(|pr| pr.is_reverted).count();
    let hotfixes = merged.iter().filter(|pr| pr.has_hotfix_followup).count();
    let total = merged.len().max(1) as f64;
    Ok(Json(QualityMetrics {
        window_days: window_days(&params),
        merged_prs: merged.len(),
        revert_rate: reverted as f64 / total,
        hotfix_rate: hotfixes as f64 / total,
        mean_survival_rate_30d: mean(&merged, |pr| pr.survival_rate_30d),
    }))
}
