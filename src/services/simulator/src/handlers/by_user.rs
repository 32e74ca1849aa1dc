//! By-user analytics endpoints
//!
//! Same metric suffixes as the team family, but the response is keyed by
//! user email (lexicographic) and paged by user rather than by row. The
//! `user` filter accepts emails and user_ids; the `userMappings` sidecar
//! resolves either direction for every user on the current page.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

use codetel_shared::{
    AskModeRow, ByUserParams, ByUserResponse, ClientVersionRow, CommandUsageRow, DailyEditsRow,
    DauRow, DeveloperRecord, FileExtensionRow, McpUsageRow, ModelUsageRow, PaginationMeta,
    PlanUsageRow,
};

use crate::error::Result;
use crate::query::{ParseOptions, QueryParams};
use crate::state::AppState;
use crate::store::CorpusData;

use super::user_mappings;

fn build_by_user<T, F>(
    state: &AppState,
    raw: &HashMap<String, String>,
    metric: &str,
    rows_for: F,
) -> Result<Json<ByUserResponse<T>>>
where
    F: Fn(&CorpusData, &DeveloperRecord, &QueryParams) -> Vec<T>,
{
    let params = QueryParams::parse(raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();

    // Filter first, then page by user. Key order is lexicographic by email
    // for test stability.
    let mut developers: Vec<&DeveloperRecord> = corpus
        .list_developers()
        .iter()
        .filter(|d| params.matches_user(&d.user_id, &d.email))
        .collect();
    developers.sort_by(|a, b| a.email.cmp(&b.email));

    let total_users = developers.len();
    let total_pages = total_users.div_ceil(params.page_size);
    let start = (params.page - 1).saturating_mul(params.page_size);
    let page_developers: Vec<&DeveloperRecord> = developers
        .into_iter()
        .skip(start)
        .take(params.page_size)
        .collect();

    let mut data = BTreeMap::new();
    for dev in &page_developers {
        data.insert(dev.email.clone(), rows_for(&corpus, dev, &params));
    }

    Ok(Json(ByUserResponse {
        data,
        total_users,
        user_mappings: user_mappings(&page_developers),
        pagination: PaginationMeta {
            page: params.page,
            page_size: params.page_size,
            total_pages,
        },
        params: ByUserParams {
            metric: metric.to_string(),
        },
    }))
}

fn user_edits_rows<F>(
    corpus: &CorpusData,
    dev: &DeveloperRecord,
    params: &QueryParams,
    line_count: F,
) -> Vec<DailyEditsRow>
where
    F: Fn(&codetel_shared::Commit) -> u64,
{
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for commit in corpus.commits_by_user(&dev.user_id, params.from, params.to) {
        *buckets.entry(commit.commit_ts.date_naive()).or_default() += line_count(commit);
    }
    let mut rows: Vec<DailyEditsRow> = buckets
        .into_iter()
        .map(|(date, lines)| DailyEditsRow {
            date,
            suggested_lines: lines,
            accepted_lines: lines,
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

pub async fn agent_edits(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<DailyEditsRow>>> {
    build_by_user(&state, &raw, "agent-edits", |corpus, dev, params| {
        user_edits_rows(corpus, dev, params, |c| c.composer_lines_added)
    })
}

pub async fn tabs(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<DailyEditsRow>>> {
    build_by_user(&state, &raw, "tabs", |corpus, dev, params| {
        user_edits_rows(corpus, dev, params, |c| c.tab_lines_added)
    })
}

pub async fn dau(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<DauRow>>> {
    build_by_user(&state, &raw, "dau", |corpus, dev, params| {
        let mut days: std::collections::BTreeSet<NaiveDate> = std::collections::BTreeSet::new();
        let streams: Vec<&codetel_shared::EventEnvelope> = corpus
            .model_usage_events()
            .iter()
            .map(|e| &e.envelope)
            .chain(corpus.client_version_events().iter().map(|e| &e.envelope))
            .chain(corpus.file_extension_events().iter().map(|e| &e.envelope))
            .chain(corpus.mcp_events().iter().map(|e| &e.envelope))
            .chain(corpus.command_events().iter().map(|e| &e.envelope))
            .chain(corpus.plan_events().iter().map(|e| &e.envelope))
            .chain(corpus.ask_mode_events().iter().map(|e| &e.envelope))
            .collect();
        for envelope in streams {
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                days.insert(envelope.event_date);
            }
        }
        let mut rows: Vec<DauRow> = days
            .into_iter()
            .map(|date| DauRow {
                date,
                active_users: 1,
            })
            .collect();
        rows.reverse();
        rows
    })
}

pub async fn models(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<ModelUsageRow>>> {
    build_by_user(&state, &raw, "models", |corpus, dev, params| {
        let mut buckets: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
        for event in corpus.model_usage_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                *buckets
                    .entry((envelope.event_date, event.model_name.clone()))
                    .or_default() += 1;
            }
        }
        let mut rows: Vec<ModelUsageRow> = buckets
            .into_iter()
            .map(|((date, model), count)| ModelUsageRow { date, model, count })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.model.cmp(&b.model)));
        rows
    })
}

pub async fn client_versions(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<ClientVersionRow>>> {
    build_by_user(&state, &raw, "client-versions", |corpus, dev, params| {
        let mut buckets: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
        for event in corpus.client_version_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                *buckets
                    .entry((envelope.event_date, event.client_version.clone()))
                    .or_default() += 1;
            }
        }
        let mut rows: Vec<ClientVersionRow> = buckets
            .into_iter()
            .map(|((date, version), count)| ClientVersionRow {
                date,
                version,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.version.cmp(&b.version)));
        rows
    })
}

pub async fn top_file_extensions(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<FileExtensionRow>>> {
    build_by_user(&state, &raw, "top-file-extensions", |corpus, dev, params| {
        #[derive(Default)]
        struct ExtAgg {
            suggested: u64,
            accepted: u64,
            count: u64,
        }
        let mut buckets: BTreeMap<NaiveDate, BTreeMap<String, ExtAgg>> = BTreeMap::new();
        for event in corpus.file_extension_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                let agg = buckets
                    .entry(envelope.event_date)
                    .or_default()
                    .entry(event.file_extension.clone())
                    .or_default();
                agg.suggested += event.suggested_lines;
                agg.accepted += event.accepted_lines;
                agg.count += 1;
            }
        }
        let mut rows = Vec::new();
        let mut dates: Vec<NaiveDate> = buckets.keys().cloned().collect();
        dates.reverse();
        for date in dates {
            if let Some(by_ext) = buckets.remove(&date) {
                let mut ranked: Vec<(String, ExtAgg)> = by_ext.into_iter().collect();
                ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));
                for (extension, agg) in ranked.into_iter().take(5) {
                    rows.push(FileExtensionRow {
                        date,
                        extension,
                        suggested_lines: agg.suggested,
                        accepted_lines: agg.accepted,
                        count: agg.count,
                    });
                }
            }
        }
        rows
    })
}

pub async fn mcp(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<McpUsageRow>>> {
    build_by_user(&state, &raw, "mcp", |corpus, dev, params| {
        let mut buckets: BTreeMap<(NaiveDate, String, String), u64> = BTreeMap::new();
        for event in corpus.mcp_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                *buckets
                    .entry((
                        envelope.event_date,
                        event.server_name.clone(),
                        event.tool_name.clone(),
                    ))
                    .or_default() += 1;
            }
        }
        let mut rows: Vec<McpUsageRow> = buckets
            .into_iter()
            .map(|((date, server, tool), count)| McpUsageRow {
                date,
                server,
                tool,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.server.cmp(&b.server)));
        rows
    })
}

pub async fn commands(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<CommandUsageRow>>> {
    build_by_user(&state, &raw, "commands", |corpus, dev, params| {
        let mut buckets: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
        for event in corpus.command_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                *buckets
                    .entry((envelope.event_date, event.command_name.clone()))
                    .or_default() += 1;
            }
        }
        let mut rows: Vec<CommandUsageRow> = buckets
            .into_iter()
            .map(|((date, command), count)| CommandUsageRow {
                date,
                command,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.command.cmp(&b.command)));
        rows
    })
}

pub async fn plans(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<PlanUsageRow>>> {
    build_by_user(&state, &raw, "plans", |corpus, dev, params| {
        let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for event in corpus.plan_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                *buckets.entry(envelope.event_date).or_default() += 1;
            }
        }
        let mut rows: Vec<PlanUsageRow> = buckets
            .into_iter()
            .map(|(date, plans_created)| PlanUsageRow {
                date,
                plans_created,
            })
            .collect();
        rows.reverse();
        rows
    })
}

pub async fn ask_mode(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ByUserResponse<AskModeRow>>> {
    build_by_user(&state, &raw, "ask-mode", |corpus, dev, params| {
        let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for event in corpus.ask_mode_events() {
            let envelope = &event.envelope;
            if envelope.user_id == dev.user_id
                && envelope.event_date >= params.start_date
                && envelope.event_date <= params.end_date
            {
                *buckets.entry(envelope.event_date).or_default() += 1;
            }
        }
        let mut rows: Vec<AskModeRow> = buckets
            .into_iter()
            .map(|(date, asks)| AskModeRow { date, asks })
            .collect();
        rows.reverse();
        rows
    })
}
