//! Team-scoped analytics endpoints
//!
//! Day-bucketed aggregations over the commit stream and the feature-event
//! streams. Grouped streams rank the top entries per day (top-5 for file
//! extensions, top-10 elsewhere); the leaderboard carries two parallel
//! rankings, tab-based and composer-based.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use codetel_shared::{
    AskModeRow, ClientVersionRow, CommandUsageRow, DailyEditsRow, DauRow, EventEnvelope,
    FileExtensionRow, LeaderboardEntry, LeaderboardResponse, McpUsageRow, ModelUsageRow,
    PaginatedResponse, PlanUsageRow,
};

use crate::error::Result;
use crate::query::{self, ParseOptions, QueryParams};
use crate::state::AppState;
use crate::store::CorpusData;

const TOP_K: usize = 10;
const TOP_K_EXTENSIONS: usize = 5;

fn in_range(envelope: &EventEnvelope, params: &QueryParams) -> bool {
    envelope.event_date >= params.start_date && envelope.event_date <= params.end_date
}

/// Composer suggestions are modeled as accepted on issuance, so both the
/// suggested and accepted columns carry the same sum.
fn edits_rows<F>(corpus: &CorpusData, params: &QueryParams, line_count: F) -> Vec<DailyEditsRow>
where
    F: Fn(&codetel_shared::Commit) -> u64,
{
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for commit in corpus.commits_by_time_range(params.from, params.to) {
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
) -> Result<Json<PaginatedResponse<DailyEditsRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let rows = edits_rows(&corpus, &params, |c| c.composer_lines_added);
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn tabs(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<DailyEditsRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let rows = edits_rows(&corpus, &params, |c| c.tab_lines_added);
    Ok(Json(query::paginate(rows, &params)))
}

/// All feature-event envelopes, every stream
fn all_envelopes<'a>(corpus: &'a CorpusData) -> Vec<&'a EventEnvelope> {
    let mut envelopes: Vec<&EventEnvelope> = Vec::new();
    envelopes.extend(corpus.model_usage_events().iter().map(|e| &e.envelope));
    envelopes.extend(corpus.client_version_events().iter().map(|e| &e.envelope));
    envelopes.extend(corpus.file_extension_events().iter().map(|e| &e.envelope));
    envelopes.extend(corpus.mcp_events().iter().map(|e| &e.envelope));
    envelopes.extend(corpus.command_events().iter().map(|e| &e.envelope));
    envelopes.extend(corpus.plan_events().iter().map(|e| &e.envelope));
    envelopes.extend(corpus.ask_mode_events().iter().map(|e| &e.envelope));
    envelopes
}

pub async fn dau(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<DauRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    for envelope in all_envelopes(&corpus) {
        if in_range(envelope, &params) {
            buckets
                .entry(envelope.event_date)
                .or_default()
                .insert(envelope.user_id.as_str());
        }
    }
    let mut rows: Vec<DauRow> = buckets
        .into_iter()
        .map(|(date, users)| DauRow {
            date,
            active_users: users.len(),
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(query::paginate(rows, &params)))
}

/// Rank the top `k` secondary keys per day by count, newest day first
fn top_k_per_day<K: Ord + Clone>(
    mut buckets: BTreeMap<NaiveDate, BTreeMap<K, u64>>,
    k: usize,
) -> Vec<(NaiveDate, K, u64)> {
    let mut rows = Vec::new();
    let mut dates: Vec<NaiveDate> = buckets.keys().cloned().collect();
    dates.reverse();
    for date in dates {
        if let Some(by_key) = buckets.remove(&date) {
            let mut ranked: Vec<(K, u64)> = by_key.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            for (key, count) in ranked.into_iter().take(k) {
                rows.push((date, key, count));
            }
        }
    }
    rows
}

pub async fn models(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<ModelUsageRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<String, u64>> = BTreeMap::new();
    for event in corpus.model_usage_events() {
        if in_range(&event.envelope, &params) {
            *buckets
                .entry(event.envelope.event_date)
                .or_default()
                .entry(event.model_name.clone())
                .or_default() += 1;
        }
    }
    let rows: Vec<ModelUsageRow> = top_k_per_day(buckets, TOP_K)
        .into_iter()
        .map(|(date, model, count)| ModelUsageRow { date, model, count })
        .collect();
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn client_versions(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<ClientVersionRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<String, u64>> = BTreeMap::new();
    for event in corpus.client_version_events() {
        if in_range(&event.envelope, &params) {
            *buckets
                .entry(event.envelope.event_date)
                .or_default()
                .entry(event.client_version.clone())
                .or_default() += 1;
        }
    }
    let rows: Vec<ClientVersionRow> = top_k_per_day(buckets, TOP_K)
        .into_iter()
        .map(|(date, version, count)| ClientVersionRow {
            date,
            version,
            count,
        })
        .collect();
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn top_file_extensions(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<FileExtensionRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();

    #[derive(Default, Clone)]
    struct ExtAgg {
        suggested: u64,
        accepted: u64,
        count: u64,
    }

    let mut buckets: BTreeMap<NaiveDate, BTreeMap<String, ExtAgg>> = BTreeMap::new();
    for event in corpus.file_extension_events() {
        if in_range(&event.envelope, &params) {
            let agg = buckets
                .entry(event.envelope.event_date)
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
            for (extension, agg) in ranked.into_iter().take(TOP_K_EXTENSIONS) {
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
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn mcp(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<McpUsageRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<(String, String), u64>> = BTreeMap::new();
    for event in corpus.mcp_events() {
        if in_range(&event.envelope, &params) {
            *buckets
                .entry(event.envelope.event_date)
                .or_default()
                .entry((event.server_name.clone(), event.tool_name.clone()))
                .or_default() += 1;
        }
    }
    let rows: Vec<McpUsageRow> = top_k_per_day(buckets, TOP_K)
        .into_iter()
        .map(|(date, (server, tool), count)| McpUsageRow {
            date,
            server,
            tool,
            count,
        })
        .collect();
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn commands(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<CommandUsageRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<String, u64>> = BTreeMap::new();
    for event in corpus.command_events() {
        if in_range(&event.envelope, &params) {
            *buckets
                .entry(event.envelope.event_date)
                .or_default()
                .entry(event.command_name.clone())
                .or_default() += 1;
        }
    }
    let rows: Vec<CommandUsageRow> = top_k_per_day(buckets, TOP_K)
        .into_iter()
        .map(|(date, command, count)| CommandUsageRow {
            date,
            command,
            count,
        })
        .collect();
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn plans(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<PlanUsageRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for event in corpus.plan_events() {
        if in_range(&event.envelope, &params) {
            *buckets.entry(event.envelope.event_date).or_default() += 1;
        }
    }
    let mut rows: Vec<PlanUsageRow> = buckets
        .into_iter()
        .map(|(date, plans_created)| PlanUsageRow {
            date,
            plans_created,
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn ask_mode(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<AskModeRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for event in corpus.ask_mode_events() {
        if in_range(&event.envelope, &params) {
            *buckets.entry(event.envelope.event_date).or_default() += 1;
        }
    }
    let mut rows: Vec<AskModeRow> = buckets
        .into_iter()
        .map(|(date, asks)| AskModeRow { date, asks })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(query::paginate(rows, &params)))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<LeaderboardResponse>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    let corpus = state.store.read();

    #[derive(Default)]
    struct Lines {
        tab: u64,
        composer: u64,
    }

    let mut by_user: BTreeMap<String, Lines> = BTreeMap::new();
    for commit in corpus.commits_by_time_range(params.from, params.to) {
        let lines = by_user.entry(commit.user_id.clone()).or_default();
        lines.tab += commit.tab_lines_added;
        lines.composer += commit.composer_lines_added;
    }

    let build = |extract: fn(&Lines) -> u64| -> Vec<LeaderboardEntry> {
        let mut entries: Vec<(&String, u64)> = by_user
            .iter()
            .map(|(user_id, lines)| (user_id, extract(lines)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries
            .into_iter()
            .enumerate()
            .map(|(idx, (user_id, lines_added))| {
                let dev = corpus.developer_by_user_or_email(user_id);
                LeaderboardEntry {
                    rank: idx + 1,
                    user_id: user_id.clone(),
                    email: dev.map(|d| d.email.clone()).unwrap_or_default(),
                    name: dev.map(|d| d.name.clone()).unwrap_or_default(),
                    lines_added,
                }
            })
            .collect()
    };

    let tab_full = build(|l| l.tab);
    let composer_full = build(|l| l.composer);
    let total_count = tab_full.len();
    let start = (params.page - 1).saturating_mul(params.page_size);

    Ok(Json(LeaderboardResponse {
        tab_leaderboard: tab_full
            .into_iter()
            .skip(start)
            .take(params.page_size)
            .collect(),
        composer_leaderboard: composer_full
            .into_iter()
            .skip(start)
            .take(params.page_size)
            .collect(),
        total_count,
        page: params.page,
        page_size: params.page_size,
    }))
}
