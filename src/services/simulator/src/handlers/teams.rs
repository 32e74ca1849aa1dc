//! Team administration endpoints
//!
//! `/teams/members` lists the seeded developer roster. `/teams/
//! daily-usage-data` aggregates the model-usage stream per developer-day.
//! `/teams/spend` and `/teams/filtered-usage-events` are intentional stubs:
//! upstream treats their aggregation rules as unimplemented, so they return
//! a live envelope with an empty item list to keep the surface stable for
//! consumers.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

use codetel_shared::{
    DailyUsageRow, PaginatedResponse, TeamMember, TeamMembersResponse, UsageKind,
};

use crate::error::Result;
use crate::query::{self, ParseOptions, QueryParams};
use crate::state::AppState;

pub async fn members(State(state): State<AppState>) -> Result<Json<TeamMembersResponse>> {
    let corpus = state.store.read();
    let team_members = corpus
        .list_developers()
        .iter()
        .map(|d| TeamMember {
            name: d.name.clone(),
            email: d.email.clone(),
            role: "member".to_string(),
        })
        .collect();
    Ok(Json(TeamMembersResponse { team_members }))
}

pub async fn daily_usage_data(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<DailyUsageRow>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::wide(), Utc::now())?;

    #[derive(Default)]
    struct Agg {
        email: String,
        total: u64,
        tab: u64,
        composer: u64,
        chat: u64,
        agent: u64,
    }

    let corpus = state.store.read();
    let mut buckets: BTreeMap<(chrono::NaiveDate, String), Agg> = BTreeMap::new();
    for event in corpus.model_usage_events() {
        let envelope = &event.envelope;
        if envelope.event_date < params.start_date || envelope.event_date > params.end_date {
            continue;
        }
        if !params.matches_user(&envelope.user_id, &envelope.email) {
            continue;
        }
        let agg = buckets
            .entry((envelope.event_date, envelope.user_id.clone()))
            .or_default();
        agg.email = envelope.email.clone();
        agg.total += 1;
        match event.usage_kind {
            UsageKind::TabShown | UsageKind::TabAccepted => agg.tab += 1,
            UsageKind::Composer => agg.composer += 1,
            UsageKind::Chat | UsageKind::CmdK => agg.chat += 1,
            UsageKind::Agent | UsageKind::Bugbot => agg.agent += 1,
        }
    }

    let mut rows: Vec<DailyUsageRow> = buckets
        .into_iter()
        .map(|((date, user_id), agg)| DailyUsageRow {
            date,
            user_id,
            email: agg.email,
            total_events: agg.total,
            tab_events: agg.tab,
            composer_events: agg.composer,
            chat_events: agg.chat,
            agent_events: agg.agent,
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.user_id.cmp(&b.user_id)));
    Ok(Json(query::paginate(rows, &params)))
}

/// Stub: validated params, live envelope, no rows
pub async fn spend(
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<serde_json::Value>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    Ok(Json(PaginatedResponse {
        items: Vec::new(),
        total_count: 0,
        page: params.page,
        page_size: params.page_size,
    }))
}

/// Stub: validated params, live envelope, no rows
pub async fn filtered_usage_events(
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedResponse<serde_json::Value>>> {
    let params = QueryParams::parse(&raw, &ParseOptions::default(), Utc::now())?;
    Ok(Json(PaginatedResponse {
        items: Vec::new(),
        total_count: 0,
        page: params.page,
        page_size: params.page_size,
    }))
}
