//! Admin control plane
//!
//! Seed hot-swap, regeneration (append or override), corpus stats and config
//! introspection. Regenerations serialize on the admin lock and always build
//! into a staged side buffer: the corpus pointer flips only after the
//! generator succeeds, so a failed run rolls back to the prior corpus and
//! concurrent readers never observe a mid-state.

use axum::extract::{Query, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};
use validator::Validate;

use codetel_shared::{
    AdminConfigResponse, AdminStatsResponse, GenerationSummary, PresetsResponse, RegenMode,
    RegenerateRequest, RegenerateResponse, SeedFormat, SeedUploadRequest, SeedUploadResponse,
    ServerInfo, TimeseriesBucket, Velocity,
};

use crate::error::{ApiJson, Result, SimulatorError};
use crate::generator::{self, GenerationConfig};
use crate::seed_loader;
use crate::state::AppState;
use crate::store::CorpusData;

const MAX_TIMESERIES_BUCKETS: usize = 365;

pub async fn config(State(state): State<AppState>) -> Result<Json<AdminConfigResponse>> {
    let seed = state.seed();
    Ok(Json(AdminConfigResponse {
        seed: seed.summary(),
        generation: GenerationSummary {
            default_days: state.config.generation.days,
            default_velocity: state.config.generation.velocity.clone(),
            max_commits: state.config.generation.max_commits,
        },
        server: ServerInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: state.started_at,
            uptime_seconds: state.uptime_seconds(),
        },
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<AdminStatsResponse>> {
    let include_timeseries = raw
        .get("include_timeseries")
        .map(|v| v == "true")
        .unwrap_or(false);

    let corpus = state.store.read();
    let counts = corpus.stats();
    let total_feature_events = counts.total_feature_events();

    let timeseries = include_timeseries.then(|| {
        let mut buckets: std::collections::BTreeMap<chrono::NaiveDate, TimeseriesBucket> =
            std::collections::BTreeMap::new();
        for commit in corpus.all_commits() {
            let date = commit.commit_ts.date_naive();
            buckets
                .entry(date)
                .or_insert_with(|| empty_bucket(date))
                .commits += 1;
        }
        for pr in corpus.all_prs() {
            let opened = pr.created_at.date_naive();
            buckets
                .entry(opened)
                .or_insert_with(|| empty_bucket(opened))
                .prs_opened += 1;
            if let Some(merged_at) = pr.merged_at {
                let date = merged_at.date_naive();
                let bucket = buckets.entry(date).or_insert_with(|| empty_bucket(date));
                bucket.prs_merged += 1;
                // Accumulate, then divide below once counts are final.
                bucket.mean_cycle_time_hours +=
                    pr.coding_lead_time_hours + pr.pickup_time_hours + pr.review_lead_time_hours;
            }
        }
        let mut rows: Vec<TimeseriesBucket> = buckets
            .into_values()
            .map(|mut bucket| {
                if bucket.prs_merged > 0 {
                    bucket.mean_cycle_time_hours /= bucket.prs_merged as f64;
                }
                bucket
            })
            .collect();
        if rows.len() > MAX_TIMESERIES_BUCKETS {
            rows = rows.split_off(rows.len() - MAX_TIMESERIES_BUCKETS);
        }
        rows
    });

    Ok(Json(AdminStatsResponse {
        counts,
        total_feature_events,
        timeseries,
    }))
}

fn empty_bucket(date: chrono::NaiveDate) -> TimeseriesBucket {
    TimeseriesBucket {
        date,
        commits: 0,
        prs_opened: 0,
        prs_merged: 0,
        mean_cycle_time_hours: 0.0,
    }
}

pub async fn presets() -> Json<PresetsResponse> {
    Json(PresetsResponse {
        presets: seed_loader::preset_infos(),
    })
}

/// Shared by `/admin/regenerate` and the optional regeneration on seed
/// upload. Serializes on the admin lock; the generator fills a staged buffer
/// that replaces the corpus only on success.
pub fn run_regeneration(
    state: &AppState,
    request: &RegenerateRequest,
) -> Result<RegenerateResponse> {
    request
        .validate()
        .map_err(|e| SimulatorError::invalid_request(format!("regenerate: {}", e)))?;

    let _guard = state.admin_lock.lock();
    let started = Instant::now();
    let seed = state.seed();

    let mut config = GenerationConfig::new(request.mode, request.days, request.velocity);
    config.developers = request.developers;
    config.max_commits = request.max_commits;
    config.rng_seed = request.rng_seed;
    if config.days == 0 && request.mode == RegenMode::Override {
        return Err(SimulatorError::invalid_request(
            "days: must be >= 1 in override mode",
        ));
    }

    let mut staged = match request.mode {
        RegenMode::Override => CorpusData::default(),
        RegenMode::Append => state.store.stage(),
    };
    let report = generator::run(&seed, &config, &mut staged).map_err(|e| {
        warn!("regeneration failed, keeping prior corpus: {}", e);
        e
    })?;
    state.store.replace(staged);

    let after = state.store.stats();
    info!(
        mode = ?request.mode,
        commits = report.commits_added,
        prs = report.prs_added,
        "regeneration complete"
    );
    Ok(RegenerateResponse {
        status: "success".to_string(),
        mode: request.mode,
        data_cleaned: request.mode == RegenMode::Override,
        duration_ms: started.elapsed().as_millis() as u64,
        developers: report.developers,
        commits_added: report.commits_added,
        prs_added: report.prs_added,
        reviews_added: report.reviews_added,
        issues_added: report.issues_added,
        feature_events_added: report.feature_events_added,
        total_commits: after.commits,
        total_prs: after.pull_requests,
    })
}

pub async fn regenerate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<RegenerateResponse>> {
    let request: RegenerateRequest = serde_json::from_value(body)
        .map_err(|e| SimulatorError::invalid_request(format!("regenerate: {}", e)))?;
    Ok(Json(run_regeneration(&state, &request)?))
}

pub async fn upload_seed(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<SeedUploadResponse>> {
    let request: SeedUploadRequest = serde_json::from_value(body)
        .map_err(|e| SimulatorError::invalid_request(format!("seed: {}", e)))?;

    let bytes = match (&request.format, &request.data) {
        (SeedFormat::Json, value) => serde_json::to_vec(value)
            .map_err(|e| SimulatorError::invalid_request(format!("seed: {}", e)))?,
        (SeedFormat::Yaml, serde_json::Value::String(document)) => document.clone().into_bytes(),
        (SeedFormat::Csv, serde_json::Value::String(encoded)) => {
            STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                SimulatorError::invalid_request(format!("seed: base64 decode: {}", e))
            })?
        }
        _ => {
            return Err(SimulatorError::invalid_request(
                "seed: data must be a string for yaml and csv formats",
            ))
        }
    };

    let seed = seed_loader::load_from_bytes(request.format, &bytes)?;
    let summary = seed.summary();
    state.swap_seed(seed);
    info!(
        developers = summary.developers,
        repositories = summary.repositories,
        "seed swapped"
    );

    let regeneration = if request.regenerate {
        let regen_request = request.regenerate_config.clone().unwrap_or_else(|| {
            RegenerateRequest {
                mode: RegenMode::Override,
                days: state.config.generation.days,
                velocity: Velocity::parse(&state.config.generation.velocity)
                    .unwrap_or(Velocity::Medium),
                developers: 0,
                max_commits: state.config.generation.max_commits,
                rng_seed: None,
            }
        });
        Some(run_regeneration(&state, &regen_request)?)
    } else {
        None
    };

    Ok(Json(SeedUploadResponse {
        status: "success".to_string(),
        seed: summary,
        regeneration,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetel_shared::Config;

    fn state() -> AppState {
        AppState::new(Config::default(), seed_loader::preset("small-team").unwrap())
    }

    fn request(mode: RegenMode, days: u32) -> RegenerateRequest {
        RegenerateRequest {
            mode,
            days,
            velocity: Velocity::Low,
            developers: 0,
            max_commits: 0,
            rng_seed: Some(11),
        }
    }

    #[test]
    fn override_clears_and_fills() {
        let state = state();
        let response = run_regeneration(&state, &request(RegenMode::Override, 7)).unwrap();
        assert_eq!(response.status, "success");
        assert!(response.data_cleaned);
        assert!(response.commits_added > 0);
        assert_eq!(response.total_commits, response.commits_added);

        let stats = state.store.stats();
        assert_eq!(stats.commits, response.total_commits);
        assert_eq!(stats.pull_requests, response.total_prs);
    }

    #[test]
    fn append_extends_the_corpus() {
        let state = state();
        let first = run_regeneration(&state, &request(RegenMode::Override, 7)).unwrap();
        let second = run_regeneration(&state, &request(RegenMode::Append, 7)).unwrap();
        assert!(!second.data_cleaned);
        assert_eq!(
            second.total_commits,
            first.total_commits + second.commits_added
        );
    }

    #[test]
    fn append_zero_days_is_a_no_op() {
        let state = state();
        run_regeneration(&state, &request(RegenMode::Override, 7)).unwrap();
        let before = state.store.stats();
        let response = run_regeneration(&state, &request(RegenMode::Append, 0)).unwrap();
        assert_eq!(response.commits_added, 0);
        assert_eq!(response.prs_added, 0);
        assert_eq!(state.store.stats().commits, before.commits);
    }

    #[test]
    fn out_of_range_days_is_rejected() {
        let state = state();
        let err = run_regeneration(&state, &request(RegenMode::Override, 4000)).unwrap_err();
        assert_eq!(err.category(), "invalid_request");
    }

    #[test]
    fn override_is_deterministic_for_fixed_rng_seed() {
        let state = state();
        // Pin the anchor by regenerating twice quickly with the same rng
        // seed; commit timestamps derive from the anchor date, so run the
        // comparison on counts plus hashes rather than exact instants.
        let first = run_regeneration(&state, &request(RegenMode::Override, 7)).unwrap();
        let hashes_a: Vec<String> = state
            .store
            .read()
            .all_commits()
            .iter()
            .map(|c| c.commit_hash.clone())
            .collect();
        let second = run_regeneration(&state, &request(RegenMode::Override, 7)).unwrap();
        let hashes_b: Vec<String> = state
            .store
            .read()
            .all_commits()
            .iter()
            .map(|c| c.commit_hash.clone())
            .collect();
        assert_eq!(first.commits_added, second.commits_added);
        assert_eq!(hashes_a, hashes_b);
    }
}
