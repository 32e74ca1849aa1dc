//! Corpus generation pipeline
//!
//! One deterministic pass over the simulation window:
//!
//! 1. developer load
//! 2. commit stream (Poisson arrivals per developer-day)
//! 3. session grouping into PR envelopes
//! 4. quality outcomes on merged PRs
//! 5. insertion + review generation
//! 6. issue generation
//! 7. feature-event streams
//!
//! The pipeline writes into a staged `CorpusData` side buffer; the caller
//! swaps it into the store only on success, so a failed run never leaves a
//! torn corpus behind. Identical (seed, rng_seed, anchor) inputs replay an
//! identical corpus.

mod commits;
mod events;
mod issues;
mod quality;
mod reviews;
mod sessions;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info};

use codetel_shared::{DeveloperProfile, DeveloperRecord, RegenMode, Seed, Velocity};

use crate::error::Result;
use crate::sampling::Sampler;
use crate::store::CorpusData;

pub use commits::RawCommit;

/// Share of the velocity event budget that lands as commits; the rest is
/// spread over the feature-event streams.
const COMMIT_EVENT_SHARE: f64 = 0.08;

/// Fully resolved generation parameters
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub mode: RegenMode,
    pub days: u32,
    pub velocity: Velocity,
    /// 0 = all seed developers
    pub developers: u32,
    /// 0 = unlimited
    pub max_commits: u64,
    pub rng_seed: Option<u64>,
    /// End of the simulation window; stamped from the wall clock by the
    /// admin plane, pinned by tests
    pub anchor: DateTime<Utc>,
}

impl GenerationConfig {
    pub fn new(mode: RegenMode, days: u32, velocity: Velocity) -> Self {
        Self {
            mode,
            days,
            velocity,
            developers: 0,
            max_commits: 0,
            rng_seed: None,
            anchor: Utc::now(),
        }
    }
}

/// Per-entity deltas of one generation pass
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub developers: usize,
    pub commits_added: usize,
    pub prs_added: usize,
    pub reviews_added: usize,
    pub issues_added: usize,
    pub feature_events_added: usize,
}

/// Mutable context threaded through the pipeline stages
pub(crate) struct GenCtx<'a> {
    pub seed: &'a Seed,
    pub config: &'a GenerationConfig,
    pub sampler: Sampler,
    /// Developers participating in this run, in seed order
    pub developers: Vec<&'a DeveloperProfile>,
    /// Sum of activity multipliers over participating developers
    pub activity_total: f64,
    /// Days of the simulation window, oldest first
    pub days: Vec<NaiveDate>,
}

impl<'a> GenCtx<'a> {
    /// `stream_offset` is the number of commits already in the target buffer.
    /// It is mixed into the RNG seed so an append pass never replays the
    /// hash stream of the pass it extends; an override pass starts from an
    /// empty buffer and stays byte-identical across replays.
    fn new(seed: &'a Seed, config: &'a GenerationConfig, stream_offset: u64) -> Self {
        let rng_seed = config.rng_seed.unwrap_or_else(|| seed.stable_hash())
            ^ stream_offset.wrapping_mul(0x9E3779B97F4A7C15);
        let limit = if config.developers == 0 {
            seed.developers.len()
        } else {
            (config.developers as usize).min(seed.developers.len())
        };
        let developers: Vec<&DeveloperProfile> = seed.developers.iter().take(limit).collect();
        let activity_total: f64 = developers
            .iter()
            .map(|d| d.activity_level.multiplier())
            .sum();
        let end_day = config.anchor.date_naive();
        let days: Vec<NaiveDate> = (0..config.days)
            .map(|i| end_day - Duration::days(i64::from(config.days - 1 - i)))
            .collect();
        Self {
            seed,
            config,
            sampler: Sampler::from_seed(rng_seed),
            developers,
            activity_total,
            days,
        }
    }

    /// Expected commits for one developer-day before the day-weight clip
    pub fn commit_rate(&self, dev: &DeveloperProfile) -> f64 {
        if self.activity_total == 0.0 {
            return 0.0;
        }
        let total_per_day = self.config.velocity.events_per_hour() * 24.0 * COMMIT_EVENT_SHARE;
        total_per_day * dev.activity_level.multiplier() / self.activity_total
    }

    /// Expected feature events for one developer-day before stream split
    pub fn feature_rate(&self, dev: &DeveloperProfile) -> f64 {
        if self.activity_total == 0.0 {
            return 0.0;
        }
        let total_per_day =
            self.config.velocity.events_per_hour() * 24.0 * (1.0 - COMMIT_EVENT_SHARE);
        total_per_day * dev.activity_level.multiplier() / self.activity_total
    }
}

/// Run the full pipeline against a staged corpus buffer.
///
/// Append runs extend whatever the buffer already holds; the buffer for an
/// override run starts empty, so ID counters restart from one and the
/// resulting corpus is byte-identical across replays.
pub fn run(seed: &Seed, config: &GenerationConfig, data: &mut CorpusData) -> Result<GenerationReport> {
    let mut report = GenerationReport::default();
    let mut ctx = GenCtx::new(seed, config, data.all_commits().len() as u64);

    info!(
        days = config.days,
        velocity = ?config.velocity,
        developers = ctx.developers.len(),
        mode = ?config.mode,
        "starting corpus generation"
    );

    // Stage 1: developer load
    let records: Vec<DeveloperRecord> = ctx
        .developers
        .iter()
        .map(|d| DeveloperRecord {
            user_id: d.user_id.clone(),
            email: d.email.clone(),
            name: d.name.clone(),
            org: d.org.clone(),
            division: d.division.clone(),
            team: d.team.clone(),
            region: d.region.clone(),
            seniority: d.seniority,
            activity_level: d.activity_level,
            acceptance_rate: d.acceptance_rate,
            chat_vs_code_ratio: d.chat_vs_code_ratio,
        })
        .collect();
    report.developers = records.len();
    data.load_developers(records);
    data.load_repositories(seed.repositories.clone());

    if config.days == 0 {
        // Documented no-op: deltas stay zero.
        return Ok(report);
    }

    // Stage 2: raw commit stream
    let raw_commits = commits::generate_stream(&mut ctx, data.all_commits().len() as u64)?;
    debug!(commits = raw_commits.len(), "raw commit stream generated");

    // Stage 3: session grouping into PR envelopes
    let mut drafts = sessions::group_into_sessions(&mut ctx, raw_commits);

    // Stage 4: quality outcomes on merged envelopes
    quality::apply_outcomes(&mut ctx, &mut drafts);

    // Stage 5: insertion and reviews
    for draft in drafts {
        let commit_count = draft.commits.len();
        let hashes: Vec<String> = draft.commits.iter().map(|c| c.commit_hash.clone()).collect();
        for commit in draft.commits {
            data.add_commit(commit)?;
        }
        report.commits_added += commit_count;
        if let Some(pr) = draft.pr {
            let pr_id = data.add_pr(pr)?;
            let inserted = data
                .pr_by_id(pr_id)
                .ok_or_else(|| crate::error::SimulatorError::internal("inserted PR vanished"))?
                .clone();
            data.link_commits_to_pr(&hashes, inserted.number);
            report.prs_added += 1;
            let reviews = reviews::generate_for_pr(&mut ctx, &inserted);
            for review in reviews {
                data.store_review(review)?;
                report.reviews_added += 1;
            }
        }
    }

    // Stage 6: issues
    report.issues_added = issues::generate(&mut ctx, data)?;

    // Stage 7: feature-event streams
    report.feature_events_added = events::generate(&mut ctx, data);

    info!(
        commits = report.commits_added,
        prs = report.prs_added,
        reviews = report.reviews_added,
        issues = report.issues_added,
        feature_events = report.feature_events_added,
        "corpus generation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_loader;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn config(days: u32) -> GenerationConfig {
        let mut config = GenerationConfig::new(RegenMode::Override, days, Velocity::Low);
        config.anchor = anchor();
        config.rng_seed = Some(42);
        config
    }

    #[test]
    fn zero_days_is_a_no_op() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut data = CorpusData::default();
        let report = run(&seed, &config(0), &mut data).unwrap();
        assert_eq!(report.commits_added, 0);
        assert_eq!(report.prs_added, 0);
        assert_eq!(data.all_commits().len(), 0);
        // the developer snapshot still loads
        assert_eq!(data.list_developers().len(), 5);
    }

    #[test]
    fn generation_produces_a_populated_corpus() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut data = CorpusData::default();
        let report = run(&seed, &config(14), &mut data).unwrap();
        assert!(report.commits_added > 0, "no commits generated");
        assert!(report.prs_added > 0, "no PRs generated");
        assert!(report.feature_events_added > 0, "no feature events generated");
        assert_eq!(data.all_commits().len(), report.commits_added);
        assert_eq!(data.all_prs().len(), report.prs_added);
    }

    #[test]
    fn identical_inputs_replay_an_identical_corpus() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut first = CorpusData::default();
        let mut second = CorpusData::default();
        run(&seed, &config(10), &mut first).unwrap();
        run(&seed, &config(10), &mut second).unwrap();
        assert_eq!(first.all_commits(), second.all_commits());
        assert_eq!(first.all_prs(), second.all_prs());
        assert_eq!(first.all_reviews(), second.all_reviews());
        assert_eq!(first.model_usage_events(), second.model_usage_events());
    }

    #[test]
    fn max_commits_caps_the_stream() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut capped = config(14);
        capped.max_commits = 10;
        let mut data = CorpusData::default();
        let report = run(&seed, &capped, &mut data).unwrap();
        assert!(report.commits_added <= 10);
    }

    #[test]
    fn developer_limit_restricts_participants() {
        let seed = seed_loader::preset("medium-team").unwrap();
        let mut limited = config(7);
        limited.developers = 3;
        let mut data = CorpusData::default();
        run(&seed, &limited, &mut data).unwrap();
        assert_eq!(data.list_developers().len(), 3);
        let authors: std::collections::BTreeSet<&str> = data
            .all_commits()
            .iter()
            .map(|c| c.user_id.as_str())
            .collect();
        assert!(authors.len() <= 3);
    }
}
