//! Population-scale properties of the generation pipeline
//!
//! These tests build a corpus of well over a thousand PRs at medium velocity
//! and check the universal invariants plus the statistical contracts the
//! correlation engine must hold.

use chrono::{Datelike, TimeZone, Utc, Weekday};
use codetel_shared::{PrState, RegenMode, Velocity};
use codetel_simulator::generator::{self, GenerationConfig};
use codetel_simulator::sampling::Sampler;
use codetel_simulator::seed_loader;
use codetel_simulator::store::CorpusData;
use std::collections::{BTreeMap, HashMap};

fn big_corpus() -> CorpusData {
    let seed = seed_loader::preset("medium-team").unwrap();
    let mut config = GenerationConfig::new(RegenMode::Override, 60, Velocity::Medium);
    config.anchor = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
    config.rng_seed = Some(1234);
    let mut data = CorpusData::default();
    generator::run(&seed, &config, &mut data).unwrap();
    data
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

#[test]
fn corpus_is_large_enough_for_population_checks() {
    let data = big_corpus();
    assert!(
        data.all_prs().len() >= 1000,
        "only {} PRs generated",
        data.all_prs().len()
    );
}

#[test]
fn commit_line_decomposition_always_sums() {
    let data = big_corpus();
    for commit in data.all_commits() {
        assert_eq!(
            commit.total_lines_added,
            commit.tab_lines_added + commit.composer_lines_added + commit.non_ai_lines_added,
            "additions decomposition broken for {}",
            commit.commit_hash
        );
        assert_eq!(
            commit.total_lines_deleted,
            commit.tab_lines_deleted + commit.composer_lines_deleted + commit.non_ai_lines_deleted,
        );
        assert_eq!(commit.commit_hash.len(), 40);
        assert!(commit.commit_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[test]
fn pr_lifecycle_ordering_holds() {
    let data = big_corpus();
    for pr in data.all_prs() {
        assert!(pr.additions >= pr.initial_additions, "PR {} shrank", pr.id);
        assert!(pr.first_commit_at <= pr.created_at);
        if let Some(first_review) = pr.first_review_at {
            assert!(pr.created_at <= first_review);
            if let Some(merged) = pr.merged_at {
                assert!(first_review <= merged);
            }
        }
        if pr.merged_at.is_some() {
            assert!(pr.first_review_at.is_some());
        }
        assert!(pr.coding_lead_time_hours >= 0.0);
        assert!(pr.pickup_time_hours >= 0.0);
        assert!(pr.review_lead_time_hours >= 0.0);
        if pr.is_reverted {
            assert_eq!(pr.state, PrState::Merged, "reverted PR {} is not merged", pr.id);
        }
        if pr.has_hotfix_followup {
            assert_eq!(pr.state, PrState::Merged);
        }
    }
}

#[test]
fn commit_back_pointers_and_review_references_resolve() {
    let data = big_corpus();
    for pr in data.all_prs() {
        for hash in &pr.commit_hashes {
            let commit = data.commit_by_hash(hash).expect("PR commit exists");
            assert_eq!(commit.pr_number, Some(pr.number));
            assert_eq!(commit.repo_name, pr.repo_name);
        }
    }
    for review in data.all_reviews() {
        let pr = data.pr_by_id(review.pr_id).expect("review PR exists");
        assert_eq!(pr.repo_name, review.repo_name);
        assert_eq!(pr.number, review.pr_number);
    }
}

#[test]
fn pr_numbers_are_strictly_increasing_per_repo() {
    let data = big_corpus();
    let mut by_repo: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for pr in data.all_prs() {
        by_repo.entry(pr.repo_name.as_str()).or_default().push(pr.number);
    }
    for (repo, numbers) in by_repo {
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), numbers.len(), "duplicate PR number in {}", repo);
        assert_eq!(*sorted.first().unwrap(), 1, "{} does not start at 1", repo);
        assert_eq!(
            *sorted.last().unwrap() as usize,
            sorted.len(),
            "{} has gaps in its allocation",
            repo
        );
    }
}

#[test]
fn seniority_correlates_with_acceptance_rate() {
    let data = big_corpus();
    let (ranks, rates): (Vec<f64>, Vec<f64>) = data
        .list_developers()
        .iter()
        .map(|d| (f64::from(d.seniority.rank()), d.acceptance_rate))
        .unzip();
    let r = pearson(&ranks, &rates);
    assert!(r > 0.5, "seniority/acceptance Pearson {} <= 0.5", r);
}

#[test]
fn ai_ratio_correlates_with_iterations_and_review_density() {
    let data = big_corpus();
    let prs = data.all_prs();
    let ai: Vec<f64> = prs.iter().map(|pr| pr.ai_ratio()).collect();
    let iterations: Vec<f64> = prs.iter().map(|pr| f64::from(pr.iterations)).collect();
    let density: Vec<f64> = prs.iter().map(|pr| pr.review_density).collect();

    let r_iter = pearson(&ai, &iterations);
    assert!(r_iter > 0.3, "ai/iterations Pearson {} <= 0.3", r_iter);

    let r_density = pearson(&ai, &density);
    assert!(r_density > 0.3, "ai/review-density Pearson {} <= 0.3", r_density);
}

#[test]
fn high_ai_prs_revert_more_often() {
    let data = big_corpus();
    let mut merged: Vec<(f64, bool)> = data
        .all_prs()
        .iter()
        .filter(|pr| pr.state == PrState::Merged)
        .map(|pr| (pr.ai_ratio(), pr.is_reverted))
        .collect();
    merged.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let third = merged.len() / 3;
    let low = &merged[..third];
    let high = &merged[merged.len() - third..];
    let p_low = low.iter().filter(|(_, r)| *r).count() as f64 / low.len() as f64;
    let p_high = high.iter().filter(|(_, r)| *r).count() as f64 / high.len() as f64;

    // One-sided two-proportion z-test at 95%.
    let pooled = (p_low * low.len() as f64 + p_high * high.len() as f64)
        / (low.len() + high.len()) as f64;
    let se = (pooled * (1.0 - pooled) * (1.0 / low.len() as f64 + 1.0 / high.len() as f64)).sqrt();
    let z = (p_high - p_low) / se;
    assert!(
        z > 1.645,
        "revert separation not significant: p_low {} p_high {} z {}",
        p_low,
        p_high,
        z
    );

    // Outcomes must stay stochastic in both arms.
    assert!(p_high < 1.0, "high-AI PRs deterministically revert");
    assert!(p_low > 0.0 || merged.len() < 200, "low-AI PRs never revert");
}

#[test]
fn commits_respect_working_hours_and_weekends() {
    let data = big_corpus();
    let seed = seed_loader::preset("medium-team").unwrap();
    let bands: HashMap<&str, &codetel_shared::WorkingHours> = seed
        .developers
        .iter()
        .map(|d| (d.user_id.as_str(), &d.working_hours))
        .collect();

    let total = data.all_commits().len();
    assert!(total > 2000, "corpus too small: {} commits", total);

    let mut in_band = 0;
    let mut weekend = 0;
    for commit in data.all_commits() {
        let band = bands[commit.user_id.as_str()];
        if Sampler::in_working_band(commit.commit_ts, band) {
            in_band += 1;
        }
        let local = commit.commit_ts
            + chrono::Duration::hours(i64::from(band.timezone_offset_hours));
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            weekend += 1;
        }
    }

    let in_band_share = in_band as f64 / total as f64;
    let weekend_share = weekend as f64 / total as f64;
    assert!(
        in_band_share >= 0.90,
        "only {:.1}% of commits in band",
        in_band_share * 100.0
    );
    assert!(
        weekend_share < 0.05,
        "weekend share {:.1}% too high",
        weekend_share * 100.0
    );
}

#[test]
fn override_regeneration_is_byte_identical() {
    let seed = seed_loader::preset("small-team").unwrap();
    let mut config = GenerationConfig::new(RegenMode::Override, 21, Velocity::Low);
    config.anchor = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
    config.rng_seed = Some(99);

    let mut first = CorpusData::default();
    let mut second = CorpusData::default();
    generator::run(&seed, &config, &mut first).unwrap();
    generator::run(&seed, &config, &mut second).unwrap();

    assert_eq!(first.all_commits(), second.all_commits());
    assert_eq!(first.all_prs(), second.all_prs());
    assert_eq!(first.all_reviews(), second.all_reviews());
    assert_eq!(first.model_usage_events(), second.model_usage_events());
    assert_eq!(first.file_extension_events(), second.file_extension_events());
    assert_eq!(first.mcp_events(), second.mcp_events());
    assert_eq!(first.plan_events(), second.plan_events());
}

#[test]
fn append_after_override_preserves_and_extends() {
    let seed = seed_loader::preset("small-team").unwrap();
    let mut config = GenerationConfig::new(RegenMode::Override, 14, Velocity::Low);
    config.anchor = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
    config.rng_seed = Some(7);

    let mut data = CorpusData::default();
    generator::run(&seed, &config, &mut data).unwrap();
    let commits_before = data.all_commits().len();
    let max_pr_id_before = data.all_prs().iter().map(|p| p.id).max().unwrap_or(0);

    let mut append = GenerationConfig::new(RegenMode::Append, 7, Velocity::Low);
    append.anchor = Utc.with_ymd_and_hms(2025, 6, 9, 12, 0, 0).unwrap();
    append.rng_seed = Some(8);
    let report = generator::run(&seed, &append, &mut data).unwrap();

    assert!(report.commits_added > 0);
    assert_eq!(data.all_commits().len(), commits_before + report.commits_added);
    // ID counters persist across appends: new PRs continue the sequence.
    let new_min_id = data
        .all_prs()
        .iter()
        .filter(|p| p.id > max_pr_id_before)
        .map(|p| p.id)
        .min();
    assert_eq!(new_min_id, Some(max_pr_id_before + 1));
}
