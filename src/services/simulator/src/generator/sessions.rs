//! Session grouping and PR materialization
//!
//! A session is a contiguous per-developer, per-repo, per-branch run of
//! commits that becomes one PR. Sessions close on an inactivity gap larger
//! than the developer's threshold, on a per-session commit cap, or on a
//! small early-close draw. Single-commit sessions sometimes land directly on
//! the default branch instead of opening a PR.

use std::collections::BTreeMap;

use chrono::Duration;

use codetel_shared::{Commit, DeveloperProfile, PrState, PullRequest, Seniority};

use super::commits::RawCommit;
use super::GenCtx;

/// Commits plus the PR envelope they roll up into (none for direct pushes)
pub(super) struct SessionDraft {
    pub commits: Vec<Commit>,
    pub pr: Option<PullRequest>,
}

fn session_cap(ctx: &mut GenCtx<'_>, seniority: Seniority) -> u64 {
    match seniority {
        Seniority::Junior => ctx.sampler.range_u64(2, 5),
        Seniority::Mid => ctx.sampler.range_u64(3, 8),
        Seniority::Senior => ctx.sampler.range_u64(5, 12),
    }
}

pub(super) fn group_into_sessions(
    ctx: &mut GenCtx<'_>,
    stream: Vec<RawCommit>,
) -> Vec<SessionDraft> {
    // BTreeMap keeps the walk order deterministic across runs.
    let mut by_dev_repo: BTreeMap<(usize, String), Vec<RawCommit>> = BTreeMap::new();
    for commit in stream {
        by_dev_repo
            .entry((commit.dev_idx, commit.repo_name.clone()))
            .or_default()
            .push(commit);
    }

    // Per-developer inactivity threshold, 15-60 minutes, sampled once.
    let thresholds: Vec<i64> = (0..ctx.developers.len())
        .map(|_| ctx.sampler.range_u64(15, 60) as i64)
        .collect();
    let mut branch_counters: Vec<u64> = vec![0; ctx.developers.len()];

    let mut drafts = Vec::new();
    for ((dev_idx, repo_name), mut commits) in by_dev_repo {
        commits.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.commit_hash.cmp(&b.commit_hash)));
        let dev = ctx.developers[dev_idx];
        let threshold = Duration::minutes(thresholds[dev_idx]);

        let mut session: Vec<RawCommit> = Vec::new();
        let mut cap = session_cap(ctx, dev.seniority);
        for commit in commits {
            let split = match session.last() {
                Some(last) => {
                    commit.ts - last.ts > threshold
                        || session.len() as u64 >= cap
                        || ctx.sampler.chance(0.05)
                }
                None => false,
            };
            if split {
                drafts.push(close_session(
                    ctx,
                    dev,
                    dev_idx,
                    &repo_name,
                    std::mem::take(&mut session),
                    &mut branch_counters,
                ));
                cap = session_cap(ctx, dev.seniority);
            }
            session.push(commit);
        }
        if !session.is_empty() {
            drafts.push(close_session(ctx, dev, dev_idx, &repo_name, session, &mut branch_counters));
        }
    }

    // Chronological insertion keeps per-repo PR numbers in commit-time order.
    drafts.sort_by_key(|draft| {
        draft
            .pr
            .as_ref()
            .map(|p| p.created_at)
            .or_else(|| draft.commits.first().map(|c| c.commit_ts))
    });
    drafts
}

fn close_session(
    ctx: &mut GenCtx<'_>,
    dev: &DeveloperProfile,
    dev_idx: usize,
    repo_name: &str,
    session: Vec<RawCommit>,
    branch_counters: &mut [u64],
) -> SessionDraft {
    let default_branch = ctx
        .seed
        .repositories
        .iter()
        .find(|r| r.repo_name == repo_name)
        .map(|r| r.default_branch.clone())
        .unwrap_or_else(|| "main".to_string());

    if session.is_empty() {
        return SessionDraft {
            commits: Vec::new(),
            pr: None,
        };
    }

    // Lone commits sometimes go straight to the default branch.
    let direct_push = session.len() == 1 && ctx.sampler.chance(0.45);
    let branch = if direct_push {
        default_branch.clone()
    } else {
        branch_counters[dev_idx] += 1;
        format!("feature/{}-{}", dev.user_id, branch_counters[dev_idx])
    };

    let commits: Vec<Commit> = session
        .iter()
        .map(|raw| Commit {
            commit_hash: raw.commit_hash.clone(),
            user_id: dev.user_id.clone(),
            user_email: dev.email.clone(),
            repo_name: repo_name.to_string(),
            branch: branch.clone(),
            is_primary_branch: direct_push,
            total_lines_added: raw.total_added,
            total_lines_deleted: raw.total_deleted,
            tab_lines_added: raw.tab_added,
            tab_lines_deleted: raw.tab_deleted,
            composer_lines_added: raw.composer_added,
            composer_lines_deleted: raw.composer_deleted,
            non_ai_lines_added: raw.non_ai_added,
            non_ai_lines_deleted: raw.non_ai_deleted,
            message: raw.message.clone(),
            commit_ts: raw.ts,
            created_at: raw.ts,
            pr_number: None,
        })
        .collect();

    if direct_push {
        return SessionDraft { commits, pr: None };
    }

    let pr = materialize_pr(ctx, dev, repo_name, &session);
    SessionDraft {
        commits,
        pr: Some(pr),
    }
}

fn materialize_pr(
    ctx: &mut GenCtx<'_>,
    dev: &DeveloperProfile,
    repo_name: &str,
    session: &[RawCommit],
) -> PullRequest {
    let correlations = &ctx.seed.correlations;

    let additions: u64 = session.iter().map(|c| c.total_added).sum();
    let deletions: u64 = session.iter().map(|c| c.total_deleted).sum();
    let ai_added: u64 = session.iter().map(|c| c.ai_added()).sum();
    let ai_deleted: u64 = session
        .iter()
        .map(|c| c.tab_deleted + c.composer_deleted)
        .sum();
    let initial_additions = session.first().map(|c| c.total_added).unwrap_or(0);
    let ai_ratio = if additions == 0 {
        0.0
    } else {
        ai_added as f64 / additions as f64
    };

    let first_commit_at = session.first().map(|c| c.ts).expect("non-empty session");
    let last_commit_at = session.last().map(|c| c.ts).expect("non-empty session");
    let created_at = last_commit_at + Duration::minutes(ctx.sampler.range_u64(5, 90) as i64);
    let coding_lead_time_hours =
        (created_at - first_commit_at).num_minutes().max(0) as f64 / 60.0;

    let changed_files = ctx
        .sampler
        .lognormal(dev.pr_behavior.avg_files_per_pr.max(1.0), 0.5)
        .round()
        .clamp(1.0, 120.0) as u32;

    // Bigger PRs take longer to pick up and to land.
    let size_factor = (additions.max(1) as f64 / 150.0)
        .powf(correlations.size_cycle_time_exponent)
        .clamp(0.25, 6.0);

    let state = *ctx.sampler.weighted_choice(&[
        (PrState::Merged, 0.78),
        (PrState::Open, 0.13),
        (PrState::Closed, 0.09),
    ]);

    // More AI-heavy PRs go through more review iterations and denser review
    // commentary.
    let iterations = 1 + ctx
        .sampler
        .poisson_count(correlations.ai_iteration_gain * ai_ratio) as u32;
    let density_base = 0.012 * (1.0 + correlations.ai_review_density_gain * ai_ratio);
    let review_comments = ((additions as f64 * density_base * ctx.sampler.uniform(0.7, 1.3))
        .round() as u32)
        .min(400);
    let review_density = if additions == 0 {
        0.0
    } else {
        f64::from(review_comments) / additions as f64
    };

    let (first_review_at, merged_at, pickup_time_hours, review_lead_time_hours) = match state {
        PrState::Open => (None, None, 0.0, 0.0),
        PrState::Closed | PrState::Merged => {
            let pickup_hours = ctx.sampler.lognormal(1.5 * size_factor, 0.8).clamp(0.05, 96.0);
            let first_review = created_at
                + Duration::minutes((pickup_hours * 60.0) as i64);
            if state == PrState::Merged {
                let review_lead =
                    ctx.sampler.lognormal(4.0 * size_factor * (1.0 + 0.25 * f64::from(iterations - 1)), 0.7)
                        .clamp(0.1, 240.0);
                let merged = first_review + Duration::minutes((review_lead * 60.0) as i64);
                (Some(first_review), Some(merged), pickup_hours, review_lead)
            } else {
                (Some(first_review), None, pickup_hours, 0.0)
            }
        }
    };

    let rework_ratio = (additions.saturating_sub(initial_additions)) as f64
        / initial_additions.max(1) as f64;
    let scope_creep = if additions == 0 {
        0.0
    } else {
        (additions - initial_additions) as f64 / additions as f64
    };

    let repo_age_days = ctx
        .seed
        .repositories
        .iter()
        .find(|r| r.repo_name == repo_name)
        .and_then(|r| r.age_days)
        .unwrap_or(365);
    let greenfield_index = (30.0 / (30.0 + f64::from(repo_age_days))
        + ctx.sampler.uniform(0.0, 0.25))
    .clamp(0.0, 1.0);

    let title = ctx.sampler.pick(&ctx.seed.templates.pr_titles).clone();
    let ai_summary = format!(
        "{}: {} files changed across {} commits, {} lines added",
        title,
        changed_files,
        session.len(),
        additions
    );

    PullRequest {
        id: 0,
        repo_name: repo_name.to_string(),
        number: 0,
        author_user_id: dev.user_id.clone(),
        author_email: dev.email.clone(),
        title,
        state,
        additions,
        deletions,
        changed_files,
        initial_additions,
        ai_lines_added: ai_added,
        ai_lines_deleted: ai_deleted,
        non_ai_lines_added: additions - ai_added,
        first_commit_at,
        created_at,
        first_review_at,
        merged_at,
        coding_lead_time_hours,
        pickup_time_hours,
        review_lead_time_hours,
        review_comments,
        iterations,
        review_density,
        rework_ratio,
        scope_creep,
        greenfield_index,
        survival_rate_30d: 1.0,
        commit_hashes: session.iter().map(|c| c.commit_hash.clone()).collect(),
        ai_summary,
        is_reverted: false,
        has_hotfix_followup: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{commits, GenerationConfig};
    use crate::seed_loader;
    use chrono::{TimeZone, Utc};
    use codetel_shared::{RegenMode, Velocity};

    #[test]
    fn sessions_respect_lifecycle_ordering() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut config = GenerationConfig::new(RegenMode::Override, 10, Velocity::Low);
        config.anchor = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        config.rng_seed = Some(9);
        let mut ctx = super::super::GenCtx::new(&seed, &config, 0);
        let stream = commits::generate_stream(&mut ctx, 0).unwrap();
        let drafts = group_into_sessions(&mut ctx, stream);

        assert!(!drafts.is_empty());
        for draft in &drafts {
            if let Some(pr) = &draft.pr {
                assert!(pr.additions >= pr.initial_additions);
                assert!(pr.first_commit_at <= pr.created_at);
                assert_eq!(pr.commit_hashes.len(), draft.commits.len());
                if let Some(first_review) = pr.first_review_at {
                    assert!(pr.created_at <= first_review);
                    if let Some(merged) = pr.merged_at {
                        assert!(first_review <= merged);
                    }
                }
                assert!(pr.coding_lead_time_hours >= 0.0);
                assert!(pr.pickup_time_hours >= 0.0);
                assert!(pr.review_lead_time_hours >= 0.0);
            } else {
                assert_eq!(draft.commits.len(), 1);
                assert!(draft.commits[0].is_primary_branch);
            }
        }
    }

    #[test]
    fn session_caps_follow_seniority() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut config = GenerationConfig::new(RegenMode::Override, 20, Velocity::Medium);
        config.anchor = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        config.rng_seed = Some(10);
        let mut ctx = super::super::GenCtx::new(&seed, &config, 0);
        let stream = commits::generate_stream(&mut ctx, 0).unwrap();
        let drafts = group_into_sessions(&mut ctx, stream);
        for draft in &drafts {
            assert!(draft.commits.len() <= 12, "session exceeded the hard cap");
        }
    }
}
