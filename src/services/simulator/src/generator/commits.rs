//! Commit stream generation
//!
//! For every (developer, day) in the window a Poisson count is drawn at the
//! developer's effective rate (velocity base x activity share x day weight),
//! then clipped again per commit so weekend and Friday activity stays damped.
//! Commits inside a day arrive in bursts: short gaps within a working
//! session, occasional long gaps that the session grouper will split on.

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::sampling::Sampler;

use super::GenCtx;

/// A generated commit before branch assignment and PR linkage
#[derive(Debug, Clone)]
pub struct RawCommit {
    pub dev_idx: usize,
    pub repo_name: String,
    pub commit_hash: String,
    pub message: String,
    pub ts: DateTime<Utc>,
    pub total_added: u64,
    pub total_deleted: u64,
    pub tab_added: u64,
    pub tab_deleted: u64,
    pub composer_added: u64,
    pub composer_deleted: u64,
    pub non_ai_added: u64,
    pub non_ai_deleted: u64,
}

impl RawCommit {
    pub fn ai_added(&self) -> u64 {
        self.tab_added + self.composer_added
    }
}

/// Split a line total into tab / composer / non-AI parts
fn split_lines(total: u64, ai_share: f64, chat_ratio: f64) -> (u64, u64, u64) {
    let ai_lines = (total as f64 * ai_share).round() as u64;
    let ai_lines = ai_lines.min(total);
    let composer = (ai_lines as f64 * chat_ratio).round() as u64;
    let composer = composer.min(ai_lines);
    let tab = ai_lines - composer;
    let non_ai = total - ai_lines;
    (tab, composer, non_ai)
}

pub(super) fn generate_stream(ctx: &mut GenCtx<'_>, existing: u64) -> Result<Vec<RawCommit>> {
    let mut stream = Vec::new();
    let cap = ctx.config.max_commits;
    let days = ctx.days.clone();

    'developers: for (dev_idx, dev) in ctx.developers.clone().into_iter().enumerate() {
        let repos = ctx.seed.repos_for_developer(dev);
        if repos.is_empty() {
            continue;
        }
        let base_rate = ctx.commit_rate(dev);
        // Seniority feeds the lognormal size median so bigger PRs come from
        // more senior developers.
        let size_median = dev.coding_speed.mean.max(4.0)
            * (1.0 + ctx.seed.correlations.seniority_pr_size_gain * dev.seniority.rank() as f64);
        let size_sigma = (dev.coding_speed.std / dev.coding_speed.mean.max(1.0)).clamp(0.2, 1.2);

        for day in &days {
            let lambda = base_rate * Sampler::day_weight(*day);
            let count = ctx.sampler.poisson_count(lambda);
            if count == 0 {
                continue;
            }

            let mut ts = ctx.sampler.working_timestamp(*day, &dev.working_hours);
            let mut repo = *ctx.sampler.pick(&repos);
            for _ in 0..count {
                // Second half of the working-hours clip: damped days shed
                // candidates instead of shifting them.
                if !ctx.sampler.accept_day(*day) {
                    continue;
                }
                if cap > 0 && existing + stream.len() as u64 >= cap {
                    break 'developers;
                }

                // AI share of this commit follows the developer's acceptance
                // rate with per-commit noise; composer vs tab follows the
                // chat/code ratio.
                let ai_share = (0.12 + 0.62 * dev.acceptance_rate * ctx.sampler.uniform(0.6, 1.4))
                    .clamp(0.0, 0.92);
                let total_added = ctx.sampler.lognormal(size_median, size_sigma).round() as u64;
                let total_added = total_added.clamp(1, 4000);
                let total_deleted =
                    (ctx.sampler.lognormal(size_median * 0.35, size_sigma).round() as u64).min(2500);
                let (tab_added, composer_added, non_ai_added) =
                    split_lines(total_added, ai_share, dev.chat_vs_code_ratio);
                let (tab_deleted, composer_deleted, non_ai_deleted) =
                    split_lines(total_deleted, ai_share, dev.chat_vs_code_ratio);

                stream.push(RawCommit {
                    dev_idx,
                    repo_name: repo.repo_name.clone(),
                    commit_hash: ctx.sampler.commit_hash(),
                    message: ctx
                        .sampler
                        .pick(&ctx.seed.templates.commit_messages)
                        .clone(),
                    ts,
                    total_added,
                    total_deleted,
                    tab_added,
                    tab_deleted,
                    composer_added,
                    composer_deleted,
                    non_ai_added,
                    non_ai_deleted,
                });

                // Advance inside the burst; occasionally take a long break
                // (which the session grouper treats as a boundary) and
                // sometimes hop to another owned repository.
                let gap_minutes = if ctx.sampler.chance(0.22) {
                    ctx.sampler.range_u64(90, 240)
                } else {
                    ctx.sampler.range_u64(4, 35)
                };
                ts += Duration::minutes(gap_minutes as i64);
                if ctx.sampler.chance(0.15) {
                    repo = *ctx.sampler.pick(&repos);
                }
            }
        }
    }

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_preserves_the_total() {
        for total in [0u64, 1, 17, 250, 4000] {
            for ai_share in [0.0, 0.3, 0.92] {
                for chat in [0.0, 0.4, 1.0] {
                    let (tab, composer, non_ai) = split_lines(total, ai_share, chat);
                    assert_eq!(tab + composer + non_ai, total);
                }
            }
        }
    }
}
