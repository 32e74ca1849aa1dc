//! Issue generation
//!
//! Issues arrive per repository at the seed-configured weekly rate. Authors
//! come from the owning teams, about 30% of issues link to an existing PR in
//! the repository, and the majority close within a few days.

use chrono::Duration;

use codetel_shared::{Issue, IssueState};

use crate::error::Result;
use crate::store::CorpusData;

use super::GenCtx;

pub(super) fn generate(ctx: &mut GenCtx<'_>, data: &mut CorpusData) -> Result<usize> {
    let mut added = 0;
    let weeks = f64::from(ctx.config.days) / 7.0;
    let repositories = ctx.seed.repositories.clone();
    let days = ctx.days.clone();

    for repo in &repositories {
        let authors = ctx.seed.developers_for_repo(repo);
        if authors.is_empty() {
            continue;
        }
        let lambda = ctx.seed.correlations.issues_per_repo_week * weeks;
        let count = ctx.sampler.poisson_count(lambda);
        let pr_numbers: Vec<u64> = data.prs_by_repo(&repo.repo_name)
            .iter()
            .map(|p| p.number)
            .collect();

        for _ in 0..count {
            let day_idx = ctx.sampler.range_u64(0, days.len() as u64 - 1) as usize;
            let day = days[day_idx];
            let author_idx = ctx.sampler.range_u64(0, authors.len() as u64 - 1) as usize;
            let author = authors[author_idx];
            let created_at = ctx.sampler.working_timestamp(day, &author.working_hours);

            let closed = ctx.sampler.chance(0.6);
            let closed_at = closed.then(|| {
                created_at
                    + Duration::minutes(
                        (ctx.sampler.lognormal(36.0, 0.9).clamp(0.5, 400.0) * 60.0) as i64,
                    )
            });

            let linked_pr_number = (!pr_numbers.is_empty() && ctx.sampler.chance(0.3))
                .then(|| *ctx.sampler.pick(&pr_numbers));

            let title = format!(
                "{} regression in {}",
                repo.service_type,
                repo.short_name()
            );
            data.store_issue(Issue {
                repo_name: repo.repo_name.clone(),
                number: 0,
                title,
                author_email: author.email.clone(),
                state: if closed {
                    IssueState::Closed
                } else {
                    IssueState::Open
                },
                created_at,
                closed_at,
                linked_pr_number,
            })?;
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationConfig;
    use crate::seed_loader;
    use chrono::{TimeZone, Utc};
    use codetel_shared::{RegenMode, Velocity};

    #[test]
    fn issues_are_generated_per_repo() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut config = GenerationConfig::new(RegenMode::Override, 28, Velocity::Low);
        config.anchor = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        config.rng_seed = Some(5);
        let mut ctx = crate::generator::GenCtx::new(&seed, &config, 0);
        let mut data = CorpusData::default();
        let added = generate(&mut ctx, &mut data).unwrap();
        assert!(added > 0);
        for repo in &seed.repositories {
            for issue in data.issues_by_repo(&repo.repo_name) {
                if issue.state == IssueState::Closed {
                    assert!(issue.closed_at.unwrap() > issue.created_at);
                } else {
                    assert!(issue.closed_at.is_none());
                }
            }
        }
    }
}
