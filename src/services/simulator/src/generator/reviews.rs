//! Review generation
//!
//! Every PR that reached first review gets 1..N review submissions. The
//! iteration count drawn at PR materialization drives how many rounds there
//! are; the PR's comment budget is spread across them. The final review on a
//! merged PR approves it.

use chrono::Duration;

use codetel_shared::{PullRequest, Review, ReviewComment, ReviewState};

use super::GenCtx;

/// Upper bound on materialized comment rows per review; the PR keeps the
/// full numeric comment count regardless.
const MAX_COMMENT_ROWS: usize = 8;

pub(super) fn generate_for_pr(ctx: &mut GenCtx<'_>, pr: &PullRequest) -> Vec<Review> {
    let Some(first_review_at) = pr.first_review_at else {
        return Vec::new();
    };

    let rounds = (pr.iterations.min(4).max(1)) as usize;
    let window_minutes = pr
        .merged_at
        .map(|m| (m - first_review_at).num_minutes().max(0))
        .unwrap_or(12 * 60);

    // Reviewers come from the author's team when possible.
    let author_team = ctx
        .developers
        .iter()
        .find(|d| d.user_id == pr.author_user_id)
        .map(|d| d.team.clone());
    let candidates: Vec<usize> = ctx
        .developers
        .iter()
        .enumerate()
        .filter(|(_, d)| {
            d.user_id != pr.author_user_id
                && author_team
                    .as_ref()
                    .map(|team| &d.team == team)
                    .unwrap_or(true)
        })
        .map(|(i, _)| i)
        .collect();
    let fallback: Vec<usize> = ctx
        .developers
        .iter()
        .enumerate()
        .filter(|(_, d)| d.user_id != pr.author_user_id)
        .map(|(i, _)| i)
        .collect();
    let pool = if !candidates.is_empty() {
        candidates
    } else if !fallback.is_empty() {
        fallback
    } else {
        return Vec::new();
    };

    let comments_per_round = (pr.review_comments as usize / rounds.max(1)).min(MAX_COMMENT_ROWS);

    let mut reviews = Vec::with_capacity(rounds);
    for round in 0..rounds {
        let reviewer_idx = *ctx.sampler.pick(&pool);
        let reviewer = ctx.developers[reviewer_idx];
        let offset = if rounds == 1 {
            0
        } else {
            window_minutes * round as i64 / rounds as i64
        };
        let submitted_at = first_review_at + Duration::minutes(offset);

        let is_last = round == rounds - 1;
        let state = if is_last && pr.merged_at.is_some() {
            ReviewState::Approved
        } else {
            *ctx.sampler.weighted_choice(&[
                (ReviewState::ChangesRequested, 0.45),
                (ReviewState::Commented, 0.55),
            ])
        };

        let comments: Vec<ReviewComment> = (0..comments_per_round)
            .map(|i| ReviewComment {
                body: ctx
                    .sampler
                    .pick(&ctx.seed.templates.review_comments)
                    .clone(),
                created_at: submitted_at + Duration::minutes(i as i64),
            })
            .collect();

        reviews.push(Review {
            id: 0,
            pr_id: pr.id,
            repo_name: pr.repo_name.clone(),
            pr_number: pr.number,
            reviewer_email: reviewer.email.clone(),
            state,
            body: ctx
                .sampler
                .pick(&ctx.seed.templates.review_comments)
                .clone(),
            submitted_at,
            comments,
        });
    }
    reviews
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationConfig;
    use crate::seed_loader;
    use chrono::{TimeZone, Utc};
    use codetel_shared::{PrState, RegenMode, Velocity};

    fn merged_pr() -> PullRequest {
        let created = Utc.with_ymd_and_hms(2025, 5, 5, 10, 0, 0).unwrap();
        PullRequest {
            id: 7,
            repo_name: "codetel/service-1".to_string(),
            number: 3,
            author_user_id: "user_001".to_string(),
            author_email: "a@codetel.dev".to_string(),
            title: "Harden input validation".to_string(),
            state: PrState::Merged,
            additions: 300,
            deletions: 40,
            changed_files: 6,
            initial_additions: 120,
            ai_lines_added: 150,
            ai_lines_deleted: 20,
            non_ai_lines_added: 150,
            first_commit_at: created - Duration::hours(3),
            created_at: created,
            first_review_at: Some(created + Duration::hours(2)),
            merged_at: Some(created + Duration::hours(10)),
            coding_lead_time_hours: 3.0,
            pickup_time_hours: 2.0,
            review_lead_time_hours: 8.0,
            review_comments: 9,
            iterations: 3,
            review_density: 0.03,
            rework_ratio: 1.5,
            scope_creep: 0.6,
            greenfield_index: 0.2,
            survival_rate_30d: 0.95,
            commit_hashes: vec![],
            ai_summary: String::new(),
            is_reverted: false,
            has_hotfix_followup: false,
        }
    }

    #[test]
    fn merged_pr_ends_with_an_approval() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut config = GenerationConfig::new(RegenMode::Override, 7, Velocity::Low);
        config.rng_seed = Some(3);
        let mut ctx = crate::generator::GenCtx::new(&seed, &config, 0);
        let pr = merged_pr();
        let reviews = generate_for_pr(&mut ctx, &pr);
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews.last().unwrap().state, ReviewState::Approved);
        for review in &reviews {
            assert_eq!(review.pr_id, pr.id);
            assert!(review.submitted_at >= pr.first_review_at.unwrap());
            assert!(review.submitted_at <= pr.merged_at.unwrap());
            assert_ne!(review.reviewer_email, pr.author_email);
        }
    }

    #[test]
    fn open_pr_gets_no_reviews() {
        let seed = seed_loader::preset("small-team").unwrap();
        let mut config = GenerationConfig::new(RegenMode::Override, 7, Velocity::Low);
        config.rng_seed = Some(4);
        let mut ctx = crate::generator::GenCtx::new(&seed, &config, 0);
        let mut pr = merged_pr();
        pr.state = PrState::Open;
        pr.first_review_at = None;
        pr.merged_at = None;
        assert!(generate_for_pr(&mut ctx, &pr).is_empty());
    }
}
