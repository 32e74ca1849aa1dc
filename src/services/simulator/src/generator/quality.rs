//! Quality outcomes on merged PRs
//!
//! Revert and hotfix-followup flags come from independent sigmoid-Bernoulli
//! draws over `base + a * ai_ratio + b * volatility + c * seniority_penalty`.
//! Only merged PRs carry either flag; individual outcomes stay stochastic
//! while the population-scale monotonicity contracts hold.

use codetel_shared::{DeveloperProfile, PrState, Seniority};

use super::sessions::SessionDraft;
use super::GenCtx;

/// Volatility of a developer's output size, normalized to roughly [0, 1]
fn volatility(dev: &DeveloperProfile) -> f64 {
    let speed = &dev.coding_speed;
    (speed.std / (speed.mean + speed.std).max(1.0)).clamp(0.0, 1.0)
}

/// Penalty decreasing with seniority: junior 1.0, mid 0.5, senior 0.0
fn seniority_penalty(seniority: Seniority) -> f64 {
    f64::from(2 - seniority.rank()) / 2.0
}

pub(super) fn apply_outcomes(ctx: &mut GenCtx<'_>, drafts: &mut [SessionDraft]) {
    let correlations = ctx.seed.correlations.clone();
    for draft in drafts.iter_mut() {
        let Some(pr) = draft.pr.as_mut() else { continue };
        if pr.state != PrState::Merged {
            continue;
        }
        let Some(dev) = ctx
            .developers
            .iter()
            .find(|d| d.user_id == pr.author_user_id)
        else {
            continue;
        };

        let ai_ratio = pr.ai_ratio();
        let vol = volatility(dev);
        let penalty = seniority_penalty(dev.seniority);

        let revert_score = correlations.revert_base_offset
            + correlations.ai_revert_coefficient * ai_ratio
            + correlations.volatility_revert_coefficient * vol
            + correlations.seniority_revert_penalty * penalty;
        pr.is_reverted = ctx.sampler.sigmoid_bernoulli(revert_score);

        let hotfix_score = correlations.hotfix_base_offset
            + correlations.ai_revert_coefficient * 0.8 * ai_ratio
            + correlations.volatility_revert_coefficient * vol
            + correlations.seniority_revert_penalty * 0.6 * penalty;
        pr.has_hotfix_followup = ctx.sampler.sigmoid_bernoulli(hotfix_score);

        pr.survival_rate_30d = if pr.is_reverted {
            ctx.sampler.uniform(0.15, 0.55)
        } else if pr.has_hotfix_followup {
            ctx.sampler.uniform(0.70, 0.92)
        } else {
            ctx.sampler.uniform(0.88, 1.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetel_shared::CodingSpeed;

    #[test]
    fn seniority_penalty_decreases_with_rank() {
        assert_eq!(seniority_penalty(Seniority::Junior), 1.0);
        assert_eq!(seniority_penalty(Seniority::Mid), 0.5);
        assert_eq!(seniority_penalty(Seniority::Senior), 0.0);
    }

    #[test]
    fn volatility_is_bounded() {
        let dev = DeveloperProfile {
            user_id: "user_001".to_string(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            org: "o".to_string(),
            division: String::new(),
            team: "t".to_string(),
            region: String::new(),
            seniority: Seniority::Junior,
            activity_level: codetel_shared::ActivityLevel::Medium,
            acceptance_rate: 0.5,
            pr_behavior: Default::default(),
            coding_speed: CodingSpeed {
                mean: 10.0,
                std: 90.0,
            },
            chat_vs_code_ratio: 0.3,
            working_hours: Default::default(),
        };
        let v = volatility(&dev);
        assert!((0.0..=1.0).contains(&v));
    }
}
