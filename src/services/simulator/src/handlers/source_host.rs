//! Source-host family: snake_case git-provider surface
//!
//! Nested `/repos/{owner}/{repo}/...` routes are dispatched by counting path
//! segments (the leading empty split element excluded), mirroring the
//! upstream provider's router. The wildcard below `/repos/` captures the
//! remainder; unknown shapes fall out as 404.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;

use codetel_shared::{
    Commit, CommitDetail, CommitStats, ContributorRow, HotfixAnalysis, IssueDetail, PrState,
    PullDetail, PullFileRow, PullRequest, RepoDetail, RepositoryProfile, RevertAnalysis,
    ReviewCommentRow, ReviewDetail, SurvivalAnalysis, UserRef,
};

use crate::error::{Result, SimulatorError};
use crate::state::AppState;
use crate::store::CorpusData;

fn repo_detail(repo: &RepositoryProfile) -> RepoDetail {
    RepoDetail {
        full_name: repo.repo_name.clone(),
        owner: repo.owner().to_string(),
        name: repo.short_name().to_string(),
        primary_language: repo.primary_language.clone(),
        service_type: repo.service_type.clone(),
        default_branch: repo.default_branch.clone(),
        owning_teams: repo.owning_teams.clone(),
        age_days: repo.age_days,
    }
}

fn pull_detail(pr: &PullRequest) -> PullDetail {
    PullDetail {
        id: pr.id,
        number: pr.number,
        state: pr.state,
        title: pr.title.clone(),
        user: UserRef {
            login: pr.author_user_id.clone(),
            email: pr.author_email.clone(),
        },
        additions: pr.additions,
        deletions: pr.deletions,
        changed_files: pr.changed_files,
        created_at: pr.created_at,
        first_review_at: pr.first_review_at,
        merged_at: pr.merged_at,
        coding_lead_time_hours: pr.coding_lead_time_hours,
        pickup_time_hours: pr.pickup_time_hours,
        review_lead_time_hours: pr.review_lead_time_hours,
        review_comments: pr.review_comments,
        iterations: pr.iterations,
        ai_summary: pr.ai_summary.clone(),
        is_reverted: pr.is_reverted,
        has_hotfix_followup: pr.has_hotfix_followup,
    }
}

fn commit_detail(commit: &Commit) -> CommitDetail {
    CommitDetail {
        sha: commit.commit_hash.clone(),
        author: UserRef {
            login: commit.user_id.clone(),
            email: commit.user_email.clone(),
        },
        message: commit.message.clone(),
        branch: commit.branch.clone(),
        committed_at: commit.commit_ts,
        stats: CommitStats {
            additions: commit.total_lines_added,
            deletions: commit.total_lines_deleted,
            total: commit.total_lines_added + commit.total_lines_deleted,
        },
        pr_number: commit.pr_number,
    }
}

/// `GET /repos`
pub async fn list_repos(State(state): State<AppState>) -> Result<Json<Vec<RepoDetail>>> {
    let corpus = state.store.read();
    Ok(Json(
        corpus.list_repositories().iter().map(repo_detail).collect(),
    ))
}

/// Everything below `/repos/`: segment-count dispatch
pub async fn dispatch(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Response> {
    // Split excludes the leading empty element by construction: the wildcard
    // never starts with '/'.
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let corpus = state.store.read();

    match segments.len() {
        2 => {
            let repo_name = format!("{}/{}", segments[0], segments[1]);
            let repo = known_repo(&corpus, &repo_name)?;
            Ok(Json(repo_detail(repo)).into_response())
        }
        3 => {
            let repo_name = format!("{}/{}", segments[0], segments[1]);
            known_repo(&corpus, &repo_name)?;
            match segments[2] {
                "pulls" => Ok(Json(list_pulls(&corpus, &repo_name, &raw)).into_response()),
                "commits" => Ok(Json(
                    corpus
                        .commits_by_repo(&repo_name)
                        .into_iter()
                        .map(commit_detail)
                        .collect::<Vec<_>>(),
                )
                .into_response()),
                "issues" => Ok(Json(
                    corpus
                        .issues_by_repo(&repo_name)
                        .into_iter()
                        .map(issue_detail)
                        .collect::<Vec<_>>(),
                )
                .into_response()),
                "contributors" => Ok(Json(contributors(&corpus, &repo_name)).into_response()),
                other => Err(unknown_path(&repo_name, other)),
            }
        }
        4 => {
            let repo_name = format!("{}/{}", segments[0], segments[1]);
            known_repo(&corpus, &repo_name)?;
            match segments[2] {
                "pulls" => {
                    let number = parse_number(segments[3], "pull number")?;
                    let pr = known_pr(&corpus, &repo_name, number)?;
                    Ok(Json(pull_detail(pr)).into_response())
                }
                "commits" => {
                    let commit = corpus
                        .commit_by_hash(segments[3])
                        .filter(|c| c.repo_name == repo_name)
                        .ok_or_else(|| {
                            SimulatorError::not_found(format!(
                                "commit {} not found in {}",
                                segments[3], repo_name
                            ))
                        })?;
                    Ok(Json(commit_detail(commit)).into_response())
                }
                "issues" => {
                    let number = parse_number(segments[3], "issue number")?;
                    let issue = corpus
                        .issue_by_repo_number(&repo_name, number)
                        .ok_or_else(|| {
                            SimulatorError::not_found(format!(
                                "issue {}#{} not found",
                                repo_name, number
                            ))
                        })?;
                    Ok(Json(issue_detail(issue)).into_response())
                }
                "analysis" => analysis(&corpus, &repo_name, segments[3]),
                other => Err(unknown_path(&repo_name, other)),
            }
        }
        5 if segments[2] == "pulls" => {
            let repo_name = format!("{}/{}", segments[0], segments[1]);
            known_repo(&corpus, &repo_name)?;
            let number = parse_number(segments[3], "pull number")?;
            let pr = known_pr(&corpus, &repo_name, number)?;
            match segments[4] {
                "commits" => {
                    let commits: Vec<CommitDetail> = pr
                        .commit_hashes
                        .iter()
                        .filter_map(|hash| corpus.commit_by_hash(hash))
                        .map(commit_detail)
                        .collect();
                    Ok(Json(commits).into_response())
                }
                "files" => Ok(Json(pull_files(&corpus, pr)).into_response()),
                "reviews" => {
                    let reviews: Vec<ReviewDetail> = corpus
                        .reviews_by_pr_id(pr.id)
                        .into_iter()
                        .map(|review| ReviewDetail {
                            id: review.id,
                            user: UserRef {
                                login: corpus
                                    .developer_by_user_or_email(&review.reviewer_email)
                                    .map(|d| d.user_id.clone())
                                    .unwrap_or_else(|| review.reviewer_email.clone()),
                                email: review.reviewer_email.clone(),
                            },
                            state: review.state,
                            body: review.body.clone(),
                            submitted_at: review.submitted_at,
                            comments: review
                                .comments
                                .iter()
                                .map(|c| ReviewCommentRow {
                                    body: c.body.clone(),
                                    created_at: c.created_at,
                                })
                                .collect(),
                        })
                        .collect();
                    Ok(Json(reviews).into_response())
                }
                other => Err(unknown_path(&repo_name, other)),
            }
        }
        _ => Err(SimulatorError::not_found(format!(
            "no route for /repos/{}",
            rest
        ))),
    }
}

fn known_repo<'a>(corpus: &'a CorpusData, repo_name: &str) -> Result<&'a RepositoryProfile> {
    corpus
        .repository(repo_name)
        .ok_or_else(|| SimulatorError::not_found(format!("repository {} not found", repo_name)))
}

fn known_pr<'a>(corpus: &'a CorpusData, repo_name: &str, number: u64) -> Result<&'a PullRequest> {
    corpus
        .pr_by_repo_number(repo_name, number)
        .ok_or_else(|| SimulatorError::not_found(format!("PR {}#{} not found", repo_name, number)))
}

fn parse_number(raw: &str, label: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| SimulatorError::invalid_request(format!("{}: invalid value '{}'", label, raw)))
}

fn unknown_path(repo_name: &str, segment: &str) -> SimulatorError {
    SimulatorError::not_found(format!("no route for {}/{}", repo_name, segment))
}

fn list_pulls(
    corpus: &CorpusData,
    repo_name: &str,
    raw: &HashMap<String, String>,
) -> Vec<PullDetail> {
    let state_filter = raw.get("state").map(String::as_str).unwrap_or("all");
    corpus
        .prs_by_repo(repo_name)
        .into_iter()
        .filter(|pr| match state_filter {
            "open" => pr.state == PrState::Open,
            "closed" => pr.state == PrState::Closed,
            "merged" => pr.state == PrState::Merged,
            _ => true,
        })
        .map(pull_detail)
        .collect()
}

fn issue_detail(issue: &codetel_shared::Issue) -> IssueDetail {
    IssueDetail {
        number: issue.number,
        title: issue.title.clone(),
        state: issue.state,
        user: UserRef {
            login: issue.author_email.clone(),
            email: issue.author_email.clone(),
        },
        created_at: issue.created_at,
        closed_at: issue.closed_at,
        linked_pr_number: issue.linked_pr_number,
    }
}

fn contributors(corpus: &CorpusData, repo_name: &str) -> Vec<ContributorRow> {
    let mut by_user: std::collections::BTreeMap<String, ContributorRow> =
        std::collections::BTreeMap::new();
    for commit in corpus.commits_by_repo(repo_name) {
        let row = by_user
            .entry(commit.user_email.clone())
            .or_insert_with(|| ContributorRow {
                email: commit.user_email.clone(),
                user_id: commit.user_id.clone(),
                commits: 0,
                additions: 0,
                deletions: 0,
            });
        row.commits += 1;
        row.additions += commit.total_lines_added;
        row.deletions += commit.total_lines_deleted;
    }
    let mut rows: Vec<ContributorRow> = by_user.into_values().collect();
    rows.sort_by(|a, b| b.commits.cmp(&a.commits).then(a.email.cmp(&b.email)));
    rows
}

/// Synthesize a deterministic file list for a PR. File identities are not
/// stored; names derive from the PR id and the repo's primary language so
/// repeated calls agree.
fn pull_files(corpus: &CorpusData, pr: &PullRequest) -> Vec<PullFileRow> {
    let extension = corpus
        .repository(&pr.repo_name)
        .map(|r| match r.primary_language.as_str() {
            "rust" => "rs",
            "typescript" => "ts",
            "go" => "go",
            "python" => "py",
            "kotlin" => "kt",
            _ => "txt",
        })
        .unwrap_or("txt");

    let files = pr.changed_files.max(1) as u64;
    let mut remaining_add = pr.additions;
    let mut remaining_del = pr.deletions;
    (0..files)
        .map(|i| {
            let slots_left = files - i;
            let additions = if slots_left == 1 {
                remaining_add
            } else {
                // Deterministic split keyed off the PR id, no RNG state.
                let share = (pr.id.wrapping_mul(2654435761).wrapping_add(i) % 100) as u64;
                (remaining_add * (20 + share % 60) / 100 / slots_left).min(remaining_add)
            };
            let deletions = if slots_left == 1 {
                remaining_del
            } else {
                (remaining_del / slots_left).min(remaining_del)
            };
            remaining_add -= additions;
            remaining_del -= deletions;
            PullFileRow {
                filename: format!("src/module_{}/file_{}.{}", pr.number, i + 1, extension),
                status: if i == 0 { "modified" } else { "added" }.to_string(),
                additions,
                deletions,
                changes: additions + deletions,
            }
        })
        .collect()
}

// ============================================================================
// Analysis sub-paths
// ============================================================================

fn analysis(corpus: &CorpusData, repo_name: &str, kind: &str) -> Result<Response> {
    let merged: Vec<&PullRequest> = corpus
        .prs_by_repo(repo_name)
        .into_iter()
        .filter(|pr| pr.state == PrState::Merged)
        .collect();
    match kind {
        "survival" => {
            let mean = if merged.is_empty() {
                0.0
            } else {
                merged.iter().map(|pr| pr.survival_rate_30d).sum::<f64>() / merged.len() as f64
            };
            Ok(Json(SurvivalAnalysis {
                repo_name: repo_name.to_string(),
                window_days: 30,
                merged_prs: merged.len(),
                mean_survival_rate: mean,
            })
            .into_response())
        }
        "reverts" => {
            let reverted: Vec<u64> = merged
                .iter()
                .filter(|pr| pr.is_reverted)
                .map(|pr| pr.number)
                .collect();
            Ok(Json(RevertAnalysis {
                repo_name: repo_name.to_string(),
                merged_prs: merged.len(),
                reverted_prs: reverted.len(),
                revert_rate: rate(reverted.len(), merged.len()),
                reverted_pr_numbers: reverted,
            })
            .into_response())
        }
        "hotfixes" => {
            let hotfixes: Vec<u64> = merged
                .iter()
                .filter(|pr| pr.has_hotfix_followup)
                .map(|pr| pr.number)
                .collect();
            Ok(Json(HotfixAnalysis {
                repo_name: repo_name.to_string(),
                merged_prs: merged.len(),
                hotfix_followups: hotfixes.len(),
                hotfix_rate: rate(hotfixes.len(), merged.len()),
                hotfix_pr_numbers: hotfixes,
            })
            .into_response())
        }
        other => Err(SimulatorError::not_found(format!(
            "unknown analysis '{}'",
            other
        ))),
    }
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
