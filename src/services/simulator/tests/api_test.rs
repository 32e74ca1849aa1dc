//! End-to-end HTTP contract tests
//!
//! Exercises the full router the way a downstream ETL client would: basic
//! auth, pagination laws, CSV/JSON parity, strict date validation, admin
//! regeneration and the nested source-host routes.

use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use codetel_shared::{Config, RegenMode, RegenerateRequest, Velocity};
use codetel_simulator::state::AppState;
use codetel_simulator::{admin, seed_loader, server};
use serde_json::{json, Value};

const API_KEY: &str = "codetel-dev-key";

fn auth_header() -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:", API_KEY)))
}

/// Server over a small generated corpus
fn test_server() -> TestServer {
    let state = AppState::new(Config::default(), seed_loader::preset("small-team").unwrap());
    let request = RegenerateRequest {
        mode: RegenMode::Override,
        days: 14,
        velocity: Velocity::Low,
        developers: 0,
        max_commits: 0,
        rng_seed: Some(4242),
    };
    admin::run_regeneration(&state, &request).unwrap();
    TestServer::new(server::build_router(state)).unwrap()
}

fn get(server: &TestServer, path: &str) -> axum_test::TestRequest {
    server
        .get(path)
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&auth_header()).unwrap(),
        )
}

fn post(server: &TestServer, path: &str, body: &Value) -> axum_test::TestRequest {
    server
        .post(path)
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&auth_header()).unwrap(),
        )
        .json(body)
}

#[tokio::test]
async fn health_is_unauthenticated() {
    let server = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["developers"].as_u64().unwrap() > 0);
    assert!(body["eventsGenerated"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let server = test_server();
    let response = server.get("/teams/members").await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let server = test_server();
    let bad = format!("Basic {}", STANDARD.encode("wrong-key:"));
    let response = server
        .get("/teams/members")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bad).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn seed_upload_drives_team_members() {
    let server = test_server();
    let seed = json!({
        "developers": [
            {
                "user_id": "user_001",
                "email": "alice@ex.com",
                "name": "Alice Chen",
                "org": "ex",
                "team": "payments",
                "seniority": "senior",
                "activity_level": "high",
                "acceptance_rate": 0.8
            },
            {
                "user_id": "user_002",
                "email": "bob@ex.com",
                "name": "Bob Smith",
                "org": "ex",
                "team": "payments",
                "seniority": "mid",
                "activity_level": "medium",
                "acceptance_rate": 0.6
            }
        ],
        "repositories": [
            {
                "repo_name": "acme/payment-service",
                "primary_language": "rust",
                "owning_teams": ["payments"]
            }
        ]
    });
    let upload = post(
        &server,
        "/admin/seed",
        &json!({
            "data": seed,
            "format": "json",
            "regenerate": true,
            "regenerate_config": {
                "mode": "override",
                "days": 5,
                "velocity": "low",
                "rng_seed": 7
            }
        }),
    )
    .await;
    upload.assert_status_ok();
    let body: Value = upload.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["seed"]["developers"], 2);

    let members: Value = get(&server, "/teams/members").await.json();
    assert_eq!(
        members,
        json!({
            "teamMembers": [
                {"name": "Alice Chen", "email": "alice@ex.com", "role": "member"},
                {"name": "Bob Smith", "email": "bob@ex.com", "role": "member"}
            ]
        })
    );
}

#[tokio::test]
async fn invalid_seed_is_rejected_atomically() {
    let server = test_server();
    let before: Value = get(&server, "/admin/config").await.json();
    let response = post(
        &server,
        "/admin/seed",
        &json!({
            "data": {"developers": [], "repositories": []},
            "format": "json"
        }),
    )
    .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("invalid seed"));
    // prior seed untouched
    let after: Value = get(&server, "/admin/config").await.json();
    assert_eq!(before["seed"], after["seed"]);
}

#[tokio::test]
async fn ai_code_commit_pagination_covers_every_row_once() {
    let server = test_server();
    let first: Value = get(&server, "/analytics/ai-code/commits")
        .add_query_param("pageSize", "50")
        .await
        .json();
    let total = first["totalCount"].as_u64().unwrap() as usize;
    assert!(total > 0, "no commits in the window");

    let mut seen = std::collections::BTreeSet::new();
    let mut fetched = 0;
    let pages = total.div_ceil(50);
    for page in 1..=pages {
        let body: Value = get(&server, "/analytics/ai-code/commits")
            .add_query_param("pageSize", "50")
            .add_query_param("page", &page.to_string())
            .await
            .json();
        assert_eq!(body["totalCount"].as_u64().unwrap() as usize, total);
        assert_eq!(body["page"].as_u64().unwrap() as usize, page);
        for item in body["items"].as_array().unwrap() {
            assert!(
                seen.insert(item["commitHash"].as_str().unwrap().to_string()),
                "commit repeated across pages"
            );
            fetched += 1;
        }
    }
    assert_eq!(fetched, total);

    // One page past the end: empty items, stable envelope.
    let past: Value = get(&server, "/analytics/ai-code/commits")
        .add_query_param("pageSize", "50")
        .add_query_param("page", &(pages + 1).to_string())
        .await
        .json();
    assert_eq!(past["items"].as_array().unwrap().len(), 0);
    assert_eq!(past["totalCount"].as_u64().unwrap() as usize, total);
}

#[tokio::test]
async fn invalid_start_date_uses_the_documented_message() {
    let server = test_server();
    let response = get(&server, "/analytics/ai-code/commits")
        .add_query_param("startDate", "invalid-date")
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "startDate: invalid format");
}

#[tokio::test]
async fn page_size_above_endpoint_cap_is_rejected() {
    let server = test_server();
    let response = get(&server, "/analytics/team/dau")
        .add_query_param("pageSize", "500")
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn csv_export_matches_json_row_count() {
    let server = test_server();
    let json_body: Value = get(&server, "/analytics/ai-code/commits")
        .add_query_param("pageSize", "1000")
        .await
        .json();
    let total = json_body["totalCount"].as_u64().unwrap() as usize;

    let csv_response = get(&server, "/analytics/ai-code/commits.csv").await;
    csv_response.assert_status_ok();
    assert!(csv_response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let text = csv_response.text();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("commitHash,userId,userEmail"));
    assert_eq!(lines.count(), total);
}

#[tokio::test]
async fn override_regeneration_reports_match_stats() {
    let server = test_server();
    let response = post(
        &server,
        "/admin/regenerate",
        &json!({
            "mode": "override",
            "days": 7,
            "velocity": "low",
            "developers": 0,
            "max_commits": 0
        }),
    )
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["dataCleaned"], true);
    let commits_added = body["commitsAdded"].as_u64().unwrap();
    assert!(commits_added > 0);
    assert_eq!(body["totalCommits"], body["commitsAdded"]);

    let stats: Value = get(&server, "/admin/stats").await.json();
    assert_eq!(stats["commits"].as_u64().unwrap(), commits_added);
    assert_eq!(stats["pullRequests"], body["totalPrs"]);
}

#[tokio::test]
async fn regenerate_rejects_out_of_range_values() {
    let server = test_server();
    for body in [
        json!({"mode": "override", "days": 4000, "velocity": "low"}),
        json!({"mode": "override", "days": 7, "velocity": "warp"}),
        json!({"mode": "sideways", "days": 7, "velocity": "low"}),
    ] {
        let response = post(&server, "/admin/regenerate", &body).await;
        assert_eq!(response.status_code(), 400, "accepted {}", body);
    }
}

#[tokio::test]
async fn source_host_nested_routes_resolve() {
    let server = test_server();
    let repos: Value = get(&server, "/repos").await.json();
    let repos = repos.as_array().unwrap();
    assert!(!repos.is_empty());

    // Find a repo and PR with reviews through the API itself.
    let mut target: Option<(String, u64)> = None;
    'outer: for repo in repos {
        let full_name = repo["full_name"].as_str().unwrap();
        let pulls: Value = get(&server, &format!("/repos/{}/pulls", full_name))
            .add_query_param("state", "merged")
            .await
            .json();
        for pr in pulls.as_array().unwrap() {
            if pr["review_comments"].as_u64().unwrap() > 0 {
                target = Some((full_name.to_string(), pr["number"].as_u64().unwrap()));
                break 'outer;
            }
        }
    }
    let (repo_name, number) = target.expect("corpus has a reviewed merged PR");

    let detail: Value = get(&server, &format!("/repos/{}/pulls/{}", repo_name, number))
        .await
        .json();
    assert_eq!(detail["state"], "merged");
    assert_eq!(detail["number"].as_u64().unwrap(), number);

    let reviews_response = get(
        &server,
        &format!("/repos/{}/pulls/{}/reviews", repo_name, number),
    )
    .await;
    reviews_response.assert_status_ok();
    let reviews: Value = reviews_response.json();
    assert!(!reviews.as_array().unwrap().is_empty());
    assert_eq!(
        reviews.as_array().unwrap().last().unwrap()["state"],
        "approved"
    );

    let commits: Value = get(
        &server,
        &format!("/repos/{}/pulls/{}/commits", repo_name, number),
    )
    .await
    .json();
    assert!(!commits.as_array().unwrap().is_empty());

    let files: Value = get(
        &server,
        &format!("/repos/{}/pulls/{}/files", repo_name, number),
    )
    .await
    .json();
    let additions: u64 = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["additions"].as_u64().unwrap())
        .sum();
    assert_eq!(additions, detail["additions"].as_u64().unwrap());

    let missing = get(&server, &format!("/repos/{}/pulls/999999", repo_name)).await;
    assert_eq!(missing.status_code(), 404);

    let unknown_repo = get(&server, "/repos/nope/missing").await;
    assert_eq!(unknown_repo.status_code(), 404);
}

#[tokio::test]
async fn source_host_analysis_rates_are_consistent() {
    let server = test_server();
    let repos: Value = get(&server, "/repos").await.json();
    let full_name = repos.as_array().unwrap()[0]["full_name"].as_str().unwrap().to_string();

    let reverts: Value = get(&server, &format!("/repos/{}/analysis/reverts", full_name))
        .await
        .json();
    let merged = reverts["merged_prs"].as_u64().unwrap();
    let reverted = reverts["reverted_prs"].as_u64().unwrap();
    if merged > 0 {
        let rate = reverts["revert_rate"].as_f64().unwrap();
        assert!((rate - reverted as f64 / merged as f64).abs() < 1e-9);
    }

    let survival = get(&server, &format!("/repos/{}/analysis/survival", full_name)).await;
    survival.assert_status_ok();
    let unknown = get(&server, &format!("/repos/{}/analysis/mystery", full_name)).await;
    assert_eq!(unknown.status_code(), 404);
}

#[tokio::test]
async fn by_user_envelope_is_keyed_by_email_and_paged_by_user() {
    let server = test_server();
    let body: Value = get(&server, "/analytics/by-user/tabs")
        .add_query_param("pageSize", "2")
        .await
        .json();

    assert_eq!(body["pagination"]["pageSize"], 2);
    assert_eq!(body["params"]["metric"], "tabs");
    let total_users = body["totalUsers"].as_u64().unwrap();
    assert_eq!(total_users, 5);

    let data = body["data"].as_object().unwrap();
    assert!(data.len() <= 2, "paged by user, not by row");
    let keys: Vec<&String> = data.keys().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted, "emails must be lexicographic");

    let mappings = body["userMappings"].as_array().unwrap();
    assert_eq!(mappings.len(), data.len());
    for mapping in mappings {
        assert!(data.contains_key(mapping["email"].as_str().unwrap()));
        assert!(mapping["id"].as_str().unwrap().starts_with("user_"));
    }
}

#[tokio::test]
async fn by_user_filter_accepts_ids_and_emails() {
    let server = test_server();
    let all: Value = get(&server, "/analytics/by-user/tabs").await.json();
    let mappings = all["userMappings"].as_array().unwrap();
    let first_id = mappings[0]["id"].as_str().unwrap().to_string();
    let second_email = mappings[1]["email"].as_str().unwrap().to_string();

    let filtered: Value = get(&server, "/analytics/by-user/tabs")
        .add_query_param("user", &format!("{},{}", first_id, second_email))
        .await
        .json();
    assert_eq!(filtered["totalUsers"], 2);
}

#[tokio::test]
async fn stub_endpoints_return_live_envelopes() {
    let server = test_server();
    for path in ["/teams/spend", "/teams/filtered-usage-events"] {
        let body: Value = get(&server, path).await.json();
        assert_eq!(body["items"].as_array().unwrap().len(), 0);
        assert_eq!(body["totalCount"], 0);
        assert_eq!(body["page"], 1);
    }
}

#[tokio::test]
async fn research_dataset_covers_merged_prs_with_csv_parity() {
    let server = test_server();
    let body: Value = get(&server, "/research/dataset")
        .add_query_param("pageSize", "1000")
        .await
        .json();
    let total = body["totalCount"].as_u64().unwrap() as usize;
    assert!(total > 0);
    for row in body["items"].as_array().unwrap() {
        assert!(row["ai_ratio"].as_f64().unwrap() >= 0.0);
        assert!(row.get("author_seniority").is_some());
        assert!(row.get("survival_rate_30d").is_some());
    }

    let csv = get(&server, "/research/dataset.csv").await;
    csv.assert_status_ok();
    let text = csv.text();
    assert!(text.lines().next().unwrap().starts_with("pr_number,author_email"));
    assert_eq!(text.lines().count() - 1, total);
}

#[tokio::test]
async fn analytics_team_aggregations_respond() {
    let server = test_server();
    for path in [
        "/analytics/team/agent-edits",
        "/analytics/team/tabs",
        "/analytics/team/dau",
        "/analytics/team/models",
        "/analytics/team/client-versions",
        "/analytics/team/top-file-extensions",
        "/analytics/team/mcp",
        "/analytics/team/commands",
        "/analytics/team/plans",
        "/analytics/team/ask-mode",
    ] {
        let response = get(&server, path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(
            body["totalCount"].as_u64().unwrap() > 0,
            "{} returned an empty corpus",
            path
        );
    }

    let leaderboard: Value = get(&server, "/analytics/team/leaderboard").await.json();
    let tab_board = leaderboard["tabLeaderboard"].as_array().unwrap();
    assert!(!tab_board.is_empty());
    assert_eq!(tab_board[0]["rank"], 1);
    let lines: Vec<u64> = tab_board
        .iter()
        .map(|e| e["linesAdded"].as_u64().unwrap())
        .collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(lines, sorted, "leaderboard must sort descending");
}

#[tokio::test]
async fn wrong_method_on_known_path_uses_the_error_shape() {
    let server = test_server();
    let response = server
        .post("/teams/members")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&auth_header()).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), 405);
    let body: Value = response.json();
    assert_eq!(body["error"], "method not allowed");

    let response = get(&server, "/admin/regenerate").await;
    assert_eq!(response.status_code(), 405);
    let body: Value = response.json();
    assert_eq!(body["error"], "method not allowed");
}

#[tokio::test]
async fn malformed_admin_bodies_use_the_error_shape() {
    let server = test_server();
    // Syntactically broken JSON fails inside the extractor, not the handler.
    let response = server
        .post("/admin/regenerate")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&auth_header()).unwrap(),
        )
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(!body["error"].as_str().unwrap().is_empty());

    // Wrong content type is rejected on the same shape.
    let response = server
        .post("/admin/seed")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&auth_header()).unwrap(),
        )
        .text("data=1")
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn admin_stats_timeseries_is_day_bucketed_and_capped() {
    let server = test_server();
    let body: Value = get(&server, "/admin/stats")
        .add_query_param("include_timeseries", "true")
        .await
        .json();
    let buckets = body["timeseries"].as_array().unwrap();
    assert!(!buckets.is_empty());
    assert!(buckets.len() <= 365);
    let mut dates: Vec<&str> = buckets
        .iter()
        .map(|b| b["date"].as_str().unwrap())
        .collect();
    let sorted = {
        let mut copy = dates.clone();
        copy.sort();
        copy
    };
    assert_eq!(dates, sorted, "buckets must be in date order");
    dates.dedup();
    assert_eq!(dates.len(), buckets.len(), "one bucket per day");

    let plain: Value = get(&server, "/admin/stats").await.json();
    assert!(plain.get("timeseries").is_none());
}

#[tokio::test]
async fn unknown_paths_return_error_bodies() {
    let server = test_server();
    let response = get(&server, "/analytics/unknown").await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn top_file_extensions_ranks_at_most_five_per_day() {
    let server = test_server();
    let body: Value = get(&server, "/analytics/team/top-file-extensions")
        .add_query_param("pageSize", "100")
        .await
        .json();
    let mut per_day: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for row in body["items"].as_array().unwrap() {
        *per_day.entry(row["date"].as_str().unwrap()).or_default() += 1;
    }
    for (date, count) in per_day {
        assert!(count <= 5, "{} has {} extension rows", date, count);
    }
}
