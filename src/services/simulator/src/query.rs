//! Query-parameter parsing, pagination and CSV serialization
//!
//! Every analytics handler funnels its raw query map through
//! [`QueryParams::parse`]: strict date validation, a default window of the
//! last 30 days with the end extended to end-of-day, 1-indexed pagination
//! with per-endpoint size caps, and the comma-separated `user` filter that
//! accepts emails and user_ids interchangeably. CSV exports never paginate
//! and reuse the serde field names, so the camelCase wire names double as
//! column headers.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;

use codetel_shared::PaginatedResponse;

use crate::error::{Result, SimulatorError};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Per-endpoint parsing limits
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub max_page_size: usize,
    /// Endpoints that declare a maximum date range set this
    pub max_range_days: Option<i64>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            max_range_days: None,
        }
    }
}

impl ParseOptions {
    pub fn wide() -> Self {
        Self {
            max_page_size: 1000,
            max_range_days: None,
        }
    }

    pub fn with_range_cap(mut self, days: i64) -> Self {
        self.max_range_days = Some(days);
        self
    }
}

/// Parsed standard query parameters
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `start_date` at midnight UTC
    pub from: DateTime<Utc>,
    /// `end_date` extended to end-of-day
    pub to: DateTime<Utc>,
    /// Emails or user_ids from the comma-separated `user` parameter
    pub users: Vec<String>,
    pub repo_name: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

impl QueryParams {
    pub fn parse(
        raw: &HashMap<String, String>,
        options: &ParseOptions,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let end_date = match raw.get("endDate") {
            Some(value) => parse_date(value, "endDate")?,
            None => now.date_naive(),
        };
        let start_date = match raw.get("startDate") {
            Some(value) => parse_date(value, "startDate")?,
            None => end_date - Duration::days(DEFAULT_WINDOW_DAYS),
        };
        if start_date > end_date {
            return Err(SimulatorError::invalid_request(
                "startDate: must not be after endDate",
            ));
        }
        if let Some(cap) = options.max_range_days {
            let span = (end_date - start_date).num_days();
            if span > cap {
                return Err(SimulatorError::invalid_request(format!(
                    "date range exceeds {} days",
                    cap
                )));
            }
        }

        let page = match raw.get("page") {
            Some(value) => parse_usize(value, "page")?,
            None => 1,
        };
        if page < 1 {
            return Err(SimulatorError::invalid_request("page: must be >= 1"));
        }
        let page_size = match raw.get("pageSize") {
            Some(value) => parse_usize(value, "pageSize")?,
            None => DEFAULT_PAGE_SIZE,
        };
        if page_size < 1 {
            return Err(SimulatorError::invalid_request("pageSize: must be >= 1"));
        }
        if page_size > options.max_page_size {
            return Err(SimulatorError::invalid_request(format!(
                "pageSize: exceeds maximum of {}",
                options.max_page_size
            )));
        }

        let users = raw
            .get("user")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let from = Utc.from_utc_datetime(&start_date.and_hms_opt(0, 0, 0).unwrap_or_default());
        let to = Utc.from_utc_datetime(&end_date.and_hms_opt(23, 59, 59).unwrap_or_default());

        Ok(Self {
            start_date,
            end_date,
            from,
            to,
            users,
            repo_name: raw.get("repoName").cloned(),
            page,
            page_size,
        })
    }

    /// Whether the `user` filter admits this (id, email) pair
    pub fn matches_user(&self, user_id: &str, email: &str) -> bool {
        self.users.is_empty()
            || self
                .users
                .iter()
                .any(|u| u == user_id || u == email)
    }

    /// Days of the selected range, oldest first
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut day = self.start_date;
        while day <= self.end_date {
            days.push(day);
            day += Duration::days(1);
        }
        days
    }
}

fn parse_date(value: &str, param: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| SimulatorError::invalid_request(format!("{}: invalid format", param)))
}

fn parse_usize(value: &str, param: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| SimulatorError::invalid_request(format!("{}: invalid format", param)))
}

/// Slice one page out of the full item set
pub fn paginate<T>(items: Vec<T>, params: &QueryParams) -> PaginatedResponse<T> {
    let total_count = items.len();
    let start = (params.page - 1).saturating_mul(params.page_size);
    let page_items: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(params.page_size)
        .collect();
    PaginatedResponse {
        items: page_items,
        total_count,
        page: params.page,
        page_size: params.page_size,
    }
}

/// Render rows as a CSV attachment. Exports never paginate: the row set is
/// exactly the union of every page of the JSON equivalent.
pub fn csv_response<T: Serialize>(rows: &[T], filename: &str) -> Result<Response> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| SimulatorError::internal(format!("csv serialize: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SimulatorError::internal(format!("csv flush: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Serialize;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_last_thirty_days() {
        let params = QueryParams::parse(&raw(&[]), &ParseOptions::default(), now()).unwrap();
        assert_eq!(params.end_date, now().date_naive());
        assert_eq!(params.start_date, now().date_naive() - Duration::days(30));
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
        assert!(params.to.to_rfc3339().contains("23:59:59"));
    }

    #[test]
    fn malformed_start_date_uses_the_documented_message() {
        let err = QueryParams::parse(
            &raw(&[("startDate", "invalid-date")]),
            &ParseOptions::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "startDate: invalid format");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = QueryParams::parse(
            &raw(&[("startDate", "2025-06-10"), ("endDate", "2025-06-01")]),
            &ParseOptions::default(),
            now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not be after"));
    }

    #[test]
    fn range_cap_is_enforced_when_declared() {
        let options = ParseOptions::default().with_range_cap(90);
        let err = QueryParams::parse(
            &raw(&[("startDate", "2025-01-01"), ("endDate", "2025-06-01")]),
            &options,
            now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds 90 days"));

        let ok = QueryParams::parse(
            &raw(&[("startDate", "2025-05-01"), ("endDate", "2025-06-01")]),
            &options,
            now(),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn pagination_bounds_are_validated() {
        for (key, value, fragment) in [
            ("page", "0", "page: must be >= 1"),
            ("pageSize", "0", "pageSize: must be >= 1"),
            ("pageSize", "101", "exceeds maximum of 100"),
            ("page", "x", "page: invalid format"),
        ] {
            let err =
                QueryParams::parse(&raw(&[(key, value)]), &ParseOptions::default(), now())
                    .unwrap_err();
            assert!(
                err.to_string().contains(fragment),
                "'{}' missing '{}'",
                err,
                fragment
            );
        }
    }

    #[test]
    fn user_filter_accepts_ids_and_emails() {
        let params = QueryParams::parse(
            &raw(&[("user", "user_001, bob@example.com")]),
            &ParseOptions::default(),
            now(),
        )
        .unwrap();
        assert!(params.matches_user("user_001", "alice@example.com"));
        assert!(params.matches_user("user_002", "bob@example.com"));
        assert!(!params.matches_user("user_003", "carol@example.com"));
    }

    #[test]
    fn pagination_covers_all_items_exactly_once() {
        let items: Vec<u32> = (0..7).collect();
        let mut seen = Vec::new();
        for page in 1..=4 {
            let params = QueryParams::parse(
                &raw(&[("page", &page.to_string()), ("pageSize", "2")]),
                &ParseOptions::default(),
                now(),
            )
            .unwrap();
            let response = paginate(items.clone(), &params);
            assert_eq!(response.total_count, 7);
            seen.extend(response.items);
        }
        assert_eq!(seen, items);
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        commit_hash: String,
        total_lines_added: u64,
    }

    #[test]
    fn csv_uses_camel_case_headers_and_attachment_disposition() {
        let rows = vec![Row {
            commit_hash: "abc".to_string(),
            total_lines_added: 3,
        }];
        let response = csv_response(&rows, "commits.csv").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/csv");
        assert!(headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("attachment"));
    }
}
