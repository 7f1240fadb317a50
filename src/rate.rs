use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

use crate::error::ApiError;

pub const LIMIT_HEADER: &str = "X-RateLimit-Limit";
pub const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
pub const RESET_HEADER: &str = "X-RateLimit-Reset";

/// Quota state reported by the API on every response.
///
/// All fields are optional: the headers are informational and some error or
/// cached responses omit them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateState {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Quota reset time, in epoch seconds.
    pub reset: Option<i64>,
}

impl RateState {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_number(headers, LIMIT_HEADER),
            remaining: header_number(headers, REMAINING_HEADER),
            reset: header_number(headers, RESET_HEADER),
        }
    }

    pub fn require_remaining(&self) -> Result<u64, ApiError> {
        self.remaining
            .ok_or(ApiError::MissingField(REMAINING_HEADER))
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset.and_then(|s| DateTime::from_timestamp(s, 0))
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
