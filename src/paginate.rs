//! Cursor pagination over the search endpoint.
//!
//! The driver pauses before every call, follows `cursor.next` until the API
//! returns the same cursor twice, and refuses to start a pull whose result
//! count exceeds the remaining weekly quota.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::thread;
use std::time::Duration;

use crate::rate::RateState;
use crate::response::{Cursor, Page};

/// Default pause before each call; keeps a single client under the
/// per-second ceiling of the search API.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// A decoded page together with the rate headers of its response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub page: Page,
    pub rate: RateState,
}

/// Fetches the page of `url` at `cursor`.
pub trait PageFetcher {
    fn fetch_page(&self, url: &str, cursor: &str) -> Result<FetchedPage>;
}

/// Records collected by one pagination run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub records: Vec<Value>,
    /// Total reported by the first page.
    pub total_results: u64,
    /// Rate state of the last response.
    pub rate: RateState,
    pub pages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaginationOutcome {
    /// The cursor was exhausted.
    Complete(ResultSet),
    /// The run stopped early to stay within the weekly quota. Holds whatever was
    /// collected before stopping.
    QuotaExceeded { results: ResultSet, remaining: u64 },
}

impl PaginationOutcome {
    pub fn results(&self) -> &ResultSet {
        match self {
            PaginationOutcome::Complete(r) => r,
            PaginationOutcome::QuotaExceeded { results, .. } => results,
        }
    }

    pub fn into_results(self) -> ResultSet {
        match self {
            PaginationOutcome::Complete(r) => r,
            PaginationOutcome::QuotaExceeded { results, .. } => results,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PaginationOutcome::Complete(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FirstPage,
    MidPage,
    Done,
    QuotaExceeded,
}

#[derive(Debug, Clone)]
pub struct Paginator {
    delay: Duration,
    progress: bool,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl Paginator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            progress: false,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Pages through `url` until the cursor is exhausted or the quota guard trips.
    ///
    /// A failed fetch aborts the run and returns that error; records collected
    /// so far are dropped.
    pub fn run<F: PageFetcher + ?Sized>(
        &self,
        fetcher: &F,
        url: &str,
    ) -> Result<PaginationOutcome> {
        let mut state = State::FirstPage;
        let mut cursor = Cursor::FIRST.to_string();
        let mut results = ResultSet::default();
        let mut pb: Option<ProgressBar> = None;

        loop {
            thread::sleep(self.delay);

            let FetchedPage { page, rate } =
                fetcher.fetch_page(url, &cursor).with_context(|| {
                    format!("failed to fetch page {} (cursor {})", results.pages + 1, cursor)
                })?;
            results.pages += 1;
            results.rate = rate;

            let next = if page.cursor.is_first() {
                results.total_results = page.total_results;
                let remaining = rate.require_remaining()?;
                tracing::info!(
                    total = page.total_results,
                    per_page = page.items_per_page,
                    remaining,
                    "search started"
                );

                if page.total_results > remaining {
                    tracing::warn!(
                        total = page.total_results,
                        remaining,
                        reset = ?rate.reset_at(),
                        "result count exceeds remaining quota; not paging further"
                    );
                    results.records.extend(page.entries);
                    self.transition(&mut state, State::QuotaExceeded);
                    return Ok(PaginationOutcome::QuotaExceeded { results, remaining });
                }

                pb = self.progress_bar(page.total_results);
                results.records.extend(page.entries);
                if page.cursor.is_last() {
                    State::Done
                } else {
                    cursor = page.cursor.next;
                    State::MidPage
                }
            } else if page.cursor.is_last() || page.entries.is_empty() {
                results.records.extend(page.entries);
                State::Done
            } else {
                results.records.extend(page.entries);
                cursor = page.cursor.next;
                if rate.remaining == Some(0) {
                    State::QuotaExceeded
                } else {
                    State::MidPage
                }
            };

            if let Some(pb) = &pb {
                pb.set_position(results.records.len() as u64);
            }
            self.transition(&mut state, next);

            match state {
                State::FirstPage | State::MidPage => continue,
                State::Done => {
                    if let Some(pb) = &pb {
                        pb.finish_and_clear();
                    }
                    tracing::info!(
                        records = results.records.len(),
                        pages = results.pages,
                        "search complete"
                    );
                    return Ok(PaginationOutcome::Complete(results));
                }
                State::QuotaExceeded => {
                    if let Some(pb) = &pb {
                        pb.abandon();
                    }
                    tracing::warn!(
                        records = results.records.len(),
                        total = results.total_results,
                        reset = ?rate.reset_at(),
                        "weekly quota exhausted mid-run; returning partial results"
                    );
                    return Ok(PaginationOutcome::QuotaExceeded {
                        results,
                        remaining: 0,
                    });
                }
            }
        }
    }

    fn transition(&self, state: &mut State, next: State) {
        let from = *state;
        if from != next {
            tracing::debug!(from = ?from, to = ?next, "pagination state");
        }
        *state = next;
    }

    fn progress_bar(&self, total: u64) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {pos}/{len} records {wide_bar} {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::time::Instant;

    struct MockFetcher {
        replies: RefCell<VecDeque<Result<FetchedPage>>>,
        cursors: RefCell<Vec<String>>,
        times: RefCell<Vec<Instant>>,
        calls: Cell<usize>,
    }

    impl MockFetcher {
        fn new(replies: Vec<Result<FetchedPage>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                cursors: RefCell::new(Vec::new()),
                times: RefCell::new(Vec::new()),
                calls: Cell::new(0),
            }
        }
    }

    impl PageFetcher for MockFetcher {
        fn fetch_page(&self, _url: &str, cursor: &str) -> Result<FetchedPage> {
            self.calls.set(self.calls.get() + 1);
            self.cursors.borrow_mut().push(cursor.to_string());
            self.times.borrow_mut().push(Instant::now());
            self.replies
                .borrow_mut()
                .pop_front()
                .expect("unexpected extra fetch")
        }
    }

    fn page(total: u64, current: &str, next: &str, n: usize, remaining: u64) -> Result<FetchedPage> {
        Ok(FetchedPage {
            page: Page {
                total_results: total,
                items_per_page: 25,
                entries: (0..n)
                    .map(|i| json!({"dc:identifier": format!("{}-{}", current, i)}))
                    .collect(),
                cursor: Cursor {
                    current: current.to_string(),
                    next: next.to_string(),
                },
            },
            rate: RateState {
                limit: Some(20000),
                remaining: Some(remaining),
                reset: Some(1_700_000_000),
            },
        })
    }

    fn paginator() -> Paginator {
        Paginator::new(Duration::ZERO)
    }

    #[test]
    fn stops_when_cursor_repeats() {
        let fetcher = MockFetcher::new(vec![
            page(30, "*", "AoJ1", 25, 1000),
            page(30, "AoJ1", "AoJ1", 5, 999),
        ]);
        let outcome = paginator().run(&fetcher, "http://test/search").unwrap();

        assert_eq!(fetcher.calls.get(), 2);
        assert_eq!(*fetcher.cursors.borrow(), vec!["*", "AoJ1"]);
        assert!(outcome.is_complete());
        let results = outcome.into_results();
        assert_eq!(results.records.len(), 30);
        assert_eq!(results.total_results, 30);
        assert_eq!(results.pages, 2);
        assert_eq!(results.rate.remaining, Some(999));
    }

    #[test]
    fn pauses_before_every_fetch() {
        let delay = Duration::from_millis(30);
        let fetcher = MockFetcher::new(vec![
            page(30, "*", "AoJ1", 25, 1000),
            page(30, "AoJ1", "AoJ1", 5, 999),
        ]);
        let start = Instant::now();
        Paginator::new(delay).run(&fetcher, "u").unwrap();

        let times = fetcher.times.borrow();
        assert_eq!(times.len(), 2);
        assert!(times[0].duration_since(start) >= delay);
        assert!(times[1].duration_since(times[0]) >= delay);
        assert!(start.elapsed() >= delay * 2);
    }

    #[test]
    fn follows_next_cursor_across_pages() {
        let fetcher = MockFetcher::new(vec![
            page(60, "*", "c1", 25, 500),
            page(60, "c1", "c2", 25, 499),
            page(60, "c2", "c2", 10, 498),
        ]);
        let outcome = paginator().run(&fetcher, "u").unwrap();
        assert_eq!(*fetcher.cursors.borrow(), vec!["*", "c1", "c2"]);
        assert_eq!(outcome.results().records.len(), 60);
        assert_eq!(outcome.results().records[25]["dc:identifier"], "c1-0");
    }

    #[test]
    fn quota_guard_stops_after_first_page() {
        let fetcher = MockFetcher::new(vec![page(100, "*", "AoJ1", 25, 50)]);
        let outcome = paginator().run(&fetcher, "u").unwrap();

        assert_eq!(fetcher.calls.get(), 1);
        match outcome {
            PaginationOutcome::QuotaExceeded { results, remaining } => {
                assert_eq!(remaining, 50);
                assert_eq!(results.total_results, 100);
                assert_eq!(results.records.len(), 25);
            }
            other => panic!("expected quota exceeded, got {:?}", other),
        }
    }

    #[test]
    fn error_on_second_page_is_propagated() {
        let fetcher = MockFetcher::new(vec![
            page(60, "*", "c1", 25, 500),
            Err(ApiError::Http {
                status: StatusCode::SERVICE_UNAVAILABLE,
                url: "u".to_string(),
                message: "HTTP 503".to_string(),
            }
            .into()),
        ]);
        let err = paginator().run(&fetcher, "u").unwrap_err();

        assert_eq!(fetcher.calls.get(), 2);
        let api = err.downcast_ref::<ApiError>().expect("typed error");
        assert_eq!(api.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.to_string().contains("page 2"));
    }

    #[test]
    fn empty_result_set_finishes_on_first_page() {
        let fetcher = MockFetcher::new(vec![page(0, "*", "*", 0, 500)]);
        let outcome = paginator().run(&fetcher, "u").unwrap();
        assert_eq!(fetcher.calls.get(), 1);
        assert!(outcome.is_complete());
        assert!(outcome.results().records.is_empty());
    }

    #[test]
    fn quota_exhausted_mid_run_keeps_collected_records() {
        let fetcher = MockFetcher::new(vec![
            page(75, "*", "c1", 25, 100),
            page(75, "c1", "c2", 25, 0),
        ]);
        let outcome = paginator().run(&fetcher, "u").unwrap();
        assert_eq!(fetcher.calls.get(), 2);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.results().records.len(), 50);
    }

    #[test]
    fn missing_remaining_header_fails_first_page() {
        let mut first = page(10, "*", "c1", 10, 0).unwrap();
        first.rate.remaining = None;
        let fetcher = MockFetcher::new(vec![Ok(first)]);
        let err = paginator().run(&fetcher, "u").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::MissingField(_))
        ));
    }
}
