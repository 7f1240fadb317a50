use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::thread;
use std::time::Duration;

use crate::config::{ClientConfig, load_config};
use crate::error::{format_api_error, redact_key};
use crate::paginate::{DEFAULT_DELAY, FetchedPage, PageFetcher, PaginationOutcome, Paginator};
use crate::query::SearchCriteria;
use crate::rate::RateState;
use crate::request::{Endpoints, IdentifierKind};
use crate::response::{Page, Retrieval};

const JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct Client {
    endpoints: Endpoints,
    key: String,

    timeout: Duration,
    delay: Duration,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.scopusrc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`key` arguments
    /// - environment variables `SCOPUS_API_URL` / `SCOPUS_API_KEY`
    /// - config file from `SCOPUS_RC` or `.scopusrc`
    pub fn new(url: Option<String>, key: Option<String>, verify: Option<bool>) -> Result<Self> {
        Self::with_config(load_config(url, key, verify)?)
    }

    pub fn with_config(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("scopusapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("scopusapi-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(60));

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            endpoints: Endpoints::from_base(&cfg.url),
            key: cfg.key,
            timeout: Duration::from_secs(60),
            delay: DEFAULT_DELAY,
            progress: true,
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pause inserted before every API call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn search_url(&self, query: &str) -> String {
        self.endpoints.search_url(query, &self.key)
    }

    /// Runs a search built from `criteria` and pages through all results.
    pub fn search(&self, criteria: &SearchCriteria) -> Result<PaginationOutcome> {
        self.search_query(&criteria.to_query())
    }

    /// Runs a raw advanced-search query and pages through all results.
    pub fn search_query(&self, query: &str) -> Result<PaginationOutcome> {
        if query.trim().is_empty() {
            bail!("empty search query: set at least one search field");
        }
        tracing::info!(query, "searching");
        let url = self.search_url(query);
        Paginator::new(self.delay)
            .with_progress(self.progress)
            .run(self, &url)
    }

    /// Retrieves one abstract record.
    pub fn retrieve(&self, kind: IdentifierKind, identifier: &str) -> Result<Retrieval> {
        thread::sleep(self.delay);
        let url = self
            .endpoints
            .retrieval_url(kind, identifier, &self.key);
        let (body, headers) = self.get_json(&url, &[], Some(JSON))?;
        let rate = RateState::from_headers(&headers);
        tracing::debug!(%kind, identifier, remaining = ?rate.remaining, "retrieved");
        Retrieval::from_json(body)
            .with_context(|| format!("unexpected retrieval response for {} {}", kind, identifier))
    }

    /// Retrieves records one after another; the first failure aborts the batch.
    pub fn retrieve_many<S: AsRef<str>>(
        &self,
        kind: IdentifierKind,
        identifiers: &[S],
    ) -> Result<Vec<Retrieval>> {
        let pb = if self.progress {
            let pb = ProgressBar::new(identifiers.len() as u64);
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {pos}/{len} records {wide_bar} {eta}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut out = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            let record = self.retrieve(kind, id.as_ref())?;
            out.push(record);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        tracing::info!(records = out.len(), "retrieval complete");
        Ok(out)
    }

    /// Issues a single GET and returns the decoded JSON body with the response headers.
    ///
    /// Any non-2xx status is an [`crate::ApiError::Http`]; nothing is retried.
    pub fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        accept: Option<&str>,
    ) -> Result<(Value, HeaderMap)> {
        let mut req = self.http.get(url).timeout(self.timeout);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(accept) = accept {
            req = req.header(ACCEPT, accept);
        }

        let resp = req
            .send()
            .map_err(|e| e.without_url())
            .with_context(|| format!("could not connect to {}", redact_key(url)))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(format_api_error(status, url, &text).into());
        }

        let body = serde_json::from_str::<Value>(&text).with_context(|| {
            format!(
                "failed to parse API JSON (url={}, status={})",
                redact_key(url),
                status
            )
        })?;
        Ok((body, headers))
    }
}

impl PageFetcher for Client {
    fn fetch_page(&self, url: &str, cursor: &str) -> Result<FetchedPage> {
        let (body, headers) = self.get_json(url, &[("cursor", cursor)], None)?;
        let page = Page::from_json(body)?;
        let rate = RateState::from_headers(&headers);
        tracing::debug!(
            cursor = %page.cursor.current,
            entries = page.entries.len(),
            remaining = ?rate.remaining,
            "page fetched"
        );
        Ok(FetchedPage { page, rate })
    }
}
