//! A small Rust client for the Elsevier Scopus search and abstract retrieval APIs.
//!
//! This crate implements the usual Scopus workflow:
//! build an advanced-search query, page through the results with a cursor while
//! keeping an eye on the weekly quota, flatten the records into a table, and save
//! it for later reuse.
//!
//! ## Quick start
//! - Configure authentication via environment variables (`SCOPUS_API_KEY`, optionally
//!   `SCOPUS_API_URL`) or a `.scopusrc` file (current directory or home directory).
//! - Call [`Client::search`] with a [`SearchCriteria`].
//!
//! ```no_run
//! use anyhow::Result;
//! use scopusapi::{Client, PaginationOutcome, SearchCriteria, Table};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let criteria = SearchCriteria::new()
//!         .issn("0028-0836")
//!         .keyword("graphene")
//!         .start_year(2019);
//!
//!     let outcome = client.search(&criteria)?;
//!     if let PaginationOutcome::QuotaExceeded { remaining, .. } = &outcome {
//!         eprintln!("only {} calls left this week", remaining);
//!     }
//!     let table = Table::from_records(&outcome.into_results().records);
//!     table.write_csv(std::path::Path::new("results.csv"))?;
//!     table.save(std::path::Path::new("results.json"))?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod ids;
mod paginate;
mod query;
mod rate;
mod request;
mod response;
mod table;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ApiError;
pub use ids::read_identifiers;
pub use paginate::{
    DEFAULT_DELAY, FetchedPage, PageFetcher, PaginationOutcome, Paginator, ResultSet,
};
pub use query::SearchCriteria;
pub use rate::RateState;
pub use request::{Endpoints, IdentifierKind};
pub use response::{Cursor, Page, Retrieval};
pub use table::{Table, flatten};
