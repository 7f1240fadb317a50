use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

const SEARCH_PATH: &str = "content/search/scopus";
const RETRIEVAL_PATH: &str = "content/abstract";

/// Search and retrieval endpoints derived from the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub search: String,
    pub retrieval: String,
}

impl Endpoints {
    pub fn from_base(base: &str) -> Self {
        Self {
            search: urljoin(base, SEARCH_PATH),
            retrieval: urljoin(base, RETRIEVAL_PATH),
        }
    }

    /// URL of the search endpoint for `query`. The cursor is added per page.
    ///
    /// The query is substituted verbatim; the HTTP layer percent-encodes spaces
    /// and other characters when the URL is parsed.
    pub fn search_url(&self, query: &str, key: &str) -> String {
        format!("{}?query={}&apiKey={}", self.search, query, key)
    }

    /// URL of one abstract record. Search results report Scopus IDs as
    /// `SCOPUS_ID:<id>`; the prefix is stripped.
    pub fn retrieval_url(&self, kind: IdentifierKind, identifier: &str, key: &str) -> String {
        let identifier = identifier.trim();
        let identifier = match kind {
            IdentifierKind::ScopusId => identifier
                .strip_prefix("SCOPUS_ID:")
                .unwrap_or(identifier),
            _ => identifier,
        };
        format!(
            "{}/{}/{}?apiKey={}",
            self.retrieval,
            kind.as_str(),
            identifier,
            key
        )
    }
}

/// Identifier namespaces accepted by the abstract retrieval API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierKind {
    #[default]
    ScopusId,
    Eid,
    Doi,
    Pii,
    PubmedId,
}

impl IdentifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierKind::ScopusId => "scopus_id",
            IdentifierKind::Eid => "eid",
            IdentifierKind::Doi => "doi",
            IdentifierKind::Pii => "pii",
            IdentifierKind::PubmedId => "pubmed_id",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "scopus_id" | "scopus-id" | "scopusid" => IdentifierKind::ScopusId,
            "eid" => IdentifierKind::Eid,
            "doi" => IdentifierKind::Doi,
            "pii" => IdentifierKind::Pii,
            "pubmed_id" | "pubmed-id" | "pmid" => IdentifierKind::PubmedId,
            other => bail!(
                "unknown identifier kind [{}] (expected scopus_id, eid, doi, pii or pubmed_id)",
                other
            ),
        })
    }
}

fn urljoin(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slash() {
        let e = Endpoints::from_base("https://api.elsevier.com/");
        assert_eq!(e.search, "https://api.elsevier.com/content/search/scopus");
        assert_eq!(e.retrieval, "https://api.elsevier.com/content/abstract");
    }

    #[test]
    fn search_url_contains_query_and_key_verbatim() {
        let e = Endpoints::from_base("https://api.elsevier.com");
        let query = "ISSN(0028-0836) AND PUBYEAR > 2019";
        let url = e.search_url(query, "k3y");
        assert_eq!(
            url,
            "https://api.elsevier.com/content/search/scopus?query=ISSN(0028-0836) AND PUBYEAR > 2019&apiKey=k3y"
        );
        assert!(url.contains(query));
        assert!(url.contains("k3y"));
        assert!(!url.contains('{') && !url.contains('}'));
    }

    #[test]
    fn placeholder_text_in_query_is_not_substituted() {
        let e = Endpoints::from_base("https://api.elsevier.com");
        let url = e.search_url("TITLE({key}) AND KEY({endpoint})", "k3y");
        assert_eq!(
            url,
            "https://api.elsevier.com/content/search/scopus?query=TITLE({key}) AND KEY({endpoint})&apiKey=k3y"
        );
        assert_eq!(url.matches("k3y").count(), 1);
    }

    #[test]
    fn retrieval_url_uses_identifier_kind() {
        let e = Endpoints::from_base("https://api.elsevier.com");
        let url = e.retrieval_url(IdentifierKind::Eid, " 2-s2.0-85012345678 ", "k3y");
        assert_eq!(
            url,
            "https://api.elsevier.com/content/abstract/eid/2-s2.0-85012345678?apiKey=k3y"
        );
        assert!(!url.contains('{'));
    }

    #[test]
    fn scopus_id_prefix_is_stripped() {
        let e = Endpoints::from_base("https://api.elsevier.com");
        assert_eq!(
            e.retrieval_url(IdentifierKind::ScopusId, "SCOPUS_ID:85012345678", "k"),
            "https://api.elsevier.com/content/abstract/scopus_id/85012345678?apiKey=k"
        );
    }

    #[test]
    fn identifier_kind_parses_aliases() {
        assert_eq!("PMID".parse::<IdentifierKind>().unwrap(), IdentifierKind::PubmedId);
        assert_eq!("scopus-id".parse::<IdentifierKind>().unwrap(), IdentifierKind::ScopusId);
        assert!("isbn".parse::<IdentifierKind>().is_err());
    }
}
