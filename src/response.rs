use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ApiError;

/// Opaque pagination cursor. `next == current` marks the last page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cursor {
    #[serde(rename = "@current")]
    pub current: String,
    #[serde(rename = "@next", default)]
    pub next: String,
}

impl Cursor {
    pub const FIRST: &'static str = "*";

    pub fn is_first(&self) -> bool {
        self.current == Self::FIRST
    }

    pub fn is_last(&self) -> bool {
        self.next.is_empty() || self.next == self.current
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub total_results: u64,
    pub items_per_page: u64,
    pub entries: Vec<Value>,
    pub cursor: Cursor,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default, rename = "search-results")]
    search_results: Option<RawSearchResults>,
}

#[derive(Debug, Deserialize)]
struct RawSearchResults {
    #[serde(default, rename = "opensearch:totalResults", deserialize_with = "count")]
    total_results: Option<u64>,
    #[serde(default, rename = "opensearch:itemsPerPage", deserialize_with = "count")]
    items_per_page: Option<u64>,
    #[serde(default)]
    cursor: Option<Cursor>,
    #[serde(default)]
    entry: Vec<Value>,
}

impl Page {
    pub fn from_json(body: Value) -> Result<Self, ApiError> {
        let envelope: SearchEnvelope =
            serde_json::from_value(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let raw = envelope
            .search_results
            .ok_or(ApiError::MissingField("search-results"))?;

        let total_results = raw
            .total_results
            .ok_or(ApiError::MissingField("opensearch:totalResults"))?;
        let cursor = raw.cursor.ok_or(ApiError::MissingField("cursor"))?;

        // An empty result set comes back as a single placeholder entry:
        // {"@_fa": "true", "error": "Result set was empty"}
        let entries = raw
            .entry
            .into_iter()
            .filter(|e| e.get("error").is_none())
            .collect();

        Ok(Page {
            total_results,
            items_per_page: raw.items_per_page.unwrap_or(0),
            entries,
            cursor,
        })
    }
}

/// Decoded abstract retrieval response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Retrieval {
    #[serde(default)]
    pub coredata: Option<Value>,
    #[serde(default)]
    pub item: Option<Value>,
    #[serde(default)]
    pub affiliation: Option<Value>,
    #[serde(default)]
    pub authors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RetrievalEnvelope {
    #[serde(default, rename = "abstracts-retrieval-response")]
    response: Option<Retrieval>,
}

impl Retrieval {
    pub fn from_json(body: Value) -> Result<Self, ApiError> {
        let envelope: RetrievalEnvelope =
            serde_json::from_value(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let retrieval = envelope
            .response
            .ok_or(ApiError::MissingField("abstracts-retrieval-response"))?;
        if retrieval.coredata.is_none() {
            return Err(ApiError::MissingField("coredata"));
        }
        Ok(retrieval)
    }

    /// The retrieval as a single JSON object, ready for flattening.
    pub fn to_record(&self) -> Value {
        let mut obj = serde_json::Map::new();
        for (name, part) in [
            ("coredata", &self.coredata),
            ("item", &self.item),
            ("affiliation", &self.affiliation),
            ("authors", &self.authors),
        ] {
            if let Some(v) = part {
                obj.insert(name.to_string(), v.clone());
            }
        }
        Value::Object(obj)
    }
}

// The API reports counts as strings ("1234"); accept plain numbers as well.
fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid count [{}]", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_search_page() {
        let page = Page::from_json(json!({
            "search-results": {
                "opensearch:totalResults": "42",
                "opensearch:itemsPerPage": 25,
                "cursor": {"@current": "*", "@next": "AoJ3"},
                "entry": [{"dc:title": "A"}, {"dc:title": "B"}]
            }
        }))
        .unwrap();
        assert_eq!(page.total_results, 42);
        assert_eq!(page.items_per_page, 25);
        assert_eq!(page.entries.len(), 2);
        assert!(page.cursor.is_first());
        assert!(!page.cursor.is_last());
    }

    #[test]
    fn drops_empty_result_placeholder() {
        let page = Page::from_json(json!({
            "search-results": {
                "opensearch:totalResults": "0",
                "cursor": {"@current": "*", "@next": "*"},
                "entry": [{"@_fa": "true", "error": "Result set was empty"}]
            }
        }))
        .unwrap();
        assert!(page.entries.is_empty());
        assert!(page.cursor.is_last());
    }

    #[test]
    fn missing_envelope_fields_are_named() {
        let err = Page::from_json(json!({"other": {}})).unwrap_err();
        assert!(matches!(err, ApiError::MissingField("search-results")));

        let err = Page::from_json(json!({
            "search-results": {"cursor": {"@current": "*", "@next": "x"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ApiError::MissingField("opensearch:totalResults")));

        let err = Page::from_json(json!({
            "search-results": {"opensearch:totalResults": "3"}
        }))
        .unwrap_err();
        assert!(matches!(err, ApiError::MissingField("cursor")));
    }

    #[test]
    fn non_numeric_count_is_malformed() {
        let err = Page::from_json(json!({
            "search-results": {
                "opensearch:totalResults": "many",
                "cursor": {"@current": "*", "@next": "x"}
            }
        }))
        .unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn decodes_retrieval_and_builds_record() {
        let r = Retrieval::from_json(json!({
            "abstracts-retrieval-response": {
                "coredata": {"dc:title": "T", "citedby-count": "7"},
                "authors": {"author": [{"ce:indexed-name": "Doe J."}]}
            }
        }))
        .unwrap();
        assert!(r.item.is_none());
        let record = r.to_record();
        assert_eq!(record["coredata"]["citedby-count"], "7");
        assert!(record.get("item").is_none());
    }

    #[test]
    fn retrieval_without_coredata_is_rejected() {
        let err = Retrieval::from_json(json!({"abstracts-retrieval-response": {}})).unwrap_err();
        assert!(matches!(err, ApiError::MissingField("coredata")));
    }
}
