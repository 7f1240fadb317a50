//! Scopus advanced-search query construction.

/// Named search fields. Empty strings and zero values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub issn: String,
    /// Author name, searched with `AUTH(...)`.
    pub author: String,
    pub keyword: String,
    pub publisher: String,
    pub exact_source_title: String,
    pub affiliation: String,
    pub title: String,
    /// `1` restricts to open-access documents.
    pub open_access: u32,
    /// Documents published after this year (exclusive).
    pub start_year: u32,
    /// Documents published before this year (exclusive).
    pub end_year: u32,
}

enum Render {
    Term(&'static str),
    After,
    Before,
}

/// Terms in declared query order.
fn terms(c: &SearchCriteria) -> [(Option<String>, Render); 10] {
    [
        (text(&c.issn), Render::Term("ISSN")),
        (text(&c.author), Render::Term("AUTH")),
        (text(&c.keyword), Render::Term("KEY")),
        (text(&c.publisher), Render::Term("PUBLISHER")),
        (text(&c.exact_source_title), Render::Term("EXACTSRCTITLE")),
        (text(&c.affiliation), Render::Term("AFFIL")),
        (text(&c.title), Render::Term("TITLE")),
        (number(c.open_access), Render::Term("OPENACCESS")),
        (number(c.start_year), Render::After),
        (number(c.end_year), Render::Before),
    ]
}

fn text(v: &str) -> Option<String> {
    if v.is_empty() { None } else { Some(v.to_string()) }
}

fn number(v: u32) -> Option<String> {
    if v == 0 { None } else { Some(v.to_string()) }
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issn(mut self, v: impl Into<String>) -> Self {
        self.issn = v.into();
        self
    }

    pub fn author(mut self, v: impl Into<String>) -> Self {
        self.author = v.into();
        self
    }

    pub fn keyword(mut self, v: impl Into<String>) -> Self {
        self.keyword = v.into();
        self
    }

    pub fn publisher(mut self, v: impl Into<String>) -> Self {
        self.publisher = v.into();
        self
    }

    pub fn exact_source_title(mut self, v: impl Into<String>) -> Self {
        self.exact_source_title = v.into();
        self
    }

    pub fn affiliation(mut self, v: impl Into<String>) -> Self {
        self.affiliation = v.into();
        self
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.title = v.into();
        self
    }

    pub fn open_access(mut self, v: bool) -> Self {
        self.open_access = u32::from(v);
        self
    }

    pub fn start_year(mut self, v: u32) -> Self {
        self.start_year = v;
        self
    }

    pub fn end_year(mut self, v: u32) -> Self {
        self.end_year = v;
        self
    }

    /// Builds the boolean query string, e.g. `ISSN(0028-0836) AND PUBYEAR > 2019`.
    ///
    /// Values are not validated or escaped; the API rejects malformed queries.
    pub fn to_query(&self) -> String {
        terms(self)
            .into_iter()
            .filter_map(|(value, render)| {
                value.map(|v| match render {
                    Render::Term(name) => format!("{}({})", name, v),
                    Render::After => format!("PUBYEAR > {}", v),
                    Render::Before => format!("PUBYEAR < {}", v),
                })
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn is_empty(&self) -> bool {
        self.to_query().is_empty()
    }
}
