//! Upstream search query construction.
//!
//! See <https://hn.algolia.com/api> for the endpoint reference.

use url::Url;

/// Hits requested per upstream page.
pub const PAGE_SIZE: usize = 100;

/// Ranking of the upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/search`: relevance, then points, then number of comments.
    Relevance,
    /// `/search_by_date`: most recent first.
    Recency,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Relevance => "search",
            Endpoint::Recency => "search_by_date",
        }
    }
}

/// Content type filter sent as `tags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTag {
    Story,
    Comment,
}

impl ContentTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentTag::Story => "story",
            ContentTag::Comment => "comment",
        }
    }

    /// The only attribute searched, with typo tolerance disabled on it.
    pub fn searchable_attribute(self) -> &'static str {
        match self {
            ContentTag::Story => "title",
            ContentTag::Comment => "comment_text",
        }
    }
}

/// A search against one endpoint, minus the page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub endpoint: Endpoint,
    pub tag: ContentTag,
    /// Free text; empty matches everything.
    pub term: String,
    pub hits_per_page: usize,
}

impl SearchQuery {
    pub fn new(endpoint: Endpoint, tag: ContentTag, term: impl Into<String>) -> Self {
        Self {
            endpoint,
            tag,
            term: term.into(),
            hits_per_page: PAGE_SIZE,
        }
    }

    /// Full request URL under `api_root`, with `page` when paginating.
    pub fn url(&self, api_root: &Url, page: Option<usize>) -> Url {
        let mut url = api_root.clone();
        let path = format!(
            "{}/{}",
            api_root.path().trim_end_matches('/'),
            self.endpoint.path()
        );
        url.set_path(&path);

        let attribute = self.tag.searchable_attribute();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs
                .append_pair("query", &self.term)
                .append_pair("tags", self.tag.as_str())
                .append_pair("hitsPerPage", &self.hits_per_page.to_string())
                .append_pair("restrictSearchableAttributes", attribute)
                .append_pair("disableTypoToleranceOnAttributes", attribute);
            if let Some(page) = page {
                pairs.append_pair("page", &page.to_string());
            }
        }
        url
    }
}
