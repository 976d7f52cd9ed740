//! Hit fetching: one-shot pages and the lazy paginated cursor.

use serde::Deserialize;
use url::Url;

use crate::error::{HnResult, UpstreamError};
use crate::http::Transport;
use crate::property::RawHit;
use crate::query::SearchQuery;

/// The parts of an upstream response page that are consumed.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub hits: Vec<RawHit>,
    /// Index of this page, as reported by the server.
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default, rename = "nbPages")]
    pub nb_pages: Option<usize>,
}

fn fetch_page<T: Transport>(transport: &T, url: &Url) -> HnResult<SearchPage> {
    let body = transport.get_json(url)?;
    serde_json::from_value(body).map_err(|e| {
        UpstreamError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Issue exactly one request and return its hits (at most one page).
pub fn fetch_single<T: Transport>(
    transport: &T,
    api_root: &Url,
    query: &SearchQuery,
) -> HnResult<Vec<RawHit>> {
    let url = query.url(api_root, None);
    let page = fetch_page(transport, &url)?;
    tracing::debug!(url = %url, hits = page.hits.len(), "page received");
    Ok(page.hits)
}

enum CursorState {
    NeedPage,
    Buffered {
        hits: std::vec::IntoIter<RawHit>,
        /// `page` and `nbPages` of the buffered response.
        page: Option<usize>,
        nb_pages: Option<usize>,
    },
    Exhausted,
}

/// Pull-based iterator over up to `limit` hits, fetching pages on demand.
///
/// Pages are requested only when the previous one is drained and the limit
/// is not yet reached, so `limit` hits cost `ceil(limit / page size)`
/// requests when the upstream has enough of them. An error is yielded once
/// and ends the sequence.
pub struct PageCursor<'a, T: Transport> {
    transport: &'a T,
    api_root: &'a Url,
    query: &'a SearchQuery,
    limit: usize,
    page_index: usize,
    emitted: usize,
    pages_fetched: usize,
    state: CursorState,
}

impl<'a, T: Transport> PageCursor<'a, T> {
    pub fn new(transport: &'a T, api_root: &'a Url, query: &'a SearchQuery, limit: usize) -> Self {
        Self {
            transport,
            api_root,
            query,
            limit,
            page_index: 0,
            emitted: 0,
            pages_fetched: 0,
            state: CursorState::NeedPage,
        }
    }

    /// Upstream requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Hits yielded so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// State after a page is drained.
    fn advance(&mut self, page: Option<usize>, nb_pages: Option<usize>) -> CursorState {
        match (page, nb_pages) {
            (Some(page), Some(nb_pages)) if page + 1 < nb_pages => {
                self.page_index = page + 1;
                CursorState::NeedPage
            }
            _ => CursorState::Exhausted,
        }
    }
}

impl<T: Transport> Iterator for PageCursor<'_, T> {
    type Item = HnResult<RawHit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.emitted >= self.limit {
                self.state = CursorState::Exhausted;
            }

            match std::mem::replace(&mut self.state, CursorState::Exhausted) {
                CursorState::Exhausted => return None,
                CursorState::NeedPage => {
                    let url = self.query.url(self.api_root, Some(self.page_index));
                    self.pages_fetched += 1;
                    let page = match fetch_page(self.transport, &url) {
                        Ok(page) => page,
                        Err(e) => return Some(Err(e)),
                    };
                    tracing::debug!(
                        url = %url,
                        page = self.page_index,
                        hits = page.hits.len(),
                        nb_pages = ?page.nb_pages,
                        "page received"
                    );
                    // An empty page ends the walk even if nbPages says otherwise.
                    if page.hits.is_empty() {
                        return None;
                    }
                    self.state = CursorState::Buffered {
                        hits: page.hits.into_iter(),
                        page: page.page,
                        nb_pages: page.nb_pages,
                    };
                }
                CursorState::Buffered {
                    mut hits,
                    page,
                    nb_pages,
                } => match hits.next() {
                    Some(hit) => {
                        self.emitted += 1;
                        self.state = CursorState::Buffered {
                            hits,
                            page,
                            nb_pages,
                        };
                        return Some(Ok(hit));
                    }
                    None => self.state = self.advance(page, nb_pages),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ContentTag, Endpoint};
    use serde_json::{Value, json};
    use std::cell::RefCell;

    /// Serves `total` numbered hits in pages of `hitsPerPage`.
    struct Pages {
        total: usize,
        requested: RefCell<Vec<usize>>,
    }

    impl Pages {
        fn new(total: usize) -> Self {
            Self {
                total,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Pages {
        fn get_json(&self, url: &Url) -> HnResult<Value> {
            let param = |name: &str| {
                url.query_pairs()
                    .find(|(k, _)| k == name)
                    .and_then(|(_, v)| v.parse::<usize>().ok())
            };
            let page = param("page").unwrap_or(0);
            let per_page = param("hitsPerPage").unwrap_or(100);
            self.requested.borrow_mut().push(page);
            let start = (page * per_page).min(self.total);
            let end = ((page + 1) * per_page).min(self.total);
            let hits: Vec<Value> = (start..end).map(|i| json!({"id": i})).collect();
            Ok(json!({
                "hits": hits,
                "page": page,
                "nbPages": self.total.div_ceil(per_page),
            }))
        }
    }

    fn collect(pages: &Pages, limit: usize) -> Vec<u64> {
        let root = Url::parse("http://hn.test/api/v1").unwrap();
        let query = SearchQuery::new(Endpoint::Relevance, ContentTag::Comment, "");
        PageCursor::new(pages, &root, &query, limit)
            .map(|hit| hit.unwrap()["id"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn limit_mid_page_stops_fetching() {
        let pages = Pages::new(1000);
        let ids = collect(&pages, 250);
        assert_eq!(ids.len(), 250);
        assert_eq!(ids[249], 249);
        assert_eq!(*pages.requested.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn exact_page_multiple_does_not_prefetch() {
        let pages = Pages::new(1000);
        assert_eq!(collect(&pages, 200).len(), 200);
        assert_eq!(*pages.requested.borrow(), vec![0, 1]);
    }

    #[test]
    fn stops_at_last_reported_page() {
        let pages = Pages::new(130);
        assert_eq!(collect(&pages, 1000).len(), 130);
        assert_eq!(*pages.requested.borrow(), vec![0, 1]);
    }

    #[test]
    fn zero_limit_makes_no_request() {
        let pages = Pages::new(1000);
        assert!(collect(&pages, 0).is_empty());
        assert!(pages.requested.borrow().is_empty());
    }

    struct Scripted(RefCell<Vec<HnResult<Value>>>);

    impl Transport for Scripted {
        fn get_json(&self, _url: &Url) -> HnResult<Value> {
            self.0.borrow_mut().remove(0)
        }
    }

    fn run(script: Vec<HnResult<Value>>, limit: usize) -> (Vec<HnResult<RawHit>>, usize) {
        let transport = Scripted(RefCell::new(script));
        let root = Url::parse("http://hn.test").unwrap();
        let query = SearchQuery::new(Endpoint::Relevance, ContentTag::Comment, "x");
        let mut cursor = PageCursor::new(&transport, &root, &query, limit);
        let items: Vec<_> = cursor.by_ref().collect();
        (items, cursor.pages_fetched())
    }

    #[test]
    fn empty_page_ends_walk_despite_page_count() {
        let (items, fetched) = run(
            vec![
                Ok(json!({"hits": [{"id": 1}], "page": 0, "nbPages": 5})),
                Ok(json!({"hits": [], "page": 1, "nbPages": 5})),
            ],
            100,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(fetched, 2);
    }

    #[test]
    fn missing_cursor_fields_stop_after_first_page() {
        let (items, fetched) = run(vec![Ok(json!({"hits": [{"id": 1}, {"id": 2}]}))], 100);
        assert_eq!(items.len(), 2);
        assert_eq!(fetched, 1);
    }

    #[test]
    fn error_is_yielded_once() {
        let (items, fetched) = run(
            vec![
                Ok(json!({"hits": [{"id": 1}], "page": 0, "nbPages": 3})),
                Err(UpstreamError::Status {
                    url: "http://hn.test".into(),
                    status: 403,
                }
                .into()),
            ],
            100,
        );
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert_eq!(fetched, 2);
    }

    #[test]
    fn malformed_page_is_a_decode_error() {
        let (items, _) = run(vec![Ok(json!({"hits": "nope"}))], 10);
        assert!(matches!(
            items.as_slice(),
            [Err(crate::error::HnError::Upstream(UpstreamError::Decode { .. }))]
        ));
    }

    #[test]
    fn single_fetch_returns_one_page() {
        let pages = Pages::new(500);
        let root = Url::parse("http://hn.test/api/v1").unwrap();
        let query = SearchQuery::new(Endpoint::Recency, ContentTag::Story, "rust");
        let hits = fetch_single(&pages, &root, &query).unwrap();
        assert_eq!(hits.len(), 100);
        assert_eq!(pages.requested.borrow().len(), 1);
    }
}
