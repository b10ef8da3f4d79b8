use crate::client::{Client, Error, Request, Result, HEADER_LINK};
use log::{debug, warn};
use reqwest::Method;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    thread,
    time::Duration,
};
use url::Url;

pub const DEFAULT_PAGE_LIMIT: usize = 1000;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Represents `Pagination` information from a Github API request
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pagination {
    pub next: Option<Url>,
    pub prev: Option<Url>,
    pub first: Option<Url>,
    pub last: Option<Url>,
}

impl Pagination {
    pub(crate) fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let links = match headers.get(HEADER_LINK).and_then(|h| h.to_str().ok()) {
            Some(links) => parse_link_header(links),
            None => return Self::default(),
        };

        let mut pagination = Self::default();
        for (rel, url) in links {
            match rel.as_str() {
                "next" => pagination.next = Some(url),
                "prev" => pagination.prev = Some(url),
                "first" => pagination.first = Some(url),
                "last" => pagination.last = Some(url),
                _ => {}
            }
        }

        pagination
    }

    /// Page number carried by the `next` link, if it has one
    pub fn next_page(&self) -> Option<usize> {
        self.next.as_ref().and_then(page_number)
    }

    pub fn last_page(&self) -> Option<usize> {
        self.last.as_ref().and_then(page_number)
    }
}

fn page_number(url: &Url) -> Option<usize> {
    url.query_pairs()
        .find_map(|(k, v)| if k == "page" { Some(v) } else { None })
        .and_then(|page| page.parse().ok())
}

/// Parse a `Link` header of the form `<url>; rel="name", <url>; rel="name"`
/// into a map of rel to url. Malformed entries are skipped, so a header
/// with nothing usable yields an empty map.
pub fn parse_link_header(links: &str) -> BTreeMap<String, Url> {
    let mut map = BTreeMap::new();

    for link in link_entries(links) {
        let link = link.trim();

        // Check if href segment is well formed and a valid url format
        if !link.starts_with('<') {
            continue;
        }
        let end = match link.find('>') {
            Some(end) => end,
            None => continue,
        };
        let url = match Url::parse(&link[1..end]) {
            Ok(url) => url,
            Err(_) => continue,
        };

        for param in link[end + 1..].split(';').map(str::trim) {
            let mut kv = param.splitn(2, '=');
            if kv.next().map(str::trim) != Some("rel") {
                continue;
            }
            let value = match kv.next() {
                Some(value) => value.trim().trim_matches('"'),
                None => continue,
            };
            // A single rel may name several relations
            for rel in value.split_whitespace() {
                map.insert(rel.to_owned(), url.clone());
            }
        }
    }

    map
}

// Split on the commas separating entries. Commas inside `<url>` or a quoted
// parameter value belong to that entry.
fn link_entries(links: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_url = false;
    let mut in_quotes = false;

    for (i, c) in links.char_indices() {
        match c {
            '<' if !in_quotes => in_url = true,
            '>' if !in_quotes => in_url = false,
            '"' if !in_url => in_quotes = !in_quotes,
            ',' if !in_url && !in_quotes => {
                entries.push(&links[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&links[start..]);

    entries
}

/// How far a paginated fetch may go
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageOptions {
    /// Stop requesting pages once this many items have been collected. The
    /// final page is kept whole, so a run may overshoot by up to one page.
    pub limit: usize,
    /// Pause between consecutive page requests
    pub delay: Duration,
}

impl PageOptions {
    pub fn new(limit: usize, delay: Duration) -> Self {
        Self { limit, delay }
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Items collected by a paginated fetch. When a page request fails the run
/// stops, and the items gathered before the failure are kept alongside the
/// error.
#[derive(Debug)]
pub struct Pages<T> {
    pub items: Vec<T>,
    /// Number of pages successfully fetched
    pub pages: usize,
    pub error: Option<Error>,
}

impl<T> Pages<T> {
    /// A run that stopped before its first request
    pub(crate) fn failed(error: Error) -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            error: Some(error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discard partial results if the run failed
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }
}

impl Client {
    /// GET `url` and every page reachable through `rel="next"` links, running
    /// each array element through `transform`.
    ///
    /// Pages are fetched one at a time, sleeping `options.delay` between
    /// requests, until `options.limit` items are collected or there is no
    /// next page. A url is never fetched twice in one run.
    pub fn fetch_pages<T, F>(&self, url: &str, mut transform: F, options: PageOptions) -> Pages<T>
    where
        F: FnMut(serde_json::Value) -> Result<T>,
    {
        let mut pages = Pages {
            items: Vec::new(),
            pages: 0,
            error: None,
        };
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();

        match self.resolve(url) {
            Ok(url) => queue.push_back(url),
            Err(e) => {
                pages.error = Some(e);
                return pages;
            }
        }

        while pages.items.len() < options.limit {
            let url = match queue.pop_front() {
                Some(url) => url,
                None => break,
            };
            seen.insert(url.clone());

            if let Err(e) = self.fetch_page(url, &mut transform, &mut queue, &seen, &mut pages) {
                warn!("stopping pagination after {} pages: {}", pages.pages, e);
                pages.error = Some(e);
                break;
            }

            if !queue.is_empty() && pages.items.len() < options.limit {
                thread::sleep(options.delay);
            }
        }

        debug!(
            "paginated fetch finished: {} items over {} pages",
            pages.items.len(),
            pages.pages
        );
        pages
    }

    fn fetch_page<T, F>(
        &self,
        url: Url,
        transform: &mut F,
        queue: &mut VecDeque<Url>,
        seen: &HashSet<Url>,
        pages: &mut Pages<T>,
    ) -> Result<()>
    where
        F: FnMut(serde_json::Value) -> Result<T>,
    {
        let (pagination, _rate, body) = self
            .execute(Request::new(Method::GET, url.as_str()))?
            .into_parts();

        if let Some(next) = pagination.next {
            if !seen.contains(&next) && !queue.contains(&next) {
                queue.push_back(next);
            }
        }

        let items = match body {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(format!("expected a JSON array from {}, got {}", url, other).into())
            }
        };

        pages.pages += 1;
        for item in items {
            pages.items.push(transform(item)?);
        }

        Ok(())
    }

    /// Fetch every page of `url`, deserializing each item as `T`
    pub fn fetch_all<T>(&self, url: &str, options: PageOptions) -> Pages<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.fetch_pages(url, |item| Ok(serde_json::from_value(item)?), options)
    }

    /// `fetch_all` with the client's page options and `query` applied to the
    /// first request. The `next` links Github returns already carry the query.
    pub(crate) fn fetch_list<T, Q>(&self, url: &str, query: &Q) -> Pages<T>
    where
        T: serde::de::DeserializeOwned,
        Q: Serialize,
    {
        let first = self.resolve(url).and_then(|mut first| {
            let request = Request::get(first.as_str()).query(query)?;
            if !request.query.is_empty() {
                first.query_pairs_mut().extend_pairs(request.query.iter());
            }
            Ok(first)
        });

        match first {
            Ok(first) => self.fetch_all(first.as_str(), self.page_options()),
            Err(e) => Pages::failed(e),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct PaginationOptions {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
    Open,
    Closed,
    All,
}

impl Default for StateFilter {
    fn default() -> Self {
        StateFilter::Open
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPages {
    Created,
    Updated,
    Comments,
}

impl Default for SortPages {
    fn default() -> Self {
        SortPages::Created
    }
}

#[derive(Debug, Serialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Descending
    }
}
