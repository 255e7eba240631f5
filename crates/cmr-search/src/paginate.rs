//! Result retrieval and pagination.
//!
//! CMR paginates two different ways depending on the record kind. Granule
//! and collection searches carry an opaque `cmr-search-after` cursor in
//! response headers that the client echoes back to fetch the next page;
//! tool, service, and variable searches take an explicit `page_num`
//! counter. [`Query::get`] drives whichever protocol the kind requires,
//! and [`Query::results`] exposes the same walk as a lazy iterator.
//!
//! Cursor state is scoped to one retrieval call. Two retrievals from the
//! same query never share a cursor, so a query can be reused freely.

use std::collections::VecDeque;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::{CmrError, CmrResult};
use crate::kind::{ConceptKind, CursorPaged, PaginationStyle};
use crate::query::Query;

/// Largest page size the CMR accepts.
pub const CMR_PAGE_MAX: usize = 2000;

/// Response header carrying the total match count.
const HITS_HEADER: &str = "cmr-hits";
/// Request/response header carrying the pagination cursor.
const SEARCH_AFTER_HEADER: &str = "cmr-search-after";

/// One retrieved result.
///
/// When the query format is `json` the response envelope is unwrapped and
/// each matching record surfaces individually; for every other format the
/// raw page body surfaces as-is, one per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A single record from a JSON response envelope.
    Entry(Value),
    /// One raw page body from a non-JSON response.
    Page(String),
}

impl Record {
    /// The record as parsed JSON, if this is an [`Record::Entry`].
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Record::Entry(value) => Some(value),
            Record::Page(_) => None,
        }
    }

    /// The raw page body, if this is a [`Record::Page`].
    pub fn as_page(&self) -> Option<&str> {
        match self {
            Record::Entry(_) => None,
            Record::Page(body) => Some(body),
        }
    }
}

impl<K: ConceptKind> Query<K> {
    /// Fetch up to `limit` results, requesting pages of at most
    /// [`CMR_PAGE_MAX`] until the limit or the end of the result set is
    /// reached.
    pub fn get(&self, limit: usize) -> CmrResult<Vec<Record>> {
        match K::PAGINATION {
            PaginationStyle::Cursor => self.get_cursor(limit),
            PaginationStyle::PageNumber => self.get_paged(limit),
        }
    }

    fn get_cursor(&self, limit: usize) -> CmrResult<Vec<Record>> {
        let url = self.build_url()?;
        let client = Client::builder().build()?;
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut fetched = 0usize;

        while fetched < limit {
            let page_size = (limit - fetched).min(CMR_PAGE_MAX);
            let mut request = client
                .get(&url)
                .query(&[("page_size", page_size.to_string())]);
            if let Some(cursor) = &cursor {
                request = request.header(SEARCH_AFTER_HEADER, cursor);
            }

            debug!(page_size, fetched, "requesting result page");
            let response = check_status(self.apply_headers(request).send()?)?;
            let next_cursor = read_cursor(&response);
            let page = page_records(response, self.output_format(), PaginationStyle::Cursor)?;

            records.extend(page);
            fetched += page_size;

            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    fn get_paged(&self, limit: usize) -> CmrResult<Vec<Record>> {
        let url = self.build_url()?;
        let client = Client::builder().build()?;
        // page_num is an offset in units of page_size; the size must stay
        // fixed for the whole walk or the window shifts over records
        // already seen.
        let page_size = limit.min(CMR_PAGE_MAX);
        let mut records = Vec::new();
        let mut page_num = 1usize;

        while records.len() < limit {
            let request = client.get(&url).query(&[
                ("page_size", page_size.to_string()),
                ("page_num", page_num.to_string()),
            ]);

            debug!(page_size, page_num, "requesting result page");
            let response = check_status(self.apply_headers(request).send()?)?;
            let page = page_records(response, self.output_format(), PaginationStyle::PageNumber)?;

            if page.is_empty() {
                break;
            }
            records.extend(page);
            page_num += 1;
        }

        records.truncate(limit);
        Ok(records)
    }

    /// Walk the full result set lazily, one blocking page request at a
    /// time, pulled on demand.
    pub fn results(&self) -> CmrResult<RecordStream> {
        self.results_with_page_size(CMR_PAGE_MAX)
    }

    /// Like [`Query::results`] with an explicit page size, clamped to
    /// `1..=CMR_PAGE_MAX`.
    pub fn results_with_page_size(&self, page_size: usize) -> CmrResult<RecordStream> {
        Ok(RecordStream {
            client: Client::builder().build()?,
            url: self.build_url()?,
            format: self.output_format().to_string(),
            headers: self.headers.clone(),
            style: K::PAGINATION,
            page_size: page_size.clamp(1, CMR_PAGE_MAX),
            cursor: None,
            page_num: 1,
            buffer: VecDeque::new(),
            done: false,
        })
    }

    fn apply_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        request
    }
}

impl<K: CursorPaged> Query<K> {
    /// Probe the total number of matching records without fetching any,
    /// via a zero-sized page and the count header.
    pub fn hits(&self) -> CmrResult<usize> {
        let url = self.build_url()?;
        let client = Client::builder().build()?;
        let request = client.get(&url).query(&[("page_size", "0")]);
        let response = check_status(self.apply_headers(request).send()?)?;

        response
            .headers()
            .get(HITS_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok())
            .ok_or_else(|| {
                CmrError::MalformedResponse(format!("missing or unreadable {} header", HITS_HEADER))
            })
    }

    /// Fetch every matching record.
    ///
    /// Runs [`Query::hits`] and then fetches that many. The two steps are
    /// not atomic: records added or removed between them can shift the
    /// result.
    pub fn get_all(&self) -> CmrResult<Vec<Record>> {
        let hits = self.hits()?;
        self.get(hits)
    }
}

/// Lazy pagination over a result set.
///
/// Yields one [`Record`] at a time, issuing a blocking page request
/// whenever the current page is exhausted. Dropping the stream early
/// simply stops requesting; a failed request yields the error and ends
/// the stream.
#[derive(Debug)]
pub struct RecordStream {
    client: Client,
    url: String,
    format: String,
    headers: Vec<(String, String)>,
    style: PaginationStyle,
    page_size: usize,
    cursor: Option<String>,
    page_num: usize,
    buffer: VecDeque<Record>,
    done: bool,
}

impl RecordStream {
    fn fetch_page(&mut self) -> CmrResult<()> {
        let mut request = self
            .client
            .get(&self.url)
            .query(&[("page_size", self.page_size.to_string())]);
        match self.style {
            PaginationStyle::Cursor => {
                if let Some(cursor) = &self.cursor {
                    request = request.header(SEARCH_AFTER_HEADER, cursor);
                }
            }
            PaginationStyle::PageNumber => {
                request = request.query(&[("page_num", self.page_num.to_string())]);
            }
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        debug!(page_size = self.page_size, page_num = self.page_num, "requesting result page");
        let response = check_status(request.send()?)?;
        let next_cursor = read_cursor(&response);
        let page = page_records(response, &self.format, self.style)?;

        match self.style {
            PaginationStyle::Cursor => {
                self.cursor = next_cursor;
                self.done = self.cursor.is_none();
            }
            PaginationStyle::PageNumber => {
                self.done = page.is_empty();
            }
        }
        self.page_num += 1;
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for RecordStream {
    type Item = CmrResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fetch_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

fn check_status(response: Response) -> CmrResult<Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(CmrError::RequestFailed {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn read_cursor(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SEARCH_AFTER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn page_records(
    response: Response,
    format: &str,
    style: PaginationStyle,
) -> CmrResult<Vec<Record>> {
    if format != "json" {
        return Ok(vec![Record::Page(response.text()?)]);
    }

    let body: Value = response.json()?;
    let (entries, envelope) = match style {
        PaginationStyle::Cursor => (
            body.get("feed").and_then(|feed| feed.get("entry")),
            "feed.entry",
        ),
        PaginationStyle::PageNumber => (body.get("items"), "items"),
    };
    let entries = entries.and_then(Value::as_array).ok_or_else(|| {
        CmrError::MalformedResponse(format!("response body has no {} array", envelope))
    })?;

    Ok(entries.iter().cloned().map(Record::Entry).collect())
}
