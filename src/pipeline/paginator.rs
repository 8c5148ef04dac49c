use std::collections::VecDeque;
use tracing::{debug, info};

use crate::app::ports::QueryPort;
use crate::error::Result;
use crate::metrics::RecordMetrics;
use crate::types::{ContinuationToken, QueryRequest, RawRecord};

enum Cursor {
    /// No query issued yet
    Start,
    /// The last page carried a token; another query is due when the buffer drains
    Next(ContinuationToken),
    /// The last page carried no token, or a query failed
    Done,
}

/// Lazy walk over every record of one partition, following continuation
/// tokens until the store stops returning them.
///
/// A query is only issued when the buffered page is drained and the
/// consumer asks for another item. Query errors are yielded once, after
/// which the iterator is finished.
pub struct CursorPaginator<Q> {
    store: Q,
    benchmark_id: String,
    cursor: Cursor,
    buffer: VecDeque<RawRecord>,
    pages: usize,
    yielded: usize,
}

impl<Q: QueryPort> CursorPaginator<Q> {
    pub fn new(store: Q, benchmark_id: impl Into<String>) -> Self {
        Self {
            store,
            benchmark_id: benchmark_id.into(),
            cursor: Cursor::Start,
            buffer: VecDeque::new(),
            pages: 0,
            yielded: 0,
        }
    }

    pub fn benchmark_id(&self) -> &str {
        &self.benchmark_id
    }

    /// Pages fetched so far in this session
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    fn fetch_page(&mut self, start: Option<ContinuationToken>) -> Result<()> {
        let request = QueryRequest {
            partition_value: self.benchmark_id.clone(),
            start,
        };
        let page = match self.store.query(&request) {
            Ok(page) => page,
            Err(e) => {
                RecordMetrics::query_error();
                self.cursor = Cursor::Done;
                return Err(e);
            }
        };

        self.pages += 1;
        RecordMetrics::page_fetched(page.items.len());
        debug!(
            benchmark_id = %self.benchmark_id,
            page = self.pages,
            items = page.items.len(),
            more = page.next.is_some(),
            "fetched record page"
        );

        self.buffer.extend(page.items);
        self.cursor = match page.next {
            Some(token) => Cursor::Next(token),
            None => {
                info!(
                    benchmark_id = %self.benchmark_id,
                    pages = self.pages,
                    records = self.yielded + self.buffer.len(),
                    "partition exhausted"
                );
                Cursor::Done
            }
        };
        Ok(())
    }
}

impl<Q: QueryPort> Iterator for CursorPaginator<Q> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                self.yielded += 1;
                RecordMetrics::record_yielded();
                return Some(Ok(record));
            }

            // Empty pages that still carry a token are followed
            let start = match std::mem::replace(&mut self.cursor, Cursor::Done) {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };
            if let Err(e) = self.fetch_page(start) {
                return Some(Err(e));
            }
        }
    }
}

impl<Q: QueryPort> std::iter::FusedIterator for CursorPaginator<Q> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::types::QueryPage;
    use std::cell::RefCell;

    /// Serves canned pages; token `n` resumes at page `n`
    struct PagedStore {
        pages: Vec<Vec<RawRecord>>,
        requests: RefCell<Vec<QueryRequest>>,
        fail_on_page: Option<usize>,
    }

    impl PagedStore {
        fn new(pages: Vec<Vec<RawRecord>>) -> Self {
            Self {
                pages,
                requests: RefCell::new(Vec::new()),
                fail_on_page: None,
            }
        }
    }

    impl QueryPort for PagedStore {
        fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
            self.requests.borrow_mut().push(request.clone());
            let index = match &request.start {
                None => 0,
                Some(token) => token.clone().into_store_key().as_u64().unwrap() as usize,
            };
            if self.fail_on_page == Some(index) {
                return Err(BenchError::Api {
                    status: 500,
                    message: "InternalServerError".into(),
                });
            }
            let items = self.pages.get(index).cloned().unwrap_or_default();
            let next = (index + 1 < self.pages.len())
                .then(|| ContinuationToken::from_store_key(serde_json::json!(index + 1)));
            Ok(QueryPage { items, next })
        }
    }

    fn records(range: std::ops::Range<i64>) -> Vec<RawRecord> {
        range.map(|ts| RawRecord::new(ts, "{}")).collect()
    }

    #[test]
    fn test_single_page() {
        let store = PagedStore::new(vec![records(0..3)]);
        let out: Vec<_> = CursorPaginator::new(&store, "b1")
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, records(0..3));
        assert_eq!(store.requests.borrow().len(), 1);
        assert_eq!(store.requests.borrow()[0].partition_value, "b1");
        assert!(store.requests.borrow()[0].start.is_none());
    }

    #[test]
    fn test_follows_tokens_across_pages() {
        let store = PagedStore::new(vec![records(0..2), records(2..5), records(5..6)]);
        let mut paginator = CursorPaginator::new(&store, "b1");
        let out: Vec<_> = paginator.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(out, records(0..6));
        assert_eq!(paginator.pages_fetched(), 3);

        let requests = store.requests.borrow();
        assert_eq!(
            requests[2].start,
            Some(ContinuationToken::from_store_key(serde_json::json!(2)))
        );
    }

    #[test]
    fn test_empty_partition() {
        let store = PagedStore::new(vec![Vec::new()]);
        let mut paginator = CursorPaginator::new(&store, "none");
        assert!(paginator.next().is_none());
        assert!(paginator.next().is_none());
        assert_eq!(store.requests.borrow().len(), 1);
    }

    #[test]
    fn test_skips_empty_page_with_token() {
        let store = PagedStore::new(vec![records(0..1), Vec::new(), records(1..2)]);
        let out: Vec<_> = CursorPaginator::new(&store, "b1")
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, records(0..2));
    }

    #[test]
    fn test_fetches_lazily() {
        let store = PagedStore::new(vec![records(0..2), records(2..4)]);
        let mut paginator = CursorPaginator::new(&store, "b1");
        assert_eq!(store.requests.borrow().len(), 0);

        paginator.next().unwrap().unwrap();
        paginator.next().unwrap().unwrap();
        assert_eq!(store.requests.borrow().len(), 1);

        paginator.next().unwrap().unwrap();
        assert_eq!(store.requests.borrow().len(), 2);
    }

    #[test]
    fn test_error_is_yielded_once_then_fused() {
        let mut store = PagedStore::new(vec![records(0..1), records(1..2)]);
        store.fail_on_page = Some(1);
        let mut paginator = CursorPaginator::new(&store, "b1");

        assert!(paginator.next().unwrap().is_ok());
        let err = paginator.next().unwrap().unwrap_err();
        assert!(matches!(err, BenchError::Api { status: 500, .. }));
        assert!(paginator.next().is_none());
        assert_eq!(store.requests.borrow().len(), 2);
    }
}
