//! Object storage helpers: lazy listing under a prefix and raw fetch.

use std::collections::VecDeque;
use tracing::debug;

use crate::app::ports::ObjectStorePort;
use crate::error::Result;
use crate::metrics::ObjectMetrics;
use crate::types::{ListCursor, ObjectDescriptor};

/// Lazily walks every object under `prefix`, one listing page at a time.
///
/// Sub-folders reported by the store are walked depth-first once the
/// current folder's pages are exhausted, so every key below the prefix is
/// yielded. Pages without contents are skipped. An empty prefix lists the
/// whole bucket.
pub struct ObjectLister<S> {
    store: S,
    bucket: String,
    current: Option<(Option<String>, ListCursor)>,
    pending: Vec<String>,
    buffer: VecDeque<ObjectDescriptor>,
}

impl<S: ObjectStorePort> ObjectLister<S> {
    pub fn new(store: S, bucket: impl Into<String>, prefix: &str) -> Self {
        let prefix = (!prefix.is_empty()).then(|| prefix.to_string());
        Self {
            store,
            bucket: bucket.into(),
            current: Some((prefix, ListCursor::Start)),
            pending: Vec::new(),
            buffer: VecDeque::new(),
        }
    }

    fn next_listing(&mut self) -> Option<(Option<String>, ListCursor)> {
        self.current
            .take()
            .or_else(|| self.pending.pop().map(|folder| (Some(folder), ListCursor::Start)))
    }
}

impl<S: ObjectStorePort> Iterator for ObjectLister<S> {
    type Item = Result<ObjectDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.buffer.pop_front() {
                return Some(Ok(object));
            }
            let (prefix, cursor) = self.next_listing()?;
            let page = match self.store.list_page(&self.bucket, prefix.as_deref(), cursor) {
                Ok(page) => page,
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            };

            // Reversed so the first folder on the page is walked first
            self.pending.extend(page.folders.into_iter().rev());
            self.current = page.next.map(|next| (prefix.clone(), next));

            let Some(contents) = page.contents else {
                debug!(bucket = %self.bucket, ?prefix, ?cursor, "listing page without contents");
                continue;
            };
            ObjectMetrics::listed(contents.len());
            self.buffer.extend(contents);
        }
    }
}

impl<S: ObjectStorePort> std::iter::FusedIterator for ObjectLister<S> {}

/// Fetch one object's bytes
pub fn fetch_object<S: ObjectStorePort>(store: &S, bucket: &str, key: &str) -> Result<Vec<u8>> {
    let bytes = store.get_object(bucket, key)?;
    ObjectMetrics::fetched(bytes.len());
    debug!(bucket, key, bytes = bytes.len(), "fetched object");
    Ok(bytes)
}
