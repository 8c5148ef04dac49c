use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::app::ports::ObjectStorePort;
use crate::config::ObjectStoreConfig;
use crate::error::{BenchError, Result};
use crate::types::{ListCursor, ObjectDescriptor, ObjectPage};

/// Supabase Storage REST adapter.
///
/// Listings are offset-paged; a page shorter than `page_size` is the last.
/// A listing covers one folder level: entries without an id are folders and
/// come back in `ObjectPage::folders` for the lister to descend into.
pub struct SupabaseObjectStore {
    client: Client,
    base_url: String,
    key: String,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    id: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    metadata: Option<EntryMetadata>,
}

#[derive(Debug, Deserialize)]
struct EntryMetadata {
    size: Option<u64>,
    #[serde(rename = "eTag")]
    etag: Option<String>,
    #[serde(rename = "lastModified")]
    last_modified: Option<DateTime<Utc>>,
}

impl SupabaseObjectStore {
    pub fn new(config: &ObjectStoreConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.require_url()?.to_string(),
            key: config.require_key()?.to_string(),
            page_size: config.page_size,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", self.key.clone())
    }
}

fn offset_of(cursor: ListCursor) -> u64 {
    match cursor {
        ListCursor::Start => 0,
        ListCursor::Offset(n) => n,
    }
}

pub(crate) fn parse_list_page(
    bytes: &[u8],
    prefix: Option<&str>,
    offset: u64,
    page_size: u32,
) -> Result<ObjectPage> {
    let entries: Vec<ListEntry> = serde_json::from_slice(bytes)?;
    if entries.is_empty() {
        return Ok(ObjectPage::default());
    }

    let next = (entries.len() as u64 >= page_size as u64)
        .then(|| ListCursor::Offset(offset + entries.len() as u64));
    let folder = prefix
        .map(|p| p.trim_end_matches('/'))
        .filter(|p| !p.is_empty());
    let full_key = |name: &str| match folder {
        Some(folder) => format!("{}/{}", folder, name),
        None => name.to_string(),
    };

    let mut contents = Vec::new();
    let mut folders = Vec::new();
    for entry in entries {
        // Folders come back without an id
        if entry.id.is_none() {
            folders.push(full_key(&entry.name));
            continue;
        }
        let meta = entry.metadata;
        contents.push(ObjectDescriptor {
            key: full_key(&entry.name),
            size: meta.as_ref().and_then(|m| m.size),
            last_modified: meta
                .as_ref()
                .and_then(|m| m.last_modified)
                .or(entry.updated_at),
            etag: meta
                .and_then(|m| m.etag)
                .map(|t| t.trim_matches('"').to_string()),
        });
    }

    Ok(ObjectPage {
        contents: (!contents.is_empty()).then_some(contents),
        folders,
        next,
    })
}

fn ensure_success(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(BenchError::Api {
        status: status.as_u16(),
        message: body,
    })
}

impl ObjectStorePort for SupabaseObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: ListCursor,
    ) -> Result<ObjectPage> {
        let offset = offset_of(cursor);
        let endpoint = format!("{}/storage/v1/object/list/{}", self.base_url, bucket);
        debug!(bucket, ?prefix, offset, "listing objects");

        let body = json!({
            "prefix": prefix.unwrap_or(""),
            "limit": self.page_size,
            "offset": offset,
            "sortBy": { "column": "name", "order": "asc" },
        });
        let resp = self.authed(self.client.post(&endpoint)).json(&body).send()?;
        let bytes = ensure_success(resp)?.bytes()?;
        parse_list_page(&bytes, prefix, offset, self.page_size)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let endpoint = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            key.trim_start_matches('/')
        );
        let resp = self.authed(self.client.get(&endpoint)).send()?;
        Ok(ensure_success(resp)?.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"[
        {"name": "nested", "id": null, "updated_at": null, "metadata": null},
        {"name": "run-1.json", "id": "6f1c", "updated_at": "2024-03-01T10:00:00Z",
         "metadata": {"eTag": "\"abc123\"", "size": 512,
                      "lastModified": "2024-03-01T09:59:59.000Z"}},
        {"name": "run-2.json", "id": "7a2d", "updated_at": "2024-03-02T10:00:00Z",
         "metadata": {"size": 64}}
    ]"#;

    #[test]
    fn test_full_page_has_next_offset() {
        let page = parse_list_page(PAGE.as_bytes(), Some("runs/"), 6, 3).unwrap();
        assert_eq!(page.next, Some(ListCursor::Offset(9)));

        assert_eq!(page.folders, ["runs/nested"]);
        let contents = page.contents.unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].key, "runs/run-1.json");
        assert_eq!(contents[0].size, Some(512));
        assert_eq!(contents[0].etag.as_deref(), Some("abc123"));
        assert_eq!(
            contents[0].last_modified.unwrap().to_rfc3339(),
            "2024-03-01T09:59:59+00:00"
        );
        assert_eq!(
            contents[1].last_modified.unwrap().to_rfc3339(),
            "2024-03-02T10:00:00+00:00"
        );
    }

    #[test]
    fn test_short_page_is_last() {
        let page = parse_list_page(PAGE.as_bytes(), None, 0, 100).unwrap();
        assert!(page.next.is_none());
        assert_eq!(page.folders, ["nested"]);
        assert_eq!(page.contents.unwrap()[0].key, "run-1.json");
    }

    #[test]
    fn test_folder_only_page() {
        let bytes = br#"[{"name": "2024", "id": null, "updated_at": null, "metadata": null}]"#;
        let page = parse_list_page(bytes, Some("runs"), 0, 100).unwrap();
        assert!(page.contents.is_none());
        assert_eq!(page.folders, ["runs/2024"]);
    }

    #[test]
    fn test_empty_listing_has_no_contents() {
        let page = parse_list_page(b"[]", None, 0, 100).unwrap();
        assert!(page.contents.is_none());
        assert!(page.folders.is_empty());
        assert!(page.next.is_none());
    }
}
