//! Folder identifier resolution
//!
//! Folder creation only guarantees the opaque `identity` handle, while the
//! move endpoint needs the numeric `id`. The resolver pages through the root
//! listing until it sees the folder or runs out of entries.

use crate::auth::Session;
use crate::client::{ApiClient, ClientError};
use crate::model::{ListEntry, ListPage};
use reqwest::Method;
use serde_json::json;
use thiserror::Error;

/// Listing endpoint shared by the resolver and the workflow
pub const LIST_PATH: &str = "/api/file/user/list";

/// Scan ceiling when the backend reports no usable `count`
pub const MAX_SCAN_PAGES: u32 = 1000;

/// Last page worth requesting: `ceil(count / page_size) + 1`
pub fn page_limit(count: i64, page_size: u32) -> u32 {
    if count <= 0 || page_size == 0 {
        return MAX_SCAN_PAGES;
    }
    let pages = (count as u64).div_ceil(page_size as u64) + 1;
    pages.min(MAX_SCAN_PAGES as u64) as u32
}

/// Resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Folder '{name}' ({identity}) not found after scanning {pages} page(s)")]
    IdentifierNotFound {
        identity: String,
        name: String,
        pages: u32,
    },

    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Fetch one page of the listing under `parent_id`
pub async fn list_page(
    client: &ApiClient,
    session: &Session,
    parent_id: i64,
    page: u32,
    size: u32,
) -> Result<ListPage, ClientError> {
    client
        .call_as(
            Method::POST,
            LIST_PATH,
            session
                .options()
                .json(json!({"id": parent_id, "page": page, "size": size})),
        )
        .await
}

/// Whether a listing entry is the folder being resolved
///
/// `identity` is the primary match; `name` covers backends that omit
/// `identity` for some entity kinds.
pub fn matches_folder(entry: &ListEntry, identity: &str, name: &str) -> bool {
    entry.identity.as_deref() == Some(identity) || entry.name.as_deref() == Some(name)
}

/// Resolve a root-level folder's numeric id
///
/// Scans pages starting at 1. A page shorter than `page_size` ends the
/// listing, and so does passing [`page_limit`] for the reported `count`.
/// A matching entry without a usable id does not end the scan.
#[tracing::instrument(
    name = "resolver.folder_id",
    skip(client, session),
    fields(pages = tracing::field::Empty),
    err
)]
pub async fn resolve_folder_id(
    client: &ApiClient,
    session: &Session,
    folder_identity: &str,
    folder_name: &str,
    page_size: u32,
) -> Result<i64, ResolveError> {
    if page_size == 0 {
        return Err(ResolveError::InvalidPageSize);
    }

    let mut page = 1;
    loop {
        let listing = list_page(client, session, 0, page, page_size).await?;
        tracing::debug!(page, entries = listing.list.len(), "Scanned listing page");

        let found = listing
            .list
            .iter()
            .filter(|entry| matches_folder(entry, folder_identity, folder_name))
            .find_map(ListEntry::numeric_id);

        if let Some(id) = found {
            tracing::Span::current().record("pages", page);
            return Ok(id);
        }

        if listing.list.len() < page_size as usize || page >= page_limit(listing.count, page_size) {
            return Err(ResolveError::IdentifierNotFound {
                identity: folder_identity.to_string(),
                name: folder_name.to_string(),
                pages: page,
            });
        }

        page += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: Option<&str>, name: &str) -> ListEntry {
        ListEntry {
            id: Some(1),
            identity: identity.map(str::to_string),
            name: Some(name.to_string()),
            ..ListEntry::default()
        }
    }

    #[test]
    fn test_page_limit_from_count() {
        assert_eq!(page_limit(3, 3), 2);
        assert_eq!(page_limit(4, 3), 3);
        assert_eq!(page_limit(250, 100), 4);
    }

    #[test]
    fn test_page_limit_without_count() {
        assert_eq!(page_limit(0, 100), MAX_SCAN_PAGES);
        assert_eq!(page_limit(-1, 100), MAX_SCAN_PAGES);
        assert_eq!(page_limit(i64::MAX, 1), MAX_SCAN_PAGES);
    }

    #[test]
    fn test_matches_by_identity() {
        assert!(matches_folder(&entry(Some("d-1"), "other"), "d-1", "folder-1"));
    }

    #[test]
    fn test_matches_by_name_fallback() {
        assert!(matches_folder(&entry(None, "folder-1"), "d-1", "folder-1"));
    }

    #[test]
    fn test_no_match_when_both_differ() {
        assert!(!matches_folder(&entry(Some("d-2"), "folder-2"), "d-1", "folder-1"));
    }
}
