//! Backend payload and entity types
//!
//! Only the fields the workflow consumes are modelled, and every one of them
//! is optional on decode so a missing field surfaces as a workflow invariant
//! violation rather than a payload error.

use serde::{Deserialize, Serialize};

/// `data` of `POST /api/users/login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `POST /api/file/user/list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub repository_identity: Option<String>,
}

impl ListEntry {
    /// Numeric id, treating `0` as absent
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.filter(|id| *id > 0)
    }
}

/// `data` of `POST /api/file/user/list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub list: Vec<ListEntry>,
    #[serde(default)]
    pub count: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ListEntry>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    Ok(Option::<Vec<ListEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `data` of `POST /api/file/user/folder/create`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderCreateResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub identity: Option<String>,
}

/// `data` of `POST /api/share/create`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareCreateResponse {
    #[serde(default)]
    pub identity: Option<String>,
}

/// `data` of `GET /api/share/get`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareDetail {
    #[serde(default)]
    pub repository_identity: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

/// `data` of the signed-URL endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignedUrl {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub expires: Option<i64>,
}

/// `data` of `POST /api/share/save`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveResourceResponse {
    #[serde(default)]
    pub identity: Option<String>,
}

/// File record the workflow operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub identity: String,
    pub repository_identity: String,
    pub name: String,
    pub parent_id: i64,
}

/// Folder created by the workflow at the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub identity: String,
    pub id: Option<i64>,
    pub name: String,
    pub parent_id: i64,
}

/// Share record created for a file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub identity: String,
    pub repository_identity: String,
    pub expires_in_seconds: u64,
}
