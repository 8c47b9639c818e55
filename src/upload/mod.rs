//! Upload module
//!
//! Builds the multipart upload the backend accepts. The backend's form
//! binding convention is not fixed, so every logical field is sent under
//! both its snake_case and PascalCase name.

use thiserror::Error;

pub mod payload;

pub use payload::UploadPayload;

/// Upload endpoint
pub const UPLOAD_PATH: &str = "/api/file/upload";

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Canonical metadata fields of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFields {
    pub parent_id: i64,
    pub hash: String,
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub object_key: String,
}

impl UploadFields {
    /// Root-level fields describing `payload`
    pub fn for_payload(payload: &UploadPayload) -> Self {
        Self {
            parent_id: 0,
            hash: payload.content_hash().to_string(),
            name: payload.name().to_string(),
            ext: payload.ext(),
            size: payload.size(),
            object_key: String::new(),
        }
    }
}

/// Expand canonical fields into the snake_case and PascalCase form fields
pub fn compose_upload_fields(fields: &UploadFields) -> Vec<(String, String)> {
    let canonical = [
        ("parent_id", "ParentId", fields.parent_id.to_string()),
        ("hash", "Hash", fields.hash.clone()),
        ("name", "Name", fields.name.clone()),
        ("ext", "Ext", fields.ext.clone()),
        ("size", "Size", fields.size.to_string()),
        ("object_key", "ObjectKey", fields.object_key.clone()),
    ];

    let snake = canonical
        .iter()
        .map(|(snake, _, value)| (snake.to_string(), value.clone()));
    let pascal = canonical
        .iter()
        .map(|(_, pascal, value)| (pascal.to_string(), value.clone()));

    snake.chain(pascal).collect()
}
