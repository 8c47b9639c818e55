//! Temporary upload payload
//!
//! The workflow uploads a small, uniquely named text file. Its bytes live in
//! a temp file for the duration of the run and are removed when the payload
//! is dropped, including when a fatal error unwinds the run early.
//!
//! # Example
//!
//! ```no_run
//! use cloud_disk_e2e::upload::UploadPayload;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let payload = UploadPayload::for_suffix("1700000000")?;
//!
//! println!("File: {:?}", payload.path());
//! println!("Name: {}", payload.name());
//! println!("MD5: {}", payload.content_hash());
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::UploadError;

/// Temp-file backed upload payload
///
/// Automatically cleaned up when dropped (RAII pattern).
pub struct UploadPayload {
    path: PathBuf,
    name: String,
    size: u64,
    content_hash: String,
}

impl UploadPayload {
    /// Payload `e2e-<suffix>.txt` containing `e2e-<suffix>`
    pub fn for_suffix(suffix: &str) -> Result<Self, UploadError> {
        let content = format!("e2e-{}", suffix);
        Self::from_bytes(format!("{}.txt", content), Bytes::from(content))
    }

    /// Write `data` to a temp file and compute its MD5 digest
    pub fn from_bytes(name: impl Into<String>, data: Bytes) -> Result<Self, UploadError> {
        let name = name.into();
        let path = std::env::temp_dir().join(format!("cloud-disk-e2e-{}.tmp", uuid::Uuid::new_v4()));

        let mut file = File::create(&path)?;
        file.write_all(&data)?;
        file.flush()?;

        Ok(Self {
            path,
            name,
            size: data.len() as u64,
            content_hash: Self::compute_md5(&data),
        })
    }

    /// Get the path to the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remote file name, e.g. `e2e-1700000000.txt`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension including the dot, e.g. `.txt`
    pub fn ext(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }

    /// Get the size of the file in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Hex-encoded MD5 of the content
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Read the payload back from disk
    pub async fn read(&self) -> Result<Bytes, UploadError> {
        Ok(Bytes::from(tokio::fs::read(&self.path).await?))
    }

    fn compute_md5(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

impl Drop for UploadPayload {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up upload payload"
                );
            }
        }
    }
}
