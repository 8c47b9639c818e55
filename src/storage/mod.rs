//! Storage capability probe
//!
//! A canary check run directly against the object-storage bucket, bypassing
//! the file-service API: confirm the bucket is visible, write a small object
//! under a unique key, read it back, then delete it. Any failing call aborts
//! the probe. Failures the [`ErrorClassifier`] recognizes as permission
//! problems are reported as [`StorageError::PermissionDenied`] so bucket ACL
//! issues can be diagnosed before the main workflow runs.
//!
//! # Example
//!
//! ```no_run
//! use cloud_disk_e2e::config::Config;
//! use cloud_disk_e2e::storage::{S3ObjectStore, StorageProbe};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let store = S3ObjectStore::connect(config.require_storage()?, Duration::from_secs(30)).await;
//! let report = StorageProbe::new(store).run().await?;
//! println!("canary key: {}", report.key);
//! # Ok(())
//! # }
//! ```

use crate::classify::{ErrorClassifier, FailureClass, StoragePermissionClassifier};
use crate::metrics;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

pub mod s3;

pub use s3::S3ObjectStore;

/// Body written to the canary object
pub const CANARY_BODY: &[u8] = b"permission-check";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{operation} failed for '{key}': {message}")]
    Operation {
        operation: ProbeOperation,
        key: String,
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("{operation} denied for '{key}' (check the bucket ACL and key permissions): {message}")]
    PermissionDenied {
        operation: ProbeOperation,
        key: String,
        message: String,
    },

    #[error("Read back {actual} bytes from '{key}' that differ from the {expected} bytes written")]
    ContentMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
}

/// One call of the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOperation {
    BucketInfo,
    Write,
    Read,
    Delete,
}

impl ProbeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOperation::BucketInfo => "bucket_info",
            ProbeOperation::Write => "put_object",
            ProbeOperation::Read => "get_object",
            ProbeOperation::Delete => "delete_object",
        }
    }
}

impl fmt::Display for ProbeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object body together with the HTTP status of the read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBody {
    pub status: Option<u16>,
    pub data: Bytes,
}

/// Minimal object-store surface the probe needs
///
/// Each call returns the HTTP status of the final response, when one was seen.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check the bucket exists and is visible to these credentials
    async fn head_bucket(&self) -> Result<Option<u16>, StorageError>;

    async fn put_object(&self, key: &str, body: Bytes) -> Result<Option<u16>, StorageError>;

    async fn get_object(&self, key: &str) -> Result<ObjectBody, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<Option<u16>, StorageError>;
}

/// Outcome of one probe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStep {
    pub operation: ProbeOperation,
    /// HTTP status of the response
    pub status: Option<u16>,
    /// Bytes written or read, when the call moves data
    pub bytes: Option<usize>,
}

/// Result of a successful probe
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub key: String,
    pub steps: Vec<ProbeStep>,
}

/// Unique canary key: `perm-check/<pid>-<8 hex>.txt`
pub fn canary_key() -> String {
    format!(
        "perm-check/{}-{}.txt",
        std::process::id(),
        hex::encode(rand::random::<[u8; 4]>())
    )
}

/// Write/read/delete canary check against an [`ObjectStore`]
pub struct StorageProbe<S> {
    store: S,
    classifier: Box<dyn ErrorClassifier>,
}

impl<S: ObjectStore> StorageProbe<S> {
    pub fn new(store: S) -> Self {
        Self::with_classifier(store, Box::new(StoragePermissionClassifier::default()))
    }

    pub fn with_classifier(store: S, classifier: Box<dyn ErrorClassifier>) -> Self {
        Self { store, classifier }
    }

    /// Run the probe with a fresh canary key
    pub async fn run(&self) -> Result<ProbeReport, StorageError> {
        self.run_with_key(&canary_key()).await
    }

    /// Run the probe against a caller-chosen key
    #[tracing::instrument(name = "storage.probe", skip(self), err)]
    pub async fn run_with_key(&self, key: &str) -> Result<ProbeReport, StorageError> {
        let mut steps = Vec::with_capacity(4);

        tracing::info!("Checking bucket visibility");
        let status = self.observe(ProbeOperation::BucketInfo, self.store.head_bucket().await)?;
        tracing::info!(status = ?status, "Bucket info returned");
        steps.push(ProbeStep {
            operation: ProbeOperation::BucketInfo,
            status,
            bytes: None,
        });

        tracing::info!("Checking write permission");
        let status = self.observe(
            ProbeOperation::Write,
            self.store
                .put_object(key, Bytes::from_static(CANARY_BODY))
                .await,
        )?;
        tracing::info!(status = ?status, "Write returned");
        steps.push(ProbeStep {
            operation: ProbeOperation::Write,
            status,
            bytes: Some(CANARY_BODY.len()),
        });

        tracing::info!("Checking read permission");
        let ObjectBody { status, data } =
            self.observe(ProbeOperation::Read, self.store.get_object(key).await)?;
        tracing::info!(status = ?status, bytes = data.len(), "Read canary object");
        if data.as_ref() != CANARY_BODY {
            return Err(StorageError::ContentMismatch {
                key: key.to_string(),
                expected: CANARY_BODY.len(),
                actual: data.len(),
            });
        }
        steps.push(ProbeStep {
            operation: ProbeOperation::Read,
            status,
            bytes: Some(data.len()),
        });

        tracing::info!("Checking delete permission");
        let status = self.observe(ProbeOperation::Delete, self.store.delete_object(key).await)?;
        tracing::info!(status = ?status, "Delete returned");
        steps.push(ProbeStep {
            operation: ProbeOperation::Delete,
            status,
            bytes: None,
        });

        Ok(ProbeReport {
            key: key.to_string(),
            steps,
        })
    }

    /// Record the call and reclassify permission failures
    fn observe<T>(
        &self,
        operation: ProbeOperation,
        result: Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        metrics::record_storage_op(operation.as_str(), result.is_ok());
        result.map_err(|err| match err {
            StorageError::Operation {
                operation,
                key,
                code,
                message,
                ..
            } if self.classifier.classify_text(&format!(
                "{} {}",
                code.as_deref().unwrap_or_default(),
                message
            )) == FailureClass::RecoverableStoragePermission =>
            {
                StorageError::PermissionDenied {
                    operation,
                    key,
                    message,
                }
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn body(data: &'static [u8]) -> ObjectBody {
        ObjectBody {
            status: Some(200),
            data: Bytes::from_static(data),
        }
    }

    fn operation_error(operation: ProbeOperation, code: &str) -> StorageError {
        StorageError::Operation {
            operation,
            key: "k".into(),
            status: Some(403),
            code: Some(code.into()),
            message: "request failed".into(),
        }
    }

    #[test]
    fn test_canary_key_format() {
        let key = canary_key();
        let prefix = format!("perm-check/{}-", std::process::id());
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with(".txt"));
        let random = &key[prefix.len()..key.len() - 4];
        assert_eq!(random.len(), 8);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_probe_runs_in_order() {
        let mut store = MockObjectStore::new();
        let mut seq = Sequence::new();
        store
            .expect_head_bucket()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(200)));
        store
            .expect_put_object()
            .with(eq("perm-check/k.txt"), eq(Bytes::from_static(CANARY_BODY)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(200)));
        store
            .expect_get_object()
            .with(eq("perm-check/k.txt"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(body(CANARY_BODY)));
        store
            .expect_delete_object()
            .with(eq("perm-check/k.txt"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(204)));

        let report = StorageProbe::new(store)
            .run_with_key("perm-check/k.txt")
            .await
            .unwrap();

        assert_eq!(report.key, "perm-check/k.txt");
        let operations: Vec<_> = report.steps.iter().map(|s| s.operation).collect();
        assert_eq!(
            operations,
            vec![
                ProbeOperation::BucketInfo,
                ProbeOperation::Write,
                ProbeOperation::Read,
                ProbeOperation::Delete
            ]
        );
        assert_eq!(report.steps[2].bytes, Some(CANARY_BODY.len()));
        let statuses: Vec<_> = report.steps.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![Some(200), Some(200), Some(200), Some(204)]);
    }

    #[tokio::test]
    async fn test_write_denied_aborts_before_read() {
        let mut store = MockObjectStore::new();
        store.expect_head_bucket().returning(|| Ok(Some(200)));
        store
            .expect_put_object()
            .returning(|_, _| Err(operation_error(ProbeOperation::Write, "AccessDenied")));
        store.expect_get_object().never();
        store.expect_delete_object().never();

        let err = StorageProbe::new(store).run().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::PermissionDenied {
                operation: ProbeOperation::Write,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_other_failures_stay_operation_errors() {
        let mut store = MockObjectStore::new();
        store
            .expect_head_bucket()
            .returning(|| Err(operation_error(ProbeOperation::BucketInfo, "NoSuchBucket")));
        store.expect_put_object().never();

        let err = StorageProbe::new(store).run().await.unwrap_err();
        match err {
            StorageError::Operation { operation, code, .. } => {
                assert_eq!(operation, ProbeOperation::BucketInfo);
                assert_eq!(code.as_deref(), Some("NoSuchBucket"));
            }
            other => panic!("expected operation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_content_mismatch_is_fatal() {
        let mut store = MockObjectStore::new();
        store.expect_head_bucket().returning(|| Ok(Some(200)));
        store.expect_put_object().returning(|_, _| Ok(Some(200)));
        store
            .expect_get_object()
            .returning(|_| Ok(body(b"something else")));
        store.expect_delete_object().never();

        let err = StorageProbe::new(store).run().await.unwrap_err();
        assert!(matches!(err, StorageError::ContentMismatch { .. }));
    }
}
