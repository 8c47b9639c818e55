//! OSS object store over the S3-compatible API
//!
//! Uses the AWS SDK with static credentials taken from [`StorageConfig`] and
//! the OSS endpoint (`https://<region>.aliyuncs.com` unless overridden).

use super::{ObjectBody, ObjectStore, ProbeOperation, StorageError};
use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Object store backed by an `aws-sdk-s3` client
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client for the configured bucket
    pub async fn connect(config: &StorageConfig, timeout: Duration) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.access_key_secret.clone(),
            None,
            None,
            "cloud-disk-e2e",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint())
            .credentials_provider(credentials)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            )
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Records the HTTP status of the last response an operation received
#[derive(Clone, Default)]
struct StatusCapture(Arc<AtomicU16>);

impl StatusCapture {
    /// Response hook for `customize().mutate_response(..)`
    fn hook(&self) -> impl Fn(&mut HttpResponse) + Send + Sync + 'static {
        let status = Arc::clone(&self.0);
        move |response: &mut HttpResponse| {
            status.store(response.status().as_u16(), Ordering::Relaxed);
        }
    }

    fn get(&self) -> Option<u16> {
        match self.0.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }
}

fn operation_error<E>(
    operation: ProbeOperation,
    key: &str,
    err: SdkError<E, HttpResponse>,
) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    tracing::error!(
        operation = %operation,
        key = %key,
        status = ?status,
        code = ?code,
        "{} failed: {}",
        operation,
        message
    );

    StorageError::Operation {
        operation,
        key: key.to_string(),
        status,
        code,
        message,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_bucket(&self) -> Result<Option<u16>, StorageError> {
        let capture = StatusCapture::default();
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .customize()
            .mutate_response(capture.hook())
            .send()
            .await
            .map_err(|e| operation_error(ProbeOperation::BucketInfo, &self.bucket, e))?;
        let status = capture.get();
        tracing::info!(bucket = %self.bucket, status = ?status, "Bucket is visible");
        Ok(status)
    }

    async fn put_object(&self, key: &str, body: Bytes) -> Result<Option<u16>, StorageError> {
        let bytes = body.len();
        let capture = StatusCapture::default();
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("text/plain")
            .body(ByteStream::from(body))
            .customize()
            .mutate_response(capture.hook())
            .send()
            .await
            .map_err(|e| operation_error(ProbeOperation::Write, key, e))?;
        let status = capture.get();
        tracing::info!(
            key = %key,
            bytes,
            status = ?status,
            etag = ?output.e_tag(),
            "PutObject completed"
        );
        Ok(status)
    }

    async fn get_object(&self, key: &str) -> Result<ObjectBody, StorageError> {
        let capture = StatusCapture::default();
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .customize()
            .mutate_response(capture.hook())
            .send()
            .await
            .map_err(|e| operation_error(ProbeOperation::Read, key, e))?;
        let status = capture.get();

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Operation {
                operation: ProbeOperation::Read,
                key: key.to_string(),
                status,
                code: None,
                message: format!("Failed to read object body: {}", e),
            })?
            .into_bytes();
        tracing::info!(key = %key, bytes = data.len(), status = ?status, "GetObject completed");
        Ok(ObjectBody { status, data })
    }

    async fn delete_object(&self, key: &str) -> Result<Option<u16>, StorageError> {
        let capture = StatusCapture::default();
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .customize()
            .mutate_response(capture.hook())
            .send()
            .await
            .map_err(|e| operation_error(ProbeOperation::Delete, key, e))?;
        let status = capture.get();
        tracing::info!(key = %key, status = ?status, "DeleteObject completed");
        Ok(status)
    }
}
