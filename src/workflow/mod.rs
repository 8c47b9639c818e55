//! Workflow orchestrator
//!
//! Drives one forward-only run against the file-service API: login, prove
//! the authorization gate, upload, list and locate, download URL, rename,
//! folder create and id resolution, move, the share lifecycle, and finally
//! folder cleanup. Each step feeds identifiers to later steps. Every failure
//! is fatal except an upload refused by object storage, which switches the
//! run into degraded mode against an already listed file.
//!
//! # Example
//!
//! ```no_run
//! use cloud_disk_e2e::config::Config;
//! use cloud_disk_e2e::workflow::Workflow;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let mut workflow = Workflow::new(config.api)?;
//! let report = workflow.run().await?;
//! println!("verified {} (degraded: {})", report.names.upload, report.upload_degraded);
//! # Ok(())
//! # }
//! ```

use crate::auth::{self, AuthError, NegativeAuthProber, Session};
use crate::classify::{ErrorClassifier, FailureClass, StoragePermissionClassifier};
use crate::client::{ApiClient, ClientError, FileUpload};
use crate::config::ApiConfig;
use crate::metrics;
use crate::model::{
    FolderCreateResponse, ListEntry, RemoteFile, RemoteFolder, SaveResourceResponse, Share,
    ShareCreateResponse, ShareDetail, SignedUrl,
};
use crate::resolver::{self, ResolveError, LIST_PATH};
use crate::upload::{compose_upload_fields, UploadError, UploadFields, UploadPayload, UPLOAD_PATH};
use reqwest::Method;
use serde_json::json;
use thiserror::Error;

mod state;

pub use state::{RunNames, Stage, WorkflowReport, WorkflowState};

/// Backend endpoints driven by the workflow
pub mod paths {
    pub const DOWNLOAD_URL: &str = "/api/file/url";
    pub const RENAME: &str = "/api/file/user/file/name/update";
    pub const FOLDER_CREATE: &str = "/api/file/user/folder/create";
    pub const MOVE: &str = "/api/file/user/file/move";
    pub const SHARE_CREATE: &str = "/api/share/create";
    pub const SHARE_GET: &str = "/api/share/get";
    pub const SHARE_URL: &str = "/api/share/url";
    pub const SHARE_SAVE: &str = "/api/share/save";
    pub const FOLDER_DELETE: &str = "/api/file/user/folder/delete";
}

/// Fatal workflow errors
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Upload payload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Uploaded file '{name}' is not in the listing")]
    UploadNotVisible { name: String },

    #[error("Upload was refused by object storage and no existing file is available")]
    NoFallbackFile,

    #[error("{entity} is missing its {field}")]
    MissingIdentity {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Share reports repository identity {actual:?}, expected '{expected}'")]
    ShareMismatch {
        expected: String,
        actual: Option<String>,
    },
}

/// One verifier run
pub struct Workflow {
    config: ApiConfig,
    client: ApiClient,
    classifier: Box<dyn ErrorClassifier>,
    names: RunNames,
    state: WorkflowState,
}

impl Workflow {
    /// Workflow with a client built from `config` and timestamp-derived names
    pub fn new(config: ApiConfig) -> Result<Self, WorkflowError> {
        let client = ApiClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: ApiConfig, client: ApiClient) -> Self {
        Self {
            config,
            client,
            classifier: Box::new(StoragePermissionClassifier::default()),
            names: RunNames::now(),
            state: WorkflowState::default(),
        }
    }

    /// Replace the upload failure classifier
    pub fn with_classifier(mut self, classifier: Box<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Fix the suffix used for every generated name
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.names = RunNames::new(suffix);
        self
    }

    pub fn names(&self) -> &RunNames {
        &self.names
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Run every step in order; the first fatal error aborts the run
    pub async fn run(&mut self) -> Result<WorkflowReport, WorkflowError> {
        let result = self.execute().await;
        match &result {
            Ok(report) => {
                let label = if report.upload_degraded { "degraded" } else { "passed" };
                metrics::record_workflow_run(label);
                tracing::info!(
                    file = %report.names.upload,
                    md5 = %report.content_hash,
                    degraded = report.upload_degraded,
                    "Workflow completed"
                );
            }
            Err(e) => {
                metrics::record_workflow_run("failed");
                tracing::error!(stage = %self.state.stage, error = %e, "Workflow aborted");
            }
        }
        result
    }

    async fn execute(&mut self) -> Result<WorkflowReport, WorkflowError> {
        tracing::info!("Logging in as {}", self.config.username);
        let session = auth::login(&self.client, &self.config.username, &self.config.password).await?;
        self.state.session = Some(session.clone());
        self.state.advance(Stage::Authenticated);

        tracing::info!("Verifying unauthenticated requests are rejected");
        NegativeAuthProber::new(&self.client)
            .assert_rejected(
                Method::POST,
                LIST_PATH,
                json!({"id": 0, "page": 1, "size": self.config.auth_probe_page_size}),
            )
            .await?;
        self.state.advance(Stage::AuthVerified);

        // Lives until the end of the run so the temp file is removed on exit
        let payload = UploadPayload::for_suffix(&self.names.suffix)?;
        tracing::info!(name = %payload.name(), md5 = %payload.content_hash(), "Uploading file");
        self.upload(&session, &payload).await?;

        tracing::info!("Listing root folder");
        let mut file = self.locate_target(&session, payload.name()).await?;
        self.state.file = Some(file.clone());
        self.state.advance(Stage::Located);

        tracing::info!(repository_identity = %file.repository_identity, "Fetching download URL");
        let signed: SignedUrl = self
            .client
            .call_as(
                Method::POST,
                paths::DOWNLOAD_URL,
                session.options().json(json!({
                    "repository_identity": file.repository_identity,
                    "expires": self.config.url_expiry_secs,
                })),
            )
            .await?;
        log_signed_url("download", &signed);
        self.state.advance(Stage::UrlFetched);

        tracing::info!(identity = %file.identity, name = %self.names.renamed, "Renaming file");
        self.client
            .call(
                Method::POST,
                paths::RENAME,
                session.options().json(json!({
                    "identity": file.identity,
                    "name": self.names.renamed,
                })),
            )
            .await?;
        file.name = self.names.renamed.clone();
        self.state.file = Some(file.clone());
        self.state.advance(Stage::Renamed);

        tracing::info!(name = %self.names.folder, "Creating folder");
        let mut folder = self.create_folder(&session).await?;
        self.state.folder = Some(folder.clone());
        self.state.advance(Stage::FolderCreated);

        let folder_id = match folder.id {
            Some(id) => id,
            None => {
                tracing::info!(identity = %folder.identity, "Resolving folder id from listing");
                resolver::resolve_folder_id(
                    &self.client,
                    &session,
                    &folder.identity,
                    &folder.name,
                    self.config.resolve_page_size,
                )
                .await?
            }
        };
        folder.id = Some(folder_id);
        self.state.folder = Some(folder.clone());
        self.state.advance(Stage::FolderIdResolved);

        tracing::info!(identity = %file.identity, folder_id, "Moving file into folder");
        self.client
            .call(
                Method::PUT,
                paths::MOVE,
                session.options().json(json!({
                    "identity": file.identity,
                    "parent_id": folder_id,
                    "name": file.name,
                })),
            )
            .await?;
        file.parent_id = folder_id;
        self.state.file = Some(file.clone());
        self.state.advance(Stage::Moved);

        let share = self.share_lifecycle(&session, &file).await?;
        let saved_identity = self.save_shared(&session, &share).await?;

        tracing::info!(identity = %folder.identity, "Deleting folder");
        self.client
            .call(
                Method::DELETE,
                paths::FOLDER_DELETE,
                session
                    .options()
                    .json(json!({"identity": folder.identity})),
            )
            .await?;
        self.state.advance(Stage::FolderDeleted);

        let content_hash = payload.content_hash().to_string();
        drop(payload);
        self.state.advance(Stage::Done);

        Ok(WorkflowReport {
            names: self.names.clone(),
            content_hash,
            file,
            folder,
            share,
            saved_identity,
            upload_degraded: self.state.upload_degraded,
            stage: self.state.stage,
        })
    }

    /// Upload the payload, degrading on storage permission failures
    async fn upload(&mut self, session: &Session, payload: &UploadPayload) -> Result<(), WorkflowError> {
        let fields = compose_upload_fields(&UploadFields::for_payload(payload));
        let upload = FileUpload {
            field: "file".to_string(),
            file_name: payload.name().to_string(),
            mime: "text/plain".to_string(),
            content: payload.read().await?,
        };

        let result = self
            .client
            .call(
                Method::POST,
                UPLOAD_PATH,
                session.options().form_fields(fields).file(upload),
            )
            .await;

        match result {
            Ok(_) => {
                self.state.advance(Stage::Uploaded);
                Ok(())
            }
            Err(ClientError::RequestFailed { diagnostic, .. })
                if self.classifier.classify(&diagnostic)
                    == FailureClass::RecoverableStoragePermission =>
            {
                tracing::warn!(
                    status = diagnostic.status,
                    reason = ?diagnostic.message(),
                    "Upload refused by object storage; continuing with an existing file"
                );
                self.state.upload_degraded = true;
                self.state.advance(Stage::UploadDegraded);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List the root and pick the file the rest of the run works on
    async fn locate_target(
        &mut self,
        session: &Session,
        upload_name: &str,
    ) -> Result<RemoteFile, WorkflowError> {
        let listing =
            resolver::list_page(&self.client, session, 0, 1, self.config.list_page_size).await?;
        self.state.advance(Stage::Listed);
        tracing::info!(entries = listing.list.len(), total = listing.count, "Listed root folder");

        let target = select_target(&listing.list, upload_name, self.state.upload_degraded)?;
        remote_file(target, upload_name)
    }

    async fn create_folder(&self, session: &Session) -> Result<RemoteFolder, WorkflowError> {
        let created: FolderCreateResponse = self
            .client
            .call_as(
                Method::POST,
                paths::FOLDER_CREATE,
                session
                    .options()
                    .json(json!({"parent_id": 0, "name": self.names.folder})),
            )
            .await?;
        tracing::info!(identity = ?created.identity, id = ?created.id, "Folder created");

        let identity = created
            .identity
            .filter(|identity| !identity.is_empty())
            .ok_or(WorkflowError::MissingIdentity {
                entity: "created folder",
                field: "identity",
            })?;

        Ok(RemoteFolder {
            identity,
            id: created.id.filter(|id| *id > 0),
            name: self.names.folder.clone(),
            parent_id: 0,
        })
    }

    /// Create a share, read it back, and fetch its signed URL
    async fn share_lifecycle(
        &mut self,
        session: &Session,
        file: &RemoteFile,
    ) -> Result<Share, WorkflowError> {
        tracing::info!(repository_identity = %file.repository_identity, "Creating share");
        let created: ShareCreateResponse = self
            .client
            .call_as(
                Method::POST,
                paths::SHARE_CREATE,
                session.options().json(json!({
                    "identity": file.repository_identity,
                    "expired_time": self.config.share_expiry_secs,
                })),
            )
            .await?;
        let identity = created
            .identity
            .filter(|identity| !identity.is_empty())
            .ok_or(WorkflowError::MissingIdentity {
                entity: "created share",
                field: "identity",
            })?;
        let share = Share {
            identity,
            repository_identity: file.repository_identity.clone(),
            expires_in_seconds: self.config.share_expiry_secs,
        };
        self.state.share = Some(share.clone());
        self.state.advance(Stage::Shared);

        tracing::info!(identity = %share.identity, "Fetching share details");
        let detail: ShareDetail = self
            .client
            .call_as(
                Method::GET,
                paths::SHARE_GET,
                session.options().query("identity", share.identity.clone()),
            )
            .await?;
        if detail.repository_identity.as_deref() != Some(share.repository_identity.as_str()) {
            return Err(WorkflowError::ShareMismatch {
                expected: share.repository_identity.clone(),
                actual: detail.repository_identity,
            });
        }
        self.state.advance(Stage::ShareFetched);

        tracing::info!(identity = %share.identity, "Fetching share download URL");
        let signed: SignedUrl = self
            .client
            .call_as(
                Method::POST,
                paths::SHARE_URL,
                session.options().json(json!({
                    "share_identity": share.identity,
                    "expires": self.config.url_expiry_secs,
                })),
            )
            .await?;
        log_signed_url("share", &signed);
        self.state.advance(Stage::ShareUrlFetched);

        Ok(share)
    }

    /// Save the shared content as a new root file
    async fn save_shared(
        &mut self,
        session: &Session,
        share: &Share,
    ) -> Result<Option<String>, WorkflowError> {
        tracing::info!(name = %self.names.saved, "Saving shared resource");
        // `data` may be null; any other shape must decode
        let saved: Option<SaveResourceResponse> = self
            .client
            .call_as(
                Method::POST,
                paths::SHARE_SAVE,
                session.options().json(json!({
                    "repository_identity": share.repository_identity,
                    "parent_id": 0,
                    "name": self.names.saved,
                })),
            )
            .await?;
        let identity = saved.and_then(|saved| saved.identity);
        tracing::info!(identity = ?identity, "Shared resource saved");
        self.state.advance(Stage::ShareSaved);
        Ok(identity)
    }
}

/// Pick the entry the run continues with
///
/// Normal runs require the uploaded name somewhere in the listing; degraded
/// runs fall back to the first entry.
pub fn select_target<'a>(
    entries: &'a [ListEntry],
    upload_name: &str,
    degraded: bool,
) -> Result<&'a ListEntry, WorkflowError> {
    if degraded {
        entries.first().ok_or(WorkflowError::NoFallbackFile)
    } else {
        entries
            .iter()
            .find(|entry| entry.name.as_deref() == Some(upload_name))
            .ok_or_else(|| WorkflowError::UploadNotVisible {
                name: upload_name.to_string(),
            })
    }
}

fn remote_file(entry: &ListEntry, fallback_name: &str) -> Result<RemoteFile, WorkflowError> {
    let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

    let identity = present(&entry.identity).ok_or(WorkflowError::MissingIdentity {
        entity: "target file",
        field: "identity",
    })?;
    let repository_identity =
        present(&entry.repository_identity).ok_or(WorkflowError::MissingIdentity {
            entity: "target file",
            field: "repository_identity",
        })?;

    Ok(RemoteFile {
        identity,
        repository_identity,
        name: entry
            .name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string()),
        parent_id: 0,
    })
}

fn log_signed_url(kind: &str, signed: &SignedUrl) {
    match signed.url.as_deref() {
        Some(url) if !url.is_empty() => {
            tracing::info!(expires = ?signed.expires, "Received {} URL", kind)
        }
        _ => tracing::warn!("{} URL response carried no url", kind),
    }
    tracing::debug!(url = ?signed.url, "Signed {} URL", kind);
}
