//! Workflow stages and accumulated run state

use crate::auth::Session;
use crate::model::{RemoteFile, RemoteFolder, Share};
use std::fmt;

/// Forward-only stages of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    LoggedOut,
    Authenticated,
    AuthVerified,
    Uploaded,
    UploadDegraded,
    Listed,
    Located,
    UrlFetched,
    Renamed,
    FolderCreated,
    FolderIdResolved,
    Moved,
    Shared,
    ShareFetched,
    ShareUrlFetched,
    ShareSaved,
    FolderDeleted,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoggedOut => "LoggedOut",
            Stage::Authenticated => "Authenticated",
            Stage::AuthVerified => "AuthVerified",
            Stage::Uploaded => "Uploaded",
            Stage::UploadDegraded => "UploadDegraded",
            Stage::Listed => "Listed",
            Stage::Located => "Located",
            Stage::UrlFetched => "URLFetched",
            Stage::Renamed => "Renamed",
            Stage::FolderCreated => "FolderCreated",
            Stage::FolderIdResolved => "FolderIdResolved",
            Stage::Moved => "Moved",
            Stage::Shared => "Shared",
            Stage::ShareFetched => "ShareFetched",
            Stage::ShareUrlFetched => "ShareURLFetched",
            Stage::ShareSaved => "ShareSaved",
            Stage::FolderDeleted => "FolderDeleted",
            Stage::Done => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names derived from the run's timestamp suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNames {
    pub suffix: String,
    pub upload: String,
    pub renamed: String,
    pub folder: String,
    pub saved: String,
}

impl RunNames {
    pub fn new(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        let renamed = format!("renamed-{}.txt", suffix);
        Self {
            upload: format!("e2e-{}.txt", suffix),
            folder: format!("folder-{}", suffix),
            saved: format!("saved-{}", renamed),
            renamed,
            suffix,
        }
    }

    /// Names for a run starting now
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().timestamp().to_string())
    }
}

/// The orchestrator's working set
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub stage: Stage,
    pub session: Option<Session>,
    pub file: Option<RemoteFile>,
    pub folder: Option<RemoteFolder>,
    pub share: Option<Share>,
    /// Upload was refused by object storage and the run reuses a listed file
    pub upload_degraded: bool,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            stage: Stage::LoggedOut,
            session: None,
            file: None,
            folder: None,
            share: None,
            upload_degraded: false,
        }
    }
}

impl WorkflowState {
    /// Move to `stage`; stages never go backwards
    pub(crate) fn advance(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage, "{} does not follow {}", stage, self.stage);
        tracing::debug!(from = %self.stage, to = %stage, "Stage transition");
        crate::metrics::record_workflow_step(stage.as_str());
        self.stage = stage;
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub names: RunNames,
    pub content_hash: String,
    pub file: RemoteFile,
    pub folder: RemoteFolder,
    pub share: Share,
    pub saved_identity: Option<String>,
    pub upload_degraded: bool,
    pub stage: Stage,
}
