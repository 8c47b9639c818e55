//! Failure classification
//!
//! The backend reports object-storage permission problems only as free text
//! inside its error envelope. [`ErrorClassifier`] turns that text into a
//! closed set of outcomes so the substring heuristic lives in exactly one
//! place and can be swapped for a structured error code later.

use crate::envelope::Diagnostic;

/// How a failure should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Abort the run
    Fatal,
    /// The object store refused access; the run may continue degraded
    RecoverableStoragePermission,
}

/// Maps failure context to a [`FailureClass`]
pub trait ErrorClassifier: Send + Sync {
    /// Classify a free-form error description
    fn classify_text(&self, text: &str) -> FailureClass;

    /// Classify a failed API call
    fn classify(&self, diagnostic: &Diagnostic) -> FailureClass {
        self.classify_text(&diagnostic.to_string())
    }
}

/// Markers the backend propagates from OSS when the bucket refuses access
pub const STORAGE_PERMISSION_MARKERS: [&str; 2] = ["AccessDenied", "bucket acl"];

/// Substring classifier for storage permission errors
#[derive(Debug, Clone)]
pub struct StoragePermissionClassifier {
    markers: Vec<String>,
}

impl StoragePermissionClassifier {
    /// Classifier with custom markers
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StoragePermissionClassifier {
    fn default() -> Self {
        Self::with_markers(STORAGE_PERMISSION_MARKERS)
    }
}

impl ErrorClassifier for StoragePermissionClassifier {
    fn classify_text(&self, text: &str) -> FailureClass {
        if self.markers.iter().any(|marker| text.contains(marker.as_str())) {
            FailureClass::RecoverableStoragePermission
        } else {
            FailureClass::Fatal
        }
    }
}

/// Classifier that never allows degradation
pub struct StrictClassifier;

impl ErrorClassifier for StrictClassifier {
    fn classify_text(&self, _text: &str) -> FailureClass {
        FailureClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(body: &str) -> Diagnostic {
        Diagnostic {
            status: 400,
            body: body.to_string(),
            ..Diagnostic::default()
        }
    }

    #[test]
    fn test_access_denied_is_recoverable() {
        let classifier = StoragePermissionClassifier::default();
        let diag = diagnostic(
            r#"{"code":404,"msg":"oss: service returned error: StatusCode=403, ErrorCode=AccessDenied"}"#,
        );
        assert_eq!(
            classifier.classify(&diag),
            FailureClass::RecoverableStoragePermission
        );
    }

    #[test]
    fn test_bucket_acl_is_recoverable() {
        let classifier = StoragePermissionClassifier::default();
        let diag = diagnostic(r#"{"code":404,"msg":"The bucket acl you specified is private"}"#);
        assert_eq!(
            classifier.classify(&diag),
            FailureClass::RecoverableStoragePermission
        );
    }

    #[test]
    fn test_other_errors_are_fatal() {
        let classifier = StoragePermissionClassifier::default();
        assert_eq!(
            classifier.classify(&diagnostic(r#"{"code":404,"msg":"file too large"}"#)),
            FailureClass::Fatal
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let classifier = StoragePermissionClassifier::default();
        assert_eq!(classifier.classify_text("accessdenied"), FailureClass::Fatal);
    }

    #[test]
    fn test_custom_markers() {
        let classifier = StoragePermissionClassifier::with_markers(["Forbidden"]);
        assert_eq!(
            classifier.classify_text("403 Forbidden"),
            FailureClass::RecoverableStoragePermission
        );
        assert_eq!(classifier.classify_text("AccessDenied"), FailureClass::Fatal);
    }

    #[test]
    fn test_strict_classifier() {
        assert_eq!(
            StrictClassifier.classify_text("AccessDenied"),
            FailureClass::Fatal
        );
    }
}
