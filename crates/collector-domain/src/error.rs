use thiserror::Error;

/// One field-level problem found during payload validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// JSON pointer to the offending field ("" for the document root)
    pub path: String,
    /// Human-readable reason the field was rejected
    pub reason: String,
}

/// A payload failed schema validation.
///
/// Carries every field-level issue found, not just the first. Validation
/// failures are permanent: redelivery cannot fix a structurally invalid
/// payload, so the pipeline consumes and drops the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    /// Failure with a single issue at the given path.
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue {
                path: path.into(),
                reason: reason.into(),
            }],
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let formatted = self
            .issues
            .iter()
            .map(|issue| {
                if issue.path.is_empty() {
                    issue.reason.clone()
                } else {
                    format!("{}: {}", issue.path, issue.reason)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", formatted)
    }
}

impl std::error::Error for ValidationFailure {}

/// A persistence call failed for any backend reason (connectivity,
/// constraint, timeout). The pipeline treats all causes uniformly and leaves
/// redelivery to the broker.
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StorageError(#[from] anyhow::Error);

impl StorageError {
    pub fn new(cause: impl Into<anyhow::Error>) -> Self {
        Self(cause.into())
    }
}

/// Terminal failure classification for one message, driving the
/// acknowledgment decision and failure metrics.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("event validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type IngestResult<T> = Result<T, IngestError>;
