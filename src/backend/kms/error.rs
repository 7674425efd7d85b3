//! Error type for the KMS configuration flow.

use std::fmt;
use std::io;

use thiserror::Error;

/// What part of the configuration flow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required client capability (universal planes, atomic) was refused.
    CapabilityUnavailable,
    /// Listing resources, connectors, encoders, planes or properties failed.
    EnumerationFailure,
    /// No connector/CRTC/plane combination satisfies the constraints.
    SelectionFailure,
    /// A mandatory property could not be resolved.
    ResolutionFailure,
    /// Creating a blob, dumb buffer or framebuffer, or mapping it, failed.
    AllocationFailure,
    /// The kernel rejected the atomic commit.
    CommitFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::CapabilityUnavailable => "capability unavailable",
            ErrorKind::EnumerationFailure => "enumeration failure",
            ErrorKind::SelectionFailure => "selection failure",
            ErrorKind::ResolutionFailure => "resolution failure",
            ErrorKind::AllocationFailure => "allocation failure",
            ErrorKind::CommitFailure => "commit failure",
        };
        f.write_str(s)
    }
}

/// A fatal error of the KMS configuration flow.
///
/// Components never terminate the process themselves; they hand this back and the caller decides.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct KmsError {
    kind: ErrorKind,
    detail: String,
    #[source]
    source: Option<io::Error>,
}

impl KmsError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            source: None,
        }
    }

    pub fn with_source(kind: ErrorKind, detail: impl Into<String>, source: io::Error) -> Self {
        Self {
            kind,
            detail: detail.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

pub type KmsResult<T> = Result<T, KmsError>;

/// Attaches a kind and a detail message to a failed kernel call.
pub(super) trait KernelContext<T> {
    fn kernel_context(self, kind: ErrorKind, detail: impl FnOnce() -> String) -> KmsResult<T>;
}

impl<T> KernelContext<T> for io::Result<T> {
    fn kernel_context(self, kind: ErrorKind, detail: impl FnOnce() -> String) -> KmsResult<T> {
        self.map_err(|err| KmsError::with_source(kind, detail(), err))
    }
}
