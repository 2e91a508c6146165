//! Call results.

use thiserror::Error;
use tonic::Code;

use crate::rpc::metadata::{CallMetadata, MetadataMap};

/// Structured failure of a call: a gRPC code and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", code_name(*code))]
pub struct CallError {
    pub code: Code,
    pub message: String,
}

impl CallError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(Code::Cancelled, "call cancelled")
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(Code::DeadlineExceeded, "call deadline exceeded")
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }
}

impl From<&tonic::Status> for CallError {
    fn from(status: &tonic::Status) -> Self {
        Self::new(status.code(), status.message())
    }
}

/// Result of invoking an operation. Metadata travels on both arms.
#[derive(Debug)]
pub enum CallOutcome<M> {
    Success { message: M, metadata: CallMetadata },
    Failure { error: CallError, metadata: CallMetadata },
}

impl<M> CallOutcome<M> {
    pub fn success(message: M, metadata: CallMetadata) -> Self {
        CallOutcome::Success { message, metadata }
    }

    pub fn failure(error: CallError, metadata: CallMetadata) -> Self {
        CallOutcome::Failure { error, metadata }
    }

    /// Failure carrying the status and whatever metadata the status held.
    pub fn from_status(status: &tonic::Status) -> Self {
        CallOutcome::Failure {
            error: CallError::from(status),
            metadata: CallMetadata::from_header(MetadataMap::from_tonic(status.metadata())),
        }
    }

    pub fn code(&self) -> Code {
        match self {
            CallOutcome::Success { .. } => Code::Ok,
            CallOutcome::Failure { error, .. } => error.code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    pub fn metadata(&self) -> &CallMetadata {
        match self {
            CallOutcome::Success { metadata, .. } | CallOutcome::Failure { metadata, .. } => metadata,
        }
    }

    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> CallOutcome<N> {
        match self {
            CallOutcome::Success { message, metadata } => CallOutcome::Success {
                message: f(message),
                metadata,
            },
            CallOutcome::Failure { error, metadata } => CallOutcome::Failure { error, metadata },
        }
    }

    /// Fold in metadata captured outside the call itself.
    pub fn merge_metadata(self, captured: &CallMetadata) -> Self {
        match self {
            CallOutcome::Success { message, metadata } => CallOutcome::Success {
                message,
                metadata: metadata.merge(captured),
            },
            CallOutcome::Failure { error, metadata } => CallOutcome::Failure {
                error,
                metadata: metadata.merge(captured),
            },
        }
    }

    pub fn into_result(self) -> Result<(M, CallMetadata), (CallError, CallMetadata)> {
        match self {
            CallOutcome::Success { message, metadata } => Ok((message, metadata)),
            CallOutcome::Failure { error, metadata } => Err((error, metadata)),
        }
    }
}

/// Canonical upper-case name of a gRPC code, used in logs and metric labels.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}
