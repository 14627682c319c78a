//! Error taxonomy for blobwire transfers.

use std::time::Duration;
use thiserror::Error;

use crate::ids::BlobId;

/// Precondition payload with which the server rejects a legacy block
/// write once the customer has been switched over to blob storage.
pub const BLOB_MIGRATION_PRECONDITION: &str = "storage.blob_migrate_enabled";

/// Errors produced by transfer operations.
///
/// `Suspended` is a flow-control signal rather than a failure: the
/// transfer loops absorb it internally and it never reaches callers of
/// the facade. Everything else propagates unchanged to the facade, the
/// first layer permitted to present user-facing messaging.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// Server-issued backpressure: pause all transfer activity.
    #[error("transfers suspended for {retry_after:?}")]
    Suspended {
        /// Server-suggested wait before retrying.
        retry_after: Duration,
    },

    /// The server rejected a write with a precondition payload.
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// The precondition payload.
        reason: String,
    },

    /// Any other non-2xx, non-suspension response.
    #[error("request failed with status {status}")]
    Rest {
        /// HTTP status code.
        status: u16,
        /// Server-assigned error id, if any.
        error_id: Option<String>,
    },

    /// Invariant violation indicating a bug in a collaborator. Not retried.
    #[error("programming error: {0}")]
    Programming(String),

    /// The user aborted an interactive local step.
    #[error("cancelled by user")]
    Cancelled,

    /// Sealing or opening a payload failed.
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// A chunk declared by the server was absent from the downloaded set.
    #[error("blob {blob_id} missing from downloaded set")]
    MissingChunk {
        /// The declared id that could not be matched.
        blob_id: BlobId,
    },

    /// The suspension retry budget was exhausted.
    #[error("gave up after {attempts} suspension retries")]
    RetriesExhausted {
        /// Retries attempted before abandoning the operation.
        attempts: u32,
    },
}

impl TransferError {
    /// Whether this is the precondition that switches a block write over
    /// to blob storage.
    pub fn is_migration_required(&self) -> bool {
        matches!(self, Self::PreconditionFailed { reason } if reason == BLOB_MIGRATION_PRECONDITION)
    }

    /// Map a non-2xx, non-suspension response to its typed error:
    /// 412 carries the precondition payload, everything else is `Rest`.
    pub fn from_status(status: u16, error_id: Option<String>) -> Self {
        if status == 412 {
            Self::PreconditionFailed {
                reason: error_id.unwrap_or_default(),
            }
        } else {
            Self::Rest { status, error_id }
        }
    }
}

/// Whether a response status plus optional Retry-After value constitutes
/// a suspension directive.
pub fn is_suspension_response(status: u16, retry_after_seconds: Option<u64>) -> bool {
    matches!(status, 429 | 503) && retry_after_seconds.is_some()
}
