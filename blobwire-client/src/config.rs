//! Transfer configuration.

use blobwire_core::MAX_BLOB_SIZE;
use blobwire_types::TypeDescriptor;

/// Default upper bound on suspension-driven retries per chunk or block
/// operation.
pub const DEFAULT_MAX_SUSPENSION_RETRIES: u32 = 8;

/// Configuration for the transfer stack.
///
/// Owned by the composition root and cloned into the components.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Origin of the application API, used for the legacy block
    /// endpoints reached through the native bridge.
    pub origin: String,
    /// Maximum encrypted chunk size in bytes.
    pub max_blob_size: usize,
    /// Upper bound on suspension-driven retries before an operation is
    /// abandoned with `RetriesExhausted`.
    pub max_suspension_retries: u32,
    /// Entity type registered as the owner of uploaded file data.
    pub file_data_type: TypeDescriptor,
}

impl TransferConfig {
    /// Create a configuration for the given API origin.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            max_blob_size: MAX_BLOB_SIZE,
            max_suspension_retries: DEFAULT_MAX_SUSPENSION_RETRIES,
            file_data_type: TypeDescriptor::file_data(),
        }
    }

    /// Override the maximum chunk size (tests use small chunks).
    pub fn with_max_blob_size(mut self, max_blob_size: usize) -> Self {
        self.max_blob_size = max_blob_size;
        self
    }

    /// Override the suspension retry budget.
    pub fn with_max_suspension_retries(mut self, retries: u32) -> Self {
        self.max_suspension_retries = retries;
        self
    }

    /// Override the owning entity type for uploads.
    pub fn with_file_data_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.file_data_type = descriptor;
        self
    }
}
