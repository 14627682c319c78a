//! # blobwire-types
//!
//! Foundational types for the blobwire encrypted blob transfer stack:
//! - [`ArchiveId`], [`FileDataId`], [`GroupId`], [`BlockId`], [`BlobId`] -
//!   identity and content-address types
//! - [`AccessToken`], [`BlobAccessInfo`], [`FileBlobListing`] - ephemeral
//!   archive access bundles
//! - [`FileMetadata`], [`FileData`], [`DataFile`], [`FileRef`] - file
//!   metadata and payload representations
//! - [`TransferError`] - the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod access;
mod error;
mod file;
mod ids;

pub use access::{
    AccessToken, BlobAccessInfo, BlobReferenceToken, FileBlobListing, TargetServer, TypeDescriptor,
};
pub use error::{is_suspension_response, TransferError, BLOB_MIGRATION_PRECONDITION};
pub use file::{DataFile, FileData, FileMetadata, FilePayload, FileRef, StorageKind};
pub use ids::{ArchiveId, BlobId, BlockId, FileDataId, GroupId};
