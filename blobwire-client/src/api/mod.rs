//! Collaborator contracts consumed by the transfer core.
//!
//! Authentication, entity wire encoding and HTTP mechanics live behind
//! these traits; the transfer engine only sees request/response
//! semantics. [`MockApi`] implements all three contracts in memory for
//! tests.

mod mock;

pub use mock::MockApi;

use async_trait::async_trait;

use blobwire_types::{
    AccessToken, ArchiveId, BlobAccessInfo, BlobId, BlobReferenceToken, FileBlobListing, FileData,
    FileDataId, GroupId, TargetServer, TransferError, TypeDescriptor,
};

/// REST path of the blob storage endpoint on a storage server.
pub const BLOB_SERVICE_PATH: &str = "/rest/storage/blob";

/// REST path of the legacy block endpoint on the application API.
pub const FILE_DATA_SERVICE_PATH: &str = "/rest/files/filedata";

/// Header carrying the archive access token on storage requests.
pub const STORAGE_TOKEN_HEADER: &str = "storage-access-token";

/// Issues short-lived archive access tokens.
///
/// May fail with auth or rate-limit errors; those propagate to the
/// caller, they are not retried here.
#[async_trait]
pub trait AccessTokenService: Send + Sync {
    /// Request read access to one archive.
    async fn request_read_token(
        &self,
        archive: &ArchiveId,
    ) -> Result<BlobAccessInfo, TransferError>;

    /// Request write access for a new entity of the given type owned by
    /// the given group.
    async fn request_write_token(
        &self,
        descriptor: &TypeDescriptor,
        owner_group: &GroupId,
    ) -> Result<BlobAccessInfo, TransferError>;
}

/// Stores and serves encrypted chunks.
///
/// Either call may fail with `Suspended { retry_after }` when the server
/// issues a backpressure directive (HTTP 429/503 plus Retry-After in a
/// real implementation).
#[async_trait]
pub trait StorageServer: Send + Sync {
    /// `PUT /blob/{blobId}` - store one chunk, returning the blob
    /// reference token.
    async fn put_blob(
        &self,
        server: &TargetServer,
        token: &AccessToken,
        blob_id: &BlobId,
        ciphertext: &[u8],
    ) -> Result<BlobReferenceToken, TransferError>;

    /// `GET /blob` - fetch one raw ciphertext chunk.
    async fn get_blob(
        &self,
        server: &TargetServer,
        token: &AccessToken,
        archive: &ArchiveId,
        blob_id: &BlobId,
    ) -> Result<Vec<u8>, TransferError>;
}

/// Entity-layer endpoints owning FileData records.
#[async_trait]
pub trait EntityService: Send + Sync {
    /// Create a FileData record for a blob-storage upload.
    async fn create_file_data(
        &self,
        size: u64,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError>;

    /// Associate an uploaded chunk with its owning record.
    ///
    /// Idempotent from the caller's perspective: retrying the same
    /// registration after a dropped response is safe.
    async fn register_blob_reference(
        &self,
        file_data: &FileDataId,
        reference: &BlobReferenceToken,
    ) -> Result<(), TransferError>;

    /// Load a FileData record.
    async fn load_file_data(&self, id: &FileDataId) -> Result<FileData, TransferError>;

    /// Authoritative chunk enumeration for a file, possibly spanning
    /// several archives.
    async fn get_file_blobs(&self, id: &FileDataId) -> Result<FileBlobListing, TransferError>;

    /// Legacy block storage: POST size/ownership for a new record id.
    ///
    /// Fails with the migration precondition once the server has
    /// switched the customer over to blob storage.
    async fn create_block_data(
        &self,
        size: u64,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError>;

    /// Legacy block storage: PUT the undivided ciphertext.
    async fn put_block(&self, id: &FileDataId, ciphertext: &[u8]) -> Result<(), TransferError>;

    /// Legacy block storage: GET the undivided ciphertext.
    async fn get_block(&self, id: &FileDataId) -> Result<Vec<u8>, TransferError>;
}
