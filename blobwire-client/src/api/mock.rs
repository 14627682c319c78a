//! Mock collaborator services for testing.
//!
//! [`MockApi`] implements all three collaborator contracts against
//! in-memory state, allows scripting per-call failures and records every
//! storage call for verification. Clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use blobwire_types::{
    AccessToken, ArchiveId, BlobAccessInfo, BlobId, BlobReferenceToken, BlockId, FileBlobListing,
    FileData, FileDataId, GroupId, TargetServer, TransferError, TypeDescriptor,
    BLOB_MIGRATION_PRECONDITION,
};

use super::{AccessTokenService, EntityService, StorageServer};

/// Mock implementation of the token, storage and entity services.
#[derive(Clone)]
pub struct MockApi {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    archives: HashMap<ArchiveId, HashMap<BlobId, Vec<u8>>>,
    write_archive: Option<ArchiveId>,
    file_data: HashMap<FileDataId, FileData>,
    blocks: HashMap<FileDataId, Vec<u8>>,
    issued_references: HashMap<BlobReferenceToken, BlobId>,
    registrations: HashMap<FileDataId, Vec<BlobReferenceToken>>,
    put_failures: HashMap<usize, TransferError>,
    get_failures: HashMap<usize, TransferError>,
    block_put_failures: HashMap<usize, TransferError>,
    block_precondition: Option<String>,
    put_calls: Vec<BlobId>,
    get_calls: Vec<BlobId>,
    block_put_calls: usize,
    token_requests: usize,
    token_seq: u32,
    reference_seq: u32,
    server_url: String,
}

fn ensure_write_archive(inner: &mut Inner) -> ArchiveId {
    match inner.write_archive {
        Some(archive) => archive,
        None => {
            let archive = ArchiveId::random();
            inner.write_archive = Some(archive);
            archive
        }
    }
}

fn next_token(inner: &mut Inner) -> AccessToken {
    inner.token_seq += 1;
    AccessToken::new(format!("token-{}", inner.token_seq))
}

fn servers(inner: &Inner) -> Vec<TargetServer> {
    vec![TargetServer::new(inner.server_url.clone())]
}

impl MockApi {
    /// Create a new mock with empty state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                server_url: "http://storage-0.mock".into(),
                ..Inner::default()
            })),
        }
    }

    /// Make the Nth `put_blob` call (1-based) fail with the given error.
    pub fn fail_put_call(&self, call: usize, error: TransferError) {
        self.inner.lock().unwrap().put_failures.insert(call, error);
    }

    /// Make the Nth `get_blob` call (1-based) fail with the given error.
    pub fn fail_get_call(&self, call: usize, error: TransferError) {
        self.inner.lock().unwrap().get_failures.insert(call, error);
    }

    /// Make the Nth `put_block` call (1-based) fail with the given error.
    pub fn fail_put_block_call(&self, call: usize, error: TransferError) {
        self.inner
            .lock()
            .unwrap()
            .block_put_failures
            .insert(call, error);
    }

    /// Reject every block write with the given precondition payload.
    pub fn set_block_precondition(&self, reason: &str) {
        self.inner.lock().unwrap().block_precondition = Some(reason.to_string());
    }

    /// Reject every block write with the blob migration precondition.
    pub fn enable_blob_migration(&self) {
        self.set_block_precondition(BLOB_MIGRATION_PRECONDITION);
    }

    /// Seed a blob-stored file: chunks land in `archive`, the record
    /// declares them in the given order. Returns the record id.
    pub fn seed_file_blobs(&self, archive: ArchiveId, chunks: &[(BlobId, Vec<u8>)]) -> FileDataId {
        let mut inner = self.inner.lock().unwrap();
        let id = FileDataId::random();
        let mut record = FileData::default();
        for (blob_id, ciphertext) in chunks {
            inner
                .archives
                .entry(archive)
                .or_default()
                .insert(*blob_id, ciphertext.clone());
            record.blobs.push(*blob_id);
        }
        inner.file_data.insert(id, record);
        id
    }

    /// Insert a FileData record verbatim (for dispatch tests).
    pub fn insert_file_data(&self, id: FileDataId, record: FileData) {
        self.inner.lock().unwrap().file_data.insert(id, record);
    }

    /// All `put_blob` calls in order, by blob id.
    pub fn put_calls(&self) -> Vec<BlobId> {
        self.inner.lock().unwrap().put_calls.clone()
    }

    /// All `get_blob` calls in order, by blob id.
    pub fn get_calls(&self) -> Vec<BlobId> {
        self.inner.lock().unwrap().get_calls.clone()
    }

    /// Number of access-token requests served.
    pub fn token_requests(&self) -> usize {
        self.inner.lock().unwrap().token_requests
    }

    /// Number of distinct chunk registrations for a record.
    pub fn registration_count(&self, file_data: &FileDataId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .registrations
            .get(file_data)
            .map_or(0, Vec::len)
    }

    /// The stored FileData record, if any.
    pub fn stored_file_data(&self, id: &FileDataId) -> Option<FileData> {
        self.inner.lock().unwrap().file_data.get(id).cloned()
    }

    /// The ciphertext stored for a blob, if any.
    pub fn stored_blob(&self, archive: &ArchiveId, blob_id: &BlobId) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .archives
            .get(archive)
            .and_then(|blobs| blobs.get(blob_id))
            .cloned()
    }

    /// The archive new uploads are written to, once one exists.
    pub fn write_archive(&self) -> Option<ArchiveId> {
        self.inner.lock().unwrap().write_archive
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenService for MockApi {
    async fn request_read_token(
        &self,
        archive: &ArchiveId,
    ) -> Result<BlobAccessInfo, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        inner.token_requests += 1;
        let token = next_token(&mut inner);
        let blobs = inner
            .archives
            .get(archive)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        Ok(BlobAccessInfo {
            archive_id: *archive,
            token,
            servers: servers(&inner),
            blobs,
        })
    }

    async fn request_write_token(
        &self,
        _descriptor: &TypeDescriptor,
        _owner_group: &GroupId,
    ) -> Result<BlobAccessInfo, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        inner.token_requests += 1;
        let archive_id = ensure_write_archive(&mut inner);
        let token = next_token(&mut inner);
        Ok(BlobAccessInfo {
            archive_id,
            token,
            servers: servers(&inner),
            blobs: Vec::new(),
        })
    }
}

#[async_trait]
impl StorageServer for MockApi {
    async fn put_blob(
        &self,
        _server: &TargetServer,
        _token: &AccessToken,
        blob_id: &BlobId,
        ciphertext: &[u8],
    ) -> Result<BlobReferenceToken, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        inner.put_calls.push(*blob_id);
        let call = inner.put_calls.len();
        if let Some(error) = inner.put_failures.remove(&call) {
            return Err(error);
        }
        let archive = ensure_write_archive(&mut inner);
        inner
            .archives
            .entry(archive)
            .or_default()
            .insert(*blob_id, ciphertext.to_vec());
        inner.reference_seq += 1;
        let reference = BlobReferenceToken::new(format!("ref-{}", inner.reference_seq).into_bytes());
        inner.issued_references.insert(reference.clone(), *blob_id);
        Ok(reference)
    }

    async fn get_blob(
        &self,
        _server: &TargetServer,
        _token: &AccessToken,
        archive: &ArchiveId,
        blob_id: &BlobId,
    ) -> Result<Vec<u8>, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        inner.get_calls.push(*blob_id);
        let call = inner.get_calls.len();
        if let Some(error) = inner.get_failures.remove(&call) {
            return Err(error);
        }
        inner
            .archives
            .get(archive)
            .and_then(|blobs| blobs.get(blob_id))
            .cloned()
            .ok_or(TransferError::Rest {
                status: 404,
                error_id: None,
            })
    }
}

#[async_trait]
impl EntityService for MockApi {
    async fn create_file_data(
        &self,
        _size: u64,
        _owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        let id = FileDataId::random();
        inner.file_data.insert(id, FileData::default());
        Ok(id)
    }

    async fn register_blob_reference(
        &self,
        file_data: &FileDataId,
        reference: &BlobReferenceToken,
    ) -> Result<(), TransferError> {
        let mut inner = self.inner.lock().unwrap();
        let already = inner
            .registrations
            .get(file_data)
            .is_some_and(|r| r.contains(reference));
        if already {
            // idempotent: a retried registration creates no second association
            return Ok(());
        }
        inner
            .registrations
            .entry(*file_data)
            .or_default()
            .push(reference.clone());
        if let Some(blob_id) = inner.issued_references.get(reference).copied() {
            let record = inner.file_data.entry(*file_data).or_default();
            if !record.blobs.contains(&blob_id) {
                record.blobs.push(blob_id);
            }
        }
        Ok(())
    }

    async fn load_file_data(&self, id: &FileDataId) -> Result<FileData, TransferError> {
        self.inner
            .lock()
            .unwrap()
            .file_data
            .get(id)
            .cloned()
            .ok_or(TransferError::Rest {
                status: 404,
                error_id: None,
            })
    }

    async fn get_file_blobs(&self, id: &FileDataId) -> Result<FileBlobListing, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.file_data.get(id).cloned().ok_or(TransferError::Rest {
            status: 404,
            error_id: None,
        })?;

        let mut access: Vec<BlobAccessInfo> = Vec::new();
        for blob_id in &record.blobs {
            let archive = inner
                .archives
                .iter()
                .find(|(_, blobs)| blobs.contains_key(blob_id))
                .map(|(archive_id, _)| *archive_id);
            let Some(archive_id) = archive else {
                // blob stored nowhere: leave it without access info
                continue;
            };
            if let Some(info) = access.iter_mut().find(|i| i.archive_id == archive_id) {
                if !info.blobs.contains(blob_id) {
                    info.blobs.push(*blob_id);
                }
            } else {
                let token = next_token(&mut inner);
                let info = BlobAccessInfo {
                    archive_id,
                    token,
                    servers: servers(&inner),
                    blobs: vec![*blob_id],
                };
                access.push(info);
            }
        }

        Ok(FileBlobListing {
            blobs: record.blobs,
            access,
        })
    }

    async fn create_block_data(
        &self,
        _size: u64,
        _owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(reason) = inner.block_precondition.clone() {
            return Err(TransferError::PreconditionFailed { reason });
        }
        let id = FileDataId::random();
        inner.file_data.insert(id, FileData::default());
        Ok(id)
    }

    async fn put_block(&self, id: &FileDataId, ciphertext: &[u8]) -> Result<(), TransferError> {
        let mut inner = self.inner.lock().unwrap();
        inner.block_put_calls += 1;
        let call = inner.block_put_calls;
        if let Some(error) = inner.block_put_failures.remove(&call) {
            return Err(error);
        }
        {
            let record = inner.file_data.get_mut(id).ok_or(TransferError::Rest {
                status: 404,
                error_id: None,
            })?;
            record.blocks.push(BlockId::random());
        }
        inner.blocks.insert(*id, ciphertext.to_vec());
        Ok(())
    }

    async fn get_block(&self, id: &FileDataId) -> Result<Vec<u8>, TransferError> {
        self.inner
            .lock()
            .unwrap()
            .blocks
            .get(id)
            .cloned()
            .ok_or(TransferError::Rest {
                status: 404,
                error_id: None,
            })
    }
}
