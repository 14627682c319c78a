//! Public entry points for file content transfer.
//!
//! The facade is the composition root: it owns the blob engine, the
//! legacy block path and the suspension coordinator, loads file
//! metadata to pick the storage representation, and is the first layer
//! permitted to surface errors to callers.

use std::sync::Arc;

use blobwire_types::{
    ArchiveId, BlobId, BlobReferenceToken, DataFile, FileDataId, FileMetadata, FilePayload,
    FileRef, GroupId, StorageKind, TransferError, TypeDescriptor,
};

use crate::api::{AccessTokenService, EntityService, StorageServer};
use crate::bridge::{FileBridge, NoBridge};
use crate::config::TransferConfig;
use crate::crypto::{self, SessionKey};
use crate::engine::BlobTransferEngine;
use crate::legacy::BlockTransfer;
use crate::suspension::SuspensionCoordinator;

/// File content transfer facade.
///
/// Dispatches between blob and block storage per file, and on native
/// targets drives the file-system bridge instead of returning raw
/// bytes.
pub struct FileFacade<A, S, E, B = NoBridge> {
    engine: BlobTransferEngine<A, S, E>,
    legacy: BlockTransfer<E>,
    entities: Arc<E>,
    bridge: Arc<B>,
}

impl<A, S, E> FileFacade<A, S, E, NoBridge>
where
    A: AccessTokenService,
    S: StorageServer,
    E: EntityService,
{
    /// Create a facade without a native side; the native entry points
    /// fail with a programming error.
    pub fn new(
        tokens: Arc<A>,
        storage: Arc<S>,
        entities: Arc<E>,
        suspension: SuspensionCoordinator,
        config: TransferConfig,
    ) -> Self {
        Self::with_bridge(tokens, storage, entities, Arc::new(NoBridge), suspension, config)
    }
}

impl<A, S, E, B> FileFacade<A, S, E, B>
where
    A: AccessTokenService,
    S: StorageServer,
    E: EntityService,
    B: FileBridge,
{
    /// Create a facade wired to a native file-system bridge.
    pub fn with_bridge(
        tokens: Arc<A>,
        storage: Arc<S>,
        entities: Arc<E>,
        bridge: Arc<B>,
        suspension: SuspensionCoordinator,
        config: TransferConfig,
    ) -> Self {
        let engine = BlobTransferEngine::new(
            tokens,
            storage,
            Arc::clone(&entities),
            suspension.clone(),
            config.clone(),
        );
        let legacy = BlockTransfer::new(Arc::clone(&entities), suspension, config);
        Self {
            engine,
            legacy,
            entities,
            bridge,
        }
    }

    /// Upload a file payload; returns the id of the completed FileData
    /// record.
    ///
    /// The block path runs first. A precondition failure whose payload
    /// signals that blob migration is enabled transparently re-runs the
    /// same logical upload through the blob engine; any other
    /// precondition propagates unchanged.
    pub async fn upload_file(
        &self,
        payload: &FilePayload,
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        match payload {
            FilePayload::Data(file) => {
                match self.legacy.upload_data(&file.data, key, owner_group).await {
                    Err(error) if error.is_migration_required() => {
                        tracing::debug!("block write rejected, migrating upload to blob storage");
                        self.engine.upload_data(&file.data, key, owner_group).await
                    }
                    other => other,
                }
            }
            FilePayload::Reference(file) => {
                match self
                    .legacy
                    .upload_native(&self.bridge, &file.location, file.size, key, owner_group)
                    .await
                {
                    Err(error) if error.is_migration_required() => {
                        tracing::debug!("block write rejected, migrating upload to blob storage");
                        self.engine
                            .upload_native(&self.bridge, &file.location, file.size, key, owner_group)
                            .await
                    }
                    other => other,
                }
            }
        }
    }

    /// Download and decrypt a file's content in memory.
    pub async fn download_file_content(
        &self,
        file: &FileMetadata,
        key: &SessionKey,
    ) -> Result<DataFile, TransferError> {
        let record = self.entities.load_file_data(&file.data).await?;
        let ciphertext = match record.storage()? {
            StorageKind::Blocks => self.legacy.download_data(file).await?,
            StorageKind::Blobs => self.engine.download_ciphertext(&file.data).await?,
        };
        let plaintext = crypto::decrypt_bytes(key, &ciphertext)?;
        Ok(DataFile {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            data: plaintext,
        })
    }

    /// Download a file through the native bridge and decrypt it on disk;
    /// returns a reference to the decrypted file.
    ///
    /// The intermediate encrypted artifact is deleted on every exit
    /// path, success or error.
    pub async fn download_file_content_native(
        &self,
        file: &FileMetadata,
        key: &SessionKey,
    ) -> Result<FileRef, TransferError> {
        let record = self.entities.load_file_data(&file.data).await?;
        let encrypted_uri = match record.storage()? {
            StorageKind::Blocks => self.legacy.download_native(&self.bridge, file).await?,
            StorageKind::Blobs => self.engine.download_native(&self.bridge, file).await?,
        };

        let decrypted = self.bridge.decrypt_file(key, &encrypted_uri).await;
        if let Err(error) = self.bridge.delete_file(&encrypted_uri).await {
            tracing::warn!(uri = %encrypted_uri, %error, "failed to delete encrypted artifact");
        }
        let location = decrypted?;

        Ok(FileRef {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            location,
            size: file.size,
        })
    }

    /// Encrypt and upload one blob for an arbitrary entity; returns the
    /// reference token for the caller to register.
    pub async fn upload_blob(
        &self,
        descriptor: &TypeDescriptor,
        data: &[u8],
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<BlobReferenceToken, TransferError> {
        self.engine.upload_blob(descriptor, data, key, owner_group).await
    }

    /// Download and decrypt a single blob.
    pub async fn download_blob(
        &self,
        archive: &ArchiveId,
        blob_id: &BlobId,
        key: &SessionKey,
    ) -> Result<Vec<u8>, TransferError> {
        self.engine.download_blob(archive, blob_id, key).await
    }
}
