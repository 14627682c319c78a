//! Legacy single-block transfer path.
//!
//! Predecessor of blob storage: a file travels as one undivided
//! encrypted unit through the block endpoint. The path stays alive
//! during the server-driven migration and is selected by the facade when
//! a file's metadata declares block storage. A suspension signal defers
//! the whole block operation (there is no chunk to re-queue); the
//! migration precondition is not handled here - the facade owns the
//! blob fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use blobwire_types::{is_suspension_response, FileDataId, FileMetadata, GroupId, TransferError};

use crate::api::{EntityService, FILE_DATA_SERVICE_PATH};
use crate::bridge::{FileBridge, Headers};
use crate::config::TransferConfig;
use crate::crypto::{self, SessionKey};
use crate::suspension::SuspensionCoordinator;

/// Single-request transfer of undivided encrypted blocks.
pub struct BlockTransfer<E> {
    entities: Arc<E>,
    suspension: SuspensionCoordinator,
    config: TransferConfig,
}

impl<E: EntityService> BlockTransfer<E> {
    /// Create a block transfer path over the entity service.
    pub fn new(
        entities: Arc<E>,
        suspension: SuspensionCoordinator,
        config: TransferConfig,
    ) -> Self {
        Self {
            entities,
            suspension,
            config,
        }
    }

    /// Run one block operation under the suspension retry policy.
    async fn with_suspension_retry<T, F, Fut>(&self, operation: F) -> Result<T, TransferError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let mut attempts = 0u32;
        loop {
            self.suspension.wait_until_active().await;
            match operation().await {
                Err(TransferError::Suspended { retry_after }) => {
                    attempts += 1;
                    if attempts > self.config.max_suspension_retries {
                        return Err(TransferError::RetriesExhausted { attempts });
                    }
                    tracing::warn!(attempts, "block transfer suspended, deferring");
                    self.suspension.activate_if_inactive(retry_after);
                }
                other => return other,
            }
        }
    }

    /// Upload an in-memory payload as one block; returns the record id.
    pub async fn upload_data(
        &self,
        data: &[u8],
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        let ciphertext = crypto::encrypt_bytes(key, data)?;
        let ciphertext = &ciphertext;
        let size = data.len() as u64;
        self.with_suspension_retry(move || async move {
            let id = self.entities.create_block_data(size, owner_group).await?;
            self.entities.put_block(&id, ciphertext).await?;
            Ok(id)
        })
        .await
    }

    /// Download the undivided ciphertext of a block-stored file.
    /// Decryption is the caller's single whole-payload step.
    pub async fn download_data(&self, file: &FileMetadata) -> Result<Vec<u8>, TransferError> {
        let id = file.data;
        self.with_suspension_retry(move || async move { self.entities.get_block(&id).await })
            .await
    }

    /// Upload a native file as one block through the bridge.
    pub(crate) async fn upload_native<B: FileBridge>(
        &self,
        bridge: &Arc<B>,
        location: &str,
        size: u64,
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        self.with_suspension_retry(move || async move {
            let encrypted = bridge.encrypt_file(key, location).await?;
            let id = self.entities.create_block_data(size, owner_group).await?;
            let url = format!(
                "{}{}?fileDataId={}",
                self.config.origin, FILE_DATA_SERVICE_PATH, id
            );
            let outcome = bridge.upload(&encrypted, &url, &Headers::new()).await?;
            if outcome.status == 200 {
                Ok(id)
            } else if is_suspension_response(outcome.status, outcome.suspension_time) {
                Err(TransferError::Suspended {
                    retry_after: Duration::from_secs(outcome.suspension_time.unwrap_or_default()),
                })
            } else {
                Err(TransferError::from_status(outcome.status, outcome.error_id))
            }
        })
        .await
    }

    /// Download a block-stored file through the bridge; returns the URI
    /// of the still-encrypted file.
    pub(crate) async fn download_native<B: FileBridge>(
        &self,
        bridge: &Arc<B>,
        file: &FileMetadata,
    ) -> Result<String, TransferError> {
        self.with_suspension_retry(move || async move {
            let url = format!(
                "{}{}?fileDataId={}",
                self.config.origin, FILE_DATA_SERVICE_PATH, file.data
            );
            let outcome = bridge.download(&url, &Headers::new(), &file.name).await?;
            if outcome.status == 200 {
                outcome.encrypted_file.ok_or_else(|| {
                    TransferError::Programming("bridge download succeeded without a file".into())
                })
            } else if is_suspension_response(outcome.status, outcome.suspension_time) {
                Err(TransferError::Suspended {
                    retry_after: Duration::from_secs(outcome.suspension_time.unwrap_or_default()),
                })
            } else {
                Err(TransferError::from_status(outcome.status, outcome.error_id))
            }
        })
        .await
    }
}
