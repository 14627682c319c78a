//! Blob transfer engine: chunked upload and download of encrypted
//! payloads.
//!
//! One logical payload is encrypted whole, split into bounded-size
//! chunks, and each chunk is uploaded under its content-derived id and
//! registered against the owning FileData record. Downloads fetch every
//! declared chunk, restore the server-declared order and hand back the
//! joined ciphertext.
//!
//! The engine is generic over a [`PayloadDriver`] capability set
//! {encrypt, split, put, get} with exactly two variants - in-memory
//! buffers and bridge-backed file references - so the chunk loop and
//! its suspension handling exist once.
//!
//! Chunk transfers for one file are strictly serialized (one in flight)
//! to respect per-token server concurrency limits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use blobwire_core::{assemble_in_order, check_unique, split_into_chunks};
use blobwire_types::{
    is_suspension_response, ArchiveId, BlobAccessInfo, BlobId, BlobReferenceToken, FileDataId,
    FileMetadata, GroupId, TargetServer, TransferError, TypeDescriptor,
};

use crate::api::{
    AccessTokenService, EntityService, StorageServer, BLOB_SERVICE_PATH, STORAGE_TOKEN_HEADER,
};
use crate::bridge::{BridgeDownload, BridgeUpload, FileBridge, Headers};
use crate::config::TransferConfig;
use crate::crypto::{self, SessionKey};
use crate::suspension::SuspensionCoordinator;

/// One chunk ready for upload.
struct ChunkUpload<P> {
    blob_id: BlobId,
    data: P,
}

/// Capability set for one payload representation, selected once per
/// operation and threaded through the shared chunk loop unchanged.
#[async_trait]
trait PayloadDriver: Send + Sync {
    type Payload: Send + Sync;

    async fn encrypt(
        &self,
        key: &SessionKey,
        payload: Self::Payload,
    ) -> Result<Self::Payload, TransferError>;

    async fn split(
        &self,
        encrypted: &Self::Payload,
    ) -> Result<Vec<ChunkUpload<Self::Payload>>, TransferError>;

    async fn put_chunk(
        &self,
        access: &BlobAccessInfo,
        chunk: &ChunkUpload<Self::Payload>,
    ) -> Result<BlobReferenceToken, TransferError>;

    async fn get_chunk(
        &self,
        access: &BlobAccessInfo,
        blob_id: &BlobId,
        filename: &str,
    ) -> Result<Self::Payload, TransferError>;

    /// Drop a fetched chunk that will not be used (temp-file cleanup).
    async fn discard(&self, _payload: &Self::Payload) {}
}

fn first_server(access: &BlobAccessInfo) -> Result<&TargetServer, TransferError> {
    access
        .first_server()
        .ok_or_else(|| TransferError::Programming("access info carries no storage servers".into()))
}

fn chunk_filename(blob_id: &BlobId) -> String {
    format!("{}.blob", hex::encode(blob_id.as_bytes()))
}

/// In-memory variant: payloads are byte buffers, chunks go straight to
/// the storage server.
struct MemoryDriver<S> {
    storage: Arc<S>,
    max_blob_size: usize,
}

#[async_trait]
impl<S: StorageServer> PayloadDriver for MemoryDriver<S> {
    type Payload = Vec<u8>;

    async fn encrypt(
        &self,
        key: &SessionKey,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, TransferError> {
        crypto::encrypt_bytes(key, &payload)
    }

    async fn split(&self, encrypted: &Vec<u8>) -> Result<Vec<ChunkUpload<Vec<u8>>>, TransferError> {
        Ok(split_into_chunks(encrypted, self.max_blob_size)
            .into_iter()
            .map(|chunk| ChunkUpload {
                blob_id: BlobId::for_ciphertext(chunk),
                data: chunk.to_vec(),
            })
            .collect())
    }

    async fn put_chunk(
        &self,
        access: &BlobAccessInfo,
        chunk: &ChunkUpload<Vec<u8>>,
    ) -> Result<BlobReferenceToken, TransferError> {
        let server = first_server(access)?;
        self.storage
            .put_blob(server, &access.token, &chunk.blob_id, &chunk.data)
            .await
    }

    async fn get_chunk(
        &self,
        access: &BlobAccessInfo,
        blob_id: &BlobId,
        _filename: &str,
    ) -> Result<Vec<u8>, TransferError> {
        let server = first_server(access)?;
        self.storage
            .get_blob(server, &access.token, &access.archive_id, blob_id)
            .await
    }
}

/// Native variant: payloads are file URIs, chunks travel through the
/// file-system bridge so content never crosses into memory here.
struct NativeDriver<B> {
    bridge: Arc<B>,
}

fn storage_headers(access: &BlobAccessInfo) -> Headers {
    let mut headers = Headers::new();
    headers.insert(STORAGE_TOKEN_HEADER.into(), access.token.as_str().into());
    headers
}

fn upload_outcome(outcome: BridgeUpload) -> Result<BlobReferenceToken, TransferError> {
    if outcome.status == 200 {
        outcome.body.map(BlobReferenceToken::new).ok_or_else(|| {
            TransferError::Programming("bridge upload succeeded without a response body".into())
        })
    } else if is_suspension_response(outcome.status, outcome.suspension_time) {
        Err(TransferError::Suspended {
            retry_after: Duration::from_secs(outcome.suspension_time.unwrap_or_default()),
        })
    } else {
        Err(TransferError::from_status(outcome.status, outcome.error_id))
    }
}

fn download_outcome(outcome: BridgeDownload) -> Result<String, TransferError> {
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
}

#[async_trait]
impl<B: FileBridge> PayloadDriver for NativeDriver<B> {
    type Payload = String;

    async fn encrypt(&self, key: &SessionKey, uri: String) -> Result<String, TransferError> {
        self.bridge.encrypt_file(key, &uri).await
    }

    async fn split(&self, encrypted: &String) -> Result<Vec<ChunkUpload<String>>, TransferError> {
        let chunks = self.bridge.split_file_into_blobs(encrypted).await?;
        Ok(chunks
            .into_iter()
            .map(|chunk| ChunkUpload {
                blob_id: chunk.blob_id,
                data: chunk.uri,
            })
            .collect())
    }

    async fn put_chunk(
        &self,
        access: &BlobAccessInfo,
        chunk: &ChunkUpload<String>,
    ) -> Result<BlobReferenceToken, TransferError> {
        let server = first_server(access)?;
        let url = format!("{}{}?blobId={}", server.url, BLOB_SERVICE_PATH, chunk.blob_id);
        let outcome = self
            .bridge
            .upload(&chunk.data, &url, &storage_headers(access))
            .await?;
        upload_outcome(outcome)
    }

    async fn get_chunk(
        &self,
        access: &BlobAccessInfo,
        blob_id: &BlobId,
        filename: &str,
    ) -> Result<String, TransferError> {
        let server = first_server(access)?;
        let url = format!(
            "{}{}?archiveId={}&blobId={}",
            server.url, BLOB_SERVICE_PATH, access.archive_id, blob_id
        );
        let outcome = self
            .bridge
            .download(&url, &storage_headers(access), filename)
            .await?;
        download_outcome(outcome)
    }

    async fn discard(&self, uri: &String) {
        if let Err(error) = self.bridge.delete_file(uri).await {
            tracing::warn!(%uri, %error, "failed to delete chunk file");
        }
    }
}

/// Chunked transfer of encrypted payloads to archive storage.
pub struct BlobTransferEngine<A, S, E> {
    tokens: Arc<A>,
    storage: Arc<S>,
    entities: Arc<E>,
    suspension: SuspensionCoordinator,
    config: TransferConfig,
}

impl<A, S, E> BlobTransferEngine<A, S, E>
where
    A: AccessTokenService,
    S: StorageServer,
    E: EntityService,
{
    /// Create an engine over the given collaborators.
    pub fn new(
        tokens: Arc<A>,
        storage: Arc<S>,
        entities: Arc<E>,
        suspension: SuspensionCoordinator,
        config: TransferConfig,
    ) -> Self {
        Self {
            tokens,
            storage,
            entities,
            suspension,
            config,
        }
    }

    fn memory_driver(&self) -> MemoryDriver<S> {
        MemoryDriver {
            storage: Arc::clone(&self.storage),
            max_blob_size: self.config.max_blob_size,
        }
    }

    /// Upload an in-memory payload as chunked blobs; returns the id of
    /// the completed FileData record.
    pub async fn upload_data(
        &self,
        data: &[u8],
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        let driver = self.memory_driver();
        self.upload_with(&driver, data.to_vec(), data.len() as u64, key, owner_group)
            .await
    }

    /// Upload a native file as chunked blobs through the bridge.
    pub(crate) async fn upload_native<B: FileBridge>(
        &self,
        bridge: &Arc<B>,
        location: &str,
        size: u64,
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        let driver = NativeDriver {
            bridge: Arc::clone(bridge),
        };
        self.upload_with(&driver, location.to_string(), size, key, owner_group)
            .await
    }

    async fn upload_with<D: PayloadDriver>(
        &self,
        driver: &D,
        payload: D::Payload,
        size: u64,
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<FileDataId, TransferError> {
        let encrypted = driver.encrypt(key, payload).await?;

        self.suspension.wait_until_active().await;
        let file_data_id = self.entities.create_file_data(size, owner_group).await?;
        let access = self
            .tokens
            .request_write_token(&self.config.file_data_type, owner_group)
            .await?;

        let chunks = driver.split(&encrypted).await?;
        if chunks.is_empty() {
            return Err(TransferError::Programming(
                "encrypted payload produced no chunks".into(),
            ));
        }
        let ids: Vec<BlobId> = chunks.iter().map(|c| c.blob_id).collect();
        check_unique(&ids)?;

        tracing::debug!(
            chunks = chunks.len(),
            file_data = %file_data_id,
            "uploading blob chunks"
        );
        for chunk in &chunks {
            let reference = self.put_chunk_with_retry(driver, &access, chunk).await?;
            self.entities
                .register_blob_reference(&file_data_id, &reference)
                .await?;
            tracing::debug!(blob = %chunk.blob_id, "chunk uploaded and registered");
        }
        Ok(file_data_id)
    }

    /// PUT one chunk, absorbing suspension signals: a suspension response
    /// arms the coordinator and re-queues this same chunk (not the whole
    /// file), bounded by the configured retry budget.
    async fn put_chunk_with_retry<D: PayloadDriver>(
        &self,
        driver: &D,
        access: &BlobAccessInfo,
        chunk: &ChunkUpload<D::Payload>,
    ) -> Result<BlobReferenceToken, TransferError> {
        let mut attempts = 0u32;
        loop {
            self.suspension.wait_until_active().await;
            match driver.put_chunk(access, chunk).await {
                Ok(reference) => return Ok(reference),
                Err(TransferError::Suspended { retry_after }) => {
                    attempts += 1;
                    if attempts > self.config.max_suspension_retries {
                        return Err(TransferError::RetriesExhausted { attempts });
                    }
                    tracing::warn!(blob = %chunk.blob_id, attempts, "chunk upload suspended, deferring");
                    self.suspension.activate_if_inactive(retry_after);
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn get_chunk_with_retry<D: PayloadDriver>(
        &self,
        driver: &D,
        access: &BlobAccessInfo,
        blob_id: &BlobId,
        filename: &str,
    ) -> Result<D::Payload, TransferError> {
        let mut attempts = 0u32;
        loop {
            self.suspension.wait_until_active().await;
            match driver.get_chunk(access, blob_id, filename).await {
                Ok(payload) => return Ok(payload),
                Err(TransferError::Suspended { retry_after }) => {
                    attempts += 1;
                    if attempts > self.config.max_suspension_retries {
                        return Err(TransferError::RetriesExhausted { attempts });
                    }
                    tracing::warn!(blob = %blob_id, attempts, "chunk download suspended, deferring");
                    self.suspension.activate_if_inactive(retry_after);
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Fetch every chunk of a blob-stored file serially; returns the
    /// declared order and the fetched chunks keyed by id.
    async fn download_chunks<D: PayloadDriver>(
        &self,
        driver: &D,
        file_data: &FileDataId,
    ) -> Result<(Vec<BlobId>, HashMap<BlobId, D::Payload>), TransferError> {
        self.suspension.wait_until_active().await;
        let listing = self.entities.get_file_blobs(file_data).await?;

        // every declared chunk must have access info before any download
        for blob_id in &listing.blobs {
            if listing.access_for(blob_id).is_none() {
                return Err(TransferError::Programming(format!(
                    "no access info for blob {blob_id}"
                )));
            }
        }

        let mut fetched: HashMap<BlobId, D::Payload> = HashMap::with_capacity(listing.blobs.len());
        for blob_id in &listing.blobs {
            let access = listing.access_for(blob_id).ok_or_else(|| {
                TransferError::Programming(format!("no access info for blob {blob_id}"))
            })?;
            let filename = chunk_filename(blob_id);
            match self
                .get_chunk_with_retry(driver, access, blob_id, &filename)
                .await
            {
                Ok(payload) => {
                    fetched.insert(*blob_id, payload);
                }
                Err(error) => {
                    for payload in fetched.values() {
                        driver.discard(payload).await;
                    }
                    return Err(error);
                }
            }
        }
        Ok((listing.blobs, fetched))
    }

    /// Download every chunk of a blob-stored file and return the joined
    /// ciphertext in server-declared order. Decryption is the caller's
    /// single whole-payload step.
    pub async fn download_ciphertext(
        &self,
        file_data: &FileDataId,
    ) -> Result<Vec<u8>, TransferError> {
        let driver = self.memory_driver();
        let (declared, fetched) = self.download_chunks(&driver, file_data).await?;
        assemble_in_order(&declared, fetched)
    }

    /// Download a blob-stored file through the bridge: fetch chunk files,
    /// join them in declared order, delete the chunk files, and return
    /// the joined (still encrypted) file URI.
    pub(crate) async fn download_native<B: FileBridge>(
        &self,
        bridge: &Arc<B>,
        file: &FileMetadata,
    ) -> Result<String, TransferError> {
        let driver = NativeDriver {
            bridge: Arc::clone(bridge),
        };
        let (declared, mut fetched) = self.download_chunks(&driver, &file.data).await?;

        let mut ordered = Vec::with_capacity(declared.len());
        for blob_id in &declared {
            let uri = fetched
                .remove(blob_id)
                .ok_or(TransferError::MissingChunk { blob_id: *blob_id })?;
            ordered.push(uri);
        }

        let joined = bridge.join_files(&file.name, &ordered).await?;
        for uri in &ordered {
            driver.discard(uri).await;
        }
        Ok(joined)
    }

    /// Encrypt and upload one blob for an arbitrary entity; returns the
    /// reference token. Registration against the owning record is the
    /// caller's step.
    pub async fn upload_blob(
        &self,
        descriptor: &TypeDescriptor,
        data: &[u8],
        key: &SessionKey,
        owner_group: &GroupId,
    ) -> Result<BlobReferenceToken, TransferError> {
        self.suspension.wait_until_active().await;
        let access = self
            .tokens
            .request_write_token(descriptor, owner_group)
            .await?;
        let ciphertext = crypto::encrypt_bytes(key, data)?;
        let chunk = ChunkUpload {
            blob_id: BlobId::for_ciphertext(&ciphertext),
            data: ciphertext,
        };
        let driver = self.memory_driver();
        self.put_chunk_with_retry(&driver, &access, &chunk).await
    }

    /// Download and decrypt a single blob.
    pub async fn download_blob(
        &self,
        archive: &ArchiveId,
        blob_id: &BlobId,
        key: &SessionKey,
    ) -> Result<Vec<u8>, TransferError> {
        self.suspension.wait_until_active().await;
        let access = self.tokens.request_read_token(archive).await?;
        let driver = self.memory_driver();
        let ciphertext = self
            .get_chunk_with_retry(&driver, &access, blob_id, &chunk_filename(blob_id))
            .await?;
        crypto::decrypt_bytes(key, &ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;

    fn engine_with(
        api: &MockApi,
        config: TransferConfig,
    ) -> BlobTransferEngine<MockApi, MockApi, MockApi> {
        BlobTransferEngine::new(
            Arc::new(api.clone()),
            Arc::new(api.clone()),
            Arc::new(api.clone()),
            SuspensionCoordinator::new(),
            config,
        )
    }

    fn small_chunk_config(max: usize) -> TransferConfig {
        TransferConfig::new("http://api.test").with_max_blob_size(max)
    }

    // ===========================================
    // Upload Tests
    // ===========================================

    #[tokio::test]
    async fn upload_splits_registers_and_orders_chunks() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(32));
        let key = SessionKey::random();
        let group = GroupId::random();
        let data: Vec<u8> = (0..100).map(|i| i as u8).collect();

        let file_data = engine.upload_data(&data, &key, &group).await.unwrap();

        // ciphertext = 100 + 16 tag bytes -> ceil(116 / 32) = 4 chunks
        let expected: Vec<BlobId> = split_into_chunks(&crypto::encrypt_bytes(&key, &data).unwrap(), 32)
            .into_iter()
            .map(BlobId::for_ciphertext)
            .collect();
        assert_eq!(expected.len(), 4);
        assert_eq!(api.put_calls(), expected);
        assert_eq!(api.registration_count(&file_data), 4);
        assert_eq!(api.stored_file_data(&file_data).unwrap().blobs, expected);
    }

    #[tokio::test]
    async fn upload_then_download_roundtrip_across_sizes() {
        for size in [0usize, 1, 47, 48, 49, 192] {
            let api = MockApi::new();
            let engine = engine_with(&api, small_chunk_config(64));
            let key = SessionKey::random();
            let group = GroupId::random();
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

            let file_data = engine.upload_data(&data, &key, &group).await.unwrap();
            let ciphertext = engine.download_ciphertext(&file_data).await.unwrap();
            let plaintext = crypto::decrypt_bytes(&key, &ciphertext).unwrap();

            assert_eq!(plaintext, data, "round trip failed for size {size}");
        }
    }

    #[tokio::test]
    async fn empty_payload_uploads_as_single_chunk() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(64));
        let key = SessionKey::random();

        let file_data = engine
            .upload_data(b"", &key, &GroupId::random())
            .await
            .unwrap();

        assert_eq!(api.put_calls().len(), 1);
        let ciphertext = engine.download_ciphertext(&file_data).await.unwrap();
        assert!(crypto::decrypt_bytes(&key, &ciphertext).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn suspension_replays_only_the_suspended_chunk() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(10));
        let key = SessionKey::random();
        let group = GroupId::random();
        // ciphertext = 14 + 16 = 30 bytes -> 3 chunks of <= 10
        let data = [7u8; 14];

        api.fail_put_call(
            2,
            TransferError::Suspended {
                retry_after: Duration::from_secs(2),
            },
        );

        let file_data = engine.upload_data(&data, &key, &group).await.unwrap();

        let expected: Vec<BlobId> = split_into_chunks(&crypto::encrypt_bytes(&key, &data).unwrap(), 10)
            .into_iter()
            .map(BlobId::for_ciphertext)
            .collect();
        let puts = api.put_calls();
        // chunk 2 suspended once: chunk 3 never ran before chunk 2 succeeded
        assert_eq!(
            puts,
            vec![expected[0], expected[1], expected[1], expected[2]]
        );
        // exactly three registrations, none duplicated
        assert_eq!(api.registration_count(&file_data), 3);
        assert_eq!(api.stored_file_data(&file_data).unwrap().blobs, expected);
    }

    #[tokio::test]
    async fn rest_error_aborts_remaining_chunks() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(10));
        let key = SessionKey::random();
        let data = [1u8; 14]; // 3 chunks

        api.fail_put_call(
            2,
            TransferError::Rest {
                status: 500,
                error_id: Some("server.error".into()),
            },
        );

        let result = engine.upload_data(&data, &key, &GroupId::random()).await;

        assert!(matches!(
            result,
            Err(TransferError::Rest { status: 500, .. })
        ));
        // chunk 1 was uploaded and stays registered; chunk 3 never ran
        assert_eq!(api.put_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_suspension_exhausts_retry_budget() {
        let api = MockApi::new();
        let config = small_chunk_config(64).with_max_suspension_retries(1);
        let engine = engine_with(&api, config);
        let suspended = TransferError::Suspended {
            retry_after: Duration::from_secs(1),
        };
        api.fail_put_call(1, suspended.clone());
        api.fail_put_call(2, suspended);

        let result = engine
            .upload_data(b"payload", &SessionKey::random(), &GroupId::random())
            .await;

        assert!(matches!(
            result,
            Err(TransferError::RetriesExhausted { attempts: 2 })
        ));
    }

    // ===========================================
    // Download Tests
    // ===========================================

    #[tokio::test]
    async fn download_spans_multiple_archives() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(8));
        let key = SessionKey::random();
        let plaintext = b"spread across two archives";
        let ciphertext = crypto::encrypt_bytes(&key, plaintext).unwrap();
        let (front, back) = ciphertext.split_at(8);

        let archive_a = ArchiveId::random();
        let archive_b = ArchiveId::random();
        let chunk_front = (BlobId::for_ciphertext(front), front.to_vec());
        let chunk_back = (BlobId::for_ciphertext(back), back.to_vec());

        let file_data = api.seed_file_blobs(archive_a, &[chunk_front.clone()]);
        api.seed_file_blobs(archive_b, &[chunk_back.clone()]);
        let mut record = api.stored_file_data(&file_data).unwrap();
        record.blobs.push(chunk_back.0);
        api.insert_file_data(file_data, record);

        let joined = engine.download_ciphertext(&file_data).await.unwrap();

        assert_eq!(joined, ciphertext);
        assert_eq!(
            crypto::decrypt_bytes(&key, &joined).unwrap(),
            plaintext.to_vec()
        );
    }

    #[tokio::test]
    async fn download_without_access_info_fails_before_any_fetch() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(8));
        let file_data = FileDataId::random();
        // record declares a blob that no archive holds
        api.insert_file_data(
            file_data,
            blobwire_types::FileData::with_blobs(vec![BlobId::for_ciphertext(b"ghost")]),
        );

        let result = engine.download_ciphertext(&file_data).await;

        assert!(matches!(result, Err(TransferError::Programming(_))));
        assert!(api.get_calls().is_empty());
    }

    #[tokio::test]
    async fn download_propagates_first_chunk_failure() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(8));
        let archive = ArchiveId::random();
        let chunks = vec![
            (BlobId::for_ciphertext(b"one"), b"one".to_vec()),
            (BlobId::for_ciphertext(b"two"), b"two".to_vec()),
        ];
        let file_data = api.seed_file_blobs(archive, &chunks);
        api.fail_get_call(
            1,
            TransferError::Rest {
                status: 500,
                error_id: None,
            },
        );

        let result = engine.download_ciphertext(&file_data).await;

        assert!(matches!(
            result,
            Err(TransferError::Rest { status: 500, .. })
        ));
        assert_eq!(api.get_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn suspended_download_retries_same_chunk() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(8));
        let archive = ArchiveId::random();
        let chunks = vec![
            (BlobId::for_ciphertext(b"first"), b"first".to_vec()),
            (BlobId::for_ciphertext(b"second"), b"second".to_vec()),
        ];
        let file_data = api.seed_file_blobs(archive, &chunks);
        api.fail_get_call(
            2,
            TransferError::Suspended {
                retry_after: Duration::from_secs(1),
            },
        );

        let joined = engine.download_ciphertext(&file_data).await.unwrap();

        assert_eq!(joined, b"firstsecond");
        assert_eq!(
            api.get_calls(),
            vec![chunks[0].0, chunks[1].0, chunks[1].0]
        );
    }

    // ===========================================
    // Single-Blob Tests
    // ===========================================

    #[tokio::test]
    async fn upload_blob_stores_under_content_id() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(1024));
        let key = SessionKey::random();
        let group = GroupId::random();

        let reference = engine
            .upload_blob(&TypeDescriptor::file_data(), b"entity payload", &key, &group)
            .await
            .unwrap();

        let ciphertext = crypto::encrypt_bytes(&key, b"entity payload").unwrap();
        let blob_id = BlobId::for_ciphertext(&ciphertext);
        let archive = api.write_archive().unwrap();
        assert_eq!(api.stored_blob(&archive, &blob_id).unwrap(), ciphertext);
        assert!(!reference.as_bytes().is_empty());
    }

    #[tokio::test]
    async fn download_blob_roundtrip() {
        let api = MockApi::new();
        let engine = engine_with(&api, small_chunk_config(1024));
        let key = SessionKey::random();
        let archive = ArchiveId::random();
        let ciphertext = crypto::encrypt_bytes(&key, b"single blob").unwrap();
        let blob_id = BlobId::for_ciphertext(&ciphertext);
        api.seed_file_blobs(archive, &[(blob_id, ciphertext)]);

        let plaintext = engine.download_blob(&archive, &blob_id, &key).await.unwrap();

        assert_eq!(plaintext, b"single blob");
        assert_eq!(api.token_requests(), 1);
    }
}
