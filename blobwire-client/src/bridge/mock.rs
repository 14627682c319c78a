//! Mock file bridge for testing.
//!
//! Simulates the native side against an in-memory uri->bytes file
//! system, performing its "HTTP" through a linked [`MockApi`] so that
//! scripted storage failures (including suspensions) reach the native
//! paths too. Clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use blobwire_types::{AccessToken, ArchiveId, BlobId, FileDataId, TargetServer, TransferError};

use super::{BridgeDownload, BridgeUpload, FileBridge, FileChunk, Headers};
use crate::api::{EntityService, MockApi, StorageServer, STORAGE_TOKEN_HEADER};
use crate::crypto::{self, SessionKey};

/// Mock implementation of the native file-system bridge.
#[derive(Clone)]
pub struct MockFileBridge {
    api: MockApi,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, Vec<u8>>,
    deleted: Vec<String>,
    uploads: Vec<String>,
    uri_seq: u32,
    max_blob_size: usize,
    fail_next_download: Option<TransferError>,
    fail_next_upload: Option<TransferError>,
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn origin_of(url: &str) -> String {
    url.split("/rest").next().unwrap_or_default().to_string()
}

fn header_token(headers: &Headers) -> AccessToken {
    AccessToken::new(headers.get(STORAGE_TOKEN_HEADER).cloned().unwrap_or_default())
}

fn bad_request(message: &str) -> TransferError {
    TransferError::Programming(format!("mock bridge: {message}"))
}

impl MockFileBridge {
    /// Create a bridge whose network side is served by the given mock.
    pub fn linked(api: MockApi) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(Inner {
                max_blob_size: blobwire_core::MAX_BLOB_SIZE,
                ..Inner::default()
            })),
        }
    }

    /// Override the chunk size used by `split_file_into_blobs`.
    pub fn with_max_blob_size(self, max_blob_size: usize) -> Self {
        self.inner.lock().unwrap().max_blob_size = max_blob_size;
        self
    }

    /// Seed a file; returns its URI.
    pub fn put_file(&self, contents: Vec<u8>) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.uri_seq += 1;
        let uri = format!("mock:///files/{}", inner.uri_seq);
        inner.files.insert(uri.clone(), contents);
        uri
    }

    /// Read a file's contents, if it exists.
    pub fn file(&self, uri: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().files.get(uri).cloned()
    }

    /// Whether a file currently exists.
    pub fn exists(&self, uri: &str) -> bool {
        self.inner.lock().unwrap().files.contains_key(uri)
    }

    /// URIs deleted so far, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    /// Upload target URLs seen so far, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.inner.lock().unwrap().uploads.clone()
    }

    /// Make the next `download` call fail with the given error.
    pub fn fail_next_download(&self, error: TransferError) {
        self.inner.lock().unwrap().fail_next_download = Some(error);
    }

    /// Make the next `upload` call fail with the given error.
    pub fn fail_next_upload(&self, error: TransferError) {
        self.inner.lock().unwrap().fail_next_upload = Some(error);
    }

    fn store_file(&self, name_hint: &str, contents: Vec<u8>) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.uri_seq += 1;
        let uri = format!("mock:///files/{}-{}", inner.uri_seq, name_hint);
        inner.files.insert(uri.clone(), contents);
        uri
    }

    fn read_file(&self, uri: &str) -> Result<Vec<u8>, TransferError> {
        self.file(uri)
            .ok_or_else(|| bad_request(&format!("no such file {uri}")))
    }
}

#[async_trait]
impl FileBridge for MockFileBridge {
    async fn download(
        &self,
        url: &str,
        headers: &Headers,
        filename: &str,
    ) -> Result<BridgeDownload, TransferError> {
        if let Some(error) = self.inner.lock().unwrap().fail_next_download.take() {
            return Err(error);
        }

        let token = header_token(headers);
        let server = TargetServer::new(origin_of(url));

        let fetched = if url.contains("/rest/storage/blob") {
            let archive = query_param(url, "archiveId")
                .and_then(|v| ArchiveId::decode(&v))
                .ok_or_else(|| bad_request("missing archiveId"))?;
            let blob_id = query_param(url, "blobId")
                .and_then(|v| BlobId::decode(&v))
                .ok_or_else(|| bad_request("missing blobId"))?;
            self.api.get_blob(&server, &token, &archive, &blob_id).await
        } else {
            let file_data = query_param(url, "fileDataId")
                .and_then(|v| FileDataId::decode(&v))
                .ok_or_else(|| bad_request("missing fileDataId"))?;
            self.api.get_block(&file_data).await
        };

        match fetched {
            Ok(bytes) => Ok(BridgeDownload {
                status: 200,
                encrypted_file: Some(self.store_file(filename, bytes)),
                suspension_time: None,
                error_id: None,
            }),
            Err(TransferError::Suspended { retry_after }) => Ok(BridgeDownload {
                status: 503,
                encrypted_file: None,
                suspension_time: Some(retry_after.as_secs()),
                error_id: None,
            }),
            Err(TransferError::Rest { status, error_id }) => Ok(BridgeDownload {
                status,
                encrypted_file: None,
                suspension_time: None,
                error_id,
            }),
            Err(other) => Err(other),
        }
    }

    async fn upload(
        &self,
        file_uri: &str,
        url: &str,
        headers: &Headers,
    ) -> Result<BridgeUpload, TransferError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.uploads.push(url.to_string());
            if let Some(error) = inner.fail_next_upload.take() {
                return Err(error);
            }
        }

        let contents = self.read_file(file_uri)?;
        let token = header_token(headers);
        let server = TargetServer::new(origin_of(url));

        let outcome = if url.contains("/rest/storage/blob") {
            let blob_id = query_param(url, "blobId")
                .and_then(|v| BlobId::decode(&v))
                .ok_or_else(|| bad_request("missing blobId"))?;
            self.api
                .put_blob(&server, &token, &blob_id, &contents)
                .await
                .map(|reference| Some(reference.as_bytes().to_vec()))
        } else {
            let file_data = query_param(url, "fileDataId")
                .and_then(|v| FileDataId::decode(&v))
                .ok_or_else(|| bad_request("missing fileDataId"))?;
            self.api.put_block(&file_data, &contents).await.map(|_| None)
        };

        match outcome {
            Ok(body) => Ok(BridgeUpload {
                status: 200,
                body,
                suspension_time: None,
                error_id: None,
            }),
            Err(TransferError::Suspended { retry_after }) => Ok(BridgeUpload {
                status: 503,
                body: None,
                suspension_time: Some(retry_after.as_secs()),
                error_id: None,
            }),
            Err(TransferError::Rest { status, error_id }) => Ok(BridgeUpload {
                status,
                body: None,
                suspension_time: None,
                error_id,
            }),
            Err(TransferError::PreconditionFailed { reason }) => Ok(BridgeUpload {
                status: 412,
                body: None,
                suspension_time: None,
                error_id: Some(reason),
            }),
            Err(other) => Err(other),
        }
    }

    async fn join_files(
        &self,
        filename: &str,
        files: &[String],
    ) -> Result<String, TransferError> {
        let mut joined = Vec::new();
        for uri in files {
            joined.extend_from_slice(&self.read_file(uri)?);
        }
        Ok(self.store_file(filename, joined))
    }

    async fn delete_file(&self, uri: &str) -> Result<(), TransferError> {
        let mut inner = self.inner.lock().unwrap();
        inner.files.remove(uri);
        inner.deleted.push(uri.to_string());
        Ok(())
    }

    async fn split_file_into_blobs(&self, uri: &str) -> Result<Vec<FileChunk>, TransferError> {
        let contents = self.read_file(uri)?;
        let max = self.inner.lock().unwrap().max_blob_size;
        let mut chunks = Vec::new();
        for chunk in blobwire_core::split_into_chunks(&contents, max) {
            let blob_id = BlobId::for_ciphertext(chunk);
            let chunk_uri = self.store_file(&format!("{}.blob", hex::encode(blob_id.as_bytes())), chunk.to_vec());
            chunks.push(FileChunk {
                blob_id,
                uri: chunk_uri,
            });
        }
        Ok(chunks)
    }

    async fn encrypt_file(&self, key: &SessionKey, uri: &str) -> Result<String, TransferError> {
        let plaintext = self.read_file(uri)?;
        let sealed = crypto::encrypt_with_random_nonce(key, &plaintext)?;
        Ok(self.store_file("enc", sealed))
    }

    async fn decrypt_file(&self, key: &SessionKey, uri: &str) -> Result<String, TransferError> {
        let sealed = self.read_file(uri)?;
        let plaintext = crypto::decrypt_with_leading_nonce(key, &sealed)?;
        Ok(self.store_file("dec", plaintext))
    }
}
