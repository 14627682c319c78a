//! Native file-system bridge contract.
//!
//! On app and desktop targets, file content never crosses the bridge as
//! raw bytes: the native side downloads, uploads, joins, splits and
//! (de)crypts files on disk, and the transfer core only handles URIs.
//! [`NoBridge`] stands in on targets without a native side;
//! [`MockFileBridge`] simulates one for tests.

mod mock;

pub use mock::MockFileBridge;

use std::collections::HashMap;

use async_trait::async_trait;

use blobwire_types::{BlobId, TransferError};

use crate::crypto::SessionKey;

/// Request headers passed through the bridge.
pub type Headers = HashMap<String, String>;

/// Outcome of a bridge download.
#[derive(Debug, Clone)]
pub struct BridgeDownload {
    /// HTTP status code observed by the native side.
    pub status: u16,
    /// URI of the downloaded (still encrypted) file on success.
    pub encrypted_file: Option<String>,
    /// Server-suggested suspension in seconds, if any.
    pub suspension_time: Option<u64>,
    /// Server-assigned error id, if any.
    pub error_id: Option<String>,
}

/// Outcome of a bridge upload.
#[derive(Debug, Clone)]
pub struct BridgeUpload {
    /// HTTP status code observed by the native side.
    pub status: u16,
    /// Response body on success.
    pub body: Option<Vec<u8>>,
    /// Server-suggested suspension in seconds, if any.
    pub suspension_time: Option<u64>,
    /// Server-assigned error id, if any.
    pub error_id: Option<String>,
}

/// One chunk of a split file, ready for upload.
#[derive(Debug, Clone)]
pub struct FileChunk {
    /// Content address of the chunk ciphertext.
    pub blob_id: BlobId,
    /// URI of the chunk file.
    pub uri: String,
}

/// The narrow native file-system contract.
///
/// A desktop implementation may fail `download` with
/// [`TransferError::Cancelled`] when the user aborts the save-location
/// dialog; that error propagates distinctly so callers can suppress
/// error UI.
#[async_trait]
pub trait FileBridge: Send + Sync {
    /// Download `url` to a file, without decrypting.
    async fn download(
        &self,
        url: &str,
        headers: &Headers,
        filename: &str,
    ) -> Result<BridgeDownload, TransferError>;

    /// Upload the file at `file_uri` to `url`.
    async fn upload(
        &self,
        file_uri: &str,
        url: &str,
        headers: &Headers,
    ) -> Result<BridgeUpload, TransferError>;

    /// Concatenate files in the given order into one new file.
    async fn join_files(
        &self,
        filename: &str,
        files: &[String],
    ) -> Result<String, TransferError>;

    /// Delete a file.
    async fn delete_file(&self, uri: &str) -> Result<(), TransferError>;

    /// Split an encrypted file into chunk files of at most the maximum
    /// blob size, each addressed by its content id.
    async fn split_file_into_blobs(&self, uri: &str) -> Result<Vec<FileChunk>, TransferError>;

    /// Encrypt a file on disk with a fresh initialization vector.
    async fn encrypt_file(&self, key: &SessionKey, uri: &str) -> Result<String, TransferError>;

    /// Decrypt a file on disk.
    async fn decrypt_file(&self, key: &SessionKey, uri: &str) -> Result<String, TransferError>;
}

/// Bridge placeholder for environments without a native side.
///
/// Every call fails: the native entry points are programming errors
/// outside app and desktop builds.
pub struct NoBridge;

fn no_bridge<T>() -> Result<T, TransferError> {
    Err(TransferError::Programming(
        "not running in a native environment".into(),
    ))
}

#[async_trait]
impl FileBridge for NoBridge {
    async fn download(
        &self,
        _url: &str,
        _headers: &Headers,
        _filename: &str,
    ) -> Result<BridgeDownload, TransferError> {
        no_bridge()
    }

    async fn upload(
        &self,
        _file_uri: &str,
        _url: &str,
        _headers: &Headers,
    ) -> Result<BridgeUpload, TransferError> {
        no_bridge()
    }

    async fn join_files(
        &self,
        _filename: &str,
        _files: &[String],
    ) -> Result<String, TransferError> {
        no_bridge()
    }

    async fn delete_file(&self, _uri: &str) -> Result<(), TransferError> {
        no_bridge()
    }

    async fn split_file_into_blobs(&self, _uri: &str) -> Result<Vec<FileChunk>, TransferError> {
        no_bridge()
    }

    async fn encrypt_file(&self, _key: &SessionKey, _uri: &str) -> Result<String, TransferError> {
        no_bridge()
    }

    async fn decrypt_file(&self, _key: &SessionKey, _uri: &str) -> Result<String, TransferError> {
        no_bridge()
    }
}
