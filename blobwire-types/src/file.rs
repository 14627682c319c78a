//! File metadata and payload representations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransferError;
use crate::ids::{BlobId, BlockId, FileDataId, GroupId};

/// Metadata of one logical file. Immutable once created; destroyed with
/// the owning entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// File name.
    pub name: String,
    /// Declared mime type, if known.
    pub mime_type: Option<String>,
    /// Declared plaintext size in bytes.
    pub size: u64,
    /// Group owning the file.
    pub owner_group: GroupId,
    /// The FileData record holding the content.
    pub data: FileDataId,
}

/// Which storage representation a FileData record uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Legacy monolithic block storage.
    Blocks,
    /// Chunked blob storage.
    Blobs,
}

/// Per-file storage manifest: an ordered list of legacy block references
/// or an ordered list of blob identifiers, never both.
///
/// Created once at upload completion and read-only afterward. The record
/// is only complete after every constituent chunk upload has been
/// acknowledged by the registration step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileData {
    /// Legacy block references, in order.
    pub blocks: Vec<BlockId>,
    /// Blob identifiers, in server-declared order.
    pub blobs: Vec<BlobId>,
}

impl FileData {
    /// A record backed by blob storage.
    pub fn with_blobs(blobs: Vec<BlobId>) -> Self {
        Self {
            blocks: Vec::new(),
            blobs,
        }
    }

    /// A record backed by legacy block storage.
    pub fn with_blocks(blocks: Vec<BlockId>) -> Self {
        Self {
            blocks,
            blobs: Vec::new(),
        }
    }

    /// Which storage representation this record uses.
    ///
    /// A record declaring neither list is invalid; a record declaring
    /// both is undefined by the server contract. Both fail fast so the
    /// caller never issues a transfer call for a broken record.
    pub fn storage(&self) -> Result<StorageKind, TransferError> {
        match (self.blocks.is_empty(), self.blobs.is_empty()) {
            (false, true) => Ok(StorageKind::Blocks),
            (true, false) => Ok(StorageKind::Blobs),
            (true, true) => Err(TransferError::Programming(
                "file data declares neither blocks nor blobs".into(),
            )),
            (false, false) => Err(TransferError::Programming(
                "file data declares both blocks and blobs".into(),
            )),
        }
    }
}

/// An in-memory file payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct DataFile {
    /// File name.
    pub name: String,
    /// Mime type, if known.
    pub mime_type: Option<String>,
    /// The plaintext content.
    pub data: Vec<u8>,
}

impl fmt::Debug for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("data", &format!("[{} bytes]", self.data.len()))
            .finish()
    }
}

/// A file living in the native file system, addressed by URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// File name.
    pub name: String,
    /// Mime type, if known.
    pub mime_type: Option<String>,
    /// URI of the file as understood by the file-system bridge.
    pub location: String,
    /// Plaintext size in bytes.
    pub size: u64,
}

/// The two payload representations accepted by the upload entry point.
#[derive(Debug, Clone)]
pub enum FilePayload {
    /// An in-memory buffer.
    Data(DataFile),
    /// A reference into the native file system.
    Reference(FileRef),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_blocks() {
        let record = FileData::with_blocks(vec![BlockId::random()]);
        assert_eq!(record.storage().unwrap(), StorageKind::Blocks);
    }

    #[test]
    fn storage_kind_blobs() {
        let record = FileData::with_blobs(vec![BlobId::for_ciphertext(b"chunk")]);
        assert_eq!(record.storage().unwrap(), StorageKind::Blobs);
    }

    #[test]
    fn storage_kind_neither_fails() {
        let record = FileData::default();
        assert!(matches!(
            record.storage(),
            Err(TransferError::Programming(_))
        ));
    }

    #[test]
    fn storage_kind_both_fails() {
        let record = FileData {
            blocks: vec![BlockId::random()],
            blobs: vec![BlobId::for_ciphertext(b"chunk")],
        };
        assert!(matches!(
            record.storage(),
            Err(TransferError::Programming(_))
        ));
    }

    #[test]
    fn data_file_debug_hides_content() {
        let file = DataFile {
            name: "notes.txt".into(),
            mime_type: Some("text/plain".into()),
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let debug = format!("{:?}", file);
        assert!(debug.contains("[4 bytes]"));
        assert!(!debug.contains("222")); // no raw byte values
    }
}
