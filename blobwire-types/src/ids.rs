//! Identity types for blobwire.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length in bytes of a server-assigned identifier.
const GENERATED_ID_SIZE: usize = 9;

/// Length in bytes of a blob content address.
const BLOB_ID_SIZE: usize = 6;

fn random_generated_id() -> [u8; GENERATED_ID_SIZE] {
    let mut bytes = [0u8; GENERATED_ID_SIZE];
    getrandom::getrandom(&mut bytes).expect("getrandom failed");
    bytes
}

/// Identifies one server-side archive grouping blobs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveId([u8; GENERATED_ID_SIZE]);

impl ArchiveId {
    /// Create a random ArchiveId (for testing).
    pub fn random() -> Self {
        Self(random_generated_id())
    }

    /// Create an ArchiveId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == GENERATED_ID_SIZE {
            let mut arr = [0u8; GENERATED_ID_SIZE];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Decode an ArchiveId from its base64 display form.
    pub fn decode(encoded: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        Self::from_bytes(&bytes)
    }

    /// Get the raw bytes of this ArchiveId.
    pub fn as_bytes(&self) -> &[u8; GENERATED_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchiveId({})", self)
    }
}

/// Identifies one FileData record (the per-file storage manifest).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDataId([u8; GENERATED_ID_SIZE]);

impl FileDataId {
    /// Create a random FileDataId (for testing).
    pub fn random() -> Self {
        Self(random_generated_id())
    }

    /// Create a FileDataId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == GENERATED_ID_SIZE {
            let mut arr = [0u8; GENERATED_ID_SIZE];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Decode a FileDataId from its base64 display form.
    pub fn decode(encoded: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        Self::from_bytes(&bytes)
    }

    /// Get the raw bytes of this FileDataId.
    pub fn as_bytes(&self) -> &[u8; GENERATED_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for FileDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for FileDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileDataId({})", self)
    }
}

/// Identifies the group owning an uploaded entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId([u8; GENERATED_ID_SIZE]);

impl GroupId {
    /// Create a random GroupId (for testing).
    pub fn random() -> Self {
        Self(random_generated_id())
    }

    /// Create a GroupId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == GENERATED_ID_SIZE {
            let mut arr = [0u8; GENERATED_ID_SIZE];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this GroupId.
    pub fn as_bytes(&self) -> &[u8; GENERATED_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self)
    }
}

/// Identifies one legacy storage block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId([u8; GENERATED_ID_SIZE]);

impl BlockId {
    /// Create a random BlockId (for testing).
    pub fn random() -> Self {
        Self(random_generated_id())
    }

    /// Get the raw bytes of this BlockId.
    pub fn as_bytes(&self) -> &[u8; GENERATED_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self)
    }
}

/// Content address of one encrypted chunk.
///
/// The first 6 bytes of the SHA-256 hash of the chunk ciphertext,
/// displayed as base64 (8 characters). Blob ids are scoped to an archive
/// and are only required to be unique within one upload; a collision
/// across unrelated uploads is tolerated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobId([u8; BLOB_ID_SIZE]);

impl BlobId {
    /// Derive the content address for an encrypted chunk.
    pub fn for_ciphertext(ciphertext: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(ciphertext);
        let mut bytes = [0u8; BLOB_ID_SIZE];
        bytes.copy_from_slice(&digest[..BLOB_ID_SIZE]);
        Self(bytes)
    }

    /// Create a BlobId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == BLOB_ID_SIZE {
            let mut arr = [0u8; BLOB_ID_SIZE];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Decode a BlobId from its base64 display form.
    pub fn decode(encoded: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        Self::from_bytes(&bytes)
    }

    /// Get the raw bytes of this BlobId.
    pub fn as_bytes(&self) -> &[u8; BLOB_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_id_roundtrip() {
        let original = ArchiveId::random();
        let restored = ArchiveId::from_bytes(original.as_bytes()).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn archive_id_decodes_display_form() {
        let id = ArchiveId::random();
        assert_eq!(ArchiveId::decode(&id.to_string()), Some(id));
    }

    #[test]
    fn generated_id_base64_display() {
        let id = FileDataId::random();
        assert_eq!(id.to_string().len(), 12); // 9 bytes = 12 base64 chars
    }

    #[test]
    fn generated_id_from_invalid_length_fails() {
        assert!(FileDataId::from_bytes(&[0u8; 8]).is_none());
        assert!(FileDataId::from_bytes(&[0u8; 16]).is_none());
    }

    #[test]
    fn blob_id_is_sha256_prefix() {
        use sha2::{Digest, Sha256};
        let ciphertext = b"encrypted chunk contents";
        let id = BlobId::for_ciphertext(ciphertext);
        let digest = Sha256::digest(ciphertext);
        assert_eq!(id.as_bytes(), &digest[..6]);
    }

    #[test]
    fn blob_id_deterministic() {
        let ciphertext = b"same bytes";
        assert_eq!(
            BlobId::for_ciphertext(ciphertext),
            BlobId::for_ciphertext(ciphertext)
        );
    }

    #[test]
    fn blob_id_differs_for_different_ciphertext() {
        assert_ne!(
            BlobId::for_ciphertext(b"chunk one"),
            BlobId::for_ciphertext(b"chunk two")
        );
    }

    #[test]
    fn blob_id_display_is_eight_chars() {
        let id = BlobId::for_ciphertext(b"anything");
        assert_eq!(id.to_string().len(), 8); // 6 bytes = 8 base64 chars
    }

    #[test]
    fn blob_id_decodes_display_form() {
        let id = BlobId::for_ciphertext(b"chunk");
        assert_eq!(BlobId::decode(&id.to_string()), Some(id));
    }
}
