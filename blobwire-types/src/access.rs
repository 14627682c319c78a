//! Ephemeral access bundles for archive storage.
//!
//! A [`BlobAccessInfo`] lives for exactly one logical transfer operation.
//! Tokens expire server-side and are never persisted or cached across
//! operations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ArchiveId, BlobId};

/// Short-lived token authorizing access to one archive.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token value received from the access token service.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token value for use in a request header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Don't leak tokens in debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken([redacted])")
    }
}

/// Opaque value returned by a successful chunk upload, used to associate
/// the chunk with its owning record.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobReferenceToken(Vec<u8>);

impl BlobReferenceToken {
    /// Wrap a reference token returned by a storage server.
    pub fn new(token: impl Into<Vec<u8>>) -> Self {
        Self(token.into())
    }

    /// Get the raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BlobReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobReferenceToken({} bytes)", self.0.len())
    }
}

/// A candidate storage server for one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetServer {
    /// Base URL of the server.
    pub url: String,
}

impl TargetServer {
    /// Create a target server from its base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Ephemeral access bundle for one archive: token, ordered candidate
/// servers and, for reads, the blob ids present in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobAccessInfo {
    /// The archive this bundle grants access to.
    pub archive_id: ArchiveId,
    /// The access token, valid for one operation.
    pub token: AccessToken,
    /// Candidate servers in preference order.
    pub servers: Vec<TargetServer>,
    /// Blob ids enumerated in this archive (populated for reads).
    pub blobs: Vec<BlobId>,
}

impl BlobAccessInfo {
    /// The preferred storage server, if the list is non-empty.
    pub fn first_server(&self) -> Option<&TargetServer> {
        self.servers.first()
    }
}

/// Server-declared chunk enumeration for one file, possibly spanning
/// several archives.
///
/// `blobs` is the source of truth for chunk order; `access` carries one
/// bundle per involved archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlobListing {
    /// Blob ids in the server-declared order.
    pub blobs: Vec<BlobId>,
    /// One access bundle per archive.
    pub access: Vec<BlobAccessInfo>,
}

impl FileBlobListing {
    /// Find the access bundle whose archive contains the given blob.
    pub fn access_for(&self, blob_id: &BlobId) -> Option<&BlobAccessInfo> {
        self.access.iter().find(|info| info.blobs.contains(blob_id))
    }
}

/// Entity type descriptor accompanying a write intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Application the entity type belongs to.
    pub application: String,
    /// Numeric entity type id.
    pub type_id: u64,
}

impl TypeDescriptor {
    /// Create a type descriptor.
    pub fn new(application: impl Into<String>, type_id: u64) -> Self {
        Self {
            application: application.into(),
            type_id,
        }
    }

    /// Descriptor of the FileData entity type.
    pub fn file_data() -> Self {
        Self::new("files", 13)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_debug_redacts_value() {
        let token = AccessToken::new("very-secret-token");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("very-secret-token"));
    }

    #[test]
    fn listing_finds_access_for_blob() {
        let in_first = BlobId::for_ciphertext(b"first");
        let in_second = BlobId::for_ciphertext(b"second");
        let first = BlobAccessInfo {
            archive_id: ArchiveId::random(),
            token: AccessToken::new("t1"),
            servers: vec![TargetServer::new("http://s1")],
            blobs: vec![in_first],
        };
        let second = BlobAccessInfo {
            archive_id: ArchiveId::random(),
            token: AccessToken::new("t2"),
            servers: vec![TargetServer::new("http://s2")],
            blobs: vec![in_second],
        };
        let listing = FileBlobListing {
            blobs: vec![in_first, in_second],
            access: vec![first.clone(), second],
        };

        assert_eq!(
            listing.access_for(&in_first).map(|i| i.archive_id),
            Some(first.archive_id)
        );
        assert!(listing.access_for(&BlobId::for_ciphertext(b"absent")).is_none());
    }

    #[test]
    fn access_info_serde_roundtrip() {
        let info = BlobAccessInfo {
            archive_id: ArchiveId::random(),
            token: AccessToken::new("token-1"),
            servers: vec![TargetServer::new("http://storage-0.example")],
            blobs: vec![BlobId::for_ciphertext(b"chunk")],
        };
        let json = serde_json::to_string(&info).unwrap();
        let restored: BlobAccessInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.archive_id, info.archive_id);
        assert_eq!(restored.token, info.token);
        assert_eq!(restored.servers, info.servers);
        assert_eq!(restored.blobs, info.blobs);
    }
}
