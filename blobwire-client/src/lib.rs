//! # blobwire-client
//!
//! Client-side encrypted blob transfer for blobwire archive storage.
//!
//! File content is stored server-side as immutable content-addressed
//! blobs distributed across archive servers; a legacy single-block path
//! stays alive during the server-driven migration. This crate splits,
//! encrypts, uploads, downloads, decrypts and reassembles that content
//! behind one facade, guaranteeing that reassembled plaintext is
//! byte-identical to the original input.
//!
//! ## Architecture
//!
//! ```text
//! FileFacade ── loads FileData, picks blob vs block path
//!     ├─ BlobTransferEngine ── encrypt, split, upload/download chunks
//!     ├─ BlockTransfer ────── legacy undivided transfers
//!     └─ SuspensionCoordinator ── process-wide cooldown, FIFO replay
//!             (consulted before every network call)
//! ```
//!
//! Collaborators (tokens, storage servers, entity registration, the
//! native file bridge) are traits injected at construction;
//! [`api::MockApi`] and [`bridge::MockFileBridge`] implement them for
//! tests.
//!
//! ## Example
//!
//! ```ignore
//! use blobwire_client::{FileFacade, SuspensionCoordinator, TransferConfig};
//!
//! let suspension = SuspensionCoordinator::new();
//! let facade = FileFacade::new(tokens, storage, entities, suspension, config);
//!
//! let id = facade.upload_file(&payload, &session_key, &owner_group).await?;
//! let file = facade.download_file_content(&metadata, &session_key).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bridge;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod facade;
pub mod legacy;
pub mod suspension;

pub use api::{AccessTokenService, EntityService, MockApi, StorageServer};
pub use bridge::{FileBridge, MockFileBridge, NoBridge};
pub use config::{TransferConfig, DEFAULT_MAX_SUSPENSION_RETRIES};
pub use crypto::{SessionKey, NONCE_SIZE, SESSION_KEY_SIZE};
pub use engine::BlobTransferEngine;
pub use facade::FileFacade;
pub use legacy::BlockTransfer;
pub use suspension::SuspensionCoordinator;
