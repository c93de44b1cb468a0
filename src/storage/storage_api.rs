//! Capability contract shared by every storage backend
//!
//! This module defines the request/result shapes and the three narrow
//! capabilities (upload, retrieve, delete) that each backend must satisfy
//! identically. Callers hold the [`Storage`] aggregate (or one of the narrow
//! traits), never a concrete backend type, so read-only consumers can depend
//! on [`Retriever`] alone.
//!
//! Configuration construction goes through [`ConfigOption`]: an ordered list
//! of failable mutators applied against a default configuration. The first
//! option that fails aborts construction, and no adapter is produced.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::context::Context;
use crate::error::{StorageError, StorageResult};

/// Parameters for storing an object.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadRequest {
    /// Object identifier the payload is stored under. Must be non-empty.
    pub file_name: String,
    /// Binary payload.
    pub file_data: Bytes,
    /// Declared payload size in bytes. Advisory; adapters never truncate the
    /// payload to match it.
    pub file_size: u64,
}

impl UploadRequest {
    /// Builds a request with `file_size` derived from the payload.
    pub fn new(file_name: impl Into<String>, file_data: impl Into<Bytes>) -> Self {
        let file_data = file_data.into();
        let file_size = file_data.len() as u64;
        Self {
            file_name: file_name.into(),
            file_data,
            file_size,
        }
    }
}

/// Successful upload outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadResult {
    /// Identifier the object was stored under.
    pub id: String,
    /// Display name of the stored object.
    pub name: String,
    /// Instant the upload completed, taken from the injected clock.
    pub uploaded_at: DateTime<Utc>,
}

/// Parameters for retrieving an object.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct RetrieveRequest {
    /// Identifier of the object to fetch.
    pub id: String,
}

impl RetrieveRequest {
    /// Builds a retrieve request for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Successful retrieve outcome. Always carries the full payload; the
/// contract has no partial or range reads.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct RetrieveResult {
    /// The stored payload.
    pub file: Bytes,
    /// Instant the retrieval completed, taken from the injected clock.
    pub retrieved_at: DateTime<Utc>,
}

/// Parameters for deleting an object.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct DeleteRequest {
    /// Identifier of the object to remove.
    pub id: String,
}

impl DeleteRequest {
    /// Builds a delete request for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Successful delete outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct DeleteResult {
    /// Identifier the object was removed under.
    pub id: String,
    /// Instant the deletion completed, taken from the injected clock.
    pub deleted_at: DateTime<Utc>,
}

/// Upload capability.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Durably stores the payload under its identifier and returns a stamped
    /// result, or returns an error leaving no partial object visible to
    /// subsequent retrieves.
    async fn upload_file(&self, ctx: &Context, p: UploadRequest) -> StorageResult<UploadResult>;
}

/// Retrieve capability.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns the full stored payload, or an error when the object does not
    /// exist or cannot be read.
    async fn retrieve_file(
        &self,
        ctx: &Context,
        p: RetrieveRequest,
    ) -> StorageResult<RetrieveResult>;
}

/// Delete capability.
#[async_trait]
pub trait Deleter: Send + Sync {
    /// Makes the object unavailable to subsequent retrieves, or returns an
    /// error when it does not exist or cannot be removed.
    async fn delete_file(&self, ctx: &Context, p: DeleteRequest) -> StorageResult<DeleteResult>;
}

/// Aggregate storage capability: every backend adapter implements all three.
pub trait Storage: Uploader + Retriever + Deleter {}

impl<T: Uploader + Retriever + Deleter> Storage for T {}

/// A single composable configuration mutation.
///
/// Options are applied in order against a default configuration by
/// [`build_config`]; any option may fail and abort the chain. The same
/// adapter constructor can therefore accept "build client from credentials"
/// or "reuse an externally supplied client" without branching.
pub struct ConfigOption<C> {
    apply: Box<dyn FnOnce(&mut C) -> StorageResult<()> + Send>,
}

impl<C> ConfigOption<C> {
    /// Wraps a mutator as an option.
    pub fn new(apply: impl FnOnce(&mut C) -> StorageResult<()> + Send + 'static) -> Self {
        Self {
            apply: Box::new(apply),
        }
    }

    /// Applies this option to a configuration under construction.
    pub fn apply(self, config: &mut C) -> StorageResult<()> {
        (self.apply)(config)
    }
}

impl<C> std::fmt::Debug for ConfigOption<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigOption").finish_non_exhaustive()
    }
}

/// Applies `options` in order against `C::default()`.
///
/// Fails with "invalid storage option" when no option is supplied, and with
/// the option's own error when one fails; later options are not applied.
pub fn build_config<C: Default>(
    options: impl IntoIterator<Item = ConfigOption<C>>,
) -> StorageResult<C> {
    let mut config = C::default();
    let mut applied = false;
    for option in options {
        option.apply(&mut config)?;
        applied = true;
    }
    if !applied {
        return Err(StorageError::invalid_config("invalid storage option"));
    }
    Ok(config)
}

/// Shared request validation helpers.
pub mod utils {
    use crate::error::{StorageError, StorageResult};

    /// Rejects an empty object identifier before any I/O is attempted.
    pub fn validate_file_name(name: &str) -> StorageResult<()> {
        if name.is_empty() {
            return Err(StorageError::InvalidFileName);
        }
        Ok(())
    }
}
