//! Storage module: one contract, several backends
//!
//! This module provides a uniform upload/retrieve/delete interface with
//! multiple backend implementations:
//! - **Local filesystem storage** - objects stored flat under a directory
//! - **AWS S3 storage** - S3 and S3-compatible object stores (requires the
//!   `s3` feature)
//! - **Google Cloud Storage** - blob storage over a writer/reader seam
//!   (requires the `gcs` feature)
//! - **In-memory storage** - a functional fake for tests
//!
//! Each backend is constructed from an ordered chain of validated
//! configuration options and implements the same [`Storage`] contract, so
//! callers never hold a concrete backend type.
//!
//! # Examples
//!
//! ## Local storage
//!
//! ```rust
//! use stowage::context::Context;
//! use stowage::storage::{LocalConfig, LocalStorage, UploadRequest, Uploader};
//!
//! # async fn example() -> stowage::error::StorageResult<()> {
//! let storage = LocalStorage::from_options(vec![
//!     LocalConfig::with_storage_dir("storage"),
//! ])?;
//!
//! let ctx = Context::background();
//! let result = storage
//!     .upload_file(&ctx, UploadRequest::new("image.jpg", vec![0u8]))
//!     .await?;
//! assert_eq!(result.name, "image.jpg");
//! # Ok(())
//! # }
//! ```
//!
//! ## S3 storage (requires the `s3` feature)
//!
//! ```rust,ignore
//! use stowage::storage::{S3Config, S3Storage};
//!
//! let storage = S3Storage::from_options(vec![S3Config::with_static_credentials(
//!     "eu-west-1", "access-key", "secret-key", "assets",
//! )])?;
//! ```

// Capability contract and configuration options
pub mod storage_api;

// Storage backend implementations
pub mod memory_adapter;
pub mod storage_local;

#[cfg(feature = "s3")]
pub mod storage_s3;

#[cfg(feature = "gcs")]
pub mod storage_gcs;

// Re-export main types for convenience
pub use storage_api::{
    build_config, ConfigOption, DeleteRequest, DeleteResult, Deleter, RetrieveRequest,
    RetrieveResult, Retriever, Storage, UploadRequest, UploadResult, Uploader,
};

pub use memory_adapter::MemoryStorage;
pub use storage_local::{LocalConfig, LocalStorage};

#[cfg(feature = "s3")]
pub use storage_s3::{S3Client, S3Config, S3Storage};

#[cfg(feature = "gcs")]
pub use storage_gcs::{BlobClient, BlobReadCloser, BlobWriteCloser, GcsConfig, GcsStorage};

use crate::error::StorageResult;

/// Constructor helpers wiring each backend with its default collaborators.
pub struct StorageFactory;

impl StorageFactory {
    /// Creates a local storage adapter over the OS filesystem.
    pub fn create_local(
        options: impl IntoIterator<Item = ConfigOption<LocalConfig>>,
    ) -> StorageResult<LocalStorage> {
        LocalStorage::from_options(options)
    }

    /// Creates an S3 storage adapter (requires the `s3` feature).
    #[cfg(feature = "s3")]
    pub fn create_s3(
        options: impl IntoIterator<Item = ConfigOption<S3Config>>,
    ) -> StorageResult<S3Storage> {
        S3Storage::from_options(options)
    }

    /// Creates a GCS storage adapter (requires the `gcs` feature).
    #[cfg(feature = "gcs")]
    pub async fn create_gcs(
        options: impl IntoIterator<Item = ConfigOption<GcsConfig>>,
    ) -> StorageResult<GcsStorage> {
        GcsStorage::from_options(options).await
    }

    /// Creates an in-memory storage adapter.
    pub fn create_memory() -> MemoryStorage {
        MemoryStorage::default()
    }
}
