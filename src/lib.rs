//! # Stowage
//!
//! A uniform object-storage facade: upload, retrieve and delete binary
//! objects through one capability contract while the bytes land in a local
//! filesystem, an S3-compatible object store, a Google Cloud Storage bucket
//! or process memory.
//!
//! ## Design
//!
//! - **Capability contract**: three narrow traits ([`storage::Uploader`],
//!   [`storage::Retriever`], [`storage::Deleter`]) composed into
//!   [`storage::Storage`]; callers depend on the contract, never on a
//!   concrete backend.
//! - **Validated construction**: each backend is configured through an
//!   ordered chain of failable options; construction fails fast and no
//!   adapter exists with an invalid configuration.
//! - **Injected collaborators**: the wall clock, the filesystem and the
//!   native SDK clients sit behind narrow traits so tests can substitute
//!   deterministic fakes.
//!
//! ## Optional features
//!
//! - `s3`: AWS S3 backend (default)
//! - `gcs`: Google Cloud Storage backend (default)
//! - `serde_support`: Serde derives on the request/result types
//!
//! ## Example
//!
//! ```rust
//! use stowage::context::Context;
//! use stowage::storage::{
//!     Retriever, RetrieveRequest, Storage, StorageFactory, UploadRequest, Uploader,
//! };
//!
//! # async fn example() -> stowage::error::StorageResult<()> {
//! let storage: Box<dyn Storage> = Box::new(StorageFactory::create_memory());
//! let ctx = Context::background();
//!
//! storage
//!     .upload_file(&ctx, UploadRequest::new("image.jpg", vec![0u8]))
//!     .await?;
//! let retrieved = storage
//!     .retrieve_file(&ctx, RetrieveRequest::new("image.jpg"))
//!     .await?;
//! assert_eq!(retrieved.file.as_ref(), &[0u8]);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core error types
pub use error::{StorageError, StorageResult};

// Core modules
pub mod clock;
pub mod context;
pub mod error;
pub mod fs;
pub mod storage;

// Re-export commonly used types
pub mod prelude {
    //! Common types and traits for convenient importing

    pub use crate::clock::{Clock, SystemClock};
    pub use crate::context::Context;
    pub use crate::error::{StorageError, StorageResult};
    pub use crate::storage::{
        DeleteRequest, DeleteResult, Deleter, RetrieveRequest, RetrieveResult, Retriever,
        Storage, StorageFactory, UploadRequest, UploadResult, Uploader,
    };
}

// Version information
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "stowage");
    }
}
