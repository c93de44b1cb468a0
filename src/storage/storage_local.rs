//! Local filesystem storage backend
//!
//! Objects live flat under a configured storage directory as
//! `{storage_dir}/{id}`. Uploads follow an at-most-once write policy: an
//! object that already exists under the target identifier is never silently
//! overwritten. All filesystem access goes through the injected
//! [`FileManager`] collaborator and result timestamps come from the injected
//! [`Clock`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{StorageError, StorageResult};
use crate::fs::{FileManager, OsFileManager};
use crate::storage::storage_api::{
    self, ConfigOption, DeleteRequest, DeleteResult, Deleter, RetrieveRequest, RetrieveResult,
    Retriever, UploadRequest, UploadResult, Uploader,
};

/// Permission mask applied to stored files.
const FILE_MODE: u32 = 0o644;
/// Permission mask applied to the storage directory when it is created.
const DIR_MODE: u32 = 0o755;

/// Validated configuration for the local backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalConfig {
    /// Normalized storage directory all objects are placed under.
    pub storage_dir: String,
}

impl LocalConfig {
    /// Option that sets the storage directory.
    ///
    /// The path must be non-empty; it is lower-cased and any trailing `/` is
    /// stripped so path concatenation with object identifiers is
    /// deterministic.
    pub fn with_storage_dir(storage_dir: impl Into<String>) -> ConfigOption<LocalConfig> {
        let storage_dir = storage_dir.into();
        ConfigOption::new(move |config: &mut LocalConfig| {
            if storage_dir.is_empty() {
                return Err(StorageError::invalid_config("invalid storage directory"));
            }
            let normalized = storage_dir.to_lowercase();
            config.storage_dir = normalized.trim_end_matches('/').to_string();
            Ok(())
        })
    }
}

/// Storage adapter for the local filesystem.
pub struct LocalStorage {
    config: LocalConfig,
    file_manager: Arc<dyn FileManager>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocalStorage {
    /// Creates an adapter from an already-validated configuration and
    /// explicit collaborators.
    pub fn new(
        config: LocalConfig,
        file_manager: Arc<dyn FileManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            file_manager,
            clock,
        }
    }

    /// Builds the configuration from `options` and wires the OS filesystem
    /// and the system clock.
    pub fn from_options(
        options: impl IntoIterator<Item = ConfigOption<LocalConfig>>,
    ) -> StorageResult<Self> {
        let config = storage_api::build_config(options)?;
        Ok(Self::new(
            config,
            Arc::new(OsFileManager),
            Arc::new(SystemClock),
        ))
    }

    /// The configuration this adapter was constructed from.
    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    fn object_path(&self, id: &str) -> PathBuf {
        Path::new(&self.config.storage_dir).join(id)
    }
}

#[async_trait]
impl Uploader for LocalStorage {
    async fn upload_file(&self, ctx: &Context, p: UploadRequest) -> StorageResult<UploadResult> {
        ctx.ensure_valid()?;
        storage_api::utils::validate_file_name(&p.file_name)?;

        let dir = Path::new(&self.config.storage_dir);
        if !self.file_manager.is_exists(dir) {
            self.file_manager
                .create_dir(dir, DIR_MODE)
                .map_err(|source| StorageError::CreateDirFailed {
                    path: self.config.storage_dir.clone(),
                    source,
                })?;
        }

        let path = self.object_path(&p.file_name);
        if self.file_manager.is_exists(&path) {
            return Err(StorageError::FileAlreadyExists);
        }

        self.file_manager
            .write_file(&path, &p.file_data, FILE_MODE)
            .map_err(|source| StorageError::StoreFailed {
                source: Box::new(source),
            })?;

        let uploaded_at = self.clock.now();
        debug!(file_name = %p.file_name, size = p.file_data.len(), "stored local file");
        Ok(UploadResult {
            id: p.file_name.clone(),
            name: p.file_name,
            uploaded_at,
        })
    }
}

#[async_trait]
impl Retriever for LocalStorage {
    async fn retrieve_file(
        &self,
        ctx: &Context,
        p: RetrieveRequest,
    ) -> StorageResult<RetrieveResult> {
        ctx.ensure_valid()?;

        let path = self.object_path(&p.id);
        if !self.file_manager.is_exists(&path) {
            return Err(StorageError::FileNotFound);
        }

        // The handle is dropped on every exit path, including read failure.
        let mut file =
            self.file_manager
                .open(&path)
                .map_err(|source| StorageError::RetrieveFailed {
                    source: Box::new(source),
                })?;
        let bytes = self
            .file_manager
            .read_file(&mut *file)
            .map_err(|source| StorageError::RetrieveFailed {
                source: Box::new(source),
            })?;

        let retrieved_at = self.clock.now();
        debug!(id = %p.id, size = bytes.len(), "retrieved local file");
        Ok(RetrieveResult {
            file: Bytes::from(bytes),
            retrieved_at,
        })
    }
}

#[async_trait]
impl Deleter for LocalStorage {
    async fn delete_file(&self, ctx: &Context, p: DeleteRequest) -> StorageResult<DeleteResult> {
        ctx.ensure_valid()?;

        let path = self.object_path(&p.id);
        if !self.file_manager.is_exists(&path) {
            return Err(StorageError::FileNotFound);
        }

        self.file_manager
            .remove_file(&path)
            .map_err(|source| StorageError::DeleteFailed {
                source: Box::new(source),
            })?;

        let deleted_at = self.clock.now();
        debug!(id = %p.id, "deleted local file");
        Ok(DeleteResult {
            id: p.id,
            deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory stand-in for the filesystem, with switchable failures.
    #[derive(Default)]
    struct FakeFileManager {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        dirs: Mutex<Vec<PathBuf>>,
        fail_create_dir: bool,
        fail_write: bool,
        fail_remove: bool,
    }

    impl FakeFileManager {
        fn with_file(self, path: &str, data: &[u8]) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), data.to_vec());
            self
        }
    }

    impl FileManager for FakeFileManager {
        fn is_exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
                || self.dirs.lock().unwrap().iter().any(|d| d == path)
        }

        fn create_dir(&self, path: &Path, _mode: u32) -> io::Result<()> {
            if self.fail_create_dir {
                return Err(io::Error::other("mkdir failed"));
            }
            self.dirs.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn write_file(&self, path: &Path, data: &[u8], _mode: u32) -> io::Result<()> {
            if self.fail_write {
                return Err(io::Error::other("write failed"));
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }

        fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
            match self.files.lock().unwrap().get(path) {
                Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
                None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
            }
        }

        fn read_file(&self, file: &mut dyn Read) -> io::Result<Vec<u8>> {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Ok(bytes)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            if self.fail_remove {
                return Err(io::Error::other("remove failed"));
            }
            self.files.lock().unwrap().remove(path);
            Ok(())
        }
    }

    /// File manager that fails the test if any call reaches it.
    struct UnreachableFileManager;

    impl FileManager for UnreachableFileManager {
        fn is_exists(&self, _path: &Path) -> bool {
            panic!("file manager must not be called")
        }
        fn create_dir(&self, _path: &Path, _mode: u32) -> io::Result<()> {
            panic!("file manager must not be called")
        }
        fn write_file(&self, _path: &Path, _data: &[u8], _mode: u32) -> io::Result<()> {
            panic!("file manager must not be called")
        }
        fn open(&self, _path: &Path) -> io::Result<Box<dyn Read + Send>> {
            panic!("file manager must not be called")
        }
        fn read_file(&self, _file: &mut dyn Read) -> io::Result<Vec<u8>> {
            panic!("file manager must not be called")
        }
        fn remove_file(&self, _path: &Path) -> io::Result<()> {
            panic!("file manager must not be called")
        }
    }

    fn storage_with(fm: FakeFileManager, clock: FixedClock) -> LocalStorage {
        LocalStorage::new(
            LocalConfig {
                storage_dir: "storage".to_string(),
            },
            Arc::new(fm),
            Arc::new(clock),
        )
    }

    #[test]
    fn test_storage_dir_option_normalizes() {
        let config =
            storage_api::build_config(vec![LocalConfig::with_storage_dir("Storage/")]).unwrap();
        assert_eq!(config.storage_dir, "storage");
    }

    #[test]
    fn test_empty_storage_dir_is_rejected() {
        let err =
            storage_api::build_config(vec![LocalConfig::with_storage_dir("")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid storage directory");
    }

    #[test]
    fn test_from_options_requires_an_option() {
        let err = LocalStorage::from_options(Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "invalid storage option");
    }

    #[tokio::test]
    async fn test_upload_retrieve_delete_scenario() {
        let now = Utc::now();
        let storage = storage_with(FakeFileManager::default(), FixedClock::new(now));
        let ctx = Context::background();

        let uploaded = storage
            .upload_file(&ctx, UploadRequest::new("image.jpg", vec![0u8]))
            .await
            .unwrap();
        assert_eq!(uploaded.name, "image.jpg");
        assert_eq!(uploaded.uploaded_at, now);

        let retrieved = storage
            .retrieve_file(&ctx, RetrieveRequest::new("image.jpg"))
            .await
            .unwrap();
        assert_eq!(retrieved.file, Bytes::from(vec![0u8]));
        assert_eq!(retrieved.retrieved_at, now);

        let deleted = storage
            .delete_file(&ctx, DeleteRequest::new("image.jpg"))
            .await
            .unwrap();
        assert_eq!(deleted.id, "image.jpg");
        assert_eq!(deleted.deleted_at, now);

        let err = storage
            .retrieve_file(&ctx, RetrieveRequest::new("image.jpg"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "file is not found");
    }

    #[tokio::test]
    async fn test_second_upload_fails_and_preserves_original() {
        let storage = storage_with(FakeFileManager::default(), FixedClock::new(Utc::now()));
        let ctx = Context::background();

        storage
            .upload_file(&ctx, UploadRequest::new("image.jpg", vec![1u8, 2, 3]))
            .await
            .unwrap();

        let err = storage
            .upload_file(&ctx, UploadRequest::new("image.jpg", vec![9u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileAlreadyExists));

        let retrieved = storage
            .retrieve_file(&ctx, RetrieveRequest::new("image.jpg"))
            .await
            .unwrap();
        assert_eq!(retrieved.file, Bytes::from(vec![1u8, 2, 3]));
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file_name() {
        let storage = storage_with(FakeFileManager::default(), FixedClock::new(Utc::now()));
        let err = storage
            .upload_file(&Context::background(), UploadRequest::new("", vec![0u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidFileName));
    }

    #[tokio::test]
    async fn test_create_dir_failure_is_wrapped() {
        let fm = FakeFileManager {
            fail_create_dir: true,
            ..Default::default()
        };
        let storage = storage_with(fm, FixedClock::new(Utc::now()));
        let err = storage
            .upload_file(
                &Context::background(),
                UploadRequest::new("image.jpg", vec![0u8]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed create storage dir: storage");
    }

    #[tokio::test]
    async fn test_write_failure_is_wrapped() {
        let fm = FakeFileManager {
            fail_write: true,
            ..Default::default()
        };
        let storage = storage_with(fm, FixedClock::new(Utc::now()));
        let err = storage
            .upload_file(
                &Context::background(),
                UploadRequest::new("image.jpg", vec![0u8]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed storing file");
    }

    #[tokio::test]
    async fn test_delete_failure_is_wrapped() {
        let fm = FakeFileManager::default().with_file("storage/image.jpg", &[0u8]);
        let fm = FakeFileManager {
            fail_remove: true,
            ..fm
        };
        let storage = storage_with(fm, FixedClock::new(Utc::now()));
        let err = storage
            .delete_file(&Context::background(), DeleteRequest::new("image.jpg"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed delete file");
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_found() {
        let storage = storage_with(FakeFileManager::default(), FixedClock::new(Utc::now()));
        let err = storage
            .delete_file(&Context::background(), DeleteRequest::new("absent.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound));
    }

    #[tokio::test]
    async fn test_cancelled_context_issues_no_filesystem_calls() {
        let storage = LocalStorage::new(
            LocalConfig {
                storage_dir: "storage".to_string(),
            },
            Arc::new(UnreachableFileManager),
            Arc::new(FixedClock::new(Utc::now())),
        );
        let ctx = Context::cancelled();

        let err = storage
            .upload_file(&ctx, UploadRequest::new("image.jpg", vec![0u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidContext));

        let err = storage
            .retrieve_file(&ctx, RetrieveRequest::new("image.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidContext));

        let err = storage
            .delete_file(&ctx, DeleteRequest::new("image.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidContext));
    }

    #[tokio::test]
    async fn test_round_trip_on_real_filesystem() {
        let dir = TempDir::new().unwrap();
        let storage_dir = dir.path().join("objects");
        let storage = LocalStorage::new(
            LocalConfig {
                storage_dir: storage_dir.to_string_lossy().into_owned(),
            },
            Arc::new(OsFileManager),
            Arc::new(SystemClock),
        );
        let ctx = Context::background();
        let payload: Vec<u8> = (0u8..=255).collect();

        storage
            .upload_file(&ctx, UploadRequest::new("blob.bin", payload.clone()))
            .await
            .unwrap();

        let retrieved = storage
            .retrieve_file(&ctx, RetrieveRequest::new("blob.bin"))
            .await
            .unwrap();
        assert_eq!(retrieved.file, Bytes::from(payload));

        storage
            .delete_file(&ctx, DeleteRequest::new("blob.bin"))
            .await
            .unwrap();
        let err = storage
            .retrieve_file(&ctx, RetrieveRequest::new("blob.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound));
    }
}
