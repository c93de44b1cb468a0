//! Google Cloud Storage backend
//!
//! Uploads go through a writer handle: the payload is copied into the writer
//! and the writer is then explicitly closed. A successful copy does not
//! imply durability; only a successful close does, so a close failure
//! surfaces as an upload failure and no timestamp is produced. Retrieval
//! opens a reader, drains it fully and releases it before stamping.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use google_cloud_storage::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_storage::client::{Client as NativeGcsClient, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{BoxError, StorageError, StorageResult};
use crate::storage::storage_api::{
    self, ConfigOption, DeleteRequest, DeleteResult, Deleter, RetrieveRequest, RetrieveResult,
    Retriever, UploadRequest, UploadResult, Uploader,
};

/// Writer handle scoped to one object. The object only becomes durable once
/// [`BlobWriteCloser::close`] succeeds.
#[async_trait]
pub trait BlobWriteCloser: Send {
    /// Copies `data` into the object being written.
    async fn write(&mut self, data: &[u8]) -> Result<(), BoxError>;

    /// Completes the write and releases the handle.
    async fn close(self: Box<Self>) -> Result<(), BoxError>;
}

/// Reader handle scoped to one object.
#[async_trait]
pub trait BlobReadCloser: Send {
    /// Drains the object fully, then releases the handle.
    async fn read_to_end(self: Box<Self>) -> Result<Vec<u8>, BoxError>;
}

/// Native blob-store operations consumed by the adapter.
#[async_trait]
pub trait BlobClient: Send + Sync {
    /// Opens a writer for `bucket`/`key`.
    fn new_writer(&self, bucket: &str, key: &str) -> Box<dyn BlobWriteCloser>;

    /// Opens a reader for `bucket`/`key`; `None` when no such object exists.
    async fn new_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Box<dyn BlobReadCloser>>, BoxError>;

    /// Removes `bucket`/`key`.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), BoxError>;
}

/// Buffering writer over the native simple-upload call. The buffered bytes
/// are only submitted when the writer is closed.
struct GcsObjectWriter {
    client: NativeGcsClient,
    bucket: String,
    key: String,
    buf: Vec<u8>,
}

#[async_trait]
impl BlobWriteCloser for GcsObjectWriter {
    async fn write(&mut self, data: &[u8]) -> Result<(), BoxError> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), BoxError> {
        let Self {
            client,
            bucket,
            key,
            buf,
        } = *self;
        client
            .upload_object(
                &UploadObjectRequest {
                    bucket,
                    ..Default::default()
                },
                buf,
                &UploadType::Simple(Media::new(key)),
            )
            .await
            .map(|_| ())
            .map_err(|err| Box::new(err) as BoxError)
    }
}

/// Streaming reader over the native download call.
struct GcsObjectReader {
    stream: futures::stream::BoxStream<
        'static,
        Result<Bytes, google_cloud_storage::http::Error>,
    >,
}

#[async_trait]
impl BlobReadCloser for GcsObjectReader {
    async fn read_to_end(mut self: Box<Self>) -> Result<Vec<u8>, BoxError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.stream.next().await {
            let chunk = chunk.map_err(|err| Box::new(err) as BoxError)?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait]
impl BlobClient for NativeGcsClient {
    fn new_writer(&self, bucket: &str, key: &str) -> Box<dyn BlobWriteCloser> {
        Box::new(GcsObjectWriter {
            client: self.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            buf: Vec::new(),
        })
    }

    async fn new_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Box<dyn BlobReadCloser>>, BoxError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };
        match self.download_streamed_object(&req, &Range::default()).await {
            Ok(stream) => Ok(Some(Box::new(GcsObjectReader {
                stream: stream.boxed(),
            }))),
            Err(google_cloud_storage::http::Error::Response(err)) if err.code == 404 => Ok(None),
            Err(err) => Err(Box::new(err)),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), BoxError> {
        let req = DeleteObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };
        self.delete_object(&req)
            .await
            .map_err(|err| Box::new(err) as BoxError)
    }
}

/// Validated configuration for the GCS backend.
#[derive(Clone, Default)]
pub struct GcsConfig {
    /// Target bucket.
    pub bucket_name: String,
    /// Service-account credentials file the native client is built from when
    /// no client is supplied directly.
    pub credentials_path: Option<String>,
    /// Active client handle.
    pub client: Option<Arc<dyn BlobClient>>,
}

impl std::fmt::Debug for GcsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsConfig")
            .field("bucket_name", &self.bucket_name)
            .field("credentials_path", &self.credentials_path)
            .field("client", &self.client.as_ref().map(|_| "<client>"))
            .finish()
    }
}

impl GcsConfig {
    /// Option that reuses an externally supplied client for `bucket_name`.
    pub fn with_client(
        bucket_name: impl Into<String>,
        client: Arc<dyn BlobClient>,
    ) -> ConfigOption<GcsConfig> {
        let bucket_name = bucket_name.into();
        ConfigOption::new(move |config: &mut GcsConfig| {
            if bucket_name.is_empty() {
                return Err(StorageError::invalid_config("invalid gcs bucket name"));
            }
            config.bucket_name = bucket_name;
            config.client = Some(client);
            Ok(())
        })
    }

    /// Option that records a credentials file the native client is built
    /// from during adapter construction.
    pub fn with_credentials_file(
        bucket_name: impl Into<String>,
        path: impl Into<String>,
    ) -> ConfigOption<GcsConfig> {
        let bucket_name = bucket_name.into();
        let path = path.into();
        ConfigOption::new(move |config: &mut GcsConfig| {
            if bucket_name.is_empty() {
                return Err(StorageError::invalid_config("invalid gcs bucket name"));
            }
            if path.is_empty() {
                return Err(StorageError::invalid_config(
                    "invalid gcs credentials path",
                ));
            }
            config.bucket_name = bucket_name;
            config.credentials_path = Some(path);
            Ok(())
        })
    }
}

/// Storage adapter for Google Cloud Storage.
pub struct GcsStorage {
    config: GcsConfig,
    client: Arc<dyn BlobClient>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GcsStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsStorage").finish_non_exhaustive()
    }
}

impl GcsStorage {
    /// Creates an adapter from an already-validated configuration and
    /// explicit collaborators.
    pub fn new(config: GcsConfig, client: Arc<dyn BlobClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            client,
            clock,
        }
    }

    /// Builds the configuration from `options`, constructing the native
    /// client from the recorded credentials file when none was supplied.
    /// Any failure here aborts before an adapter exists.
    pub async fn from_options(
        options: impl IntoIterator<Item = ConfigOption<GcsConfig>>,
    ) -> StorageResult<Self> {
        let mut config = storage_api::build_config(options)?;

        if config.client.is_none() {
            let path = config
                .credentials_path
                .clone()
                .ok_or_else(|| StorageError::invalid_config("invalid gcs client"))?;
            let credentials = CredentialsFile::new_from_file(path).await.map_err(|err| {
                StorageError::invalid_config(format!("failed constructing gcs client: {err}"))
            })?;
            let client_config = ClientConfig::default()
                .with_credentials(credentials)
                .await
                .map_err(|err| {
                    StorageError::invalid_config(format!(
                        "failed constructing gcs client: {err}"
                    ))
                })?;
            config.client = Some(Arc::new(NativeGcsClient::new(client_config)));
        }

        let client = config
            .client
            .clone()
            .ok_or_else(|| StorageError::invalid_config("invalid gcs client"))?;
        Ok(Self::new(config, client, Arc::new(SystemClock)))
    }

    /// The configuration this adapter was constructed from.
    pub fn config(&self) -> &GcsConfig {
        &self.config
    }
}

#[async_trait]
impl Uploader for GcsStorage {
    async fn upload_file(&self, ctx: &Context, p: UploadRequest) -> StorageResult<UploadResult> {
        ctx.ensure_valid()?;
        storage_api::utils::validate_file_name(&p.file_name)?;

        let mut writer = self.client.new_writer(&self.config.bucket_name, &p.file_name);
        writer
            .write(&p.file_data)
            .await
            .map_err(|source| StorageError::StoreFailed { source })?;
        // Copy success does not imply durability; close must succeed too.
        writer
            .close()
            .await
            .map_err(|source| StorageError::StoreFailed { source })?;

        let uploaded_at = self.clock.now();
        debug!(bucket = %self.config.bucket_name, key = %p.file_name, "stored gcs object");
        Ok(UploadResult {
            id: p.file_name.clone(),
            name: p.file_name,
            uploaded_at,
        })
    }
}

#[async_trait]
impl Retriever for GcsStorage {
    async fn retrieve_file(
        &self,
        ctx: &Context,
        p: RetrieveRequest,
    ) -> StorageResult<RetrieveResult> {
        ctx.ensure_valid()?;

        let reader = self
            .client
            .new_reader(&self.config.bucket_name, &p.id)
            .await
            .map_err(|source| StorageError::RetrieveFailed { source })?
            .ok_or(StorageError::FileNotFound)?;
        let bytes = reader
            .read_to_end()
            .await
            .map_err(|source| StorageError::RetrieveFailed { source })?;

        let retrieved_at = self.clock.now();
        debug!(bucket = %self.config.bucket_name, key = %p.id, "retrieved gcs object");
        Ok(RetrieveResult {
            file: Bytes::from(bytes),
            retrieved_at,
        })
    }
}

#[async_trait]
impl Deleter for GcsStorage {
    async fn delete_file(&self, ctx: &Context, p: DeleteRequest) -> StorageResult<DeleteResult> {
        ctx.ensure_valid()?;

        self.client
            .delete(&self.config.bucket_name, &p.id)
            .await
            .map_err(|source| StorageError::DeleteFailed { source })?;

        let deleted_at = self.clock.now();
        debug!(bucket = %self.config.bucket_name, key = %p.id, "deleted gcs object");
        Ok(DeleteResult {
            id: p.id,
            deleted_at,
        })
    }
}
