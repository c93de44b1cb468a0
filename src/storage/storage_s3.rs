//! AWS S3 storage backend
//!
//! The adapter speaks to S3 through the narrow [`S3Client`] collaborator
//! trait, implemented directly on [`aws_sdk_s3::Client`]. Retrieval drains
//! the SDK byte stream fully before the result is stamped; the stream is
//! released once drained regardless of outcome. A missing object surfaces as
//! the same "file is not found" precondition error the other backends use.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{BoxError, StorageError, StorageResult};
use crate::storage::storage_api::{
    self, ConfigOption, DeleteRequest, DeleteResult, Deleter, RetrieveRequest, RetrieveResult,
    Retriever, UploadRequest, UploadResult, Uploader,
};

/// Native S3 operations consumed by the adapter.
#[async_trait]
pub trait S3Client: Send + Sync {
    /// Stores `body` under `bucket`/`key`.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BoxError>;

    /// Fetches the object stream for `bucket`/`key`; `None` when no such
    /// key exists.
    async fn get_object(&self, bucket: &str, key: &str)
        -> Result<Option<ByteStream>, BoxError>;

    /// Removes `bucket`/`key`. S3 deletion is idempotent; removing a missing
    /// key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BoxError>;
}

#[async_trait]
impl S3Client for aws_sdk_s3::Client {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BoxError> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| Box::new(err) as BoxError)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ByteStream>, BoxError> {
        match self.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(output.body)),
            Err(err) => {
                if let SdkError::ServiceError(ref service_err) = err {
                    if service_err.err().is_no_such_key() {
                        return Ok(None);
                    }
                }
                Err(Box::new(err))
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BoxError> {
        self.delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| Box::new(err) as BoxError)
    }
}

/// Validated configuration for the S3 backend, including the active client
/// handle. Built once, immutable afterwards.
#[derive(Clone, Default)]
pub struct S3Config {
    /// AWS region.
    pub region: String,
    /// AWS access key id.
    pub access_key_id: String,
    /// AWS secret access key.
    pub secret_access_key: String,
    /// Target bucket.
    pub bucket_name: String,
    /// Active client handle, embedded at configuration time.
    pub client: Option<Arc<dyn S3Client>>,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("client", &self.client.as_ref().map(|_| "<client>"))
            .finish()
    }
}

impl S3Config {
    /// Option that validates static credentials, builds the native client
    /// from them and embeds it in the configuration.
    pub fn with_static_credentials(
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> ConfigOption<S3Config> {
        let region = region.into();
        let access_key = access_key.into();
        let secret_key = secret_key.into();
        let bucket_name = bucket_name.into();
        ConfigOption::new(move |config: &mut S3Config| {
            if region.is_empty() {
                return Err(StorageError::invalid_config("invalid aws s3 region"));
            }
            if access_key.is_empty() {
                return Err(StorageError::invalid_config("invalid aws s3 access key"));
            }
            if secret_key.is_empty() {
                return Err(StorageError::invalid_config(
                    "invalid aws s3 secret access key",
                ));
            }
            if bucket_name.is_empty() {
                return Err(StorageError::invalid_config("invalid aws s3 bucket name"));
            }

            let credentials = aws_sdk_s3::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "stowage-static",
            );
            let sdk_config = aws_sdk_s3::Config::builder()
                .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                .region(aws_sdk_s3::config::Region::new(region.clone()))
                .credentials_provider(credentials)
                .build();

            config.region = region;
            config.access_key_id = access_key;
            config.secret_access_key = secret_key;
            config.bucket_name = bucket_name;
            config.client = Some(Arc::new(aws_sdk_s3::Client::from_conf(sdk_config)));
            Ok(())
        })
    }

    /// Option that reuses an externally supplied client for `bucket_name`.
    pub fn with_client(
        bucket_name: impl Into<String>,
        client: Arc<dyn S3Client>,
    ) -> ConfigOption<S3Config> {
        let bucket_name = bucket_name.into();
        ConfigOption::new(move |config: &mut S3Config| {
            if bucket_name.is_empty() {
                return Err(StorageError::invalid_config("invalid aws s3 bucket name"));
            }
            config.bucket_name = bucket_name;
            config.client = Some(client);
            Ok(())
        })
    }

    /// Option that builds the client from an already-loaded shared AWS
    /// configuration (environment, profile or IAM role credentials).
    pub fn with_sdk_config(
        bucket_name: impl Into<String>,
        sdk_config: aws_config::SdkConfig,
    ) -> ConfigOption<S3Config> {
        let bucket_name = bucket_name.into();
        ConfigOption::new(move |config: &mut S3Config| {
            if bucket_name.is_empty() {
                return Err(StorageError::invalid_config("invalid aws s3 bucket name"));
            }
            if let Some(region) = sdk_config.region() {
                config.region = region.as_ref().to_string();
            }
            config.bucket_name = bucket_name;
            config.client = Some(Arc::new(aws_sdk_s3::Client::new(&sdk_config)));
            Ok(())
        })
    }
}

/// Storage adapter for AWS S3 and S3-compatible object stores.
pub struct S3Storage {
    config: S3Config,
    client: Arc<dyn S3Client>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage").finish_non_exhaustive()
    }
}

impl S3Storage {
    /// Creates an adapter from an already-validated configuration and
    /// explicit collaborators.
    pub fn new(config: S3Config, client: Arc<dyn S3Client>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            client,
            clock,
        }
    }

    /// Builds the configuration from `options` and adopts the client the
    /// option chain embedded, with the system clock.
    pub fn from_options(
        options: impl IntoIterator<Item = ConfigOption<S3Config>>,
    ) -> StorageResult<Self> {
        let config = storage_api::build_config(options)?;
        let client = config
            .client
            .clone()
            .ok_or_else(|| StorageError::invalid_config("invalid aws s3 client"))?;
        Ok(Self::new(config, client, Arc::new(SystemClock)))
    }

    /// The configuration this adapter was constructed from.
    pub fn config(&self) -> &S3Config {
        &self.config
    }
}

#[async_trait]
impl Uploader for S3Storage {
    async fn upload_file(&self, ctx: &Context, p: UploadRequest) -> StorageResult<UploadResult> {
        ctx.ensure_valid()?;
        storage_api::utils::validate_file_name(&p.file_name)?;

        self.client
            .put_object(&self.config.bucket_name, &p.file_name, p.file_data.clone())
            .await
            .map_err(|source| StorageError::StoreFailed { source })?;

        let uploaded_at = self.clock.now();
        debug!(bucket = %self.config.bucket_name, key = %p.file_name, "stored s3 object");
        Ok(UploadResult {
            id: p.file_name.clone(),
            name: p.file_name,
            uploaded_at,
        })
    }
}

#[async_trait]
impl Retriever for S3Storage {
    async fn retrieve_file(
        &self,
        ctx: &Context,
        p: RetrieveRequest,
    ) -> StorageResult<RetrieveResult> {
        ctx.ensure_valid()?;

        let stream = self
            .client
            .get_object(&self.config.bucket_name, &p.id)
            .await
            .map_err(|source| StorageError::RetrieveFailed { source })?
            .ok_or(StorageError::FileNotFound)?;

        // Drain fully before stamping; the stream is consumed either way.
        let data = stream
            .collect()
            .await
            .map_err(|source| StorageError::RetrieveFailed {
                source: Box::new(source),
            })?;

        let retrieved_at = self.clock.now();
        debug!(bucket = %self.config.bucket_name, key = %p.id, "retrieved s3 object");
        Ok(RetrieveResult {
            file: data.into_bytes(),
            retrieved_at,
        })
    }
}

#[async_trait]
impl Deleter for S3Storage {
    async fn delete_file(&self, ctx: &Context, p: DeleteRequest) -> StorageResult<DeleteResult> {
        ctx.ensure_valid()?;

        self.client
            .delete_object(&self.config.bucket_name, &p.id)
            .await
            .map_err(|source| StorageError::DeleteFailed { source })?;

        let deleted_at = self.clock.now();
        debug!(bucket = %self.config.bucket_name, key = %p.id, "deleted s3 object");
        Ok(DeleteResult {
            id: p.id,
            deleted_at,
        })
    }
}
