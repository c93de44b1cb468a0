//! In-memory storage adapter
//!
//! A fully functional backend over a `HashMap`, mainly useful as a fake in
//! tests of code that depends on the [`Storage`](crate::storage::Storage)
//! contract. Semantics mirror the local backend: double uploads are
//! rejected and missing objects surface as "file is not found".

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{StorageError, StorageResult};
use crate::storage::storage_api::{
    self, DeleteRequest, DeleteResult, Deleter, RetrieveRequest, RetrieveResult, Retriever,
    UploadRequest, UploadResult, Uploader,
};

/// Storage adapter backed by process memory.
#[derive(Clone)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStorage {
    /// Creates an empty adapter stamping results with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Number of objects currently held.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Whether no objects are held.
    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }
}

#[async_trait]
impl Uploader for MemoryStorage {
    async fn upload_file(&self, ctx: &Context, p: UploadRequest) -> StorageResult<UploadResult> {
        ctx.ensure_valid()?;
        storage_api::utils::validate_file_name(&p.file_name)?;

        let mut objects = self.objects.write().unwrap();
        if objects.contains_key(&p.file_name) {
            return Err(StorageError::FileAlreadyExists);
        }
        objects.insert(p.file_name.clone(), p.file_data);
        drop(objects);

        let uploaded_at = self.clock.now();
        Ok(UploadResult {
            id: p.file_name.clone(),
            name: p.file_name,
            uploaded_at,
        })
    }
}

#[async_trait]
impl Retriever for MemoryStorage {
    async fn retrieve_file(
        &self,
        ctx: &Context,
        p: RetrieveRequest,
    ) -> StorageResult<RetrieveResult> {
        ctx.ensure_valid()?;

        let file = self
            .objects
            .read()
            .unwrap()
            .get(&p.id)
            .cloned()
            .ok_or(StorageError::FileNotFound)?;

        let retrieved_at = self.clock.now();
        Ok(RetrieveResult { file, retrieved_at })
    }
}

#[async_trait]
impl Deleter for MemoryStorage {
    async fn delete_file(&self, ctx: &Context, p: DeleteRequest) -> StorageResult<DeleteResult> {
        ctx.ensure_valid()?;

        let removed = self.objects.write().unwrap().remove(&p.id);
        if removed.is_none() {
            return Err(StorageError::FileNotFound);
        }

        let deleted_at = self.clock.now();
        Ok(DeleteResult {
            id: p.id,
            deleted_at,
        })
    }
}
