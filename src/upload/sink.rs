use async_trait::async_trait;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutPayload};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::SinkSettings;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("object '{key}' already exists")]
    AlreadyExists { key: String },

    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("failed to prepare local sink directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination of uploaded batches.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Store `body` under a new `key`. An existing object is never
    /// overwritten; that case is [`SinkError::AlreadyExists`].
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), SinkError>;

    /// Short description for startup logs.
    fn describe(&self) -> String;
}

/// [`BatchSink`] over any `object_store` backend.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    label: String,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }

    pub fn from_settings(settings: &SinkSettings) -> Result<Self, SinkError> {
        let sink = match settings {
            SinkSettings::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let store = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_bucket_name(bucket)
                    .with_access_key_id(access_key_id)
                    .with_secret_access_key(secret_access_key)
                    .with_region(region)
                    // If-None-Match on create, supported by R2 and S3.
                    .with_conditional_put(S3ConditionalPut::ETagMatch)
                    .build()?;
                Self::new(Arc::new(store), format!("s3://{} via {}", bucket, endpoint))
            }
            SinkSettings::Local { dir } => {
                std::fs::create_dir_all(dir)?;
                let store = LocalFileSystem::new_with_prefix(dir)?;
                Self::new(Arc::new(store), format!("local dir {}", dir.display()))
            }
            SinkSettings::Memory => Self::in_memory(),
        };
        info!("Upload sink: {}", sink.label);
        Ok(sink)
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }
}

#[async_trait]
impl BatchSink for ObjectStoreSink {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), SinkError> {
        let path = Path::parse(key).map_err(|e| SinkError::InvalidKey {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        match self
            .store
            .put_opts(&path, PutPayload::from(body), PutMode::Create.into())
            .await
        {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => Err(SinkError::AlreadyExists {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
