use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::TryStreamExt;
use object_store::{
    aws::AmazonS3Builder, path::Path as ObjectPath, ObjectStore, RetryConfig,
};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid object key '{key}': {source}")]
    InvalidKey {
        key: String,
        source: object_store::path::Error,
    },
}

impl TransferError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> TransferError + '_ {
        move |source| TransferError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Builds an S3 backed store from the run configuration.
pub fn new(config: &Config) -> Result<Store, TransferError> {
    let endpoint = endpoint_url(&config.endpoint);

    // Every failed call ends the run, nothing is retried.
    let retry = RetryConfig {
        max_retries: 0,
        ..Default::default()
    };

    let s3 = AmazonS3Builder::new()
        .with_region(&config.region)
        .with_bucket_name(&config.bucket)
        .with_access_key_id(&config.access_key)
        .with_secret_access_key(&config.secret_key)
        .with_allow_http(endpoint.starts_with("http://"))
        .with_endpoint(endpoint)
        .with_retry(retry)
        .build()?;

    Ok(Store::with_object_store(Arc::new(s3), &config.bucket))
}

/// Bare hosts are reached over TLS; full http(s) URLs are taken as given.
fn endpoint_url(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            endpoint.trim_end_matches('/').to_string()
        }
        _ => format!("https://{}", endpoint.trim_end_matches('/')),
    }
}

/// Handle over a single bucket. All keys are absolute within the bucket.
#[derive(Clone)]
pub struct Store {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl Store {
    pub fn with_object_store<S: Into<String>>(store: Arc<dyn ObjectStore>, bucket: S) -> Self {
        Store {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Streams the object at `key` into `dest`, replacing any existing file.
    /// Returns the number of bytes written.
    pub async fn fetch_to_file(&self, key: &str, dest: &Path) -> Result<u64, TransferError> {
        let content = self.store.get(&object_path(key)?).await?;
        let mut stream = content.into_stream();

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(dest)
            .await
            .map_err(TransferError::io(dest))?;

        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk)
                .await
                .map_err(TransferError::io(dest))?;
            written += chunk.len() as u64;
        }

        file.sync_all().await.map_err(TransferError::io(dest))?;
        log::debug!("fetched {} ({} bytes) into {}", key, written, dest.display());

        Ok(written)
    }

    /// Uploads the whole of `src` as the object at `key`.
    pub async fn put_file(&self, src: &Path, key: &str) -> Result<u64, TransferError> {
        let data = tokio::fs::read(src).await.map_err(TransferError::io(src))?;
        let size = data.len() as u64;

        self.store.put(&object_path(key)?, Bytes::from(data)).await?;
        log::debug!("put {} ({} bytes) from {}", key, size, src.display());

        Ok(size)
    }

    /// Keys of every object under `prefix`, in listing order.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, TransferError> {
        let prefix = object_path(prefix)?;
        let keys: Vec<String> = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;

        Ok(keys)
    }

    pub async fn delete(&self, key: &str) -> Result<(), TransferError> {
        self.store.delete(&object_path(key)?).await?;
        Ok(())
    }
}

// keys go to the store verbatim, without percent-encoding
fn object_path(key: &str) -> Result<ObjectPath, TransferError> {
    ObjectPath::parse(key).map_err(|source| TransferError::InvalidKey {
        key: key.to_string(),
        source,
    })
}
