//! Filesystem-backed object storage for post thumbnails.
//!
//! Objects live under `<root>/<bucket>/<key>`; keys are generated on upload and
//! are the only thing persisted on the post row.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::application::thumbnails::normalize_key;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key")]
    InvalidKey,
    #[error("unknown bucket `{0}`")]
    UnknownBucket(String),
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file is empty")]
    EmptyPayload,
}

/// Metadata describing a freshly stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct ObjectStorage {
    root: PathBuf,
    bucket: String,
    max_bytes: u64,
}

impl ObjectStorage {
    /// Initialise storage for `bucket` under `root`, creating the directory if necessary.
    pub fn new(root: PathBuf, bucket: &str, max_bytes: u64) -> Result<Self, std::io::Error> {
        let bucket = bucket.trim_matches('/').to_string();
        std::fs::create_dir_all(root.join(&bucket))?;
        Ok(Self {
            root,
            bucket,
            max_bytes,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Streams the payload to disk under a freshly generated key.
    pub async fn store_stream<S>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredObject, StorageError>
    where
        S: futures::Stream<Item = Result<Bytes, StorageError>>,
    {
        let key = generate_key(original_name);
        let absolute = self.resolve(&self.bucket, &key)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            total_bytes = total_bytes.saturating_add(chunk.len() as u64);
            if total_bytes > self.max_bytes {
                drop(file);
                let _ = fs::remove_file(&absolute).await;
                return Err(StorageError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }

            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }

        file.flush().await?;

        if total_bytes == 0 {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(StorageError::EmptyPayload);
        }

        Ok(StoredObject {
            key,
            checksum: hex::encode(hasher.finalize()),
            size_bytes: total_bytes,
        })
    }

    pub async fn store(&self, original_name: &str, data: Bytes) -> Result<StoredObject, StorageError> {
        let stream = stream::once(async move { Ok::<_, StorageError>(data) });
        self.store_stream(original_name, stream).await
    }

    pub async fn read(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let absolute = self.resolve(bucket, key)?;
        match fs::read(absolute).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Missing objects are treated as success.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let absolute = self.resolve(&self.bucket, key)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        if bucket != self.bucket {
            return Err(StorageError::UnknownBucket(bucket.to_string()));
        }
        let key = normalize_key(key).ok_or(StorageError::InvalidKey)?;
        Ok(self.root.join(&self.bucket).join(key))
    }
}

/// `yyyy/mm/<uuid>.<ext>`; the extension is kept only when it is short and alphanumeric.
fn generate_key(original_name: &str) -> String {
    let (year, month, _) = time::OffsetDateTime::now_utc().to_calendar_date();
    let identifier = Uuid::new_v4();
    let extension = Path::new(original_name)
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{year}/{:02}/{identifier}.{ext}", month as u8),
        None => format!("{year}/{:02}/{identifier}", month as u8),
    }
}
