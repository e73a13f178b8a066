//! Object store client implementation.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use crate::content_type::content_type_for_key;
use crate::error::{StorageError, StorageResult};

/// Configuration for the object store client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Object-store base URL (S3 API endpoint)
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
    /// Region tag
    pub region: String,
    /// Use TLS when the endpoint carries no scheme
    pub use_tls: bool,
    /// TLS certificate verification flag
    pub verify_tls: bool,
    /// Default presigned-URL lifetime
    pub presign_ttl: Duration,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint: std::env::var("STORAGE_ENDPOINT")
                .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT not set"))?,
            bucket: std::env::var("STORAGE_BUCKET")
                .map_err(|_| StorageError::config_error("STORAGE_BUCKET not set"))?,
            access_key: std::env::var("STORAGE_ACCESS_KEY")
                .map_err(|_| StorageError::credential_missing("STORAGE_ACCESS_KEY"))?,
            secret_key: std::env::var("STORAGE_SECRET_KEY")
                .map_err(|_| StorageError::credential_missing("STORAGE_SECRET_KEY"))?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            use_tls: std::env::var("STORAGE_USE_TLS")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
            verify_tls: std::env::var("STORAGE_VERIFY_TLS")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
            presign_ttl: Duration::from_secs(
                std::env::var("PRESIGN_TTL_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        })
    }

    /// Endpoint URL with a scheme, derived from `use_tls` when absent.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else if self.use_tls {
            format!("https://{}", self.endpoint)
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// S3-compatible object store client.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    presign_ttl: Duration,
}

impl ObjectStore {
    /// Create a new client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        if !config.verify_tls {
            // The SDK's rustls transport always verifies certificates.
            warn!("STORAGE_VERIFY_TLS=false is not supported; certificates will be verified");
        }

        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "vflix");

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket,
            presign_ttl: config.presign_ttl,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    /// Default presigned-URL lifetime.
    pub fn presign_ttl(&self) -> Duration {
        self.presign_ttl
    }

    /// Upload a local file; the content type is inferred from the key.
    pub async fn put(&self, path: impl AsRef<Path>, key: &str) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        if !path.exists() {
            return Err(StorageError::not_found(path.to_string_lossy()));
        }

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type_for_key(key))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Upload raw bytes with an explicit content type.
    pub async fn put_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Download an object to a local file.
    pub async fn get(&self, key: &str, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Downloading {} to {}", key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;

        info!("Downloaded {} to {}", key, path.display());
        Ok(())
    }

    /// Download an object into memory.
    pub async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Issue a time-limited read URL.
    ///
    /// The response declares `Content-Disposition: inline` and a content
    /// type matched from the key extension, so playlists and segments are
    /// served with the headers players expect.
    pub async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition("inline")
            .response_content_type(content_type_for_key(key))
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Presign with the default TTL.
    pub async fn presign_default(&self, key: &str) -> StorageResult<String> {
        self.presign(key, self.presign_ttl).await
    }

    /// Delete one object. A missing object is not an error.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    /// Delete multiple objects in one batch request.
    pub async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32> {
        if keys.is_empty() {
            return Ok(0);
        }

        debug!("Deleting {} objects", keys.len());

        let objects: Vec<_> = keys
            .iter()
            .map(|k| {
                aws_sdk_s3::types::ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .expect("valid key")
            })
            .collect();

        let delete = aws_sdk_s3::types::Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        self.client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        info!("Deleted {} objects", keys.len());
        Ok(keys.len() as u32)
    }

    /// Delete every object whose key starts with `prefix`.
    ///
    /// A prefix with no objects under it succeeds with no effect.
    pub async fn delete_prefix(&self, prefix: &str) -> StorageResult<u32> {
        let objects = self.list_objects(prefix).await?;
        if objects.is_empty() {
            debug!("No objects under prefix {}", prefix);
            return Ok(0);
        }

        let keys: Vec<_> = objects.into_iter().map(|o| o.key).collect();
        self.delete_objects(&keys).await
    }

    /// List objects with a prefix, following continuation tokens.
    pub async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        debug!("Listing objects with prefix: {}", prefix);

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            if let Some(ref contents) = response.contents {
                for obj in contents {
                    objects.push(ObjectInfo {
                        key: obj.key.clone().unwrap_or_default(),
                        size: obj.size.unwrap_or(0) as u64,
                    });
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NotFound") || msg.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::Unavailable(msg))
                }
            }
        }
    }

    /// Check connectivity by performing a head-bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::Unavailable(format!("storage connectivity check failed: {e}"))
            })?;
        Ok(())
    }
}

/// Information about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
}
