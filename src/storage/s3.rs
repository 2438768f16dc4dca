use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::{debug, info};

use crate::models::StorageConfig;

use super::{ObjectStorage, StorageError, StoredObject};

/// S3-compatible object storage adapter. Handles AWS S3 directly and
/// R2/MinIO/generic-S3 through an endpoint override with forced path-style
/// addressing.
pub struct S3ObjectStorage {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3ObjectStorage {
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "auto".to_string());

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region));

        if let Some(endpoint) = &config.endpoint {
            debug!("using custom endpoint for storage config {}: {endpoint}", config.name);
            loader = loader.endpoint_url(endpoint.clone());
        }

        let aws_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if config.endpoint.is_some() {
            // Required for R2/MinIO: virtual-hosted addressing doesn't resolve.
            builder = builder.force_path_style(true);
        }

        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "dumpkeeper",
        );
        builder = builder.credentials_provider(credentials);

        let client = aws_sdk_s3::Client::from_conf(builder.build());

        client
            .head_bucket()
            .bucket(&config.bucket)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!("connected to storage bucket {}", config.bucket);

        Ok(Self { bucket: config.bucket.clone(), client })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(&self, local_path: &Path, key: &str, metadata: &[(&str, &str)]) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::Other(format!("failed to open {}: {e}", local_path.display())))?;

        let mut request = self.client.put_object().bucket(&self.bucket).key(key).body(body);
        for (k, v) in metadata {
            request = request.metadata(*k, *v);
        }

        request.send().await.map_err(classify_sdk_error)?;
        Ok(())
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Other(format!("failed to read object body: {e}")))?;

        tokio::fs::write(local_path, data.into_bytes())
            .await
            .map_err(|e| StorageError::Other(format!("failed to write {}: {e}", local_path.display())))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(classify_sdk_error)?;

            for obj in response.contents() {
                let Some(key) = obj.key() else { continue };
                let last_modified = obj.last_modified().map(|dt| {
                    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
                        .unwrap_or_else(chrono::Utc::now)
                });
                objects.push(StoredObject {
                    key: key.to_string(),
                    size_bytes: obj.size().unwrap_or(0),
                    last_modified,
                });
            }

            if response.is_truncated().unwrap_or(false) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        Ok(objects)
    }
}

fn classify_sdk_error<E: std::error::Error + Send + Sync + 'static>(err: SdkError<E>) -> StorageError {
    if err.raw_response().map(|r| r.status().as_u16()) == Some(404) {
        return StorageError::NotFound(err.to_string());
    }
    classify_service_error(anyhow::Error::new(err))
}

fn classify_service_error(err: anyhow::Error) -> StorageError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("403") || lower.contains("forbidden") || lower.contains("accessdenied") {
        StorageError::AuthDenied(message)
    } else if lower.contains("404") || lower.contains("nosuchkey") || lower.contains("notfound") {
        StorageError::NotFound(message)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        StorageError::NetworkTimeout(message)
    } else if lower.contains("500") || lower.contains("503") || lower.contains("internal") {
        StorageError::TransientServerError(message)
    } else {
        StorageError::Other(message)
    }
}
