use crate::{
    domain::{MediaObject, MediaStore},
    errors::MediaError,
};
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing;
use uuid::Uuid;

/// Folder uploads land in when the caller does not specify one.
pub const DEFAULT_MEDIA_FOLDER: &str = "memestream";

/// Drops a data-URL prefix ("data:image/png;base64,....") if one is present,
/// returning the bare base64 payload.
pub fn strip_data_url_prefix(image_data: &str) -> &str {
    match image_data.split_once(',') {
        Some((head, rest)) if head.starts_with("data:") || head.contains("base64") => rest,
        _ => image_data,
    }
}

/// Media store backed by S3. Uploaded images become publicly reachable under
/// `public_base_url`; the object key doubles as the deletion handle.
#[derive(Debug, Clone)]
pub struct S3MediaStore {
    client: S3Client,
    bucket_name: String,
    public_base_url: String,
}

impl S3MediaStore {
    pub fn new(client: S3Client, bucket_name: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket_name,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    /// Decodes the base64 payload and uploads it via PutObject. The remote
    /// object is always stored as image/jpeg, matching what clients send.
    async fn upload(&self, image_data: &str, folder: &str) -> Result<MediaObject, MediaError> {
        let payload = strip_data_url_prefix(image_data);
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| MediaError::UploadFailed(format!("invalid base64 image data: {}", e)))?;

        let key = format!("{}/{}.jpg", folder, Uuid::new_v4());
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, size = bytes.len(), "S3: Uploading image");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("image/jpeg")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %e, "S3: Upload failed");
                MediaError::UploadFailed(e.to_string())
            })?;

        let url = format!("{}/{}", self.public_base_url, key);
        tracing::debug!(s3_key = %key, %url, "S3: Upload successful");

        Ok(MediaObject { url, media_id: key })
    }

    /// Deletes the object via DeleteObject. S3 reports success for ids that
    /// are already gone; only transport and permission errors surface.
    async fn delete(&self, media_id: &str) -> Result<(), MediaError> {
        tracing::debug!(s3_key = %media_id, bucket = %self.bucket_name, "S3: Deleting object");

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(media_id)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(s3_key = %media_id, bucket = %self.bucket_name, error = %e, "S3: Delete failed");
                MediaError::DeleteFailed(e.to_string())
            })?;

        tracing::debug!(s3_key = %media_id, bucket = %self.bucket_name, "S3: Delete request successful");
        Ok(())
    }
}
