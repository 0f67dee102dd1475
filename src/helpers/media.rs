use s3::creds::Credentials;
use s3::{Bucket, Region};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::errors::ApiError;

/// Object storage capability for uploaded media. Like the mailer this is
/// optional: endpoints that need it answer BadRequest when the S3 section
/// of the config is absent.
pub struct MediaStore {
    bucket: Bucket,
}

impl MediaStore {
    pub fn from_config(config: &MediaConfig) -> Result<MediaStore, ApiError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = Credentials {
            access_key: Some(config.access_key.clone()),
            secret_key: Some(config.secret_key.clone()),
            security_token: None,
            session_token: None,
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| ApiError::Internal(format!("couldn't open media bucket: {}", e)))?;
        bucket.add_header("x-amz-acl", "public-read");

        Ok(MediaStore { bucket })
    }

    /// Store the bytes under a fresh key in the given folder and return
    /// the key, which is what gets persisted on the owning row.
    pub async fn store(&self, folder: &str, ext: &str, bytes: &[u8]) -> Result<String, ApiError> {
        let key = object_key(folder, ext);

        let (_, code) = self
            .bucket
            .put_object(&format!("/{}", key), bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("media upload failed: {}", e)))?;

        if code != 200 {
            return Err(ApiError::Internal(format!(
                "media storage answered status {}",
                code
            )));
        }

        Ok(key)
    }
}

fn object_key(folder: &str, ext: &str) -> String {
    format!("{}/{}.{}", folder, Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_folder_and_extension() {
        let key = object_key("avatars", "png");
        assert!(key.starts_with("avatars/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn keys_are_unique_per_upload() {
        assert_ne!(object_key("videos", "mp4"), object_key("videos", "mp4"));
    }
}
