use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;

use crate::errors::ApiError;

pub struct MultipartFile {
    pub bytes: Vec<u8>,
    pub ext: String,
    pub mime: String,
}

pub struct ParsedMultipart<D> {
    pub files: HashMap<String, MultipartFile>,
    pub data: Option<D>, // JSON part of the multipart
}

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "video/mp4" => Some("mp4"),
        "video/mpeg" => Some("mpeg"),
        "video/webm" => Some("webm"),
        "video/x-matroska" => Some("mkv"),
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpeg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/*
    Takes a type argument D which implements Deserialize and a Multipart.
    The application/json part deserializes into D; every other part is
    collected as a named file.
*/
pub async fn parse_multipart<D: DeserializeOwned>(
    mut payload: Multipart,
) -> Result<ParsedMultipart<D>, ApiError> {
    let mut parsed: ParsedMultipart<D> = ParsedMultipart {
        files: HashMap::new(),
        data: None,
    };

    while let Ok(Some(mut field)) = payload.try_next().await {
        let mime = field.content_type().to_string();

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|_| ApiError::BadRequest("Couldn't read multipart field".to_string()))?;
            bytes.extend_from_slice(&chunk);
        }

        if mime == "application/json" {
            let data = serde_json::from_slice(&bytes)
                .map_err(|_| ApiError::BadRequest("Failed to deserialize JSON".to_string()))?;
            parsed.data = Some(data);
        } else {
            let ext = extension_for_mime(&mime)
                .ok_or_else(|| ApiError::BadRequest(format!("Unsupported file type {}", mime)))?;

            let name = field
                .content_disposition()
                .and_then(|cd| cd.get_name().map(|n| n.to_string()))
                .ok_or_else(|| ApiError::BadRequest("Unnamed multipart field".to_string()))?;

            parsed.files.insert(
                name,
                MultipartFile {
                    bytes,
                    ext: ext.to_string(),
                    mime,
                },
            );
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mime_types_map_to_extensions() {
        assert_eq!(extension_for_mime("video/mp4"), Some("mp4"));
        assert_eq!(extension_for_mime("image/png"), Some("png"));
        assert_eq!(extension_for_mime("application/x-sh"), None);
    }
}
