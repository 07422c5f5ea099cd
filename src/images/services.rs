use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Image payload decoded from a `data:` URI.
#[derive(Debug)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub ext: &'static str,
}

/// Decodes `data:image/<type>;base64,<payload>` into raw bytes.
pub fn decode_data_uri(raw: &str) -> AppResult<UploadItem> {
    let invalid = || AppError::validation("invalid image");

    let rest = raw.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (content_type, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let content_type = content_type.to_ascii_lowercase();
    let ext = ext_from_mime(&content_type).ok_or_else(invalid)?;

    let body = Base64::decode_vec(payload.trim()).map_err(|_| invalid())?;
    if body.is_empty() {
        return Err(invalid());
    }

    Ok(UploadItem {
        body: Bytes::from(body),
        content_type,
        ext,
    })
}

/// Stores a recipe image and returns its object key.
pub async fn upload_recipe_image(
    st: &AppState,
    author_id: Uuid,
    img: UploadItem,
) -> anyhow::Result<String> {
    let key = format!("recipes/{}/{}.{}", author_id, Uuid::new_v4(), img.ext);
    st.storage
        .put_object(&key, img.body, &img.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal of an object nothing references any more.
pub async fn discard(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete orphaned image");
    }
}

pub async fn presign(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(key, st.config.storage.url_ttl_secs)
        .await
        .with_context(|| format!("presign url for key {}", key))
}

pub async fn presign_opt(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    match key {
        Some(k) => Ok(Some(presign(st, k).await?)),
        None => Ok(None),
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(super::ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/png"), Some("png"));
        assert_eq!(super::ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(super::ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(super::ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn decodes_png_data_uri() {
        let img = decode_data_uri(PNG_URI).unwrap();
        assert_eq!(img.content_type, "image/png");
        assert_eq!(img.ext, "png");
        assert_eq!(&img.body[1..4], b"PNG");
    }

    #[test]
    fn rejects_malformed_uris() {
        for bad in [
            "iVBORw0KGgo=",
            "data:image/png,iVBORw0KGgo=",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png;base64,***",
            "data:image/png;base64,",
        ] {
            let err = decode_data_uri(bad).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn upload_then_presign_and_discard() {
        let state = AppState::fake();
        let author = Uuid::new_v4();
        let key = upload_recipe_image(&state, author, decode_data_uri(PNG_URI).unwrap())
            .await
            .unwrap();
        assert!(key.starts_with(&format!("recipes/{author}/")));
        assert!(key.ends_with(".png"));

        let url = presign_opt(&state, Some(&key)).await.unwrap().unwrap();
        assert!(url.contains(&key));
        assert_eq!(presign_opt(&state, None).await.unwrap(), None);

        discard(&state, &key).await;
    }
}
