use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

/// Store one file under the user's prefix and return its public URL.
pub async fn upload_media(
    storage: &dyn StorageClient,
    user_id: &str,
    item: UploadItem<'_>,
) -> anyhow::Result<String> {
    anyhow::ensure!(!item.body.is_empty(), "empty upload");

    let ext = ext_from_mime(item.content_type).unwrap_or("bin");
    let key = format!("media/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    storage
        .put_object(&key, item.body, item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(storage.public_url(&key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
