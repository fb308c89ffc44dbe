use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

pub const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";

pub struct UploadItem<'a> {
    pub filename: &'a str,
    pub body: Bytes,
    pub content_type: &'a str,
}

/// `uploads/recipe/<uuid>.<ext>` for a freshly generated uuid.
pub fn recipe_image_file_path(original_filename: &str) -> String {
    recipe_image_file_path_with(original_filename, || Uuid::new_v4().to_string())
}

/// Same as [`recipe_image_file_path`] with the token source supplied by the caller.
///
/// Any client-side directory part is dropped first. The extension is whatever
/// follows the last `.` of the remaining name; a name without a dot is used whole.
pub fn recipe_image_file_path_with<F>(original_filename: &str, token: F) -> String
where
    F: FnOnce() -> String,
{
    let base = original_filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(original_filename);
    let ext = base.rsplit('.').next().unwrap_or(base);
    format!("{RECIPE_UPLOAD_DIR}/{}.{ext}", token())
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub(crate) fn is_image(ct: &str) -> bool {
    ct.starts_with("image/")
}

/// Writes the upload under a fresh recipe image key and returns the key.
pub async fn store_recipe_image(
    storage: &dyn StorageClient,
    item: UploadItem<'_>,
) -> anyhow::Result<String> {
    anyhow::ensure!(!item.body.is_empty(), "empty image upload");
    let key = recipe_image_file_path(item.filename);
    storage
        .put_object(&key, item.body, item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Client-facing URL for a stored image key.
pub async fn image_url(
    storage: &dyn StorageClient,
    key: Option<&str>,
) -> anyhow::Result<Option<String>> {
    const TTL_SECS: u64 = 30 * 60;
    match key {
        Some(key) => storage
            .presign_get(key, TTL_SECS)
            .await
            .with_context(|| format!("presign url for {}", key))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::testing::RecordingStorage;

    #[test]
    fn image_filename_uuid() {
        let path = recipe_image_file_path_with("myimage.jpg", || "test-uuid".to_string());
        assert_eq!(path, "uploads/recipe/test-uuid.jpg");
    }

    #[test]
    fn extension_is_after_last_dot() {
        let path = recipe_image_file_path_with("archive.tar.gz", || "t".into());
        assert_eq!(path, "uploads/recipe/t.gz");
        let path = recipe_image_file_path_with("noext", || "t".into());
        assert_eq!(path, "uploads/recipe/t.noext");
    }

    #[test]
    fn directory_parts_never_reach_the_key() {
        let path = recipe_image_file_path_with("my.photo/../evil", || "test-uuid".into());
        assert_eq!(path, "uploads/recipe/test-uuid.evil");
        let path = recipe_image_file_path_with("C:\\Users\\me\\cat.png", || "t".into());
        assert_eq!(path, "uploads/recipe/t.png");
        let path = recipe_image_file_path_with("../../etc/passwd.jpg", || "t".into());
        assert_eq!(path, "uploads/recipe/t.jpg");
    }

    #[test]
    fn fresh_paths_differ() {
        let a = recipe_image_file_path("a.png");
        let b = recipe_image_file_path("a.png");
        assert_ne!(a, b);
        assert!(a.starts_with("uploads/recipe/"));
        assert!(a.ends_with(".png"));
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert!(is_image("image/png"));
        assert!(!is_image("text/plain"));
    }

    #[tokio::test]
    async fn store_recipe_image_puts_object() {
        let storage = RecordingStorage::default();
        let key = store_recipe_image(
            &storage,
            UploadItem {
                filename: "photo.png",
                body: Bytes::from_static(b"png"),
                content_type: "image/png",
            },
        )
        .await
        .unwrap();
        assert!(key.starts_with("uploads/recipe/") && key.ends_with(".png"));
        assert!(storage.contains(&key));

        let err = store_recipe_image(
            &storage,
            UploadItem {
                filename: "empty.png",
                body: Bytes::new(),
                content_type: "image/png",
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn image_url_for_present_and_missing_keys() {
        let storage = RecordingStorage::default();
        let url = image_url(&storage, Some("uploads/recipe/a.jpg")).await.unwrap();
        assert!(url.unwrap().contains("uploads/recipe/a.jpg"));
        assert_eq!(image_url(&storage, None).await.unwrap(), None);
    }
}
