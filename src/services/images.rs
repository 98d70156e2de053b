use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

use crate::error::CatalogError;

const MAX_FILE_NAME_LENGTH: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("Invalid image file name: {0}")]
    InvalidName(String),
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("Image {0} not found")]
    NotFound(String),
    #[error("Content is not a supported image")]
    NotAnImage,
    #[error("Failed to download image: {0}")]
    Download(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ImageStoreError> for CatalogError {
    fn from(err: ImageStoreError) -> Self {
        match err {
            ImageStoreError::InvalidName(_)
            | ImageStoreError::InvalidUrl(_)
            | ImageStoreError::NotAnImage => CatalogError::Validation(err.to_string()),
            ImageStoreError::NotFound(_) => CatalogError::NotFound(err.to_string()),
            ImageStoreError::Download(_) => CatalogError::ExternalApi(err.to_string()),
            ImageStoreError::Io(_) => CatalogError::Internal(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub file_name: String,
    pub mime_type: String,
}

/// Cover and thumbnail files, stored flat under one directory.
pub struct ImageStore {
    root: PathBuf,
    client: Client,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            client: Client::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a bare file name to its path, rejecting anything that could
    /// escape the images directory.
    fn resolve(&self, file_name: &str) -> Result<PathBuf, ImageStoreError> {
        let invalid = file_name.is_empty()
            || file_name.len() > MAX_FILE_NAME_LENGTH
            || file_name.starts_with('.')
            || file_name.contains(['/', '\\', '\0'])
            || Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name);
        if invalid {
            return Err(ImageStoreError::InvalidName(file_name.to_string()));
        }
        Ok(self.root.join(file_name))
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredImage, ImageStoreError> {
        let path = self.resolve(file_name)?;
        let mime_type = sniff_image(bytes)?;

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored image at {}", path.display());

        Ok(StoredImage {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
        })
    }

    /// Saves bytes fetched from `source`. Without an explicit name the file
    /// is named after the SHA-256 of the source plus the sniffed extension,
    /// so fetching the same URL twice overwrites one file.
    pub async fn save_fetched(
        &self,
        source: &str,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> Result<StoredImage, ImageStoreError> {
        let file_name = match file_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                let kind = infer::get(bytes)
                    .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
                    .ok_or(ImageStoreError::NotAnImage)?;
                format!("{}.{}", hash_name(source), kind.extension())
            }
        };
        self.save(&file_name, bytes).await
    }

    pub async fn read(&self, file_name: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        let path = self.resolve(file_name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ImageStoreError::NotFound(file_name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok((bytes, mime_type))
    }

    /// Returns `false` when the file was already gone.
    pub async fn delete(&self, file_name: &str) -> Result<bool, ImageStoreError> {
        let path = self.resolve(file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes each named file, ignoring failures. Returns how many files
    /// were actually removed.
    pub async fn delete_best_effort<'a>(
        &self,
        file_names: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let mut deleted = 0;
        for file_name in file_names {
            match self.delete(file_name).await {
                Ok(true) => deleted += 1,
                Ok(false) => debug!("Image {file_name} already missing"),
                Err(err) => tracing::warn!("Failed to delete image {file_name}: {err}"),
            }
        }
        deleted
    }

    #[instrument(skip(self))]
    pub async fn download(
        &self,
        url: &str,
        file_name: Option<&str>,
    ) -> Result<StoredImage, ImageStoreError> {
        let parsed = Url::parse(url).map_err(|_| ImageStoreError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageStoreError::InvalidUrl(url.to_string()));
        }

        let bytes = self
            .client
            .get(parsed)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        self.save_fetched(url, &bytes, file_name).await
    }
}

fn sniff_image(bytes: &[u8]) -> Result<&'static str, ImageStoreError> {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .ok_or(ImageStoreError::NotAnImage)
}

fn hash_name(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest byte sequence `infer` recognizes as a PNG.
    pub(crate) const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[tokio::test]
    async fn test_save_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.save("cover.png", PNG_BYTES).await.unwrap();
        assert_eq!(stored.mime_type, "image/png");

        let (bytes, mime) = store.read("cover.png").await.unwrap();
        assert_eq!(bytes, PNG_BYTES);
        assert_eq!(mime, "image/png");

        assert!(store.delete("cover.png").await.unwrap());
        assert!(!store.delete("cover.png").await.unwrap());
        assert!(matches!(
            store.read("cover.png").await,
            Err(ImageStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let err = store.save("notes.png", b"hello world").await.unwrap_err();
        assert!(matches!(err, ImageStoreError::NotAnImage));
        assert!(!dir.path().join("notes.png").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images"));

        for name in ["../secret.png", "..", "a/b.png", "a\\b.png", ".hidden", ""] {
            let err = store.read(name).await.unwrap_err();
            assert!(
                matches!(err, ImageStoreError::InvalidName(_)),
                "{name} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_save_fetched_names_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let first = store
            .save_fetched("https://img.example/cover", PNG_BYTES, None)
            .await
            .unwrap();
        let second = store
            .save_fetched("https://img.example/cover", PNG_BYTES, None)
            .await
            .unwrap();
        assert_eq!(first.file_name, second.file_name);
        assert!(first.file_name.ends_with(".png"));
        assert_eq!(first.file_name.len(), 64 + 4);

        let named = store
            .save_fetched("https://img.example/cover", PNG_BYTES, Some("front.png"))
            .await
            .unwrap();
        assert_eq!(named.file_name, "front.png");
    }

    #[tokio::test]
    async fn test_delete_best_effort_counts_only_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        store.save("a.png", PNG_BYTES).await.unwrap();

        let deleted = store
            .delete_best_effort(["a.png", "missing.png", "../escape.png"])
            .await;
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_download_rejects_bad_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        assert!(matches!(
            store.download("not a url", None).await,
            Err(ImageStoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            store.download("file:///etc/passwd", None).await,
            Err(ImageStoreError::InvalidUrl(_))
        ));
    }
}
