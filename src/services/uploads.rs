use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::core::config::Settings;

pub(crate) const UPLOADS_ROUTE: &str = "/uploads";
const EXAMS_SUBDIR: &str = "exams";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaType {
    Jpeg,
    Png,
    Pdf,
}

impl MediaType {
    pub(crate) fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detects the format from the leading magic bytes.
    pub(crate) fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    pub(crate) fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Pdf => "application/pdf",
        }
    }

    pub(crate) fn accepts_mime(self, mime: &str) -> bool {
        match self {
            Self::Jpeg => matches!(mime, "image/jpeg" | "image/jpg"),
            Self::Png => mime == "image/png",
            Self::Pdf => mime == "application/pdf",
        }
    }

    pub(crate) fn is_document(self) -> bool {
        matches!(self, Self::Pdf)
    }
}

/// A validated upload held in memory for the duration of one grading request.
#[derive(Debug, Clone)]
pub(crate) struct UploadedImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) media_type: MediaType,
    pub(crate) extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredImage {
    pub(crate) url: String,
    pub(crate) sha256: String,
}

#[async_trait]
pub(crate) trait ImageStore: Send + Sync {
    async fn save(&self, image: &UploadedImage) -> anyhow::Result<StoredImage>;

    /// Best-effort removal of an image whose submission was never recorded.
    async fn discard(&self, image: &StoredImage);
}

#[derive(Debug, Clone)]
pub(crate) struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.uploads().upload_dir)
    }

    pub(crate) fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(UPLOADS_ROUTE)?.strip_prefix('/')?;
        let relative = Path::new(relative);
        relative
            .components()
            .all(|component| matches!(component, std::path::Component::Normal(_)))
            .then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, image: &UploadedImage) -> anyhow::Result<StoredImage> {
        let dir = self.root.join(EXAMS_SUBDIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let file_name = exam_file_name(&image.extension);
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .with_context(|| format!("Failed to write upload {}", path.display()))?;

        tracing::debug!(path = %path.display(), size = image.bytes.len(), "Stored exam image");

        Ok(StoredImage {
            url: format!("{UPLOADS_ROUTE}/{EXAMS_SUBDIR}/{file_name}"),
            sha256: sha256_hex(&image.bytes),
        })
    }

    async fn discard(&self, image: &StoredImage) {
        let Some(path) = self.path_for_url(&image.url) else {
            tracing::warn!(url = %image.url, "Refusing to discard image outside the upload root");
            return;
        };

        if let Err(err) = tokio::fs::remove_file(&path).await {
            tracing::warn!(error = %err, path = %path.display(), "Failed to discard exam image");
        }
    }
}

fn exam_file_name(extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("exam-{millis}-{suffix}.{}", extension.to_ascii_lowercase())
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffing_recognises_supported_formats() {
        assert_eq!(MediaType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(MediaType::Jpeg));
        assert_eq!(MediaType::sniff(b"\x89PNG\r\n\x1a\n...."), Some(MediaType::Png));
        assert_eq!(MediaType::sniff(b"%PDF-1.7"), Some(MediaType::Pdf));
        assert_eq!(MediaType::sniff(b"GIF89a"), None);
        assert_eq!(MediaType::sniff(&[]), None);
    }

    #[test]
    fn extension_and_mime_pairs() {
        assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("webp"), None);
        assert!(MediaType::Jpeg.accepts_mime("image/jpg"));
        assert!(!MediaType::Png.accepts_mime("image/jpeg"));
        assert!(MediaType::Pdf.is_document());
    }

    #[test]
    fn file_names_follow_exam_pattern() {
        let name = exam_file_name("PNG");

        assert!(name.starts_with("exam-"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.split('-').count(), 3);
    }

    #[tokio::test]
    async fn local_store_writes_file_and_returns_public_url() {
        let root = std::env::temp_dir().join(format!("math-grader-{}", uuid::Uuid::new_v4()));
        let store = LocalImageStore::new(&root);
        let image = UploadedImage {
            bytes: b"%PDF-1.4 body".to_vec(),
            media_type: MediaType::Pdf,
            extension: "pdf".to_string(),
        };

        let stored = store.save(&image).await.expect("save");

        let file_name = stored.url.strip_prefix("/uploads/exams/").expect("public url");
        let written = tokio::fs::read(root.join("exams").join(file_name)).await.expect("read");
        assert_eq!(written, image.bytes);
        assert_eq!(stored.sha256, sha256_hex(&image.bytes));
        assert_eq!(stored.sha256.len(), 64);

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn discard_removes_only_files_under_the_root() {
        let root = std::env::temp_dir().join(format!("math-grader-{}", uuid::Uuid::new_v4()));
        let store = LocalImageStore::new(&root);
        let image = UploadedImage {
            bytes: b"\x89PNG\r\n\x1a\nbody".to_vec(),
            media_type: MediaType::Png,
            extension: "png".to_string(),
        };

        let stored = store.save(&image).await.expect("save");
        let path = store.path_for_url(&stored.url).expect("local path");
        assert!(path.exists());

        store.discard(&stored).await;
        assert!(!path.exists());

        assert_eq!(store.path_for_url("/uploads/../etc/passwd"), None);
        assert_eq!(store.path_for_url("/elsewhere/exams/a.png"), None);

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
