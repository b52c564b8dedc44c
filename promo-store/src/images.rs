use async_trait::async_trait;
use chrono::Utc;
use promo_core::storage::{ImageError, ImageStore, ImageUpload};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sub-directory of the uploads root holding offer images.
pub const OFFER_IMAGE_DIR: &str = "special-offers";

/// Public URL prefix under which the uploads root is served.
pub const PUBLIC_PREFIX: &str = "/uploads/special-offers/";

/// Offer images on the local filesystem, served statically under `/uploads`.
pub struct LocalImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl LocalImageStore {
    pub fn new(root: impl AsRef<Path>, max_bytes: usize) -> Self {
        Self {
            dir: root.as_ref().join(OFFER_IMAGE_DIR),
            max_bytes,
        }
    }

    /// Map a public path back to a file in our directory. Anything outside
    /// the prefix, or with path separators in the file name, is not ours.
    fn local_path(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, upload: ImageUpload) -> Result<String, ImageError> {
        let ext = upload.check(self.max_bytes)?;
        let name = format!("offer-{}-{}.{}", Utc::now().timestamp_millis(), Uuid::new_v4(), ext);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &upload.bytes).await?;

        tracing::debug!(
            file = %name,
            original = ?upload.file_name,
            bytes = upload.bytes.len(),
            "stored offer image"
        );
        Ok(format!("{PUBLIC_PREFIX}{name}"))
    }

    async fn remove(&self, public_path: &str) -> Result<(), ImageError> {
        let Some(path) = self.local_path(public_path) else {
            tracing::warn!(
                image = public_path,
                "refusing to delete image outside upload directory"
            );
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
