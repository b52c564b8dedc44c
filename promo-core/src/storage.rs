use async_trait::async_trait;

/// Content types accepted for offer artwork, with the extension used on disk.
pub const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Invalid file type {0}. Only JPEG, PNG, GIF, and WebP are allowed.")]
    UnsupportedType(String),
    #[error("Image is too large (limit is {limit} bytes)")]
    TooLarge { limit: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An image file part received with a create/update request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size; returns the file extension to store under.
    pub fn check(&self, max_bytes: usize) -> Result<&'static str, ImageError> {
        let content_type = self
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
            .to_ascii_lowercase();

        let ext = ALLOWED_IMAGE_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or(ImageError::UnsupportedType(content_type))?;

        if self.bytes.len() > max_bytes {
            return Err(ImageError::TooLarge { limit: max_bytes });
        }

        Ok(ext)
    }
}

/// File storage for offer images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the upload and return its public path.
    async fn save(&self, upload: ImageUpload) -> Result<String, ImageError>;

    /// Remove a previously saved image by its public path. Removing an image
    /// that no longer exists is not an error.
    async fn remove(&self, public_path: &str) -> Result<(), ImageError>;
}
