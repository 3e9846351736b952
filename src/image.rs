use crate::error::{AppError, AppResult};
use crate::models::{ImageAsset, ImageContentType};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Лимит X на одно изображение
pub const X_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Лимит Bluesky на один blob
pub const BLUESKY_MAX_IMAGE_BYTES: u64 = 1_000_000;

/// Расширения проверяются строго в этом порядке
pub const CANDIDATE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Общий лимит: минимум по всем сетям
pub fn global_size_limit() -> u64 {
    [X_MAX_IMAGE_BYTES, BLUESKY_MAX_IMAGE_BYTES]
        .into_iter()
        .min()
        .unwrap_or(BLUESKY_MAX_IMAGE_BYTES)
}

/// Ищет единственное изображение `<dir>/<basename>.<ext>`
#[derive(Debug, Clone)]
pub struct ImageLocator {
    dir: PathBuf,
    basename: String,
    limit: u64,
}

impl ImageLocator {
    pub fn new(dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self::with_limit(dir, basename, global_size_limit())
    }

    pub fn with_limit(dir: impl Into<PathBuf>, basename: impl Into<String>, limit: u64) -> Self {
        ImageLocator {
            dir: dir.into(),
            basename: basename.into(),
            limit,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Возвращает первое найденное изображение.
    ///
    /// Отсутствие файла или нечитаемый файл дают `Ok(None)`, пост уходит
    /// без картинки. Слишком большой файл даёт `AppError::ImageTooLarge`.
    pub async fn locate(&self) -> AppResult<Option<ImageAsset>> {
        for ext in CANDIDATE_EXTENSIONS {
            let path = self.dir.join(format!("{}.{}", self.basename, ext));

            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };

            if !metadata.is_file() {
                debug!("Skipping {}: not a regular file", path.display());
                continue;
            }

            if metadata.len() > self.limit {
                return Err(AppError::ImageTooLarge {
                    path,
                    actual: metadata.len(),
                    limit: self.limit,
                });
            }

            return Ok(self.load(&path, ext).await);
        }

        info!(
            "No image found in {} for basename '{}', posting text only",
            self.dir.display(),
            self.basename
        );
        Ok(None)
    }

    async fn load(&self, path: &Path, ext: &str) -> Option<ImageAsset> {
        let Some(content_type) = ImageContentType::from_extension(ext) else {
            info!("Cannot determine content type of {}, posting text only", path.display());
            return None;
        };

        match fs::read(path).await {
            Ok(bytes) => {
                info!(
                    "Found image {} ({} bytes, {})",
                    path.display(),
                    bytes.len(),
                    content_type.mime()
                );
                Some(ImageAsset {
                    path: path.to_path_buf(),
                    content_type,
                    bytes,
                })
            }
            Err(e) => {
                warn!("Failed to read image {}: {}, posting text only", path.display(), e);
                None
            }
        }
    }
}
