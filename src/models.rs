use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Тип содержимого изображения, определяемый по расширению файла
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageContentType {
    Png,
    Jpeg,
    Gif,
}

impl ImageContentType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }
}

/// Найденное изображение, живёт один запуск
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub content_type: ImageContentType,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }
}

/// Текст поста и необязательное изображение, общие для всех сетей
#[derive(Debug, Clone)]
pub struct PostRequest {
    text: String,
    image: Option<ImageAsset>,
}

impl PostRequest {
    pub fn new(text: impl Into<String>, image: Option<ImageAsset>) -> AppResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::Usage);
        }
        Ok(PostRequest { text, image })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        self.image.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    X,
    Bluesky,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::X => f.write_str("X"),
            Network::Bluesky => f.write_str("Bluesky"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published {
        post_id: String,
        post_url: Option<String>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        message: String,
        details: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub network: Network,
    pub outcome: PublishOutcome,
}

impl PublishResult {
    pub fn published(network: Network, post_id: String, post_url: Option<String>) -> Self {
        PublishResult {
            network,
            outcome: PublishOutcome::Published { post_id, post_url },
        }
    }

    pub fn skipped(network: Network, reason: impl Into<String>) -> Self {
        PublishResult {
            network,
            outcome: PublishOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(network: Network, err: &AppError) -> Self {
        PublishResult {
            network,
            outcome: PublishOutcome::Failed {
                message: err.to_string(),
                details: err.details(),
            },
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self.outcome, PublishOutcome::Published { .. })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueskySession {
    pub access_jwt: String,
    pub did: String,
    pub handle: String,
}

/// Непрозрачная ссылка на загруженный blob, передаётся в embed как есть
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub Value);

impl BlobRef {
    pub fn link(&self) -> Option<&str> {
        self.0["ref"]["$link"].as_str()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub alt: String,
    pub image: BlobRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagesEmbed {
    #[serde(rename = "$type")]
    pub kind: String,
    pub images: Vec<EmbedImage>,
}

impl ImagesEmbed {
    pub fn single(image: BlobRef, alt: impl Into<String>) -> Self {
        ImagesEmbed {
            kind: "app.bsky.embed.images".to_string(),
            images: vec![EmbedImage {
                alt: alt.into(),
                image,
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRecord {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
}
