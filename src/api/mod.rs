pub mod bluesky;
pub mod richtext;
pub mod x;

#[cfg(test)]
pub mod mock;

use crate::error::{AppError, AppResult};
use crate::models::{BlobRef, BlueskySession, CreatedRecord, ImagesEmbed};
use async_trait::async_trait;
use reqwest::Response;
use richtext::Facet;
use tracing::debug;

const USER_AGENT: &str = "crosspost/0.1";
const TIMEOUT_SECS: u64 = 30;

/// Клиент X: авторизация токенами, без отдельного логина
#[async_trait]
pub trait XApi: Send + Sync {
    /// Загружает медиа файл и возвращает media id
    async fn upload_media(&self, data: &[u8], content_type: &str, category: &str) -> AppResult<String>;

    /// Создаёт пост и возвращает его id
    async fn create_post(&self, text: &str, media_ids: &[String]) -> AppResult<String>;
}

/// Клиент Bluesky: сессия через явный логин
#[async_trait]
pub trait BlueskyApi: Send + Sync {
    async fn login(&self, identifier: &str, password: &str) -> AppResult<BlueskySession>;

    async fn upload_blob(&self, session: &BlueskySession, data: &[u8], encoding: &str) -> AppResult<BlobRef>;

    /// Превращает handle в DID для упоминаний
    async fn resolve_handle(&self, session: &BlueskySession, handle: &str) -> AppResult<String>;

    async fn create_post(
        &self,
        session: &BlueskySession,
        text: &str,
        facets: &[Facet],
        embed: Option<&ImagesEmbed>,
    ) -> AppResult<CreatedRecord>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn send_error(context: &str, e: reqwest::Error) -> AppError {
    debug!("Failed to {}: {}", context, e);
    if e.is_timeout() {
        AppError::Timeout
    } else {
        AppError::NetworkError(e)
    }
}

/// Не-2xx ответ превращается в `AppError::Http` с телом ответа.
/// Здесь только debug: уровень выбирает тот, кто показывает итог.
async fn check_status(context: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("{} returned status: {}", context, status);
    Err(AppError::Http {
        status: status.as_u16(),
        body,
    })
}
