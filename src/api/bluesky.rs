use super::richtext::Facet;
use super::{check_status, http_client, send_error, BlueskyApi};
use crate::error::{AppError, AppResult};
use crate::models::{BlobRef, BlueskySession, CreatedRecord, ImagesEmbed};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

pub const BLUESKY_SERVICE_URL: &str = "https://bsky.social";
const BLUESKY_WEB_URL: &str = "https://bsky.app";
const POST_COLLECTION: &str = "app.bsky.feed.post";

pub struct BlueskyClient {
    http_client: Client,
    xrpc_url: String,
}

impl BlueskyClient {
    pub fn new(service: &str) -> Self {
        BlueskyClient {
            http_client: http_client(),
            xrpc_url: format!("{}/xrpc", service.trim_end_matches('/')),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.xrpc_url, method)
    }

    fn bearer(session: &BlueskySession) -> String {
        format!("Bearer {}", session.access_jwt)
    }
}

/// `at://did/app.bsky.feed.post/rkey` -> ссылка на bsky.app
pub fn bluesky_permalink(handle: &str, uri: &str) -> Option<String> {
    let path = uri.strip_prefix("at://")?;
    let mut parts = path.split('/');
    let _authority = parts.next().filter(|s| !s.is_empty())?;
    let collection = parts.next()?;
    let rkey = parts.next().filter(|s| !s.is_empty())?;

    if collection != POST_COLLECTION || parts.next().is_some() {
        return None;
    }

    Some(format!("{}/profile/{}/post/{}", BLUESKY_WEB_URL, handle, rkey))
}

#[async_trait]
impl BlueskyApi for BlueskyClient {
    /// Создаёт сессию и получает access token
    async fn login(&self, identifier: &str, password: &str) -> AppResult<BlueskySession> {
        debug!("Creating Bluesky session for: {}", identifier);

        let response = self
            .http_client
            .post(self.endpoint("com.atproto.server.createSession"))
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| send_error("create Bluesky session", e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Bluesky rejected credentials for {}", identifier);
            return Err(AppError::InvalidCredentials);
        }

        let response = check_status("Bluesky createSession", response).await?;
        let session: BlueskySession = response.json().await.map_err(|e| {
            debug!("Failed to parse session response: {}", e);
            AppError::NetworkError(e)
        })?;

        info!("Bluesky session created for {} ({})", session.handle, session.did);
        Ok(session)
    }

    async fn upload_blob(&self, session: &BlueskySession, data: &[u8], encoding: &str) -> AppResult<BlobRef> {
        debug!("Uploading blob to Bluesky: {} bytes ({})", data.len(), encoding);

        let response = self
            .http_client
            .post(self.endpoint("com.atproto.repo.uploadBlob"))
            .header("Authorization", Self::bearer(session))
            .header("Content-Type", encoding)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| send_error("upload media to Bluesky", e))?;

        let response = check_status("Bluesky uploadBlob", response).await?;
        let result: Value = response.json().await?;

        let blob = BlobRef(result["blob"].clone());
        let link = blob
            .link()
            .ok_or(AppError::ApiError("No blob reference in response".to_string()))?;

        info!("Successfully uploaded media to Bluesky: {}", link);
        Ok(blob)
    }

    async fn resolve_handle(&self, session: &BlueskySession, handle: &str) -> AppResult<String> {
        let response = self
            .http_client
            .get(self.endpoint("com.atproto.identity.resolveHandle"))
            .header("Authorization", Self::bearer(session))
            .query(&[("handle", handle)])
            .send()
            .await
            .map_err(|e| send_error("resolve Bluesky handle", e))?;

        let response = check_status("Bluesky resolveHandle", response).await?;
        let result: Value = response.json().await?;

        result["did"]
            .as_str()
            .map(str::to_string)
            .ok_or(AppError::ApiError(format!("No DID for handle {}", handle)))
    }

    async fn create_post(
        &self,
        session: &BlueskySession,
        text: &str,
        facets: &[Facet],
        embed: Option<&ImagesEmbed>,
    ) -> AppResult<CreatedRecord> {
        debug!(
            "Posting to Bluesky ({} facets, embed: {})",
            facets.len(),
            embed.is_some()
        );

        let record = build_record(text, facets, embed)?;

        let response = self
            .http_client
            .post(self.endpoint("com.atproto.repo.createRecord"))
            .header("Authorization", Self::bearer(session))
            .json(&serde_json::json!({
                "repo": &session.did,
                "collection": POST_COLLECTION,
                "record": record,
            }))
            .send()
            .await
            .map_err(|e| send_error("post to Bluesky", e))?;

        let response = check_status("Bluesky createRecord", response).await?;
        let created: CreatedRecord = response.json().await?;

        info!("Successfully posted to Bluesky: {}", created.uri);
        Ok(created)
    }
}

fn build_record(text: &str, facets: &[Facet], embed: Option<&ImagesEmbed>) -> AppResult<Value> {
    let mut record = serde_json::json!({
        "$type": POST_COLLECTION,
        "text": text,
        "createdAt": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    });

    if !facets.is_empty() {
        record["facets"] = serde_json::to_value(facets)?;
    }

    if let Some(embed) = embed {
        record["embed"] = serde_json::to_value(embed)?;
    }

    Ok(record)
}
