use crate::api::bluesky::bluesky_permalink;
use crate::api::richtext;
use crate::api::x::x_permalink;
use crate::api::{BlueskyApi, XApi};
use crate::config::{BlueskyCredentials, MediaFailurePolicy, XCredentials};
use crate::error::{AppError, AppResult};
use crate::models::{ImagesEmbed, Network, PostRequest, PublishResult};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Категория медиа X для картинки в посте
pub const X_MEDIA_CATEGORY: &str = "tweet_image";

/// Alt-текст картинки в Bluesky, не настраивается
pub const BLUESKY_IMAGE_ALT: &str = "Image";

/// Публикация в одну сеть.
///
/// `publish` никогда не возвращает ошибку: любые сбои сети превращаются
/// в `PublishOutcome::Failed`, и следующая сеть запускается как обычно.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn network(&self) -> Network;

    async fn publish(&self, request: &PostRequest) -> PublishResult;
}

/// Ошибка загрузки медиа либо прерывает пост, либо пропускается
fn on_media_failure(policy: MediaFailurePolicy, network: Network, err: AppError) -> AppResult<()> {
    match policy {
        MediaFailurePolicy::Abort => Err(err),
        MediaFailurePolicy::Degrade => {
            warn!("{} media upload failed, posting without image: {}", network, err);
            Ok(())
        }
    }
}

pub struct XPublisher<C> {
    client: Option<C>,
    policy: MediaFailurePolicy,
}

impl<C: XApi> XPublisher<C> {
    /// Клиент создаётся только при заполненных токенах
    pub fn new(
        credentials: XCredentials,
        policy: MediaFailurePolicy,
        connect: impl FnOnce(XCredentials) -> C,
    ) -> Self {
        let client = credentials.is_complete().then(|| connect(credentials));
        XPublisher { client, policy }
    }

    async fn try_publish(&self, client: &C, request: &PostRequest) -> AppResult<String> {
        let mut media_ids = Vec::new();

        if let Some(image) = request.image() {
            debug!("Uploading {} to X", image.file_name());
            match client
                .upload_media(&image.bytes, image.content_type.mime(), X_MEDIA_CATEGORY)
                .await
            {
                Ok(media_id) => media_ids.push(media_id),
                Err(e) => on_media_failure(self.policy, Network::X, e)?,
            }
        }

        client.create_post(request.text(), &media_ids).await
    }
}

#[async_trait]
impl<C: XApi> Publisher for XPublisher<C> {
    fn network(&self) -> Network {
        Network::X
    }

    async fn publish(&self, request: &PostRequest) -> PublishResult {
        let Some(client) = &self.client else {
            return PublishResult::skipped(Network::X, "credentials are not configured");
        };

        match self.try_publish(client, request).await {
            Ok(post_id) => {
                let url = x_permalink(&post_id);
                PublishResult::published(Network::X, post_id, Some(url))
            }
            Err(e) => PublishResult::failed(Network::X, &e),
        }
    }
}

pub struct BlueskyPublisher<C> {
    client: Option<C>,
    credentials: BlueskyCredentials,
    policy: MediaFailurePolicy,
}

impl<C: BlueskyApi> BlueskyPublisher<C> {
    pub fn new(
        credentials: BlueskyCredentials,
        policy: MediaFailurePolicy,
        connect: impl FnOnce() -> C,
    ) -> Self {
        let client = credentials.is_complete().then(connect);
        BlueskyPublisher {
            client,
            credentials,
            policy,
        }
    }

    async fn try_publish(&self, client: &C, request: &PostRequest) -> AppResult<(String, Option<String>)> {
        let session = client
            .login(&self.credentials.identifier, &self.credentials.password)
            .await?;

        let mut embed = None;
        if let Some(image) = request.image() {
            debug!("Uploading {} to Bluesky", image.file_name());
            match client
                .upload_blob(&session, &image.bytes, image.content_type.mime())
                .await
            {
                Ok(blob) => embed = Some(ImagesEmbed::single(blob, BLUESKY_IMAGE_ALT)),
                Err(e) => on_media_failure(self.policy, Network::Bluesky, e)?,
            }
        }

        let facets = richtext::detect_facets(client, &session, request.text()).await;
        debug!("Detected {} facets", facets.len());

        let created = client
            .create_post(&session, request.text(), &facets, embed.as_ref())
            .await?;
        debug!("Record cid: {:?}", created.cid);

        let url = bluesky_permalink(&session.handle, &created.uri);
        Ok((created.uri, url))
    }
}

#[async_trait]
impl<C: BlueskyApi> Publisher for BlueskyPublisher<C> {
    fn network(&self) -> Network {
        Network::Bluesky
    }

    async fn publish(&self, request: &PostRequest) -> PublishResult {
        let Some(client) = &self.client else {
            return PublishResult::skipped(Network::Bluesky, "credentials are not configured");
        };

        info!("Logging in to Bluesky as {}", self.credentials.identifier);
        match self.try_publish(client, request).await {
            Ok((uri, url)) => PublishResult::published(Network::Bluesky, uri, url),
            Err(e) => PublishResult::failed(Network::Bluesky, &e),
        }
    }
}
