use crate::error::{AppError, AppResult};
use crate::image::ImageLocator;
use crate::models::{PostRequest, PublishOutcome, PublishResult};
use crate::publisher::Publisher;
use tracing::{error, info, info_span, warn, Instrument};

/// Один запуск: проверка текста, поиск картинки, публикация по очереди.
///
/// Ошибкой завершаются только пустой текст и слишком большая картинка,
/// обе до любого сетевого запроса. Сбои отдельных сетей только логируются.
pub async fn run(text: &str, locator: &ImageLocator, publishers: &[Box<dyn Publisher>]) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::Usage);
    }

    let image = locator.locate().await?;
    let request = PostRequest::new(text, image)?;

    let mut published = 0;
    for publisher in publishers {
        let span = info_span!("publish", network = %publisher.network());
        let result = publisher.publish(&request).instrument(span.clone()).await;
        span.in_scope(|| log_result(&result));
        if result.is_published() {
            published += 1;
        }
    }

    info!("Done: {}/{} networks published", published, publishers.len());
    Ok(())
}

fn log_result(result: &PublishResult) {
    match &result.outcome {
        PublishOutcome::Published { post_id, post_url } => match post_url {
            Some(url) => info!("Posted to {}: {} ({})", result.network, post_id, url),
            None => info!("Posted to {}: {}", result.network, post_id),
        },
        PublishOutcome::Skipped { reason } => {
            info!("Skipping {}: {}", result.network, reason)
        }
        PublishOutcome::Failed { message, details } => {
            error!("Failed to post to {}: {}", result.network, message);
            if let Some(details) = details {
                warn!("{} error details: {}", result.network, details);
            }
        }
    }
}
