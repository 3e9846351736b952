use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod config;
mod error;
mod image;
mod models;
mod publisher;

use api::bluesky::BlueskyClient;
use api::x::XClient;
use config::Config;
use image::ImageLocator;
use publisher::{BlueskyPublisher, Publisher, XPublisher};

#[tokio::main]
async fn main() -> ExitCode {
    // Инициализируем логирование
    init_tracing();

    // Парсим конфигурацию из CLI и env
    let config = match Config::from_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let locator = ImageLocator::new(&config.image_dir, &config.image_basename);
    info!(
        "Starting crosspost - image: {}/{}.*, limit: {} bytes",
        config.image_dir.display(),
        config.image_basename,
        locator.limit()
    );

    // Сети публикуются строго по очереди, чтобы логи не перемешивались
    let service = config.bluesky_service.clone();
    let publishers: Vec<Box<dyn Publisher>> = vec![
        Box::new(XPublisher::new(
            config.x_credentials(),
            config.x_on_media_failure,
            XClient::new,
        )),
        Box::new(BlueskyPublisher::new(
            config.bluesky_credentials(),
            config.bluesky_on_media_failure,
            move || BlueskyClient::new(&service),
        )),
    ];

    match app::run(&config.post_text(), &locator, &publishers).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Unexpected error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Инициализирует систему логирования с использованием tracing
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}
