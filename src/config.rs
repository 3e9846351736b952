use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const X_APP_KEY_PLACEHOLDER: &str = "YOUR_X_APP_KEY";
pub const X_APP_SECRET_PLACEHOLDER: &str = "YOUR_X_APP_SECRET";
pub const X_ACCESS_TOKEN_PLACEHOLDER: &str = "YOUR_X_ACCESS_TOKEN";
pub const X_ACCESS_SECRET_PLACEHOLDER: &str = "YOUR_X_ACCESS_SECRET";
pub const BLUESKY_IDENTIFIER_PLACEHOLDER: &str = "YOUR_BLUESKY_HANDLE";
pub const BLUESKY_PASSWORD_PLACEHOLDER: &str = "YOUR_BLUESKY_APP_PASSWORD";

/// Что делать, если загрузка изображения не удалась
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum MediaFailurePolicy {
    /// Пост не публикуется
    #[value(name = "abort")]
    Abort,
    /// Пост публикуется без изображения
    #[value(name = "degrade")]
    Degrade,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "crosspost")]
#[command(author = "Dabe Vlohn")]
#[command(version = "0.1.0")]
#[command(about = "Publish a text post with an optional image to X and Bluesky")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Config {
    /// Текст поста, все слова после имени программы.
    /// clap его не разбирает: опции ниже задаются только через env
    #[arg(skip)]
    pub text: Vec<String>,

    /// Каталог, в котором ищется изображение
    /// env: CROSSPOST_IMAGE_DIR
    #[arg(long, env = "CROSSPOST_IMAGE_DIR", default_value = "images")]
    pub image_dir: PathBuf,

    /// Имя файла изображения без расширения
    /// env: CROSSPOST_IMAGE_BASENAME
    #[arg(long, env = "CROSSPOST_IMAGE_BASENAME", default_value = "latest")]
    pub image_basename: String,

    /// X API key (consumer key)
    #[arg(long, env = "CROSSPOST_X_APP_KEY", default_value = X_APP_KEY_PLACEHOLDER, hide_env_values = true)]
    pub x_app_key: String,

    /// X API secret (consumer secret)
    #[arg(long, env = "CROSSPOST_X_APP_SECRET", default_value = X_APP_SECRET_PLACEHOLDER, hide_env_values = true)]
    pub x_app_secret: String,

    /// X access token аккаунта
    #[arg(long, env = "CROSSPOST_X_ACCESS_TOKEN", default_value = X_ACCESS_TOKEN_PLACEHOLDER, hide_env_values = true)]
    pub x_access_token: String,

    /// X access token secret аккаунта
    #[arg(long, env = "CROSSPOST_X_ACCESS_SECRET", default_value = X_ACCESS_SECRET_PLACEHOLDER, hide_env_values = true)]
    pub x_access_secret: String,

    /// Поведение X при ошибке загрузки изображения
    #[arg(long, env = "CROSSPOST_X_ON_MEDIA_FAILURE", value_enum, default_value = "abort")]
    pub x_on_media_failure: MediaFailurePolicy,

    /// Bluesky handle или email (user.bsky.social)
    #[arg(long, env = "CROSSPOST_BLUESKY_IDENTIFIER", default_value = BLUESKY_IDENTIFIER_PLACEHOLDER)]
    pub bluesky_identifier: String,

    /// Bluesky app password
    #[arg(long, env = "CROSSPOST_BLUESKY_PASSWORD", default_value = BLUESKY_PASSWORD_PLACEHOLDER, hide_env_values = true)]
    pub bluesky_password: String,

    /// Адрес PDS сервиса Bluesky
    #[arg(long, env = "CROSSPOST_BLUESKY_SERVICE", default_value = crate::api::bluesky::BLUESKY_SERVICE_URL)]
    pub bluesky_service: String,

    /// Поведение Bluesky при ошибке загрузки изображения
    #[arg(long, env = "CROSSPOST_BLUESKY_ON_MEDIA_FAILURE", value_enum, default_value = "degrade")]
    pub bluesky_on_media_failure: MediaFailurePolicy,
}

impl Config {
    /// Собирает конфигурацию из argv и env.
    ///
    /// clap видит только имя программы, поэтому `-h`, `--version` или
    /// `--image-dir` в начале поста остаются частью текста.
    pub fn from_args<I, T>(args: I) -> crate::error::AppResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| "crosspost".to_string());

        let mut config = Config::try_parse_from([program])
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        config.text = args.collect();
        Ok(config)
    }

    /// Валидирует конфигурацию при запуске
    pub fn validate(&self) -> crate::error::AppResult<()> {
        if self.image_basename.trim().is_empty() {
            return Err("Image basename must not be empty".into());
        }

        if !self.bluesky_service.starts_with("https://")
            && !self.bluesky_service.starts_with("http://")
        {
            return Err(crate::error::AppError::Config(format!(
                "Bluesky service must be an http(s) URL, got {}",
                self.bluesky_service
            )));
        }

        Ok(())
    }

    pub fn post_text(&self) -> String {
        self.text.join(" ")
    }

    pub fn x_credentials(&self) -> XCredentials {
        XCredentials {
            app_key: self.x_app_key.clone(),
            app_secret: self.x_app_secret.clone(),
            access_token: self.x_access_token.clone(),
            access_secret: self.x_access_secret.clone(),
        }
    }

    pub fn bluesky_credentials(&self) -> BlueskyCredentials {
        BlueskyCredentials {
            identifier: self.bluesky_identifier.clone(),
            password: self.bluesky_password.clone(),
        }
    }
}

/// Значение осталось шаблонным, сеть нужно пропустить
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value.to_ascii_uppercase().starts_with("YOUR_")
        || (value.starts_with('<') && value.ends_with('>'))
}

/// Токены X: два ключа приложения и два токена аккаунта
#[derive(Clone, PartialEq, Eq)]
pub struct XCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl XCredentials {
    pub fn is_complete(&self) -> bool {
        [
            &self.app_key,
            &self.app_secret,
            &self.access_token,
            &self.access_secret,
        ]
        .iter()
        .all(|value| !is_placeholder(value))
    }
}

impl fmt::Debug for XCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XCredentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"***")
            .field("access_token", &self.access_token)
            .field("access_secret", &"***")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BlueskyCredentials {
    pub identifier: String,
    pub password: String,
}

impl BlueskyCredentials {
    pub fn is_complete(&self) -> bool {
        !is_placeholder(&self.identifier) && !is_placeholder(&self.password)
    }
}

impl fmt::Debug for BlueskyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueskyCredentials")
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .finish()
    }
}
