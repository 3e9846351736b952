use super::{check_status, http_client, send_error, XApi};
use crate::config::XCredentials;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha1::Sha1;
use tracing::{debug, info};

type HmacSha1 = Hmac<Sha1>;

const X_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const X_TWEETS_URL: &str = "https://api.twitter.com/2/tweets";
const X_STATUS_URL: &str = "https://x.com/i/status";

pub struct XClient {
    http_client: Client,
    credentials: XCredentials,
}

impl XClient {
    pub fn new(credentials: XCredentials) -> Self {
        XClient {
            http_client: http_client(),
            credentials,
        }
    }

    /// Заголовок Authorization по OAuth 1.0a.
    ///
    /// Подписываются только oauth_* параметры: тела запросов JSON или
    /// multipart, поэтому в базовую строку не входят.
    fn authorization_header(&self, method: &str, url: &str) -> AppResult<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, &nonce, &timestamp)
    }

    fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        nonce: &str,
        timestamp: &str,
    ) -> AppResult<String> {
        let mut params = vec![
            ("oauth_consumer_key".to_string(), self.credentials.app_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.credentials.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let signature = oauth_signature(
            method,
            url,
            &params,
            &self.credentials.app_secret,
            &self.credentials.access_secret,
        )?;
        params.push(("oauth_signature".to_string(), signature));
        params.sort();

        let fields = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", fields))
    }
}

/// Подпись HMAC-SHA1 по RFC 5849, результат в base64
pub fn oauth_signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> AppResult<String> {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let signing_key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| AppError::Custom(format!("Cannot initialise HMAC: {}", e)))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub fn x_permalink(post_id: &str) -> String {
    format!("{}/{}", X_STATUS_URL, post_id)
}

#[async_trait]
impl XApi for XClient {
    async fn upload_media(&self, data: &[u8], content_type: &str, category: &str) -> AppResult<String> {
        debug!("Uploading media to X: {} bytes ({})", data.len(), content_type);

        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name("media")
            .mime_str(content_type)
            .map_err(|e| AppError::ApiError(format!("Invalid MIME type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("media_category", category.to_string())
            .part("media", part);

        let response = self
            .http_client
            .post(X_UPLOAD_URL)
            .header("Authorization", self.authorization_header("POST", X_UPLOAD_URL)?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_error("upload media to X", e))?;

        let response = check_status("X media upload", response).await?;
        let result: Value = response.json().await?;

        let media_id = result["media_id_string"]
            .as_str()
            .ok_or(AppError::ApiError("No media ID in response".to_string()))?
            .to_string();

        info!("Successfully uploaded media to X: {}", media_id);
        Ok(media_id)
    }

    async fn create_post(&self, text: &str, media_ids: &[String]) -> AppResult<String> {
        debug!("Posting to X ({} media)", media_ids.len());

        let mut body = serde_json::json!({ "text": text });
        if !media_ids.is_empty() {
            body["media"] = serde_json::json!({ "media_ids": media_ids });
        }

        let response = self
            .http_client
            .post(X_TWEETS_URL)
            .header("Authorization", self.authorization_header("POST", X_TWEETS_URL)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error("post to X", e))?;

        let response = check_status("X create post", response).await?;
        let result: Value = response.json().await?;

        let post_id = result["data"]["id"]
            .as_str()
            .ok_or(AppError::ApiError("No ID in response".to_string()))?
            .to_string();

        info!("Successfully posted to X: {}", post_id);
        Ok(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // Пример из документации X "Creating a signature"
    #[test]
    fn test_oauth_signature_reference_vector() {
        let params = pairs(&[
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ]);

        let signature = oauth_signature(
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
        .unwrap();

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_fields() {
        let client = XClient::new(XCredentials {
            app_key: "app key".to_string(),
            app_secret: "app-secret".to_string(),
            access_token: "token".to_string(),
            access_secret: "token-secret".to_string(),
        });

        let header = client
            .authorization_header_with("POST", X_TWEETS_URL, "abc123", "1700000000")
            .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"app%20key\", "));
        assert!(header.contains("oauth_nonce=\"abc123\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
        assert!(header.contains("oauth_token=\"token\""));
        assert!(header.ends_with("oauth_version=\"1.0\""));
    }

    #[test]
    fn test_permalink() {
        assert_eq!(x_permalink("1850000000000000000"), "https://x.com/i/status/1850000000000000000");
    }
}
