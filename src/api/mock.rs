//! Клиенты-заглушки для тестов: запоминают вызовы и умеют падать по заказу

use super::richtext::Facet;
use super::{BlueskyApi, XApi};
use crate::error::{AppError, AppResult};
use crate::models::{BlobRef, BlueskySession, CreatedRecord, ImagesEmbed};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub text: String,
    pub media_ids: Vec<String>,
    pub facets: Vec<Facet>,
    pub embed: Option<ImagesEmbed>,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub logins: usize,
    pub uploads: Vec<RecordedUpload>,
    pub posts: Vec<RecordedPost>,
}

/// Клонируется вместе с общим журналом вызовов
#[derive(Debug, Clone, Default)]
pub struct MockX {
    pub calls: Arc<Mutex<Calls>>,
    pub fail_upload: bool,
    pub fail_post: bool,
}

impl MockX {
    pub fn failing_upload() -> Self {
        MockX {
            fail_upload: true,
            ..Default::default()
        }
    }

    pub fn failing_post() -> Self {
        MockX {
            fail_post: true,
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.calls.lock().unwrap().uploads.clone()
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.calls.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl XApi for MockX {
    async fn upload_media(&self, data: &[u8], content_type: &str, category: &str) -> AppResult<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.uploads.push(RecordedUpload {
            data: data.to_vec(),
            content_type: content_type.to_string(),
            category: Some(category.to_string()),
        });
        if self.fail_upload {
            return Err(AppError::Http {
                status: 400,
                body: "{\"errors\":[{\"message\":\"media type unrecognized\"}]}".to_string(),
            });
        }
        Ok(format!("media-{}", calls.uploads.len()))
    }

    async fn create_post(&self, text: &str, media_ids: &[String]) -> AppResult<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.posts.push(RecordedPost {
            text: text.to_string(),
            media_ids: media_ids.to_vec(),
            facets: Vec::new(),
            embed: None,
        });
        if self.fail_post {
            return Err(AppError::Http {
                status: 403,
                body: "duplicate content".to_string(),
            });
        }
        Ok("1850000000000000000".to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBluesky {
    pub calls: Arc<Mutex<Calls>>,
    pub fail_login: bool,
    pub fail_upload: bool,
    pub fail_post: bool,
    pub handles: HashMap<String, String>,
}

impl MockBluesky {
    pub fn failing_login() -> Self {
        MockBluesky {
            fail_login: true,
            ..Default::default()
        }
    }

    pub fn failing_upload() -> Self {
        MockBluesky {
            fail_upload: true,
            ..Default::default()
        }
    }

    pub fn failing_post() -> Self {
        MockBluesky {
            fail_post: true,
            ..Default::default()
        }
    }

    pub fn with_handle(mut self, handle: &str, did: &str) -> Self {
        self.handles.insert(handle.to_string(), did.to_string());
        self
    }

    pub fn session(&self) -> BlueskySession {
        BlueskySession {
            access_jwt: "jwt".to_string(),
            did: "did:plc:tester".to_string(),
            handle: "tester.bsky.social".to_string(),
        }
    }

    pub fn logins(&self) -> usize {
        self.calls.lock().unwrap().logins
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.calls.lock().unwrap().uploads.clone()
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.calls.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl BlueskyApi for MockBluesky {
    async fn login(&self, _identifier: &str, _password: &str) -> AppResult<BlueskySession> {
        self.calls.lock().unwrap().logins += 1;
        if self.fail_login {
            return Err(AppError::InvalidCredentials);
        }
        Ok(self.session())
    }

    async fn upload_blob(&self, _session: &BlueskySession, data: &[u8], encoding: &str) -> AppResult<BlobRef> {
        self.calls.lock().unwrap().uploads.push(RecordedUpload {
            data: data.to_vec(),
            content_type: encoding.to_string(),
            category: None,
        });
        if self.fail_upload {
            return Err(AppError::Http {
                status: 400,
                body: "{\"error\":\"BlobTooLarge\"}".to_string(),
            });
        }
        Ok(BlobRef(serde_json::json!({
            "$type": "blob",
            "ref": { "$link": "bafkreimock" },
            "mimeType": encoding,
            "size": data.len(),
        })))
    }

    async fn resolve_handle(&self, _session: &BlueskySession, handle: &str) -> AppResult<String> {
        self.handles
            .get(handle)
            .cloned()
            .ok_or_else(|| AppError::ApiError(format!("Unable to resolve handle: {}", handle)))
    }

    async fn create_post(
        &self,
        session: &BlueskySession,
        text: &str,
        facets: &[Facet],
        embed: Option<&ImagesEmbed>,
    ) -> AppResult<CreatedRecord> {
        self.calls.lock().unwrap().posts.push(RecordedPost {
            text: text.to_string(),
            media_ids: Vec::new(),
            facets: facets.to_vec(),
            embed: embed.cloned(),
        });
        if self.fail_post {
            return Err(AppError::Http {
                status: 400,
                body: "{\"error\":\"InvalidRecord\"}".to_string(),
            });
        }
        Ok(CreatedRecord {
            uri: format!("at://{}/app.bsky.feed.post/3kabc", session.did),
            cid: Some("bafyreimock".to_string()),
        })
    }
}
