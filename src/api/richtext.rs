// api/richtext.rs - разметка упоминаний, ссылок и хэштегов для Bluesky

use super::BlueskyApi;
use crate::models::BlueskySession;
use fancy_regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, error};

const MENTION_PATTERN: &str =
    r"(?:^|(?<=[\s(]))@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)+";
const LINK_PATTERN: &str = r"(?:^|(?<=[\s(]))https?://[^\s]+";
const TAG_PATTERN: &str = r"(?:^|(?<=\s))#[^\s#]+";

static MENTION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(MENTION_PATTERN));
static LINK_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(LINK_PATTERN));
static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(TAG_PATTERN));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '"', '\'', ')'];
const MAX_TAG_CHARS: usize = 64;

/// Диапазон в байтах UTF-8, как его ожидает Bluesky
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Mention { handle: String },
    Link { uri: String },
    Tag { tag: String },
}

/// Найденная в тексте сущность до разрешения упоминаний
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub index: ByteSlice,
    pub kind: EntityKind,
}

/// Находит упоминания, ссылки и хэштеги, сортирует по началу
pub fn detect_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();

    for (start, matched) in find_all(&MENTION_RE, text) {
        entities.push(Entity {
            index: slice(start, matched.len()),
            kind: EntityKind::Mention {
                handle: matched[1..].to_string(),
            },
        });
    }

    for (start, matched) in find_all(&LINK_RE, text) {
        let uri = matched.trim_end_matches(TRAILING_PUNCTUATION);
        entities.push(Entity {
            index: slice(start, uri.len()),
            kind: EntityKind::Link {
                uri: uri.to_string(),
            },
        });
    }

    for (start, matched) in find_all(&TAG_RE, text) {
        let full = matched.trim_end_matches(TRAILING_PUNCTUATION);
        let tag = &full[1..];
        if tag.is_empty()
            || tag.chars().all(|c| c.is_ascii_digit())
            || tag.chars().count() > MAX_TAG_CHARS
        {
            continue;
        }
        entities.push(Entity {
            index: slice(start, full.len()),
            kind: EntityKind::Tag {
                tag: tag.to_string(),
            },
        });
    }

    entities.sort_by_key(|entity| entity.index.byte_start);
    entities
}

/// Текст не меняется; упоминания без DID отбрасываются
pub async fn detect_facets<C>(client: &C, session: &BlueskySession, text: &str) -> Vec<Facet>
where
    C: BlueskyApi + ?Sized,
{
    let mut facets = Vec::new();

    for entity in detect_entities(text) {
        let feature = match entity.kind {
            EntityKind::Mention { handle } => match client.resolve_handle(session, &handle).await {
                Ok(did) => FacetFeature::Mention { did },
                Err(e) => {
                    debug!("Dropping mention @{}: {}", handle, e);
                    continue;
                }
            },
            EntityKind::Link { uri } => FacetFeature::Link { uri },
            EntityKind::Tag { tag } => FacetFeature::Tag { tag },
        };

        facets.push(Facet {
            index: entity.index,
            features: vec![feature],
        });
    }

    facets
}

fn slice(start: usize, len: usize) -> ByteSlice {
    ByteSlice {
        byte_start: start,
        byte_end: start + len,
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            error!("Regex error while detecting facets: {}", e);
            None
        }
    }
}

fn find_all<'t>(re: &Option<Regex>, text: &'t str) -> Vec<(usize, &'t str)> {
    let Some(re) = re else {
        return Vec::new();
    };

    re.find_iter(text)
        .filter_map(Result::ok)
        .map(|m| (m.start(), m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockBluesky;

    fn kinds(text: &str) -> Vec<EntityKind> {
        detect_entities(text).into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_patterns_compile() {
        assert!(MENTION_RE.is_some());
        assert!(LINK_RE.is_some());
        assert!(TAG_RE.is_some());
    }

    #[test]
    fn test_plain_text_has_no_entities() {
        assert!(detect_entities("Hello world").is_empty());
        assert!(detect_entities("").is_empty());
    }

    #[test]
    fn test_detects_mention_with_byte_range() {
        let text = "hi @alice.bsky.social!";
        let entities = detect_entities(text);
        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0].kind,
            EntityKind::Mention {
                handle: "alice.bsky.social".to_string()
            }
        );
        let range = entities[0].index;
        assert_eq!(&text[range.byte_start..range.byte_end], "@alice.bsky.social");
    }

    #[test]
    fn test_email_is_not_a_mention() {
        assert!(kinds("write to bob@example.com").is_empty());
    }

    #[test]
    fn test_link_trailing_punctuation_is_trimmed() {
        let text = "see https://example.com/path?q=1.";
        let entities = detect_entities(text);
        assert_eq!(
            entities[0].kind,
            EntityKind::Link {
                uri: "https://example.com/path?q=1".to_string()
            }
        );
        assert_eq!(entities[0].index.byte_end, text.len() - 1);
    }

    #[test]
    fn test_hashtags_skip_numeric_and_fragment() {
        let found = kinds("#rust #2024 https://a.dev/#frag #launch!");
        assert_eq!(
            found,
            vec![
                EntityKind::Tag {
                    tag: "rust".to_string()
                },
                EntityKind::Link {
                    uri: "https://a.dev/#frag".to_string()
                },
                EntityKind::Tag {
                    tag: "launch".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_byte_offsets_account_for_multibyte_text() {
        let text = "Привет #мир";
        let entities = detect_entities(text);
        assert_eq!(entities.len(), 1);
        let range = entities[0].index;
        assert_eq!(range.byte_start, "Привет ".len());
        assert_eq!(&text[range.byte_start..range.byte_end], "#мир");
    }

    #[test]
    fn test_facet_serialization() {
        let facet = Facet {
            index: slice(0, 4),
            features: vec![FacetFeature::Tag {
                tag: "abc".to_string(),
            }],
        };
        let value = serde_json::to_value(&facet).unwrap();
        assert_eq!(value["index"]["byteStart"], 0);
        assert_eq!(value["index"]["byteEnd"], 4);
        assert_eq!(value["features"][0]["$type"], "app.bsky.richtext.facet#tag");
        assert_eq!(value["features"][0]["tag"], "abc");
    }

    #[tokio::test]
    async fn test_unresolved_mentions_are_dropped() {
        let client = MockBluesky::default().with_handle("alice.bsky.social", "did:plc:alice");
        let session = client.session();

        let facets = detect_facets(
            &client,
            &session,
            "@alice.bsky.social meet @ghost.example.com https://bsky.app",
        )
        .await;

        assert_eq!(facets.len(), 2);
        assert_eq!(
            facets[0].features,
            vec![FacetFeature::Mention {
                did: "did:plc:alice".to_string()
            }]
        );
        assert_eq!(
            facets[1].features,
            vec![FacetFeature::Link {
                uri: "https://bsky.app".to_string()
            }]
        );
    }
}
