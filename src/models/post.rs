use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::{UserId, UserSummary};

pub type PostId = i64;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub author: Option<UserSummary>,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_id: Option<PostId>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub replies_count: u64,
    #[serde(default)]
    pub shares_count: u64,
    #[serde(default)]
    pub is_liked: bool,
}

impl Post {
    /// Id of the user who created the post.
    pub fn author_id(&self) -> Option<UserId> {
        self.user_id.or_else(|| self.author.as_ref().map(|a| a.id))
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.author_id() == Some(user_id)
    }

    /// Shallow merge: every field present in the patch overwrites ours,
    /// everything else is kept.
    pub fn merge(&mut self, patch: &PostPatch) {
        debug_assert_eq!(self.id, patch.id);
        if let Some(user_id) = patch.user_id {
            self.user_id = Some(user_id);
        }
        if let Some(author) = &patch.author {
            self.author = Some(author.clone());
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = Some(parent_id);
        }
        if let Some(likes) = patch.likes_count {
            self.likes_count = likes;
        }
        if let Some(replies) = patch.replies_count {
            self.replies_count = replies;
        }
        if let Some(shares) = patch.shares_count {
            self.shares_count = shares;
        }
        if let Some(liked) = patch.is_liked {
            self.is_liked = liked;
        }
    }

    pub fn segments(&self) -> Vec<Segment<'_>> {
        segments(&self.content)
    }
}

/// Partial post as carried by `post_updated`. Absent fields mean unchanged.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PostPatch {
    pub id: PostId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PostId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

impl PostPatch {
    pub fn new(id: PostId) -> Self {
        Self { id, ..Self::default() }
    }
}

impl From<Post> for PostPatch {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            author: post.author,
            content: Some(post.content),
            created_at: Some(post.created_at),
            updated_at: post.updated_at,
            parent_id: post.parent_id,
            likes_count: Some(post.likes_count),
            replies_count: Some(post.replies_count),
            shares_count: Some(post.shares_count),
            is_liked: Some(post.is_liked),
        }
    }
}

/// A run of post content. Markers keep their leading `@` or `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Mention(&'a str),
    Hashtag(&'a str),
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split content into plain text, `@handle` and `#tag` runs.
pub fn segments(content: &str) -> Vec<Segment<'_>> {
    let bytes = content.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let marker = bytes[i];
        let opens = (marker == b'@' || marker == b'#')
            && bytes.get(i + 1).copied().is_some_and(is_word_byte);
        if !opens {
            i += 1;
            continue;
        }

        if start < i {
            out.push(Segment::Text(&content[start..i]));
        }
        let mut end = i + 1;
        while end < bytes.len() && is_word_byte(bytes[end]) {
            end += 1;
        }
        let run = &content[i..end];
        out.push(if marker == b'@' {
            Segment::Mention(run)
        } else {
            Segment::Hashtag(run)
        });
        i = end;
        start = end;
    }

    if start < bytes.len() {
        out.push(Segment::Text(&content[start..]));
    }
    out
}

pub fn extract_mentions(content: &str) -> Vec<String> {
    segments(content)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Mention(m) => Some(m[1..].to_string()),
            _ => None,
        })
        .collect()
}

pub fn extract_hashtags(content: &str) -> Vec<String> {
    segments(content)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Hashtag(h) => Some(h[1..].to_string()),
            _ => None,
        })
        .collect()
}

pub fn has_linked_content(content: &str) -> bool {
    segments(content)
        .iter()
        .any(|s| !matches!(s, Segment::Text(_)))
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO 8601
/// (`2024-05-01T10:00:00.123456`), which we read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segments_split_mentions_and_hashtags() {
        let parts = segments("hi @ana, see #rust_lang!");
        assert_eq!(
            parts,
            vec![
                Segment::Text("hi "),
                Segment::Mention("@ana"),
                Segment::Text(", see "),
                Segment::Hashtag("#rust_lang"),
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn lone_markers_stay_text() {
        assert_eq!(segments("a @ b # c"), vec![Segment::Text("a @ b # c")]);
        assert!(!has_linked_content("email me @ home"));
    }

    #[test]
    fn non_ascii_content_is_preserved() {
        let parts = segments("olá #café @joão");
        assert_eq!(
            parts,
            vec![
                Segment::Text("olá "),
                Segment::Hashtag("#caf"),
                Segment::Text("é "),
                Segment::Mention("@jo"),
                Segment::Text("ão"),
            ]
        );
    }

    #[test]
    fn extract_markers() {
        let text = "@ana and @bo like #rust #tui";
        assert_eq!(extract_mentions(text), vec!["ana", "bo"]);
        assert_eq!(extract_hashtags(text), vec!["rust", "tui"]);
        assert!(has_linked_content(text));
    }

    #[test]
    fn deserializes_backend_post_with_naive_timestamp() {
        let post: Post = serde_json::from_value(json!({
            "id": 7,
            "content": "hello",
            "user_id": 3,
            "author": {"id": 3, "handle": "ana", "first_name": "Ana", "last_name": "Silva", "full_name": "Ana Silva"},
            "created_at": "2024-05-01T10:00:00.123456",
            "updated_at": "2024-05-01T10:00:00",
            "likes_count": 2,
            "replies_count": 0,
            "shares_count": 1
        }))
        .unwrap();
        assert_eq!(post.author_id(), Some(3));
        assert!(!post.is_liked);
        assert_eq!(post.created_at.to_rfc3339(), "2024-05-01T10:00:00.123456+00:00");
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut post: Post = serde_json::from_value(json!({
            "id": 1, "content": "before", "created_at": "2024-05-01T10:00:00Z",
            "likes_count": 4, "is_liked": true
        }))
        .unwrap();
        let patch: PostPatch = serde_json::from_value(json!({"id": 1, "likes_count": 9})).unwrap();
        post.merge(&patch);
        assert_eq!(post.likes_count, 9);
        assert_eq!(post.content, "before");
        assert!(post.is_liked);
    }
}
