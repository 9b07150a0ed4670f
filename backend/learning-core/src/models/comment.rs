use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type CommentId = i64;

/// Upper bound on a comment body, in characters.
pub const MAX_COMMENT_LENGTH: usize = 500;

// `ValidateLength` compares in u64.
const MAX_COMMENT_CHARS: u64 = MAX_COMMENT_LENGTH as u64;

/// Replies hang directly off top-level comments and never carry replies.
pub const MAX_REPLY_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(alias = "user")]
    pub author: String,
    #[serde(alias = "message")]
    pub body: String,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(id: CommentId, author: String, body: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            author,
            body,
            created_at,
            is_pinned: false,
            is_edited: false,
            edited_at: None,
            replies: Vec::new(),
        }
    }

    /// Case-insensitive substring match on author or body.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.author.to_lowercase().contains(needle) || self.body.to_lowercase().contains(needle)
    }
}

/// Incoming body for a new comment, reply or edit. The derive enforces the
/// absolute cap; a configured lower limit is checked by the comment service.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentDraft {
    #[validate(length(max = MAX_COMMENT_CHARS, message = "Comment is too long"))]
    pub body: String,
}

impl CommentDraft {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentFilterType {
    #[default]
    All,
    Pinned,
    Recent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(default, rename = "type")]
    pub filter_type: CommentFilterType,
}

impl CommentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_type(filter_type: CommentFilterType) -> Self {
        Self {
            search_text: None,
            filter_type,
        }
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommentStats {
    pub total: usize,
    pub pinned: usize,
    pub recent: usize,
    pub replies: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_length_counts_characters() {
        assert!(CommentDraft::new("é".repeat(MAX_COMMENT_LENGTH)).validate().is_ok());
        assert!(CommentDraft::new("a".repeat(MAX_COMMENT_LENGTH + 1))
            .validate()
            .is_err());
    }

    #[test]
    fn filter_deserializes_from_host_payload() {
        let filter: CommentFilter =
            serde_json::from_str(r#"{"search_text": "ana", "type": "pinned"}"#).unwrap();
        assert_eq!(filter.filter_type, CommentFilterType::Pinned);
        assert_eq!(filter.search_text.as_deref(), Some("ana"));

        let filter: CommentFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, CommentFilter::all());
    }

    #[test]
    fn comment_accepts_legacy_field_names() {
        let json = r#"{
            "id": 1,
            "user": "Ana Silva",
            "message": "Great explanation!",
            "timestamp": "2024-05-01T12:00:00Z"
        }"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.author, "Ana Silva");
        assert_eq!(comment.body, "Great explanation!");
        assert!(!comment.is_pinned);
        assert!(comment.replies.is_empty());
    }
}
