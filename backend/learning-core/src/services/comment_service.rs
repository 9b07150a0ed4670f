use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use validator::Validate;

use crate::config::CommentSettings;
use crate::errors::{EngineError, EngineResult};
use crate::models::comment::{
    Comment, CommentDraft, CommentFilter, CommentFilterType, CommentId, CommentStats,
    MAX_REPLY_DEPTH,
};

/// Two-level comment forest: top-level comments, each owning a flat list of
/// replies. Ids are unique across both levels so every mutation can address
/// a comment by id alone.
#[derive(Debug, Clone)]
pub struct CommentService {
    comments: Vec<Comment>,
    settings: CommentSettings,
    last_id: CommentId,
}

impl CommentService {
    pub fn new(settings: CommentSettings) -> Self {
        Self {
            comments: Vec::new(),
            settings,
            last_id: 0,
        }
    }

    /// Builds the forest from pre-seeded comments, e.g. a lesson's existing
    /// discussion.
    pub fn with_comments(comments: Vec<Comment>, settings: CommentSettings) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        for comment in &comments {
            if !seen.insert(comment.id) {
                return Err(EngineError::InvalidSeed(format!(
                    "duplicate comment id {}",
                    comment.id
                )));
            }
            for reply in &comment.replies {
                if !reply.replies.is_empty() {
                    return Err(EngineError::InvalidSeed(format!(
                        "reply {} has nested replies",
                        reply.id
                    )));
                }
                if !seen.insert(reply.id) {
                    return Err(EngineError::InvalidSeed(format!(
                        "duplicate comment id {}",
                        reply.id
                    )));
                }
            }
        }

        let last_id = seen.into_iter().max().unwrap_or(0);
        // New ids are allocated above the highest seeded one.
        if last_id == CommentId::MAX {
            return Err(EngineError::InvalidSeed(format!(
                "comment id {} leaves no room for new comments",
                last_id
            )));
        }
        tracing::info!(
            "Comment engine seeded with {} comments (last id {})",
            comments.len(),
            last_id
        );

        Ok(Self {
            comments,
            settings,
            last_id,
        })
    }

    /// Top-level comments in insertion order, replies attached.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn get(&self, comment_id: CommentId) -> Option<&Comment> {
        self.comments.iter().find_map(|c| {
            if c.id == comment_id {
                Some(c)
            } else {
                c.replies.iter().find(|r| r.id == comment_id)
            }
        })
    }

    pub fn add_comment(&mut self, author: &str, body: &str) -> EngineResult<Comment> {
        self.add_comment_at(author, body, Utc::now())
    }

    pub fn add_comment_at(
        &mut self,
        author: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Comment> {
        self.validate_body(body)?;

        let comment = Comment::new(
            self.allocate_id(now)?,
            author.to_string(),
            body.to_string(),
            now,
        );
        self.comments.push(comment.clone());

        tracing::info!("Comment {} added by {}", comment.id, author);
        Ok(comment)
    }

    pub fn add_reply(
        &mut self,
        parent_id: CommentId,
        author: &str,
        body: &str,
    ) -> EngineResult<Comment> {
        self.add_reply_at(parent_id, author, body, Utc::now())
    }

    /// Replies attach to top-level comments only. Targeting a reply fails
    /// with `DepthExceeded`.
    pub fn add_reply_at(
        &mut self,
        parent_id: CommentId,
        author: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Comment> {
        let Some(index) = self.comments.iter().position(|c| c.id == parent_id) else {
            if self.is_reply(parent_id) {
                tracing::warn!("Rejected reply to reply {}", parent_id);
                return Err(EngineError::DepthExceeded {
                    parent_id,
                    max_depth: MAX_REPLY_DEPTH,
                });
            }
            return Err(EngineError::CommentNotFound {
                comment_id: parent_id,
            });
        };

        self.validate_body(body)?;

        let reply = Comment::new(
            self.allocate_id(now)?,
            author.to_string(),
            body.to_string(),
            now,
        );
        self.comments[index].replies.push(reply.clone());

        tracing::info!("Reply {} added to comment {} by {}", reply.id, parent_id, author);
        Ok(reply)
    }

    /// Flips the pin flag and returns the new value.
    pub fn toggle_pin(&mut self, comment_id: CommentId) -> EngineResult<bool> {
        let comment = self
            .find_mut(comment_id)
            .ok_or(EngineError::CommentNotFound { comment_id })?;
        comment.is_pinned = !comment.is_pinned;
        let pinned = comment.is_pinned;

        tracing::info!("Comment {} pinned={}", comment_id, pinned);
        Ok(pinned)
    }

    pub fn edit_comment(&mut self, comment_id: CommentId, new_body: &str) -> EngineResult<()> {
        self.edit_comment_at(comment_id, new_body, Utc::now())
    }

    pub fn edit_comment_at(
        &mut self,
        comment_id: CommentId,
        new_body: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.get(comment_id).is_none() {
            return Err(EngineError::CommentNotFound { comment_id });
        }
        self.validate_body(new_body)?;

        if let Some(comment) = self.find_mut(comment_id) {
            comment.body = new_body.to_string();
            comment.is_edited = true;
            comment.edited_at = Some(now);
        }

        tracing::info!("Comment {} edited", comment_id);
        Ok(())
    }

    /// Removes a comment. Deleting a top-level comment drops its replies.
    pub fn delete_comment(&mut self, comment_id: CommentId) -> EngineResult<()> {
        if let Some(index) = self.comments.iter().position(|c| c.id == comment_id) {
            let removed = self.comments.remove(index);
            tracing::info!(
                "Comment {} deleted with {} replies",
                comment_id,
                removed.replies.len()
            );
            return Ok(());
        }

        for parent in &mut self.comments {
            if let Some(index) = parent.replies.iter().position(|r| r.id == comment_id) {
                parent.replies.remove(index);
                tracing::info!("Reply {} deleted from comment {}", comment_id, parent.id);
                return Ok(());
            }
        }

        Err(EngineError::CommentNotFound { comment_id })
    }

    pub fn filter(&self, criteria: &CommentFilter) -> Vec<Comment> {
        self.filter_at(criteria, Utc::now())
    }

    /// Read-only projection over top-level comments. Search matches author or
    /// body case-insensitively; replies do not pull their parent in. For
    /// `All` and `Pinned` the pinned group comes first, each group keeping
    /// insertion order.
    pub fn filter_at(&self, criteria: &CommentFilter, now: DateTime<Utc>) -> Vec<Comment> {
        let needle = criteria
            .search_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);

        let matching = self.comments.iter().filter(|c| {
            let matches_search = needle.as_deref().map_or(true, |n| c.matches_lowercase(n));
            let matches_type = match criteria.filter_type {
                CommentFilterType::All => true,
                CommentFilterType::Pinned => c.is_pinned,
                CommentFilterType::Recent => self.is_recent(c, now),
            };
            matches_search && matches_type
        });

        let result: Vec<Comment> = match criteria.filter_type {
            CommentFilterType::Recent => matching.cloned().collect(),
            CommentFilterType::All | CommentFilterType::Pinned => {
                let (pinned, regular): (Vec<&Comment>, Vec<&Comment>) =
                    matching.partition(|c| c.is_pinned);
                pinned.into_iter().chain(regular).cloned().collect()
            }
        };

        tracing::debug!(
            "Filter {:?} matched {} of {} comments",
            criteria.filter_type,
            result.len(),
            self.comments.len()
        );
        result
    }

    pub fn stats(&self) -> CommentStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> CommentStats {
        CommentStats {
            total: self.comments.len(),
            pinned: self.comments.iter().filter(|c| c.is_pinned).count(),
            recent: self.comments.iter().filter(|c| self.is_recent(c, now)).count(),
            replies: self.comments.iter().map(|c| c.replies.len()).sum(),
        }
    }

    fn is_recent(&self, comment: &Comment, now: DateTime<Utc>) -> bool {
        comment.created_at > now - Duration::minutes(self.settings.recent_window_minutes)
    }

    fn is_reply(&self, comment_id: CommentId) -> bool {
        self.comments
            .iter()
            .any(|c| c.replies.iter().any(|r| r.id == comment_id))
    }

    fn find_mut(&mut self, comment_id: CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find_map(|c| {
            if c.id == comment_id {
                Some(c)
            } else {
                c.replies.iter_mut().find(|r| r.id == comment_id)
            }
        })
    }

    fn validate_body(&self, body: &str) -> EngineResult<()> {
        if body.trim().is_empty() {
            tracing::warn!("Rejected empty comment body");
            return Err(EngineError::validation("Comment cannot be empty"));
        }

        CommentDraft::new(body).validate().map_err(|errors| {
            tracing::warn!("Rejected comment body: {}", errors);
            EngineError::from(errors)
        })?;

        let length = body.chars().count();
        if length > self.settings.max_body_length {
            tracing::warn!("Rejected comment body of {} characters", length);
            return Err(EngineError::validation(format!(
                "Comment must be at most {} characters",
                self.settings.max_body_length
            )));
        }

        Ok(())
    }

    // Creation-time-derived, strictly increasing even within one millisecond.
    fn allocate_id(&mut self, now: DateTime<Utc>) -> EngineResult<CommentId> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or(EngineError::IdsExhausted {
                last_id: self.last_id,
            })?;
        let id = now.timestamp_millis().max(next);
        self.last_id = id;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, minute, 0).unwrap()
    }

    fn engine() -> CommentService {
        CommentService::new(CommentSettings::default())
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut engine = engine();
        let a = engine.add_comment_at("Ana", "one", at(0)).unwrap();
        let b = engine.add_comment_at("Bob", "two", at(0)).unwrap();
        let r = engine.add_reply_at(a.id, "Carl", "three", at(0)).unwrap();
        assert!(a.id < b.id && b.id < r.id);
    }

    #[test]
    fn seeded_ids_are_not_reused() {
        let mut seed = Comment::new(i64::MAX / 2, "Ana".into(), "hi".into(), at(0));
        seed.replies
            .push(Comment::new(i64::MAX / 2 + 1, "Bob".into(), "yo".into(), at(1)));
        let mut engine =
            CommentService::with_comments(vec![seed], CommentSettings::default()).unwrap();
        let added = engine.add_comment_at("Carl", "later", at(2)).unwrap();
        assert_eq!(added.id, i64::MAX / 2 + 2);
    }

    #[test]
    fn seed_at_max_id_is_rejected() {
        let seed = Comment::new(CommentId::MAX, "Ana".into(), "last".into(), at(0));
        let err = CommentService::with_comments(vec![seed], CommentSettings::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut parent = Comment::new(1, "Ana".into(), "first".into(), at(0));
        parent
            .replies
            .push(Comment::new(CommentId::MAX, "Bob".into(), "reply".into(), at(0)));
        assert!(CommentService::with_comments(vec![parent], CommentSettings::default()).is_err());
    }

    #[test]
    fn seed_just_below_max_id_still_allocates() {
        let seed = Comment::new(CommentId::MAX - 1, "Ana".into(), "hi".into(), at(0));
        let mut engine =
            CommentService::with_comments(vec![seed], CommentSettings::default()).unwrap();
        let added = engine.add_comment_at("Bob", "next", at(1)).unwrap();
        assert_eq!(added.id, CommentId::MAX);

        let err = engine.add_comment_at("Carl", "one more", at(2)).unwrap_err();
        assert_eq!(
            err,
            EngineError::IdsExhausted {
                last_id: CommentId::MAX
            }
        );
        let err = engine.add_reply_at(added.id, "Carl", "reply", at(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(engine.comments().len(), 2);
        assert!(engine.get(added.id).unwrap().replies.is_empty());
    }

    #[test]
    fn seed_rejects_duplicates_and_deep_nesting() {
        let a = Comment::new(1, "Ana".into(), "a".into(), at(0));
        let mut b = Comment::new(2, "Bob".into(), "b".into(), at(0));
        b.replies.push(Comment::new(1, "Carl".into(), "c".into(), at(0)));
        let err = CommentService::with_comments(vec![a.clone(), b], CommentSettings::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut reply = Comment::new(3, "Bob".into(), "r".into(), at(0));
        reply.replies.push(Comment::new(4, "Dan".into(), "d".into(), at(0)));
        let mut parent = a;
        parent.replies.push(reply);
        assert!(CommentService::with_comments(vec![parent], CommentSettings::default()).is_err());
    }

    #[test]
    fn body_limit_follows_settings() {
        let mut engine = CommentService::new(CommentSettings {
            max_body_length: 10,
            recent_window_minutes: 60,
        });
        assert!(engine.add_comment("Ana", "0123456789").is_ok());
        let err = engine.add_comment("Ana", "0123456789!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(engine.comments().len(), 1);
    }

    #[test]
    fn oversized_body_is_rejected_not_truncated() {
        let mut engine = engine();
        let err = engine.add_comment("Ana", &"x".repeat(501)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(engine.comments().is_empty());
    }

    #[test]
    fn reply_to_unknown_parent_is_not_found() {
        let mut engine = engine();
        assert_eq!(
            engine.add_reply(7, "Ana", "hello").unwrap_err(),
            EngineError::CommentNotFound { comment_id: 7 }
        );
    }

    #[test]
    fn pin_edit_delete_reach_replies() {
        let mut engine = engine();
        let parent = engine.add_comment_at("Bob", "first", at(0)).unwrap();
        let reply = engine.add_reply_at(parent.id, "Ana", "reply", at(1)).unwrap();

        assert!(engine.toggle_pin(reply.id).unwrap());
        engine.edit_comment_at(reply.id, "reply, edited", at(2)).unwrap();
        let stored = engine.get(reply.id).unwrap();
        assert!(stored.is_pinned);
        assert!(stored.is_edited);
        assert_eq!(stored.edited_at, Some(at(2)));

        engine.delete_comment(reply.id).unwrap();
        assert!(engine.get(reply.id).is_none());
        assert!(engine.get(parent.id).unwrap().replies.is_empty());
    }

    #[test]
    fn failed_edit_keeps_body() {
        let mut engine = engine();
        let c = engine.add_comment_at("Bob", "first", at(0)).unwrap();
        assert_eq!(
            engine.edit_comment(c.id, "   ").unwrap_err().kind(),
            ErrorKind::Validation
        );
        let stored = engine.get(c.id).unwrap();
        assert_eq!(stored.body, "first");
        assert!(!stored.is_edited);
        assert_eq!(
            engine.edit_comment(c.id + 100, "new").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn recent_window_is_exclusive() {
        let mut engine = engine();
        engine.add_comment_at("Ana", "old", at(0)).unwrap();
        engine.add_comment_at("Bob", "new", at(1)).unwrap();

        let now = at(0) + Duration::minutes(60);
        let recent = engine.filter_at(&CommentFilter::of_type(CommentFilterType::Recent), now);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].body, "new");
        assert_eq!(engine.stats_at(now).recent, 1);
    }

    #[test]
    fn recent_view_keeps_insertion_order() {
        let mut engine = engine();
        engine.add_comment_at("Ana", "a", at(0)).unwrap();
        let b = engine.add_comment_at("Bob", "b", at(1)).unwrap();
        engine.toggle_pin(b.id).unwrap();

        let bodies: Vec<_> = engine
            .filter_at(&CommentFilter::of_type(CommentFilterType::Recent), at(2))
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["a", "b"]);
    }

    #[test]
    fn stats_count_top_level_and_replies() {
        let mut engine = engine();
        let a = engine.add_comment_at("Ana", "a", at(0)).unwrap();
        engine.add_comment_at("Bob", "b", at(0)).unwrap();
        engine.add_reply_at(a.id, "Carl", "c", at(0)).unwrap();
        engine.toggle_pin(a.id).unwrap();

        let stats = engine.stats_at(at(5));
        assert_eq!(
            stats,
            CommentStats {
                total: 2,
                pinned: 1,
                recent: 2,
                replies: 1,
            }
        );
    }
}
