//! crates/chapter_map_core/src/engagement.rs
//!
//! Likes and comments.

use crate::domain::{Comment, UserId};
use crate::ports::{PortError, PortResult};
use crate::viewer::Viewer;
use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeState {
    Liked,
    NotLiked,
}

/// Flips `user`'s membership in `likes`. There is no separate unlike.
pub fn toggle_like(likes: &mut BTreeSet<UserId>, user: UserId) -> LikeState {
    if likes.remove(&user) {
        LikeState::NotLiked
    } else {
        likes.insert(user);
        LikeState::Liked
    }
}

/// Builds a new comment authored by the viewer. The text is trimmed and must
/// not be empty; anonymous viewers get `Unauthorized`.
pub fn new_comment(viewer: &Viewer, text: &str) -> PortResult<Comment> {
    let user = viewer.require_user()?;
    let text = text.trim();
    if text.is_empty() {
        return Err(PortError::Invalid("Comment text must not be empty".to_string()));
    }
    Ok(Comment {
        id: Uuid::new_v4(),
        user_id: user.id,
        user_name: user.author_name(),
        text: text.to_string(),
        created_at: Utc::now(),
        likes: BTreeSet::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::CurrentUser;

    fn viewer() -> Viewer {
        Viewer::signed_in(CurrentUser {
            id: Uuid::new_v4(),
            display_name: Some("Starbuck".into()),
            email: "starbuck@pequod.sea".into(),
            avatar_url: None,
        })
    }

    #[test]
    fn like_toggles_on_and_off() {
        let user = Uuid::new_v4();
        let mut likes = BTreeSet::new();
        assert_eq!(toggle_like(&mut likes, user), LikeState::Liked);
        assert!(likes.contains(&user));
        assert_eq!(toggle_like(&mut likes, user), LikeState::NotLiked);
        assert!(likes.is_empty());
    }

    #[test]
    fn comments_are_trimmed_and_attributed() {
        let viewer = viewer();
        let comment = new_comment(&viewer, "  Thar she blows  ").unwrap();
        assert_eq!(comment.text, "Thar she blows");
        assert_eq!(comment.user_name, "Starbuck");
        assert_eq!(Some(comment.user_id), viewer.user_id());
    }

    #[test]
    fn blank_comments_are_rejected() {
        assert!(matches!(new_comment(&viewer(), " \n "), Err(PortError::Invalid(_))));
    }

    #[test]
    fn anonymous_comments_prompt_sign_in() {
        assert!(matches!(
            new_comment(&Viewer::anonymous(), "hello"),
            Err(PortError::Unauthorized)
        ));
    }
}
