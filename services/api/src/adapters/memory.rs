//! services/api/src/adapters/memory.rs
//!
//! A process-local implementation of the storage ports. Used by the test
//! suite and when the service runs with `STORAGE=memory`.

use async_trait::async_trait;
use chapter_map_core::domain::{
    AuthSession, ChapterMap, Comment, CommentId, MapId, User, UserCredentials, UserId,
};
use chapter_map_core::engagement::toggle_like;
use chapter_map_core::ports::{MapRepository, PortError, PortResult, UserRepository};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryAdapter {
    maps: RwLock<HashMap<MapId, ChapterMap>>,
    users: RwLock<HashMap<UserId, UserCredentials>>,
    sessions: RwLock<HashMap<String, AuthSession>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn map_not_found(map_id: MapId) -> PortError {
    PortError::NotFound(format!("Map {} not found", map_id))
}

#[async_trait]
impl MapRepository for MemoryAdapter {
    async fn create_map(&self, map: ChapterMap) -> PortResult<ChapterMap> {
        let mut maps = self.maps.write().await;
        if maps.contains_key(&map.id) {
            return Err(PortError::Conflict(format!("Map {} already exists", map.id)));
        }
        maps.insert(map.id, map.clone());
        Ok(map)
    }

    async fn get_map(&self, map_id: MapId) -> PortResult<ChapterMap> {
        self.maps
            .read()
            .await
            .get(&map_id)
            .cloned()
            .ok_or_else(|| map_not_found(map_id))
    }

    async fn list_public_maps(&self) -> PortResult<Vec<ChapterMap>> {
        Ok(self
            .maps
            .read()
            .await
            .values()
            .filter(|m| m.is_public)
            .cloned()
            .collect())
    }

    async fn list_user_maps(&self, user_id: UserId) -> PortResult<Vec<ChapterMap>> {
        Ok(self
            .maps
            .read()
            .await
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_map(&self, map: &ChapterMap) -> PortResult<()> {
        let mut maps = self.maps.write().await;
        let stored = maps.get_mut(&map.id).ok_or_else(|| map_not_found(map.id))?;
        // Likes and comments have their own atomic writers; keep the stored ones.
        let likes = std::mem::take(&mut stored.likes);
        let comments = std::mem::take(&mut stored.comments);
        *stored = ChapterMap {
            likes,
            comments,
            ..map.clone()
        };
        Ok(())
    }

    async fn delete_map(&self, map_id: MapId) -> PortResult<()> {
        self.maps
            .write()
            .await
            .remove(&map_id)
            .map(|_| ())
            .ok_or_else(|| map_not_found(map_id))
    }

    async fn toggle_like(&self, map_id: MapId, user_id: UserId) -> PortResult<BTreeSet<UserId>> {
        let mut maps = self.maps.write().await;
        let map = maps.get_mut(&map_id).ok_or_else(|| map_not_found(map_id))?;
        toggle_like(&mut map.likes, user_id);
        Ok(map.likes.clone())
    }

    async fn append_comment(&self, map_id: MapId, comment: Comment) -> PortResult<()> {
        let mut maps = self.maps.write().await;
        let map = maps.get_mut(&map_id).ok_or_else(|| map_not_found(map_id))?;
        map.comments.push(comment);
        Ok(())
    }

    async fn toggle_comment_like(
        &self,
        map_id: MapId,
        comment_id: CommentId,
        user_id: UserId,
    ) -> PortResult<BTreeSet<UserId>> {
        let mut maps = self.maps.write().await;
        let map = maps.get_mut(&map_id).ok_or_else(|| map_not_found(map_id))?;
        let comment = map
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| PortError::NotFound(format!("Comment {} not found", comment_id)))?;
        toggle_like(&mut comment.likes, user_id);
        Ok(comment.likes.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryAdapter {
    async fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|c| c.user.email == email) {
            return Err(PortError::Conflict(format!("An account for {} already exists", email)));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            display_name: display_name.map(str::to_string),
            email: email.to_string(),
            avatar_url: avatar_url.map(str::to_string),
        };
        users.insert(
            user.user_id,
            UserCredentials {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .read()
            .await
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions.write().await.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let store = MemoryAdapter::new();
        let user = store.create_user("ahab@pequod.sea", Some("Ahab"), None, "hash").await.unwrap();

        store
            .create_auth_session("fresh", user.user_id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        store
            .create_auth_session("stale", user.user_id, Utc::now() - Duration::days(1))
            .await
            .unwrap();

        assert_eq!(store.validate_auth_session("fresh").await.unwrap(), user.user_id);
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let store = MemoryAdapter::new();
        store.create_user("stubb@pequod.sea", None, None, "h").await.unwrap();
        assert!(matches!(
            store.create_user("stubb@pequod.sea", None, None, "h").await,
            Err(PortError::Conflict(_))
        ));
    }
}
