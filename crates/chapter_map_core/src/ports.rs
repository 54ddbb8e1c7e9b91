//! crates/chapter_map_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete document store and account store.

use crate::domain::{ChapterMap, Comment, CommentId, MapId, User, UserCredentials, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Sign in required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Storage for map documents. Whole-document writes are last-write-wins;
/// like toggles and comment appends must be atomic in the implementation.
#[async_trait]
pub trait MapRepository: Send + Sync {
    async fn create_map(&self, map: ChapterMap) -> PortResult<ChapterMap>;

    async fn get_map(&self, map_id: MapId) -> PortResult<ChapterMap>;

    async fn list_public_maps(&self) -> PortResult<Vec<ChapterMap>>;

    async fn list_user_maps(&self, user_id: UserId) -> PortResult<Vec<ChapterMap>>;

    /// Overwrites the editable fields and `updated_at` of an existing map.
    async fn update_map(&self, map: &ChapterMap) -> PortResult<()>;

    async fn delete_map(&self, map_id: MapId) -> PortResult<()>;

    /// Flips `user_id` in the map's like set and returns the new set.
    async fn toggle_like(&self, map_id: MapId, user_id: UserId) -> PortResult<BTreeSet<UserId>>;

    async fn append_comment(&self, map_id: MapId, comment: Comment) -> PortResult<()>;

    /// Flips `user_id` in a comment's like set and returns the new set.
    async fn toggle_comment_like(
        &self,
        map_id: MapId,
        comment_id: CommentId,
        user_id: UserId,
    ) -> PortResult<BTreeSet<UserId>>;
}

/// Accounts and browser login sessions.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user(&self, user_id: UserId) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the session's user, or `Unauthorized` if it is unknown or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
