//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation
//! of the `MapRepository` and `UserRepository` ports from the core crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chapter_map_core::chapter::Chapter;
use chapter_map_core::domain::{
    ChapterAnnotations, ChapterMap, Comment, CommentId, MapId, Theme, User, UserCredentials, UserId,
};
use chapter_map_core::ports::{MapRepository, PortError, PortResult, UserRepository};
use chapter_map_core::selection::RelationshipMap;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn comments_for(&self, map_ids: &[Uuid]) -> PortResult<HashMap<Uuid, Vec<Comment>>> {
        let records = sqlx::query_as::<_, CommentRecord>(
            "SELECT id, map_id, user_id, user_name, text, likes, created_at
             FROM map_comments WHERE map_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(map_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut grouped: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for record in records {
            let map_id = record.map_id;
            grouped.entry(map_id).or_default().push(record.to_domain());
        }
        Ok(grouped)
    }

    async fn with_comments(&self, records: Vec<MapRecord>) -> PortResult<Vec<ChapterMap>> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut comments = self.comments_for(&ids).await?;
        records
            .into_iter()
            .map(|r| {
                let map_comments = comments.remove(&r.id).unwrap_or_default();
                r.to_domain(map_comments)
            })
            .collect()
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const MAP_COLUMNS: &str = "id, user_id, user_name, name, description, short_description, is_public, \
     theme, selected_chapters, relationships, annotations, likes, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            display_name: self.display_name,
            email: self.email,
            avatar_url: self.avatar_url,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: User {
                user_id: self.user_id,
                display_name: self.display_name,
                email: self.email,
                avatar_url: self.avatar_url,
            },
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct MapRecord {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    name: String,
    description: String,
    short_description: Option<String>,
    is_public: bool,
    theme: String,
    selected_chapters: Vec<i32>,
    relationships: Json<RelationshipMap>,
    annotations: Json<ChapterAnnotations>,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl MapRecord {
    fn to_domain(self, comments: Vec<Comment>) -> PortResult<ChapterMap> {
        let theme = match self.theme.as_str() {
            "" => None,
            label => Some(label.parse::<Theme>().map_err(|e| PortError::Unexpected(e.to_string()))?),
        };
        let selected_chapters = self
            .selected_chapters
            .into_iter()
            .map(Chapter::new)
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(ChapterMap {
            id: self.id,
            name: self.name,
            description: self.description,
            short_description: self.short_description,
            user_id: self.user_id,
            user_name: self.user_name,
            is_public: self.is_public,
            theme,
            selected_chapters,
            relationships: self.relationships.0,
            annotations: self.annotations.0,
            likes: self.likes.into_iter().collect(),
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    map_id: Uuid,
    user_id: Uuid,
    user_name: String,
    text: String,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
}
impl CommentRecord {
    fn to_domain(self) -> Comment {
        Comment {
            id: self.id,
            user_id: self.user_id,
            user_name: self.user_name,
            text: self.text,
            created_at: self.created_at,
            likes: self.likes.into_iter().collect(),
        }
    }
}

fn chapter_numbers(map: &ChapterMap) -> Vec<i32> {
    map.selected_chapters.iter().map(|c| c.number()).collect()
}

fn theme_label(map: &ChapterMap) -> &'static str {
    map.theme.map(Theme::as_str).unwrap_or("")
}

//=========================================================================================
// `MapRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl MapRepository for DbAdapter {
    async fn create_map(&self, map: ChapterMap) -> PortResult<ChapterMap> {
        sqlx::query(
            "INSERT INTO maps (id, user_id, user_name, name, description, short_description, is_public,
                               theme, selected_chapters, relationships, annotations, likes,
                               created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(map.id)
        .bind(map.user_id)
        .bind(&map.user_name)
        .bind(&map.name)
        .bind(&map.description)
        .bind(&map.short_description)
        .bind(map.is_public)
        .bind(theme_label(&map))
        .bind(chapter_numbers(&map))
        .bind(Json(&map.relationships))
        .bind(Json(&map.annotations))
        .bind(map.likes.iter().copied().collect::<Vec<Uuid>>())
        .bind(map.created_at)
        .bind(map.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(map)
    }

    async fn get_map(&self, map_id: MapId) -> PortResult<ChapterMap> {
        let record = sqlx::query_as::<_, MapRecord>(&format!(
            "SELECT {} FROM maps WHERE id = $1",
            MAP_COLUMNS
        ))
        .bind(map_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Map {} not found", map_id)),
            _ => unexpected(e),
        })?;

        let mut comments = self.comments_for(&[map_id]).await?;
        record.to_domain(comments.remove(&map_id).unwrap_or_default())
    }

    async fn list_public_maps(&self) -> PortResult<Vec<ChapterMap>> {
        let records = sqlx::query_as::<_, MapRecord>(&format!(
            "SELECT {} FROM maps WHERE is_public = TRUE ORDER BY created_at DESC",
            MAP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.with_comments(records).await
    }

    async fn list_user_maps(&self, user_id: UserId) -> PortResult<Vec<ChapterMap>> {
        let records = sqlx::query_as::<_, MapRecord>(&format!(
            "SELECT {} FROM maps WHERE user_id = $1 ORDER BY created_at DESC",
            MAP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.with_comments(records).await
    }

    async fn update_map(&self, map: &ChapterMap) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE maps SET name = $2, description = $3, short_description = $4, is_public = $5,
                             theme = $6, selected_chapters = $7, relationships = $8, annotations = $9,
                             updated_at = $10
             WHERE id = $1",
        )
        .bind(map.id)
        .bind(&map.name)
        .bind(&map.description)
        .bind(&map.short_description)
        .bind(map.is_public)
        .bind(theme_label(map))
        .bind(chapter_numbers(map))
        .bind(Json(&map.relationships))
        .bind(Json(&map.annotations))
        .bind(map.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Map {} not found", map.id)));
        }
        Ok(())
    }

    async fn delete_map(&self, map_id: MapId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM maps WHERE id = $1")
            .bind(map_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Map {} not found", map_id)));
        }
        Ok(())
    }

    async fn toggle_like(&self, map_id: MapId, user_id: UserId) -> PortResult<BTreeSet<UserId>> {
        let likes = sqlx::query_scalar::<_, Vec<Uuid>>(
            "UPDATE maps
             SET likes = CASE WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                              ELSE array_append(likes, $2) END
             WHERE id = $1
             RETURNING likes",
        )
        .bind(map_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Map {} not found", map_id)))?;

        Ok(likes.into_iter().collect())
    }

    async fn append_comment(&self, map_id: MapId, comment: Comment) -> PortResult<()> {
        let result = sqlx::query(
            "INSERT INTO map_comments (id, map_id, user_id, user_name, text, likes, created_at)
             SELECT $1, $2, $3, $4, $5, '{}', $6
             WHERE EXISTS (SELECT 1 FROM maps WHERE id = $2)",
        )
        .bind(comment.id)
        .bind(map_id)
        .bind(comment.user_id)
        .bind(&comment.user_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Map {} not found", map_id)));
        }
        Ok(())
    }

    async fn toggle_comment_like(
        &self,
        map_id: MapId,
        comment_id: CommentId,
        user_id: UserId,
    ) -> PortResult<BTreeSet<UserId>> {
        let likes = sqlx::query_scalar::<_, Vec<Uuid>>(
            "UPDATE map_comments
             SET likes = CASE WHEN $3 = ANY(likes) THEN array_remove(likes, $3)
                              ELSE array_append(likes, $3) END
             WHERE id = $2 AND map_id = $1
             RETURNING likes",
        )
        .bind(map_id)
        .bind(comment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Comment {} not found", comment_id)))?;

        Ok(likes.into_iter().collect())
    }
}

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRepository for DbAdapter {
    async fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, display_name, avatar_url, hashed_password)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING user_id, email, display_name, avatar_url",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(display_name)
        .bind(avatar_url)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict(format!("An account for {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, display_name, avatar_url FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, display_name, avatar_url, hashed_password
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
