//! crates/chapter_map_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database; serde is only used so the
//! same shapes can travel as JSON documents.

use crate::chapter::Chapter;
use crate::selection::RelationshipMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;
pub type MapId = Uuid;
pub type CommentId = Uuid;

/// Per-chapter annotations of one map, keyed by chapter.
pub type ChapterAnnotations = BTreeMap<Chapter, ChapterAnnotation>;

//=========================================================================================
// Themes
//=========================================================================================

/// The theme a map is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    Ahab,
    Ishmael,
    #[serde(rename = "Ishmael & Ahab")]
    IshmaelAndAhab,
    Queequeeg,
}

impl Theme {
    pub const ALL: [Theme; 4] = [
        Theme::Ahab,
        Theme::Ishmael,
        Theme::IshmaelAndAhab,
        Theme::Queequeeg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Ahab => "Ahab",
            Theme::Ishmael => "Ishmael",
            Theme::IshmaelAndAhab => "Ishmael & Ahab",
            Theme::Queequeeg => "Queequeeg",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

//=========================================================================================
// Annotations
//=========================================================================================

/// A passage of the book quoted under a chapter annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub passage: String,
}

impl Citation {
    pub fn new(passage: impl Into<String>) -> Self {
        Self { passage: passage.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.passage.trim().is_empty()
    }
}

/// Free-text commentary on one chapter plus its citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAnnotation {
    #[serde(default)]
    pub annotation: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl ChapterAnnotation {
    /// True when there is neither text nor any citation left.
    pub fn is_empty(&self) -> bool {
        self.annotation.trim().is_empty() && self.citations.is_empty()
    }
}

//=========================================================================================
// Maps and comments
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
}

/// A user-authored collection of selected chapters, annotations and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMap {
    pub id: MapId,
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub user_id: UserId,
    pub user_name: String,
    pub is_public: bool,
    pub theme: Option<Theme>,
    pub selected_chapters: BTreeSet<Chapter>,
    /// Directed chapter relationships, limited to selected chapters.
    #[serde(default)]
    pub relationships: RelationshipMap,
    pub annotations: ChapterAnnotations,
    pub likes: BTreeSet<UserId>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChapterMap {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// The fields a user supplies when creating a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMap {
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub is_public: bool,
    pub theme: Option<Theme>,
    pub selected_chapters: BTreeSet<Chapter>,
    pub relationships: RelationshipMap,
    pub annotations: ChapterAnnotations,
}

/// A partial update: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<Option<String>>,
    pub is_public: Option<bool>,
    pub theme: Option<Option<Theme>>,
    pub selected_chapters: Option<BTreeSet<Chapter>>,
    pub relationships: Option<RelationshipMap>,
    pub annotations: Option<ChapterAnnotations>,
}

impl MapPatch {
    /// Writes every present field onto `map`. Timestamps are left alone.
    pub fn apply_to(self, map: &mut ChapterMap) {
        if let Some(name) = self.name {
            map.name = name;
        }
        if let Some(description) = self.description {
            map.description = description;
        }
        if let Some(short_description) = self.short_description {
            map.short_description = short_description;
        }
        if let Some(is_public) = self.is_public {
            map.is_public = is_public;
        }
        if let Some(theme) = self.theme {
            map.theme = theme;
        }
        if let Some(selected) = self.selected_chapters {
            map.selected_chapters = selected;
        }
        if let Some(relationships) = self.relationships {
            map.relationships = relationships;
        }
        if let Some(annotations) = self.annotations {
            map.annotations = annotations;
        }
    }
}

//=========================================================================================
// Users and auth sessions
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}
