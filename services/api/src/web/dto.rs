//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API, with their OpenAPI schemas.
//! Conversions to and from the core domain types live here too.

use axum::http::StatusCode;
use chapter_map_core::chapter::Chapter;
use chapter_map_core::domain::{
    ChapterAnnotation, ChapterAnnotations, ChapterMap, Citation, Comment, MapPatch, NewMap, Theme,
};
use chapter_map_core::graph::{ChapterRelationship, GraphData, GraphNode, Link, NodeId};
use chapter_map_core::selection::RelationshipMap;
use chapter_map_core::viewer::Viewer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;
use uuid::Uuid;

type BadRequest = (StatusCode, String);

fn bad_request(message: impl Into<String>) -> BadRequest {
    (StatusCode::BAD_REQUEST, message.into())
}

//=========================================================================================
// Parsing helpers
//=========================================================================================

pub fn parse_chapter(number: i32) -> Result<Chapter, BadRequest> {
    Chapter::new(number).map_err(|e| bad_request(e.to_string()))
}

pub fn parse_chapters(numbers: &[i32]) -> Result<BTreeSet<Chapter>, BadRequest> {
    numbers.iter().map(|&n| parse_chapter(n)).collect()
}

/// An empty label means "no theme".
pub fn parse_theme(label: &str) -> Result<Option<Theme>, BadRequest> {
    match label.trim() {
        "" => Ok(None),
        label => label
            .parse::<Theme>()
            .map(Some)
            .map_err(|e| bad_request(e.to_string())),
    }
}

/// Later entries for the same source chapter replace earlier ones.
fn parse_relationships(relationships: Vec<RelationshipDto>) -> Result<RelationshipMap, BadRequest> {
    let mut map = RelationshipMap::new();
    for dto in relationships {
        let relationship = dto.into_domain()?;
        map.insert(
            relationship.source_chapter,
            relationship.related_chapters.into_iter().collect(),
        );
    }
    Ok(map)
}

fn parse_annotations(
    annotations: BTreeMap<String, AnnotationDto>,
) -> Result<ChapterAnnotations, BadRequest> {
    annotations
        .into_iter()
        .map(|(key, dto)| {
            let number = key
                .parse::<i32>()
                .map_err(|_| bad_request(format!("'{}' is not a chapter number", key)))?;
            Ok((parse_chapter(number)?, ChapterAnnotation::from(dto)))
        })
        .collect()
}

//=========================================================================================
// Annotations
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default)]
pub struct AnnotationDto {
    /// Free-text commentary on the chapter.
    #[serde(default)]
    pub annotation: String,
    /// Quoted passages, in order.
    #[serde(default)]
    pub citations: Vec<String>,
}

impl From<AnnotationDto> for ChapterAnnotation {
    fn from(dto: AnnotationDto) -> Self {
        Self {
            annotation: dto.annotation,
            citations: dto.citations.into_iter().map(Citation::new).collect(),
        }
    }
}

impl From<&ChapterAnnotation> for AnnotationDto {
    fn from(entry: &ChapterAnnotation) -> Self {
        Self {
            annotation: entry.annotation.clone(),
            citations: entry.citations.iter().map(|c| c.passage.clone()).collect(),
        }
    }
}

//=========================================================================================
// Maps
//=========================================================================================

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateMapRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    /// One of the available themes, or empty for none.
    #[serde(default)]
    pub theme: String,
    pub selected_chapters: Vec<i32>,
    /// Directed relationships between selected chapters.
    #[serde(default)]
    pub relationships: Vec<RelationshipDto>,
    /// Annotations keyed by chapter number.
    #[serde(default)]
    pub annotations: BTreeMap<String, AnnotationDto>,
}

impl CreateMapRequest {
    pub fn into_new_map(self) -> Result<NewMap, BadRequest> {
        Ok(NewMap {
            name: self.name,
            description: self.description,
            short_description: self.short_description.filter(|s| !s.trim().is_empty()),
            is_public: self.is_public,
            theme: parse_theme(&self.theme)?,
            selected_chapters: parse_chapters(&self.selected_chapters)?,
            relationships: parse_relationships(self.relationships)?,
            annotations: parse_annotations(self.annotations)?,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct UpdateMapRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// An empty string clears the short description.
    pub short_description: Option<String>,
    pub is_public: Option<bool>,
    /// An empty string clears the theme.
    pub theme: Option<String>,
    pub selected_chapters: Option<Vec<i32>>,
    pub relationships: Option<Vec<RelationshipDto>>,
    pub annotations: Option<BTreeMap<String, AnnotationDto>>,
}

impl UpdateMapRequest {
    pub fn into_patch(self) -> Result<MapPatch, BadRequest> {
        Ok(MapPatch {
            name: self.name,
            description: self.description,
            short_description: self
                .short_description
                .map(|s| Some(s).filter(|s| !s.trim().is_empty())),
            is_public: self.is_public,
            theme: self.theme.as_deref().map(parse_theme).transpose()?,
            selected_chapters: self.selected_chapters.as_deref().map(parse_chapters).transpose()?,
            relationships: self.relationships.map(parse_relationships).transpose()?,
            annotations: self.annotations.map(parse_annotations).transpose()?,
        })
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CommentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Uuid>,
    pub like_count: usize,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            user_id: comment.user_id,
            user_name: comment.user_name,
            text: comment.text,
            created_at: comment.created_at,
            like_count: comment.likes.len(),
            likes: comment.likes.into_iter().collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MapResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub user_id: Uuid,
    pub user_name: String,
    pub is_public: bool,
    pub theme: Option<String>,
    /// Sorted ascending.
    pub selected_chapters: Vec<i32>,
    pub relationships: Vec<RelationshipDto>,
    pub annotations: BTreeMap<String, AnnotationDto>,
    pub likes: Vec<Uuid>,
    pub like_count: usize,
    pub liked_by_viewer: bool,
    pub is_owner: bool,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MapResponse {
    pub fn new(map: ChapterMap, viewer: &Viewer) -> Self {
        let viewer_id = viewer.user_id();
        Self {
            id: map.id,
            name: map.name,
            description: map.description,
            short_description: map.short_description,
            user_id: map.user_id,
            user_name: map.user_name,
            is_public: map.is_public,
            theme: map.theme.map(|t| t.as_str().to_string()),
            selected_chapters: map.selected_chapters.iter().map(|c| c.number()).collect(),
            relationships: map
                .relationships
                .to_relationships()
                .into_iter()
                .map(RelationshipDto::from)
                .collect(),
            annotations: map
                .annotations
                .iter()
                .map(|(c, a)| (c.number().to_string(), AnnotationDto::from(a)))
                .collect(),
            like_count: map.likes.len(),
            liked_by_viewer: viewer_id.is_some_and(|id| map.likes.contains(&id)),
            likes: map.likes.into_iter().collect(),
            is_owner: viewer_id == Some(map.user_id),
            comments: map.comments.into_iter().map(CommentResponse::from).collect(),
            created_at: map.created_at,
            updated_at: map.updated_at,
        }
    }
}

//=========================================================================================
// Likes and comments
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: usize,
    pub likes: Vec<Uuid>,
}

impl LikeResponse {
    pub fn new(likes: BTreeSet<Uuid>, viewer: &Viewer) -> Self {
        Self {
            liked: viewer.user_id().is_some_and(|id| likes.contains(&id)),
            like_count: likes.len(),
            likes: likes.into_iter().collect(),
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct AddCommentRequest {
    pub text: String,
}

//=========================================================================================
// Graphs and catalogue
//=========================================================================================

#[derive(Serialize, ToSchema, Debug)]
pub struct GraphNodeDto {
    /// A chapter number, or the string `"hub"` for the map's hub node.
    #[schema(value_type = Object)]
    pub id: NodeId,
    pub label: String,
    pub connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct LinkDto {
    #[schema(value_type = Object)]
    pub source: NodeId,
    #[schema(value_type = Object)]
    pub target: NodeId,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct GraphResponse {
    pub nodes: Vec<GraphNodeDto>,
    pub links: Vec<LinkDto>,
    /// True when there is nothing to draw.
    pub empty: bool,
}

impl From<GraphData> for GraphResponse {
    fn from(graph: GraphData) -> Self {
        let empty = graph.is_empty();
        Self {
            nodes: graph
                .nodes
                .into_iter()
                .map(|GraphNode { id, label, connections, x, y }| GraphNodeDto {
                    id,
                    label,
                    connections,
                    x,
                    y,
                })
                .collect(),
            links: graph
                .links
                .into_iter()
                .map(|Link { source, target }| LinkDto { source, target })
                .collect(),
            empty,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RelationshipDto {
    pub source_chapter: i32,
    pub related_chapters: Vec<i32>,
}

impl RelationshipDto {
    pub fn into_domain(self) -> Result<ChapterRelationship, BadRequest> {
        Ok(ChapterRelationship {
            source_chapter: parse_chapter(self.source_chapter)?,
            related_chapters: self
                .related_chapters
                .into_iter()
                .map(parse_chapter)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<ChapterRelationship> for RelationshipDto {
    fn from(relationship: ChapterRelationship) -> Self {
        Self {
            source_chapter: relationship.source_chapter.number(),
            related_chapters: relationship.related_chapters.iter().map(|c| c.number()).collect(),
        }
    }
}

/// Graph preview input: either directed relationships, or a map name plus a
/// flat chapter selection.
#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct GraphPreviewRequest {
    #[serde(default)]
    pub relationships: Option<Vec<RelationshipDto>>,
    #[serde(default)]
    pub map_name: Option<String>,
    #[serde(default)]
    pub selected_chapters: Option<Vec<i32>>,
    /// Compute node positions for a canvas of this size.
    #[serde(default)]
    pub layout_size: Option<f64>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ChapterInfo {
    pub number: i32,
    pub title: String,
    pub is_special: bool,
}

impl From<Chapter> for ChapterInfo {
    fn from(chapter: Chapter) -> Self {
        Self {
            number: chapter.number(),
            title: chapter.title(),
            is_special: chapter.is_special(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_chapter_keys_and_theme() {
        let req: CreateMapRequest = serde_json::from_str(
            r#"{
                "name": "Whiteness",
                "theme": "Ahab",
                "selected_chapters": [42, -1],
                "annotations": {"42": {"annotation": "", "citations": ["", "the whale breached"]}}
            }"#,
        )
        .unwrap();
        let new_map = req.into_new_map().unwrap();
        assert_eq!(new_map.theme, Some(Theme::Ahab));
        assert_eq!(new_map.selected_chapters.len(), 2);
        let entry = &new_map.annotations[&Chapter::new(42).unwrap()];
        assert_eq!(entry.citations.len(), 2);
        assert!(new_map.relationships.is_empty());
    }

    #[test]
    fn relationships_parse_by_source_chapter() {
        let req: UpdateMapRequest = serde_json::from_str(
            r#"{"relationships": [
                {"source_chapter": 5, "related_chapters": [12, 40]},
                {"source_chapter": 5, "related_chapters": [41]}
            ]}"#,
        )
        .unwrap();
        let relationships = req.into_patch().unwrap().relationships.unwrap();
        assert_eq!(relationships.len(), 1);
        assert_eq!(
            relationships.get(Chapter::new(5).unwrap()),
            Some(&BTreeSet::from([Chapter::new(41).unwrap()]))
        );

        let bad = UpdateMapRequest {
            relationships: Some(vec![RelationshipDto {
                source_chapter: 5,
                related_chapters: vec![200],
            }]),
            ..Default::default()
        };
        assert!(bad.into_patch().is_err());
    }

    #[test]
    fn bad_chapters_and_themes_are_rejected() {
        assert!(parse_chapters(&[1, 999]).is_err());
        assert!(parse_theme("Starbuck").is_err());
        assert_eq!(parse_theme("  ").unwrap(), None);

        let req = UpdateMapRequest {
            annotations: Some(BTreeMap::from([("chapter-one".to_string(), AnnotationDto::default())])),
            ..Default::default()
        };
        assert!(req.into_patch().is_err());
    }

    #[test]
    fn empty_update_strings_clear_optional_fields() {
        let patch = UpdateMapRequest {
            theme: Some(String::new()),
            short_description: Some(" ".into()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.theme, Some(None));
        assert_eq!(patch.short_description, Some(None));
        assert_eq!(patch.name, None);
    }
}
