//! crates/chapter_map_core/src/service.rs
//!
//! Application operations on maps. Every operation takes the caller's
//! [`Viewer`] explicitly and enforces sign-in, ownership and visibility before
//! touching the repository.

use crate::annotations::normalize;
use crate::chapter::Chapter;
use crate::domain::{
    ChapterAnnotations, ChapterMap, Comment, CommentId, MapId, MapPatch, NewMap, UserId,
};
use crate::engagement::new_comment;
use crate::graph::{self, GraphData};
use crate::ports::{MapRepository, PortError, PortResult};
use crate::selection::RelationshipMap;
use crate::viewer::Viewer;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Width and height of the canvas graph positions are computed for.
pub const GRAPH_CANVAS: f64 = 600.0;

#[derive(Clone)]
pub struct MapService {
    repo: Arc<dyn MapRepository>,
}

impl MapService {
    pub fn new(repo: Arc<dyn MapRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_map(&self, viewer: &Viewer, new_map: NewMap) -> PortResult<ChapterMap> {
        let user = viewer.require_user()?;
        let name = validated_name(&new_map.name)?;
        validate_selection(&new_map.selected_chapters)?;

        let now = Utc::now();
        let map = ChapterMap {
            id: Uuid::new_v4(),
            name,
            description: new_map.description,
            short_description: new_map.short_description,
            user_id: user.id,
            user_name: user.author_name(),
            is_public: new_map.is_public,
            theme: new_map.theme,
            annotations: prepared_annotations(new_map.annotations, &new_map.selected_chapters),
            relationships: prepared_relationships(new_map.relationships, &new_map.selected_chapters),
            selected_chapters: new_map.selected_chapters,
            likes: BTreeSet::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.repo.create_map(map).await
    }

    pub async fn update_map(
        &self,
        viewer: &Viewer,
        map_id: MapId,
        patch: MapPatch,
    ) -> PortResult<ChapterMap> {
        let mut map = self.owned_map(viewer, map_id).await?;
        patch.apply_to(&mut map);

        map.name = validated_name(&map.name)?;
        validate_selection(&map.selected_chapters)?;
        map.annotations = prepared_annotations(std::mem::take(&mut map.annotations), &map.selected_chapters);
        map.relationships =
            prepared_relationships(std::mem::take(&mut map.relationships), &map.selected_chapters);
        map.updated_at = Utc::now();

        self.repo.update_map(&map).await?;
        Ok(map)
    }

    pub async fn delete_map(&self, viewer: &Viewer, map_id: MapId) -> PortResult<()> {
        self.owned_map(viewer, map_id).await?;
        self.repo.delete_map(map_id).await
    }

    /// Public maps are readable by anyone; private maps only by their owner.
    pub async fn get_map(&self, viewer: &Viewer, map_id: MapId) -> PortResult<ChapterMap> {
        let map = self.repo.get_map(map_id).await?;
        if map.is_public || viewer.user_id() == Some(map.user_id) {
            Ok(map)
        } else {
            Err(PortError::NotFound(format!("Map {} not found", map_id)))
        }
    }

    pub async fn list_public_maps(&self) -> PortResult<Vec<ChapterMap>> {
        let mut maps = self.repo.list_public_maps().await?;
        newest_first(&mut maps);
        Ok(maps)
    }

    /// The viewer's own maps; anonymous viewers simply have none.
    pub async fn list_my_maps(&self, viewer: &Viewer) -> PortResult<Vec<ChapterMap>> {
        let Some(user_id) = viewer.user_id() else {
            return Ok(Vec::new());
        };
        let mut maps = self.repo.list_user_maps(user_id).await?;
        newest_first(&mut maps);
        Ok(maps)
    }

    pub async fn toggle_like(&self, viewer: &Viewer, map_id: MapId) -> PortResult<BTreeSet<UserId>> {
        let user_id = viewer.require_user()?.id;
        self.get_map(viewer, map_id).await?;
        self.repo.toggle_like(map_id, user_id).await
    }

    pub async fn add_comment(&self, viewer: &Viewer, map_id: MapId, text: &str) -> PortResult<Comment> {
        let comment = new_comment(viewer, text)?;
        self.get_map(viewer, map_id).await?;
        self.repo.append_comment(map_id, comment.clone()).await?;
        Ok(comment)
    }

    pub async fn toggle_comment_like(
        &self,
        viewer: &Viewer,
        map_id: MapId,
        comment_id: CommentId,
    ) -> PortResult<BTreeSet<UserId>> {
        let user_id = viewer.require_user()?.id;
        self.get_map(viewer, map_id).await?;
        self.repo.toggle_comment_like(map_id, comment_id, user_id).await
    }

    /// The hub-and-spokes graph of a map, laid out on the default canvas.
    pub async fn map_graph(&self, viewer: &Viewer, map_id: MapId) -> PortResult<GraphData> {
        let map = self.get_map(viewer, map_id).await?;
        let mut graph = graph::from_selection(&map.name, &map.selected_chapters);
        graph.radial_layout(GRAPH_CANVAS, GRAPH_CANVAS);
        Ok(graph)
    }

    async fn owned_map(&self, viewer: &Viewer, map_id: MapId) -> PortResult<ChapterMap> {
        let user_id = viewer.require_user()?.id;
        let map = self.repo.get_map(map_id).await?;
        if !map.is_owned_by(user_id) {
            return Err(PortError::Forbidden(format!(
                "Map {} belongs to another user",
                map_id
            )));
        }
        Ok(map)
    }
}

fn validated_name(name: &str) -> PortResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortError::Invalid("Map name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn validate_selection(selected: &BTreeSet<Chapter>) -> PortResult<()> {
    if selected.is_empty() {
        return Err(PortError::Invalid("Select at least one chapter".to_string()));
    }
    Ok(())
}

/// Save-time normalisation plus dropping entries for chapters no longer selected.
fn prepared_annotations(
    mut annotations: ChapterAnnotations,
    selected: &BTreeSet<Chapter>,
) -> ChapterAnnotations {
    annotations.retain(|chapter, _| selected.contains(chapter));
    normalize(&mut annotations);
    annotations
}

fn prepared_relationships(
    mut relationships: RelationshipMap,
    selected: &BTreeSet<Chapter>,
) -> RelationshipMap {
    relationships.retain_selected(selected);
    relationships
}

fn newest_first(maps: &mut [ChapterMap]) {
    maps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChapterAnnotation, Citation};

    fn ch(n: i32) -> Chapter {
        Chapter::new(n).unwrap()
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(validated_name("  Whiteness ").unwrap(), "Whiteness");
        assert!(matches!(validated_name("   "), Err(PortError::Invalid(_))));
    }

    #[test]
    fn empty_selection_is_invalid() {
        assert!(matches!(validate_selection(&BTreeSet::new()), Err(PortError::Invalid(_))));
    }

    #[test]
    fn saving_prunes_blank_citations_and_unselected_chapters() {
        let mut annotations = ChapterAnnotations::new();
        annotations.insert(
            ch(1),
            ChapterAnnotation {
                annotation: String::new(),
                citations: vec![Citation::new(""), Citation::new("the whale breached")],
            },
        );
        annotations.insert(
            ch(2),
            ChapterAnnotation {
                annotation: "dropped".into(),
                citations: Vec::new(),
            },
        );

        let prepared = prepared_annotations(annotations, &BTreeSet::from([ch(1)]));
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[&ch(1)].citations, vec![Citation::new("the whale breached")]);
    }

    #[test]
    fn saving_drops_relationships_to_unselected_chapters() {
        let mut relationships = RelationshipMap::new();
        relationships.insert(ch(5), BTreeSet::from([ch(12), ch(40)]));
        relationships.insert(ch(40), BTreeSet::from([ch(5)]));

        let prepared = prepared_relationships(relationships, &BTreeSet::from([ch(5), ch(12)]));
        assert_eq!(prepared.get(ch(5)), Some(&BTreeSet::from([ch(12)])));
        assert_eq!(prepared.get(ch(40)), None);
    }
}
