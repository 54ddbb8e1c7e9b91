//! services/api/src/web/editor.rs
//!
//! The state of one map-editing WebSocket session: the draft map, the
//! relationship selection machine and the annotation store, plus the logic
//! that applies client messages to them.

use crate::web::protocol::{ActiveCitation, ClientMessage, DraftView, ServerMessage};
use crate::web::state::AppState;
use chapter_map_core::annotations::{AnnotationError, AnnotationStore};
use chapter_map_core::chapter::Chapter;
use chapter_map_core::domain::{MapId, MapPatch, NewMap, Theme};
use chapter_map_core::graph;
use chapter_map_core::ports::{PortError, PortResult};
use chapter_map_core::selection::{RelationshipMap, SelectionMachine};
use chapter_map_core::viewer::Viewer;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("{0}")]
    Annotation(#[from] AnnotationError),
    #[error("Chapter {0} is not selected")]
    NotSelected(Chapter),
    #[error("No relationship is stored for chapter {0}")]
    NoRelationship(Chapter),
    #[error("Unknown theme: {0}")]
    InvalidTheme(String),
    #[error("This map has not been saved yet")]
    NotSaved,
    #[error("Session already initialized")]
    AlreadyInitialized,
    #[error("{0}")]
    Port(#[from] PortError),
}

/// What the control loop should do after a message was applied.
#[derive(Debug)]
pub enum Outcome {
    /// Send the updated state snapshot.
    Updated,
    Saved(MapId),
    Deleted(MapId),
}

/// One open editing session.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    pub map_id: Option<MapId>,
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub is_public: bool,
    pub theme: Option<Theme>,
    pub selected: BTreeSet<Chapter>,
    pub annotations: AnnotationStore,
    pub selection: SelectionMachine,
    pub relationships: RelationshipMap,
}

impl EditorSession {
    /// A blank draft for a new map.
    pub fn new_draft() -> Self {
        Self::default()
    }

    /// Loads one of the viewer's own maps into a session.
    pub async fn load(app_state: &AppState, viewer: &Viewer, map_id: MapId) -> PortResult<Self> {
        let user_id = viewer.require_user()?.id;
        let map = app_state.maps.get_map(viewer, map_id).await?;
        if !map.is_owned_by(user_id) {
            return Err(PortError::Forbidden(format!("Map {} belongs to another user", map_id)));
        }
        Ok(Self {
            map_id: Some(map.id),
            name: map.name,
            description: map.description,
            short_description: map.short_description,
            is_public: map.is_public,
            theme: map.theme,
            selected: map.selected_chapters,
            annotations: AnnotationStore::from(map.annotations),
            selection: SelectionMachine::new(),
            relationships: map.relationships,
        })
    }

    /// The save button is only enabled with a name and at least one chapter.
    pub fn can_save(&self) -> bool {
        !self.name.trim().is_empty() && !self.selected.is_empty()
    }

    /// Applies every message that only touches in-memory state.
    pub fn apply_edit(&mut self, msg: ClientMessage) -> Result<(), EditorError> {
        match msg {
            ClientMessage::Init { .. } => return Err(EditorError::AlreadyInitialized),
            ClientMessage::SetDetails {
                name,
                description,
                short_description,
                is_public,
                theme,
            } => {
                let theme = theme
                    .map(|t| match t.trim() {
                        "" => Ok(None),
                        label => label
                            .parse::<Theme>()
                            .map(Some)
                            .map_err(|_| EditorError::InvalidTheme(label.to_string())),
                    })
                    .transpose()?;
                if let Some(name) = name {
                    self.name = name;
                }
                if let Some(description) = description {
                    self.description = description;
                }
                if let Some(short) = short_description {
                    self.short_description = Some(short).filter(|s| !s.trim().is_empty());
                }
                if let Some(is_public) = is_public {
                    self.is_public = is_public;
                }
                if let Some(theme) = theme {
                    self.theme = theme;
                }
            }
            ClientMessage::ToggleChapter { chapter } => {
                if !self.selected.remove(&chapter) {
                    self.selected.insert(chapter);
                } else {
                    self.annotations.remove_chapter(chapter);
                    self.relationships.remove_chapter(chapter);
                    if self.selection.primary() == Some(chapter) {
                        self.selection.reset();
                    }
                }
            }
            ClientMessage::ClickChapter { chapter } => self.selection.click(chapter),
            ClientMessage::CommitRelationship => {
                if let Some(primary) = self.selection.commit(&mut self.relationships) {
                    self.selected.insert(primary);
                    if let Some(related) = self.relationships.get(primary) {
                        self.selected.extend(related.iter().copied());
                    }
                }
            }
            ClientMessage::EditRelationship { chapter } => {
                if !self.selection.edit(chapter, &self.relationships) {
                    return Err(EditorError::NoRelationship(chapter));
                }
            }
            ClientMessage::RemoveRelationship { chapter } => {
                self.relationships.remove(chapter);
                if self.selection.primary() == Some(chapter) {
                    self.selection.reset();
                }
            }
            ClientMessage::SetAnnotationText { chapter, text } => {
                self.require_selected(chapter)?;
                self.annotations.set_annotation_text(chapter, text);
            }
            ClientMessage::AddCitation { chapter } => {
                self.require_selected(chapter)?;
                self.annotations.add_citation(chapter);
            }
            ClientMessage::UpdateCitation { chapter, index, text } => {
                self.annotations.update_citation(chapter, index, text)?;
            }
            ClientMessage::DeleteCitation { chapter, index } => {
                self.annotations.delete_citation(chapter, index)?;
            }
            ClientMessage::Save | ClientMessage::Delete => {}
        }
        Ok(())
    }

    fn require_selected(&self, chapter: Chapter) -> Result<(), EditorError> {
        if self.selected.contains(&chapter) {
            Ok(())
        } else {
            Err(EditorError::NotSelected(chapter))
        }
    }

    /// Persists the draft, creating the map on first save.
    pub async fn save(&mut self, app_state: &AppState, viewer: &Viewer) -> Result<MapId, EditorError> {
        let annotations = self.annotations.to_persisted();
        let map = match self.map_id {
            Some(map_id) => {
                let patch = MapPatch {
                    name: Some(self.name.clone()),
                    description: Some(self.description.clone()),
                    short_description: Some(self.short_description.clone()),
                    is_public: Some(self.is_public),
                    theme: Some(self.theme),
                    selected_chapters: Some(self.selected.clone()),
                    relationships: Some(self.relationships.clone()),
                    annotations: Some(annotations),
                };
                app_state.maps.update_map(viewer, map_id, patch).await?
            }
            None => {
                let new_map = NewMap {
                    name: self.name.clone(),
                    description: self.description.clone(),
                    short_description: self.short_description.clone(),
                    is_public: self.is_public,
                    theme: self.theme,
                    selected_chapters: self.selected.clone(),
                    relationships: self.relationships.clone(),
                    annotations,
                };
                app_state.maps.create_map(viewer, new_map).await?
            }
        };

        info!("Editor saved map {}", map.id);
        self.map_id = Some(map.id);
        self.name = map.name;
        self.relationships = map.relationships;
        self.annotations = AnnotationStore::from(map.annotations);
        Ok(map.id)
    }

    pub async fn delete(&self, app_state: &AppState, viewer: &Viewer) -> Result<MapId, EditorError> {
        let map_id = self.map_id.ok_or(EditorError::NotSaved)?;
        app_state.maps.delete_map(viewer, map_id).await?;
        info!("Editor deleted map {}", map_id);
        Ok(map_id)
    }

    /// Routes one message to the in-memory edit or the persisting operations.
    pub async fn handle(
        &mut self,
        app_state: &AppState,
        viewer: &Viewer,
        msg: ClientMessage,
    ) -> Result<Outcome, EditorError> {
        match msg {
            ClientMessage::Save => self.save(app_state, viewer).await.map(Outcome::Saved),
            ClientMessage::Delete => self.delete(app_state, viewer).await.map(Outcome::Deleted),
            other => self.apply_edit(other).map(|_| Outcome::Updated),
        }
    }

    /// An unnamed draft's hub reads "Theme".
    fn hub_label(&self) -> &str {
        match self.name.trim() {
            "" => "Theme",
            name => name,
        }
    }

    /// The snapshot sent to the client after each accepted message.
    pub fn snapshot(&self) -> ServerMessage {
        let mut graph = graph::from_selection(self.hub_label(), &self.selected);
        graph.radial_layout(
            chapter_map_core::service::GRAPH_CANVAS,
            chapter_map_core::service::GRAPH_CANVAS,
        );
        let relationship_graph = graph::from_relationships(&self.relationships.to_relationships());

        ServerMessage::State {
            draft: DraftView {
                map_id: self.map_id,
                name: self.name.clone(),
                description: self.description.clone(),
                short_description: self.short_description.clone(),
                is_public: self.is_public,
                theme: self.theme,
                selected_chapters: self.selected.iter().copied().collect(),
                annotations: self.annotations.iter().map(|(c, a)| (*c, a.clone())).collect(),
            },
            selection: self.selection.state().clone(),
            action_label: self.selection.action_label().to_string(),
            relationships: self.relationships.clone(),
            active_citation: self
                .annotations
                .active_citation()
                .map(|(chapter, index)| ActiveCitation { chapter, index }),
            can_save: self.can_save(),
            graph,
            relationship_graph,
        }
    }
}
