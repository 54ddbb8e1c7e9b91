//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser map editor and
//! the API server.

use chapter_map_core::chapter::Chapter;
use chapter_map_core::domain::{ChapterAnnotations, Theme};
use chapter_map_core::graph::GraphData;
use chapter_map_core::selection::{RelationshipMap, SelectionState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens an editing session. This must be the first message sent on the
    /// connection. Without a `map_id` a blank draft is started.
    Init {
        #[serde(default)]
        map_id: Option<Uuid>,
    },

    /// Changes any of the map's metadata. An empty `theme` clears it.
    SetDetails {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        short_description: Option<String>,
        #[serde(default)]
        is_public: Option<bool>,
        #[serde(default)]
        theme: Option<String>,
    },

    /// Adds a chapter to the flat selection, or removes it (with its annotations).
    ToggleChapter { chapter: Chapter },

    /// A click on a chapter button, fed to the relationship selection machine.
    ClickChapter { chapter: Chapter },

    /// Stores the current primary and related chapters as a relationship.
    CommitRelationship,

    /// Re-opens a stored relationship for editing.
    EditRelationship { chapter: Chapter },

    RemoveRelationship { chapter: Chapter },

    SetAnnotationText { chapter: Chapter, text: String },

    AddCitation { chapter: Chapter },

    UpdateCitation { chapter: Chapter, index: usize, text: String },

    DeleteCitation { chapter: Chapter, index: usize },

    /// Validates, normalises and persists the draft.
    Save,

    /// Deletes the map being edited. Ends the session.
    Delete,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// The draft as the editor should render it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DraftView {
    pub map_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub is_public: bool,
    pub theme: Option<Theme>,
    pub selected_chapters: Vec<Chapter>,
    pub annotations: ChapterAnnotations,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCitation {
    pub chapter: Chapter,
    pub index: usize,
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized { map_id: Option<Uuid> },

    /// Full editor state, sent after every accepted edit.
    State {
        draft: DraftView,
        selection: SelectionState,
        action_label: String,
        relationships: RelationshipMap,
        active_citation: Option<ActiveCitation>,
        /// Mirrors the disabled state of the save button.
        can_save: bool,
        graph: GraphData,
        relationship_graph: GraphData,
    },

    /// The draft was persisted.
    Saved { map_id: Uuid },

    /// The map was deleted; the server closes the connection afterwards.
    Deleted { map_id: Uuid },

    /// Reports an error to the client. The session stays open.
    Error { message: String },
}
