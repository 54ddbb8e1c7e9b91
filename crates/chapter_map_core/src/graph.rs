//! crates/chapter_map_core/src/graph.rs
//!
//! Builds node-link graph data for the relationship visualisation.
//!
//! Two inputs are supported: directed relationships (source chapter to a list
//! of related chapters) and a flat chapter selection, which is drawn as a
//! wheel around a synthetic hub node labelled with the map name.

use crate::chapter::Chapter;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

/// A directed association from one chapter to the chapters related to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRelationship {
    pub source_chapter: Chapter,
    pub related_chapters: Vec<Chapter>,
}

/// Identifies a node: either a chapter or the hub of a selection graph.
///
/// On the wire chapters are plain numbers and the hub is the string `"hub"`,
/// so the hub never collides with chapter 0 (Etymology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Hub,
    Chapter(Chapter),
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeId::Hub => serializer.serialize_str("hub"),
            NodeId::Chapter(c) => serializer.serialize_i32(c.number()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    /// Number of link endpoints touching this node.
    pub connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<Link>,
}

impl GraphData {
    /// An empty graph means "nothing to draw", not an error.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Places the hub in the centre and the chapter nodes on a circle,
    /// starting at twelve o'clock and going clockwise.
    pub fn radial_layout(&mut self, width: f64, height: f64) {
        let (cx, cy) = (width / 2.0, height / 2.0);
        let radius = width.min(height) / 2.5;
        let total = self
            .nodes
            .iter()
            .filter(|n| n.id != NodeId::Hub)
            .count();

        let mut index = 0usize;
        for node in &mut self.nodes {
            if node.id == NodeId::Hub {
                node.x = Some(cx);
                node.y = Some(cy);
                continue;
            }
            let angle = (index as f64) * 2.0 * std::f64::consts::PI / (total as f64);
            node.x = Some(cx + radius * angle.sin());
            node.y = Some(cy - radius * angle.cos());
            index += 1;
        }
    }
}

/// Accumulates nodes in first-appearance order.
#[derive(Default)]
struct Builder {
    graph: GraphData,
    index: HashMap<NodeId, usize>,
}

impl Builder {
    fn touch(&mut self, id: NodeId, label: impl FnOnce() -> String) -> usize {
        if let Some(&i) = self.index.get(&id) {
            return i;
        }
        let i = self.graph.nodes.len();
        self.graph.nodes.push(GraphNode {
            id,
            label: label(),
            connections: 0,
            x: None,
            y: None,
        });
        self.index.insert(id, i);
        i
    }

    fn touch_chapter(&mut self, chapter: Chapter) -> usize {
        self.touch(NodeId::Chapter(chapter), || chapter.number().to_string())
    }

    fn link(&mut self, source: usize, target: usize) {
        self.graph.nodes[source].connections += 1;
        self.graph.nodes[target].connections += 1;
        let link = Link {
            source: self.graph.nodes[source].id,
            target: self.graph.nodes[target].id,
        };
        self.graph.links.push(link);
    }
}

/// Graph of directed relationships. Every chapter named as a source or a
/// target becomes one node; every (source, target) pair becomes one link,
/// duplicates included.
pub fn from_relationships(relationships: &[ChapterRelationship]) -> GraphData {
    let mut builder = Builder::default();
    for relationship in relationships {
        let source = builder.touch_chapter(relationship.source_chapter);
        for &related in &relationship.related_chapters {
            let target = builder.touch_chapter(related);
            builder.link(source, target);
        }
    }
    builder.graph
}

/// Graph of a flat selection: a hub labelled `map_name` linked to every
/// selected chapter. An empty selection yields an empty graph.
pub fn from_selection(map_name: &str, selected: &BTreeSet<Chapter>) -> GraphData {
    let mut builder = Builder::default();
    if selected.is_empty() {
        return builder.graph;
    }
    let hub = builder.touch(NodeId::Hub, || map_name.to_string());
    for &chapter in selected {
        let node = builder.touch_chapter(chapter);
        builder.link(hub, node);
    }
    builder.graph
}
