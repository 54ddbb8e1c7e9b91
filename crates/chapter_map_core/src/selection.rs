//! crates/chapter_map_core/src/selection.rs
//!
//! The chapter selection state machine driven by chapter-button clicks, and
//! the relationship map its commits are written into.

use crate::chapter::Chapter;
use crate::graph::ChapterRelationship;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Committed relationships, keyed by primary chapter. Stored with the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipMap(BTreeMap<Chapter, BTreeSet<Chapter>>);

impl RelationshipMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, primary: Chapter) -> Option<&BTreeSet<Chapter>> {
        self.0.get(&primary)
    }

    pub fn insert(&mut self, primary: Chapter, related: BTreeSet<Chapter>) {
        self.0.insert(primary, related);
    }

    pub fn remove(&mut self, primary: Chapter) -> Option<BTreeSet<Chapter>> {
        self.0.remove(&primary)
    }

    /// Drops `chapter` as a primary and from every related set.
    pub fn remove_chapter(&mut self, chapter: Chapter) {
        self.0.remove(&chapter);
        for related in self.0.values_mut() {
            related.remove(&chapter);
        }
    }

    /// Keeps only relationships between chapters in `selected`.
    pub fn retain_selected(&mut self, selected: &BTreeSet<Chapter>) {
        self.0.retain(|primary, _| selected.contains(primary));
        for related in self.0.values_mut() {
            related.retain(|c| selected.contains(c));
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every chapter mentioned as a primary or as a related chapter.
    pub fn chapters(&self) -> BTreeSet<Chapter> {
        self.0
            .iter()
            .flat_map(|(primary, related)| std::iter::once(*primary).chain(related.iter().copied()))
            .collect()
    }

    /// The graph builder's input shape.
    pub fn to_relationships(&self) -> Vec<ChapterRelationship> {
        self.0
            .iter()
            .map(|(primary, related)| ChapterRelationship {
                source_chapter: *primary,
                related_chapters: related.iter().copied().collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    NoPrimary,
    PrimarySelected {
        primary: Chapter,
        related: BTreeSet<Chapter>,
        /// Set when re-entered from a stored relationship; only changes the label.
        editing: bool,
    },
}

/// Tracks a primary chapter and the set of chapters related to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMachine {
    state: SelectionState,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn primary(&self) -> Option<Chapter> {
        match &self.state {
            SelectionState::NoPrimary => None,
            SelectionState::PrimarySelected { primary, .. } => Some(*primary),
        }
    }

    pub fn related(&self) -> Option<&BTreeSet<Chapter>> {
        match &self.state {
            SelectionState::NoPrimary => None,
            SelectionState::PrimarySelected { related, .. } => Some(related),
        }
    }

    /// Label for the commit button.
    pub fn action_label(&self) -> &'static str {
        match self.state {
            SelectionState::PrimarySelected { editing: true, .. } => "Update",
            _ => "Add",
        }
    }

    /// Applies a click on `chapter`.
    pub fn click(&mut self, chapter: Chapter) {
        let next = match &mut self.state {
            SelectionState::NoPrimary => Some(SelectionState::PrimarySelected {
                primary: chapter,
                related: BTreeSet::new(),
                editing: false,
            }),
            SelectionState::PrimarySelected { primary, .. } if *primary == chapter => {
                Some(SelectionState::NoPrimary)
            }
            SelectionState::PrimarySelected { related, .. } => {
                if !related.remove(&chapter) {
                    related.insert(chapter);
                }
                None
            }
        };
        if let Some(next) = next {
            self.state = next;
        }
    }

    /// Snapshots the current pair into `relationships` keyed by the primary
    /// and resets. Returns the committed primary, or `None` when nothing was
    /// selected.
    pub fn commit(&mut self, relationships: &mut RelationshipMap) -> Option<Chapter> {
        match std::mem::take(&mut self.state) {
            SelectionState::NoPrimary => None,
            SelectionState::PrimarySelected { primary, related, .. } => {
                relationships.insert(primary, related);
                Some(primary)
            }
        }
    }

    /// Re-enters `PrimarySelected` with the related set stored for `primary`.
    /// Returns `false` and leaves the state alone when nothing is stored.
    pub fn edit(&mut self, primary: Chapter, relationships: &RelationshipMap) -> bool {
        let Some(related) = relationships.get(primary) else {
            return false;
        };
        self.state = SelectionState::PrimarySelected {
            primary,
            related: related.clone(),
            editing: true,
        };
        true
    }

    pub fn reset(&mut self) {
        self.state = SelectionState::NoPrimary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: i32) -> Chapter {
        Chapter::new(n).unwrap()
    }

    #[test]
    fn click_walkthrough() {
        let mut machine = SelectionMachine::new();
        assert_eq!(machine.state(), &SelectionState::NoPrimary);

        machine.click(ch(5));
        assert_eq!(machine.primary(), Some(ch(5)));
        assert!(machine.related().unwrap().is_empty());

        machine.click(ch(12));
        assert_eq!(machine.related().unwrap(), &BTreeSet::from([ch(12)]));

        machine.click(ch(12));
        assert!(machine.related().unwrap().is_empty());

        machine.click(ch(5));
        assert_eq!(machine.state(), &SelectionState::NoPrimary);
    }

    #[test]
    fn commit_snapshots_and_resets() {
        let mut machine = SelectionMachine::new();
        let mut relationships = RelationshipMap::new();

        assert_eq!(machine.commit(&mut relationships), None);

        machine.click(ch(5));
        machine.click(ch(12));
        machine.click(ch(40));
        assert_eq!(machine.commit(&mut relationships), Some(ch(5)));
        assert_eq!(machine.state(), &SelectionState::NoPrimary);
        assert_eq!(relationships.get(ch(5)), Some(&BTreeSet::from([ch(12), ch(40)])));
        assert_eq!(relationships.chapters(), BTreeSet::from([ch(5), ch(12), ch(40)]));
    }

    #[test]
    fn editing_prepopulates_and_only_changes_label() {
        let mut relationships = RelationshipMap::new();
        relationships.insert(ch(5), BTreeSet::from([ch(12)]));

        let mut machine = SelectionMachine::new();
        assert_eq!(machine.action_label(), "Add");
        assert!(machine.edit(ch(5), &relationships));
        assert_eq!(machine.action_label(), "Update");
        assert_eq!(machine.related().unwrap(), &BTreeSet::from([ch(12)]));

        machine.click(ch(12));
        machine.click(ch(99));
        machine.commit(&mut relationships);
        assert_eq!(relationships.get(ch(5)), Some(&BTreeSet::from([ch(99)])));
        assert_eq!(relationships.len(), 1);
    }

    #[test]
    fn editing_an_unknown_primary_changes_nothing() {
        let mut machine = SelectionMachine::new();
        assert!(!machine.edit(ch(77), &RelationshipMap::new()));
        assert_eq!(machine.state(), &SelectionState::NoPrimary);
        assert_eq!(machine.action_label(), "Add");

        machine.click(ch(3));
        assert!(!machine.edit(ch(77), &RelationshipMap::new()));
        assert_eq!(machine.primary(), Some(ch(3)));
        assert_eq!(machine.action_label(), "Add");
    }

    #[test]
    fn pruning_a_chapter_reaches_every_related_set() {
        let mut relationships = RelationshipMap::new();
        relationships.insert(ch(1), BTreeSet::from([ch(2), ch(3)]));
        relationships.insert(ch(2), BTreeSet::from([ch(3)]));

        relationships.remove_chapter(ch(2));
        assert_eq!(relationships.get(ch(1)), Some(&BTreeSet::from([ch(3)])));
        assert_eq!(relationships.get(ch(2)), None);

        relationships.retain_selected(&BTreeSet::from([ch(1)]));
        assert_eq!(relationships.get(ch(1)), Some(&BTreeSet::new()));
        assert_eq!(relationships.chapters(), BTreeSet::from([ch(1)]));
    }

    #[test]
    fn relationship_map_round_trips_through_json() {
        let mut relationships = RelationshipMap::new();
        relationships.insert(ch(-1), BTreeSet::from([ch(0), ch(136)]));
        let json = serde_json::to_string(&relationships).unwrap();
        assert_eq!(json, r#"{"-1":[0,136]}"#);
        assert_eq!(serde_json::from_str::<RelationshipMap>(&json).unwrap(), relationships);
    }

    #[test]
    fn relationships_feed_the_graph_builder() {
        let mut relationships = RelationshipMap::new();
        relationships.insert(ch(1), BTreeSet::from([ch(2), ch(3)]));
        let rels = relationships.to_relationships();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].related_chapters, vec![ch(2), ch(3)]);
    }
}
