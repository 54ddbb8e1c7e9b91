//! crates/chapter_map_core/src/annotations.rs
//!
//! The in-memory annotation/citation store used while a map is being edited.
//!
//! Transient empty citations are legal here: a freshly added citation starts
//! blank. They are only pruned by [`normalize`], which runs when a map is
//! saved, never on every edit.

use crate::chapter::Chapter;
use crate::domain::{ChapterAnnotation, ChapterAnnotations, Citation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    #[error("Chapter {0} has no annotation entry")]
    NoEntry(Chapter),
    #[error("Chapter {chapter} has no citation at index {index}")]
    CitationOutOfRange { chapter: Chapter, index: usize },
}

/// Save-time cleanup: drops blank citations, then entries left with neither
/// text nor citations.
pub fn normalize(annotations: &mut ChapterAnnotations) {
    for entry in annotations.values_mut() {
        entry.citations.retain(|c| !c.is_blank());
    }
    annotations.retain(|_, entry| !entry.is_empty());
}

/// Per-chapter annotations plus the citation currently shown in the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStore {
    entries: ChapterAnnotations,
    active_citation: Option<(Chapter, usize)>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chapter: Chapter) -> Option<&ChapterAnnotation> {
        self.entries.get(&chapter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Chapter, &ChapterAnnotation)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_citation(&self) -> Option<(Chapter, usize)> {
        self.active_citation
    }

    /// Replaces the free text for `chapter`, creating the entry if absent.
    pub fn set_annotation_text(&mut self, chapter: Chapter, text: impl Into<String>) {
        self.entries.entry(chapter).or_default().annotation = text.into();
    }

    /// Appends an empty citation and makes it the active one. Returns its index.
    pub fn add_citation(&mut self, chapter: Chapter) -> usize {
        let entry = self.entries.entry(chapter).or_default();
        entry.citations.push(Citation::default());
        let index = entry.citations.len() - 1;
        self.active_citation = Some((chapter, index));
        index
    }

    pub fn update_citation(
        &mut self,
        chapter: Chapter,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), AnnotationError> {
        let citation = self
            .entries
            .get_mut(&chapter)
            .ok_or(AnnotationError::NoEntry(chapter))?
            .citations
            .get_mut(index)
            .ok_or(AnnotationError::CitationOutOfRange { chapter, index })?;
        citation.passage = text.into();
        Ok(())
    }

    /// Removes one citation. If the chapter is left with no text and no
    /// citations, the whole entry goes.
    pub fn delete_citation(&mut self, chapter: Chapter, index: usize) -> Result<Citation, AnnotationError> {
        let entry = self
            .entries
            .get_mut(&chapter)
            .ok_or(AnnotationError::NoEntry(chapter))?;
        if index >= entry.citations.len() {
            return Err(AnnotationError::CitationOutOfRange { chapter, index });
        }
        let removed = entry.citations.remove(index);
        if entry.is_empty() {
            self.entries.remove(&chapter);
        }

        self.active_citation = match self.active_citation {
            Some((c, i)) if c == chapter && i == index => None,
            Some((c, i)) if c == chapter && i > index => Some((c, i - 1)),
            other => other,
        };
        Ok(removed)
    }

    /// Drops everything recorded for `chapter`.
    pub fn remove_chapter(&mut self, chapter: Chapter) -> Option<ChapterAnnotation> {
        if matches!(self.active_citation, Some((c, _)) if c == chapter) {
            self.active_citation = None;
        }
        self.entries.remove(&chapter)
    }

    pub fn normalize(&mut self) {
        normalize(&mut self.entries);
        if let Some((chapter, index)) = self.active_citation {
            let still_there = self
                .entries
                .get(&chapter)
                .is_some_and(|e| index < e.citations.len());
            if !still_there {
                self.active_citation = None;
            }
        }
    }

    /// A normalized copy of the entries, ready to be persisted.
    pub fn to_persisted(&self) -> ChapterAnnotations {
        let mut entries = self.entries.clone();
        normalize(&mut entries);
        entries
    }
}

impl From<ChapterAnnotations> for AnnotationStore {
    fn from(entries: ChapterAnnotations) -> Self {
        Self {
            entries,
            active_citation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: i32) -> Chapter {
        Chapter::new(n).unwrap()
    }

    #[test]
    fn set_text_creates_and_replaces() {
        let mut store = AnnotationStore::new();
        store.set_annotation_text(ch(1), "Call me Ishmael");
        store.set_annotation_text(ch(1), "Loomings");
        assert_eq!(store.get(ch(1)).unwrap().annotation, "Loomings");
    }

    #[test]
    fn add_citation_marks_it_active() {
        let mut store = AnnotationStore::new();
        assert_eq!(store.add_citation(ch(3)), 0);
        assert_eq!(store.add_citation(ch(3)), 1);
        assert_eq!(store.active_citation(), Some((ch(3), 1)));
        assert_eq!(store.get(ch(3)).unwrap().citations.len(), 2);
    }

    #[test]
    fn update_rejects_bad_index() {
        let mut store = AnnotationStore::new();
        store.add_citation(ch(3));
        store.update_citation(ch(3), 0, "the whale breached").unwrap();
        assert_eq!(store.get(ch(3)).unwrap().citations[0].passage, "the whale breached");
        assert_eq!(
            store.update_citation(ch(3), 4, "x"),
            Err(AnnotationError::CitationOutOfRange { chapter: ch(3), index: 4 })
        );
        assert_eq!(store.update_citation(ch(9), 0, "x"), Err(AnnotationError::NoEntry(ch(9))));
    }

    #[test]
    fn deleting_only_citation_of_textless_chapter_removes_entry() {
        let mut store = AnnotationStore::new();
        store.add_citation(ch(7));
        store.update_citation(ch(7), 0, "a passage").unwrap();
        store.delete_citation(ch(7), 0).unwrap();
        assert!(store.get(ch(7)).is_none());
        assert_eq!(store.active_citation(), None);
    }

    #[test]
    fn deleting_one_of_two_citations_keeps_entry() {
        let mut store = AnnotationStore::new();
        store.add_citation(ch(7));
        store.add_citation(ch(7));
        store.update_citation(ch(7), 1, "second").unwrap();
        store.delete_citation(ch(7), 0).unwrap();

        let entry = store.get(ch(7)).unwrap();
        assert_eq!(entry.citations, vec![Citation::new("second")]);
        assert_eq!(store.active_citation(), Some((ch(7), 0)));
    }

    #[test]
    fn deleting_last_citation_keeps_entry_with_text() {
        let mut store = AnnotationStore::new();
        store.set_annotation_text(ch(2), "The Carpet-Bag");
        store.add_citation(ch(2));
        store.delete_citation(ch(2), 0).unwrap();
        assert!(store.get(ch(2)).is_some());
    }

    #[test]
    fn normalize_prunes_blank_citations_and_empty_entries() {
        let mut store = AnnotationStore::new();
        store.add_citation(ch(1));
        store.add_citation(ch(1));
        store.update_citation(ch(1), 1, "the whale breached").unwrap();
        store.add_citation(ch(2));
        store.update_citation(ch(2), 0, "   ").unwrap();

        let persisted = store.to_persisted();
        assert_eq!(persisted[&ch(1)].citations, vec![Citation::new("the whale breached")]);
        assert!(!persisted.contains_key(&ch(2)));

        // The in-memory store still holds the transient blanks.
        assert_eq!(store.get(ch(1)).unwrap().citations.len(), 2);
        store.normalize();
        assert_eq!(store.get(ch(1)).unwrap().citations.len(), 1);
        assert_eq!(store.active_citation(), None);
    }
}
