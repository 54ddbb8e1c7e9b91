//! crates/chapter_map_core/src/chapter.rs
//!
//! The chapter catalogue of the book: numbered chapters plus the three
//! special sections that sit outside the numbering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The first addressable chapter ("Extracts").
pub const FIRST_CHAPTER: i32 = -1;
/// The last addressable chapter ("Epilogue").
pub const LAST_CHAPTER: i32 = 136;

const SPECIAL_CHAPTERS: [(i32, &str); 3] = [(-1, "Extracts"), (0, "Etymology"), (136, "Epilogue")];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChapterError {
    #[error("Chapter {0} is outside the range {FIRST_CHAPTER}..={LAST_CHAPTER}")]
    OutOfRange(i32),
}

/// A validated chapter number in `-1..=136`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Chapter(i32);

impl Chapter {
    pub fn new(number: i32) -> Result<Self, ChapterError> {
        if (FIRST_CHAPTER..=LAST_CHAPTER).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ChapterError::OutOfRange(number))
        }
    }

    pub fn number(self) -> i32 {
        self.0
    }

    /// Every chapter in reading order: Extracts, Etymology, 1..=135, Epilogue.
    pub fn all() -> impl Iterator<Item = Chapter> {
        (FIRST_CHAPTER..=LAST_CHAPTER).map(Chapter)
    }

    pub fn is_special(self) -> bool {
        SPECIAL_CHAPTERS.iter().any(|(n, _)| *n == self.0)
    }

    /// Display title, e.g. "Etymology" or "Chapter 42".
    pub fn title(self) -> String {
        SPECIAL_CHAPTERS
            .iter()
            .find(|(n, _)| *n == self.0)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("Chapter {}", self.0))
    }
}

impl TryFrom<i32> for Chapter {
    type Error = ChapterError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Chapter::new(value)
    }
}

impl From<Chapter> for i32 {
    fn from(chapter: Chapter) -> Self {
        chapter.0
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_runs_from_extracts_to_epilogue() {
        let all: Vec<i32> = Chapter::all().map(Chapter::number).collect();
        assert_eq!(all.len(), 138);
        assert_eq!(all.first(), Some(&-1));
        assert_eq!(all[1], 0);
        assert_eq!(all.last(), Some(&136));
    }

    #[test]
    fn titles_name_the_special_sections() {
        assert_eq!(Chapter::new(-1).unwrap().title(), "Extracts");
        assert_eq!(Chapter::new(0).unwrap().title(), "Etymology");
        assert_eq!(Chapter::new(136).unwrap().title(), "Epilogue");
        assert_eq!(Chapter::new(42).unwrap().title(), "Chapter 42");
        assert!(!Chapter::new(42).unwrap().is_special());
    }

    #[test]
    fn rejects_numbers_outside_the_book() {
        assert_eq!(Chapter::new(137), Err(ChapterError::OutOfRange(137)));
        assert_eq!(Chapter::new(-2), Err(ChapterError::OutOfRange(-2)));
    }

    #[test]
    fn serde_validates_numbers() {
        let ok: Chapter = serde_json::from_str("12").unwrap();
        assert_eq!(ok.number(), 12);
        assert!(serde_json::from_str::<Chapter>("500").is_err());
    }
}
