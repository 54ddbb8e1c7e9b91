//! Property-based tests for the graph builder and like toggling.
//!
//! Invariants:
//! - A relationship graph has one node per distinct chapter named in it
//! - Connections summed over all nodes equal twice the number of links
//! - A selection graph is a hub plus one node per selected chapter
//! - Toggling a like an even number of times restores the like set

use chapter_map_core::chapter::{Chapter, FIRST_CHAPTER, LAST_CHAPTER};
use chapter_map_core::engagement::toggle_like;
use chapter_map_core::graph::{self, ChapterRelationship, NodeId};
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// Strategies
// ============================================================================

fn chapter() -> impl Strategy<Value = Chapter> {
    (FIRST_CHAPTER..=LAST_CHAPTER).prop_map(|n| Chapter::new(n).unwrap())
}

fn relationships() -> impl Strategy<Value = Vec<ChapterRelationship>> {
    prop::collection::vec(
        (chapter(), prop::collection::vec(chapter(), 0..8)).prop_map(|(source, related)| {
            ChapterRelationship {
                source_chapter: source,
                related_chapters: related,
            }
        }),
        0..12,
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn node_count_matches_distinct_chapters(rels in relationships()) {
        let graph = graph::from_relationships(&rels);
        let distinct: BTreeSet<Chapter> = rels
            .iter()
            .flat_map(|r| std::iter::once(r.source_chapter).chain(r.related_chapters.iter().copied()))
            .collect();
        prop_assert_eq!(graph.nodes.len(), distinct.len());
    }

    #[test]
    fn connections_sum_to_twice_the_pairs(rels in relationships()) {
        let graph = graph::from_relationships(&rels);
        let pairs: usize = rels.iter().map(|r| r.related_chapters.len()).sum();
        let total: usize = graph.nodes.iter().map(|n| n.connections).sum();
        prop_assert_eq!(graph.links.len(), pairs);
        prop_assert_eq!(total, 2 * pairs);
    }

    #[test]
    fn selection_graph_is_a_wheel(selected in prop::collection::btree_set(chapter(), 0..40)) {
        let graph = graph::from_selection("Theme", &selected);
        if selected.is_empty() {
            prop_assert!(graph.is_empty());
        } else {
            prop_assert_eq!(graph.nodes.len(), selected.len() + 1);
            prop_assert_eq!(graph.node(NodeId::Hub).unwrap().connections, selected.len());
            let total: usize = graph.nodes.iter().map(|n| n.connections).sum();
            prop_assert_eq!(total, 2 * graph.links.len());
        }
    }

    #[test]
    fn even_like_toggles_are_identity(
        seed in prop::collection::btree_set(any::<u128>(), 0..10),
        toggler in any::<u128>(),
        rounds in 1usize..5,
    ) {
        let original: BTreeSet<Uuid> = seed.into_iter().map(Uuid::from_u128).collect();
        let mut likes = original.clone();
        let user = Uuid::from_u128(toggler);
        for _ in 0..(rounds * 2) {
            toggle_like(&mut likes, user);
        }
        prop_assert_eq!(likes, original);
    }
}
