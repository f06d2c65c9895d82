//! Category co-occurrence graph.
//!
//! Each image contributes its distinct category set once: a category seen
//! five times in an image counts once for its node, and each unordered pair
//! of distinct categories in the image adds one to the pair's edge.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::index::AnnotationIndex;
use crate::ir::CategoryId;
use crate::stats::report::truncate_label;

/// A category and the number of images it appears in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: CategoryId,
    pub name: String,
    pub count: usize,
}

/// An unordered category pair, stored with `source < target`, and the
/// number of images containing both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: CategoryId,
    pub target: CategoryId,
    pub value: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoOccurrenceGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphEdge>,
}

impl CoOccurrenceGraph {
    /// Counts nodes and edges over every annotated image of `index`.
    pub fn build(index: &AnnotationIndex<'_>) -> Self {
        let mut node_counts: BTreeMap<CategoryId, usize> = BTreeMap::new();
        let mut pair_counts: BTreeMap<(CategoryId, CategoryId), usize> = BTreeMap::new();

        for group in index.groups() {
            let present: BTreeSet<CategoryId> =
                group.annotations.iter().map(|ann| ann.category_id).collect();
            let ids: Vec<CategoryId> = present.into_iter().collect();
            for (i, &a) in ids.iter().enumerate() {
                *node_counts.entry(a).or_insert(0) += 1;
                for &b in &ids[i + 1..] {
                    *pair_counts.entry((a, b)).or_insert(0) += 1;
                }
            }
        }

        let nodes = index
            .categories()
            .iter()
            .map(|category| GraphNode {
                id: category.id,
                name: category.name.clone(),
                count: node_counts.get(&category.id).copied().unwrap_or(0),
            })
            .collect();
        let links: Vec<GraphEdge> = pair_counts
            .into_iter()
            .map(|((source, target), value)| GraphEdge {
                source,
                target,
                value,
            })
            .collect();

        let graph = Self { nodes, links };
        match graph.weight_range() {
            Some((min, max)) => log::info!(
                "Co-occurrence graph: {} nodes, {} links, weights {}..={}",
                graph.nodes.len(),
                graph.links.len(),
                min,
                max
            ),
            None => log::info!(
                "Co-occurrence graph: {} nodes, no links",
                graph.nodes.len()
            ),
        }
        graph
    }

    /// Smallest and largest edge weight.
    pub fn weight_range(&self) -> Option<(usize, usize)> {
        let min = self.links.iter().map(|e| e.value).min()?;
        let max = self.links.iter().map(|e| e.value).max()?;
        Some((min, max))
    }

    pub fn node(&self, id: CategoryId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Weight of the pair in either order; 0 when never seen together.
    pub fn weight(&self, a: CategoryId, b: CategoryId) -> usize {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        self.links
            .binary_search_by(|e| (e.source, e.target).cmp(&(source, target)))
            .map(|pos| self.links[pos].value)
            .unwrap_or(0)
    }

    /// Adds counts from a graph built over a disjoint set of images.
    pub fn merge(&mut self, other: &CoOccurrenceGraph) {
        for theirs in &other.nodes {
            match self.nodes.iter_mut().find(|n| n.id == theirs.id) {
                Some(ours) => ours.count += theirs.count,
                None => self.nodes.push(theirs.clone()),
            }
        }

        let mut links: BTreeMap<(CategoryId, CategoryId), usize> = self
            .links
            .iter()
            .map(|e| ((e.source, e.target), e.value))
            .collect();
        for e in &other.links {
            *links.entry((e.source, e.target)).or_insert(0) += e.value;
        }
        self.links = links
            .into_iter()
            .map(|((source, target), value)| GraphEdge {
                source,
                target,
                value,
            })
            .collect();
    }
}

impl fmt::Display for CoOccurrenceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} nodes, {} links", self.nodes.len(), self.links.len())?;
        let name = |id: CategoryId| {
            self.node(id)
                .map(|n| truncate_label(&n.name, 20))
                .unwrap_or_else(|| id.to_string())
        };

        let mut strongest: Vec<&GraphEdge> = self.links.iter().collect();
        strongest.sort_by(|a, b| b.value.cmp(&a.value));
        for edge in strongest.into_iter().take(10) {
            writeln!(
                f,
                "  {:<20} + {:<20} {}",
                name(edge.source),
                name(edge.target),
                edge.value
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, BBox, Category, Dataset, Image};

    fn ann(id: u64, image: u64, category: u64) -> Annotation {
        Annotation::new(id, image, category, BBox::from_xywh(0.0, 0.0, 1.0, 1.0))
    }

    fn abc_dataset(annotations: Vec<Annotation>) -> Dataset {
        Dataset {
            categories: vec![
                Category::new(1u64, "A"),
                Category::new(2u64, "B"),
                Category::new(3u64, "C"),
                Category::new(4u64, "unused"),
            ],
            images: (1..=3u64)
                .map(|i| Image::new(i, format!("{i}.jpg"), 10, 10))
                .collect(),
            annotations,
        }
    }

    #[test]
    fn test_single_shared_pair_each() {
        // one image with {A, B}, one with {A, C}
        let dataset = abc_dataset(vec![ann(1, 1, 1), ann(2, 1, 2), ann(3, 2, 1), ann(4, 2, 3)]);
        let index = AnnotationIndex::build(&dataset);
        let graph = CoOccurrenceGraph::build(&index);

        let a = CategoryId::new(1);
        let b = CategoryId::new(2);
        let c = CategoryId::new(3);
        assert_eq!(graph.weight(a, b), 1);
        assert_eq!(graph.weight(c, a), 1);
        assert_eq!(graph.weight(b, c), 0);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn test_weight_counts_images_containing_both() {
        // two images with {A, B}, one with {A, C}
        let dataset = abc_dataset(vec![
            ann(1, 1, 1),
            ann(2, 1, 2),
            ann(3, 2, 1),
            ann(4, 2, 2),
            ann(5, 3, 1),
            ann(6, 3, 3),
        ]);
        let index = AnnotationIndex::build(&dataset);
        let graph = CoOccurrenceGraph::build(&index);

        assert_eq!(
            graph.links,
            vec![
                GraphEdge {
                    source: CategoryId::new(1),
                    target: CategoryId::new(2),
                    value: 2
                },
                GraphEdge {
                    source: CategoryId::new(1),
                    target: CategoryId::new(3),
                    value: 1
                },
            ]
        );
        assert_eq!(graph.weight_range(), Some((1, 2)));
    }

    #[test]
    fn test_repeated_instances_count_once() {
        let dataset = abc_dataset(vec![ann(1, 1, 1), ann(2, 1, 1), ann(3, 1, 1), ann(4, 1, 2)]);
        let index = AnnotationIndex::build(&dataset);
        let graph = CoOccurrenceGraph::build(&index);

        assert_eq!(graph.node(CategoryId::new(1)).map(|n| n.count), Some(1));
        assert_eq!(graph.weight(CategoryId::new(1), CategoryId::new(2)), 1);
        assert!(graph.links.iter().all(|e| e.source < e.target));
    }

    #[test]
    fn test_every_category_gets_a_node() {
        let dataset = abc_dataset(vec![ann(1, 1, 3)]);
        let index = AnnotationIndex::build(&dataset);
        let graph = CoOccurrenceGraph::build(&index);

        let names: Vec<&str> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "unused"]);
        assert_eq!(graph.node(CategoryId::new(4)).map(|n| n.count), Some(0));
        assert!(graph.links.is_empty());
        assert_eq!(graph.weight_range(), None);
    }

    #[test]
    fn test_merge_sums_nodes_and_links() {
        let dataset = abc_dataset(vec![ann(1, 1, 1), ann(2, 1, 2)]);
        let index = AnnotationIndex::build(&dataset);
        let mut graph = CoOccurrenceGraph::build(&index);
        let other = graph.clone();
        graph.merge(&other);

        assert_eq!(graph.node(CategoryId::new(1)).map(|n| n.count), Some(2));
        assert_eq!(graph.weight(CategoryId::new(1), CategoryId::new(2)), 2);
    }
}
