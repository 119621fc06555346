//! core::graph
//!
//! Parent-pointer hierarchy over element ids.
//!
//! # Architecture
//!
//! A [`HierarchyGraph`] is a snapshot of one parent relation:
//! - class → superclass for inheritance
//! - package → parent package for nesting
//!
//! Nodes are element ids, edges point from child to parent. The graph is
//! built from records or from the live model and never mutates either.
//!
//! # Invariants
//!
//! - A healthy hierarchy is acyclic ([`HierarchyGraph::find_cycle`])
//! - Iteration orders are deterministic (ascending id)

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::types::ElementId;

/// One parent relation over element ids.
#[derive(Debug, Default, Clone)]
pub struct HierarchyGraph {
    /// Every known node, including roots without a parent
    nodes: BTreeSet<ElementId>,
    /// Parent pointer for each node that has one
    parents: BTreeMap<ElementId, ElementId>,
    /// Children sets (derived from parents)
    children: BTreeMap<ElementId, BTreeSet<ElementId>>,
}

impl HierarchyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, with its parent if it has one.
    ///
    /// A `None` parent (or the `0` sentinel) makes the node a root.
    pub fn add_node(&mut self, node: ElementId, parent: Option<ElementId>) {
        self.nodes.insert(node);
        if let Some(parent) = parent.and_then(ElementId::to_option) {
            self.add_edge(node, parent);
        }
    }

    /// Add a parent relationship.
    pub fn add_edge(&mut self, child: ElementId, parent: ElementId) {
        self.nodes.insert(child);
        self.nodes.insert(parent);
        if let Some(old) = self.parents.insert(child, parent) {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.remove(&child);
            }
        }
        self.children.entry(parent).or_default().insert(child);
    }

    pub fn parent(&self, node: ElementId) -> Option<ElementId> {
        self.parents.get(&node).copied()
    }

    /// Direct children, ascending.
    pub fn children(&self, node: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.children.get(&node).into_iter().flatten().copied()
    }

    pub fn contains(&self, node: ElementId) -> bool {
        self.nodes.contains(&node)
    }

    /// All nodes, ascending.
    pub fn nodes(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.nodes.iter().copied()
    }

    /// Check if the graph contains cycles.
    ///
    /// Returns `Some(node)` for the smallest node whose parent chain loops.
    pub fn find_cycle(&self) -> Option<ElementId> {
        let mut visited = BTreeSet::new();
        let mut path = BTreeSet::new();

        self.parents
            .keys()
            .copied()
            .find(|&node| self.has_cycle_from(node, &mut visited, &mut path))
    }

    fn has_cycle_from(
        &self,
        node: ElementId,
        visited: &mut BTreeSet<ElementId>,
        path: &mut BTreeSet<ElementId>,
    ) -> bool {
        if path.contains(&node) {
            return true;
        }
        if !visited.insert(node) {
            return false;
        }

        path.insert(node);
        if let Some(parent) = self.parent(node) {
            if self.has_cycle_from(parent, visited, path) {
                return true;
            }
        }
        path.remove(&node);
        false
    }

    /// All descendants (children, grandchildren, etc.), breadth first.
    ///
    /// # Example
    ///
    /// ```
    /// use schemata::core::graph::HierarchyGraph;
    /// use schemata::core::types::ElementId;
    ///
    /// let (animal, dog, puppy) = (ElementId::new(2), ElementId::new(3), ElementId::new(4));
    /// let mut graph = HierarchyGraph::new();
    /// graph.add_edge(dog, animal);
    /// graph.add_edge(puppy, dog);
    ///
    /// let descendants = graph.descendants(animal);
    /// assert!(descendants.contains(&dog));
    /// assert!(descendants.contains(&puppy));
    /// ```
    pub fn descendants(&self, node: ElementId) -> BTreeSet<ElementId> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<_> = self.children(node).collect();

        while let Some(current) = queue.pop_front() {
            if result.insert(current) {
                queue.extend(self.children(current));
            }
        }

        result
    }

    /// All ancestors, from the immediate parent up to the root.
    ///
    /// Stops early if the chain loops back on itself.
    ///
    /// # Example
    ///
    /// ```
    /// use schemata::core::graph::HierarchyGraph;
    /// use schemata::core::types::ElementId;
    ///
    /// let (animal, dog, puppy) = (ElementId::new(2), ElementId::new(3), ElementId::new(4));
    /// let mut graph = HierarchyGraph::new();
    /// graph.add_edge(dog, animal);
    /// graph.add_edge(puppy, dog);
    ///
    /// assert_eq!(graph.ancestors(puppy), vec![dog, animal]);
    /// ```
    pub fn ancestors(&self, node: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut seen = BTreeSet::from([node]);
        let mut current = self.parent(node);

        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            result.push(parent);
            current = self.parent(parent);
        }

        result
    }

    /// Depth of a node: the number of its ancestors.
    pub fn depth(&self, node: ElementId) -> usize {
        self.ancestors(node).len()
    }

    /// All nodes sorted by depth (roots first), then by id.
    ///
    /// Saving in this order writes every parent before its children.
    pub fn topological_order(&self) -> Vec<ElementId> {
        let mut by_depth: Vec<(usize, ElementId)> =
            self.nodes().map(|n| (self.depth(n), n)).collect();
        by_depth.sort();
        by_depth.into_iter().map(|(_, node)| node).collect()
    }
}
