//! Per-variant link ordering graph
//!
//! Shared mutable state for one target variant, built incrementally as
//! the bottom-up ordering pass visits modules. Nodes are module names;
//! edges carry a color: static links and whole-static links are real
//! dependencies, declared-order edges are temporary constraints local to
//! the module being ordered and are stripped from the shared graph once
//! its closure has been extracted.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use kiln_core::GraphError;

/// Weight of a node's dependent count in the priority score. Tunable;
/// only tie-breaking depends on it.
pub const FAN_IN_WEIGHT: i64 = 10;

/// Edge colors of the ordering graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeColor {
    /// Static library dependency.
    Static,
    /// Whole-archive static dependency. Participates in fan-in but never
    /// constrains the final order.
    WholeStatic,
    /// Temporary constraint preserving one module's declared sibling
    /// order.
    DeclaredOrder,
}

/// Shared ordering graph for one target variant.
#[derive(Debug, Default)]
pub struct OrderingGraph {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
    out: Vec<Vec<(usize, EdgeColor)>>,
}

impl OrderingGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of `name`, registering it if unseen.
    pub fn ensure_node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.out.push(Vec::new());
        i
    }

    /// Index of `name`, if registered.
    pub fn node(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name of the node at `index`.
    pub fn name_of(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Add an edge unless an identical one exists.
    pub fn add_edge(&mut self, from: usize, to: usize, color: EdgeColor) {
        if !self.out[from].contains(&(to, color)) {
            self.out[from].push((to, color));
        }
    }

    /// Remove previously added edges.
    pub fn remove_edges(&mut self, edges: &[(usize, usize, EdgeColor)]) {
        for &(from, to, color) in edges {
            self.out[from].retain(|&e| e != (to, color));
        }
    }

    /// Whether a directed path (of length >= 1) exists from `from` to
    /// `to`, over edges of any color.
    pub fn has_path(&self, from: usize, to: usize) -> bool {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        while let Some(node) = queue.pop_front() {
            for &(next, _) in &self.out[node] {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Copy the subgraph reachable from `root` (over all edge colors).
    ///
    /// Node 0 of the copy is the root; discovery order is deterministic
    /// because adjacency lists preserve insertion order.
    pub fn extract_closure(&self, root: usize) -> Closure {
        let mut local: FxHashMap<usize, usize> = FxHashMap::default();
        let mut members = vec![root];
        local.insert(root, 0);
        let mut cursor = 0;
        while cursor < members.len() {
            let node = members[cursor];
            cursor += 1;
            for &(next, _) in &self.out[node] {
                if !local.contains_key(&next) {
                    local.insert(next, members.len());
                    members.push(next);
                }
            }
        }

        let mut edges = vec![Vec::new(); members.len()];
        for (l, &global) in members.iter().enumerate() {
            for &(to, color) in &self.out[global] {
                edges[l].push((local[&to], color));
            }
        }
        Closure {
            names: members.iter().map(|&g| self.names[g].clone()).collect(),
            edges,
        }
    }
}

/// An extracted, self-contained copy of one module's reachable subgraph.
///
/// Retains the declared-order edges that were live at extraction time,
/// so stripping them from the shared graph afterwards does not affect
/// this module's sort.
#[derive(Debug)]
pub struct Closure {
    names: Vec<String>,
    edges: Vec<Vec<(usize, EdgeColor)>>,
}

impl Closure {
    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Count of distinct nodes reachable from `node` over dependency
    /// edges, inclusive of the node itself.
    fn closure_size(&self, node: usize) -> i64 {
        let mut seen = FxHashSet::default();
        seen.insert(node);
        let mut queue = VecDeque::new();
        queue.push_back(node);
        while let Some(n) = queue.pop_front() {
            for &(next, color) in &self.edges[n] {
                if color != EdgeColor::DeclaredOrder && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len() as i64
    }

    /// Topologically sort the closure, dependencies first.
    ///
    /// Each node scores `FAN_IN_WEIGHT x dependents - closure size`; ties
    /// among ready nodes go to the higher score, so heavily-used
    /// libraries sort as early as their constraints allow while large
    /// subtrees are deferred. The root's score is forced to the minimum,
    /// which pins it to the end of the order; it is then stripped and the
    /// remainder returned. Whole-static edges contribute to fan-in but
    /// never to the precedence relation.
    ///
    /// Fails when the closure is not a DAG.
    pub fn sort(&self, root_label: &str) -> Result<Vec<String>, GraphError> {
        let n = self.names.len();

        // Distinct direct dependents per node, over dependency edges.
        let mut dependents: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); n];
        for from in 0..n {
            for &(to, color) in &self.edges[from] {
                if color != EdgeColor::DeclaredOrder && to != from {
                    dependents[to].insert(from);
                }
            }
        }

        let mut priority = vec![0i64; n];
        for node in 0..n {
            priority[node] =
                FAN_IN_WEIGHT * dependents[node].len() as i64 - self.closure_size(node);
        }
        // The root always sorts after everything it pulls in.
        priority[0] = i64::MIN;

        // Precedence: a static edge means the dependency is emitted
        // before the dependent; a declared-order edge means the earlier
        // sibling is emitted before the later one.
        let mut unlocks: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut blocked_by = vec![0usize; n];
        for from in 0..n {
            for &(to, color) in &self.edges[from] {
                match color {
                    EdgeColor::Static => {
                        unlocks[to].push(from);
                        blocked_by[from] += 1;
                    }
                    EdgeColor::DeclaredOrder => {
                        unlocks[from].push(to);
                        blocked_by[to] += 1;
                    }
                    EdgeColor::WholeStatic => {}
                }
            }
        }

        let mut ready = BinaryHeap::new();
        for node in 0..n {
            if blocked_by[node] == 0 {
                ready.push((priority[node], Reverse(node)));
            }
        }

        let mut order = Vec::with_capacity(n);
        while let Some((_, Reverse(node))) = ready.pop() {
            order.push(node);
            for &next in &unlocks[node] {
                blocked_by[next] -= 1;
                if blocked_by[next] == 0 {
                    ready.push((priority[next], Reverse(next)));
                }
            }
        }

        if order.len() != n {
            return Err(GraphError::StaticCycle {
                root: root_label.to_string(),
            });
        }
        debug_assert_eq!(order.last(), Some(&0), "root must sort last");
        order.pop();
        Ok(order.into_iter().map(|i| self.names[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(edges: &[(&str, &str, EdgeColor)]) -> OrderingGraph {
        let mut g = OrderingGraph::new();
        for &(from, to, color) in edges {
            let f = g.ensure_node(from);
            let t = g.ensure_node(to);
            g.add_edge(f, t, color);
        }
        g
    }

    #[test]
    fn test_has_path_follows_transitive_edges() {
        let g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("b", "c", EdgeColor::Static),
        ]);
        let (a, c) = (g.node("a").unwrap(), g.node("c").unwrap());
        assert!(g.has_path(a, c));
        assert!(!g.has_path(c, a));
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut g = OrderingGraph::new();
        let a = g.ensure_node("a");
        let b = g.ensure_node("b");
        g.add_edge(a, b, EdgeColor::Static);
        g.add_edge(a, b, EdgeColor::Static);
        let closure = g.extract_closure(a);
        assert_eq!(closure.sort("a").unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_dependencies_sort_before_dependents() {
        // a -> b, a -> c, b -> d: d must precede b, b before c by
        // declared order.
        let mut g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("a", "c", EdgeColor::Static),
            ("b", "d", EdgeColor::Static),
        ]);
        let (b, c) = (g.node("b").unwrap(), g.node("c").unwrap());
        g.add_edge(b, c, EdgeColor::DeclaredOrder);

        let root = g.node("a").unwrap();
        let order = g.extract_closure(root).sort("a").unwrap();
        assert_eq!(order, vec!["d".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_declared_order_preserved_without_other_edges() {
        let mut g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("a", "c", EdgeColor::Static),
        ]);
        let (b, c) = (g.node("b").unwrap(), g.node("c").unwrap());
        g.add_edge(b, c, EdgeColor::DeclaredOrder);

        let order = g.extract_closure(g.node("a").unwrap()).sort("a").unwrap();
        assert_eq!(order, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_cycle_is_fatal_and_names_the_root() {
        let g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("b", "c", EdgeColor::Static),
            ("c", "b", EdgeColor::Static),
        ]);
        let err = g.extract_closure(g.node("a").unwrap()).sort("a").unwrap_err();
        assert_eq!(
            err,
            GraphError::StaticCycle {
                root: "a".to_string()
            }
        );
    }

    #[test]
    fn test_whole_static_edges_never_constrain_order() {
        // Whole-static members show up in the result but a pure
        // whole-static cycle cannot deadlock the sort.
        let g = graph_of(&[
            ("a", "b", EdgeColor::WholeStatic),
            ("b", "a", EdgeColor::WholeStatic),
        ]);
        let order = g.extract_closure(g.node("a").unwrap()).sort("a").unwrap();
        assert_eq!(order, vec!["b".to_string()]);
    }

    #[test]
    fn test_priority_breaks_ties_among_ready_nodes() {
        // b has two dependents and sorts first; d's subtree is smaller
        // than c's, so d is emitted before c once b is out.
        let g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("a", "c", EdgeColor::Static),
            ("a", "d", EdgeColor::Static),
            ("c", "b", EdgeColor::Static),
        ]);
        let order = g.extract_closure(g.node("a").unwrap()).sort("a").unwrap();
        assert_eq!(
            order,
            vec!["b".to_string(), "d".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_extract_closure_ignores_unreachable_nodes() {
        let g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("x", "y", EdgeColor::Static),
        ]);
        let closure = g.extract_closure(g.node("a").unwrap());
        assert_eq!(closure.node_count(), 2);
    }

    #[test]
    fn test_removed_declared_order_edges_stay_in_extracted_copy() {
        let mut g = graph_of(&[
            ("a", "b", EdgeColor::Static),
            ("a", "c", EdgeColor::Static),
        ]);
        let (b, c) = (g.node("b").unwrap(), g.node("c").unwrap());
        g.add_edge(b, c, EdgeColor::DeclaredOrder);

        let closure = g.extract_closure(g.node("a").unwrap());
        g.remove_edges(&[(b, c, EdgeColor::DeclaredOrder)]);

        // The shared graph no longer orders b before c...
        assert!(!g.has_path(b, c));
        // ...but the extracted copy still does.
        assert_eq!(
            closure.sort("a").unwrap(),
            vec!["b".to_string(), "c".to_string()]
        );
    }
}
