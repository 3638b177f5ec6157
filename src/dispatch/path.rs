//! Root-to-leaf path enumeration.

use std::collections::HashSet;

use super::node::{NodeRef, TaskNode};

/// An ordered sequence of nodes from a starting node to a node without successors
pub type NodePath = Vec<NodeRef>;

/// Enumerate every path from `start` to each reachable leaf.
///
/// Depth-first, recomputed on every call. Nodes shared by divergent routes
/// appear in every path that reaches them. The graph must be acyclic.
pub(crate) fn all_paths(start: &NodeRef) -> Vec<NodePath> {
    let mut paths = Vec::new();
    trace_node(start, vec![NodeRef::clone(start)], &mut paths);
    paths
}

fn trace_node(node: &TaskNode, path: NodePath, paths: &mut Vec<NodePath>) {
    let next_nodes = node.get_next_nodes();
    if next_nodes.is_empty() {
        paths.push(path);
        return;
    }
    for next in &next_nodes {
        let mut extended = Vec::with_capacity(path.len() + 1);
        extended.extend(path.iter().cloned());
        extended.push(NodeRef::clone(next));
        trace_node(next, extended, paths);
    }
}

/// Flatten `paths` in order, keeping each node the first time `keep` accepts it.
/// Nodes are compared by identity.
pub(crate) fn distinct_nodes<F>(paths: &[NodePath], mut keep: F) -> Vec<NodeRef>
where
    F: FnMut(&TaskNode) -> bool,
{
    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(paths.len());
    for node in paths.iter().flatten() {
        if seen.insert(node.key()) && keep(node) {
            nodes.push(NodeRef::clone(node));
        }
    }
    nodes
}

/// Render a path as `[a-->b-->c]`
pub fn path_name(path: &[NodeRef]) -> String {
    if path.is_empty() {
        return "[empty path]".to_string();
    }
    let names: Vec<String> = path.iter().map(|node| node.name()).collect();
    format!("[{}]", names.join("-->"))
}
