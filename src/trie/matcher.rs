//! Backtracking depth-first search over a frozen trie.
//!
//! State is `(node, offset)`, starting at `(root, 0)`. A state accepts when
//! the offset is at the end of input and the node ends a template. From a
//! state, children are tried in registration order and each child's
//! candidate lengths in that operator's order. The first accepting path
//! wins.

use tracing::trace;

use super::OpTrie;
use crate::op::NodeId;

/// One accepted step on the current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub start: usize,
    pub len: usize,
    pub node: NodeId,
}

/// Find the first accepting path. Returns the terminal node and the hops
/// leading to it, one per template token.
pub(super) fn search(trie: &OpTrie, input: &[char]) -> Option<(NodeId, Vec<Hop>)> {
    let mut path = Vec::new();
    if descend(trie, NodeId::ROOT, input, 0, &mut path) {
        let end = path.last().map_or(NodeId::ROOT, |hop: &Hop| hop.node);
        Some((end, path))
    } else {
        None
    }
}

fn descend(trie: &OpTrie, id: NodeId, input: &[char], start: usize, path: &mut Vec<Hop>) -> bool {
    let node = trie.node(id);
    let remaining = input.len() - start;
    if remaining == 0 && node.is_end() {
        return true;
    }
    if !node.can_fit(remaining) {
        return false;
    }
    for &child_id in &node.children {
        let child = trie.node(child_id);
        for len in child.candidates(input, start) {
            trace!(op = child.op.kind_name(), expr = %child.expr, start, len, "step");
            path.push(Hop {
                start,
                len,
                node: child_id,
            });
            if descend(trie, child_id, input, start + len, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}
