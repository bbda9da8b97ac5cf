//! Trie nodes stored in an arena and addressed by [`NodeId`].

use std::collections::{BTreeMap, HashMap};

use super::Op;
use super::candidates::Candidates;
use crate::range::LengthRange;

/// Index of a node in its trie's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Metadata attached where a template ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub score: f64,
    /// Template source text.
    pub template: String,
    pub extra: BTreeMap<String, String>,
    /// Group name -> position of the extracted operator in the template.
    pub extractors: BTreeMap<String, usize>,
}

/// One operator in the trie.
#[derive(Debug)]
pub struct Node {
    /// The token that created this node. Unique among siblings.
    pub expr: String,
    pub op: Op,
    /// How many chars this node alone may consume.
    pub range: LengthRange,
    /// How many chars everything below this node may consume. Only valid
    /// once the trie is built.
    pub reach: LengthRange,
    /// Back-reference for diagnostics only.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    child_index: HashMap<String, NodeId>,
    pub terminal: Option<Terminal>,
}

impl Node {
    pub fn root() -> Self {
        Self::new(String::from("ROOT"), Op::Root, LengthRange::ZERO, None)
    }

    pub fn new(expr: String, op: Op, range: LengthRange, parent: Option<NodeId>) -> Self {
        Self {
            expr,
            op,
            range,
            reach: LengthRange::EMPTY,
            parent,
            children: Vec::new(),
            child_index: HashMap::new(),
            terminal: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn child(&self, expr: &str) -> Option<NodeId> {
        self.child_index.get(expr).copied()
    }

    /// Register `id` as the child for `expr`. The caller must have checked
    /// that no child with this `expr` exists.
    pub(crate) fn add_child(&mut self, expr: &str, id: NodeId) {
        debug_assert!(!self.child_index.contains_key(expr));
        self.children.push(id);
        self.child_index.insert(expr.to_string(), id);
    }

    /// Whether `remaining` chars could be consumed below this node.
    pub fn can_fit(&self, remaining: usize) -> bool {
        self.reach.contains(remaining)
    }

    /// Candidate lengths for this node at `start`.
    ///
    /// The window is this node's own range, narrowed to lengths that leave
    /// a remainder its subtree can still consume.
    pub fn candidates<'a>(&'a self, input: &'a [char], start: usize) -> Candidates<'a> {
        if matches!(self.op, Op::Root) {
            unreachable!("the root operator is not matchable");
        }
        let remaining = input.len().saturating_sub(start);
        let window = self
            .range
            .intersect(LengthRange::leaving(remaining, self.reach));
        Candidates::new(&self.op, input, start, window)
    }
}
