//! Operators: the matchable units a template is made of.
//!
//! # Template syntax
//!
//! | Token        | Operator   | Consumes                                   |
//! |--------------|------------|--------------------------------------------|
//! | `text`       | Literal    | exactly `text`                             |
//! | `[D:name]`   | Dictionary | one word of group `[D:name]`, case-folded  |
//! | `[W:a-b]`    | Wildcard   | any `a..=b` characters                     |
//! | `[W:b]`      | Wildcard   | any `0..=b` characters                     |
//! | `\[`, `\]`   | Literal    | a bracket character                        |
//!
//! Any other bracketed token is taken literally, brackets included.

pub mod candidates;
pub mod node;

use std::sync::Arc;

use crate::dict::{WordSet, fold_char};

pub use candidates::{Candidates, Order};
pub use node::{Node, NodeId, Terminal};

/// What a trie node matches.
#[derive(Debug)]
pub enum Op {
    /// The trie root. Matches nothing and is never asked for candidates.
    Root,
    /// Exact text, stored as chars so lengths index the input directly.
    Literal(Vec<char>),
    /// Membership in a shared word list.
    Dict(Arc<WordSet>),
    /// Any text of admissible length.
    Wildcard,
}

impl Op {
    /// Whether consuming exactly `len` chars of `input` at `start` is valid.
    pub fn accepts(&self, input: &[char], start: usize, len: usize) -> bool {
        let Some(span) = start.checked_add(len).and_then(|end| input.get(start..end)) else {
            return false;
        };
        match self {
            Op::Root => false,
            Op::Literal(text) => span == text.as_slice(),
            Op::Dict(words) => {
                let word: String = span.iter().copied().map(fold_char).collect();
                words.contains(&word)
            }
            Op::Wildcard => true,
        }
    }

    /// The order candidate lengths are proposed in.
    ///
    /// Dictionaries prefer the longest word; wildcards give up as little as
    /// possible so that later literal and dictionary operators claim more.
    pub fn order(&self) -> Order {
        match self {
            Op::Dict(_) => Order::Descending,
            Op::Root | Op::Literal(_) | Op::Wildcard => Order::Ascending,
        }
    }

    /// Short label used in trace output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Op::Root => "root",
            Op::Literal(_) => "literal",
            Op::Dict(_) => "dict",
            Op::Wildcard => "wildcard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn literal_exact() {
        let op = Op::Literal(chars("ab"));
        let input = chars("xaby");
        assert!(op.accepts(&input, 1, 2));
        assert!(!op.accepts(&input, 0, 2));
        assert!(!op.accepts(&input, 1, 3));
    }

    #[test]
    fn literal_is_case_sensitive() {
        let op = Op::Literal(chars("ab"));
        assert!(!op.accepts(&chars("AB"), 0, 2));
    }

    #[test]
    fn dict_folds_candidate_case() {
        let words: WordSet = ["paris".to_string()].into_iter().collect();
        let op = Op::Dict(Arc::new(words));
        assert!(op.accepts(&chars("PARIS"), 0, 5));
        assert!(op.accepts(&chars("to paris"), 3, 5));
        assert!(!op.accepts(&chars("par"), 0, 3));
    }

    #[test]
    fn dict_fold_is_one_char_per_char() {
        let words: WordSet = ["izmir".to_string()].into_iter().collect();
        let op = Op::Dict(Arc::new(words));
        assert!(op.accepts(&chars("İzmir"), 0, 5));
        assert!(op.accepts(&chars("IZMIR"), 0, 5));
    }

    #[test]
    fn wildcard_accepts_in_bounds_only() {
        let input = chars("abc");
        assert!(Op::Wildcard.accepts(&input, 0, 0));
        assert!(Op::Wildcard.accepts(&input, 1, 2));
        assert!(!Op::Wildcard.accepts(&input, 2, 2));
    }

    #[test]
    fn root_accepts_nothing() {
        assert!(!Op::Root.accepts(&chars("a"), 0, 1));
    }

    #[test]
    fn orders() {
        assert_eq!(Op::Dict(Arc::default()).order(), Order::Descending);
        assert_eq!(Op::Wildcard.order(), Order::Ascending);
        assert_eq!(Op::Literal(vec![]).order(), Order::Ascending);
    }
}
