//! Load-time configuration carried inside a compiled trie.

/// Default upper bound on the number of characters a match may span.
pub const DEFAULT_MAX_MATCH_LEN: usize = 64;

/// Settings fixed when the trie is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Inputs longer than this never match. Lowering it tightens pruning.
    pub max_match_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_match_len: DEFAULT_MAX_MATCH_LEN,
        }
    }
}

impl MatchConfig {
    pub fn with_max_match_len(mut self, max_match_len: usize) -> Self {
        self.max_match_len = max_match_len;
        self
    }
}
