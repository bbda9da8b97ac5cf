//! A template matcher built on a shared operator trie.
//!
//! Templates mix literal text with typed operators (`[D:name]` dictionary
//! lookups and `[W:a-b]` bounded wildcards). All templates compile into one
//! trie so that shared prefixes are matched once, and each node records the
//! range of input lengths its subtree can consume so whole branches are
//! skipped when the remaining input cannot fit.
//!
//! # Example
//!
//! ```rust
//! use optrie::{Dictionary, MatchConfig, TrieBuilder};
//!
//! let mut dict = Dictionary::new();
//! dict.parse("[D:city]\nParis\nNew York\n");
//! dict.freeze();
//!
//! let mut builder = TrieBuilder::new(&dict, MatchConfig::default());
//! builder
//!     .add_source("inline", "fly to [D:city]\t0.9\t{\"intent\": \"flight\"}\t{\"dest\": \"[D:city]\"}")
//!     .unwrap();
//! let (trie, diagnostics) = builder.build();
//! assert!(diagnostics.is_empty());
//!
//! let res = trie.match_str("fly to new york");
//! assert!(res.matched);
//! assert_eq!(res.groups["dest"], "new york");
//! assert_eq!(res.extra["intent"], "flight");
//!
//! assert!(!trie.match_str("fly to mars").matched);
//! ```

pub mod config;
pub mod dict;
pub mod op;
pub mod range;
pub mod template;
mod trie;

pub use config::{DEFAULT_MAX_MATCH_LEN, MatchConfig};
pub use dict::{DictEntry, Dictionary, WordSet};
pub use op::{Node, NodeId, Op};
pub use range::LengthRange;
pub use template::{MAX_TOKENS, TemplateError};
pub use trie::{LineDiagnostic, Loaded, MatchResult, OpTrie, TrieBuilder};
