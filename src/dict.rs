//! Word lists backing the `[D:name]` operator.
//!
//! A dictionary file is a sequence of groups:
//!
//! ```text
//! # comment
//! [D:city]
//! Paris
//! nyc
//! [D:color]
//! red
//! ```
//!
//! A line starting with `[D:` opens a group named by the whole line. Every
//! other non-blank, non-comment line adds a lowercased word to the current
//! group. Words seen before the first header are ignored. A group may be
//! continued in a later file.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::range::LengthRange;

/// Prefix shared by dictionary headers and dictionary operator expressions.
pub const DICT_PREFIX: &str = "[D:";

/// A lowercased word list.
pub type WordSet = HashSet<String>;

/// Lowercase one char to exactly one char.
///
/// Multi-char lowercase expansions (`İ` -> `i` + U+0307) keep only the
/// leading char so a folded word has the same char count as its source.
pub fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Case-fold `word` with [`fold_char`].
pub fn fold(word: &str) -> String {
    word.chars().map(fold_char).collect()
}

/// One resolved group: its words and the char-length range they span.
#[derive(Debug, Clone)]
pub struct DictEntry {
    pub words: Arc<WordSet>,
    pub range: LengthRange,
}

/// Named word groups, keyed by header (e.g. `[D:city]`).
#[derive(Debug, Default)]
pub struct Dictionary {
    groups: BTreeMap<String, WordSet>,
    entries: BTreeMap<String, DictEntry>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file in `paths` and freeze the result.
    ///
    /// Fails if any file cannot be read.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut dict = Self::new();
        for path in paths {
            let path = path.as_ref();
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to open dictionary file {}", path.display()))?;
            dict.parse(&contents);
            info!(path = %path.display(), "parsed dictionary file");
        }
        dict.freeze();
        Ok(dict)
    }

    /// Add the groups found in `contents`. Call [`freeze`](Self::freeze)
    /// once all input has been added.
    pub fn parse(&mut self, contents: &str) {
        let mut group: Option<&str> = None;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with(DICT_PREFIX) {
                group = Some(line);
            } else if let Some(name) = group {
                self.insert(name, line);
            }
        }
    }

    /// Add one word to `group`.
    pub fn insert(&mut self, group: &str, word: &str) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(fold(word));
    }

    /// Compute each group's length range and make the groups shareable.
    ///
    /// Idempotent; words inserted after freezing are picked up by the next
    /// call.
    pub fn freeze(&mut self) {
        for (name, words) in &self.groups {
            let range = words
                .iter()
                .map(|w| LengthRange::exactly(w.chars().count()))
                .fold(LengthRange::EMPTY, LengthRange::hull);
            debug!(group = %name, size = words.len(), %range, "dictionary group");
            self.entries.insert(
                name.clone(),
                DictEntry {
                    words: Arc::new(words.clone()),
                    range,
                },
            );
        }
        info!(groups = self.entries.len(), "all dictionaries parsed");
    }

    /// Look up a frozen group by its full header, e.g. `[D:city]`.
    pub fn lookup(&self, name: &str) -> Option<&DictEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
