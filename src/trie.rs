//! The operator trie: template compilation, bound propagation and lookup.
//!
//! Building happens in one pass per template line, after which
//! [`TrieBuilder::build`] computes every node's subtree reach and freezes the
//! trie. A frozen [`OpTrie`] is immutable and can be shared across threads.

mod matcher;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, trace, warn};

use crate::config::MatchConfig;
use crate::dict::Dictionary;
use crate::op::{Node, NodeId, Op, Terminal};
use crate::range::LengthRange;
use crate::template::{self, OpSpec, Template, TemplateError};

/// Outcome of matching one input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub score: f64,
    /// Extractor name -> matched substring.
    pub groups: BTreeMap<String, String>,
    pub extra: BTreeMap<String, String>,
    pub template: String,
}

/// A template line that was skipped while loading.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDiagnostic {
    /// File (or other source label) the line came from.
    pub origin: String,
    /// 1-based.
    pub line_no: usize,
    pub text: String,
    pub error: TemplateError,
}

impl std::fmt::Display for LineDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {} (line {:?})",
            self.origin, self.line_no, self.error, self.text
        )
    }
}

/// A frozen trie together with the lines that failed to compile.
#[derive(Debug)]
pub struct Loaded {
    pub trie: OpTrie,
    pub diagnostics: Vec<LineDiagnostic>,
}

/// A compiled, immutable template trie.
#[derive(Debug)]
pub struct OpTrie {
    nodes: Vec<Node>,
    config: MatchConfig,
}

impl OpTrie {
    /// Load dictionaries, then templates, then freeze.
    ///
    /// Unreadable files and unknown dictionary names are fatal. Malformed
    /// template lines are skipped and reported in [`Loaded::diagnostics`].
    #[tracing::instrument(level = "debug", skip_all, fields(
        templates = template_files.len(),
        dicts = dict_files.len(),
    ))]
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        template_files: &[P],
        dict_files: &[Q],
        config: MatchConfig,
    ) -> Result<Loaded> {
        let dict = Dictionary::load(dict_files)?;
        let mut builder = TrieBuilder::new(&dict, config);
        for path in template_files {
            builder.add_file(path.as_ref())?;
        }
        let (trie, diagnostics) = builder.build();
        Ok(Loaded { trie, diagnostics })
    }

    pub fn config(&self) -> MatchConfig {
        self.config
    }

    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    /// Match `input` against every template.
    ///
    /// The first template reached in child registration order wins, not the
    /// highest-scoring one.
    pub fn match_str(&self, input: &str) -> MatchResult {
        let chars: Vec<char> = input.chars().collect();
        self.match_chars(&chars)
    }

    pub fn match_chars(&self, input: &[char]) -> MatchResult {
        let Some((end, path)) = matcher::search(self, input) else {
            trace!(len = input.len(), "no match");
            return MatchResult::default();
        };
        let node = self.node(end);
        let Some(terminal) = node.terminal.as_ref() else {
            return MatchResult::default();
        };
        let groups = terminal
            .extractors
            .iter()
            .filter_map(|(name, &position)| {
                let hop = path.get(position)?;
                let text: String = input[hop.start..hop.start + hop.len].iter().collect();
                Some((name.clone(), text))
            })
            .collect();
        trace!(template = %terminal.template, "matched");
        MatchResult {
            matched: true,
            score: terminal.score,
            groups,
            extra: terminal.extra.clone(),
            template: terminal.template.clone(),
        }
    }

    /// Expressions on the path from the root to `id`, root excluded.
    pub fn path_exprs(&self, id: NodeId) -> Vec<&str> {
        let mut exprs = Vec::new();
        let mut cur = Some(id);
        while let Some(id) = cur
            && id != NodeId::ROOT
        {
            let node = self.node(id);
            exprs.push(node.expr.as_str());
            cur = node.parent;
        }
        exprs.reverse();
        exprs
    }

    /// Human-readable tree with each node's `[min, max, reach_min,
    /// reach_max]` and terminal payloads.
    pub fn show(&self) -> String {
        let mut out = String::new();
        self.show_node(NodeId::ROOT, 0, &mut out);
        out
    }

    fn show_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        if depth > 0 {
            let _ = write!(out, "{}└{} ({})", " ".repeat(4 * depth - 1), node.expr, depth - 1);
        } else {
            out.push_str(&node.expr);
        }
        let _ = write!(out, "\t[{}, {}]", node.range, node.reach);
        if let Some(terminal) = &node.terminal {
            out.push_str("\t[END]");
            if !terminal.extra.is_empty() {
                let _ = write!(out, "\textra:{}", json!(terminal.extra));
            }
            if !terminal.extractors.is_empty() {
                let _ = write!(out, "\textractors:{}", json!(terminal.extractors));
            }
        }
        out.push('\n');
        for &child in &node.children {
            self.show_node(child, depth + 1, out);
        }
    }
}

/// Accumulates templates into a trie.
pub struct TrieBuilder<'d> {
    dict: &'d Dictionary,
    config: MatchConfig,
    nodes: Vec<Node>,
    diagnostics: Vec<LineDiagnostic>,
}

impl<'d> TrieBuilder<'d> {
    pub fn new(dict: &'d Dictionary, config: MatchConfig) -> Self {
        Self {
            dict,
            config,
            nodes: vec![Node::root()],
            diagnostics: Vec::new(),
        }
    }

    /// Compile every line of a template file.
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to open template file {}", path.display()))?;
        self.add_source(&path.display().to_string(), &contents)?;
        info!(path = %path.display(), "parsed template file");
        Ok(())
    }

    /// Compile every line of `contents`. `origin` labels diagnostics.
    pub fn add_source(&mut self, origin: &str, contents: &str) -> Result<()> {
        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(error) = self.add_template(line)? {
                warn!(origin, line_no = idx + 1, %error, "skipping template line");
                self.diagnostics.push(LineDiagnostic {
                    origin: origin.to_string(),
                    line_no: idx + 1,
                    text: line.to_string(),
                    error,
                });
            }
        }
        Ok(())
    }

    /// Compile one template line.
    ///
    /// The outer error is fatal; the inner one rejects just this line.
    pub fn add_template(&mut self, line: &str) -> Result<Result<(), TemplateError>> {
        let tpl = match template::parse_line(line) {
            Ok(tpl) => tpl,
            Err(e) => return Ok(Err(e)),
        };
        let ops = tpl
            .tokens
            .iter()
            .map(|token| self.resolve(&token.spec))
            .collect::<Result<Vec<_>>>()?;

        let min = ops.iter().map(|(_, range)| range.min).sum::<usize>();
        if min > self.config.max_match_len {
            return Ok(Err(TemplateError::TooLong {
                min,
                max_match_len: self.config.max_match_len,
            }));
        }

        self.insert(tpl, ops);
        Ok(Ok(()))
    }

    /// Build the operator a token asks for, with its own length range
    /// capped at the configured maximum.
    fn resolve(&self, spec: &OpSpec) -> Result<(Op, LengthRange)> {
        let (op, range) = match spec {
            OpSpec::Literal(text) => {
                let chars: Vec<char> = text.chars().collect();
                let range = LengthRange::exactly(chars.len());
                (Op::Literal(chars), range)
            }
            OpSpec::Dict(name) => {
                let Some(entry) = self.dict.lookup(name) else {
                    bail!("dictionary {name} does not exist");
                };
                (Op::Dict(entry.words.clone()), entry.range)
            }
            OpSpec::Wildcard(range) => (Op::Wildcard, *range),
        };
        Ok((op, range.cap(self.config.max_match_len)))
    }

    fn insert(&mut self, tpl: Template, ops: Vec<(Op, LengthRange)>) {
        let mut cur = NodeId::ROOT;
        for (token, (op, range)) in tpl.tokens.iter().zip(ops) {
            cur = match self.nodes[cur.index()].child(&token.expr) {
                Some(next) => next,
                None => {
                    let id = NodeId(self.nodes.len());
                    self.nodes
                        .push(Node::new(token.expr.clone(), op, range, Some(cur)));
                    self.nodes[cur.index()].add_child(&token.expr, id);
                    id
                }
            };
        }
        let node = &mut self.nodes[cur.index()];
        if let Some(previous) = &node.terminal {
            debug!(
                previous = %previous.template,
                template = %tpl.source,
                "template path registered twice, keeping the later one"
            );
        }
        node.terminal = Some(Terminal {
            score: tpl.score,
            template: tpl.source,
            extra: tpl.extra,
            extractors: tpl.extractors,
        });
    }

    /// Compute subtree reach bottom-up and freeze the trie.
    pub fn build(mut self) -> (OpTrie, Vec<LineDiagnostic>) {
        propagate_bounds(&mut self.nodes, self.config.max_match_len);
        info!(
            nodes = self.nodes.len(),
            skipped = self.diagnostics.len(),
            "template trie built"
        );
        let trie = OpTrie {
            nodes: self.nodes,
            config: self.config,
        };
        (trie, self.diagnostics)
    }
}

/// Set every node's `reach` from its children.
///
/// A child is always pushed after its parent, so walking the arena
/// backwards visits children first. A terminal node may also stop, so its
/// reach always includes 0.
fn propagate_bounds(nodes: &mut [Node], max_match_len: usize) {
    for idx in (0..nodes.len()).rev() {
        let mut reach = nodes[idx]
            .children
            .iter()
            .map(|&child| {
                let child = &nodes[child.index()];
                child.range.then(child.reach)
            })
            .fold(LengthRange::EMPTY, LengthRange::hull)
            .cap(max_match_len);
        if nodes[idx].is_end() {
            reach.min = 0;
        }
        nodes[idx].reach = reach;
    }
}
