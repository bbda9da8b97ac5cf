//! Template line parsing.
//!
//! A template file holds one template per line:
//!
//! ```text
//! template<TAB>score[<TAB>extra_json][<TAB>extractors_json]
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. The template is
//! split into literal runs and bracketed operator tokens; see [`crate::op`]
//! for the operator syntax.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use itertools::Itertools;
use phf::{Map, phf_map};
use serde_json::Value;

use crate::range::LengthRange;

/// Upper bound on tokens per template. Bounds backtracking depth.
pub const MAX_TOKENS: usize = 16;

/// Why a template line was rejected. The line is skipped; loading goes on.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// `[` inside an open operator token, at this char offset.
    NestedOpen(usize),
    /// `]` with no open operator token, at this char offset.
    UnexpectedClose(usize),
    UnclosedOperator,
    EmptyTemplate,
    TooManyTokens(usize),
    FieldCount(usize),
    InvalidScore(String),
    InvalidExtra(String),
    InvalidExtractor(String),
    UnresolvedExtractor { name: String, expr: String },
    InvalidWildcard(String),
    InvertedWildcard { expr: String, min: usize, max: usize },
    /// The shortest match is longer than the configured maximum.
    TooLong { min: usize, max_match_len: usize },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NestedOpen(at) => write!(f, "Nested '[' at offset {at}"),
            Self::UnexpectedClose(at) => write!(f, "Unmatched ']' at offset {at}"),
            Self::UnclosedOperator => write!(f, "Unclosed '[' in template"),
            Self::EmptyTemplate => write!(f, "Empty template"),
            Self::TooManyTokens(n) => {
                write!(f, "Template has {n} tokens, at most {MAX_TOKENS} allowed")
            }
            Self::FieldCount(n) => write!(f, "Expected 2 to 4 tab-separated fields, got {n}"),
            Self::InvalidScore(s) => write!(f, "Invalid template score: {s:?}"),
            Self::InvalidExtra(msg) => write!(f, "Invalid extra: {msg}"),
            Self::InvalidExtractor(msg) => write!(f, "Invalid extractor: {msg}"),
            Self::UnresolvedExtractor { name, expr } => {
                write!(f, "Extractor {name:?} refers to {expr:?}, not found in template")
            }
            Self::InvalidWildcard(expr) => write!(f, "Invalid wildcard range {expr}"),
            Self::InvertedWildcard { expr, min, max } => {
                write!(f, "Wildcard {expr} has min {min} greater than max {max}")
            }
            Self::TooLong { min, max_match_len } => write!(
                f,
                "Template needs at least {min} chars, max match length is {max_match_len}"
            ),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Operator kind, resolved from a token's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Literal,
    Dict,
    Wildcard,
}

static OP_PREFIXES: Map<&'static str, OpKind> = phf_map! {
    "[D:" => OpKind::Dict,
    "[W:" => OpKind::Wildcard,
};

/// What a token asks for, before any dictionary is consulted.
#[derive(Debug, Clone, PartialEq)]
pub enum OpSpec {
    Literal(String),
    /// Dictionary named by the full token, e.g. `[D:city]`.
    Dict(String),
    Wildcard(LengthRange),
}

/// A run of template text, as split.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Unescaped text. Operator pieces include their brackets.
    pub text: String,
    /// Whether this piece is a bracketed operator token.
    pub operator: bool,
}

/// One template token: the source expression and what it asks for.
///
/// `expr` is the token as written in template syntax, so a literal bracket
/// keeps its backslash and can never collide with an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub expr: String,
    pub spec: OpSpec,
}

/// A fully parsed template line.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// The template field as written.
    pub source: String,
    pub tokens: Vec<Token>,
    pub score: f64,
    pub extra: BTreeMap<String, String>,
    /// Group name -> index into `tokens`.
    pub extractors: BTreeMap<String, usize>,
}

/// Parse one (non-comment) template line.
pub fn parse_line(line: &str) -> Result<Template, TemplateError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if !(2..=4).contains(&fields.len()) {
        return Err(TemplateError::FieldCount(fields.len()));
    }
    let source = fields[0];
    let tokens = split_template(source)?
        .into_iter()
        .map(classify)
        .collect::<Result<Vec<_>, _>>()?;

    let score = fields[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| TemplateError::InvalidScore(fields[1].to_string()))?;

    let extra = match fields.get(2) {
        Some(s) if !s.trim().is_empty() => parse_extra(s)?,
        _ => BTreeMap::new(),
    };
    let extractors = match fields.get(3) {
        Some(s) if !s.trim().is_empty() => parse_extractors(s, &tokens)?,
        _ => BTreeMap::new(),
    };

    Ok(Template {
        source: source.to_string(),
        tokens,
        score,
        extra,
        extractors,
    })
}

/// Split a template into literal runs and `[...]` operator tokens, in order.
///
/// `\[` and `\]` stand for literal brackets and never open or close a token.
pub fn split_template(template: &str) -> Result<Vec<Piece>, TemplateError> {
    let tokens = Splitter {
        chars: template.chars().peekable(),
        offset: 0,
    }
    .split()?;
    if tokens.is_empty() {
        return Err(TemplateError::EmptyTemplate);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(TemplateError::TooManyTokens(tokens.len()));
    }
    Ok(tokens)
}

struct Splitter<'a> {
    chars: Peekable<Chars<'a>>,
    offset: usize,
}

impl Splitter<'_> {
    fn split(&mut self) -> Result<Vec<Piece>, TemplateError> {
        let mut pieces = Vec::new();
        let mut cur = String::new();
        let mut in_op = false;
        while let Some(c) = self.bump() {
            match c {
                '\\' if matches!(self.chars.peek(), Some('[') | Some(']')) => {
                    if let Some(bracket) = self.bump() {
                        cur.push(bracket);
                    }
                }
                '[' if in_op => return Err(TemplateError::NestedOpen(self.offset - 1)),
                '[' => {
                    if !cur.is_empty() {
                        pieces.push(literal(std::mem::take(&mut cur)));
                    }
                    cur.push('[');
                    in_op = true;
                }
                ']' if !in_op => return Err(TemplateError::UnexpectedClose(self.offset - 1)),
                ']' => {
                    cur.push(']');
                    pieces.push(Piece {
                        text: std::mem::take(&mut cur),
                        operator: true,
                    });
                    in_op = false;
                }
                c => cur.push(c),
            }
        }
        if in_op {
            return Err(TemplateError::UnclosedOperator);
        }
        if !cur.is_empty() {
            pieces.push(literal(cur));
        }
        Ok(pieces)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += 1;
        Some(c)
    }
}

fn literal(text: String) -> Piece {
    Piece {
        text,
        operator: false,
    }
}

/// Resolve a token's operator kind from its prefix.
pub fn op_kind(expr: &str) -> OpKind {
    expr.get(..3)
        .and_then(|prefix| OP_PREFIXES.get(prefix))
        .copied()
        .unwrap_or(OpKind::Literal)
}

fn classify(piece: Piece) -> Result<Token, TemplateError> {
    if !piece.operator {
        let expr = piece.text.replace('[', "\\[").replace(']', "\\]");
        return Ok(Token {
            expr,
            spec: OpSpec::Literal(piece.text),
        });
    }
    let expr = piece.text;
    let spec = match op_kind(&expr) {
        OpKind::Literal => OpSpec::Literal(expr.clone()),
        OpKind::Dict => OpSpec::Dict(expr.clone()),
        OpKind::Wildcard => OpSpec::Wildcard(parse_wildcard(&expr)?),
    };
    Ok(Token { expr, spec })
}

/// Parse `[W:a-b]`, `[W:-b]` or `[W:b]` into an inclusive length range.
pub fn parse_wildcard(expr: &str) -> Result<LengthRange, TemplateError> {
    let invalid = || TemplateError::InvalidWildcard(expr.to_string());
    let inner = expr
        .strip_prefix("[W:")
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(invalid)?;
    let number = |s: &str| s.trim().parse::<usize>().map_err(|_| invalid());
    let (min, max) = match inner.split_once('-') {
        None => (0, number(inner)?),
        Some((lo, hi)) if lo.trim().is_empty() => (0, number(hi)?),
        Some((lo, hi)) => (number(lo)?, number(hi)?),
    };
    if min > max {
        return Err(TemplateError::InvertedWildcard {
            expr: expr.to_string(),
            min,
            max,
        });
    }
    Ok(LengthRange::new(min, max))
}

fn parse_object(text: &str) -> Result<serde_json::Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("{text:?} is not a JSON object")),
        Err(e) => Err(format!("{text:?}: {e}")),
    }
}

/// Strings are kept; numbers are stringified, floats with six decimals.
fn parse_extra(text: &str) -> Result<BTreeMap<String, String>, TemplateError> {
    let map = parse_object(text).map_err(TemplateError::InvalidExtra)?;
    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
                Value::Number(n) => match n.as_f64() {
                    Some(f) => format!("{f:.6}"),
                    None => n.to_string(),
                },
                other => {
                    return Err(TemplateError::InvalidExtra(format!(
                        "value of {key:?} must be a string or number, got {other}"
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Map each group name to the token position it extracts.
///
/// A trailing `#N` (1-based) picks the N-th occurrence of a repeated
/// expression; without it the first occurrence is used. A literal holding
/// brackets may be named as written in the template (`\[x\]`) or by its
/// plain text (`[x]`); the escaped spelling is tried first.
fn parse_extractors(
    text: &str,
    tokens: &[Token],
) -> Result<BTreeMap<String, usize>, TemplateError> {
    let map = parse_object(text).map_err(TemplateError::InvalidExtractor)?;
    map.into_iter()
        .map(|(name, value)| {
            let Value::String(reference) = value else {
                return Err(TemplateError::InvalidExtractor(format!(
                    "value of {name:?} must be a string"
                )));
            };
            let (expr, occurrence) = split_occurrence(&reference);
            let nth = |pred: &dyn Fn(&Token) -> bool| {
                occurrence
                    .checked_sub(1)
                    .and_then(|n| tokens.iter().positions(pred).nth(n))
            };
            let position = nth(&|t| t.expr == expr).or_else(|| {
                nth(&|t| matches!(&t.spec, OpSpec::Literal(lit) if lit == expr))
            });
            match position {
                Some(position) => Ok((name, position)),
                None => Err(TemplateError::UnresolvedExtractor {
                    name,
                    expr: reference,
                }),
            }
        })
        .collect()
}

fn split_occurrence(reference: &str) -> (&str, usize) {
    if let Some((expr, n)) = reference.rsplit_once('#')
        && !n.is_empty()
        && n.bytes().all(|b| b.is_ascii_digit())
        && let Ok(n) = n.parse::<usize>()
    {
        return (expr, n);
    }
    (reference, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_ok(s: &str) -> Vec<String> {
        split_template(s)
            .expect("split should succeed")
            .into_iter()
            .map(|p| p.text)
            .collect()
    }

    fn parse_err(line: &str) -> TemplateError {
        parse_line(line).expect_err("parse should fail")
    }

    fn line(fields: &[&str]) -> String {
        fields.join("\t")
    }

    // --- Splitting ---

    #[test]
    fn literal_only() {
        assert_eq!(split_ok("abc"), vec!["abc"]);
    }

    #[test]
    fn alternating_tokens() {
        assert_eq!(
            split_ok("from [D:city] to [D:city][W:0-2]"),
            vec!["from ", "[D:city]", " to ", "[D:city]", "[W:0-2]"]
        );
    }

    #[test]
    fn escaped_brackets_are_literal() {
        assert_eq!(split_ok(r"a\[b\]c"), vec!["a[b]c"]);
        assert_eq!(split_ok(r"\[[W:1]\]"), vec!["[", "[W:1]", "]"]);
    }

    #[test]
    fn other_backslashes_kept() {
        assert_eq!(split_ok(r"a\b"), vec![r"a\b"]);
    }

    #[test]
    fn pieces_flag_operators() {
        let pieces = split_template(r"\[D:x\][D:x]").unwrap();
        assert!(!pieces[0].operator);
        assert!(pieces[1].operator);
        assert_eq!(pieces[0].text, pieces[1].text);
    }

    #[test]
    fn escaped_operator_stays_literal() {
        let t = parse_line(&line(&[r"\[D:x\][D:x]", "1"])).unwrap();
        assert_eq!(t.tokens[0].expr, r"\[D:x\]");
        assert_eq!(t.tokens[0].spec, OpSpec::Literal("[D:x]".into()));
        assert_eq!(t.tokens[1].spec, OpSpec::Dict("[D:x]".into()));
    }

    #[test]
    fn nested_open_rejected() {
        assert_eq!(split_template("a[[W:1]]"), Err(TemplateError::NestedOpen(2)));
    }

    #[test]
    fn dangling_close_rejected() {
        assert_eq!(split_template("ab]"), Err(TemplateError::UnexpectedClose(2)));
    }

    #[test]
    fn unclosed_open_rejected() {
        assert_eq!(split_template("ab[W:1"), Err(TemplateError::UnclosedOperator));
    }

    #[test]
    fn empty_rejected() {
        assert_eq!(split_template(""), Err(TemplateError::EmptyTemplate));
    }

    #[test]
    fn token_limit() {
        let sixteen = "a[W:1]".repeat(8);
        assert_eq!(split_ok(&sixteen).len(), 16);
        let seventeen = format!("{sixteen}b");
        assert_eq!(
            split_template(&seventeen),
            Err(TemplateError::TooManyTokens(17))
        );
    }

    // --- Operator kinds ---

    #[test]
    fn kinds_by_prefix() {
        assert_eq!(op_kind("[D:city]"), OpKind::Dict);
        assert_eq!(op_kind("[W:3]"), OpKind::Wildcard);
        assert_eq!(op_kind("[X:3]"), OpKind::Literal);
        assert_eq!(op_kind("ab"), OpKind::Literal);
        assert_eq!(op_kind("北京市"), OpKind::Literal);
    }

    #[test]
    fn wildcard_forms() {
        assert_eq!(parse_wildcard("[W:1-3]"), Ok(LengthRange::new(1, 3)));
        assert_eq!(parse_wildcard("[W:3]"), Ok(LengthRange::new(0, 3)));
        assert_eq!(parse_wildcard("[W:-3]"), Ok(LengthRange::new(0, 3)));
        assert_eq!(parse_wildcard("[W:2-2]"), Ok(LengthRange::exactly(2)));
    }

    #[test]
    fn wildcard_errors() {
        assert!(matches!(
            parse_wildcard("[W:3-1]"),
            Err(TemplateError::InvertedWildcard { min: 3, max: 1, .. })
        ));
        assert!(matches!(
            parse_wildcard("[W:a-b]"),
            Err(TemplateError::InvalidWildcard(_))
        ));
        assert!(matches!(
            parse_wildcard("[W:1-2-3]"),
            Err(TemplateError::InvalidWildcard(_))
        ));
    }

    // --- Lines ---

    #[test]
    fn minimal_line() {
        let t = parse_line("abc\t1.0").unwrap();
        assert_eq!(t.source, "abc");
        assert_eq!(t.score, 1.0);
        assert_eq!(t.tokens.len(), 1);
        assert_eq!(t.tokens[0].spec, OpSpec::Literal("abc".into()));
        assert!(t.extra.is_empty());
        assert!(t.extractors.is_empty());
    }

    #[test]
    fn extra_values_stringified() {
        let t = parse_line(&line(&["abc", "1", r#"{"intent": "weather", "n": 3, "p": 1.5}"#])).unwrap();
        assert_eq!(t.extra["intent"], "weather");
        assert_eq!(t.extra["n"], "3");
        assert_eq!(t.extra["p"], "1.500000");
    }

    #[test]
    fn extra_rejects_other_types() {
        assert!(matches!(
            parse_err(&line(&["abc", "1", r#"{"ok": true}"#])),
            TemplateError::InvalidExtra(_)
        ));
        assert!(matches!(
            parse_err("abc\t1\t[1, 2]"),
            TemplateError::InvalidExtra(_)
        ));
        assert!(matches!(
            parse_err("abc\t1\t{nope"),
            TemplateError::InvalidExtra(_)
        ));
    }

    #[test]
    fn extractors_with_ordinals() {
        let t = parse_line(
            &line(&["from [D:city] to [D:city]", "1", "", r#"{"src": "[D:city]#1", "dst": "[D:city]#2"}"#]),
        )
        .unwrap();
        assert_eq!(t.extractors["src"], 1);
        assert_eq!(t.extractors["dst"], 3);
    }

    #[test]
    fn extractor_without_ordinal_takes_first() {
        let t = parse_line(&line(&["[W:1-2]x[W:1-2]", "1", "", r#"{"a": "[W:1-2]"}"#])).unwrap();
        assert_eq!(t.extractors["a"], 0);
    }

    #[test]
    fn extractor_out_of_range() {
        assert!(matches!(
            parse_err(&line(&["[D:city]", "1", "", r#"{"a": "[D:city]#2"}"#])),
            TemplateError::UnresolvedExtractor { .. }
        ));
        assert!(matches!(
            parse_err(&line(&["[D:city]", "1", "", r#"{"a": "[D:city]#0"}"#])),
            TemplateError::UnresolvedExtractor { .. }
        ));
    }

    #[test]
    fn extractor_names_bracketed_literal_either_way() {
        let fields = |reference: &str| {
            line(&[r"a\[x\]b[W:1]\[x\]", "1", "", &format!(r#"{{"k": "{reference}"}}"#)])
        };
        assert_eq!(parse_line(&fields(r"a\\[x\\]b")).unwrap().extractors["k"], 0);
        assert_eq!(parse_line(&fields("a[x]b")).unwrap().extractors["k"], 0);
        assert_eq!(parse_line(&fields("[x]")).unwrap().extractors["k"], 2);
    }

    #[test]
    fn extractor_missing_expr() {
        assert!(matches!(
            parse_err(&line(&["abc", "1", "", r#"{"a": "[D:city]"}"#])),
            TemplateError::UnresolvedExtractor { .. }
        ));
    }

    #[test]
    fn extractor_value_must_be_string() {
        assert!(matches!(
            parse_err(&line(&["abc", "1", "", r#"{"a": 0}"#])),
            TemplateError::InvalidExtractor(_)
        ));
    }

    #[test]
    fn bad_score() {
        assert_eq!(
            parse_err("abc\thigh"),
            TemplateError::InvalidScore("high".into())
        );
    }

    #[test]
    fn field_count() {
        assert_eq!(parse_err("abc"), TemplateError::FieldCount(1));
        assert_eq!(parse_err("a\t1\t\t\t"), TemplateError::FieldCount(5));
    }

    #[test]
    fn inverted_wildcard_line() {
        assert!(matches!(
            parse_err("a[W:5-2]\t1"),
            TemplateError::InvertedWildcard { .. }
        ));
    }
}
