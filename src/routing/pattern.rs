//! Route source pattern compilation.
//!
//! # Responsibilities
//! - Extract named capture group names from a route `src`, in order
//! - Degrade named groups to positional groups before compiling
//! - Fail fast on malformed patterns
//!
//! # Design Decisions
//! - Matching never relies on named-group retrieval: names are kept on the
//!   side and mapped to positional indices by the rewriter
//! - Both `(?<name>...)` and `(?P<name>...)` spellings are recognized
//! - Escaped parentheses and parentheses inside character classes are
//!   left untouched
//! - Route sources are ECMAScript regexes. Patterns the `regex` crate
//!   accepts are compiled with it; look-around and backreferences fall back
//!   to `regress`, which implements ECMAScript semantics. A pattern both
//!   reject is malformed.

use std::ops::Range;
use thiserror::Error;

/// Error raised when a route `src` is not a valid regex.
#[derive(Debug, Error)]
#[error("invalid route pattern `{pattern}`: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

#[derive(Debug, Clone)]
enum Engine {
    Standard(regex::Regex),
    Ecma(regress::Regex),
}

/// Where a pattern matched: the whole match and each positional group.
#[derive(Debug, Clone, PartialEq)]
pub struct Captures {
    pub range: Range<usize>,
    groups: Vec<Option<Range<usize>>>,
}

impl Captures {
    /// Byte range of positional group `index` (1-based), if it took part.
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        match index {
            0 => Some(self.range.clone()),
            n => self.groups.get(n - 1).cloned().flatten(),
        }
    }
}

/// A compiled route `src`.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    engine: Engine,
    group_names: Vec<String>,
    group_slots: Vec<usize>,
}

impl RoutePattern {
    /// Compile a route `src` into a matcher.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        let (degraded, groups) = degrade_named_groups(source);

        let engine = match regex::Regex::new(&degraded) {
            Ok(regex) => Engine::Standard(regex),
            // Named groups keep their positional slots in ECMAScript, and
            // `\k<name>` needs the names, so the source is compiled as written.
            Err(standard) => match regress::Regex::new(source) {
                Ok(regex) => {
                    tracing::debug!(pattern = %source, "Route compiled with ECMAScript engine");
                    Engine::Ecma(regex)
                }
                Err(_) => {
                    return Err(PatternError {
                        pattern: source.to_string(),
                        message: standard.to_string(),
                    })
                }
            },
        };

        let (group_names, group_slots) = groups.into_iter().unzip();
        Ok(Self {
            source: source.to_string(),
            engine,
            group_names,
            group_slots,
        })
    }

    /// The pattern as written in `now.json`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the named groups, in syntactic order.
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Positional group index (1-based) of a named group.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.group_names
            .iter()
            .position(|candidate| candidate == name)
            .map(|i| self.group_slots[i])
    }

    pub fn is_match(&self, url: &str) -> bool {
        match &self.engine {
            Engine::Standard(regex) => regex.is_match(url),
            Engine::Ecma(regex) => regex.find(url).is_some(),
        }
    }

    /// The first match in `url`, with positional group ranges.
    pub fn captures(&self, url: &str) -> Option<Captures> {
        match &self.engine {
            Engine::Standard(regex) => {
                let caps = regex.captures(url)?;
                let range = caps.get(0)?.range();
                let groups = (1..caps.len())
                    .map(|i| caps.get(i).map(|m| m.range()))
                    .collect();
                Some(Captures { range, groups })
            }
            Engine::Ecma(regex) => {
                let found = regex.find(url)?;
                Some(Captures {
                    range: found.range(),
                    groups: found.captures,
                })
            }
        }
    }

    /// Whether the pattern needed the ECMAScript engine.
    pub fn is_ecmascript_only(&self) -> bool {
        matches!(self.engine, Engine::Ecma(_))
    }
}

/// Rewrite named groups as plain groups, collecting each name with its
/// positional group index. Unnamed capturing groups advance the index too.
fn degrade_named_groups(source: &str) -> (String, Vec<(String, usize)>) {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut names = Vec::new();
    let mut slot = 0;
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            out.push(c);
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }

        if in_class {
            if c == ']' {
                in_class = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '[' => {
                in_class = true;
                out.push(c);
                // A leading `]` (or `^]`) is a literal member of the class.
                if chars.get(i + 1) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
                if chars.get(i + 1) == Some(&']') {
                    out.push(']');
                    i += 1;
                }
                i += 1;
            }
            '(' => match named_group_at(&chars, i) {
                Some((name, consumed)) => {
                    slot += 1;
                    names.push((name, slot));
                    out.push('(');
                    i += consumed;
                }
                None => {
                    if chars.get(i + 1) != Some(&'?') {
                        slot += 1;
                    }
                    out.push(c);
                    i += 1;
                }
            },
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    (out, names)
}

/// If a named group opens at `start`, return its name and the length of
/// the `(?<name>` prefix.
fn named_group_at(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start + 1;
    if chars.get(i) != Some(&'?') {
        return None;
    }
    i += 1;
    if chars.get(i) == Some(&'P') {
        i += 1;
    }
    if chars.get(i) != Some(&'<') {
        return None;
    }
    i += 1;

    let name_start = i;
    match chars.get(i) {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {}
        _ => return None,
    }
    while let Some(c) = chars.get(i) {
        if c.is_ascii_alphanumeric() || *c == '_' {
            i += 1;
        } else {
            break;
        }
    }
    if chars.get(i) != Some(&'>') {
        return None;
    }

    let name: String = chars[name_start..i].iter().collect();
    Some((name, i + 1 - start))
}
