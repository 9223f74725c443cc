//! Glob patterns for build `src` entries.
//!
//! # Responsibilities
//! - Compile a build glob once at startup
//! - Match relative path candidates against it
//!
//! # Supported Syntax
//! - `*` any run of characters within one path segment
//! - `?` exactly one character within a segment
//! - `[abc]`, `[a-z]`, `[!a-z]`, `[^a-z]` character classes
//! - POSIX classes inside brackets: `[[:alpha:]]`, `[[:digit:]_]`, and the
//!   other ASCII classes (`alnum`, `upper`, `lower`, `space`, `blank`,
//!   `punct`, `xdigit`, `word`)
//! - `**` as a whole segment: zero or more segments
//! - `{a,b}` alternatives, nested braces allowed
//! - `\x` escapes `x`
//! - a leading `!` negates the whole pattern
//!
//! # Design Decisions
//! - Wildcards never match a `.` at the start of a segment; such segments
//!   (dotfiles, `..`) only match a pattern segment starting with `.`
//! - An unterminated `[` is matched literally
//! - Matching is segment-wise with backtracking; patterns are tiny and
//!   candidates few, so no automaton is built
//!
//! # Not Supported
//! - Extglobs (`+(a|b)`, `@(a|b)`, `?(a)`, `*(a)`, `!(a)`): the operator
//!   characters keep their plain meaning, so `@(a|b).js` only matches a
//!   file literally named that way and `+(a|b)` is not special at all
//! - Unknown POSIX class names (`[[:foo:]]`) are read as an ordinary class

/// A compiled glob.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobPattern {
    source: String,
    negated: bool,
    alternatives: Vec<Vec<Segment>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    GlobStar,
    Tokens(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    AnyChar,
    AnySequence,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl GlobPattern {
    /// Compile a glob. Compilation never fails: malformed constructs are
    /// taken literally.
    pub fn new(source: &str) -> Self {
        let (negated, body) = match source.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, source),
        };

        let alternatives = expand_braces(body)
            .iter()
            .map(|pattern| compile_segments(pattern))
            .collect();

        Self {
            source: source.to_string(),
            negated,
            alternatives,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a relative path against the glob.
    pub fn matches(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let parts: Vec<&str> = path.split('/').collect();
        let hit = self
            .alternatives
            .iter()
            .any(|segments| match_segments(segments, &parts));
        hit != self.negated
    }
}

/// Expand `{a,b}` alternatives. Unbalanced braces are kept literally.
fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();

    let mut open = None;
    let mut depth = 0;
    let mut commas = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => {
                if depth == 0 {
                    open = Some(i);
                    commas.clear();
                }
                depth += 1;
            }
            ',' if depth == 1 => commas.push(i),
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = open {
                        if !commas.is_empty() {
                            return expand_group(&chars, start, &commas, i);
                        }
                    }
                    open = None;
                }
            }
            _ => {}
        }
        i += 1;
    }

    vec![pattern.to_string()]
}

fn expand_group(chars: &[char], open: usize, commas: &[usize], close: usize) -> Vec<String> {
    let prefix: String = chars[..open].iter().collect();
    let suffix: String = chars[close + 1..].iter().collect();

    let mut bounds = Vec::with_capacity(commas.len() + 2);
    bounds.push(open);
    bounds.extend_from_slice(commas);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let option: String = chars[w[0] + 1..w[1]].iter().collect();
            expand_braces(&format!("{}{}{}", prefix, option, suffix))
        })
        .collect()
}

fn compile_segments(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .map(|part| {
            if part == "**" {
                Segment::GlobStar
            } else {
                Segment::Tokens(compile_tokens(part))
            }
        })
        .collect()
}

fn compile_tokens(part: &str) -> Vec<Token> {
    let chars: Vec<char> = part.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    tokens.push(Token::Literal(next));
                    i += 2;
                } else {
                    tokens.push(Token::Literal('\\'));
                    i += 1;
                }
            }
            '*' => {
                // Runs of stars inside a segment behave like one.
                if tokens.last() != Some(&Token::AnySequence) {
                    tokens.push(Token::AnySequence);
                }
                i += 1;
            }
            '?' => {
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '[' => match parse_class(&chars, i) {
                Some((token, next)) => {
                    tokens.push(token);
                    i = next;
                }
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }

    tokens
}

/// Parse a class starting at `chars[open] == '['`. Returns the token and
/// the index after the closing `]`.
fn parse_class(chars: &[char], open: usize) -> Option<(Token, usize)> {
    let mut i = open + 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut ranges = Vec::new();
    let mut first = true;
    loop {
        let c = *chars.get(i)?;
        if c == ']' && !first {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        first = false;

        if c == '[' && chars.get(i + 1) == Some(&':') {
            if let Some((class, next)) = posix_class(chars, i) {
                ranges.extend_from_slice(class);
                i = next;
                continue;
            }
        }

        let low = if c == '\\' {
            i += 1;
            *chars.get(i)?
        } else {
            c
        };
        i += 1;

        if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|c| *c != ']') {
            let high = *chars.get(i + 1)?;
            ranges.push((low, high));
            i += 2;
        } else {
            ranges.push((low, low));
        }
    }
}

/// Parse `[:name:]` at `chars[open]`. Returns the class ranges and the
/// index after the closing `:]`.
fn posix_class(chars: &[char], open: usize) -> Option<(&'static [(char, char)], usize)> {
    let start = open + 2;
    let len = chars[start..]
        .windows(2)
        .position(|pair| pair == [':', ']'])?;
    let name: String = chars[start..start + len].iter().collect();

    let ranges: &'static [(char, char)] = match name.as_str() {
        "alpha" => &[('a', 'z'), ('A', 'Z')],
        "digit" => &[('0', '9')],
        "alnum" => &[('a', 'z'), ('A', 'Z'), ('0', '9')],
        "upper" => &[('A', 'Z')],
        "lower" => &[('a', 'z')],
        "space" => &[(' ', ' '), ('\t', '\r')],
        "blank" => &[(' ', ' '), ('\t', '\t')],
        "punct" => &[('!', '/'), (':', '@'), ('[', '`'), ('{', '~')],
        "xdigit" => &[('0', '9'), ('a', 'f'), ('A', 'F')],
        "word" => &[('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')],
        _ => return None,
    };
    Some((ranges, start + len + 2))
}

fn match_segments(pattern: &[Segment], parts: &[&str]) -> bool {
    match pattern.split_first() {
        None => parts.is_empty(),
        Some((Segment::GlobStar, rest)) => {
            // Zero segments, or consume one non-dot segment and retry.
            if match_segments(rest, parts) {
                return true;
            }
            match parts.split_first() {
                Some((head, tail)) if !head.starts_with('.') => {
                    match_segments(pattern, tail)
                }
                _ => false,
            }
        }
        Some((Segment::Tokens(tokens), rest)) => match parts.split_first() {
            Some((head, tail)) => match_part(tokens, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn match_part(tokens: &[Token], part: &str) -> bool {
    let chars: Vec<char> = part.chars().collect();
    if chars.first() == Some(&'.') && tokens.first() != Some(&Token::Literal('.')) {
        return false;
    }
    match_tokens(tokens, &chars)
}

fn match_tokens(tokens: &[Token], chars: &[char]) -> bool {
    match tokens.split_first() {
        None => chars.is_empty(),
        Some((Token::AnySequence, rest)) => {
            (0..=chars.len()).any(|skip| match_tokens(rest, &chars[skip..]))
        }
        Some((token, rest)) => match chars.split_first() {
            Some((c, tail)) => token_matches(token, *c) && match_tokens(rest, tail),
            None => false,
        },
    }
}

fn token_matches(token: &Token, c: char) -> bool {
    match token {
        Token::Literal(expected) => *expected == c,
        Token::AnyChar => true,
        Token::AnySequence => true,
        Token::Class { negated, ranges } => {
            let hit = ranges.iter().any(|(low, high)| *low <= c && c <= *high);
            hit != *negated
        }
    }
}
