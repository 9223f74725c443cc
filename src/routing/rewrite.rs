//! Destination template substitution.
//!
//! # Responsibilities
//! - Translate `$name` / `${name}` references in a route `dest` into
//!   positional group references against the compiled pattern
//! - Produce the rewritten URL for a matched route
//!
//! # Design Decisions
//! - References are tokenized with maximal munch, so `$id` never matches a
//!   prefix of `$identifier`
//! - Unknown names are kept as literal text, never silently emptied
//! - Only the first match of `src` in the URL is replaced; the rest of the
//!   URL is carried over unchanged
//! - Substitution works on capture ranges, so it is the same whichever
//!   engine compiled the pattern

use crate::routing::pattern::RoutePattern;

/// One piece of an expanded `dest` template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    /// Positional group (1-based); a group that did not participate
    /// expands to nothing.
    Group(usize),
}

/// Rewrite `url` with `dest`, if `pattern` matches it.
///
/// Returns `None` when the pattern does not match.
pub fn rewrite(pattern: &RoutePattern, dest: &str, url: &str) -> Option<String> {
    let captures = pattern.captures(url)?;
    let template = expand_template(pattern, dest);

    let mut out = String::with_capacity(url.len() + dest.len());
    out.push_str(&url[..captures.range.start]);
    for part in &template {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Group(n) => {
                if let Some(range) = captures.group(*n) {
                    out.push_str(&url[range]);
                }
            }
        }
    }
    out.push_str(&url[captures.range.end..]);
    Some(out)
}

/// Split a `dest` template into literal text and positional references.
pub fn expand_template(pattern: &RoutePattern, dest: &str) -> Vec<TemplatePart> {
    let chars: Vec<char> = dest.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }

        let (reference, consumed) = read_reference(&chars[i + 1..]);
        let slot = match &reference {
            Some(Reference::Index(n)) => Some(*n),
            Some(Reference::Name(name)) => pattern.group_index(name),
            None => None,
        };

        match slot {
            Some(n) => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(TemplatePart::Group(n));
            }
            None => {
                literal.push('$');
                literal.extend(&chars[i + 1..i + 1 + consumed]);
            }
        }
        i += 1 + consumed;
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    parts
}

#[derive(Debug, PartialEq)]
enum Reference {
    Index(usize),
    Name(String),
}

/// Read the reference following a `$`. Returns the reference (if the text
/// forms one) and the number of characters it spans.
fn read_reference(rest: &[char]) -> (Option<Reference>, usize) {
    match rest.first() {
        Some('{') => match rest.iter().position(|c| *c == '}') {
            Some(close) => {
                let inner: String = rest[1..close].iter().collect();
                (parse_reference(&inner), close + 1)
            }
            None => (None, 0),
        },
        Some(c) if c.is_ascii_digit() => {
            let len = rest.iter().take_while(|c| c.is_ascii_digit()).count();
            let digits: String = rest[..len].iter().collect();
            (parse_reference(&digits), len)
        }
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
            let len = rest
                .iter()
                .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
                .count();
            let name: String = rest[..len].iter().collect();
            (parse_reference(&name), len)
        }
        _ => (None, 0),
    }
}

fn parse_reference(text: &str) -> Option<Reference> {
    if text.is_empty() {
        return None;
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().ok().map(Reference::Index);
    }
    let mut chars = text.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(Reference::Name(text.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> RoutePattern {
        RoutePattern::compile(src).unwrap()
    }

    #[test]
    fn test_static_destination() {
        let pattern = compile("/api/(?<id>[0-9]+)");
        assert_eq!(
            rewrite(&pattern, "/functions/show.js", "/api/42").as_deref(),
            Some("/functions/show.js")
        );
    }

    #[test]
    fn test_named_substitution() {
        let pattern = compile("^/users/(?<user>[a-z]+)/posts/(?<id>[0-9]+)$");
        assert_eq!(
            rewrite(&pattern, "/post.js?user=$user&id=$id", "/users/ann/posts/7").as_deref(),
            Some("/post.js?user=ann&id=7")
        );
    }

    #[test]
    fn test_every_occurrence_is_substituted() {
        let pattern = compile("^/(?<a>[a-z]+)$");
        assert_eq!(
            rewrite(&pattern, "/$a/$a.js", "/x").as_deref(),
            Some("/x/x.js")
        );
    }

    #[test]
    fn test_partial_names_do_not_collide() {
        let pattern = compile("^/(?<id>[0-9]+)/(?<identifier>[a-z]+)$");
        assert_eq!(
            rewrite(&pattern, "/$identifier/$id.js", "/12/abc").as_deref(),
            Some("/abc/12.js")
        );
    }

    #[test]
    fn test_braced_and_positional_references() {
        let pattern = compile("^/(?<name>[a-z]+)$");
        assert_eq!(
            rewrite(&pattern, "/${name}x/$1.js", "/page").as_deref(),
            Some("/pagex/page.js")
        );
    }

    #[test]
    fn test_unknown_reference_is_literal() {
        let pattern = compile("^/(?<id>[0-9]+)$");
        assert_eq!(
            rewrite(&pattern, "/show.js?x=$other&cost=5$", "/3").as_deref(),
            Some("/show.js?x=$other&cost=5$")
        );
    }

    #[test]
    fn test_unused_group_is_not_an_error() {
        let pattern = compile("^/(?<id>[0-9]+)$");
        assert_eq!(rewrite(&pattern, "/static.js", "/3").as_deref(), Some("/static.js"));
    }

    #[test]
    fn test_unmatched_parts_are_kept() {
        let pattern = compile("/api/(?<id>[0-9]+)");
        assert_eq!(
            rewrite(&pattern, "/show.js", "/api/42?debug=1").as_deref(),
            Some("/show.js?debug=1")
        );
    }

    #[test]
    fn test_no_match() {
        let pattern = compile("^/api/(?<id>[0-9]+)$");
        assert_eq!(rewrite(&pattern, "/show.js", "/other"), None);
    }

    #[test]
    fn test_template_parts() {
        let pattern = compile("^/(?<id>[0-9]+)$");
        assert_eq!(
            expand_template(&pattern, "/show.js?id=$id&x=$nope"),
            vec![
                TemplatePart::Literal("/show.js?id=".into()),
                TemplatePart::Group(1),
                TemplatePart::Literal("&x=$nope".into()),
            ]
        );
    }

    #[test]
    fn test_lookahead_route_rewrites() {
        let pattern = compile("^/(?!api/)(?<page>[^/]+)$");
        assert_eq!(
            rewrite(&pattern, "/pages/$page.js", "/about").as_deref(),
            Some("/pages/about.js")
        );
        assert_eq!(rewrite(&pattern, "/pages/$page.js", "/api/x"), None);
    }

    #[test]
    fn test_rewrite_is_repeatable() {
        let pattern = compile("^/(?<slug>[a-z-]+)$");
        let first = rewrite(&pattern, "/pages/$slug.js", "/hello-world");
        let second = rewrite(&pattern, "/pages/$slug.js", "/hello-world");
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("/pages/hello-world.js"));
    }
}
