//! URL → relative path normalization.
//!
//! Each URL candidate is turned into a path candidate by four steps, in
//! order:
//!
//! 1. strip one leading `/`
//! 2. drop a query component when an extension follows it
//!    (`a?v=1.js` → `a.js`); other queries are kept verbatim
//! 3. collapse a doubled trailing extension (`a.js.js` → `a.js`)
//! 4. append `.js` unless the last three characters are `.js` or `.ts`
//!
//! Paths shorter than three characters are left as they are by step 4.

/// Extension tags a lambda source may carry.
pub const EXTENSIONS: [&str; 2] = [".js", ".ts"];

/// Extension appended when a path names none.
pub const DEFAULT_EXTENSION: &str = ".js";

/// Normalize every URL candidate, preserving order.
pub fn path_candidates<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    urls.iter().map(|url| normalize(url.as_ref())).collect()
}

/// Normalize a single URL candidate into a relative path.
pub fn normalize(url: &str) -> String {
    let path = url.strip_prefix('/').unwrap_or(url);
    let path = strip_query(path);
    let path = collapse_doubled_extension(&path);
    with_extension(path)
}

/// Remove `?...` up to the first `.` that follows it.
fn strip_query(path: &str) -> String {
    let Some(query) = path.find('?') else {
        return path.to_string();
    };
    match path[query..].find('.') {
        Some(offset) => format!("{}{}", &path[..query], &path[query + offset..]),
        None => path.to_string(),
    }
}

fn collapse_doubled_extension(path: &str) -> &str {
    for ext in EXTENSIONS {
        if let Some(stem) = path.strip_suffix(ext) {
            if stem.ends_with(ext) {
                return stem;
            }
        }
    }
    path
}

fn with_extension(path: &str) -> String {
    let tail_start = match path.char_indices().rev().nth(2) {
        Some((index, _)) => index,
        None => return path.to_string(),
    };

    if EXTENSIONS.contains(&&path[tail_start..]) {
        path.to_string()
    } else {
        format!("{}{}", path, DEFAULT_EXTENSION)
    }
}
