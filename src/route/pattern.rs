//! Route path patterns.
//!
//! Patterns are `/`-rooted URL templates compiled to an anchored regex:
//!
//! | Syntax      | Matches                                        |
//! |-------------|------------------------------------------------|
//! | `/about`    | literal path                                   |
//! | `:name`     | one segment                                    |
//! | `:name?`    | optional segment (param is `None` when absent) |
//! | `:name*`    | zero or more segments                          |
//! | `:name+`    | one or more segments                           |
//! | `*`         | anonymous, within one segment                  |
//! | `**`        | anonymous, across segments (`**/` = any dirs)  |
//! | `\x`        | literal `x`                                    |
//!
//! Anonymous wildcards are captured under `"0"`, `"1"`, ... in order.

use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Invalid route pattern syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("pattern `{pattern}` has a parameter without a name at offset {offset}")]
    EmptyName { pattern: String, offset: usize },

    #[error("pattern `{pattern}` declares parameter `{name}` twice")]
    DuplicateName { pattern: String, name: String },

    #[error("pattern `{pattern}` uses unsupported character `{ch}` (escape it with `\\`)")]
    Unsupported { pattern: String, ch: char },

    #[error("pattern `{0}` ends with a dangling `\\`")]
    TrailingEscape(String),

    #[error("pattern `{pattern}` compiles to an invalid matcher: {message}")]
    Regex { pattern: String, message: String },
}

/// Compiled route pattern.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    /// Public capture names, index `i` maps to regex group `g{i}`.
    names: Vec<String>,
    /// Unescaped text when the pattern has no captures.
    literal: Option<String>,
}

impl PathPattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        if !source.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(source.to_string()));
        }

        let mut compiler = Compiler::new(source);
        compiler.run()?;
        compiler.finish()
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `Some(path)` when the pattern only matches one path.
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path`, extracting named and anonymous captures.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let values = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = caps.name(&group_name(i)).map(|m| m.as_str().to_string());
                (name.clone(), value)
            })
            .collect();
        Some(Params(values))
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn group_name(index: usize) -> String {
    format!("g{index}")
}

// ============================================================================
// Params
// ============================================================================

/// Captured parameters, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, Option<String>)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a capture; `None` when unknown or when an optional part was absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Whether the pattern declares `name` (even if it did not match anything).
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Compiler
// ============================================================================

const SEGMENT: &str = "[^/]+";
const SEGMENTS: &str = "[^/]+(?:/[^/]+)*";

struct Compiler<'a> {
    source: &'a str,
    regex: String,
    /// Pending literal text, escaped on flush.
    pending: String,
    names: Vec<String>,
    anonymous: usize,
    literal: String,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            regex: String::from("^"),
            pending: String::new(),
            names: Vec::new(),
            anonymous: 0,
            literal: String::new(),
        }
    }

    fn run(&mut self) -> Result<(), PatternError> {
        let mut chars = self.source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '\\' => {
                    let (_, escaped) = chars
                        .next()
                        .ok_or_else(|| PatternError::TrailingEscape(self.source.to_string()))?;
                    self.push_literal(escaped);
                }
                ':' => {
                    let mut name = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.is_empty() {
                        return Err(PatternError::EmptyName {
                            pattern: self.source.to_string(),
                            offset,
                        });
                    }
                    let modifier = chars.next_if(|&(_, c)| matches!(c, '?' | '*' | '+'));
                    self.push_param(name, modifier.map(|(_, c)| c))?;
                }
                '*' => {
                    if chars.next_if(|&(_, c)| c == '*').is_some() {
                        let dirs = chars.next_if(|&(_, c)| c == '/').is_some();
                        self.push_globstar(dirs)?;
                    } else {
                        self.push_star()?;
                    }
                }
                '(' | ')' | '{' | '}' => {
                    return Err(PatternError::Unsupported {
                        pattern: self.source.to_string(),
                        ch,
                    });
                }
                _ => self.push_literal(ch),
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<PathPattern, PatternError> {
        self.flush();
        self.regex.push('$');

        let regex = Regex::new(&self.regex).map_err(|e| PatternError::Regex {
            pattern: self.source.to_string(),
            message: e.to_string(),
        })?;
        let literal = self.names.is_empty().then_some(self.literal);

        Ok(PathPattern {
            source: self.source.to_string(),
            regex,
            names: self.names,
            literal,
        })
    }

    fn push_literal(&mut self, ch: char) {
        self.pending.push(ch);
        self.literal.push(ch);
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.regex.push_str(&regex::escape(&self.pending));
            self.pending.clear();
        }
    }

    /// Take the `/` right before an optional capture so `/blog/:page?` also
    /// matches `/blog`. A slash at the very start stays, keeping `/` matchable.
    fn take_separator(&mut self) -> bool {
        let at_root = self.regex == "^" && self.pending == "/";
        if self.pending.ends_with('/') && !at_root {
            self.pending.pop();
            true
        } else {
            false
        }
    }

    fn register(&mut self, name: String) -> Result<String, PatternError> {
        if self.names.contains(&name) {
            return Err(PatternError::DuplicateName {
                pattern: self.source.to_string(),
                name,
            });
        }
        self.names.push(name);
        Ok(group_name(self.names.len() - 1))
    }

    fn next_anonymous(&mut self) -> Result<String, PatternError> {
        let name = self.anonymous.to_string();
        self.anonymous += 1;
        self.register(name)
    }

    fn push_param(&mut self, name: String, modifier: Option<char>) -> Result<(), PatternError> {
        let group = self.register(name)?;
        match modifier {
            None => {
                self.flush();
                self.regex.push_str(&format!("(?P<{group}>{SEGMENT})"));
            }
            Some('+') => {
                self.flush();
                self.regex.push_str(&format!("(?P<{group}>{SEGMENTS})"));
            }
            Some(m) => {
                let body = if m == '?' { SEGMENT } else { SEGMENTS };
                let separated = self.take_separator();
                self.flush();
                if separated {
                    self.regex.push_str(&format!("(?:/(?P<{group}>{body}))?"));
                } else {
                    self.regex.push_str(&format!("(?P<{group}>{body})?"));
                }
            }
        }
        Ok(())
    }

    fn push_star(&mut self) -> Result<(), PatternError> {
        let group = self.next_anonymous()?;
        self.flush();
        self.regex.push_str(&format!("(?P<{group}>[^/]*)"));
        Ok(())
    }

    fn push_globstar(&mut self, dirs: bool) -> Result<(), PatternError> {
        let group = self.next_anonymous()?;
        self.flush();
        if dirs {
            self.regex.push_str(&format!("(?:(?P<{group}>{SEGMENTS})/)?"));
        } else {
            self.regex.push_str(&format!("(?P<{group}>.*)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> PathPattern {
        PathPattern::parse(s).unwrap()
    }

    #[test]
    fn test_literal() {
        let p = pattern("/style.css");
        assert_eq!(p.literal(), Some("/style.css"));
        assert!(p.is_match("/style.css"));
        assert!(!p.is_match("/styleXcss"));
        assert!(!p.is_match("/style.css/extra"));
    }

    #[test]
    fn test_escape_makes_literal() {
        let p = pattern(r"/a\:b\*");
        assert_eq!(p.literal(), Some("/a:b*"));
        assert!(p.is_match("/a:b*"));
    }

    #[test]
    fn test_named_segment() {
        let p = pattern("/blog/:slug");
        assert!(!p.is_literal());
        let params = p.matches("/blog/hello").unwrap();
        assert_eq!(params.get("slug"), Some("hello"));
        assert!(p.matches("/blog/a/b").is_none());
        assert!(p.matches("/blog/").is_none());
    }

    #[test]
    fn test_named_segment_inside_name() {
        let p = pattern("/posts/:slug.html");
        assert_eq!(p.matches("/posts/intro.html").unwrap().get("slug"), Some("intro"));
    }

    #[test]
    fn test_optional_segment() {
        let p = pattern("/blog/:page?");
        let absent = p.matches("/blog").unwrap();
        assert!(absent.contains("page"));
        assert_eq!(absent.get("page"), None);
        assert_eq!(p.matches("/blog/2").unwrap().get("page"), Some("2"));
    }

    #[test]
    fn test_optional_at_root() {
        let p = pattern("/:page?");
        assert_eq!(p.matches("/").unwrap().get("page"), None);
        assert_eq!(p.matches("/about").unwrap().get("page"), Some("about"));
    }

    #[test]
    fn test_repeated_segments() {
        let star = pattern("/docs/:path*");
        assert_eq!(star.matches("/docs").unwrap().get("path"), None);
        assert_eq!(star.matches("/docs/a/b").unwrap().get("path"), Some("a/b"));

        let plus = pattern("/docs/:path+");
        assert!(plus.matches("/docs").is_none());
        assert_eq!(plus.matches("/docs/a/b").unwrap().get("path"), Some("a/b"));
    }

    #[test]
    fn test_anonymous_wildcards() {
        let p = pattern("/assets/*.css");
        assert_eq!(p.matches("/assets/site.css").unwrap().get("0"), Some("site"));
        assert!(p.matches("/assets/sub/site.css").is_none());

        let deep = pattern("/assets/**/*.png");
        let params = deep.matches("/assets/img/icons/logo.png").unwrap();
        assert_eq!(params.get("0"), Some("img/icons"));
        assert_eq!(params.get("1"), Some("logo"));
        let shallow = deep.matches("/assets/logo.png").unwrap();
        assert_eq!(shallow.get("0"), None);

        let tail = pattern("/.git/**");
        assert!(tail.is_match("/.git/refs/heads/main"));
        assert!(!tail.is_match("/.github/workflows/ci.yml"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            PathPattern::parse("blog"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            PathPattern::parse("/blog/:"),
            Err(PatternError::EmptyName { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/:a/:a"),
            Err(PatternError::DuplicateName { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/(foo)"),
            Err(PatternError::Unsupported { ch: '(', .. })
        ));
        assert!(matches!(
            PathPattern::parse("/{a}"),
            Err(PatternError::Unsupported { ch: '{', .. })
        ));
        assert!(matches!(
            PathPattern::parse("/a\\"),
            Err(PatternError::TrailingEscape(_))
        ));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = pattern("/a+b.c");
        assert!(p.is_match("/a+b.c"));
        assert!(!p.is_match("/aab.c"));
        assert!(!p.is_match("/a+bxc"));
    }
}
