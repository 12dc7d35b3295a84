//! Small HTML helpers for the reference rewriter and error pages.
//!
//! Only start tags are ever parsed here. The rewriter finds them with a
//! regex; this module turns the attribute text into a [`StartTag`] and
//! renders it back.

use std::borrow::Cow;

/// Escape text or an attribute value.
pub fn escape(s: &str) -> Cow<'_, str> {
    let needs = |c: char| matches!(c, '<' | '>' | '&' | '"' | '\'');
    if !s.contains(needs) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decode one entity body (without `&` and `;`).
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Decode named and numeric entities. Unknown entities are kept verbatim.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&after[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Split `href="/a.css?x=1&amp;y=2" rel=stylesheet disabled` into decoded
/// name/value pairs. Boolean attributes get an empty value; a stray `/` is
/// skipped.
pub fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c == '=' || c == '/' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            attrs.push((name, String::new()));
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (raw, remaining) = match after_eq.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                match body.find(quote) {
                    Some(end) => (&body[..end], &body[end + 1..]),
                    None => (body, ""),
                }
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                after_eq.split_at(end)
            }
        };
        attrs.push((name, unescape(raw).into_owned()));
        rest = remaining;
    }

    attrs
}

// =============================================================================
// Start Tags
// =============================================================================

/// A parsed start tag (`<name attr="value" ...>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

impl StartTag {
    /// `raw` is everything between the tag name and the closing `>`.
    pub fn parse(name: &str, raw: &str) -> Self {
        let trimmed = raw.trim_end();
        let self_closing = trimmed.ends_with('/');
        Self {
            name: name.to_ascii_lowercase(),
            attrs: parse_attributes(trimmed.trim_end_matches('/')),
            self_closing,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace in place, or append when absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Whether a space-separated attribute such as `rel` lists `token`.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|v| {
            v.split_ascii_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
    }

    /// Boolean attributes render without a value.
    pub fn render(&self) -> String {
        let mut out = format!("<{}", self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            if !v.is_empty() {
                out.push_str("=\"");
                out.push_str(&escape(v));
                out.push('"');
            }
        }
        out.push_str(if self.self_closing { " />" } else { ">" });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert!(matches!(escape("plain"), Cow::Borrowed("plain")));
        assert_eq!(
            escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("&lt;b&gt; &amp; &quot;q&quot;"), "<b> & \"q\"");
        assert_eq!(unescape("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(unescape("&nbsp;"), "\u{00A0}");
        assert_eq!(unescape("AT&T &bogus; &"), "AT&T &bogus; &");
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"a="1" b='2' c=3 disabled"#);
        let expected = [("a", "1"), ("b", "2"), ("c", "3"), ("disabled", "")];
        assert_eq!(attrs.len(), expected.len());
        for ((k, v), (ek, ev)) in attrs.iter().zip(expected) {
            assert_eq!((k.as_str(), v.as_str()), (ek, ev));
        }
    }

    #[test]
    fn test_parse_attributes_decodes_and_skips_slash() {
        let attrs = parse_attributes(r#"href="/a.css?x=1&amp;y=2" rel=stylesheet /"#);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].1, "/a.css?x=1&y=2");
        assert_eq!(attrs[1], ("rel".to_string(), "stylesheet".to_string()));
    }

    #[test]
    fn test_start_tag_edit_and_render() {
        let mut tag = StartTag::parse("LINK", r#" rel="preload stylesheet" href='/a.css' /"#);
        assert_eq!(tag.name, "link");
        assert!(tag.self_closing);
        assert!(tag.has_token("rel", "stylesheet"));
        assert!(!tag.has_token("rel", "icon"));

        tag.set("href", "/a-1234abcd.css");
        assert_eq!(
            tag.render(),
            r#"<link rel="preload stylesheet" href="/a-1234abcd.css" />"#
        );

        tag.remove("href");
        assert_eq!(tag.get("href"), None);
    }

    #[test]
    fn test_start_tag_boolean_attribute() {
        let tag = StartTag::parse("script", r#" type="module" async src="/app.js""#);
        assert_eq!(tag.render(), r#"<script type="module" async src="/app.js">"#);
    }
}
