//! Shared utilities.
//!
//! - [`exec`]: external command execution
//! - [`html`]: escaping, attribute parsing, start-tag rendering
//! - [`mime`]: content type detection
//! - [`url`]: URL path arithmetic

pub mod exec;
pub mod html;
pub mod mime;
pub mod url;

/// `"1 route"`, `"3 routes"`, `"0 routes"`.
pub fn plural_count(count: usize, noun: &str) -> String {
    match count {
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "artifact"), "0 artifacts");
        assert_eq!(plural_count(1, "worker"), "1 worker");
        assert_eq!(plural_count(3, "route"), "3 routes");
    }
}
