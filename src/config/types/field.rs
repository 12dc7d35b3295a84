//! Dotted config locations: `build.workers`, `routes[2].pattern`.

use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Cow<'static, str>);

impl FieldPath {
    pub fn new(path: impl Into<Cow<'static, str>>) -> Self {
        Self(path.into())
    }

    /// `field` inside entry `index` of the `array` of tables.
    pub fn indexed(array: &str, index: usize, field: &str) -> Self {
        Self(format!("{array}[{index}].{field}").into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(FieldPath::indexed("routes", 2, "pattern").to_string(), "routes[2].pattern");
        assert_eq!(FieldPath::new("build.workers").as_str(), "build.workers");
    }
}
