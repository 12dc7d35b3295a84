//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! input = "public"            # Source root handlers read from (relative to config)
//! output = "dist"             # Output root: files/, 404.html, manifest.json, serve.rs
//! workers = 0                 # Build workers (0 = available parallelism, 1 = serial)
//! inline = true               # Honor `?inline` on stylesheet and script references
//! entry = "serve.rs"          # Generated server entry file name
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Source root.
    pub input: PathBuf,

    /// Build output root.
    pub output: PathBuf,

    /// Worker pool size; `0` uses the available parallelism.
    pub workers: usize,

    /// Allow `?inline` asset inlining.
    pub inline: bool,

    /// Generated server entry, written to `<output>/<entry>`.
    pub entry: String,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            input: "public".into(),
            output: "dist".into(),
            workers: 0,
            inline: true,
            entry: "serve.rs".into(),
        }
    }
}

impl BuildSectionConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.input == self.output {
            diag.error(
                FieldPath::new("build.output"),
                "output directory must differ from input (it is cleared on every build)",
            );
        }
        if self.entry.is_empty() || self.entry.contains(['/', '\\']) {
            diag.error_with_hint(
                FieldPath::new("build.entry"),
                "entry must be a plain file name",
                "entry = \"serve.rs\"",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.input, PathBuf::from("public"));
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.workers, 0);
        assert!(config.build.inline);
        assert_eq!(config.build.entry, "serve.rs");
    }

    #[test]
    fn test_build_config_override() {
        let config = test_parse_config("[build]\ninput = \"site\"\nworkers = 1\ninline = false");
        assert_eq!(config.build.input, PathBuf::from("site"));
        assert_eq!(config.build.workers, 1);
        assert!(!config.build.inline);
    }

    #[test]
    fn test_build_config_validation() {
        use crate::config::ConfigDiagnostics;

        let config = test_parse_config("[build]\ninput = \"x\"\noutput = \"x\"\nentry = \"a/b.rs\"");
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
