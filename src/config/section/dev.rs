//! `[dev]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [dev]
//! debounce_ms = 500                       # Coalesce change bursts within this window
//! ignore = ["/.git/**", "/target/**"]     # Watcher ignore globs (route pattern syntax)
//! reload = true                           # Inject the live-reload client into HTML
//! ```
//!
//! Ignore globs are matched against paths relative to the project root, so
//! they start with `/`. The output directory is always ignored.

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::route::PathPattern;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    /// Debounce window for change notifications, in milliseconds.
    pub debounce_ms: u64,

    /// Paths whose changes never trigger a reload.
    pub ignore: Vec<String>,

    /// Inject the live-reload client before `</body>`.
    pub reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            ignore: vec!["/.git/**".into(), "/target/**".into()],
            reload: true,
        }
    }
}

impl DevConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (i, glob) in self.ignore.iter().enumerate() {
            if let Err(e) = PathPattern::parse(glob) {
                diag.error(FieldPath::new(format!("dev.ignore[{i}]")), e.to_string());
            }
        }
    }

    /// Compiled ignore globs; invalid entries are skipped (they fail validation).
    pub fn ignore_patterns(&self) -> Vec<PathPattern> {
        self.ignore
            .iter()
            .filter_map(|glob| PathPattern::parse(glob).ok())
            .collect()
    }
}
