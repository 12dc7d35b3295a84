//! Stock route handlers.
//!
//! | Handler              | Produces                                   |
//! |----------------------|--------------------------------------------|
//! | [`file`]             | `<input>/<pathname>` bytes                 |
//! | [`command`]          | stdout of an external transform           |
//! | [`redirect`]         | `307` / `308` passthrough                  |
//! | [`json()`]           | `application/json` passthrough             |
//! | [`method`]           | per-method dispatch, `405` otherwise       |
//!
//! [`HandlerConfig`] is the declarative form used by `[[routes]]` in
//! `hallmark.toml`.

pub mod command;
pub mod file;
pub mod json;
pub mod method;
pub mod redirect;

pub use command::{CommandHandler, command};
pub use file::{file, file_from};
pub use json::json;
pub use method::MethodGuard;

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::route::{Handler, handler};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Handler declared in configuration.
///
/// ```toml
/// handler = { kind = "file" }
/// handler = { kind = "file", source = "public/robots.txt" }
/// handler = { kind = "command", command = ["esbuild", "--bundle", "{path}"], fallback_ext = "ts" }
/// handler = { kind = "redirect", location = "/blog/", permanent = true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HandlerConfig {
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<PathBuf>,
    },
    Command {
        command: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_ext: Option<String>,
    },
    Redirect {
        location: String,
        #[serde(default)]
        permanent: bool,
    },
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::File { source: None }
    }
}

impl HandlerConfig {
    pub fn validate(&self, field: FieldPath, diag: &mut ConfigDiagnostics) {
        match self {
            Self::Command { command, .. } if command.first().is_none_or(String::is_empty) => {
                diag.error_with_hint(
                    field,
                    "command handler needs a program",
                    "command = [\"esbuild\", \"--minify\", \"{path}\"]",
                );
            }
            Self::Redirect { location, .. } if location.trim().is_empty() => {
                diag.error(field, "redirect handler needs a location");
            }
            _ => {}
        }
    }

    /// Resolve paths against `root` and build the handler.
    pub fn into_handler(self, root: &Path) -> Handler {
        match self {
            Self::File { source: None } => handler(file()),
            Self::File {
                source: Some(source),
            } => handler(file_from(root.join(source))),
            Self::Command {
                command,
                fallback_ext,
            } => {
                let mut h = CommandHandler::new(command);
                if let Some(ext) = fallback_ext {
                    h = h.fallback_ext(ext);
                }
                handler(h.into_fn())
            }
            Self::Redirect {
                location,
                permanent: true,
            } => handler(redirect::permanent(location)),
            Self::Redirect { location, .. } => handler(redirect::temporary(location)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        handler: HandlerConfig,
    }

    fn parse(s: &str) -> HandlerConfig {
        toml::from_str::<Wrapper>(s).unwrap().handler
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(parse(r#"handler = { kind = "file" }"#), HandlerConfig::default());
        assert_eq!(
            parse(r#"handler = { kind = "command", command = ["cat"], fallback_ext = "ts" }"#),
            HandlerConfig::Command {
                command: vec!["cat".into()],
                fallback_ext: Some("ts".into())
            }
        );
        assert_eq!(
            parse(r#"handler = { kind = "redirect", location = "/new" }"#),
            HandlerConfig::Redirect {
                location: "/new".into(),
                permanent: false
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_error() {
        assert!(toml::from_str::<Wrapper>(r#"handler = { kind = "php" }"#).is_err());
    }

    #[test]
    fn test_validate() {
        let mut diag = ConfigDiagnostics::new();
        HandlerConfig::Command {
            command: vec![],
            fallback_ext: None,
        }
        .validate(FieldPath::new("routes[0].handler"), &mut diag);
        HandlerConfig::Redirect {
            location: " ".into(),
            permanent: true,
        }
        .validate(FieldPath::new("routes[1].handler"), &mut diag);
        HandlerConfig::default().validate(FieldPath::new("routes[2].handler"), &mut diag);
        assert_eq!(diag.len(), 2);
    }
}
