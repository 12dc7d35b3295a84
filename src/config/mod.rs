//! `hallmark.toml`: `[build]`, `[serve]`, `[dev]`, the `[[routes]]` table
//! and `[not_found]`.
//!
//! The file is optional: an application that registers its routes in code
//! runs on defaults when no `hallmark.toml` is found.

pub mod section;
pub mod types;

pub use section::{BuildSectionConfig, CacheConfig, DevConfig, RouteConfig, ServeConfig};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::{Cli, Commands};
use crate::handlers::HandlerConfig;
use crate::{debug, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "hallmark.toml";

/// Everything `hallmark.toml` can say, plus where it was found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file; relative paths resolve here.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildSectionConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub dev: DevConfig,

    /// Declarative route table, in registration order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found: Option<HandlerConfig>,
}

impl SiteConfig {
    /// Configuration for a CLI invocation.
    ///
    /// `--config` is looked up from the working directory upward. Without a
    /// file, defaults rooted at the working directory apply.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine the working directory")?;

        let mut config = if let Some(path) = find_config_file(&cwd, &cli.config) {
            let mut config = Self::from_path(&path)?;
            config.config_path = path;
            config
        } else {
            debug!("config"; "no {} found, running on defaults", cli.config.display());
            Self {
                config_path: cwd.join(&cli.config),
                ..Self::default()
            }
        };

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.apply_cli(cli);
        config.normalize_paths(&root);
        config.validate()?;
        Ok(config)
    }

    pub fn has_file(&self) -> bool {
        self.config_path.is_file()
    }

    /// Parse without reporting unknown keys.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (config, unknown) = Self::parse_with_ignored(&content)
            .with_context(|| format!("in {}", path.display()))?;

        if !unknown.is_empty() {
            log!("warning"; "{} ignores unknown keys: {}", path.display(), unknown.join(", "));
        }
        Ok(config)
    }

    /// Parse, returning the dotted paths of keys no section knows.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut unknown = Vec::new();
        let config = serde_ignored::deserialize(toml::Deserializer::new(content), |key| {
            unknown.push(key.to_string());
        })?;
        Ok((config, unknown))
    }

    /// Apply command-line overrides. Paths stay relative to the config
    /// directory, like the ones in the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        if let Some(input) = &cli.input {
            self.build.input.clone_from(input);
        }
        if let Some(output) = &cli.output {
            self.build.output.clone_from(output);
        }
        match &cli.command {
            Commands::Build { workers } => {
                self.build.workers = workers.unwrap_or(self.build.workers);
            }
            Commands::Dev(args) | Commands::Serve(args) => {
                self.serve.interface = args.interface.unwrap_or(self.serve.interface);
                self.serve.port = args.port.unwrap_or(self.serve.port);
            }
        }
    }

    /// Anchor the config file and both directories at the absolute `root`.
    fn normalize_paths(&mut self, root: &Path) {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        self.config_path = root.join(self.config_path.file_name().unwrap_or_default());
        self.build.input = root.join(&self.build.input);
        self.build.output = root.join(&self.build.output);
        self.root = root;
    }

    /// Check every section, reporting all problems together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.dev.validate(&mut diag);
        section::routes::validate_routes(&self.routes, &mut diag);
        if let Some(handler) = &self.not_found {
            handler.validate(FieldPath::new("not_found"), &mut diag);
        }

        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

/// Search upward from `start` for `name`; an absolute `name` is taken as is.
fn find_config_file(start: &Path, name: &Path) -> Option<PathBuf> {
    if name.is_absolute() || name.components().count() > 1 {
        let path = start.join(name);
        return path.is_file().then_some(path);
    }
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Parse a test fixture, failing on unknown keys so typos do not pass silently.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
