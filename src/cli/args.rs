//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Content-addressed static site build and serve pipeline
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Source directory path (relative to project root)
    #[arg(short = 'I', long, value_hint = clap::ValueHint::DirPath)]
    pub input: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: hallmark.toml)
    #[arg(short = 'C', long, default_value = crate::config::CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every cached route into the output directory
    #[command(visible_alias = "b")]
    Build {
        /// Parallel build workers (0 = available parallelism, 1 = serial)
        #[arg(short = 'j', long)]
        workers: Option<usize>,
    },

    /// Start the development server with live reload
    #[command(visible_alias = "d")]
    Dev(ServeArgs),

    /// Serve a previous build with its generated manifest
    #[command(visible_alias = "s")]
    Serve(ServeArgs),
}

/// Listener overrides for `dev` and `serve`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port number to listen on
    pub port: Option<u16>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,
}

impl Cli {
    /// Apply `--color` to all terminal output.
    pub fn apply_color(&self) {
        match self.color {
            ColorChoice::Always => owo_colors::set_override(true),
            ColorChoice::Never => owo_colors::set_override(false),
            ColorChoice::Auto => {}
        }
    }
}
