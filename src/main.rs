//! `hallmark` binary: routes come from `hallmark.toml`.

use anyhow::{Result, bail};
use clap::Parser;
use hallmark::cli::Cli;
use hallmark::{App, SiteConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.apply_color();

    let config = SiteConfig::load(&cli)?;
    if !config.has_file() && config.routes.is_empty() {
        bail!(
            "Config file '{}' not found and no routes are declared",
            cli.config.display()
        );
    }

    App::from_config(config).run_with(&cli)
}
