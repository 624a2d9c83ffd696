//! Command-line interface definitions.

use clap::Parser;

/// What the binary was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    ListSitemap,
    PrintConfig,
}

/// Preview a static site while you edit it
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Cli {
    /// Config file path, extension optional (default: preview.toml)
    #[arg(short, long, default_value = "preview", value_hint = clap::ValueHint::FilePath)]
    pub config: String,

    /// Print the scanned sitemap as JSON and exit
    #[arg(long)]
    pub list: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long, conflicts_with = "list")]
    pub print_config: bool,
}

impl Cli {
    pub const fn mode(&self) -> Mode {
        if self.print_config {
            Mode::PrintConfig
        } else if self.list {
            Mode::ListSitemap
        } else {
            Mode::Serve
        }
    }
}
