use clap::ValueHint;

use std::path::PathBuf;

#[derive(clap::Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Path to the config file.
    ///
    /// By default, shelfwatch looks for a file named `shelfwatch.toml` in the following
    /// directories (in order):
    ///
    /// - `./` (the current directory)
    /// - `/etc`
    #[arg(
        short,
        env = "SHELFWATCH_CONFIG",
        value_hint(ValueHint::FilePath)
    )]
    pub config_path: Option<PathBuf>,

    /// Alert feed server address to bind to.
    #[arg(long, env = "SHELFWATCH_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// URL of the inventory service endpoint returning the full snapshot.
    #[arg(long, env = "SHELFWATCH_INVENTORY_URL")]
    pub inventory_url: Option<reqwest::Url>,
}

impl Args {
    pub fn parse() -> Self {
        clap::Parser::parse()
    }
}
