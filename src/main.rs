#![deny(unsafe_code)]

use anyhow::Result;
use bgzf_stream::commands::command::Command;
use bgzf_stream::commands::Subcommand;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use env_logger::Env;
use log::info;

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(styles = STYLES)]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Running bgzf-stream version {}", env!("CARGO_PKG_VERSION"));
    args.subcommand.execute()
}
