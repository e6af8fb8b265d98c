//! CLI command implementations for bgzf-stream.
//!
//! Each submodule implements one subcommand over the codec:
//!
//! - [`compress`] - raw bytes into a BGZF stream
//! - [`decompress`] - a BGZF stream back into raw bytes
//! - [`inspect`] - walk a block chain and report per-block statistics

pub mod command;
pub mod compress;
pub mod decompress;
pub mod inspect;

use anyhow::Result;
use clap::Parser;
use enum_dispatch::enum_dispatch;

use command::Command;
use compress::Compress;
use decompress::Decompress;
use inspect::Inspect;

/// The bgzf-stream subcommands.
#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
#[command(version)]
pub enum Subcommand {
    #[command(display_order = 1)]
    Compress(Compress),
    #[command(display_order = 2)]
    Decompress(Decompress),
    #[command(display_order = 3)]
    Inspect(Inspect),
}
