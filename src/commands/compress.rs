//! Compress raw bytes into a BGZF stream.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::block::DEFAULT_BLOCK_SIZE;
use crate::commands::command::Command;
use crate::device::{open_device, OpenMode};
use crate::stream::BgzfStream;

/// Compress a file (or standard input) into a BGZF stream.
#[derive(Parser, Debug)]
#[command(about = "Compress raw bytes into a BGZF stream")]
pub struct Compress {
    /// Input file ("stdin" or "-" reads standard input)
    pub input: String,

    /// Output BGZF file ("stdout" or "-" writes standard output)
    pub output: String,

    /// Emit stored (uncompressed) deflate blocks
    #[arg(long)]
    pub no_compress: bool,
}

impl Command for Compress {
    fn execute(&self) -> Result<()> {
        let start = Instant::now();

        let mut input = open_device(&self.input, OpenMode::ReadOnly)?;
        let mut stream = BgzfStream::new();
        stream.open_with_mode(&self.output, OpenMode::WriteOnly)?;
        if self.no_compress {
            stream.set_write_compressed(false);
        }

        let mut buf = vec![0u8; DEFAULT_BLOCK_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = input.read(&mut buf)?;
            if n == 0 {
                break;
            }
            stream.write(&buf[..n])?;
            total += n as u64;
        }
        stream.close()?;

        info!(
            "Compressed {total} bytes from '{}' to '{}' in {:.2?}",
            self.input,
            self.output,
            start.elapsed()
        );
        Ok(())
    }
}
