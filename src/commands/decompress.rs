//! Decompress a BGZF stream back into raw bytes.

use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use crate::block::DEFAULT_BLOCK_SIZE;
use crate::commands::command::Command;
use crate::device::{open_device, OpenMode};
use crate::stream::BgzfStream;

/// Decompress a BGZF stream into a file (or standard output).
#[derive(Parser, Debug)]
#[command(about = "Decompress a BGZF stream back into raw bytes")]
pub struct Decompress {
    /// Input BGZF file ("stdin" or "-" reads standard input)
    pub input: String,

    /// Output file ("stdout" or "-" writes standard output)
    pub output: String,
}

impl Command for Decompress {
    fn execute(&self) -> Result<()> {
        let start = Instant::now();

        let mut stream = BgzfStream::new();
        stream.open_with_mode(&self.input, OpenMode::ReadOnly)?;
        let mut output = open_device(&self.output, OpenMode::WriteOnly)?;

        let mut buf = vec![0u8; DEFAULT_BLOCK_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let mut offset = 0;
            while offset < n {
                let written = output.write(&buf[offset..n])?;
                if written == 0 {
                    bail!("device '{}' refused further writes", self.output);
                }
                offset += written;
            }
            total += n as u64;
        }
        stream.close()?;

        info!(
            "Decompressed '{}' into {total} bytes at '{}' in {:.2?}",
            self.input,
            self.output,
            start.elapsed()
        );
        Ok(())
    }
}
