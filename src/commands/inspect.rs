//! Walk a BGZF block chain and report per-block statistics.

use anyhow::{bail, Result};
use clap::Parser;
use log::{info, warn};

use crate::block::{
    check_block_header, decode_block_size, is_eof_block, BGZF_FOOTER_SIZE, BGZF_HEADER_SIZE,
};
use crate::commands::command::Command;
use crate::device::{open_device, read_fully, OpenMode};

/// Inspect the block structure of a BGZF file.
///
/// Walks the chain of block headers without decompressing payloads and
/// reports per-block addresses, on-wire sizes, declared uncompressed sizes,
/// and footer checksums.
#[derive(Parser, Debug)]
#[command(about = "Report the block structure of a BGZF file")]
pub struct Inspect {
    /// BGZF file to inspect ("stdin" or "-" reads standard input)
    pub file: String,

    /// Print one line per block
    #[arg(long)]
    pub blocks: bool,
}

impl Command for Inspect {
    fn execute(&self) -> Result<()> {
        let mut device = open_device(&self.file, OpenMode::ReadOnly)?;

        let mut address: u64 = 0;
        let mut block_count: u64 = 0;
        let mut compressed_total: u64 = 0;
        let mut uncompressed_total: u64 = 0;
        let mut eof_marker = false;

        if self.blocks {
            println!("address\tblock_size\tisize\tcrc32");
        }

        loop {
            let mut header = [0u8; BGZF_HEADER_SIZE];
            let n = read_fully(&mut *device, &mut header)?;
            if n == 0 {
                break;
            }
            if n != BGZF_HEADER_SIZE {
                bail!("truncated block header at offset {address}");
            }
            if !check_block_header(&header) {
                bail!("invalid block header at offset {address}");
            }

            let block_size = decode_block_size(&header);
            if block_size < BGZF_HEADER_SIZE + BGZF_FOOTER_SIZE {
                bail!("implausible block size {block_size} at offset {address}");
            }
            let mut block = vec![0u8; block_size];
            block[..BGZF_HEADER_SIZE].copy_from_slice(&header);
            let n = read_fully(&mut *device, &mut block[BGZF_HEADER_SIZE..])?;
            if n != block_size - BGZF_HEADER_SIZE {
                bail!("truncated block at offset {address}");
            }

            let crc = u32::from_le_bytes(block[block_size - 8..block_size - 4].try_into()?);
            let isize = u32::from_le_bytes(block[block_size - 4..].try_into()?);
            eof_marker = is_eof_block(&block);

            if self.blocks {
                println!("{address}\t{block_size}\t{isize}\t{crc:#010x}");
            }
            block_count += 1;
            compressed_total += block_size as u64;
            uncompressed_total += u64::from(isize);
            address += block_size as u64;
        }

        info!(
            "{}: {block_count} blocks, {compressed_total} compressed bytes, \
             {uncompressed_total} uncompressed bytes",
            self.file
        );
        if eof_marker {
            info!("EOF marker present");
        } else {
            warn!("missing BGZF EOF marker; the stream may be truncated");
        }
        Ok(())
    }
}
