//! Huffman codec.
//!
//! Encoding takes two passes: the first builds the byte frequency table the
//! tree grows from, the second re-reads the input and emits one code per
//! byte. The input therefore has to be rewindable, so a pipe won't do.
//!
//! The header carries everything the decoder needs: a version byte, the
//! total byte count, and the serialized tree. Two degenerate inputs lean on
//! that header alone: an empty input writes a zero count and no tree, and a
//! one-symbol input writes its single-leaf tree but no payload, since the
//! count already says how many copies to emit.

pub mod tree;

use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

use log::debug;

use crate::bitstream::{BitReader, BitWriter};
use crate::codec::FORMAT_VERSION;
use crate::error::{Error, Result};
use crate::tools::FreqTable;

pub use tree::HuffTree;

const READ_CHUNK: usize = 64 * 1024;

/// Compress `input` to `output`. The input is read twice.
pub fn compress<R, W>(input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    let mut freqs = FreqTable::new();
    freqs.count_from(input)?;
    if freqs.total() > u32::MAX as u64 {
        return Err(Error::Header("input larger than 2^32 bytes"));
    }
    let total = freqs.total() as u32;

    let tree = HuffTree::from_freqs(&freqs);
    let codes = tree.codification();
    debug!(
        "huffman: {} distinct symbols over {} bytes, mean code length {:.3} bits",
        freqs.distinct(),
        total,
        tree.mean_code_len(&freqs)
    );

    let mut bw = BitWriter::new(&mut *output);
    bw.out8(FORMAT_VERSION)?;
    bw.out_bits(total as u64, 32)?;
    tree.serialize(&mut bw)?;

    input.seek(SeekFrom::Start(0))?;

    // With zero or one distinct symbols the header alone reconstructs the
    // input; there is no payload.
    if freqs.distinct() > 1 {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for &byte in &buf[..n] {
                let code = codes[byte as usize]
                    .as_ref()
                    .ok_or(Error::Header("input changed between passes"))?;
                for &bit in code {
                    bw.out_bit(bit)?;
                }
            }
        }
    }
    bw.flush()
}

/// Decompress `input` to `output`. The envelope magic has already been
/// consumed by the caller.
pub fn decompress<R, W>(input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut br = BitReader::new(&mut *input);
    let version = br.byte()?;
    if version != FORMAT_VERSION {
        return Err(Error::BadVersion(version));
    }
    let total = br.bint(32)?;
    debug!("huffman: stream holds {} bytes", total);
    if total == 0 {
        return Ok(());
    }

    let tree = HuffTree::deserialize(&mut br)?;
    let mut out = BufWriter::new(output);

    // A single-leaf root means the payload was elided: repeat the symbol.
    if let Some(symbol) = tree.sole_symbol() {
        let block = vec![symbol; (total as usize).min(READ_CHUNK)];
        let mut left = total;
        while left > 0 {
            let n = left.min(block.len() as u64) as usize;
            out.write_all(&block[..n])?;
            left -= n as u64;
        }
        out.flush()?;
        return Ok(());
    }

    let mut walker = tree
        .walker()
        .ok_or(Error::Header("empty huffman tree with a nonzero count"))?;
    let mut produced = 0u64;
    while produced < total {
        if let Some(symbol) = walker.step(br.bit()?)? {
            out.write_all(&[symbol])?;
            produced += 1;
        }
    }
    out.flush()?;
    Ok(())
}
