//! LZ78 codec.
//!
//! The dictionary starts empty and grows one phrase per record: each record
//! names the longest already-known phrase matching the upcoming bytes (or
//! nothing), plus the byte that follows it, and that whole sequence becomes
//! the next dictionary entry. Once the dictionary hits its configured
//! maximum it freezes: entries stay usable but nothing more is added.
//!
//! Input is framed into blocks exactly like LZ77, with the block byte count
//! of a short (final) block written in `block_bits` bits. The dictionary
//! survives across blocks; only the framing restarts.
//!
//! Encoder and decoder must apply the same insertion rule or their
//! dictionaries drift apart. The rule: a record's phrase is added only when
//! the dictionary has room and at least one unread byte remains in the
//! block after the record. The last record of a block never inserts.

use std::collections::HashMap;
use std::io::{BufWriter, Read, Write};

use log::debug;

use crate::bitstream::{BitReader, BitWriter};
use crate::codec::FORMAT_VERSION;
use crate::error::{Error, Result};
use crate::tools::ByteChunk;

/// Default dictionary of 2^14 = 16384 phrases.
pub const DEFAULT_DICT_BITS: u8 = 14;
/// Default read blocks of 2^5 = 32 bytes.
pub const DEFAULT_BLOCK_BITS: u8 = 5;

/// Compress with the default dictionary and block sizes.
pub fn compress<R, W>(input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    compress_with(input, output, DEFAULT_DICT_BITS, DEFAULT_BLOCK_BITS)
}

/// Compress with `2^dict_bits` dictionary entries and `2^block_bits`-byte
/// read blocks.
pub fn compress_with<R, W>(
    input: &mut R,
    output: &mut W,
    dict_bits: u8,
    block_bits: u8,
) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    validate_params(dict_bits, block_bits)?;
    debug!("lz78: dict_bits={} block_bits={}", dict_bits, block_bits);
    let dict_max = 1usize << dict_bits;
    let block_size = 1usize << block_bits;

    let mut dict: HashMap<ByteChunk, usize> = HashMap::new();
    let mut buffer = vec![0u8; block_size];
    let mut chunk = ByteChunk::with_capacity(block_size);

    let mut bw = BitWriter::new(&mut *output);
    bw.out8(FORMAT_VERSION)?;
    bw.out_bits(dict_bits as u64, 5)?;
    bw.out_bits(block_bits as u64, 5)?;

    loop {
        let block_bytes = read_block(input, &mut buffer)?;
        let final_block = block_bytes < block_size;
        if final_block {
            bw.out_bit(1)?;
            bw.out_bits(block_bytes as u64, block_bits)?;
        } else {
            bw.out_bit(0)?;
        }

        let mut pos = 0;
        while pos < block_bytes {
            // Grow the chunk through the dictionary until it stops matching
            // or the block runs out.
            chunk.clear();
            let mut stem_index = 0usize; // index of chunk minus its last byte
            let mut last;
            loop {
                last = buffer[pos];
                chunk.push(last);
                pos += 1;
                match dict.get(chunk.as_slice()) {
                    Some(&index) if pos < block_bytes => stem_index = index,
                    _ => break,
                }
            }

            if dict.len() < dict_max && pos < block_bytes {
                dict.insert(chunk.clone(), dict.len());
            }

            if chunk.len() == 1 {
                bw.out_bit(0)?;
                bw.out8(last)?;
            } else {
                bw.out_bit(1)?;
                bw.out_bits(stem_index as u64, dict_bits)?;
                bw.out8(last)?;
            }
        }

        if final_block {
            break;
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
    let dict_bits = br.bint(5)? as u8;
    let block_bits = br.bint(5)? as u8;
    validate_params(dict_bits, block_bits)?;
    debug!("lz78: dict_bits={} block_bits={}", dict_bits, block_bits);
    let dict_max = 1usize << dict_bits;
    let block_size = 1usize << block_bits;

    let mut dict: Vec<ByteChunk> = Vec::new();
    let mut chunk = ByteChunk::new();
    let mut out = BufWriter::new(output);

    loop {
        let final_block = match br.bool_bit() {
            Ok(flag) => flag,
            Err(Error::UnexpectedEof) => return Err(Error::Unterminated),
            Err(e) => return Err(e),
        };
        let block_bytes = if final_block {
            br.bint(block_bits)? as usize
        } else {
            block_size
        };

        let mut remaining = block_bytes;
        while remaining > 0 {
            chunk.clear();
            if br.bit()? == 0 {
                let byte = br.byte()?;
                chunk.push(byte);
                out.write_all(&[byte])?;
            } else {
                let index = br.bint(dict_bits)? as usize;
                let phrase = dict.get(index).ok_or(Error::DictionaryIndex {
                    index,
                    size: dict.len(),
                })?;
                out.write_all(phrase.as_slice())?;
                chunk.extend_from_slice(phrase.as_slice());
                let byte = br.byte()?;
                chunk.push(byte);
                out.write_all(&[byte])?;
            }

            if chunk.len() > remaining {
                return Err(Error::Header("record longer than its block"));
            }
            remaining -= chunk.len();
            // Same insertion rule as the encoder: room left, block not done.
            if dict.len() < dict_max && remaining > 0 {
                dict.push(chunk.clone());
            }
        }

        if final_block {
            break;
        }
    }
    out.flush()?;
    Ok(())
}

/// Read until the block buffer is full or the input ends.
fn read_block<R: Read + ?Sized>(input: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match input.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn validate_params(dict_bits: u8, block_bits: u8) -> Result<()> {
    if !(1..=24).contains(&dict_bits) {
        return Err(Error::Header("dict_bits outside 1..=24"));
    }
    if !(1..=24).contains(&block_bits) {
        return Err(Error::Header("block_bits outside 1..=24"));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{compress, compress_with, decompress};
    use crate::error::Error;

    fn roundtrip_with(data: &[u8], dict_bits: u8, block_bits: u8) -> Vec<u8> {
        let mut packed = Vec::new();
        compress_with(&mut &data[..], &mut packed, dict_bits, block_bits).unwrap();
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        unpacked
    }

    #[test]
    fn roundtrip_defaults() {
        let data = b"how can a clam cram in a clean cream can";
        let mut packed = Vec::new();
        compress(&mut &data[..], &mut packed).unwrap();
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn roundtrip_repetitive_input() {
        let data = b"abababababababababab";
        assert_eq!(roundtrip_with(data, 14, 5), data);
    }

    #[test]
    fn roundtrip_exact_block_multiple() {
        // Phrases that terminate flush with a block boundary exercise the
        // no-insert-at-block-end rule on both sides.
        let data = [b'a'; 64];
        assert_eq!(roundtrip_with(&data, 14, 5), data);
    }

    #[test]
    fn roundtrip_tiny_blocks() {
        let data = b"to be or not to be that is the question";
        assert_eq!(roundtrip_with(data, 14, 2), data);
    }

    #[test]
    fn roundtrip_with_frozen_dictionary() {
        // Eight entries fill almost immediately; most of the stream runs
        // against the frozen dictionary.
        let data: Vec<u8> = b"abcdefgh".iter().cycle().take(500).copied().collect();
        assert_eq!(roundtrip_with(&data, 3, 5), data);
    }

    #[test]
    fn roundtrip_all_byte_values() {
        let data: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();
        assert_eq!(roundtrip_with(&data, 14, 5), data);
    }

    #[test]
    fn empty_input_makes_a_wellformed_stream() {
        let mut packed = Vec::new();
        compress_with(&mut &b""[..], &mut packed, 14, 5).unwrap();
        // version + 5 + 5 + final flag + 5-bit zero count = 24 bits.
        assert_eq!(packed.len(), 3);
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, b"");
    }

    #[test]
    fn unknown_dictionary_index_is_rejected() {
        use crate::bitstream::BitWriter;
        // Header plus a final one-record block that references entry 5 of a
        // still-empty dictionary.
        let mut packed = Vec::new();
        let mut bw = BitWriter::new(&mut packed);
        bw.out8(0x01).unwrap();
        bw.out_bits(14, 5).unwrap();
        bw.out_bits(5, 5).unwrap();
        bw.out_bit(1).unwrap();
        bw.out_bits(3, 5).unwrap(); // three bytes claimed
        bw.out_bit(1).unwrap(); // phrase record
        bw.out_bits(5, 14).unwrap(); // index 5
        bw.out8(b'x').unwrap();
        bw.flush().unwrap();

        let mut unpacked = Vec::new();
        assert!(matches!(
            decompress(&mut packed.as_slice(), &mut unpacked),
            Err(Error::DictionaryIndex { index: 5, size: 0 })
        ));
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let mut packed = vec![0x01, 0x00, 0x00]; // dict_bits = 0
        let mut unpacked = Vec::new();
        assert!(matches!(
            decompress(&mut packed.as_slice(), &mut unpacked),
            Err(Error::Header(_))
        ));
        packed.clear();
        assert!(matches!(
            compress_with(&mut &b"x"[..], &mut packed, 25, 5),
            Err(Error::Header(_))
        ));
    }
}
