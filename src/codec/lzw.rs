//! LZW codec.
//!
//! A refinement of LZ78: the dictionary starts pre-seeded with all 256
//! single-byte phrases, so records are bare dictionary indices; no literal
//! byte ever appears in the stream. The encoder grows a current phrase while
//! it stays known, and on the first unknown extension emits the known part's
//! index and starts over from the byte that broke the match.
//!
//! The decoder runs one phrase behind the encoder, which produces the
//! classic corner case: an index naming the entry that is about to be
//! created. That phrase is necessarily the previous phrase plus its own
//! first byte, and is reconstructed as such.
//!
//! Block framing matches LZ78. Each block's first index (re)initializes the
//! decoder's previous-phrase register; the dictionary itself persists for
//! the whole stream and freezes when full.

use std::collections::HashMap;
use std::io::{BufWriter, Read, Write};

use log::debug;

use crate::bitstream::{BitReader, BitWriter};
use crate::codec::FORMAT_VERSION;
use crate::error::{Error, Result};
use crate::tools::ByteChunk;

/// Default dictionary of 2^13 = 8192 phrases.
pub const DEFAULT_DICT_BITS: u8 = 13;
/// Default read blocks of 2^6 = 64 bytes.
pub const DEFAULT_BLOCK_BITS: u8 = 6;

/// Indices need to cover at least the 256 seeded phrases.
const MIN_DICT_BITS: u8 = 8;

/// Compress with the default dictionary and block sizes.
pub fn compress<R, W>(input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    compress_with(input, output, DEFAULT_DICT_BITS, DEFAULT_BLOCK_BITS)
}

/// Compress with `2^dict_bits` dictionary entries and `2^block_bits`-byte
/// read blocks. `dict_bits` below 8 is raised to 8.
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
    let dict_bits = dict_bits.max(MIN_DICT_BITS);
    validate_params(dict_bits, block_bits)?;
    debug!("lzw: dict_bits={} block_bits={}", dict_bits, block_bits);
    let dict_max = 1usize << dict_bits;
    let block_size = 1usize << block_bits;

    let mut dict: HashMap<ByteChunk, usize> = (0..=255u8)
        .map(|b| (ByteChunk::from_byte(b), b as usize))
        .collect();
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

        chunk.clear();
        // Index of the current chunk; every chunk state held here has been
        // looked up successfully, starting from the seeded single bytes.
        let mut chunk_index = 0usize;
        let mut pos = 0;
        while pos < block_bytes {
            let byte = buffer[pos];
            chunk.push(byte);
            match dict.get(chunk.as_slice()) {
                Some(&index) => {
                    chunk_index = index;
                    pos += 1;
                }
                None => {
                    if dict.len() < dict_max {
                        dict.insert(chunk.clone(), dict.len());
                    }
                    bw.out_bits(chunk_index as u64, dict_bits)?;
                    chunk.clear();
                    chunk.push(byte);
                    chunk_index = byte as usize;
                    pos += 1;
                }
            }
        }
        // Flush the pending phrase before the block ends.
        if !chunk.is_empty() {
            bw.out_bits(chunk_index as u64, dict_bits)?;
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
    let dict_bits = (br.bint(5)? as u8).max(MIN_DICT_BITS);
    let block_bits = br.bint(5)? as u8;
    validate_params(dict_bits, block_bits)?;
    debug!("lzw: dict_bits={} block_bits={}", dict_bits, block_bits);
    let dict_max = 1usize << dict_bits;
    let block_size = 1usize << block_bits;

    let mut dict: Vec<ByteChunk> = (0..=255u8).map(ByteChunk::from_byte).collect();
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
        if block_bytes == 0 {
            // Only the empty final block ends up here.
            break;
        }

        // The block's first index initializes the previous-phrase register.
        let first = br.bint(dict_bits)? as usize;
        let phrase = dict.get(first).ok_or(Error::DictionaryIndex {
            index: first,
            size: dict.len(),
        })?;
        if phrase.len() > block_bytes {
            return Err(Error::Header("record longer than its block"));
        }
        out.write_all(phrase.as_slice())?;
        let mut remaining = block_bytes - phrase.len();
        let mut prev = first;

        while remaining > 0 {
            let index = br.bint(dict_bits)? as usize;
            let emitted_len;
            if index == dict.len() && dict.len() < dict_max {
                // The phrase being named is the one about to be created:
                // previous phrase extended by its own first byte.
                let mut phrase = dict[prev].clone();
                let head = phrase.front().ok_or(Error::Header("empty phrase"))?;
                phrase.push(head);
                emitted_len = phrase.len();
                out.write_all(phrase.as_slice())?;
                dict.push(phrase);
            } else if index < dict.len() {
                let phrase = &dict[index];
                emitted_len = phrase.len();
                out.write_all(phrase.as_slice())?;
                let head = phrase.front().ok_or(Error::Header("empty phrase"))?;
                if dict.len() < dict_max {
                    let mut grown = dict[prev].clone();
                    grown.push(head);
                    dict.push(grown);
                }
            } else {
                return Err(Error::DictionaryIndex {
                    index,
                    size: dict.len(),
                });
            }
            if emitted_len > remaining {
                return Err(Error::Header("record longer than its block"));
            }
            remaining -= emitted_len;
            prev = index;
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
    if !(MIN_DICT_BITS..=24).contains(&dict_bits) {
        return Err(Error::Header("dict_bits outside 8..=24"));
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
    fn roundtrip_tobeornot_defaults() {
        let data = b"TOBEORNOTTOBEORTOBEORNOT";
        let mut packed = Vec::new();
        compress(&mut &data[..], &mut packed).unwrap();
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn kwkwk_case_roundtrips() {
        // "aaaa...": the encoder emits an index the decoder has not built
        // yet on the very second record.
        let data = [b'a'; 50];
        assert_eq!(roundtrip_with(&data, 13, 6), data);
    }

    #[test]
    fn roundtrip_tiny_blocks() {
        // Two-byte blocks restart the previous-phrase register constantly.
        let data = b"she sells sea shells by the sea shore";
        assert_eq!(roundtrip_with(data, 13, 1), data);
    }

    #[test]
    fn roundtrip_exact_block_multiple() {
        let data = [b'm'; 128]; // two full 64-byte blocks
        assert_eq!(roundtrip_with(&data, 13, 6), data);
    }

    #[test]
    fn roundtrip_with_frozen_dictionary() {
        // 256 seeded entries fill the whole dictionary: nothing is ever
        // added and every record is a seeded single byte.
        let data = b"mississippi mississippi mississippi";
        assert_eq!(roundtrip_with(data, 8, 6), data);
    }

    #[test]
    fn roundtrip_all_byte_values() {
        let data: Vec<u8> = (0..=255u8).chain((0..=255u8).rev()).collect();
        assert_eq!(roundtrip_with(&data, 13, 6), data);
    }

    #[test]
    fn empty_input_makes_a_wellformed_stream() {
        let mut packed = Vec::new();
        compress_with(&mut &b""[..], &mut packed, 13, 6).unwrap();
        // version + 5 + 5 + final flag + 6-bit zero count = 25 bits.
        assert_eq!(packed.len(), 4);
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, b"");
    }

    #[test]
    fn small_dict_bits_are_clamped_to_eight() {
        let data = b"clamp me";
        let mut packed = Vec::new();
        compress_with(&mut &data[..], &mut packed, 2, 6).unwrap();
        // The header records the effective width, so decoding works.
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn out_of_range_first_index_is_rejected() {
        use crate::bitstream::BitWriter;
        // A final block claiming two bytes whose first index (300) is past
        // the 256 seeded entries.
        let mut packed = Vec::new();
        let mut bw = BitWriter::new(&mut packed);
        bw.out8(0x01).unwrap();
        bw.out_bits(13, 5).unwrap();
        bw.out_bits(6, 5).unwrap();
        bw.out_bit(1).unwrap();
        bw.out_bits(2, 6).unwrap();
        bw.out_bits(300, 13).unwrap();
        bw.flush().unwrap();

        let mut unpacked = Vec::new();
        assert!(matches!(
            decompress(&mut packed.as_slice(), &mut unpacked),
            Err(Error::DictionaryIndex { index: 300, size: 256 })
        ));
    }
}
