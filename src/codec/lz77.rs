//! LZ77 codec.
//!
//! A sliding window over the recent past serves as the dictionary: each
//! record is either a literal byte or a back-reference (length, position)
//! into the search buffer plus the byte that follows the match. The window
//! is a circular buffer holding the search region and the lookahead region
//! side by side, so sliding costs cursor arithmetic instead of memmoves.
//!
//! The input is framed into blocks of one lookahead's worth of bytes. A full
//! block is announced with a 0 bit; a short block (including an empty one)
//! is announced with a 1 bit followed by its byte count, and is always the
//! last block of the stream.

use std::io::{BufWriter, Read, Write};

use log::debug;

use crate::bitstream::{BitReader, BitWriter};
use crate::codec::FORMAT_VERSION;
use crate::error::{Error, Result};

/// Default search buffer of 2^9 = 512 bytes.
pub const DEFAULT_SEARCH_BITS: u8 = 9;
/// Default lookahead buffer of 2^5 = 32 bytes.
pub const DEFAULT_LOOKAHEAD_BITS: u8 = 5;

/// The circular analysis window: search buffer followed by lookahead buffer.
///
/// `search_start` trails `lahead_start` by at most `search_size` bytes; the
/// gap between them is the current search buffer, which starts out shorter
/// while the first bytes of the stream go through.
struct Window {
    buf: Vec<u8>,
    size: usize,
    search_size: usize,
    lahead_size: usize,
    search_start: usize,
    lahead_start: usize,
    lahead_end: usize,
}

impl Window {
    fn new(search_bits: u8, lahead_bits: u8) -> Self {
        let search_size = 1usize << search_bits;
        let lahead_size = 1usize << lahead_bits;
        Self {
            buf: vec![0; search_size + lahead_size],
            size: search_size + lahead_size,
            search_size,
            lahead_size,
            search_start: 0,
            lahead_start: 0,
            lahead_end: 0,
        }
    }

    fn inc(&self, pos: usize) -> usize {
        (pos + 1) % self.size
    }

    fn inc_n(&self, pos: usize, n: usize) -> usize {
        (pos + n) % self.size
    }

    /// Absolute window position of a position relative to `search_start`.
    fn absolute(&self, relative: usize) -> usize {
        (self.search_start + relative) % self.size
    }

    /// Position relative to `search_start` of an absolute window position.
    fn relative(&self, absolute: usize) -> usize {
        if absolute >= self.search_start {
            absolute - self.search_start
        } else {
            self.size - self.search_start + absolute
        }
    }

    /// Current length of the search buffer.
    fn search_len(&self) -> usize {
        if self.lahead_start >= self.search_start {
            self.lahead_start - self.search_start
        } else {
            self.size - self.search_start + self.lahead_start
        }
    }

    /// Pull `search_start` forward so the search buffer never exceeds its
    /// configured size. Called after every record on both sides.
    fn slide(&mut self) {
        if self.search_len() > self.search_size {
            self.search_start = if self.lahead_start >= self.search_size {
                self.lahead_start - self.search_size
            } else {
                self.size - self.search_size + self.lahead_start
            };
        }
    }

    /// Read up to one lookahead of bytes into the window at `lahead_start`,
    /// wrapping around the end of the buffer. Returns the count read.
    fn fill_lookahead<R: Read + ?Sized>(&mut self, input: &mut R) -> Result<usize> {
        let mut filled = 0;
        while filled < self.lahead_size {
            let pos = self.inc_n(self.lahead_start, filled);
            let limit = (self.size - pos).min(self.lahead_size - filled);
            match input.read(&mut self.buf[pos..pos + limit]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.lahead_end = self.inc_n(self.lahead_start, filled);
        Ok(filled)
    }

    /// Find the longest prefix of the lookahead buffer that occurs in the
    /// search buffer. Returns `(length, absolute_position)`; the first
    /// longest match wins. A match may run past `lahead_start` into bytes
    /// that are still queued; the decoder reproduces them in order.
    fn find_prefix(&self) -> (usize, usize) {
        let mut max_len = 0;
        let mut max_pos = 0;
        let search_len = self.search_len();
        let mut search_pos = self.search_start;
        let mut scanned = 0;
        while scanned < search_len {
            // Hunt for the first lookahead byte.
            while search_pos != self.lahead_start
                && self.buf[search_pos] != self.buf[self.lahead_start]
            {
                search_pos = self.inc(search_pos);
                scanned += 1;
            }
            if search_pos == self.lahead_start {
                break;
            }

            // Extend the match as far as both regions allow.
            let prefix_start = search_pos;
            let mut probe = search_pos;
            let mut lahead_pos = self.lahead_start;
            let mut len = 0;
            while lahead_pos != self.lahead_end && self.buf[probe] == self.buf[lahead_pos] {
                probe = self.inc(probe);
                lahead_pos = self.inc(lahead_pos);
                len += 1;
                scanned += 1;
            }
            if len > max_len {
                max_len = len;
                max_pos = prefix_start;
            }
            search_pos = probe;
        }
        (max_len, max_pos)
    }

    /// Append one decoded byte at `lahead_start`.
    fn push_decoded(&mut self, byte: u8) {
        self.buf[self.lahead_start] = byte;
        self.lahead_start = self.inc(self.lahead_start);
    }
}

/// Compress with the default window sizes.
pub fn compress<R, W>(input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    compress_with(input, output, DEFAULT_SEARCH_BITS, DEFAULT_LOOKAHEAD_BITS)
}

/// Compress with `2^search_bits` bytes of search buffer and
/// `2^lookahead_bits` bytes of lookahead.
pub fn compress_with<R, W>(
    input: &mut R,
    output: &mut W,
    search_bits: u8,
    lookahead_bits: u8,
) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    validate_params(search_bits, lookahead_bits)?;
    debug!(
        "lz77: search_bits={} lookahead_bits={}",
        search_bits, lookahead_bits
    );
    let mut window = Window::new(search_bits, lookahead_bits);

    let mut bw = BitWriter::new(&mut *output);
    bw.out8(FORMAT_VERSION)?;
    bw.out_bits(search_bits as u64, 5)?;
    bw.out_bits(lookahead_bits as u64, 5)?;

    loop {
        let block_bytes = window.fill_lookahead(input)?;
        let final_block = block_bytes < window.lahead_size;
        if final_block {
            bw.out_bit(1)?;
            bw.out_bits(block_bytes as u64, lookahead_bits)?;
        } else {
            bw.out_bit(0)?;
        }

        let mut remaining = block_bytes;
        while remaining > 0 {
            let (mut len, pos) = window.find_prefix();
            // The byte after the match must still be inside the block.
            if len + 1 > remaining {
                len = remaining - 1;
            }
            let next = window.buf[window.inc_n(window.lahead_start, len)];
            if len == 0 {
                bw.out_bit(0)?;
                bw.out8(next)?;
            } else {
                bw.out_bit(1)?;
                bw.out_bits(len as u64, lookahead_bits)?;
                bw.out_bits(window.relative(pos) as u64, search_bits)?;
                bw.out8(next)?;
            }
            window.lahead_start = window.inc_n(window.lahead_start, len + 1);
            window.slide();
            remaining -= len + 1;
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
    let search_bits = br.bint(5)? as u8;
    let lookahead_bits = br.bint(5)? as u8;
    validate_params(search_bits, lookahead_bits)?;
    debug!(
        "lz77: search_bits={} lookahead_bits={}",
        search_bits, lookahead_bits
    );

    let mut window = Window::new(search_bits, lookahead_bits);
    let mut out = BufWriter::new(output);

    loop {
        let final_block = match br.bool_bit() {
            Ok(flag) => flag,
            Err(Error::UnexpectedEof) => return Err(Error::Unterminated),
            Err(e) => return Err(e),
        };
        let block_bytes = if final_block {
            br.bint(lookahead_bits)? as usize
        } else {
            window.lahead_size
        };

        let mut remaining = block_bytes;
        while remaining > 0 {
            if br.bit()? == 0 {
                let byte = br.byte()?;
                window.push_decoded(byte);
                out.write_all(&[byte])?;
                remaining -= 1;
            } else {
                let len = br.bint(lookahead_bits)? as usize;
                let pos = br.bint(search_bits)? as usize;
                let byte = br.byte()?;
                if len + 1 > remaining {
                    return Err(Error::Header("match longer than its block"));
                }
                if pos >= window.search_len() {
                    return Err(Error::Header("match position outside the search buffer"));
                }
                // Copy the match byte by byte; overlapping matches read the
                // bytes this same record just produced.
                let mut src = window.absolute(pos);
                let end = window.absolute(pos + len);
                while src != end {
                    let b = window.buf[src];
                    window.push_decoded(b);
                    out.write_all(&[b])?;
                    src = window.inc(src);
                }
                window.push_decoded(byte);
                out.write_all(&[byte])?;
                remaining -= len + 1;
            }
            window.slide();
        }

        if final_block {
            break;
        }
    }
    out.flush()?;
    Ok(())
}

fn validate_params(search_bits: u8, lookahead_bits: u8) -> Result<()> {
    if !(1..=29).contains(&search_bits) {
        return Err(Error::Header("search_bits outside 1..=29"));
    }
    if lookahead_bits < 1 || lookahead_bits >= search_bits {
        return Err(Error::Header("lookahead_bits must be below search_bits"));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{compress_with, decompress};
    use crate::error::Error;

    fn roundtrip_with(data: &[u8], search_bits: u8, lookahead_bits: u8) -> Vec<u8> {
        let mut packed = Vec::new();
        compress_with(&mut &data[..], &mut packed, search_bits, lookahead_bits).unwrap();
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        unpacked
    }

    #[test]
    fn roundtrip_abab_default_sizes() {
        assert_eq!(roundtrip_with(b"abababab", 9, 5), b"abababab");
    }

    #[test]
    fn roundtrip_text() {
        let data = b"it was the best of times, it was the worst of times";
        assert_eq!(roundtrip_with(data, 9, 5), data);
    }

    #[test]
    fn roundtrip_with_tiny_window() {
        // Window of 4+2 bytes forces constant sliding and block turnover.
        let data = b"she sells sea shells by the sea shore";
        assert_eq!(roundtrip_with(data, 2, 1), data);
    }

    #[test]
    fn roundtrip_across_many_blocks() {
        // Longer than the 512-byte search buffer, so matches slide out.
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 7) as u8 * 31).collect();
        assert_eq!(roundtrip_with(&data, 9, 5), data);
    }

    #[test]
    fn roundtrip_exact_block_multiple() {
        // 64 bytes = two full 32-byte blocks; the stream ends with an
        // explicit empty final block.
        let data = [b'q'; 64];
        assert_eq!(roundtrip_with(&data, 9, 5), data);
    }

    #[test]
    fn roundtrip_incompressible_bytes() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(roundtrip_with(&data, 9, 5), data);
    }

    #[test]
    fn empty_input_makes_a_wellformed_stream() {
        let mut packed = Vec::new();
        compress_with(&mut &b""[..], &mut packed, 9, 5).unwrap();
        // version + 5 + 5 + final flag + 5-bit zero count = 24 bits.
        assert_eq!(packed.len(), 3);
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, b"");
    }

    #[test]
    fn overlapping_match_decodes() {
        // A long run compresses to a match overlapping its own output.
        let data = [b'z'; 100];
        assert_eq!(roundtrip_with(&data, 9, 5), data);
    }

    #[test]
    fn rejects_inverted_buffer_sizes() {
        let mut packed = Vec::new();
        assert!(matches!(
            compress_with(&mut &b"x"[..], &mut packed, 5, 9),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn missing_terminator_is_detected() {
        use crate::bitstream::BitWriter;
        // Hand-build a stream of two full blocks (search_bits=2,
        // lookahead_bits=1, so blocks hold two bytes) that ends exactly
        // where the next block flag belongs: 18 header bits + 2 * (1 flag +
        // 2 * 9-bit literals) = 56 bits, a whole number of bytes.
        let mut packed = Vec::new();
        let mut bw = BitWriter::new(&mut packed);
        bw.out8(0x01).unwrap();
        bw.out_bits(2, 5).unwrap();
        bw.out_bits(1, 5).unwrap();
        for block in 0..2u8 {
            bw.out_bit(0).unwrap();
            for i in 0..2u8 {
                bw.out_bit(0).unwrap();
                bw.out8(b'a' + block * 2 + i).unwrap();
            }
        }
        bw.flush().unwrap();
        assert_eq!(packed.len(), 7);

        let mut unpacked = Vec::new();
        assert!(matches!(
            decompress(&mut packed.as_slice(), &mut unpacked),
            Err(Error::Unterminated)
        ));
        // The four literals were already emitted before the error surfaced.
        assert_eq!(unpacked, b"abcd");
    }
}
