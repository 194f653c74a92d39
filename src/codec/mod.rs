//! The four codecs and the envelope that multiplexes them.
//!
//! Every compressed stream opens with a two-byte big-endian magic number
//! naming its algorithm. [`compress`] writes the magic and hands the rest of
//! the stream to the chosen codec; [`decompress`] reads the magic back and
//! dispatches without being told which algorithm to expect. The magic is the
//! only thing the envelope owns; version bytes and parameters belong to the
//! per-algorithm headers.

pub mod huffman;
pub mod lz77;
pub mod lz78;
pub mod lzw;

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use clap::ValueEnum;
use log::{debug, error};

use crate::error::{Error, Result};

/// Version byte carried by every per-algorithm header.
pub const FORMAT_VERSION: u8 = 0x01;

pub const MAGIC_HUFFMAN: u16 = 0x27AB;
pub const MAGIC_LZ77: u16 = 0xA5E8;
pub const MAGIC_LZ78: u16 = 0x7869;
pub const MAGIC_LZW: u16 = 0x8E83;

/// The available compression algorithms.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Method {
    /// Two-pass Huffman coding; needs a rewindable input.
    Huf,
    /// Sliding-window matching.
    Lz77,
    /// Incrementally built phrase dictionary.
    Lz78,
    /// Phrase dictionary pre-seeded with all single bytes.
    Lzw,
}

impl Method {
    pub fn magic(self) -> u16 {
        match self {
            Method::Huf => MAGIC_HUFFMAN,
            Method::Lz77 => MAGIC_LZ77,
            Method::Lz78 => MAGIC_LZ78,
            Method::Lzw => MAGIC_LZW,
        }
    }

    pub fn from_magic(magic: u16) -> Option<Method> {
        match magic {
            MAGIC_HUFFMAN => Some(Method::Huf),
            MAGIC_LZ77 => Some(Method::Lz77),
            MAGIC_LZ78 => Some(Method::Lz78),
            MAGIC_LZW => Some(Method::Lzw),
            _ => None,
        }
    }
}

/// Compress `input` to `output` with `method`, writing the envelope magic
/// first. The input must be rewindable because Huffman reads it twice.
pub fn compress<R, W>(method: Method, input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    debug!("compressing with {:?}", method);
    output.write_u16::<BigEndian>(method.magic())?;
    match method {
        Method::Huf => huffman::compress(input, output),
        Method::Lz77 => lz77::compress(input, output),
        Method::Lz78 => lz78::compress(input, output),
        Method::Lzw => lzw::compress(input, output),
    }
}

/// Compress from a forward-only stream. Huffman is refused here: it cannot
/// make its second pass over a pipe.
pub fn compress_stream<R, W>(method: Method, input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let run: fn(&mut R, &mut W) -> Result<()> = match method {
        Method::Huf => return Err(Error::NotSeekable),
        Method::Lz77 => lz77::compress::<R, W>,
        Method::Lz78 => lz78::compress::<R, W>,
        Method::Lzw => lzw::compress::<R, W>,
    };
    debug!("compressing with {:?}", method);
    output.write_u16::<BigEndian>(method.magic())?;
    run(input, output)
}

/// Decompress `input` to `output`, selecting the algorithm from the
/// envelope magic.
pub fn decompress<R, W>(input: &mut R, output: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let magic = input.read_u16::<BigEndian>().map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    })?;
    let method = match Method::from_magic(magic) {
        Some(method) => method,
        None => {
            error!("no algorithm has magic number {:#06x}", magic);
            return Err(Error::BadMagic(magic));
        }
    };
    debug!("stream magic {:#06x}: decompressing {:?}", magic, method);
    match method {
        Method::Huf => huffman::decompress(input, output),
        Method::Lz77 => lz77::decompress(input, output),
        Method::Lz78 => lz78::decompress(input, output),
        Method::Lzw => lzw::decompress(input, output),
    }
}

#[cfg(test)]
mod test {
    use super::{compress, decompress, Method, MAGIC_LZ78};
    use crate::error::Error;
    use std::io::Cursor;

    const METHODS: [Method; 4] = [Method::Huf, Method::Lz77, Method::Lz78, Method::Lzw];

    #[test]
    fn magic_mapping_is_a_bijection() {
        for method in METHODS {
            assert_eq!(Method::from_magic(method.magic()), Some(method));
        }
        assert_eq!(Method::from_magic(0x0000), None);
    }

    #[test]
    fn every_method_roundtrips_through_the_envelope() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for method in METHODS {
            let mut packed = Vec::new();
            compress(method, &mut Cursor::new(&data[..]), &mut packed).unwrap();
            assert_eq!(
                u16::from_be_bytes([packed[0], packed[1]]),
                method.magic()
            );
            let mut unpacked = Vec::new();
            decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
            assert_eq!(unpacked, data, "{method:?}");
        }
    }

    #[test]
    fn magic_selects_the_decoder() {
        // A valid LZ78 payload behind the LZ78 magic dispatches to LZ78.
        let data = b"abababab";
        let mut payload = Vec::new();
        super::lz78::compress(&mut &data[..], &mut payload).unwrap();

        let mut packed = MAGIC_LZ78.to_be_bytes().to_vec();
        packed.extend_from_slice(&payload);
        let mut unpacked = Vec::new();
        decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn corrupt_magic_is_fatal() {
        let mut packed = Vec::new();
        compress(Method::Lzw, &mut Cursor::new(&b"data"[..]), &mut packed).unwrap();
        packed[0] ^= 0xFF;
        let mut unpacked = Vec::new();
        assert!(matches!(
            decompress(&mut packed.as_slice(), &mut unpacked),
            Err(Error::BadMagic(_))
        ));
    }

    #[test]
    fn empty_input_through_every_method() {
        for method in METHODS {
            let mut packed = Vec::new();
            compress(method, &mut Cursor::new(&b""[..]), &mut packed).unwrap();
            // Magic plus at least the version byte.
            assert!(packed.len() >= 3, "{method:?} wrote {} bytes", packed.len());
            let mut unpacked = Vec::new();
            decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
            assert_eq!(unpacked, b"", "{method:?}");
        }
    }

    #[test]
    fn stream_compression_refuses_huffman() {
        let mut packed = Vec::new();
        assert!(matches!(
            super::compress_stream(Method::Huf, &mut &b"x"[..], &mut packed),
            Err(Error::NotSeekable)
        ));
        assert!(packed.is_empty());
    }

    #[test]
    fn stream_compression_works_for_lz_methods() {
        let data = b"streaming right along";
        for method in [Method::Lz77, Method::Lz78, Method::Lzw] {
            let mut packed = Vec::new();
            super::compress_stream(method, &mut &data[..], &mut packed).unwrap();
            let mut unpacked = Vec::new();
            decompress(&mut packed.as_slice(), &mut unpacked).unwrap();
            assert_eq!(unpacked, data, "{method:?}");
        }
    }
}
