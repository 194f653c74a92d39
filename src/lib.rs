//! Classic lossless compression codecs behind one self-describing envelope.
//!
//! Four algorithms are provided: Huffman, LZ77, LZ78 and LZW. Every encoder
//! prefixes its output with a two-byte magic number, so a compressed stream
//! carries everything a decoder needs; [`codec::decompress`] reads the magic
//! and dispatches to the right algorithm on its own.
//!
//! The modules are:
//! - bitstream: MSB-first bit-level reading and writing over byte streams.
//! - tools: byte chunks (dictionary keys) and byte frequency counting.
//! - codec: the four codecs and the envelope that multiplexes them.
//!
//! Compress a file with the default algorithm (LZW):
//!
//! ```no_run
//! use std::fs::File;
//! use squeeze::codec::{self, Method};
//!
//! # fn main() -> squeeze::Result<()> {
//! let mut input = File::open("notes.txt")?;
//! let mut output = File::create("notes.txt.sq")?;
//! codec::compress(Method::Lzw, &mut input, &mut output)?;
//! # Ok(())
//! # }
//! ```
#![warn(rust_2018_idioms)]

pub mod bitstream;
pub mod codec;
pub mod error;
pub mod tools;

pub use error::{Error, Result};
