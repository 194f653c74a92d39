//! Small building blocks shared by the codecs.
//!
//! - byte_chunk: an owned byte sequence used as the LZ78/LZW dictionary key.
//! - freq_count: byte frequency counting for the Huffman model.

pub mod byte_chunk;
pub mod freq_count;

pub use byte_chunk::ByteChunk;
pub use freq_count::FreqTable;
