//! Bit-level I/O over byte streams.
//!
//! Every compressed format in this crate is a bit stream: headers and records
//! use field widths that rarely line up with byte boundaries. The two types
//! here adapt a plain byte stream to that world.
//!
//! The convention on both sides is MSB-first: the first bit written lands in
//! bit 7 of the first output byte, and multi-bit integers are written from
//! their highest bit down. Reader and writer must agree on this exactly or
//! every value after the first misaligned field is garbage.

pub mod bitreader;
pub mod bitwriter;

pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
