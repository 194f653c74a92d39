//! Byte frequency counting.
//!
//! A frequency table is a zeroth-order model of its input: a count per byte
//! value plus the total number of bytes seen. It is all the Huffman encoder
//! needs to build its tree.

use std::io::Read;

use crate::error::Result;

const READ_CHUNK: usize = 64 * 1024;

/// Occurrence counts for each byte value, plus the total read.
#[derive(Clone, Debug)]
pub struct FreqTable {
    counts: [u64; 256],
    total: u64,
}

impl Default for FreqTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FreqTable {
    pub fn new() -> Self {
        Self {
            counts: [0; 256],
            total: 0,
        }
    }

    /// Count one occurrence of `byte`.
    pub fn count(&mut self, byte: u8) {
        self.counts[byte as usize] += 1;
        self.total += 1;
    }

    /// Consume a stream, counting every byte until end of input.
    pub fn count_from<R: Read + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match input.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => buf[..n].iter().for_each(|&b| self.count(b)),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Total number of bytes counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// How many distinct byte values were seen.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Seen byte values with their counts, in ascending byte order.
    ///
    /// The order matters: Huffman construction breaks weight ties by
    /// insertion sequence, so iteration must be deterministic.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(b, &c)| (b as u8, c))
    }

    /// Relative emission frequency of each seen byte.
    pub fn frequencies(&self) -> Vec<(u8, f64)> {
        self.iter()
            .map(|(b, c)| (b, c as f64 / self.total as f64))
            .collect()
    }
}
