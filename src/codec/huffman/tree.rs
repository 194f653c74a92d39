//! The Huffman code tree: construction, serialization and bit-by-bit walking.
//!
//! The tree is built once on the encoder side from a frequency table and
//! shipped inside the stream header, so the decoder never rebuilds it from
//! frequencies: it parses the serialized shape. That makes tie-breaking
//! during construction a local concern: it only has to be deterministic,
//! not canonical.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::{Read, Write};

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::tools::FreqTable;

/// A node owns its children outright, so dropping the root drops the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuffNode {
    Leaf {
        symbol: u8,
    },
    Internal {
        left: Box<HuffNode>,
        right: Box<HuffNode>,
    },
}

/// A complete Huffman tree. Empty input produces an empty tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffTree {
    root: Option<HuffNode>,
}

/// Heap entry during construction. Ordered by weight, then by insertion
/// sequence so equal weights resolve the same way on every run.
struct HeapNode {
    weight: u64,
    seq: u32,
    node: HuffNode,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.seq == other.seq
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then(self.seq.cmp(&other.seq))
    }
}

impl HuffTree {
    /// Build a tree from a frequency table.
    ///
    /// One leaf per seen symbol goes into a min-heap; the two lightest nodes
    /// are merged until one remains. The first node popped becomes the left
    /// child.
    pub fn from_freqs(freqs: &FreqTable) -> Self {
        let mut heap: BinaryHeap<Reverse<HeapNode>> = BinaryHeap::new();
        let mut seq = 0u32;
        for (symbol, weight) in freqs.iter() {
            heap.push(Reverse(HeapNode {
                weight,
                seq,
                node: HuffNode::Leaf { symbol },
            }));
            seq += 1;
        }

        while heap.len() > 1 {
            if let (Some(Reverse(a)), Some(Reverse(b))) = (heap.pop(), heap.pop()) {
                heap.push(Reverse(HeapNode {
                    weight: a.weight + b.weight,
                    seq,
                    node: HuffNode::Internal {
                        left: Box::new(a.node),
                        right: Box::new(b.node),
                    },
                }));
                seq += 1;
            }
        }

        Self {
            root: heap.pop().map(|Reverse(n)| n.node),
        }
    }

    /// If the whole tree is one leaf, its symbol.
    pub fn sole_symbol(&self) -> Option<u8> {
        match self.root {
            Some(HuffNode::Leaf { symbol }) => Some(symbol),
            _ => None,
        }
    }

    /// The bit code of every symbol, indexed by byte value.
    ///
    /// A left edge appends 0, a right edge appends 1. A single-leaf tree
    /// codes its symbol as the one bit `1`.
    pub fn codification(&self) -> Vec<Option<Vec<u8>>> {
        let mut codes: Vec<Option<Vec<u8>>> = vec![None; 256];
        let root = match &self.root {
            Some(root) => root,
            None => return codes,
        };
        if let HuffNode::Leaf { symbol } = root {
            codes[*symbol as usize] = Some(vec![1]);
            return codes;
        }

        let mut stack: Vec<(&HuffNode, Vec<u8>)> = vec![(root, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            match node {
                HuffNode::Leaf { symbol } => codes[*symbol as usize] = Some(path),
                HuffNode::Internal { left, right } => {
                    let mut lpath = path.clone();
                    lpath.push(0);
                    stack.push((left.as_ref(), lpath));
                    let mut rpath = path;
                    rpath.push(1);
                    stack.push((right.as_ref(), rpath));
                }
            }
        }
        codes
    }

    /// Write the tree shape and leaves in pre-order: an internal node is the
    /// bit 0 followed by its left then right subtree, a leaf is the bit 1
    /// followed by its 8-bit symbol. An empty tree writes nothing.
    pub fn serialize<W: Write>(&self, bw: &mut BitWriter<W>) -> Result<()> {
        let root = match &self.root {
            Some(root) => root,
            None => return Ok(()),
        };
        // Push right first so the left subtree is written first.
        let mut stack: Vec<&HuffNode> = vec![root];
        while let Some(node) = stack.pop() {
            match node {
                HuffNode::Internal { left, right } => {
                    bw.out_bit(0)?;
                    stack.push(right.as_ref());
                    stack.push(left.as_ref());
                }
                HuffNode::Leaf { symbol } => {
                    bw.out_bit(1)?;
                    bw.out8(*symbol)?;
                }
            }
        }
        Ok(())
    }

    /// Parse the pre-order grammar written by [`serialize`](Self::serialize).
    ///
    /// Built iteratively: a frame per internal node waiting for children, so
    /// a pathological 255-deep tree cannot blow the call stack. The parse is
    /// complete exactly when every leaf slot has been filled.
    pub fn deserialize<R: Read>(br: &mut BitReader<R>) -> Result<Self> {
        // Each frame is an internal node: None until its left subtree is
        // done, then Some(left) while the right subtree is parsed.
        let mut frames: Vec<Option<Box<HuffNode>>> = Vec::new();
        loop {
            if br.bit()? == 0 {
                if frames.len() >= 256 {
                    return Err(Error::Header("huffman tree deeper than its alphabet"));
                }
                frames.push(None);
                continue;
            }
            let mut done = HuffNode::Leaf { symbol: br.byte()? };
            loop {
                match frames.pop() {
                    None => return Ok(Self { root: Some(done) }),
                    Some(None) => {
                        frames.push(Some(Box::new(done)));
                        break;
                    }
                    Some(Some(left)) => {
                        done = HuffNode::Internal {
                            left,
                            right: Box::new(done),
                        };
                    }
                }
            }
        }
    }

    /// Frequency-weighted mean code length in bits per symbol, given the
    /// table the tree was built from. A single-leaf tree codes at one bit;
    /// an empty tree reports zero.
    pub fn mean_code_len(&self, freqs: &FreqTable) -> f64 {
        if freqs.total() == 0 {
            return 0.0;
        }
        let codes = self.codification();
        let weighted: u64 = freqs
            .iter()
            .map(|(b, c)| c * codes[b as usize].as_ref().map_or(0, Vec::len) as u64)
            .sum();
        weighted as f64 / freqs.total() as f64
    }

    /// Incremental decoder positioned at the root. `None` for an empty tree.
    pub fn walker(&self) -> Option<Walker<'_>> {
        self.root.as_ref().map(|root| Walker { root, cursor: root })
    }
}

/// A cursor walking the tree one bit at a time.
///
/// Each [`step`](Walker::step) descends left on 0 and right on 1; reaching a
/// leaf yields its symbol and resets the cursor to the root.
pub struct Walker<'a> {
    root: &'a HuffNode,
    cursor: &'a HuffNode,
}

impl Walker<'_> {
    pub fn step(&mut self, bit: u8) -> Result<Option<u8>> {
        let cursor = self.cursor;
        match cursor {
            HuffNode::Internal { left, right } => {
                let next = if bit == 0 { left.as_ref() } else { right.as_ref() };
                if let HuffNode::Leaf { symbol } = next {
                    self.cursor = self.root;
                    Ok(Some(*symbol))
                } else {
                    self.cursor = next;
                    Ok(None)
                }
            }
            // Only possible when the root itself is a leaf; that stream has
            // no code bits to walk.
            HuffNode::Leaf { .. } => Err(Error::Header("huffman code walk from a leaf root")),
        }
    }
}
