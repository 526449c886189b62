//! Huffman decoders for the HUFF and AHUFF compression types.
//!
//! Both codecs work MSB-first over the compressed bit stream and
//! terminate on an end-of-stream symbol, following the textbook
//! scheme the format's reference library is built on.
//!
//! - **HUFF** (static): the stream opens with a weight table (a
//!   big-endian `u16` entry count, then `(symbol, weight)` byte pairs)
//!   from which the decoder rebuilds the encoder's tree (an implicit
//!   end-of-stream leaf of weight 1 is appended). Ties during tree
//!   construction resolve to the earliest-created node, making the
//!   tree deterministic on both sides.
//! - **AHUFF** (adaptive): an FGK tree seeded with only the escape and
//!   end-of-stream symbols. Novel symbols are announced by the escape
//!   code followed by eight raw bits; the model updates after every
//!   symbol, swapping nodes to maintain the sibling property.

use super::super::types::error::{CdfError, Result};

/// MSB-first reader over a byte slice.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, pos: 0, bit: 0 }
    }

    fn read_bit(&mut self) -> Result<u32> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CdfError::Decompression("bit stream ended mid-symbol".to_string()))?;
        let bit = (byte >> (7 - self.bit)) & 1;
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.pos += 1;
        }
        Ok(bit as u32)
    }

    fn read_bits(&mut self, count: u32) -> Result<u32> {
        let mut value = 0;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()?;
        }
        Ok(value)
    }
}

const END_OF_STREAM: usize = 256;

/// A node of the static decode tree: a leaf symbol or a branch pair.
enum HuffNode {
    Leaf(usize),
    Branch { zero: usize, one: usize },
}

/// Decodes a HUFF-compressed payload.
pub fn decode_huffman(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 2 {
        return Err(CdfError::Decompression(
            "HUFF stream shorter than its weight table header".to_string(),
        ));
    }
    let n_entries = u16::from_be_bytes([data[0], data[1]]) as usize;
    let table_end = 2 + n_entries * 2;
    if n_entries == 0 || data.len() < table_end {
        return Err(CdfError::Decompression(format!(
            "HUFF weight table truncated: {} entries declared in {} bytes",
            n_entries,
            data.len()
        )));
    }

    // Leaves in table order, then the implicit end-of-stream leaf.
    let mut nodes = Vec::with_capacity(n_entries * 2 + 1);
    let mut weights = Vec::with_capacity(n_entries + 1);
    for i in 0..n_entries {
        let symbol = data[2 + i * 2] as usize;
        let weight = data[3 + i * 2] as u64;
        if weight == 0 {
            return Err(CdfError::Decompression(format!(
                "HUFF weight table entry {} has zero weight",
                i
            )));
        }
        nodes.push(HuffNode::Leaf(symbol));
        weights.push(weight);
    }
    nodes.push(HuffNode::Leaf(END_OF_STREAM));
    weights.push(1);

    // Merge the two lightest live nodes until one root remains; ties
    // resolve to the earliest node so encoder and decoder agree.
    let mut live: Vec<usize> = (0..nodes.len()).collect();
    while live.len() > 1 {
        let mut lightest = [usize::MAX; 2];
        for rank in 0..2 {
            let mut best = usize::MAX;
            for (slot, &node) in live.iter().enumerate() {
                if rank == 1 && slot == lightest[0] {
                    continue;
                }
                if best == usize::MAX
                    || (weights[node], node) < (weights[live[best]], live[best])
                {
                    best = slot;
                }
            }
            lightest[rank] = best;
        }
        let (zero_slot, one_slot) = (lightest[0], lightest[1]);
        let (zero, one) = (live[zero_slot], live[one_slot]);
        weights.push(weights[zero] + weights[one]);
        nodes.push(HuffNode::Branch { zero, one });
        let parent = nodes.len() - 1;
        // Replace the first child slot with the parent, drop the second.
        live[zero_slot] = parent;
        live.swap_remove(one_slot);
    }
    let root = live[0];

    let mut bits = BitReader::new(&data[table_end..]);
    let mut out = Vec::new();
    loop {
        let mut node = root;
        loop {
            match nodes[node] {
                HuffNode::Leaf(symbol) => {
                    if symbol == END_OF_STREAM {
                        return Ok(out);
                    }
                    out.push(symbol as u8);
                    break;
                }
                HuffNode::Branch { zero, one } => {
                    node = if bits.read_bit()? == 0 { zero } else { one };
                }
            }
        }
    }
}

const ESCAPE: usize = 257;
const SYMBOL_COUNT: usize = 258;
const NODE_TABLE: usize = SYMBOL_COUNT * 2 - 1;
const ROOT: usize = 0;
const MAX_WEIGHT: u32 = 0x8000;

#[derive(Debug, Clone, Copy, Default)]
struct AdaptiveNode {
    weight: u32,
    parent: i32,
    child_is_leaf: bool,
    child: i32,
}

/// The FGK adaptive tree. Sibling nodes occupy adjacent slots; the
/// node array stays sorted by non-increasing weight, which is what the
/// swap step in `update_model` maintains.
struct AdaptiveTree {
    leaf: [i32; SYMBOL_COUNT],
    next_free: usize,
    nodes: [AdaptiveNode; NODE_TABLE],
}

impl AdaptiveTree {
    fn new() -> Self {
        let mut tree = AdaptiveTree {
            leaf: [-1; SYMBOL_COUNT],
            next_free: ROOT + 3,
            nodes: [AdaptiveNode::default(); NODE_TABLE],
        };
        tree.nodes[ROOT] = AdaptiveNode {
            weight: 2,
            parent: -1,
            child_is_leaf: false,
            child: (ROOT + 1) as i32,
        };
        tree.nodes[ROOT + 1] = AdaptiveNode {
            weight: 1,
            parent: ROOT as i32,
            child_is_leaf: true,
            child: END_OF_STREAM as i32,
        };
        tree.leaf[END_OF_STREAM] = (ROOT + 1) as i32;
        tree.nodes[ROOT + 2] = AdaptiveNode {
            weight: 1,
            parent: ROOT as i32,
            child_is_leaf: true,
            child: ESCAPE as i32,
        };
        tree.leaf[ESCAPE] = (ROOT + 2) as i32;
        tree
    }

    /// Walks the tree by input bits to the next symbol. An escape is
    /// followed by eight raw bits naming a novel symbol, which joins
    /// the tree at the lightest position.
    fn decode_symbol(&mut self, bits: &mut BitReader) -> Result<usize> {
        let mut node = ROOT;
        while !self.nodes[node].child_is_leaf {
            node = self.nodes[node].child as usize + bits.read_bit()? as usize;
        }
        let mut symbol = self.nodes[node].child as usize;
        if symbol == ESCAPE {
            symbol = bits.read_bits(8)? as usize;
            self.add_new_node(symbol);
        }
        Ok(symbol)
    }

    fn add_new_node(&mut self, symbol: usize) {
        let lightest = self.next_free - 1;
        let moved = self.next_free;
        let fresh = self.next_free + 1;
        self.next_free += 2;

        self.nodes[moved] = self.nodes[lightest];
        self.nodes[moved].parent = lightest as i32;
        if self.nodes[moved].child_is_leaf {
            self.leaf[self.nodes[moved].child as usize] = moved as i32;
        }
        self.nodes[lightest].child = moved as i32;
        self.nodes[lightest].child_is_leaf = false;

        self.nodes[fresh] = AdaptiveNode {
            weight: 0,
            parent: lightest as i32,
            child_is_leaf: true,
            child: symbol as i32,
        };
        self.leaf[symbol] = fresh as i32;
    }

    /// Increments the weight of `symbol`'s leaf and every ancestor,
    /// swapping each updated node ahead of any lighter peer so the
    /// sibling property holds.
    fn update_model(&mut self, symbol: usize) {
        if self.nodes[ROOT].weight == MAX_WEIGHT {
            self.rebuild_tree();
        }
        let mut current = self.leaf[symbol];
        while current != -1 {
            let node = current as usize;
            self.nodes[node].weight += 1;
            let mut target = node;
            while target > ROOT && self.nodes[target - 1].weight < self.nodes[node].weight {
                target -= 1;
            }
            if target != node {
                self.swap_nodes(node, target);
                current = target as i32;
            }
            current = self.nodes[current as usize].parent;
        }
    }

    /// Exchanges two subtree roots in the node array, keeping each
    /// position's parent link in place.
    fn swap_nodes(&mut self, i: usize, j: usize) {
        if self.nodes[i].child_is_leaf {
            self.leaf[self.nodes[i].child as usize] = j as i32;
        } else {
            let child = self.nodes[i].child as usize;
            self.nodes[child].parent = j as i32;
            self.nodes[child + 1].parent = j as i32;
        }
        if self.nodes[j].child_is_leaf {
            self.leaf[self.nodes[j].child as usize] = i as i32;
        } else {
            let child = self.nodes[j].child as usize;
            self.nodes[child].parent = i as i32;
            self.nodes[child + 1].parent = i as i32;
        }
        let mut tmp = self.nodes[i];
        self.nodes[i] = self.nodes[j];
        self.nodes[i].parent = tmp.parent;
        tmp.parent = self.nodes[j].parent;
        self.nodes[j] = tmp;
    }

    /// Halves every leaf weight and rebuilds the tree from scratch.
    /// Runs only when the root weight saturates.
    fn rebuild_tree(&mut self) {
        // Compact the leaves into the tail of the live node range.
        let mut j = self.next_free - 1;
        for i in (ROOT..self.next_free).rev() {
            if self.nodes[i].child_is_leaf {
                self.nodes[j] = self.nodes[i];
                self.nodes[j].weight = (self.nodes[j].weight + 1) / 2;
                j -= 1;
            }
        }
        // Re-merge pairs from the tail, inserting each new internal
        // node so the array stays sorted by non-increasing weight.
        let mut i = self.next_free - 2;
        loop {
            let weight = self.nodes[i].weight + self.nodes[i + 1].weight;
            let mut k = j + 1;
            while weight < self.nodes[k].weight {
                k += 1;
            }
            k -= 1;
            self.nodes.copy_within(j + 1..k + 1, j);
            self.nodes[k] = AdaptiveNode {
                weight,
                parent: -1,
                child_is_leaf: false,
                child: i as i32,
            };
            if j == ROOT {
                break;
            }
            j -= 1;
            i -= 2;
        }
        // Restore parent and leaf links.
        for i in (ROOT..self.next_free).rev() {
            if self.nodes[i].child_is_leaf {
                self.leaf[self.nodes[i].child as usize] = i as i32;
            } else {
                let child = self.nodes[i].child as usize;
                self.nodes[child].parent = i as i32;
                self.nodes[child + 1].parent = i as i32;
            }
        }
        self.nodes[ROOT].parent = -1;
    }
}

/// Decodes an AHUFF-compressed payload.
pub fn decode_adaptive(data: &[u8]) -> Result<Vec<u8>> {
    let mut bits = BitReader::new(data);
    let mut tree = AdaptiveTree::new();
    let mut out = Vec::new();
    loop {
        let symbol = tree.decode_symbol(&mut bits)?;
        if symbol == END_OF_STREAM {
            return Ok(out);
        }
        out.push(symbol as u8);
        tree.update_model(symbol);
    }
}
