//! Huffman coding tree for hierarchical softmax.
//!
//! Frequent words get short codes, so the expected number of output vectors
//! touched per training example is small.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// One node of the tree. Leaves are words; internal nodes own their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        word: usize,
        weight: u64,
    },
    Internal {
        /// Index into the output weight matrix, in `0..vocab_size - 1`.
        index: usize,
        weight: u64,
        /// Reached by bit 0.
        left: Box<Node>,
        /// Reached by bit 1.
        right: Box<Node>,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }
}

/// The root-to-leaf route to one word.
///
/// `points[d]` is the internal node visited at depth `d` and `code[d]` is the
/// branch taken there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    pub points: Vec<u32>,
    pub code: Vec<u8>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// The first `max_depth` steps of the path; all of it if `max_depth == 0`.
    pub fn steps(&self, max_depth: usize) -> impl Iterator<Item = (usize, u8)> + '_ {
        let n = if max_depth == 0 {
            self.len()
        } else {
            self.len().min(max_depth)
        };
        self.points[..n]
            .iter()
            .map(|&p| p as usize)
            .zip(self.code[..n].iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    root: Node,
    paths: Vec<Path>,
}

impl HuffmanTree {
    /// Build the tree over word ids `0..counts.len()`.
    ///
    /// The two lightest nodes are merged until one remains. Ties go to the node
    /// that entered the queue first: leaves in id order, then internal nodes in
    /// creation order. The lighter child of each merge gets bit 0.
    ///
    /// Panics if `counts` is empty.
    pub fn new(counts: &[u64]) -> HuffmanTree {
        assert!(!counts.is_empty(), "cannot build a Huffman tree over no words");

        // Heap entries are (weight, sequence number); `pending` holds the
        // nodes by sequence number until they are merged.
        let mut heap = BinaryHeap::with_capacity(counts.len());
        let mut pending: Vec<Option<Node>> = Vec::with_capacity(counts.len() * 2);
        for (word, &weight) in counts.iter().enumerate() {
            heap.push(Reverse((weight, pending.len())));
            pending.push(Some(Node::Leaf { word, weight }));
        }

        let mut next_index = 0;
        while heap.len() > 1 {
            let (Some(Reverse((w1, s1))), Some(Reverse((w2, s2)))) = (heap.pop(), heap.pop())
            else {
                unreachable!("heap holds at least two nodes");
            };
            let left = pending[s1].take().expect("each node is merged once");
            let right = pending[s2].take().expect("each node is merged once");
            let weight = w1 + w2;
            heap.push(Reverse((weight, pending.len())));
            pending.push(Some(Node::Internal {
                index: next_index,
                weight,
                left: Box::new(left),
                right: Box::new(right),
            }));
            next_index += 1;
        }

        let Reverse((_, root_seq)) = heap.pop().expect("heap holds the root");
        let root = pending[root_seq].take().expect("root was never merged");

        let mut paths = vec![Path::default(); counts.len()];
        assign_paths(&root, &mut Path::default(), &mut paths);
        HuffmanTree { root, paths }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of internal nodes, which is one less than the number of words.
    pub fn num_internal(&self) -> usize {
        self.paths.len() - 1
    }

    pub fn path(&self, word: usize) -> &Path {
        &self.paths[word]
    }

    /// Length of the longest code.
    pub fn depth(&self) -> usize {
        self.paths.iter().map(Path::len).max().unwrap_or(0)
    }
}

fn assign_paths(node: &Node, prefix: &mut Path, paths: &mut [Path]) {
    match node {
        Node::Leaf { word, .. } => paths[*word] = prefix.clone(),
        Node::Internal {
            index, left, right, ..
        } => {
            for (bit, child) in [(0u8, left), (1u8, right)] {
                prefix.points.push(*index as u32);
                prefix.code.push(bit);
                assign_paths(child, prefix, paths);
                prefix.points.pop();
                prefix.code.pop();
            }
        }
    }
}
