//! Training objectives: hierarchical softmax and negative sampling.
//!
//! Both work on a hidden vector `h` and the output vectors they own. Neither
//! knows which model built `h`.

use anyhow::Result;
use rand::rngs::StdRng;

use crate::huffman::HuffmanTree;
use crate::matrix::SharedMatrix;
use crate::sampling::NegativeSampleTable;

const EXP_TABLE_SIZE: usize = 1000;
const MAX_EXP: f32 = 6.0;

/// Precomputed logistic function over `[-MAX_EXP, MAX_EXP]`.
#[derive(Debug, Clone)]
pub struct Sigmoid {
    table: Vec<f32>,
}

impl Default for Sigmoid {
    fn default() -> Self {
        let table = (0..EXP_TABLE_SIZE)
            .map(|i| {
                let x = (i as f32 / EXP_TABLE_SIZE as f32 * 2.0 - 1.0) * MAX_EXP;
                let e = x.exp();
                e / (e + 1.0)
            })
            .collect();
        Sigmoid { table }
    }
}

impl Sigmoid {
    /// Approximate `1 / (1 + e^-x)`, saturating to 0 or 1 outside the table.
    pub fn get(&self, x: f32) -> f32 {
        if x >= MAX_EXP {
            1.0
        } else if x <= -MAX_EXP {
            0.0
        } else {
            let i = ((x + MAX_EXP) / (2.0 * MAX_EXP) * EXP_TABLE_SIZE as f32) as usize;
            self.table[i.min(EXP_TABLE_SIZE - 1)]
        }
    }
}

pub trait Optimizer: Send + Sync {
    /// Take one gradient step towards predicting `word` from `hidden`.
    ///
    /// Output vectors are updated in place. The gradient with respect to
    /// `hidden`, already scaled by `learning_rate`, is added to `grad`; the
    /// caller decides which input vectors receive it.
    fn update(
        &self,
        hidden: &[f32],
        word: usize,
        learning_rate: f32,
        grad: &mut [f32],
        rng: &mut StdRng,
    );

    /// The output weight matrix.
    fn weights(&self) -> &SharedMatrix;
}

/// Walks the Huffman path of the true word, one binary decision per internal
/// node.
pub struct HierarchicalSoftmax {
    tree: HuffmanTree,
    /// At most this many steps of a path are trained; 0 means all of them.
    /// Deep paths of rare words are cut short as an approximation.
    max_depth: usize,
    weights: SharedMatrix,
    sigmoid: Sigmoid,
}

impl HierarchicalSoftmax {
    pub fn new(counts: &[u64], dim: usize, max_depth: usize) -> Result<Self> {
        let tree = HuffmanTree::new(counts);
        let weights = SharedMatrix::zeros(tree.num_internal(), dim)?;
        log::info!(
            "Huffman tree: {} internal nodes, depth {}",
            tree.num_internal(),
            tree.depth()
        );
        Ok(HierarchicalSoftmax {
            tree,
            max_depth,
            weights,
            sigmoid: Sigmoid::default(),
        })
    }

    pub fn tree(&self) -> &HuffmanTree {
        &self.tree
    }
}

impl Optimizer for HierarchicalSoftmax {
    fn update(
        &self,
        hidden: &[f32],
        word: usize,
        learning_rate: f32,
        grad: &mut [f32],
        _rng: &mut StdRng,
    ) {
        for (node, bit) in self.tree.path(word).steps(self.max_depth) {
            let f = self.sigmoid.get(self.weights.dot(node, hidden));
            // Bit 0 is the positive label.
            let g = (1.0 - bit as f32 - f) * learning_rate;
            self.weights.add_row_to(node, g, grad);
            self.weights.add_to_row(node, g, hidden);
        }
    }

    fn weights(&self) -> &SharedMatrix {
        &self.weights
    }
}

/// Contrasts the true word with `sample_size` words drawn from the unigram
/// table.
pub struct NegativeSampling {
    table: NegativeSampleTable,
    sample_size: usize,
    weights: SharedMatrix,
    sigmoid: Sigmoid,
}

impl NegativeSampling {
    pub fn new(counts: &[u64], dim: usize, sample_size: usize, table_size: usize) -> Result<Self> {
        let table = NegativeSampleTable::new(counts, table_size);
        let weights = SharedMatrix::zeros(counts.len(), dim)?;
        log::info!("negative sample table: {} slots", table.len());
        Ok(NegativeSampling {
            table,
            sample_size,
            weights,
            sigmoid: Sigmoid::default(),
        })
    }

    fn step(&self, hidden: &[f32], target: usize, label: f32, learning_rate: f32, grad: &mut [f32]) {
        let f = self.sigmoid.get(self.weights.dot(target, hidden));
        let g = (label - f) * learning_rate;
        self.weights.add_row_to(target, g, grad);
        self.weights.add_to_row(target, g, hidden);
    }
}

impl Optimizer for NegativeSampling {
    fn update(
        &self,
        hidden: &[f32],
        word: usize,
        learning_rate: f32,
        grad: &mut [f32],
        rng: &mut StdRng,
    ) {
        self.step(hidden, word, 1.0, learning_rate, grad);
        for _ in 0..self.sample_size {
            if let Some(negative) = self.table.sample_excluding(word, rng) {
                self.step(hidden, negative, 0.0, learning_rate, grad);
            }
        }
    }

    fn weights(&self) -> &SharedMatrix {
        &self.weights
    }
}
