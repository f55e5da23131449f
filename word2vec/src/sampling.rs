//! Random sampling of words: the unigram table for negative sampling and
//! subsampling of frequent words.

use rand::Rng;

/// Number of slots in a [`NegativeSampleTable`] built with default settings.
///
/// 10^6 slots resolve shares down to one in a million, which is plenty for
/// vocabularies up to a few hundred thousand words.
pub const DEFAULT_TABLE_SIZE: usize = 1_000_000;

/// Exponent applied to word counts before sampling negatives.
const POWER: f64 = 0.75;

/// How many times [`NegativeSampleTable::sample_excluding`] redraws before
/// giving up.
const MAX_REDRAWS: usize = 32;

/// A table of word ids in which each word fills a contiguous run of slots
/// proportional to `count^0.75`. A uniform slot index is a sample.
#[derive(Debug, Clone)]
pub struct NegativeSampleTable {
    table: Vec<u32>,
}

impl NegativeSampleTable {
    /// Panics if `counts` is empty or `size` is zero.
    pub fn new(counts: &[u64], size: usize) -> NegativeSampleTable {
        assert!(!counts.is_empty(), "cannot sample from an empty vocabulary");
        assert!(size > 0, "negative sample table needs at least one slot");

        let total_pow = counts
            .iter()
            .map(|&c| (c as f64).powf(POWER))
            .sum::<f64>();

        let mut table = Vec::with_capacity(size);
        let mut i = 0;
        let mut cumulative = (counts[i] as f64).powf(POWER) / total_pow;
        for a in 0..size {
            // Slot `a` goes to the word whose cumulative share covers its midpoint.
            while (a as f64 + 0.5) / size as f64 > cumulative && i + 1 < counts.len() {
                i += 1;
                cumulative += (counts[i] as f64).powf(POWER) / total_pow;
            }
            table.push(i as u32);
        }
        NegativeSampleTable { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        self.table[rng.gen_range(0..self.table.len())] as usize
    }

    /// Draw a word other than `target`, redrawing on collisions.
    ///
    /// Returns `None` when every attempt hit `target`, which happens for a
    /// one-word vocabulary or when `target` dominates the table.
    pub fn sample_excluding<R: Rng>(&self, target: usize, rng: &mut R) -> Option<usize> {
        (0..MAX_REDRAWS)
            .map(|_| self.sample(rng))
            .find(|&w| w != target)
    }
}

/// Randomly discards occurrences of frequent words.
///
/// A word whose share of the corpus is `r` is dropped with probability
/// `max(0, 1 - sqrt(t/r) - t/r)`, where `t` is the threshold. A threshold of
/// zero turns subsampling off.
#[derive(Debug, Clone, Copy)]
pub struct Subsampler {
    threshold: f64,
    corpus_size: u64,
}

impl Subsampler {
    pub fn new(threshold: f64, corpus_size: u64) -> Subsampler {
        Subsampler {
            threshold,
            corpus_size,
        }
    }

    pub fn discard_probability(&self, count: u64) -> f64 {
        if self.threshold <= 0.0 || count == 0 || self.corpus_size == 0 {
            return 0.0;
        }
        let r = count as f64 / self.corpus_size as f64;
        let x = self.threshold / r;
        (1.0 - x.sqrt() - x).max(0.0)
    }

    /// Decide whether to keep one occurrence of a word seen `count` times.
    pub fn keep<R: Rng>(&self, count: u64, rng: &mut R) -> bool {
        let p = self.discard_probability(count);
        p == 0.0 || rng.gen::<f64>() >= p
    }
}
