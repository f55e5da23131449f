use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::ops::Index;
use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub fn norm(v: &[f32]) -> f32 {
    v.iter().copied().map(|e| e * e).sum::<f32>().sqrt()
}

pub fn normalize(v: &mut [f32]) {
    let len = norm(v);
    if len > 0.0 {
        for e in v {
            *e /= len;
        }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&a, &b)| a * b).sum()
}

/// Cosine similarity; 0 if either vector is zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let d = norm(a) * norm(b);
    if d == 0.0 {
        0.0
    } else {
        dot(a, b) / d
    }
}

/// Trained word vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    /// Embedding vector length (number of dimensions).
    size: usize,

    /// The vocabulary.
    vocab: Vec<String>,

    /// `embeddings[k * size..(k+1) * size]` is the vector embedding for word `k`.
    embeddings: Vec<f32>,
}

impl Index<usize> for Embeddings {
    type Output = [f32];

    fn index(&self, i: usize) -> &[f32] {
        &self.embeddings[i * self.size..][..self.size]
    }
}

impl Embeddings {
    /// Panics unless `embeddings.len() == vocab.len() * size`.
    pub fn new(vocab: Vec<String>, size: usize, embeddings: Vec<f32>) -> Self {
        assert_eq!(embeddings.len(), vocab.len() * size);
        Embeddings {
            size,
            vocab,
            embeddings,
        }
    }

    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    /// Returns the vector size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the index for a word as string. Exact match only, case-sensitive.
    pub fn lookup_word(&self, word: &str) -> Option<usize> {
        self.vocab.iter().position(|v| v == word)
    }

    /// Get the word for a word-index. Panics if `word` is out of range.
    pub fn word(&self, word: usize) -> &str {
        &self.vocab[word]
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.lookup_word(word).map(|i| &self[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.vocab
            .iter()
            .map(String::as_str)
            .zip(self.embeddings.chunks_exact(self.size))
    }

    /// Cosine similarity of two words, if both are known.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        Some(cosine(self.get(a)?, self.get(b)?))
    }

    /// The `n` words closest to `query` by cosine similarity, best first,
    /// leaving out the word indexes in `exclude`.
    pub fn nearest(&self, query: &[f32], exclude: &[usize], n: usize) -> Vec<(&str, f32)> {
        let mut best: Vec<(&str, f32)> = (0..self.num_words())
            .filter(|c| !exclude.contains(c))
            .map(|c| (self.word(c), cosine(query, &self[c])))
            .collect();
        best.sort_by_key(|&(_word, dist)| Reverse(OrderedFloat(dist)));
        best.truncate(n);
        best
    }

    /// The `n` words closest to `word`, not counting `word` itself.
    pub fn most_similar(&self, word: &str, n: usize) -> Option<Vec<(&str, f32)>> {
        let i = self.lookup_word(word)?;
        Some(self.nearest(&self[i], &[i], n))
    }

    /// Write vectors in the word2vec text format: a `<words> <size>` header,
    /// then one line per word.
    pub fn write_text<W: Write>(&self, mut fo: W) -> Result<()> {
        writeln!(fo, "{} {}", self.num_words(), self.size).context("error writing output file")?;
        for (word, vector) in self.iter() {
            write!(fo, "{word} ").context("error writing output file")?;
            for f in vector {
                write!(fo, "{f} ").context("error writing output file")?;
            }
            writeln!(fo).context("error writing output file")?;
        }
        fo.flush().context("error writing output file")
    }

    /// Write vectors in the word2vec binary format: the text header, then for
    /// each word `word `, its raw native-endian `f32`s, and a newline.
    pub fn write_binary<W: Write>(&self, mut fo: W) -> Result<()> {
        writeln!(fo, "{} {}", self.num_words(), self.size).context("error writing output file")?;
        for (word, vector) in self.iter() {
            write!(fo, "{word} ").context("error writing output file")?;
            fo.write_all(bytemuck::cast_slice::<f32, u8>(vector))
                .context("error writing output file")?;
            writeln!(fo).context("error writing output file")?;
        }
        fo.flush().context("error writing output file")
    }

    pub fn write_bincode<W: Write>(&self, fo: W) -> Result<()> {
        bincode::serialize_into(fo, self).context("error writing output file")
    }

    /// Load vectors saved by [`Embeddings::write_binary`].
    pub fn load(file_name: &Path) -> Result<Self> {
        let f = BufReader::new(File::open(file_name).context("error opening input file")?);
        Self::read_binary(f)
    }

    pub fn read_binary<R: BufRead>(mut f: R) -> Result<Self> {
        let mut line = String::new();
        f.read_line(&mut line).context("error reading input file")?;
        let mut fields = line.split_whitespace();
        let num_words: usize = fields
            .next()
            .ok_or_else(|| anyhow!("invalid input file"))?
            .parse()
            .context("invalid input file")?;
        let size: usize = fields
            .next()
            .ok_or_else(|| anyhow!("invalid input file"))?
            .parse()
            .context("invalid input file")?;

        ensure!(size > 0, "invalid input file: vector size is 0");
        ensure!(
            num_words.checked_mul(size).is_some(),
            "invalid input file: {num_words} vectors of size {size} is too large"
        );

        // Rows are allocated as they are read, never from the header's count.
        let mut vocab: Vec<String> = vec![];
        let mut m: Vec<f32> = vec![];
        for b in 0..num_words {
            let mut vocab_word = Vec::<u8>::new();
            let count = f
                .read_until(b' ', &mut vocab_word)
                .context("error reading input file")?;
            ensure!(count != 0, "input file ends after {b} of {num_words} words");
            if vocab_word.last() == Some(&b' ') {
                vocab_word.pop();
            }
            vocab_word.retain(|c| *c != b'\n');
            vocab.push(String::from_utf8(vocab_word).context("invalid word in input file")?);

            let start = m.len();
            m.resize(start + size, 0.0);
            f.read_exact(bytemuck::cast_slice_mut::<f32, u8>(&mut m[start..]))
                .context("error reading input file")?;
        }

        Ok(Embeddings::new(vocab, size, m))
    }
}
