//! Multithreaded word2vec training.
//!
//! Build a [`Config`] from [`Options`], hand it to [`Word2vec`] together with
//! the training text, and call [`Word2vec::train`]:
//!
//! ```no_run
//! use word2vec::{Options, Word2vec};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Options {
//!     model: "skip-gram".to_string(),
//!     optimizer: "ns".to_string(),
//!     ..Options::default()
//! }
//! .validate()?;
//! let embeddings = Word2vec::open("corpus.txt", config)?.train()?;
//! for (word, similarity) in embeddings.most_similar("king", 10).unwrap_or_default() {
//!     println!("{word} {similarity}");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod embeddings;
mod huffman;
mod matrix;
mod model;
mod optimizer;
mod sampling;
mod trainer;
mod vocab;
mod window;

pub use config::{Config, OptimizerKind, Options};
pub use embeddings::{cosine, dot, norm, normalize, Embeddings};
pub use huffman::{HuffmanTree, Node, Path as HuffmanPath};
pub use matrix::{Real, SharedMatrix};
pub use model::{Model, Scratch};
pub use optimizer::{HierarchicalSoftmax, NegativeSampling, Optimizer, Sigmoid};
pub use sampling::{NegativeSampleTable, Subsampler, DEFAULT_TABLE_SIZE};
pub use trainer::{LearningRate, Word2vec};
pub use vocab::{Corpus, Vocabulary, Word, MAX_SENTENCE_LENGTH};
pub use window::{window_around, ContextWindows, Example, Examples};
