//! Training options and their validation.

use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::{bail, ensure, Result};

use crate::model::Model;
use crate::sampling::DEFAULT_TABLE_SIZE;

/// Which training objective to use, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    /// Only the first `max_depth` steps of each Huffman path are trained;
    /// 0 trains whole paths.
    HierarchicalSoftmax { max_depth: usize },
    NegativeSampling { sample_size: usize, table_size: usize },
}

impl Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::HierarchicalSoftmax { max_depth } => {
                write!(f, "hierarchical softmax (max depth {max_depth})")
            }
            OptimizerKind::NegativeSampling { sample_size, .. } => {
                write!(f, "negative sampling ({sample_size} samples)")
            }
        }
    }
}

/// Unvalidated training options, as supplied by a caller or command line.
///
/// `Options::default()` holds the usual word2vec defaults. Turn it into a
/// [`Config`] with [`Options::validate`].
#[derive(Debug, Clone)]
pub struct Options {
    pub dimension: usize,
    /// Number of passes over the corpus.
    pub iteration: usize,
    /// Discard words that appear fewer than this many times.
    pub min_count: u64,
    pub thread_size: usize,
    /// Context radius on each side of the target word.
    pub window: usize,
    pub initial_learning_rate: f32,
    pub to_lower: bool,
    /// Show a progress bar while training.
    pub verbose: bool,
    /// One of `cbow`, `skip-gram`.
    pub model: String,
    /// One of `hs` (`hierarchical-softmax`), `ns` (`negative-sampling`).
    pub optimizer: String,
    /// Words a worker processes between learning-rate updates.
    pub batch_size: u64,
    pub max_depth: usize,
    pub negative_sample_size: usize,
    pub subsample_threshold: f64,
    /// Lower limit of the learning rate, as a fraction of the initial rate.
    pub theta: f32,
    /// Seed for every random choice. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            dimension: 10,
            iteration: 15,
            min_count: 5,
            thread_size: std::thread::available_parallelism().map_or(1, |n| n.get()),
            window: 5,
            initial_learning_rate: 0.025,
            to_lower: false,
            verbose: false,
            model: "cbow".to_string(),
            optimizer: "hs".to_string(),
            batch_size: 10_000,
            max_depth: 100,
            negative_sample_size: 5,
            subsample_threshold: 1.0e-3,
            theta: 1.0e-4,
            seed: None,
        }
    }
}

fn parse_optimizer(options: &Options) -> Result<OptimizerKind> {
    match options.optimizer.as_str() {
        "hs" | "hierarchical-softmax" => Ok(OptimizerKind::HierarchicalSoftmax {
            max_depth: options.max_depth,
        }),
        "ns" | "negative-sampling" => {
            ensure!(
                options.negative_sample_size > 0,
                "negative sample size must be positive"
            );
            Ok(OptimizerKind::NegativeSampling {
                sample_size: options.negative_sample_size,
                table_size: DEFAULT_TABLE_SIZE,
            })
        }
        other => bail!("invalid optimizer: {other} not in hs|ns"),
    }
}

impl Options {
    /// Check every option and produce an immutable [`Config`].
    pub fn validate(self) -> Result<Config> {
        let model = Model::from_str(&self.model)?;
        let optimizer = parse_optimizer(&self)?;

        ensure!(self.dimension > 0, "dimension must be positive");
        ensure!(self.iteration > 0, "iteration must be positive");
        ensure!(self.thread_size > 0, "thread size must be at least 1");
        ensure!(self.window > 0, "window must be at least 1");
        ensure!(
            self.initial_learning_rate > 0.0,
            "initial learning rate must be positive, got {}",
            self.initial_learning_rate
        );
        ensure!(self.batch_size > 0, "batch size must be positive");
        ensure!(
            self.subsample_threshold >= 0.0,
            "subsample threshold must not be negative, got {}",
            self.subsample_threshold
        );
        ensure!(
            (0.0..=1.0).contains(&self.theta),
            "theta must be between 0 and 1, got {}",
            self.theta
        );

        Ok(Config {
            dimension: self.dimension,
            iteration: self.iteration,
            min_count: self.min_count,
            thread_size: self.thread_size,
            window: self.window,
            initial_learning_rate: self.initial_learning_rate,
            to_lower: self.to_lower,
            verbose: self.verbose,
            model,
            optimizer,
            batch_size: self.batch_size,
            subsample_threshold: self.subsample_threshold,
            theta: self.theta,
            seed: self.seed,
        })
    }
}

/// Validated training configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) dimension: usize,
    pub(crate) iteration: usize,
    pub(crate) min_count: u64,
    pub(crate) thread_size: usize,
    pub(crate) window: usize,
    pub(crate) initial_learning_rate: f32,
    pub(crate) to_lower: bool,
    pub(crate) verbose: bool,
    pub(crate) model: Model,
    pub(crate) optimizer: OptimizerKind,
    pub(crate) batch_size: u64,
    pub(crate) subsample_threshold: f64,
    pub(crate) theta: f32,
    pub(crate) seed: Option<u64>,
}

impl Config {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn optimizer(&self) -> OptimizerKind {
        self.optimizer
    }

    pub fn thread_size(&self) -> usize {
        self.thread_size
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "training parameters:
        model: {},
        optimizer: {},
        dimension: {},
        iteration: {},
        min_count: {},
        thread_size: {},
        window: {},
        initial_learning_rate: {},
        to_lower: {},
        batch_size: {},
        subsample_threshold: {},
        theta: {}",
            self.model,
            self.optimizer,
            self.dimension,
            self.iteration,
            self.min_count,
            self.thread_size,
            self.window,
            self.initial_learning_rate,
            self.to_lower,
            self.batch_size,
            self.subsample_threshold,
            self.theta
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Options::default().validate().unwrap();
        assert_eq!(config.model(), Model::Cbow);
        assert_eq!(
            config.optimizer(),
            OptimizerKind::HierarchicalSoftmax { max_depth: 100 }
        );
        assert!(config.thread_size() >= 1);
        assert!(config.to_string().contains("model: cbow"));
    }

    #[test]
    fn optimizer_names() {
        for name in ["ns", "negative-sampling"] {
            let config = Options {
                optimizer: name.to_string(),
                negative_sample_size: 7,
                ..Options::default()
            }
            .validate()
            .unwrap();
            assert_eq!(
                config.optimizer(),
                OptimizerKind::NegativeSampling {
                    sample_size: 7,
                    table_size: DEFAULT_TABLE_SIZE
                }
            );
        }
        let config = Options {
            optimizer: "hierarchical-softmax".to_string(),
            model: "skip-gram".to_string(),
            ..Options::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.model(), Model::SkipGram);
    }

    #[test]
    fn invalid_names() {
        let err = Options {
            model: "bag".to_string(),
            ..Options::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("invalid model: bag"), "{err:#}");

        let err = Options {
            optimizer: "adam".to_string(),
            ..Options::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("invalid optimizer: adam"), "{err:#}");
    }

    #[test]
    fn out_of_range_numbers() {
        let cases: Vec<(Options, &str)> = vec![
            (Options { dimension: 0, ..Options::default() }, "dimension"),
            (Options { iteration: 0, ..Options::default() }, "iteration"),
            (Options { thread_size: 0, ..Options::default() }, "thread size"),
            (Options { window: 0, ..Options::default() }, "window"),
            (Options { batch_size: 0, ..Options::default() }, "batch size"),
            (
                Options { initial_learning_rate: 0.0, ..Options::default() },
                "learning rate",
            ),
            (
                Options { subsample_threshold: -1.0, ..Options::default() },
                "subsample threshold",
            ),
            (Options { theta: 1.5, ..Options::default() }, "theta"),
            (
                Options {
                    optimizer: "ns".to_string(),
                    negative_sample_size: 0,
                    ..Options::default()
                },
                "negative sample size",
            ),
        ];
        for (options, needle) in cases {
            let err = options.validate().unwrap_err();
            assert!(err.to_string().contains(needle), "{needle}: {err:#}");
        }
    }
}
