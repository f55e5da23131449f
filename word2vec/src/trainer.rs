//! The training scheduler: owns the weight matrices and drives the workers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Config, OptimizerKind};
use crate::embeddings::Embeddings;
use crate::matrix::SharedMatrix;
use crate::model::Scratch;
use crate::optimizer::{HierarchicalSoftmax, NegativeSampling, Optimizer};
use crate::sampling::Subsampler;
use crate::vocab::{Corpus, Vocabulary};
use crate::window::ContextWindows;

/// Linear learning-rate decay with a floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRate {
    initial: f32,
    floor: f32,
    /// Words processed over the whole run, all epochs included.
    total: u64,
}

impl LearningRate {
    pub fn new(initial: f32, theta: f32, total: u64) -> LearningRate {
        LearningRate {
            initial,
            floor: initial * theta,
            total,
        }
    }

    /// `max(initial * (1 - processed / total), initial * theta)`.
    pub fn at(&self, processed: u64) -> f32 {
        let progress = processed as f32 / self.total.max(1) as f32;
        (self.initial * (1.0 - progress)).max(self.floor)
    }
}

/// A word2vec model ready to train.
pub struct Word2vec {
    config: Config,
    corpus: Corpus,
    counts: Vec<u64>,
    subsampler: Subsampler,
    /// Input vectors; these become the embeddings.
    embeddings: SharedMatrix,
    optimizer: Box<dyn Optimizer>,
    schedule: LearningRate,
    /// Words processed so far by all workers.
    processed: AtomicU64,
    seed: u64,
}

impl Word2vec {
    /// Read the whole corpus from `input` and set up the network.
    pub fn new<R: BufRead>(input: R, config: Config) -> Result<Word2vec> {
        let corpus = Corpus::read(input, config.to_lower, config.min_count)?;
        let counts = corpus.vocab.counts();
        let train_words = corpus.vocab.train_words();
        info!("vocabulary size: {}", corpus.vocab.len());
        info!("words in training data: {train_words}");
        info!("{config}");

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let embeddings = SharedMatrix::random(counts.len(), config.dimension, &mut rng)?;
        let optimizer: Box<dyn Optimizer> = match config.optimizer {
            OptimizerKind::HierarchicalSoftmax { max_depth } => Box::new(
                HierarchicalSoftmax::new(&counts, config.dimension, max_depth)?,
            ),
            OptimizerKind::NegativeSampling {
                sample_size,
                table_size,
            } => Box::new(NegativeSampling::new(
                &counts,
                config.dimension,
                sample_size,
                table_size,
            )?),
        };

        let subsampler = Subsampler::new(config.subsample_threshold, train_words);
        let schedule = LearningRate::new(
            config.initial_learning_rate,
            config.theta,
            config.iteration as u64 * train_words,
        );

        Ok(Word2vec {
            config,
            corpus,
            counts,
            subsampler,
            embeddings,
            optimizer,
            schedule,
            processed: AtomicU64::new(0),
            seed,
        })
    }

    /// Like [`Word2vec::new`], reading the corpus from a file.
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Word2vec> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("failed to open input file {path:?}"))?;
        Self::new(BufReader::new(f), config)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.corpus.vocab
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Words processed so far, counted before subsampling.
    pub fn processed_words(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn learning_rate(&self) -> LearningRate {
        self.schedule
    }

    /// Train and return the input vectors.
    pub fn train(self) -> Result<Embeddings> {
        self.run()?;
        Ok(self.into_embeddings())
    }

    /// Run every epoch on every worker, updating the matrices in place.
    pub fn run(&self) -> Result<()> {
        self.run_workers()?;
        Ok(())
    }

    /// Like [`Word2vec::run`], returning for each worker the learning rates
    /// it computed, in order, starting with the rate it began with.
    pub fn run_workers(&self) -> Result<Vec<Vec<f32>>> {
        let parts = self.corpus.partition(self.config.thread_size);
        let progress = self.progress_bar()?;
        info!("starting training with {} threads", parts.len());
        let start = Instant::now();

        let results = thread::scope(|s| {
            let workers = parts
                .into_iter()
                .enumerate()
                .map(|(id, part)| {
                    let progress = progress.clone();
                    s.spawn(move || self.train_worker(id, part, &progress))
                })
                .collect::<Vec<_>>();
            workers
                .into_iter()
                .map(|worker| worker.join())
                .collect::<Vec<_>>()
        });
        progress.finish_and_clear();
        let panicked = results.iter().filter(|r| r.is_err()).count();
        ensure!(panicked == 0, "{panicked} training worker(s) panicked");

        info!(
            "finished training {} words in {:.2?}",
            self.processed_words(),
            start.elapsed()
        );
        Ok(results.into_iter().flatten().collect())
    }

    pub fn into_embeddings(self) -> Embeddings {
        let vocab = self
            .corpus
            .vocab
            .words()
            .iter()
            .map(|w| w.word.clone())
            .collect();
        Embeddings::new(vocab, self.config.dimension, self.embeddings.to_vec())
    }

    fn progress_bar(&self) -> Result<ProgressBar> {
        if !self.config.verbose {
            return Ok(ProgressBar::hidden());
        }
        let style = ProgressStyle::with_template(
            "{elapsed_precise} [{wide_bar}] {pos}/{len} words, learning rate {msg}",
        )
        .context("invalid progress bar template")?;
        Ok(ProgressBar::new(self.schedule.total).with_style(style))
    }

    fn train_worker(&self, id: usize, part: &[Vec<usize>], progress: &ProgressBar) -> Vec<f32> {
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(id as u64 + 1));
        let mut scratch = Scratch::new(config.dimension);
        let mut windows = ContextWindows::empty(config.window);
        let mut learning_rate = self.schedule.at(self.processed_words());
        let mut rates = vec![learning_rate];
        debug!("worker {id}: {} sentences", part.len());

        for epoch in 0..config.iteration {
            let mut word_count: u64 = 0;
            let mut last_word_count: u64 = 0;
            for line in part {
                word_count += line.len() as u64;
                windows.refill(line, &self.counts, &self.subsampler, &mut rng);
                for example in windows.examples() {
                    config.model.train(
                        &example,
                        &self.embeddings,
                        &*self.optimizer,
                        learning_rate,
                        &mut scratch,
                        &mut rng,
                    );
                }

                if word_count - last_word_count >= config.batch_size {
                    learning_rate = self.report_progress(word_count - last_word_count, progress);
                    rates.push(learning_rate);
                    last_word_count = word_count;
                }
            }
            learning_rate = self.report_progress(word_count - last_word_count, progress);
            rates.push(learning_rate);
            debug!(
                "worker {id}: finished epoch {}, learning rate {learning_rate}",
                epoch + 1
            );
        }
        rates
    }

    /// Add `n` newly processed words to the shared counter and return the
    /// learning rate for the new total.
    fn report_progress(&self, n: u64, progress: &ProgressBar) -> f32 {
        let processed = self.processed.fetch_add(n, Ordering::Relaxed) + n;
        let learning_rate = self.schedule.at(processed);
        progress.inc(n);
        progress.set_message(format!("{learning_rate:.6}"));
        learning_rate
    }
}
