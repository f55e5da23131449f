use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use word2vec::{Embeddings, Options, Word2vec};

#[derive(Parser)]
#[command(about = "Train word vectors", long_about = None)]
struct Args {
    /// Use text data from FILE to train the model
    #[arg(long = "train", value_name = "FILE")]
    train_file: PathBuf,

    /// Use FILE to save the resulting word vectors
    #[arg(long = "output", value_name = "FILE")]
    output_file: PathBuf,

    /// Set size of word vectors
    #[arg(long = "size", default_value_t = 10)]
    dimension: usize,

    /// Set max skip length between words
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// Run more training iterations
    #[arg(long, default_value_t = 15)]
    iter: usize,

    /// Discard words that appear less than N times
    #[arg(long = "min-count", value_name = "N", default_value_t = 5)]
    min_count: u64,

    /// Use N threads; default is one per CPU
    #[arg(long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Set the starting learning rate
    #[arg(long, default_value_t = 0.025)]
    alpha: f32,

    /// Lowercase every word before counting
    #[arg(long)]
    lower: bool,

    /// cbow or skip-gram
    #[arg(long, default_value = "cbow")]
    model: String,

    /// hs (hierarchical softmax) or ns (negative sampling)
    #[arg(long, default_value = "hs")]
    optimizer: String,

    /// Update the learning rate every N words
    #[arg(long = "batch-size", value_name = "N", default_value_t = 10_000)]
    batch_size: u64,

    /// Train at most N steps of each Huffman path (0 = whole path)
    #[arg(long = "max-depth", value_name = "N", default_value_t = 100)]
    max_depth: usize,

    /// Number of negative examples; common values are 3 - 10
    #[arg(long, default_value_t = 5)]
    negative: usize,

    /// Set threshold for occurrence of words. Those that appear with higher
    /// frequency in the training data will be randomly down-sampled; useful
    /// range is (0, 1e-5); 0 turns it off
    #[arg(long, default_value_t = 1e-3)]
    sample: f64,

    /// Lower limit of the learning rate, as a fraction of --alpha
    #[arg(long, default_value_t = 1e-4)]
    theta: f32,

    /// Seed for the random number generators
    #[arg(long)]
    seed: Option<u64>,

    /// Show a progress bar
    #[arg(long)]
    verbose: bool,

    /// Save the resulting vectors in binary mode
    #[arg(long, group = "format")]
    binary: bool,

    /// Save the vectors in bincode format
    #[arg(long, group = "format")]
    bincode: bool,
}

impl Args {
    fn options(&self) -> Options {
        let defaults = Options::default();
        Options {
            dimension: self.dimension,
            iteration: self.iter,
            min_count: self.min_count,
            thread_size: self.threads.unwrap_or(defaults.thread_size),
            window: self.window,
            initial_learning_rate: self.alpha,
            to_lower: self.lower,
            verbose: self.verbose,
            model: self.model.clone(),
            optimizer: self.optimizer.clone(),
            batch_size: self.batch_size,
            max_depth: self.max_depth,
            negative_sample_size: self.negative,
            subsample_threshold: self.sample,
            theta: self.theta,
            seed: self.seed,
        }
    }
}

fn save(embeddings: &Embeddings, args: &Args) -> Result<()> {
    let file = File::create(&args.output_file)
        .with_context(|| format!("failed to create output file {:?}", args.output_file))?;
    let fo = BufWriter::new(file);
    if args.binary {
        embeddings.write_binary(fo)
    } else if args.bincode {
        embeddings.write_bincode(fo)
    } else {
        embeddings.write_text(fo)
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.options().validate()?;
    info!("training on {}", args.train_file.display());
    let embeddings = Word2vec::open(&args.train_file, config)?.train()?;
    save(&embeddings, &args)?;
    info!(
        "wrote {} vectors to {}",
        embeddings.num_words(),
        args.output_file.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
