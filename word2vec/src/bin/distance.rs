use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use word2vec::{normalize, Embeddings};

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
#[command(about = "Show the words closest to a query", long_about = None)]
struct Args {
    /// Contains word projections in the BINARY FORMAT.
    #[arg(value_name = "FILE")]
    file_name: PathBuf,
}

fn run(args: Args) -> Result<()> {
    let vectors = Embeddings::load(&args.file_name)?;

    'outer: loop {
        print!("Enter word or sentence (EXIT to break): ");
        io::stdout().flush().context("error writing to stdout")?;

        let mut line = String::new();
        if io::stdin()
            .read_line(&mut line)
            .context("error reading stdin")?
            == 0
        {
            break;
        }
        let line = line.trim();
        if line == "EXIT" {
            break;
        }

        let mut query: Vec<usize> = vec![];
        for word in line.split_whitespace() {
            println!();
            match vectors.lookup_word(word) {
                None => {
                    println!("Word: {word}  Out of dictionary word!");
                    continue 'outer;
                }
                Some(i) => {
                    println!("Word: {word}  Position in vocabulary: {i}");
                    query.push(i);
                }
            }
        }
        if query.is_empty() {
            continue;
        }

        // The query is the sum of the unit-length word vectors.
        let mut sum = vec![0.0f32; vectors.size()];
        for &i in &query {
            let mut row = vectors[i].to_vec();
            normalize(&mut row);
            for (s, r) in sum.iter_mut().zip(row) {
                *s += r;
            }
        }

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");
        for (word, dist) in vectors.nearest(&sum, &query, N) {
            println!("{:50}\t\t{}", word, dist);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
