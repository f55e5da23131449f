//! Vocabulary and corpus extraction.

use std::collections::HashMap;
use std::io::BufRead;

use anyhow::{bail, Context, Result};

/// Longest run of words trained as one sentence. Longer lines are split.
pub const MAX_SENTENCE_LENGTH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub id: usize,
    pub word: String,
    pub count: u64,
}

/// Words that survived the minimum-count filter, with dense ids.
///
/// Ids are assigned in order of each word's first appearance in the input, so
/// a given input always produces the same ids.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<Word>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Count whitespace-separated tokens from `lines`, keeping words that occur
    /// at least `min_count` times.
    pub fn count<I, S>(lines: I, to_lower: bool, min_count: u64) -> Vocabulary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = Vocabulary::default();
        for line in lines {
            for token in line.as_ref().split_whitespace() {
                seen.add_occurrence(&normalize(token, to_lower));
            }
        }
        seen.retain_min_count(min_count)
    }

    fn add_occurrence(&mut self, word: &str) {
        if let Some(&id) = self.index.get(word) {
            self.words[id].count += 1;
        } else {
            let id = self.words.len();
            self.words.push(Word {
                id,
                word: word.to_string(),
                count: 1,
            });
            self.index.insert(word.to_string(), id);
        }
    }

    /// Drop rare words and renumber the survivors, preserving order.
    fn retain_min_count(self, min_count: u64) -> Vocabulary {
        let mut kept = Vocabulary::default();
        for w in self.words.into_iter().filter(|w| w.count >= min_count) {
            let id = kept.words.len();
            kept.index.insert(w.word.clone(), id);
            kept.words.push(Word { id, ..w });
        }
        kept
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the id of a word; `None` if it is not in the vocabulary.
    pub fn search(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Panics if `id` is out of range.
    pub fn word(&self, id: usize) -> &str {
        &self.words[id].word
    }

    /// Panics if `id` is out of range.
    pub fn count_of(&self, id: usize) -> u64 {
        self.words[id].count
    }

    pub fn counts(&self) -> Vec<u64> {
        self.words.iter().map(|w| w.count).collect()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Sum of the counts of all vocabulary words.
    pub fn train_words(&self) -> u64 {
        self.words.iter().map(|w| w.count).sum()
    }
}

fn normalize(token: &str, to_lower: bool) -> String {
    if to_lower {
        token.to_lowercase()
    } else {
        token.to_string()
    }
}

/// The training corpus: a vocabulary plus every input line as word ids.
///
/// Out-of-vocabulary tokens are dropped from the id lines. Lines longer than
/// [`MAX_SENTENCE_LENGTH`] are split into several sentences, and empty lines
/// are skipped.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub vocab: Vocabulary,
    pub sentences: Vec<Vec<usize>>,
}

impl Corpus {
    /// Read the whole input, build the vocabulary, and map lines to ids.
    ///
    /// Bytes that are not valid UTF-8 become U+FFFD instead of failing the read.
    pub fn read<R: BufRead>(input: R, to_lower: bool, min_count: u64) -> Result<Corpus> {
        let lines = input
            .split(b'\n')
            .map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
            .collect::<Result<Vec<String>, _>>()
            .context("error reading training data")?;

        let vocab = Vocabulary::count(&lines, to_lower, min_count);
        if vocab.is_empty() {
            bail!("vocabulary is empty: no word occurs at least {min_count} times");
        }

        let mut sentences = vec![];
        for line in &lines {
            let ids = line
                .split_whitespace()
                .filter_map(|token| vocab.search(&normalize(token, to_lower)))
                .collect::<Vec<usize>>();
            sentences.extend(
                ids.chunks(MAX_SENTENCE_LENGTH)
                    .map(|sentence| sentence.to_vec()),
            );
        }

        Ok(Corpus { vocab, sentences })
    }

    /// Split the sentences into `n` contiguous parts of nearly equal length.
    ///
    /// Some parts are empty when there are fewer sentences than parts.
    pub fn partition(&self, n: usize) -> Vec<&[Vec<usize>]> {
        let len = self.sentences.len();
        (0..n)
            .map(|i| &self.sentences[len * i / n..len * (i + 1) / n])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_in_first_seen_order() {
        let corpus = Corpus::read("a b b c c c c".as_bytes(), false, 0).unwrap();
        let vocab = &corpus.vocab;
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.counts(), vec![1, 2, 4]);
        assert_eq!(vocab.search("a"), Some(0));
        assert_eq!(vocab.search("c"), Some(2));
        assert_eq!(vocab.word(1), "b");
        assert_eq!(vocab.train_words(), 7);
        assert_eq!(corpus.sentences, vec![vec![0, 1, 1, 2, 2, 2, 2]]);
    }

    #[test]
    fn min_count_filters_and_renumbers() {
        let text = "x rare y\nx y z\nx";
        let corpus = Corpus::read(text.as_bytes(), false, 2).unwrap();
        let vocab = &corpus.vocab;
        let ids = vocab.words().iter().map(|w| w.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(vocab.word(0), "x");
        assert_eq!(vocab.word(1), "y");
        assert_eq!(vocab.search("rare"), None);
        assert_eq!(corpus.sentences, vec![vec![0, 1], vec![0, 1], vec![0]]);
    }

    #[test]
    fn lowercasing() {
        let corpus = Corpus::read("The the THE cat".as_bytes(), true, 0).unwrap();
        assert_eq!(corpus.vocab.len(), 2);
        assert_eq!(corpus.vocab.count_of(0), 3);

        let corpus = Corpus::read("The the THE cat".as_bytes(), false, 0).unwrap();
        assert_eq!(corpus.vocab.len(), 4);
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let err = Corpus::read("a b c".as_bytes(), false, 2).unwrap_err();
        assert!(err.to_string().contains("vocabulary is empty"), "{err:#}");

        assert!(Corpus::read("".as_bytes(), false, 0).is_err());
    }

    #[test]
    fn invalid_utf8_is_tokenized_anyway() {
        let mut text = b"a b c\n".repeat(10);
        text.extend_from_slice(b"caf\xe9 a b\r\n");
        let corpus = Corpus::read(&text[..], false, 0).unwrap();
        assert_eq!(corpus.vocab.len(), 4);
        assert_eq!(corpus.vocab.count_of(0), 11);
        assert_eq!(corpus.vocab.word(3), "caf\u{fffd}");
        assert_eq!(corpus.sentences.len(), 11);
        assert_eq!(corpus.sentences[10], vec![3, 0, 1]);
    }

    #[test]
    fn long_lines_are_split() {
        let line = vec!["w"; MAX_SENTENCE_LENGTH + 5].join(" ");
        let corpus = Corpus::read(line.as_bytes(), false, 0).unwrap();
        let lens = corpus.sentences.iter().map(Vec::len).collect::<Vec<_>>();
        assert_eq!(lens, vec![MAX_SENTENCE_LENGTH, 5]);
    }

    #[test]
    fn partitions_cover_every_sentence() {
        let text = (0..10).map(|i| format!("w{i}\n")).collect::<String>();
        let corpus = Corpus::read(text.as_bytes(), false, 0).unwrap();
        let parts = corpus.partition(3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(|p| p.len()).sum::<usize>(), 10);
        let flat = parts.concat();
        assert_eq!(flat, corpus.sentences);

        let parts = corpus.partition(20);
        assert_eq!(parts.iter().filter(|p| !p.is_empty()).count(), 10);
    }
}
