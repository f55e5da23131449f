//! Context windows over one sentence.

use std::ops::Range;

use rand::Rng;

use crate::sampling::Subsampler;

/// One training example: a target word and the words around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example<'a> {
    pub target: usize,
    /// Context words to the left of the target, in sentence order.
    pub before: &'a [usize],
    /// Context words to the right of the target, in sentence order.
    pub after: &'a [usize],
}

impl<'a> Example<'a> {
    pub fn context(&self) -> impl Iterator<Item = usize> + 'a {
        self.before.iter().chain(self.after).copied()
    }

    pub fn context_len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    /// The example split into one `(target, context word)` pair per context word.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + 'a {
        let target = self.target;
        self.context().map(move |c| (target, c))
    }
}

/// `i`'s neighbourhood of radius `window`, clipped to `0..len`.
pub fn window_around(i: usize, window: usize, len: usize) -> Range<usize> {
    let start = i.saturating_sub(window);
    let stop = (i + window + 1).min(len);
    start..stop
}

/// A subsampled sentence, ready to produce training examples.
///
/// Subsampling is decided once, when the sentence is built: each occurrence is
/// kept or dropped independently, so the same word may survive in one place
/// and not another. Windows are then taken over the surviving words and never
/// reach past the ends of the sentence.
#[derive(Debug, Clone)]
pub struct ContextWindows {
    sentence: Vec<usize>,
    window: usize,
}

impl ContextWindows {
    /// An empty buffer; fill it with [`ContextWindows::refill`].
    pub fn empty(window: usize) -> ContextWindows {
        ContextWindows {
            sentence: Vec::new(),
            window,
        }
    }

    /// `counts[w]` is the corpus frequency of word `w`.
    pub fn new<R: Rng>(
        line: &[usize],
        counts: &[u64],
        window: usize,
        subsampler: &Subsampler,
        rng: &mut R,
    ) -> ContextWindows {
        let mut windows = ContextWindows::empty(window);
        windows.refill(line, counts, subsampler, rng);
        windows
    }

    /// Reuse this buffer for another sentence.
    pub fn refill<R: Rng>(
        &mut self,
        line: &[usize],
        counts: &[u64],
        subsampler: &Subsampler,
        rng: &mut R,
    ) {
        self.sentence.clear();
        self.sentence.extend(
            line.iter()
                .copied()
                .filter(|&w| subsampler.keep(counts[w], rng)),
        );
    }

    /// The words that survived subsampling.
    pub fn sentence(&self) -> &[usize] {
        &self.sentence
    }

    /// Iterate over the examples. Each call starts again from the beginning.
    pub fn examples(&self) -> Examples<'_> {
        Examples {
            sentence: &self.sentence,
            window: self.window,
            position: 0,
        }
    }
}

/// Iterator returned by [`ContextWindows::examples`].
#[derive(Debug, Clone)]
pub struct Examples<'a> {
    sentence: &'a [usize],
    window: usize,
    position: usize,
}

impl<'a> Iterator for Examples<'a> {
    type Item = Example<'a>;

    fn next(&mut self) -> Option<Example<'a>> {
        let sentence = self.sentence;
        let i = self.position;
        let target = *sentence.get(i)?;
        self.position += 1;
        let range = window_around(i, self.window, sentence.len());
        Some(Example {
            target,
            before: &sentence[range.start..i],
            after: &sentence[i + 1..range.end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.sentence.len() - self.position;
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn no_subsampling() -> Subsampler {
        Subsampler::new(0.0, 1)
    }

    #[test]
    fn windows_are_clipped_at_sentence_ends() {
        let line = [10, 11, 12, 13, 14];
        let counts = vec![1; 15];
        let mut rng = StdRng::seed_from_u64(0);
        let windows = ContextWindows::new(&line, &counts, 2, &no_subsampling(), &mut rng);

        let examples = windows.examples().collect::<Vec<_>>();
        assert_eq!(examples.len(), 5);
        assert_eq!(examples[0].target, 10);
        assert_eq!(examples[0].context().collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(examples[2].context().collect::<Vec<_>>(), vec![10, 11, 13, 14]);
        assert_eq!(examples[4].before, &[12, 13]);
        assert!(examples[4].after.is_empty());
        assert_eq!(examples[4].context_len(), 2);
    }

    #[test]
    fn pairs_for_skip_gram() {
        let line = [1, 2, 3];
        let counts = vec![1; 4];
        let mut rng = StdRng::seed_from_u64(0);
        let windows = ContextWindows::new(&line, &counts, 1, &no_subsampling(), &mut rng);
        let pairs = windows
            .examples()
            .flat_map(|e| e.pairs().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![(1, 2), (2, 1), (2, 3), (3, 2)]);
    }

    #[test]
    fn restartable() {
        let line = [0, 1, 0, 2];
        let counts = vec![2, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let windows = ContextWindows::new(&line, &counts, 5, &no_subsampling(), &mut rng);
        let first = windows.examples().collect::<Vec<_>>();
        let second = windows.examples().collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(windows.examples().size_hint(), (4, Some(4)));
    }

    #[test]
    fn single_word_sentence_has_empty_context() {
        let counts = vec![1];
        let mut rng = StdRng::seed_from_u64(0);
        let windows = ContextWindows::new(&[0], &counts, 3, &no_subsampling(), &mut rng);
        let examples = windows.examples().collect::<Vec<_>>();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].context_len(), 0);
    }

    #[test]
    fn subsampling_drops_frequent_words_per_occurrence() {
        // Word 0 makes up most of the corpus; word 1 is rare.
        let counts = vec![9_990, 10];
        let subsampler = Subsampler::new(1e-3, 10_000);
        let line = [0, 1, 0, 1, 0, 1, 0, 1, 0, 1];
        let mut rng = StdRng::seed_from_u64(5);

        let mut windows = ContextWindows::empty(2);
        let mut kept_frequent = 0;
        let mut runs_with_some_frequent = 0;
        for _ in 0..200 {
            windows.refill(&line, &counts, &subsampler, &mut rng);
            let sentence = windows.sentence();
            assert_eq!(sentence.iter().filter(|&&w| w == 1).count(), 5);
            let n = sentence.iter().filter(|&&w| w == 0).count();
            kept_frequent += n;
            if n > 0 {
                runs_with_some_frequent += 1;
            }
        }
        // p(discard) for word 0 is about 0.967, so roughly 33 of 1000 survive.
        assert!(kept_frequent > 5 && kept_frequent < 100, "{kept_frequent}");
        assert!(runs_with_some_frequent > 0);
    }

    #[test]
    fn window_around_bounds() {
        assert_eq!(window_around(0, 3, 10), 0..4);
        assert_eq!(window_around(5, 3, 10), 2..9);
        assert_eq!(window_around(9, 3, 10), 6..10);
        assert_eq!(window_around(0, 3, 1), 0..1);
    }
}
