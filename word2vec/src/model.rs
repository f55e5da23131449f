//! Model architectures: how context vectors become the hidden vector and where
//! the gradient goes afterwards.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error};
use rand::rngs::StdRng;

use crate::matrix::SharedMatrix;
use crate::optimizer::Optimizer;
use crate::window::Example;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Continuous bag of words: predict the target from its averaged context.
    Cbow,
    /// Predict each context word from the target.
    SkipGram,
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Model, Error> {
        match s {
            "cbow" => Ok(Model::Cbow),
            "skip-gram" | "skipgram" => Ok(Model::SkipGram),
            _ => bail!("invalid model: {s} not in cbow|skip-gram"),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Cbow => write!(f, "cbow"),
            Model::SkipGram => write!(f, "skip-gram"),
        }
    }
}

/// Per-worker buffers for the hidden vector and its gradient.
pub struct Scratch {
    hidden: Vec<f32>,
    grad: Vec<f32>,
}

impl Scratch {
    pub fn new(dim: usize) -> Scratch {
        Scratch {
            hidden: vec![0.0; dim],
            grad: vec![0.0; dim],
        }
    }
}

impl Model {
    /// Train on one example, updating `embeddings` and the optimizer's output
    /// vectors in place.
    pub fn train(
        self,
        example: &Example<'_>,
        embeddings: &SharedMatrix,
        optimizer: &dyn Optimizer,
        learning_rate: f32,
        scratch: &mut Scratch,
        rng: &mut StdRng,
    ) {
        let Scratch { hidden, grad } = scratch;
        match self {
            Model::Cbow => {
                let n = example.context_len();
                if n == 0 {
                    return;
                }
                // in -> hidden
                hidden.fill(0.0);
                for c in example.context() {
                    embeddings.add_row_to(c, 1.0, hidden);
                }
                for h in hidden.iter_mut() {
                    *h /= n as f32;
                }

                grad.fill(0.0);
                optimizer.update(hidden, example.target, learning_rate, grad, rng);

                // hidden -> in. Every context word gets the whole gradient,
                // not a 1/n share of it.
                for c in example.context() {
                    embeddings.add_to_row(c, 1.0, grad);
                }
            }
            Model::SkipGram => {
                for (target, context) in example.pairs() {
                    embeddings.read_row(target, hidden);
                    grad.fill(0.0);
                    optimizer.update(hidden, context, learning_rate, grad, rng);
                    embeddings.add_to_row(target, 1.0, grad);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::NegativeSampling;
    use rand::SeedableRng;

    #[test]
    fn parse_names() {
        assert_eq!("cbow".parse::<Model>().unwrap(), Model::Cbow);
        assert_eq!("skip-gram".parse::<Model>().unwrap(), Model::SkipGram);
        let err = "glove".parse::<Model>().unwrap_err();
        assert_eq!(err.to_string(), "invalid model: glove not in cbow|skip-gram");
        assert_eq!(Model::SkipGram.to_string(), "skip-gram");
    }

    /// Records every call instead of learning anything.
    struct Recorder {
        calls: std::sync::Mutex<Vec<(Vec<f32>, usize)>>,
        weights: SharedMatrix,
    }

    impl Recorder {
        fn new() -> Recorder {
            Recorder {
                calls: Default::default(),
                weights: SharedMatrix::zeros(0, 2).unwrap(),
            }
        }
    }

    impl Optimizer for Recorder {
        fn update(&self, hidden: &[f32], word: usize, _lr: f32, grad: &mut [f32], _rng: &mut StdRng) {
            self.calls.lock().unwrap().push((hidden.to_vec(), word));
            grad.fill(1.0);
        }

        fn weights(&self) -> &SharedMatrix {
            &self.weights
        }
    }

    fn embeddings() -> SharedMatrix {
        let m = SharedMatrix::zeros(3, 2).unwrap();
        m.add_to_row(0, 1.0, &[1.0, 0.0]);
        m.add_to_row(1, 1.0, &[0.0, 1.0]);
        m.add_to_row(2, 1.0, &[3.0, 3.0]);
        m
    }

    #[test]
    fn cbow_averages_context_and_spreads_gradient() {
        let m = embeddings();
        let opt = Recorder::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut scratch = Scratch::new(2);
        let example = Example {
            target: 2,
            before: &[0],
            after: &[1],
        };
        Model::Cbow.train(&example, &m, &opt, 0.1, &mut scratch, &mut rng);

        assert_eq!(*opt.calls.lock().unwrap(), vec![(vec![0.5, 0.5], 2)]);
        // Both context rows got the full gradient; the target row is untouched.
        assert_eq!(m.to_vec(), vec![2.0, 1.0, 1.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn cbow_skips_empty_context() {
        let m = embeddings();
        let opt = Recorder::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut scratch = Scratch::new(2);
        let example = Example {
            target: 0,
            before: &[],
            after: &[],
        };
        Model::Cbow.train(&example, &m, &opt, 0.1, &mut scratch, &mut rng);
        assert!(opt.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn skip_gram_predicts_each_context_word_from_target() {
        let m = embeddings();
        let opt = Recorder::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut scratch = Scratch::new(2);
        let example = Example {
            target: 2,
            before: &[0],
            after: &[1],
        };
        Model::SkipGram.train(&example, &m, &opt, 0.1, &mut scratch, &mut rng);

        // The target row is re-read after each update.
        assert_eq!(
            *opt.calls.lock().unwrap(),
            vec![(vec![3.0, 3.0], 0), (vec![4.0, 4.0], 1)]
        );
        // Only the target row changed.
        assert_eq!(m.to_vec(), vec![1.0, 0.0, 0.0, 1.0, 5.0, 5.0]);
    }

    #[test]
    fn works_with_a_real_optimizer() {
        let m = embeddings();
        let ns = NegativeSampling::new(&[1, 1, 1], 2, 2, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut scratch = Scratch::new(2);
        let example = Example {
            target: 0,
            before: &[],
            after: &[1, 2],
        };
        for model in [Model::Cbow, Model::SkipGram] {
            model.train(&example, &m, &ns, 0.05, &mut scratch, &mut rng);
        }
        assert!(ns.weights().to_vec().iter().any(|&x| x != 0.0));
        assert_ne!(m.to_vec(), embeddings().to_vec());
    }
}
