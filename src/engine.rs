//! Inference engine seam.
//!
//! The service treats the classifier as a black box: text goes in, an ordered
//! list of `(label, log-probability)` pairs comes out. Anything implementing
//! [`Ranker`] can sit behind the protocol layer.

pub mod linear;

pub use linear::LinearClassifier;

use crate::error::Result;

/// One ranked label with its natural-log probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub label: String,
    pub log_prob: f64,
}

impl Ranked {
    pub fn new(label: impl Into<String>, log_prob: f64) -> Self {
        Self {
            label: label.into(),
            log_prob,
        }
    }

    /// Linear-space probability.
    pub fn prob(&self) -> f64 {
        self.log_prob.exp()
    }
}

/// A text classifier producing labels ordered best-first.
///
/// Implementations must be deterministic for a given loaded model. The input
/// is expected to be newline-terminated; the newline marks the end of the
/// document.
pub trait Ranker {
    /// Rank every label for `text`, highest log-probability first.
    ///
    /// An empty result is valid and means the engine had nothing to rank.
    fn rank(&self, text: &str) -> Result<Vec<Ranked>>;
}
