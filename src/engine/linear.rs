//! Hashed bag-of-words linear classifier.
//!
//! Supervised model in the fastText mould: every token (and every word n-gram
//! up to `word_ngrams`) is hashed into one of `buckets` input rows, the rows
//! are averaged into a hidden vector, and a softmax over `output · hidden`
//! scores the labels.
//!
//! Only the first line of the input is classified. The newline itself is a
//! token (`</s>`), so callers must newline-terminate requests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Ranked, Ranker};
use crate::error::{ModelError, Result};

/// End-of-sentence token emitted for each newline.
pub const EOS: &str = "</s>";

/// Multiplier used to chain token hashes into n-gram hashes.
const NGRAM_MULTIPLIER: u64 = 116_049_371;

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Longest word n-gram a model may ask for.
pub const MAX_WORD_NGRAMS: usize = 10;

fn default_word_ngrams() -> usize {
    1
}

/// On-disk model layout, shared by the JSON and bincode encodings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub labels: Vec<String>,
    pub dim: usize,
    pub buckets: usize,
    #[serde(default = "default_word_ngrams")]
    pub word_ngrams: usize,
    /// `buckets` rows of `dim` weights.
    pub input: Vec<Vec<f32>>,
    /// One row of `dim` weights per label.
    pub output: Vec<Vec<f32>>,
}

/// A loaded, validated linear classifier.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    labels: Vec<String>,
    dim: usize,
    buckets: usize,
    word_ngrams: usize,
    input: Vec<f32>,
    output: Vec<f32>,
}

impl LinearClassifier {
    /// Load a model file. `.json` files are parsed as JSON, anything else is
    /// decoded as bincode.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ModelError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let model: ModelFile = match extension {
            "json" => serde_json::from_slice(&bytes).map_err(ModelError::from)?,
            _ => bincode::deserialize(&bytes).map_err(ModelError::from)?,
        };

        let classifier = Self::from_model(model)?;
        info!(
            "Loaded model {} ({} labels, dim {}, {} buckets, word n-grams {})",
            path.display(),
            classifier.labels.len(),
            classifier.dim,
            classifier.buckets,
            classifier.word_ngrams
        );
        Ok(classifier)
    }

    /// Validate a decoded model and flatten its matrices.
    pub fn from_model(model: ModelFile) -> std::result::Result<Self, ModelError> {
        if model.labels.is_empty() {
            return Err(ModelError::NoLabels);
        }
        if model.dim == 0 {
            return Err(ModelError::ZeroDimension("dim"));
        }
        if model.buckets == 0 {
            return Err(ModelError::ZeroDimension("buckets"));
        }
        if model.word_ngrams > MAX_WORD_NGRAMS {
            return Err(ModelError::NgramOrder {
                max: MAX_WORD_NGRAMS,
                actual: model.word_ngrams,
            });
        }

        let input = flatten("input", model.input, model.buckets, model.dim)?;
        let output = flatten("output", model.output, model.labels.len(), model.dim)?;

        Ok(Self {
            labels: model.labels,
            dim: model.dim,
            buckets: model.buckets,
            word_ngrams: model.word_ngrams.max(1),
            input,
            output,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Bucket ids for the first line of `text`.
    fn feature_ids(&self, text: &str) -> Vec<usize> {
        let hashes: Vec<u32> = first_line_tokens(text).into_iter().map(fnv1a).collect();
        let buckets = self.buckets as u64;

        let mut ids = Vec::with_capacity(hashes.len() * self.word_ngrams);
        for i in 0..hashes.len() {
            let mut h = u64::from(hashes[i]);
            ids.push((h % buckets) as usize);
            for next in hashes.iter().take(i + self.word_ngrams).skip(i + 1) {
                h = h.wrapping_mul(NGRAM_MULTIPLIER).wrapping_add(u64::from(*next));
                ids.push((h % buckets) as usize);
            }
        }
        ids
    }
}

impl Ranker for LinearClassifier {
    fn rank(&self, text: &str) -> Result<Vec<Ranked>> {
        let ids = self.feature_ids(text);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut hidden = vec![0f64; self.dim];
        for id in &ids {
            let row = &self.input[id * self.dim..(id + 1) * self.dim];
            for (h, w) in hidden.iter_mut().zip(row) {
                *h += f64::from(*w);
            }
        }
        let n = ids.len() as f64;
        hidden.iter_mut().for_each(|h| *h /= n);

        let scores: Vec<f64> = self
            .output
            .chunks_exact(self.dim)
            .map(|row| row.iter().zip(&hidden).map(|(w, h)| f64::from(*w) * h).sum())
            .collect();

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = max + scores.iter().map(|s| (s - max).exp()).sum::<f64>().ln();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        debug!("ranked {} labels from {} features", order.len(), ids.len());

        Ok(order
            .into_iter()
            .map(|i| Ranked::new(self.labels[i].clone(), scores[i] - log_sum))
            .collect())
    }
}

fn flatten(
    matrix: &'static str,
    rows: Vec<Vec<f32>>,
    expected_rows: usize,
    expected_cols: usize,
) -> std::result::Result<Vec<f32>, ModelError> {
    if rows.len() != expected_rows {
        return Err(ModelError::RowCount {
            matrix,
            expected: expected_rows,
            actual: rows.len(),
        });
    }
    let mut flat = Vec::with_capacity(expected_rows * expected_cols);
    for (row, values) in rows.into_iter().enumerate() {
        if values.len() != expected_cols {
            return Err(ModelError::ShapeMismatch {
                matrix,
                expected_rows,
                expected_cols,
                row,
                actual: values.len(),
            });
        }
        if let Some(col) = values.iter().position(|w| !w.is_finite()) {
            return Err(ModelError::NonFinite { matrix, row, col });
        }
        flat.extend(values);
    }
    Ok(flat)
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\r' | '\t' | '\u{0b}' | '\u{0c}' | '\0')
}

/// Whitespace tokens of the first line, terminated by [`EOS`] when the line
/// ends in a newline.
fn first_line_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if is_separator(c) {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
            if c == '\n' {
                tokens.push(EOS);
                return tokens;
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

/// 32-bit FNV-1a. Bytes are sign-extended before mixing.
fn fnv1a(token: &str) -> u32 {
    token.bytes().fold(FNV_OFFSET, |h, b| {
        (h ^ (b as i8 as i32 as u32)).wrapping_mul(FNV_PRIME)
    })
}
