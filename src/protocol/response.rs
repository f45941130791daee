//! Reply encoding for inference results.

use serde::Serialize;

use crate::engine::Ranked;
use crate::error::{Error, Result};

/// Wire shape of the single prediction. Field order is `label`, `prob`.
#[derive(Debug, Serialize)]
struct Prediction<'a> {
    label: &'a str,
    prob: f64,
}

/// Encode the top-ranked entry as `[{"label":..,"prob":..}]`, or `[]` when
/// there is nothing ranked. Entries after the first are ignored.
///
/// A top probability that is NaN or infinite is an engine failure: JSON has
/// no representation for it.
pub fn encode(ranked: &[Ranked]) -> Result<Vec<u8>> {
    let Some(top) = ranked.first() else {
        return Ok(b"[]".to_vec());
    };

    let prob = top.prob();
    if !prob.is_finite() {
        return Err(Error::NonFiniteProbability(prob));
    }

    let prediction = [Prediction {
        label: &top.label,
        prob,
    }];
    Ok(serde_json::to_vec(&prediction)?)
}
