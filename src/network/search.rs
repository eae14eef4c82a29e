//! Exhaustive search over phase orderings.

use crate::info;
use crate::network::amplifier::{AmplifierNetwork, NetworkError};

/// Phase values for a chain that halts after one pass.
pub const SEQUENTIAL_PHASES: [i64; 5] = [0, 1, 2, 3, 4];

/// Phase values for a ring that loops until the program decides to halt.
pub const FEEDBACK_PHASES: [i64; 5] = [5, 6, 7, 8, 9];

/// Best ordering found by [`max_signal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Best {
    pub signal: i64,
    pub phases: Vec<i64>,
}

/// Returns every ordering of `values`, using Heap's algorithm.
///
/// The first entry is `values` itself. Duplicated input values produce
/// duplicated orderings.
pub fn permutations(values: &[i64]) -> Vec<Vec<i64>> {
    let mut current = values.to_vec();
    let mut result = vec![current.clone()];
    let mut counters = vec![0usize; current.len()];

    let mut i = 1;
    while i < current.len() {
        if counters[i] < i {
            if i % 2 == 0 {
                current.swap(0, i);
            } else {
                current.swap(counters[i], i);
            }
            result.push(current.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
    result
}

/// Runs `network` once per ordering of `values` and keeps the largest signal.
///
/// Ties keep the ordering that was tried first. Any failing run aborts the
/// search with that run's error.
pub async fn max_signal(network: &AmplifierNetwork, values: &[i64]) -> Result<Best, NetworkError> {
    let orderings = permutations(values);
    info!("searching {} phase orderings of {values:?}", orderings.len());

    let mut best: Option<Best> = None;
    for phases in orderings {
        let signal = network.run(&phases).await?;
        if best.as_ref().is_none_or(|b| signal > b.signal) {
            best = Some(Best { signal, phases });
        }
    }

    let best = best.ok_or_else(|| NetworkError::InvalidPhases("no amplifiers".to_string()))?;
    info!("best signal {} from phases {:?}", best.signal, best.phases);
    Ok(best)
}
