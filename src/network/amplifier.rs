//! Feedback ring of interpreters.
//!
//! Amplifier `i` reads from link `i` and writes to link `i + 1`, with the last
//! amplifier writing back into link `0`. Each link is preloaded with its
//! amplifier's phase, then link `0` receives the driving signal, and every
//! amplifier starts concurrently on its own blocking worker. The network's
//! result is the last value the last amplifier emitted, taken once every
//! amplifier has stopped.

use crate::network::link::{DEFAULT_LINK_CAPACITY, LinkError, LinkInput, LinkOutput, link};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{Limits, VM};
use crate::{debug, warn};
use std::collections::HashSet;

/// Value injected into the first amplifier after the phases.
pub const DRIVING_SIGNAL: i64 = 0;

/// Errors that can abort a network run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// An amplifier faulted; `source` is the root cause.
    #[error("amplifier {index} failed: {source}")]
    Amplifier { index: usize, source: VMError },
    /// The last amplifier halted without writing anything.
    #[error("last amplifier halted without emitting a signal")]
    NoSignal,
    /// A worker task panicked or was cancelled.
    #[error("amplifier task failed: {0}")]
    Task(String),
    /// Phase list is empty or contains duplicates.
    #[error("invalid phases: {0}")]
    InvalidPhases(String),
    /// A link could not be seeded.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

/// Network configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NetworkConfig {
    /// Buffer size of every link.
    pub capacity: usize,
    /// Limits applied to every amplifier.
    pub limits: Limits,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LINK_CAPACITY,
            limits: Limits::default(),
        }
    }
}

/// Outcome of one amplifier once its worker returns.
struct Report {
    result: Result<(), VMError>,
    last: Option<i64>,
}

/// A ring of amplifiers running the same program.
#[derive(Debug, Clone)]
pub struct AmplifierNetwork {
    program: Program,
    config: NetworkConfig,
}

impl AmplifierNetwork {
    pub fn new(program: Program) -> Self {
        Self::with_config(program, NetworkConfig::default())
    }

    pub fn with_config(program: Program, config: NetworkConfig) -> Self {
        Self { program, config }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Runs one amplifier per phase with the standard driving signal.
    pub async fn run(&self, phases: &[i64]) -> Result<i64, NetworkError> {
        self.run_with_signal(phases, DRIVING_SIGNAL).await
    }

    /// Runs one amplifier per phase, driving the first with `signal`.
    ///
    /// Waits for every amplifier to stop. If any faulted, the run fails with
    /// the root-cause fault even when the ring produced values.
    pub async fn run_with_signal(&self, phases: &[i64], signal: i64) -> Result<i64, NetworkError> {
        validate_phases(phases)?;
        let count = phases.len();

        let (mut outputs, inputs): (Vec<LinkOutput>, Vec<LinkInput>) =
            (0..count).map(|_| link(self.config.capacity)).unzip();
        for (output, phase) in outputs.iter_mut().zip(phases) {
            output.preload(*phase)?;
        }
        outputs[0].preload(signal)?;

        // Amplifier i consumes link i and produces into link (i + 1) % count.
        outputs.rotate_left(1);

        let handles: Vec<_> = inputs
            .into_iter()
            .zip(outputs)
            .enumerate()
            .map(|(index, (mut input, mut output))| {
                let program = self.program.clone();
                let limits = self.config.limits;
                let phase = phases[index];
                tokio::task::spawn_blocking(move || {
                    debug!("amplifier {index} started with phase {phase}");
                    let mut vm = VM::with_limits(&program, limits);
                    let result = vm.run(&mut input, &mut output);
                    match &result {
                        Ok(()) => debug!(
                            "amplifier {index} halted after {} steps, sent {} values",
                            vm.steps(),
                            output.sent()
                        ),
                        Err(e) => warn!("amplifier {index} faulted: {e}"),
                    }
                    Report {
                        result,
                        last: output.last(),
                    }
                })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let mut failures = Vec::new();
        let mut signal = None;
        for (index, report) in joined.into_iter().enumerate() {
            let report = report.map_err(|e| NetworkError::Task(e.to_string()))?;
            if let Err(e) = report.result {
                failures.push((index, e));
            }
            if index == count - 1 {
                signal = report.last;
            }
        }

        if let Some((index, source)) = root_cause(failures) {
            return Err(NetworkError::Amplifier { index, source });
        }

        let signal = signal.ok_or(NetworkError::NoSignal)?;
        debug!("network {phases:?} produced {signal}");
        Ok(signal)
    }
}

/// Rejects empty phase lists and repeated phases.
fn validate_phases(phases: &[i64]) -> Result<(), NetworkError> {
    if phases.is_empty() {
        return Err(NetworkError::InvalidPhases("no amplifiers".to_string()));
    }
    let mut seen = HashSet::with_capacity(phases.len());
    for phase in phases {
        if !seen.insert(phase) {
            return Err(NetworkError::InvalidPhases(format!(
                "phase {phase} used more than once"
            )));
        }
    }
    Ok(())
}

/// Picks the fault to report from all amplifiers that failed.
///
/// Closed-channel faults are consequences of a neighbour stopping, so the
/// first other fault in amplifier order wins; the first fault otherwise.
fn root_cause(mut failures: Vec<(usize, VMError)>) -> Option<(usize, VMError)> {
    if failures.is_empty() {
        return None;
    }
    let pick = failures
        .iter()
        .position(|(_, e)| !e.is_secondary())
        .unwrap_or(0);
    Some(failures.swap_remove(pick))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::link::MIN_LINK_CAPACITY;

    const FEEDBACK_A: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    const FEEDBACK_B: [i64; 57] = [
        3, 52, 1001, 52, -5, 52, 3, 53, 1, 52, 56, 54, 1007, 54, 5, 55, 1005, 55, 26, 1001, 54, -5,
        54, 1105, 1, 12, 1, 53, 54, 53, 1008, 54, 0, 55, 1001, 55, 1, 55, 2, 53, 55, 53, 4, 53,
        1001, 56, -1, 56, 1005, 56, 6, 99, 0, 0, 0, 0, 10,
    ];

    const SEQUENTIAL: [i64; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

    /// Reads its phase; phase 5 runs into an invalid opcode, any other phase
    /// forwards one value and halts.
    const FAULTS_ON_FIVE: [i64; 23] = [
        3, 20, 1008, 20, 5, 21, 1006, 21, 10, 42, 3, 22, 4, 22, 99, 0, 0, 0, 0, 0, 0, 0, 0,
    ];

    fn network(code: &[i64]) -> AmplifierNetwork {
        AmplifierNetwork::new(Program::from(code))
    }

    #[tokio::test]
    async fn feedback_loop_converges() {
        let result = network(&FEEDBACK_A).run(&[9, 8, 7, 6, 5]).await;
        assert_eq!(result, Ok(139629729));
    }

    #[tokio::test]
    async fn feedback_loop_longer_program() {
        let result = network(&FEEDBACK_B).run(&[9, 7, 8, 5, 6]).await;
        assert_eq!(result, Ok(18216));
    }

    #[tokio::test]
    async fn sequential_chain_is_a_ring_that_stops_early() {
        let result = network(&SEQUENTIAL).run(&[4, 3, 2, 1, 0]).await;
        assert_eq!(result, Ok(43210));
    }

    #[tokio::test]
    async fn minimal_link_capacity() {
        let config = NetworkConfig {
            capacity: MIN_LINK_CAPACITY,
            limits: Limits::default(),
        };
        let net = AmplifierNetwork::with_config(Program::from(&FEEDBACK_A[..]), config);
        assert_eq!(net.run(&[9, 8, 7, 6, 5]).await, Ok(139629729));
    }

    #[tokio::test]
    async fn custom_driving_signal() {
        // Single amplifier adding its phase to the signal.
        let net = network(&[3, 11, 3, 12, 1, 11, 12, 11, 4, 11, 99, 0, 0]);
        assert_eq!(net.run_with_signal(&[3], 39).await, Ok(42));
    }

    #[tokio::test]
    async fn fault_aborts_network() {
        let result = network(&FAULTS_ON_FIVE).run(&[7, 5, 6]).await;
        assert_eq!(
            result,
            Err(NetworkError::Amplifier {
                index: 1,
                source: VMError::InvalidInstruction {
                    opcode: 42,
                    position: 9
                }
            })
        );
    }

    #[tokio::test]
    async fn fault_in_first_amplifier_is_root_cause() {
        let result = network(&FAULTS_ON_FIVE).run(&[5, 6, 7]).await;
        assert!(matches!(
            result,
            Err(NetworkError::Amplifier { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn unallocatable_address_fails_the_network() {
        // Every amplifier reads its phase, then writes far past any real memory.
        let result = network(&[3, 7, 1101, 1, 1, i64::MAX, 99, 0]).run(&[0, 1]).await;
        assert_eq!(
            result,
            Err(NetworkError::Amplifier {
                index: 0,
                source: VMError::OutOfMemory {
                    address: i64::MAX as usize
                }
            })
        );
    }

    #[tokio::test]
    async fn no_signal_from_last_amplifier() {
        let result = network(&[3, 0, 99]).run(&[1, 2]).await;
        assert_eq!(result, Err(NetworkError::NoSignal));
    }

    #[tokio::test]
    async fn limits_apply_to_every_amplifier() {
        let config = NetworkConfig {
            capacity: DEFAULT_LINK_CAPACITY,
            limits: Limits {
                max_steps: Some(3),
                ..Limits::default()
            },
        };
        let net = AmplifierNetwork::with_config(Program::from(&FEEDBACK_A[..]), config);
        let result = net.run(&[9, 8, 7, 6, 5]).await;
        assert!(matches!(
            result,
            Err(NetworkError::Amplifier {
                source: VMError::StepLimitExceeded { limit: 3 },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn rejects_invalid_phases() {
        let net = network(&FEEDBACK_A);
        assert!(matches!(
            net.run(&[]).await,
            Err(NetworkError::InvalidPhases(_))
        ));
        assert!(matches!(
            net.run(&[5, 6, 5]).await,
            Err(NetworkError::InvalidPhases(_))
        ));
    }

    #[test]
    fn root_cause_skips_secondary_faults() {
        let failures = vec![
            (0, VMError::InputClosed),
            (2, VMError::InvalidInstruction {
                opcode: 42,
                position: 9,
            }),
            (3, VMError::InputClosed),
        ];
        assert_eq!(
            root_cause(failures),
            Some((
                2,
                VMError::InvalidInstruction {
                    opcode: 42,
                    position: 9
                }
            ))
        );
    }

    #[test]
    fn root_cause_falls_back_to_first() {
        let failures = vec![(1, VMError::InputClosed), (4, VMError::InputClosed)];
        assert_eq!(root_cause(failures), Some((1, VMError::InputClosed)));
        assert_eq!(root_cause(vec![]), None);
    }
}
