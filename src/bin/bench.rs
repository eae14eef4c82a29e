//! Interpreter benchmark binary.
//!
//! Measures execution time for representative programs.
//! Run with: `cargo run --release --bin bench`

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use intcode::network::amplifier::AmplifierNetwork;
use intcode::network::search::{FEEDBACK_PHASES, max_signal};
use intcode::virtual_machine::program::Program;
use intcode::virtual_machine::vm::VM;

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

struct BenchResult {
    name: &'static str,
    iterations: u64,
    total: Duration,
    /// Instructions retired by the last run; 0 when not measured.
    steps: u64,
}

impl BenchResult {
    fn avg(&self) -> Duration {
        self.total / self.iterations as u32
    }

    fn print(&self) {
        let avg = self.avg();
        let ns_per_op = avg.as_nanos();
        let ns_per_step = if self.steps > 0 {
            format!("{:>8.1}", ns_per_op as f64 / self.steps as f64)
        } else {
            "       -".to_string()
        };
        println!(
            "  {:<30} {:>7} iters {:>10.3} us/iter {:>12} steps  {} ns/step",
            self.name,
            self.iterations,
            ns_per_op as f64 / 1000.0,
            self.steps,
            ns_per_step,
        );
    }
}

/// Runs `f` for at least `min_duration`, returning aggregated results.
fn bench<F>(name: &'static str, min_duration: Duration, mut f: F) -> BenchResult
where
    F: FnMut() -> u64,
{
    // Warmup
    for _ in 0..5 {
        f();
    }

    let mut iterations = 0u64;
    let mut last_steps = 0u64;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        last_steps = f();
        iterations += 1;
    }
    let total = start.elapsed();

    BenchResult {
        name,
        iterations,
        total,
        steps: last_steps,
    }
}

/// Runs `program` to completion with no input, returns retired steps.
fn run_steps(program: &Program) -> u64 {
    let mut vm = VM::new(program);
    let mut input = VecDeque::<i64>::new();
    let mut output = Vec::<i64>::new();
    vm.run(&mut input, &mut output).expect("run failed");
    vm.steps()
}

// ---------------------------------------------------------------------------
// Benchmark programs
// ---------------------------------------------------------------------------

/// Decrements a counter to zero.
fn countdown(n: i64) -> Program {
    Program::from(vec![1001, 8, -1, 8, 1005, 8, 0, 99, n])
}

/// Multiplies an accumulator by a decreasing counter.
fn factorial(n: i64) -> Program {
    Program::from(vec![2, 13, 12, 13, 1001, 12, -1, 12, 1005, 12, 0, 99, n, 1])
}

/// Writes one cell per iteration past the end of memory through the relative base.
fn memory_growth(n: i64) -> Program {
    Program::from(vec![
        109, 1000, 109, 1, 21101, 7, 0, 0, 1001, 16, -1, 16, 1005, 16, 2, 99, n,
    ])
}

const QUINE: [i64; 16] = [
    109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
];

const FEEDBACK: [i64; 29] = [
    3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28, 1005,
    28, 6, 99, 0, 0, 5,
];

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let min = Duration::from_secs(2);

    println!("Interpreter Benchmarks (each runs for >= 2s)\n");
    println!(
        "  {:<30} {:>7}       {:>14} {:>12}  {:>10}",
        "benchmark", "iters", "avg time", "steps/run", "ns/step"
    );
    println!("  {}", "-".repeat(82));

    // 1. Factorial variants
    for &n in &[10i64, 100, 1000] {
        let name: &'static str = match n {
            10 => "factorial(10)",
            100 => "factorial(100)",
            1000 => "factorial(1000)",
            _ => unreachable!(),
        };
        let prog = factorial(n);
        bench(name, min, || run_steps(&prog)).print();
    }

    // 2. Tight loop (100K iterations)
    let prog = countdown(100_000);
    bench("countdown(100K)", min, || run_steps(&prog)).print();

    // 3. Memory growth (10K cells)
    let prog = memory_growth(10_000);
    bench("memory_growth(10K)", min, || run_steps(&prog)).print();

    // 4. Relative-base quine
    let prog = Program::from(&QUINE[..]);
    bench("quine", min, || run_steps(&prog)).print();

    // 5. Feedback search across 120 rings
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let network = AmplifierNetwork::new(Program::from(&FEEDBACK[..]));
    bench("feedback_search(120 rings)", min, || {
        runtime
            .block_on(max_signal(&network, &FEEDBACK_PHASES))
            .expect("search failed");
        0
    })
    .print();

    println!();
}
