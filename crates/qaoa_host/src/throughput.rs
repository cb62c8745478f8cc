use crate::driver::{precision_name, rank_state};
use crate::stats::StageStats;
use anyhow::{Context, Result, anyhow};
use qaoa_core::collective::{Collective, Real};
use qaoa_core::cost::build_maxcut_cost;
use qaoa_core::expectation::compute_expectation;
use qaoa_core::graph::AdjacencyMatrix;
use qaoa_core::group::ThreadGroup;
use qaoa_core::histogram::compute_histogram;
use qaoa_core::phase::{PhaseTable, apply_cost_phase, apply_cost_phase_table};
use std::time::{Duration, Instant};
use tracing::info;

const STAGES: [&str; 4] = ["build", "phase", "expectation", "histogram"];

/// Per-stage durations of one pass, measured on a single rank.
type Pass = [Duration; 4];

fn timed<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

fn rank_pass<T: Real>(
    graph: &AdjacencyMatrix,
    gamma: f64,
    tabulate: bool,
    group: ThreadGroup,
) -> Result<Pass> {
    let num_qubits = u32::try_from(graph.num_vertices())?;
    let mut state = rank_state::<T>(num_qubits, None, group)?;
    let gamma = T::from(gamma).ok_or_else(|| anyhow!("gamma not representable"))?;

    let (built, build) = timed(|| build_maxcut_cost(graph, &state));
    let (cost, max_cost) = built?;
    let max_value = usize::try_from(max_cost)?.max(1);

    let (applied, phase) = timed(|| {
        if tabulate {
            PhaseTable::new(gamma, max_cost)
                .and_then(|table| apply_cost_phase_table(&mut state, &cost, &table))
        } else {
            apply_cost_phase(&mut state, &cost, gamma)
        }
    });
    applied?;

    let (mean, expectation) = timed(|| compute_expectation(&state, &cost));
    mean?;
    let (hist, histogram) = timed(|| compute_histogram(&state, &cost, max_value));
    hist?;

    Ok([build, phase, expectation, histogram])
}

/// Times every kernel stage over `repeat` passes on `ranks` simulated
/// processes. The slowest rank of each pass defines the stage time.
pub fn run_benchmark<T: Real>(
    graph: &AdjacencyMatrix,
    ranks: usize,
    repeat: usize,
    gamma: f64,
    tabulate: bool,
) -> Result<[StageStats; 4]> {
    let mut stats = [StageStats::default(); 4];
    for pass in 0..repeat {
        let per_rank = ThreadGroup::scope(ranks, |group| {
            let rank = group.rank();
            rank_pass::<T>(graph, gamma, tabulate, group)
                .with_context(|| format!("rank {rank} failed in pass {pass}"))
        });
        let mut slowest = [Duration::ZERO; 4];
        for timings in per_rank {
            for (s, t) in slowest.iter_mut().zip(timings?) {
                *s = (*s).max(t);
            }
        }
        for (stat, t) in stats.iter_mut().zip(slowest) {
            stat.update(t);
        }
    }
    Ok(stats)
}

pub fn print_benchmark<T: Real>(
    graph: &AdjacencyMatrix,
    ranks: usize,
    repeat: usize,
    gamma: f64,
    tabulate: bool,
) -> Result<()> {
    let n = graph.num_vertices();
    println!(
        "Benchmarking {n} qubits on {ranks} ranks x {} threads ({} precision, {repeat} passes)...",
        rayon::current_num_threads(),
        precision_name::<T>()
    );
    let start = Instant::now();
    let stats = run_benchmark::<T>(graph, ranks, repeat, gamma, tabulate)?;
    info!(elapsed = ?start.elapsed(), "benchmark finished");

    println!("Results");
    for (name, stat) in STAGES.iter().zip(&stats) {
        stat.print_row(name);
    }
    let amplitudes = (1u64 << n) as f64;
    let phase_avg = stats[1].avg();
    if phase_avg > 0.0 {
        println!("Phase throughput: {:.2} Mamp/s", amplitudes / phase_avg * 1e3);
    }
    Ok(())
}
