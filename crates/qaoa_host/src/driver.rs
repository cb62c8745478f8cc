//! Runs cost layers on a simulated process group.
//!
//! Each rank of a [`ThreadGroup`] owns one shard of the state and drives the
//! core kernels on its own thread; the kernels' parallel loops share the
//! global rayon pool. All ranks compute identical reductions, so the report
//! is taken from rank 0.

use anyhow::{Context, Result, anyhow};
use num_complex::Complex;
use num_traits::ToPrimitive;
use qaoa_core::bit_utils::BitCodec;
use qaoa_core::collective::{Collective, ReduceOp, Real};
use qaoa_core::cost::{DiagonalCost, build_maxcut_cost};
use qaoa_core::expectation::compute_expectation;
use qaoa_core::graph::AdjacencyMatrix;
use qaoa_core::group::ThreadGroup;
use qaoa_core::histogram::compute_histogram;
use qaoa_core::phase::{PhaseTable, apply_cost_phase, apply_cost_phase_table};
use qaoa_core::state::{DistributedState, ShardedState};
use qaoa_io::loader;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub ranks: usize,
    /// Use a precomputed phase table instead of per-amplitude `cis`.
    pub tabulate: bool,
}

/// Measurements after one layer; `gamma` is `None` for the initial state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerReport {
    pub gamma: Option<f64>,
    pub expectation: f64,
    pub histogram: Vec<f64>,
}

/// Basis state with the largest final probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coloring {
    pub index: u64,
    /// Vertex 0 first.
    pub bits: String,
    pub probability: f64,
    pub cut: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub num_qubits: u32,
    pub ranks: usize,
    pub precision: &'static str,
    pub max_cost: u64,
    pub layers: Vec<LayerReport>,
    pub most_likely: Coloring,
}

impl RunReport {
    pub fn print(&self) {
        println!(
            "MaxCut cost layers: {} qubits, {} ranks, {} precision",
            self.num_qubits, self.ranks, self.precision
        );
        println!("Max cost: {}", self.max_cost);
        for layer in &self.layers {
            match layer.gamma {
                Some(gamma) => println!("gamma = {gamma:<10.6} <C> = {:.10}", layer.expectation),
                None => println!("initial            <C> = {:.10}", layer.expectation),
            }
        }
        let best = &self.most_likely;
        println!(
            "Most likely coloring: {} (index {}, p = {:.6}, cut {}/{})",
            best.bits, best.index, best.probability, best.cut, self.max_cost
        );
        if let Some(last) = self.layers.last() {
            println!("Cost distribution:");
            for (cost, p) in last.histogram.iter().enumerate() {
                if *p > 0.0 {
                    println!("  [{cost:3}] {p:.6}");
                }
            }
        }
    }
}

pub fn precision_name<T: Real>() -> &'static str {
    if T::MANTISSA_DIGITS > f32::MANTISSA_DIGITS {
        "double"
    } else {
        "single"
    }
}

/// Builds this rank's state from an optional global vector, or `|+>^n`.
pub fn rank_state<T: Real>(
    num_qubits: u32,
    initial: Option<&[Complex<f64>]>,
    group: ThreadGroup,
) -> Result<ShardedState<T, ThreadGroup>> {
    let Some(global) = initial else {
        return Ok(ShardedState::uniform(num_qubits, group)?);
    };
    let shard = loader::slice_shard(global, group.rank(), group.size())?;
    let local = shard
        .iter()
        .map(|a| Some(Complex::new(T::from(a.re)?, T::from(a.im)?)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            anyhow!("initial amplitude not representable in {}", precision_name::<T>())
        })?;
    Ok(ShardedState::from_local(num_qubits, local, group)?)
}

fn measure<T: Real>(
    state: &ShardedState<T, ThreadGroup>,
    cost: &DiagonalCost<T>,
    max_value: usize,
    gamma: Option<f64>,
) -> Result<LayerReport> {
    let expectation = compute_expectation(state, cost)?;
    let histogram = compute_histogram(state, cost, max_value)?;
    Ok(LayerReport {
        gamma,
        expectation: expectation.to_f64().unwrap_or(f64::NAN),
        histogram: histogram
            .iter()
            .map(|p| p.to_f64().unwrap_or(f64::NAN))
            .collect(),
    })
}

/// Finds the most probable basis index across the group with two
/// reductions: MAX over probabilities, then MAX over the indices that reach
/// it. Ties resolve to the highest index.
fn most_likely<T: Real>(
    graph: &AdjacencyMatrix,
    state: &ShardedState<T, ThreadGroup>,
) -> Result<Coloring> {
    let offset = state.shard_offset();
    let (local_index, local_p) = state
        .amplitudes()
        .iter()
        .enumerate()
        .fold((0, T::zero()), |(bi, bp), (i, a)| {
            let p = a.norm_sqr();
            if p >= bp { (offset + i, p) } else { (bi, bp) }
        });

    let mut p = [local_p];
    T::all_reduce(state.group(), &mut p, ReduceOp::Max)?;
    // +1 so a rank without a candidate contributes 0
    let mut index = [if local_p == p[0] { local_index as u64 + 1 } else { 0 }];
    state.group().all_reduce_u64(&mut index, ReduceOp::Max)?;
    let index = index[0]
        .checked_sub(1)
        .ok_or_else(|| anyhow!("no rank reported a most likely index"))?;

    let width = graph.num_vertices();
    Ok(Coloring {
        index,
        bits: BitCodec::format(index, width)?,
        probability: p[0].to_f64().unwrap_or(f64::NAN),
        cut: graph.cut_value(index)?,
    })
}

/// One rank's share of [`run_layers`]; every call inside is collective.
fn rank_layers<T: Real>(
    graph: &AdjacencyMatrix,
    initial: Option<&[Complex<f64>]>,
    gammas: &[f64],
    config: RunConfig,
    group: ThreadGroup,
) -> Result<(u64, Vec<LayerReport>, Coloring)> {
    let rank = group.rank();
    let num_qubits = u32::try_from(graph.num_vertices())?;
    let mut state = rank_state::<T>(num_qubits, initial, group)?;
    let (cost, max_cost) = build_maxcut_cost(graph, &state)?;
    // an edgeless graph still gets a two-bucket histogram
    let max_value = usize::try_from(max_cost)?.max(1);

    let mut layers = Vec::with_capacity(gammas.len() + 1);
    layers.push(measure(&state, &cost, max_value, None)?);
    for &gamma in gammas {
        let g = T::from(gamma).ok_or_else(|| anyhow!("gamma {gamma} not representable"))?;
        if config.tabulate {
            let table = PhaseTable::new(g, max_cost)?;
            apply_cost_phase_table(&mut state, &cost, &table)?;
        } else {
            apply_cost_phase(&mut state, &cost, g)?;
        }
        let layer = measure(&state, &cost, max_value, Some(gamma))?;
        if rank == 0 {
            info!(gamma, expectation = layer.expectation, "layer complete");
        }
        layers.push(layer);
    }
    let best = most_likely(graph, &state)?;
    debug!(rank, local_size = state.local_size(), "rank finished");
    Ok((max_cost, layers, best))
}

/// Applies one phase layer per entry of `gammas` to the initial state and
/// measures the cost expectation and histogram before and after each layer.
pub fn run_layers<T: Real>(
    graph: &AdjacencyMatrix,
    initial: Option<&[Complex<f64>]>,
    gammas: &[f64],
    config: RunConfig,
) -> Result<RunReport> {
    let num_qubits = u32::try_from(graph.num_vertices())?;
    info!(
        num_qubits,
        ranks = config.ranks,
        precision = precision_name::<T>(),
        "starting cost layers"
    );
    let outcomes = ThreadGroup::scope(config.ranks, |group| {
        rank_layers::<T>(graph, initial, gammas, config, group)
    });

    let mut per_rank = Vec::with_capacity(outcomes.len());
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        per_rank.push(outcome.with_context(|| format!("rank {rank} failed"))?);
    }
    let (max_cost, layers, most_likely) = per_rank
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("process group is empty"))?;

    Ok(RunReport {
        num_qubits,
        ranks: config.ranks,
        precision: precision_name::<T>(),
        max_cost,
        layers,
        most_likely,
    })
}
