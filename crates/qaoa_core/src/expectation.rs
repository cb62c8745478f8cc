//! Expectation value `<psi| C |psi> = sum_i c_i |a_i|^2`.
//!
//! Each process sums its shard in parallel, then one SUM reduction combines
//! the partial sums. Summation order depends on the thread and process
//! counts, so results agree across configurations only up to floating-point
//! tolerance.

use crate::collective::{ReduceOp, Real};
use crate::cost::DiagonalCost;
use crate::state::DistributedState;
use crate::Result;
use rayon::prelude::*;
use tracing::debug;

/// Computes the expectation value of the diagonal `cost` in `state`.
///
/// Must be called collectively by every member of the state's group.
///
/// # Errors
///
/// `SizeMismatch` if `cost` is not partitioned like `state`;
/// `CollectiveFailure` if the reduction fails.
pub fn compute_expectation<S: DistributedState>(
    state: &S,
    cost: &DiagonalCost<S::Scalar>,
) -> Result<S::Scalar> {
    cost.check_partition(state)?;
    let local: S::Scalar = state
        .amplitudes()
        .par_iter()
        .zip(cost.values().par_iter())
        .map(|(amp, &c)| c * amp.norm_sqr())
        .sum();

    let mut total = [local];
    S::Scalar::all_reduce(state.group(), &mut total, ReduceOp::Sum)?;
    debug!(rank = state.rank(), local = %local, global = %total[0], "reduced expectation");
    Ok(total[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::SingleProcess;
    use crate::cost::build_maxcut_cost;
    use crate::graph::AdjacencyMatrix;
    use crate::state::ShardedState;
    use approx::assert_relative_eq;

    #[test]
    fn basis_state_picks_its_cost() {
        let mut g = AdjacencyMatrix::with_vertices(3).unwrap();
        g.add_edge(0, 1, 2).unwrap();
        g.add_edge(1, 2, 1).unwrap();
        let state = ShardedState::<f64, _>::basis(3, 0b010, SingleProcess).unwrap();
        let (cost, _) = build_maxcut_cost(&g, &state).unwrap();
        assert_relative_eq!(compute_expectation(&state, &cost).unwrap(), 3.0);
    }

    #[test]
    fn single_edge_uniform_mean_is_half() {
        let mut g = AdjacencyMatrix::with_vertices(2).unwrap();
        g.add_edge(0, 1, 1).unwrap();
        let state = ShardedState::<f32, _>::uniform(2, SingleProcess).unwrap();
        let (cost, max) = build_maxcut_cost(&g, &state).unwrap();
        assert_eq!(max, 1);
        assert_relative_eq!(compute_expectation(&state, &cost).unwrap(), 0.5, epsilon = 1e-6);
    }
}
