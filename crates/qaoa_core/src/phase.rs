//! Cost-Hamiltonian phase layer.
//!
//! Multiplies every amplitude by `exp(-i * gamma * c_i)`, where `c_i` is the
//! cost of its basis index. The update is purely local: no index reads
//! another index and no process communicates, so the shard is updated in
//! parallel without synchronization.

use crate::collective::Real;
use crate::cost::DiagonalCost;
use crate::state::DistributedState;
use crate::{QaoaError, Result};
use num_complex::Complex;
use rayon::prelude::*;
use tracing::debug;

/// Applies `exp(-i * gamma * C)` to the local shard of `state`.
///
/// # Errors
///
/// `SizeMismatch` if `cost` is not partitioned like `state`. The check runs
/// before any amplitude is written.
pub fn apply_cost_phase<S: DistributedState>(
    state: &mut S,
    cost: &DiagonalCost<S::Scalar>,
    gamma: S::Scalar,
) -> Result<()> {
    cost.check_partition(state)?;
    state
        .amplitudes_mut()
        .par_iter_mut()
        .zip(cost.values().par_iter())
        .for_each(|(amp, &c)| *amp *= Complex::cis(-gamma * c));
    debug!(rank = state.rank(), gamma = %gamma, "applied cost phase layer");
    Ok(())
}

/// Phase factors `exp(-i * gamma * c)` for every integer cost `c` in
/// `[0, max_cost]`.
///
/// For integer-valued diagonals the number of distinct costs is bounded by
/// the total edge weight, which is far smaller than the shard. Computing the
/// factors once replaces one `sin`/`cos` pair per amplitude by a lookup.
#[derive(Debug, Clone)]
pub struct PhaseTable<T> {
    factors: Vec<Complex<T>>,
    gamma: T,
}

impl<T: Real> PhaseTable<T> {
    pub fn new(gamma: T, max_cost: u64) -> Result<Self> {
        let len = usize::try_from(max_cost)
            .ok()
            .and_then(|m| m.checked_add(1))
            .ok_or_else(|| QaoaError::range("max cost", max_cost, usize::MAX))?;
        let factors = (0..len)
            .map(|c| {
                let c = T::from(c).ok_or_else(|| QaoaError::range("cost", c, max_cost))?;
                Ok(Complex::cis(-gamma * c))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { factors, gamma })
    }

    pub fn gamma(&self) -> T {
        self.gamma
    }

    pub fn max_cost(&self) -> usize {
        self.factors.len() - 1
    }

    #[inline]
    fn slot(&self, cost: T) -> Option<usize> {
        let bin = cost.round().to_usize()?;
        (bin < self.factors.len() && T::from(bin) == Some(cost)).then_some(bin)
    }
}

/// Applies the phase layer using precomputed factors.
///
/// Equivalent to [`apply_cost_phase`] with the table's gamma for diagonals
/// whose entries are integers in `[0, table.max_cost()]`.
///
/// # Errors
///
/// `SizeMismatch` on a partition mismatch, `RangeError` if any local cost is
/// not an integer within the table. Both are detected before any amplitude
/// is modified.
pub fn apply_cost_phase_table<S: DistributedState>(
    state: &mut S,
    cost: &DiagonalCost<S::Scalar>,
    table: &PhaseTable<S::Scalar>,
) -> Result<()> {
    cost.check_partition(state)?;
    if let Some(&bad) = cost.values().par_iter().find_any(|&&c| table.slot(c).is_none()) {
        return Err(QaoaError::range("cost value", bad, table.max_cost()));
    }
    state
        .amplitudes_mut()
        .par_iter_mut()
        .zip(cost.values().par_iter())
        .for_each(|(amp, &c)| {
            if let Some(bin) = table.slot(c) {
                *amp *= table.factors[bin];
            }
        });
    debug!(rank = state.rank(), gamma = %table.gamma, "applied tabulated cost phase layer");
    Ok(())
}
