//! Probability mass per integer cost value.
//!
//! Bucket `b` of the histogram holds the total `|a_i|^2` over every basis
//! index whose cost is `b`. Each rayon worker fills its own bucket array,
//! the arrays are merged pairwise once the shard is consumed, and a single
//! element-wise SUM reduction combines the per-process histograms. Memory is
//! `O(max_value)` per worker regardless of the state size.

use crate::collective::{ReduceOp, Real};
use crate::cost::DiagonalCost;
use crate::state::DistributedState;
use crate::{QaoaError, Result};
use num_traits::{One, Zero};
use rayon::prelude::*;
use tracing::debug;

/// Bucket index of a cost value, or `None` outside `[0, max_value]`.
#[inline]
fn bucket<T: Real>(cost: T, max_value: usize) -> Option<usize> {
    cost.round().to_usize().filter(|&b| b <= max_value)
}

/// Computes the global cost histogram with `max_value + 1` buckets.
///
/// Must be called collectively by every member of the state's group, with
/// the same `max_value` everywhere. The maximum returned by
/// [`build_maxcut_cost`](crate::cost::build_maxcut_cost) is the natural
/// choice.
///
/// # Errors
///
/// - `RangeError` if `max_value` is zero or a local cost lies outside
///   `[0, max_value]`.
/// - `SizeMismatch` if `cost` is not partitioned like `state`.
/// - `CollectiveFailure` if another member hit a range error in the same
///   call or the reduction fails.
pub fn compute_histogram<S: DistributedState>(
    state: &S,
    cost: &DiagonalCost<S::Scalar>,
    max_value: usize,
) -> Result<Vec<S::Scalar>> {
    if max_value == 0 {
        return Err(QaoaError::range("histogram max value", 0, "> 0"));
    }
    cost.check_partition(state)?;
    let buckets = max_value
        .checked_add(1)
        .ok_or_else(|| QaoaError::range("histogram max value", max_value, usize::MAX - 1))?;
    let zero = S::Scalar::zero();

    let local = state
        .amplitudes()
        .par_iter()
        .zip(cost.values().par_iter())
        .try_fold(
            || vec![zero; buckets],
            |mut hist, (amp, &c)| {
                let b = bucket(c, max_value)
                    .ok_or_else(|| QaoaError::range("cost value", c, max_value))?;
                hist[b] += amp.norm_sqr();
                Ok(hist)
            },
        )
        .try_reduce(
            || vec![zero; buckets],
            |mut acc, part| {
                for (a, p) in acc.iter_mut().zip(part) {
                    *a += p;
                }
                Ok(acc)
            },
        );

    // The trailing slot counts failed ranks so all members agree on the
    // outcome within the same collective.
    let (mut reduced, failure) = match local {
        Ok(hist) => (hist, None),
        Err(e) => (vec![zero; buckets], Some(e)),
    };
    reduced.push(if failure.is_some() {
        S::Scalar::one()
    } else {
        zero
    });
    S::Scalar::all_reduce(state.group(), &mut reduced, ReduceOp::Sum)?;

    if let Some(e) = failure {
        return Err(e);
    }
    if reduced[buckets] > zero {
        return Err(QaoaError::CollectiveFailure(
            "histogram construction failed on another rank".into(),
        ));
    }
    reduced.truncate(buckets);

    debug!(rank = state.rank(), buckets, "reduced cost histogram");
    Ok(reduced)
}
