//! MaxCut cost diagonal.
//!
//! For a coloring `s` in `{-1,+1}^n` of an `n`-vertex graph with adjacency
//! matrix `A`, the quadratic form `s^T A s` counts every uncut edge with `+2`
//! and every cut edge with `-2`. The cut weight therefore follows exactly from
//! `cut = (num_edges - s^T A s / 2) / 2`.
//!
//! The diagonal is stored with the same partition as the amplitude array, so
//! `DiagonalCost::values()[i]` is the cost of global index `shard_offset + i`.

use crate::bit_utils::BitCodec;
use crate::collective::{Collective, ReduceOp, Real};
use crate::graph::AdjacencyMatrix;
use crate::state::DistributedState;
use crate::{QaoaError, Result};
use bitvec::prelude::*;
use num_traits::{NumCast, ToPrimitive};
use rayon::prelude::*;
use tracing::debug;

/// Real-valued diagonal operator partitioned like the amplitude array.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalCost<T> {
    values: Vec<T>,
    shard_offset: usize,
    global_size: usize,
}

impl<T: Real> DiagonalCost<T> {
    /// Wraps caller-computed local values for the shard owned by `state`.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` when `values` does not have the state's local size.
    pub fn from_local<S: DistributedState<Scalar = T>>(values: Vec<T>, state: &S) -> Result<Self> {
        if values.len() != state.local_size() {
            return Err(QaoaError::SizeMismatch {
                what: "cost array local size",
                expected: state.local_size(),
                found: values.len(),
            });
        }
        Ok(Self {
            values,
            shard_offset: state.shard_offset(),
            global_size: state.global_size(),
        })
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn local_size(&self) -> usize {
        self.values.len()
    }

    pub fn global_size(&self) -> usize {
        self.global_size
    }

    pub fn shard_offset(&self) -> usize {
        self.shard_offset
    }

    /// Checks that this diagonal and `state` share one partition.
    pub fn check_partition<S: DistributedState<Scalar = T>>(&self, state: &S) -> Result<()> {
        let pairs = [
            ("local size", self.local_size(), state.local_size()),
            ("global size", self.global_size, state.global_size()),
            ("shard offset", self.shard_offset, state.shard_offset()),
        ];
        for (what, cost, amps) in pairs {
            if cost != amps {
                return Err(QaoaError::SizeMismatch {
                    what,
                    expected: amps,
                    found: cost,
                });
            }
        }
        Ok(())
    }
}

/// Per-worker scratch for decoding one index into spins.
struct Scratch {
    bits: BitVec<u64, Lsb0>,
    spins: Vec<i64>,
}

impl Scratch {
    fn new(width: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; width],
            spins: vec![0; width],
        }
    }

    #[inline]
    fn cut(&mut self, graph: &AdjacencyMatrix, index: u64) -> Result<u64> {
        BitCodec::decode_into(index, &mut self.bits)?;
        BitCodec::to_spins(&self.bits, &mut self.spins)?;
        graph.cut_from_quadratic_form(graph.quadratic_form(&self.spins))
    }
}

/// Builds the MaxCut cost diagonal for the shard owned by `state`.
///
/// Every index of the local shard is decoded into a coloring, its cut weight
/// is computed from the adjacency matrix, and the running maximum is combined
/// across the process group with one MAX reduction. Returns the diagonal and
/// the global maximum cut weight; only the value is reported, not which
/// colorings attain it.
///
/// Must be called collectively by every member of the state's group.
///
/// # Errors
///
/// - `SizeMismatch` if the graph has a different vertex count than the
///   register has qubits.
/// - `InvariantViolation` if the adjacency matrix is malformed.
/// - `RangeError` if the total edge weight is not exactly representable in `T`.
/// - `CollectiveFailure` if another member failed during the same call.
pub fn build_maxcut_cost<S: DistributedState>(
    graph: &AdjacencyMatrix,
    state: &S,
) -> Result<(DiagonalCost<S::Scalar>, u64)> {
    let width = graph.num_vertices();
    if width != state.num_qubits() as usize {
        return Err(QaoaError::SizeMismatch {
            what: "graph vertices vs qubits",
            expected: state.num_qubits() as usize,
            found: width,
        });
    }
    let num_edges = graph.validate()?;
    if num_edges != graph.num_edges() {
        return Err(QaoaError::InvariantViolation(format!(
            "stored edge weight {} disagrees with matrix total {num_edges}",
            graph.num_edges()
        )));
    }
    let exact_limit = 1u64 << S::Scalar::MANTISSA_DIGITS;
    if num_edges > exact_limit {
        return Err(QaoaError::range("total edge weight", num_edges, exact_limit));
    }

    let offset = state.shard_offset();
    let local: Result<Vec<S::Scalar>> = (0..state.local_size())
        .into_par_iter()
        .map_init(
            || Scratch::new(width),
            |scratch, i| {
                let cut = scratch.cut(graph, (offset + i) as u64)?;
                <S::Scalar as NumCast>::from(cut)
                    .ok_or_else(|| QaoaError::range("cut weight", cut, num_edges))
            },
        )
        .collect();

    let local_max = match &local {
        Ok(values) => values
            .par_iter()
            .filter_map(|v| v.to_u64())
            .max()
            .unwrap_or(0),
        Err(_) => 0,
    };

    // [max cut, failure flag]: one collective also tells every member whether
    // any shard failed, so no member waits on a reduction that never comes.
    let mut reduced = [local_max, <u64 as From<bool>>::from(local.is_err())];
    state.group().all_reduce_u64(&mut reduced, ReduceOp::Max)?;

    let values = local?;
    if reduced[1] != 0 {
        return Err(QaoaError::CollectiveFailure(
            "cost construction failed on another rank".into(),
        ));
    }

    debug!(
        rank = state.rank(),
        local_size = values.len(),
        local_max,
        global_max = reduced[0],
        "built maxcut cost diagonal"
    );

    Ok((
        DiagonalCost {
            values,
            shard_offset: state.shard_offset(),
            global_size: state.global_size(),
        },
        reduced[0],
    ))
}
