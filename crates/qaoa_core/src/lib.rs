//! Diagonal cost operator kernels for MaxCut QAOA on a sharded state vector.
//!
//! This crate builds the MaxCut cost diagonal from a weighted adjacency
//! matrix, applies the cost-Hamiltonian phase layer to a distributed complex
//! amplitude array, and reduces expectation values and cost histograms across
//! worker threads and processes. The amplitude container and the collective
//! reduction substrate are injected through traits so the same kernels run
//! against a single process, an in-process thread group, or a real cluster
//! transport.

use thiserror::Error;

/// Conversion between integer basis labels and their bit patterns.
///
/// Bit 0 of a label corresponds to vertex 0 (least significant bit first).
/// Every other module decodes basis indices through this codec so that the
/// cost diagonal and the amplitudes always agree on the ordering.
pub mod bit_utils;

/// Collective reduction primitives and the amplitude precision trait.
///
/// Defines the `Collective` trait that every process group implements, the
/// reduction operators the kernels require (MAX and SUM), and the `Real`
/// trait that selects single or double precision for the whole pipeline.
pub mod collective;

/// Diagonal cost array and the MaxCut cost builder.
///
/// Produces one real cost per basis index, partitioned exactly like the
/// amplitude array, and returns the global maximum cost found across all
/// processes.
pub mod cost;

/// Expectation value of the cost diagonal against a state.
pub mod expectation;

/// Weighted adjacency matrix for MaxCut instances.
///
/// Stores a dense, symmetric, zero-diagonal matrix of non-negative integer
/// edge weights and validates these invariants before any cost is computed.
pub mod graph;

/// In-process process group backed by OS threads.
///
/// Simulates a multi-process collective by exchanging contributions through
/// shared memory between barriers. Used to exercise the distributed code paths
/// without an external transport.
pub mod group;

/// Probability mass histogram over integer cost values.
///
/// Accumulates per-worker bucket arrays in parallel, merges them once per
/// process, and sums the per-process histograms with a single collective.
pub mod histogram;

/// Cost-Hamiltonian phase layer `exp(-i * gamma * C)`.
pub mod phase;

/// Distributed amplitude array abstraction and a contiguous-shard implementation.
///
/// The global state of `2^n` amplitudes is split into equal contiguous shards,
/// one per process, with shard `r` starting at `r * local_size`.
pub mod state;

/// Error types returned by cost operator construction and reductions.
///
/// All conditions are detected synchronously and abort the current operation
/// without returning partially computed output. None of them are retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QaoaError {
    /// Two arrays or shapes that must agree do not.
    ///
    /// Raised when the amplitude and cost arrays differ in local or global
    /// size or shard offset, when the adjacency matrix is not square or does
    /// not match the qubit count, or when a process group cannot partition the
    /// state into equal shards.
    #[error("size mismatch in {what}: expected {expected}, found {found}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The adjacency matrix or a value derived from it breaks a graph invariant.
    ///
    /// Covers a non-zero diagonal, an asymmetric entry, an odd total edge
    /// weight, and an odd intermediate quantity in the cut formula. Any of
    /// these indicates a malformed graph upstream.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A value falls outside the range it is required to lie in.
    ///
    /// Raised when an integer does not fit the requested bit width, when a
    /// cost value lies outside `[0, max_value]` during histogram construction,
    /// or when a cost cannot be represented exactly in the chosen precision.
    #[error("{what} out of range: {value} (limit {limit})")]
    RangeError {
        what: &'static str,
        value: String,
        limit: String,
    },

    /// The collective reduction could not complete consistently.
    ///
    /// Members of the group disagreed on shape, element type or reduction
    /// operator, the exchange state was poisoned, or a peer process reported
    /// a local failure during the same call.
    #[error("collective failure: {0}")]
    CollectiveFailure(String),
}

impl QaoaError {
    pub(crate) fn range(what: &'static str, value: impl ToString, limit: impl ToString) -> Self {
        QaoaError::RangeError {
            what,
            value: value.to_string(),
            limit: limit.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, QaoaError>;
