//! Distributed amplitude array.
//!
//! The global state of an `n`-qubit register holds `2^n` complex amplitudes.
//! It is split into `P` contiguous shards of equal length, one per process,
//! where `P` is the size of the process group. Shard `r` covers global
//! indices `[r * local_size, (r + 1) * local_size)`. The partition is fixed
//! for the lifetime of the state.

use crate::collective::{Collective, ReduceOp, Real};
use crate::{QaoaError, Result};
use num_complex::Complex;
use rayon::prelude::*;

/// Largest register supported by [`ShardedState`].
pub const MAX_QUBITS: u32 = 48;

/// Amplitude container seen by the cost kernels.
///
/// Implementations own one contiguous shard of the global state and a handle
/// to the process group that owns the other shards.
pub trait DistributedState {
    /// Base precision of the amplitudes.
    type Scalar: Real;

    type Group: Collective;

    /// Qubit count `n`; the global state has `2^n` amplitudes.
    fn num_qubits(&self) -> u32;

    fn local_size(&self) -> usize;

    fn global_size(&self) -> usize;

    /// Rank of the process owning this shard.
    fn rank(&self) -> usize;

    /// Global index of local element 0.
    fn shard_offset(&self) -> usize {
        self.rank() * self.local_size()
    }

    fn amplitudes(&self) -> &[Complex<Self::Scalar>];

    fn amplitudes_mut(&mut self) -> &mut [Complex<Self::Scalar>];

    fn group(&self) -> &Self::Group;
}

/// Contiguous-shard state vector owned by one member of a process group.
#[derive(Debug, Clone)]
pub struct ShardedState<T, C> {
    amplitudes: Vec<Complex<T>>,
    num_qubits: u32,
    global_size: usize,
    group: C,
}

/// Validates the partition and returns `(global_size, local_size)`.
fn partition(num_qubits: u32, ranks: usize) -> Result<(usize, usize)> {
    if num_qubits > MAX_QUBITS {
        return Err(QaoaError::range("qubit count", num_qubits, MAX_QUBITS));
    }
    let global_size = 1usize << num_qubits;
    if ranks == 0 || !ranks.is_power_of_two() || ranks > global_size {
        return Err(QaoaError::SizeMismatch {
            what: "process group size",
            expected: ranks.next_power_of_two().min(global_size),
            found: ranks,
        });
    }
    Ok((global_size, global_size / ranks))
}

impl<T: Real, C: Collective> ShardedState<T, C> {
    /// Allocates this rank's shard with every amplitude set to zero.
    ///
    /// # Errors
    ///
    /// `RangeError` above [`MAX_QUBITS`]; `SizeMismatch` when the group size
    /// is not a power of two or exceeds `2^num_qubits`.
    pub fn zeros(num_qubits: u32, group: C) -> Result<Self> {
        let (global_size, local_size) = partition(num_qubits, group.size())?;
        Ok(Self {
            amplitudes: vec![Complex::new(T::zero(), T::zero()); local_size],
            num_qubits,
            global_size,
            group,
        })
    }

    /// Equal superposition `|+>^n`: every amplitude is `1 / sqrt(2^n)`.
    pub fn uniform(num_qubits: u32, group: C) -> Result<Self> {
        let mut state = Self::zeros(num_qubits, group)?;
        let global = T::from(state.global_size)
            .ok_or_else(|| QaoaError::range("state size", state.global_size, "float range"))?;
        let amp = Complex::new(global.sqrt().recip(), T::zero());
        state.amplitudes.par_iter_mut().for_each(|a| *a = amp);
        Ok(state)
    }

    /// Computational basis state `|index>`.
    pub fn basis(num_qubits: u32, index: usize, group: C) -> Result<Self> {
        let mut state = Self::zeros(num_qubits, group)?;
        if index >= state.global_size {
            return Err(QaoaError::range("basis index", index, state.global_size));
        }
        let offset = state.shard_offset();
        if (offset..offset + state.local_size()).contains(&index) {
            state.amplitudes[index - offset] = Complex::new(T::one(), T::zero());
        }
        Ok(state)
    }

    /// Keeps this rank's slice of a full state vector.
    ///
    /// `global.len()` must be a power of two; its base-2 logarithm is the
    /// qubit count.
    pub fn from_global(global: &[Complex<T>], group: C) -> Result<Self> {
        if !global.len().is_power_of_two() {
            return Err(QaoaError::SizeMismatch {
                what: "global state length",
                expected: global.len().next_power_of_two(),
                found: global.len(),
            });
        }
        let num_qubits = global.len().trailing_zeros();
        let mut state = Self::zeros(num_qubits, group)?;
        let offset = state.shard_offset();
        let local = state.local_size();
        state
            .amplitudes
            .copy_from_slice(&global[offset..offset + local]);
        Ok(state)
    }

    /// Takes ownership of an already sliced shard.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` when `local` is not the shard length this rank owns.
    pub fn from_local(num_qubits: u32, local: Vec<Complex<T>>, group: C) -> Result<Self> {
        let (global_size, local_size) = partition(num_qubits, group.size())?;
        if local.len() != local_size {
            return Err(QaoaError::SizeMismatch {
                what: "amplitude shard",
                expected: local_size,
                found: local.len(),
            });
        }
        Ok(Self {
            amplitudes: local,
            num_qubits,
            global_size,
            group,
        })
    }

    /// Global squared norm `sum |a_i|^2`; one SUM reduction.
    pub fn norm_sqr(&self) -> Result<T> {
        let mut total = [self.amplitudes.par_iter().map(|a| a.norm_sqr()).sum::<T>()];
        T::all_reduce(&self.group, &mut total, ReduceOp::Sum)?;
        Ok(total[0])
    }

    /// Consumes the state and returns the local shard.
    pub fn into_local(self) -> Vec<Complex<T>> {
        self.amplitudes
    }
}

impl<T: Real, C: Collective> DistributedState for ShardedState<T, C> {
    type Scalar = T;
    type Group = C;

    fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    fn local_size(&self) -> usize {
        self.amplitudes.len()
    }

    fn global_size(&self) -> usize {
        self.global_size
    }

    fn rank(&self) -> usize {
        self.group.rank()
    }

    fn amplitudes(&self) -> &[Complex<T>] {
        &self.amplitudes
    }

    fn amplitudes_mut(&mut self) -> &mut [Complex<T>] {
        &mut self.amplitudes
    }

    fn group(&self) -> &C {
        &self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::SingleProcess;
    use crate::group::ThreadGroup;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_state_is_normalized() {
        let state = ShardedState::<f64, _>::uniform(5, SingleProcess).unwrap();
        assert_eq!(state.local_size(), 32);
        assert_eq!(state.global_size(), 32);
        assert_relative_eq!(state.norm_sqr().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn shards_are_contiguous() {
        let shards = ThreadGroup::scope(4, |group| {
            let global: Vec<Complex<f64>> =
                (0..16).map(|i| Complex::new(i as f64, 0.0)).collect();
            let state = ShardedState::from_global(&global, group).unwrap();
            (state.shard_offset(), state.local_size(), state.into_local())
        });

        for (rank, (offset, local, amps)) in shards.into_iter().enumerate() {
            assert_eq!(offset, rank * 4);
            assert_eq!(local, 4);
            assert_eq!(amps[0].re, (rank * 4) as f64);
        }
    }

    #[test]
    fn rejects_unusable_partitions() {
        let groups = ThreadGroup::new(3);
        let err = ShardedState::<f64, _>::zeros(4, groups[0].clone()).unwrap_err();
        assert!(matches!(err, QaoaError::SizeMismatch { found: 3, .. }));

        let groups = ThreadGroup::new(8);
        assert!(ShardedState::<f32, _>::zeros(2, groups[0].clone()).is_err());

        assert!(ShardedState::<f64, _>::zeros(MAX_QUBITS + 1, SingleProcess).is_err());
    }

    #[test]
    fn from_local_checks_shard_length() {
        let groups = ThreadGroup::new(2);
        let shard = vec![Complex::new(0.5, 0.0); 4];
        let state =
            ShardedState::<f64, _>::from_local(3, shard.clone(), groups[1].clone()).unwrap();
        assert_eq!(state.shard_offset(), 4);
        assert!(ShardedState::<f64, _>::from_local(4, shard, groups[1].clone()).is_err());
    }

    #[test]
    fn basis_state_lands_on_owning_rank() {
        let norms = ThreadGroup::scope(2, |group| {
            let state = ShardedState::<f64, _>::basis(3, 5, group).unwrap();
            let local: f64 = state.amplitudes().iter().map(|a| a.norm_sqr()).sum();
            (local, state.norm_sqr().unwrap())
        });
        assert_eq!(norms[0].0, 0.0);
        assert_eq!(norms[1].0, 1.0);
        assert_eq!(norms[0].1, 1.0);
    }
}
