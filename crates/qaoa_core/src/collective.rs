//! Collective reductions across the processes that share one state vector.
//!
//! Every kernel that produces a scalar or a small array performs exactly one
//! all-reduce per call. The reduction is blocking: all members of the group
//! must enter the same call with the same shape and operator before any of
//! them returns, so callers must invoke the kernels collectively.

use crate::Result;
use core::fmt::{Debug, Display};
use core::iter::Sum;
use core::ops::AddAssign;
use num_traits::{Float, FloatConst, NumAssign};

/// Element-wise reduction operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Max,
    Sum,
}

impl ReduceOp {
    /// Folds `rhs` into `lhs` according to the operator.
    #[inline]
    pub fn combine<T>(self, lhs: T, rhs: T) -> T
    where
        T: PartialOrd + core::ops::Add<Output = T>,
    {
        match self {
            ReduceOp::Max => {
                if rhs > lhs {
                    rhs
                } else {
                    lhs
                }
            }
            ReduceOp::Sum => lhs + rhs,
        }
    }

    /// Applies the operator element-wise: `acc[i] = op(acc[i], other[i])`.
    #[inline]
    pub fn combine_into<T>(self, acc: &mut [T], other: &[T])
    where
        T: Copy + PartialOrd + core::ops::Add<Output = T>,
    {
        for (a, &b) in acc.iter_mut().zip(other) {
            *a = self.combine(*a, b);
        }
    }
}

/// A group of processes that jointly own one distributed state.
///
/// All reductions are in place: on return every member holds the combined
/// values. Implementations must return the same outcome, success or error,
/// on every member so that no member is left waiting in a later call.
pub trait Collective: Send + Sync {
    /// Rank of this member, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of members in the group.
    fn size(&self) -> usize;

    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) -> Result<()>;

    fn all_reduce_f32(&self, values: &mut [f32], op: ReduceOp) -> Result<()>;

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) -> Result<()>;
}

impl<C: Collective + ?Sized> Collective for &C {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) -> Result<()> {
        (**self).all_reduce_f64(values, op)
    }

    fn all_reduce_f32(&self, values: &mut [f32], op: ReduceOp) -> Result<()> {
        (**self).all_reduce_f32(values, op)
    }

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) -> Result<()> {
        (**self).all_reduce_u64(values, op)
    }
}

/// Base precision of the amplitudes and the cost diagonal.
///
/// Implemented for `f32` and `f64`. The amplitude type of the pipeline is
/// `Complex<T>` and the cost array stores `T`, so choosing `T` once fixes the
/// precision of every kernel.
pub trait Real:
    Float
    + FloatConst
    + NumAssign
    + Sum
    + AddAssign
    + Send
    + Sync
    + Debug
    + Display
    + Default
    + 'static
{
    /// Significand precision in bits; every integer up to `2^MANTISSA_DIGITS`
    /// is exactly representable.
    const MANTISSA_DIGITS: u32;

    /// Reduces `values` across `group` using the transport for this precision.
    fn all_reduce<C: Collective + ?Sized>(
        group: &C,
        values: &mut [Self],
        op: ReduceOp,
    ) -> Result<()>;
}

impl Real for f64 {
    const MANTISSA_DIGITS: u32 = f64::MANTISSA_DIGITS;

    fn all_reduce<C: Collective + ?Sized>(
        group: &C,
        values: &mut [Self],
        op: ReduceOp,
    ) -> Result<()> {
        group.all_reduce_f64(values, op)
    }
}

impl Real for f32 {
    const MANTISSA_DIGITS: u32 = f32::MANTISSA_DIGITS;

    fn all_reduce<C: Collective + ?Sized>(
        group: &C,
        values: &mut [Self],
        op: ReduceOp,
    ) -> Result<()> {
        group.all_reduce_f32(values, op)
    }
}

/// A group with a single member; every reduction is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Collective for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_f64(&self, _values: &mut [f64], _op: ReduceOp) -> Result<()> {
        Ok(())
    }

    fn all_reduce_f32(&self, _values: &mut [f32], _op: ReduceOp) -> Result<()> {
        Ok(())
    }

    fn all_reduce_u64(&self, _values: &mut [u64], _op: ReduceOp) -> Result<()> {
        Ok(())
    }
}
