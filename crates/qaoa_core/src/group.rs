//! Process group simulated by OS threads sharing one exchange buffer.
//!
//! Each member stands in for one process. An all-reduce deposits the member's
//! contribution into its slot, waits on a barrier until every member has
//! deposited, combines all slots in rank order, then waits on the barrier a
//! second time so no slot is overwritten while another member is still
//! reading it. Combining in rank order makes the result identical on every
//! member and independent of thread scheduling.
//!
//! A member that panics inside [`ThreadGroup::scope`] aborts the group: every
//! member blocked on the barrier, and every later reduction, fails with
//! `CollectiveFailure` instead of waiting for a deposit that never comes.

use crate::collective::{Collective, ReduceOp};
use crate::{QaoaError, Result};
use core::ops::Add;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use tracing::warn;

/// One member's deposit for the reduction in flight.
struct Contribution {
    op: ReduceOp,
    values: Box<dyn Any + Send>,
}

/// Arrival count of the barrier generation in progress.
struct Gate {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

struct Exchange {
    size: usize,
    gate: Mutex<Gate>,
    released: Condvar,
    slots: Mutex<Vec<Option<Contribution>>>,
}

impl Exchange {
    /// Blocks until every member has arrived or the group is aborted.
    fn wait(&self) -> Result<()> {
        let mut gate = self.gate.lock().map_err(|_| poisoned())?;
        if gate.aborted {
            return Err(aborted());
        }
        let generation = gate.generation;
        gate.arrived += 1;
        if gate.arrived == self.size {
            gate.arrived = 0;
            gate.generation += 1;
            self.released.notify_all();
            return Ok(());
        }
        while gate.generation == generation && !gate.aborted {
            gate = self.released.wait(gate).map_err(|_| poisoned())?;
        }
        if gate.generation == generation {
            return Err(aborted());
        }
        Ok(())
    }

    fn abort(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        gate.aborted = true;
        self.released.notify_all();
    }
}

/// Handle of one member of an in-process group.
///
/// Members are created together by [`ThreadGroup::new`] and must each be
/// driven by a distinct thread: a reduction blocks until every member has
/// entered it. Only [`ThreadGroup::scope`] aborts the group on a panic.
#[derive(Clone)]
pub struct ThreadGroup {
    exchange: Arc<Exchange>,
    rank: usize,
    size: usize,
}

impl core::fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl ThreadGroup {
    /// Creates the members of a group of `size`, in rank order.
    pub fn new(size: usize) -> Vec<ThreadGroup> {
        let exchange = Arc::new(Exchange {
            size,
            gate: Mutex::new(Gate {
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            released: Condvar::new(),
            slots: Mutex::new((0..size).map(|_| None).collect()),
        });
        (0..size)
            .map(|rank| ThreadGroup {
                exchange: Arc::clone(&exchange),
                rank,
                size,
            })
            .collect()
    }

    /// Runs `f` once per member on its own scoped thread and collects the
    /// results in rank order.
    ///
    /// A panic on a member thread aborts the group, so peers blocked in a
    /// reduction return `CollectiveFailure`. The first panic in rank order is
    /// resumed on the caller once every member has finished.
    pub fn scope<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadGroup) -> R + Sync,
        R: Send,
    {
        let members = Self::new(size);
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = members
                .into_iter()
                .map(|member| {
                    let exchange = Arc::clone(&member.exchange);
                    s.spawn(move || {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(member)));
                        if outcome.is_err() {
                            exchange.abort();
                        }
                        outcome
                    })
                })
                .collect();
            let outcomes: Vec<_> = handles
                .into_iter()
                .map(|h| h.join().and_then(|outcome| outcome))
                .collect();
            outcomes
                .into_iter()
                .map(|outcome| outcome.unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect()
        })
    }

    fn all_reduce<T>(&self, values: &mut [T], op: ReduceOp) -> Result<()>
    where
        T: Copy + PartialOrd + Add<Output = T> + Send + 'static,
    {
        let deposited = match self.exchange.slots.lock() {
            Ok(mut slots) => {
                slots[self.rank] = Some(Contribution {
                    op,
                    values: Box::new(values.to_vec()),
                });
                Ok(())
            }
            Err(_) => Err(poisoned()),
        };

        let combined = self
            .exchange
            .wait()
            .and(deposited)
            .and_then(|()| self.combine::<T>(values.len(), op));
        // Every member reads before the next reduction may overwrite a slot.
        let combined = self.exchange.wait().and(combined);

        match combined {
            Ok(combined) => {
                values.copy_from_slice(&combined);
                Ok(())
            }
            Err(e) => {
                warn!(rank = self.rank, error = %e, "all-reduce failed");
                Err(e)
            }
        }
    }

    fn combine<T>(&self, len: usize, op: ReduceOp) -> Result<Vec<T>>
    where
        T: Copy + PartialOrd + Add<Output = T> + Send + 'static,
    {
        let slots = self.exchange.slots.lock().map_err(|_| poisoned())?;
        let mut acc: Option<Vec<T>> = None;

        for (rank, slot) in slots.iter().enumerate() {
            let contribution = slot.as_ref().ok_or_else(|| {
                QaoaError::CollectiveFailure(format!("rank {rank} did not contribute"))
            })?;
            if contribution.op != op {
                return Err(QaoaError::CollectiveFailure(format!(
                    "rank {rank} reduced with {:?}, expected {:?}",
                    contribution.op, op
                )));
            }
            let values = contribution
                .values
                .downcast_ref::<Vec<T>>()
                .ok_or_else(|| {
                    QaoaError::CollectiveFailure(format!("rank {rank} used another element type"))
                })?;
            if values.len() != len {
                return Err(QaoaError::CollectiveFailure(format!(
                    "rank {rank} contributed {} values, expected {len}",
                    values.len()
                )));
            }
            match acc.as_mut() {
                Some(acc) => op.combine_into(acc, values),
                None => acc = Some(values.clone()),
            }
        }

        acc.ok_or_else(|| QaoaError::CollectiveFailure("empty group".into()))
    }
}

fn poisoned() -> QaoaError {
    QaoaError::CollectiveFailure("exchange buffer poisoned".into())
}

fn aborted() -> QaoaError {
    QaoaError::CollectiveFailure("group aborted after a member panicked".into())
}

impl Collective for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) -> Result<()> {
        self.all_reduce(values, op)
    }

    fn all_reduce_f32(&self, values: &mut [f32], op: ReduceOp) -> Result<()> {
        self.all_reduce(values, op)
    }

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) -> Result<()> {
        self.all_reduce(values, op)
    }
}
