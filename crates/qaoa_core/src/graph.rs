//! Weighted adjacency matrix for MaxCut instances.
//!
//! Stores the graph as a dense row-major `n x n` matrix of non-negative
//! integer weights. Every edge appears twice, once per direction, so the sum
//! of all entries is twice the total edge weight. The cost builder relies on
//! this symmetry to turn the spin quadratic form into an exact cut count.

use crate::bit_utils::BitCodec;
use crate::{QaoaError, Result};

/// Dense adjacency matrix of a weighted undirected graph.
///
/// Entries are edge weights (0/1 for unweighted graphs). A matrix returned by
/// any constructor other than `with_vertices` has already been validated; a
/// matrix assembled edge by edge through `add_edge` is symmetric by
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    /// Row-major weights, `weights[v * num_vertices + u]`.
    weights: Vec<u32>,

    /// Number of vertices, which is also the qubit count of the register.
    num_vertices: usize,

    /// Half the sum of all entries.
    num_edges: u64,
}

impl AdjacencyMatrix {
    /// Creates an edgeless graph on `num_vertices` vertices.
    ///
    /// # Errors
    ///
    /// `RangeError` when `num_vertices^2` overflows `usize`.
    pub fn with_vertices(num_vertices: usize) -> Result<Self> {
        let len = num_vertices
            .checked_mul(num_vertices)
            .ok_or_else(|| QaoaError::range("vertex count", num_vertices, "sqrt(usize::MAX)"))?;
        Ok(Self {
            weights: vec![0; len],
            num_vertices,
            num_edges: 0,
        })
    }

    /// Builds a matrix from a row-major buffer of `num_vertices^2` weights.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if the buffer is not square, `InvariantViolation` if
    /// the weights break symmetry, the zero diagonal or the even total.
    pub fn from_dense(num_vertices: usize, weights: Vec<u32>) -> Result<Self> {
        let expected = num_vertices
            .checked_mul(num_vertices)
            .ok_or_else(|| QaoaError::range("vertex count", num_vertices, usize::MAX))?;
        if weights.len() != expected {
            return Err(QaoaError::SizeMismatch {
                what: "adjacency matrix",
                expected,
                found: weights.len(),
            });
        }
        let mut graph = Self {
            weights,
            num_vertices,
            num_edges: 0,
        };
        graph.num_edges = graph.validate()?;
        Ok(graph)
    }

    /// Builds a matrix from explicit rows.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self> {
        let n = rows.len();
        let mut weights = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(QaoaError::SizeMismatch {
                    what: "adjacency row",
                    expected: n,
                    found: row.len(),
                });
            }
            weights.extend(row);
        }
        Self::from_dense(n, weights)
    }

    /// Adds `weight` to the undirected edge `{u, v}`.
    ///
    /// Both `A[u][v]` and `A[v][u]` are incremented, so repeated calls for the
    /// same pair accumulate weight.
    ///
    /// # Errors
    ///
    /// `RangeError` for a vertex outside the graph or a weight overflow,
    /// `InvariantViolation` for a self loop.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: u32) -> Result<()> {
        let n = self.num_vertices;
        let max_idx = u.max(v);
        if max_idx >= n {
            return Err(QaoaError::range("vertex", max_idx, n));
        }
        if u == v {
            return Err(QaoaError::InvariantViolation(format!(
                "self loop on vertex {u}"
            )));
        }
        let updated = self.weights[u * n + v]
            .checked_add(weight)
            .ok_or_else(|| QaoaError::range("edge weight", weight, u32::MAX))?;
        self.weights[u * n + v] = updated;
        self.weights[v * n + u] = updated;
        self.num_edges += u64::from(weight);
        Ok(())
    }

    /// Checks the graph invariants and returns the total edge weight.
    ///
    /// Verifies a zero diagonal, `A[v][u] == A[u][v]` for every pair, and an
    /// even sum of all entries.
    pub fn validate(&self) -> Result<u64> {
        let n = self.num_vertices;
        if self.weights.len() != n * n {
            return Err(QaoaError::SizeMismatch {
                what: "adjacency matrix",
                expected: n * n,
                found: self.weights.len(),
            });
        }
        for v in 0..n {
            if self.weights[v * n + v] != 0 {
                return Err(QaoaError::InvariantViolation(format!(
                    "non-zero diagonal entry at vertex {v}"
                )));
            }
            for u in (v + 1)..n {
                if self.weights[v * n + u] != self.weights[u * n + v] {
                    return Err(QaoaError::InvariantViolation(format!(
                        "asymmetric weights between vertices {v} and {u}"
                    )));
                }
            }
        }
        let total: u64 = self.weights.iter().map(|&w| u64::from(w)).sum();
        if total % 2 != 0 {
            return Err(QaoaError::InvariantViolation(format!(
                "odd total edge weight {total}"
            )));
        }
        Ok(total / 2)
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Total edge weight, each undirected edge counted once.
    pub fn num_edges(&self) -> u64 {
        self.num_edges
    }

    #[inline]
    pub fn weight(&self, v: usize, u: usize) -> u32 {
        self.weights[v * self.num_vertices + u]
    }

    /// Iterates over undirected edges `(v, u, w)` with `v < u` and `w > 0`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        let n = self.num_vertices;
        (0..n).flat_map(move |v| {
            ((v + 1)..n).filter_map(move |u| {
                let w = self.weight(v, u);
                (w > 0).then_some((v, u, w))
            })
        })
    }

    /// Computes `sum_{v,u} A[v][u] * s[v] * s[u]` for a spin vector `s`.
    #[inline]
    pub fn quadratic_form(&self, spins: &[i64]) -> i64 {
        let n = self.num_vertices;
        let mut q = 0i64;
        for (v, &sv) in spins.iter().enumerate().take(n) {
            let row = &self.weights[v * n..(v + 1) * n];
            let mut acc = 0i64;
            for (&w, &su) in row.iter().zip(spins) {
                acc += i64::from(w) * su;
            }
            q += sv * acc;
        }
        q
    }

    /// Turns a quadratic form value into the cut weight.
    ///
    /// With spins in `{-1,+1}`, `q = 2 * (uncut - cut)` and
    /// `num_edges = uncut + cut`, hence `cut = (num_edges - q/2) / 2`. Both
    /// divisions must be exact.
    #[inline]
    pub fn cut_from_quadratic_form(&self, q: i64) -> Result<u64> {
        if q % 2 != 0 {
            return Err(QaoaError::InvariantViolation(format!(
                "odd quadratic form {q}"
            )));
        }
        let doubled = self.num_edges as i64 - q / 2;
        if doubled % 2 != 0 {
            return Err(QaoaError::InvariantViolation(format!(
                "odd doubled cut {doubled}"
            )));
        }
        if doubled < 0 {
            return Err(QaoaError::InvariantViolation(format!(
                "negative doubled cut {doubled}"
            )));
        }
        Ok((doubled / 2) as u64)
    }

    /// Cut weight of the coloring encoded by `index`.
    ///
    /// Single-index evaluation, independent of any state partitioning.
    pub fn cut_value(&self, index: u64) -> Result<u64> {
        let spins = spins_for(index, self.num_vertices)?;
        self.cut_from_quadratic_form(self.quadratic_form(&spins))
    }
}

fn spins_for(index: u64, width: usize) -> Result<Vec<i64>> {
    let bits = BitCodec::decode_to_bits(index, width)?;
    let mut spins = vec![0i64; width];
    BitCodec::to_spins(&bits, &mut spins)?;
    Ok(spins)
}
