#![allow(dead_code)]

use num_complex::Complex;
use qaoa_core::graph::AdjacencyMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn triangle() -> AdjacencyMatrix {
    AdjacencyMatrix::from_rows(vec![vec![0, 1, 1], vec![1, 0, 1], vec![1, 1, 0]]).unwrap()
}

/// Erdos-Renyi graph with weights in `1..=max_weight`.
pub fn random_graph(n: usize, p: f64, max_weight: u32, seed: u64) -> AdjacencyMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut g = AdjacencyMatrix::with_vertices(n).unwrap();
    for u in 0..n {
        for v in u + 1..n {
            if rng.gen_bool(p) {
                g.add_edge(u, v, rng.gen_range(1..=max_weight)).unwrap();
            }
        }
    }
    g
}

/// Normalized state with independent uniform real and imaginary parts.
pub fn random_state(num_qubits: u32, seed: u64) -> Vec<Complex<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut amps: Vec<Complex<f64>> = (0..1usize << num_qubits)
        .map(|_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let norm = amps.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
    for a in &mut amps {
        *a /= norm;
    }
    amps
}

/// Cut weight of every index, evaluated one edge at a time.
pub fn brute_force_costs(g: &AdjacencyMatrix) -> Vec<u64> {
    let n = g.num_vertices();
    (0..1u64 << n)
        .map(|k| {
            g.edges()
                .filter(|&(v, u, _)| ((k >> v) ^ (k >> u)) & 1 == 1)
                .map(|(_, _, w)| u64::from(w))
                .sum()
        })
        .collect()
}
