//! Random MaxCut instance generator.
//!
//! Produces Erdos-Renyi graphs with integer edge weights and, optionally, a
//! random normalized state vector over the matching number of qubits. Graphs
//! are written in DIMACS form and states in the raw amplitude format so both
//! can be fed straight back into `run` and `bench`.

use anyhow::{Context, Result, ensure};
use num_complex::Complex;
use qaoa_core::graph::AdjacencyMatrix;
use qaoa_core::state::MAX_QUBITS;
use qaoa_io::{loader, parser};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::BufWriter;
use tracing::info;

/// Draws a graph in which each pair `u < v` is joined with probability
/// `density`, with a weight uniform in `1..=max_weight`.
pub fn random_graph(
    vertices: usize,
    density: f64,
    max_weight: u32,
    rng: &mut StdRng,
) -> Result<AdjacencyMatrix> {
    ensure!(
        (0.0..=1.0).contains(&density),
        "density {density} must lie in [0, 1]"
    );
    ensure!(max_weight >= 1, "max weight must be at least 1");
    let mut graph = AdjacencyMatrix::with_vertices(vertices)?;
    for u in 0..vertices {
        for v in u + 1..vertices {
            if rng.gen_bool(density) {
                graph.add_edge(u, v, rng.gen_range(1..=max_weight))?;
            }
        }
    }
    Ok(graph)
}

/// Random state of `2^num_qubits` amplitudes with unit norm.
pub fn random_state(num_qubits: u32, rng: &mut StdRng) -> Vec<Complex<f64>> {
    let mut amps: Vec<Complex<f64>> = (0..1usize << num_qubits)
        .map(|_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let norm = amps.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
    if norm > 0.0 {
        amps.iter_mut().for_each(|a| *a /= norm);
    }
    amps
}

pub fn generate_instance(
    graph_path: &str,
    state_path: Option<&str>,
    vertices: usize,
    density: f64,
    max_weight: u32,
    seed: u64,
) -> Result<()> {
    let num_qubits = u32::try_from(vertices).with_context(|| {
        format!("{vertices} vertices exceeds the supported {MAX_QUBITS} qubits")
    })?;
    ensure!(
        num_qubits <= MAX_QUBITS,
        "{vertices} vertices exceeds the supported {MAX_QUBITS} qubits"
    );
    let mut rng = StdRng::seed_from_u64(seed);

    println!("Generating G({vertices}, {density}) with weights 1..={max_weight} (seed {seed})...");
    let graph = random_graph(vertices, density, max_weight, &mut rng)?;
    let file = File::create(graph_path)
        .with_context(|| format!("Failed to create graph file {graph_path}"))?;
    parser::write_dimacs(&graph, BufWriter::new(file))?;
    info!(
        path = graph_path,
        edges = graph.edges().count(),
        total_weight = graph.num_edges(),
        "wrote graph"
    );

    if let Some(path) = state_path {
        let state = random_state(num_qubits, &mut rng);
        loader::save_amplitudes(path, &state)?;
        info!(path, amplitudes = state.len(), "wrote state vector");
    }

    println!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_graph() {
        let a = random_graph(10, 0.4, 3, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = random_graph(10, 0.4, 3, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
        assert!(a.edges().all(|(_, _, w)| (1..=3).contains(&w)));
    }

    #[test]
    fn density_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_graph(6, 0.0, 1, &mut rng).unwrap().num_edges(), 0);
        assert_eq!(random_graph(6, 1.0, 1, &mut rng).unwrap().num_edges(), 15);
        assert!(random_graph(6, 1.5, 1, &mut rng).is_err());
    }

    #[test]
    fn random_state_is_normalized() {
        let state = random_state(5, &mut StdRng::seed_from_u64(2));
        let norm: f64 = state.iter().map(|a| a.norm_sqr()).sum();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_vertex_counts_beyond_the_register() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("g.col");
        let graph_path = graph_path.to_str().unwrap();
        for vertices in [49, (1usize << 32) + 3] {
            let err = generate_instance(graph_path, None, vertices, 0.5, 1, 0).unwrap_err();
            assert!(format!("{err:#}").contains("exceeds"), "{err:#}");
        }
        assert!(!std::path::Path::new(graph_path).exists());
    }

    #[test]
    fn generated_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("g.col");
        let state_path = dir.path().join("s.bin");
        generate_instance(
            graph_path.to_str().unwrap(),
            Some(state_path.to_str().unwrap()),
            4,
            0.5,
            2,
            3,
        )
        .unwrap();
        let graph = parser::load_graph_file(&graph_path).unwrap();
        assert_eq!(graph.num_vertices(), 4);
        assert_eq!(loader::load_amplitudes(&state_path, 4).unwrap().len(), 16);
    }
}
