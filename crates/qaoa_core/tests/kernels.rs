//! End-to-end checks of the cost kernels against brute-force evaluation on a
//! single process.

mod common;

use approx::assert_relative_eq;
use common::{brute_force_costs, random_graph, random_state, triangle};
use qaoa_core::collective::SingleProcess;
use qaoa_core::cost::build_maxcut_cost;
use qaoa_core::expectation::compute_expectation;
use qaoa_core::histogram::compute_histogram;
use qaoa_core::phase::{PhaseTable, apply_cost_phase, apply_cost_phase_table};
use qaoa_core::state::{DistributedState, ShardedState};

#[test]
fn triangle_costs_and_maximum() {
    let state = ShardedState::<f64, _>::uniform(3, SingleProcess).unwrap();
    let (cost, max) = build_maxcut_cost(&triangle(), &state).unwrap();
    assert_eq!(max, 2);
    assert_eq!(cost.values(), &[0.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 0.0]);
    // each edge is cut by half of all colorings
    assert_eq!(cost.values().iter().sum::<f64>(), 12.0);
    assert_relative_eq!(compute_expectation(&state, &cost).unwrap(), 1.5, epsilon = 1e-12);
}

#[test]
fn builder_matches_brute_force_on_weighted_graphs() {
    for seed in 0..4 {
        let g = random_graph(7, 0.5, 5, seed);
        let state = ShardedState::<f64, _>::zeros(7, SingleProcess).unwrap();
        let (cost, max) = build_maxcut_cost(&g, &state).unwrap();
        let expected = brute_force_costs(&g);
        for (i, (&c, &e)) in cost.values().iter().zip(&expected).enumerate() {
            assert_eq!(c as u64, e, "seed {seed} index {i}");
        }
        assert_eq!(max, expected.iter().copied().max().unwrap());
    }
}

#[test]
fn expectation_and_histogram_match_brute_force() {
    for n in 4..=6u32 {
        let g = random_graph(n as usize, 0.6, 3, u64::from(n));
        let amps = random_state(n, 100 + u64::from(n));
        let state = ShardedState::from_global(&amps, SingleProcess).unwrap();
        let (cost, max) = build_maxcut_cost(&g, &state).unwrap();

        let costs = brute_force_costs(&g);
        let mut expected_hist = vec![0.0; max as usize + 1];
        let mut expected_mean = 0.0;
        for (a, &c) in amps.iter().zip(&costs) {
            expected_hist[c as usize] += a.norm_sqr();
            expected_mean += c as f64 * a.norm_sqr();
        }

        let mean = compute_expectation(&state, &cost).unwrap();
        let hist = compute_histogram(&state, &cost, max as usize).unwrap();
        assert_relative_eq!(mean, expected_mean, epsilon = 1e-10);
        assert_relative_eq!(hist.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
        for (h, e) in hist.iter().zip(&expected_hist) {
            assert_relative_eq!(*h, *e, epsilon = 1e-10);
        }
    }
}

#[test]
fn phase_layer_preserves_measurement_statistics() {
    let g = random_graph(6, 0.5, 2, 7);
    let amps = random_state(6, 8);
    let mut state = ShardedState::from_global(&amps, SingleProcess).unwrap();
    let (cost, max) = build_maxcut_cost(&g, &state).unwrap();
    let mean_before = compute_expectation(&state, &cost).unwrap();
    let hist_before = compute_histogram(&state, &cost, max as usize).unwrap();

    for gamma in [0.1, 0.7, -2.3] {
        apply_cost_phase(&mut state, &cost, gamma).unwrap();
    }
    let table = PhaseTable::new(1.1, max).unwrap();
    apply_cost_phase_table(&mut state, &cost, &table).unwrap();

    assert_relative_eq!(state.norm_sqr().unwrap(), 1.0, epsilon = 1e-10);
    assert_relative_eq!(compute_expectation(&state, &cost).unwrap(), mean_before, epsilon = 1e-10);
    let hist_after = compute_histogram(&state, &cost, max as usize).unwrap();
    for (a, b) in hist_after.iter().zip(&hist_before) {
        assert_relative_eq!(*a, *b, epsilon = 1e-10);
    }
}

#[test]
fn opposite_angles_cancel() {
    let g = random_graph(5, 0.7, 4, 3);
    let amps = random_state(5, 4);
    let mut state = ShardedState::from_global(&amps, SingleProcess).unwrap();
    let (cost, _) = build_maxcut_cost(&g, &state).unwrap();
    apply_cost_phase(&mut state, &cost, 0.9).unwrap();
    apply_cost_phase(&mut state, &cost, -0.9).unwrap();
    for (a, b) in state.amplitudes().iter().zip(&amps) {
        assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
        assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
    }
}

#[test]
fn single_precision_pipeline() {
    let state = ShardedState::<f32, _>::uniform(3, SingleProcess).unwrap();
    let (cost, max) = build_maxcut_cost(&triangle(), &state).unwrap();
    let hist = compute_histogram(&state, &cost, max as usize).unwrap();
    assert_relative_eq!(hist[0], 0.25, epsilon = 1e-6);
    assert_relative_eq!(hist[2], 0.75, epsilon = 1e-6);
    assert_relative_eq!(compute_expectation(&state, &cost).unwrap(), 1.5, epsilon = 1e-6);
}
