//! Scenario tests for the blockmodel crate.

use crate::blockmodel::Blockmodel;
use crate::fit::{BlockmodelFitter, FitOptions, InitMethod, Interrupts};
use crate::graph::UndirectedGraph;
use crate::greedy::GreedyStrategy;
use crate::metropolis::MetropolisHastingsStrategy;
use crate::selection::aic;
use approx::assert_abs_diff_eq;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Two disjoint 5-cycles, planted as blocks {0..5} and {5..10}
fn two_rings() -> (UndirectedGraph, Vec<usize>) {
    let mut edges = vec![];
    for i in 0..5 {
        edges.push((i, (i + 1) % 5));
        edges.push((5 + i, 5 + (i + 1) % 5));
    }
    let graph = UndirectedGraph::from_edges(10, &edges).unwrap();
    let planted = (0..10).map(|v| v / 5).collect();
    (graph, planted)
}

/// Four 4-cliques with one edge missing from each
fn four_cliques() -> (UndirectedGraph, Vec<usize>) {
    let missing = [(0, 1), (5, 6), (10, 11), (12, 15)];
    let mut edges = vec![];
    for c in 0..4 {
        for a in 0..4 {
            for b in (a + 1)..4 {
                let e = (4 * c + a, 4 * c + b);
                if !missing.contains(&e) {
                    edges.push(e);
                }
            }
        }
    }
    let graph = UndirectedGraph::from_edges(16, &edges).unwrap();
    let planted = (0..16).map(|v| v / 4).collect();
    (graph, planted)
}

/// Greedy steps until a fixed point, collecting the log-likelihood
/// after every step that changed something
fn greedy_trace(model: &mut Blockmodel, max_steps: usize) -> (usize, Vec<f64>) {
    let mut greedy = GreedyStrategy::new(max_steps);
    let mut trace = vec![model.log_likelihood()];
    let mut steps = 0;
    while steps < max_steps {
        steps += 1;
        if !greedy.step(model) {
            break;
        }
        trace.push(model.log_likelihood());
    }
    (steps, trace)
}

fn is_non_decreasing(trace: &[f64]) -> bool {
    trace.windows(2).all(|w| w[1] >= w[0] - 1e-9)
}

#[test]
fn planted_rings_are_a_fixed_point() {
    let (graph, planted) = two_rings();
    let mut model = Blockmodel::with_types(&graph, 2, planted.clone()).unwrap();
    assert_abs_diff_eq!(model.log_likelihood(), 20.0 * 0.5f64.ln(), epsilon = 1e-9);

    let mut greedy = GreedyStrategy::default();
    assert_eq!(greedy.optimize(&mut model), 1);
    assert_eq!(model.types(), &planted[..]);
}

#[test]
fn rings_recover_from_any_single_move() {
    let (graph, planted) = two_rings();
    for v in 0..10 {
        let mut types = planted.clone();
        types[v] = 1 - types[v];
        let mut model = Blockmodel::with_types(&graph, 2, types).unwrap();

        let (steps, trace) = greedy_trace(&mut model, 1000);
        assert_eq!(model.types(), &planted[..], "vertex {}", v);
        assert_eq!(steps, 2, "vertex {}", v);
        assert!(is_non_decreasing(&trace), "vertex {}: {:?}", v, trace);
    }
}

#[test]
fn cliques_recover_from_any_single_move() {
    let (graph, planted) = four_cliques();
    let expected = 4.0 * (5.0 * (5.0f64 / 6.0).ln() + (1.0f64 / 6.0).ln());

    for v in 0..16 {
        for t in 0..4 {
            let mut types = planted.clone();
            types[v] = t;
            let mut model = Blockmodel::with_types(&graph, 4, types).unwrap();

            let (_, trace) = greedy_trace(&mut model, 1000);
            assert_eq!(model.types(), &planted[..], "vertex {} -> {}", v, t);
            assert!(is_non_decreasing(&trace), "vertex {} -> {}: {:?}", v, t, trace);
            assert_abs_diff_eq!(model.log_likelihood(), expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn cliques_single_moves_take_one_sweep() {
    let (graph, planted) = four_cliques();
    for (v, t) in [(0, 1), (5, 3), (13, 0)] {
        let mut types = planted.clone();
        types[v] = t;
        let mut model = Blockmodel::with_types(&graph, 4, types).unwrap();
        let mut greedy = GreedyStrategy::default();
        assert_eq!(greedy.optimize(&mut model), 2, "vertex {} -> {}", v, t);
        assert_eq!(model.types(), &planted[..]);
    }
}

/// Move vertex `4c + offsets[c]` into block `targets[c]`, one per clique
fn perturbed_cliques(planted: &[usize], offsets: [usize; 4], targets: [usize; 4]) -> Vec<usize> {
    let mut types = planted.to_vec();
    for c in 0..4 {
        types[4 * c + offsets[c]] = targets[c];
    }
    types
}

#[test]
fn cliques_recover_from_one_move_per_clique() {
    let (graph, planted) = four_cliques();
    let cases = [
        ([0, 0, 0, 0], [1, 0, 0, 2], 2),
        ([0, 0, 0, 0], [3, 3, 0, 0], 2),
        ([1, 1, 1, 1], [1, 2, 3, 0], 3),
    ];
    for (offsets, targets, expected_steps) in cases {
        let types = perturbed_cliques(&planted, offsets, targets);
        let mut model = Blockmodel::with_types(&graph, 4, types).unwrap();

        let (steps, trace) = greedy_trace(&mut model, 1000);
        assert_eq!(model.types(), &planted[..], "{:?} -> {:?}", offsets, targets);
        assert_eq!(steps, expected_steps);
        assert!(is_non_decreasing(&trace), "{:?}", trace);
    }
}

#[test]
fn synchronous_sweeps_can_lose_likelihood() {
    let (graph, planted) = four_cliques();
    let types = perturbed_cliques(&planted, [0, 0, 0, 0], [1, 2, 3, 0]);
    let mut model = Blockmodel::with_types(&graph, 4, types).unwrap();

    let (steps, trace) = greedy_trace(&mut model, 1000);
    assert_eq!(steps, 3);
    assert_eq!(
        model.types(),
        &[0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2]
    );
    assert_eq!(trace.len(), 3);
    assert!(trace[2] < trace[1]);

    // a fixed point stays put
    let mut greedy = GreedyStrategy::default();
    let before = model.types().to_vec();
    assert_eq!(greedy.optimize(&mut model), 1);
    assert_eq!(model.types(), &before[..]);
}

#[test]
fn cycling_sweeps_stop_at_the_cap() {
    let (graph, planted) = four_cliques();
    let types = perturbed_cliques(&planted, [2, 2, 2, 2], [1, 2, 3, 0]);
    let mut model = Blockmodel::with_types(&graph, 4, types).unwrap();

    let mut greedy = GreedyStrategy::new(50);
    assert_eq!(greedy.optimize(&mut model), 50);
    assert_eq!(greedy.step_count(), 50);

    // cached likelihood is still exact after the capped run
    let fresh = Blockmodel::with_types(&graph, 4, model.types().to_vec()).unwrap();
    assert_abs_diff_eq!(model.log_likelihood(), fresh.log_likelihood(), epsilon = 1e-9);
}

#[test]
fn long_chain_keeps_the_cached_likelihood_exact() {
    let (graph, _) = four_cliques();
    let mut sampler = MetropolisHastingsStrategy::new(SmallRng::seed_from_u64(17));
    let mut model = Blockmodel::new(&graph, 4).unwrap();
    model.randomize(sampler.rng_mut());

    for round in 0..20 {
        for _ in 0..500 {
            sampler.step(&mut model);
        }
        let fresh = Blockmodel::with_types(&graph, 4, model.types().to_vec()).unwrap();
        assert_abs_diff_eq!(model.log_likelihood(), fresh.log_likelihood(), epsilon = 1e-7);
        assert!(model.recompute() < 1e-7, "round {}", round);
    }
    assert_eq!(sampler.step_count(), 10_000);
    assert!(sampler.acceptance_ratio() > 0.0 && sampler.acceptance_ratio() < 1.0);
}

fn quick_options() -> FitOptions {
    FitOptions {
        num_samples: 256,
        block_size: 4096,
        log_period: 1024,
        seed: 7,
        ..FitOptions::default()
    }
}

#[test]
fn single_block_fit_runs_to_completion() {
    let (graph, _) = two_rings();
    let options = FitOptions {
        num_groups: Some(1),
        block_size: 64,
        ..quick_options()
    };
    let mut on_dump = |_: &Blockmodel<'_>| -> anyhow::Result<()> { Ok(()) };
    let mut fitter =
        BlockmodelFitter::new(&graph, options, Interrupts::new(), &mut on_dump).unwrap();
    let outcome = fitter.fit().unwrap();

    assert!(!outcome.interrupted);
    assert_eq!(outcome.scores.len(), 1);
    assert_eq!(outcome.model.num_types(), 1);
    assert!(outcome.model.types().iter().all(|&t| t == 0));

    // 10 edges among 45 pairs
    let p = 10.0f64 / 45.0;
    assert_abs_diff_eq!(
        outcome.model.log_likelihood(),
        10.0 * p.ln() + 35.0 * (1.0 - p).ln(),
        epsilon = 1e-9
    );
}

#[test]
fn sweep_selects_the_minimum_aic_candidate() {
    let (graph, _) = two_rings();
    let options = FitOptions {
        max_groups: Some(3),
        ..quick_options()
    };
    let mut on_dump = |_: &Blockmodel<'_>| -> anyhow::Result<()> { Ok(()) };
    let mut fitter =
        BlockmodelFitter::new(&graph, options, Interrupts::new(), &mut on_dump).unwrap();
    let outcome = fitter.fit().unwrap();

    let ks: Vec<usize> = outcome.scores.iter().map(|s| s.num_types).collect();
    assert_eq!(ks, vec![2, 3]);

    let best = outcome
        .scores
        .iter()
        .min_by(|a, b| a.aic.total_cmp(&b.aic))
        .unwrap();
    assert_eq!(outcome.model.num_types(), best.num_types);

    // sampling after selection only ever improves on the selected model
    assert!(aic(&outcome.model) <= best.aic + 1e-9);
}

#[test]
fn dump_requests_reach_the_callback() {
    let (graph, _) = two_rings();
    let options = FitOptions {
        num_groups: Some(1),
        block_size: 64,
        init_method: InitMethod::Random,
        ..quick_options()
    };
    let interrupts = Interrupts::new();
    interrupts.request_dump();

    let mut dumped = vec![];
    let mut on_dump = |model: &Blockmodel<'_>| -> anyhow::Result<()> {
        dumped.push(model.types().to_vec());
        Ok(())
    };
    let mut fitter = BlockmodelFitter::new(&graph, options, interrupts, &mut on_dump).unwrap();
    fitter.fit().unwrap();

    assert_eq!(dumped, vec![vec![0; 10]]);
}

#[test]
fn stop_request_ends_an_unbounded_run() {
    let (graph, _) = two_rings();
    let options = FitOptions {
        num_groups: Some(2),
        num_samples: 0,
        ..quick_options()
    };
    let interrupts = Interrupts::new();
    interrupts.request_dump();

    let stopper = interrupts.clone();
    let mut on_dump = |_: &Blockmodel<'_>| -> anyhow::Result<()> {
        stopper.request_stop();
        Ok(())
    };
    let mut fitter = BlockmodelFitter::new(&graph, options, interrupts, &mut on_dump).unwrap();
    let outcome = fitter.fit().unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.model.num_types(), 2);
    let fresh = Blockmodel::with_types(&graph, 2, outcome.model.types().to_vec()).unwrap();
    assert_abs_diff_eq!(outcome.model.log_likelihood(), fresh.log_likelihood(), epsilon = 1e-9);
}

#[test]
fn dump_errors_are_propagated() {
    let (graph, _) = two_rings();
    let options = FitOptions {
        num_groups: Some(1),
        block_size: 64,
        ..quick_options()
    };
    let interrupts = Interrupts::new();
    interrupts.request_dump();

    let mut on_dump =
        |_: &Blockmodel<'_>| -> anyhow::Result<()> { Err(anyhow::anyhow!("broken pipe")) };
    let mut fitter = BlockmodelFitter::new(&graph, options, interrupts, &mut on_dump).unwrap();
    assert!(fitter.fit().is_err());
}
