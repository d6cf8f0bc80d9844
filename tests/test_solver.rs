//! End-to-end runs of the solver.

pub mod common;

use common::{bbry_example, edge_shape, path_example, triangle_shape, Blue, Red};
use petgraph::graph::NodeIndex;

use graphwfc::{EntropyMode, Outcome, WfcError, WfcOptions, WfcState};

fn options(seed: u64) -> WfcOptions {
    WfcOptions {
        seed,
        ..WfcOptions::default()
    }
}

/// Runs with resets until done; panics if no attempt within the cap
/// succeeds.
fn run_to_done<C, E, Ty>(state: &mut WfcState<C, E, Ty>, attempts: usize)
where
    C: Clone + Eq + std::hash::Hash,
    E: Clone,
    Ty: petgraph::EdgeType,
{
    for _ in 0..attempts {
        match state.run(-1) {
            Outcome::Done => return,
            Outcome::Failed(_) => state.reset().unwrap(),
            Outcome::Paused => unreachable!("unbounded budget cannot pause"),
        }
    }
    panic!("no attempt out of {attempts} succeeded");
}

/// A long path gets fully colored, and every edge carries a pattern
/// from the example.
#[test]
fn path_induction() {
    let example = bbry_example();
    let shapes = [edge_shape()];
    let output = common::path_output(40);
    let mut state = WfcState::with_options(&output, &example, &shapes, options(7))
        .unwrap_or_else(|e| panic!("construction failed: {e}"));

    run_to_done(&mut state, 2000);

    let table = state.pattern_table();
    let colored = state.graph();
    assert_eq!(colored.node_count(), 40);
    for node in colored.node_indices() {
        assert!(colored[node].is_some(), "node {} stayed uncolored", node.index());
    }
    for edge in colored.edge_indices() {
        let (a, b) = colored.edge_endpoints(edge).unwrap();
        let pair = [colored[a].unwrap(), colored[b].unwrap()];
        assert!(
            table.count_of(0, &pair) > 0,
            "edge carries unseen pattern {pair:?}"
        );
    }
}

/// On a triangle the example's pairs admit only a handful of
/// colorings; some seeds dead-end, some finish, and the all-blue
/// solution shows up among the finishers.
#[test]
fn triangle_forces_failures_and_all_blue() {
    let example = bbry_example();
    let shapes = [edge_shape()];
    let output = common::triangle_output();

    let mut saw_failure = false;
    let mut saw_done = false;
    let mut saw_all_blue = false;
    for seed in 0..60 {
        let mut state =
            WfcState::with_options(&output, &example, &shapes, options(seed)).unwrap();
        match state.run(-1) {
            Outcome::Done => {
                saw_done = true;
                let table = state.pattern_table();
                let colored = state.graph();
                for edge in colored.edge_indices() {
                    let (a, b) = colored.edge_endpoints(edge).unwrap();
                    let pair = [colored[a].unwrap(), colored[b].unwrap()];
                    assert!(table.count_of(0, &pair) > 0);
                }
                if colored.node_weights().all(|&c| c == Some(Blue)) {
                    saw_all_blue = true;
                }
            }
            Outcome::Failed(location) => {
                saw_failure = true;
                assert_eq!(state.last_contradiction(), Some(location));
            }
            Outcome::Paused => unreachable!(),
        }
    }
    assert!(saw_failure, "no seed ran into a dead end");
    assert!(saw_done, "no seed finished");
    assert!(saw_all_blue, "no seed reached the all-blue coloring");
}

/// Nodes outside every occurrence are removed from the working graph
/// and never colored.
#[test]
fn isolated_nodes_are_invisible() {
    let example = bbry_example();
    let shapes = [edge_shape()];
    let mut output = common::path_output(2);
    let isolated = output.add_node(None);

    let mut state = WfcState::with_options(&output, &example, &shapes, options(1)).unwrap();
    assert_eq!(state.invisible_nodes(), &[isolated][..]);
    assert_eq!(state.graph().node_count(), 2);

    run_to_done(&mut state, 100);
    assert!(state.graph().node_weights().all(|c| c.is_some()));
}

/// A shape that never occurs in the output makes every node invisible;
/// the run finishes immediately without assigning anything.
#[test]
fn absent_shape_finishes_empty() {
    // a colored triangle as the example, so the shape has patterns
    let mut example = common::Example::new_undirected();
    let a = example.add_node(Blue);
    let b = example.add_node(Red);
    let c = example.add_node(Blue);
    example.add_edge(a, b, ());
    example.add_edge(b, c, ());
    example.add_edge(c, a, ());

    // the output path contains no triangle
    let output = common::path_output(4);
    let mut state =
        WfcState::with_options(&output, &example, &[triangle_shape()], options(0)).unwrap();

    assert_eq!(state.invisible_nodes().len(), 4);
    assert_eq!(state.graph().node_count(), 0);
    assert_eq!(state.run(-1), Outcome::Done);
    assert_eq!(state.iteration_count(), 1);
}

/// With a single pattern everything is pinned by the initial
/// propagation already.
#[test]
fn single_pattern_pins_at_reset() {
    let example = path_example(&[Blue, Blue]);
    let shapes = [edge_shape()];
    let output = common::path_output(5);
    let mut state = WfcState::with_options(&output, &example, &shapes, options(3)).unwrap();

    assert_eq!(state.entropy_sum(), 0.0);
    for node in state.graph().node_indices() {
        assert_eq!(state.color_of(node), Some(&Blue));
    }
    assert_eq!(state.run(-1), Outcome::Done);
    assert_eq!(state.iteration_count(), 1);
}

/// A preset color outside the extracted universe is rejected at
/// construction, naming the node.
#[test]
fn preset_color_outside_universe() {
    let example = path_example(&[Red, Red]);
    let shapes = [edge_shape()];
    let mut output = common::triangle_output();
    output[NodeIndex::new(0)] = Some(Blue);

    match WfcState::with_options(&output, &example, &shapes, options(0)) {
        Err(WfcError::UnknownPresetColor { node }) => assert_eq!(node.index(), 0),
        other => panic!("expected UnknownPresetColor, got {:?}", other.map(|_| ())),
    }
}

/// A preset color inside the universe but incompatible with the
/// patterns surfaces as an unsolvable input.
#[test]
fn contradictory_preset_is_unsolvable() {
    let example = path_example(&[Blue, Red]);
    let shapes = [edge_shape()];
    let mut output = common::path_output(2);
    output[NodeIndex::new(0)] = Some(Blue);
    output[NodeIndex::new(1)] = Some(Blue);

    match WfcState::with_options(&output, &example, &shapes, options(0)) {
        Err(WfcError::Unsolvable { .. }) => {}
        other => panic!("expected Unsolvable, got {:?}", other.map(|_| ())),
    }
}

/// A consistent preset simply pins its node.
#[test]
fn consistent_preset_survives() {
    let example = bbry_example();
    let shapes = [edge_shape()];
    let mut output = common::path_output(6);
    output[NodeIndex::new(3)] = Some(Blue);

    let mut state = WfcState::with_options(&output, &example, &shapes, options(11)).unwrap();
    assert_eq!(state.color_of(NodeIndex::new(3)), Some(&Blue));
    run_to_done(&mut state, 500);
    assert_eq!(state.graph()[NodeIndex::new(3)], Some(Blue));
}

/// The entropy sum drops strictly at every observation and does not
/// grow across propagation (Shannon mode).
#[test]
fn entropy_decreases_along_a_run() {
    let example = bbry_example();
    let shapes = [edge_shape()];
    let output = common::path_output(12);
    let mut state = WfcState::with_options(
        &output,
        &example,
        &shapes,
        WfcOptions {
            seed: 5,
            entropy: EntropyMode::Shannon,
        },
    )
    .unwrap();

    'attempt: for _ in 0..100 {
        loop {
            let before = state.entropy_sum();
            let Some(iso) = state.observe() else {
                break 'attempt;
            };
            let pinned = state.entropy_sum();
            assert!(pinned < before, "observation did not reduce entropy");
            let seeds = state.iso_nodes(iso).to_vec();
            match state.propagate(seeds) {
                Ok(()) => assert!(
                    state.entropy_sum() <= pinned + 1e-9,
                    "propagation raised the entropy sum"
                ),
                Err(_) => {
                    state.reset().unwrap();
                    continue 'attempt;
                }
            }
        }
    }
    assert_eq!(state.entropy_sum(), 0.0);
    assert!(state.graph().node_weights().all(|c| c.is_some()));
}
