// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use marlu::c64;

use super::*;
use crate::tests::synthetic_dataset;
use crate::vis::VisError;

fn constant(graph: &mut TaskGraph, value: f64) -> Handle {
    let mut vis = synthetic_dataset(1, 3, 1);
    vis.vis.fill(c64::new(value, 0.0));
    graph.input("constant", Value::from(vis))
}

fn add_node(graph: &mut TaskGraph, label: &str, inputs: &[Handle]) -> Handle {
    graph
        .add(label, 1, inputs, |inputs| {
            let mut accumulated = inputs[0].as_vis()?.clone();
            for v in &inputs[1..] {
                accumulated.accumulate(v.as_vis()?)?;
            }
            Ok(vec![Value::from(accumulated)])
        })
        .single()
}

fn first_value(vis: &Value) -> f64 {
    vis.as_vis().unwrap().vis[[0, 0, 0]].re
}

#[test]
fn test_serial_evaluation() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let b = constant(&mut graph, 2.0);
    let sum = add_node(&mut graph, "sum", &[a, b]);
    let total = add_node(&mut graph, "total", &[sum, a]);

    let values = SerialEvaluator.compute(&graph, &[total, sum]).unwrap();
    assert_abs_diff_eq!(first_value(&values[0]), 4.0);
    assert_abs_diff_eq!(first_value(&values[1]), 3.0);
}

#[test]
fn test_only_reachable_nodes_run() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let b = constant(&mut graph, 2.0);
    let wanted = add_node(&mut graph, "wanted", &[a]);

    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    graph.add("unwanted", 1, &[b], move |inputs| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![inputs[0].clone()])
    });

    SerialEvaluator.compute(&graph, &[wanted]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    PoolEvaluator::default().compute(&graph, &[wanted]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_multi_output_ports() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 3.0);
    let split = graph.add("split", 2, &[a], |inputs| {
        let vis = inputs[0].as_vis()?;
        let mut doubled = vis.clone();
        doubled.vis.mapv_inplace(|v| v * 2.0);
        Ok(vec![Value::from(vis.clone()), Value::from(doubled)])
    });
    let values = SerialEvaluator
        .compute(&graph, &[split.out(1), split.out(0)])
        .unwrap();
    assert_abs_diff_eq!(first_value(&values[0]), 6.0);
    assert_abs_diff_eq!(first_value(&values[1]), 3.0);
}

#[test]
fn test_wrong_output_arity_is_reported() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let bad = graph.add("bad", 2, &[a], |inputs| Ok(vec![inputs[0].clone()]));
    let result = SerialEvaluator.compute(&graph, &[bad.out(0)]);
    assert!(matches!(result, Err(GraphError::Node { .. })));
}

#[test]
fn test_node_failure_fails_the_evaluation() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let failing = graph
        .add("failing", 1, &[a], |_| {
            Err(GraphError::Vis(VisError::EmptyGather))
        })
        .single();
    let downstream = add_node(&mut graph, "downstream", &[failing]);

    for result in [
        SerialEvaluator.compute(&graph, &[downstream]),
        PoolEvaluator::default().compute(&graph, &[downstream]),
    ] {
        match result {
            Err(GraphError::Node { label, .. }) => assert_eq!(label, "failing"),
            other => panic!("expected a node failure, got {other:?}"),
        }
    }
}

#[test]
fn test_wrong_value_kind_is_reported() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let not_an_image = graph
        .add("not-an-image", 1, &[a], |inputs| {
            let image = inputs[0].as_image()?;
            Ok(vec![Value::from(image.clone())])
        })
        .single();
    let result = SerialEvaluator.compute(&graph, &[not_an_image]);
    match result {
        Err(GraphError::Node { source, .. }) => {
            assert!(matches!(*source, GraphError::WrongValueKind { .. }));
        }
        other => panic!("expected a node failure, got {other:?}"),
    }
}

#[test]
fn test_pool_matches_serial_on_a_diamond() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let left = add_node(&mut graph, "left", &[a, a]);
    let right = add_node(&mut graph, "right", &[a]);
    let join = add_node(&mut graph, "join", &[left, right]);

    let serial = SerialEvaluator.compute(&graph, &[join]).unwrap();
    let pooled = PoolEvaluator {
        threads: NonZeroUsize::new(4).unwrap(),
    }
    .compute(&graph, &[join])
    .unwrap();
    assert_abs_diff_eq!(first_value(&serial[0]), first_value(&pooled[0]));
    assert_abs_diff_eq!(first_value(&serial[0]), 3.0);
}

#[test]
fn test_wide_fan_out_through_the_pool() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let branches: Vec<Handle> = (0..32).map(|i| add_node(&mut graph, &format!("branch-{i}"), &[a])).collect();
    let join = add_node(&mut graph, "join", &branches);

    let values = PoolEvaluator::default().compute(&graph, &[join]).unwrap();
    assert_abs_diff_eq!(first_value(&values[0]), 32.0);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_dangling_port_panics_at_construction() {
    let mut graph = TaskGraph::new();
    let a = constant(&mut graph, 1.0);
    let node = graph.add("single", 1, &[a], |inputs| Ok(vec![inputs[0].clone()]));
    let _ = node.out(1);
}
