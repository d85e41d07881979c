// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Graph evaluation strategies.
//!
//! Evaluators only run the nodes reachable from the requested targets. A
//! failing node fails the whole evaluation; there are no partial results and
//! no retries. Sibling nodes have no ordering guarantees beyond
//! producer-before-consumer.

use std::num::NonZeroUsize;
use std::thread;

use crossbeam_channel::unbounded;
use log::{debug, trace};

use super::{GraphError, Handle, NodeId, TaskGraph, Value};

pub trait Evaluator {
    /// Materialise the values of `targets`, evaluating whatever they depend
    /// on.
    fn compute(&self, graph: &TaskGraph, targets: &[Handle]) -> Result<Vec<Value>, GraphError>;
}

fn run_node(graph: &TaskGraph, id: NodeId, inputs: &[Value]) -> Result<Vec<Value>, GraphError> {
    let node = &graph.nodes[id];
    let out = (node.op)(inputs).map_err(|e| GraphError::Node {
        label: node.label.clone(),
        source: Box::new(e),
    })?;
    if out.len() != node.nout {
        return Err(GraphError::Node {
            label: node.label.clone(),
            source: Box::new(GraphError::WrongOutputArity {
                declared: node.nout,
                produced: out.len(),
            }),
        });
    }
    Ok(out)
}

fn gather_inputs(results: &[Option<Vec<Value>>], inputs: &[Handle]) -> Vec<Value> {
    inputs
        .iter()
        .map(|h| {
            results[h.node].as_ref().expect("producer ran before consumer")[h.port].clone()
        })
        .collect()
}

fn gather_targets(results: &[Option<Vec<Value>>], targets: &[Handle]) -> Vec<Value> {
    targets
        .iter()
        .map(|h| results[h.node].as_ref().expect("target was evaluated")[h.port].clone())
        .collect()
}

/// Evaluate nodes one at a time, in insertion order. The reference
/// implementation: trivially correct, deterministic, and what the tests use.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialEvaluator;

impl Evaluator for SerialEvaluator {
    fn compute(&self, graph: &TaskGraph, targets: &[Handle]) -> Result<Vec<Value>, GraphError> {
        let needed = graph.reachable(targets);
        let mut results: Vec<Option<Vec<Value>>> = vec![None; graph.nodes.len()];
        // Insertion order is a topological order.
        for id in 0..graph.nodes.len() {
            if !needed[id] {
                continue;
            }
            let inputs = gather_inputs(&results, &graph.nodes[id].inputs);
            results[id] = Some(run_node(graph, id, &inputs)?);
        }
        Ok(gather_targets(&results, targets))
    }
}

/// Evaluate independent nodes concurrently on a pool of worker threads.
///
/// A coordinator owns all mutable state (ready counts and results) and talks
/// to the workers over channels, so no locks are involved: jobs carry their
/// input values out, finished values come back, and each completion releases
/// whichever dependents became ready. On the first node failure the
/// coordinator stops handing out work and reports that failure once in-flight
/// nodes drain.
#[derive(Clone, Copy, Debug)]
pub struct PoolEvaluator {
    pub threads: NonZeroUsize,
}

impl Default for PoolEvaluator {
    fn default() -> PoolEvaluator {
        PoolEvaluator {
            threads: thread::available_parallelism()
                .unwrap_or_else(|_| NonZeroUsize::new(1).expect("1 > 0")),
        }
    }
}

impl Evaluator for PoolEvaluator {
    fn compute(&self, graph: &TaskGraph, targets: &[Handle]) -> Result<Vec<Value>, GraphError> {
        let needed = graph.reachable(targets);
        let num_needed = needed.iter().filter(|&&n| n).count();
        if num_needed == 0 {
            return Ok(vec![]);
        }

        // In-degrees and dependents, restricted to the needed subgraph. An
        // edge is counted once per input handle so that a node taking the
        // same producer twice still releases correctly.
        let mut indegree = vec![0usize; graph.nodes.len()];
        let mut dependents: Vec<Vec<NodeId>> = vec![vec![]; graph.nodes.len()];
        for (id, node) in graph.nodes.iter().enumerate() {
            if !needed[id] {
                continue;
            }
            indegree[id] = node.inputs.len();
            for h in &node.inputs {
                dependents[h.node].push(id);
            }
        }

        let num_workers = self.threads.get().min(num_needed);
        debug!("evaluating {num_needed} nodes on {num_workers} workers");

        let mut results: Vec<Option<Vec<Value>>> = vec![None; graph.nodes.len()];
        let mut first_error: Option<GraphError> = None;

        thread::scope(|scope| {
            let (tx_job, rx_job) = unbounded::<(NodeId, Vec<Value>)>();
            let (tx_done, rx_done) = unbounded::<(NodeId, Result<Vec<Value>, GraphError>)>();

            for _ in 0..num_workers {
                let rx_job = rx_job.clone();
                let tx_done = tx_done.clone();
                scope.spawn(move || {
                    for (id, inputs) in rx_job.iter() {
                        let result = run_node(graph, id, &inputs);
                        if tx_done.send((id, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(rx_job);
            drop(tx_done);

            let mut tx_job = Some(tx_job);
            let mut outstanding = 0usize;
            for id in 0..graph.nodes.len() {
                if needed[id] && indegree[id] == 0 {
                    let inputs = gather_inputs(&results, &graph.nodes[id].inputs);
                    if let Some(tx) = &tx_job {
                        tx.send((id, inputs)).expect("workers are alive");
                        outstanding += 1;
                    }
                }
            }

            while outstanding > 0 {
                let (id, result) = match rx_done.recv() {
                    Ok(done) => done,
                    // All workers died without draining the queue.
                    Err(_) => {
                        first_error.get_or_insert(GraphError::WorkerDied);
                        break;
                    }
                };
                outstanding -= 1;
                match result {
                    Ok(values) => {
                        trace!("node '{}' finished", graph.nodes[id].label);
                        results[id] = Some(values);
                        if first_error.is_none() {
                            for &dep in &dependents[id] {
                                indegree[dep] -= 1;
                                if indegree[dep] == 0 {
                                    let inputs =
                                        gather_inputs(&results, &graph.nodes[dep].inputs);
                                    if let Some(tx) = &tx_job {
                                        tx.send((dep, inputs)).expect("workers are alive");
                                        outstanding += 1;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        // Stop handing out work; drain what is in flight.
                        if first_error.is_none() {
                            first_error = Some(e);
                            tx_job = None;
                        }
                    }
                }
            }
            drop(tx_job);
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(gather_targets(&results, targets)),
        }
    }
}
