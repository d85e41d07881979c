// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An explicit task graph of pure operations over shared data handles.
//!
//! A [`TaskGraph`] is an append-only list of nodes. Each node is a pure
//! operation plus the handles of its inputs and a declared output arity, so
//! the graph is acyclic by construction: a node can only reference nodes
//! added before it. Construction is single-threaded and side-effect-free;
//! evaluation is delegated to an [`Evaluator`] (a single-threaded reference
//! implementation, or a worker pool). Values flowing along edges are behind
//! [`std::sync::Arc`], so fan-out never copies payloads; a node that wants to
//! mutate takes its own copy first.

mod error;
mod evaluator;
#[cfg(test)]
mod tests;

pub use error::GraphError;
pub use evaluator::{Evaluator, PoolEvaluator, SerialEvaluator};

use std::fmt;
use std::sync::Arc;

use crate::{
    gains::GainTable, image::Image, image::SumWeights, skymodel_cal::CalWindow,
    srclist::SkyModel, vis::Visibility,
};

pub type NodeId = usize;

/// One output port of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) node: NodeId,
    pub(crate) port: usize,
}

/// A freshly-added node. Multi-output nodes hand out one [`Handle`] per
/// port.
#[derive(Clone, Copy, Debug)]
pub struct NodeRef {
    node: NodeId,
    nout: usize,
}

impl NodeRef {
    /// The handle of output `port`.
    pub fn out(&self, port: usize) -> Handle {
        assert!(
            port < self.nout,
            "port {port} out of range for a node with {} outputs",
            self.nout
        );
        Handle {
            node: self.node,
            port,
        }
    }

    /// The handle of a single-output node.
    pub fn single(&self) -> Handle {
        assert_eq!(self.nout, 1, "node has {} outputs, not 1", self.nout);
        self.out(0)
    }
}

/// A value on a graph edge.
#[derive(Clone, Debug)]
pub enum Value {
    Vis(Arc<Visibility>),
    Img(Arc<Image>),
    Weights(Arc<SumWeights>),
    Gains(Arc<GainTable>),
    Sky(Arc<SkyModel>),
    Window(Arc<CalWindow>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Visibility,
    Image,
    SumWeights,
    GainTable,
    SkyModel,
    CalWindow,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ValueKind::Visibility => "visibility",
            ValueKind::Image => "image",
            ValueKind::SumWeights => "sum-of-weights",
            ValueKind::GainTable => "gain table",
            ValueKind::SkyModel => "sky model",
            ValueKind::CalWindow => "calibration window",
        };
        f.write_str(s)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Vis(_) => ValueKind::Visibility,
            Value::Img(_) => ValueKind::Image,
            Value::Weights(_) => ValueKind::SumWeights,
            Value::Gains(_) => ValueKind::GainTable,
            Value::Sky(_) => ValueKind::SkyModel,
            Value::Window(_) => ValueKind::CalWindow,
        }
    }

    pub fn as_vis(&self) -> Result<&Visibility, GraphError> {
        match self {
            Value::Vis(v) => Ok(v),
            other => Err(GraphError::WrongValueKind {
                expected: ValueKind::Visibility,
                got: other.kind(),
            }),
        }
    }

    pub fn as_image(&self) -> Result<&Image, GraphError> {
        match self {
            Value::Img(v) => Ok(v),
            other => Err(GraphError::WrongValueKind {
                expected: ValueKind::Image,
                got: other.kind(),
            }),
        }
    }

    pub fn as_weights(&self) -> Result<&SumWeights, GraphError> {
        match self {
            Value::Weights(v) => Ok(v),
            other => Err(GraphError::WrongValueKind {
                expected: ValueKind::SumWeights,
                got: other.kind(),
            }),
        }
    }

    pub fn as_gains(&self) -> Result<&GainTable, GraphError> {
        match self {
            Value::Gains(v) => Ok(v),
            other => Err(GraphError::WrongValueKind {
                expected: ValueKind::GainTable,
                got: other.kind(),
            }),
        }
    }

    pub fn as_sky(&self) -> Result<&SkyModel, GraphError> {
        match self {
            Value::Sky(v) => Ok(v),
            other => Err(GraphError::WrongValueKind {
                expected: ValueKind::SkyModel,
                got: other.kind(),
            }),
        }
    }

    pub fn as_window(&self) -> Result<&CalWindow, GraphError> {
        match self {
            Value::Window(v) => Ok(v),
            other => Err(GraphError::WrongValueKind {
                expected: ValueKind::CalWindow,
                got: other.kind(),
            }),
        }
    }
}

impl From<Visibility> for Value {
    fn from(v: Visibility) -> Value {
        Value::Vis(Arc::new(v))
    }
}

impl From<Image> for Value {
    fn from(v: Image) -> Value {
        Value::Img(Arc::new(v))
    }
}

impl From<SumWeights> for Value {
    fn from(v: SumWeights) -> Value {
        Value::Weights(Arc::new(v))
    }
}

impl From<GainTable> for Value {
    fn from(v: GainTable) -> Value {
        Value::Gains(Arc::new(v))
    }
}

impl From<SkyModel> for Value {
    fn from(v: SkyModel) -> Value {
        Value::Sky(Arc::new(v))
    }
}

impl From<CalWindow> for Value {
    fn from(v: CalWindow) -> Value {
        Value::Window(Arc::new(v))
    }
}

pub(crate) type NodeOp = Arc<dyn Fn(&[Value]) -> Result<Vec<Value>, GraphError> + Send + Sync>;

pub(crate) struct TaskNode {
    pub(crate) label: String,
    pub(crate) inputs: Vec<Handle>,
    pub(crate) nout: usize,
    pub(crate) op: NodeOp,
}

/// The DAG under construction. See the module documentation.
#[derive(Default)]
pub struct TaskGraph {
    pub(crate) nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> TaskGraph {
        TaskGraph::default()
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Introduce a constant into the graph.
    pub fn input(&mut self, label: &str, value: Value) -> Handle {
        self.add(label, 1, &[], move |_| Ok(vec![value.clone()]))
            .single()
    }

    /// Schedule a pure operation over earlier nodes' outputs, declaring how
    /// many outputs it produces. The handles passed in must come from this
    /// graph; anything else is a programmer error.
    pub fn add<F>(&mut self, label: &str, nout: usize, inputs: &[Handle], op: F) -> NodeRef
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, GraphError> + Send + Sync + 'static,
    {
        assert!(nout > 0, "a node must have at least one output");
        for h in inputs {
            assert!(
                h.node < self.nodes.len(),
                "input handle references node {} but the graph has {}",
                h.node,
                self.nodes.len()
            );
            assert!(
                h.port < self.nodes[h.node].nout,
                "input handle references port {} of node '{}' which has {} outputs",
                h.port,
                self.nodes[h.node].label,
                self.nodes[h.node].nout
            );
        }
        let node = self.nodes.len();
        self.nodes.push(TaskNode {
            label: label.to_string(),
            inputs: inputs.to_vec(),
            nout,
            op: Arc::new(op),
        });
        NodeRef { node, nout }
    }

    /// The label of the node a handle points at. Useful in diagnostics.
    pub fn label(&self, handle: Handle) -> &str {
        &self.nodes[handle.node].label
    }

    /// The set of node ids reachable from `targets`, as a membership vector.
    pub(crate) fn reachable(&self, targets: &[Handle]) -> Vec<bool> {
        let mut needed = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = targets.iter().map(|h| h.node).collect();
        while let Some(id) = stack.pop() {
            if needed[id] {
                continue;
            }
            needed[id] = true;
            stack.extend(self.nodes[id].inputs.iter().map(|h| h.node));
        }
        needed
    }
}
