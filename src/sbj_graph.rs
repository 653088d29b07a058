// SPDX-License-Identifier: Apache-2.0

//! Subject graph: the network of 2-input logic nodes that LUT mapping covers
//! with cuts.
//!
//! Nodes live in a single dense arena indexed by `SbjRef::id`; inputs, logic
//! nodes and outputs share that id space. Nodes can only be added after their
//! fanins exist, so creation order is always a topological order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SbjRef {
    pub id: usize,
}

/// A fanin reference: the driving node and whether it is used inverted.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SbjFanin {
    pub node: SbjRef,
    pub inverted: bool,
}

impl SbjFanin {
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            node: self.node,
            inverted: !self.inverted,
        }
    }
}

impl From<SbjRef> for SbjFanin {
    fn from(node: SbjRef) -> Self {
        SbjFanin {
            node,
            inverted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    And,
    Xor,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DffRole {
    DataInput,
    DataOutput,
    Clock,
    Clear,
    Preset,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatchRole {
    DataInput,
    DataOutput,
    Enable,
    Clear,
    Preset,
}

/// What an input or output node stands for in the surrounding design.
///
/// The data outputs of DFFs and latches are pseudo primary inputs; every other
/// DFF/latch pin is a pseudo primary output.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoInfo {
    Port { name: String, bit: usize },
    Dff { index: usize, role: DffRole },
    Latch { index: usize, role: LatchRole },
}

impl IoInfo {
    pub fn port(name: &str, bit: usize) -> Self {
        IoInfo::Port {
            name: name.to_string(),
            bit,
        }
    }

    /// Returns true if a node with this role drives logic (i.e. is an input
    /// from the combinational point of view).
    pub fn is_source(&self) -> bool {
        match self {
            IoInfo::Port { .. } => true,
            IoInfo::Dff { role, .. } => *role == DffRole::DataOutput,
            IoInfo::Latch { role, .. } => *role == LatchRole::DataOutput,
        }
    }
}

impl std::fmt::Display for IoInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            IoInfo::Port { name, bit } => write!(f, "{}[{}]", name, bit),
            IoInfo::Dff { index, role } => write!(f, "dff{}.{:?}", index, role),
            IoInfo::Latch { index, role } => write!(f, "latch{}.{:?}", index, role),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SbjNodeKind {
    Input {
        io: IoInfo,
    },
    Logic {
        op: LogicOp,
        fanins: [SbjFanin; 2],
    },
    /// `fanin == None` is a constant-0 output; it needs no LUT.
    Output {
        io: IoInfo,
        fanin: Option<SbjFanin>,
    },
}

/// A fanout edge: `to` uses this node as its fanin number `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbjEdge {
    pub to: SbjRef,
    pub pos: usize,
}

#[derive(Debug, Clone)]
pub struct SbjNode {
    id: usize,
    kind: SbjNodeKind,
    level: usize,
    pomark: bool,
    fanouts: Vec<SbjEdge>,
}

impl SbjNode {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn sbj_ref(&self) -> SbjRef {
        SbjRef { id: self.id }
    }

    pub fn kind(&self) -> &SbjNodeKind {
        &self.kind
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, SbjNodeKind::Input { .. })
    }

    pub fn is_logic(&self) -> bool {
        matches!(self.kind, SbjNodeKind::Logic { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self.kind, SbjNodeKind::Output { .. })
    }

    /// Longest path (in logic nodes) from any input.
    pub fn level(&self) -> usize {
        self.level
    }

    /// True if this node drives at least one output.
    pub fn pomark(&self) -> bool {
        self.pomark
    }

    /// Fanin `pos` of a logic node.
    pub fn fanin(&self, pos: usize) -> SbjFanin {
        match &self.kind {
            SbjNodeKind::Logic { fanins, .. } => fanins[pos],
            _ => panic!("fanin({}) requested on non-logic node {}", pos, self.id),
        }
    }

    pub fn fanins(&self) -> Vec<SbjFanin> {
        match &self.kind {
            SbjNodeKind::Logic { fanins, .. } => fanins.to_vec(),
            SbjNodeKind::Output {
                fanin: Some(fanin), ..
            } => vec![*fanin],
            _ => vec![],
        }
    }

    /// Driver of an output node (`None` for constant outputs).
    pub fn output_fanin(&self) -> Option<SbjFanin> {
        match &self.kind {
            SbjNodeKind::Output { fanin, .. } => *fanin,
            _ => panic!("output_fanin() requested on non-output node {}", self.id),
        }
    }

    pub fn io_info(&self) -> Option<&IoInfo> {
        match &self.kind {
            SbjNodeKind::Input { io } | SbjNodeKind::Output { io, .. } => Some(io),
            SbjNodeKind::Logic { .. } => None,
        }
    }

    pub fn fanout_list(&self) -> &[SbjEdge] {
        &self.fanouts
    }
}

#[derive(Debug, Clone, Default)]
pub struct SbjGraph {
    name: String,
    nodes: Vec<SbjNode>,
    inputs: Vec<SbjRef>,
    outputs: Vec<SbjRef>,
    logic: Vec<SbjRef>,
    level: usize,
}

impl SbjGraph {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn validate_fanin(&self, fanin: SbjFanin) {
        assert!(
            fanin.node.id < self.nodes.len(),
            "fanin %{} does not exist (node count {})",
            fanin.node.id,
            self.nodes.len()
        );
        assert!(
            !self.nodes[fanin.node.id].is_output(),
            "output node %{} cannot be used as a fanin",
            fanin.node.id
        );
    }

    fn push_node(&mut self, kind: SbjNodeKind, level: usize) -> SbjRef {
        let id = self.nodes.len();
        self.nodes.push(SbjNode {
            id,
            kind,
            level,
            pomark: false,
            fanouts: Vec::new(),
        });
        SbjRef { id }
    }

    pub fn add_input(&mut self, io: IoInfo) -> SbjRef {
        assert!(io.is_source(), "{} cannot drive logic", io);
        let r = self.push_node(SbjNodeKind::Input { io }, 0);
        self.inputs.push(r);
        r
    }

    pub fn add_logic(&mut self, op: LogicOp, fanin0: SbjFanin, fanin1: SbjFanin) -> SbjRef {
        self.validate_fanin(fanin0);
        self.validate_fanin(fanin1);
        let level = 1 + std::cmp::max(
            self.nodes[fanin0.node.id].level,
            self.nodes[fanin1.node.id].level,
        );
        let r = self.push_node(
            SbjNodeKind::Logic {
                op,
                fanins: [fanin0, fanin1],
            },
            level,
        );
        self.nodes[fanin0.node.id].fanouts.push(SbjEdge { to: r, pos: 0 });
        self.nodes[fanin1.node.id].fanouts.push(SbjEdge { to: r, pos: 1 });
        self.logic.push(r);
        self.level = std::cmp::max(self.level, level);
        r
    }

    pub fn add_and(&mut self, fanin0: SbjFanin, fanin1: SbjFanin) -> SbjRef {
        self.add_logic(LogicOp::And, fanin0, fanin1)
    }

    pub fn add_xor(&mut self, fanin0: SbjFanin, fanin1: SbjFanin) -> SbjRef {
        self.add_logic(LogicOp::Xor, fanin0, fanin1)
    }

    pub fn add_output(&mut self, io: IoInfo, fanin: Option<SbjFanin>) -> SbjRef {
        assert!(
            matches!(io, IoInfo::Port { .. }) || !io.is_source(),
            "{} cannot be an output",
            io
        );
        let level = match fanin {
            Some(fanin) => {
                self.validate_fanin(fanin);
                self.nodes[fanin.node.id].level
            }
            None => 0,
        };
        let r = self.push_node(SbjNodeKind::Output { io, fanin }, level);
        if let Some(fanin) = fanin {
            let driver = &mut self.nodes[fanin.node.id];
            driver.pomark = true;
            driver.fanouts.push(SbjEdge { to: r, pos: 0 });
        }
        self.outputs.push(r);
        r
    }

    pub fn node(&self, r: SbjRef) -> &SbjNode {
        &self.nodes[r.id]
    }

    pub fn nodes(&self) -> &[SbjNode] {
        &self.nodes
    }

    /// One past the largest node id.
    pub fn node_num(&self) -> usize {
        self.nodes.len()
    }

    pub fn input_num(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, pos: usize) -> &SbjNode {
        &self.nodes[self.inputs[pos].id]
    }

    pub fn inputs(&self) -> &[SbjRef] {
        &self.inputs
    }

    pub fn output_num(&self) -> usize {
        self.outputs.len()
    }

    pub fn output(&self, pos: usize) -> &SbjNode {
        &self.nodes[self.outputs[pos].id]
    }

    pub fn outputs(&self) -> &[SbjRef] {
        &self.outputs
    }

    pub fn logic_num(&self) -> usize {
        self.logic.len()
    }

    pub fn logic(&self, pos: usize) -> &SbjNode {
        &self.nodes[self.logic[pos].id]
    }

    /// Logic nodes in topological (creation) order.
    pub fn logic_nodes(&self) -> &[SbjRef] {
        &self.logic
    }

    /// Maximum level over all nodes.
    pub fn level(&self) -> usize {
        self.level
    }
}
