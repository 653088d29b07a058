// SPDX-License-Identifier: Apache-2.0

//! Minimum achievable LUT depth of every subject node.
//!
//! Nodes are labelled in topological order. A logic node whose fanins have
//! maximum depth `d` gets depth `d` if its cone has a `k`-feasible cut that
//! leaves every depth-`d` node inside the LUT, and `d + 1` otherwise. The cut
//! test counts node-disjoint paths from the inputs to the depth-`d` nodes with
//! a unit-capacity augmenting path search; more than `k` paths means no such
//! cut exists.

use serde::Serialize;

use crate::min_depth::node::{SmdEdgeRef, SmdNode};
use crate::sbj_graph::{SbjGraph, SbjNodeKind, SbjRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Arrived at the node through one of its fanin edges.
    Forward,
    /// Arrived at the node by cancelling flow on one of its fanout edges.
    Backward,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutputDepth {
    pub name: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MinDepthReport {
    pub k: usize,
    pub max_depth: usize,
    pub outputs: Vec<OutputDepth>,
}

pub struct MinDepthAnalyzer<'a> {
    graph: &'a SbjGraph,
    /// Indexed by subject node id; output slots are unused placeholders.
    nodes: Vec<SmdNode>,
    input_list: Vec<usize>,
    logic_list: Vec<usize>,
    /// Nodes marked by the current `find_k_cut`, for cleanup.
    node_list: Vec<usize>,
}

impl<'a> MinDepthAnalyzer<'a> {
    pub fn new(graph: &'a SbjGraph) -> Self {
        let mut nodes: Vec<SmdNode> = vec![SmdNode::default(); graph.node_num()];
        let input_list: Vec<usize> = graph.inputs().iter().map(|r| r.id).collect();
        for id in &input_list {
            nodes[*id] = SmdNode::new_input();
        }

        let mut logic_list = Vec::with_capacity(graph.logic_num());
        for r in graph.logic_nodes() {
            let SbjNodeKind::Logic { fanins, .. } = graph.node(*r).kind() else {
                unreachable!("logic list holds a non-logic node %{}", r.id);
            };
            nodes[r.id] = SmdNode::new_logic(fanins[0].node.id, fanins[1].node.id);
            logic_list.push(r.id);
        }

        for sbj in graph.nodes() {
            if sbj.is_output() {
                continue;
            }
            for edge in sbj.fanout_list() {
                if graph.node(edge.to).is_output() {
                    continue;
                }
                debug_assert_eq!(nodes[edge.to.id].fanin_edge(edge.pos).from, sbj.id());
                nodes[sbj.id()].add_fanout(SmdEdgeRef {
                    to: edge.to.id,
                    pos: edge.pos,
                });
            }
        }

        Self {
            graph,
            nodes,
            input_list,
            logic_list,
            node_list: Vec::new(),
        }
    }

    /// Computes the minimum depth of every node for LUTs of at most `k`
    /// inputs and returns the largest one.
    ///
    /// `depth_array` is resized to the node count. Output entries receive
    /// their driver's depth (0 for constant outputs).
    pub fn run(&mut self, k: usize, depth_array: &mut Vec<usize>) -> usize {
        depth_array.clear();
        depth_array.resize(self.graph.node_num(), 0);

        for node in &mut self.nodes {
            node.set_depth(0);
        }

        let mut ans = 0;
        for i in 0..self.logic_list.len() {
            let id = self.logic_list[i];
            let d0 = self.nodes[self.nodes[id].fanin_edge(0).from].depth();
            let d1 = self.nodes[self.nodes[id].fanin_edge(1).from].depth();
            let mut max_depth = std::cmp::max(d0, d1);
            if !self.find_k_cut(id, k, max_depth) {
                max_depth += 1;
            }
            self.nodes[id].set_depth(max_depth);
            depth_array[id] = max_depth;
            ans = std::cmp::max(ans, max_depth);
        }

        for output in self.graph.outputs() {
            if let Some(fanin) = self.graph.node(*output).output_fanin() {
                depth_array[output.id] = self.nodes[fanin.node.id].depth();
            }
        }
        log::debug!(
            "min_depth: k={} max_depth={} over {} logic nodes",
            k,
            ans,
            self.logic_list.len()
        );
        ans
    }

    /// Depth from the last `run`. Outputs report their driver's depth.
    pub fn node_depth(&self, node: SbjRef) -> usize {
        match self.graph.node(node).output_fanin() {
            Some(fanin) => self.nodes[fanin.node.id].depth(),
            None if self.graph.node(node).is_output() => 0,
            None => self.nodes[node.id].depth(),
        }
    }

    /// Runs the analysis and summarizes it per output.
    pub fn report(&mut self, k: usize) -> MinDepthReport {
        let mut depths = Vec::new();
        let max_depth = self.run(k, &mut depths);
        let outputs = self
            .graph
            .outputs()
            .iter()
            .map(|o| OutputDepth {
                name: self
                    .graph
                    .node(*o)
                    .io_info()
                    .map(|io| io.to_string())
                    .unwrap_or_default(),
                depth: depths[o.id],
            })
            .collect();
        MinDepthReport {
            k,
            max_depth,
            outputs,
        }
    }

    /// True if `node` has a `k`-feasible cut whose leaves are all shallower
    /// than `d`.
    fn find_k_cut(&mut self, node: usize, k: usize, d: usize) -> bool {
        if d == 0 {
            return false;
        }

        self.nodes[node].set_tmark();
        self.mark_tfi(node, d);

        let mut found = true;
        let mut count = 0;
        for i in 0..self.input_list.len() {
            let start = self.input_list[i];
            if !self.nodes[start].rmark() {
                continue;
            }
            let stat = self.dfs_fanout(start);
            for id in &self.node_list {
                self.nodes[*id].clear_vmark();
            }
            if stat {
                count += 1;
                if count > k {
                    found = false;
                    break;
                }
            }
        }

        for id in self.node_list.drain(..) {
            let n = &mut self.nodes[id];
            n.clear_rtmark();
            if n.is_logic() {
                n.fanin_edge_mut(0).clear_flow();
                n.fanin_edge_mut(1).clear_flow();
            }
        }
        found
    }

    fn mark_tfi(&mut self, node: usize, d: usize) {
        if self.nodes[node].check_rmark() {
            return;
        }
        self.node_list.push(node);
        if self.nodes[node].depth() == d {
            self.nodes[node].set_tmark();
        }
        if self.nodes[node].is_logic() {
            let f0 = self.nodes[node].fanin_edge(0).from;
            let f1 = self.nodes[node].fanin_edge(1).from;
            self.mark_tfi(f0, d);
            self.mark_tfi(f1, d);
        }
    }

    fn dfs_fanout(&mut self, node: usize) -> bool {
        for i in 0..self.nodes[node].fanout_list().len() {
            let edge = self.nodes[node].fanout_list()[i];
            if !self.nodes[edge.to].rmark() {
                continue;
            }
            if !self.nodes[edge.to].check_vmark1() && self.dfs(edge.to, Direction::Forward) {
                self.nodes[edge.to].fanin_edge_mut(edge.pos).set_flow();
                return true;
            }
        }
        false
    }

    /// Pushes back the flow arriving at `node` through fanin `pos`.
    fn reroute(&mut self, node: usize, pos: usize) -> bool {
        let from = self.nodes[node].fanin_edge(pos).from;
        if self.nodes[from].check_vmark2() {
            return false;
        }
        if self.dfs(from, Direction::Backward) {
            self.nodes[node].fanin_edge_mut(pos).clear_flow();
            return true;
        }
        false
    }

    fn dfs(&mut self, cur: usize, dir: Direction) -> bool {
        if self.nodes[cur].tmark() {
            return true;
        }

        let logic = self.nodes[cur].is_logic();
        match dir {
            Direction::Forward => {
                // A node already carrying flow can only be left by undoing it.
                if logic && self.nodes[cur].fanin_edge(0).flow() {
                    self.reroute(cur, 0)
                } else if logic && self.nodes[cur].fanin_edge(1).flow() {
                    self.reroute(cur, 1)
                } else if !self.nodes[cur].check_vmark2() {
                    self.dfs_fanout(cur)
                } else {
                    false
                }
            }
            Direction::Backward => {
                if logic && !self.nodes[cur].check_vmark1() {
                    for pos in 0..2 {
                        if self.nodes[cur].fanin_edge(pos).flow() && self.reroute(cur, pos) {
                            return true;
                        }
                    }
                }
                self.dfs_fanout(cur)
            }
        }
    }

    #[cfg(test)]
    fn is_clean(&self) -> bool {
        self.node_list.is_empty()
            && self.nodes.iter().all(|n| {
                let flows = n.is_logic() && (n.fanin_edge(0).flow() || n.fanin_edge(1).flow());
                !n.has_marks() && !flows
            })
    }
}
