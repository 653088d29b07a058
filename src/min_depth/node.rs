// SPDX-License-Identifier: Apache-2.0

//! Shadow graph used by the minimum-depth search.
//!
//! Every input and logic node of the subject graph gets an `SmdNode` at the
//! same index. A logic node owns its two fanin edges; a fanout is recorded as
//! the (to-node, fanin position) pair naming the edge it owns. Fanouts into
//! output nodes are not mirrored.

/// Names fanin edge `pos` of node `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmdEdgeRef {
    pub to: usize,
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmdEdge {
    pub from: usize,
    flow: bool,
}

impl SmdEdge {
    pub fn new(from: usize) -> Self {
        Self { from, flow: false }
    }

    pub fn flow(&self) -> bool {
        self.flow
    }

    pub fn set_flow(&mut self) {
        self.flow = true;
    }

    pub fn clear_flow(&mut self) {
        self.flow = false;
    }
}

const RMARK: u8 = 1 << 0;
const TMARK: u8 = 1 << 1;
const VMARK1: u8 = 1 << 2;
const VMARK2: u8 = 1 << 3;

#[derive(Debug, Clone, Default)]
pub struct SmdNode {
    logic: bool,
    depth: usize,
    fanins: [SmdEdge; 2],
    fanouts: Vec<SmdEdgeRef>,
    marks: u8,
}

impl SmdNode {
    pub fn new_input() -> Self {
        Self::default()
    }

    pub fn new_logic(fanin0: usize, fanin1: usize) -> Self {
        Self {
            logic: true,
            fanins: [SmdEdge::new(fanin0), SmdEdge::new(fanin1)],
            ..Default::default()
        }
    }

    pub fn is_logic(&self) -> bool {
        self.logic
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn fanin_edge(&self, pos: usize) -> &SmdEdge {
        debug_assert!(self.logic, "only logic nodes have fanin edges");
        &self.fanins[pos]
    }

    pub fn fanin_edge_mut(&mut self, pos: usize) -> &mut SmdEdge {
        debug_assert!(self.logic, "only logic nodes have fanin edges");
        &mut self.fanins[pos]
    }

    pub fn fanout_list(&self) -> &[SmdEdgeRef] {
        &self.fanouts
    }

    pub fn add_fanout(&mut self, edge: SmdEdgeRef) {
        self.fanouts.push(edge);
    }

    pub fn rmark(&self) -> bool {
        self.marks & RMARK != 0
    }

    /// Sets the range mark; returns whether it was already set.
    pub fn check_rmark(&mut self) -> bool {
        self.test_and_set(RMARK)
    }

    pub fn tmark(&self) -> bool {
        self.marks & TMARK != 0
    }

    pub fn set_tmark(&mut self) {
        self.marks |= TMARK;
    }

    /// Clears the range and target marks.
    pub fn clear_rtmark(&mut self) {
        self.marks &= !(RMARK | TMARK);
    }

    /// Sets the forward visit mark; returns whether it was already set.
    pub fn check_vmark1(&mut self) -> bool {
        self.test_and_set(VMARK1)
    }

    /// Sets the backward visit mark; returns whether it was already set.
    pub fn check_vmark2(&mut self) -> bool {
        self.test_and_set(VMARK2)
    }

    pub fn clear_vmark(&mut self) {
        self.marks &= !(VMARK1 | VMARK2);
    }

    fn test_and_set(&mut self, bit: u8) -> bool {
        let old = self.marks & bit != 0;
        self.marks |= bit;
        old
    }

    pub fn has_marks(&self) -> bool {
        self.marks != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_test_and_set() {
        let mut n = SmdNode::new_logic(0, 1);
        assert!(!n.check_rmark());
        assert!(n.check_rmark());
        assert!(!n.check_vmark1());
        assert!(!n.check_vmark2());
        assert!(n.check_vmark1());
        n.set_tmark();
        n.clear_vmark();
        assert!(n.rmark() && n.tmark());
        assert!(!n.check_vmark2());
        n.clear_vmark();
        n.clear_rtmark();
        assert!(!n.has_marks());
    }

    #[test]
    fn test_fanin_edge_flow() {
        let mut n = SmdNode::new_logic(3, 4);
        assert_eq!(n.fanin_edge(1).from, 4);
        n.fanin_edge_mut(1).set_flow();
        assert!(n.fanin_edge(1).flow());
        assert!(!n.fanin_edge(0).flow());
        n.fanin_edge_mut(1).clear_flow();
        assert!(!n.fanin_edge(1).flow());
    }
}
