// SPDX-License-Identifier: Apache-2.0

//! The mapping record: which cut (LUT) implements each subject node.

use serde::Serialize;

use crate::cut::{CutHolder, CutRef};
use crate::sbj_graph::{SbjGraph, SbjRef};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MapSummary {
    pub lut_num: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MapRecord {
    cuts: Vec<Option<CutRef>>,
}

impl MapRecord {
    pub fn new(graph: &SbjGraph) -> Self {
        let mut r = Self::default();
        r.init(graph);
        r
    }

    /// Clears all cut assignments and sizes the record for `graph`.
    pub fn init(&mut self, graph: &SbjGraph) {
        self.cuts.clear();
        self.cuts.resize(graph.node_num(), None);
    }

    pub fn set_cut(&mut self, node: SbjRef, cut: CutRef) {
        self.cuts[node.id] = Some(cut);
    }

    pub fn clear_cut(&mut self, node: SbjRef) {
        self.cuts[node.id] = None;
    }

    pub fn get_cut(&self, node: SbjRef) -> Option<CutRef> {
        self.cuts[node.id]
    }

    /// Estimates the LUT count of the mapping by tracing back from the
    /// outputs.
    ///
    /// A logic node demanded in both polarities (plain by some LUT leaf or
    /// output, inverted by another output) costs two LUTs; an output driven by
    /// an inverted input costs one inverter LUT. Returns `None` when a logic
    /// node reachable from an output has no cut.
    pub fn estimate(&self, graph: &SbjGraph, holder: &CutHolder) -> Option<usize> {
        // map_count[id][polarity]
        let mut map_count: Vec<[usize; 2]> = vec![[0, 0]; graph.node_num()];
        for input in graph.inputs() {
            map_count[input.id][0] = 1;
        }

        let mut lut_num = 0;
        let mut worklist: Vec<(SbjRef, bool)> = Vec::new();
        for output in graph.outputs() {
            let Some(fanin) = graph.node(*output).output_fanin() else {
                continue;
            };
            let driver = graph.node(fanin.node);
            if driver.is_input() {
                if fanin.inverted && map_count[fanin.node.id][1] == 0 {
                    map_count[fanin.node.id][1] = 1;
                    lut_num += 1;
                }
                continue;
            }
            worklist.push((fanin.node, fanin.inverted));
        }

        while let Some((node, inv)) = worklist.pop() {
            let idx = usize::from(inv);
            map_count[node.id][idx] += 1;
            if map_count[node.id][idx] > 1 || graph.node(node).is_input() {
                continue;
            }
            let cut = holder.cut(self.get_cut(node)?);
            lut_num += 1;
            for leaf in cut.inputs() {
                worklist.push((*leaf, false));
            }
        }
        Some(lut_num)
    }

    /// Depth of the mapped LUT network: inputs are at depth 0 and each LUT is
    /// one deeper than its deepest leaf. Returns `None` under the same
    /// condition as `estimate`.
    pub fn depth(&self, graph: &SbjGraph, holder: &CutHolder) -> Option<usize> {
        let mut reachable = vec![false; graph.node_num()];
        let mut worklist: Vec<SbjRef> = graph
            .outputs()
            .iter()
            .filter_map(|o| graph.node(*o).output_fanin())
            .map(|f| f.node)
            .collect();
        while let Some(node) = worklist.pop() {
            if reachable[node.id] || graph.node(node).is_input() {
                continue;
            }
            reachable[node.id] = true;
            let cut = holder.cut(self.get_cut(node)?);
            worklist.extend_from_slice(cut.inputs());
        }

        // Leaves of a cut are in the root's transitive fanin, so creation
        // order visits them first.
        let mut depth = vec![0usize; graph.node_num()];
        let mut max_depth = 0;
        for node in graph.logic_nodes() {
            if !reachable[node.id] {
                continue;
            }
            let cut = holder.cut(self.get_cut(*node)?);
            let d = 1 + cut.inputs().iter().map(|l| depth[l.id]).max().unwrap_or(0);
            depth[node.id] = d;
            max_depth = std::cmp::max(max_depth, d);
        }
        Some(max_depth)
    }

    pub fn summary(&self, graph: &SbjGraph, holder: &CutHolder) -> Option<MapSummary> {
        Some(MapSummary {
            lut_num: self.estimate(graph, holder)?,
            depth: self.depth(graph, holder)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbj_graph::{IoInfo, SbjFanin};

    #[test]
    fn test_estimate_and_depth_of_fanin_mapping() {
        let mut g = SbjGraph::new("t");
        let a = g.add_input(IoInfo::port("a", 0));
        let b = g.add_input(IoInfo::port("b", 0));
        let c = g.add_input(IoInfo::port("c", 0));
        let g1 = g.add_and(a.into(), b.into());
        let g2 = g.add_and(g1.into(), c.into());
        g.add_output(IoInfo::port("f", 0), Some(g2.into()));
        g.add_output(IoInfo::port("nf", 0), Some(SbjFanin::from(g2).negate()));
        g.add_output(IoInfo::port("na", 0), Some(SbjFanin::from(a).negate()));

        let mut holder = CutHolder::new(&g, 3);
        let c1 = holder.add_fanin_cut(&g, g1);
        let c2 = holder.add_fanin_cut(&g, g2);
        let wide = holder.add_cut(&g, g2, &[a, b, c]);

        let mut rec = MapRecord::new(&g);
        assert_eq!(rec.estimate(&g, &holder), None);
        rec.set_cut(g1, c1);
        rec.set_cut(g2, c2);
        // g2 twice (both polarities), g1 once, inverter on a.
        assert_eq!(
            rec.summary(&g, &holder),
            Some(MapSummary {
                lut_num: 4,
                depth: 2
            })
        );

        rec.set_cut(g2, wide);
        assert_eq!(rec.estimate(&g, &holder), Some(3));
        assert_eq!(rec.depth(&g, &holder), Some(1));
    }
}
