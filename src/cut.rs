// SPDX-License-Identifier: Apache-2.0

//! Cuts and the per-node cut lists.
//!
//! A cut rooted at a logic node is a set of leaf nodes such that every path
//! from an input to the root passes through a leaf; it stands for one LUT.
//! How the cut lists are computed is up to the caller: the holder is just an
//! arena plus per-root ordered lists.

use crate::sbj_graph::{SbjGraph, SbjRef};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CutRef {
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    root: SbjRef,
    inputs: Vec<SbjRef>,
}

impl Cut {
    pub fn root(&self) -> SbjRef {
        self.root
    }

    pub fn input_num(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, pos: usize) -> SbjRef {
        self.inputs[pos]
    }

    pub fn inputs(&self) -> &[SbjRef] {
        &self.inputs
    }

    pub fn contains(&self, node: SbjRef) -> bool {
        self.inputs.contains(&node)
    }
}

#[derive(Debug, Clone)]
pub struct CutHolder {
    limit: usize,
    cuts: Vec<Cut>,
    cut_lists: Vec<Vec<CutRef>>,
}

impl CutHolder {
    /// Creates an empty holder for `graph` whose cuts have at most `limit`
    /// leaves.
    pub fn new(graph: &SbjGraph, limit: usize) -> Self {
        assert!(limit >= 2, "cut input limit must be at least 2, got {}", limit);
        Self {
            limit,
            cuts: Vec::new(),
            cut_lists: vec![Vec::new(); graph.node_num()],
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total number of cuts over all roots.
    pub fn cut_num(&self) -> usize {
        self.cuts.len()
    }

    /// Appends a cut rooted at `root` with the given leaves to `root`'s list.
    ///
    /// Panics if `root` is not a logic node of `graph`, if there are more than
    /// `limit()` leaves, or if a leaf is duplicated, is the root itself, or is
    /// an output node.
    pub fn add_cut(&mut self, graph: &SbjGraph, root: SbjRef, leaves: &[SbjRef]) -> CutRef {
        assert!(
            root.id < self.cut_lists.len(),
            "cut root %{} is outside the graph this holder was built for",
            root.id
        );
        assert!(
            graph.node(root).is_logic(),
            "cut root %{} is not a logic node",
            root.id
        );
        assert!(
            !leaves.is_empty() && leaves.len() <= self.limit,
            "cut at %{} has {} leaves; limit is {}",
            root.id,
            leaves.len(),
            self.limit
        );
        for (i, leaf) in leaves.iter().enumerate() {
            assert!(
                *leaf != root,
                "cut at %{} uses its own root as a leaf",
                root.id
            );
            assert!(
                !graph.node(*leaf).is_output(),
                "cut at %{} uses output node %{} as a leaf",
                root.id,
                leaf.id
            );
            assert!(
                !leaves[..i].contains(leaf),
                "cut at %{} lists leaf %{} twice",
                root.id,
                leaf.id
            );
        }
        let r = CutRef {
            id: self.cuts.len(),
        };
        self.cuts.push(Cut {
            root,
            inputs: leaves.to_vec(),
        });
        self.cut_lists[root.id].push(r);
        r
    }

    /// Adds the trivial cut made of a logic node's two fanins, or returns the
    /// existing one if an identical cut is already listed.
    pub fn add_fanin_cut(&mut self, graph: &SbjGraph, root: SbjRef) -> CutRef {
        let node = graph.node(root);
        let mut leaves = vec![node.fanin(0).node];
        if node.fanin(1).node != leaves[0] {
            leaves.push(node.fanin(1).node);
        }
        if let Some(existing) = self.find_cut(root, &leaves) {
            return existing;
        }
        self.add_cut(graph, root, &leaves)
    }

    /// Looks up a cut at `root` with exactly the given leaf set (order
    /// insensitive).
    pub fn find_cut(&self, root: SbjRef, leaves: &[SbjRef]) -> Option<CutRef> {
        self.cut_lists[root.id].iter().copied().find(|r| {
            let cut = &self.cuts[r.id];
            cut.input_num() == leaves.len() && leaves.iter().all(|l| cut.contains(*l))
        })
    }

    pub fn cut(&self, r: CutRef) -> &Cut {
        &self.cuts[r.id]
    }

    /// The cuts rooted at `node`, in insertion order.
    pub fn cut_list(&self, node: SbjRef) -> &[CutRef] {
        &self.cut_lists[node.id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbj_graph::IoInfo;

    fn and3() -> (SbjGraph, [SbjRef; 5]) {
        let mut g = SbjGraph::new("and3");
        let a = g.add_input(IoInfo::port("a", 0));
        let b = g.add_input(IoInfo::port("b", 0));
        let c = g.add_input(IoInfo::port("c", 0));
        let g1 = g.add_and(a.into(), b.into());
        let g2 = g.add_and(g1.into(), c.into());
        g.add_output(IoInfo::port("f", 0), Some(g2.into()));
        (g, [a, b, c, g1, g2])
    }

    #[test]
    fn test_cut_lists_keep_insertion_order() {
        let (g, [a, b, c, g1, g2]) = and3();
        let mut holder = CutHolder::new(&g, 3);
        let fanin = holder.add_fanin_cut(&g, g2);
        let wide = holder.add_cut(&g, g2, &[a, b, c]);
        holder.add_fanin_cut(&g, g1);
        assert_eq!(holder.cut_list(g2), &[fanin, wide]);
        assert_eq!(holder.cut(fanin).inputs(), &[g1, c]);
        assert_eq!(holder.cut(wide).root(), g2);
        assert_eq!(holder.cut_num(), 3);
        assert_eq!(holder.add_fanin_cut(&g, g2), fanin);
        assert_eq!(holder.find_cut(g2, &[c, b, a]), Some(wide));
        assert_eq!(holder.find_cut(g2, &[a, b]), None);
    }

    #[test]
    #[should_panic(expected = "limit is 2")]
    fn test_too_many_leaves_panics() {
        let (g, [a, b, c, _g1, g2]) = and3();
        let mut holder = CutHolder::new(&g, 2);
        holder.add_cut(&g, g2, &[a, b, c]);
    }

    #[test]
    #[should_panic(expected = "twice")]
    fn test_duplicate_leaf_panics() {
        let (g, [a, _b, _c, _g1, g2]) = and3();
        let mut holder = CutHolder::new(&g, 4);
        holder.add_cut(&g, g2, &[a, a]);
    }
}
