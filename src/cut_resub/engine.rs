// SPDX-License-Identifier: Apache-2.0

//! Cut resubstitution: greedy LUT-count reduction over an existing mapping.
//!
//! A LUT (work node) can be removed when every LUT that consumes it can switch
//! to an alternative cut that avoids it. Candidates are visited in decreasing
//! order of gain (the number of LUTs that disappear with it), and each accepted
//! substitution is followed by an incremental re-derivation of gain, level and
//! required level driven by three level-bucketed work queues.
//!
//! Only the nodes reachable from the outputs through the current mapping get a
//! work node; everything else is invisible to the optimization.

use std::collections::HashMap;

use serde::Serialize;

use crate::cut::{CutHolder, CutRef};
use crate::cut_resub::heap::GainHeap;
use crate::cut_resub::level_queue::LevelQueue;
use crate::cut_resub::node::{Flag, WorkPool, WorkRef, UNCONSTRAINED};
use crate::map_record::MapRecord;
use crate::sbj_graph::{SbjGraph, SbjRef};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResubStats {
    /// Live LUTs before the improvement loop.
    pub lut_before: usize,
    /// Live LUTs after the improvement loop.
    pub lut_after: usize,
    pub substitutions: usize,
    pub deleted_nodes: usize,
    /// Largest LUT level of the starting mapping.
    pub max_level: usize,
    pub has_level_constraint: bool,
}

pub struct CutResubEngine<'a> {
    graph: &'a SbjGraph,
    holder: &'a CutHolder,
    slack: Option<usize>,

    pool: WorkPool,
    /// Subject node id -> live work node.
    node_array: Vec<Option<WorkRef>>,
    heap: GainHeap,
    /// Gain recompute queue.
    gq: LevelQueue<WorkRef>,
    /// Level recompute queue.
    lq: LevelQueue<WorkRef>,
    /// Required-level recompute queue.
    rq: LevelQueue<WorkRef>,

    /// Non-input work nodes in discovery (topological) order.
    root_list: Vec<WorkRef>,
    deleted_cuts: Vec<CutRef>,
    deleted_nodes: Vec<WorkRef>,
    max_level: usize,
    po_req_level: usize,
    stats: ResubStats,
}

impl<'a> CutResubEngine<'a> {
    /// `slack == None` disables the level constraint; `Some(s)` allows the
    /// mapped depth to grow by at most `s` over the starting mapping.
    pub fn new(graph: &'a SbjGraph, holder: &'a CutHolder, slack: Option<usize>) -> Self {
        let max_size = graph.level();
        Self {
            graph,
            holder,
            slack,
            pool: WorkPool::new(),
            node_array: Vec::new(),
            heap: GainHeap::new(),
            gq: LevelQueue::new(max_size),
            lq: LevelQueue::new(max_size),
            rq: LevelQueue::new(max_size),
            root_list: Vec::new(),
            deleted_cuts: Vec::new(),
            deleted_nodes: Vec::new(),
            max_level: 0,
            po_req_level: UNCONSTRAINED,
            stats: ResubStats::default(),
        }
    }

    pub fn has_level_constraint(&self) -> bool {
        self.slack.is_some()
    }

    /// Runs the whole optimization, rewriting the cuts in `maprec`.
    pub fn resub(&mut self, maprec: &mut MapRecord) -> ResubStats {
        self.build(maprec);
        self.compute_initial();
        self.improve();
        self.finalize(maprec);
        log::debug!(
            "cut_resub: luts {} -> {} substitutions={} deleted={} max_level={} slack={:?}",
            self.stats.lut_before,
            self.stats.lut_after,
            self.stats.substitutions,
            self.stats.deleted_nodes,
            self.stats.max_level,
            self.slack
        );
        self.stats.clone()
    }

    fn live(&self, sbj: SbjRef) -> Option<WorkRef> {
        self.node_array[sbj.id]
    }

    fn cut_root(&self, cut: CutRef) -> WorkRef {
        let root = self.holder.cut(cut).root();
        self.live(root)
            .unwrap_or_else(|| panic!("cut root %{} has no live work node", root.id))
    }

    /// Work node of a leaf of a cut that is in use; such leaves are always live.
    fn used_leaf(&self, sbj: SbjRef) -> WorkRef {
        self.live(sbj)
            .unwrap_or_else(|| panic!("leaf %{} of a live cut has no work node", sbj.id))
    }

    fn current_cut(&self, node: WorkRef) -> CutRef {
        self.pool[node].cut().unwrap_or_else(|| {
            panic!(
                "work node for %{} has no current cut",
                self.pool[node].subject().id
            )
        })
    }

    fn alloc_node(&mut self, sbj: SbjRef) -> WorkRef {
        let node = self.pool.alloc();
        self.pool[node].set_subject(self.graph.node(sbj));
        self.node_array[sbj.id] = Some(node);
        node
    }

    fn free_node(&mut self, node: WorkRef) {
        let sbj = self.pool[node].subject();
        self.node_array[sbj.id] = None;
        self.pool.free(node);
    }

    /// Creates work nodes for the inputs and for everything the current
    /// mapping reaches from the outputs.
    pub(crate) fn build(&mut self, maprec: &MapRecord) {
        let graph = self.graph;
        self.node_array.clear();
        self.node_array.resize(graph.node_num(), None);
        self.stats = ResubStats {
            has_level_constraint: self.has_level_constraint(),
            ..Default::default()
        };

        for input in graph.inputs() {
            self.alloc_node(*input);
        }
        for output in graph.outputs() {
            let Some(fanin) = graph.node(*output).output_fanin() else {
                continue;
            };
            if !graph.node(fanin.node).is_input() {
                self.back_trace(fanin.node, maprec, None);
            }
        }
    }

    fn back_trace(&mut self, sbj: SbjRef, maprec: &MapRecord, from: Option<WorkRef>) {
        let node = match self.live(sbj) {
            Some(node) => node,
            None => {
                let holder = self.holder;
                let node = self.alloc_node(sbj);
                let cut = maprec.get_cut(sbj).unwrap_or_else(|| {
                    panic!(
                        "logic node %{} is reachable from an output but has no cut",
                        sbj.id
                    )
                });
                assert_eq!(
                    holder.cut(cut).root(),
                    sbj,
                    "mapping assigns a cut rooted elsewhere to %{}",
                    sbj.id
                );
                self.pool[node].set_cut(cut);
                for leaf in holder.cut(cut).inputs() {
                    if !self.graph.node(*leaf).is_input() {
                        self.back_trace(*leaf, maprec, Some(node));
                    }
                }
                node
            }
        };
        if let Some(from) = from {
            self.pool[node].add_fanout(from);
        }
    }

    /// Levels, alternative cuts, gains, heap contents and (when constrained)
    /// required levels of the freshly built work graph.
    pub(crate) fn compute_initial(&mut self) {
        let graph = self.graph;
        let holder = self.holder;

        self.root_list.clear();
        self.max_level = 0;
        for sbj in graph.logic_nodes() {
            let Some(node) = self.live(*sbj) else {
                continue;
            };
            self.root_list.push(node);

            let cut = self.current_cut(node);
            let level = 1 + holder
                .cut(cut)
                .inputs()
                .iter()
                .map(|leaf| &self.pool[self.used_leaf(*leaf)])
                .filter(|inode| !inode.is_input())
                .map(|inode| inode.level())
                .max()
                .unwrap_or(0);
            self.pool[node].set_level(level);
            self.max_level = std::cmp::max(self.max_level, level);

            let alt_cuts: Vec<CutRef> = holder
                .cut_list(*sbj)
                .iter()
                .copied()
                .filter(|c| *c != cut)
                .filter(|c| {
                    holder
                        .cut(*c)
                        .inputs()
                        .iter()
                        .all(|leaf| self.live(*leaf).is_some())
                })
                .collect();
            self.pool[node].alt_cuts = alt_cuts;
        }
        self.stats.lut_before = self.root_list.len();
        self.stats.max_level = self.max_level;

        self.heap.init(self.root_list.len());
        for i in 0..self.root_list.len() {
            let node = self.root_list[i];
            let gain = self.calc_gain(node);
            self.pool[node].set_gain(gain);
            if self.check_structure(node) {
                self.heap.put(&mut self.pool, node);
            }
        }
        log::debug!(
            "cut_resub: built {} LUTs, {} candidates, max_level={}",
            self.root_list.len(),
            self.heap.len(),
            self.max_level
        );

        if let Some(slack) = self.slack {
            self.po_req_level = self.max_level + slack;
            for i in (0..self.root_list.len()).rev() {
                let node = self.root_list[i];
                let req = self.required_from_fanouts(node);
                self.pool[node].set_req_level(req);
            }
        }
    }

    /// Number of LUTs that disappear together with `node`: itself plus every
    /// leaf LUT used by nothing else, recursively.
    pub(crate) fn calc_gain(&self, node: WorkRef) -> usize {
        if self.pool[node].is_output() {
            return 0;
        }
        let cut = self.holder.cut(self.current_cut(node));
        let mut gain = 1;
        for leaf in cut.inputs() {
            let inode = &self.pool[self.used_leaf(*leaf)];
            if !inode.is_input() && inode.fanout_list().len() == 1 {
                gain += inode.gain();
            }
        }
        gain
    }

    fn required_from_fanouts(&self, node: WorkRef) -> usize {
        let fanouts = self.pool[node].fanout_list();
        if fanouts.is_empty() {
            if self.pool[node].is_output() {
                return self.po_req_level;
            }
            log::warn!(
                "cut_resub: %{} has no fanout and drives no output; leaving its required level unconstrained",
                self.pool[node].subject().id
            );
            return UNCONSTRAINED;
        }
        let min_req = fanouts
            .iter()
            .map(|fo| self.pool[*fo].req_level())
            .min()
            .unwrap_or(UNCONSTRAINED);
        if min_req == UNCONSTRAINED {
            UNCONSTRAINED
        } else {
            min_req.saturating_sub(1)
        }
    }

    /// True if `cut` has no missing leaf and does not use `node`.
    fn avoids(&self, cut: CutRef, node: WorkRef) -> bool {
        self.holder
            .cut(cut)
            .inputs()
            .iter()
            .all(|leaf| matches!(self.live(*leaf), Some(inode) if inode != node))
    }

    /// Structural pre-check: every consumer of `node` has at least one
    /// alternative cut that does not use it.
    fn check_structure(&self, node: WorkRef) -> bool {
        if self.pool[node].is_output() {
            return false;
        }
        self.pool[node].fanout_list().iter().all(|fo| {
            self.pool[*fo]
                .alt_cuts()
                .iter()
                .any(|cut| self.avoids(*cut, node))
        })
    }

    /// First-fit replacement cuts making `node` redundant, one per consumer.
    fn find_subst(&self, node: WorkRef, subst_list: &mut Vec<CutRef>) -> bool {
        subst_list.clear();
        for fo in self.pool[node].fanout_list() {
            let found = self.pool[*fo]
                .alt_cuts()
                .iter()
                .copied()
                .find(|cut| self.avoids(*cut, node));
            match found {
                Some(cut) => subst_list.push(cut),
                None => return false,
            }
        }
        true
    }

    /// Like `find_subst`, but each consumer takes the lowest-level alternative
    /// that still meets its required level.
    ///
    /// The consumers are locked and visited by increasing subject level, so a
    /// consumer feeding another one already has its prospective level in
    /// `tmp_level` when the second one is evaluated.
    fn find_subst2(&mut self, node: WorkRef, subst_list: &mut Vec<CutRef>) -> bool {
        subst_list.clear();

        let mut fo_list: Vec<WorkRef> = self.pool[node].fanout_list().to_vec();
        for fo in &fo_list {
            self.pool[*fo].set_flag(Flag::Locked);
        }
        fo_list.sort_by_key(|fo| self.pool[*fo].subject_level());
        let floor = fo_list
            .first()
            .map_or(0, |fo| self.pool[*fo].subject_level());

        let holder = self.holder;
        let mut memo: HashMap<WorkRef, usize> = HashMap::new();
        let mut ans = true;
        for fo in &fo_list {
            let mut best: Option<(CutRef, usize)> = None;
            'cuts: for cut in self.pool[*fo].alt_cuts() {
                let mut level = 0;
                for leaf in holder.cut(*cut).inputs() {
                    let inode = match self.live(*leaf) {
                        Some(inode) if inode != node => inode,
                        _ => continue 'cuts,
                    };
                    level = std::cmp::max(level, self.prospective_level(inode, floor, &mut memo));
                }
                level += 1;
                if level > self.pool[*fo].req_level() {
                    continue;
                }
                if best.map_or(true, |(_, best_level)| best_level > level) {
                    best = Some((*cut, level));
                }
            }
            match best {
                Some((cut, level)) => {
                    subst_list.push(cut);
                    self.pool[*fo].tmp_level = level;
                }
                None => {
                    ans = false;
                    break;
                }
            }
        }

        for fo in &fo_list {
            self.pool[*fo].clear_flag(Flag::Locked);
        }
        ans
    }

    /// Level `node` will have once every locked node has switched to the cut
    /// giving it `tmp_level`.
    ///
    /// Only nodes above `floor` (the lowest subject level among the locked
    /// nodes) can sit in the fanout cone of a locked node; everything else
    /// keeps its level.
    fn prospective_level(
        &self,
        node: WorkRef,
        floor: usize,
        memo: &mut HashMap<WorkRef, usize>,
    ) -> usize {
        let n = &self.pool[node];
        if n.is_locked() {
            return n.tmp_level;
        }
        if n.is_input() || n.subject_level() <= floor {
            return n.level();
        }
        if let Some(level) = memo.get(&node) {
            return *level;
        }
        let cut = self.holder.cut(self.current_cut(node));
        let mut level = 0;
        for leaf in cut.inputs() {
            let inode = self.used_leaf(*leaf);
            level = std::cmp::max(level, self.prospective_level(inode, floor, memo));
        }
        level += 1;
        memo.insert(node, level);
        level
    }

    /// Pops candidates until the heap runs dry, committing every substitution
    /// that is found.
    pub(crate) fn improve(&mut self) {
        let mut subst_list: Vec<CutRef> = Vec::new();
        while let Some(node) = self.heap.get(&mut self.pool) {
            if self.pool[node].gain() == 0 {
                continue;
            }
            let found = if self.has_level_constraint() {
                self.find_subst2(node, &mut subst_list)
            } else {
                self.find_subst(node, &mut subst_list)
            };
            if found {
                log::trace!(
                    "cut_resub: removing %{} (gain {}) via {} substitutions",
                    self.pool[node].subject().id,
                    self.pool[node].gain(),
                    subst_list.len()
                );
                self.update(&subst_list);
                self.stats.substitutions += 1;
            }
        }
    }

    /// Commits the substitutions in `subst_list`, removes the LUTs that become
    /// dangling, and brings gain/level/required level back up to date.
    fn update(&mut self, subst_list: &[CutRef]) {
        let holder = self.holder;
        self.gq.clear();
        self.lq.clear();
        self.rq.clear();

        self.deleted_cuts.clear();
        for new_cut in subst_list {
            let root = self.cut_root(*new_cut);
            let old_cut = self.current_cut(root);
            self.subst_cut_fanouts(root, old_cut, *new_cut);
            self.pool[root].set_cut(*new_cut);
            self.deleted_cuts.push(old_cut);
            self.put_gq(root);
            self.put_lq(root);
        }

        self.deleted_nodes.clear();
        for i in 0..self.deleted_cuts.len() {
            let cut = self.deleted_cuts[i];
            for leaf in holder.cut(cut).inputs() {
                let inode = self.used_leaf(*leaf);
                self.mark_if_dangling(inode);
            }
        }
        while let Some(dead) = self.deleted_nodes.pop() {
            log::trace!(
                "cut_resub: deleting dangling %{}",
                self.pool[dead].subject().id
            );
            let cut = self.current_cut(dead);
            for leaf in holder.cut(cut).inputs() {
                let inode = self.used_leaf(*leaf);
                if self.pool[inode].is_input() {
                    continue;
                }
                self.pool[inode].delete_fanout(dead);
                if let [fo] = self.pool[inode].fanout_list() {
                    let fo = *fo;
                    self.put_gq(fo);
                }
                self.put_rq(inode);
                self.mark_if_dangling(inode);
            }
            self.heap.remove(&mut self.pool, dead);
            self.free_node(dead);
            self.stats.deleted_nodes += 1;
        }

        while let Some(node) = self.get_gq() {
            if self.pool[node].deleted() {
                continue;
            }
            let new_gain = self.calc_gain(node);
            if self.pool[node].gain() != new_gain {
                self.heap.update(&mut self.pool, node, new_gain);
                if let [fo] = self.pool[node].fanout_list() {
                    let fo = *fo;
                    self.put_gq(fo);
                }
            }
        }

        if self.has_level_constraint() {
            while let Some(node) = self.get_lq() {
                if self.pool[node].deleted() {
                    continue;
                }
                let cut = holder.cut(self.current_cut(node));
                let level = 1 + cut
                    .inputs()
                    .iter()
                    .map(|leaf| self.pool[self.used_leaf(*leaf)].level())
                    .max()
                    .unwrap_or(0);
                if self.pool[node].level() != level {
                    self.pool[node].set_level(level);
                    for i in 0..self.pool[node].fanout_list().len() {
                        let fo = self.pool[node].fanout_list()[i];
                        self.put_lq(fo);
                    }
                }
            }

            while let Some(node) = self.get_rq() {
                if self.pool[node].deleted() {
                    continue;
                }
                let req = self.required_from_fanouts(node);
                if self.pool[node].req_level() != req {
                    self.pool[node].set_req_level(req);
                    let cut = holder.cut(self.current_cut(node));
                    for leaf in cut.inputs() {
                        let inode = self.used_leaf(*leaf);
                        if !self.pool[inode].is_input() {
                            self.put_rq(inode);
                        }
                    }
                }
            }
        }

        if cfg!(debug_assertions) {
            if let Err(e) = self.check_consistency() {
                panic!("cut_resub: inconsistent work graph after update: {}", e);
            }
        }
    }

    fn mark_if_dangling(&mut self, inode: WorkRef) {
        let n = &self.pool[inode];
        if !n.is_input() && !n.is_output() && !n.deleted() && n.fanout_list().is_empty() {
            self.pool[inode].set_flag(Flag::Deleted);
            self.deleted_nodes.push(inode);
        }
    }

    /// Rewires fanout lists for `node` switching from `old_cut` to `new_cut`.
    fn subst_cut_fanouts(&mut self, node: WorkRef, old_cut: CutRef, new_cut: CutRef) {
        let holder = self.holder;
        let old_leaves: Vec<WorkRef> = holder
            .cut(old_cut)
            .inputs()
            .iter()
            .map(|l| self.used_leaf(*l))
            .collect();
        let new_leaves: Vec<WorkRef> = holder
            .cut(new_cut)
            .inputs()
            .iter()
            .map(|l| self.used_leaf(*l))
            .collect();

        for inode in &old_leaves {
            self.pool[*inode].set_flag(Flag::OldMark);
        }
        for inode in &new_leaves {
            self.pool[*inode].set_flag(Flag::NewMark);
        }

        // Leaves that are dropped.
        for inode in &old_leaves {
            let n = &self.pool[*inode];
            if n.is_input() || n.flag(Flag::NewMark) {
                continue;
            }
            self.pool[*inode].delete_fanout(node);
            if let [fo] = self.pool[*inode].fanout_list() {
                let fo = *fo;
                self.put_gq(fo);
            }
            self.put_rq(*inode);
        }

        // Leaves that are added.
        for inode in &new_leaves {
            let n = &self.pool[*inode];
            if n.is_input() || n.flag(Flag::OldMark) {
                continue;
            }
            if self.pool[*inode].add_fanout(node) {
                if let [first, _] = self.pool[*inode].fanout_list() {
                    let first = *first;
                    self.put_gq(first);
                }
                self.put_gq(node);
                self.put_rq(*inode);
            }
        }

        for inode in &old_leaves {
            self.pool[*inode].clear_flag(Flag::OldMark);
        }
        for inode in &new_leaves {
            self.pool[*inode].clear_flag(Flag::NewMark);
        }
    }

    fn put_gq(&mut self, node: WorkRef) {
        let n = &self.pool[node];
        if !n.is_output() && !n.flag(Flag::InGQ) {
            let level = n.subject_level();
            self.pool[node].set_flag(Flag::InGQ);
            self.gq.put(node, level);
        }
    }

    fn get_gq(&mut self) -> Option<WorkRef> {
        let node = self.gq.getmin()?;
        self.pool[node].clear_flag(Flag::InGQ);
        Some(node)
    }

    fn put_lq(&mut self, node: WorkRef) {
        if !self.pool[node].flag(Flag::InLQ) {
            let level = self.pool[node].subject_level();
            self.pool[node].set_flag(Flag::InLQ);
            self.lq.put(node, level);
        }
    }

    fn get_lq(&mut self) -> Option<WorkRef> {
        let node = self.lq.getmin()?;
        self.pool[node].clear_flag(Flag::InLQ);
        Some(node)
    }

    fn put_rq(&mut self, node: WorkRef) {
        if !self.pool[node].flag(Flag::InRQ) {
            let level = self.pool[node].subject_level();
            self.pool[node].set_flag(Flag::InRQ);
            self.rq.put(node, level);
        }
    }

    fn get_rq(&mut self) -> Option<WorkRef> {
        let node = self.rq.getmin()?;
        self.pool[node].clear_flag(Flag::InRQ);
        Some(node)
    }

    /// Writes the surviving cuts back and releases every work node.
    pub(crate) fn finalize(&mut self, maprec: &mut MapRecord) {
        let mut lut_after = 0;
        for id in 0..self.node_array.len() {
            let Some(node) = self.node_array[id] else {
                continue;
            };
            if let Some(cut) = self.pool[node].cut() {
                maprec.set_cut(self.pool[node].subject(), cut);
                lut_after += 1;
            }
            self.free_node(node);
        }
        self.stats.lut_after = lut_after;
        self.node_array.clear();
        self.root_list.clear();
    }

    /// Checks that every live cut's leaves list the cut's root as a fanout and
    /// that every fanout edge is backed by a live cut.
    pub fn check_consistency(&self) -> Result<(), String> {
        let holder = self.holder;
        for (id, slot) in self.node_array.iter().enumerate() {
            let Some(node) = *slot else {
                continue;
            };
            let n = &self.pool[node];
            if n.deleted() {
                return Err(format!("%{} is live but marked deleted", id));
            }
            if n.subject().id != id {
                return Err(format!("%{} maps to a work node for %{}", id, n.subject().id));
            }
            for (i, fo) in n.fanout_list().iter().enumerate() {
                if n.fanout_list()[..i].contains(fo) {
                    return Err(format!("%{} lists a fanout twice", id));
                }
                let fo_node = &self.pool[*fo];
                if self.live(fo_node.subject()) != Some(*fo) {
                    return Err(format!(
                        "%{} has dead fanout %{}",
                        id,
                        fo_node.subject().id
                    ));
                }
                let uses = fo_node
                    .cut()
                    .map_or(false, |c| holder.cut(c).contains(n.subject()));
                if !uses {
                    return Err(format!(
                        "%{} lists fanout %{} whose cut does not use it",
                        id,
                        fo_node.subject().id
                    ));
                }
            }
            let Some(cut) = n.cut() else {
                continue;
            };
            for leaf in holder.cut(cut).inputs() {
                let Some(inode) = self.live(*leaf) else {
                    return Err(format!("%{} uses dead leaf %{}", id, leaf.id));
                };
                let inode = &self.pool[inode];
                if !inode.is_input() && !inode.fanout_list().contains(&node) {
                    return Err(format!(
                        "leaf %{} of %{} does not list it as a fanout",
                        leaf.id, id
                    ));
                }
            }
        }
        Ok(())
    }

    /// Live non-input work nodes, in subject id order.
    #[cfg(test)]
    pub(crate) fn live_luts(&self) -> Vec<WorkRef> {
        self.node_array
            .iter()
            .flatten()
            .copied()
            .filter(|n| !self.pool[*n].is_input())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &WorkPool {
        &self.pool
    }

    #[cfg(test)]
    pub(crate) fn work_node(&self, sbj: SbjRef) -> Option<WorkRef> {
        self.live(sbj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{and3_problem, random_problem, TestProblem};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_and3_collapses_to_one_lut() {
        let TestProblem {
            graph,
            holder,
            mut maprec,
        } = and3_problem();
        let g1 = graph.logic(0).sbj_ref();
        let g2 = graph.logic(1).sbj_ref();
        let wide = holder.cut_list(g2)[1];

        let mut engine = CutResubEngine::new(&graph, &holder, None);
        engine.build(&maprec);
        engine.compute_initial();
        let n1 = engine.work_node(g1).unwrap();
        let n2 = engine.work_node(g2).unwrap();
        assert_eq!(engine.pool()[n1].gain(), 1);
        assert_eq!(engine.pool()[n2].gain(), 0);
        assert_eq!(engine.pool()[n1].fanout_list(), &[n2]);
        assert_eq!(engine.pool()[n2].alt_cuts(), &[wide]);
        assert_eq!(engine.pool()[n2].level(), 2);

        engine.improve();
        assert_eq!(engine.work_node(g1), None);
        assert_eq!(engine.live_luts(), vec![n2]);
        assert_eq!(engine.pool()[n2].cut(), Some(wide));
        engine.check_consistency().unwrap();

        engine.finalize(&mut maprec);
        assert_eq!(maprec.get_cut(g2), Some(wide));
        assert_eq!(maprec.estimate(&graph, &holder), Some(1));
    }

    #[test]
    fn test_and3_resub_stats() {
        let TestProblem {
            graph,
            holder,
            mut maprec,
        } = and3_problem();
        let stats = CutResubEngine::new(&graph, &holder, None).resub(&mut maprec);
        assert_eq!(
            stats,
            ResubStats {
                lut_before: 2,
                lut_after: 1,
                substitutions: 1,
                deleted_nodes: 1,
                max_level: 2,
                has_level_constraint: false,
            }
        );
    }

    #[test]
    fn test_and3_with_zero_slack_still_collapses() {
        // The 3-input cut has level 1, below the required level 2.
        let TestProblem {
            graph,
            holder,
            mut maprec,
        } = and3_problem();
        let stats = CutResubEngine::new(&graph, &holder, Some(0)).resub(&mut maprec);
        assert_eq!(stats.lut_after, 1);
        assert_eq!(maprec.depth(&graph, &holder), Some(1));
    }

    #[test]
    fn test_gain_is_idempotent() {
        let p = random_problem(3, 8, 60, 4, 4);
        let mut engine = CutResubEngine::new(&p.graph, &p.holder, None);
        engine.build(&p.maprec);
        engine.compute_initial();
        for node in engine.live_luts() {
            let g1 = engine.calc_gain(node);
            let g2 = engine.calc_gain(node);
            assert_eq!(g1, g2);
            assert_eq!(g1, engine.pool()[node].gain());
        }
    }

    #[test_case(2, None; "seed 2 unconstrained")]
    #[test_case(7, None; "seed 7 unconstrained")]
    #[test_case(13, Some(0); "seed 13 slack 0")]
    #[test_case(21, Some(1); "seed 21 slack 1")]
    #[test_case(34, Some(3); "seed 34 slack 3")]
    fn test_gains_stay_current_after_every_update(seed: u64, slack: Option<usize>) {
        let p = random_problem(seed, 12, 120, 8, 5);
        let mut engine = CutResubEngine::new(&p.graph, &p.holder, slack);
        engine.build(&p.maprec);
        engine.compute_initial();
        let mut subst_list: Vec<CutRef> = Vec::new();
        let mut updates = 0;
        while let Some(node) = engine.heap.get(&mut engine.pool) {
            if engine.pool[node].gain() == 0 {
                continue;
            }
            let found = if engine.has_level_constraint() {
                engine.find_subst2(node, &mut subst_list)
            } else {
                engine.find_subst(node, &mut subst_list)
            };
            if !found {
                continue;
            }
            engine.update(&subst_list);
            updates += 1;
            for n in engine.live_luts() {
                assert_eq!(
                    engine.pool[n].gain(),
                    engine.calc_gain(n),
                    "%{} after update {}",
                    engine.pool[n].subject().id,
                    updates
                );
            }
            assert!(engine.heap.check_invariant(&engine.pool));
        }
    }

    #[test]
    fn test_required_levels_are_assigned_after_build() {
        let p = random_problem(11, 10, 80, 6, 4);
        let mut engine = CutResubEngine::new(&p.graph, &p.holder, Some(1));
        engine.build(&p.maprec);
        engine.compute_initial();
        for node in engine.live_luts() {
            let n = &engine.pool()[node];
            assert_ne!(n.req_level(), UNCONSTRAINED);
            assert!(n.level() <= n.req_level());
        }
    }

    #[test]
    fn test_dangling_node_gets_unconstrained_required_level() {
        // Unreachable through back tracing; force it by detaching a node's
        // only consumer edge by hand.
        let TestProblem {
            graph,
            holder,
            maprec,
        } = and3_problem();
        let mut engine = CutResubEngine::new(&graph, &holder, Some(0));
        engine.build(&maprec);
        let n1 = engine.work_node(graph.logic(0).sbj_ref()).unwrap();
        let n2 = engine.work_node(graph.logic(1).sbj_ref()).unwrap();
        engine.pool[n1].delete_fanout(n2);
        engine.compute_initial();
        assert_eq!(engine.pool()[n1].req_level(), UNCONSTRAINED);
        assert_eq!(engine.pool()[n2].req_level(), 2);
    }

    #[test_case(1; "seed 1")]
    #[test_case(2; "seed 2")]
    #[test_case(5; "seed 5")]
    #[test_case(8; "seed 8")]
    fn test_random_resub_keeps_work_graph_consistent(seed: u64) {
        let p = random_problem(seed, 12, 120, 8, 5);
        let mut engine = CutResubEngine::new(&p.graph, &p.holder, None);
        engine.build(&p.maprec);
        engine.compute_initial();
        engine.check_consistency().unwrap();
        let before = engine.live_luts().len();
        engine.improve();
        engine.check_consistency().unwrap();
        assert!(engine.live_luts().len() <= before);
        assert!(engine.heap.is_empty());
    }

    #[test_case(1, 0; "seed 1 slack 0")]
    #[test_case(4, 0; "seed 4 slack 0")]
    #[test_case(6, 1; "seed 6 slack 1")]
    #[test_case(9, 2; "seed 9 slack 2")]
    fn test_random_resub_honors_required_levels(seed: u64, slack: usize) {
        let p = random_problem(seed, 12, 120, 8, 5);
        let mut engine = CutResubEngine::new(&p.graph, &p.holder, Some(slack));
        engine.build(&p.maprec);
        engine.compute_initial();
        let max_level = engine.max_level;
        engine.improve();
        engine.check_consistency().unwrap();
        for node in engine.live_luts() {
            let n = &engine.pool()[node];
            assert!(
                n.level() <= n.req_level(),
                "%{} level {} exceeds required {}",
                n.subject().id,
                n.level(),
                n.req_level()
            );
            assert!(n.level() <= max_level + slack);
        }
    }
}
