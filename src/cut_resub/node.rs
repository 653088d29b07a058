// SPDX-License-Identifier: Apache-2.0

//! Per-node work records for cut resubstitution and the pool they live in.

use std::ops::{Index, IndexMut};

use crate::cut::CutRef;
use crate::sbj_graph::{SbjNode, SbjRef};

/// Handle to a slot in a `WorkPool`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct WorkRef {
    pub index: usize,
}

/// Required level of a node nothing constrains.
pub const UNCONSTRAINED: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Flag {
    Input = 1 << 0,
    Output = 1 << 1,
    Deleted = 1 << 2,
    InGQ = 1 << 3,
    InLQ = 1 << 4,
    InRQ = 1 << 5,
    Locked = 1 << 6,
    OldMark = 1 << 7,
    NewMark = 1 << 8,
}

/// Independent status bits of a `WorkNode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags(u16);

impl NodeFlags {
    pub fn set(&mut self, flag: Flag) {
        self.0 |= flag as u16;
    }

    pub fn clear(&mut self, flag: Flag) {
        self.0 &= !(flag as u16);
    }

    pub fn test(&self, flag: Flag) -> bool {
        self.0 & (flag as u16) != 0
    }
}

#[derive(Debug, Clone)]
pub struct WorkNode {
    subject: SbjRef,
    subject_level: usize,
    cut: Option<CutRef>,
    pub(crate) alt_cuts: Vec<CutRef>,
    fanouts: Vec<WorkRef>,
    gain: usize,
    level: usize,
    req_level: usize,
    /// Level of the candidate cut chosen for a locked node during one
    /// level-aware search.
    pub(crate) tmp_level: usize,
    pub(crate) heap_index: Option<usize>,
    flags: NodeFlags,
}

impl Default for WorkNode {
    fn default() -> Self {
        Self {
            subject: SbjRef { id: 0 },
            subject_level: 0,
            cut: None,
            alt_cuts: Vec::new(),
            fanouts: Vec::new(),
            gain: 0,
            level: 0,
            req_level: UNCONSTRAINED,
            tmp_level: 0,
            heap_index: None,
            flags: NodeFlags::default(),
        }
    }
}

impl WorkNode {
    /// Binds this record to `node`; input/output status follow the subject.
    pub fn set_subject(&mut self, node: &SbjNode) {
        self.subject = node.sbj_ref();
        self.subject_level = node.level();
        if node.is_input() {
            self.flags.set(Flag::Input);
        }
        if node.pomark() {
            self.flags.set(Flag::Output);
        }
    }

    pub fn subject(&self) -> SbjRef {
        self.subject
    }

    pub fn subject_level(&self) -> usize {
        self.subject_level
    }

    pub fn cut(&self) -> Option<CutRef> {
        self.cut
    }

    pub fn set_cut(&mut self, cut: CutRef) {
        self.cut = Some(cut);
    }

    pub fn alt_cuts(&self) -> &[CutRef] {
        &self.alt_cuts
    }

    pub fn fanout_list(&self) -> &[WorkRef] {
        &self.fanouts
    }

    /// Adds `node` to the fanout list unless already present. Returns true if
    /// it was added.
    pub fn add_fanout(&mut self, node: WorkRef) -> bool {
        if self.fanouts.contains(&node) {
            return false;
        }
        self.fanouts.push(node);
        true
    }

    pub fn delete_fanout(&mut self, node: WorkRef) {
        self.fanouts.retain(|n| *n != node);
    }

    pub fn gain(&self) -> usize {
        self.gain
    }

    pub fn set_gain(&mut self, gain: usize) {
        self.gain = gain;
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    pub fn req_level(&self) -> usize {
        self.req_level
    }

    pub fn set_req_level(&mut self, req_level: usize) {
        self.req_level = req_level;
    }

    pub fn in_heap(&self) -> bool {
        self.heap_index.is_some()
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.test(flag)
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.flags.set(flag);
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.flags.clear(flag);
    }

    pub fn is_input(&self) -> bool {
        self.flag(Flag::Input)
    }

    /// True if the subject node drives a primary output.
    pub fn is_output(&self) -> bool {
        self.flag(Flag::Output)
    }

    pub fn deleted(&self) -> bool {
        self.flag(Flag::Deleted)
    }

    pub fn is_locked(&self) -> bool {
        self.flag(Flag::Locked)
    }
}

/// Free-list backed arena of `WorkNode`s.
///
/// Freed slots are not cleared until they are handed out again, so a freed
/// node still reports `deleted()` to anything that reaches it through a stale
/// queue entry within the same update.
#[derive(Debug, Default)]
pub struct WorkPool {
    nodes: Vec<WorkNode>,
    free_list: Vec<WorkRef>,
}

impl WorkPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> WorkRef {
        match self.free_list.pop() {
            Some(r) => {
                self.nodes[r.index] = WorkNode::default();
                r
            }
            None => {
                self.nodes.push(WorkNode::default());
                WorkRef {
                    index: self.nodes.len() - 1,
                }
            }
        }
    }

    pub fn free(&mut self, r: WorkRef) {
        debug_assert!(
            !self.free_list.contains(&r),
            "work node {:?} freed twice",
            r
        );
        self.free_list.push(r);
    }

    /// Number of slots ever allocated (live or free).
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }
}

impl Index<WorkRef> for WorkPool {
    type Output = WorkNode;

    fn index(&self, r: WorkRef) -> &WorkNode {
        &self.nodes[r.index]
    }
}

impl IndexMut<WorkRef> for WorkPool {
    fn index_mut(&mut self, r: WorkRef) -> &mut WorkNode {
        &mut self.nodes[r.index]
    }
}
