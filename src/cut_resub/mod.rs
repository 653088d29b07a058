// SPDX-License-Identifier: Apache-2.0

pub mod engine;
pub mod heap;
pub mod level_queue;
pub mod node;

pub use engine::{CutResubEngine, ResubStats};

use crate::cut::CutHolder;
use crate::map_record::MapRecord;
use crate::sbj_graph::SbjGraph;

/// Rewrites `maprec` in place to use fewer LUTs.
///
/// With `slack == Some(s)` no LUT ends up deeper than the starting mapping's
/// depth plus `s`.
pub fn cut_resub(
    graph: &SbjGraph,
    holder: &CutHolder,
    maprec: &mut MapRecord,
    slack: Option<usize>,
) -> ResubStats {
    CutResubEngine::new(graph, holder, slack).resub(maprec)
}
