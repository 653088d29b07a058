// SPDX-License-Identifier: Apache-2.0

//! LUT mapping post-optimization over a subject graph of 2-input logic nodes.
//!
//! - `cut_resub` rewrites an existing LUT mapping to use fewer LUTs,
//!   optionally without letting the mapped depth grow past a slack.
//! - `min_depth` computes the minimum LUT depth reachable at every node for
//!   a given LUT input bound.

pub mod cut;
pub mod cut_resub;
pub mod map_record;
pub mod min_depth;
pub mod problem;
pub mod sbj_graph;
pub mod test_utils;
