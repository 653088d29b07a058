// SPDX-License-Identifier: Apache-2.0

pub mod analyzer;
pub mod node;

pub use analyzer::{MinDepthAnalyzer, MinDepthReport, OutputDepth};
