// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;

use lutresub::cut_resub::{cut_resub, ResubStats};
use lutresub::map_record::MapSummary;
use lutresub::min_depth::{MinDepthAnalyzer, MinDepthReport};
use lutresub::problem::load_problem;

/// Reduces the LUT count of the mapping given in a JSON problem file.
#[derive(Parser, Debug)]
struct Args {
    /// Allowed growth of the mapped depth; omit for no depth constraint.
    #[arg(long)]
    slack: Option<usize>,

    /// Also report the minimum achievable depth for the problem's k.
    #[arg(long, default_value_t = false)]
    min_depth: bool,

    /// Print a JSON report on stdout instead of a text summary.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// The path to the JSON problem file.
    input: PathBuf,
}

#[derive(Debug, Serialize)]
struct Report {
    name: String,
    k: usize,
    before: MapSummary,
    after: MapSummary,
    resub: ResubStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_depth: Option<MinDepthReport>,
    mapping: BTreeMap<String, Vec<String>>,
}

fn run(args: &Args) -> Result<Report> {
    let problem = load_problem(&args.input)?;
    let before = problem
        .maprec
        .summary(&problem.graph, &problem.holder)
        .ok_or_else(|| anyhow!("starting mapping leaves a reachable node without a cut"))?;

    let mut maprec = problem.maprec.clone();
    let resub = cut_resub(&problem.graph, &problem.holder, &mut maprec, args.slack);
    let after = maprec
        .summary(&problem.graph, &problem.holder)
        .ok_or_else(|| anyhow!("optimized mapping leaves a reachable node without a cut"))?;
    log::info!(
        "{}: luts {} -> {}, depth {} -> {}",
        problem.graph.name(),
        before.lut_num,
        after.lut_num,
        before.depth,
        after.depth
    );

    let min_depth = if args.min_depth {
        Some(MinDepthAnalyzer::new(&problem.graph).report(problem.k))
    } else {
        None
    };

    let mapping = problem.used_cuts(&maprec);
    Ok(Report {
        name: problem.graph.name().to_string(),
        k: problem.k,
        before,
        after,
        resub,
        min_depth,
        mapping,
    })
}

fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();
    let args = Args::parse();

    let report = run(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}: k={}", report.name, report.k);
    println!(
        "  before: {} LUTs, depth {}",
        report.before.lut_num, report.before.depth
    );
    println!(
        "  after:  {} LUTs, depth {} ({} substitutions)",
        report.after.lut_num, report.after.depth, report.resub.substitutions
    );
    if let Some(md) = &report.min_depth {
        println!("  minimum depth: {}", md.max_depth);
    }
    for (node, leaves) in &report.mapping {
        println!("  {} <- {}", node, leaves.join(" "));
    }
    Ok(())
}
