// SPDX-License-Identifier: Apache-2.0

//! Fixtures shared by unit tests, integration tests and benchmarks.

use std::collections::BTreeSet;

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::cut::CutHolder;
use crate::map_record::MapRecord;
use crate::sbj_graph::{IoInfo, LogicOp, SbjFanin, SbjGraph, SbjRef};

/// A subject graph together with its cuts and a starting mapping.
pub struct TestProblem {
    pub graph: SbjGraph,
    pub holder: CutHolder,
    pub maprec: MapRecord,
}

/// `f = (a & b) & c` mapped with two 2-input LUTs. `g2` also has the 3-input
/// cut `{a, b, c}` as its second cut.
pub fn and3_problem() -> TestProblem {
    let mut graph = SbjGraph::new("and3");
    let a = graph.add_input(IoInfo::port("a", 0));
    let b = graph.add_input(IoInfo::port("b", 0));
    let c = graph.add_input(IoInfo::port("c", 0));
    let g1 = graph.add_and(a.into(), b.into());
    let g2 = graph.add_and(g1.into(), c.into());
    graph.add_output(IoInfo::port("f", 0), Some(g2.into()));

    let mut holder = CutHolder::new(&graph, 3);
    holder.add_fanin_cut(&graph, g1);
    holder.add_fanin_cut(&graph, g2);
    holder.add_cut(&graph, g2, &[a, b, c]);
    let maprec = fanin_mapping(&graph, &holder);
    TestProblem {
        graph,
        holder,
        maprec,
    }
}

/// Balanced tree of 2-input ANDs over `2^m` inputs with a single output.
pub fn balanced_and_tree(m: u32) -> SbjGraph {
    let mut graph = SbjGraph::new(&format!("and_tree_{}", m));
    let mut layer: Vec<SbjRef> = (0..1usize << m)
        .map(|i| graph.add_input(IoInfo::port("x", i)))
        .collect();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| graph.add_and(pair[0].into(), pair[1].into()))
            .collect();
    }
    graph.add_output(IoInfo::port("o", 0), Some(layer[0].into()));
    graph
}

/// Picks a fanin, usually among the most recently created nodes.
fn pick_fanin<R: Rng>(rng: &mut R, pool: &[SbjRef]) -> SbjRef {
    let window = std::cmp::min(pool.len(), 24);
    if rng.gen_bool(0.7) {
        pool[pool.len() - 1 - rng.gen_range(0..window)]
    } else {
        pool[rng.gen_range(0..pool.len())]
    }
}

/// Random network of `logic` 2-input nodes over `inputs` inputs.
///
/// Fanins are biased towards recently created nodes so the graph gets some
/// depth. Every logic node nothing else uses drives an output, and the rest
/// of the `outputs` budget is spent on random logic nodes.
pub fn random_sbj_graph<R: Rng>(
    rng: &mut R,
    inputs: usize,
    logic: usize,
    outputs: usize,
) -> SbjGraph {
    assert!(inputs >= 2, "need at least two inputs");
    let mut graph = SbjGraph::new("random");
    let mut pool: Vec<SbjRef> = (0..inputs)
        .map(|i| graph.add_input(IoInfo::port("i", i)))
        .collect();
    let mut logic_nodes: Vec<SbjRef> = Vec::with_capacity(logic);
    for _ in 0..logic {
        let f0 = pick_fanin(rng, &pool);
        let mut f1 = pick_fanin(rng, &pool);
        while f1 == f0 {
            f1 = pool[rng.gen_range(0..pool.len())];
        }
        let op = if rng.gen_bool(0.85) {
            LogicOp::And
        } else {
            LogicOp::Xor
        };
        let fanin0 = SbjFanin {
            node: f0,
            inverted: rng.gen_bool(0.4),
        };
        let fanin1 = SbjFanin {
            node: f1,
            inverted: rng.gen_bool(0.4),
        };
        let r = graph.add_logic(op, fanin0, fanin1);
        pool.push(r);
        logic_nodes.push(r);
    }

    let mut driven: Vec<SbjRef> = logic_nodes
        .iter()
        .copied()
        .filter(|r| graph.node(*r).fanout_list().is_empty())
        .collect();
    while driven.len() < outputs && !logic_nodes.is_empty() {
        driven.push(logic_nodes[rng.gen_range(0..logic_nodes.len())]);
    }
    for (i, r) in driven.into_iter().enumerate() {
        let fanin = SbjFanin {
            node: r,
            inverted: rng.gen_bool(0.2),
        };
        graph.add_output(IoInfo::port("o", i), Some(fanin));
    }
    graph
}

/// Enumerates up to `max_cuts_per_node` cuts of at most `k` leaves for every
/// logic node by merging fanin cut sets bottom-up. The fanin cut always comes
/// first in each node's list.
pub fn enumerate_cuts(graph: &SbjGraph, k: usize, max_cuts_per_node: usize) -> CutHolder {
    let mut holder = CutHolder::new(graph, k);
    // Per node: its cuts including the trivial `{node}` one.
    let mut cuts_by_node: Vec<Vec<Vec<SbjRef>>> = vec![Vec::new(); graph.node_num()];
    for input in graph.inputs() {
        cuts_by_node[input.id] = vec![vec![*input]];
    }

    for r in graph.logic_nodes() {
        let fanins = graph.node(*r).fanins();
        let (a, b) = (fanins[0].node, fanins[1].node);
        let mut cuts: BTreeSet<Vec<SbjRef>> = BTreeSet::new();
        'pairs: for ca in &cuts_by_node[a.id] {
            for cb in &cuts_by_node[b.id] {
                let leaves: BTreeSet<SbjRef> = ca.iter().chain(cb.iter()).copied().collect();
                if leaves.len() > k {
                    continue;
                }
                cuts.insert(leaves.into_iter().collect());
                if cuts.len() >= max_cuts_per_node {
                    break 'pairs;
                }
            }
        }

        holder.add_fanin_cut(graph, *r);
        let mut node_cuts = vec![vec![*r]];
        for leaves in cuts {
            if holder.find_cut(*r, &leaves).is_none() {
                holder.add_cut(graph, *r, &leaves);
            }
            node_cuts.push(leaves);
        }
        cuts_by_node[r.id] = node_cuts;
    }
    holder
}

/// Maps every logic node with its fanin cut.
pub fn fanin_mapping(graph: &SbjGraph, holder: &CutHolder) -> MapRecord {
    let mut maprec = MapRecord::new(graph);
    for r in graph.logic_nodes() {
        let mut leaves: Vec<SbjRef> = graph.node(*r).fanins().iter().map(|f| f.node).collect();
        leaves.dedup();
        let cut = holder
            .find_cut(*r, &leaves)
            .unwrap_or_else(|| panic!("%{} has no fanin cut", r.id));
        maprec.set_cut(*r, cut);
    }
    maprec
}

/// A seeded random problem mapped with fanin cuts.
pub fn random_problem(
    seed: u64,
    inputs: usize,
    logic: usize,
    outputs: usize,
    k: usize,
) -> TestProblem {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let graph = random_sbj_graph(&mut rng, inputs, logic, outputs);
    let holder = enumerate_cuts(&graph, k, 12);
    let maprec = fanin_mapping(&graph, &holder);
    TestProblem {
        graph,
        holder,
        maprec,
    }
}
