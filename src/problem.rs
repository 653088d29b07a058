// SPDX-License-Identifier: Apache-2.0

//! JSON problem files: a subject graph, its cut lists and a starting mapping.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cut::{CutHolder, CutRef};
use crate::map_record::MapRecord;
use crate::sbj_graph::{IoInfo, LogicOp, SbjFanin, SbjGraph, SbjRef};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaninEntry {
    pub node: String,
    #[serde(default)]
    pub inverted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicEntry {
    pub name: String,
    pub op: LogicOp,
    pub fanins: Vec<FaninEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputEntry {
    pub name: String,
    /// Absent means constant 0.
    #[serde(default)]
    pub fanin: Option<FaninEntry>,
}

fn default_k() -> usize {
    4
}

/// On-disk form of a problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemFile {
    pub name: String,
    #[serde(default = "default_k")]
    pub k: usize,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub logic: Vec<LogicEntry>,
    pub outputs: Vec<OutputEntry>,
    /// Extra cuts per logic node, as leaf name lists.
    #[serde(default)]
    pub cuts: BTreeMap<String, Vec<Vec<String>>>,
    /// Starting cut per logic node; unlisted nodes use their fanin cut.
    #[serde(default)]
    pub mapping: BTreeMap<String, Vec<String>>,
}

/// A loaded problem ready for the mapping algorithms.
pub struct Problem {
    pub graph: SbjGraph,
    pub holder: CutHolder,
    pub maprec: MapRecord,
    pub k: usize,
    /// Node name by subject node id.
    names: Vec<String>,
}

impl Problem {
    pub fn name_of(&self, node: SbjRef) -> &str {
        &self.names[node.id]
    }

    /// The cuts `maprec` uses for the logic nodes reachable from the outputs,
    /// keyed by root name.
    pub fn used_cuts(&self, maprec: &MapRecord) -> BTreeMap<String, Vec<String>> {
        let mut result = BTreeMap::new();
        let mut seen = vec![false; self.graph.node_num()];
        let mut worklist: Vec<SbjRef> = self
            .graph
            .outputs()
            .iter()
            .filter_map(|o| self.graph.node(*o).output_fanin())
            .map(|f| f.node)
            .collect();
        while let Some(node) = worklist.pop() {
            if seen[node.id] || self.graph.node(node).is_input() {
                continue;
            }
            seen[node.id] = true;
            let Some(cut) = maprec.get_cut(node) else {
                continue;
            };
            let leaves = self.holder.cut(cut).inputs();
            result.insert(
                self.name_of(node).to_string(),
                leaves.iter().map(|l| self.name_of(*l).to_string()).collect(),
            );
            worklist.extend_from_slice(leaves);
        }
        result
    }
}

pub fn load_problem(path: &Path) -> Result<Problem> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading problem file {}", path.display()))?;
    let file: ProblemFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing problem file {}", path.display()))?;
    file.build()
        .with_context(|| format!("building problem from {}", path.display()))
}

/// Checks that `leaves` is a cut of `root`: every leaf lies in the transitive
/// fanin of `root`, and every path from `root` down to a primary input passes
/// through a leaf.
fn check_cut(graph: &SbjGraph, root: SbjRef, leaves: &[SbjRef], names: &[String]) -> Result<()> {
    let mut in_tfi = vec![false; graph.node_num()];
    let mut stack = vec![root];
    while let Some(r) = stack.pop() {
        for f in graph.node(r).fanins() {
            if !in_tfi[f.node.id] {
                in_tfi[f.node.id] = true;
                stack.push(f.node);
            }
        }
    }
    if let Some(leaf) = leaves.iter().find(|l| !in_tfi[l.id]) {
        bail!("leaf {:?} is not in the transitive fanin of the root", names[leaf.id]);
    }

    let mut seen = vec![false; graph.node_num()];
    stack.push(root);
    while let Some(r) = stack.pop() {
        for f in graph.node(r).fanins() {
            let fanin = f.node;
            if seen[fanin.id] || leaves.contains(&fanin) {
                continue;
            }
            seen[fanin.id] = true;
            if graph.node(fanin).is_input() {
                bail!("input {:?} is reachable without passing a leaf", names[fanin.id]);
            }
            stack.push(fanin);
        }
    }
    Ok(())
}

impl ProblemFile {
    pub fn build(&self) -> Result<Problem> {
        if self.k < 2 {
            bail!("k must be at least 2, got {}", self.k);
        }

        let mut graph = SbjGraph::new(&self.name);
        let mut by_name: HashMap<&str, SbjRef> = HashMap::new();
        let mut names: Vec<String> = Vec::new();

        for name in &self.inputs {
            let r = graph.add_input(IoInfo::port(name, 0));
            if by_name.insert(name.as_str(), r).is_some() {
                bail!("duplicate node name {:?}", name);
            }
            names.push(name.clone());
        }

        let resolve = |by_name: &HashMap<&str, SbjRef>, f: &FaninEntry| -> Result<SbjFanin> {
            let node = by_name
                .get(f.node.as_str())
                .copied()
                .ok_or_else(|| anyhow!("unknown node {:?}", f.node))?;
            Ok(SbjFanin {
                node,
                inverted: f.inverted,
            })
        };

        for entry in &self.logic {
            let [f0, f1] = entry.fanins.as_slice() else {
                bail!(
                    "logic node {:?} has {} fanins; expected 2",
                    entry.name,
                    entry.fanins.len()
                );
            };
            let f0 = resolve(&by_name, f0).with_context(|| format!("fanin 0 of {:?}", entry.name))?;
            let f1 = resolve(&by_name, f1).with_context(|| format!("fanin 1 of {:?}", entry.name))?;
            let r = graph.add_logic(entry.op, f0, f1);
            if by_name.insert(entry.name.as_str(), r).is_some() {
                bail!("duplicate node name {:?}", entry.name);
            }
            names.push(entry.name.clone());
        }

        let mut output_names: HashMap<&str, usize> = HashMap::new();
        for (i, entry) in self.outputs.iter().enumerate() {
            if output_names.insert(entry.name.as_str(), i).is_some() {
                bail!("duplicate output name {:?}", entry.name);
            }
            let fanin = match &entry.fanin {
                Some(f) => {
                    Some(resolve(&by_name, f).with_context(|| format!("output {:?}", entry.name))?)
                }
                None => None,
            };
            graph.add_output(IoInfo::port(&entry.name, 0), fanin);
            names.push(entry.name.clone());
        }

        let lookup_logic = |name: &str| -> Result<SbjRef> {
            let r = by_name
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("unknown node {:?}", name))?;
            if !graph.node(r).is_logic() {
                bail!("{:?} is not a logic node", name);
            }
            Ok(r)
        };
        let leaf_refs = |root: SbjRef, root_name: &str, leaves: &[String]| -> Result<Vec<SbjRef>> {
            if leaves.is_empty() || leaves.len() > self.k {
                bail!(
                    "cut of {:?} has {} leaves; must be between 1 and {}",
                    root_name,
                    leaves.len(),
                    self.k
                );
            }
            let mut refs: Vec<SbjRef> = Vec::with_capacity(leaves.len());
            for leaf in leaves {
                let r = by_name
                    .get(leaf.as_str())
                    .copied()
                    .ok_or_else(|| anyhow!("unknown leaf {:?} in a cut of {:?}", leaf, root_name))?;
                if r == root {
                    bail!("cut of {:?} uses the node itself as a leaf", root_name);
                }
                if refs.contains(&r) {
                    bail!("cut of {:?} lists leaf {:?} twice", root_name, leaf);
                }
                refs.push(r);
            }
            check_cut(&graph, root, &refs, &names)
                .with_context(|| format!("cut {:?} of {:?}", leaves, root_name))?;
            Ok(refs)
        };

        let mut holder = CutHolder::new(&graph, self.k);
        let mut extra: Vec<(SbjRef, Vec<SbjRef>)> = Vec::new();
        for (root_name, cut_list) in &self.cuts {
            let root = lookup_logic(root_name.as_str()).context("in the cuts table")?;
            for leaves in cut_list {
                extra.push((root, leaf_refs(root, root_name.as_str(), leaves.as_slice())?));
            }
        }
        for r in graph.logic_nodes() {
            holder.add_fanin_cut(&graph, *r);
        }
        for (root, leaves) in &extra {
            if holder.find_cut(*root, leaves).is_none() {
                holder.add_cut(&graph, *root, leaves);
            }
        }

        let mut maprec = MapRecord::new(&graph);
        for r in graph.logic_nodes() {
            let fanin_cut = holder.cut_list(*r)[0];
            maprec.set_cut(*r, fanin_cut);
        }
        for (root_name, leaves) in &self.mapping {
            let root = lookup_logic(root_name.as_str()).context("in the mapping table")?;
            let leaves = leaf_refs(root, root_name.as_str(), leaves.as_slice())?;
            let cut: CutRef = holder.find_cut(root, &leaves).ok_or_else(|| {
                anyhow!(
                    "mapping for {:?} names a cut that is not in its cut list",
                    root_name
                )
            })?;
            maprec.set_cut(root, cut);
        }

        log::debug!(
            "problem {}: {} inputs, {} logic, {} outputs, {} cuts, k={}",
            self.name,
            graph.input_num(),
            graph.logic_num(),
            graph.output_num(),
            holder.cut_num(),
            self.k
        );
        Ok(Problem {
            graph,
            holder,
            maprec,
            k: self.k,
            names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AND3: &str = r#"{
        "name": "and3",
        "k": 3,
        "inputs": ["a", "b", "c"],
        "logic": [
            {"name": "g1", "op": "and", "fanins": [{"node": "a"}, {"node": "b"}]},
            {"name": "g2", "op": "and", "fanins": [{"node": "g1"}, {"node": "c", "inverted": true}]}
        ],
        "outputs": [{"name": "f", "fanin": {"node": "g2"}}, {"name": "zero"}],
        "cuts": {"g2": [["a", "b", "c"], ["c", "g1"]]}
    }"#;

    fn parse(text: &str) -> Result<Problem> {
        let file: ProblemFile = serde_json::from_str(text)?;
        file.build()
    }

    #[test]
    fn test_build_and3() {
        let p = parse(AND3).unwrap();
        assert_eq!(p.graph.input_num(), 3);
        assert_eq!(p.graph.logic_num(), 2);
        assert_eq!(p.graph.output_num(), 2);
        let g2 = p.graph.logic(1).sbj_ref();
        // Fanin cut first; the listed duplicate of it is not added again.
        assert_eq!(p.holder.cut_list(g2).len(), 2);
        assert_eq!(p.maprec.get_cut(g2), Some(p.holder.cut_list(g2)[0]));
        assert_eq!(p.graph.output(1).output_fanin(), None);

        let used = p.used_cuts(&p.maprec);
        let want: BTreeMap<String, Vec<String>> = [
            ("g1".to_string(), vec!["a".to_string(), "b".to_string()]),
            ("g2".to_string(), vec!["g1".to_string(), "c".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(used, want);
    }

    #[test]
    fn test_mapping_selects_listed_cut() {
        let mut file: ProblemFile = serde_json::from_str(AND3).unwrap();
        file.mapping.insert(
            "g2".to_string(),
            vec!["c".to_string(), "b".to_string(), "a".to_string()],
        );
        let p = file.build().unwrap();
        let g2 = p.graph.logic(1).sbj_ref();
        assert_eq!(p.maprec.get_cut(g2), Some(p.holder.cut_list(g2)[1]));
        assert_eq!(p.maprec.estimate(&p.graph, &p.holder), Some(1));
    }

    #[test]
    fn test_errors() {
        let cases: Vec<(&str, &str)> = vec![
            (
                r#"{"name": "x", "inputs": ["a", "a"], "outputs": []}"#,
                "duplicate node name",
            ),
            (
                r#"{"name": "x", "inputs": ["a"], "logic": [{"name": "g", "op": "and", "fanins": [{"node": "a"}]}], "outputs": []}"#,
                "expected 2",
            ),
            (
                r#"{"name": "x", "inputs": ["a"], "outputs": [{"name": "o", "fanin": {"node": "nope"}}]}"#,
                "unknown node",
            ),
            (
                r#"{"name": "x", "k": 1, "inputs": [], "outputs": []}"#,
                "k must be at least 2",
            ),
            (
                r#"{"name": "x", "k": 2, "inputs": ["a", "b", "c"],
                    "logic": [{"name": "g", "op": "xor", "fanins": [{"node": "a"}, {"node": "b"}]}],
                    "outputs": [], "cuts": {"g": [["a", "b", "c"]]}}"#,
                "must be between 1 and 2",
            ),
            (
                r#"{"name": "x", "inputs": ["a", "b", "c"],
                    "logic": [{"name": "g1", "op": "and", "fanins": [{"node": "a"}, {"node": "b"}]},
                              {"name": "g2", "op": "and", "fanins": [{"node": "g1"}, {"node": "c"}]}],
                    "outputs": [], "mapping": {"g2": ["a", "b", "c"]}}"#,
                "not in its cut list",
            ),
            (
                r#"{"name": "x", "inputs": ["a", "b"], "outputs": [], "cuts": {"a": [["b"]]}}"#,
                "not a logic node",
            ),
        ];
        for (text, want) in cases {
            assert_build_fails(text, want);
        }
    }

    fn assert_build_fails(text: &str, want: &str) {
        let err = match parse(text) {
            Ok(_) => panic!("expected an error containing {:?}", want),
            Err(e) => format!("{:#}", e),
        };
        assert!(err.contains(want), "error {:?} does not mention {:?}", err, want);
    }

    #[test]
    fn test_rejects_leaves_that_do_not_cover_the_root() {
        let mut file: ProblemFile = serde_json::from_str(AND3).unwrap();
        file.cuts.insert("g2".to_string(), vec![vec!["a".to_string()]]);
        let err = format!("{:#}", file.build().err().unwrap());
        assert!(err.contains("is reachable without passing a leaf"), "{}", err);

        let mut file: ProblemFile = serde_json::from_str(AND3).unwrap();
        file.mapping
            .insert("g2".to_string(), vec!["g1".to_string(), "b".to_string()]);
        assert!(file.build().is_err());
    }

    #[test]
    fn test_rejects_leaves_from_the_fanout_cone() {
        let text = r#"{"name": "x", "inputs": ["a", "b", "c"],
            "logic": [{"name": "g1", "op": "and", "fanins": [{"node": "a"}, {"node": "b"}]},
                      {"name": "g2", "op": "and", "fanins": [{"node": "g1"}, {"node": "c"}]},
                      {"name": "g3", "op": "xor", "fanins": [{"node": "g2"}, {"node": "a"}]}],
            "outputs": [{"name": "o", "fanin": {"node": "g3"}}],
            "cuts": {"g1": [["g3"]]}, "mapping": {"g1": ["g3"]}}"#;
        assert_build_fails(text, "leaf \"g3\" is not in the transitive fanin");
    }

    #[test]
    fn test_accepts_cut_with_shadowed_leaf() {
        // `a` sits below `g1`; the cut is redundant but still covers `g2`.
        let mut file: ProblemFile = serde_json::from_str(AND3).unwrap();
        file.cuts.insert(
            "g2".to_string(),
            vec![vec!["g1".to_string(), "a".to_string(), "c".to_string()]],
        );
        let p = file.build().unwrap();
        let g2 = p.graph.logic(1).sbj_ref();
        assert_eq!(p.holder.cut_list(g2).len(), 2);
    }
}
