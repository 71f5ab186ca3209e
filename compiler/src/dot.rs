// dot.rs — Graphviz DOT output for decoded definitions
//
// Transforms a decoded container into DOT format suitable for rendering
// with `dot`, `neato`, or other Graphviz layout engines. Each definition
// becomes a cluster; pool constants become leaf nodes so shared values
// show their fan-out.
//
// Preconditions: `file` came out of `decode`.
// Postconditions: returns a valid DOT string; identical input yields
//   identical output.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::collections::HashMap;
use std::fmt::Write;

use crate::decode::{DecodedDef, DecodedFile, DecodedInput};

/// Emit the decoded container as a Graphviz DOT string.
pub fn emit_dot(file: &DecodedFile) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph synthdefs {{").unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    for (def_index, def) in file.defs.iter().enumerate() {
        writeln!(buf).unwrap();
        writeln!(buf, "    subgraph cluster_d{def_index} {{").unwrap();
        writeln!(buf, "        label=\"synthdef: {}\";", escape(&def.name)).unwrap();
        writeln!(buf, "        style=rounded;").unwrap();
        writeln!(buf, "        color=gray50;").unwrap();
        write_def_contents(&mut buf, def_index, def);
        writeln!(buf, "    }}").unwrap();
    }

    writeln!(buf, "}}").unwrap();
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Escape a name for use inside a double-quoted DOT label.
fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// DOT node ID for a node record: `d<def>_n<index>`.
fn node_id(def_index: usize, index: usize) -> String {
    format!("d{def_index}_n{index}")
}

/// DOT node ID for a pool constant: `d<def>_c<index>`.
fn const_id(def_index: usize, index: u16) -> String {
    format!("d{def_index}_c{index}")
}

/// Label for a node record: type name, operator selector if any, rate.
fn node_label(def: &DecodedDef, index: usize) -> String {
    let node = &def.nodes[index];
    if node.special_index != 0 {
        format!("{} #{} ({})", node.name, node.special_index, node.rate)
    } else {
        format!("{} ({})", node.name, node.rate)
    }
}

/// Attributes for a node record. The control bank and sinks get their own
/// fills so the graph's entry and exit points stand out.
fn node_attrs(def: &DecodedDef, index: usize) -> String {
    let node = &def.nodes[index];
    let color = if node.name == "Control" {
        "lightyellow"
    } else if node.outputs.is_empty() {
        "lightsalmon"
    } else {
        "lightblue"
    };
    format!(
        "shape=box, style=filled, fillcolor={}, label=\"{}\"",
        color,
        escape(&node_label(def, index))
    )
}

/// Write all constant, node, and edge lines for one definition.
fn write_def_contents(buf: &mut String, def_index: usize, def: &DecodedDef) {
    // parameter slot → declared name, for labeling control bank outputs
    let slot_names: HashMap<u16, &str> = def
        .parameter_names
        .iter()
        .map(|named| (named.slot, named.name.as_str()))
        .collect();

    for (i, value) in def.constants.iter().enumerate() {
        writeln!(
            buf,
            "        {} [shape=ellipse, style=filled, fillcolor=gray90, label=\"{}\"];",
            const_id(def_index, i as u16),
            value
        )
        .unwrap();
    }

    for i in 0..def.nodes.len() {
        writeln!(buf, "        {} [{}];", node_id(def_index, i), node_attrs(def, i)).unwrap();
    }

    writeln!(buf).unwrap();

    for (i, node) in def.nodes.iter().enumerate() {
        let target = node_id(def_index, i);
        for input in &node.inputs {
            match *input {
                DecodedInput::Constant { index } => {
                    writeln!(buf, "        {} -> {};", const_id(def_index, index), target)
                        .unwrap();
                }
                DecodedInput::Node { index, output } => {
                    let source = node_id(def_index, index as usize);
                    let label = edge_label(def, index as usize, output, &slot_names);
                    match label {
                        Some(label) => writeln!(
                            buf,
                            "        {} -> {} [label=\"{}\"];",
                            source,
                            target,
                            escape(&label)
                        )
                        .unwrap(),
                        None => writeln!(buf, "        {} -> {};", source, target).unwrap(),
                    }
                }
            }
        }
    }
}

/// Label for a node-to-node edge: the parameter name for control bank
/// outputs, the slot number for other multi-output sources, nothing for
/// the common single-output case.
fn edge_label(
    def: &DecodedDef,
    source: usize,
    output: u16,
    slot_names: &HashMap<u16, &str>,
) -> Option<String> {
    let node = def.nodes.get(source)?;
    if node.name == "Control" {
        if let Some(name) = slot_names.get(&output) {
            return Some((*name).to_string());
        }
    }
    if node.outputs.len() > 1 {
        return Some(format!(".{}", output));
    }
    None
}
