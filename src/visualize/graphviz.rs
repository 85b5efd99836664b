//! Graphviz digraph output.

use crate::instance::Instance;
use crate::machine::Machine;
use crate::visualize::{sorted_edges, sorted_states};

/// Render the machine as a Graphviz digraph.
///
/// Edges whose source is the instance's current state come first so the
/// interesting part of the graph sits at the top; the rest follow in
/// `(source, event)` order. State declarations are alphabetical.
pub fn visualize(machine: &Machine, instance: &Instance) -> String {
    let current = instance.current();
    let edges = sorted_edges(machine);
    let (states, _) = sorted_states(machine);

    let mut out = String::from("digraph fsm {\n");

    for edge in edges.iter().filter(|e| e.source == current) {
        out.push_str(&format!(
            "    \"{}\" -> \"{}\" [ label = \"{}\" ];\n",
            edge.source, edge.destination, edge.event
        ));
    }
    for edge in edges.iter().filter(|e| e.source != current) {
        out.push_str(&format!(
            "    \"{}\" -> \"{}\" [ label = \"{}\" ];\n",
            edge.source, edge.destination, edge.event
        ));
    }

    out.push('\n');
    for state in &states {
        out.push_str(&format!("    \"{state}\";\n"));
    }
    out.push_str("}\n");

    out
}
