//! Textual diagrams of a machine's transition table.
//!
//! Pure, stateless formatters over a read-only view of the table and an
//! instance's current state. Output is deterministic: edges and state
//! declarations are sorted so the same machine always renders the same text.

mod graphviz;
mod mermaid;

pub use graphviz::visualize;
pub use mermaid::{mermaid_flowchart, mermaid_state_diagram};

use crate::instance::Instance;
use crate::machine::Machine;
use std::collections::HashMap;

/// Output format for [`visualize_with_format`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualizeFormat {
    /// Graphviz digraph (`dot`).
    Graphviz,
    /// Mermaid `stateDiagram-v2`.
    MermaidStateDiagram,
    /// Mermaid `graph LR` flowchart with the current state highlighted.
    MermaidFlowChart,
}

/// Render the machine in the requested format.
pub fn visualize_with_format(
    machine: &Machine,
    instance: &Instance,
    format: VisualizeFormat,
) -> String {
    match format {
        VisualizeFormat::Graphviz => visualize(machine, instance),
        VisualizeFormat::MermaidStateDiagram => mermaid_state_diagram(machine, instance),
        VisualizeFormat::MermaidFlowChart => mermaid_flowchart(machine, instance),
    }
}

/// One edge of the transition table, in render order fields.
pub(crate) struct Edge {
    pub(crate) source: String,
    pub(crate) event: String,
    pub(crate) destination: String,
}

/// All edges sorted by `(source, event)` for reproducible output.
pub(crate) fn sorted_edges(machine: &Machine) -> Vec<Edge> {
    let mut edges: Vec<Edge> = machine
        .transition_edges()
        .map(|(key, destination)| Edge {
            source: key.source.clone(),
            event: key.event.clone(),
            destination: destination.to_string(),
        })
        .collect();
    edges.sort_by(|a, b| (&a.source, &a.event).cmp(&(&b.source, &b.event)));
    edges
}

/// Every state mentioned by the table, sorted, plus its `idN` node id
/// assigned in that alphabetical order.
pub(crate) fn sorted_states(machine: &Machine) -> (Vec<String>, HashMap<String, String>) {
    let mut states: Vec<String> = Vec::new();
    for (key, destination) in machine.transition_edges() {
        if !states.contains(&key.source) {
            states.push(key.source.clone());
        }
        let destination = destination.to_string();
        if !states.contains(&destination) {
            states.push(destination);
        }
    }
    states.sort();

    let ids = states
        .iter()
        .enumerate()
        .map(|(i, state)| (state.clone(), format!("id{i}")))
        .collect();
    (states, ids)
}
