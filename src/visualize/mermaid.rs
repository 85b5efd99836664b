//! Mermaid state-diagram and flowchart output.

use crate::instance::Instance;
use crate::machine::Machine;
use crate::visualize::{sorted_edges, sorted_states};

const HIGHLIGHT_COLOR: &str = "#00AA00";

/// Render the machine as a Mermaid `stateDiagram-v2`, with the current state
/// marked as the start node.
pub fn mermaid_state_diagram(machine: &Machine, instance: &Instance) -> String {
    let mut out = String::from("stateDiagram-v2\n");
    out.push_str(&format!("    [*] --> {}\n", instance.current()));

    for edge in sorted_edges(machine) {
        out.push_str(&format!(
            "    {} --> {}: {}\n",
            edge.source, edge.destination, edge.event
        ));
    }

    out
}

/// Render the machine as a Mermaid `graph LR` flowchart, highlighting the
/// current state's node.
pub fn mermaid_flowchart(machine: &Machine, instance: &Instance) -> String {
    let (states, ids) = sorted_states(machine);

    let mut out = String::from("graph LR\n");
    for state in &states {
        out.push_str(&format!("    {}[{}]\n", ids[state], state));
    }
    out.push('\n');

    for edge in sorted_edges(machine) {
        out.push_str(&format!(
            "    {} --> |{}| {}\n",
            ids[&edge.source], edge.event, ids[&edge.destination]
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "    style {} fill:{}\n",
        ids[&instance.current()],
        HIGHLIGHT_COLOR
    ));

    out
}
