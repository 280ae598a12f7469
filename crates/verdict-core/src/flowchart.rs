//! Legal process flowchart.
//!
//! A fixed set of steps from intake to judgment or settlement; which edges are
//! drawn depends on the case validity and the settlement and court outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Validity {
    Valid,
    Invalid,
    /// The assessment itself failed.
    Error,
}

impl Validity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Ellipse,
    Diamond,
    Box,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowNode {
    pub id: &'static str,
    pub label: &'static str,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowEdge {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flowchart {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

const NODES: &[(&str, &str, NodeShape)] = &[
    ("A", "Client requests legal advice", NodeShape::Ellipse),
    ("B", "Is the case valid?", NodeShape::Diamond),
    ("C", "Accept case", NodeShape::Box),
    ("D", "Reject case", NodeShape::Box),
    ("E", "Is settlement possible?", NodeShape::Diamond),
    ("F", "Negotiate settlement", NodeShape::Box),
    ("G", "Proceed to trial", NodeShape::Box),
    ("H", "Appear in court", NodeShape::Box),
    ("I", "Obtain judgment", NodeShape::Box),
    ("J", "Draft judgment", NodeShape::Box),
    ("K", "Draft settlement agreement", NodeShape::Box),
];

impl Flowchart {
    /// Build the chart. An unanswered settlement question takes the trial
    /// branch; an unanswered court question stops at the court appearance.
    pub fn build(validity: Validity, settlement: Option<bool>, court: Option<bool>) -> Self {
        let nodes = NODES
            .iter()
            .map(|&(id, label, shape)| FlowNode { id, label, shape })
            .collect();

        let mut pairs = vec![("A", "B")];
        if validity == Validity::Valid {
            pairs.extend([("B", "C"), ("C", "E")]);
            if settlement == Some(true) {
                pairs.extend([("E", "F"), ("F", "K")]);
            } else {
                pairs.extend([("E", "G"), ("G", "H")]);
                if court == Some(true) {
                    pairs.extend([("H", "I"), ("I", "J")]);
                }
            }
        } else {
            pairs.push(("B", "D"));
        }

        Self {
            nodes,
            edges: pairs
                .into_iter()
                .map(|(from, to)| FlowEdge { from, to })
                .collect(),
        }
    }

    /// Mermaid `flowchart TD` source for the chart.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        for n in &self.nodes {
            let line = match n.shape {
                NodeShape::Ellipse => format!("    {}([\"{}\"])\n", n.id, n.label),
                NodeShape::Diamond => format!("    {}{{\"{}\"}}\n", n.id, n.label),
                NodeShape::Box => format!("    {}[\"{}\"]\n", n.id, n.label),
            };
            out.push_str(&line);
        }
        for e in &self.edges {
            out.push_str(&format!("    {} --> {}\n", e.from, e.to));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(chart: &Flowchart) -> Vec<(&str, &str)> {
        chart.edges.iter().map(|e| (e.from, e.to)).collect()
    }

    #[test]
    fn invalid_case_is_rejected() {
        let chart = Flowchart::build(Validity::Invalid, Some(true), Some(true));
        assert_eq!(edges(&chart), vec![("A", "B"), ("B", "D")]);
        assert_eq!(chart.nodes.len(), 11);
    }

    #[test]
    fn error_takes_the_reject_branch() {
        let chart = Flowchart::build(Validity::Error, None, None);
        assert_eq!(edges(&chart), vec![("A", "B"), ("B", "D")]);
    }

    #[test]
    fn settled_case_drafts_agreement() {
        let chart = Flowchart::build(Validity::Valid, Some(true), Some(true));
        assert_eq!(
            edges(&chart),
            vec![("A", "B"), ("B", "C"), ("C", "E"), ("E", "F"), ("F", "K")]
        );
    }

    #[test]
    fn trial_reaches_judgment_only_after_court() {
        let no_court = Flowchart::build(Validity::Valid, Some(false), None);
        assert_eq!(edges(&no_court).last(), Some(&("G", "H")));

        let court = Flowchart::build(Validity::Valid, None, Some(true));
        assert_eq!(
            edges(&court)[3..],
            [("E", "G"), ("G", "H"), ("H", "I"), ("I", "J")]
        );
    }

    #[test]
    fn mermaid_renders_shapes_and_edges() {
        let m = Flowchart::build(Validity::Invalid, None, None).to_mermaid();
        assert!(m.starts_with("flowchart TD\n"));
        assert!(m.contains("A([\"Client requests legal advice\"])"));
        assert!(m.contains("B{\"Is the case valid?\"}"));
        assert!(m.contains("D[\"Reject case\"]"));
        assert!(m.contains("B --> D"));
    }

    #[test]
    fn validity_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Validity::Valid).unwrap(), "\"VALID\"");
        let v: Validity = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(v, Validity::Error);
    }
}
