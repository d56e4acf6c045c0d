//! Extracts the proof graph's edges from a Graphviz-rendered SVG: every
//! `<g class="edge">` element's `<title>` names the `src->dst` pair, and
//! its `<text>` child (if any) carries the edge's label.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::svg::{tokenize, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BetweenThings,
    AddingThing,
    AddingNode,
    AddingEdge,
    AfterAdd,
}

/// One parsed `src -> dst` edge, with whatever label text Graphviz drew on
/// it (empty if the edge is unlabeled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub src: u64,
    pub dst: u64,
    pub label: String,
}

/// Drives the 5-state walk over `<g>` elements that distinguishes node
/// entries (a single id in the title) from edge entries (`src->dst`).
#[derive(Default)]
struct GraphParser {
    state: State,
    current_title: String,
    current_text: String,
    edges: Vec<Edge>,
}

impl Default for State {
    fn default() -> Self {
        State::BetweenThings
    }
}

impl GraphParser {
    fn start_element(&mut self, name: &str, attrs: &[(String, String)]) {
        match self.state {
            State::BetweenThings if name == "g" => {
                let class = attrs.iter().find(|(k, _)| k == "class").map(|(_, v)| v.as_str());
                match class {
                    Some("node") => self.state = State::AddingNode,
                    Some("edge") => self.state = State::AddingEdge,
                    _ => self.state = State::AddingThing,
                }
                self.current_title.clear();
                self.current_text.clear();
            }
            _ => {}
        }
    }

    fn add_title(&mut self, text: &str) {
        self.current_title = text.to_string();
    }

    fn add_text(&mut self, text: &str) {
        if !self.current_text.is_empty() {
            self.current_text.push(' ');
        }
        self.current_text.push_str(text);
    }

    fn end_element(&mut self, name: &str) {
        if name != "g" {
            return;
        }
        if self.state == State::AddingEdge {
            if let Some((src, dst)) = parse_edge_title(&self.current_title) {
                self.edges.push(Edge {
                    src,
                    dst,
                    label: self.current_text.trim().to_string(),
                });
            }
        }
        self.state = State::BetweenThings;
    }

    fn into_edges(self) -> Vec<Edge> {
        self.edges
    }
}

fn strip_node_prefix(s: &str) -> Option<u64> {
    s.trim().strip_prefix('N').unwrap_or(s.trim()).parse().ok()
}

fn parse_edge_title(title: &str) -> Option<(u64, u64)> {
    let (src, dst) = title.split_once("->")?;
    Some((strip_node_prefix(src)?, strip_node_prefix(dst)?))
}

/// Walks an SVG document's token stream, dispatching each tag/text token
/// into the [`GraphParser`] state machine, and returns every edge found.
pub fn parse_svg(content: &str) -> Vec<Edge> {
    let mut parser = GraphParser::default();
    let mut in_title = false;
    let mut in_text = false;
    for token in tokenize(content) {
        match token {
            Token::TagOpen { name, attrs } => {
                parser.start_element(&name, &attrs);
                if name == "title" {
                    in_title = true;
                } else if name == "text" {
                    in_text = true;
                }
            }
            Token::TagClose { name } => {
                if name == "title" {
                    in_title = false;
                } else if name == "text" {
                    in_text = false;
                } else if name == "g" {
                    parser.end_element(&name);
                }
            }
            Token::SelfClose { .. } => {}
            Token::Text(text) => {
                if in_title {
                    parser.add_title(&text);
                } else if in_text {
                    parser.add_text(&text);
                }
            }
        }
    }
    parser.into_edges()
}

/// Reads and parses an SVG file from disk.
pub fn parse_graph_file(path: &Path) -> io::Result<Vec<Edge>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_svg(&content))
}

/// The live proof graph: adjacency in both directions, kept consistent by
/// recomputing the inverse map wholesale every time [`UIGraph::set_graph`]
/// installs a new edge set (set-and-swap, never incremental patching).
#[derive(Default)]
pub struct UIGraph {
    outgoing: HashMap<u64, HashMap<u64, String>>,
    incoming: HashMap<u64, (u64, String)>,
    listeners: Vec<Box<dyn Fn() + Send + Sync>>,
}

impl UIGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_graph(&mut self, edges: &[Edge]) {
        let mut outgoing: HashMap<u64, HashMap<u64, String>> = HashMap::new();
        let mut incoming = HashMap::new();
        for edge in edges {
            outgoing.entry(edge.src).or_default().insert(edge.dst, edge.label.clone());
            incoming.insert(edge.dst, (edge.src, edge.label.clone()));
        }
        self.outgoing = outgoing;
        self.incoming = incoming;
        for listener in &self.listeners {
            listener();
        }
    }

    pub fn add_change_listener(&mut self, listener: Box<dyn Fn() + Send + Sync>) {
        self.listeners.push(listener);
    }

    /// The label on the edge leading into `node_id`, if any edge does.
    pub fn incoming_edge(&self, node_id: u64) -> Option<&str> {
        self.incoming.get(&node_id).map(|(_, label)| label.as_str())
    }

    pub fn outgoing_nodes(&self, node_id: u64) -> HashSet<u64> {
        self.outgoing.get(&node_id).map(|m| m.keys().copied().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<svg>
<g class="node"><title>N0</title></g>
<g class="edge"><title>N0&#45;&gt;N1</title><text>step</text></g>
</svg>"#;

    #[test]
    fn extracts_labeled_edge() {
        let edges = parse_svg(SAMPLE);
        assert_eq!(edges, vec![Edge { src: 0, dst: 1, label: "step".into() }]);
    }

    #[test]
    fn ui_graph_tracks_incoming_edges() {
        let mut graph = UIGraph::new();
        graph.set_graph(&parse_svg(SAMPLE));
        assert_eq!(graph.incoming_edge(1), Some("step"));
        assert_eq!(graph.incoming_edge(0), None);
    }

    #[test]
    fn set_graph_notifies_listeners() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();
        let mut graph = UIGraph::new();
        graph.add_change_listener(Box::new(move || flag2.store(true, Ordering::SeqCst)));
        graph.set_graph(&parse_svg(SAMPLE));
        assert!(flag.load(Ordering::SeqCst));
    }
}
