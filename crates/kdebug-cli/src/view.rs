//! Line-oriented rendering of the proof tree and a node's configuration,
//! grounded on the original curses `TreeWindow`/`KonfigWindow`'s scheme:
//! each branch point draws as `+- start-end`, with `| ` marking a sibling
//! still to come and two spaces once the last child is reached.

use kdebug_core::tree::NodeTree;
use kdebug_core::ProofTree;
use kdebug_graph::UIGraph;

/// Flattened `(node id, display line)` pairs in the order the tree pane
/// would show them, skipping the children of any collapsed node. `graph`
/// supplies the incoming-edge label drawn after a branch point's first
/// child, since that is the only place a label disambiguates a step.
pub fn tree_lines(tree: &ProofTree, graph: &UIGraph) -> Vec<(u64, String)> {
    let mut output = Vec::new();
    let mut indent = vec!["  "];
    push_tree_lines(&mut indent, tree.root(), graph, &mut output);
    output
}

fn push_tree_lines(
    indent: &mut Vec<&'static str>,
    tree: &NodeTree,
    graph: &UIGraph,
    output: &mut Vec<(u64, String)>,
) {
    let segment = tree.segment();
    let start = &segment[0];
    let end = &segment[segment.len() - 1];

    let mut line = String::new();
    if indent.len() > 1 {
        line.push_str(&indent[..indent.len() - 1].concat());
    }
    line.push_str("+- ");
    if start.id() == end.id() {
        line.push_str(&start.to_string());
    } else {
        line.push_str(&start.to_string());
        line.push('-');
        line.push_str(&end.to_string());
    }
    if let Some(label) = graph.incoming_edge(start.id()) {
        if !label.is_empty() {
            line.push_str(&format!(" [{label}]"));
        }
    }

    let children = tree.children();
    if end.is_collapsed() && !children.is_empty() {
        line.push_str(" (collapsed)");
    }
    output.push((start.id(), line));

    if end.is_collapsed() || children.is_empty() {
        return;
    }

    indent.push("| ");
    for child in &children[..children.len() - 1] {
        push_tree_lines(indent, child, graph, output);
    }
    *indent.last_mut().expect("just pushed") = "  ";
    push_tree_lines(indent, &children[children.len() - 1], graph, output);
    indent.pop();
}

/// The selected node's configuration, wrapped to `column_budget` columns,
/// or a placeholder while it hasn't been fetched yet.
pub fn konfig_lines(tree: &ProofTree, node_id: u64, column_budget: usize) -> Vec<String> {
    match tree.find_node(node_id).and_then(|n| n.configuration()) {
        Some(konfig) => kdebug_konfig::unparse(&kdebug_konfig::split(konfig, column_budget)),
        None => vec!["(configuration not yet available)".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_tree_renders_one_line() {
        let tree = ProofTree::new(0);
        let lines = tree_lines(&tree, &UIGraph::new());
        assert_eq!(lines, vec![(0, "+- 0".to_string())]);
    }

    #[test]
    fn branching_draws_each_child_one_step_in() {
        let mut tree = ProofTree::new(0);
        tree.add_children(0, &[1, 2]).unwrap();
        let lines = tree_lines(&tree, &UIGraph::new());
        assert_eq!(lines[0], (0, "+- 0".to_string()));
        assert_eq!(lines[1], (1, "  +- 1".to_string()));
        assert_eq!(lines[2], (2, "  +- 2".to_string()));
    }

    #[test]
    fn grandchildren_thread_a_pipe_for_the_pending_sibling() {
        let mut tree = ProofTree::new(0);
        tree.add_children(0, &[1, 2]).unwrap();
        tree.add_children(1, &[3, 4]).unwrap();
        let lines = tree_lines(&tree, &UIGraph::new());
        assert_eq!(lines[0], (0, "+- 0".to_string()));
        assert_eq!(lines[1], (1, "  +- 1".to_string()));
        assert_eq!(lines[2], (3, "  | +- 3".to_string()));
        assert_eq!(lines[3], (4, "  | +- 4".to_string()));
        assert_eq!(lines[4], (2, "  +- 2".to_string()));
    }

    #[test]
    fn edge_label_is_appended_to_the_child_that_receives_it() {
        let mut tree = ProofTree::new(0);
        tree.add_children(0, &[1, 2]).unwrap();
        let mut graph = UIGraph::new();
        graph.set_graph(&[kdebug_graph::Edge { src: 0, dst: 1, label: "rule-1".to_string() }]);
        let lines = tree_lines(&tree, &graph);
        assert_eq!(lines[1], (1, "  +- 1 [rule-1]".to_string()));
        assert_eq!(lines[2], (2, "  +- 2".to_string()));
    }

    #[test]
    fn collapsed_node_hides_its_children() {
        let mut tree = ProofTree::new(0);
        tree.add_children(0, &[1, 2]).unwrap();
        tree.toggle_collapsed(0).unwrap();
        let lines = tree_lines(&tree, &UIGraph::new());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.ends_with("(collapsed)"));
    }

    #[test]
    fn konfig_lines_placeholder_before_fetch() {
        let tree = ProofTree::new(0);
        assert_eq!(konfig_lines(&tree, 0, 100), vec!["(configuration not yet available)".to_string()]);
    }

    #[test]
    fn konfig_lines_shows_fetched_configuration() {
        let mut tree = ProofTree::new(0);
        tree.set_configuration(0, vec![kdebug_konfig::Konfig::Line("<k> foo </k>".to_string())]).unwrap();
        assert_eq!(konfig_lines(&tree, 0, 100), vec!["<k> foo </k>".to_string()]);
    }
}
