//! Drives the engine one command per prompt: grows the proof tree
//! depth-first, steps every node exactly once, and fetches every requested
//! configuration exactly once.
//!
//! The pending-commands queue holds tagged actions rather than closures
//! (see DESIGN.md's redesign-note ledger): each variant names the select
//! target and expands to the two or three raw command lines the engine
//! expects. `expand_node_if_needed` enqueues a single `SelectThenStep`,
//! whose three lines (`select`, `step`, `graph`) the spec's algorithm
//! describes as one undivided push; `get_konfig_if_needed` enqueues a
//! `SelectThenKonfig`. `SelectThenGraph` exists for parity with the
//! design note's three named variants but nothing in this scheduler
//! constructs it today — a UI-driven graph-only refresh would.

use std::collections::{HashSet, VecDeque};

use kdebug_core::tree::{NodeState, TreeError};
use kdebug_core::{EndState, ProofTree};
use kdebug_konfig::Konfig;
use kdebug_protocol::EndStateSignal;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Everything the scheduler reacts to: parser events from the engine's
/// stdout/stderr, and UI-driven configuration requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AtPrompt(u64),
    Branches(u64, Vec<u64>),
    ProofEnd(u64),
    Konfig(u64, Vec<Konfig>),
    EndStateSet(EndStateSignal),
    EndStateReset,
    RequestKonfig(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserPrep {
    Step,
    Konfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingCommand {
    SelectThenStep(u64),
    SelectThenKonfig(u64),
    #[allow(dead_code)]
    SelectThenGraph(u64),
}

impl PendingCommand {
    fn prep(self) -> ParserPrep {
        match self {
            PendingCommand::SelectThenKonfig(_) => ParserPrep::Konfig,
            PendingCommand::SelectThenStep(_) | PendingCommand::SelectThenGraph(_) => ParserPrep::Step,
        }
    }

    fn lines(self, graph_path: &str) -> Vec<String> {
        match self {
            PendingCommand::SelectThenStep(id) => {
                vec![format!("select {id}"), "step".to_string(), format!("graph expanded {graph_path} svg")]
            }
            PendingCommand::SelectThenKonfig(id) => vec![format!("select {id}"), "konfig".to_string()],
            PendingCommand::SelectThenGraph(id) => vec![format!("select {id}"), format!("graph expanded {graph_path} svg")],
        }
    }
}

/// A command batch dequeued for one prompt: the raw lines to write to the
/// engine's stdin, and which protocol mode the parsers must be prepared
/// for before the write happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub lines: Vec<String>,
    pub prep: ParserPrep,
}

pub struct Scheduler {
    tree: ProofTree,
    graph_path: String,
    started: bool,
    last_config_number: u64,
    next_node_state: NodeState,
    end_state: EndState,
    unexpanded_nodes: VecDeque<u64>,
    unknown_konfigs: VecDeque<u64>,
    pending_commands: VecDeque<PendingCommand>,
    nodes_seen: HashSet<u64>,
    idle: bool,
}

impl Scheduler {
    pub fn new(graph_path: impl Into<String>) -> Self {
        Scheduler {
            tree: ProofTree::new(0),
            graph_path: graph_path.into(),
            started: false,
            last_config_number: 0,
            next_node_state: NodeState::Normal,
            end_state: EndState::Nothing,
            unexpanded_nodes: VecDeque::new(),
            unknown_konfigs: VecDeque::new(),
            pending_commands: VecDeque::new(),
            nodes_seen: HashSet::new(),
            idle: false,
        }
    }

    pub fn tree(&self) -> &ProofTree {
        &self.tree
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// UI-driven: flips a node's collapsed flag (Space in the tree pane).
    /// Purely a display annotation, never consulted by the scheduling logic.
    pub fn toggle_collapsed(&mut self, node_id: u64) -> Result<(), SchedulerError> {
        self.tree.toggle_collapsed(node_id)?;
        Ok(())
    }

    /// Registers a notification callback on the proof tree, so an external
    /// UI thread can learn when to re-read it without ever mutating it
    /// itself (see §5's "observers read but never mutate" rule).
    pub fn add_tree_listener<F: Fn() + Send + Sync + 'static>(&mut self, listener: F) {
        self.tree.change_listeners().add(listener);
    }

    pub fn handle(&mut self, event: Event) -> Result<Option<Dispatch>, SchedulerError> {
        match event {
            Event::AtPrompt(id) => self.on_at_prompt(id),
            Event::Branches(step_count, children) => {
                self.on_branches(step_count, &children)?;
                Ok(None)
            }
            Event::ProofEnd(step_count) => {
                self.on_proof_end(step_count);
                Ok(None)
            }
            Event::Konfig(node_id, lines) => {
                self.on_konfig(node_id, lines)?;
                Ok(None)
            }
            Event::EndStateSet(signal) => {
                self.end_state = match signal {
                    EndStateSignal::Stuck => EndState::Stuck,
                    EndStateSignal::FailedEnd => EndState::FailedEnd,
                    EndStateSignal::Error => EndState::Error,
                };
                Ok(None)
            }
            Event::EndStateReset => {
                self.end_state = EndState::Nothing;
                Ok(None)
            }
            Event::RequestKonfig(node_id) => self.request_konfig(node_id),
        }
    }

    fn on_at_prompt(&mut self, id: u64) -> Result<Option<Dispatch>, SchedulerError> {
        if !self.nodes_seen.contains(&id) {
            if self.started {
                self.tree.add_child(self.last_config_number, id)?;
            } else {
                self.started = true;
            }
            self.nodes_seen.insert(id);
            self.unexpanded_nodes.push_back(id);
            if self.tree.find_node(id).and_then(|n| n.configuration()).is_none() {
                self.unknown_konfigs.push_back(id);
            }
        }
        self.last_config_number = id;

        if self.pending_commands.is_empty() {
            if let Some(next) = self.pop_known_needed_konfig() {
                self.pending_commands.push_back(PendingCommand::SelectThenKonfig(next));
            } else if let Some(next) = self.unexpanded_nodes.pop_front() {
                self.pending_commands.push_back(PendingCommand::SelectThenStep(next));
            }
        }

        let dispatch = self.pending_commands.pop_front().map(|cmd| {
            self.idle = false;
            Dispatch { lines: cmd.lines(&self.graph_path), prep: cmd.prep() }
        });
        if dispatch.is_none() {
            self.idle = true;
        }

        if self.next_node_state != NodeState::Normal {
            self.tree.set_node_state(id, self.next_node_state)?;
            self.next_node_state = NodeState::Normal;
        }

        Ok(dispatch)
    }

    fn pop_known_needed_konfig(&mut self) -> Option<u64> {
        while let Some(id) = self.unknown_konfigs.pop_front() {
            let has_konfig = self.tree.find_node(id).and_then(|n| n.configuration()).is_some();
            if !has_konfig {
                return Some(id);
            }
        }
        None
    }

    fn on_branches(&mut self, step_count: u64, children: &[u64]) -> Result<(), SchedulerError> {
        self.tree.add_children(self.last_config_number, children)?;
        for &child in children {
            self.nodes_seen.insert(child);
            self.unexpanded_nodes.push_back(child);
            self.unknown_konfigs.push_back(child);
        }
        self.unknown_konfigs.push_back(self.last_config_number);
        let _ = step_count;
        Ok(())
    }

    fn on_proof_end(&mut self, _step_count: u64) {
        self.next_node_state = match self.end_state {
            EndState::Stuck => NodeState::Stuck,
            EndState::FailedEnd => NodeState::ProofEndFailed,
            EndState::Error => NodeState::Error,
            EndState::Nothing => NodeState::ProofEnd,
        };
        self.end_state = EndState::Nothing;
    }

    fn on_konfig(&mut self, node_id: u64, lines: Vec<Konfig>) -> Result<(), SchedulerError> {
        self.tree.set_configuration(node_id, lines)?;
        Ok(())
    }

    fn request_konfig(&mut self, node_id: u64) -> Result<Option<Dispatch>, SchedulerError> {
        self.unknown_konfigs.push_back(node_id);
        if self.idle {
            return self.on_at_prompt(self.last_config_number);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_requests_konfig_before_stepping() {
        let mut s = Scheduler::new("/tmp/graph");
        let first = s.handle(Event::AtPrompt(0)).unwrap().unwrap();
        assert_eq!(first.prep, ParserPrep::Konfig);
        assert_eq!(first.lines, vec!["select 0", "konfig"]);

        let second = s.handle(Event::AtPrompt(0)).unwrap().unwrap();
        assert_eq!(second.prep, ParserPrep::Step);
        assert_eq!(second.lines, vec!["select 0", "step", "graph expanded /tmp/graph svg"]);
    }

    #[test]
    fn linear_step_links_new_node_under_last_config() {
        let mut s = Scheduler::new("/tmp/graph");
        s.handle(Event::AtPrompt(0)).unwrap();
        s.handle(Event::Konfig(0, Vec::new())).unwrap();
        s.handle(Event::AtPrompt(0)).unwrap();
        s.handle(Event::AtPrompt(1)).unwrap();
        assert!(s.tree().find_node(1).is_some());
    }

    #[test]
    fn branching_attaches_children_and_queues_them() {
        let mut s = Scheduler::new("/tmp/graph");
        s.started = true;
        s.nodes_seen.insert(0);
        s.nodes_seen.insert(1);
        s.last_config_number = 1;
        s.tree.add_child(0, 1).unwrap();
        s.handle(Event::Branches(3, vec![2, 3, 4])).unwrap();
        assert_eq!(s.tree().find_tree(1).unwrap().children().len(), 3);
        assert_eq!(s.unexpanded_nodes.front(), Some(&2));
    }

    #[test]
    fn proof_end_stuck_tags_the_next_prompt_node() {
        let mut s = Scheduler::new("/tmp/graph");
        s.handle(Event::AtPrompt(0)).unwrap();
        s.handle(Event::Konfig(0, Vec::new())).unwrap();
        s.handle(Event::AtPrompt(0)).unwrap();
        s.handle(Event::EndStateSet(EndStateSignal::Stuck)).unwrap();
        s.handle(Event::ProofEnd(5)).unwrap();
        s.last_config_number = 0;
        s.handle(Event::AtPrompt(7)).unwrap();
        assert_eq!(s.tree().find_node(7).unwrap().to_string(), "stuck(7)");
    }

    #[test]
    fn request_konfig_resumes_from_idle() {
        let mut s = Scheduler::new("/tmp/graph");
        s.handle(Event::AtPrompt(0)).unwrap();
        s.handle(Event::Konfig(0, Vec::new())).unwrap();
        s.handle(Event::AtPrompt(0)).unwrap();
        let dispatch = s.handle(Event::AtPrompt(0)).unwrap();
        assert!(dispatch.is_none() || s.is_idle());
    }
}
