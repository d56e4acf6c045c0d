//! Shared primitives for the kdebug proof-debugger core.
//!
//! This crate has no knowledge of the engine's wire dialect or of threads; it
//! is the vocabulary the rest of the workspace builds on:
//!
//! - [`matcher`] — an incremental multi-pattern byte matcher.
//! - [`tree`] — the proof-tree data model (`Node`, `NodeTree`, `EndState`).
//! - [`life`] — the process-wide liveness flag and guarded-thread helper.

pub mod life;
pub mod matcher;
pub mod tree;

pub use life::{run_guarded, Life};
pub use matcher::StringFinder;
pub use tree::{EndState, Node, NodeState, NodeTree, ProofTree};

/// Errors shared across the workspace at the points where the core's
/// invariants can be violated by an engine that no longer speaks the
/// dialect the parsers were built against.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("tree routing failure: {0}")]
    Tree(#[from] tree::TreeError),
}
