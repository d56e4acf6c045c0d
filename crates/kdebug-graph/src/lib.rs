//! Parses the proof graph Graphviz renders to SVG and keeps a live,
//! queryable copy of it: [`svg`] tokenizes the document, [`graph`]
//! extracts `src -> dst` edges from it and exposes [`UIGraph`], the
//! incoming-edge-lookup view the rest of the workspace depends on.

pub mod graph;
pub mod svg;

pub use graph::{parse_graph_file, parse_svg, Edge, UIGraph};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] std::io::Error),
}
