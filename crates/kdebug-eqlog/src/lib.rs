//! Turns a raw equation-application log into an indented report: [`entries`]
//! performs the lexical parse into flat [`entries::Entry`] records,
//! [`organize`] groups those by context into [`organize::Organized`] trees,
//! and [`render`] prints the trees back out. [`resolve`] is an optional
//! final pass that inlines referenced source snippets.

pub mod entries;
pub mod location;
pub mod organize;
pub mod render;
pub mod resolve;

pub use entries::{parse_entries, Entry, ParseError};
pub use organize::{organize, Organized, OrganizeError};
pub use render::render;
pub use resolve::resolve_equation_sources;

#[derive(Debug, thiserror::Error)]
pub enum EqLogError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error("failed to read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

/// Runs the full pipeline: parse, organize, render, with an optional
/// source-resolution pass at the end.
pub fn process(text: &str, resolve_sources: bool) -> Result<String, EqLogError> {
    let entries = parse_entries(text)?;
    let organized = organize(&entries)?;
    let rendered = render(&organized);
    Ok(if resolve_sources { resolve_equation_sources(&rendered) } else { rendered })
}
