//! Byte-level parsers for the proof engine's wire dialect.
//!
//! The engine speaks two independent streams: stdout carries the prompt,
//! branching, and configuration-dump control records ([`stdout`]), and
//! stderr carries the stuck/error/failed-end warnings ([`stderr`]).

pub mod stderr;
pub mod stdout;

pub use stderr::{EndStateSignal, StdErrParser};
pub use stdout::{OutputParser, ParserEvent};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed control record: {0}")]
    Malformed(String),
}
