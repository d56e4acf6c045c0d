//! Recognizes the three stderr messages the proof engine emits when a
//! proof branch can't progress further: a stuck warning, an exception
//! traceback header, and the "claimed implication is not valid" message
//! that marks a failed proof end.

use kdebug_core::StringFinder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Stuck,
    Error,
    FailedEnd,
}

/// An end-state transition recognized on the engine's stderr stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndStateSignal {
    Stuck,
    Error,
    FailedEnd,
}

const STUCK_PATTERN: &[u8] = b"WarnStuckClaimState";
const ERROR_PATTERN: &[u8] = b"ErrorException";
const FAILED_END_PATTERN: &[u8] =
    b"The proof has reached the final configuration, but the claimed implication is not valid.";

/// Feeds the engine's stderr stream one byte at a time, reporting end-state
/// transitions as the matched patterns complete.
pub struct StdErrParser {
    finder: StringFinder<Pattern>,
}

impl Default for StdErrParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StdErrParser {
    pub fn new() -> Self {
        Self {
            finder: StringFinder::new(vec![
                (STUCK_PATTERN.to_vec(), Pattern::Stuck),
                (ERROR_PATTERN.to_vec(), Pattern::Error),
                (FAILED_END_PATTERN.to_vec(), Pattern::FailedEnd),
            ]),
        }
    }

    /// Feeds one byte, returning the end-state signal if this byte just
    /// completed one of the three recognized patterns.
    pub fn process(&mut self, byte: u8) -> Option<EndStateSignal> {
        self.finder.feed(byte).into_iter().next().map(|p| match p {
            Pattern::Stuck => EndStateSignal::Stuck,
            Pattern::Error => EndStateSignal::Error,
            Pattern::FailedEnd => EndStateSignal::FailedEnd,
        })
    }

    /// Resets in-flight matches ahead of issuing a `step` command.
    pub fn prepare_for_step(&mut self) {
        self.finder.reset();
    }

    /// Resets in-flight matches ahead of issuing a `konfig` request.
    pub fn prepare_for_konfig(&mut self) {
        self.finder.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut StdErrParser, bytes: &[u8]) -> Vec<EndStateSignal> {
        bytes.iter().filter_map(|&b| parser.process(b)).collect()
    }

    #[test]
    fn recognizes_stuck_warning() {
        let mut p = StdErrParser::new();
        assert_eq!(feed(&mut p, STUCK_PATTERN), vec![EndStateSignal::Stuck]);
    }

    #[test]
    fn recognizes_exception() {
        let mut p = StdErrParser::new();
        assert_eq!(feed(&mut p, b"Traceback\nErrorException: boom"), vec![EndStateSignal::Error]);
    }

    #[test]
    fn recognizes_failed_end() {
        let mut p = StdErrParser::new();
        assert_eq!(feed(&mut p, FAILED_END_PATTERN), vec![EndStateSignal::FailedEnd]);
    }

    #[test]
    fn prepare_for_step_discards_partial_match() {
        let mut p = StdErrParser::new();
        feed(&mut p, b"WarnStuckClaimSta");
        p.prepare_for_step();
        assert_eq!(feed(&mut p, b"te"), Vec::new());
    }
}
